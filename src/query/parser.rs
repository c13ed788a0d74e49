use std::sync::Arc;
use std::time::Duration;

use super::aggregates::AggregationKind;
use super::filter::{Filter, RelOp};
use super::request::Header;
use super::stats::StatsColumn;
use super::QueryError;
use crate::data::Column;
use crate::output::{OutputFormat, OutputOptions, ResponseHeader, Separators};
use crate::table::Table;

/// Query headers resolved against one table
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    /// Output columns in row mode, grouping columns in stats mode
    pub columns: Vec<Arc<Column>>,
    pub filter: Filter,
    pub stats: Vec<StatsColumn>,
    pub order_by: Vec<OrderBy>,
    /// Maximum number of matched rows
    pub limit: Option<usize>,
    pub time_limit: Option<Duration>,
    pub output: OutputOptions,
    pub auth_user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: Arc<Column>,
    pub descending: bool,
}

/// Which stack a combinator header works on
#[derive(Clone, Copy)]
enum Combine {
    And,
    Or,
}

pub fn parse_query(headers: &[Header], table: &dyn Table) -> Result<ParsedQuery, QueryError> {
    let mut columns = Vec::new();
    let mut columns_given = false;
    let mut filters: Vec<Filter> = Vec::new();
    let mut stats: Vec<StatsColumn> = Vec::new();
    let mut order_by = Vec::new();
    let mut limit = None;
    let mut time_limit = None;
    let mut output = OutputOptions::default();
    let mut column_headers = None;
    let mut auth_user = None;

    for header in headers {
        let value = header.value.as_str();
        match header.name.as_str() {
            "Columns" | "StatsGroupBy" => {
                columns_given = true;
                for name in value.split_whitespace() {
                    columns.push(lookup_column(table, name)?);
                }
            }
            "Filter" => filters.push(parse_filter(table, header)?),
            "And" => combine(&mut filters, header, Combine::And)?,
            "Or" => combine(&mut filters, header, Combine::Or)?,
            "Negate" => {
                expect_no_argument(header)?;
                let filter = pop_one(&mut filters, header)?;
                filters.push(Filter::Not(Box::new(filter)));
            }
            "Stats" => stats.push(parse_stats(table, header)?),
            "StatsAnd" => combine_stats(&mut stats, header, Combine::And)?,
            "StatsOr" => combine_stats(&mut stats, header, Combine::Or)?,
            "StatsNegate" => {
                expect_no_argument(header)?;
                let mut popped = pop_stats_filters(&mut stats, header, 1)?;
                let filter = popped.remove(0);
                stats.push(StatsColumn::Count(Filter::Not(Box::new(filter))));
            }
            "Limit" => limit = Some(parse_number::<usize>(header)?),
            "Timelimit" => time_limit = Some(Duration::from_secs(parse_number::<u64>(header)?)),
            "OrderBy" => order_by.push(parse_order_by(table, header)?),
            "OutputFormat" => {
                output.format = OutputFormat::parse(value.trim()).ok_or_else(|| invalid(header))?
            }
            "ColumnHeaders" => column_headers = Some(parse_on_off(header)?),
            "ResponseHeader" => {
                output.response_header =
                    ResponseHeader::parse(value.trim()).ok_or_else(|| invalid(header))?
            }
            "KeepAlive" => output.keep_alive = parse_on_off(header)?,
            "Separators" => output.separators = parse_separators(header)?,
            "AuthUser" => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(invalid(header));
                }
                auth_user = Some(name.to_string());
            }
            other => return Err(QueryError::UnknownHeader(other.to_string())),
        }
    }

    if !columns_given && stats.is_empty() {
        columns = table.columns().all().to_vec();
    }
    output.column_headers = column_headers.unwrap_or(!columns_given && stats.is_empty());

    // Whatever is left on the stack is and-ed together
    let filter = if filters.len() == 1 {
        filters.remove(0)
    } else {
        Filter::And(filters)
    };

    Ok(ParsedQuery {
        columns,
        filter,
        stats,
        order_by,
        limit,
        time_limit,
        output,
        auth_user,
    })
}

fn invalid(header: &Header) -> QueryError {
    QueryError::InvalidHeader {
        header: header.name.clone(),
        value: header.value.clone(),
    }
}

fn malformed(header: &Header) -> QueryError {
    QueryError::Malformed {
        header: header.name.clone(),
        value: header.value.clone(),
    }
}

fn lookup_column(table: &dyn Table, name: &str) -> Result<Arc<Column>, QueryError> {
    table.column(name).ok_or_else(|| QueryError::UnknownColumn {
        table: table.name().to_string(),
        column: name.to_string(),
    })
}

/// Split off the first whitespace-delimited word
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// `<column> <op> <literal>`; the literal may be empty
fn parse_filter(table: &dyn Table, header: &Header) -> Result<Filter, QueryError> {
    let (column_name, rest) = next_word(&header.value);
    let (op, literal) = next_word(rest);
    if column_name.is_empty() || op.is_empty() {
        return Err(malformed(header));
    }
    let column = lookup_column(table, column_name)?;
    let op = RelOp::parse(op).ok_or_else(|| QueryError::UnknownOperator(op.to_string()))?;
    Filter::column(column, op, literal)
}

fn parse_stats(table: &dyn Table, header: &Header) -> Result<StatsColumn, QueryError> {
    let (first, rest) = next_word(&header.value);
    if let Some(kind) = AggregationKind::parse(first) {
        let (column_name, trailing) = next_word(rest);
        if !column_name.is_empty() && trailing.is_empty() {
            let column = lookup_column(table, column_name)?;
            if !column.column_type().is_numeric() {
                return Err(QueryError::NonNumericAggregate(column.name().to_string()));
            }
            return Ok(StatsColumn::Aggregate { kind, column });
        }
    }
    Ok(StatsColumn::Count(parse_filter(table, header)?))
}

fn parse_count(header: &Header) -> Result<usize, QueryError> {
    header.value.trim().parse().map_err(|_| malformed(header))
}

fn parse_number<T: std::str::FromStr>(header: &Header) -> Result<T, QueryError> {
    header.value.trim().parse().map_err(|_| invalid(header))
}

fn expect_no_argument(header: &Header) -> Result<(), QueryError> {
    match header.value.trim() {
        "" | "1" => Ok(()),
        _ => Err(invalid(header)),
    }
}

fn parse_on_off(header: &Header) -> Result<bool, QueryError> {
    match header.value.trim() {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(invalid(header)),
    }
}

fn parse_separators(header: &Header) -> Result<Separators, QueryError> {
    let codes = header
        .value
        .split_whitespace()
        .map(|code| code.parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(header))?;
    match codes.as_slice() {
        [dataset, field, list, host_service] => Ok(Separators {
            dataset: *dataset,
            field: *field,
            list: *list,
            host_service: *host_service,
        }),
        _ => Err(invalid(header)),
    }
}

fn parse_order_by(table: &dyn Table, header: &Header) -> Result<OrderBy, QueryError> {
    let (column_name, rest) = next_word(&header.value);
    if column_name.is_empty() {
        return Err(malformed(header));
    }
    let descending = match rest.trim() {
        "" | "asc" => false,
        "desc" => true,
        _ => return Err(invalid(header)),
    };
    Ok(OrderBy {
        column: lookup_column(table, column_name)?,
        descending,
    })
}

fn pop_n<T>(stack: &mut Vec<T>, header: &Header, n: usize) -> Result<Vec<T>, QueryError> {
    if n > stack.len() {
        return Err(QueryError::StackUnderflow {
            header: header.name.clone(),
            requested: n,
            available: stack.len(),
        });
    }
    Ok(stack.split_off(stack.len() - n))
}

fn pop_one(stack: &mut Vec<Filter>, header: &Header) -> Result<Filter, QueryError> {
    let mut popped = pop_n(stack, header, 1)?;
    Ok(popped.remove(0))
}

fn combine(filters: &mut Vec<Filter>, header: &Header, how: Combine) -> Result<(), QueryError> {
    let n = parse_count(header)?;
    let operands = pop_n(filters, header, n)?;
    filters.push(match how {
        Combine::And => Filter::And(operands),
        Combine::Or => Filter::Or(operands),
    });
    Ok(())
}

/// Only counting stats carry a filter that can be combined
fn pop_stats_filters(
    stats: &mut Vec<StatsColumn>,
    header: &Header,
    n: usize,
) -> Result<Vec<Filter>, QueryError> {
    let popped = pop_n(stats, header, n)?;
    popped
        .into_iter()
        .map(|entry| match entry {
            StatsColumn::Count(filter) => Ok(filter),
            StatsColumn::Aggregate { .. } => Err(malformed(header)),
        })
        .collect()
}

fn combine_stats(stats: &mut Vec<StatsColumn>, header: &Header, how: Combine) -> Result<(), QueryError> {
    let n = parse_count(header)?;
    let operands = pop_stats_filters(stats, header, n)?;
    stats.push(StatsColumn::Count(match how {
        Combine::And => Filter::And(operands),
        Combine::Or => Filter::Or(operands),
    }));
    Ok(())
}
