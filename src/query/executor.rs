use std::collections::BTreeMap;
use std::time::Instant;

use super::aggregates::Accumulator;
use super::parser::{parse_query, ParsedQuery};
use super::request::Header;
use super::QueryError;
use crate::data::{Row, Value};
use crate::table::Table;

/// Result of query execution
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names in output order
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Vec<Value>>,
    /// Rows accepted by the filter before any limit stopped iteration
    pub rows_matched: usize,
    /// Set when a budget ended iteration early
    pub truncation: Option<Truncation>,
    pub execution_time_ms: u64,
}

/// Why iteration stopped before the end of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    Limit,
    TimeLimit,
}

/// One request being answered. The owning table feeds rows through
/// [`Query::process_dataset`] while it holds the core guard; everything a row
/// contributes is extracted before the call returns.
pub struct Query {
    parsed: ParsedQuery,
    started: Instant,
    deadline: Option<Instant>,
    rows_matched: usize,
    truncation: Option<Truncation>,
    /// Emitted rows with their sort keys, in row mode
    rows: Vec<(Vec<Value>, Vec<Value>)>,
    /// Accumulators per group key, in stats mode
    groups: BTreeMap<Vec<Value>, Vec<Box<dyn Accumulator>>>,
}

impl Query {
    pub fn new(parsed: ParsedQuery) -> Self {
        let started = Instant::now();
        Self {
            deadline: parsed.time_limit.map(|limit| started + limit),
            parsed,
            started,
            rows_matched: 0,
            truncation: None,
            rows: Vec::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Resolve request headers against a table
    pub fn parse(headers: &[Header], table: &dyn Table) -> Result<Self, QueryError> {
        Ok(Self::new(parse_query(headers, table)?))
    }

    pub fn parsed(&self) -> &ParsedQuery {
        &self.parsed
    }

    pub fn is_stats(&self) -> bool {
        !self.parsed.stats.is_empty()
    }

    /// Evaluate one row. Returns `false` once a budget is exhausted and the
    /// caller should stop iterating.
    pub fn process_dataset(&mut self, row: Row<'_>) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.truncation = Some(Truncation::TimeLimit);
                return false;
            }
        }

        if self.limit_reached() {
            return false;
        }

        if !self.parsed.filter.accepts(row) {
            return true;
        }
        self.rows_matched += 1;

        let values: Vec<Value> = self.parsed.columns.iter().map(|c| c.extract(row)).collect();

        if self.is_stats() {
            let stats = &self.parsed.stats;
            let accumulators = self
                .groups
                .entry(values)
                .or_insert_with(|| stats.iter().map(|s| s.create_accumulator()).collect());
            for (stat, acc) in stats.iter().zip(accumulators.iter_mut()) {
                stat.update(row, acc.as_mut());
            }
        } else {
            let keys = self
                .parsed
                .order_by
                .iter()
                .map(|o| o.column.extract(row))
                .collect();
            self.rows.push((values, keys));
        }

        !self.limit_reached()
    }

    /// Records the truncation once the matched-row budget is spent
    fn limit_reached(&mut self) -> bool {
        match self.parsed.limit {
            Some(limit) if self.rows_matched >= limit => {
                self.truncation = Some(Truncation::Limit);
                true
            }
            _ => false,
        }
    }

    pub fn finish(self) -> QueryResult {
        let mut columns: Vec<String> = self
            .parsed
            .columns
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = if self.parsed.stats.is_empty() {
            let mut rows = self.rows;
            if !self.parsed.order_by.is_empty() {
                let order_by = &self.parsed.order_by;
                // Vec::sort_by is stable
                rows.sort_by(|(_, a), (_, b)| {
                    for (i, o) in order_by.iter().enumerate() {
                        let ord = a[i].cmp(&b[i]);
                        let ord = if o.descending { ord.reverse() } else { ord };
                        if ord.is_ne() {
                            return ord;
                        }
                    }
                    std::cmp::Ordering::Equal
                });
            }
            rows.into_iter().map(|(values, _)| values).collect()
        } else {
            columns.extend((1..=self.parsed.stats.len()).map(|i| format!("stats_{}", i)));

            let mut groups = self.groups;
            if groups.is_empty() && self.parsed.columns.is_empty() {
                // Plain stats always answer with exactly one row
                let fresh = self.parsed.stats.iter().map(|s| s.create_accumulator()).collect();
                groups.insert(Vec::new(), fresh);
            }

            groups
                .into_iter()
                .map(|(mut key, accumulators)| {
                    key.extend(accumulators.iter().map(|acc| acc.result()));
                    key
                })
                .collect()
        };

        QueryResult {
            columns,
            rows,
            rows_matched: self.rows_matched,
            truncation: self.truncation,
            execution_time_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ColumnOffsets};
    use crate::monitor::Host;
    use crate::output::OutputOptions;
    use crate::query::aggregates::AggregationKind;
    use crate::query::filter::{Filter, RelOp};
    use crate::query::stats::StatsColumn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn name_col() -> Arc<Column> {
        Arc::new(Column::string("name", "", ColumnOffsets::new(), |row: Row<'_>| {
            row.host().map(|h| h.name.clone())
        }))
    }

    fn state_col() -> Arc<Column> {
        Arc::new(Column::int("state", "", ColumnOffsets::new(), |row: Row<'_>| {
            row.host().map(|h| h.check.state)
        }))
    }

    fn parsed(columns: Vec<Arc<Column>>, filter: Filter, stats: Vec<StatsColumn>) -> ParsedQuery {
        ParsedQuery {
            columns,
            filter,
            stats,
            order_by: Vec::new(),
            limit: None,
            time_limit: None,
            output: OutputOptions::default(),
            auth_user: None,
        }
    }

    fn hosts() -> Vec<Host> {
        [("a", 0), ("b", 2), ("c", 1), ("d", 2), ("e", 0)]
            .iter()
            .map(|(name, state)| {
                let mut h = Host {
                    name: name.to_string(),
                    ..Default::default()
                };
                h.check.state = *state;
                h
            })
            .collect()
    }

    fn run(mut query: Query, hosts: &[Host]) -> QueryResult {
        for h in hosts {
            if !query.process_dataset(Row::Host(h)) {
                break;
            }
        }
        query.finish()
    }

    #[test]
    fn test_row_mode_keeps_iteration_order() {
        let filter = Filter::column(state_col(), RelOp::Equal, "2").unwrap();
        let result = run(Query::new(parsed(vec![name_col()], filter, vec![])), &hosts());
        assert_eq!(
            result.rows,
            vec![vec![Value::String("b".into())], vec![Value::String("d".into())]]
        );
        assert_eq!(result.rows_matched, 2);
        assert_eq!(result.truncation, None);
    }

    #[test]
    fn test_limit_applies_to_matched_rows() {
        let mut p = parsed(
            vec![],
            Filter::accept_all(),
            vec![StatsColumn::Count(Filter::accept_all())],
        );
        p.limit = Some(3);
        let result = run(Query::new(p), &hosts());
        assert_eq!(result.rows, vec![vec![Value::Int(3)]]);
        assert_eq!(result.truncation, Some(Truncation::Limit));
    }

    #[test]
    fn test_limit_stops_scan_once_reached() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluated);
        let state = Arc::new(Column::int("state", "", ColumnOffsets::new(), move |row: Row<'_>| {
            counter.fetch_add(1, Ordering::Relaxed);
            row.host().map(|h| h.check.state)
        }));

        let mut many: Vec<Host> = (0..1000)
            .map(|i| Host {
                name: format!("h{}", i),
                ..Default::default()
            })
            .collect();
        many[0].check.state = 1;

        let mut p = parsed(
            vec![name_col()],
            Filter::column(state, RelOp::Equal, "1").unwrap(),
            vec![],
        );
        p.limit = Some(1);
        let result = run(Query::new(p), &many);

        assert_eq!(result.rows, vec![vec![Value::String("h0".into())]]);
        assert_eq!(evaluated.load(Ordering::Relaxed), 1);
        assert_eq!(result.truncation, Some(Truncation::Limit));
    }

    #[test]
    fn test_limit_zero_returns_nothing() {
        let mut p = parsed(vec![name_col()], Filter::accept_all(), vec![]);
        p.limit = Some(0);
        let result = run(Query::new(p), &hosts());
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_expired_time_limit_stops_iteration() {
        let mut p = parsed(vec![name_col()], Filter::accept_all(), vec![]);
        p.time_limit = Some(Duration::ZERO);
        let result = run(Query::new(p), &hosts());
        assert!(result.rows.is_empty());
        assert_eq!(result.truncation, Some(Truncation::TimeLimit));
    }

    #[test]
    fn test_stats_without_rows_yields_one_row() {
        let stats = vec![
            StatsColumn::Count(Filter::column(state_col(), RelOp::Equal, "2").unwrap()),
            StatsColumn::Aggregate {
                kind: AggregationKind::Max,
                column: state_col(),
            },
        ];
        let result = run(Query::new(parsed(vec![], Filter::accept_all(), stats)), &[]);
        assert_eq!(result.rows, vec![vec![Value::Int(0), Value::Double(0.0)]]);
        assert_eq!(result.columns, vec!["stats_1", "stats_2"]);
    }

    #[test]
    fn test_grouped_stats_ordered_by_key() {
        let stats = vec![StatsColumn::Count(Filter::accept_all())];
        let result = run(
            Query::new(parsed(vec![state_col()], Filter::accept_all(), stats)),
            &hosts(),
        );
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Int(0), Value::Int(2)],
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::Int(2)],
            ]
        );
        assert_eq!(result.columns, vec!["state", "stats_1"]);
    }

    #[test]
    fn test_order_by_is_stable() {
        let mut p = parsed(vec![name_col()], Filter::accept_all(), vec![]);
        p.order_by = vec![crate::query::OrderBy {
            column: state_col(),
            descending: true,
        }];
        let result = run(Query::new(p), &hosts());
        let names: Vec<_> = result.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(names, vec!["b", "d", "c", "a", "e"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let filter = Filter::Or(vec![
            Filter::column(state_col(), RelOp::Equal, "1").unwrap(),
            Filter::column(name_col(), RelOp::Matches, "^[ae]$").unwrap(),
        ]);
        let first = run(Query::new(parsed(vec![name_col()], filter.clone(), vec![])), &hosts());
        let second = run(Query::new(parsed(vec![name_col()], filter, vec![])), &hosts());
        assert_eq!(first.rows, second.rows);
        assert_eq!(first.rows.len(), 3);
    }
}
