//! Serialization of query results and response framing.

use serde_json::json;

use crate::data::Value;
use crate::query::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Separator-delimited, using the request's [`Separators`]
    #[default]
    Csv,
    /// RFC 4180 quoted CSV
    QuotedCsv,
    Json,
    Python,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "csv" => OutputFormat::Csv,
            "CSV" => OutputFormat::QuotedCsv,
            "json" => OutputFormat::Json,
            "python" | "python3" => OutputFormat::Python,
            _ => return None,
        })
    }
}

/// Byte codes used by the `csv` format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    pub dataset: u8,
    pub field: u8,
    pub list: u8,
    pub host_service: u8,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            dataset: b'\n',
            field: b';',
            list: b',',
            host_service: b'|',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseHeader {
    #[default]
    Off,
    Fixed16,
}

impl ResponseHeader {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ResponseHeader::Off),
            "fixed16" => Some(ResponseHeader::Fixed16),
            _ => None,
        }
    }
}

/// Output settings collected from the request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub separators: Separators,
    pub column_headers: bool,
    pub response_header: ResponseHeader,
    pub keep_alive: bool,
}

/// Serialize a result table in the requested format
pub fn render(result: &QueryResult, options: &OutputOptions) -> String {
    match options.format {
        OutputFormat::Csv => render_csv(result, options),
        OutputFormat::QuotedCsv => render_quoted_csv(result, options.column_headers),
        OutputFormat::Json | OutputFormat::Python => render_json(result, options.column_headers),
    }
}

fn render_csv(result: &QueryResult, options: &OutputOptions) -> String {
    let sep = &options.separators;
    let dataset = char::from(sep.dataset);
    let field = char::from(sep.field).to_string();
    let list = char::from(sep.list).to_string();
    let host_service = char::from(sep.host_service);

    let mut out = String::new();
    if options.column_headers {
        out.push_str(&result.columns.join(&field));
        out.push(dataset);
    }
    for row in &result.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|value| match value {
                Value::List(items) => items.join(&list),
                Value::Dict(map) => map
                    .iter()
                    .map(|(k, v)| format!("{}{}{}", k, host_service, v))
                    .collect::<Vec<_>>()
                    .join(&list),
                other => other.to_string(),
            })
            .collect();
        out.push_str(&fields.join(&field));
        out.push(dataset);
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn render_quoted_csv(result: &QueryResult, column_headers: bool) -> String {
    let mut out = String::new();
    let mut push_line = |fields: Vec<String>| {
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    };
    if column_headers {
        push_line(result.columns.iter().map(|c| quote(c)).collect());
    }
    for row in &result.rows {
        push_line(row.iter().map(|v| quote(&v.to_string())).collect());
    }
    out
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(i) | Value::Time(i) => json!(i),
        // Neither JSON nor Python literals have NaN or infinities
        Value::Double(v) if v.is_nan() => json!(0.0),
        Value::Double(v) => json!((*v).clamp(f64::MIN, f64::MAX)),
        Value::String(s) => json!(s),
        Value::List(items) => json!(items),
        Value::Dict(map) => json!(map),
        Value::Blob(bytes) => json!(String::from_utf8_lossy(bytes)),
    }
}

fn render_json(result: &QueryResult, column_headers: bool) -> String {
    let mut table: Vec<serde_json::Value> = Vec::with_capacity(result.rows.len() + 1);
    if column_headers {
        table.push(json!(result.columns));
    }
    for row in &result.rows {
        table.push(serde_json::Value::Array(row.iter().map(to_json).collect()));
    }
    let mut out = serde_json::Value::Array(table).to_string();
    out.push('\n');
    out
}

/// A complete answer to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub header: ResponseHeader,
    pub keep_alive: bool,
}

impl Response {
    pub fn ok(body: String, options: &OutputOptions) -> Self {
        Self {
            status: 200,
            body,
            header: options.response_header,
            keep_alive: options.keep_alive,
        }
    }

    pub fn error(status: u16, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: format!("{}\n", message),
            header: ResponseHeader::Off,
            keep_alive: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Bytes sent to the client
    pub fn render(&self) -> String {
        match self.header {
            ResponseHeader::Off => self.body.clone(),
            ResponseHeader::Fixed16 => {
                format!("{:03} {:>11}\n{}", self.status, self.body.len(), self.body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result() -> QueryResult {
        let tags: BTreeMap<String, String> = [("site".to_string(), "Berlin".to_string())].into();
        QueryResult {
            columns: vec!["name".into(), "contacts".into(), "tags".into(), "latency".into()],
            rows: vec![vec![
                Value::String("web \"01\"".into()),
                Value::List(vec!["alice".into(), "bob".into()]),
                Value::Dict(tags),
                Value::Double(0.25),
            ]],
            rows_matched: 1,
            truncation: None,
            execution_time_ms: 0,
        }
    }

    #[test]
    fn test_csv_uses_separators() {
        let options = OutputOptions::default();
        assert_eq!(
            render(&result(), &options),
            "web \"01\";alice,bob;site|Berlin;0.25\n"
        );

        let options = OutputOptions {
            column_headers: true,
            separators: Separators {
                dataset: b'\n',
                field: b'\t',
                list: b' ',
                host_service: b'=',
            },
            ..Default::default()
        };
        assert_eq!(
            render(&result(), &options),
            "name\tcontacts\ttags\tlatency\nweb \"01\"\talice bob\tsite=Berlin\t0.25\n"
        );
    }

    #[test]
    fn test_quoted_csv() {
        let options = OutputOptions {
            format: OutputFormat::QuotedCsv,
            ..Default::default()
        };
        assert_eq!(
            render(&result(), &options),
            "\"web \"\"01\"\"\",\"alice,bob\",\"site|Berlin\",\"0.25\"\r\n"
        );
    }

    #[test]
    fn test_json_output() {
        let options = OutputOptions {
            format: OutputFormat::Json,
            column_headers: true,
            ..Default::default()
        };
        let text = render(&result(), &options);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0][0], "name");
        assert_eq!(parsed[1][1], json!(["alice", "bob"]));
        assert_eq!(parsed[1][2]["site"], "Berlin");
        assert_eq!(parsed[1][3], 0.25);
    }

    #[test]
    fn test_non_finite_doubles_stay_numeric() {
        let result = QueryResult {
            columns: vec!["stats_1".into(), "stats_2".into(), "stats_3".into()],
            rows: vec![vec![
                Value::Double(f64::INFINITY),
                Value::Double(f64::NEG_INFINITY),
                Value::Double(f64::NAN),
            ]],
            rows_matched: 1,
            truncation: None,
            execution_time_ms: 0,
        };
        let options = OutputOptions {
            format: OutputFormat::Python,
            ..Default::default()
        };
        let text = render(&result, &options);
        assert!(!text.contains("null"), "{}", text);

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0][0], f64::MAX);
        assert_eq!(parsed[0][1], f64::MIN);
        assert_eq!(parsed[0][2], 0.0);
    }

    #[test]
    fn test_fixed16_header() {
        let response = Response {
            status: 200,
            body: "hello\n".into(),
            header: ResponseHeader::Fixed16,
            keep_alive: false,
        };
        let text = response.render();
        assert_eq!(&text[..16], "200           6\n");
        assert_eq!(&text[16..], "hello\n");

        let error = Response::error(404, "Invalid GET request, no such table 'nope'");
        assert_eq!(error.render(), "Invalid GET request, no such table 'nope'\n");
    }
}
