use dashmap::DashMap;
use std::sync::Arc;

use crate::counters::{Counter, Counters};
use crate::monitor::Core;
use crate::output::{render, OutputOptions, Response, ResponseHeader};
use crate::query::{Query, QueryError, QueryResult, Request, RequestError};
use crate::table::{
    AuthUser, ColumnsTable, HostsTable, LogTable, NoAuthUser, ServicesTable, StatusTable, Table,
    User,
};

/// Table registry and request dispatcher
pub struct Store {
    core: Arc<Core>,
    counters: Arc<Counters>,
    /// Tables indexed by name
    tables: DashMap<String, Arc<dyn Table>>,
    columns: Arc<ColumnsTable>,
}

impl Store {
    /// A store serving the built-in tables
    pub fn new(core: Arc<Core>, counters: Arc<Counters>) -> Self {
        let store = Self {
            columns: Arc::new(ColumnsTable::new()),
            tables: DashMap::new(),
            core: Arc::clone(&core),
            counters: Arc::clone(&counters),
        };
        store.register(Arc::new(HostsTable::new(Arc::clone(&core))));
        store.register(Arc::new(ServicesTable::new(Arc::clone(&core))));
        store.register(Arc::new(LogTable::new(Arc::clone(&core))));
        store.register(Arc::new(StatusTable::new(core, counters)));
        store.register(Arc::clone(&store.columns) as Arc<dyn Table>);
        store
    }

    /// Add or replace a table
    pub fn register(&self, table: Arc<dyn Table>) {
        self.columns.add_table(table.as_ref());
        tracing::debug!(table = table.name(), columns = table.columns().len(), "table registered");
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn table(&self, name: &str) -> Option<Arc<dyn Table>> {
        self.tables.get(name).map(|t| Arc::clone(&t))
    }

    /// List all table names
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Parse and evaluate one request
    pub fn execute(&self, request: &Request) -> Result<(QueryResult, OutputOptions), StoreError> {
        let table = self
            .table(&request.table)
            .ok_or_else(|| StoreError::UnknownTable(request.table.clone()))?;

        let mut query = Query::parse(&request.headers, table.as_ref())?;
        let output = query.parsed().output.clone();

        let user: Box<dyn User> = match &query.parsed().auth_user {
            Some(name) => Box::new(AuthUser::new(name.clone())),
            None => Box::new(NoAuthUser),
        };
        table.answer_query(&mut query, user.as_ref());

        Ok((query.finish(), output))
    }

    /// Answer a raw request block. Bytes that are not UTF-8 are rejected with
    /// a 400 that still honors the readable framing headers.
    pub fn answer_bytes(&self, block: &[u8]) -> Response {
        match std::str::from_utf8(block) {
            Ok(text) => self.answer_request(text),
            Err(e) => {
                self.counters.increment(Counter::Requests);
                let (header, keep_alive) = prescan(&String::from_utf8_lossy(block));
                tracing::warn!(status = 400, "request is not valid UTF-8: {}", e);
                Response {
                    header,
                    keep_alive,
                    ..Response::error(400, format!("Request is not valid UTF-8: {}", e))
                }
            }
        }
    }

    /// Answer one request block. Never fails: errors become a response with
    /// the matching status code.
    pub fn answer_request(&self, text: &str) -> Response {
        self.counters.increment(Counter::Requests);
        let (header, keep_alive) = prescan(text);

        let outcome = Request::parse(text)
            .map_err(StoreError::from)
            .and_then(|request| {
                let answer = self.execute(&request)?;
                Ok((request, answer))
            });

        match outcome {
            Ok((request, (result, output))) => {
                tracing::debug!(
                    table = %request.table,
                    rows = result.rows.len(),
                    matched = result.rows_matched,
                    truncation = ?result.truncation,
                    ms = result.execution_time_ms,
                    "query answered"
                );
                Response::ok(render(&result, &output), &output)
            }
            Err(e) => {
                tracing::warn!(status = e.status_code(), "request failed: {}", e);
                Response {
                    header,
                    keep_alive,
                    ..Response::error(e.status_code(), &e)
                }
            }
        }
    }
}

/// Framing headers are honored even when the rest of the request is invalid
fn prescan(text: &str) -> (ResponseHeader, bool) {
    let mut header = ResponseHeader::Off;
    let mut keep_alive = false;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim() {
                "ResponseHeader" => header = ResponseHeader::parse(value.trim()).unwrap_or(header),
                "KeepAlive" => keep_alive = value.trim() == "on",
                _ => {}
            }
        }
    }
    (header, keep_alive)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Invalid GET request, no such table '{0}'")]
    UnknownTable(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl StoreError {
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Request(RequestError::MalformedHeader(_)) => 400,
            StoreError::Request(_) => 452,
            StoreError::UnknownTable(_) => 404,
            StoreError::Query(e) => e.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Snapshot;

    fn store() -> Store {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "hosts": [
                {"name": "web01", "state": 0, "latency": 0.5, "contacts": ["alice"],
                 "attributes": {"_TAG_criticality": "prod", "_LEVEL": "5"}},
                {"name": "web02", "state": 2, "latency": 1.5,
                 "attributes": {"_TAG_criticality": "test"}},
                {"name": "db01", "state": 2, "latency": 2.5},
                {"name": "db02", "state": 1, "latency": 3.5}
            ],
            "services": [
                {"host_name": "web01", "description": "HTTP", "state": 2},
                {"host_name": "db01", "description": "MySQL", "state": 0}
            ]
        }))
        .unwrap();
        let core = Arc::new(Core::from_snapshot(snapshot).unwrap());
        Store::new(core, Arc::new(Counters::new()))
    }

    #[test]
    fn test_every_table_extracts_declared_types() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "hosts": [
                {"name": "web01", "state": 1, "attributes": {"_TAG_site": "ams", "_LABEL_os": "linux"}}
            ],
            "services": [
                {"host_name": "web01", "description": "HTTP", "state": 2}
            ],
            "log": [
                {"time": "2024-01-01T00:00:00Z", "class": "alert", "host_name": "web01"},
                {"time": "2024-01-01T00:01:00Z", "host_name": "gone"},
                {"time": "2024-01-01T00:02:00Z", "class": "program"}
            ]
        }))
        .unwrap();
        let store = Store::new(
            Arc::new(Core::from_snapshot(snapshot).unwrap()),
            Arc::new(Counters::new()),
        );

        for name in store.table_names() {
            let table = store.table(&name).unwrap();
            let columns = table.columns().all();

            for column in columns {
                let value = column.extract(table.default_row());
                assert_eq!(value.column_type(), column.column_type(), "{}.{}", name, column.name());
            }

            let request = Request::parse(&format!("GET {}\n", name)).unwrap();
            let (result, _) = store.execute(&request).unwrap();
            assert!(!result.rows.is_empty(), "{} has no rows", name);
            for row in &result.rows {
                assert_eq!(row.len(), columns.len());
                for (value, column) in row.iter().zip(columns) {
                    assert_eq!(value.column_type(), column.column_type(), "{}.{}", name, column.name());
                }
            }
        }
    }

    #[test]
    fn test_non_utf8_request_keeps_framing() {
        let store = store();
        let response = store.answer_bytes(b"GET hosts\nResponseHeader: fixed16\nKeepAlive: on\nFilter: name = caf\xe9\n");
        assert_eq!(response.status, 400);
        assert!(response.keep_alive);
        assert!(response.render().starts_with("400 "));
        assert_eq!(store.counters().read(Counter::Requests), 1);
    }

    #[test]
    fn test_builtin_tables() {
        assert_eq!(
            store().table_names(),
            vec!["columns", "hosts", "log", "services", "status"]
        );
    }

    #[test]
    fn test_tag_pseudo_column() {
        let response = store().answer_request("GET hosts\nColumns: name _TAG_criticality\n");
        assert!(response.is_ok());
        assert_eq!(response.body, "web01;prod\nweb02;test\ndb01;\ndb02;\n");
    }

    #[test]
    fn test_or_combinator() {
        let response = store().answer_request(
            "GET hosts\nColumns: name\nFilter: state = 1\nFilter: state = 0\nOr: 2\n",
        );
        assert_eq!(response.body, "web01\ndb02\n");
    }

    #[test]
    fn test_stats_count_single_row() {
        let store = store();
        let response = store.answer_request("GET hosts\nStats: state = 2\n");
        assert_eq!(response.body, "2\n");

        let response = store.answer_request("GET services\nStats: state = 2\nStats: avg host_latency\n");
        assert_eq!(response.body, "1;1.5\n");
    }

    #[test]
    fn test_stats_grouped_by_column() {
        let response = store().answer_request("GET hosts\nStats: sum latency\nStatsGroupBy: state\n");
        assert_eq!(response.body, "0;0.5\n1;3.5\n2;4\n");
    }

    #[test]
    fn test_limit_truncates_stats_input() {
        let response = store().answer_request("GET hosts\nStats: state >= 0\nLimit: 3\n");
        assert_eq!(response.body, "3\n");
    }

    #[test]
    fn test_error_status_codes() {
        let store = store();
        assert_eq!(store.answer_request("GET nope\n").status, 404);
        assert_eq!(store.answer_request("PUT hosts\n").status, 452);
        assert_eq!(store.answer_request("GET hosts\nColumns: nope\n").status, 400);
        assert_eq!(store.answer_request("GET hosts\nFilter: state = up\n").status, 400);
        assert_eq!(store.answer_request("GET hosts\nBogus: 1\n").status, 400);
        assert_eq!(store.counters().read(Counter::Requests), 5);
    }

    #[test]
    fn test_fixed16_on_error() {
        let response = store().answer_request("GET nope\nResponseHeader: fixed16\nKeepAlive: on\n");
        assert!(response.keep_alive);
        let text = response.render();
        assert!(text.starts_with("404 "));
        assert_eq!(&text[16..], "Invalid GET request, no such table 'nope'\n");
    }

    #[test]
    fn test_json_with_headers() {
        let response = store().answer_request(
            "GET hosts\nColumns: name state\nFilter: name ~ ^db\nOutputFormat: json\nColumnHeaders: on\n",
        );
        let parsed: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([["name", "state"], ["db01", 2], ["db02", 1]])
        );
    }

    #[test]
    fn test_auth_user() {
        let response = store().answer_request("GET hosts\nColumns: name\nAuthUser: alice\n");
        assert_eq!(response.body, "web01\n");
    }

    #[test]
    fn test_columns_table_lists_everything() {
        let store = store();
        let response = store.answer_request("GET columns\nColumns: table\nFilter: name = table\n");
        assert_eq!(response.body, "columns\n");
    }

    #[test]
    fn test_reload_is_visible_to_next_query() {
        let store = store();
        store.core().reload(Snapshot::default()).unwrap();
        let response = store.answer_request("GET hosts\nStats: state >= 0\n");
        assert_eq!(response.body, "0\n");
    }
}
