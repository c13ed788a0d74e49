use std::sync::Arc;

use super::hosts::register_host_columns;
use super::{answer_rows, ColumnRegistry, Table, User};
use crate::data::offsets::log_host;
use crate::data::{Column, ColumnOffsets, Row};
use crate::monitor::Core;
use crate::query::Query;

/// Entries of the monitoring log, oldest first
pub struct LogTable {
    core: Arc<Core>,
    columns: ColumnRegistry,
}

impl LogTable {
    pub fn new(core: Arc<Core>) -> Self {
        let mut columns = ColumnRegistry::new();
        let own = ColumnOffsets::new();

        columns.add(Column::time(
            "time",
            "Time of the log event (Unix timestamp)",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.time.timestamp()),
        ));
        columns.add(Column::int(
            "class",
            "The class of the message (0: info, 1: alert, 2: program, 3: notification, 4: passive, 5: command, 6: state, 7: text)",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.class.as_i64()),
        ));
        columns.add(Column::string(
            "type",
            "The type of the message (text before the colon)",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.kind.clone()),
        ));
        columns.add(Column::string(
            "message",
            "The complete message line including the timestamp",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.message.clone()),
        ));
        columns.add(Column::string(
            "host_name",
            "The name of the host the entry is about (might be empty)",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.host_name.clone()),
        ));
        columns.add(Column::string(
            "service_description",
            "The description of the service the entry is about (might be empty)",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.service_description.clone()),
        ));
        columns.add(Column::int(
            "state",
            "The state of the host or service in question",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.state),
        ));
        columns.add(Column::string(
            "plugin_output",
            "The output of the check, if any is associated with the message",
            own.clone(),
            |row: Row<'_>| row.log().map(|l| l.plugin_output.clone()),
        ));

        let host = own.add(log_host);
        register_host_columns(&mut columns, "current_host_", host.clone());
        columns.add_attribute_source("current_host_", host);

        Self { core, columns }
    }
}

impl Table for LogTable {
    fn name(&self) -> &str {
        "log"
    }

    fn name_prefix(&self) -> &str {
        "log_"
    }

    fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    fn answer_query(&self, query: &mut Query, user: &dyn User) {
        let guard = self.core.read();
        answer_rows(query, user, guard.log.iter().map(Row::Log));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::query::Request;
    use crate::table::NoAuthUser;

    fn table() -> LogTable {
        let snapshot = serde_json::from_value(serde_json::json!({
            "hosts": [{"name": "web01", "address": "10.0.0.1"}],
            "log": [
                {"time": "2024-01-01T00:00:00Z", "class": "alert", "type": "HOST ALERT",
                 "host_name": "web01", "state": 1},
                {"time": "2024-01-01T00:01:00Z", "class": "state", "host_name": "retired01"},
                {"time": "2024-01-01T00:02:00Z", "class": "program", "message": "restarting"}
            ]
        }))
        .unwrap();
        LogTable::new(Arc::new(Core::from_snapshot(snapshot).unwrap()))
    }

    fn rows(table: &LogTable, text: &str) -> Vec<Vec<Value>> {
        let request = Request::parse(text).unwrap();
        let mut query = Query::parse(&request.headers, table).unwrap();
        table.answer_query(&mut query, &NoAuthUser);
        query.finish().rows
    }

    #[test]
    fn test_current_host_degrades_for_missing_host() {
        let table = table();
        let result = rows(&table, "GET log\nColumns: host_name current_host_address time\n");
        assert_eq!(
            result,
            vec![
                vec![
                    Value::String("web01".into()),
                    Value::String("10.0.0.1".into()),
                    Value::Time(1704067200),
                ],
                vec![
                    Value::String("retired01".into()),
                    Value::String(String::new()),
                    Value::Time(1704067260),
                ],
                vec![Value::String(String::new()), Value::String(String::new()), Value::Time(1704067320)],
            ]
        );
    }

    #[test]
    fn test_filter_on_class() {
        let table = table();
        let result = rows(&table, "GET log\nColumns: log_type\nFilter: class = 1\n");
        assert_eq!(result, vec![vec![Value::String("HOST ALERT".into())]]);
    }
}
