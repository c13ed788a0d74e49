use std::sync::Arc;

use super::{answer_rows, ColumnRegistry, Table, User};
use crate::counters::{Counter, Counters};
use crate::data::{Column, ColumnOffsets, Row};
use crate::monitor::Core;
use crate::query::Query;

/// The `<name>` and `<name>_rate` columns bound to one counter. They read
/// the registry, not the row, so any table may carry them.
pub fn counter_columns(
    name: &str,
    description: &str,
    offsets: ColumnOffsets,
    counters: &Arc<Counters>,
    which: Counter,
) -> [Column; 2] {
    let total = Arc::clone(counters);
    let rate = Arc::clone(counters);
    [
        Column::int(name, description, offsets.clone(), move |row: Row<'_>| {
            (!row.is_default()).then(|| total.read(which) as i64)
        }),
        Column::double(
            format!("{}_rate", name),
            format!("The averaged rate of the {} counter per second", name),
            offsets,
            move |row: Row<'_>| (!row.is_default()).then(|| rate.rate(which)),
        ),
    ]
}

/// Singleton table describing the core process
pub struct StatusTable {
    core: Arc<Core>,
    columns: ColumnRegistry,
}

impl StatusTable {
    pub fn new(core: Arc<Core>, counters: Arc<Counters>) -> Self {
        let mut columns = ColumnRegistry::new();
        let own = ColumnOffsets::new();

        for which in Counter::ALL {
            for column in counter_columns(which.name(), which.description(), own.clone(), &counters, which) {
                columns.add(column);
            }
        }

        columns.add(Column::string(
            "program_version",
            "The version of the monitoring daemon",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.program_version.clone()),
        ));
        columns.add(Column::time(
            "program_start",
            "The time of the last program start (Unix timestamp)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.program_start.timestamp()),
        ));
        columns.add(Column::int(
            "nagios_pid",
            "The process ID of the monitoring core",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.pid),
        ));
        columns.add(Column::int(
            "interval_length",
            "The default interval length",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.interval_length),
        ));
        columns.add(Column::int(
            "enable_notifications",
            "Whether notifications are enabled in general (0/1)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.enable_notifications as i64),
        ));
        columns.add(Column::int(
            "execute_service_checks",
            "Whether active service checks are activated in general (0/1)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.execute_service_checks as i64),
        ));
        columns.add(Column::int(
            "execute_host_checks",
            "Whether host checks are executed in general (0/1)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.execute_host_checks as i64),
        ));
        columns.add(Column::int(
            "accept_passive_service_checks",
            "Whether passive service checks are activated in general (0/1)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.accept_passive_service_checks as i64),
        ));
        columns.add(Column::int(
            "accept_passive_host_checks",
            "Whether passive host checks are accepted in general (0/1)",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.program.accept_passive_host_checks as i64),
        ));
        columns.add(Column::int(
            "num_hosts",
            "The total number of hosts",
            own.clone(),
            |row: Row<'_>| row.program().map(|g| g.hosts.len() as i64),
        ));
        columns.add(Column::int(
            "num_services",
            "The total number of services",
            own,
            |row: Row<'_>| row.program().map(|g| g.services.len() as i64),
        ));

        Self { core, columns }
    }
}

impl Table for StatusTable {
    fn name(&self) -> &str {
        "status"
    }

    fn name_prefix(&self) -> &str {
        "status_"
    }

    fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    fn answer_query(&self, query: &mut Query, user: &dyn User) {
        let guard = self.core.read();
        answer_rows(query, user, [Row::Program(guard.graph())]);
    }
}
