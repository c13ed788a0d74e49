use std::sync::Arc;

use super::{answer_rows, ColumnRegistry, Table, User};
use crate::data::{AttributeKind, Column, ColumnOffsets, Row};
use crate::monitor::{CheckStatus, Core};
use crate::query::Query;

/// Where a check-status column finds its [`CheckStatus`]
pub type CheckAccess = for<'a> fn(Row<'a>) -> Option<&'a CheckStatus>;

fn host_check<'a>(row: Row<'a>) -> Option<&'a CheckStatus> {
    row.host().map(|h| &h.check)
}

fn timestamp(t: Option<chrono::DateTime<chrono::Utc>>) -> i64 {
    t.map(|t| t.timestamp()).unwrap_or(0)
}

/// Columns describing the latest check result, shared by hosts and services
pub fn register_check_columns(
    registry: &mut ColumnRegistry,
    prefix: &str,
    offsets: &ColumnOffsets,
    check: CheckAccess,
) {
    let name = |n: &str| format!("{}{}", prefix, n);

    registry.add(Column::int(
        name("state"),
        "The current state of the object (0/1/2/3)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.state),
    ));
    registry.add(Column::int(
        name("state_type"),
        "Type of the current state (0: soft, 1: hard)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.state_type.as_i64()),
    ));
    registry.add(Column::int(
        name("has_been_checked"),
        "Whether a check has already been executed (0/1)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.has_been_checked as i64),
    ));
    registry.add(Column::int(
        name("current_attempt"),
        "Number of the current check attempt",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.current_attempt),
    ));
    registry.add(Column::int(
        name("max_check_attempts"),
        "Max check attempts for active checks before a hard state",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.max_check_attempts),
    ));
    registry.add(Column::time(
        name("last_check"),
        "Time of the last check (Unix timestamp)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| timestamp(c.last_check)),
    ));
    registry.add(Column::time(
        name("next_check"),
        "Scheduled time for the next check (Unix timestamp)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| timestamp(c.next_check)),
    ));
    registry.add(Column::time(
        name("last_state_change"),
        "Time of the last state change (Unix timestamp)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| timestamp(c.last_state_change)),
    ));
    registry.add(Column::double(
        name("latency"),
        "Time difference between scheduled check time and actual check time",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.latency),
    ));
    registry.add(Column::double(
        name("execution_time"),
        "Time the check needed for execution",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.execution_time),
    ));
    registry.add(Column::string(
        name("plugin_output"),
        "Output of the last check",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.plugin_output.clone()),
    ));
    registry.add(Column::string(
        name("long_plugin_output"),
        "Long (extra) output of the last check",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.long_plugin_output.clone()),
    ));
    registry.add(Column::string(
        name("perf_data"),
        "Optional performance data of the last check",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.perf_data.clone()),
    ));
    registry.add(Column::int(
        name("acknowledged"),
        "Whether the current problem has been acknowledged (0/1)",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.acknowledged as i64),
    ));
    registry.add(Column::int(
        name("scheduled_downtime_depth"),
        "The number of downtimes this object is currently in",
        offsets.clone(),
        move |row: Row<'_>| check(row).map(|c| c.scheduled_downtime_depth),
    ));
}

/// The four attribute mapping columns of an object
pub fn register_attribute_columns(registry: &mut ColumnRegistry, prefix: &str, offsets: &ColumnOffsets) {
    for kind in AttributeKind::ALL {
        registry.add(Column::attributes(
            format!("{}{}", prefix, kind.column_name()),
            format!("A dictionary of the {}", kind.column_name().replace('_', " ")),
            offsets.clone(),
            kind,
        ));
    }
}

/// Every host column, named `<prefix><column>` and read through `offsets`.
/// Tables that reach a host from their own rows reuse this with a hop.
pub fn register_host_columns(registry: &mut ColumnRegistry, prefix: &str, offsets: ColumnOffsets) {
    let name = |n: &str| format!("{}{}", prefix, n);

    registry.add(Column::string(
        name("name"),
        "Host name",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.name.clone()),
    ));
    registry.add(Column::string(
        name("display_name"),
        "Optional display name",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.display_name.clone()),
    ));
    registry.add(Column::string(
        name("alias"),
        "An alias name for the host",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.alias.clone()),
    ));
    registry.add(Column::string(
        name("address"),
        "IP address",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.address.clone()),
    ));
    registry.add(Column::list(
        name("contacts"),
        "A list of all contacts of this host",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.contacts.clone()),
    ));
    registry.add(Column::list(
        name("groups"),
        "A list of all host groups this host is in",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.groups.clone()),
    ));
    registry.add(Column::list(
        name("services"),
        "A list of all services of the host",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.services.clone()),
    ));
    registry.add(Column::int(
        name("num_services"),
        "The total number of services of the host",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.services.len() as i64),
    ));
    registry.add(Column::blob(
        name("mk_inventory"),
        "The inventory data of the host",
        offsets.clone(),
        |row: Row<'_>| row.host().map(|h| h.inventory.clone()),
    ));

    register_check_columns(registry, prefix, &offsets, host_check);
    register_attribute_columns(registry, prefix, &offsets);
}

pub struct HostsTable {
    core: Arc<Core>,
    columns: ColumnRegistry,
}

impl HostsTable {
    pub fn new(core: Arc<Core>) -> Self {
        let mut columns = ColumnRegistry::new();
        register_host_columns(&mut columns, "", ColumnOffsets::new());
        columns.add_attribute_source("", ColumnOffsets::new());
        Self { core, columns }
    }
}

impl Table for HostsTable {
    fn name(&self) -> &str {
        "hosts"
    }

    fn name_prefix(&self) -> &str {
        "host_"
    }

    fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    fn answer_query(&self, query: &mut Query, user: &dyn User) {
        let guard = self.core.read();
        answer_rows(query, user, guard.hosts.iter().map(|h| Row::Host(h)));
    }
}
