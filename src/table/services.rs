use std::sync::Arc;

use super::hosts::{register_attribute_columns, register_check_columns, register_host_columns};
use super::{answer_rows, ColumnRegistry, Table, User};
use crate::data::offsets::service_host;
use crate::data::{Column, ColumnOffsets, Row};
use crate::monitor::{CheckStatus, Core};
use crate::query::Query;

fn service_check<'a>(row: Row<'a>) -> Option<&'a CheckStatus> {
    row.service().map(|s| &s.check)
}

pub struct ServicesTable {
    core: Arc<Core>,
    columns: ColumnRegistry,
}

impl ServicesTable {
    pub fn new(core: Arc<Core>) -> Self {
        let mut columns = ColumnRegistry::new();
        let own = ColumnOffsets::new();

        columns.add(Column::string(
            "description",
            "Service description",
            own.clone(),
            |row: Row<'_>| row.service().map(|s| s.description.clone()),
        ));
        columns.add(Column::string(
            "display_name",
            "Optional display name",
            own.clone(),
            |row: Row<'_>| row.service().map(|s| s.display_name.clone()),
        ));
        columns.add(Column::list(
            "contacts",
            "A list of all contacts of the service",
            own.clone(),
            |row: Row<'_>| row.service().map(|s| s.contacts.clone()),
        ));
        columns.add(Column::list(
            "groups",
            "A list of all service groups the service is in",
            own.clone(),
            |row: Row<'_>| row.service().map(|s| s.groups.clone()),
        ));
        register_check_columns(&mut columns, "", &own, service_check);
        register_attribute_columns(&mut columns, "", &own);

        let host = own.add(service_host);
        register_host_columns(&mut columns, "host_", host.clone());

        columns.add_attribute_source("", own);
        columns.add_attribute_source("host_", host);

        Self { core, columns }
    }
}

impl Table for ServicesTable {
    fn name(&self) -> &str {
        "services"
    }

    fn name_prefix(&self) -> &str {
        "service_"
    }

    fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    fn answer_query(&self, query: &mut Query, user: &dyn User) {
        let guard = self.core.read();
        answer_rows(query, user, guard.services.iter().map(|s| Row::Service(s)));
    }
}
