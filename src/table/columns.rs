use parking_lot::RwLock;

use super::{answer_rows, ColumnRegistry, Table, User};
use crate::data::{Column, ColumnInfo, ColumnOffsets, Row};
use crate::query::Query;

/// Metadata about the columns of every registered table
pub struct ColumnsTable {
    infos: RwLock<Vec<ColumnInfo>>,
    columns: ColumnRegistry,
}

impl ColumnsTable {
    pub fn new() -> Self {
        let mut columns = ColumnRegistry::new();
        let own = ColumnOffsets::new();

        columns.add(Column::string(
            "table",
            "The name of the table",
            own.clone(),
            |row: Row<'_>| row.column().map(|c| c.table.clone()),
        ));
        columns.add(Column::string(
            "name",
            "The name of the column within the table",
            own.clone(),
            |row: Row<'_>| row.column().map(|c| c.name.clone()),
        ));
        columns.add(Column::string(
            "type",
            "The data type of the column (int, float, string, time, list, dict, blob)",
            own.clone(),
            |row: Row<'_>| row.column().map(|c| c.column_type.name().to_string()),
        ));
        columns.add(Column::string(
            "description",
            "A description of the column",
            own,
            |row: Row<'_>| row.column().map(|c| c.description.clone()),
        ));

        Self {
            infos: RwLock::new(Vec::new()),
            columns,
        }
    }

    /// Record the static columns of a table
    pub fn add_table(&self, table: &dyn Table) {
        let mut infos = self.infos.write();
        infos.retain(|info| info.table != table.name());
        infos.extend(table.columns().all().iter().map(|c| c.info(table.name())));
    }
}

impl Default for ColumnsTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for ColumnsTable {
    fn name(&self) -> &str {
        "columns"
    }

    fn name_prefix(&self) -> &str {
        "column_"
    }

    fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    fn answer_query(&self, query: &mut Query, user: &dyn User) {
        let infos = self.infos.read();
        answer_rows(query, user, infos.iter().map(Row::Column));
    }
}
