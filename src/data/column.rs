use std::collections::BTreeMap;
use std::sync::Arc;

use super::attributes::{attribute_value, attributes_of, AttributeKind};
use super::offsets::ColumnOffsets;
use super::row::Row;
use super::value::{ColumnType, Value};

type Getter<T> = Arc<dyn for<'a> Fn(Row<'a>) -> Option<T> + Send + Sync>;

/// Typed extraction strategy, chosen once when the column is registered
#[derive(Clone)]
enum Extractor {
    Int(Getter<i64>),
    Double(Getter<f64>),
    String(Getter<String>),
    Time(Getter<i64>),
    List(Getter<Vec<String>>),
    Dict(Getter<BTreeMap<String, String>>),
    Blob(Getter<Vec<u8>>),
    /// Whole mapping of one attribute kind
    Attributes(AttributeKind),
    /// A single key of one attribute kind
    AttributeValue(AttributeKind, String),
}

/// A named, typed accessor from a row to a value
#[derive(Clone)]
pub struct Column {
    name: String,
    description: String,
    column_type: ColumnType,
    offsets: ColumnOffsets,
    extractor: Extractor,
}

impl Column {
    fn with_extractor(
        name: impl Into<String>,
        description: impl Into<String>,
        column_type: ColumnType,
        offsets: ColumnOffsets,
        extractor: Extractor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            column_type,
            offsets,
            extractor,
        }
    }

    pub fn int<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<i64> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::Int, offsets, Extractor::Int(Arc::new(f)))
    }

    pub fn double<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<f64> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::Double, offsets, Extractor::Double(Arc::new(f)))
    }

    pub fn string<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::String, offsets, Extractor::String(Arc::new(f)))
    }

    /// Time column; the getter returns seconds since the epoch
    pub fn time<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<i64> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::Time, offsets, Extractor::Time(Arc::new(f)))
    }

    pub fn list<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::List, offsets, Extractor::List(Arc::new(f)))
    }

    pub fn dict<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<BTreeMap<String, String>> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::Dict, offsets, Extractor::Dict(Arc::new(f)))
    }

    pub fn blob<F>(name: impl Into<String>, description: impl Into<String>, offsets: ColumnOffsets, f: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self::with_extractor(name, description, ColumnType::Blob, offsets, Extractor::Blob(Arc::new(f)))
    }

    /// Mapping column over one attribute kind of the object reached by `offsets`
    pub fn attributes(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        kind: AttributeKind,
    ) -> Self {
        Self::with_extractor(name, description, ColumnType::Dict, offsets, Extractor::Attributes(kind))
    }

    /// String pseudo-column bound to one attribute key
    pub fn attribute_value(
        name: impl Into<String>,
        description: impl Into<String>,
        offsets: ColumnOffsets,
        kind: AttributeKind,
        key: impl Into<String>,
    ) -> Self {
        Self::with_extractor(
            name,
            description,
            ColumnType::String,
            offsets,
            Extractor::AttributeValue(kind, key.into()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn offsets(&self) -> &ColumnOffsets {
        &self.offsets
    }

    /// The attribute binding of a pseudo-column, if any
    pub fn attribute_key(&self) -> Option<(AttributeKind, &str)> {
        match &self.extractor {
            Extractor::AttributeValue(kind, key) => Some((*kind, key.as_str())),
            _ => None,
        }
    }

    /// Read this column from a row. Never fails: anything that cannot be
    /// resolved yields the neutral value of the column's type.
    pub fn extract(&self, row: Row<'_>) -> Value {
        let Some(row) = self.offsets.resolve(row) else {
            return self.column_type.neutral();
        };

        let value = match &self.extractor {
            Extractor::Int(f) => f(row).map(Value::Int),
            Extractor::Double(f) => f(row).map(Value::Double),
            Extractor::String(f) => f(row).map(Value::String),
            Extractor::Time(f) => f(row).map(Value::Time),
            Extractor::List(f) => f(row).map(Value::List),
            Extractor::Dict(f) => f(row).map(Value::Dict),
            Extractor::Blob(f) => f(row).map(Value::Blob),
            Extractor::Attributes(kind) => row
                .attributes()
                .map(|raw| Value::Dict(attributes_of(*kind, raw))),
            Extractor::AttributeValue(kind, key) => row
                .attributes()
                .and_then(|raw| attribute_value(*kind, key, raw))
                .map(|v| Value::String(v.to_string())),
        };

        value.unwrap_or_else(|| self.column_type.neutral())
    }

    pub fn info(&self, table: &str) -> ColumnInfo {
        ColumnInfo {
            table: table.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            column_type: self.column_type,
        }
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("type", &self.column_type)
            .field("offsets", &self.offsets)
            .finish()
    }
}

/// Metadata about a registered column, exposed by the `columns` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    pub description: String,
    pub column_type: ColumnType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::offsets::service_host;
    use crate::monitor::{Host, Service};

    fn host_with_tag() -> Arc<Host> {
        let mut host = Host {
            name: "web01".into(),
            ..Default::default()
        };
        host.attributes.insert("_TAG_criticality".into(), "prod".into());
        host.attributes.insert("_LABEL_os".into(), "linux".into());
        host.check.state = 1;
        Arc::new(host)
    }

    fn state_column(offsets: ColumnOffsets) -> Column {
        Column::int("state", "Current state", offsets, |row: Row<'_>| {
            row.host().map(|h| h.check.state)
        })
    }

    #[test]
    fn test_extract_typed_value() {
        let host = host_with_tag();
        let column = state_column(ColumnOffsets::new());
        assert_eq!(column.extract(Row::Host(&host)), Value::Int(1));
        assert_eq!(column.column_type(), ColumnType::Int);
    }

    #[test]
    fn test_default_row_yields_neutral_values() {
        let columns = vec![
            state_column(ColumnOffsets::new()),
            Column::double("latency", "", ColumnOffsets::new(), |row: Row<'_>| {
                row.host().map(|h| h.check.latency)
            }),
            Column::string("name", "", ColumnOffsets::new(), |row: Row<'_>| {
                row.host().map(|h| h.name.clone())
            }),
            Column::list("contacts", "", ColumnOffsets::new(), |row: Row<'_>| {
                row.host().map(|h| h.contacts.clone())
            }),
            Column::attributes("tags", "", ColumnOffsets::new(), AttributeKind::Tags),
            Column::attribute_value("_TAG_x", "", ColumnOffsets::new(), AttributeKind::Tags, "x"),
            Column::blob("mk_inventory", "", ColumnOffsets::new(), |row: Row<'_>| {
                row.host().map(|h| h.inventory.clone())
            }),
        ];
        for column in &columns {
            let value = column.extract(Row::Default);
            assert_eq!(value.column_type(), column.column_type(), "{}", column.name());
            assert!(value.is_neutral(), "{}", column.name());
        }
    }

    #[test]
    fn test_attribute_value_column() {
        let host = host_with_tag();
        let column = Column::attribute_value(
            "_TAG_criticality",
            "",
            ColumnOffsets::new(),
            AttributeKind::Tags,
            "criticality",
        );
        assert_eq!(column.extract(Row::Host(&host)), Value::String("prod".into()));
        assert_eq!(column.attribute_key(), Some((AttributeKind::Tags, "criticality")));

        let missing = Column::attribute_value("_TAG_nope", "", ColumnOffsets::new(), AttributeKind::Tags, "nope");
        assert_eq!(missing.extract(Row::Host(&host)), Value::String(String::new()));
    }

    #[test]
    fn test_attributes_column_through_hop() {
        let host = host_with_tag();
        let service = Service {
            host: Arc::clone(&host),
            description: "HTTP".into(),
            display_name: String::new(),
            contacts: vec![],
            groups: vec![],
            attributes: Default::default(),
            check: Default::default(),
        };
        let column = Column::attributes(
            "host_labels",
            "",
            ColumnOffsets::new().add(service_host),
            AttributeKind::Labels,
        );
        let expected: BTreeMap<String, String> = [("os".to_string(), "linux".to_string())].into();
        assert_eq!(column.extract(Row::Service(&service)), Value::Dict(expected));
    }

    #[test]
    fn test_wrong_row_kind_degrades() {
        let column = state_column(ColumnOffsets::new().add(service_host));
        let host = host_with_tag();
        assert_eq!(column.extract(Row::Host(&host)), Value::Int(0));
    }
}
