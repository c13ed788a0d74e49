//! Queryable tables over the live objects of the core.

pub mod columns;
pub mod hosts;
pub mod log;
pub mod services;
pub mod status;

pub use columns::ColumnsTable;
pub use hosts::{register_host_columns, HostsTable};
pub use log::LogTable;
pub use services::ServicesTable;
pub use status::{counter_columns, StatusTable};

use fxhash::FxHashMap;
use std::sync::Arc;

use crate::data::{classify, Column, ColumnOffsets, Row};
use crate::query::Query;

/// Decides which rows a requesting user may see
pub trait User: Send + Sync {
    fn is_authorized(&self, row: Row<'_>) -> bool;
}

/// Sees every row
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthUser;

impl User for NoAuthUser {
    fn is_authorized(&self, _row: Row<'_>) -> bool {
        true
    }
}

/// A contact name, authorized for the objects listing it as a contact
#[derive(Debug, Clone)]
pub struct AuthUser {
    name: String,
}

impl AuthUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn is_contact(&self, contacts: &[String]) -> bool {
        contacts.iter().any(|c| *c == self.name)
    }
}

impl User for AuthUser {
    fn is_authorized(&self, row: Row<'_>) -> bool {
        match row {
            Row::Host(host) => self.is_contact(&host.contacts),
            // Host contacts see all services of the host
            Row::Service(service) => {
                self.is_contact(&service.contacts) || self.is_contact(&service.host.contacts)
            }
            Row::Log(entry) => match &entry.host {
                Some(host) => self.is_contact(&host.contacts),
                None => entry.host_name.is_empty(),
            },
            Row::Program(_) | Row::Column(_) | Row::Default => true,
        }
    }
}

/// Columns of one table in registration order, plus the attribute sources
/// used to build attribute pseudo-columns on demand
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<Arc<Column>>,
    index: FxHashMap<String, usize>,
    attribute_sources: Vec<(String, ColumnOffsets)>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a column. A column with the same name replaces the old one
    /// in place.
    pub fn add(&mut self, column: Column) {
        let column = Arc::new(column);
        match self.index.get(column.name()) {
            Some(&i) => self.columns[i] = column,
            None => {
                self.index.insert(column.name().to_string(), self.columns.len());
                self.columns.push(column);
            }
        }
    }

    /// Allow `<prefix>_<attribute>` pseudo-columns read through `offsets`
    pub fn add_attribute_source(&mut self, prefix: impl Into<String>, offsets: ColumnOffsets) {
        self.attribute_sources.push((prefix.into(), offsets));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Column>> {
        self.index.get(name).map(|&i| Arc::clone(&self.columns[i]))
    }

    pub fn all(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build a pseudo-column such as `_TAG_site` or `host__LABEL_os`
    pub fn attribute_column(&self, name: &str) -> Option<Column> {
        self.attribute_sources.iter().find_map(|(prefix, offsets)| {
            let attribute = name.strip_prefix(prefix.as_str())?;
            if attribute.len() < 2 || !attribute.starts_with('_') {
                return None;
            }
            let (kind, key) = classify(attribute);
            if key.is_empty() {
                return None;
            }
            Some(Column::attribute_value(
                name,
                format!("The {} entry '{}'", kind.column_name(), key),
                offsets.clone(),
                kind,
                key,
            ))
        })
    }
}

pub trait Table: Send + Sync {
    fn name(&self) -> &str;

    /// Prefix that may be put in front of any column name, e.g. `host_`
    fn name_prefix(&self) -> &str;

    fn columns(&self) -> &ColumnRegistry;

    /// Row for which every column yields its neutral value
    fn default_row(&self) -> Row<'static> {
        Row::Default
    }

    /// Feed every visible row to the query, stopping when it asks to
    fn answer_query(&self, query: &mut Query, user: &dyn User);

    /// Resolve a column name: exact match, then without the table prefix,
    /// then as an attribute pseudo-column
    fn column(&self, name: &str) -> Option<Arc<Column>> {
        let registry = self.columns();
        if let Some(column) = registry.get(name) {
            return Some(column);
        }
        let stripped = name.strip_prefix(self.name_prefix()).filter(|s| !s.is_empty());
        if let Some(column) = stripped.and_then(|s| registry.get(s)) {
            return Some(column);
        }
        registry
            .attribute_column(name)
            .or_else(|| stripped.and_then(|s| registry.attribute_column(s)))
            .map(Arc::new)
    }
}

/// Drive a query over rows borrowed from a held core guard
pub fn answer_rows<'a>(query: &mut Query, user: &dyn User, rows: impl IntoIterator<Item = Row<'a>>) {
    for row in rows {
        if !user.is_authorized(row) {
            continue;
        }
        if !query.process_dataset(row) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AttributeKind, Value};
    use crate::monitor::{Host, Service};

    fn host(name: &str, contacts: &[&str]) -> Arc<Host> {
        Arc::new(Host {
            name: name.into(),
            contacts: contacts.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        })
    }

    fn service(host: &Arc<Host>, contacts: &[&str]) -> Service {
        Service {
            host: Arc::clone(host),
            description: "PING".into(),
            display_name: String::new(),
            contacts: contacts.iter().map(|c| c.to_string()).collect(),
            groups: vec![],
            attributes: Default::default(),
            check: Default::default(),
        }
    }

    #[test]
    fn test_registry_order_and_replacement() {
        let mut registry = ColumnRegistry::new();
        registry.add(Column::int("a", "", ColumnOffsets::new(), |_row: Row<'_>| Some(1)));
        registry.add(Column::int("b", "", ColumnOffsets::new(), |_row: Row<'_>| Some(2)));
        registry.add(Column::string("a", "", ColumnOffsets::new(), |_row: Row<'_>| {
            Some("x".to_string())
        }));

        let names: Vec<_> = registry.all().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().extract(Row::Default), Value::String(String::new()));
    }

    #[test]
    fn test_attribute_column_resolution() {
        let mut registry = ColumnRegistry::new();
        registry.add_attribute_source("", ColumnOffsets::new());

        let column = registry.attribute_column("_TAG_criticality").unwrap();
        assert_eq!(column.attribute_key(), Some((AttributeKind::Tags, "criticality")));

        let column = registry.attribute_column("_CONTACT").unwrap();
        assert_eq!(
            column.attribute_key(),
            Some((AttributeKind::CustomVariables, "_CONTACT"))
        );

        assert!(registry.attribute_column("name").is_none());
        assert!(registry.attribute_column("_TAG_").is_none());
    }

    #[test]
    fn test_auth_user_visibility() {
        let h = host("web01", &["alice"]);
        let s = service(&h, &["bob"]);
        let alice = AuthUser::new("alice");
        let bob = AuthUser::new("bob");
        let carol = AuthUser::new("carol");

        assert!(alice.is_authorized(Row::Host(&h)));
        assert!(!bob.is_authorized(Row::Host(&h)));
        assert!(alice.is_authorized(Row::Service(&s)));
        assert!(bob.is_authorized(Row::Service(&s)));
        assert!(!carol.is_authorized(Row::Service(&s)));
        assert!(carol.is_authorized(Row::Default));
        assert!(NoAuthUser.is_authorized(Row::Host(&h)));
    }
}
