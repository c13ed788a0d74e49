//! Classification of dynamically named per-object attributes.
//!
//! Objects in the core carry a flat map of raw attribute names. A naming
//! convention splits that map into custom variables, tags, labels and label
//! sources, each of which is exposed as its own mapping column.

use std::collections::{BTreeMap, HashMap};

/// Raw per-object attributes, keyed by their full name
pub type Attributes = HashMap<String, String>;

const TAG_PREFIX: &str = "_TAG_";
const LABEL_PREFIX: &str = "_LABEL_";
const LABEL_SOURCE_PREFIX: &str = "_LABELSOURCE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    CustomVariables,
    Tags,
    Labels,
    LabelSources,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::CustomVariables,
        AttributeKind::Tags,
        AttributeKind::Labels,
        AttributeKind::LabelSources,
    ];

    /// Name of the mapping column exposing this kind
    pub fn column_name(&self) -> &'static str {
        match self {
            AttributeKind::CustomVariables => "custom_variables",
            AttributeKind::Tags => "tags",
            AttributeKind::Labels => "labels",
            AttributeKind::LabelSources => "label_sources",
        }
    }
}

/// Split a raw attribute name into its kind and lookup key.
///
/// Prefixes are tested from the most specific to the least specific, so a
/// `_LABELSOURCE_` name can never be taken for a label.
pub fn classify(name: &str) -> (AttributeKind, &str) {
    if let Some(key) = name.strip_prefix(TAG_PREFIX) {
        return (AttributeKind::Tags, key);
    }
    if let Some(key) = name.strip_prefix(LABEL_SOURCE_PREFIX) {
        return (AttributeKind::LabelSources, key);
    }
    if let Some(key) = name.strip_prefix(LABEL_PREFIX) {
        return (AttributeKind::Labels, key);
    }
    (AttributeKind::CustomVariables, name)
}

/// Project the raw attributes of an object onto one kind
pub fn attributes_of(kind: AttributeKind, raw: &Attributes) -> BTreeMap<String, String> {
    raw.iter()
        .filter_map(|(name, value)| {
            let (k, key) = classify(name);
            (k == kind).then(|| (key.to_string(), value.clone()))
        })
        .collect()
}

/// Look up a single key of one kind without building the whole mapping
pub fn attribute_value<'a>(kind: AttributeKind, key: &str, raw: &'a Attributes) -> Option<&'a str> {
    raw.iter()
        .find(|(name, _)| classify(name) == (kind, key))
        .map(|(_, value)| value.as_str())
}
