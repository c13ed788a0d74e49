use super::attributes::Attributes;
use super::column::ColumnInfo;
use crate::monitor::{Host, LogEntry, ObjectGraph, Service};

/// A handle to one live object, borrowed from the core guard it was created
/// under. Being a plain borrow, a `Row` cannot escape the iteration window.
#[derive(Debug, Clone, Copy)]
pub enum Row<'a> {
    Host(&'a Host),
    Service(&'a Service),
    Log(&'a LogEntry),
    /// The singleton status row stands for the core as a whole
    Program(&'a ObjectGraph),
    Column(&'a ColumnInfo),
    /// Sentinel for which every column yields its neutral value
    Default,
}

impl<'a> Row<'a> {
    pub fn host(&self) -> Option<&'a Host> {
        match *self {
            Row::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn service(&self) -> Option<&'a Service> {
        match *self {
            Row::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn log(&self) -> Option<&'a LogEntry> {
        match *self {
            Row::Log(l) => Some(l),
            _ => None,
        }
    }

    pub fn program(&self) -> Option<&'a ObjectGraph> {
        match *self {
            Row::Program(g) => Some(g),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<&'a ColumnInfo> {
        match *self {
            Row::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Raw attributes of the object, for kinds that carry them
    pub fn attributes(&self) -> Option<&'a Attributes> {
        match *self {
            Row::Host(h) => Some(&h.attributes),
            Row::Service(s) => Some(&s.attributes),
            _ => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Row::Default)
    }
}
