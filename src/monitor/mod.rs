//! In-memory model of the monitoring core the engine reads from.

pub mod graph;
pub mod objects;

pub use graph::{Core, CoreError, CoreGuard, ObjectGraph, Snapshot};
pub use objects::{
    CheckStatus, Host, LogClass, LogConfig, LogEntry, ProgramStatus, Service, ServiceConfig,
    StateType,
};
