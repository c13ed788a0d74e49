//! Periscope: live-status query engine for a monitoring core
//!
//! An embedded, read-only query engine that exposes the live state of a
//! monitoring core (hosts, services, log entries, process status) through a
//! line-oriented query protocol on a Unix socket.
//!
//! # Features
//!
//! - **Typed Columns**: Each column extracts a value of one fixed type, navigating to related objects through offset hops
//! - **Attribute Columns**: Custom variables, tags, labels and label sources as mappings or single-key pseudo-columns
//! - **Filters**: Type-aware operators combined with `And:`, `Or:` and `Negate:`
//! - **Stats**: count, sum, min, max, avg, std, suminv, avginv, optionally grouped
//! - **Counters**: Lock-free process counters with smoothed rates
//! - **Output**: csv, CSV, json and python, with optional `fixed16` response headers
//!
//! # Example
//!
//! ```no_run
//! use periscope::counters::Counters;
//! use periscope::monitor::Core;
//! use periscope::store::Store;
//! use std::sync::Arc;
//!
//! let core = Arc::new(Core::load("objects.json").unwrap());
//! let store = Store::new(core, Arc::new(Counters::new()));
//!
//! let response = store.answer_request("GET hosts\nColumns: name state\nFilter: state > 0\n");
//! print!("{}", response.render());
//! ```

pub mod api;
pub mod counters;
pub mod data;
pub mod monitor;
pub mod output;
pub mod query;
pub mod store;
pub mod table;

// Re-export commonly used types
pub use counters::{Counter, Counters};
pub use data::{Column, ColumnType, Row, Value};
pub use monitor::Core;
pub use query::{Query, QueryError, QueryResult};
pub use store::{Store, StoreError};
pub use table::{Table, User};
