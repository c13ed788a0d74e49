//! Request dispatch over the registered tables.

pub mod engine;

pub use engine::{Store, StoreError};
