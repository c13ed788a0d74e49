pub mod attributes;
pub mod column;
pub mod offsets;
pub mod row;
pub mod value;

pub use attributes::{attribute_value, attributes_of, classify, AttributeKind, Attributes};
pub use column::{Column, ColumnInfo};
pub use offsets::{ColumnOffsets, Hop};
pub use row::Row;
pub use value::{ColumnType, Value};
