use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// A single cell value produced by a column.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Double(f64),
    String(String),
    /// Seconds since the epoch
    Time(i64),
    List(Vec<String>),
    Dict(BTreeMap<String, String>),
    Blob(Vec<u8>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Double(_) => ColumnType::Double,
            Value::String(_) => ColumnType::String,
            Value::Time(_) => ColumnType::Time,
            Value::List(_) => ColumnType::List,
            Value::Dict(_) => ColumnType::Dict,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) | Value::Time(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// True if this is the neutral value of its type
    pub fn is_neutral(&self) -> bool {
        *self == self.column_type().neutral()
    }

    /// Get a numeric order for type comparison
    fn type_order(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Double(_) => 1,
            Value::Time(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Dict(_) => 5,
            Value::Blob(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(i) | Value::Time(i) => i.hash(state),
            Value::Double(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::List(l) => l.hash(state),
            Value::Dict(d) => d.hash(state),
            Value::Blob(b) => b.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Dict(a), Value::Dict(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            // Different types: order by type discriminant
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) | Value::Time(i) => write!(f, "{}", i),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "{}", items.join(",")),
            Value::Dict(map) => {
                let mut first = true;
                for (k, v) in map {
                    if !first {
                        write!(f, ",")?;
                    }
                    first = false;
                    write!(f, "{}|{}", k, v)?;
                }
                Ok(())
            }
            Value::Blob(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

/// The closed set of column value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Double,
    String,
    Time,
    List,
    Dict,
    Blob,
}

impl ColumnType {
    /// The value a column of this type yields when there is nothing to extract
    pub fn neutral(&self) -> Value {
        match self {
            ColumnType::Int => Value::Int(0),
            ColumnType::Double => Value::Double(0.0),
            ColumnType::String => Value::String(String::new()),
            ColumnType::Time => Value::Time(0),
            ColumnType::List => Value::List(Vec::new()),
            ColumnType::Dict => Value::Dict(BTreeMap::new()),
            ColumnType::Blob => Value::Blob(Vec::new()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Double | ColumnType::Time)
    }

    /// Name used by the `columns` table
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Double => "float",
            ColumnType::String => "string",
            ColumnType::Time => "time",
            ColumnType::List => "list",
            ColumnType::Dict => "dict",
            ColumnType::Blob => "blob",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
