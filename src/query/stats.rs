use std::sync::Arc;

use super::aggregates::{create_accumulator, Accumulator, AggregationKind, CountAccumulator};
use super::filter::Filter;
use crate::data::{Column, Row, Value};

/// One `Stats:` entry
#[derive(Debug, Clone)]
pub enum StatsColumn {
    /// Counts rows accepted by the embedded filter
    Count(Filter),
    Aggregate {
        kind: AggregationKind,
        column: Arc<Column>,
    },
}

impl StatsColumn {
    pub fn create_accumulator(&self) -> Box<dyn Accumulator> {
        match self {
            StatsColumn::Count(_) => Box::new(CountAccumulator::new()),
            StatsColumn::Aggregate { kind, .. } => create_accumulator(*kind),
        }
    }

    /// Fold a row the query filter already accepted
    pub fn update(&self, row: Row<'_>, acc: &mut dyn Accumulator) {
        match self {
            StatsColumn::Count(filter) => {
                if filter.accepts(row) {
                    acc.accumulate(&Value::Int(1));
                }
            }
            StatsColumn::Aggregate { column, .. } => acc.accumulate(&column.extract(row)),
        }
    }
}
