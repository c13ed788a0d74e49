use crate::data::Value;

/// Incremental aggregation state for one stats column
pub trait Accumulator: Send + Sync {
    /// Fold one value into the accumulator
    fn accumulate(&mut self, value: &Value);

    /// Get the final result
    fn result(&self) -> Value;
}

/// Number of rows folded in
#[derive(Debug, Clone, Default)]
pub struct CountAccumulator {
    count: i64,
}

impl CountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for CountAccumulator {
    fn accumulate(&mut self, _value: &Value) {
        self.count += 1;
    }

    fn result(&self) -> Value {
        Value::Int(self.count)
    }
}

/// Sum of values, or of their reciprocals when `inverse` is set
#[derive(Debug, Clone, Default)]
pub struct SumAccumulator {
    sum: f64,
    inverse: bool,
}

impl SumAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inverse() -> Self {
        Self {
            sum: 0.0,
            inverse: true,
        }
    }
}

impl Accumulator for SumAccumulator {
    fn accumulate(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            if !self.inverse {
                self.sum += v;
            } else if v != 0.0 {
                self.sum += 1.0 / v;
            }
        }
    }

    fn result(&self) -> Value {
        Value::Double(self.sum)
    }
}

/// Running mean and squared deviation (Welford)
#[derive(Debug, Clone, Copy, Default)]
struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Population variance
    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }
}

/// Arithmetic mean, or mean of reciprocals when `inverse` is set
#[derive(Debug, Clone, Default)]
pub struct AvgAccumulator {
    state: Welford,
    inverse: bool,
}

impl AvgAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inverse() -> Self {
        Self {
            state: Welford::default(),
            inverse: true,
        }
    }
}

impl Accumulator for AvgAccumulator {
    fn accumulate(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            if !self.inverse {
                self.state.push(v);
            } else if v != 0.0 {
                self.state.push(1.0 / v);
            }
        }
    }

    fn result(&self) -> Value {
        Value::Double(self.state.mean())
    }
}

/// Population standard deviation
#[derive(Debug, Clone, Default)]
pub struct StdAccumulator {
    state: Welford,
}

impl StdAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for StdAccumulator {
    fn accumulate(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.state.push(v);
        }
    }

    fn result(&self) -> Value {
        Value::Double(self.state.variance().sqrt())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MinAccumulator {
    min: Option<f64>,
}

impl MinAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for MinAccumulator {
    fn accumulate(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
        }
    }

    fn result(&self) -> Value {
        Value::Double(self.min.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaxAccumulator {
    max: Option<f64>,
}

impl MaxAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for MaxAccumulator {
    fn accumulate(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn result(&self) -> Value {
        Value::Double(self.max.unwrap_or(0.0))
    }
}

/// Aggregation named in a `Stats:` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    Sum,
    Min,
    Max,
    Avg,
    Std,
    SumInv,
    AvgInv,
}

impl AggregationKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "sum" => AggregationKind::Sum,
            "min" => AggregationKind::Min,
            "max" => AggregationKind::Max,
            "avg" => AggregationKind::Avg,
            "std" => AggregationKind::Std,
            "suminv" => AggregationKind::SumInv,
            "avginv" => AggregationKind::AvgInv,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
            AggregationKind::Avg => "avg",
            AggregationKind::Std => "std",
            AggregationKind::SumInv => "suminv",
            AggregationKind::AvgInv => "avginv",
        }
    }
}

pub fn create_accumulator(kind: AggregationKind) -> Box<dyn Accumulator> {
    match kind {
        AggregationKind::Sum => Box::new(SumAccumulator::new()),
        AggregationKind::SumInv => Box::new(SumAccumulator::inverse()),
        AggregationKind::Avg => Box::new(AvgAccumulator::new()),
        AggregationKind::AvgInv => Box::new(AvgAccumulator::inverse()),
        AggregationKind::Std => Box::new(StdAccumulator::new()),
        AggregationKind::Min => Box::new(MinAccumulator::new()),
        AggregationKind::Max => Box::new(MaxAccumulator::new()),
    }
}
