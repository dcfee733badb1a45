//! Measurement Records
//!
//! Immutable sensor readings produced by the trace source. Each
//! measurement carries a monotonically assigned index and an ordered
//! column -> value map.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed column value. Absent fields are simply not present in
/// the measurement's map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Anything that did not parse as a number
    Text(String),
}

impl Value {
    /// Numeric view of the value. Text is parsed after `,` -> `.`
    /// normalization; non-numeric text yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.replace(',', ".").parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Immutable measurement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    index: u64,
    values: Vec<(String, Value)>,
}

impl Measurement {
    /// Create a measurement from a 0-based index and its column values,
    /// in column order.
    pub fn new(index: u64, values: Vec<(String, Value)>) -> Self {
        Self { index, values }
    }

    /// 0-based position of this measurement in the trace.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// 1-based number (m1, m2, m3, ...), for display only.
    pub fn measurement_number(&self) -> u64 {
        self.index + 1
    }

    /// Value of the given column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Numeric value of the given column, if present and numeric.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    /// Column names, in trace order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// All column/value pairs, in trace order.
    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}: {{", self.measurement_number())?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement::new(
            2,
            vec![
                ("t".to_string(), Value::Float(1.5)),
                ("v".to_string(), Value::Int(42)),
                ("label".to_string(), Value::Text("warmup".to_string())),
            ],
        )
    }

    #[test]
    fn test_get_present_and_absent() {
        let m = sample();
        assert_eq!(m.get("v"), Some(&Value::Int(42)));
        assert_eq!(m.get("missing"), None);
    }

    #[test]
    fn test_numeric_view() {
        let m = sample();
        assert_eq!(m.get_f64("t"), Some(1.5));
        assert_eq!(m.get_f64("v"), Some(42.0));
        assert_eq!(m.get_f64("label"), None);
    }

    #[test]
    fn test_text_with_comma_decimal_parses() {
        let v = Value::Text("3,25".to_string());
        assert_eq!(v.as_f64(), Some(3.25));
    }

    #[test]
    fn test_measurement_number_is_one_based() {
        assert_eq!(sample().measurement_number(), 3);
        assert_eq!(Measurement::new(0, Vec::new()).measurement_number(), 1);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(sample().to_string(), "m3: {t=1.5, v=42, label=warmup}");
    }
}
