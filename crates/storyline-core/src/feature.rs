use crate::predicate::Attributed;
use crate::types::{FeatureKind, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A dated characteristic detected in a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub kind: FeatureKind,
    pub date: Timestamp,
    /// Index of `date` in the source series.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// Name of the measured field.
    pub metric: String,
    pub rank: u8,
    pub normalized_height: f64,
}

impl Feature {
    pub fn new(kind: FeatureKind, date: Timestamp, index: usize) -> Self {
        Self {
            kind,
            date,
            index,
            start: None,
            end: None,
            start_index: None,
            end_index: None,
            height: None,
            slope: None,
            metric: "y".to_string(),
            rank: 1,
            normalized_height: 0.0,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_range(mut self, start: (usize, Timestamp), end: (usize, Timestamp)) -> Self {
        self.start_index = Some(start.0);
        self.start = Some(start.1);
        self.end_index = Some(end.0);
        self.end = Some(end.1);
        self
    }

    /// Inclusive index range; point features span only themselves.
    pub fn span(&self) -> (usize, usize) {
        (
            self.start_index.unwrap_or(self.index),
            self.end_index.unwrap_or(self.index),
        )
    }

    pub fn overlaps(&self, other: &Feature) -> bool {
        let (a0, a1) = self.span();
        let (b0, b1) = other.span();
        a0 <= b1 && b0 <= a1
    }
}

impl Attributed for Feature {
    fn attribute(&self, name: &str) -> Option<Value> {
        let num = |v: f64| serde_json::Number::from_f64(v).map(Value::Number);
        match name {
            "height" => self.height.and_then(num),
            "slope" | "slope_value" => self.slope.and_then(num),
            "rank" => Some(Value::from(self.rank)),
            "normalized_height" => num(self.normalized_height),
            "index" => Some(Value::from(self.index)),
            "kind" | "type" => Some(Value::String(self.kind.as_str().to_string())),
            "metric" => Some(Value::String(self.metric.clone())),
            _ => None,
        }
    }
}
