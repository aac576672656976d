use crate::error::{Result, StoryError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

pub type Timestamp = DateTime<Utc>;

/// JSON object used for action properties and extra point fields.
pub type Properties = Map<String, Value>;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: Timestamp,
    pub y: f64,
    #[serde(flatten)]
    pub fields: Properties,
}

impl Point {
    pub fn new(date: Timestamp, y: f64) -> Self {
        Self {
            date,
            y,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw field value; `y` and `date` are addressable like any other field.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "y" => serde_json::Number::from_f64(self.y).map(Value::Number),
            "date" => Some(Value::String(self.date.to_rfc3339())),
            _ => self.fields.get(name).cloned(),
        }
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_timestamp<'de, D>(d: D) -> std::result::Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> std::result::Result<Timestamp, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("unrecognized date '{raw}'"))
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Points ordered by strictly increasing date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if let Some(w) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(StoryError::InvalidSeries(format!(
                "dates must be strictly increasing ({} then {})",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { points })
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn index_of(&self, date: Timestamp) -> Option<usize> {
        self.points.binary_search_by(|p| p.date.cmp(&date)).ok()
    }

    pub fn point_at(&self, date: Timestamp) -> Option<&Point> {
        self.index_of(date).map(|i| &self.points[i])
    }

    pub fn date_at(&self, index: usize) -> Option<Timestamp> {
        self.points.get(index).map(|p| p.date)
    }
}

impl TryFrom<Vec<Point>> for Series {
    type Error = StoryError;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Series::new(points)
    }
}

impl From<Series> for Vec<Point> {
    fn from(series: Series) -> Self {
        series.points
    }
}

// ---------------------------------------------------------------------------
// FeatureKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Peak,
    Slope,
    Max,
    Min,
    Current,
    Last,
    First,
}

impl FeatureKind {
    pub fn all() -> &'static [FeatureKind] {
        &[
            FeatureKind::Peak,
            FeatureKind::Slope,
            FeatureKind::Max,
            FeatureKind::Min,
            FeatureKind::Current,
            FeatureKind::Last,
            FeatureKind::First,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Peak => "peak",
            FeatureKind::Slope => "slope",
            FeatureKind::Max => "max",
            FeatureKind::Min => "min",
            FeatureKind::Current => "current",
            FeatureKind::Last => "last",
            FeatureKind::First => "first",
        }
    }

    /// Attribute a row condition is evaluated against.
    pub fn metric_attribute(self) -> &'static str {
        match self {
            FeatureKind::Slope => "slope",
            _ => "height",
        }
    }

    pub fn is_windowed(self) -> bool {
        matches!(self, FeatureKind::Peak | FeatureKind::Slope)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureKind {
    type Err = StoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peak" => Ok(FeatureKind::Peak),
            "slope" => Ok(FeatureKind::Slope),
            "max" | "maximum" => Ok(FeatureKind::Max),
            "min" | "minimum" => Ok(FeatureKind::Min),
            "current" => Ok(FeatureKind::Current),
            "last" => Ok(FeatureKind::Last),
            "first" => Ok(FeatureKind::First),
            _ => Err(StoryError::UnknownFeatureType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Dot,
    Circle,
    TextBox,
    Connector,
    Pause,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Dot => "dot",
            ActionKind::Circle => "circle",
            ActionKind::TextBox => "text_box",
            ActionKind::Connector => "connector",
            ActionKind::Pause => "pause",
        }
    }

    /// Stacking order inside a group: markers beneath callouts beneath connectors.
    pub fn z_order(self) -> u8 {
        match self {
            ActionKind::Dot | ActionKind::Circle => 0,
            ActionKind::TextBox => 1,
            ActionKind::Connector => 2,
            ActionKind::Pause => 3,
        }
    }

    pub fn supports_move(self) -> bool {
        matches!(self, ActionKind::TextBox)
    }

    pub fn has_node(self) -> bool {
        !matches!(self, ActionKind::Pause)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = StoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" => Ok(ActionKind::Dot),
            "circle" => Ok(ActionKind::Circle),
            "text_box" | "textbox" | "text-box" => Ok(ActionKind::TextBox),
            "connector" => Ok(ActionKind::Connector),
            "pause" => Ok(ActionKind::Pause),
            _ => Err(StoryError::UnknownActionType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
