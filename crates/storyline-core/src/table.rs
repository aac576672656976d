//! The declarative feature-to-action table.
//!
//! Feature and action names stay raw strings here; the timeline builder
//! decides what to do with names it does not recognise.

use crate::error::Result;
use crate::predicate::Condition;
use crate::types::Properties;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub action: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureActionRow {
    pub feature: String,
    /// Condition on the feature's metric attribute.
    #[serde(default)]
    pub properties: Condition,
    /// Minimum feature rank; 0 keeps every occurrence.
    #[serde(default)]
    pub rank: u32,
    /// Search window for peak and slope rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureActionTable {
    pub rows: Vec<FeatureActionRow>,
}

impl FeatureActionTable {
    pub fn new(rows: Vec<FeatureActionRow>) -> Self {
        Self { rows }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Loads `.yaml`/`.yml` as YAML and anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&data),
            _ => Self::from_json(&data),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureActionRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
