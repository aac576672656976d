use crate::detect::BoundaryScan;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_peak_window")]
    pub peak_window: usize,
    #[serde(default = "default_slope_window")]
    pub slope_window: usize,
    /// Samples walked each way when bounding a peak.
    #[serde(default = "default_span")]
    pub span: usize,
    /// Deltas out of `span` that must trend toward the peak.
    #[serde(default = "default_majority")]
    pub majority: usize,
}

fn default_peak_window() -> usize {
    3
}

fn default_slope_window() -> usize {
    5
}

fn default_span() -> usize {
    BoundaryScan::default().span
}

fn default_majority() -> usize {
    BoundaryScan::default().majority
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            peak_window: default_peak_window(),
            slope_window: default_slope_window(),
            span: default_span(),
            majority: default_majority(),
        }
    }
}

impl DetectionConfig {
    pub fn scan(&self) -> BoundaryScan {
        BoundaryScan {
            span: self.span,
            majority: self.majority,
        }
    }
}

// ---------------------------------------------------------------------------
// PacingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause anchors inserted into the timeline; 0 disables pacing.
    #[serde(default)]
    pub anchors: usize,
    #[serde(default)]
    pub ignore_height: bool,
    /// Fixed Gaussian width in samples; unset derives it from amplitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Point field whose non-empty values feed the categorical envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorical_field: Option<String>,
}

// ---------------------------------------------------------------------------
// TemplateConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// strftime pattern for `${date}`.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub show_delay_ms: u64,
    #[serde(default = "default_show_duration")]
    pub show_duration_ms: u64,
    #[serde(default = "default_hide_delay")]
    pub hide_delay_ms: u64,
    #[serde(default = "default_hide_duration")]
    pub hide_duration_ms: u64,
    #[serde(default = "default_chart_width")]
    pub chart_width: f64,
    #[serde(default = "default_chart_height")]
    pub chart_height: f64,
}

fn default_show_duration() -> u64 {
    500
}

fn default_hide_delay() -> u64 {
    1500
}

fn default_hide_duration() -> u64 {
    500
}

fn default_chart_width() -> f64 {
    800.0
}

fn default_chart_height() -> f64 {
    400.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            show_delay_ms: 0,
            show_duration_ms: default_show_duration(),
            hide_delay_ms: default_hide_delay(),
            hide_duration_ms: default_hide_duration(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl PlaybackConfig {
    pub fn show_timing(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.show_delay_ms),
            Duration::from_millis(self.show_duration_ms),
        )
    }

    pub fn hide_timing(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.hide_delay_ms),
            Duration::from_millis(self.hide_duration_ms),
        )
    }

    /// Playback with every transition collapsed to zero time.
    pub fn instant() -> Self {
        Self {
            show_delay_ms: 0,
            show_duration_ms: 0,
            hide_delay_ms: 0,
            hide_duration_ms: 0,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// StoryConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl StoryConfig {
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let d = &self.detection;

        if d.peak_window < 3 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("detection.peak_window={} (must be at least 3)", d.peak_window),
            });
        }
        if d.slope_window < 2 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("detection.slope_window={} (must be at least 2)", d.slope_window),
            });
        }
        if d.span == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "detection.span=0 collapses every peak to a single sample".to_string(),
            });
        }
        if d.majority >= d.span && d.span > 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "detection.majority={} is not below span={}; any flat step ends the walk",
                    d.majority, d.span
                ),
            });
        }
        if let Some(w) = self.pacing.width {
            if w <= 0.0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("pacing.width={w} produces spikes instead of curves"),
                });
            }
        }
        if self.playback.chart_width <= 0.0 || self.playback.chart_height <= 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "playback chart dimensions must be positive".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = StoryConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed = StoryConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(StoryConfig::from_yaml("").unwrap(), StoryConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "detection:\n  slope_window: 9\npacing:\n  anchors: 3\n";
        let cfg = StoryConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.detection.slope_window, 9);
        assert_eq!(cfg.detection.peak_window, 3);
        assert_eq!(cfg.detection.span, 20);
        assert_eq!(cfg.detection.majority, 8);
        assert_eq!(cfg.pacing.anchors, 3);
        assert_eq!(cfg.template.date_format, "%-m/%-d/%Y");
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("story.yaml");
        let mut cfg = StoryConfig::default();
        cfg.pacing.categorical_field = Some("event".into());
        cfg.save(&path).unwrap();
        let loaded = StoryConfig::load(&path).unwrap();
        assert_eq!(loaded.pacing.categorical_field.as_deref(), Some("event"));
    }

    #[test]
    fn default_config_has_no_warnings() {
        assert!(StoryConfig::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_windows() {
        let mut cfg = StoryConfig::default();
        cfg.detection.peak_window = 2;
        cfg.detection.slope_window = 1;
        let warnings = cfg.validate();
        assert_eq!(
            warnings.iter().filter(|w| w.level == WarnLevel::Error).count(),
            2
        );
    }

    #[test]
    fn validate_flags_majority_not_below_span() {
        let mut cfg = StoryConfig::default();
        cfg.detection.majority = 20;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("majority")));
    }

    #[test]
    fn timings_convert_to_durations() {
        let cfg = PlaybackConfig::default();
        let (delay, duration) = cfg.hide_timing();
        assert_eq!(delay, Duration::from_millis(1500));
        assert_eq!(duration, Duration::from_millis(500));
    }
}
