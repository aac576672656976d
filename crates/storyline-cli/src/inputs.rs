use anyhow::Context;
use std::path::{Path, PathBuf};
use storyline_core::config::{StoryConfig, WarnLevel};
use storyline_core::table::FeatureActionTable;
use storyline_core::types::Series;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "storyline.yaml";

/// Resolve which config file to read.
///
/// Priority:
/// 1. `--config` flag / `STORYLINE_CONFIG` env var (passed in as `explicit`)
/// 2. `storyline.yaml` in `cwd`
/// 3. None (built-in defaults)
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let candidate = cwd.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<StoryConfig> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let Some(path) = resolve_config_path(explicit, &cwd) else {
        return Ok(StoryConfig::default());
    };
    let config = StoryConfig::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!(config = %path.display(), "{}", w.message),
            WarnLevel::Error => tracing::error!(config = %path.display(), "{}", w.message),
        }
    }
    Ok(config)
}

pub fn load_series(path: &Path) -> anyhow::Result<Series> {
    Series::load_json(path).with_context(|| format!("failed to load series {}", path.display()))
}

pub fn load_table(path: &Path) -> anyhow::Result<FeatureActionTable> {
    FeatureActionTable::load(path)
        .with_context(|| format!("failed to load feature-action table {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_config_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "").unwrap();
        let explicit = dir.path().join("other.yaml");
        assert_eq!(
            resolve_config_path(Some(&explicit), dir.path()),
            Some(explicit.clone())
        );
    }

    #[test]
    fn finds_config_in_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "pacing:\n  anchors: 2\n").unwrap();
        assert_eq!(
            resolve_config_path(None, dir.path()),
            Some(dir.path().join(DEFAULT_CONFIG_FILE))
        );
    }

    #[test]
    fn no_config_means_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_config_path(None, dir.path()), None);
    }

    #[test]
    fn missing_series_reports_path() {
        let err = load_series(Path::new("/nonexistent/series.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/series.json"));
    }
}
