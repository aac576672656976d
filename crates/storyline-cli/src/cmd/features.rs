use crate::inputs::load_series;
use crate::output::{format_metric, print_json, print_table};
use anyhow::Context;
use std::path::Path;
use storyline_core::config::StoryConfig;
use storyline_core::detect;
use storyline_core::feature::Feature;
use storyline_core::rank::normalize_height;
use storyline_core::types::FeatureKind;

pub fn run(
    config: &StoryConfig,
    series_path: &Path,
    kind: &str,
    window: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let kind: FeatureKind = kind
        .parse()
        .with_context(|| format!("unknown feature kind: {kind}"))?;
    let series = load_series(series_path)?;

    let mut features = detect::search(&series, kind, window, &config.detection)
        .with_context(|| format!("{kind} search failed"))?;
    normalize_height(&mut features);

    if json {
        return print_json(&features);
    }

    if features.is_empty() {
        println!("No {kind} features found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = features.iter().map(row).collect();
    print_table(
        &["INDEX", "DATE", kind.metric_attribute().to_uppercase().as_str(), "RANK", "RANGE"],
        rows,
    );
    Ok(())
}

fn row(f: &Feature) -> Vec<String> {
    let metric = match f.kind {
        FeatureKind::Slope => f.slope,
        _ => f.height,
    };
    let range = match (f.start_index, f.end_index) {
        (Some(a), Some(b)) => format!("{a}..={b}"),
        _ => String::new(),
    };
    vec![
        f.index.to_string(),
        f.date.format("%Y-%m-%d").to_string(),
        metric.map(format_metric).unwrap_or_default(),
        f.rank.to_string(),
        range,
    ]
}
