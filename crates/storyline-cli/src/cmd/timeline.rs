use crate::inputs::{load_series, load_table};
use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use storyline_core::action::Action;
use storyline_core::config::StoryConfig;
use storyline_core::timeline::{self, Timeline, TimelineEntry};

pub fn run(config: &StoryConfig, series_path: &Path, table_path: &Path, json: bool) -> anyhow::Result<()> {
    let series = load_series(series_path)?;
    let table = load_table(table_path)?;
    let timeline = timeline::build(&series, &table, config).context("failed to build timeline")?;

    if json {
        return print_json(&timeline);
    }
    print_timeline(&timeline);
    Ok(())
}

fn print_timeline(timeline: &Timeline) {
    if timeline.is_empty() {
        println!("Timeline is empty.");
        return;
    }
    let rows: Vec<Vec<String>> = timeline.iter().map(row).collect();
    print_table(&["DATE", "INDEX", "FEATURE", "ACTIONS"], rows);
}

fn row(entry: &TimelineEntry) -> Vec<String> {
    let actions: Vec<String> = entry
        .group
        .children()
        .iter()
        .map(|child| match child {
            Action::Mark(m) => m.kind().to_string(),
            Action::Group(_) => "group".to_string(),
        })
        .collect();
    vec![
        entry.timestamp.format("%Y-%m-%d").to_string(),
        entry.index.to_string(),
        entry
            .group
            .tag()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string()),
        actions.join(", "),
    ]
}
