//! Fuses detected features with the action table into a chronological
//! timeline.

use crate::action::{Action, Animate, Group};
use crate::config::{PacingConfig, StoryConfig};
use crate::detect;
use crate::error::{Result, StoryError};
use crate::feature::Feature;
use crate::predicate::compile;
use crate::rank::{
    categorical_envelope, combined_envelope, envelope_peaks, importance_envelope,
    normalize_height, select_pacing,
};
use crate::table::{FeatureActionRow, FeatureActionTable};
use crate::template::render_properties;
use crate::types::{FeatureKind, Point, Series, Timestamp};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub timestamp: Timestamp,
    /// Index of `timestamp` in the series.
    pub index: usize,
    pub group: Group,
}

/// Entries ordered by non-decreasing timestamp.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }
}

/// Builds the timeline for `series` from `table`.
///
/// Unknown feature or action names are logged and skipped. A window that does
/// not fit the series is an error.
pub fn build(series: &Series, table: &FeatureActionTable, config: &StoryConfig) -> Result<Timeline> {
    let mut entries = Vec::new();
    let mut placed: Vec<Feature> = Vec::new();

    for (row_index, row) in table.iter().enumerate() {
        let kind: FeatureKind = match row.feature.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(row = row_index, feature = %row.feature, error = %e, "skipping row");
                continue;
            }
        };

        for feature in matching_features(series, kind, row, config)? {
            let Some(point) = series.point_at(feature.date) else {
                let e = StoryError::PointNotFound(feature.date.to_rfc3339());
                tracing::warn!(row = row_index, error = %e, "skipping occurrence");
                continue;
            };

            let group = instantiate(row, row_index, kind, point, config);
            if group.is_empty() {
                tracing::debug!(row = row_index, date = %feature.date, "no action could be built; occurrence dropped");
                continue;
            }
            entries.push(TimelineEntry {
                timestamp: feature.date,
                index: feature.index,
                group,
            });
            placed.push(feature);
        }
    }

    entries.sort_by_key(|e| e.timestamp);

    if config.pacing.anchors > 0 {
        insert_pauses(&mut entries, series, &placed, &config.pacing);
    }

    tracing::debug!(entries = entries.len(), rows = table.len(), "timeline built");
    Ok(Timeline { entries })
}

/// Detected, normalized and filtered occurrences for one row.
fn matching_features(
    series: &Series,
    kind: FeatureKind,
    row: &FeatureActionRow,
    config: &StoryConfig,
) -> Result<Vec<Feature>> {
    let predicate = compile(&row.properties, kind.metric_attribute());
    let mut features = detect::search(series, kind, row.window, &config.detection)?;
    normalize_height(&mut features);
    Ok(predicate
        .filter(features)
        .into_iter()
        .filter(|f| row.rank == 0 || u32::from(f.rank) >= row.rank)
        .collect())
}

fn instantiate(
    row: &FeatureActionRow,
    row_index: usize,
    kind: FeatureKind,
    point: &Point,
    config: &StoryConfig,
) -> Group {
    let mut group = Group::new(Some(kind), Vec::with_capacity(row.actions.len()));
    for spec in &row.actions {
        match Action::from_spec(spec) {
            Ok(mut action) => {
                action.set_props(render_properties(
                    &spec.properties,
                    point,
                    &config.template.date_format,
                ));
                group.push(action);
            }
            Err(e) => {
                tracing::warn!(row = row_index, action = %spec.action, error = %e, "skipping action");
            }
        }
    }
    group
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

fn insert_pauses(
    entries: &mut Vec<TimelineEntry>,
    series: &Series,
    features: &[Feature],
    pacing: &PacingConfig,
) {
    let mut env = importance_envelope(series.len(), features, pacing.width);
    if let Some(field) = &pacing.categorical_field {
        let categorical = categorical_envelope(series, field, pacing.width);
        if categorical.iter().any(|v| *v > 0.0) {
            env = combined_envelope(&env, &categorical);
        }
    }

    let order = select_pacing(&envelope_peaks(&env), series.len(), pacing.ignore_height);
    for anchor in order.iter().take(pacing.anchors) {
        let Some(timestamp) = series.date_at(anchor.index) else {
            continue;
        };
        let pause = TimelineEntry {
            timestamp,
            index: anchor.index,
            group: Group::pause(),
        };
        match entries.iter().position(|e| e.timestamp == timestamp) {
            Some(pos) => entries.insert(pos, pause),
            None => entries.push(pause),
        }
        tracing::debug!(index = anchor.index, height = anchor.height, "pause anchor");
    }

    entries.sort_by_key(|e| e.timestamp);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn t(i: usize) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    fn series(ys: &[f64]) -> Series {
        Series::new(
            ys.iter()
                .enumerate()
                .map(|(i, y)| Point::new(t(i), *y))
                .collect(),
        )
        .unwrap()
    }

    fn table(v: serde_json::Value) -> FeatureActionTable {
        serde_json::from_value(v).unwrap()
    }

    fn kinds(entry: &TimelineEntry) -> Vec<Option<ActionKind>> {
        entry.group.children().iter().map(Action::kind).collect()
    }

    #[test]
    fn peak_row_yields_one_grouped_entry() {
        let s = series(&[10.0, 50.0, 10.0]);
        let tbl = table(json!([{
            "feature": "Peak",
            "actions": [
                {"action": "Dot"},
                {"action": "TextBox", "properties": {"text": "${date}: ${y}"}}
            ]
        }]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert_eq!(tl.len(), 1);
        let entry = &tl.entries()[0];
        assert_eq!(entry.timestamp, t(1));
        assert_eq!(entry.index, 1);
        assert_eq!(entry.group.tag(), Some(FeatureKind::Peak));
        assert_eq!(
            kinds(entry),
            vec![Some(ActionKind::Dot), Some(ActionKind::TextBox)]
        );
        let Action::Mark(text) = &entry.group.children()[1] else {
            panic!("expected mark")
        };
        assert_eq!(text.props()["text"], json!("3/2/2024: 50"));
    }

    #[test]
    fn entries_sorted_across_rows() {
        let s = series(&[1.0, 5.0, 2.0, 8.0, 3.0]);
        let tbl = table(json!([
            {"feature": "Last", "actions": [{"action": "Circle"}]},
            {"feature": "First", "actions": [{"action": "Dot"}]},
            {"feature": "Max", "actions": [{"action": "TextBox"}]}
        ]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert!(tl.is_sorted());
        let indices: Vec<usize> = tl.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 3, 4]);
    }

    #[test]
    fn unknown_feature_row_is_skipped() {
        let s = series(&[1.0, 2.0, 3.0]);
        let tbl = table(json!([
            {"feature": "Valley", "actions": [{"action": "Dot"}]},
            {"feature": "Last", "actions": [{"action": "Dot"}]}
        ]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.entries()[0].group.tag(), Some(FeatureKind::Last));
    }

    #[test]
    fn unknown_action_is_skipped_and_empty_groups_dropped() {
        let s = series(&[1.0, 2.0, 3.0]);
        let tbl = table(json!([
            {"feature": "First", "actions": [{"action": "Laser"}, {"action": "Dot"}]},
            {"feature": "Last", "actions": [{"action": "Laser"}]}
        ]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert_eq!(tl.len(), 1);
        assert_eq!(kinds(&tl.entries()[0]), vec![Some(ActionKind::Dot)]);
    }

    #[test]
    fn condition_filters_on_metric() {
        // Slopes over a window of 2: +1, +1, -5, each placed on the window's
        // upper sample.
        let s = series(&[0.0, 1.0, 2.0, -3.0]);
        let tbl = table(json!([{
            "feature": "Slope",
            "window": 2,
            "properties": {"lt": 0},
            "actions": [{"action": "Connector"}]
        }]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.entries()[0].index, 3);
    }

    #[test]
    fn rank_is_a_minimum() {
        // Two separated peaks, the second much taller; the bump at 3 overlaps
        // both and is dropped.
        let s = series(&[0.0, 5.0, 0.0, 1.0, 0.0, 40.0, 0.0]);
        let row = |rank: u32| {
            table(json!([{
                "feature": "Peak",
                "rank": rank,
                "actions": [{"action": "Dot"}]
            }]))
        };
        let all = build(&s, &row(0), &StoryConfig::default()).unwrap();
        assert_eq!(all.len(), 2);
        let top = build(&s, &row(10), &StoryConfig::default()).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top.entries()[0].index, 5);
    }

    #[test]
    fn oversized_window_is_fatal() {
        let s = series(&[1.0, 2.0, 1.0]);
        let tbl = table(json!([{
            "feature": "Peak",
            "window": 10,
            "actions": [{"action": "Dot"}]
        }]));
        assert!(matches!(
            build(&s, &tbl, &StoryConfig::default()),
            Err(StoryError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn pause_inserted_before_matching_entry() {
        let s = series(&[10.0, 50.0, 10.0]);
        let tbl = table(json!([{"feature": "Peak", "actions": [{"action": "Dot"}]}]));
        let mut cfg = StoryConfig::default();
        cfg.pacing.anchors = 1;
        let tl = build(&s, &tbl, &cfg).unwrap();
        assert_eq!(tl.len(), 2);
        assert!(tl.entries()[0].group.contains_pause());
        assert_eq!(tl.entries()[0].timestamp, t(1));
        assert_eq!(kinds(&tl.entries()[1]), vec![Some(ActionKind::Dot)]);
    }

    #[test]
    fn pause_synthesized_from_categorical_field() {
        let points: Vec<Point> = (0..8)
            .map(|i| {
                let p = Point::new(t(i), 1.0);
                if i == 3 {
                    p.with_field("event", "launch")
                } else {
                    p
                }
            })
            .collect();
        let s = Series::new(points).unwrap();
        let tbl = table(json!([{"feature": "Last", "actions": [{"action": "Dot"}]}]));
        let mut cfg = StoryConfig::default();
        cfg.pacing.anchors = 2;
        cfg.pacing.width = Some(1.0);
        cfg.pacing.categorical_field = Some("event".into());

        let tl = build(&s, &tbl, &cfg).unwrap();
        assert!(tl.is_sorted());
        let layout: Vec<(usize, bool)> = tl
            .iter()
            .map(|e| (e.index, e.group.contains_pause()))
            .collect();
        assert_eq!(layout, vec![(3, true), (7, true), (7, false)]);
    }

    #[test]
    fn no_pacing_without_anchors() {
        let s = series(&[10.0, 50.0, 10.0]);
        let tbl = table(json!([{"feature": "Peak", "actions": [{"action": "Dot"}]}]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        assert!(tl.iter().all(|e| !e.group.contains_pause()));
    }

    #[test]
    fn timeline_serializes_to_json() {
        let s = series(&[10.0, 50.0, 10.0]);
        let tbl = table(json!([{"feature": "Peak", "actions": [{"action": "Dot"}]}]));
        let tl = build(&s, &tbl, &StoryConfig::default()).unwrap();
        let v = serde_json::to_value(&tl).unwrap();
        assert_eq!(v[0]["index"], json!(1));
        assert_eq!(v[0]["group"]["tag"], json!("peak"));
        assert_eq!(v[0]["group"]["children"][0]["type"], json!("mark"));
        assert_eq!(v[0]["group"]["children"][0]["kind"], json!("dot"));
    }
}
