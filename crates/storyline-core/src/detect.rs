//! Feature detection over a [`Series`]: peaks, windowed slopes and the
//! single-point features (extrema, first, last, current).
//!
//! Windowed searches treat a bad window as a configuration error and fail
//! immediately; everything else degrades to "no features".

use crate::config::DetectionConfig;
use crate::error::{Result, StoryError};
use crate::feature::Feature;
use crate::types::{FeatureKind, Series};

// ---------------------------------------------------------------------------
// Boundary scan
// ---------------------------------------------------------------------------

/// Parameters of the outward walk that finds a peak's start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryScan {
    /// Maximum samples walked in each direction.
    pub span: usize,
    /// Deltas out of `span` that must trend toward the peak.
    pub majority: usize,
}

impl Default for BoundaryScan {
    fn default() -> Self {
        Self {
            span: 20,
            majority: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

impl BoundaryScan {
    /// Walks away from `peak` over normalized values and returns the lowest
    /// sample reached, the trough that bounds the peak on that side.
    ///
    /// Every delta that does not fall toward the trough counts as opposing.
    /// The walk is capped at `span` steps, so the opposing count covers the
    /// last `span` deltas; once it reaches `span - majority` the trend has
    /// reversed and the walk ends. Climbing above the peak itself also ends
    /// it. A single uptick on an otherwise falling flank does not.
    fn walk(&self, norm: &[f64], peak: usize, dir: Direction) -> usize {
        let tolerance = self.span.saturating_sub(self.majority);
        let mut pos = peak;
        let mut trough = peak;
        let mut opposing = 0usize;

        for _ in 0..self.span {
            let next = match dir {
                Direction::Left if pos > 0 => pos - 1,
                Direction::Right if pos + 1 < norm.len() => pos + 1,
                _ => break,
            };
            if norm[next] > norm[peak] {
                break;
            }
            if norm[next] >= norm[pos] {
                opposing += 1;
                if opposing >= tolerance {
                    break;
                }
            }
            pos = next;
            if norm[pos] < norm[trough] {
                trough = pos;
            }
        }
        trough
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Rounded midpoint index of the window starting at `start`.
fn midpoint(start: usize, window: usize) -> usize {
    start + ((window - 1) as f64 / 2.0).round() as usize
}

fn least_squares_slope(ys: &[f64]) -> f64 {
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (num, den) = ys.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
        let dx = i as f64 - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn check_window(series: &Series, window: usize, min: usize, kind: &'static str) -> Result<()> {
    let len = series.len();
    if len <= 1 {
        return Err(StoryError::InvalidWindow {
            window,
            len,
            reason: "series needs at least two points",
        });
    }
    if window < min {
        return Err(StoryError::InvalidWindow {
            window,
            len,
            reason: kind,
        });
    }
    if window > len {
        return Err(StoryError::InvalidWindow {
            window,
            len,
            reason: "window exceeds series length",
        });
    }
    Ok(())
}

fn point_feature(series: &Series, kind: FeatureKind, index: usize) -> Option<Feature> {
    let p = series.get(index)?;
    Some(Feature::new(kind, p.date, index).with_height(p.y))
}

// ---------------------------------------------------------------------------
// Searches
// ---------------------------------------------------------------------------

/// Maximal, pairwise-disjoint peaks in date order.
pub fn search_peaks(series: &Series, window: usize, scan: &BoundaryScan) -> Result<Vec<Feature>> {
    check_window(series, window, 3, "peak window must be at least 3")?;
    let values = series.values();
    let norm = min_max_normalize(&values);
    let points = series.points();

    let mut candidates = Vec::new();
    for start in 0..=values.len() - window {
        let end = start + window - 1;
        let mid = midpoint(start, window);
        if values[mid] > values[start] && values[mid] > values[end] {
            let lo = scan.walk(&norm, mid, Direction::Left);
            let hi = scan.walk(&norm, mid, Direction::Right);
            candidates.push(
                Feature::new(FeatureKind::Peak, points[mid].date, mid)
                    .with_height(values[mid])
                    .with_range((lo, points[lo].date), (hi, points[hi].date)),
            );
        }
    }

    Ok(keep_maximal(candidates))
}

/// Drops every peak whose range intersects a taller one. Equal heights are
/// broken in favour of the earlier peak.
fn keep_maximal(mut peaks: Vec<Feature>) -> Vec<Feature> {
    peaks.sort_by(|a, b| {
        let ha = a.height.unwrap_or(0.0);
        let hb = b.height.unwrap_or(0.0);
        ha.total_cmp(&hb).then(b.index.cmp(&a.index))
    });

    let mut kept: Vec<Feature> = peaks
        .iter()
        .enumerate()
        .filter(|(i, p)| !peaks[i + 1..].iter().any(|taller| taller.overlaps(p)))
        .map(|(_, p)| p.clone())
        .collect();
    kept.sort_by_key(|p| p.index);
    kept
}

/// One slope per window position: exactly `len - window + 1` features.
pub fn search_slopes(series: &Series, window: usize) -> Result<Vec<Feature>> {
    check_window(series, window, 2, "slope window must exceed 1")?;
    let values = series.values();
    let points = series.points();

    Ok((0..=values.len() - window)
        .map(|start| {
            let end = start + window - 1;
            let mid = midpoint(start, window);
            let slope = least_squares_slope(&values[start..=end]);
            let mut f = Feature::new(FeatureKind::Slope, points[mid].date, mid)
                .with_height(slope.abs())
                .with_range((start, points[start].date), (end, points[end].date));
            f.slope = Some(slope);
            f
        })
        .collect())
}

/// Global maximum or minimum; ties keep the earliest point.
pub fn search_extrema(series: &Series, kind: FeatureKind) -> Vec<Feature> {
    let pick = series.points().iter().enumerate().reduce(|best, cur| {
        let better = match kind {
            FeatureKind::Min => cur.1.y < best.1.y,
            _ => cur.1.y > best.1.y,
        };
        if better {
            cur
        } else {
            best
        }
    });
    pick.and_then(|(i, _)| point_feature(series, kind, i))
        .into_iter()
        .collect()
}

pub fn search_first(series: &Series) -> Vec<Feature> {
    point_feature(series, FeatureKind::First, 0)
        .into_iter()
        .collect()
}

pub fn search_last(series: &Series) -> Vec<Feature> {
    series
        .len()
        .checked_sub(1)
        .and_then(|i| point_feature(series, FeatureKind::Last, i))
        .into_iter()
        .collect()
}

/// The most recent observation.
pub fn search_current(series: &Series) -> Vec<Feature> {
    series
        .len()
        .checked_sub(1)
        .and_then(|i| point_feature(series, FeatureKind::Current, i))
        .into_iter()
        .collect()
}

/// Runs the search for `kind`. `window` overrides the configured default for
/// the windowed kinds and is ignored by the others.
pub fn search(
    series: &Series,
    kind: FeatureKind,
    window: Option<usize>,
    cfg: &DetectionConfig,
) -> Result<Vec<Feature>> {
    match kind {
        FeatureKind::Peak => search_peaks(series, window.unwrap_or(cfg.peak_window), &cfg.scan()),
        FeatureKind::Slope => search_slopes(series, window.unwrap_or(cfg.slope_window)),
        FeatureKind::Max | FeatureKind::Min => Ok(search_extrema(series, kind)),
        FeatureKind::First => Ok(search_first(series)),
        FeatureKind::Last => Ok(search_last(series)),
        FeatureKind::Current => Ok(search_current(series)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
