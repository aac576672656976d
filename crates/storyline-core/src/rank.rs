//! Importance ranking and story pacing.
//!
//! Each feature contributes a Gaussian bump centred on its index whose
//! amplitude is its normalized height. The pointwise maximum of those bumps is
//! the importance envelope; its local maxima are the candidate story beats,
//! ordered by [`select_pacing`].

use crate::feature::Feature;
use crate::types::Series;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RANK_MAX: f64 = 10.0;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Min-max scales heights into `[0, RANK_MAX]` and derives `rank` (1..=10).
/// A batch of identical heights is scaled to `RANK_MAX`.
pub fn normalize_height(features: &mut [Feature]) {
    let heights: Vec<f64> = features.iter().map(|f| f.height.unwrap_or(0.0)).collect();
    let min = heights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    for (f, h) in features.iter_mut().zip(heights) {
        f.normalized_height = if range > 0.0 {
            (h - min) / range * RANK_MAX
        } else {
            RANK_MAX
        };
        f.rank = f.normalized_height.ceil().clamp(1.0, RANK_MAX) as u8;
    }
}

// ---------------------------------------------------------------------------
// Curves
// ---------------------------------------------------------------------------

/// `amplitude * exp(-(i - mean)^2 / (2 std^2))` over `0..length`.
///
/// `std` is `width / 3` when a width is given, otherwise `amplitude * 8 / 3`
/// so that more important features spread further.
pub fn gaussian_curve(mean: f64, amplitude: f64, length: usize, width: Option<f64>) -> Vec<f64> {
    let std = match width {
        Some(w) => w / 3.0,
        None => amplitude * 8.0 / 3.0,
    };
    if std.is_nan() || std <= 0.0 {
        let spike = mean.round();
        return (0..length)
            .map(|i| if i as f64 == spike { amplitude } else { 0.0 })
            .collect();
    }
    let denom = 2.0 * std * std;
    (0..length)
        .map(|i| {
            let d = i as f64 - mean;
            amplitude * (-(d * d) / denom).exp()
        })
        .collect()
}

/// Pointwise maximum; the result is as long as the longest curve.
pub fn envelope(curves: &[Vec<f64>]) -> Vec<f64> {
    let len = curves.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = vec![0.0f64; len];
    for curve in curves {
        for (o, v) in out.iter_mut().zip(curve) {
            *o = o.max(*v);
        }
    }
    out
}

/// Pointwise average of two envelopes; the shorter one is padded with zeros.
pub fn combined_envelope(numeric: &[f64], categorical: &[f64]) -> Vec<f64> {
    let len = numeric.len().max(categorical.len());
    (0..len)
        .map(|i| {
            let a = numeric.get(i).copied().unwrap_or(0.0);
            let b = categorical.get(i).copied().unwrap_or(0.0);
            (a + b) / 2.0
        })
        .collect()
}

pub fn importance_envelope(series_len: usize, features: &[Feature], width: Option<f64>) -> Vec<f64> {
    let curves: Vec<Vec<f64>> = features
        .iter()
        .map(|f| gaussian_curve(f.index as f64, f.normalized_height, series_len, width))
        .collect();
    let env = envelope(&curves);
    if env.is_empty() {
        vec![0.0; series_len]
    } else {
        env
    }
}

/// Envelope over points whose `field` holds a non-empty value, e.g. an
/// annotated event column.
pub fn categorical_envelope(series: &Series, field: &str, width: Option<f64>) -> Vec<f64> {
    let curves: Vec<Vec<f64>> = series
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| match p.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(_) => true,
        })
        .map(|(i, _)| gaussian_curve(i as f64, RANK_MAX, series.len(), width))
        .collect();
    if curves.is_empty() {
        return vec![0.0; series.len()];
    }
    envelope(&curves)
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingCandidate {
    pub index: usize,
    pub height: f64,
}

/// Positive local maxima of an envelope.
pub fn envelope_peaks(env: &[f64]) -> Vec<PacingCandidate> {
    (0..env.len())
        .filter(|&i| {
            let v = env[i];
            v > 0.0 && (i == 0 || v >= env[i - 1]) && (i + 1 == env.len() || v > env[i + 1])
        })
        .map(|i| PacingCandidate {
            index: i,
            height: env[i],
        })
        .collect()
}

/// Greedy farthest-point selection weighted by height.
///
/// Each round picks the remaining candidate with the largest
/// `distance to nearest chosen point or series boundary * weight`, where the
/// weight is `height / 2` (or 1 when `ignore_height`). Ties keep the earlier
/// candidate. Every candidate appears exactly once in the returned order.
pub fn select_pacing(
    candidates: &[PacingCandidate],
    series_length: usize,
    ignore_height: bool,
) -> Vec<PacingCandidate> {
    let mut remaining: Vec<PacingCandidate> = candidates.to_vec();
    let mut chosen: Vec<usize> = vec![0, series_length.saturating_sub(1)];
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, c) in remaining.iter().enumerate() {
            let dist = chosen
                .iter()
                .map(|&p| c.index.abs_diff(p))
                .min()
                .unwrap_or(0) as f64;
            let weight = if ignore_height { 1.0 } else { c.height / 2.0 };
            let score = dist * weight;
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        let pick = remaining.remove(best);
        chosen.push(pick.index);
        order.push(pick);
    }
    order
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
