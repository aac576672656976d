//! Timeline playback and multi-plot synchronization.
//!
//! A [`Plot`] walks its timeline entry by entry. The play flag is checked only
//! at entry boundaries, so an in-flight show or hide always runs to
//! completion. A [`PlaybackController`] keeps several plots in lockstep: any
//! plot reaching a pause marker pauses all of them.

use crate::action::{Animate, Group, Lifecycle};
use crate::canvas::{Canvas, Coord, Geometry, NodeId, NodeKind};
use crate::config::PlaybackConfig;
use crate::error::Result;
use crate::timeline::{Timeline, TimelineEntry};
use crate::types::{Point, Properties, Series};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio::time::Instant;

pub type PauseCallback = Arc<dyn Fn() + Send + Sync>;

pub trait Playable: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn toggle_play_pause(&self);
    /// Called whenever playback reaches a pause marker.
    fn register_pause_callback(&self, callback: PauseCallback);
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

pub struct PlaybackController {
    plots: Vec<Arc<dyn Playable>>,
    is_playing: AtomicBool,
}

impl PlaybackController {
    /// Wires every plot's pause callback back to the controller.
    pub fn new(plots: Vec<Arc<dyn Playable>>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            for plot in &plots {
                let weak = weak.clone();
                plot.register_pause_callback(Arc::new(move || {
                    if let Some(controller) = weak.upgrade() {
                        controller.pause();
                    }
                }));
            }
            Self {
                plots,
                is_playing: AtomicBool::new(false),
            }
        })
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::SeqCst)
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    pub fn play(&self) {
        self.is_playing.store(true, Ordering::SeqCst);
        tracing::info!(plots = self.plots.len(), "play");
        for plot in &self.plots {
            plot.play();
        }
    }

    pub fn pause(&self) {
        self.is_playing.store(false, Ordering::SeqCst);
        tracing::info!(plots = self.plots.len(), "pause");
        for plot in &self.plots {
            plot.pause();
        }
    }

    /// Flips the shared flag and every plot; returns the new state.
    pub fn toggle_play_pause(&self) -> bool {
        let playing = !self.is_playing.fetch_xor(true, Ordering::SeqCst);
        tracing::info!(playing, "toggle");
        for plot in &self.plots {
            plot.toggle_play_pause();
        }
        playing
    }
}

// ---------------------------------------------------------------------------
// Plot
// ---------------------------------------------------------------------------

/// Horizontal and vertical offset of a callout from its anchor point.
const CALLOUT_OFFSET: f64 = 40.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackReport {
    pub plot: String,
    pub entries_played: usize,
    pub pauses: usize,
    pub elapsed_ms: u64,
}

pub struct Plot {
    name: String,
    canvas: Arc<dyn Canvas>,
    series: Arc<Series>,
    timeline: Arc<Timeline>,
    config: PlaybackConfig,
    /// `(min, max)` of the series' y values.
    y_range: (f64, f64),
    playing: watch::Sender<bool>,
    callbacks: Mutex<Vec<PauseCallback>>,
}

impl Plot {
    pub fn new(
        name: impl Into<String>,
        canvas: Arc<dyn Canvas>,
        series: Arc<Series>,
        timeline: Arc<Timeline>,
        config: PlaybackConfig,
    ) -> Self {
        let (playing, _) = watch::channel(false);
        let y_range = series
            .points()
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.y), hi.max(p.y))
            });
        Self {
            name: name.into(),
            canvas,
            series,
            timeline,
            config,
            y_range,
            playing,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.borrow()
    }

    /// Plays the whole timeline once. Blocks between entries while paused.
    pub async fn run(&self) -> Result<PlaybackReport> {
        let started = Instant::now();
        let mut state = self.playing.subscribe();
        let trace = self.canvas.create_node(NodeKind::Trace);
        let mut previous = 0usize;
        let mut report = PlaybackReport {
            plot: self.name.clone(),
            ..Default::default()
        };

        for entry in self.timeline.iter() {
            if state.wait_for(|playing| *playing).await.is_err() {
                break;
            }
            let Some(point) = self.series.get(entry.index) else {
                tracing::warn!(plot = %self.name, index = entry.index, "entry outside series; skipped");
                continue;
            };

            self.redraw_trace(trace, previous, entry.index);
            if self.play_entry(entry, point).await? {
                report.pauses += 1;
            }
            previous = entry.index;
            report.entries_played += 1;
        }
        self.canvas.remove_node(trace);

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            plot = %self.name,
            entries = report.entries_played,
            pauses = report.pauses,
            elapsed_ms = report.elapsed_ms,
            "playback finished"
        );
        Ok(report)
    }

    /// Shows then hides one entry's group; returns whether it paused playback.
    async fn play_entry(&self, entry: &TimelineEntry, point: &Point) -> Result<bool> {
        let mut group: Group = entry.group.clone();
        let origin = self.coordinate(entry.index, point.y);
        let right = origin.x < self.config.chart_width / 2.0;

        group.attach(self.canvas.clone())?;
        group.update_props(&self.point_props(point, right));
        let dx = if right { CALLOUT_OFFSET } else { -CALLOUT_OFFSET };
        group.set_coordinate(origin, Some(origin.offset(dx, -CALLOUT_OFFSET)));

        let (delay, duration) = self.config.show_timing();
        let shown = group.show(delay, duration).await?;
        tracing::debug!(plot = %self.name, index = entry.index, elapsed_ms = shown.as_millis() as u64, "shown");

        let paused = group.contains_pause();
        if paused {
            self.fire_pause_callbacks();
        }

        let (delay, duration) = self.config.hide_timing();
        group.hide(delay, duration).await?;
        if group.lifecycle() == Lifecycle::Hidden {
            group.detach();
        }
        Ok(paused)
    }

    fn fire_pause_callbacks(&self) {
        let callbacks: Vec<PauseCallback> = match self.callbacks.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        tracing::info!(plot = %self.name, callbacks = callbacks.len(), "pause marker reached");
        for callback in callbacks {
            callback();
        }
    }

    fn point_props(&self, point: &Point, right: bool) -> Properties {
        let mut datum = point.fields.clone();
        datum.insert("date".into(), Value::String(point.date.to_rfc3339()));
        if let Some(y) = serde_json::Number::from_f64(point.y) {
            datum.insert("y".into(), Value::Number(y));
        }
        let mut props = Properties::new();
        props.insert("point".into(), Value::Object(datum));
        props.insert(
            "align".into(),
            Value::String(if right { "right" } else { "left" }.into()),
        );
        props
    }

    /// Chart coordinate of a sample; y grows downwards.
    fn coordinate(&self, index: usize, y: f64) -> Coord {
        let (w, h) = (self.config.chart_width, self.config.chart_height);
        let last = self.series.len().saturating_sub(1).max(1) as f64;
        let (min, max) = self.y_range;
        let range = max - min;
        let scaled = if range > 0.0 { (y - min) / range } else { 0.5 };
        Coord::new(index as f64 / last * w, h - scaled * h)
    }

    fn redraw_trace(&self, trace: NodeId, from: usize, to: usize) {
        let (Some(a), Some(b)) = (self.series.get(from), self.series.get(to)) else {
            return;
        };
        let mut attributes = Properties::new();
        attributes.insert("from_index".into(), Value::from(from));
        attributes.insert("to_index".into(), Value::from(to));
        self.canvas.set_geometry(
            trace,
            &Geometry {
                origin: Some(self.coordinate(from, a.y)),
                destination: Some(self.coordinate(to, b.y)),
                attributes,
            },
        );
    }
}

impl Playable for Plot {
    fn play(&self) {
        self.playing.send_replace(true);
    }

    fn pause(&self) {
        self.playing.send_replace(false);
    }

    fn toggle_play_pause(&self) {
        self.playing.send_modify(|playing| *playing = !*playing);
    }

    fn register_pause_callback(&self, callback: PauseCallback) {
        match self.callbacks.lock() {
            Ok(mut guard) => guard.push(callback),
            Err(poisoned) => poisoned.into_inner().push(callback),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
