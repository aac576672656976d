use crate::inputs::{load_series, load_table};
use crate::output::{print_json, print_table};
use anyhow::Context;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storyline_core::canvas::{Canvas, TracingCanvas};
use storyline_core::config::{PlaybackConfig, StoryConfig};
use storyline_core::playback::{Playable, PlaybackController, PlaybackReport, Plot};
use storyline_core::timeline;
use tokio::time::Instant;

pub struct PlayOptions {
    pub plots: usize,
    /// How long a pause marker holds playback before resuming.
    pub hold: Duration,
    /// Collapse every transition to zero time.
    pub instant: bool,
}

/// Dry-runs playback against logging canvases.
pub fn run(
    config: &StoryConfig,
    series_path: &Path,
    table_path: &Path,
    opts: PlayOptions,
    json: bool,
) -> anyhow::Result<()> {
    if opts.plots == 0 {
        anyhow::bail!("--plots must be at least 1");
    }
    let series = Arc::new(load_series(series_path)?);
    let table = load_table(table_path)?;
    let timeline =
        Arc::new(timeline::build(&series, &table, config).context("failed to build timeline")?);
    let playback = if opts.instant {
        PlaybackConfig {
            chart_width: config.playback.chart_width,
            chart_height: config.playback.chart_height,
            ..PlaybackConfig::instant()
        }
    } else {
        config.playback.clone()
    };

    let plots: Vec<Arc<Plot>> = (0..opts.plots)
        .map(|i| {
            let canvas: Arc<dyn Canvas> = Arc::new(TracingCanvas::new(format!("plot-{i}")));
            Arc::new(Plot::new(
                format!("plot-{i}"),
                canvas,
                series.clone(),
                timeline.clone(),
                playback.clone(),
            ))
        })
        .collect();
    let controller = PlaybackController::new(
        plots
            .iter()
            .map(|p| p.clone() as Arc<dyn Playable>)
            .collect(),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let reports = rt.block_on(drive(controller, &plots, opts.hold))?;

    if json {
        return print_json(&reports);
    }
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            vec![
                r.plot.clone(),
                r.entries_played.to_string(),
                r.pauses.to_string(),
                r.elapsed_ms.to_string(),
            ]
        })
        .collect();
    print_table(&["PLOT", "ENTRIES", "PAUSES", "ELAPSED_MS"], rows);
    Ok(())
}

/// Runs every plot to completion, resuming after each pause marker once
/// `hold` has passed. The plots keep being polled during the hold, so
/// transitions already in flight finish on time.
async fn drive(
    controller: Arc<PlaybackController>,
    plots: &[Arc<Plot>],
    hold: Duration,
) -> anyhow::Result<Vec<PlaybackReport>> {
    let runs = join_all(plots.iter().map(|p| p.run()));
    tokio::pin!(runs);
    controller.play();

    let mut poll = tokio::time::interval(Duration::from_millis(20));
    let mut resume_at: Option<Instant> = None;
    let results = loop {
        tokio::select! {
            results = &mut runs => break results,
            _ = poll.tick(), if resume_at.is_none() => {
                if !controller.is_playing() {
                    tracing::info!(hold_ms = hold.as_millis() as u64, "holding at pause marker");
                    resume_at = Some(Instant::now() + hold);
                }
            }
            _ = tokio::time::sleep_until(resume_at.unwrap_or_else(Instant::now)), if resume_at.is_some() => {
                resume_at = None;
                controller.play();
            }
        }
    };

    results
        .into_iter()
        .map(|r| r.context("playback failed"))
        .collect()
}
