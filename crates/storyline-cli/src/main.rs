use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use storyline_cli::cmd::{self, config::ConfigSubcommand, play::PlayOptions};
use storyline_cli::inputs::load_config;

#[derive(Parser)]
#[command(
    name = "storyline",
    about = "Detect features in a time series, build a narrated timeline and dry-run its playback",
    version,
    propagate_version = true
)]
struct Cli {
    /// Story config (default: ./storyline.yaml when present)
    #[arg(long, global = true, env = "STORYLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect features of one kind in a series
    Features {
        /// Series JSON file
        #[arg(long)]
        series: PathBuf,

        /// Feature kind: peak, slope, max, min, current, last, first
        #[arg(long)]
        kind: String,

        /// Window for peak and slope searches (default from config)
        #[arg(long)]
        window: Option<usize>,
    },

    /// Build and print the timeline for a series and a feature-action table
    Timeline {
        #[arg(long)]
        series: PathBuf,

        /// Feature-action table (JSON, or YAML by extension)
        #[arg(long)]
        table: PathBuf,
    },

    /// Play the timeline against logging canvases
    Play {
        #[arg(long)]
        series: PathBuf,

        #[arg(long)]
        table: PathBuf,

        /// Number of synchronized plots
        #[arg(long, default_value = "1")]
        plots: usize,

        /// Milliseconds to hold at each pause marker
        #[arg(long, default_value = "0")]
        hold_ms: u64,

        /// Skip transition delays and durations
        #[arg(long)]
        instant: bool,
    },

    /// Inspect and validate the story config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Play { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Features {
            series,
            kind,
            window,
        } => cmd::features::run(&config, &series, &kind, window, cli.json),
        Commands::Timeline { series, table } => {
            cmd::timeline::run(&config, &series, &table, cli.json)
        }
        Commands::Play {
            series,
            table,
            plots,
            hold_ms,
            instant,
        } => cmd::play::run(
            &config,
            &series,
            &table,
            PlayOptions {
                plots,
                hold: Duration::from_millis(hold_ms),
                instant,
            },
            cli.json,
        ),
        Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Full anyhow chain
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
