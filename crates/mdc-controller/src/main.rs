//! MDC fleet controller entry point.
//!
//! Loads the configuration, builds one [`DisplayController`] per configured
//! display, and runs a single subcommand against the fleet.
//!
//! ```text
//! main()
//!  ├─ load AppConfig (--config / MDC_CONFIG / platform dir)
//!  ├─ init tracing (RUST_LOG, else controller.log_level)
//!  └─ subcommand
//!       ├─ status / monitor   → HealthMonitor + AlertEngine
//!       ├─ layouts / wall     → VideoWallManager
//!       ├─ discover           → discovery scan + config export
//!       └─ power / volume / input → DisplayController per display
//! ```
//!
//! Machine-readable output (JSON status, generated TOML) goes to stdout; logs
//! go to stderr.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use mdc_controller::application::alerts::{AlertEngine, SystemClock};
use mdc_controller::application::display_control::{ControlError, DisplayController};
use mdc_controller::application::health_monitor::{HealthMonitor, HealthProbe};
use mdc_controller::application::video_wall::{VideoWallDisplay, VideoWallManager, WallOutcome};
use mdc_controller::infrastructure::network::discovery::{discover_displays, DiscoveryOptions};
use mdc_controller::infrastructure::network::session::{DeviceSession, TcpConnector};
use mdc_controller::infrastructure::storage::config::{self, AppConfig};
use mdc_controller::infrastructure::storage::export::generate_wall_config;
use mdc_core::{Alert, DisplayId, FleetStatus, HealthRecord, InputSource, LayoutPlanner};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Fleet controller for MDC displays.
#[derive(Debug, Parser)]
#[command(
    name = "mdc-controller",
    about = "Monitor and control MDC displays and video walls",
    version
)]
struct Cli {
    /// Configuration file.  Defaults to the platform config directory.
    #[arg(long, global = true, env = "MDC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one health cycle and print fleet status as JSON.
    Status,
    /// Monitor continuously until Ctrl-C.
    Monitor,
    /// List the video wall layouts possible for the configured displays.
    Layouts,
    /// Enable video wall mode with a layout such as `2x2`.
    Wall {
        /// Falls back to `video_wall.default_layout`.
        layout: Option<String>,
    },
    /// Disable video wall mode on every display.
    WallOff,
    /// Scan an IP range (`a.b.c.x-y`) and print a generated configuration.
    Discover {
        range: String,
        /// Wall geometry of the generated configuration, `HxV`.
        #[arg(long, default_value = "2x2")]
        wall: WallGrid,
        /// Maximum number of addresses probed at once.
        #[arg(long, default_value_t = 32)]
        concurrency: usize,
    },
    /// Switch displays on or off.
    Power {
        #[arg(value_enum)]
        state: PowerState,
        /// Only this display.  All configured displays when omitted.
        #[arg(long)]
        display: Option<DisplayId>,
    },
    /// Set the volume, 0-100.
    Volume {
        #[arg(allow_hyphen_values = true)]
        level: i32,
        #[arg(long)]
        display: Option<DisplayId>,
    },
    /// Select the input source, e.g. `hdmi`, `display-port`, or `0x21`.
    Input {
        source: InputSource,
        #[arg(long)]
        display: Option<DisplayId>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PowerState {
    On,
    Off,
}

/// `HxV` grid argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WallGrid(u8, u8);

impl FromStr for WallGrid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| part.trim().parse::<u8>().ok().filter(|n| *n > 0);
        s.split_once(|c| c == 'x' || c == 'X')
            .and_then(|(h, v)| Some(WallGrid(parse(h)?, parse(v)?)))
            .ok_or_else(|| format!("expected HxV with positive numbers, got {s:?}"))
    }
}

/// Per-display command of the `power`, `volume`, and `input` subcommands.
#[derive(Debug, Clone, Copy)]
enum DisplayCommand {
    Power(bool),
    Volume(i32),
    Input(InputSource),
}

impl DisplayCommand {
    async fn apply(self, controller: &DisplayController) -> Result<(), ControlError> {
        match self {
            Self::Power(on) => controller.power(on).await,
            Self::Volume(level) => controller.set_volume(level).await,
            Self::Input(source) => controller.set_input_source(source).await,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    status: FleetStatus,
    alerts: Vec<Alert>,
    displays: Vec<HealthRecord>,
}

// ── Fleet wiring ──────────────────────────────────────────────────────────────

fn build_fleet(config: &AppConfig) -> Vec<Arc<DisplayController>> {
    let session_config = config.network.session_config();
    let connector = Arc::new(TcpConnector);
    config
        .displays
        .iter()
        .map(|entry| {
            let port = config.port_for(entry);
            let span = info_span!(
                "display",
                id = entry.id,
                name = entry.name.as_deref().unwrap_or(""),
                address = %format!("{}:{port}", entry.host),
            );
            let session =
                DeviceSession::new(entry.id, entry.host.clone(), port, session_config, connector.clone())
                    .with_span(span);
            Arc::new(DisplayController::new(session))
        })
        .collect()
}

fn select(
    fleet: &[Arc<DisplayController>],
    display: Option<DisplayId>,
) -> anyhow::Result<Vec<Arc<DisplayController>>> {
    match display {
        None => Ok(fleet.to_vec()),
        Some(id) => fleet
            .iter()
            .find(|c| c.display_id() == id)
            .map(|c| vec![Arc::clone(c)])
            .ok_or_else(|| anyhow!("display {id} is not configured")),
    }
}

fn build_monitor(config: &AppConfig, fleet: &[Arc<DisplayController>]) -> HealthMonitor {
    let probes = fleet
        .iter()
        .map(|c| Arc::clone(c) as Arc<dyn HealthProbe>)
        .collect();
    let engine = Arc::new(AlertEngine::new(
        config.monitor.thresholds(),
        Arc::new(SystemClock),
    ));
    HealthMonitor::new(probes, engine, config.monitor.interval())
}

fn wall_displays(fleet: &[Arc<DisplayController>]) -> Vec<Arc<dyn VideoWallDisplay>> {
    fleet
        .iter()
        .map(|c| Arc::clone(c) as Arc<dyn VideoWallDisplay>)
        .collect()
}

async fn disconnect_all(fleet: &[Arc<DisplayController>]) {
    for controller in fleet {
        controller.disconnect().await;
    }
}

fn report_wall(outcome: &WallOutcome) -> anyhow::Result<()> {
    for (display_id, result) in &outcome.results {
        match result {
            Ok(()) => println!("display {display_id}: ok"),
            Err(e) => println!("display {display_id}: {e}"),
        }
    }
    if outcome.success() {
        Ok(())
    } else {
        bail!("{} display(s) failed", outcome.failures().count())
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

async fn run_status(config: &AppConfig, fleet: &[Arc<DisplayController>]) -> anyhow::Result<()> {
    let monitor = build_monitor(config, fleet);
    let displays = monitor.run_cycle().await;
    let report = StatusReport {
        status: monitor.engine().system_status(),
        alerts: monitor.engine().alerts(None),
        displays,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_monitor(config: &AppConfig, fleet: &[Arc<DisplayController>]) -> anyhow::Result<()> {
    let monitor = Arc::new(build_monitor(config, fleet));
    let handle = Arc::clone(&monitor).spawn();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C, finishing the current cycle");
    monitor.stop();
    handle.await.context("monitor task failed")?;

    let status = monitor.engine().system_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn run_layouts(fleet: &[Arc<DisplayController>]) {
    let planner = LayoutPlanner::new(fleet.iter().map(|c| c.display_id()));
    for layout in planner.layouts() {
        println!(
            "{:<8} {:>3} displays  aspect {:.2}",
            layout.name, layout.total_displays, layout.aspect_ratio
        );
    }
}

async fn run_wall(
    config: &AppConfig,
    fleet: &[Arc<DisplayController>],
    layout: Option<String>,
) -> anyhow::Result<()> {
    let layout = layout
        .or_else(|| config.video_wall.default_layout.clone())
        .context("no layout given and video_wall.default_layout is not set")?;
    let manager = VideoWallManager::new(LayoutPlanner::new(fleet.iter().map(|c| c.display_id())));
    let outcome = manager
        .configure_video_wall(&layout, &wall_displays(fleet))
        .await?;
    report_wall(&outcome)
}

async fn run_wall_off(fleet: &[Arc<DisplayController>]) -> anyhow::Result<()> {
    let manager = VideoWallManager::new(LayoutPlanner::new(fleet.iter().map(|c| c.display_id())));
    let outcome = manager.disable_video_wall(&wall_displays(fleet)).await;
    report_wall(&outcome)
}

async fn run_discover(
    config: &AppConfig,
    range: &str,
    wall: WallGrid,
    concurrency: usize,
) -> anyhow::Result<()> {
    let options = DiscoveryOptions {
        port: config.network.port,
        session: config.network.session_config(),
        max_concurrency: concurrency,
        ..DiscoveryOptions::default()
    };
    let found = discover_displays(range, &options).await?;
    if found.is_empty() {
        warn!(range, "no displays found");
    }
    let generated = generate_wall_config(&found, (wall.0, wall.1));
    print!("{}", generated.to_toml().context("failed to render configuration")?);
    Ok(())
}

async fn run_display_command(
    targets: Vec<Arc<DisplayController>>,
    command: DisplayCommand,
) -> anyhow::Result<()> {
    let mut tasks = JoinSet::new();
    for controller in targets {
        tasks.spawn(async move {
            let result = command.apply(&controller).await;
            (controller.display_id(), result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (display_id, result) = joined.context("display task failed")?;
        match result {
            Ok(()) => println!("display {display_id}: ok"),
            Err(e) => {
                failed += 1;
                println!("display {display_id}: {e}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} display(s) failed");
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("failed to load configuration")?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.controller.log_level)),
        )
        .init();

    let fleet = build_fleet(&config);
    info!(displays = fleet.len(), "MDC fleet controller starting");

    let result = match cli.command {
        Command::Status => run_status(&config, &fleet).await,
        Command::Monitor => run_monitor(&config, &fleet).await,
        Command::Layouts => {
            run_layouts(&fleet);
            Ok(())
        }
        Command::Wall { layout } => run_wall(&config, &fleet, layout).await,
        Command::WallOff => run_wall_off(&fleet).await,
        Command::Discover {
            range,
            wall,
            concurrency,
        } => run_discover(&config, &range, wall, concurrency).await,
        Command::Power { state, display } => {
            let on = matches!(state, PowerState::On);
            run_display_command(select(&fleet, display)?, DisplayCommand::Power(on)).await
        }
        Command::Volume { level, display } => {
            run_display_command(select(&fleet, display)?, DisplayCommand::Volume(level)).await
        }
        Command::Input { source, display } => {
            run_display_command(select(&fleet, display)?, DisplayCommand::Input(source)).await
        }
    };

    disconnect_all(&fleet).await;
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
