use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, Receiver};
use flock_config::{
    Config, ConfigError, ConfigLoader, FileSenderConfig, Preset, SenderConfig, SerializerType,
    UpdateStrategy,
};
use flock_simulation::{Simulation, SimulationError, Variant, VariantSelector, FLOCKING};
use flock_transport::{OutputWorker, TransportController, TransportError};
use hdrhistogram::Histogram;
use log::{debug, error, info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Failed to create tick histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PresetArg {
    Calm,
    Chaos,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg {
    InPlace,
    DoubleBuffer,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Binary,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Leader-follower flocking simulation", long_about = None)]
struct Args {
    /// Path to the simulation configuration file (JSON, or TOML by extension)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Ignore the configuration file and start from built-in defaults
    #[arg(long)]
    defaults: bool,

    /// Number of normal agents
    #[arg(short, long)]
    agents: Option<usize>,

    /// Stop after this many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Replace the tuning constants with a preset
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// How normal agents are updated within a tick
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Snapshot sink: `stdout`, `null`, or a file path
    #[arg(short, long)]
    output: Option<String>,

    /// Snapshot encoding
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), RunnerError> {
    let config = load_config(&args)?;
    let simulation = &config.simulation;
    info!(
        "Flock: {} agents, {:?} updates, tick every {} ms",
        simulation.agent_count, simulation.update_strategy, simulation.tick_interval_ms
    );

    let transport = TransportController::from_config(&config.transport)?;
    let (worker, observer) = OutputWorker::spawn(transport, config.runner.channel_capacity)?;
    let dropped = observer.dropped_counter();

    let mut selector = VariantSelector::new();
    let sim_config = config.simulation.clone();
    selector.register(FLOCKING, move || {
        let mut simulation = Simulation::start(sim_config.clone())?;
        simulation.subscribe(observer.clone());
        Ok(Box::new(simulation) as Box<dyn Variant>)
    });
    selector.select(FLOCKING)?;

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let interval = Duration::from_millis(config.simulation.tick_interval_ms);
    let histogram = drive(&mut selector, &stop_rx, interval, &config)?;

    selector.stop();
    // Releases the last observer so the output thread can finish
    drop(selector);
    let stats = worker.join()?;

    report(&histogram);
    info!(
        "Output: {} snapshots published, {} dropped",
        stats.published,
        dropped.load(Ordering::Relaxed)
    );
    Ok(())
}

/// Reads the configuration file (unless `--defaults`) and applies CLI
/// overrides before validating the result.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.defaults {
        info!("Using built-in defaults");
        Config::default()
    } else {
        info!("Using configuration from {}", args.config.display());
        ConfigLoader::from_file(&args.config)?
    };

    let sim = &mut config.simulation;
    if let Some(preset) = args.preset {
        sim.apply_preset(match preset {
            PresetArg::Calm => Preset::Calm,
            PresetArg::Chaos => Preset::Chaos,
        });
    }
    if let Some(agents) = args.agents {
        sim.agent_count = agents;
    }
    if let Some(seed) = args.seed {
        sim.seed = Some(seed);
    }
    if let Some(strategy) = args.strategy {
        sim.update_strategy = match strategy {
            StrategyArg::InPlace => UpdateStrategy::InPlace,
            StrategyArg::DoubleBuffer => UpdateStrategy::DoubleBuffer,
        };
    }
    if let Some(ticks) = args.ticks {
        config.runner.max_ticks = Some(ticks);
    }
    if let Some(format) = args.format {
        config.transport.serializer = match format {
            FormatArg::Json => SerializerType::Json,
            FormatArg::Binary => SerializerType::Binary,
        };
    }
    if let Some(output) = &args.output {
        config.transport.sender = match output.as_str() {
            "stdout" | "-" => SenderConfig::Stdio,
            "null" => SenderConfig::Null,
            path => SenderConfig::File(FileSenderConfig { output_path: path.to_string() }),
        };
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Fixed-cadence tick loop. Returns per-tick durations in microseconds.
fn drive(
    selector: &mut VariantSelector,
    stop: &Receiver<()>,
    interval: Duration,
    config: &Config,
) -> Result<Histogram<u64>, RunnerError> {
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?;
    let log_frequency = u64::from(config.runner.log_frequency);
    let max_ticks = config.runner.max_ticks;

    let mut deadline = Instant::now();
    let mut lagged = 0u64;

    while selector.is_running() {
        if stop.try_recv().is_ok() {
            info!("Interrupted, shutting down");
            break;
        }

        let started = Instant::now();
        let report = selector.tick()?;
        histogram.saturating_record(started.elapsed().as_micros() as u64);

        if log_frequency > 0 && report.tick % log_frequency == 0 {
            debug!(
                "Tick {}: {:.1} neighbors/agent, {} boundary nudges, {} guarded, {} lagging frames",
                report.tick, report.mean_neighbors, report.nudged, report.guarded, lagged
            );
        }
        if max_ticks.is_some_and(|max| report.tick >= max) {
            info!("Reached {} ticks", report.tick);
            break;
        }

        deadline += interval;
        let now = Instant::now();
        if now < deadline {
            spin_sleep::sleep(deadline - now);
        } else {
            let behind = now - deadline;
            if behind > interval {
                warn!("Tick {} over budget by {:?}", report.tick, behind);
            }
            lagged += 1;
            deadline = now;
        }
    }

    Ok(histogram)
}

fn report(histogram: &Histogram<u64>) {
    if histogram.len() == 0 {
        info!("No ticks executed");
        return;
    }
    info!(
        "Tick time over {} ticks: p50 {} µs, p99 {} µs, max {} µs",
        histogram.len(),
        histogram.value_at_quantile(0.5),
        histogram.value_at_quantile(0.99),
        histogram.max()
    );
}
