use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use loudness_scope_core::{
    block_loudness, FrameClock, LoudnessProducer, Scope, ScopeConfig, Viewport,
    ZoomEvent,
};
use tracing_subscriber::EnvFilter;

fn main() -> loudness_scope_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::CheckConfig { path } => run_check_config(&path),
    }
}

fn run_simulate(args: &SimulateArgs) -> loudness_scope_core::Result<()> {
    let config = load_config(args.config.as_deref())?;
    tracing::info!(
        seconds = args.seconds,
        speed = args.speed,
        tick_hz = config.tick_hz,
        "starting simulation"
    );

    let (producer, mut scope) = Scope::new(&config)?;
    let signal = SignalSettings::from(args);
    let feeder = thread::Builder::new()
        .name("loudness-producer".into())
        .spawn(move || feed(producer, signal))?;

    let viewport = Viewport::new(args.width, args.height);
    let mut events = args.scroll.iter().copied().map(ZoomEvent::time).collect::<Vec<_>>();
    if let Some(delta) = args.amplitude {
        events.push(ZoomEvent::amplitude(delta));
    }
    let mut events = events.into_iter();

    let mut clock = FrameClock::new(config.tick_hz);
    let mut frame = scope.render(viewport);
    loop {
        let tick = clock.wait();
        let producer_done = feeder.is_finished();

        let mut redraw = false;
        if let Some(event) = events.next() {
            redraw |= scope.handle_zoom(event);
        }
        let report = scope.tick();
        redraw |= report.needs_redraw();
        if redraw {
            frame = scope.render(viewport);
        }

        if tick % u64::from(config.tick_hz) == 0 {
            tracing::info!(
                status = %frame.status,
                vertices = frame.geometry.points().len(),
                history = scope.history().len(),
                dropped = report.dropped_total,
                "frame"
            );
        }

        if producer_done && report.ingested == 0 {
            break;
        }
    }

    let pushed = feeder
        .join()
        .map_err(|_| std::io::Error::other("producer thread panicked"))?;
    tracing::info!(
        pushed,
        ingested = scope.history().total_ingested(),
        overview_entries = scope.history().pyramid_len(),
        status = %frame.status,
        "simulation finished"
    );

    if let Some(path) = &args.output {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &frame)?;
        tracing::info!(?path, "wrote final frame");
    }
    Ok(())
}

fn run_check_config(path: &Path) -> loudness_scope_core::Result<()> {
    let config = ScopeConfig::load(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> loudness_scope_core::Result<ScopeConfig> {
    match path {
        Some(path) => ScopeConfig::load(path),
        None => {
            let config = ScopeConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SignalSettings {
    sample_rate: u32,
    block_size: usize,
    channels: usize,
    blocks: u64,
    block_period: Duration,
}

impl From<&SimulateArgs> for SignalSettings {
    fn from(args: &SimulateArgs) -> Self {
        let sample_rate = args.sample_rate.max(1);
        let block_size = args.block_size.max(1);
        let blocks = (args.seconds.max(0.0) * f64::from(sample_rate) / block_size as f64) as u64;
        let block_secs = block_size as f64 / f64::from(sample_rate) / args.speed.max(1e-3);
        Self {
            sample_rate,
            block_size,
            channels: args.channels.max(1),
            blocks,
            block_period: Duration::from_secs_f64(block_secs),
        }
    }
}

/// Stands in for an audio callback: synthesizes a gated, slowly swelling
/// tone, measures each block and pushes the result. Returns the number of
/// blocks that made it into the queue.
fn feed(mut producer: LoudnessProducer, signal: SignalSettings) -> u64 {
    let mut channels = vec![vec![0.0_f32; signal.block_size]; signal.channels];
    let rate = signal.sample_rate as f32;
    let mut pushed = 0;

    for block in 0..signal.blocks {
        if producer.is_abandoned() {
            break;
        }
        let first = block * signal.block_size as u64;
        for (lane, buffer) in channels.iter_mut().enumerate() {
            for (offset, sample) in buffer.iter_mut().enumerate() {
                let t = (first + offset as u64) as f32 / rate;
                *sample = synth(t, lane);
            }
        }
        if producer.push(block_loudness(&channels)) {
            pushed += 1;
        }
        thread::sleep(signal.block_period);
    }

    pushed
}

fn synth(t: f32, lane: usize) -> f32 {
    // A quarter second of silence every two seconds.
    if t % 2.0 > 1.75 {
        return 0.0;
    }
    let swell = 0.55 + 0.45 * (TAU * 0.25 * t).sin();
    let detune = 1.0 + lane as f32 * 0.01;
    swell * (TAU * 220.0 * detune * t).sin()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time loudness scope", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the scope with a synthetic signal and report what it renders.
    Simulate(SimulateArgs),
    /// Load a configuration file, validate it and print the effective values.
    CheckConfig {
        /// Path to a JSON configuration file.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Length of the synthetic signal in seconds.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,
    /// Playback speed multiplier for the producer.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,
    /// Audio frames per loudness value.
    #[arg(long, default_value_t = 512)]
    block_size: usize,
    #[arg(long, default_value_t = 2)]
    channels: usize,
    #[arg(long, default_value_t = 800.0)]
    width: f32,
    #[arg(long, default_value_t = 400.0)]
    height: f32,
    /// Scroll deltas applied to the time zoom, one per tick.
    #[arg(long, allow_hyphen_values = true, value_delimiter = ',')]
    scroll: Vec<f32>,
    /// Amplitude zoom delta applied after the scroll events.
    #[arg(long, allow_hyphen_values = true)]
    amplitude: Option<f32>,
    /// Write the final frame as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,
}
