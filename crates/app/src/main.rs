mod capture;
mod demo;

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use clap::{Args, Parser, Subcommand};
use sound_painter_core::{
    declare_sound_slots, AppConfig, AudioGraph, FrameSampler, PaintHost, PaintRegistry,
    SoundPainter, StateChannelBuilder, Surface, SOUND_PAINTER,
};
use tracing_subscriber::EnvFilter;

const DEMO_SECONDS: f32 = 10.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> sound_painter_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Live(args) => run_live(&args),
        Commands::Demo(args) => run_demo(&args),
    }
}

fn run_live(args: &SessionArgs) -> sound_painter_core::Result<()> {
    let config = args.load_config()?;
    tracing::info!(window = config.audio.window_size, "starting live mode");

    let capture = capture::open(&config.audio)?;
    run_session(capture.graph(), &config, args.seconds, args.save_frame.as_ref())
}

fn run_demo(args: &SessionArgs) -> sound_painter_core::Result<()> {
    let config = args.load_config()?;
    tracing::info!("starting demo mode with a synthetic source");

    let graph = AudioGraph::build(demo::FORMAT, &config.audio)?;
    let source = demo::spawn(graph.clone())?;
    let seconds = args.seconds.or(Some(DEMO_SECONDS));
    let result = run_session(&graph, &config, seconds, args.save_frame.as_ref());

    let report = source.stop()?;
    tracing::debug!(blocks = report.ticks, "demo source stopped");
    graph.end()?;
    result
}

/// Wires producer and consumer loops to `graph` and runs them until the
/// deadline passes or the stream ends.
fn run_session(
    graph: &AudioGraph,
    config: &AppConfig,
    seconds: Option<f32>,
    save_frame: Option<&PathBuf>,
) -> sound_painter_core::Result<()> {
    let mut builder = StateChannelBuilder::new();
    declare_sound_slots(&mut builder, &config.sampler.initial_color)?;
    let (writer, reader) = builder.build();

    let mut registry = PaintRegistry::new();
    registry.register(
        SOUND_PAINTER,
        Box::new(SoundPainter::new(config)?),
        &reader,
    )?;
    let surface = Surface::new(config.render.width, config.render.height)?;
    let host = PaintHost::new(registry, SOUND_PAINTER, reader, surface)?;

    let sampler =
        FrameSampler::new(graph.taps(), config.sentinel).spawn(writer, config.sampler.tick_rate_hz)?;
    let painter = host.spawn(config.render.paint_rate_hz)?;

    let deadline = seconds
        .filter(|s| s.is_finite())
        .map(|s| Instant::now() + Duration::from_secs_f32(s.max(0.0)));
    loop {
        thread::sleep(POLL_INTERVAL);
        if graph.is_ended()? {
            tracing::info!("capture stream ended");
            break;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }

    let sampled = sampler.stop()?;
    let painted = painter.stop()?;
    tracing::info!(
        sampler_ticks = sampled.ticks,
        sampler_failures = sampled.failures,
        frames = painted.state.frames(),
        torn_frames = painted.state.torn_frames(),
        paint_failures = painted.failures,
        "session finished"
    );

    if let Some(path) = save_frame {
        painted.state.surface().save_png(path)?;
        tracing::info!(?path, "saved last frame");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive waveform painter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Paint the default microphone input.
    Live(SessionArgs),
    /// Paint a synthetic stereo signal; no audio device needed.
    Demo(SessionArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Stop after this many seconds.
    #[arg(short, long)]
    seconds: Option<f32>,
    /// Write the last painted frame to this PNG file.
    #[arg(long)]
    save_frame: Option<PathBuf>,
}

impl SessionArgs {
    fn load_config(&self) -> sound_painter_core::Result<AppConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!(?path, "loading configuration");
                AppConfig::load(path)
            }
            None => Ok(AppConfig::default()),
        }
    }
}
