use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use markerlay::{
    AlphaSource, ArSession, DualBandFrame, ExperienceConfig, PngSequenceSink, ReplayTracking,
    SplitLayout, StatusBoard, SurfaceSink, TrackingScript, composite_frame,
};

#[derive(Parser, Debug)]
#[command(name = "markerlay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite one dual-band frame into a straight-alpha PNG.
    Composite(CompositeArgs),
    /// Run a session against a scripted tracking source and write every overlay surface.
    Replay(ReplayArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SplitArg {
    Vertical,
    VerticalFlipped,
    Horizontal,
    Identity,
}

impl From<SplitArg> for SplitLayout {
    fn from(value: SplitArg) -> Self {
        match value {
            SplitArg::Vertical => SplitLayout::Vertical,
            SplitArg::VerticalFlipped => SplitLayout::VerticalFlipped,
            SplitArg::Horizontal => SplitLayout::Horizontal,
            SplitArg::Identity => SplitLayout::Identity,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlphaArg {
    Red,
    Luma,
}

impl From<AlphaArg> for AlphaSource {
    fn from(value: AlphaArg) -> Self {
        match value {
            AlphaArg::Red => AlphaSource::Red,
            AlphaArg::Luma => AlphaSource::Luma,
        }
    }
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Input dual-band PNG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Band arrangement of the input frame.
    #[arg(long, value_enum, default_value_t = SplitArg::Vertical)]
    split: SplitArg,

    /// Channel of the alpha band read as coverage.
    #[arg(long, value_enum, default_value_t = AlphaArg::Red)]
    alpha: AlphaArg,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Experience config JSON. Defaults to the built-in demo bindings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset directory holding the reference catalog and media.
    #[arg(long)]
    assets: PathBuf,

    /// Tracking script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Output directory for surface PNGs and `scene.json`.
    #[arg(long)]
    out: PathBuf,

    /// Scene ticks per second (overrides the config).
    #[arg(long)]
    fps: Option<u32>,

    /// Session length in seconds. Defaults to the script length plus three seconds.
    #[arg(long)]
    duration: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args),
        Command::Replay(args) => cmd_replay(args),
    }
}

fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let input = image::open(&args.in_path)
        .with_context(|| format!("read png '{}'", args.in_path.display()))?
        .to_rgba8();
    let frame = DualBandFrame::new(input, args.split.into())?;
    let out = composite_frame(&frame, args.alpha.into());

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    out.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ExperienceConfig::from_path(path)?,
        None => ExperienceConfig::demo(),
    };
    if let Some(fps) = args.fps {
        anyhow::ensure!(fps > 0, "--fps must be > 0");
        config.tick_hz = fps;
    }
    let script = TrackingScript::from_path(&args.script)?;
    let duration = args.duration.unwrap_or(script.end_sec() + 3.0);
    anyhow::ensure!(
        duration.is_finite() && duration >= 0.0,
        "--duration must be finite and >= 0"
    );

    let dt = config.tick_sec();
    let steps = (duration / dt).ceil() as u64;
    let mut session = ArSession::new(
        config,
        &args.assets,
        Box::new(StatusBoard::new()),
        Box::new(ReplayTracking::new(script)),
    )?;
    session.reset_tracking()?;

    let mut sink = PngSequenceSink::new(&args.out);
    for _ in 0..steps {
        session.advance(dt)?;
        session.settle()?;
        for frame in session.drain_surfaces()? {
            sink.push(&frame)?;
        }
    }
    sink.finish()?;

    let snapshot = session.snapshot()?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    let scene_path = args.out.join("scene.json");
    let f = std::fs::File::create(&scene_path)
        .with_context(|| format!("create '{}'", scene_path.display()))?;
    serde_json::to_writer_pretty(f, &snapshot)
        .with_context(|| format!("write '{}'", scene_path.display()))?;

    let summary = session.shutdown()?;
    tracing::info!(
        detections = summary.scene.detections,
        loop_restarts = summary.scene.loop_restarts,
        anchors = snapshot.anchors.len(),
        overlays = snapshot.overlay_count(),
        "replay finished"
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
