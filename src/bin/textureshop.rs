use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use textureshop::encode::png::save_pixels;
use textureshop::encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, PngSequenceSink};
use textureshop::pipeline::{DEMO_FPS, DEMO_FRAMES, demo_light, demo_orbit};
use textureshop::{
    BackendKind, Bxdf, Canvas, DeviceContext, DeviceSettings, DistanceField, FbmNoise, Gradient,
    GradientKind, GraphScript, Node, RaymarchPipeline,
};
use tracing_subscriber::{Layer as _, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "textureshop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render FBM noise as a PNG.
    Noise(NoiseArgs),
    /// Render a gradient ramp as a PNG.
    Gradient(GradientArgs),
    /// Render the orbiting demo scene as an MP4 (requires `ffmpeg`) or a PNG sequence.
    Raymarch(RaymarchArgs),
    /// Run a JSON node script and save its output as a PNG.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Device backend; `TEXTURESHOP_BACKEND` when omitted.
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// Output width; 512 (or the script's own width for `run`) when omitted.
    #[arg(long)]
    width: Option<u32>,

    /// Output height; 512 (or the script's own height for `run`) when omitted.
    #[arg(long)]
    height: Option<u32>,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct NoiseArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value_t = textureshop::node::noise::DEFAULT_OCTAVES)]
    octaves: u32,

    /// Seed of the synthesized noise texture.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct GradientArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, value_enum, default_value_t = KindChoice::RadialIn)]
    kind: KindChoice,
}

#[derive(Args, Debug)]
struct RaymarchArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value_t = DEMO_FRAMES)]
    frames: u64,

    #[arg(long, default_value_t = DEMO_FPS)]
    fps: u32,

    #[arg(long, default_value_t = textureshop::node::raymarch::DEFAULT_MAX_STEPS)]
    steps: u32,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Script JSON. `--width`/`--height` override its own size when given.
    #[arg(long)]
    script: PathBuf,
}

const DEFAULT_SIZE: u32 = 512;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Host,
    Gpu,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    HorizontalLeft,
    HorizontalRight,
    VerticalUp,
    VerticalDown,
    RadialIn,
    RadialOut,
}

impl From<KindChoice> for GradientKind {
    fn from(k: KindChoice) -> Self {
        match k {
            KindChoice::HorizontalLeft => GradientKind::HorizontalLeft,
            KindChoice::HorizontalRight => GradientKind::HorizontalRight,
            KindChoice::VerticalUp => GradientKind::VerticalUp,
            KindChoice::VerticalDown => GradientKind::VerticalDown,
            KindChoice::RadialIn => GradientKind::RadialIn,
            KindChoice::RadialOut => GradientKind::RadialOut,
        }
    }
}

fn main() -> anyhow::Result<()> {
    setup_logging()?;
    let cli = Cli::parse();
    match cli.cmd {
        Command::Noise(args) => cmd_noise(args),
        Command::Gradient(args) => cmd_gradient(args),
        Command::Raymarch(args) => cmd_raymarch(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn setup_logging() -> anyhow::Result<()> {
    let filters = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("textureshop=info".parse()?)
        .from_env_lossy();
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filters);
    tracing_subscriber::registry().with(layer).init();
    Ok(())
}

fn open_context(common: &CommonArgs) -> anyhow::Result<DeviceContext> {
    let mut settings = DeviceSettings::from_env()?;
    if let Some(choice) = common.backend {
        settings = settings.with_backend(match choice {
            BackendChoice::Host => BackendKind::Host,
            BackendChoice::Gpu => BackendKind::Gpu,
        });
    }
    DeviceContext::create(&settings).context("create device context")
}

/// Device context and canvas for one command.
fn open(common: &CommonArgs) -> anyhow::Result<Canvas> {
    let ctx = open_context(common)?;
    let width = common.width.unwrap_or(DEFAULT_SIZE);
    let height = common.height.unwrap_or(DEFAULT_SIZE);
    Ok(Canvas::new(&ctx, width, height)?)
}

fn cmd_noise(args: NoiseArgs) -> anyhow::Result<()> {
    let canvas = open(&args.common)?;
    let mut node = FbmNoise::new().with_octaves(args.octaves);
    if let Some(seed) = args.seed {
        node = node.with_seed(seed);
    }
    let out = node.configure(&canvas, None)?.execute()?;
    write(&args.common.out, &out)
}

fn cmd_gradient(args: GradientArgs) -> anyhow::Result<()> {
    let canvas = open(&args.common)?;
    let out = Gradient::new(args.kind.into())
        .configure(&canvas)?
        .execute()?;
    write(&args.common.out, &out)
}

fn cmd_raymarch(args: RaymarchArgs) -> anyhow::Result<()> {
    let canvas = open(&args.common)?;
    let light = demo_light();
    let mut pipeline = RaymarchPipeline::with_max_steps(
        &canvas,
        &DistanceField::demo_scene(),
        &Bxdf::lambert(),
        Some(&light),
        Some(&demo_orbit(0)),
        args.steps,
    )?;

    let out = &args.common.out;
    let mut sink: Box<dyn FrameSink> = if out.extension().is_some_and(|e| e == "mp4") {
        Box::new(FfmpegSink::new(FfmpegSinkOpts::new(out)))
    } else {
        Box::new(PngSequenceSink::new(out, "frame"))
    };
    let frames = pipeline.render_to_sink(sink.as_mut(), args.frames, args.fps, |i, p| {
        p.set_camera(&demo_orbit(i))
    })?;
    eprintln!("wrote {frames} frames to {}", out.display());
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let ctx = open_context(&args.common)?;
    let script = GraphScript::from_path(&args.script)
        .with_context(|| format!("load script '{}'", args.script.display()))?;
    let mut def = script.def().clone();
    def.width = args.common.width.unwrap_or(def.width);
    def.height = args.common.height.unwrap_or(def.height);
    let results = GraphScript::from_def(def)?.run(&ctx)?;
    let out = results
        .output()
        .context("script produced no output step")?;
    write(&args.common.out, out)
}

fn write(path: &Path, buf: &textureshop::PixelBuffer) -> anyhow::Result<()> {
    save_pixels(path, buf)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
