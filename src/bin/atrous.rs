use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "atrous", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Equalize an 8-bit image and write the result.
    Apply(ApplyArgs),
    /// Print the scale plan and tiling contract for an image size as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image (any format the `image` crate reads).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image; the format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Built-in curve preset, ignored when `--curves` is given.
    #[arg(long, value_enum, default_value_t = PresetChoice::Neutral)]
    preset: PresetChoice,

    /// Curve set JSON.
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Engine options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Processing scale of the input relative to the full image (1.0 = full resolution).
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,

    /// Print the plan as JSON to stdout before processing.
    #[arg(long)]
    dump_plan: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Tile width in pixels.
    #[arg(long)]
    width: u32,

    /// Tile height in pixels.
    #[arg(long)]
    height: u32,

    /// Processing scale relative to the full image.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Built-in curve preset, ignored when `--curves` is given.
    #[arg(long, value_enum, default_value_t = PresetChoice::Neutral)]
    preset: PresetChoice,

    /// Curve set JSON.
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Engine options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetChoice {
    Neutral,
    Clarity,
    Sharpen,
    Denoise,
    Bloom,
}

impl From<PresetChoice> for atrous::CurvePreset {
    fn from(p: PresetChoice) -> Self {
        match p {
            PresetChoice::Neutral => Self::Neutral,
            PresetChoice::Clarity => Self::Clarity,
            PresetChoice::Sharpen => Self::Sharpen,
            PresetChoice::Denoise => Self::Denoise,
            PresetChoice::Bloom => Self::Bloom,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn read_to_string(path: &Path, what: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {what} '{}'", path.display()))
}

fn load_curves(path: Option<&Path>, preset: PresetChoice) -> anyhow::Result<atrous::CurveSet> {
    match path {
        Some(p) => {
            let s = read_to_string(p, "curves")?;
            atrous::CurveSet::from_json_str(&s)
                .with_context(|| format!("parse curves '{}'", p.display()))
        }
        None => Ok(atrous::CurveSet::preset(preset.into())),
    }
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<atrous::EngineOpts> {
    match path {
        Some(p) => {
            let s = read_to_string(p, "config")?;
            atrous::EngineOpts::from_json_str(&s)
                .with_context(|| format!("parse config '{}'", p.display()))
        }
        None => Ok(atrous::EngineOpts::default()),
    }
}

/// Geometry of a `width x height` tile covering the whole image at `scale`.
fn tile_geometry(
    width: u32,
    height: u32,
    scale: f32,
) -> anyhow::Result<(atrous::PieceGeometry, atrous::Roi)> {
    if !scale.is_finite() || scale <= 0.0 {
        anyhow::bail!("--scale must be finite and > 0");
    }
    let full = |v: u32| ((v as f32 / scale).round() as u32).max(1);
    let geometry = atrous::PieceGeometry::new(full(width), full(height));
    let roi = atrous::Roi::new(width, height).with_scale(scale);
    Ok((geometry, roi))
}

fn plan_json(
    eq: &atrous::Equalizer,
    geometry: &atrous::PieceGeometry,
    roi: &atrous::Roi,
) -> anyhow::Result<serde_json::Value> {
    let plan = eq.plan(geometry, roi)?;
    let tiling = eq.tiling_requirements(geometry, roi)?;
    Ok(serde_json::json!({
        "geometry": geometry,
        "roi": roi,
        "num_scales": plan.num_scales(),
        "detail_index": plan.detail_index,
        "scales": plan.scales,
        "tiling": tiling,
    }))
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let curves = load_curves(args.curves.as_deref(), args.preset)?;
    let opts = load_opts(args.config.as_deref())?;
    let eq = atrous::Equalizer::new(opts, curves)?;
    let (geometry, roi) = tile_geometry(args.width, args.height, args.scale)?;
    let json = plan_json(&eq, &geometry, &roi)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let curves = load_curves(args.curves.as_deref(), args.preset)?;
    let opts = load_opts(args.config.as_deref())?;
    let eq = atrous::Equalizer::new(opts, curves)?;

    let rgba = image::open(&args.in_path)
        .with_context(|| format!("open image '{}'", args.in_path.display()))?
        .to_rgba8();
    let input = atrous::Image::from_rgba8(&rgba)?;
    let (geometry, roi) = tile_geometry(input.width(), input.height(), args.scale)?;

    if args.dump_plan {
        let json = plan_json(&eq, &geometry, &roi)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    let (output, stats) = run(&eq, args.backend, &input, &geometry, &roi)?;
    tracing::info!(
        num_scales = stats.num_scales,
        backend = ?stats.backend,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "equalized"
    );

    output
        .to_rgba8()?
        .save(&args.out)
        .with_context(|| format!("write image '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn run(
    eq: &atrous::Equalizer,
    backend: BackendChoice,
    input: &atrous::Image,
    geometry: &atrous::PieceGeometry,
    roi: &atrous::Roi,
) -> anyhow::Result<(atrous::Image, atrous::RunStats)> {
    match backend {
        BackendChoice::Cpu => Ok(eq.process_with_stats(input, geometry, roi, roi)?),
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => {
            let mut gpu = match atrous::GpuKernels::new() {
                Ok(gpu) => Some(gpu),
                Err(e) => {
                    tracing::warn!(error = %e, "gpu unavailable, using cpu");
                    None
                }
            };
            Ok(eq.process_auto(gpu.as_mut(), input, geometry, roi, roi)?)
        }
    }
}
