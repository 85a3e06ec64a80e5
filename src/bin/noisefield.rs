use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kurbo::{Circle, Point, Shape};

use noisefield::{
    DrawFn, Rng, SketchConfig, SketchCtx, hex_to_rgba8, lerp, lerp_point, map_range, noise_1d,
    noise_2d, render_frames, run_sketch, sample_path_points,
};

#[derive(Parser, Debug)]
#[command(name = "noisefield", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sketch in a window.
    Run(RunArgs),
    /// Render frames headlessly and write the last one as a PNG.
    Capture(CaptureArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CaptureArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of executed frames to advance before capturing.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Reproducibility seed. Omitted: a fresh seed is generated and logged.
    #[arg(long)]
    seed: Option<String>,

    /// Renderer settings JSON; the flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logical surface width.
    #[arg(long)]
    width: Option<u32>,

    /// Logical surface height.
    #[arg(long)]
    height: Option<u32>,

    /// Throttle to this frame rate.
    #[arg(long)]
    fps: Option<f64>,

    /// Delay playback start by this many milliseconds.
    #[arg(long)]
    delay: Option<u64>,

    /// Stop playback this many milliseconds after startup.
    #[arg(long)]
    end_after: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Capture(args) => cmd_capture(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.common)?;
    let rng = Rng::new(args.common.seed.as_deref());
    run_sketch(config, noise_curves_sketch(rng))?;
    Ok(())
}

fn cmd_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let config = load_config(&args.common)?;
    let rng = Rng::new(args.common.seed.as_deref());

    let surface = render_frames(&config, noise_curves_sketch(rng), args.frames)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        surface.rgba_bytes(),
        u32::from(surface.physical_width()),
        u32::from(surface.physical_height()),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn load_config(common: &CommonArgs) -> anyhow::Result<SketchConfig> {
    let mut config = match &common.config {
        Some(path) => {
            let f =
                File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
            serde_json::from_reader(BufReader::new(f)).with_context(|| "parse config JSON")?
        }
        None => SketchConfig::default(),
    };

    if common.width.is_some() || common.height.is_some() {
        let (dw, dh) = config.resolved_dimensions();
        config.dimensions = Some([common.width.unwrap_or(dw), common.height.unwrap_or(dh)]);
    }
    if common.fps.is_some() {
        config.animation.fps = common.fps;
    }
    if let Some(delay) = common.delay {
        config.animation.delay_ms = delay;
    }
    if common.end_after.is_some() {
        config.animation.end_after_ms = common.end_after;
    }
    Ok(config)
}

// <- the sketch ->

// A few entries from the classic "nice color palettes" set.
const PALETTES: [[&str; 5]; 3] = [
    ["#69d2e7", "#a7dbd8", "#e0e4cc", "#f38630", "#fa6900"],
    ["#fe4365", "#fc9d9a", "#f9cdad", "#c8c8a9", "#83af9b"],
    ["#ecd078", "#d95b43", "#c02942", "#542437", "#53777a"],
];

const FALLBACK_BG: [u8; 4] = [20, 22, 30, 255];
const FALLBACK_FG: [u8; 4] = [230, 228, 204, 255];

/// How many anchor points each walker connects to per frame.
const WHISKER_COUNT: usize = 15;

struct NoisePoint {
    x_off: f64,
    y_off: f64,
    velocity: f64,
    position: Point,
}

impl NoisePoint {
    fn new(rng: &mut Rng) -> Self {
        Self {
            x_off: rng.in_range_to(200.0),
            y_off: rng.in_range(400.0, 600.0),
            velocity: rng.gaussian(0.005, 0.001),
            position: Point::ORIGIN,
        }
    }

    fn step(&mut self, width: f64, height: f64) {
        self.x_off += self.velocity;
        self.y_off += self.velocity;
        self.position = Point::new(
            map_range(noise_1d(self.x_off), -1.0, 1.0, 0.0, width),
            map_range(noise_1d(self.y_off), -1.0, 1.0, 0.0, height),
        );
    }

    fn nearest_anchors(&self, anchors: &[Point], count: usize) -> Vec<Point> {
        let mut sorted = anchors.to_vec();
        sorted.sort_by(|a, b| {
            self.position
                .distance(*a)
                .total_cmp(&self.position.distance(*b))
        });
        sorted.truncate(count);
        sorted
    }

    fn whisker(&self, target: Point) -> (Point, Point, Point, Point) {
        let mid = lerp_point(self.position, target, 0.5);
        let sway = noise_2d(self.x_off, self.y_off) * 40.0;
        let cp1 = Point::new(lerp(self.position.x, mid.x, 0.5), mid.y + sway);
        let cp2 = Point::new(lerp(mid.x, target.x, 0.5), mid.y - sway);
        (self.position, cp1, cp2, target)
    }
}

/// Wandering noise walkers throwing bezier whiskers at a ring of anchors.
fn noise_curves_sketch(mut rng: Rng) -> impl FnOnce(&mut SketchCtx<'_>) -> DrawFn {
    move |ctx| {
        let palette = *rng.pick(&PALETTES).unwrap_or(&PALETTES[0]);
        let background = rng
            .pick(&palette)
            .and_then(|hex| hex_to_rgba8(hex).ok())
            .unwrap_or(FALLBACK_BG);
        let mut foreground = FALLBACK_FG;
        for _ in 0..8 {
            if let Some(candidate) = rng.pick(&palette).and_then(|hex| hex_to_rgba8(hex).ok())
                && candidate != background
            {
                foreground = candidate;
                break;
            }
        }

        let (width, height) = (ctx.width, ctx.height);
        let center = Point::new(width / 2.0, height / 2.0);
        let radius = width.min(height).min(900.0) * 0.35;
        let anchors = sample_path_points(&Circle::new(center, radius).to_path(0.01), 14.0);

        let mut walkers: Vec<NoisePoint> = (0..6).map(|_| NoisePoint::new(&mut rng)).collect();

        ctx.pen().clear_background(background);

        // Translucent veil each frame so old curves fade into trails.
        let veil = [background[0], background[1], background[2], 24];

        Box::new(move |frame| {
            let pointer = frame.pointer;

            let mut pen = frame.pen();
            pen.clear_background(veil);

            for walker in &mut walkers {
                walker.step(width, height);
                for target in walker.nearest_anchors(&anchors, WHISKER_COUNT) {
                    let (a, cp1, cp2, b) = walker.whisker(target);
                    pen.bezier_curve_between(a, cp1, cp2, b, foreground, 1.5);
                }
                pen.stroke_circle(walker.position, 3.0, [255, 255, 255, 255], 1.0);
            }

            // A held pointer leaves a ring where it rests.
            if pointer.has_entered && pointer.is_down {
                pen.stroke_circle(pointer.position, 18.0, foreground, 2.0);
            }
        })
    }
}
