//! Binds a sketch to a drawing surface and the animation loop harness.
//!
//! A sketch is a setup function: it receives one initial snapshot of the
//! surface and returns the draw closure that runs on every executed frame
//! with the merged live state (timing, pointer, playback control).

use std::time::Duration;

use kurbo::Point;

use crate::draw::Pen;
use crate::foundation::error::{NoisefieldError, NoisefieldResult};
use crate::harness::clock::{Clock, ManualClock, SystemClock};
use crate::harness::pointer::{PointerEvent, PointerState};
use crate::harness::{AnimationLoop, FrameTiming, LoopControl, LoopOptions, TickOutcome};
use crate::surface::Surface;

/// Fallback logical size when the config does not name dimensions, standing
/// in for the host viewport of a desktop window.
const DEFAULT_DIMENSIONS: (u32, u32) = (1280, 720);

/// Host tick rate for the windowed drive loop. The harness throttles on top
/// of this, so it only bounds how often ticks are offered.
const HOST_TICK_FPS: usize = 120;

/// Playback timing knobs, all optional.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Target frame rate; unset runs unthrottled.
    pub fps: Option<f64>,
    /// Milliseconds before playback starts.
    pub delay_ms: u64,
    /// Stop playback this many milliseconds after binding.
    pub end_after_ms: Option<u64>,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            fps: None,
            delay_ms: 0,
            end_after_ms: None,
        }
    }
}

/// Renderer configuration. Every field has an independent default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub title: String,
    /// Logical surface size; unset falls back to the host viewport default.
    pub dimensions: Option<[u32; 2]>,
    /// Device pixel density correction factor.
    pub pixel_ratio: f64,
    pub is_animated: bool,
    pub animation: AnimationSettings,
    /// Milliseconds of stillness before the pointer counts as idle.
    pub pointer_idle_timeout_ms: u64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            title: "noisefield".to_owned(),
            dimensions: None,
            pixel_ratio: 1.0,
            is_animated: true,
            animation: AnimationSettings::default(),
            pointer_idle_timeout_ms: 3500,
        }
    }
}

impl SketchConfig {
    pub fn resolved_dimensions(&self) -> (u32, u32) {
        self.dimensions
            .map(|[w, h]| (w, h))
            .unwrap_or(DEFAULT_DIMENSIONS)
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            will_play: self.is_animated,
            delay: Duration::from_millis(self.animation.delay_ms),
            end_after: self.animation.end_after_ms.map(Duration::from_millis),
            throttle_fps: self.animation.fps,
            pointer_idle_timeout: Duration::from_millis(self.pointer_idle_timeout_ms),
        }
    }
}

/// Initial snapshot handed to the setup function, exactly once.
pub struct SketchCtx<'a> {
    surface: &'a mut Surface,
    pub width: f64,
    pub height: f64,
    pub aspect: f64,
    pub pointer_position: Point,
    pub pointer_has_entered: bool,
}

impl SketchCtx<'_> {
    pub fn pen(&mut self) -> Pen<'_> {
        self.surface.pen()
    }

    /// The bound surface itself, for sketches that need more than the pen.
    pub fn surface(&mut self) -> &mut Surface {
        self.surface
    }
}

/// Merged live state for one executed frame.
pub struct FrameCtx<'a> {
    surface: &'a mut Surface,
    pub width: f64,
    pub height: f64,
    pub aspect: f64,
    pub timing: FrameTiming,
    pub pointer: PointerState,
    pub is_playing: bool,
    control: &'a mut LoopControl,
}

impl FrameCtx<'_> {
    pub fn pen(&mut self) -> Pen<'_> {
        self.surface.pen()
    }

    /// The bound surface itself, for sketches that need more than the pen.
    pub fn surface(&mut self) -> &mut Surface {
        self.surface
    }

    /// Halt playback once this frame completes.
    pub fn stop(&mut self) {
        self.control.stop();
    }

    /// Restart playback once this frame completes.
    pub fn start(&mut self) {
        self.control.start();
    }
}

/// The per-frame draw closure a setup function returns.
pub type DrawFn = Box<dyn FnMut(&mut FrameCtx<'_>)>;

/// Open a window and run the sketch until it is closed (or Escape).
///
/// Surface or window creation failures are fatal and reported before any
/// animation starts.
pub fn run_sketch<S>(config: SketchConfig, setup: S) -> NoisefieldResult<()>
where
    S: FnOnce(&mut SketchCtx<'_>) -> DrawFn,
{
    let (w, h) = config.resolved_dimensions();
    let mut surface = Surface::new(w, h, config.pixel_ratio)?;
    let mut window = minifb::Window::new(
        &config.title,
        w as usize,
        h as usize,
        minifb::WindowOptions::default(),
    )
    .map_err(|e| NoisefieldError::surface(format!("could not create window: {e}")))?;
    window.set_target_fps(HOST_TICK_FPS);

    let clock = SystemClock::new();
    let mut harness = AnimationLoop::new(config.loop_options(), clock.now());
    harness.set_pointer_bounds(surface.width(), surface.height());

    let mut draw = bind_sketch(&mut surface, setup);
    tracing::debug!(width = w, height = h, "sketch bound, entering drive loop");

    let mut was_down = false;
    let mut last_position: Option<Point> = None;
    while window.is_open() && !window.is_key_down(minifb::Key::Escape) {
        let now = clock.now();
        pump_pointer(&window, &mut harness, now, &mut was_down, &mut last_position);

        let outcome = drive_tick(&mut harness, &mut surface, &mut draw, now);
        if outcome == TickOutcome::Executed {
            let (pw, ph) = (surface.physical_width(), surface.physical_height());
            let buffer = surface.present();
            window
                .update_with_buffer(buffer, usize::from(pw), usize::from(ph))
                .map_err(|e| NoisefieldError::surface(format!("window present failed: {e}")))?;
        } else {
            window.update();
        }
    }
    Ok(())
}

/// Drive the sketch headlessly for up to `frames` executed frames on a
/// synthetic clock and return the surface with the last frame rendered.
///
/// Stops early when playback halts with no pending auto-start (for example
/// an `end_after_ms` deadline, or `is_animated: false`).
pub fn render_frames<S>(config: &SketchConfig, setup: S, frames: u64) -> NoisefieldResult<Surface>
where
    S: FnOnce(&mut SketchCtx<'_>) -> DrawFn,
{
    let (w, h) = config.resolved_dimensions();
    let mut surface = Surface::new(w, h, config.pixel_ratio)?;

    let clock = ManualClock::new();
    let opts = config.loop_options();
    let step_fps = opts.throttle_fps.filter(|f| *f > 0.0).unwrap_or(60.0);
    let step = Duration::from_nanos((1e9 / step_fps).ceil() as u64);

    let mut harness = AnimationLoop::new(opts, clock.now());
    harness.set_pointer_bounds(surface.width(), surface.height());

    let mut draw = bind_sketch(&mut surface, setup);

    let mut executed = 0u64;
    while executed < frames {
        clock.advance(step);
        let outcome = drive_tick(&mut harness, &mut surface, &mut draw, clock.now());
        match outcome {
            TickOutcome::Executed => {
                executed += 1;
                surface.present();
            }
            TickOutcome::Stopped if !harness.has_pending_start() => break,
            _ => {}
        }
    }
    Ok(surface)
}

fn bind_sketch<S>(surface: &mut Surface, setup: S) -> DrawFn
where
    S: FnOnce(&mut SketchCtx<'_>) -> DrawFn,
{
    let (width, height, aspect) = (surface.width(), surface.height(), surface.aspect());
    let mut ctx = SketchCtx {
        surface,
        width,
        height,
        aspect,
        pointer_position: Point::ORIGIN,
        pointer_has_entered: false,
    };
    setup(&mut ctx)
}

fn drive_tick(
    harness: &mut AnimationLoop,
    surface: &mut Surface,
    draw: &mut DrawFn,
    now: Duration,
) -> TickOutcome {
    let (width, height, aspect) = (surface.width(), surface.height(), surface.aspect());
    harness.tick(now, |state, control| {
        let mut fctx = FrameCtx {
            surface,
            width,
            height,
            aspect,
            timing: state.timing,
            pointer: state.pointer,
            is_playing: state.is_playing,
            control,
        };
        draw(&mut fctx);
    })
}

fn pump_pointer(
    window: &minifb::Window,
    harness: &mut AnimationLoop,
    now: Duration,
    was_down: &mut bool,
    last_position: &mut Option<Point>,
) {
    let down = window.get_mouse_down(minifb::MouseButton::Left);
    if let Some((mx, my)) = window.get_mouse_pos(minifb::MouseMode::Discard) {
        let position = Point::new(f64::from(mx), f64::from(my));
        if down && !*was_down {
            harness.pointer_event(PointerEvent::Press { position }, now);
        } else if *last_position != Some(position) {
            harness.pointer_event(PointerEvent::Move { position }, now);
        }
        *last_position = Some(position);
    }
    if !down && *was_down {
        harness.pointer_event(PointerEvent::Release, now);
    }
    *was_down = down;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_contract() {
        let cfg = SketchConfig::default();
        assert!(cfg.is_animated);
        assert_eq!(cfg.pixel_ratio, 1.0);
        assert_eq!(cfg.pointer_idle_timeout_ms, 3500);
        assert_eq!(cfg.animation.fps, None);
        assert_eq!(cfg.animation.delay_ms, 0);
        assert_eq!(cfg.animation.end_after_ms, None);
        assert_eq!(cfg.resolved_dimensions(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn config_deserializes_from_sparse_json() {
        let cfg: SketchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SketchConfig::default());

        let cfg: SketchConfig = serde_json::from_str(
            r#"{"dimensions": [640, 360], "animation": {"fps": 10.0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.resolved_dimensions(), (640, 360));
        assert_eq!(cfg.animation.fps, Some(10.0));
        assert_eq!(cfg.animation.delay_ms, 0);
        assert!(cfg.is_animated);
    }

    #[test]
    fn loop_options_mirror_config() {
        let cfg = SketchConfig {
            is_animated: false,
            animation: AnimationSettings {
                fps: Some(24.0),
                delay_ms: 250,
                end_after_ms: Some(5000),
            },
            pointer_idle_timeout_ms: 100,
            ..SketchConfig::default()
        };
        let opts = cfg.loop_options();
        assert!(!opts.will_play);
        assert_eq!(opts.throttle_fps, Some(24.0));
        assert_eq!(opts.delay, Duration::from_millis(250));
        assert_eq!(opts.end_after, Some(Duration::from_millis(5000)));
        assert_eq!(opts.pointer_idle_timeout, Duration::from_millis(100));
    }
}
