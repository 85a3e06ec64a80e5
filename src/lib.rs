//! noisefield is a toolkit for noise-driven generative-art animations.
//!
//! The pieces, smallest first:
//!
//! - [`Rng`] — a seedable, replayable randomness source with derived
//!   distributions (ranges, gaussian, picks, shuffles, circle/sphere points)
//! - [`noise`] — deterministic 1D/2D simplex noise for smooth motion
//! - [`AnimationLoop`] — the frame-loop harness: timing, rolling FPS,
//!   pointer tracking, start/stop lifecycle
//! - [`Surface`] + [`renderer`] — a CPU drawing surface bound to a window,
//!   feeding a sketch's setup/draw pair
//!
//! A sketch registers a setup function via [`renderer::run_sketch`]; setup
//! receives the initial surface snapshot once and returns the draw closure
//! that runs on every executed frame with live timing and pointer state.
#![forbid(unsafe_code)]

pub mod draw;
pub mod foundation;
pub mod harness;
pub mod noise;
pub mod random;
pub mod renderer;
pub mod rng;
pub mod surface;

pub use draw::{Pen, Rgba, hex_to_rgba8, is_valid_hex, sample_path_points};
pub use foundation::error::{NoisefieldError, NoisefieldResult};
pub use foundation::math::{Point, Vec2, Vec3, distance, lerp, lerp_point, map_range, mean};
pub use harness::clock::{Clock, ManualClock, SystemClock};
pub use harness::pointer::{PointerEvent, PointerState};
pub use harness::{AnimationLoop, FrameState, FrameTiming, LoopControl, LoopOptions, TickOutcome};
pub use noise::{noise_1d, noise_2d};
pub use renderer::{
    AnimationSettings, DrawFn, FrameCtx, SketchConfig, SketchCtx, render_frames, run_sketch,
};
pub use rng::Rng;
pub use surface::Surface;
