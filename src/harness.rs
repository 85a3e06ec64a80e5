//! Animation loop harness: frame scheduling state machine, FPS measurement,
//! pointer tracking and start/stop lifecycle.
//!
//! The harness is host-agnostic. The host's drive loop (a window pump, a
//! headless stepper, a test) is the scheduling primitive: it calls
//! [`AnimationLoop::tick`] once per scheduled tick and the harness decides
//! whether that tick executes a frame. Stopping flips the playback flag the
//! driver observes; there is no other cancellation channel.

pub mod clock;
pub mod pointer;

use std::collections::VecDeque;
use std::time::Duration;

use kurbo::Point;

use crate::foundation::math::mean;
use crate::harness::pointer::{PointerEvent, PointerState};

/// Number of instantaneous fps samples kept in the rolling window.
const FPS_WINDOW: usize = 20;

/// Seed value for the fps window when no throttle target is configured.
const FALLBACK_SEED_FPS: f64 = 60.0;

/// Configuration for one [`AnimationLoop`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopOptions {
    /// Whether playback starts on its own. `false` builds a harness that
    /// only runs after an explicit [`AnimationLoop::start`].
    pub will_play: bool,
    /// Delay before the deferred auto-start fires.
    pub delay: Duration,
    /// Auto-stop this long after construction, when set.
    pub end_after: Option<Duration>,
    /// Target frame rate. `None` (or a non-positive value) disables
    /// throttling and every tick executes.
    pub throttle_fps: Option<f64>,
    /// Inactivity span after which the pointer is flagged idle.
    pub pointer_idle_timeout: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            will_play: true,
            delay: Duration::ZERO,
            end_after: None,
            throttle_fps: None,
            pointer_idle_timeout: Duration::from_millis(3500),
        }
    }
}

/// Timing snapshot for one executed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTiming {
    /// Whole milliseconds since the harness was built, rounded.
    pub elapsed_ms: u64,
    /// Milliseconds since the previously executed frame.
    pub delta_ms: f64,
    /// 1-based index of this frame.
    pub frame_count: u64,
    /// Rolling average fps over the last [`FPS_WINDOW`] executed frames.
    pub fps: f64,
}

/// Payload handed to the frame callback on every executed frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameState {
    pub timing: FrameTiming,
    pub pointer: PointerState,
    pub is_playing: bool,
}

/// Playback requests raised from inside a frame callback.
///
/// Applied after the callback returns, so a frame can stop (or restart) the
/// loop without re-entering the harness. Stop is applied before start.
#[derive(Debug, Default)]
pub struct LoopControl {
    stop_requested: bool,
    start_requested: bool,
}

impl LoopControl {
    /// Request that playback halt once this frame completes.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    /// Request that playback (re)start once this frame completes.
    pub fn start(&mut self) {
        self.start_requested = true;
    }
}

/// What a single host tick amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Playback is stopped; nothing advanced.
    Stopped,
    /// Playing, but the throttle window has not elapsed yet.
    Skipped,
    /// A frame executed.
    Executed,
}

/// The animation loop state machine.
///
/// States are `{stopped, playing}`; [`start`](Self::start) and
/// [`stop`](Self::stop) are idempotent. All mutation happens on the host's
/// single drive thread, so the harness holds plain data and no locks.
#[derive(Debug)]
pub struct AnimationLoop {
    opts: LoopOptions,

    playing: bool,
    start_at: Option<Duration>,
    stop_at: Option<Duration>,

    start_time: Duration,
    prev_frame_time: Duration,
    elapsed_ms: u64,
    delta_ms: f64,
    frame_count: u64,
    fps_samples: VecDeque<f64>,
    average_fps: f64,

    pointer: PointerState,
    pointer_bounds: Option<(f64, f64)>,
    last_pointer_move: Option<Duration>,
}

impl AnimationLoop {
    /// Build a harness at clock time `now`.
    ///
    /// When `will_play` is set, the deferred start (after `delay`) and the
    /// deferred stop (`end_after` from now) are armed as one-shot triggers,
    /// fired by whichever tick first observes their time.
    pub fn new(opts: LoopOptions, now: Duration) -> Self {
        let seed_fps = opts
            .throttle_fps
            .filter(|fps| *fps > 0.0)
            .unwrap_or(FALLBACK_SEED_FPS);

        let (start_at, stop_at) = if opts.will_play {
            (Some(now + opts.delay), opts.end_after.map(|d| now + d))
        } else {
            (None, None)
        };

        Self {
            opts,
            playing: false,
            start_at,
            stop_at,
            start_time: now,
            prev_frame_time: now,
            elapsed_ms: 0,
            delta_ms: 0.0,
            frame_count: 1,
            fps_samples: VecDeque::from(vec![seed_fps; FPS_WINDOW]),
            average_fps: seed_fps,
            pointer: PointerState::default(),
            pointer_bounds: None,
            last_pointer_move: None,
        }
    }

    /// Logical surface size used to normalize pointer positions. Degenerate
    /// bounds leave pointer tracking inactive.
    pub fn set_pointer_bounds(&mut self, width: f64, height: f64) {
        self.pointer_bounds = (width > 0.0 && height > 0.0).then_some((width, height));
    }

    /// Begin playback. No-op when already playing.
    pub fn start(&mut self) {
        if !self.playing {
            self.playing = true;
        }
    }

    /// Halt playback and cancel further frame execution. No-op when already
    /// stopped; safe before the first start.
    pub fn stop(&mut self) {
        if self.playing {
            self.playing = false;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether a deferred auto-start is still armed.
    pub fn has_pending_start(&self) -> bool {
        self.start_at.is_some()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Rolling average fps over recently executed frames.
    pub fn average_fps(&self) -> f64 {
        self.average_fps
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Feed one normalized pointer event at clock time `now`.
    ///
    /// Movement updates position and normalized position, marks the surface
    /// entered and resets the idle timer. Release only clears the held flag.
    pub fn pointer_event(&mut self, event: PointerEvent, now: Duration) {
        match event {
            PointerEvent::Press { position } => {
                self.apply_pointer_move(position, now);
                self.pointer.is_down = true;
            }
            PointerEvent::Move { position } => {
                self.apply_pointer_move(position, now);
            }
            PointerEvent::Release => {
                self.pointer.is_down = false;
            }
        }
    }

    fn apply_pointer_move(&mut self, position: Point, now: Duration) {
        // No host bounds: tracking stays inactive.
        let Some((w, h)) = self.pointer_bounds else {
            return;
        };
        self.pointer.position = position;
        self.pointer.normalized = Point::new(position.x / w, position.y / h);
        self.pointer.has_entered = true;
        self.pointer.is_idle = false;
        self.last_pointer_move = Some(now);
    }

    fn update_idle(&mut self, now: Duration) {
        if self.pointer.is_idle {
            return;
        }
        if let Some(last) = self.last_pointer_move
            && now.saturating_sub(last) >= self.opts.pointer_idle_timeout
        {
            self.pointer.is_idle = true;
        }
    }

    /// Advance the loop by one host tick without a frame callback.
    pub fn advance(&mut self, now: Duration) -> TickOutcome {
        self.tick(now, |_, _| {})
    }

    /// Process one host tick at clock time `now`.
    ///
    /// Fires due one-shot triggers, then, while playing, computes timing and
    /// decides whether the throttle allows a frame. On an executed frame the
    /// callback receives the pre-advance [`FrameState`]; afterwards the frame
    /// counter advances and the raw instantaneous fps (from the unthrottled
    /// delta) is folded into the rolling window.
    pub fn tick<F>(&mut self, now: Duration, on_frame: F) -> TickOutcome
    where
        F: FnOnce(&FrameState, &mut LoopControl),
    {
        if let Some(at) = self.start_at
            && now >= at
        {
            self.start_at = None;
            self.start();
        }
        if let Some(at) = self.stop_at
            && now >= at
        {
            self.stop_at = None;
            self.stop();
        }

        self.update_idle(now);

        if !self.playing {
            return TickOutcome::Stopped;
        }

        self.elapsed_ms = round_ms(now.saturating_sub(self.start_time));
        self.delta_ms = now.saturating_sub(self.prev_frame_time).as_secs_f64() * 1000.0;

        if let Some(target) = self.opts.throttle_fps
            && target > 0.0
            && self.delta_ms < 1000.0 / target
        {
            return TickOutcome::Skipped;
        }

        let state = FrameState {
            timing: FrameTiming {
                elapsed_ms: self.elapsed_ms,
                delta_ms: self.delta_ms,
                frame_count: self.frame_count,
                fps: self.average_fps,
            },
            pointer: self.pointer,
            is_playing: self.playing,
        };
        let mut control = LoopControl::default();
        on_frame(&state, &mut control);

        self.frame_count += 1;
        let current_fps = if self.delta_ms > 0.0 {
            (1000.0 / self.delta_ms).round()
        } else {
            self.average_fps
        };
        self.fps_samples.pop_front();
        self.fps_samples.push_back(current_fps);
        self.average_fps = mean(self.fps_samples.make_contiguous());
        self.prev_frame_time = now;

        if control.stop_requested {
            self.stop();
        }
        if control.start_requested {
            self.start();
        }

        TickOutcome::Executed
    }
}

fn round_ms(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::clock::{Clock, ManualClock};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn harness(opts: LoopOptions) -> (AnimationLoop, ManualClock) {
        let clock = ManualClock::new();
        let mut h = AnimationLoop::new(opts, clock.now());
        h.set_pointer_bounds(100.0, 50.0);
        (h, clock)
    }

    #[test]
    fn start_is_idempotent_and_stop_before_start_is_a_noop() {
        let (mut h, clock) = harness(LoopOptions {
            will_play: false,
            ..LoopOptions::default()
        });

        h.stop();
        assert!(!h.is_playing());

        h.start();
        h.start();
        assert!(h.is_playing());

        // One tick, one frame: a double start did not double the schedule.
        clock.advance(ms(16));
        let mut frames = 0;
        h.tick(clock.now(), |_, _| frames += 1);
        assert_eq!(frames, 1);

        h.stop();
        h.stop();
        assert!(!h.is_playing());
    }

    #[test]
    fn frame_counter_advances_by_executed_frames() {
        let (mut h, clock) = harness(LoopOptions::default());

        let executed = 5;
        for _ in 0..executed {
            clock.advance(ms(16));
            assert_eq!(h.tick(clock.now(), |_, _| {}), TickOutcome::Executed);
        }
        // Counter starts at 1 and advances after each executed frame.
        assert_eq!(h.frame_count(), 1 + executed);
    }

    #[test]
    fn callback_sees_pre_advance_state() {
        let (mut h, clock) = harness(LoopOptions::default());
        clock.advance(ms(20));
        h.tick(clock.now(), |state, _| {
            assert_eq!(state.timing.frame_count, 1);
            assert_eq!(state.timing.elapsed_ms, 20);
            assert_eq!(state.timing.delta_ms, 20.0);
            assert!(state.is_playing);
        });
    }

    #[test]
    fn timing_advances_without_a_callback() {
        let (mut h, clock) = harness(LoopOptions::default());
        for _ in 0..3 {
            clock.advance(ms(10));
            h.advance(clock.now());
        }
        assert_eq!(h.frame_count(), 4);
        assert_eq!(h.elapsed_ms(), 30);
    }

    #[test]
    fn throttle_skips_until_period_elapsed_and_folds_raw_fps() {
        let (mut h, clock) = harness(LoopOptions {
            throttle_fps: Some(10.0),
            ..LoopOptions::default()
        });

        // 60 Hz host ticks against a 100ms period: frames execute every
        // seventh tick (first delta reaching 100ms is 112ms).
        let mut executed = Vec::new();
        for _ in 0..60 {
            clock.advance(ms(16));
            if h.tick(clock.now(), |_, _| {}) == TickOutcome::Executed {
                executed.push(clock.now());
            }
        }
        assert!(executed.len() <= 10);
        assert!(executed.len() >= 8);
        for pair in executed.windows(2) {
            assert!(pair[1] - pair[0] >= ms(100));
        }

        // The rolling window absorbed the measured 1000/112 ~= 9 fps, not the
        // throttled target of 10.
        let expected_sample = (1000.0f64 / 112.0).round();
        let folded = executed.len() as f64;
        let expected_avg =
            ((FPS_WINDOW as f64 - folded) * 10.0 + folded * expected_sample) / FPS_WINDOW as f64;
        assert!((h.average_fps() - expected_avg).abs() < 1e-9);
    }

    #[test]
    fn zero_throttle_disables_skipping() {
        let (mut h, clock) = harness(LoopOptions {
            throttle_fps: Some(0.0),
            ..LoopOptions::default()
        });
        for _ in 0..5 {
            clock.advance(ms(1));
            assert_eq!(h.advance(clock.now()), TickOutcome::Executed);
        }
    }

    #[test]
    fn delayed_start_fires_once_due() {
        let (mut h, clock) = harness(LoopOptions {
            delay: ms(100),
            ..LoopOptions::default()
        });

        clock.advance(ms(50));
        assert_eq!(h.advance(clock.now()), TickOutcome::Stopped);
        assert!(!h.is_playing());

        clock.advance(ms(60));
        assert_eq!(h.advance(clock.now()), TickOutcome::Executed);
        assert!(h.is_playing());
    }

    #[test]
    fn end_after_stops_playback_and_frames() {
        let (mut h, clock) = harness(LoopOptions {
            end_after: Some(ms(50)),
            ..LoopOptions::default()
        });

        clock.advance(ms(16));
        assert_eq!(h.advance(clock.now()), TickOutcome::Executed);

        clock.advance(ms(44)); // now = 60ms > 50ms
        let mut called = false;
        assert_eq!(
            h.tick(clock.now(), |_, _| called = true),
            TickOutcome::Stopped
        );
        assert!(!called);
        assert!(!h.is_playing());

        // And it stays stopped on later ticks.
        clock.advance(ms(16));
        assert_eq!(h.advance(clock.now()), TickOutcome::Stopped);
    }

    #[test]
    fn will_play_false_never_self_starts() {
        let (mut h, clock) = harness(LoopOptions {
            will_play: false,
            end_after: Some(ms(10)),
            ..LoopOptions::default()
        });
        for _ in 0..10 {
            clock.advance(ms(16));
            assert_eq!(h.advance(clock.now()), TickOutcome::Stopped);
        }
    }

    #[test]
    fn stop_from_inside_a_frame_halts_further_frames() {
        let (mut h, clock) = harness(LoopOptions::default());

        clock.advance(ms(16));
        h.tick(clock.now(), |_, control| control.stop());
        assert!(!h.is_playing());

        clock.advance(ms(16));
        assert_eq!(h.advance(clock.now()), TickOutcome::Stopped);
    }

    #[test]
    fn pointer_move_updates_position_and_normalization() {
        let (mut h, clock) = harness(LoopOptions::default());
        assert!(!h.pointer().has_entered);

        h.pointer_event(
            PointerEvent::Move {
                position: Point::new(50.0, 25.0),
            },
            clock.now(),
        );
        let p = h.pointer();
        assert_eq!(p.position, Point::new(50.0, 25.0));
        assert_eq!(p.normalized, Point::new(0.5, 0.5));
        assert!(p.has_entered);
        assert!(!p.is_idle);
    }

    #[test]
    fn press_and_release_toggle_is_down() {
        let (mut h, clock) = harness(LoopOptions::default());
        h.pointer_event(
            PointerEvent::Press {
                position: Point::new(1.0, 1.0),
            },
            clock.now(),
        );
        assert!(h.pointer().is_down);
        assert!(h.pointer().has_entered);

        h.pointer_event(PointerEvent::Release, clock.now());
        assert!(!h.pointer().is_down);
    }

    #[test]
    fn pointer_without_bounds_stays_inert_except_button() {
        let clock = ManualClock::new();
        let mut h = AnimationLoop::new(LoopOptions::default(), clock.now());

        h.pointer_event(
            PointerEvent::Press {
                position: Point::new(9.0, 9.0),
            },
            clock.now(),
        );
        assert!(h.pointer().is_down);
        assert!(!h.pointer().has_entered);
        assert_eq!(h.pointer().position, Point::ORIGIN);
    }

    #[test]
    fn idle_flips_true_exactly_once_after_timeout() {
        let (mut h, clock) = harness(LoopOptions {
            pointer_idle_timeout: ms(3500),
            ..LoopOptions::default()
        });

        h.pointer_event(
            PointerEvent::Move {
                position: Point::new(10.0, 10.0),
            },
            clock.now(),
        );
        assert!(!h.pointer().is_idle);

        let mut flips = 0;
        let mut was_idle = h.pointer().is_idle;
        for _ in 0..300 {
            clock.advance(ms(16));
            h.advance(clock.now());
            if h.pointer().is_idle && !was_idle {
                flips += 1;
            }
            was_idle = h.pointer().is_idle;
        }
        assert_eq!(flips, 1);
        assert!(h.pointer().is_idle);
    }

    #[test]
    fn movement_resets_the_idle_timer() {
        let (mut h, clock) = harness(LoopOptions {
            pointer_idle_timeout: ms(100),
            ..LoopOptions::default()
        });

        h.pointer_event(
            PointerEvent::Move {
                position: Point::new(1.0, 1.0),
            },
            clock.now(),
        );
        clock.advance(ms(90));
        h.advance(clock.now());
        assert!(!h.pointer().is_idle);

        // A fresh move restarts the countdown.
        h.pointer_event(
            PointerEvent::Move {
                position: Point::new(2.0, 2.0),
            },
            clock.now(),
        );
        clock.advance(ms(90));
        h.advance(clock.now());
        assert!(!h.pointer().is_idle);

        clock.advance(ms(20));
        h.advance(clock.now());
        assert!(h.pointer().is_idle);
    }
}
