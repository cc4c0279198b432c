//! Race Draw - a randomized ranking draw styled as a horse race
//!
//! Core modules:
//! - `sim`: Deterministic race simulation (runners, physics, phases, ranking)
//! - `view`: Read-only projections for renderers (lanes, commentary, results)
//! - `scheduler`: Frame callback registration (headless or wall-clock)
//! - `driver`: Owns a draw and ticks it from a scheduler
//! - `recording`: Start/stop triggers for an external capture sink
//! - `config`: Participant list and draw options

pub mod config;
pub mod driver;
pub mod error;
pub mod recording;
pub mod scheduler;
pub mod sim;
pub mod view;

pub use config::DrawConfig;
pub use error::{DrawError, RecordingError};

/// Race tuning constants
pub mod consts {
    /// Default race length (seconds of wall time)
    pub const DEFAULT_RACE_DURATION: f64 = 20.0;
    /// Safety backstop past the configured duration before the race is forced to end
    pub const RACE_TIMEOUT_GRACE: f64 = 2.0;

    /// Per-tick step clamp (seconds)
    pub const MIN_STEP_DT: f64 = 0.001;
    pub const MAX_STEP_DT: f64 = 0.05;
    /// Step used on the very first tick of a race
    pub const FIRST_STEP_DT: f64 = 0.016;

    /// Slow motion scale applied to the step once latched
    pub const SLOW_MOTION_FACTOR: f64 = 0.6;
    /// Leader progress that latches slow motion
    pub const SLOW_MOTION_LEAD: f64 = 0.9;
    /// Remaining seconds that latch slow motion
    pub const SLOW_MOTION_REMAINING: f64 = 2.0;

    /// Velocity clamp (progress units per second)
    pub const MAX_VELOCITY: f64 = 0.28;
    /// Fraction of the gap to target velocity closed each tick
    pub const INERTIA: f64 = 0.45;
    /// Fatigue drag scale
    pub const FATIGUE_SCALE: f64 = 0.15;
    /// Fatigue coefficient band drawn at creation
    pub const FATIGUE_MIN: f64 = 0.02;
    pub const FATIGUE_MAX: f64 = 0.04;

    /// Rubber-banding: catch-up fraction per unit of gap, and its cap
    pub const RUBBER_BAND_GAIN: f64 = 0.5;
    pub const RUBBER_BAND_CAP: f64 = 0.18;
    /// Drafting bonus and the gap window it applies in
    pub const DRAFTING_BONUS: f64 = 0.04;
    pub const DRAFTING_WINDOW: f64 = 0.03;
    /// Organic velocity noise amplitude
    pub const VELOCITY_NOISE: f64 = 0.008;

    /// Burst boost band and spacing between scheduled bursts
    pub const BURST_BOOST_MIN: f64 = 1.25;
    pub const BURST_BOOST_MAX: f64 = 1.7;
    pub const BURST_SPACING_MIN: f64 = 0.12;
    pub const BURST_SPACING_MAX: f64 = 0.2;
    /// First burst threshold band
    pub const FIRST_BURST_MIN: f64 = 0.15;
    pub const FIRST_BURST_SPAN: f64 = 0.6;

    /// Transient events (sprint / stumble)
    pub const EVENT_GAP_MIN: f64 = 2.0;
    pub const EVENT_GAP_MAX: f64 = 4.0;
    pub const EVENT_DURATION: f64 = 0.6;
    pub const SPRINT_CHANCE: f64 = 0.25;
    /// Upper bound of the stumble roll window (stumble = [0.25, 0.40))
    pub const STUMBLE_CEILING: f64 = 0.40;
    pub const SPRINT_MULTIPLIER: f64 = 1.35;
    pub const STUMBLE_MULTIPLIER: f64 = 0.7;

    /// Tie-break bias scale (never visible on screen)
    pub const TIE_BIAS_SCALE: f64 = 1e-6;

    /// Celebration window (seconds)
    pub const CELEBRATION_DURATION: f64 = 5.0;
    /// Firework bursts spawned when the celebration starts
    pub const FIREWORK_BURSTS: usize = 6;
}

/// Round to 2 decimal places (finish times are displayed at this precision)
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Race clock label: one decimal, zero padded to 4 characters ("07.3")
pub fn race_clock_label(elapsed: f64) -> String {
    format!("{:04.1}", elapsed.max(0.0))
}
