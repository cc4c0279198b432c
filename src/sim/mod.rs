//! Deterministic simulation module
//!
//! All race logic lives here. With a seed, a run is fully reproducible:
//! - Every random draw comes from the race's own random source
//! - Runners are updated in lane order
//! - No rendering, clock or platform dependencies

pub mod particles;
pub mod physics;
pub mod ranking;
pub mod rng;
pub mod state;
pub mod tick;

pub use particles::{Celebration, FIREWORK_PALETTE, update_particles};
pub use physics::{StepReport, advance, clamp_step, wall_step};
pub use ranking::{
    LEADERBOARD_SIZE, LeaderboardEntry, Outcome, RaceResults, ResultEntry, leaderboard, rank,
};
pub use rng::{Mulberry32, RandomSource, fold_seed};
pub use state::{
    DrawState, Particle, Phase, RUNNER_PALETTE, Race, Runner, RunnerEvent, RunnerEventKind,
};
pub use tick::{RaceSignal, race_is_over, reset, start_race, tick};
