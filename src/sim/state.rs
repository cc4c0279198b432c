//! Race state and core simulation types
//!
//! A `Race` is built fresh for every run and owns its runners and its random
//! source. `DrawState` is the session around it: configuration, phase, the
//! current lineup, the last results and the celebration overlay.

use glam::Vec2;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::particles::Celebration;
use super::ranking::RaceResults;
use super::rng::RandomSource;
use crate::config::{DrawConfig, sanitize_duration};
use crate::consts::*;

/// Lane colors, picked by lane index
pub const RUNNER_PALETTE: [u32; 10] = [
    0xffffff, 0xffd700, 0x00ffff, 0xff69b4, 0x7fffd4, 0xffa500, 0xadff2f, 0xdda0dd, 0x87cefa,
    0x90ee90,
];

/// Current phase of the draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// At rest, showing the lineup (and the last results, if any)
    #[default]
    Idle,
    /// Runners are moving
    Race,
    /// Results are in, fireworks are flying
    Celebrate,
}

/// Transient speed modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerEventKind {
    Sprint,
    Stumble,
}

impl RunnerEventKind {
    /// Velocity multiplier while the event is active
    pub fn multiplier(self) -> f64 {
        match self {
            RunnerEventKind::Sprint => SPRINT_MULTIPLIER,
            RunnerEventKind::Stumble => STUMBLE_MULTIPLIER,
        }
    }
}

/// An active event and the race time it expires at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunnerEvent {
    pub kind: RunnerEventKind,
    pub until: f64,
}

/// One participant's simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    pub name: String,
    /// Screen row, fixed for the runner's lifetime
    pub lane: usize,
    /// Display color (0xRRGGBB)
    pub color: u32,
    /// Race completion in [0, 1]
    pub progress: f64,
    /// Progress units per second
    pub velocity: f64,
    /// Velocity decay coefficient, drawn once
    pub fatigue: f64,
    pub bursts_left: u8,
    /// Progress threshold of the next scheduled burst
    pub next_burst_at: f64,
    pub event: Option<RunnerEvent>,
    /// Race time of the last event trigger
    pub last_event_at: f64,
    /// Set exactly once, when progress first reaches 1
    pub finish_time: Option<f64>,
    /// Unique, invisible ordering offset
    pub tie_bias: f64,
}

impl Runner {
    /// Create a runner at the start line, drawing its traits from `rng`
    pub fn new(name: String, lane: usize, rng: &mut RandomSource) -> Self {
        let fatigue = rng.range(FATIGUE_MIN, FATIGUE_MAX);
        let bursts_left = (rng.next_f64() * 2.0).floor() as u8 + 2;
        let next_burst_at = FIRST_BURST_MIN + rng.next_f64() * FIRST_BURST_SPAN;
        // Lane offset keeps biases pairwise distinct
        let tie_bias = rng.next_f64() * TIE_BIAS_SCALE + lane as f64 * TIE_BIAS_SCALE;

        Self {
            name,
            lane,
            color: RUNNER_PALETTE[lane % RUNNER_PALETTE.len()],
            progress: 0.0,
            velocity: 0.0,
            fatigue,
            bursts_left,
            next_burst_at,
            event: None,
            last_event_at: 0.0,
            finish_time: None,
            tie_bias,
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// Progress with the tie-break bias applied (ordering only, never drawn)
    #[inline]
    pub fn standing_key(&self) -> f64 {
        self.progress + self.tie_bias
    }

    /// Event active at race time `now`, if any
    pub fn active_event(&self, now: f64) -> Option<RunnerEventKind> {
        self.event.filter(|e| now < e.until).map(|e| e.kind)
    }
}

/// One run of the race
#[derive(Debug, Clone)]
pub struct Race {
    /// Runners indexed by lane
    pub runners: Vec<Runner>,
    /// Wall race time (seconds, not slow-motion scaled)
    pub elapsed: f64,
    /// Configured race duration (seconds)
    pub duration: f64,
    /// Latched once true, never cleared mid-race
    pub slow_motion: bool,
    /// Winners requested, already clamped to the field size
    pub winner_count: usize,
    /// Ticks simulated so far
    pub ticks: u64,
    rng: RandomSource,
}

impl Race {
    /// Build a fresh lineup: shuffle the participants into lanes and draw
    /// every runner's traits from the race's random source. An unusable
    /// duration falls back to the default.
    pub fn new(
        participants: &[String],
        duration: f64,
        winner_count: usize,
        seed: Option<&str>,
    ) -> Self {
        let mut rng = RandomSource::from_seed(seed);

        let mut shuffled = participants.to_vec();
        shuffled.shuffle(&mut rng);

        let runners = shuffled
            .into_iter()
            .enumerate()
            .map(|(lane, name)| Runner::new(name, lane, &mut rng))
            .collect::<Vec<_>>();

        let winner_count = winner_count.clamp(1, runners.len().max(1));
        let duration = sanitize_duration(duration);

        Self {
            runners,
            elapsed: 0.0,
            duration,
            slow_motion: false,
            winner_count,
            ticks: 0,
            rng,
        }
    }

    /// Build from a draw config
    pub fn from_config(config: &DrawConfig) -> Self {
        Self::new(
            &config.participants,
            config.effective_duration(),
            config.effective_winner_count(),
            config.effective_seed(),
        )
    }

    /// Seed string, `None` when unseeded
    pub fn seed(&self) -> Option<&str> {
        self.rng.seed()
    }

    pub fn rng_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    /// Split borrow for the physics step
    pub(crate) fn runners_and_rng(&mut self) -> (&mut [Runner], &mut RandomSource) {
        (&mut self.runners, &mut self.rng)
    }

    /// Highest raw progress in the field (0 for an empty field)
    pub fn leader_progress(&self) -> f64 {
        self.runners.iter().map(|r| r.progress).fold(0.0, f64::max)
    }

    /// Current leader by progress + tie-break bias
    pub fn leader(&self) -> Option<&Runner> {
        self.runners
            .iter()
            .max_by(|a, b| a.standing_key().total_cmp(&b.standing_key()))
    }

    pub fn finished_count(&self) -> usize {
        self.runners.iter().filter(|r| r.is_finished()).count()
    }

    /// Seconds left of the configured duration (negative past it)
    pub fn remaining(&self) -> f64 {
        self.duration - self.elapsed
    }

    /// Hard backstop: duration plus grace has elapsed
    pub fn timed_out(&self) -> bool {
        self.elapsed >= self.duration + RACE_TIMEOUT_GRACE
    }
}

/// A celebration particle (field coordinates, 0..1 on both axes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining life; removed at or below zero
    pub life: f32,
    pub color: u32,
}

/// The whole draw session: config, phase, lineup, results, overlay
#[derive(Debug, Clone)]
pub struct DrawState {
    pub config: DrawConfig,
    pub phase: Phase,
    /// Current lineup; a fresh, unstarted race while idle
    pub race: Race,
    /// Terminal results of the last race (cleared when a new race starts)
    pub results: Option<RaceResults>,
    /// Fireworks from the last finish (discarded when a new race starts)
    pub celebration: Option<Celebration>,
}

impl DrawState {
    pub fn new(config: DrawConfig) -> Self {
        let race = Race::from_config(&config);
        Self {
            config,
            phase: Phase::Idle,
            race,
            results: None,
            celebration: None,
        }
    }

    /// Replace the configuration. While idle the lineup is rebuilt right away;
    /// otherwise the new config applies from the next start.
    pub fn configure(&mut self, config: DrawConfig) {
        self.config = config;
        if self.phase == Phase::Idle {
            self.race = Race::from_config(&self.config);
        }
    }

    /// Particles currently in flight (empty outside a celebration)
    pub fn particles(&self) -> &[Particle] {
        self.celebration
            .as_ref()
            .map(|c| c.particles.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Runner {}", i + 1)).collect()
    }

    #[test]
    fn test_lineup_assigns_every_participant_one_lane() {
        let race = Race::new(&names(16), 20.0, 3, Some("lanes"));
        assert_eq!(race.runners.len(), 16);
        for (i, runner) in race.runners.iter().enumerate() {
            assert_eq!(runner.lane, i);
            assert_eq!(runner.color, RUNNER_PALETTE[i % RUNNER_PALETTE.len()]);
        }
        let mut seen: Vec<_> = race.runners.iter().map(|r| r.name.clone()).collect();
        seen.sort();
        let mut expected = names(16);
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_runner_traits_in_band() {
        let race = Race::new(&names(40), 20.0, 3, Some("traits"));
        for r in &race.runners {
            assert!((FATIGUE_MIN..FATIGUE_MAX).contains(&r.fatigue));
            assert!((2..=3).contains(&r.bursts_left));
            assert!((0.15..0.75).contains(&r.next_burst_at));
            assert_eq!(r.progress, 0.0);
            assert!(r.finish_time.is_none());
            assert!(r.event.is_none());
        }
    }

    #[test]
    fn test_tie_bias_pairwise_distinct() {
        let race = Race::new(&names(50), 20.0, 3, Some("bias"));
        let mut biases: Vec<f64> = race.runners.iter().map(|r| r.tie_bias).collect();
        biases.sort_by(f64::total_cmp);
        for pair in biases.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(biases.iter().all(|b| *b < 1e-4));
    }

    #[test]
    fn test_same_seed_same_lineup() {
        let a = Race::new(&names(10), 20.0, 3, Some("lineup"));
        let b = Race::new(&names(10), 20.0, 3, Some("lineup"));
        for (ra, rb) in a.runners.iter().zip(&b.runners) {
            assert_eq!(ra.name, rb.name);
            assert_eq!(ra.fatigue.to_bits(), rb.fatigue.to_bits());
            assert_eq!(ra.tie_bias.to_bits(), rb.tie_bias.to_bits());
        }
    }

    #[test]
    fn test_winner_count_clamped() {
        assert_eq!(Race::new(&names(4), 20.0, 10, Some("w")).winner_count, 4);
        assert_eq!(Race::new(&names(4), 20.0, 0, Some("w")).winner_count, 1);
        assert_eq!(Race::new(&[], 20.0, 3, Some("w")).winner_count, 1);
    }

    #[test]
    fn test_unusable_duration_falls_back() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let race = Race::new(&names(3), bad, 1, Some("d"));
            assert_eq!(race.duration, DEFAULT_RACE_DURATION);
            assert!(!race.timed_out());
        }
        assert_eq!(Race::new(&names(3), 7.5, 1, Some("d")).duration, 7.5);
    }

    #[test]
    fn test_active_event_expires() {
        let mut runner = Race::new(&names(1), 20.0, 1, Some("ev")).runners.remove(0);
        runner.event = Some(RunnerEvent {
            kind: RunnerEventKind::Sprint,
            until: 3.0,
        });
        assert_eq!(runner.active_event(2.9), Some(RunnerEventKind::Sprint));
        assert_eq!(runner.active_event(3.0), None);
    }
}
