//! Draw phase machine
//!
//! `Idle -> Race` on start, `Race -> Celebrate` when enough runners are home
//! (or the race times out), `Celebrate -> Idle` once the fireworks window has
//! passed. Reset goes back to `Idle` from anywhere.

use super::particles::Celebration;
use super::physics::{self, clamp_step, wall_step};
use super::ranking;
use super::state::{DrawState, Phase, Race};
use crate::consts::FIREWORK_BURSTS;
use crate::error::DrawError;

/// Transitions the driving loop cares about (recording start/stop, UI refresh)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceSignal {
    /// A race left the gate
    Started,
    /// Results are in; the celebration has begun
    Finished,
    /// A running race was discarded by reset
    Aborted,
    /// Celebration window closed; back to idle
    CelebrationOver,
}

/// Start a new race from the current config.
///
/// Rejected without touching any state when there are no participants or the
/// draw is not idle.
pub fn start_race(state: &mut DrawState) -> Result<RaceSignal, DrawError> {
    if state.config.participants.is_empty() {
        return Err(DrawError::EmptyParticipantSet);
    }
    if state.phase != Phase::Idle {
        return Err(DrawError::NotIdle(state.phase));
    }

    state.race = Race::from_config(&state.config);
    state.results = None;
    state.celebration = None;
    state.phase = Phase::Race;

    log::info!(
        "Race started: {} runners, {} winner(s), seed {}",
        state.race.runners.len(),
        state.race.winner_count,
        state.race.seed().unwrap_or("<none>")
    );
    Ok(RaceSignal::Started)
}

/// Abort whatever is in flight and show a fresh lineup
pub fn reset(state: &mut DrawState) -> Option<RaceSignal> {
    let was = state.phase;

    state.race = Race::from_config(&state.config);
    state.results = None;
    state.celebration = None;
    state.phase = Phase::Idle;

    log::info!("Draw reset (was {:?})", was);
    (was == Phase::Race).then_some(RaceSignal::Aborted)
}

/// Advance the draw by one frame of `frame_dt` wall seconds
pub fn tick(state: &mut DrawState, frame_dt: f64) -> Option<RaceSignal> {
    match state.phase {
        Phase::Idle => None,

        Phase::Race => {
            physics::advance(&mut state.race, frame_dt);
            if race_is_over(&state.race) {
                enter_celebration(state);
                Some(RaceSignal::Finished)
            } else {
                None
            }
        }

        Phase::Celebrate => {
            let over = match state.celebration.as_mut() {
                Some(celebration) => {
                    celebration.advance(wall_step(frame_dt), clamp_step(frame_dt));
                    celebration.is_over()
                }
                None => true,
            };
            if over {
                state.phase = Phase::Idle;
                log::debug!("Celebration over");
                Some(RaceSignal::CelebrationOver)
            } else {
                None
            }
        }
    }
}

/// Leader home with enough finishers to fill the winners, or the backstop hit
pub fn race_is_over(race: &Race) -> bool {
    let leader_home = race.leader().is_some_and(|r| r.progress >= 1.0);
    let needed = race.winner_count.min(race.runners.len());
    (leader_home && race.finished_count() >= needed) || race.timed_out()
}

fn enter_celebration(state: &mut DrawState) {
    let results = ranking::rank(&state.race);

    if state.race.timed_out() && state.race.finished_count() < state.race.runners.len() {
        log::info!(
            "Race timed out at {:.2}s with {}/{} finished",
            state.race.elapsed,
            state.race.finished_count(),
            state.race.runners.len()
        );
    }
    log::info!(
        "Race over at {:.2}s, winners: {}",
        state.race.elapsed,
        results.winners.join(", ")
    );

    state.celebration = Some(Celebration::launch(state.race.rng_mut(), FIREWORK_BURSTS));
    state.results = Some(results);
    state.phase = Phase::Celebrate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DrawConfig;
    use crate::consts::*;
    use crate::sim::ranking::Outcome;
    use proptest::prelude::*;

    const FRAME: f64 = 1.0 / 60.0;

    fn config(n: usize, winners: usize, seed: &str) -> DrawConfig {
        DrawConfig {
            participants: (0..n).map(|i| format!("Rider {}", i + 1)).collect(),
            winner_count: winners,
            seed: Some(seed.to_string()),
            ..Default::default()
        }
    }

    /// Tick until the race phase ends; returns per-tick progress traces
    fn run_race(state: &mut DrawState) -> Vec<Vec<f64>> {
        let mut trace = Vec::new();
        let mut guard = 0;
        while state.phase == Phase::Race {
            tick(state, FRAME);
            trace.push(state.race.runners.iter().map(|r| r.progress).collect());
            guard += 1;
            assert!(guard < 10_000, "race never ended");
        }
        trace
    }

    #[test]
    fn test_start_rejects_empty_field() {
        let mut state = DrawState::new(DrawConfig::default());
        let err = start_race(&mut state).unwrap_err();
        assert!(matches!(err, DrawError::EmptyParticipantSet));
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.results.is_none());
        assert_eq!(state.race.ticks, 0);
    }

    #[test]
    fn test_start_rejected_unless_idle() {
        let mut state = DrawState::new(config(3, 1, "busy"));
        assert_eq!(start_race(&mut state).unwrap(), RaceSignal::Started);
        tick(&mut state, FRAME);
        let ticks = state.race.ticks;

        let err = start_race(&mut state).unwrap_err();
        assert!(matches!(err, DrawError::NotIdle(Phase::Race)));
        assert_eq!(state.race.ticks, ticks);
    }

    #[test]
    fn test_idle_tick_is_inert() {
        let mut state = DrawState::new(config(3, 1, "idle"));
        for _ in 0..100 {
            assert_eq!(tick(&mut state, FRAME), None);
        }
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.race.runners.iter().all(|r| r.progress == 0.0));
    }

    #[test]
    fn test_four_riders_two_winners() {
        let mut cfg = config(4, 2, "test");
        cfg.duration_secs = 20.0;
        let mut state = DrawState::new(cfg);
        start_race(&mut state).unwrap();
        run_race(&mut state);

        assert_eq!(state.phase, Phase::Celebrate);
        let results = state.results.as_ref().expect("results computed");
        assert_eq!(results.winners.len(), 2);
        assert_ne!(results.winners[0], results.winners[1]);
        for w in &results.winners {
            assert!(state.config.participants.contains(w));
        }
        assert_eq!(results.standings.len(), 4);

        let times: Vec<f64> = results.finishers().filter_map(|e| e.time()).collect();
        for pair in times.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_winner_count_clamps_to_field() {
        let mut state = DrawState::new(config(4, 10, "clamp"));
        assert_eq!(state.race.winner_count, 4);
        start_race(&mut state).unwrap();
        run_race(&mut state);

        let results = state.results.as_ref().unwrap();
        assert_eq!(results.winners.len(), 4);
    }

    #[test]
    fn test_celebration_returns_to_idle() {
        let mut state = DrawState::new(config(5, 3, "party"));
        start_race(&mut state).unwrap();
        run_race(&mut state);
        assert_eq!(state.phase, Phase::Celebrate);
        assert!(!state.particles().is_empty());

        let results = state.results.clone();
        let mut waited = 0.0;
        let mut signal = None;
        while state.phase == Phase::Celebrate {
            signal = tick(&mut state, FRAME);
            waited += FRAME;
        }
        assert_eq!(signal, Some(RaceSignal::CelebrationOver));
        assert!(waited >= CELEBRATION_DURATION - 1e-9);
        assert!(waited < CELEBRATION_DURATION + 2.0 * FRAME);
        assert_eq!(state.phase, Phase::Idle);
        // Results outlive the celebration until the next start
        assert_eq!(state.results, results);
    }

    #[test]
    fn test_reset_aborts_race() {
        let mut state = DrawState::new(config(6, 2, "abort"));
        start_race(&mut state).unwrap();
        for _ in 0..120 {
            tick(&mut state, FRAME);
        }
        assert_eq!(reset(&mut state), Some(RaceSignal::Aborted));
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.results.is_none());
        assert!(state.particles().is_empty());
        assert_eq!(state.race.elapsed, 0.0);
        assert!(!state.race.slow_motion);
        assert!(state.race.runners.iter().all(|r| r.progress == 0.0));

        // A reset idle draw can start again
        assert!(start_race(&mut state).is_ok());
    }

    #[test]
    fn test_reset_during_celebration() {
        let mut state = DrawState::new(config(3, 1, "cut"));
        start_race(&mut state).unwrap();
        run_race(&mut state);
        assert_eq!(reset(&mut state), None);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.celebration.is_none());
    }

    #[test]
    fn test_new_race_discards_previous_results() {
        let mut state = DrawState::new(config(3, 1, "again"));
        start_race(&mut state).unwrap();
        run_race(&mut state);
        while state.phase == Phase::Celebrate {
            tick(&mut state, FRAME);
        }
        assert!(state.results.is_some());
        start_race(&mut state).unwrap();
        assert!(state.results.is_none());
        assert!(state.particles().is_empty());
    }

    #[test]
    fn test_unusable_duration_runs_default_length() {
        let mut cfg = config(3, 1, "x");
        cfg.duration_secs = -5.0;
        let mut state = DrawState::new(cfg);
        start_race(&mut state).unwrap();
        assert_eq!(state.race.duration, DEFAULT_RACE_DURATION);

        assert_eq!(tick(&mut state, FRAME), None);
        assert_eq!(state.phase, Phase::Race);
        assert!(!state.race.timed_out());
    }

    #[test]
    fn test_configure_while_idle_rebuilds_lineup() {
        let mut state = DrawState::new(config(3, 1, "old"));
        state.configure(config(6, 2, "new"));

        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.race.runners.len(), 6);
        assert_eq!(state.race.winner_count, 2);
        assert_eq!(state.race.seed(), Some("new"));
        assert_eq!(state.race.ticks, 0);
    }

    #[test]
    fn test_configure_mid_race_applies_next_start() {
        let mut state = DrawState::new(config(3, 1, "old"));
        start_race(&mut state).unwrap();
        for _ in 0..10 {
            tick(&mut state, FRAME);
        }
        state.configure(config(5, 2, "new"));

        assert_eq!(state.phase, Phase::Race);
        assert_eq!(state.race.runners.len(), 3);
        assert_eq!(state.race.ticks, 10);
        assert_eq!(state.race.seed(), Some("old"));

        run_race(&mut state);
        while state.phase == Phase::Celebrate {
            tick(&mut state, FRAME);
        }
        assert_eq!(state.results.as_ref().unwrap().winners.len(), 1);

        start_race(&mut state).unwrap();
        assert_eq!(state.race.runners.len(), 5);
        assert_eq!(state.race.winner_count, 2);
        assert_eq!(state.race.seed(), Some("new"));
    }

    /// Fatigue large enough to pin a runner's velocity at zero
    fn stall(state: &mut DrawState, lanes: std::ops::Range<usize>) {
        for runner in &mut state.race.runners[lanes] {
            runner.fatigue = 1.0e3;
        }
    }

    #[test]
    fn test_timeout_backstop() {
        let mut cfg = config(3, 3, "long");
        cfg.duration_secs = 5.0;
        let mut state = DrawState::new(cfg);
        start_race(&mut state).unwrap();
        stall(&mut state, 0..3);
        run_race(&mut state);

        assert_eq!(state.phase, Phase::Celebrate);
        assert_eq!(state.race.finished_count(), 0);
        assert!(state.race.elapsed >= 5.0 + RACE_TIMEOUT_GRACE);
        assert!(state.race.elapsed < 5.0 + RACE_TIMEOUT_GRACE + 2.0 * FRAME);
        assert_eq!(state.results.as_ref().unwrap().winners.len(), 3);
    }

    #[test]
    fn test_huge_frame_hits_backstop() {
        let mut state = DrawState::new(config(3, 1, "pause"));
        start_race(&mut state).unwrap();
        tick(&mut state, FRAME);
        assert_eq!(tick(&mut state, 60.0), Some(RaceSignal::Finished));
        assert_eq!(state.phase, Phase::Celebrate);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut a = DrawState::new(config(8, 3, "replay"));
        let mut b = DrawState::new(config(8, 3, "replay"));
        start_race(&mut a).unwrap();
        start_race(&mut b).unwrap();
        let trace_a = run_race(&mut a);
        let trace_b = run_race(&mut b);

        assert_eq!(trace_a.len(), trace_b.len());
        for (ta, tb) in trace_a.iter().zip(&trace_b) {
            let bits_a: Vec<u64> = ta.iter().map(|p| p.to_bits()).collect();
            let bits_b: Vec<u64> = tb.iter().map(|p| p.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_non_finishers_report_progress() {
        let mut state = DrawState::new(config(4, 1, "dnf"));
        start_race(&mut state).unwrap();
        stall(&mut state, 1..4);
        state.race.runners[0].progress = 0.95;
        run_race(&mut state);

        let results = state.results.as_ref().unwrap();
        assert_eq!(results.winners, [state.race.runners[0].name.clone()]);
        assert!(results.standings[0].time().is_some());
        for entry in &results.standings[1..] {
            match entry.outcome {
                Outcome::Running { progress } => assert!((0.0..1.0).contains(&progress)),
                Outcome::Finished { .. } => panic!("{} should not have finished", entry.name),
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_race_invariants(
            seed in "[a-z0-9]{1,10}",
            field in 1usize..12,
            winners in 1usize..15,
        ) {
            let mut state = DrawState::new(config(field, winners, &seed));
            start_race(&mut state).unwrap();

            let mut last: Vec<(f64, Option<f64>)> = state
                .race
                .runners
                .iter()
                .map(|r| (r.progress, r.finish_time))
                .collect();

            while state.phase == Phase::Race {
                tick(&mut state, FRAME);
                for (r, (p, ft)) in state.race.runners.iter().zip(last.iter_mut()) {
                    // Monotonic progress, finish time set once
                    prop_assert!(r.progress >= *p);
                    prop_assert!((0.0..=1.0).contains(&r.progress));
                    if let Some(t) = ft {
                        prop_assert_eq!(r.finish_time, Some(*t));
                    }
                    // Bounded velocity
                    prop_assert!((0.0..=MAX_VELOCITY).contains(&r.velocity));
                    *p = r.progress;
                    *ft = r.finish_time;
                }
            }

            // Termination
            let deadline = state.race.duration + RACE_TIMEOUT_GRACE + 2.0 * FRAME;
            prop_assert!(state.race.elapsed < deadline);

            let results = state.results.clone().unwrap();
            prop_assert_eq!(results.standings.len(), field);

            // Winners are a prefix of the standings
            let expected = winners.min(field);
            prop_assert_eq!(results.winners.len(), expected);
            for (w, e) in results.winners.iter().zip(&results.standings) {
                prop_assert_eq!(w, &e.name);
            }

            // Tie-free finish times
            let times: Vec<f64> = results.finishers().filter_map(|e| e.time()).collect();
            for pair in times.windows(2) {
                prop_assert!(pair[1] - pair[0] >= 0.01 - 1e-9);
            }
        }

        #[test]
        fn prop_seeded_runs_are_deterministic(seed in "[A-Za-z]{1,8}", field in 1usize..8) {
            let mut a = DrawState::new(config(field, 2, &seed));
            let mut b = DrawState::new(config(field, 2, &seed));
            start_race(&mut a).unwrap();
            start_race(&mut b).unwrap();
            let trace_a = run_race(&mut a);
            let trace_b = run_race(&mut b);
            prop_assert_eq!(trace_a, trace_b);
            prop_assert_eq!(a.results, b.results);
        }
    }
}
