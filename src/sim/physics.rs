//! Per-tick runner physics
//!
//! One call to [`advance`] moves the whole field by one frame: the frame delta
//! is clamped into a stable step, slow motion is latched and applied, then
//! every unfinished runner is updated against a read-only snapshot of the
//! leader's progress.

use super::rng::RandomSource;
use super::state::{Race, Runner, RunnerEvent, RunnerEventKind};
use crate::consts::*;

/// What happened during one physics step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Simulated step actually applied (clamped, slow-motion scaled)
    pub dt: f64,
    /// Slow motion latched on this step
    pub slow_motion_latched: bool,
    /// Lanes that crossed the line on this step
    pub finished: Vec<usize>,
}

/// Clamp a raw frame delta into a safe step. Non-finite deltas take the max step.
pub fn clamp_step(frame_dt: f64) -> f64 {
    if frame_dt.is_finite() {
        frame_dt.clamp(MIN_STEP_DT, MAX_STEP_DT)
    } else {
        MAX_STEP_DT
    }
}

/// Wall time a frame accounts for. Negative deltas count as zero and
/// non-finite ones do not advance the clock.
pub fn wall_step(frame_dt: f64) -> f64 {
    if frame_dt.is_finite() {
        frame_dt.max(0.0)
    } else {
        0.0
    }
}

/// Latch slow motion once the leader reaches the stretch or time runs short.
/// Returns true only on the step that sets the latch.
pub fn update_slow_motion(race: &mut Race, elapsed: f64) -> bool {
    if race.slow_motion {
        return false;
    }
    let lead = race.leader_progress();
    if lead >= SLOW_MOTION_LEAD || race.duration - elapsed <= SLOW_MOTION_REMAINING {
        race.slow_motion = true;
        return true;
    }
    false
}

/// Advance the race by one frame of `frame_dt` wall seconds
pub fn advance(race: &mut Race, frame_dt: f64) -> StepReport {
    let elapsed = race.elapsed + wall_step(frame_dt);

    let mut dt = if race.ticks == 0 {
        FIRST_STEP_DT
    } else {
        clamp_step(frame_dt)
    };

    let slow_motion_latched = update_slow_motion(race, elapsed);
    if slow_motion_latched {
        log::debug!(
            "Slow motion at {:.2}s (lead {:.3})",
            elapsed,
            race.leader_progress()
        );
    }
    if race.slow_motion {
        dt *= SLOW_MOTION_FACTOR;
    }

    race.elapsed = elapsed;
    race.ticks += 1;

    let finished = step_runners(race, dt);

    StepReport {
        dt,
        slow_motion_latched,
        finished,
    }
}

/// Update every unfinished runner by `dt` simulated seconds at race time
/// `race.elapsed`. Returns the lanes that finished on this step.
pub fn step_runners(race: &mut Race, dt: f64) -> Vec<usize> {
    let leader = race.leader_progress();
    let base_speed = 1.0 / race.duration.max(f64::EPSILON);
    let now = race.elapsed;

    let (runners, rng) = race.runners_and_rng();
    let mut finished = Vec::new();

    for runner in runners.iter_mut().filter(|r| !r.is_finished()) {
        if step_runner(runner, rng, leader, base_speed, dt, now) {
            log::debug!("{} finished at {:.3}s", runner.name, now);
            finished.push(runner.lane);
        }
    }

    finished
}

/// Velocity the runner is steering toward this step, before inertia
pub fn target_velocity(base_speed: f64, gap: f64, noise: f64, burst_boost: Option<f64>) -> f64 {
    let rubber = (gap * RUBBER_BAND_GAIN).clamp(0.0, RUBBER_BAND_CAP);
    let drafting = if gap > 0.0 && gap < DRAFTING_WINDOW {
        DRAFTING_BONUS
    } else {
        0.0
    };

    let mut target = base_speed * (1.0 + rubber) + noise + drafting;
    if let Some(boost) = burst_boost {
        target *= boost;
    }
    target.clamp(0.0, MAX_VELOCITY)
}

/// Advance one runner. Returns true if it crossed the line on this step.
fn step_runner(
    runner: &mut Runner,
    rng: &mut RandomSource,
    leader: f64,
    base_speed: f64,
    dt: f64,
    now: f64,
) -> bool {
    // Scheduled burst
    let mut burst_boost = None;
    if runner.bursts_left > 0 && runner.progress >= runner.next_burst_at {
        let boost = rng.range(BURST_BOOST_MIN, BURST_BOOST_MAX);
        runner.bursts_left -= 1;
        runner.next_burst_at = runner.progress + rng.range(BURST_SPACING_MIN, BURST_SPACING_MAX);
        burst_boost = Some(boost);
        log::trace!("{} burst x{:.2}", runner.name, boost);
    }

    let noise = rng.range(-VELOCITY_NOISE, VELOCITY_NOISE);
    let gap = leader - runner.progress;
    let target = target_velocity(base_speed, gap, noise, burst_boost);

    // Inertia, then fatigue
    runner.velocity += (target - runner.velocity) * INERTIA;
    runner.velocity = (runner.velocity - runner.fatigue * dt * FATIGUE_SCALE).max(0.0);

    // Transient events
    if runner.event.is_none()
        && now - runner.last_event_at > rng.range(EVENT_GAP_MIN, EVENT_GAP_MAX)
    {
        let roll = rng.next_f64();
        let kind = if roll < SPRINT_CHANCE {
            Some(RunnerEventKind::Sprint)
        } else if roll < STUMBLE_CEILING {
            Some(RunnerEventKind::Stumble)
        } else {
            None
        };
        if let Some(kind) = kind {
            runner.event = Some(RunnerEvent {
                kind,
                until: now + EVENT_DURATION,
            });
            runner.last_event_at = now;
            log::trace!("{} {:?} at {:.2}s", runner.name, kind, now);
        }
    }
    if let Some(event) = runner.event {
        if now < event.until {
            runner.velocity *= event.kind.multiplier();
        } else {
            runner.event = None;
        }
    }
    runner.velocity = runner.velocity.clamp(0.0, MAX_VELOCITY);

    // Integrate
    runner.progress += runner.velocity * dt;
    if runner.progress >= 1.0 {
        runner.progress = 1.0;
        runner.finish_time = Some(now + runner.tie_bias);
        return true;
    }
    false
}
