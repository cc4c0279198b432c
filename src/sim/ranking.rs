//! Final standings and the live leaderboard
//!
//! Finishers rank by finish time, everyone else by progress. Displayed finish
//! times are rounded to 2 decimals and forced strictly increasing, so no two
//! finishers ever show the same time.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::{Race, Runner};
use crate::round2;

/// Minimum gap between two displayed finish times (seconds)
pub const MIN_TIME_GAP: f64 = 0.01;
/// Runners shown in the live commentary panel
pub const LEADERBOARD_SIZE: usize = 3;
/// Gap at which the commentary closeness bar empties
const CLOSENESS_SPAN: f64 = 0.2;

/// How a runner's race ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    /// Crossed the line; time in seconds, 2-decimal precision
    Finished { time: f64 },
    /// Still running when the race ended; progress in [0, 1]
    Running { progress: f64 },
}

/// One line of the final standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    pub outcome: Outcome,
}

impl ResultEntry {
    /// Displayed finish time, `None` for non-finishers
    pub fn time(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Finished { time } => Some(time),
            Outcome::Running { .. } => None,
        }
    }

    /// Progress fraction (1 for finishers)
    pub fn progress(&self) -> f64 {
        match self.outcome {
            Outcome::Finished { .. } => 1.0,
            Outcome::Running { progress } => progress,
        }
    }
}

impl fmt::Display for ResultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Finished { time } => write!(f, "{} — {:.2}s", self.name, time),
            Outcome::Running { progress } => {
                let pct = (progress * 100.0).round();
                write!(f, "{} — {}% progress", self.name, pct)
            }
        }
    }
}

/// Terminal output of a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResults {
    /// First `winner_count` names of the standings, in order
    pub winners: Vec<String>,
    /// Every runner, finishers first
    pub standings: Vec<ResultEntry>,
}

impl RaceResults {
    pub fn finishers(&self) -> impl Iterator<Item = &ResultEntry> {
        self.standings.iter().filter(|e| e.time().is_some())
    }

    /// 1-based position of a runner in the standings
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.standings
            .iter()
            .position(|e| e.name == name)
            .map(|i| i + 1)
    }
}

fn finish_key(runner: &Runner) -> f64 {
    runner.finish_time.unwrap_or(f64::INFINITY)
}

/// Descending by progress + tie-break bias
fn by_standing(a: &Runner, b: &Runner) -> Ordering {
    b.standing_key().total_cmp(&a.standing_key())
}

/// Full standing order: finishers by time, then the rest by progress
pub fn standing_order(race: &Race) -> Vec<&Runner> {
    let (mut finished, mut running): (Vec<&Runner>, Vec<&Runner>) =
        race.runners.iter().partition(|r| r.is_finished());

    finished.sort_by(|a, b| finish_key(a).total_cmp(&finish_key(b)));
    running.sort_by(|a, b| by_standing(a, b));

    finished.extend(running);
    finished
}

/// Compute the terminal results of a race
pub fn rank(race: &Race) -> RaceResults {
    let order = standing_order(race);

    let winners = order
        .iter()
        .take(race.winner_count.min(order.len()))
        .map(|r| r.name.clone())
        .collect();

    let mut last_time = f64::NEG_INFINITY;
    let standings = order
        .iter()
        .map(|runner| {
            let outcome = match runner.finish_time {
                Some(raw) => {
                    let mut time = round2(raw);
                    if time <= last_time {
                        time = round2(last_time + MIN_TIME_GAP);
                    }
                    last_time = time;
                    Outcome::Finished { time }
                }
                None => Outcome::Running {
                    progress: runner.progress,
                },
            };
            ResultEntry {
                name: runner.name.clone(),
                outcome,
            }
        })
        .collect();

    RaceResults { winners, standings }
}

/// A row of the live commentary panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based
    pub rank: usize,
    pub name: String,
    pub progress: f64,
    /// Lead over the next runner shown, in percentage points (0 for the last row)
    pub gap_pct: f64,
    /// Closeness bar fill in [0, 1]; full when the next runner is level
    pub closeness: f64,
}

/// Live top-N by progress + tie-break bias
pub fn leaderboard(race: &Race, size: usize) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&Runner> = race.runners.iter().collect();
    sorted.sort_by(|a, b| by_standing(a, b));
    sorted.truncate(size);

    (0..sorted.len())
        .map(|i| {
            let gap = if i + 1 < sorted.len() {
                sorted[i].progress - sorted[i + 1].progress
            } else {
                0.0
            };
            LeaderboardEntry {
                rank: i + 1,
                name: sorted[i].name.clone(),
                progress: sorted[i].progress,
                gap_pct: gap * 100.0,
                closeness: (1.0 - gap / CLOSENESS_SPAN).clamp(0.0, 1.0),
            }
        })
        .collect()
}
