//! Read-only projections of a draw for renderers and recorders
//!
//! Nothing here mutates the draw. A [`RaceSnapshot`] is cheap enough to build
//! every frame and serializes to JSON for traces.

use std::fmt::Write as _;

use serde::Serialize;

use crate::race_clock_label;
use crate::sim::{
    DrawState, LEADERBOARD_SIZE, LeaderboardEntry, Phase, RaceResults, Runner, RunnerEventKind,
    leaderboard,
};

/// Width of a lane bar in the text board, in characters
const BOARD_TRACK_WIDTH: usize = 40;

/// One lane as drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerView {
    pub name: String,
    pub lane: usize,
    pub progress: f64,
    /// CSS-style `#rrggbb`
    pub color: String,
    /// Event label shown next to the runner, if one is active
    pub event: Option<RunnerEventKind>,
    pub finished: bool,
}

impl RunnerView {
    fn from_runner(runner: &Runner, now: f64) -> Self {
        Self {
            name: runner.name.clone(),
            lane: runner.lane,
            progress: runner.progress,
            color: hex_color(runner.color),
            event: runner.active_event(now),
            finished: runner.is_finished(),
        }
    }
}

/// Everything a frame needs to draw the draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSnapshot {
    pub phase: Phase,
    /// Wall race time (seconds)
    pub elapsed: f64,
    /// Zero-padded clock, e.g. `07.3`
    pub clock: String,
    /// Race in progress
    pub live: bool,
    pub slow_motion: bool,
    /// Lanes in lane order
    pub runners: Vec<RunnerView>,
    /// Live top-3
    pub commentary: Vec<LeaderboardEntry>,
    /// Results of the last finished race, if any
    pub results: Option<RaceResults>,
    /// Celebration particles in flight
    pub particle_count: usize,
}

impl RaceSnapshot {
    pub fn capture(state: &DrawState) -> Self {
        let race = &state.race;
        let runners = race
            .runners
            .iter()
            .map(|r| RunnerView::from_runner(r, race.elapsed))
            .collect();

        Self {
            phase: state.phase,
            elapsed: race.elapsed,
            clock: race_clock_label(race.elapsed),
            live: state.phase == Phase::Race,
            slow_motion: race.slow_motion,
            runners,
            commentary: leaderboard(race, LEADERBOARD_SIZE),
            results: state.results.clone(),
            particle_count: state.particles().len(),
        }
    }

    pub fn winners(&self) -> &[String] {
        self.results
            .as_ref()
            .map(|r| r.winners.as_slice())
            .unwrap_or(&[])
    }
}

/// `0xRRGGBB` to `#rrggbb`
pub fn hex_color(color: u32) -> String {
    format!("#{:06x}", color & 0x00ff_ffff)
}

/// Post-race summary lines: `name — 12.34s` or `name — 57% progress`
pub fn result_lines(results: &RaceResults) -> Vec<String> {
    results
        .standings
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{:>2}. {}", i + 1, entry))
        .collect()
}

/// One commentary line, gap in percentage points with one decimal
pub fn commentary_line(entry: &LeaderboardEntry) -> String {
    let pct = entry.progress * 100.0;
    let head = format!("#{} {} ({:.0}%)", entry.rank, entry.name, pct);
    if entry.gap_pct > 0.0 {
        format!("{head} +{:.1}% ahead", entry.gap_pct)
    } else {
        head
    }
}

fn event_label(kind: RunnerEventKind) -> &'static str {
    match kind {
        RunnerEventKind::Sprint => "SPRINT!",
        RunnerEventKind::Stumble => "stumble",
    }
}

/// Plain-text board: header, one bar per lane, commentary
pub fn render_board(snapshot: &RaceSnapshot) -> String {
    let mut out = String::new();

    let mut header = format!("[{}]", snapshot.clock);
    if snapshot.live {
        header.push_str(" LIVE");
    }
    if snapshot.slow_motion && snapshot.live {
        header.push_str(" (slow motion)");
    }
    let _ = writeln!(out, "{header}");

    let name_width = snapshot
        .runners
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0);

    for runner in &snapshot.runners {
        let cells = (runner.progress * BOARD_TRACK_WIDTH as f64).round() as usize;
        let filled = cells.min(BOARD_TRACK_WIDTH);
        let bar: String = std::iter::repeat_n('=', filled)
            .chain(std::iter::repeat_n(' ', BOARD_TRACK_WIDTH - filled))
            .collect();
        let tag = match (runner.finished, runner.event) {
            (true, _) => "finished",
            (false, Some(kind)) => event_label(kind),
            (false, None) => "",
        };
        let _ = writeln!(
            out,
            "{:>2} {:<name_width$} |{}| {:>3.0}% {}",
            runner.lane + 1,
            runner.name,
            bar,
            runner.progress * 100.0,
            tag
        );
    }

    for entry in &snapshot.commentary {
        let _ = writeln!(out, "  {}", commentary_line(entry));
    }
    out
}
