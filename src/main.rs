//! Race Draw entry point
//!
//! Runs one draw and prints the winners. Headless at a fixed 60 Hz by
//! default; `--realtime` drives it from the wall clock with a live board.

use std::io::Write as _;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use race_draw::DrawConfig;
use race_draw::config::{is_valid_duration, parse_participants};
use race_draw::driver::{Driver, StopAfter};
use race_draw::recording::{MemoryRecorder, NullRecorder, RecordingSink};
use race_draw::scheduler::{FrameLoop, ManualScheduler, Scheduler};
use race_draw::sim::Phase;
use race_draw::view::{RaceSnapshot, render_board, result_lines};

/// Frames between live board redraws
const BOARD_REFRESH_FRAMES: u32 = 6;
/// Headless frame cap: well past the longest possible race plus celebration
const HEADLESS_MAX_FRAMES: u64 = 1_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "race-draw",
    version,
    about = "Pick winners with a seeded horse race"
)]
struct Cli {
    /// Participant names (also accepted comma/semicolon separated)
    participants: Vec<String>,

    /// Participants as one list, e.g. "Ana, Ben; Cleo"
    #[arg(long)]
    names: Option<String>,

    /// Number of winners to draw
    #[arg(short, long)]
    winners: Option<usize>,

    /// Seed string; the same seed and names replay the same race
    #[arg(short, long)]
    seed: Option<String>,

    /// Race length in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// JSON config file to start from
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against the wall clock and print a live board
    #[arg(long)]
    realtime: bool,

    /// Write captured frames to this JSON file
    #[arg(long)]
    trace: Option<PathBuf>,
}

impl Cli {
    fn draw_config(&self) -> Result<DrawConfig> {
        let mut config = match &self.config {
            Some(path) => DrawConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => DrawConfig::default(),
        };

        let mut raw = self.participants.join("\n");
        if let Some(names) = &self.names {
            raw.push('\n');
            raw.push_str(names);
        }
        let participants = parse_participants(&raw);
        if !participants.is_empty() {
            config.participants = participants;
        }

        if let Some(winners) = self.winners {
            config.winner_count = winners;
        }
        if let Some(seed) = &self.seed {
            config.seed = Some(seed.clone());
        }
        if let Some(duration) = self.duration {
            if !is_valid_duration(duration) {
                bail!("duration must be a positive number of seconds");
            }
            config.duration_secs = duration;
        }

        // Frames are only kept when there is a file to write them to
        if self.trace.is_some() {
            config.record = true;
        } else if config.record {
            log::info!("Recording disabled: no --trace file given");
            config.record = false;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.draw_config()?;
    log::info!(
        "Race Draw starting with {} participants",
        config.participants.len()
    );

    match &cli.trace {
        Some(path) => {
            let driver = run_draw(config, MemoryRecorder::new(), cli.realtime)?;
            print_results(&driver.snapshot());
            driver
                .sink()
                .write_json(path)
                .with_context(|| format!("writing trace {}", path.display()))?;
        }
        None => {
            let driver = run_draw(config, NullRecorder::default(), cli.realtime)?;
            print_results(&driver.snapshot());
        }
    }
    Ok(())
}

/// Run one draw to completion (race and celebration)
fn run_draw<S: RecordingSink + 'static>(
    config: DrawConfig,
    sink: S,
    realtime: bool,
) -> Result<Driver<S>> {
    let driver = Driver::new(config, sink);
    driver.start()?;
    if let Some(seed) = driver.state().race.seed() {
        println!("Seed: {seed}");
    }

    if realtime {
        let mut frame_loop = FrameLoop::default();
        driver.attach(&mut frame_loop, StopAfter::Draw);
        attach_board(&driver, &mut frame_loop);
        frame_loop.run();
    } else {
        let mut scheduler = ManualScheduler::fixed_60hz();
        driver.attach(&mut scheduler, StopAfter::Draw);
        let frames = scheduler.run_until_idle(HEADLESS_MAX_FRAMES);
        log::debug!("Headless draw finished after {} frames", frames);
    }
    Ok(driver)
}

/// Redraw the text board every few frames while racing
fn attach_board<S: RecordingSink + 'static>(driver: &Driver<S>, scheduler: &mut impl Scheduler) {
    let state = driver.shared_state();
    let mut frame = 0u32;

    scheduler.schedule_repeating(Box::new(move |_dt| {
        let state = state.borrow();
        if state.phase == Phase::Idle {
            return ControlFlow::Break(());
        }
        frame += 1;
        if state.phase == Phase::Race && frame % BOARD_REFRESH_FRAMES == 0 {
            let board = render_board(&RaceSnapshot::capture(&state));
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "\x1b[2J\x1b[H{board}");
            let _ = out.flush();
        }
        ControlFlow::Continue(())
    }));
}

fn print_results(snapshot: &RaceSnapshot) {
    let Some(results) = &snapshot.results else {
        println!("No results");
        return;
    };

    println!("Winners:");
    for (i, name) in results.winners.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    println!();
    println!("Results:");
    for line in result_lines(results) {
        println!("  {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(tag: &str, config: &DrawConfig) -> PathBuf {
        let name = format!("race-draw-cli-{tag}-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        config.save(&path).unwrap();
        path
    }

    #[test]
    fn test_names_merge_with_positionals() {
        let cli = Cli::parse_from(["race-draw", "Ana", "Ben", "--names", "Cleo; Ana"]);
        let config = cli.draw_config().unwrap();
        assert_eq!(config.participants, ["Ana", "Ben", "Cleo"]);
    }

    #[test]
    fn test_record_follows_trace_flag() {
        let cli = Cli::parse_from(["race-draw", "a", "b", "--trace", "out.json"]);
        assert!(cli.draw_config().unwrap().record);

        let cli = Cli::parse_from(["race-draw", "a", "b"]);
        assert!(!cli.draw_config().unwrap().record);
    }

    #[test]
    fn test_config_file_record_needs_trace() {
        let mut file = DrawConfig::from_text("a,b,c");
        file.record = true;
        let path = temp_config("record", &file);

        let cli = Cli::parse_from(["race-draw", "--config", path.to_str().unwrap()]);
        let config = cli.draw_config().unwrap();
        assert!(!config.record);
        assert_eq!(config.participants, ["a", "b", "c"]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_rejects_unusable_duration() {
        let cli = Cli::parse_from(["race-draw", "a", "--duration", "0"]);
        assert!(cli.draw_config().is_err());

        let cli = Cli::parse_from(["race-draw", "a", "--duration", "12.5"]);
        assert_eq!(cli.draw_config().unwrap().duration_secs, 12.5);
    }
}
