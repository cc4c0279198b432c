//! Draw configuration
//!
//! Participant list plus draw options. Persisted as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_RACE_DURATION;
use crate::error::DrawError;

/// Default number of winners drawn
pub const DEFAULT_WINNER_COUNT: usize = 3;

/// A usable race length: finite and strictly positive
pub fn is_valid_duration(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0
}

/// The given race length, or the default when it is not usable
pub fn sanitize_duration(secs: f64) -> f64 {
    if is_valid_duration(secs) {
        secs
    } else {
        DEFAULT_RACE_DURATION
    }
}

/// Draw options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Distinct, non-empty display names
    pub participants: Vec<String>,
    /// Requested winners (clamped to the field at race start)
    pub winner_count: usize,
    /// Seed string; `None` or empty means a fresh unseeded draw
    pub seed: Option<String>,
    /// Trigger the recording sink around each race
    pub record: bool,
    /// Target race length in seconds
    pub duration_secs: f64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            participants: Vec::new(),
            winner_count: DEFAULT_WINNER_COUNT,
            seed: None,
            record: true,
            duration_secs: DEFAULT_RACE_DURATION,
        }
    }
}

impl DrawConfig {
    /// Config with participants parsed from free text
    pub fn from_text(raw: &str) -> Self {
        Self {
            participants: parse_participants(raw),
            ..Self::default()
        }
    }

    /// Winners actually drawn: at least 1, at most the field size
    pub fn effective_winner_count(&self) -> usize {
        self.winner_count.clamp(1, self.participants.len().max(1))
    }

    /// Seed to use, treating an empty string as no seed
    pub fn effective_seed(&self) -> Option<&str> {
        self.seed.as_deref().filter(|s| !s.is_empty())
    }

    /// Race length actually run
    pub fn effective_duration(&self) -> f64 {
        sanitize_duration(self.duration_secs)
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DrawError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&json)?;
        // Hand-edited files may carry blanks or repeats
        config.participants = dedupe(config.participants.iter().map(String::as_str));
        if !is_valid_duration(config.duration_secs) {
            log::warn!(
                "Ignoring duration_secs {} in {}, using {}s",
                config.duration_secs,
                path.display(),
                DEFAULT_RACE_DURATION
            );
            config.duration_secs = DEFAULT_RACE_DURATION;
        }
        log::info!(
            "Loaded config from {} ({} participants)",
            path.display(),
            config.participants.len()
        );
        Ok(config)
    }

    /// Save the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DrawError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}

/// Split free text into participant names.
///
/// Names are separated by newlines, commas or semicolons. Surrounding
/// whitespace is trimmed, empty entries dropped, and repeats removed keeping
/// the first occurrence.
pub fn parse_participants(raw: &str) -> Vec<String> {
    dedupe(raw.split(['\n', ',', ';']))
}

fn dedupe<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names.map(str::trim).filter(|n| !n.is_empty()) {
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}
