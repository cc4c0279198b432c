//! Recording sink seam
//!
//! The draw only tells a sink when to start and stop and hands it each frame
//! in between. Whatever the sink does with the frames is its own business, and
//! its failures never reach the race.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::RecordingError;
use crate::view::RaceSnapshot;

/// Capture collaborator driven by race start/finish
pub trait RecordingSink {
    /// Begin a capture
    fn start(&mut self) -> Result<(), RecordingError>;

    /// One frame while capturing
    fn capture_frame(&mut self, snapshot: &RaceSnapshot) -> Result<(), RecordingError>;

    /// Finish the current capture
    fn stop(&mut self) -> Result<(), RecordingError>;

    fn is_recording(&self) -> bool;
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullRecorder {
    recording: bool,
}

impl RecordingSink for NullRecorder {
    fn start(&mut self) -> Result<(), RecordingError> {
        self.recording = true;
        Ok(())
    }

    fn capture_frame(&mut self, _snapshot: &RaceSnapshot) -> Result<(), RecordingError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordingError> {
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

/// Keeps captured frames in memory; every `stride`-th frame is kept
#[derive(Debug)]
pub struct MemoryRecorder {
    frames: Vec<RaceSnapshot>,
    stride: usize,
    seen: usize,
    takes: usize,
    recording: bool,
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::with_stride(1)
    }
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stride(stride: usize) -> Self {
        Self {
            frames: Vec::new(),
            stride: stride.max(1),
            seen: 0,
            takes: 0,
            recording: false,
        }
    }

    /// Frames of the most recent take
    pub fn frames(&self) -> &[RaceSnapshot] {
        &self.frames
    }

    /// Completed and in-progress captures
    pub fn takes(&self) -> usize {
        self.takes
    }

    /// Write the captured frames as a JSON array
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RecordingError> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &self.frames)?;
        log::info!("Wrote {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }
}

impl RecordingSink for MemoryRecorder {
    fn start(&mut self) -> Result<(), RecordingError> {
        if self.recording {
            return Err(RecordingError::Sink("capture already running".into()));
        }
        self.frames.clear();
        self.seen = 0;
        self.takes += 1;
        self.recording = true;
        Ok(())
    }

    fn capture_frame(&mut self, snapshot: &RaceSnapshot) -> Result<(), RecordingError> {
        if !self.recording {
            return Err(RecordingError::Unavailable("no capture running".into()));
        }
        if self.seen % self.stride == 0 {
            self.frames.push(snapshot.clone());
        }
        self.seen += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordingError> {
        self.recording = false;
        log::debug!(
            "Capture {} stopped with {} frames",
            self.takes,
            self.frames.len()
        );
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}
