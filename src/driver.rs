//! Draw driver
//!
//! Owns one draw session and a recording sink, ticks the draw from a
//! [`Scheduler`] and turns race signals into sink start/stop calls. Sink
//! failures are logged and otherwise ignored.

use std::cell::{Ref, RefCell};
use std::ops::ControlFlow;
use std::rc::Rc;

use crate::config::DrawConfig;
use crate::error::DrawError;
use crate::recording::{NullRecorder, RecordingSink};
use crate::scheduler::{Scheduler, TickHandle};
use crate::sim::{DrawState, Phase, RaceSignal, reset, start_race, tick};
use crate::view::RaceSnapshot;

/// When a scheduled driver stops itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAfter {
    /// Keep ticking until cancelled
    Never,
    /// Stop on the first frame that finds the draw idle
    Draw,
}

pub struct Driver<S: RecordingSink = NullRecorder> {
    state: Rc<RefCell<DrawState>>,
    sink: Rc<RefCell<S>>,
}

impl Driver<NullRecorder> {
    /// Driver without capture
    pub fn headless(config: DrawConfig) -> Self {
        Self::new(config, NullRecorder::default())
    }
}

impl<S: RecordingSink + 'static> Driver<S> {
    pub fn new(config: DrawConfig, sink: S) -> Self {
        Self {
            state: Rc::new(RefCell::new(DrawState::new(config))),
            sink: Rc::new(RefCell::new(sink)),
        }
    }

    pub fn state(&self) -> Ref<'_, DrawState> {
        self.state.borrow()
    }

    /// Shared handle for other frame callbacks (display, input)
    pub fn shared_state(&self) -> Rc<RefCell<DrawState>> {
        self.state.clone()
    }

    pub fn sink(&self) -> Ref<'_, S> {
        self.sink.borrow()
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot::capture(&self.state.borrow())
    }

    pub fn configure(&self, config: DrawConfig) {
        self.state.borrow_mut().configure(config);
    }

    /// Start a race and, if enabled, a capture
    pub fn start(&self) -> Result<(), DrawError> {
        let signal = start_race(&mut self.state.borrow_mut())?;
        let record = self.state.borrow().config.record;
        forward(signal, record, &mut *self.sink.borrow_mut());
        Ok(())
    }

    /// Abort and return to a fresh idle lineup
    pub fn reset(&self) {
        let signal = reset(&mut self.state.borrow_mut());
        if let Some(signal) = signal {
            let record = self.state.borrow().config.record;
            forward(signal, record, &mut *self.sink.borrow_mut());
        }
    }

    /// One frame: tick the draw, capture, forward signals
    pub fn tick(&self, frame_dt: f64) -> Option<RaceSignal> {
        run_frame(&self.state, &self.sink, frame_dt)
    }

    /// Tick this driver every frame of `scheduler`
    pub fn attach(&self, scheduler: &mut impl Scheduler, until: StopAfter) -> TickHandle {
        let state = self.state.clone();
        let sink = self.sink.clone();

        scheduler.schedule_repeating(Box::new(move |dt| {
            run_frame(&state, &sink, dt);
            if until == StopAfter::Draw && state.borrow().phase == Phase::Idle {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }))
    }
}

fn run_frame<S: RecordingSink>(
    state: &RefCell<DrawState>,
    sink: &RefCell<S>,
    frame_dt: f64,
) -> Option<RaceSignal> {
    let signal = tick(&mut state.borrow_mut(), frame_dt);

    let mut sink = sink.borrow_mut();
    if sink.is_recording() {
        let snapshot = RaceSnapshot::capture(&state.borrow());
        if let Err(e) = sink.capture_frame(&snapshot) {
            log::warn!("Recording frame dropped: {}", e);
        }
    }
    if let Some(signal) = signal {
        forward(signal, state.borrow().config.record, &mut *sink);
    }
    signal
}

fn forward<S: RecordingSink + ?Sized>(signal: RaceSignal, record: bool, sink: &mut S) {
    let result = match signal {
        RaceSignal::Started if record => sink.start(),
        RaceSignal::Finished | RaceSignal::Aborted if sink.is_recording() => sink.stop(),
        _ => Ok(()),
    };
    if let Err(e) = result {
        log::warn!("Recording sink failed on {:?}: {}", signal, e);
    }
}
