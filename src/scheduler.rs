//! Frame scheduling
//!
//! A [`Scheduler`] calls registered callbacks once per frame with the frame
//! delta in seconds. The next frame only starts after every callback for the
//! current one has returned. A callback stops itself by returning
//! `ControlFlow::Break`, or from outside through its [`TickHandle`].
//!
//! [`ManualScheduler`] steps frames on demand with a fixed delta (tests and
//! headless runs). [`FrameLoop`] runs against the wall clock.

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Per-frame callback; receives the frame delta in seconds
pub type FrameCallback = Box<dyn FnMut(f64) -> ControlFlow<()>>;

/// Cancellation handle for a scheduled callback
#[derive(Debug, Clone, Default)]
pub struct TickHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TickHandle {
    /// Stop the callback. It will not be invoked again.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Repeating frame callback registration
pub trait Scheduler {
    fn schedule_repeating(&mut self, callback: FrameCallback) -> TickHandle;
}

struct Entry {
    handle: TickHandle,
    callback: FrameCallback,
}

/// Callbacks registered with a scheduler, in registration order
#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    fn add(&mut self, callback: FrameCallback) -> TickHandle {
        let handle = TickHandle::default();
        self.entries.push(Entry {
            handle: handle.clone(),
            callback,
        });
        handle
    }

    /// Run one frame; drops callbacks that broke or were cancelled
    fn run_frame(&mut self, dt: f64) {
        self.entries.retain_mut(|entry| {
            if entry.handle.is_cancelled() {
                return false;
            }
            match (entry.callback)(dt) {
                ControlFlow::Continue(()) => !entry.handle.is_cancelled(),
                ControlFlow::Break(()) => {
                    entry.handle.cancel();
                    false
                }
            }
        });
    }

    fn prune(&mut self) {
        self.entries.retain(|e| !e.handle.is_cancelled());
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Steps frames on demand with a fixed delta
pub struct ManualScheduler {
    frame_dt: f64,
    frames: u64,
    registry: Registry,
}

impl ManualScheduler {
    pub fn new(frame_dt: f64) -> Self {
        Self {
            frame_dt,
            frames: 0,
            registry: Registry::default(),
        }
    }

    /// 60 Hz
    pub fn fixed_60hz() -> Self {
        Self::new(1.0 / 60.0)
    }

    /// Frames stepped so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame with the fixed delta
    pub fn step(&mut self) {
        self.step_with(self.frame_dt);
    }

    /// Run one frame with an explicit delta (stalls, hitches)
    pub fn step_with(&mut self, dt: f64) {
        self.registry.run_frame(dt);
        self.frames += 1;
    }

    /// Step until nothing is scheduled or `max_frames` have run. Returns the
    /// number of frames stepped.
    pub fn run_until_idle(&mut self, max_frames: u64) -> u64 {
        let mut stepped = 0;
        self.registry.prune();
        while !self.registry.is_empty() && stepped < max_frames {
            self.step();
            stepped += 1;
        }
        stepped
    }

    /// Nothing left to call
    pub fn is_idle(&mut self) -> bool {
        self.registry.prune();
        self.registry.is_empty()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, callback: FrameCallback) -> TickHandle {
        self.registry.add(callback)
    }
}

/// Wall-clock frame loop on the current thread
pub struct FrameLoop {
    target_frame: Duration,
    registry: Registry,
}

impl FrameLoop {
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_frame: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            registry: Registry::default(),
        }
    }

    /// Run frames until every callback has stopped.
    ///
    /// Each frame receives the measured time since the previous one; the
    /// first frame gets the target frame time.
    pub fn run(&mut self) {
        let mut last = Instant::now();
        let mut dt = self.target_frame.as_secs_f64();

        loop {
            self.registry.prune();
            if self.registry.is_empty() {
                break;
            }
            self.registry.run_frame(dt);

            let spent = last.elapsed();
            if spent < self.target_frame {
                thread::sleep(self.target_frame - spent);
            }
            let now = Instant::now();
            dt = now.duration_since(last).as_secs_f64();
            last = now;
        }
        log::debug!("Frame loop idle");
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(60)
    }
}

impl Scheduler for FrameLoop {
    fn schedule_repeating(&mut self, callback: FrameCallback) -> TickHandle {
        self.registry.add(callback)
    }
}
