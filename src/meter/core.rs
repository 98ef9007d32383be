use parking_lot::Mutex;

use super::measure::{epoch_ms, Measure};
use super::{ConfigError, MeterConfig};

/// A registered progress observer. Runs synchronously on the
/// recording thread, after the state lock has been released.
type ProgressFn = Box<dyn Fn(&Measure) + Send + Sync>;

// ─── Public type ─────────────────────────────────────────────────

/// The metering state machine.
/// Stages push samples with `record()`, hosts subscribe with
/// `on_progress()` and inspect with `peek()`.
///
/// A core moves through three states: idle (fresh, no start time),
/// started (a timing window is open), and stopped. Recording a sample
/// while idle or stopped opens a new window; stopping emits one final
/// progress measure. The running `count` survives across windows —
/// there is no reset short of building a new core.
pub struct MeterCore {
    state: Mutex<State>,
    observers: Mutex<Vec<ProgressFn>>,

    /// Samples between progress emissions. At least 1, enforced at
    /// construction.
    threshold: u64,

    /// Expected total, passed through to every measure.
    expected: Option<u64>,
}

// ─── Internal state ──────────────────────────────────────────────

struct State {
    /// Whether a timing window is currently open.
    started: bool,

    /// Running total of samples, across all windows.
    count: u64,

    /// Epoch-ms bounds of the current/most recent window.
    start_time: u64,
    end_time: u64,

    /// Samples accumulated since the last emitted measure. Resets to
    /// zero on every emission; never reaches `threshold` between them.
    last_progress: u64,
}

// ─── MeterCore impl ──────────────────────────────────────────────

impl MeterCore {
    /// Build a core from its configuration.
    /// A zero threshold would emit on every sample, so it is rejected
    /// here rather than silently honored.
    pub fn new(config: MeterConfig) -> Result<Self, ConfigError> {
        if config.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }

        Ok(Self {
            state: Mutex::new(State {
                started: false,
                count: 0,
                start_time: 0,
                end_time: 0,
                last_progress: 0,
            }),
            observers: Mutex::new(Vec::new()),
            threshold: config.threshold,
            expected: config.expected,
        })
    }

    /// Register a progress observer. Observers run synchronously,
    /// before the `record`/`end_metering` call that triggered the
    /// emission returns.
    pub fn on_progress<F>(&self, observer: F)
    where
        F: Fn(&Measure) + Send + Sync + 'static,
    {
        self.observers.lock().push(Box::new(observer));
    }

    /// Record `n` samples. Zero is clamped to one — every call counts
    /// at least one sample. Implicitly opens a window if none is open.
    ///
    /// Emits a progress measure once the accumulated samples since the
    /// last emission reach the threshold. A single large `n` may skip
    /// several threshold boundaries; those collapse into one emission.
    pub fn record(&self, n: u64) {
        let n = n.max(1);

        let emitted = {
            let mut state = self.state.lock();
            state.open_window();
            state.count = state.count.saturating_add(n);

            if state.last_progress.saturating_add(n) >= self.threshold {
                Some(self.emit_measure(&mut state))
            } else {
                state.last_progress += n;
                None
            }
        };

        if let Some(measure) = emitted {
            self.dispatch(&measure);
        }
    }

    /// Record a single sample.
    pub fn record_one(&self) {
        self.record(1);
    }

    /// Open a timing window. No-op if one is already open.
    pub fn start_metering(&self) {
        self.state.lock().open_window();
    }

    /// Close the current window and emit one final progress measure,
    /// regardless of how far the threshold accumulator got.
    /// No-op if no window is open, so completion and close paths may
    /// both call this safely.
    pub fn end_metering(&self) {
        let emitted = {
            let mut state = self.state.lock();
            if !state.started {
                None
            } else {
                state.started = false;
                state.end_time = epoch_ms();
                Some(self.emit_measure(&mut state))
            }
        };

        if let Some(measure) = emitted {
            self.dispatch(&measure);
        }
    }

    /// Inspect current metrics without disturbing the threshold
    /// accumulator. Safe to call from anywhere, any number of times.
    pub fn peek(&self) -> Measure {
        let state = self.state.lock();
        Measure::capture(
            state.count,
            self.expected,
            state.start_time,
            state.end_time,
        )
    }

    /// Capture a measure for emission. Consumes the threshold
    /// accumulator — only the emission paths go through here.
    fn emit_measure(&self, state: &mut State) -> Measure {
        state.last_progress = 0;
        Measure::capture(
            state.count,
            self.expected,
            state.start_time,
            state.end_time,
        )
    }

    /// Run every observer against an emitted measure. The state lock
    /// is already released, so observers may `peek()` freely.
    fn dispatch(&self, measure: &Measure) {
        for observer in self.observers.lock().iter() {
            observer(measure);
        }
    }
}

// ─── State impl ──────────────────────────────────────────────────

impl State {
    /// idle/stopped → started. The start time is stamped exactly once
    /// per window; re-opening after a stop stamps a fresh one.
    fn open_window(&mut self) {
        if !self.started {
            self.start_time = epoch_ms();
            self.started = true;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
