use chrono::Utc;
use serde::Serialize;

/// A point-in-time readout of accumulated metering state.
/// Built fresh for every snapshot — nothing here aliases live state,
/// so consumers may hold on to it as long as they like.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    /// Samples accumulated since metering started.
    pub count: u64,

    /// Configured expected total. `None` means the producer did not
    /// know how much work was coming, so no percentage is computable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<u64>,

    /// Epoch milliseconds when metering began. 0 if it never started.
    pub start: u64,

    /// Epoch milliseconds when metering last stopped. 0 if it never stopped.
    pub end: u64,

    /// Epoch milliseconds when this measure was produced.
    pub time: u64,

    /// `time - start` in milliseconds. When `start` is 0 this degrades
    /// to the raw epoch value — surfaced as-is rather than corrected.
    pub elapsed: u64,

    /// Samples per millisecond. Non-finite when `elapsed` is 0;
    /// consumers must handle NaN/infinity (serde_json renders them as null).
    pub rate: f64,
}

impl Measure {
    /// Capture a measure from the core's scalar state at this instant.
    pub(crate) fn capture(
        count: u64,
        expected: Option<u64>,
        start: u64,
        end: u64,
    ) -> Self {
        let time = epoch_ms();
        let elapsed = time.saturating_sub(start);
        let rate = count as f64 / elapsed as f64;

        Self {
            count,
            expected,
            start,
            end,
            time,
            elapsed,
            rate,
        }
    }

    /// Convenience: can a consumer derive a completion percentage?
    pub fn has_expected(&self) -> bool {
        self.expected.is_some()
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}
