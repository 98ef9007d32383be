pub mod core;
pub mod measure;
pub mod stage;

pub use self::core::MeterCore;
pub use self::measure::Measure;
pub use self::stage::{MeteredStream, SampleSize};

use thiserror::Error;

/// Default number of samples between progress emissions.
pub const DEFAULT_THRESHOLD: u64 = 50_000;

/// Construction-time options for a meter.
/// This is the "write" side of configuration — fixed once the core is
/// built, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// How many samples pass between progress emissions.
    /// Must be at least 1.
    pub threshold: u64,

    /// Total number of samples the producer expects to push, if known.
    /// Reported verbatim in every measure so consumers can derive a
    /// completion percentage; never used for computation here.
    pub expected: Option<u64>,

    /// When true, each unit contributes its byte/element length as the
    /// sample size; when false, each unit counts as exactly one sample.
    /// Consumed by [`MeteredStream`], ignored by a bare [`MeterCore`].
    pub report_chunks: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            expected: None,
            report_chunks: false,
        }
    }
}

/// Rejected meter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero threshold would fire a progress emission on every single
    /// sample, which is never what anyone wants from a meter.
    #[error("meter threshold must be at least 1")]
    ZeroThreshold,
}
