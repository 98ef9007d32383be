//! Progress metering for chained stream pipelines.
//!
//! Drop a [`MeteredStream`] anywhere into a stream chain to observe
//! the units of work flowing through it. Data passes through
//! unchanged; a [`MeterCore`] accumulates sample counts and emits a
//! [`Measure`] (count, rate, elapsed time, expected total) every time
//! a configured threshold of samples passes, plus once more when the
//! stream ends.
//!
//! ```no_run
//! use metered_stream::{MeterConfig, MeteredStream};
//! use tokio_stream::StreamExt;
//! use tokio_util::io::ReaderStream;
//!
//! # async fn demo() -> std::io::Result<()> {
//! let file = tokio::fs::File::open("data.csv").await?;
//! let mut stream = MeteredStream::new(
//!     ReaderStream::new(file),
//!     MeterConfig {
//!         threshold: 1 << 20, // report every mebibyte
//!         expected: None,
//!         report_chunks: true,
//!     },
//! )
//! .expect("non-zero threshold");
//!
//! stream.core().on_progress(|m| println!("{} bytes so far", m.count));
//!
//! while let Some(chunk) = stream.next().await {
//!     let _ = chunk?; // consume as usual — metering already happened
//! }
//! # Ok(())
//! # }
//! ```

pub mod meter;

pub use meter::{
    ConfigError, Measure, MeterConfig, MeterCore, MeteredStream, SampleSize,
};
