use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio_stream::Stream;

use super::core::MeterCore;
use super::{ConfigError, MeterConfig};

// ─── Sample sizing ───────────────────────────────────────────────

/// The addressable length of one unit of work, used when a stage is
/// configured to sample by chunk size instead of unit count.
pub trait SampleSize {
    /// Number of addressable elements in this unit. Zero is fine; the
    /// stage counts a zero-length unit as a single sample.
    fn sample_size(&self) -> usize;
}

impl SampleSize for Bytes {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

impl SampleSize for BytesMut {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

impl SampleSize for Vec<u8> {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

impl SampleSize for &[u8] {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

impl SampleSize for String {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

impl SampleSize for &str {
    fn sample_size(&self) -> usize {
        self.len()
    }
}

/// Errors flowing through a metered stream have no payload to size;
/// they still count as one sample each.
impl<T: SampleSize, E> SampleSize for Result<T, E> {
    fn sample_size(&self) -> usize {
        self.as_ref().map(T::sample_size).unwrap_or(0)
    }
}

// ─── The stage ───────────────────────────────────────────────────

/// A pass-through stage that meters whatever flows through it.
///
/// Insert it anywhere in a stream chain: items come out exactly as
/// they went in, while every item is reported to the wrapped
/// [`MeterCore`]. The core's window is closed — emitting the final
/// progress measure — when the inner stream finishes, or when the
/// stage is dropped before that, whichever comes first.
pub struct MeteredStream<S> {
    inner: S,
    core: Arc<MeterCore>,
    report_chunks: bool,
}

impl<S> MeteredStream<S> {
    /// Wrap `inner` with a fresh core built from `config`.
    pub fn new(inner: S, config: MeterConfig) -> Result<Self, ConfigError> {
        let report_chunks = config.report_chunks;
        let core = Arc::new(MeterCore::new(config)?);

        Ok(Self::with_core(inner, core, report_chunks))
    }

    /// Wrap `inner` around an existing core, e.g. one the host already
    /// subscribed observers on.
    pub fn with_core(inner: S, core: Arc<MeterCore>, report_chunks: bool) -> Self {
        Self {
            inner,
            core,
            report_chunks,
        }
    }

    /// The core driving this stage. Subscribe or `peek()` through it.
    pub fn core(&self) -> &Arc<MeterCore> {
        &self.core
    }
}

impl<S> Stream for MeteredStream<S>
where
    S: Stream + Unpin,
    S::Item: SampleSize,
{
    type Item = S::Item;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => {
                let samples = if this.report_chunks {
                    (item.sample_size() as u64).max(1)
                } else {
                    1
                };
                // Synchronous and infallible: metering never blocks or
                // breaks the data path.
                this.core.record(samples);
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.core.end_metering();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Close the window if the stage is torn down before the inner stream
/// finished. `end_metering` is idempotent, so the normal completion
/// path followed by this drop stays a single final emission.
impl<S> Drop for MeteredStream<S> {
    fn drop(&mut self) {
        self.core.end_metering();
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio_stream::StreamExt;

    use super::super::measure::Measure;
    use super::*;

    fn collecting(core: &Arc<MeterCore>) -> Arc<Mutex<Vec<Measure>>> {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = emitted.clone();
        core.on_progress(move |m| sink.lock().push(m.clone()));
        emitted
    }

    fn chunks(sizes: &[usize]) -> Vec<Bytes> {
        sizes
            .iter()
            .map(|&n| Bytes::from(vec![b'x'; n]))
            .collect()
    }

    #[tokio::test]
    async fn counts_one_sample_per_unit_by_default() {
        let source = tokio_stream::iter(chunks(&[3, 3, 3, 3, 3]));
        let mut stream = MeteredStream::new(
            source,
            MeterConfig {
                threshold: 100,
                ..MeterConfig::default()
            },
        )
        .unwrap();

        while stream.next().await.is_some() {}

        assert_eq!(stream.core().peek().count, 5);
    }

    #[tokio::test]
    async fn chunk_sampling_uses_byte_length() {
        // Spec scenario: threshold 100, a single 150-byte chunk.
        let source = tokio_stream::iter(chunks(&[150]));
        let mut stream = MeteredStream::new(
            source,
            MeterConfig {
                threshold: 100,
                expected: None,
                report_chunks: true,
            },
        )
        .unwrap();
        let emitted = collecting(stream.core());

        let chunk = stream.next().await.unwrap();
        assert_eq!(chunk.len(), 150);

        let emitted = emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].count, 150);
    }

    #[tokio::test]
    async fn zero_length_chunks_count_as_one_sample() {
        let source = tokio_stream::iter(chunks(&[0, 0]));
        let mut stream = MeteredStream::new(
            source,
            MeterConfig {
                threshold: 100,
                expected: None,
                report_chunks: true,
            },
        )
        .unwrap();

        while stream.next().await.is_some() {}

        assert_eq!(stream.core().peek().count, 2);
    }

    #[tokio::test]
    async fn items_pass_through_unchanged_and_in_order() {
        let input = chunks(&[1, 5, 2]);
        let source = tokio_stream::iter(input.clone());
        let mut stream =
            MeteredStream::new(source, MeterConfig::default()).unwrap();

        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            output.push(chunk);
        }

        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn completion_emits_exactly_one_final_measure() {
        let source = tokio_stream::iter(chunks(&[1, 1, 1]));
        let mut stream =
            MeteredStream::new(source, MeterConfig::default()).unwrap();
        let emitted = collecting(stream.core());

        while stream.next().await.is_some() {}
        drop(stream);

        // High default threshold: only the end-of-stream emission, and
        // the drop after completion did not add a second one.
        let emitted = emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].count, 3);
        assert!(emitted[0].end > 0);
    }

    #[tokio::test]
    async fn dropping_mid_stream_closes_the_window() {
        let source = tokio_stream::iter(chunks(&[1, 1, 1]));
        let mut stream =
            MeteredStream::new(source, MeterConfig::default()).unwrap();
        let core = stream.core().clone();
        let emitted = collecting(&core);

        let _ = stream.next().await;
        drop(stream);

        let emitted = emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].count, 1);
        assert!(emitted[0].end > 0);
    }

    #[tokio::test]
    async fn errors_pass_through_and_count_one_sample() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"abcd")),
            Err(io::Error::new(io::ErrorKind::Other, "boom")),
            Ok(Bytes::from_static(b"ef")),
        ];
        let source = tokio_stream::iter(items);
        let mut stream = MeteredStream::new(
            source,
            MeterConfig {
                threshold: 1_000,
                expected: None,
                report_chunks: true,
            },
        )
        .unwrap();

        let mut errors = 0;
        let mut bytes = 0;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => bytes += chunk.len(),
                Err(_) => errors += 1,
            }
        }

        assert_eq!(errors, 1);
        assert_eq!(bytes, 6);
        // 4 + 2 payload bytes, plus the error clamped to one sample.
        assert_eq!(stream.core().peek().count, 7);
    }

    #[tokio::test]
    async fn shared_core_can_be_observed_before_wrapping() {
        let core = Arc::new(
            MeterCore::new(MeterConfig {
                threshold: 2,
                ..MeterConfig::default()
            })
            .unwrap(),
        );
        let emitted = collecting(&core);

        let source = tokio_stream::iter(chunks(&[1, 1, 1, 1]));
        let mut stream = MeteredStream::with_core(source, core, false);

        while stream.next().await.is_some() {}

        // Two threshold crossings (at 2 and 4) plus the final measure.
        assert_eq!(emitted.lock().len(), 3);
    }
}
