use super::{PrimeStream, Render, StreamOutcome, StreamReport, start};
use crate::{Error, Result};
use core::num::NonZeroUsize;
use futures::{Sink, SinkExt};

/// Number of primes rendered per line unless configured otherwise.
pub const DEFAULT_LINE_WIDTH: NonZeroUsize = NonZeroUsize::new(15).unwrap();

/// Where a [`PrimeStreamConsumer`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    /// Nothing rendered yet; the header is still pending.
    AwaitingFirstValue,
    /// The header is out. `column` counts values on the current line.
    Streaming { column: usize },
    /// The terminal outcome was observed and is being rendered.
    Finalizing,
    /// Terminal. No further reads or writes happen.
    Done,
}

/// Drives one prime producer to completion and renders its output.
///
/// The consumer waits on the value channel and the outcome channel at the
/// same time, preferring values when both are ready. Every value is rendered
/// and forwarded to the sink as soon as it arrives. Observing the outcome
/// ends the loop; the matching footer or failure segment is then written
/// exactly once.
///
/// A failure after partial output still renders the failure: segments that
/// were already forwarded are never rolled back.
///
/// # Example
///
/// ```
/// use primestream::{PlainText, PrimeStreamConsumer};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut out: Vec<String> = Vec::new();
/// let report = PrimeStreamConsumer::new(PlainText)
///     .consume(5, &mut out)
///     .await
///     .unwrap();
///
/// assert!(report.outcome.is_success());
/// assert_eq!(out.concat(), "First 5 prime numbers:\n2 3 5 7 11 \n");
/// # });
/// ```
#[derive(Debug)]
pub struct PrimeStreamConsumer<R> {
    renderer: R,
    line_width: NonZeroUsize,
    state: ConsumerState,
    emitted: usize,
}

impl<R: Render> PrimeStreamConsumer<R> {
    pub const fn new(renderer: R) -> Self {
        Self {
            renderer,
            line_width: DEFAULT_LINE_WIDTH,
            state: ConsumerState::AwaitingFirstValue,
            emitted: 0,
        }
    }

    /// Sets how many values are rendered before each line break.
    #[must_use]
    pub fn with_line_width(mut self, line_width: NonZeroUsize) -> Self {
        self.line_width = line_width;
        self
    }

    pub const fn state(&self) -> ConsumerState {
        self.state
    }

    /// Starts a producer for `count` primes and drives it to completion.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub async fn consume<S>(self, count: usize, sink: S) -> Result<StreamReport>
    where
        S: Sink<R::Output> + Unpin,
    {
        self.run(start(count), sink).await
    }

    /// Drives an already started producer to completion.
    ///
    /// Returns a [`StreamReport`] once the terminal segment has been written,
    /// whether the stream itself succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the sink rejects a segment. Both
    /// receivers are dropped on return, which stops the producer.
    pub async fn run<S>(mut self, stream: PrimeStream, mut sink: S) -> Result<StreamReport>
    where
        S: Sink<R::Output> + Unpin,
    {
        let (count, mut values, mut outcome_rx) = stream.into_parts();
        let mut values_open = true;

        let outcome = loop {
            tokio::select! {
                biased;

                value = values.recv(), if values_open => match value {
                    Some(value) => self.on_value(count, value, &mut sink).await?,
                    None => values_open = false,
                },
                outcome = &mut outcome_rx => {
                    break outcome.unwrap_or_else(|_| {
                        StreamOutcome::Failure(Error::channel_closed(
                            "producer exited without an outcome",
                        ))
                    });
                }
            }
        };
        drop(values);

        self.finalize(count, &outcome, &mut sink).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            count,
            emitted = self.emitted,
            success = outcome.is_success(),
            "Prime stream finalized"
        );

        Ok(StreamReport {
            count,
            emitted: self.emitted,
            outcome,
        })
    }

    async fn on_value<S>(&mut self, count: usize, value: u64, sink: &mut S) -> Result<()>
    where
        S: Sink<R::Output> + Unpin,
    {
        let column = match self.state {
            ConsumerState::AwaitingFirstValue => {
                forward(sink, self.renderer.header(count)).await?;
                0
            }
            ConsumerState::Streaming { column } => column,
            ConsumerState::Finalizing | ConsumerState::Done => {
                unreachable!("value observed after the terminal outcome")
            }
        };

        forward(sink, self.renderer.value(value)).await?;
        self.emitted += 1;

        let column = column + 1;
        if column == self.line_width.get() {
            forward(sink, self.renderer.line_break()).await?;
            self.state = ConsumerState::Streaming { column: 0 };
        } else {
            self.state = ConsumerState::Streaming { column };
        }

        Ok(())
    }

    async fn finalize<S>(
        &mut self,
        count: usize,
        outcome: &StreamOutcome,
        sink: &mut S,
    ) -> Result<()>
    where
        S: Sink<R::Output> + Unpin,
    {
        self.state = ConsumerState::Finalizing;

        let segment = match outcome {
            StreamOutcome::Success => {
                debug_assert_eq!(self.emitted, count, "success before every value arrived");
                self.renderer.footer()
            }
            StreamOutcome::Failure(err) => self.renderer.failure(count, err),
        };
        forward(sink, segment).await?;

        self.state = ConsumerState::Done;
        Ok(())
    }
}

async fn forward<S, T>(sink: &mut S, segment: T) -> Result<()>
where
    S: Sink<T> + Unpin,
{
    sink.send(segment)
        .await
        .map_err(|_| Error::channel_closed("output sink rejected a segment"))
}
