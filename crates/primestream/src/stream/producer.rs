use super::StreamOutcome;
use crate::{Error, FirstPrimes, MIN_COUNT, Result};
use tokio::sync::{mpsc, oneshot};

/// Capacity of the value channel: one prime in flight at a time.
const HANDOFF_CAPACITY: usize = 1;

/// The receiving half of a started prime producer.
///
/// Holds the value channel and the single-shot outcome channel. Both must be
/// drained until the outcome is observed; [`PrimeStreamConsumer`] does this.
///
/// [`PrimeStreamConsumer`]: crate::PrimeStreamConsumer
#[derive(Debug)]
pub struct PrimeStream {
    count: usize,
    values: mpsc::Receiver<u64>,
    outcome: oneshot::Receiver<StreamOutcome>,
}

impl PrimeStream {
    #[cfg(test)]
    pub(crate) const fn from_parts(
        count: usize,
        values: mpsc::Receiver<u64>,
        outcome: oneshot::Receiver<StreamOutcome>,
    ) -> Self {
        Self {
            count,
            values,
            outcome,
        }
    }

    /// The number of primes that were requested.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Splits the stream into `(count, values, outcome)`.
    pub fn into_parts(self) -> (usize, mpsc::Receiver<u64>, oneshot::Receiver<StreamOutcome>) {
        (self.count, self.values, self.outcome)
    }
}

/// Starts a producer task that emits the first `count` primes.
///
/// Primes are sent in increasing order on a capacity-one channel, so the
/// producer suspends while a previous value is still unconsumed. Once every
/// value has been taken by the receiver, the value channel is closed and a
/// single [`StreamOutcome::Success`] is sent on the outcome channel.
///
/// A `count` below [`MIN_COUNT`] emits nothing and reports
/// [`StreamOutcome::Failure`] with [`Error::InvalidArgument`]. If the value
/// receiver is dropped mid-stream the producer stops and reports
/// [`Error::ChannelClosed`] to whoever still listens.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn start(count: usize) -> PrimeStream {
    let (value_tx, values) = mpsc::channel(HANDOFF_CAPACITY);
    let (outcome_tx, outcome) = oneshot::channel();

    tokio::spawn(produce(count, value_tx, outcome_tx));

    PrimeStream {
        count,
        values,
        outcome,
    }
}

async fn produce(
    count: usize,
    value_tx: mpsc::Sender<u64>,
    outcome_tx: oneshot::Sender<StreamOutcome>,
) {
    #[cfg(feature = "tracing")]
    tracing::debug!(count, "Prime producer started");

    // `emit` owns the value sender, so the value channel is closed before the
    // outcome goes out.
    let outcome = StreamOutcome::from(emit(count, value_tx).await);

    #[cfg(feature = "tracing")]
    {
        match &outcome {
            StreamOutcome::Success => tracing::debug!(count, "Prime producer finished"),
            StreamOutcome::Failure(e) => tracing::debug!(count, "Prime producer failed: {e}"),
        }
    }

    if outcome_tx.send(outcome).is_err() {
        #[cfg(feature = "tracing")]
        tracing::debug!("Outcome receiver dropped before the stream finished");
    }
}

async fn emit(count: usize, value_tx: mpsc::Sender<u64>) -> Result<()> {
    if count < MIN_COUNT {
        return Err(Error::InvalidArgument(count as u64));
    }

    for prime in FirstPrimes::new().take(count) {
        value_tx
            .send(prime)
            .await
            .map_err(|_| Error::channel_closed("value receiver dropped"))?;
    }

    // A free slot means the consumer has received the last prime.
    let permit = value_tx
        .reserve()
        .await
        .map_err(|_| Error::channel_closed("value receiver dropped"))?;
    drop(permit);

    Ok(())
}
