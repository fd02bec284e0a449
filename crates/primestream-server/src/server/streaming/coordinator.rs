use crate::server::{
    render::HtmlRender,
    service::handler::InflightGuard,
    telemetry::{
        increment_errors, increment_primes_streamed, record_primes_per_request,
        record_stream_duration,
    },
};
use axum::body::Body;
use bytes::Bytes;
use core::{convert::Infallible, num::NonZeroUsize};
use futures::StreamExt;
use primestream::PrimeStreamConsumer;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, PollSender};
use tracing::Instrument;

/// Starts streaming the first `count` primes and returns the response body
/// that carries them.
///
/// The producer and consumer run on a spawned task that owns `guard`, so the
/// stream counts as in flight until the last segment has been handed to the
/// body or the client has gone away.
///
/// # Behavior
///
/// - Segments are buffered up to `buffer` chunks ahead of the client.
/// - When the client disconnects, the consumer's next write fails, it drops
///   its end of the hand-off channel, and the producer stops.
/// - A producer failure (such as a count below three) is rendered into the
///   body as an error page; the HTTP status has already been sent.
/// - Cancelling `abort` ends the body early without a footer.
pub fn stream_primes(
    count: usize,
    line_width: NonZeroUsize,
    buffer: usize,
    abort: CancellationToken,
    guard: InflightGuard,
) -> Body {
    let (tx, rx) = mpsc::channel::<Bytes>(buffer);
    let consumer = PrimeStreamConsumer::new(HtmlRender).with_line_width(line_width);

    tokio::spawn(
        async move {
            let _guard = guard;
            let start = Instant::now();
            record_primes_per_request(count as f64);

            let result = tokio::select! {
                result = consumer.consume(count, PollSender::new(tx)) => result,
                () = abort.cancelled() => {
                    increment_errors();
                    tracing::warn!("Stream aborted during shutdown");
                    return;
                }
            };

            match result {
                Ok(report) => {
                    increment_primes_streamed(report.emitted as u64);
                    if let Some(e) = report.outcome.error() {
                        increment_errors();
                        tracing::warn!(emitted = report.emitted, "Stream failed: {e}");
                    } else {
                        tracing::debug!(emitted = report.emitted, "Stream completed");
                    }
                }
                Err(e) => {
                    // The sink only fails once the body is gone.
                    tracing::debug!("Client disconnected: {e}");
                }
            }

            record_stream_duration(start.elapsed().as_secs_f64() * 1000.0);
        }
        .instrument(tracing::info_span!("streaming", count)),
    );

    Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
}
