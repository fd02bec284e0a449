use crate::{
    ConsumerState, Error, PlainText, PrimeStream, PrimeStreamConsumer, Render, StreamOutcome,
    first_primes, start,
};
use core::num::NonZeroUsize;
use core::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Header(usize),
    Value(u64),
    LineBreak,
    Footer,
    Failure(usize, Error),
}

struct Events;

impl Render for Events {
    type Output = Segment;

    fn header(&mut self, count: usize) -> Segment {
        Segment::Header(count)
    }

    fn value(&mut self, value: u64) -> Segment {
        Segment::Value(value)
    }

    fn line_break(&mut self) -> Segment {
        Segment::LineBreak
    }

    fn footer(&mut self) -> Segment {
        Segment::Footer
    }

    fn failure(&mut self, count: usize, error: &Error) -> Segment {
        Segment::Failure(count, error.clone())
    }
}

fn values(segments: &[Segment]) -> Vec<u64> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Value(v) => Some(*v),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn streams_first_ten_primes() {
    let mut out = Vec::new();
    let report = PrimeStreamConsumer::new(Events)
        .consume(10, &mut out)
        .await
        .unwrap();

    let mut expected = vec![Segment::Header(10)];
    expected.extend(
        [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
            .into_iter()
            .map(Segment::Value),
    );
    expected.push(Segment::Footer);

    assert_eq!(out, expected);
    assert_eq!(report.count, 10);
    assert_eq!(report.emitted, 10);
    assert_eq!(report.outcome, StreamOutcome::Success);
}

#[tokio::test]
async fn counts_below_three_fail_without_header() {
    for count in 0..3 {
        let expected = Error::InvalidArgument(count as u64);
        let mut out = Vec::new();
        let report = PrimeStreamConsumer::new(Events)
            .consume(count, &mut out)
            .await
            .unwrap();

        assert_eq!(out, [Segment::Failure(count, expected.clone())]);
        assert_eq!(report.emitted, 0);
        assert_eq!(report.outcome.into_result(), Err(expected));
    }
}

#[tokio::test]
async fn failure_reason_mentions_count() {
    let mut out = Vec::new();
    PrimeStreamConsumer::new(PlainText)
        .consume(1, &mut out)
        .await
        .unwrap();

    let rendered = out.concat();
    assert!(!rendered.contains("First"));
    assert!(rendered.contains("Invalid argument number 1"), "{rendered}");
}

#[tokio::test]
async fn breaks_lines_every_fifteen_values() {
    let mut out = Vec::new();
    PrimeStreamConsumer::new(Events)
        .consume(31, &mut out)
        .await
        .unwrap();

    let breaks: Vec<usize> = out
        .iter()
        .enumerate()
        .filter(|(_, segment)| **segment == Segment::LineBreak)
        .map(|(i, _)| i)
        .collect();

    // header at 0, values at 1..=15, break at 16, values at 17..=31, break at 32
    assert_eq!(breaks, [16, 32]);
    assert_eq!(out.last(), Some(&Segment::Footer));
    assert_eq!(values(&out), first_primes(31).unwrap());
}

#[tokio::test]
async fn honors_custom_line_width() {
    let mut out = Vec::new();
    PrimeStreamConsumer::new(PlainText)
        .with_line_width(NonZeroUsize::new(4).unwrap())
        .consume(9, &mut out)
        .await
        .unwrap();

    assert_eq!(
        out.concat(),
        "First 9 prime numbers:\n2 3 5 7 \n11 13 17 19 \n23 \n"
    );
}

#[tokio::test]
async fn streamed_values_match_synchronous_search() {
    let mut out = Vec::new();
    let report = PrimeStreamConsumer::new(Events)
        .consume(2_000, &mut out)
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(values(&out), first_primes(2_000).unwrap());

    let headers = out.iter().filter(|s| matches!(s, Segment::Header(_)));
    assert_eq!(headers.count(), 1);

    let terminals = out
        .iter()
        .filter(|s| matches!(s, Segment::Footer | Segment::Failure(..)));
    assert_eq!(terminals.count(), 1);
    assert_eq!(report.outcome.into_result(), Ok(()));
}

#[tokio::test]
async fn producer_emits_increasing_values_then_success() {
    let (count, mut values, outcome) = start(100).into_parts();
    assert_eq!(count, 100);

    let mut received = Vec::new();
    while let Some(value) = values.recv().await {
        received.push(value);
    }

    assert_eq!(received.len(), 100);
    assert_eq!(&received[..3], [2, 3, 5]);
    assert!(received.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(outcome.await.unwrap(), StreamOutcome::Success);
}

#[tokio::test]
async fn producer_rejects_small_count_without_values() {
    let (_, mut values, outcome) = start(2).into_parts();

    assert_eq!(values.recv().await, None);
    assert_eq!(
        outcome.await.unwrap(),
        StreamOutcome::Failure(Error::InvalidArgument(2))
    );
}

#[tokio::test]
async fn outcome_waits_for_the_last_value() {
    let (_, mut values, mut outcome) = start(5).into_parts();

    for _ in 0..4 {
        values.recv().await.unwrap();
    }

    // The fifth prime is buffered or about to be; either way it has not been
    // received, so the outcome must not be out yet.
    sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        outcome.try_recv(),
        Err(oneshot::error::TryRecvError::Empty)
    ));

    assert_eq!(values.recv().await, Some(11));
    let outcome = timeout(TIMEOUT, outcome).await.unwrap().unwrap();
    assert_eq!(outcome, StreamOutcome::Success);
    assert_eq!(values.recv().await, None);
}

#[tokio::test]
async fn producer_blocks_while_value_is_unconsumed() {
    let (_, mut values, mut outcome) = start(50).into_parts();

    sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        outcome.try_recv(),
        Err(oneshot::error::TryRecvError::Empty)
    ));

    // Only the single buffered value is available without waiting.
    assert_eq!(values.try_recv(), Ok(2));
}

#[tokio::test]
async fn producer_stops_when_values_are_dropped() {
    let (_, values, outcome) = start(usize::MAX).into_parts();
    drop(values);

    let outcome = timeout(TIMEOUT, outcome).await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        StreamOutcome::Failure(Error::ChannelClosed { .. })
    ));
}

#[tokio::test]
async fn closed_sink_ends_the_stream() {
    let (tx, rx) = futures::channel::mpsc::unbounded::<String>();
    drop(rx);

    let result = timeout(
        TIMEOUT,
        PrimeStreamConsumer::new(PlainText).consume(1_000_000, tx),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::ChannelClosed { .. })));
}

#[tokio::test]
async fn drains_value_that_is_ready_with_the_outcome() {
    let (value_tx, value_rx) = mpsc::channel(1);
    let (outcome_tx, outcome_rx) = oneshot::channel();

    value_tx.send(2).await.unwrap();
    outcome_tx.send(StreamOutcome::Success).unwrap();

    let mut out = Vec::new();
    let report = PrimeStreamConsumer::new(Events)
        .run(PrimeStream::from_parts(1, value_rx, outcome_rx), &mut out)
        .await
        .unwrap();

    assert_eq!(
        out,
        [Segment::Header(1), Segment::Value(2), Segment::Footer]
    );
    assert_eq!(report.emitted, 1);
}

#[tokio::test]
async fn lost_producer_renders_failure_after_partial_output() {
    let (value_tx, value_rx) = mpsc::channel(1);
    let (outcome_tx, outcome_rx) = oneshot::channel::<StreamOutcome>();

    let feeder = tokio::spawn(async move {
        for value in [2, 3] {
            value_tx.send(value).await.unwrap();
        }
        drop(outcome_tx);
    });

    let mut out = Vec::new();
    let report = PrimeStreamConsumer::new(Events)
        .run(PrimeStream::from_parts(10, value_rx, outcome_rx), &mut out)
        .await
        .unwrap();
    feeder.await.unwrap();

    assert_eq!(&out[..2], [Segment::Header(10), Segment::Value(2)]);
    assert!(matches!(
        out.last(),
        Some(Segment::Failure(10, Error::ChannelClosed { .. }))
    ));
    assert!(!report.outcome.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_streams_are_independent() {
    let handles: Vec<_> = (0..32)
        .map(|_| {
            tokio::spawn(async {
                let mut out = Vec::new();
                PrimeStreamConsumer::new(PlainText)
                    .consume(500, &mut out)
                    .await
                    .map(|report| (report, out.concat()))
            })
        })
        .collect();

    let expected = {
        let mut out = Vec::new();
        PrimeStreamConsumer::new(PlainText)
            .consume(500, &mut out)
            .await
            .unwrap();
        out.concat()
    };

    for handle in futures::future::join_all(handles).await {
        let (report, rendered) = handle.unwrap().unwrap();
        assert_eq!(report.emitted, 500);
        assert_eq!(rendered, expected);
    }
}

#[test]
fn consumer_starts_awaiting_first_value() {
    let consumer = PrimeStreamConsumer::new(PlainText);
    assert_eq!(consumer.state(), ConsumerState::AwaitingFirstValue);
}
