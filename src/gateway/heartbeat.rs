//! Heartbeat scheduling for a live Gateway connection.
//!
//! The scheduler never touches the socket or session state itself. It asks
//! the connection task to send a beat via `beat_tx`, learns about server
//! acknowledgements through `ack_rx`, and reports a liveness failure on
//! `missed_tx` when a beat goes unacknowledged for a full interval.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

pub(crate) async fn heartbeat_loop(
    beat_interval: Duration,
    beat_tx: mpsc::UnboundedSender<()>,
    mut ack_rx: watch::Receiver<Instant>,
    missed_tx: mpsc::UnboundedSender<()>,
    shutdown: CancellationToken,
) {
    // First beat lands at a random offset inside the interval so a fleet of
    // clients reconnecting together does not beat in lockstep.
    let interval_ms = u64::try_from(beat_interval.as_millis())
        .unwrap_or(u64::MAX)
        .max(1);
    let jitter = Duration::from_millis(rand::random_range(0..interval_ms));

    tokio::select! {
        () = shutdown.cancelled() => return,
        () = sleep(jitter) => {}
    }

    let mut ticker = interval(beat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut awaiting_ack = false;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if awaiting_ack && !ack_rx.has_changed().unwrap_or(false) {
            // The previous beat was never acknowledged; the connection is
            // presumed dead and the supervisor decides what happens next.
            let _ = missed_tx.send(());
            return;
        }

        // Consume the pending ack notification, if any.
        drop(ack_rx.borrow_and_update());

        if beat_tx.send(()).is_err() {
            // Connection task is gone
            return;
        }
        awaiting_ack = true;
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::task::JoinHandle;
    use tokio::time::Instant as TokioInstant;

    use super::*;

    struct Harness {
        beat_rx: UnboundedReceiver<()>,
        ack_tx: watch::Sender<Instant>,
        missed_rx: UnboundedReceiver<()>,
        shutdown: CancellationToken,
        handle: JoinHandle<()>,
    }

    fn spawn_loop(beat_interval: Duration) -> Harness {
        let (beat_tx, beat_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = watch::channel(Instant::now());
        let (missed_tx, missed_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(heartbeat_loop(
            beat_interval,
            beat_tx,
            ack_rx,
            missed_tx,
            shutdown.clone(),
        ));

        Harness {
            beat_rx,
            ack_tx,
            missed_rx,
            shutdown,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_beat_fires_within_one_interval() {
        let beat_interval = Duration::from_secs(30);
        let start = TokioInstant::now();
        let mut harness = spawn_loop(beat_interval);

        harness.beat_rx.recv().await.expect("no first beat");

        assert!(
            start.elapsed() < beat_interval,
            "first beat took {:?}, interval is {beat_interval:?}",
            start.elapsed()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn acked_beats_are_one_interval_apart() {
        let beat_interval = Duration::from_secs(30);
        let mut harness = spawn_loop(beat_interval);

        harness.beat_rx.recv().await.expect("no first beat");
        harness.ack_tx.send(Instant::now()).expect("loop gone");

        let after_first = TokioInstant::now();
        harness.beat_rx.recv().await.expect("no second beat");
        let gap = after_first.elapsed();

        assert!(
            gap >= beat_interval && gap < beat_interval + Duration::from_secs(1),
            "beats {gap:?} apart, expected {beat_interval:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_signals_liveness_failure() {
        let mut harness = spawn_loop(Duration::from_secs(30));

        harness.beat_rx.recv().await.expect("no first beat");
        // Deliberately never ack

        harness.missed_rx.recv().await.expect("no missed signal");

        // The loop stopped itself: no second beat was sent.
        assert!(harness.beat_rx.try_recv().is_err(), "unexpected second beat");
        harness.handle.await.expect("loop panicked");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let mut harness = spawn_loop(Duration::from_secs(30));

        harness.beat_rx.recv().await.expect("no first beat");
        harness.shutdown.cancel();
        harness.handle.await.expect("loop panicked");

        assert!(harness.missed_rx.try_recv().is_err(), "spurious missed signal");
    }
}
