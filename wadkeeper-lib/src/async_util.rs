//! Driving a long-running task while relaying its events.
//!
//! Archive imports run on a blocking task and report progress over a
//! channel. [`run_with_events`] runs the task and hands every event to a
//! callback on the calling task, then drains whatever is left once the
//! task is done.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Upper bound on draining after the task finished. Senders that outlive
/// the task would otherwise keep the channel open forever.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `task` to completion, calling `on_event` for every event received
/// on `events`, in order.
pub async fn run_with_events<F, E, R>(
    task: F,
    mut events: mpsc::UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);
    let mut received: u64 = 0;

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = events.recv() => match event {
                Some(e) => {
                    received += 1;
                    on_event(e);
                }
                None => break None,
            },
        }
    };

    let Some(result) = result else {
        log::debug!("Event channel closed after {} events; awaiting task", received);
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(e)) => {
                received += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "Stopped draining events after {}s ({} received)",
                    DRAIN_TIMEOUT.as_secs(),
                    received
                );
                break;
            }
        }
    }
    log::debug!("Task finished with {} events", received);
    result
}
