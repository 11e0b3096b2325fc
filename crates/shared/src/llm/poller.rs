use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(4),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Pending,
    Ready(T),
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("polling timed out after {0:?}")]
    TimedOut(Duration),
    #[error("polling was cancelled")]
    Cancelled,
    #[error(transparent)]
    Probe(E),
}

/// Calls `probe` until it reports `Ready`, sleeping between calls. The sleep
/// starts at `initial_interval` and doubles up to `max_interval`. The first
/// probe runs immediately.
pub async fn poll_with_backoff<T, E, F, Fut>(
    config: PollConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut interval = config.initial_interval;

    loop {
        let status = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            status = probe() => status.map_err(PollError::Probe)?,
        };

        if let PollStatus::Ready(value) = status {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut(config.timeout));
        }
        let wake_at = (now + interval).min(deadline);

        tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep_until(wake_at) => {}
        }

        interval = interval.saturating_mul(2).min(config.max_interval);
    }
}
