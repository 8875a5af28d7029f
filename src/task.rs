//! Supervised background tasks.
//!
//! `SupervisedTask` pairs a `oneshot` stop signal with a `tokio::select!`
//! loop, joined on `stop()` and aborted on `Drop` if never stopped cleanly.
//! The timeout sweeper, heartbeat sweeper, alert evaluator, retention
//! runner, and dashboard cache refresher all spawn through this one helper
//! instead of hand-rolling the same scaffolding five times.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A periodic task that runs `tick` on every `interval` until stopped.
pub struct SupervisedTask {
    name: &'static str,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl SupervisedTask {
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let join_handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => tick().await,
                    }
                }
        });
        Self {
            name,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Like `spawn`, but the first tick fires at the next occurrence of
    /// `hour:minute` UTC (`cleanupTimeUtc`, default 02:00) rather
    /// than immediately, then repeats every `interval` after that.
    pub fn spawn_daily_at<F, Fut>(
        name: &'static str,
        hour: u32,
        minute: u32,
        now: chrono::DateTime<chrono::Utc>,
        interval: Duration,
        mut tick: F,
    ) -> Self
    where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
    {
        let initial_delay = delay_until_next(now, hour, minute);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let join_handle = tokio::spawn(async move {
                tokio::select! {
                    _ = &mut stop_rx => return,
                    _ = tokio::time::sleep(initial_delay) => {}
                }
                tick().await;
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => tick().await,
                    }
                }
        });
        Self {
            name,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            if let Err(err) = join_handle.await {
                tracing::warn!(task = self.name, error = %err, "background task join failed");
            }
        }
    }
}

impl Drop for SupervisedTask {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

fn delay_until_next(now: chrono::DateTime<chrono::Utc>, hour: u32, minute: u32) -> Duration {
    let today_target = now
    .date_naive()
    .and_hms_opt(hour, minute, 0)
    .expect("valid hour/minute")
    .and_utc();
    let target = if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn delay_until_next_rolls_to_tomorrow_once_the_target_has_passed() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        let delay = delay_until_next(now, 2, 0);
        assert_eq!(delay, Duration::from_secs(23 * 3600));
    }

    #[test]
    fn delay_until_next_stays_within_today_before_the_target() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let delay = delay_until_next(now, 2, 0);
        assert_eq!(delay, Duration::from_secs(3600));
    }
}
