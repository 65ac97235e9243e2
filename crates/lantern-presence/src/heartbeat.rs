//! Keep-alive timer driven by the interval announced in the gateway hello.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// At most one repeating timer. Owned by a single connection loop and
/// polled from its `select!`, so once `stop` returns no further tick can be
/// observed.
#[derive(Debug, Default)]
pub struct HeartbeatScheduler {
    timer: Option<Interval>,
}

impl HeartbeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start beating every `interval`, replacing any running timer. The first
    /// beat is due one full interval from now.
    pub fn start(&mut self, interval: Duration) {
        let mut timer = time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
    }

    pub fn stop(&mut self) {
        self.timer = None;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(Interval::period)
    }

    /// Resolves when the next heartbeat is due. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_one_interval_after_start() {
        let mut hb = HeartbeatScheduler::new();
        let started = Instant::now();
        hb.start(Duration::from_millis(500));

        hb.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        hb.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_interval() {
        let mut hb = HeartbeatScheduler::new();
        hb.start(Duration::from_secs(10));
        hb.start(Duration::from_secs(2));
        assert_eq!(hb.interval(), Some(Duration::from_secs(2)));

        let started = Instant::now();
        hb.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_never_ticks() {
        let mut hb = HeartbeatScheduler::new();
        hb.start(Duration::from_millis(100));
        hb.stop();
        assert!(!hb.is_running());
        assert_eq!(hb.interval(), None);

        let fired = time::timeout(Duration::from_secs(60), hb.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_wins_over_an_overdue_tick() {
        let mut hb = HeartbeatScheduler::new();
        hb.start(Duration::from_millis(100));
        time::advance(Duration::from_millis(250)).await;
        hb.stop();

        let fired = time::timeout(Duration::from_millis(1), hb.tick()).await;
        assert!(fired.is_err());
    }
}
