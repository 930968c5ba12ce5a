use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use crate::rotator::SlotRotator;
use crate::state::SlotStatus;
use crate::supervisor::Supervisor;

/// Outbound notifications for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    StreamCycleStarted,
}

/// Drives every window on one repeating timer.
///
/// Stopped until [`CycleScheduler::start`]; `start` and `stop` are both idempotent.
/// Each start bumps a cycle epoch that ticks check under the window lock, so a tick
/// still running when `stop` is called cannot launch a player `stop` will not see.
pub struct CycleScheduler<S: Supervisor> {
    rotator: Arc<SlotRotator<S>>,
    interval: Duration,
    epoch: Arc<AtomicU64>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    notifications: UnboundedSender<Notification>,
}

impl<S: Supervisor> CycleScheduler<S> {
    pub fn new(rotator: Arc<SlotRotator<S>>, notifications: UnboundedSender<Notification>) -> Self {
        let interval = rotator.config().stream_interval;
        Self {
            rotator,
            interval,
            epoch: Arc::new(AtomicU64::new(0)),
            ticker: Mutex::new(None),
            notifications,
        }
    }

    pub fn rotator(&self) -> &SlotRotator<S> {
        &self.rotator
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Rotates every window once, then every `stream_interval`. Must be called from
    /// within a tokio runtime. Returns `false` if the cycle was already running.
    pub fn start(&self) -> bool {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            log::debug!("Stream cycle already running");
            return false;
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Starting stream cycle for {} window(s), switching every {}",
            self.rotator.slot_count(), mpcycle_common::format_duration(self.interval));

        let current = Arc::clone(&self.epoch);
        let still_wanted = move || current.load(Ordering::SeqCst) == epoch;
        self.rotator.rotate_all_if(&still_wanted);

        let rotator = Arc::clone(&self.rotator);
        let period = self.interval;
        *ticker = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                timer.tick().await;
                log::debug!("Stream cycle tick");
                rotator.rotate_all_if(&still_wanted);
            }
        }));

        if self.notifications.send(Notification::StreamCycleStarted).is_err() {
            log::debug!("Nobody is listening for cycle notifications");
        }
        true
    }

    /// Cancels the timer, stops every player and rewinds every window.
    /// Returns `false` if the cycle was not running.
    pub fn stop(&self) -> bool {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(task) = ticker.take() else {
            log::debug!("Stream cycle already stopped");
            return false;
        };

        self.epoch.fetch_add(1, Ordering::SeqCst);
        task.abort();

        log::info!("Stopping stream cycle");
        for index in 0..self.rotator.slot_count() {
            if let Err(e) = self.rotator.reset(index) {
                log::warn!("Failed to stop window-{}: {}", index, e);
            }
        }
        true
    }

    pub fn status(&self) -> Vec<SlotStatus> {
        (0..self.rotator.slot_count())
            .filter_map(|index| self.rotator.snapshot(index).ok())
            .collect()
    }
}

impl<S: Supervisor> Drop for CycleScheduler<S> {
    fn drop(&mut self) {
        if let Some(task) = self.ticker.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::mock::{config, Call, MockSupervisor};
    use tokio::sync::mpsc;

    fn scheduler(
        playlists: &[&[&str]],
        interval: Duration,
    ) -> (CycleScheduler<MockSupervisor>, Arc<MockSupervisor>, mpsc::UnboundedReceiver<Notification>) {
        let mut config = config(playlists);
        config.stream_interval = interval;
        let supervisor = Arc::new(MockSupervisor::new());
        let rotator = Arc::new(SlotRotator::new(Arc::new(config), Arc::clone(&supervisor)));
        let (tx, rx) = mpsc::unbounded_channel();
        (CycleScheduler::new(rotator, tx), supervisor, rx)
    }

    fn cursors(scheduler: &CycleScheduler<MockSupervisor>) -> Vec<Option<usize>> {
        scheduler.status().iter().map(|s| s.cursor).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_windows_cycle_on_interval() {
        let (scheduler, supervisor, _rx) =
            scheduler(&[&["a0", "a1"], &["b0", "b1"]], Duration::from_millis(100));

        assert!(scheduler.start());
        assert_eq!(cursors(&scheduler), vec![Some(0), Some(0)]);
        assert_eq!(supervisor.spawned_streams(0), vec!["a0"]);
        assert_eq!(supervisor.spawned_streams(1), vec!["b0"]);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cursors(&scheduler), vec![Some(1), Some(1)]);
        assert_eq!(supervisor.spawned_streams(0), vec!["a0", "a1"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cursors(&scheduler), vec![Some(0), Some(0)]);
        assert_eq!(supervisor.spawned_streams(1), vec!["b0", "b1", "b0"]);

        assert!(scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (scheduler, supervisor, mut rx) =
            scheduler(&[&["a0", "a1"]], Duration::from_millis(100));

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert_eq!(rx.try_recv(), Ok(Notification::StreamCycleStarted));
        assert!(rx.try_recv().is_err());

        // A second timer would double the launches per interval
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(supervisor.spawned_streams(0).len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_stopped_does_nothing() {
        let (scheduler, supervisor, _rx) = scheduler(&[&["a0"]], Duration::from_millis(100));
        assert!(!scheduler.stop());
        assert!(supervisor.calls().is_empty());

        scheduler.start();
        assert!(scheduler.stop());
        supervisor.clear_calls();
        assert!(!scheduler.stop());
        assert!(supervisor.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_terminates_and_rewinds() {
        let (scheduler, supervisor, _rx) =
            scheduler(&[&["a0", "a1"], &[], &["c0"]], Duration::from_millis(100));
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        supervisor.clear_calls();

        assert!(scheduler.stop());
        assert!(!scheduler.is_running());
        assert_eq!(
            supervisor.calls(),
            vec![Call::Terminate { slot: 0 }, Call::Terminate { slot: 2 }]
        );
        assert_eq!(cursors(&scheduler), vec![None, None, None]);
        assert!(scheduler.status().iter().all(|s| s.pid.is_none()));

        // No more ticks after stop
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(supervisor.calls().len() == 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_begins_at_first_stream() {
        let (scheduler, supervisor, mut rx) =
            scheduler(&[&["a0", "a1", "a2"]], Duration::from_millis(100));
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop();

        assert!(scheduler.start());
        assert_eq!(cursors(&scheduler), vec![Some(0)]);
        assert_eq!(supervisor.spawned_streams(0), vec!["a0", "a1", "a0"]);

        assert_eq!(rx.try_recv(), Ok(Notification::StreamCycleStarted));
        assert_eq!(rx.try_recv(), Ok(Notification::StreamCycleStarted));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_during_ticks_leaves_nothing_running() {
        let (scheduler, supervisor, _rx) =
            scheduler(&[&["a0", "a1"], &["b0", "b1"], &["c0", "c1"]], Duration::from_millis(1));

        for _ in 0..20 {
            scheduler.start();
            tokio::time::sleep(Duration::from_millis(3)).await;
            scheduler.stop();
            assert!(
                scheduler.status().iter().all(|s| s.pid.is_none() && s.cursor.is_none()),
                "window left running after stop: {:?}", scheduler.status()
            );
        }
        assert!(!supervisor.calls().is_empty());
    }
}
