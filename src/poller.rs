//! Periodic state refresh for one controller.

use crate::controller::SunblindController;
use crate::error::UpdateFailed;

use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Poll interval used when the configuration does not set one.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Receives the outcome of every poll tick.
pub trait UpdateListener: Send + Sync {
    /// Called after a successful refresh; re-read controller state here.
    fn handle_coordinator_update(&self);

    /// Called once per failed refresh.
    fn handle_update_failed(&self, _error: &UpdateFailed) {}
}

/// Phase of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the next tick.
    Idle,
    /// A refresh call to the controller is in flight.
    Refreshing,
}

/// Drives the refresh cycle of one controller and fans results out to
/// listeners.
///
/// Listeners are held weakly, so dropping a cover unsubscribes it.
///
/// # Example
///
/// ```
/// use iqtec_cover::{MockController, UpdateCoordinator};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let mock = Arc::new(MockController::new("hub"));
/// let coordinator = UpdateCoordinator::new(mock.clone(), Duration::from_secs(1));
///
/// coordinator.tick().unwrap();
/// mock.fail_refresh("hub offline");
/// let err = coordinator.tick().unwrap_err();
/// assert_eq!(err.to_string(), "Error while communicating with API: API error: hub offline");
/// assert!(!coordinator.last_update_success());
/// ```
pub struct UpdateCoordinator {
    name: String,
    controller: Arc<dyn SunblindController>,
    update_interval: Duration,
    refreshing: AtomicBool,
    last_update_success: AtomicBool,
    listeners: Mutex<Vec<Weak<dyn UpdateListener>>>,
}

impl UpdateCoordinator {
    /// Create a coordinator named after its controller.
    pub fn new(controller: Arc<dyn SunblindController>, update_interval: Duration) -> Self {
        Self {
            name: controller.name().to_string(),
            controller,
            update_interval,
            refreshing: AtomicBool::new(false),
            last_update_success: AtomicBool::new(true),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Name of the coordinator (the controller's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared controller handle.
    pub fn controller(&self) -> &Arc<dyn SunblindController> {
        &self.controller
    }

    /// Interval between ticks in [`run`](Self::run).
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Current phase of the refresh cycle.
    pub fn phase(&self) -> PollPhase {
        if self.refreshing.load(Ordering::SeqCst) {
            PollPhase::Refreshing
        } else {
            PollPhase::Idle
        }
    }

    /// Whether the most recent tick succeeded. `true` before the first tick.
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Subscribe a listener to tick results.
    pub fn add_listener<L: UpdateListener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        let weak: Weak<dyn UpdateListener> = weak;
        self.listeners.lock().unwrap().push(weak);
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.len()
    }

    /// Run one refresh.
    ///
    /// On success every listener re-reads its state. On failure the
    /// controller error is wrapped into [`UpdateFailed`], listeners are told
    /// once and the same error is returned. A tick issued while another is
    /// still refreshing is rejected without calling the controller.
    pub fn tick(&self) -> Result<(), UpdateFailed> {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            warn!("{}: refresh already in progress, skipping tick", self.name);
            return Err(UpdateFailed(format!(
                "Refresh of {} already in progress",
                self.name
            )));
        }

        trace!("{}: refreshing all devices", self.name);
        let result = self.controller.refresh_all();
        self.refreshing.store(false, Ordering::SeqCst);

        let was_success = self.last_update_success.load(Ordering::SeqCst);
        match result {
            Ok(()) => {
                if !was_success {
                    info!("{}: fetching data recovered", self.name);
                }
                self.last_update_success.store(true, Ordering::SeqCst);
                for listener in self.live_listeners() {
                    listener.handle_coordinator_update();
                }
                Ok(())
            }
            Err(e) => {
                let failed = UpdateFailed::from_controller(&e);
                if was_success {
                    error!("{}: {}", self.name, failed);
                } else {
                    debug!("{}: {}", self.name, failed);
                }
                self.last_update_success.store(false, Ordering::SeqCst);
                for listener in self.live_listeners() {
                    listener.handle_update_failed(&failed);
                }
                Err(failed)
            }
        }
    }

    /// Tick at the configured interval until `shutdown` is cancelled.
    ///
    /// The first tick fires immediately. Each refresh runs on tokio's
    /// blocking pool, so a slow controller never stalls the runtime.
    /// Failures are reported through [`tick`](Self::tick) and never end the
    /// loop.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "{}: starting poll loop every {:?}",
            self.name, self.update_interval
        );
        let mut interval = tokio::time::interval(self.update_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("{}: poll loop stopped", self.name);
                    break;
                }
                _ = interval.tick() => {
                    let coordinator = self.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || coordinator.tick()).await {
                        error!("{}: refresh task aborted: {}", self.name, e);
                    }
                }
            }
        }
    }

    fn live_listeners(&self) -> Vec<Arc<dyn UpdateListener>> {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::mock::MockController;
    use crate::state::SunblindState;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingListener {
        updates: AtomicUsize,
        failures: Mutex<Vec<UpdateFailed>>,
    }

    impl UpdateListener for CountingListener {
        fn handle_coordinator_update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn handle_update_failed(&self, error: &UpdateFailed) {
            self.failures.lock().unwrap().push(error.clone());
        }
    }

    fn coordinator() -> (Arc<MockController>, UpdateCoordinator) {
        let mock = Arc::new(MockController::new("hub"));
        let coordinator = UpdateCoordinator::new(mock.clone(), DEFAULT_UPDATE_INTERVAL);
        (mock, coordinator)
    }

    #[test]
    fn test_tick_notifies_listeners() {
        let (mock, coordinator) = coordinator();
        let listener = Arc::new(CountingListener::default());
        coordinator.add_listener(&listener);

        coordinator.tick().unwrap();
        coordinator.tick().unwrap();

        assert_eq!(mock.refresh_count(), 2);
        assert_eq!(listener.updates.load(Ordering::SeqCst), 2);
        assert!(listener.failures.lock().unwrap().is_empty());
        assert_eq!(coordinator.phase(), PollPhase::Idle);
    }

    #[test]
    fn test_failed_tick_signals_once() {
        let (mock, coordinator) = coordinator();
        let listener = Arc::new(CountingListener::default());
        coordinator.add_listener(&listener);
        mock.fail_refresh("connection reset");

        let err = coordinator.tick().unwrap_err();
        assert_eq!(
            err,
            UpdateFailed(
                "Error while communicating with API: API error: connection reset".to_string()
            )
        );
        assert_eq!(listener.failures.lock().unwrap().len(), 1);
        assert_eq!(listener.updates.load(Ordering::SeqCst), 0);
        assert!(!coordinator.last_update_success());
        assert_eq!(coordinator.phase(), PollPhase::Idle);

        mock.recover();
        coordinator.tick().unwrap();
        assert!(coordinator.last_update_success());
        assert_eq!(listener.updates.load(Ordering::SeqCst), 1);
    }

    /// Controller whose refresh calls back into its own coordinator.
    struct ReentrantController {
        coordinator: Mutex<Weak<UpdateCoordinator>>,
        refreshes: AtomicUsize,
        inner: Mutex<Option<Result<(), UpdateFailed>>>,
    }

    impl SunblindController for ReentrantController {
        fn name(&self) -> &str {
            "reentrant"
        }

        fn add_sunblind(&self, _address: &str, _name: &str) -> Result<(), ControllerError> {
            Ok(())
        }

        fn refresh_all(&self) -> Result<(), ControllerError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let coordinator = self.coordinator.lock().unwrap().upgrade();
            if let Some(coordinator) = coordinator {
                *self.inner.lock().unwrap() = Some(coordinator.tick());
            }
            Ok(())
        }

        fn sunblind_state(&self, _address: &str) -> Option<SunblindState> {
            None
        }

        fn open(&self, _address: &str) -> Result<(), ControllerError> {
            Ok(())
        }

        fn close(&self, _address: &str) -> Result<(), ControllerError> {
            Ok(())
        }

        fn stop(&self, _address: &str) -> Result<(), ControllerError> {
            Ok(())
        }

        fn move_to(&self, _address: &str, _position: i32) -> Result<(), ControllerError> {
            Ok(())
        }

        fn tilt_to(&self, _address: &str, _rotation: i32) -> Result<(), ControllerError> {
            Ok(())
        }
    }

    #[test]
    fn test_tick_while_refreshing_is_rejected() {
        let controller = Arc::new(ReentrantController {
            coordinator: Mutex::new(Weak::new()),
            refreshes: AtomicUsize::new(0),
            inner: Mutex::new(None),
        });
        let coordinator = Arc::new(UpdateCoordinator::new(
            controller.clone(),
            DEFAULT_UPDATE_INTERVAL,
        ));
        *controller.coordinator.lock().unwrap() = Arc::downgrade(&coordinator);
        let listener = Arc::new(CountingListener::default());
        coordinator.add_listener(&listener);

        coordinator.tick().unwrap();

        assert_eq!(
            controller.inner.lock().unwrap().clone(),
            Some(Err(UpdateFailed(
                "Refresh of reentrant already in progress".to_string()
            )))
        );
        assert_eq!(controller.refreshes.load(Ordering::SeqCst), 1);
        assert!(coordinator.last_update_success());
        assert!(listener.failures.lock().unwrap().is_empty());
        assert_eq!(listener.updates.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.phase(), PollPhase::Idle);
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let (_mock, coordinator) = coordinator();
        let listener = Arc::new(CountingListener::default());
        coordinator.add_listener(&listener);
        assert_eq!(coordinator.listener_count(), 1);

        drop(listener);
        coordinator.tick().unwrap();
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let (mock, coordinator) = coordinator();
        let coordinator = Arc::new(coordinator);
        let token = CancellationToken::new();

        let handle = tokio::spawn(coordinator.clone().run(token.clone()));

        // ticks at 0s, 1s, 2s and 3s
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(mock.refresh_count(), 4);

        token.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(mock.refresh_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failures() {
        let (mock, coordinator) = coordinator();
        let coordinator = Arc::new(coordinator);
        let token = CancellationToken::new();
        mock.fail_refresh("offline");

        let handle = tokio::spawn(coordinator.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(mock.refresh_count(), 2);
        assert!(!coordinator.last_update_success());

        mock.recover();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(coordinator.last_update_success());

        token.cancel();
        handle.await.unwrap();
    }
}
