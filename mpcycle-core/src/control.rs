use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use mpcycle_common::{ErrorReporting, MpcycleError, Result, error::ConfigError};
use mpcycle_config::GlobalConfig;
use crate::ipc::{IpcCommand, IpcResponse};
use crate::rotator::SlotRotator;
use crate::scheduler::{CycleScheduler, Notification};
use crate::state::SlotStatus;
use crate::supervisor::Supervisor;

type SupervisorFactory<S> = Box<dyn Fn(&GlobalConfig) -> Arc<S> + Send + Sync>;

/// Applies the host's control signals to the current stream cycle.
pub struct Controller<S: Supervisor> {
    make_supervisor: SupervisorFactory<S>,
    notifications: UnboundedSender<Notification>,
    scheduler: Mutex<Option<CycleScheduler<S>>>,
}

impl<S: Supervisor> Controller<S> {
    pub fn new<F>(make_supervisor: F, notifications: UnboundedSender<Notification>) -> Self
    where
        F: Fn(&GlobalConfig) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            make_supervisor: Box::new(make_supervisor),
            notifications,
            scheduler: Mutex::new(None),
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, Option<CycleScheduler<S>>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs a new configuration. A running cycle is stopped, replaced and
    /// started again with the new windows.
    pub fn set_config(&self, mut config: GlobalConfig) -> Result<()> {
        config.prepare()?;

        let mut current = self.scheduler();
        let was_running = current.as_ref().is_some_and(|scheduler| scheduler.stop());

        let supervisor = (self.make_supervisor)(&config);
        let rotator = Arc::new(SlotRotator::new(Arc::new(config), supervisor));
        let scheduler = CycleScheduler::new(rotator, self.notifications.clone());
        log::info!("Configuration installed: {} window(s)", scheduler.rotator().slot_count());

        if was_running {
            log::info!("Restarting stream cycle with the new configuration");
            scheduler.start();
        }
        *current = Some(scheduler);
        Ok(())
    }

    /// Returns `true` when this call started the cycle.
    pub fn start(&self) -> Result<bool> {
        match self.scheduler().as_ref() {
            Some(scheduler) => Ok(scheduler.start()),
            None => Err(MpcycleError::Config(ConfigError::NotLoaded)),
        }
    }

    /// Returns `true` when this call stopped the cycle.
    pub fn stop(&self) -> bool {
        self.scheduler().as_ref().is_some_and(|scheduler| scheduler.stop())
    }

    pub fn status(&self) -> (bool, Vec<SlotStatus>) {
        match self.scheduler().as_ref() {
            Some(scheduler) => (scheduler.is_running(), scheduler.status()),
            None => (false, Vec::new()),
        }
    }

    pub fn handle(&self, command: IpcCommand) -> IpcResponse {
        match command {
            IpcCommand::SetConfig(config) => {
                log::debug!("Received SET_CONFIG");
                match self.set_config(*config) {
                    Ok(()) => IpcResponse::Success { message: "Configuration applied".to_string() },
                    Err(e) => {
                        e.log_error("Rejected configuration");
                        IpcResponse::Error { message: e.user_friendly_message() }
                    }
                }
            }
            IpcCommand::StartStreamCycle => {
                log::debug!("Received START_STREAM_CYCLE");
                match self.start() {
                    Ok(true) => IpcResponse::StreamCycleStarted,
                    Ok(false) => IpcResponse::Success { message: "Stream cycle already running".to_string() },
                    Err(e) => IpcResponse::Error { message: e.user_friendly_message() },
                }
            }
            IpcCommand::StopStreamCycle => {
                log::debug!("Received STOP_STREAM_CYCLE");
                let message = if self.stop() {
                    "Stream cycle stopped"
                } else {
                    "Stream cycle was not running"
                };
                IpcResponse::Success { message: message.to_string() }
            }
            IpcCommand::Status => {
                let (running, slots) = self.status();
                IpcResponse::Status { running, slots }
            }
        }
    }
}
