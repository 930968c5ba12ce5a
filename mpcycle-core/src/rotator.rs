use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use mpcycle_common::{ErrorReporting, MpcycleError, Result, error::ValidationError};
use mpcycle_config::{GlobalConfig, SlotConfig};
use crate::options::resolve_arguments;
use crate::state::{RotationState, SlotStatus};
use crate::supervisor::{ProcessHandle, Supervisor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Window has no streams configured.
    Skipped,
    /// The cycle this rotation belonged to was stopped before it got the window.
    Cancelled,
    /// Single-entry playlist left running because relaunching is disabled.
    Unchanged { index: usize },
    Launched { index: usize, handle: ProcessHandle },
}

/// Advances windows through their playlists.
///
/// Each window's [`RotationState`] sits behind its own mutex. Rotating and resetting
/// a window both hold that mutex for the whole terminate/spawn/update sequence, so the
/// cursor and the supervisor's record for the window always change together.
pub struct SlotRotator<S> {
    config: Arc<GlobalConfig>,
    supervisor: Arc<S>,
    states: Vec<Mutex<RotationState>>,
}

impl<S: Supervisor> SlotRotator<S> {
    pub fn new(config: Arc<GlobalConfig>, supervisor: Arc<S>) -> Self {
        let states = config.slots.iter().map(|_| Mutex::new(RotationState::new())).collect();
        Self { config, supervisor, states }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn slot_count(&self) -> usize {
        self.states.len()
    }

    fn slot(&self, index: usize) -> Result<(&SlotConfig, MutexGuard<'_, RotationState>)> {
        let slot = self.config
            .slot(index)
            .ok_or(MpcycleError::Validation(ValidationError::UnknownSlot { index }))?;
        let state = self.states[index].lock().unwrap_or_else(PoisonError::into_inner);
        Ok((slot, state))
    }

    /// Moves window `index` to its next stream: stop the old player, launch the new one.
    pub fn rotate(&self, index: usize) -> Result<RotationOutcome> {
        self.rotate_if(index, || true)
    }

    /// Like [`SlotRotator::rotate`], but only if `still_wanted` holds once the window's
    /// lock is taken.
    pub(crate) fn rotate_if(&self, index: usize, still_wanted: impl Fn() -> bool) -> Result<RotationOutcome> {
        let (slot, mut state) = self.slot(index)?;
        if !slot.is_active() {
            log::debug!("streams window-{} is empty - no stream to start", index);
            return Ok(RotationOutcome::Skipped);
        }
        if !still_wanted() {
            return Ok(RotationOutcome::Cancelled);
        }

        let current = state.cursor();
        let next = state.next_index(slot.streams.len());
        if current == Some(next) && !self.config.player.relaunch_unchanged {
            log::debug!("window-{} has a single stream and relaunching is off", index);
            return Ok(RotationOutcome::Unchanged { index: next });
        }

        // Resolve before touching the running player: an invalid option leaves it alone
        let stream = &slot.streams[next];
        let arguments = resolve_arguments(&self.config, slot, stream)?;

        log::debug!("Switching window-{} from {:?} to stream {}", index, current, next);
        self.supervisor.terminate(index);
        let spawned = self.supervisor.spawn(index, &arguments);
        state.advance(next);

        let handle = spawned?;
        Ok(RotationOutcome::Launched { index: next, handle })
    }

    /// Rotates every window in order. Failures are logged and do not affect other windows.
    pub(crate) fn rotate_all_if(&self, still_wanted: impl Fn() -> bool) {
        for index in 0..self.slot_count() {
            match self.rotate_if(index, &still_wanted) {
                Ok(RotationOutcome::Launched { index: stream, handle }) => {
                    log::debug!("window-{} now playing stream {} (PID {})", index, stream, handle.pid);
                }
                Ok(_) => {}
                Err(e) => e.log_error(&format!("Rotation of window-{} failed", index)),
            }
        }
    }

    /// Stops window `index`'s player and rewinds its cursor.
    pub fn reset(&self, index: usize) -> Result<()> {
        let (slot, mut state) = self.slot(index)?;
        if slot.is_active() {
            self.supervisor.terminate(index);
        } else {
            log::debug!("streams window-{} is empty - no stream to stop", index);
        }
        state.reset();
        Ok(())
    }

    pub fn snapshot(&self, index: usize) -> Result<SlotStatus> {
        let (slot, state) = self.slot(index)?;
        let handle = self.supervisor.current_handle(index);
        Ok(SlotStatus {
            index,
            cursor: state.cursor(),
            stream: state.cursor().and_then(|c| slot.streams.get(c).cloned()),
            pid: handle.map(|h| h.pid),
            playlist_len: slot.streams.len(),
            last_rotated: state.last_rotated(),
        })
    }
}
