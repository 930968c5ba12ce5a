use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use mpcycle_common::error::ProcessError;
use mpcycle_config::PlayerSettings;
use crate::options::ResolvedArguments;

/// A launched player, identified by the window it plays in and its PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub slot: usize,
    pub pid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Diagnostics from running players, delivered to the logging side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output {
        slot: usize,
        pid: u32,
        stream: OutputStream,
        line: String,
    },
    Exited {
        slot: usize,
        pid: u32,
        code: Option<i32>,
    },
    WaitFailed {
        slot: usize,
        pid: u32,
        message: String,
    },
}

/// Lifecycle of one player process per window.
pub trait Supervisor: Send + Sync + 'static {
    /// Launches a player and records it for `slot`, replacing any earlier record.
    /// Does not stop the previous process. On failure the record for `slot` is cleared.
    fn spawn(&self, slot: usize, arguments: &ResolvedArguments) -> Result<ProcessHandle, ProcessError>;

    /// Asks the recorded process to exit and forgets it. Returns without waiting.
    /// Nothing recorded is not an error.
    fn terminate(&self, slot: usize);

    fn current_handle(&self, slot: usize) -> Option<ProcessHandle>;
}

type Records = Arc<Mutex<HashMap<usize, ProcessHandle>>>;

pub struct ProcessSupervisor {
    program: PathBuf,
    display: String,
    records: Records,
    events: UnboundedSender<ProcessEvent>,
}

impl ProcessSupervisor {
    pub fn new(program: PathBuf, display: impl Into<String>, events: UnboundedSender<ProcessEvent>) -> Self {
        Self {
            program,
            display: display.into(),
            records: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Resolves the player binary through `PATH`. A binary that cannot be found is kept
    /// as given so the failure shows up as `SpawnFailed` on the first rotation.
    pub fn from_settings(settings: &PlayerSettings, events: UnboundedSender<ProcessEvent>) -> Self {
        let program = match which::which(&settings.binary) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{} not found in PATH ({}), launches will fail until it is installed",
                    settings.binary, e);
                PathBuf::from(&settings.binary)
            }
        };
        log::info!("Using player binary {:?} on DISPLAY={}", program, settings.display);
        Self::new(program, settings.display.clone(), events)
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<usize, ProcessHandle>> {
        lock_records(&self.records)
    }

    fn build_command(&self, arguments: &ResolvedArguments) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(arguments.tokens())
            .env("DISPLAY", &self.display)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Supervisor for ProcessSupervisor {
    fn spawn(&self, slot: usize, arguments: &ResolvedArguments) -> Result<ProcessHandle, ProcessError> {
        let mut cmd = self.build_command(arguments);
        log::info!("Launching player for window-{}: DISPLAY={} {} {}",
            slot, self.display, self.program.display(), arguments.tokens().join(" "));

        let spawned = cmd.spawn().and_then(|child| match child.id() {
            Some(pid) => Ok((child, pid)),
            None => Err(std::io::Error::other("player exited before its PID could be read")),
        });

        let (mut child, pid) = match spawned {
            Ok(spawned) => spawned,
            Err(source) => {
                self.records().remove(&slot);
                return Err(ProcessError::SpawnFailed {
                    slot,
                    command: self.program.display().to_string(),
                    source,
                });
            }
        };

        if let Some(stdout) = child.stdout.take() {
            forward_lines(slot, pid, OutputStream::Stdout, stdout, self.events.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(slot, pid, OutputStream::Stderr, stderr, self.events.clone());
        }
        let handle = ProcessHandle { slot, pid };
        self.records().insert(slot, handle);
        watch_exit(handle, child, Arc::clone(&self.records), self.events.clone());
        log::info!("Launched player for window-{} with PID {}", slot, pid);
        Ok(handle)
    }

    fn terminate(&self, slot: usize) {
        let Some(handle) = self.records().remove(&slot) else {
            log::debug!("No player recorded for window-{}, nothing to terminate", slot);
            return;
        };

        log::debug!("Sending SIGTERM to player for window-{} (PID {})", slot, handle.pid);
        if let Err(e) = send_sigterm(handle.pid) {
            log::warn!("Failed to signal player for window-{} (PID {}): {}", slot, handle.pid, e);
        }
    }

    fn current_handle(&self, slot: usize) -> Option<ProcessHandle> {
        self.records().get(&slot).copied()
    }
}

fn send_sigterm(pid: u32) -> std::io::Result<()> {
    let invalid = |reason: &str| std::io::Error::new(std::io::ErrorKind::InvalidInput, reason.to_string());
    let raw = i32::try_from(pid).map_err(|_| invalid("PID out of range"))?;
    let target = rustix::process::Pid::from_raw(raw).ok_or_else(|| invalid("PID 0"))?;

    rustix::process::kill_process(target, rustix::process::Signal::Term)?;
    Ok(())
}

fn forward_lines<R>(slot: usize, pid: u32, stream: OutputStream, reader: R, events: UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if events.send(ProcessEvent::Output { slot, pid, stream, line }).is_err() {
                break;
            }
        }
    });
}

fn lock_records(records: &Records) -> std::sync::MutexGuard<'_, HashMap<usize, ProcessHandle>> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits for the child and forgets its record if the window still points at it,
/// so a player that exits on its own is never signalled later.
fn watch_exit(handle: ProcessHandle, mut child: Child, records: Records, events: UnboundedSender<ProcessEvent>) {
    let ProcessHandle { slot, pid } = handle;
    tokio::spawn(async move {
        let status = child.wait().await;
        {
            let mut records = lock_records(&records);
            if records.get(&slot) == Some(&handle) {
                records.remove(&slot);
            }
        }

        let event = match status {
            Ok(status) => ProcessEvent::Exited { slot, pid, code: status.code() },
            Err(e) => ProcessEvent::WaitFailed { slot, pid, message: e.to_string() },
        };
        // Receiver gone means the daemon is shutting down
        let _ = events.send(event);
    });
}

/// Drains player diagnostics into the log until every sender is dropped.
pub fn spawn_event_logger(mut events: tokio::sync::mpsc::UnboundedReceiver<ProcessEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Output { slot, stream, line, .. } => {
                    log::debug!("player [window-{}] {}: {}", slot, stream, line);
                }
                ProcessEvent::Exited { slot, pid, code } => match code {
                    Some(code) => log::info!("Player for window-{} (PID {}) exited with code {}", slot, pid, code),
                    None => log::info!("Player for window-{} (PID {}) terminated by signal", slot, pid),
                },
                ProcessEvent::WaitFailed { slot, pid, message } => {
                    log::warn!("Could not observe exit of player for window-{} (PID {}): {}", slot, pid, message);
                }
            }
        }
    })
}
