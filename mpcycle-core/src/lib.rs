pub mod control;
pub mod ipc;
pub mod options;
pub mod rotator;
pub mod scheduler;
pub mod state;
pub mod supervisor;

pub use control::Controller;
pub use ipc::{IpcClient, IpcCommand, IpcResponse, IpcServer};
pub use options::{resolve_arguments, ResolvedArguments};
pub use rotator::{RotationOutcome, SlotRotator};
pub use scheduler::{CycleScheduler, Notification};
pub use state::{RotationState, SlotStatus};
pub use supervisor::{spawn_event_logger, ProcessEvent, ProcessHandle, ProcessSupervisor, Supervisor};
