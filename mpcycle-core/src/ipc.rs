use std::path::{Path, PathBuf};
use std::os::unix::net::UnixStream;
use std::io::{Read, Write};
use serde::{Serialize, Deserialize};
use anyhow::{Result, Context};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use mpcycle_config::GlobalConfig;
use crate::state::SlotStatus;

/// Control signals from the host. Variant names are the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "notification", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpcCommand {
    SetConfig(Box<GlobalConfig>),
    StartStreamCycle,
    StopStreamCycle,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notification", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpcResponse {
    StreamCycleStarted,
    Success { message: String },
    Error { message: String },
    Status {
        running: bool,
        slots: Vec<SlotStatus>,
    },
}

fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("mpcycle.sock")
}

pub struct IpcClient {
    socket_path: PathBuf,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcClient {
    pub fn new() -> Self {
        Self { socket_path: default_socket_path() }
    }

    pub fn with_path(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub fn send_command(&self, command: &IpcCommand) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .with_context(|| format!("Failed to connect to mpcycle daemon at {:?}", self.socket_path))?;

        let command_json = serde_json::to_string(command)
            .with_context(|| "Failed to serialize command")?;

        stream.write_all(command_json.as_bytes())
            .with_context(|| "Failed to send command to daemon")?;
        stream.shutdown(std::net::Shutdown::Write)
            .with_context(|| "Failed to shutdown write stream")?;

        let mut response = String::new();
        stream.read_to_string(&mut response)
            .with_context(|| "Failed to read response from daemon")?;

        let ipc_response: IpcResponse = serde_json::from_str(&response)
            .with_context(|| "Failed to deserialize response")?;

        Ok(ipc_response)
    }
}

pub struct IpcServer {
    socket_path: PathBuf,
}

impl Default for IpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcServer {
    pub fn new() -> Self {
        Self { socket_path: default_socket_path() }
    }

    pub fn with_path(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accepts connections until the task is dropped. Each connection carries one
    /// command and gets one response.
    pub async fn serve<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(IpcCommand) -> IpcResponse + Send + Sync + Clone + 'static,
    {
        // Remove existing socket if it exists
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| "Failed to remove existing socket")?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| "Failed to create socket directory")?;
        }

        let listener = tokio::net::UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to socket {:?}", self.socket_path))?;

        log::info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, &handler).await {
                            log::error!("Error handling IPC connection: {:#}", e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Error accepting IPC connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection<F>(mut stream: tokio::net::UnixStream, handler: &F) -> Result<()>
    where
        F: Fn(IpcCommand) -> IpcResponse,
    {
        let mut command_json = Vec::new();
        stream.read_to_end(&mut command_json).await
            .with_context(|| "Failed to read command from client")?;

        let response = match serde_json::from_slice::<IpcCommand>(&command_json) {
            Ok(command) => handler(command),
            Err(e) => IpcResponse::Error { message: format!("Invalid command: {}", e) },
        };

        let response_json = serde_json::to_vec(&response)
            .with_context(|| "Failed to serialize response")?;

        stream.write_all(&response_json).await
            .with_context(|| "Failed to send response to client")?;
        stream.shutdown().await
            .with_context(|| "Failed to close response stream")?;

        Ok(())
    }

    pub fn cleanup(&self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                log::warn!("Failed to remove socket {:?}: {}", self.socket_path, e);
            }
        }
    }
}
