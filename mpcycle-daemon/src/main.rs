use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use mpcycle_common::ErrorReporting;
use mpcycle_config::GlobalConfig;
use mpcycle_core::{spawn_event_logger, Controller, IpcCommand, IpcServer, Notification, ProcessSupervisor};

#[derive(Parser)]
#[command(name = "mpcycle-daemon")]
#[command(about = "Cycles mplayer windows through their stream playlists")]
#[command(version)]
struct Args {
    /// Configuration file to load at startup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start the stream cycle as soon as a configuration is loaded
    #[arg(long)]
    autostart: bool,

    /// Control socket path
    #[arg(long)]
    socket: Option<PathBuf>,
}

/// Loads the startup configuration. A missing default file is not an error: the
/// daemon then waits for SET_CONFIG.
fn initial_config(path: Option<PathBuf>) -> Result<Option<GlobalConfig>> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => match GlobalConfig::config_path() {
            Ok(path) => (path, false),
            Err(e) => {
                log::warn!("{}", e.user_friendly_message());
                return Ok(None);
            }
        },
    };

    if !explicit && !path.exists() {
        log::info!("No configuration at {:?}, waiting for SET_CONFIG", path);
        return Ok(None);
    }

    GlobalConfig::load_from_path(&path)
        .map(Some)
        .map_err(|e| {
            log::error!("Configuration error: {}", e.user_friendly_message());
            anyhow::anyhow!("Configuration error: {}", e.user_friendly_message())
        })
}

fn spawn_notification_logger(mut notifications: mpsc::UnboundedReceiver<Notification>) {
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match notification {
                Notification::StreamCycleStarted => log::info!("Stream cycle process started."),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting mpcycle daemon...");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    spawn_event_logger(event_rx);
    spawn_notification_logger(notify_rx);

    let controller = Arc::new(Controller::new(
        move |config: &GlobalConfig| Arc::new(ProcessSupervisor::from_settings(&config.player, event_tx.clone())),
        notify_tx,
    ));

    if let Some(config) = initial_config(args.config)? {
        controller.set_config(config).map_err(|e| {
            e.log_error("Failed to apply configuration");
            anyhow::anyhow!("{}", e.user_friendly_message())
        })?;

        if args.autostart {
            controller.start().map_err(|e| anyhow::anyhow!("{}", e.user_friendly_message()))?;
        }
    } else if args.autostart {
        log::warn!("--autostart ignored until a configuration is received");
    }

    let server = match args.socket {
        Some(path) => IpcServer::with_path(path),
        None => IpcServer::new(),
    };

    let handler = {
        let controller = Arc::clone(&controller);
        move |command: IpcCommand| controller.handle(command)
    };

    tokio::select! {
        result = server.serve(handler) => {
            if let Err(e) = &result {
                log::error!("IPC server failed: {:#}", e);
            }
            controller.stop();
            server.cleanup();
            result
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, stopping stream cycle");
            controller.stop();
            server.cleanup();
            log::info!("mpcycle daemon stopped");
            Ok(())
        }
    }
}
