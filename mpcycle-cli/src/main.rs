use clap::{Parser, Subcommand};
use std::path::PathBuf;
use mpcycle_common::ErrorReporting;
use mpcycle_config::GlobalConfig;
use mpcycle_core::{IpcClient, IpcCommand, IpcResponse};

#[derive(Parser)]
#[command(name = "mpcycle-cli")]
#[command(about = "mpcycle-cli (mplayer stream cycle control)")]
#[command(version)]
struct Cli {
    /// Daemon control socket
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a configuration file to the daemon
    SetConfig {
        /// Defaults to ~/.config/mpcycle/config.toml
        path: Option<PathBuf>,
    },

    /// Start cycling streams
    Start,

    /// Stop every player and rewind all windows
    Stop,

    /// Stop, then start from the first stream of each window
    Restart,

    /// Show current status
    Status,
}

fn send(client: &IpcClient, command: IpcCommand) -> IpcResponse {
    match client.send_command(&command) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = match cli.socket {
        Some(path) => IpcClient::with_path(path),
        None => IpcClient::new(),
    };

    match cli.command {
        Commands::SetConfig { path } => {
            let loaded = match path {
                Some(path) => GlobalConfig::load_from_path(&path),
                None => GlobalConfig::load(),
            };
            let config = match loaded {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("✗ {}", e.user_friendly_message());
                    std::process::exit(1);
                }
            };
            print_response(send(&client, IpcCommand::SetConfig(Box::new(config))));
        }

        Commands::Start => print_response(send(&client, IpcCommand::StartStreamCycle)),

        Commands::Stop => print_response(send(&client, IpcCommand::StopStreamCycle)),

        Commands::Restart => {
            print_response(send(&client, IpcCommand::StopStreamCycle));
            print_response(send(&client, IpcCommand::StartStreamCycle));
        }

        Commands::Status => print_response(send(&client, IpcCommand::Status)),
    }

    Ok(())
}

fn print_response(response: IpcResponse) {
    match response {
        IpcResponse::StreamCycleStarted => {
            println!("✓ Stream cycle started");
        }

        IpcResponse::Success { message } => {
            println!("✓ {}", message);
        }

        IpcResponse::Error { message } => {
            eprintln!("✗ Error: {}", message);
            std::process::exit(1);
        }

        IpcResponse::Status { running, slots } => {
            if slots.is_empty() {
                println!("No windows configured");
                return;
            }

            println!("mpcycle Status:");
            println!("===============");
            println!("Cycle: {}", if running { "RUNNING" } else { "STOPPED" });
            println!();

            for slot in slots {
                let position = match slot.cursor {
                    Some(cursor) => format!("{}/{}", cursor + 1, slot.playlist_len),
                    None => format!("-/{}", slot.playlist_len),
                };
                let pid = slot.pid.map_or_else(|| "no player".to_string(), |pid| format!("PID {}", pid));
                let since = slot.last_rotated
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());

                println!("window-{}: {} | {} | {} | since {}",
                    slot.index,
                    slot.stream.as_deref().unwrap_or("None"),
                    position,
                    pid,
                    since
                );
            }
        }
    }
}
