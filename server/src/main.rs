use clap::Parser;
use log::info;
use server::analytics::AnalyticsSink;
use server::dispatcher::{self, Command};
use server::network;
use server::registry::Registry;
use server::world::World;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Main-method of the application.
/// Parses command-line arguments, then spawns the network listener and the
/// single-writer game loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
        /// Append combat/movement telemetry to this CSV file
        #[clap(long)]
        analytics_log: Option<PathBuf>,
    }

    env_logger::init();
    let args = Args::parse();

    let analytics = match &args.analytics_log {
        Some(path) => AnalyticsSink::to_file(path)?,
        None => AnalyticsSink::disabled(),
    };

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Arena server listening on {}", address);

    // Bounded channel between the transport tasks and the game loop.
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(1000);

    let listener_handle = tokio::spawn(network::run_listener(listener, cmd_tx));

    let game_handle = tokio::spawn(dispatcher::run_game_loop(
        World::new(),
        Registry::new(),
        cmd_rx,
        analytics,
    ));

    // Handle shutdown gracefully
    tokio::select! {
        result = listener_handle => {
            if let Err(e) = result {
                eprintln!("Network task panicked: {}", e);
            }
        }
        result = game_handle => {
            if let Err(e) = result {
                eprintln!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
