use clap::Parser;
use client::input::Autopilot;
use client::network::{Client, ClientConfig};
use log::info;
use shared::CLIENT_TIMEOUT_MS;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Milliseconds of silence before reconnecting
    #[arg(short = 't', long, default_value_t = CLIENT_TIMEOUT_MS)]
    timeout_ms: u64,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            timeout: Duration::from_millis(args.timeout_ms),
            fake_ping_ms: args.fake_ping,
            ..ClientConfig::new(args.server)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());

    info!("Starting client...");
    if config.fake_ping_ms > 0 {
        info!("Simulating {}ms latency", config.fake_ping_ms);
    }
    info!("Steering with the autopilot");

    let mut client = Client::new(config, Autopilot::new()).await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
