use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig, ServerMessage};
use shared::{BROADCAST_EVERY, CLIENT_TTL, DEFAULT_BOTS, MAX_PLAYERS, TICK_RATE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Number of AI players
    #[arg(short, long, default_value_t = DEFAULT_BOTS)]
    bots: usize,

    /// Send a snapshot every this many ticks
    #[arg(long, default_value_t = BROADCAST_EVERY)]
    broadcast_every: u32,

    /// Ticks of silence before a client is dropped
    #[arg(long, default_value_t = CLIENT_TTL)]
    client_ttl: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value_t = MAX_PLAYERS)]
    max_clients: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            addr: format!("{}:{}", args.host, args.port),
            tick_rate: args.tick_rate,
            bots: args.bots,
            broadcast_every: args.broadcast_every,
            client_ttl: args.client_ttl,
            max_clients: args.max_clients,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!("Starting server on {}", config.addr);

    let mut server = Server::new(config).await?;

    let shutdown = server.sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = shutdown.send(ServerMessage::Shutdown);
        }
    });

    server.run().await?;

    Ok(())
}
