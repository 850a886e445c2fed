//! Probe tool: performs a handshake with a running server, prints what it
//! learns and then listens to a few snapshots.

use clap::Parser;
use shared::protocol::{self, ServerDatagram, HANDSHAKE_PROBE};
use shared::{Field, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to probe
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Snapshots to print after the handshake
    #[arg(short, long, default_value = "5")]
    count: usize,

    /// Milliseconds to wait for each datagram
    #[arg(short, long, default_value = "1000")]
    wait: u64,
}

fn print_field(field: &Field) {
    println!(
        "  {} players, {} projectiles, you are {:?}, best score {}",
        field.players.len(),
        field.projectiles.len(),
        field.self_index,
        field.best_score()
    );
    for player in &field.players {
        println!(
            "  #{:<3} pos ({:7.1}, {:7.1}) score {:4} target {:<3} weapon {:?}",
            player.id,
            player.position.x,
            player.position.y,
            player.score(),
            player.target,
            player.weapon()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let wait = Duration::from_millis(args.wait);

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Probe socket bound to {}", socket.local_addr()?);

    println!("Sending handshake probe to {}", args.server);
    socket.send_to(&[HANDSHAKE_PROBE], args.server).await?;

    let mut field = Field::new();
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let mut handshaken = false;
    let mut snapshots = 0;

    while snapshots < args.count {
        let (len, from) = match timeout(wait, socket.recv_from(&mut buf)).await {
            Ok(result) => result?,
            Err(_) => {
                println!("No answer within {:?}", wait);
                break;
            }
        };

        match protocol::decode_server_datagram(&buf[..len]) {
            Ok(ServerDatagram::Handshake(snapshot)) => {
                println!("Handshake from {}: player index {}", from, snapshot.you);
                field.apply_snapshot(snapshot);
                handshaken = true;
            }
            Ok(ServerDatagram::Snapshot(snapshot)) => {
                println!("Snapshot of {} bytes", len);
                field.apply_snapshot(snapshot);
                snapshots += 1;
            }
            Err(e) => {
                println!("Undecodable datagram of {} bytes: {}", len, e);
                continue;
            }
        }

        print_field(&field);
        for event in field.take_status() {
            println!("  event: {:?}", event);
        }
    }

    if !handshaken {
        println!("Server never answered the handshake");
    }

    Ok(())
}
