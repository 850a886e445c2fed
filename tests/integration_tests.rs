//! Integration tests for the arena server, client and shared simulation
//!
//! These tests drive real loopback sockets and cross the wire between an
//! authoritative field and a client replica.

use assert_approx_eq::assert_approx_eq;
use client::game::{ClientGameState, ConnectionState};
use client::input::FixedInput;
use client::network::{Client, ClientConfig};
use server::network::{Server, ServerConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::{self, HANDSHAKE_PROBE};
use shared::{
    Controls, Field, Projectile, ServerDatagram, Snapshot, StatusEvent, Vector2, WeaponKind,
    MAX_PACKET_SIZE,
};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Instant};
use tokio_test::assert_ok;

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests the probe and handshake reply against a running server
    #[tokio::test]
    async fn handshake_over_loopback() {
        let mut server = start_server(2, 3000).await;
        let addr = server.local_addr().unwrap();

        let snapshot = serve_while(&mut server, async {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            socket.send_to(&[HANDSHAKE_PROBE], addr).await.unwrap();
            recv_handshake(&socket).await
        })
        .await;

        assert_eq!(snapshot.you, 2);
        assert_eq!(snapshot.players.len(), 3);
    }

    /// Tests that handshake replies and snapshots are told apart by length
    #[test]
    fn datagram_kinds_are_distinguishable() {
        let field = field_with_players(4, 3);
        let body = field.to_bytes().unwrap();

        let snapshot = protocol::with_viewpoint(&body, 1);
        let handshake = protocol::encode_handshake(&body, 1);
        assert_eq!(snapshot.len(), protocol::snapshot_len(4, 0));
        assert_eq!(handshake.len(), snapshot.len() + 1);

        assert!(matches!(
            protocol::decode_server_datagram(&snapshot),
            Ok(ServerDatagram::Snapshot(_))
        ));
        assert!(matches!(
            protocol::decode_server_datagram(&handshake),
            Ok(ServerDatagram::Handshake(_))
        ));
    }

    /// Tests that control bytes survive the wire in both directions
    #[test]
    fn control_bytes_cover_every_combination() {
        for turn in -1..=1 {
            for forward in -1..=1 {
                for switch in -1..=1 {
                    for fire in [false, true] {
                        let controls = Controls {
                            turn,
                            forward,
                            fire,
                            switch,
                        };
                        let byte = protocol::encode_controls(controls);
                        assert_eq!(byte & HANDSHAKE_PROBE, 0);
                        assert_eq!(protocol::decode_controls(byte), controls);
                    }
                }
            }
        }
    }
}

/// GAME LOGIC TESTS
mod game_logic_tests {
    use super::*;

    /// Tests a tag on the server arriving at a client replica with its cues
    #[test]
    fn tag_reaches_replica() {
        let mut server_field = field_with_players(3, 21);
        spread_out(&mut server_field);
        server_field.players[1].target = 2;
        let mut replica = ClientGameState::new();

        let body = server_field.to_bytes().unwrap();
        replica
            .apply_datagram(&protocol::encode_handshake(&body, 1))
            .unwrap();
        assert!(replica.is_synced());

        let at = server_field.players[2].position;
        server_field.projectiles.push(bullet(1, at));
        server_field.tick();
        assert_eq!(server_field.players[1].points, 1);

        let body = server_field.to_bytes().unwrap();
        let events = replica
            .apply_datagram(&protocol::with_viewpoint(&body, 1))
            .unwrap();

        let me = replica.field.me().unwrap();
        assert_eq!(me.points, 1);
        assert_eq!(replica.field.players[2].damage, 10);
        assert_eq!(me.target, server_field.players[1].target);
        if me.target == 2 {
            assert_eq!(events, vec![StatusEvent::TargetHit]);
        } else {
            assert!(events.is_empty());
        }
    }

    /// Tests that a replica extrapolates the server's motion between snapshots
    #[test]
    fn prediction_tracks_server_motion() {
        let mut server_field = field_with_players(3, 5);
        spread_out(&mut server_field);
        for player in &mut server_field.players {
            player.velocity = Vector2::new(1.5, -0.5);
        }
        let mut replica = ClientGameState::new();
        let body = server_field.to_bytes().unwrap();
        replica
            .apply_datagram(&protocol::with_viewpoint(&body, 0))
            .unwrap();

        for _ in 0..4 {
            server_field.tick();
            replica.update_physics();
        }

        for (server, local) in server_field.players.iter().zip(&replica.field.players) {
            assert_approx_eq!(server.position.x, local.position.x, 0.01);
            assert_approx_eq!(server.position.y, local.position.y, 0.01);
        }
    }

    /// Tests that fire and weapon switches applied through control bytes
    /// produce the expected projectiles
    #[test]
    fn control_bytes_drive_weapons() {
        let mut field = field_with_players(3, 8);
        let switch = protocol::decode_controls(protocol::encode_controls(Controls {
            switch: 1,
            ..Controls::IDLE
        }));
        field.steer(0, switch);
        assert_eq!(field.players[0].weapon(), WeaponKind::CATALOG[1]);

        let fire = protocol::decode_controls(protocol::encode_controls(Controls {
            fire: true,
            ..Controls::IDLE
        }));
        field.players[0].cool_down = 0;
        field.steer(0, fire);
        assert_eq!(field.projectiles.len(), 1);
        assert_eq!(field.projectiles[0].kind, WeaponKind::CATALOG[1]);
        assert_eq!(field.projectiles[0].owner, 0);
    }
}

/// CLIENT-SERVER TESTS
mod client_server_tests {
    use super::*;

    /// Tests a full client session against a running server
    #[tokio::test]
    async fn client_synchronises_with_server() {
        let mut server = start_server(3, 3000).await;
        let addr = server.local_addr().unwrap();
        let mut client = Client::new(ClientConfig::new(addr), FixedInput::default())
            .await
            .unwrap();

        assert_ok!(
            serve_while(
                &mut server,
                client.run_until(sleep(Duration::from_millis(300))),
            )
            .await
        );

        let state = client.game_state();
        assert_eq!(state.state, ConnectionState::Synced);
        assert_eq!(state.field.self_index, Some(3));
        assert_eq!(state.field.players.len(), 4);
    }

    /// Tests that a silent client is dropped and later indices shift down
    #[tokio::test]
    async fn timed_out_client_compacts_indices() {
        let mut server = start_server(1, 20).await;
        let addr = server.local_addr().unwrap();

        let last = serve_while(&mut server, async {
            let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            silent.send_to(&[HANDSHAKE_PROBE], addr).await.unwrap();
            assert_eq!(recv_handshake(&silent).await.you, 1);

            let active = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            active.send_to(&[HANDSHAKE_PROBE], addr).await.unwrap();
            assert_eq!(recv_handshake(&active).await.you, 2);

            keep_alive_and_listen(&active, addr, Duration::from_millis(500)).await
        })
        .await;

        let last = last.expect("no snapshot after the timeout");
        assert_eq!(last.you, 1);
        assert_eq!(last.players.len(), 2);
    }

    /// Tests that a client falls back to reconnecting once the server is gone
    #[tokio::test]
    async fn client_reconnects_after_server_silence() {
        let mut server = start_server(3, 3000).await;
        let addr = server.local_addr().unwrap();
        let mut config = ClientConfig::new(addr);
        config.timeout = Duration::from_millis(100);
        let mut client = Client::new(config, FixedInput::default()).await.unwrap();

        assert_ok!(
            serve_while(
                &mut server,
                client.run_until(sleep(Duration::from_millis(200))),
            )
            .await
        );
        assert!(client.game_state().is_synced());

        drop(server);
        assert_ok!(client.run_until(sleep(Duration::from_millis(300))).await);
        assert_eq!(client.game_state().state, ConnectionState::Reconnecting);
    }
}

/// STRESS TESTS
mod stress_tests {
    use super::*;

    /// Tests a crowded field over many ticks
    #[test]
    fn crowded_field_keeps_invariants() {
        let mut field = field_with_players(40, 13);
        let mut rng = StdRng::seed_from_u64(13);

        for tick in 0..2000 {
            for index in 0..field.players.len() {
                let controls = shared::bot::autopilot(&field.players, index, &mut rng);
                field.steer(index, controls);
            }
            field.tick();

            if tick % 500 == 0 {
                field.remove_player(tick % field.players.len());
                field.add_player();
            }
        }

        for (index, player) in field.players.iter().enumerate() {
            assert_eq!(player.id, index);
            assert_ne!(player.target, index);
            assert!(player.target < field.players.len());
            assert!(!player.is_dead());
        }
        for projectile in &field.projectiles {
            assert!(projectile.owner < field.players.len());
        }
    }

    /// Tests that a server survives junk datagrams
    #[tokio::test]
    async fn malformed_datagrams_are_ignored() {
        let mut server = start_server(3, 3000).await;
        let addr = server.local_addr().unwrap();

        let snapshot = serve_while(&mut server, async {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            for junk in [&[][..], &[1, 2, 3][..], &[0xff; 64][..]] {
                socket.send_to(junk, addr).await.unwrap();
            }
            socket.send_to(&[HANDSHAKE_PROBE], addr).await.unwrap();
            recv_handshake(&socket).await
        })
        .await;

        assert_eq!(snapshot.you, 3);
        assert_eq!(snapshot.players.len(), 4);
    }

    /// Tests that a corrupted snapshot never touches the replica
    #[test]
    fn corrupted_snapshots_are_rejected() {
        let field = field_with_players(5, 17);
        let good = protocol::with_viewpoint(&field.to_bytes().unwrap(), 2);
        let mut replica = ClientGameState::new();
        replica.apply_datagram(&good).unwrap();
        let before: Vec<Vector2> = replica.field.players.iter().map(|p| p.position).collect();

        let mut truncated = good.clone();
        truncated.pop();
        let mut wrong_viewpoint = good.clone();
        if let Some(last) = wrong_viewpoint.last_mut() {
            *last = 5;
        }

        for bad in [truncated, wrong_viewpoint, vec![0xff; 7]] {
            assert!(replica.apply_datagram(&bad).is_err());
        }

        let after: Vec<Vector2> = replica.field.players.iter().map(|p| p.position).collect();
        assert_eq!(before, after);
        assert_eq!(replica.field.self_index, Some(2));
    }
}

// HELPER FUNCTIONS

async fn start_server(bots: usize, client_ttl: u32) -> Server {
    let config = ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        bots,
        client_ttl,
        ..ServerConfig::default()
    };
    Server::new(config).await.unwrap()
}

/// Runs the server until `body` completes and returns the body's output.
async fn serve_while<F: Future>(server: &mut Server, body: F) -> F::Output {
    tokio::select! {
        result = server.run() => panic!("server stopped early: {:?}", result.err().map(|e| e.to_string())),
        output = body => output,
    }
}

async fn recv_handshake(socket: &UdpSocket) -> Snapshot {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    loop {
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("no handshake reply")
            .unwrap();
        if let Ok(ServerDatagram::Handshake(snapshot)) = protocol::decode_server_datagram(&buf[..len]) {
            return snapshot;
        }
    }
}

/// Sends idle control bytes for `period` and returns the last snapshot seen.
async fn keep_alive_and_listen(socket: &UdpSocket, addr: SocketAddr, period: Duration) -> Option<Snapshot> {
    let deadline = Instant::now() + period;
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let mut last = None;

    while Instant::now() < deadline {
        socket.send_to(&[0], addr).await.unwrap();
        if let Ok(Ok((len, _))) = timeout(Duration::from_millis(20), socket.recv_from(&mut buf)).await {
            if let Ok(ServerDatagram::Snapshot(snapshot)) = protocol::decode_server_datagram(&buf[..len]) {
                last = Some(snapshot);
            }
        }
    }
    last
}

fn field_with_players(count: usize, seed: u64) -> Field {
    let mut field = Field::with_seed(seed);
    for _ in 0..count {
        field.add_player();
    }
    field.take_status();
    field
}

/// Moves the first three players far apart and clear of the walls.
fn spread_out(field: &mut Field) {
    let spots = [(300.0, 300.0), (1000.0, 1000.0), (1700.0, 300.0)];
    for (player, (x, y)) in field.players.iter_mut().zip(spots) {
        player.position = Vector2::new(x, y);
        player.velocity = Vector2::ZERO;
    }
}

fn bullet(owner: usize, at: Vector2) -> Projectile {
    let stats = WeaponKind::Bullet.stats();
    Projectile {
        owner,
        kind: WeaponKind::Bullet,
        position: at,
        velocity: Vector2::ZERO,
        damage: stats.damage,
        time_to_live: stats.time_to_live,
        size: stats.size,
        colour: stats.colour,
        impact: stats.impact,
    }
}
