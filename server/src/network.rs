//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::{self, ClientDatagram};
use shared::{
    bot, Field, BROADCAST_EVERY, CLIENT_TTL, DEFAULT_BOTS, MAX_PACKET_SIZE, MAX_PLAYERS, TICK_RATE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Startup parameters of the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, `host:port`
    pub addr: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// AI players occupying the lowest indices
    pub bots: usize,
    /// A snapshot goes out every this many ticks
    pub broadcast_every: u32,
    /// Ticks of silence before a client is dropped
    pub client_ttl: u32,
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            tick_rate: TICK_RATE,
            bots: DEFAULT_BOTS,
            broadcast_every: BROADCAST_EVERY,
            client_ttl: CLIENT_TTL,
            max_clients: MAX_PLAYERS,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    DatagramReceived { data: Vec<u8>, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendDatagram {
        data: Vec<u8>,
        addr: SocketAddr,
    },
    /// One snapshot body, completed per recipient with its player index
    BroadcastSnapshot {
        body: Vec<u8>,
        recipients: Vec<(u8, SocketAddr)>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: ClientManager,
    field: Field,
    config: ServerConfig,
    rng: StdRng,
    tick: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let bots = config.bots.min(MAX_PLAYERS);
        let mut field = Field::new();
        for _ in 0..bots {
            field.add_player();
        }
        field.take_status();

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: ClientManager::new(bots, config.max_clients, config.client_ttl),
            field,
            config: ServerConfig { bots, ..config },
            rng: StdRng::from_entropy(),
            tick: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// A handle that stops [`Server::run`] when sent [`ServerMessage::Shutdown`].
    pub fn sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let data = buffer[..len].to_vec();
                        if let Err(e) = server_tx.send(ServerMessage::DatagramReceived { data, addr })
                        {
                            error!("Failed to send datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        // ICMP port unreachable from a departed client surfaces here
                        debug!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing datagram queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendDatagram { data, addr } => {
                        if let Err(e) = socket.send_to(&data, addr).await {
                            error!("Failed to send datagram to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastSnapshot { body, recipients } => {
                        for (you, addr) in recipients {
                            let data = protocol::with_viewpoint(&body, you);
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send snapshot to player {}: {}", you, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn queue(&self, message: GameMessage) {
        if let Err(e) = self.game_tx.send(message) {
            error!("Failed to queue datagram for sending: {}", e);
        }
    }

    /// Processes one datagram from `addr`. Any datagram keeps its sender
    /// alive; an unknown sender is given a player.
    fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr) {
        let datagram = match protocol::decode_client_datagram(data) {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!("Rejected datagram from {}: {}", addr, e);
                return;
            }
        };

        let index = match self.clients.touch(addr) {
            Some(index) => index,
            None => match self.admit(addr) {
                Some(index) => index,
                None => return,
            },
        };

        match datagram {
            ClientDatagram::Probe => self.send_handshake(index, addr),
            ClientDatagram::Controls(controls) => self.field.steer(index, controls),
        }
    }

    fn admit(&mut self, addr: SocketAddr) -> Option<usize> {
        let index = self.clients.add_client(addr)?;
        let added = self.field.add_player();
        assert_eq!(
            index, added,
            "client table and field disagree on the new player's index"
        );
        Some(index)
    }

    fn send_handshake(&mut self, index: usize, addr: SocketAddr) {
        match self.field.to_bytes() {
            Ok(body) => {
                debug!("Handshake with {} as player {}", addr, index);
                let data = protocol::encode_handshake(&body, index as u8);
                self.queue(GameMessage::SendDatagram { data, addr });
            }
            Err(e) => warn!("Dropping handshake for {}: {}", addr, e),
        }
    }

    /// Advances the simulation by one tick: bots steer, the field ticks,
    /// silent clients are dropped and every few ticks a snapshot goes out.
    fn tick(&mut self) {
        for index in 0..self.config.bots {
            let controls = bot::autopilot(&self.field.players, index, &mut self.rng);
            self.field.steer(index, controls);
        }

        let events = self.field.tick();
        if !events.is_empty() {
            trace!("Tick {}: {:?}", self.tick, events);
        }

        for index in self.clients.check_timeouts() {
            self.field.remove_player(index);
        }

        self.tick += 1;
        if self.tick % u64::from(self.config.broadcast_every.max(1)) == 0 {
            self.broadcast_snapshot();
        }

        if self.tick % 1280 == 0 && !self.clients.is_empty() {
            debug!(
                "Tick {}: {} clients, {} projectiles, best score {}",
                self.tick,
                self.clients.len(),
                self.field.projectiles.len(),
                self.field.best_score()
            );
        }
    }

    fn broadcast_snapshot(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let body = match self.field.to_bytes() {
            Ok(body) => body,
            Err(e) => {
                warn!("Dropping snapshot at tick {}: {}", self.tick, e);
                return;
            }
        };

        let recipients = self
            .clients
            .client_addrs()
            .into_iter()
            .map(|(index, addr)| (index as u8, addr))
            .collect();

        self.queue(GameMessage::BroadcastSnapshot { body, recipients });
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started: {} Hz, {} bots, snapshot every {} ticks",
            self.config.tick_rate, self.config.bots, self.config.broadcast_every
        );

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::DatagramReceived { data, addr }) => {
                            self.handle_datagram(&data, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.tick();
                },
            }
        }

        Ok(())
    }
}
