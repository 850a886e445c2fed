use crate::game::{ClientGameState, ConnectionState};
use crate::input::{InputManager, InputSource};
use log::{debug, error, info, warn};
use shared::protocol::HANDSHAKE_PROBE;
use shared::{CLIENT_TIMEOUT_MS, MAX_PACKET_SIZE, TICK_RATE};
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Startup parameters of the client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    /// Silence after which the client starts reconnecting
    pub timeout: Duration,
    /// Simulated round trip, split evenly between sending and receiving
    pub fake_ping_ms: u64,
    pub tick_rate: u32,
}

/// Floor for the timeout check period; tokio intervals reject zero.
const MIN_CHECK_PERIOD: Duration = Duration::from_millis(1);

impl ClientConfig {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            timeout: Duration::from_millis(CLIENT_TIMEOUT_MS),
            fake_ping_ms: 0,
            tick_rate: TICK_RATE,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    /// How often silence is checked for: four times per timeout.
    pub fn check_period(&self) -> Duration {
        (self.timeout / 4).max(MIN_CHECK_PERIOD)
    }
}

pub struct Client<S: InputSource> {
    socket: UdpSocket,
    config: ClientConfig,

    game_state: ClientGameState,
    input_manager: InputManager<S>,

    last_heard: Instant,
    last_probe: Instant,
}

impl<S: InputSource> Client<S> {
    pub async fn new(config: ClientConfig, source: S) -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr = if config.server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        Ok(Client {
            socket,
            config,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(source),
            last_heard: Instant::now(),
            last_probe: Instant::now(),
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_datagram(&self, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        if self.config.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.config.fake_ping_ms / 2)).await;
        }

        self.socket.send_to(data, self.config.server_addr).await?;
        Ok(())
    }

    async fn send_probe(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        debug!("Probing {}", self.config.server_addr);
        self.last_probe = Instant::now();
        self.send_datagram(&[HANDSHAKE_PROBE]).await
    }

    fn handle_datagram(&mut self, data: &[u8]) {
        match self.game_state.apply_datagram(data) {
            Ok(events) => {
                self.last_heard = Instant::now();
                for event in events {
                    debug!("Event: {:?}", event);
                }
            }
            Err(e) => warn!("Discarding datagram: {}", e),
        }
    }

    async fn handle_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.game_state.is_synced() {
            return Ok(());
        }

        let (controls, byte) = self.input_manager.update(&self.game_state.field);
        self.game_state.apply_prediction(controls);
        if let Some(byte) = byte {
            self.send_datagram(&[byte]).await?;
        }
        Ok(())
    }

    /// Enters the reconnect state after a silent period and keeps probing
    /// once per timeout until the server answers.
    async fn check_timeout(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.last_heard.elapsed() < self.config.timeout {
            return Ok(());
        }
        self.game_state.mark_timed_out();
        if self.last_probe.elapsed() >= self.config.timeout {
            if self.game_state.state == ConnectionState::Reconnecting {
                info!("Reconnecting to {}", self.config.server_addr);
            }
            self.send_probe().await?;
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the session until `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        info!("Connecting to {}...", self.config.server_addr);
        self.send_probe().await?;
        self.last_heard = Instant::now();

        let tick = self.config.tick_duration();
        let mut input_interval = interval(tick);
        let mut physics_interval = interval(tick);
        let mut timeout_interval = interval(self.config.check_period());
        for timer in [&mut input_interval, &mut physics_interval, &mut timeout_interval] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        let mut buffer = [0u8; MAX_PACKET_SIZE];
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => {
                            if from != self.config.server_addr {
                                debug!("Ignoring datagram from {}", from);
                                continue;
                            }
                            if self.config.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.config.fake_ping_ms / 2)).await;
                            }
                            self.handle_datagram(&buffer[..len]);
                        },
                        // Unreachable server; the timeout arm takes over
                        Err(e) => debug!("Error receiving datagram: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    if let Err(e) = self.handle_input().await {
                        error!("Error sending input: {}", e);
                    }
                },

                _ = physics_interval.tick() => {
                    self.game_state.update_physics();
                },

                _ = timeout_interval.tick() => {
                    if let Err(e) = self.check_timeout().await {
                        error!("Error probing server: {}", e);
                    }
                },
            }
        }

        Ok(())
    }
}
