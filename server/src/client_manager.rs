//! Connected client bookkeeping for the arena server
//!
//! Clients are kept in connection order. Client `k` in that order drives
//! player `index_offset + k` on the field, the first `index_offset` players
//! being bots. Removing a client shifts every later client down by one, the
//! same way the field compacts its player table, so the two stay aligned.
//!
//! Liveness is counted in server ticks: each client carries a countdown
//! that any datagram from its address refills.

use log::{info, warn};
use shared::MAX_PLAYERS;
use std::net::SocketAddr;

/// A connected client and its remaining time to live
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// Address snapshots are sent to
    pub addr: SocketAddr,
    /// Ticks left before the client is considered gone
    pub ttl: u32,
}

impl Client {
    pub fn new(addr: SocketAddr, ttl: u32) -> Self {
        Self { addr, ttl }
    }

    pub fn is_timed_out(&self) -> bool {
        self.ttl == 0
    }
}

/// Manages all connected clients and their player indices
pub struct ClientManager {
    /// Connected clients in connection order
    clients: Vec<Client>,
    /// Player index of the first client; bots sit below it
    index_offset: usize,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// Countdown a client is reset to whenever it is heard from
    ttl: u32,
}

impl ClientManager {
    /// Creates a manager for a field whose first `index_offset` players
    /// are not clients.
    ///
    /// Capacity is further limited so that every player index fits the
    /// one-byte wire format.
    pub fn new(index_offset: usize, max_clients: usize, ttl: u32) -> Self {
        let max_clients = max_clients.min(MAX_PLAYERS.saturating_sub(index_offset));
        Self {
            clients: Vec::new(),
            index_offset,
            max_clients,
            ttl,
        }
    }

    /// Registers a new client address.
    ///
    /// Returns the player index the client will drive, or `None` when the
    /// server is full.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<usize> {
        if self.clients.len() >= self.max_clients {
            warn!("Rejecting {}: server full", addr);
            return None;
        }

        self.clients.push(Client::new(addr, self.ttl));
        let index = self.index_offset + self.clients.len() - 1;
        info!("Client {} connected as player {}", addr, index);
        Some(index)
    }

    /// Removes the client driving player `index`. Returns whether there
    /// was one.
    pub fn remove_client(&mut self, index: usize) -> bool {
        match index.checked_sub(self.index_offset) {
            Some(position) if position < self.clients.len() => {
                let client = self.clients.remove(position);
                info!("Client {} (player {}) disconnected", client.addr, index);
                true
            }
            _ => false,
        }
    }

    /// Finds the player index driven from `addr`.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<usize> {
        self.clients
            .iter()
            .position(|client| client.addr == addr)
            .map(|position| self.index_offset + position)
    }

    /// Refills the countdown of the client at `addr` and returns its
    /// player index.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<usize> {
        let position = self.clients.iter().position(|client| client.addr == addr)?;
        self.clients[position].ttl = self.ttl;
        Some(self.index_offset + position)
    }

    /// Counts every client down by one tick and removes the ones that ran
    /// out.
    ///
    /// Returns the player indices that were freed, highest first, so they
    /// can be removed from the field one after another without shifting
    /// the ones still pending.
    pub fn check_timeouts(&mut self) -> Vec<usize> {
        for client in &mut self.clients {
            client.ttl = client.ttl.saturating_sub(1);
        }

        let mut timed_out: Vec<usize> = self
            .clients
            .iter()
            .enumerate()
            .filter(|(_, client)| client.is_timed_out())
            .map(|(position, _)| self.index_offset + position)
            .collect();
        timed_out.reverse();

        for index in &timed_out {
            info!("Player {} timed out", index);
            self.remove_client(*index);
        }

        timed_out
    }

    /// Player index and address of every client, for broadcasting.
    pub fn client_addrs(&self) -> Vec<(usize, SocketAddr)> {
        self.clients
            .iter()
            .enumerate()
            .map(|(position, client)| (self.index_offset + position, client.addr))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_clients
    }
}
