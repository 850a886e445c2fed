use log::{debug, info, warn};
use shared::protocol::{self, DecodeError, ServerDatagram};
use shared::{Controls, Field, StatusEvent};

/// Where the client stands with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Probing, no snapshot yet
    Handshaking,
    /// Snapshots are arriving
    Synced,
    /// The server went quiet; prediction is stalled until it answers
    Reconnecting,
}

/// The client's replica of the field and its connection state
pub struct ClientGameState {
    pub field: Field,
    pub state: ConnectionState,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            field: Field::new(),
            state: ConnectionState::Handshaking,
        }
    }

    /// Applies a datagram from the server and returns the cues it raised.
    /// A datagram that fails to decode leaves the replica untouched.
    pub fn apply_datagram(&mut self, bytes: &[u8]) -> Result<Vec<StatusEvent>, DecodeError> {
        let snapshot = match protocol::decode_server_datagram(bytes)? {
            ServerDatagram::Handshake(snapshot) => {
                info!("Handshake complete, playing as {}", snapshot.you);
                snapshot
            }
            ServerDatagram::Snapshot(snapshot) => snapshot,
        };

        if self.state != ConnectionState::Synced {
            info!("Synchronised with server");
        }
        if self.field.self_index.is_some_and(|index| index != usize::from(snapshot.you)) {
            debug!("Player index moved to {}", snapshot.you);
        }

        self.field.apply_snapshot(snapshot);
        self.state = ConnectionState::Synced;
        Ok(self.field.take_status())
    }

    /// Steers the local player ahead of the server's confirmation.
    pub fn apply_prediction(&mut self, controls: Controls) {
        if !self.is_synced() {
            return;
        }
        if let Some(index) = self.field.self_index {
            if index < self.field.players.len() {
                self.field.steer(index, controls);
            }
        }
    }

    /// Extrapolates the replica by one tick while synchronised.
    pub fn update_physics(&mut self) {
        if self.is_synced() {
            self.field.predict();
        }
    }

    pub fn mark_timed_out(&mut self) {
        if self.state == ConnectionState::Synced {
            warn!("Lost contact with server, reconnecting");
            self.state = ConnectionState::Reconnecting;
        }
    }

    pub fn is_synced(&self) -> bool {
        self.state == ConnectionState::Synced
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
