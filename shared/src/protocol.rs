//! Binary wire protocol between the server and its clients
//!
//! Every message is a single UDP datagram.
//!
//! - Client to server: one byte, either a control byte (see the `CONTROL_*`
//!   bits) or [`HANDSHAKE_PROBE`].
//! - Server to client snapshot:
//!   `[player_count][projectile_count][player records][projectile records][you]`
//! - Handshake reply: `[you][snapshot]`, where the snapshot's trailing byte
//!   repeats the leading one.
//!
//! Records are fixed-size and encoded with bincode's fixed-int little-endian
//! layout, 32 bytes per player and 24 per projectile. A snapshot is length
//! `3 + 32p + 24q` and a handshake reply one byte longer; the two can never
//! have the same length for the same header, since the difference is always
//! odd. The receiver relies on that to tell them apart.

use crate::player::{Controls, Player};
use crate::vector::Vector2;
use crate::weapon::{Projectile, WeaponKind, WEAPON_COUNT};
use crate::MAX_PACKET_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONTROL_LEFT: u8 = 1 << 0;
pub const CONTROL_RIGHT: u8 = 1 << 1;
pub const CONTROL_FORWARD: u8 = 1 << 2;
pub const CONTROL_BRAKE: u8 = 1 << 3;
pub const CONTROL_FIRE: u8 = 1 << 4;
pub const CONTROL_NEXT: u8 = 1 << 5;
pub const CONTROL_PREVIOUS: u8 = 1 << 6;
/// Asks the server for a handshake reply. Never valid as a control byte.
pub const HANDSHAKE_PROBE: u8 = 1 << 7;

pub const PLAYER_RECORD_SIZE: usize = 32;
pub const PROJECTILE_RECORD_SIZE: usize = 24;
const HEADER_SIZE: usize = 2;
/// Most entries either table can hold on the wire.
pub const MAX_WIRE_ENTRIES: usize = u8::MAX as usize;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{0} players do not fit in a snapshot")]
    TooManyPlayers(usize),
    #[error("{0} projectiles do not fit in a snapshot")]
    TooManyProjectiles(usize),
    #[error("snapshot of {size} bytes exceeds the {max} byte limit")]
    Oversize { size: usize, max: usize },
    #[error("record encoding failed: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("datagram of {actual} bytes, header announces {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("control datagram must be one byte, got {0}")]
    ControlLength(usize),
    #[error("player {player} targets missing player {target}")]
    TargetOutOfRange { player: usize, target: u8 },
    #[error("player {player} holds unknown weapon index {weapon}")]
    WeaponOutOfRange { player: usize, weapon: u8 },
    #[error("projectile {projectile} owned by missing player {owner}")]
    OwnerOutOfRange { projectile: usize, owner: u8 },
    #[error("projectile {projectile} has unknown weapon kind {kind}")]
    UnknownWeaponKind { projectile: usize, kind: u8 },
    #[error("viewpoint {you} outside a field of {players}")]
    ViewpointOutOfRange { you: u8, players: usize },
    #[error("handshake index {leading} disagrees with snapshot index {trailing}")]
    HandshakeMismatch { leading: u8, trailing: u8 },
    #[error("record decoding failed: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub position: Vector2,
    pub direction: Vector2,
    pub velocity: Vector2,
    pub damage: u16,
    pub points: u16,
    pub cool_down: u16,
    pub target: u8,
    pub weapon: u8,
}

impl PlayerRecord {
    /// Callers guarantee the table holds at most [`MAX_WIRE_ENTRIES`]
    /// players, so indices fit a byte.
    fn from_player(player: &Player) -> Self {
        Self {
            position: player.position,
            direction: player.direction,
            velocity: player.velocity,
            damage: player.damage,
            points: player.points,
            cool_down: player.cool_down,
            target: player.target as u8,
            weapon: player.weapon_index as u8,
        }
    }

    /// Copies the record into `player`. Local-only state such as the
    /// acceleration is kept.
    pub fn apply(&self, player: &mut Player) {
        player.position = self.position;
        player.direction = self.direction;
        player.velocity = self.velocity;
        player.damage = self.damage;
        player.points = self.points;
        player.cool_down = self.cool_down;
        player.target = usize::from(self.target);
        player.weapon_index = usize::from(self.weapon);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub owner: u8,
    pub kind: u8,
    pub position: Vector2,
    pub velocity: Vector2,
    /// Red, green, blue.
    pub colour: [u8; 3],
    pub time_to_live: u16,
    pub size: u8,
}

impl ProjectileRecord {
    fn from_projectile(projectile: &Projectile) -> Self {
        let [_, r, g, b] = projectile.colour.to_be_bytes();
        Self {
            owner: projectile.owner as u8,
            kind: projectile.kind.id(),
            position: projectile.position,
            velocity: projectile.velocity,
            colour: [r, g, b],
            time_to_live: projectile.time_to_live,
            size: projectile.size.clamp(0.0, f32::from(u8::MAX)) as u8,
        }
    }

    fn into_projectile(self, kind: WeaponKind) -> Projectile {
        let stats = kind.stats();
        let [r, g, b] = self.colour;
        Projectile {
            owner: usize::from(self.owner),
            kind,
            position: self.position,
            velocity: self.velocity,
            damage: stats.damage,
            time_to_live: self.time_to_live,
            size: f32::from(self.size),
            colour: u32::from_be_bytes([0, r, g, b]),
            impact: stats.impact,
        }
    }
}

/// A fully validated server snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub players: Vec<PlayerRecord>,
    pub projectiles: Vec<Projectile>,
    /// The recipient's own player index.
    pub you: u8,
}

#[derive(Debug, Clone)]
pub enum ServerDatagram {
    Handshake(Snapshot),
    Snapshot(Snapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDatagram {
    Probe,
    Controls(Controls),
}

/// Length of a snapshot with the given table sizes, trailing byte included.
pub fn snapshot_len(players: usize, projectiles: usize) -> usize {
    HEADER_SIZE + players * PLAYER_RECORD_SIZE + projectiles * PROJECTILE_RECORD_SIZE + 1
}

/// Encodes everything but the recipient byte. The size check leaves room
/// for the handshake prefix as well.
pub fn encode_body(players: &[Player], projectiles: &[Projectile]) -> Result<Vec<u8>, EncodeError> {
    if players.len() > MAX_WIRE_ENTRIES {
        return Err(EncodeError::TooManyPlayers(players.len()));
    }
    if projectiles.len() > MAX_WIRE_ENTRIES {
        return Err(EncodeError::TooManyProjectiles(projectiles.len()));
    }
    let size = snapshot_len(players.len(), projectiles.len()) + 1;
    if size > MAX_PACKET_SIZE {
        return Err(EncodeError::Oversize {
            size,
            max: MAX_PACKET_SIZE,
        });
    }

    let mut bytes = Vec::with_capacity(size);
    bytes.push(players.len() as u8);
    bytes.push(projectiles.len() as u8);
    for player in players {
        bincode::serialize_into(&mut bytes, &PlayerRecord::from_player(player))?;
    }
    for projectile in projectiles {
        bincode::serialize_into(&mut bytes, &ProjectileRecord::from_projectile(projectile))?;
    }
    Ok(bytes)
}

/// Completes a body for one recipient.
pub fn with_viewpoint(body: &[u8], you: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 1);
    bytes.extend_from_slice(body);
    bytes.push(you);
    bytes
}

pub fn encode_handshake(body: &[u8], you: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 2);
    bytes.push(you);
    bytes.extend_from_slice(body);
    bytes.push(you);
    bytes
}

/// Validates and parses a snapshot. Every record is checked before the
/// result is handed out, so a caller never sees half of a bad datagram.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::LengthMismatch {
            expected: snapshot_len(0, 0),
            actual: bytes.len(),
        });
    }
    let player_count = usize::from(bytes[0]);
    let projectile_count = usize::from(bytes[1]);
    let expected = snapshot_len(player_count, projectile_count);
    if bytes.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    let mut offset = HEADER_SIZE;
    let mut players = Vec::with_capacity(player_count);
    for index in 0..player_count {
        let record: PlayerRecord =
            bincode::deserialize(&bytes[offset..offset + PLAYER_RECORD_SIZE])?;
        if usize::from(record.target) >= player_count {
            return Err(DecodeError::TargetOutOfRange {
                player: index,
                target: record.target,
            });
        }
        if usize::from(record.weapon) >= WEAPON_COUNT {
            return Err(DecodeError::WeaponOutOfRange {
                player: index,
                weapon: record.weapon,
            });
        }
        players.push(record);
        offset += PLAYER_RECORD_SIZE;
    }

    let mut projectiles = Vec::with_capacity(projectile_count);
    for index in 0..projectile_count {
        let record: ProjectileRecord =
            bincode::deserialize(&bytes[offset..offset + PROJECTILE_RECORD_SIZE])?;
        if usize::from(record.owner) >= player_count {
            return Err(DecodeError::OwnerOutOfRange {
                projectile: index,
                owner: record.owner,
            });
        }
        let kind = WeaponKind::from_id(record.kind).ok_or(DecodeError::UnknownWeaponKind {
            projectile: index,
            kind: record.kind,
        })?;
        projectiles.push(record.into_projectile(kind));
        offset += PROJECTILE_RECORD_SIZE;
    }

    let you = bytes[offset];
    if usize::from(you) >= player_count {
        return Err(DecodeError::ViewpointOutOfRange {
            you,
            players: player_count,
        });
    }

    Ok(Snapshot {
        players,
        projectiles,
        you,
    })
}

pub fn decode_handshake(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let (&leading, rest) = bytes.split_first().ok_or(DecodeError::Empty)?;
    let snapshot = decode_snapshot(rest)?;
    if snapshot.you != leading {
        return Err(DecodeError::HandshakeMismatch {
            leading,
            trailing: snapshot.you,
        });
    }
    Ok(snapshot)
}

/// Classifies a datagram from the server by its length.
pub fn decode_server_datagram(bytes: &[u8]) -> Result<ServerDatagram, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let is_handshake = bytes.len() > HEADER_SIZE + 1
        && bytes.len() == snapshot_len(usize::from(bytes[1]), usize::from(bytes[2])) + 1;

    if is_handshake {
        decode_handshake(bytes).map(ServerDatagram::Handshake)
    } else {
        decode_snapshot(bytes).map(ServerDatagram::Snapshot)
    }
}

/// Packs controls into a control byte. Opposing directions are never both
/// set.
pub fn encode_controls(controls: Controls) -> u8 {
    let mut byte = 0;
    match controls.turn.signum() {
        1 => byte |= CONTROL_LEFT,
        -1 => byte |= CONTROL_RIGHT,
        _ => {}
    }
    match controls.forward.signum() {
        1 => byte |= CONTROL_FORWARD,
        -1 => byte |= CONTROL_BRAKE,
        _ => {}
    }
    if controls.fire {
        byte |= CONTROL_FIRE;
    }
    match controls.switch.signum() {
        1 => byte |= CONTROL_NEXT,
        -1 => byte |= CONTROL_PREVIOUS,
        _ => {}
    }
    byte
}

/// Unpacks a control byte; opposing bits cancel out.
pub fn decode_controls(byte: u8) -> Controls {
    let bit = |mask: u8| i8::from(byte & mask != 0);
    Controls {
        turn: bit(CONTROL_LEFT) - bit(CONTROL_RIGHT),
        forward: bit(CONTROL_FORWARD) - bit(CONTROL_BRAKE),
        fire: byte & CONTROL_FIRE != 0,
        switch: bit(CONTROL_NEXT) - bit(CONTROL_PREVIOUS),
    }
}

pub fn decode_client_datagram(bytes: &[u8]) -> Result<ClientDatagram, DecodeError> {
    match bytes {
        [] => Err(DecodeError::Empty),
        [byte] if byte & HANDSHAKE_PROBE != 0 => Ok(ClientDatagram::Probe),
        [byte] => Ok(ClientDatagram::Controls(decode_controls(*byte))),
        _ => Err(DecodeError::ControlLength(bytes.len())),
    }
}
