//! Simulation and wire protocol shared by the arena server and its clients

pub mod bot;
pub mod field;
pub mod player;
pub mod protocol;
pub mod vector;
pub mod weapon;

pub use field::{Field, StatusEvent};
pub use player::{Controls, Player};
pub use protocol::{ClientDatagram, DecodeError, EncodeError, ServerDatagram, Snapshot};
pub use vector::{GeometryError, Matrix2, Vector2};
pub use weapon::{Projectile, WeaponKind};

pub const FIELD_SIZE: f32 = 2000.0;
pub const BASE_RADIUS: i32 = 30;
/// Degrees turned per tick of steering.
pub const TURN_ANGLE: f32 = 3.0;
/// sin and cos of `TURN_ANGLE`.
pub const TURN_SIN: f32 = 0.052_335_956;
pub const TURN_COS: f32 = 0.998_629_5;
pub const MAX_ACCELERATION: f32 = 1.0;
pub const ACCELERATION_FACTOR: f32 = 30.0;
pub const FRICTION: f32 = 0.99;
pub const MAX_VELOCITY: f32 = 4.0;
pub const BRAKE_FACTOR: f32 = 0.9;
pub const RECOIL_FACTOR: f32 = 0.1;
pub const WALL_SPRING: f32 = 1.0;
pub const SWITCH_COOL_DOWN: u16 = 60;
/// Fewer players than this and nobody gets a target.
pub const MIN_PLAYERS: usize = 3;
pub const TARGET_RETRIES: usize = 8;

pub const TICK_RATE: u32 = 128;
pub const BROADCAST_EVERY: u32 = 4;
/// Ticks a client may stay silent before it is dropped.
pub const CLIENT_TTL: u32 = 3000;
pub const DEFAULT_BOTS: usize = 3;
pub const MAX_PACKET_SIZE: usize = 4096;
/// Wire indices are a single byte.
pub const MAX_PLAYERS: usize = 255;
pub const CLIENT_TIMEOUT_MS: u64 = 1000;
