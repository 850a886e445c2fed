//! Weapon catalog and projectile behaviour
//!
//! Every weapon is a variant of the closed [`WeaponKind`] enum. A kind knows
//! how to spawn its projectile from a firing player, and the resulting
//! [`Projectile`] carries the kind along so that its per-tick update and hit
//! test can dispatch on it.

use crate::player::Player;
use crate::vector::Vector2;
use log::warn;
use rand::Rng;

/// Number of entries in the weapon catalog.
pub const WEAPON_COUNT: usize = 7;

/// Lifetime of a freshly laid mine, in ticks.
pub const MINE_DURATION: u16 = 1200;
/// A mine ignores everyone while its lifetime is above this.
pub const MINE_SAFE_DURATION: u16 = MINE_DURATION / 5 * 4;
pub const MINE_DETECTION_RADIUS: f32 = 600.0;
/// Fuse left on a mine once somebody walks into its detection radius.
pub const MINE_FUSE: u16 = MINE_DURATION / 10;
const MINE_ARMED: u16 = MINE_DURATION / 5;
const MINE_FLASH: u16 = MINE_DURATION / 20;
const MINE_KNOCKBACK: f32 = 30.0;

const FLAME_FRICTION: f32 = 0.99;
const GROWTH: f32 = 0.3;
const FREEZE_DRAG: f32 = 0.94;
const FREEZE_COLOUR: u32 = 0xd0d0ff;

/// Fixed per-kind parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub cool_down: u16,
    pub recoil: f32,
    pub damage: u16,
    pub time_to_live: u16,
    pub size: f32,
    pub colour: u32,
    pub speed: f32,
    /// Muzzle distance as a multiple of the owner's radius. Negative drops
    /// the projectile behind the owner.
    pub muzzle_offset: f32,
    pub impact: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WeaponKind {
    Bullet = 1,
    Laser = 2,
    Flame = 3,
    Mine = 4,
    Minigun = 5,
    Freeze = 6,
    Meltdown = 7,
}

impl WeaponKind {
    /// Catalog order; a player's `weapon_index` points into this.
    pub const CATALOG: [WeaponKind; WEAPON_COUNT] = [
        WeaponKind::Bullet,
        WeaponKind::Laser,
        WeaponKind::Flame,
        WeaponKind::Mine,
        WeaponKind::Minigun,
        WeaponKind::Freeze,
        WeaponKind::Meltdown,
    ];

    /// Wire discriminant.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1..=7 => Some(Self::CATALOG[usize::from(id) - 1]),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::CATALOG.get(index).copied()
    }

    pub fn index(self) -> usize {
        usize::from(self.id()) - 1
    }

    pub fn stats(self) -> WeaponStats {
        match self {
            WeaponKind::Bullet => WeaponStats {
                cool_down: 100,
                recoil: 15.0,
                damage: 10,
                time_to_live: 360,
                size: 5.0,
                colour: 0xe67f19,
                speed: 7.0,
                muzzle_offset: 1.0,
                impact: 1.0,
            },
            WeaponKind::Laser => WeaponStats {
                cool_down: 20,
                recoil: 0.0,
                damage: 5,
                time_to_live: 60,
                size: 5.0,
                colour: 0x66ff11,
                speed: 7.0,
                muzzle_offset: 1.0,
                impact: 1.0,
            },
            WeaponKind::Flame => WeaponStats {
                cool_down: 3,
                recoil: 1.0,
                damage: 2,
                time_to_live: 150,
                size: 5.0,
                colour: 0xfff0f0,
                speed: 3.0,
                muzzle_offset: 1.2,
                impact: 1.0,
            },
            WeaponKind::Mine => WeaponStats {
                cool_down: 120,
                recoil: 1.0,
                damage: 25,
                time_to_live: MINE_DURATION,
                size: 3.0,
                colour: 0xffffff,
                speed: 1.0,
                muzzle_offset: -1.2,
                impact: 1.0,
            },
            WeaponKind::Minigun => WeaponStats {
                cool_down: 0,
                recoil: 0.0,
                damage: 1,
                time_to_live: 50,
                size: 1.0,
                colour: 0xe67f19,
                speed: 6.0,
                muzzle_offset: 1.0,
                impact: 0.5,
            },
            WeaponKind::Freeze => WeaponStats {
                cool_down: 120,
                recoil: 0.0,
                damage: 0,
                time_to_live: 360,
                size: 10.0,
                colour: 0x5084ac,
                speed: 6.0,
                muzzle_offset: 1.0,
                impact: 1.0,
            },
            WeaponKind::Meltdown => WeaponStats {
                cool_down: 256,
                recoil: 0.0,
                damage: 0,
                time_to_live: 256,
                size: 1.0,
                colour: 0x000000,
                speed: 0.0,
                muzzle_offset: 1.0,
                impact: 1.0,
            },
        }
    }

    pub fn cool_down(self) -> u16 {
        self.stats().cool_down
    }

    pub fn recoil(self) -> f32 {
        self.stats().recoil
    }

    /// Spread half-angle in degrees for a shot fired by `owner`.
    pub fn spread(self, owner: &Player) -> f32 {
        match self {
            WeaponKind::Laser => 2.0,
            WeaponKind::Flame => 4.0,
            WeaponKind::Minigun => owner.velocity.length_squared() + 6.0,
            _ => 0.0,
        }
    }

    /// Builds the projectile `owner` fires with this weapon.
    pub fn spawn<R: Rng + ?Sized>(self, owner: &Player, rng: &mut R) -> Projectile {
        let stats = self.stats();
        let position = owner.position + owner.direction * (owner.size() * stats.muzzle_offset);
        let muzzle = owner.direction * stats.speed;

        let velocity = match self {
            WeaponKind::Bullet | WeaponKind::Laser => muzzle,
            WeaponKind::Flame => muzzle + owner.velocity.limit(2.0),
            WeaponKind::Mine | WeaponKind::Minigun | WeaponKind::Freeze => muzzle + owner.velocity,
            WeaponKind::Meltdown => owner.velocity,
        };

        let damage = match self {
            WeaponKind::Meltdown => {
                let charge = owner.score() as f32 + owner.size() + 10.0;
                charge.clamp(0.0, f32::from(u16::MAX)) as u16
            }
            _ => stats.damage,
        };

        let spread = self.spread(owner);
        let velocity = if spread > 0.0 {
            let angle: f32 = rng.gen_range(-spread..=spread);
            velocity.rotate(angle.to_radians())
        } else {
            velocity
        };

        Projectile {
            owner: owner.id,
            kind: self,
            position,
            velocity,
            damage,
            time_to_live: stats.time_to_live,
            size: stats.size,
            colour: stats.colour,
            impact: stats.impact,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub owner: usize,
    pub kind: WeaponKind,
    pub position: Vector2,
    pub velocity: Vector2,
    pub damage: u16,
    pub time_to_live: u16,
    pub size: f32,
    /// 0xRRGGBB
    pub colour: u32,
    pub impact: f32,
}

impl Projectile {
    /// Advances the projectile by one tick. Returns `true` once it has
    /// expired and must be removed.
    pub fn tick(&mut self) -> bool {
        match self.kind {
            WeaponKind::Flame => {
                self.position += self.velocity;
                self.velocity *= FLAME_FRICTION;
                self.size += GROWTH;
                self.colour = cool(self.colour);
            }
            WeaponKind::Mine => self.tick_mine(),
            WeaponKind::Meltdown => {
                self.size += GROWTH;
                self.colour = warm(self.colour);
            }
            _ => self.position += self.velocity,
        }

        if self.time_to_live > 0 {
            self.time_to_live -= 1;
            false
        } else {
            true
        }
    }

    fn tick_mine(&mut self) {
        if self.time_to_live <= MINE_FLASH {
            if self.time_to_live == MINE_FLASH {
                self.colour = 0x000000;
            } else {
                self.colour = flash(self.colour);
                self.size += 2.0;
            }
        } else if self.time_to_live < MINE_ARMED {
            self.colour = 0xf00000;
        } else {
            self.colour = 0xffffff;
        }
    }

    /// Tests the projectile against `player`, applying knockback and other
    /// side effects. Returns the damage dealt, zero for a miss.
    pub fn hit(&mut self, player: &mut Player) -> u16 {
        match self.kind {
            WeaponKind::Bullet | WeaponKind::Laser | WeaponKind::Minigun => {
                self.hit_standard(player)
            }
            WeaponKind::Flame => self.hit_flame(player),
            WeaponKind::Mine => self.hit_mine(player),
            WeaponKind::Freeze => self.hit_freeze(player),
            WeaponKind::Meltdown => self.hit_meltdown(player),
        }
    }

    fn hit_standard(&mut self, player: &mut Player) -> u16 {
        if player.id == self.owner {
            return 0;
        }
        let size = player.size();
        if (player.position - self.position).length_squared() < size * size {
            player.velocity += self.velocity * self.impact;
            self.time_to_live = 0;
            return self.damage;
        }
        0
    }

    fn hit_flame(&mut self, player: &mut Player) -> u16 {
        if player.id == self.owner {
            return 0;
        }
        let direction = player.position - self.position;
        let size = player.size();
        if direction.length_squared() < size * size + self.size * self.size {
            match direction.unit() {
                Ok(unit) => player.velocity += unit * (self.velocity.length() * self.impact),
                Err(e) => warn!("Flame centred on player {}: {}", player.id, e),
            }
            self.time_to_live = 0;
            return self.damage;
        }
        0
    }

    fn hit_mine(&mut self, player: &mut Player) -> u16 {
        if self.time_to_live > MINE_SAFE_DURATION {
            return 0;
        }

        let direction = player.position - self.position;
        let distance_squared = direction.length_squared();
        if distance_squared < MINE_DETECTION_RADIUS * MINE_DETECTION_RADIUS {
            self.time_to_live = self.time_to_live.min(MINE_FUSE);
        }

        let reach = player.size() + self.size;
        if self.time_to_live == 0 && distance_squared < reach * reach {
            match direction.unit() {
                Ok(unit) => player.velocity += unit * MINE_KNOCKBACK,
                Err(e) => warn!("Mine centred on player {}: {}", player.id, e),
            }
            return self.damage;
        }
        0
    }

    fn hit_freeze(&mut self, player: &mut Player) -> u16 {
        if player.id == self.owner {
            return 0;
        }
        let reach = self.size + player.size();
        if (player.position - self.position).length_squared() < reach * reach {
            self.velocity = Vector2::ZERO;
            self.position = player.position;
            self.colour = FREEZE_COLOUR;
            self.size = player.size();
            self.time_to_live = self.time_to_live.saturating_sub(1);
            player.velocity *= FREEZE_DRAG;
        }
        0
    }

    fn hit_meltdown(&mut self, player: &mut Player) -> u16 {
        if player.id == self.owner {
            self.position = player.position;
        }
        let reach = self.size + player.size();
        if self.time_to_live == 0 && (self.position - player.position).length_squared() < reach * reach
        {
            return self.damage;
        }
        0
    }
}

fn channels(colour: u32) -> (u32, u32, u32) {
    (colour & 0xff0000, colour & 0x00ff00, colour & 0x0000ff)
}

fn cool(colour: u32) -> u32 {
    let (r, g, b) = channels(colour);
    r.saturating_sub(0x010000).max(0x001000)
        | g.saturating_sub(0x000200).max(0x000100)
        | b.saturating_sub(0x000004).max(0x000001)
}

fn warm(colour: u32) -> u32 {
    let (r, g, b) = channels(colour);
    (r + 0x010000).min(0xff0000) | (g + 0x000300).min(0x00ff00) | (b + 0x000002).min(0x0000ff)
}

fn flash(colour: u32) -> u32 {
    let (r, g, b) = channels(colour);
    (r + 0x050000).min(0xff0000) | (g + 0x000500).min(0x00ff00) | (b + 0x000007).min(0x0000ff)
}
