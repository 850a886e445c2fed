//! The simulation authority: players, projectiles and the fixed-rate tick
//!
//! The server owns one `Field` and advances it with [`Field::tick`]. A client
//! owns a replica that is overwritten by every snapshot through
//! [`Field::from_bytes`] and only extrapolated locally with
//! [`Field::predict`] in between.

use crate::player::{Controls, Player};
use crate::protocol::{self, DecodeError, EncodeError, Snapshot};
use crate::vector::Vector2;
use crate::weapon::Projectile;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Cues produced while ticking or decoding, consumed by audio and overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    WallCollision,
    OtherCollision,
    /// The viewpoint player took damage.
    SelfHit,
    /// The viewpoint player's target took damage.
    TargetHit,
    Join,
}

pub struct Field {
    pub players: Vec<Player>,
    pub projectiles: Vec<Projectile>,
    /// The local player on a client replica. `None` on the server.
    pub self_index: Option<usize>,
    status: Vec<StatusEvent>,
    rng: StdRng,
}

impl Field {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A field whose spawns, spreads and target draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            players: Vec::new(),
            projectiles: Vec::new(),
            self_index: None,
            status: Vec::new(),
            rng,
        }
    }

    /// Adds a player at a random position and hands out fresh targets.
    /// Returns the new player's index.
    pub fn add_player(&mut self) -> usize {
        let index = self.players.len();
        let player = Player::spawn(index, &mut self.rng);
        self.players.push(player);
        self.status.push(StatusEvent::Join);
        self.retarget_all();
        info!("Player {} joined, {} on the field", index, self.players.len());
        index
    }

    /// Removes a player, shifting every later index down by one.
    ///
    /// Projectiles fired by the removed player go with it. Panics if
    /// `index` was never handed out.
    pub fn remove_player(&mut self, index: usize) {
        assert!(
            index < self.players.len(),
            "removing player {} from a field of {}",
            index,
            self.players.len()
        );

        self.players.remove(index);
        for (id, player) in self.players.iter_mut().enumerate() {
            player.id = id;
        }

        self.projectiles.retain(|p| p.owner != index);
        for projectile in &mut self.projectiles {
            if projectile.owner > index {
                projectile.owner -= 1;
            }
        }

        self.retarget_all();
        info!("Player {} left, {} on the field", index, self.players.len());
    }

    /// Applies one tick of controls to player `index`.
    pub fn steer(&mut self, index: usize, controls: Controls) {
        assert!(
            index < self.players.len(),
            "steering player {} on a field of {}",
            index,
            self.players.len()
        );
        if let Some(projectile) = self.players[index].steer(controls, &mut self.rng) {
            self.projectiles.push(projectile);
        }
    }

    /// Advances the simulation by one tick and returns the events it raised,
    /// oldest first.
    pub fn tick(&mut self) -> Vec<StatusEvent> {
        for player in &mut self.players {
            player.cool_down = player.cool_down.saturating_sub(1);
            player.accelerate();
            player.move_step();
            if player.wall_bounce() {
                self.status.push(StatusEvent::WallCollision);
            }
        }

        let hits = self.resolve_hits();

        let count = self.players.len();
        for j in 1..count {
            let (head, tail) = self.players.split_at_mut(j);
            let b = &mut tail[0];
            for a in head.iter_mut() {
                if a.is_colliding(b) {
                    self.status.push(StatusEvent::OtherCollision);
                }
            }
        }

        for (victim, owner) in hits {
            self.score_hit(victim, owner);
        }

        for index in 0..self.players.len() {
            if self.players[index].is_dead() {
                debug!("Player {} respawns", index);
                self.players[index].respawn(&mut self.rng);
                self.retarget(index);
            }
        }

        self.projectiles.retain_mut(|p| !p.tick());

        self.take_status()
    }

    /// Tests every player against every projectile. Returns `(victim, owner)`
    /// for each hit that dealt damage.
    fn resolve_hits(&mut self) -> Vec<(usize, usize)> {
        let viewpoint = self.self_index;
        let viewpoint_target = viewpoint
            .and_then(|index| self.players.get(index))
            .map(|player| player.target);

        let mut hits = Vec::new();
        for (index, player) in self.players.iter_mut().enumerate() {
            for projectile in &mut self.projectiles {
                let damage = projectile.hit(player);
                if damage == 0 {
                    continue;
                }
                player.damage = player.damage.saturating_add(damage);
                hits.push((index, projectile.owner));

                if viewpoint == Some(index) {
                    self.status.push(StatusEvent::SelfHit);
                } else if viewpoint_target == Some(index) {
                    self.status.push(StatusEvent::TargetHit);
                }
            }
        }
        hits
    }

    /// A hit on the owner's own target earns a point and new targets for
    /// both sides.
    fn score_hit(&mut self, victim: usize, owner: usize) {
        if owner == victim || owner >= self.players.len() {
            return;
        }
        if self.players[owner].target != victim {
            return;
        }
        let hunter = &mut self.players[owner];
        hunter.points = hunter.points.saturating_add(1);
        debug!("Player {} tagged player {}", owner, victim);
        self.retarget(owner);
        self.retarget(victim);
    }

    /// Local extrapolation for a replica between snapshots. Moves players
    /// and projectiles; hits, collisions and scoring stay with the server.
    pub fn predict(&mut self) {
        for player in &mut self.players {
            player.cool_down = player.cool_down.saturating_sub(1);
            player.accelerate();
            player.move_step();
            player.wall_bounce();
        }
        self.projectiles.retain_mut(|p| !p.tick());
    }

    fn retarget(&mut self, index: usize) {
        let target = self.players[index].new_target(&self.players, &mut self.rng);
        self.players[index].target = target;
    }

    fn retarget_all(&mut self) {
        for index in 0..self.players.len() {
            self.retarget(index);
        }
    }

    /// Drains the pending events.
    pub fn take_status(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.status)
    }

    /// Highest score on the field, never below zero.
    pub fn best_score(&self) -> i32 {
        self.players.iter().map(Player::score).fold(0, i32::max)
    }

    /// The local player of a replica.
    pub fn me(&self) -> Option<&Player> {
        self.self_index.and_then(|index| self.players.get(index))
    }

    /// Encodes the snapshot body. The recipient's index still has to be
    /// appended, see [`protocol::with_viewpoint`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        protocol::encode_body(&self.players, &self.projectiles)
    }

    /// Overwrites the replica with a snapshot. Nothing changes unless the
    /// whole datagram is valid.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        let snapshot = protocol::decode_snapshot(bytes)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Writes an already validated snapshot into the replica and records
    /// the cues it implies.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let previous_count = self.players.len();
        let previous_damage: Vec<u16> = self.players.iter().map(|p| p.damage).collect();
        let previous_self = self.self_index;

        let count = snapshot.players.len();
        self.players.truncate(count);
        while self.players.len() < count {
            let id = self.players.len();
            self.players.push(Player::new(id, Vector2::ZERO));
        }
        for (player, record) in self.players.iter_mut().zip(&snapshot.players) {
            record.apply(player);
        }
        self.projectiles = snapshot.projectiles;

        let you = usize::from(snapshot.you);
        self.self_index = Some(you);

        let took_damage = |index: usize, players: &[Player]| {
            previous_damage
                .get(index)
                .map_or(false, |&before| players[index].damage > before)
        };

        if count > previous_count {
            self.status.push(StatusEvent::Join);
        }
        // A shrinking table or a moved viewpoint means indices were
        // compacted, so old damage no longer lines up with the same players.
        if count < previous_count || previous_self != Some(you) {
            return;
        }
        if took_damage(you, &self.players) {
            self.status.push(StatusEvent::SelfHit);
        }
        let target = self.players[you].target;
        if target != you && took_damage(target, &self.players) {
            self.status.push(StatusEvent::TargetHit);
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}
