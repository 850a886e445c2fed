//! Per-participant state and kinematics

use crate::vector::{Matrix2, Vector2};
use crate::weapon::{Projectile, WeaponKind, WEAPON_COUNT};
use crate::{
    ACCELERATION_FACTOR, BASE_RADIUS, BRAKE_FACTOR, FIELD_SIZE, FRICTION, MAX_ACCELERATION,
    MAX_VELOCITY, MIN_PLAYERS, RECOIL_FACTOR, SWITCH_COOL_DOWN, TARGET_RETRIES, TURN_COS,
    TURN_SIN, WALL_SPRING,
};
use log::warn;
use rand::Rng;

const TURN_LEFT: Matrix2 = Matrix2::new([[TURN_COS, -TURN_SIN], [TURN_SIN, TURN_COS]]);
const TURN_RIGHT: Matrix2 = Matrix2::new([[TURN_COS, TURN_SIN], [-TURN_SIN, TURN_COS]]);

/// Steering for one tick. Each axis is -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    /// Positive turns counter-clockwise.
    pub turn: i8,
    /// Positive accelerates, negative brakes.
    pub forward: i8,
    pub fire: bool,
    /// Moves the weapon selection through the catalog.
    pub switch: i8,
}

impl Controls {
    pub const IDLE: Controls = Controls {
        turn: 0,
        forward: 0,
        fire: false,
        switch: 0,
    };

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Wire index; kept equal to the position in the field's player table.
    pub id: usize,
    pub position: Vector2,
    pub direction: Vector2,
    pub velocity: Vector2,
    pub acceleration: f32,
    pub damage: u16,
    pub points: u16,
    pub cool_down: u16,
    pub weapon_index: usize,
    /// Index of the player this one is hunting. Equal to `id` while there
    /// are too few players for a hunt.
    pub target: usize,
}

impl Player {
    pub fn new(id: usize, position: Vector2) -> Self {
        Self {
            id,
            position,
            direction: Vector2::new(1.0, 0.0),
            velocity: Vector2::new(1.0, 0.0),
            acceleration: 0.0,
            damage: 0,
            points: 0,
            cool_down: 0,
            weapon_index: 0,
            target: id,
        }
    }

    /// Creates a player at a random position clear of the walls.
    pub fn spawn<R: Rng + ?Sized>(id: usize, rng: &mut R) -> Self {
        let radius = BASE_RADIUS as f32;
        let x = rng.gen_range(radius..=FIELD_SIZE - radius);
        let y = rng.gen_range(radius..=FIELD_SIZE - radius);
        Self::new(id, Vector2::new(x, y))
    }

    pub fn score(&self) -> i32 {
        i32::from(self.points) - i32::from(self.damage)
    }

    /// Collision radius.
    pub fn size(&self) -> f32 {
        (self.score().max(0) + BASE_RADIUS) as f32
    }

    pub fn health(&self) -> i32 {
        self.score() + BASE_RADIUS
    }

    pub fn is_dead(&self) -> bool {
        self.health() < 0
    }

    pub fn weapon(&self) -> WeaponKind {
        WeaponKind::CATALOG[self.weapon_index % WEAPON_COUNT]
    }

    /// Applies one tick of controls. Returns the projectile fired, if any.
    pub fn steer<R: Rng + ?Sized>(&mut self, controls: Controls, rng: &mut R) -> Option<Projectile> {
        if controls.turn != 0 {
            let rotation = if controls.turn > 0 { TURN_LEFT } else { TURN_RIGHT };
            match (rotation * self.direction).unit() {
                Ok(direction) => self.direction = direction,
                Err(e) => warn!("Player {} lost its heading: {}", self.id, e),
            }
        }

        match controls.forward.signum() {
            1 => self.acceleration = MAX_ACCELERATION,
            -1 => self.velocity *= BRAKE_FACTOR,
            _ => self.acceleration = 0.0,
        }

        let projectile = if controls.fire {
            self.shoot(rng)
        } else {
            None
        };

        if controls.switch != 0 && self.cool_down == 0 {
            self.cool_down = SWITCH_COOL_DOWN;
            let step = controls.switch.signum() as isize;
            let next = (self.weapon_index as isize + step).rem_euclid(WEAPON_COUNT as isize);
            self.weapon_index = next as usize;
        }

        projectile
    }

    /// Fires the selected weapon unless it is cooling down.
    pub fn shoot<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Projectile> {
        if self.cool_down > 0 {
            return None;
        }
        let weapon = self.weapon();
        self.cool_down = weapon.cool_down();
        self.velocity -= self.direction * (weapon.recoil() * RECOIL_FACTOR);
        Some(weapon.spawn(self, rng))
    }

    pub fn accelerate(&mut self) {
        if self.acceleration == 0.0 {
            return;
        }
        self.velocity += self.direction * (self.acceleration / ACCELERATION_FACTOR);
        self.velocity = self.velocity.limit(MAX_VELOCITY);
        self.acceleration *= FRICTION;
    }

    pub fn move_step(&mut self) {
        self.position += self.velocity;
        self.position = self.position.limit_zero(FIELD_SIZE);
        self.velocity *= FRICTION;
    }

    /// Pushes the player back inside the field. Returns whether any wall
    /// was touched.
    pub fn wall_bounce(&mut self) -> bool {
        let size = self.size();
        let mut bounce = false;

        let x = self.position.x;
        if x + size > FIELD_SIZE {
            self.velocity.x += (FIELD_SIZE - (x + size)) * WALL_SPRING;
            bounce = true;
        } else if x - size < 0.0 {
            self.velocity.x += (size - x) * WALL_SPRING;
            bounce = true;
        }

        let y = self.position.y;
        if y + size > FIELD_SIZE {
            self.velocity.y += (FIELD_SIZE - (y + size)) * WALL_SPRING;
            bounce = true;
        } else if y - size < 0.0 {
            self.velocity.y += (size - y) * WALL_SPRING;
            bounce = true;
        }

        bounce
    }

    /// Tests for body contact and, on contact, sends both players apart
    /// along the line between their centres. The total `|v| * size` of the
    /// pair is shared evenly.
    pub fn is_colliding(&mut self, other: &mut Player) -> bool {
        if self.id == other.id {
            return false;
        }
        let separation = self.position - other.position;
        let reach = self.size() + other.size();
        if separation.length_squared() >= reach * reach {
            return false;
        }

        match separation.unit() {
            Ok(direction) => {
                let momentum = (other.velocity.length() * other.size()
                    + self.velocity.length() * self.size())
                    / 2.0;
                self.velocity = direction * (momentum / self.size());
                other.velocity = direction * -(momentum / other.size());
            }
            Err(e) => warn!(
                "Players {} and {} share a centre: {}",
                self.id, other.id, e
            ),
        }
        true
    }

    /// Picks a fresh target from `players`, which must be the full table
    /// this player sits in. Mutual pairs are avoided for a bounded number
    /// of draws.
    pub fn new_target<R: Rng + ?Sized>(&self, players: &[Player], rng: &mut R) -> usize {
        if players.len() < MIN_PLAYERS {
            return self.id;
        }

        let mut retries = 0;
        loop {
            let candidate = rng.gen_range(0..players.len());
            if candidate == self.id {
                continue;
            }
            if players[candidate].target == self.id && retries < TARGET_RETRIES {
                retries += 1;
                continue;
            }
            return candidate;
        }
    }

    /// Starts over at a random position with the same id.
    pub fn respawn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Player::spawn(self.id, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn table(count: usize) -> Vec<Player> {
        (0..count)
            .map(|i| Player::new(i, Vector2::new(100.0 + 200.0 * i as f32, 500.0)))
            .collect()
    }

    #[test]
    fn test_player_creation() {
        let player = Player::new(3, Vector2::new(10.0, 20.0));
        assert_eq!(player.target, 3);
        assert_eq!(player.velocity, Vector2::new(1.0, 0.0));
        assert_eq!(player.direction, Vector2::new(1.0, 0.0));
        assert_eq!(player.score(), 0);
        assert_eq!(player.size(), 30.0);
        assert_eq!(player.health(), 30);
    }

    #[test]
    fn test_spawn_is_clear_of_walls() {
        let mut rng = rng();
        for id in 0..100 {
            let player = Player::spawn(id, &mut rng);
            assert!(player.position.x >= 30.0 && player.position.x <= FIELD_SIZE - 30.0);
            assert!(player.position.y >= 30.0 && player.position.y <= FIELD_SIZE - 30.0);
        }
    }

    #[test]
    fn test_derived_values() {
        let mut player = Player::new(0, Vector2::ZERO);
        player.points = 12;
        player.damage = 2;
        assert_eq!(player.score(), 10);
        assert_eq!(player.size(), 40.0);

        player.damage = 50;
        assert_eq!(player.score(), -38);
        assert_eq!(player.size(), 30.0);
        assert_eq!(player.health(), -8);
        assert!(player.is_dead());
    }

    #[test]
    fn test_turn_left_is_counter_clockwise() {
        let mut rng = rng();
        let mut player = Player::new(0, Vector2::new(500.0, 500.0));
        let controls = Controls {
            turn: 1,
            ..Controls::IDLE
        };

        for _ in 0..30 {
            player.steer(controls, &mut rng);
        }

        assert_approx_eq!(player.direction.x, 0.0, 1e-4);
        assert_approx_eq!(player.direction.y, 1.0, 1e-4);
        assert_approx_eq!(player.direction.length(), 1.0, 1e-5);
    }

    #[test]
    fn test_forward_and_brake() {
        let mut rng = rng();
        let mut player = Player::new(0, Vector2::new(500.0, 500.0));

        player.steer(
            Controls {
                forward: 1,
                ..Controls::IDLE
            },
            &mut rng,
        );
        assert_eq!(player.acceleration, MAX_ACCELERATION);

        player.steer(Controls::IDLE, &mut rng);
        assert_eq!(player.acceleration, 0.0);

        player.steer(
            Controls {
                forward: -1,
                ..Controls::IDLE
            },
            &mut rng,
        );
        assert_approx_eq!(player.velocity.x, 0.9);
    }

    #[test]
    fn test_accelerate_is_limited() {
        let mut player = Player::new(0, Vector2::new(500.0, 500.0));
        player.velocity = Vector2::new(3.99, 0.0);
        player.acceleration = MAX_ACCELERATION;

        player.accelerate();
        assert_eq!(player.velocity.x, MAX_VELOCITY);
        assert_approx_eq!(player.acceleration, FRICTION);
    }

    #[test]
    fn test_move_step_stays_on_field() {
        let mut player = Player::new(0, Vector2::new(FIELD_SIZE - 1.0, 1.0));
        player.velocity = Vector2::new(5.0, -5.0);

        player.move_step();

        assert_eq!(player.position, Vector2::new(FIELD_SIZE, 0.0));
        assert_approx_eq!(player.velocity.x, 4.95);
    }

    #[test]
    fn test_wall_bounce() {
        let mut player = Player::new(0, Vector2::new(10.0, 500.0));
        player.velocity = Vector2::ZERO;

        assert!(player.wall_bounce());
        assert_eq!(player.velocity, Vector2::new(20.0, 0.0));

        let mut player = Player::new(0, Vector2::new(500.0, FIELD_SIZE - 5.0));
        player.velocity = Vector2::ZERO;
        assert!(player.wall_bounce());
        assert_eq!(player.velocity, Vector2::new(0.0, -25.0));

        let mut player = Player::new(0, Vector2::new(500.0, 500.0));
        assert!(!player.wall_bounce());
    }

    #[test]
    fn test_shoot_respects_cool_down() {
        let mut rng = rng();
        let mut player = Player::new(0, Vector2::new(500.0, 500.0));

        let bullet = player.shoot(&mut rng);
        assert!(bullet.is_some());
        assert_eq!(player.cool_down, 100);
        // recoil 15 * 0.1 against a heading of +x
        assert_approx_eq!(player.velocity.x, -0.5);

        assert!(player.shoot(&mut rng).is_none());
        assert_eq!(player.cool_down, 100);
    }

    #[test]
    fn test_weapon_switch_wraps() {
        let mut rng = rng();
        let mut player = Player::new(0, Vector2::new(500.0, 500.0));
        let previous = Controls {
            switch: -1,
            ..Controls::IDLE
        };

        player.steer(previous, &mut rng);
        assert_eq!(player.weapon_index, WEAPON_COUNT - 1);
        assert_eq!(player.weapon(), WeaponKind::Meltdown);
        assert_eq!(player.cool_down, SWITCH_COOL_DOWN);

        // still cooling down
        player.steer(previous, &mut rng);
        assert_eq!(player.weapon_index, WEAPON_COUNT - 1);

        player.cool_down = 0;
        player.steer(
            Controls {
                switch: 1,
                ..Controls::IDLE
            },
            &mut rng,
        );
        assert_eq!(player.weapon_index, 0);
    }

    #[test]
    fn test_collision_redirects_along_axis() {
        let mut a = Player::new(0, Vector2::new(100.0, 100.0));
        let mut b = Player::new(1, Vector2::new(140.0, 100.0));
        a.velocity = Vector2::new(3.0, 0.0);
        b.velocity = Vector2::new(-1.0, 0.0);

        assert!(a.is_colliding(&mut b));
        assert_approx_eq!(a.velocity.x, -2.0);
        assert_approx_eq!(b.velocity.x, 2.0);
        assert_approx_eq!(a.velocity.y, 0.0);
    }

    #[test]
    fn test_collision_preserves_weighted_speed() {
        let mut a = Player::new(0, Vector2::new(100.0, 100.0));
        let mut b = Player::new(1, Vector2::new(130.0, 140.0));
        a.points = 10;
        a.velocity = Vector2::new(1.5, -2.0);
        b.velocity = Vector2::new(0.5, 0.25);

        let before = a.velocity.length() * a.size() + b.velocity.length() * b.size();
        assert!(a.is_colliding(&mut b));
        let after = a.velocity.length() * a.size() + b.velocity.length() * b.size();
        assert_approx_eq!(before, after, 1e-3);
    }

    #[test]
    fn test_no_collision_when_apart() {
        let mut a = Player::new(0, Vector2::new(100.0, 100.0));
        let mut b = Player::new(1, Vector2::new(161.0, 100.0));
        let (va, vb) = (a.velocity, b.velocity);

        assert!(!a.is_colliding(&mut b));
        assert_eq!(a.velocity, va);
        assert_eq!(b.velocity, vb);
    }

    #[test]
    fn test_collision_at_same_centre_leaves_velocities() {
        let mut a = Player::new(0, Vector2::new(100.0, 100.0));
        let mut b = Player::new(1, Vector2::new(100.0, 100.0));
        b.velocity = Vector2::new(0.0, 2.0);

        assert!(a.is_colliding(&mut b));
        assert_eq!(a.velocity, Vector2::new(1.0, 0.0));
        assert_eq!(b.velocity, Vector2::new(0.0, 2.0));
    }

    #[test]
    fn test_new_target_needs_enough_players() {
        let mut rng = rng();
        let players = table(MIN_PLAYERS - 1);
        assert_eq!(players[0].new_target(&players, &mut rng), 0);
    }

    #[test]
    fn test_new_target_never_self() {
        let mut rng = rng();
        let players = table(4);
        for _ in 0..100 {
            let target = players[2].new_target(&players, &mut rng);
            assert_ne!(target, 2);
            assert!(target < players.len());
        }
    }

    #[test]
    fn test_new_target_avoids_mutual_pair() {
        let mut rng = rng();
        let mut players = table(5);
        players[1].target = 0;

        for _ in 0..100 {
            assert_ne!(players[0].new_target(&players, &mut rng), 1);
        }
    }

    #[test]
    fn test_respawn_resets_counters() {
        let mut rng = rng();
        let mut player = Player::new(4, Vector2::new(10.0, 10.0));
        player.damage = 70;
        player.points = 3;
        player.weapon_index = 5;

        player.respawn(&mut rng);
        assert_eq!(player.id, 4);
        assert_eq!(player.damage, 0);
        assert_eq!(player.points, 0);
        assert_eq!(player.weapon_index, 0);
    }
}
