//! Autopilot that steers a player after its target
//!
//! Used by the server for bot players and by the headless client in place
//! of a keyboard.

use crate::player::{Controls, Player};
use rand::Rng;

/// How many ticks ahead the target's position is extrapolated.
pub const LEAD_TICKS: f32 = 60.0;
/// Squared distance below which the pilot stops accelerating.
pub const CLOSE_ENOUGH_SQUARED: f32 = 900.0;
/// A shot is fired on one tick in this many, on average.
pub const FIRE_ODDS: u32 = 201;
pub const SWITCH_ODDS: u32 = 501;

/// Controls for player `index` chasing the predicted position of its
/// target.
pub fn autopilot<R: Rng + ?Sized>(players: &[Player], index: usize, rng: &mut R) -> Controls {
    let Some(pilot) = players.get(index) else {
        return Controls::IDLE;
    };
    let target = players.get(pilot.target).unwrap_or(pilot);

    let aim = target.position
        + target.velocity * LEAD_TICKS
        + target.direction * (target.acceleration * LEAD_TICKS)
        - pilot.position;

    let turn = pilot.direction.cross(aim);
    let turn = if turn.abs() < 1.0 {
        0
    } else {
        turn.signum() as i8
    };

    Controls {
        turn,
        forward: i8::from(aim.length_squared() > CLOSE_ENOUGH_SQUARED),
        fire: rng.gen_ratio(1, FIRE_ODDS),
        switch: i8::from(rng.gen_ratio(1, SWITCH_ODDS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chase(pilot_at: Vector2, target_at: Vector2) -> (Vec<Player>, StdRng) {
        let mut pilot = Player::new(0, pilot_at);
        pilot.target = 1;
        let mut target = Player::new(1, target_at);
        target.velocity = Vector2::ZERO;
        (vec![pilot, target], StdRng::seed_from_u64(5))
    }

    #[test]
    fn test_turns_towards_target() {
        let (players, mut rng) = chase(Vector2::new(100.0, 100.0), Vector2::new(100.0, 500.0));
        let controls = autopilot(&players, 0, &mut rng);
        assert_eq!(controls.turn, 1);
        assert_eq!(controls.forward, 1);

        let (players, mut rng) = chase(Vector2::new(100.0, 500.0), Vector2::new(100.0, 100.0));
        assert_eq!(autopilot(&players, 0, &mut rng).turn, -1);
    }

    #[test]
    fn test_holds_course_when_aligned() {
        let (players, mut rng) = chase(Vector2::new(100.0, 100.0), Vector2::new(900.0, 100.0));
        assert_eq!(autopilot(&players, 0, &mut rng).turn, 0);
    }

    #[test]
    fn test_coasts_when_close() {
        let (mut players, mut rng) = chase(Vector2::new(100.0, 100.0), Vector2::new(110.0, 100.0));
        players[0].velocity = Vector2::ZERO;
        assert_eq!(autopilot(&players, 0, &mut rng).forward, 0);
    }

    #[test]
    fn test_fires_occasionally() {
        let (players, mut rng) = chase(Vector2::new(100.0, 100.0), Vector2::new(900.0, 100.0));
        let shots = (0..20_100)
            .filter(|_| autopilot(&players, 0, &mut rng).fire)
            .count();
        assert!(shots > 40 && shots < 200, "fired {} times", shots);
    }

    #[test]
    fn test_unknown_index_is_idle() {
        let (players, mut rng) = chase(Vector2::ZERO, Vector2::ZERO);
        assert_eq!(autopilot(&players, 5, &mut rng), Controls::IDLE);
    }
}
