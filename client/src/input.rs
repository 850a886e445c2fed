//! Client input sampling and control byte pacing

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::encode_controls;
use shared::{bot, Controls, Field};
use std::time::{Duration, Instant};

/// Idle clients still send this often so the server keeps them alive.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(100);

/// Anything that can produce a tick's worth of steering: a keyboard, a
/// gamepad or the autopilot.
pub trait InputSource {
    fn sample(&mut self, field: &Field) -> Controls;
}

/// Drives the local player the same way the server drives its bots.
pub struct Autopilot {
    rng: StdRng,
}

impl Autopilot {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for Autopilot {
    fn sample(&mut self, field: &Field) -> Controls {
        match field.self_index {
            Some(index) => bot::autopilot(&field.players, index, &mut self.rng),
            None => Controls::IDLE,
        }
    }
}

/// Replays a fixed set of controls; handy for scripted sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedInput(pub Controls);

impl InputSource for FixedInput {
    fn sample(&mut self, _field: &Field) -> Controls {
        self.0
    }
}

/// Manages input collection and decides when a control byte goes out
pub struct InputManager<S: InputSource> {
    source: S,
    current: Controls,
    last_sent: Option<Instant>,
}

impl<S: InputSource> InputManager<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Controls::IDLE,
            last_sent: None,
        }
    }

    /// Samples the source. Returns the controls together with the byte to
    /// send, if one is due: every tick while steering, on the change back
    /// to idle, and as a keepalive while idle.
    pub fn update(&mut self, field: &Field) -> (Controls, Option<u8>) {
        let controls = self.source.sample(field);
        let changed = controls != self.current;
        let keepalive_due = self
            .last_sent
            .map_or(true, |sent| sent.elapsed() >= KEEPALIVE_INTERVAL);

        self.current = controls;
        if !controls.is_idle() || changed || keepalive_due {
            self.last_sent = Some(Instant::now());
            (controls, Some(encode_controls(controls)))
        } else {
            (controls, None)
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
