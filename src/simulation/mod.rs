// simulation/mod.rs
use bevy::prelude::*;

use crate::config::{PhysicalConstants, SpawnPoint};

pub mod dynamics;
pub mod touchdown;

pub use dynamics::{tick, wrap_angle};

/// Rotation button state. `Left` turns counter-clockwise (angle grows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationInput {
    Left,
    #[default]
    Straight,
    Right,
}

impl RotationInput {
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Straight => 0.0,
            Self::Right => -1.0,
        }
    }

    /// Maps a signed integer (as scripts report it) onto an input.
    pub fn from_sign(sign: i64) -> Self {
        match sign.signum() {
            1 => Self::Left,
            -1 => Self::Right,
            _ => Self::Straight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingOutcome {
    Safe,
    Crashed,
}

/// Kinematic state of the lander.
///
/// `position` is in presentation points (y grows downward); `velocity` and
/// `acceleration` are in meters per second (y-up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanderState {
    pub angle: f32, // radians in [0, 2π), π/2 = upright
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub grounded: bool,
    pub thrust_on: bool,
    pub rotation: RotationInput,
}

impl LanderState {
    /// Lander at rest at the spawn point, with gravity as its only acceleration.
    pub fn spawn(spawn: &SpawnPoint, physics: &PhysicalConstants) -> Self {
        Self {
            angle: wrap_angle(spawn.angle),
            position: spawn.position,
            velocity: spawn.velocity,
            acceleration: physics.gravity,
            grounded: touchdown::is_in_contact(spawn.position, physics),
            thrust_on: false,
            rotation: RotationInput::Straight,
        }
    }

    pub fn angle_degrees(&self) -> f32 {
        self.angle.to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub dt: f32, // seconds
    pub rotation: RotationInput,
    pub thrust_on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    pub state: LanderState,
    pub outcome: Option<LandingOutcome>,
}

pub type StateListener = Box<dyn FnMut(&LanderState, Option<LandingOutcome>) + Send + Sync>;

/// Owns the single mutable lander state and notifies listeners after each tick.
#[derive(Resource)]
pub struct Simulation {
    physics: PhysicalConstants,
    state: LanderState,
    last_dt: f32,
    listeners: Vec<StateListener>,
}

impl Simulation {
    pub fn new(physics: PhysicalConstants, spawn: &SpawnPoint) -> Self {
        let state = LanderState::spawn(spawn, &physics);
        Self {
            physics,
            state,
            last_dt: 0.0,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &LanderState {
        &self.state
    }

    pub fn physics(&self) -> &PhysicalConstants {
        &self.physics
    }

    /// Duration of the last tick that actually advanced the state.
    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }

    pub fn subscribe(&mut self, listener: StateListener) {
        self.listeners.push(listener);
    }

    /// Runs one tick. Ticks with a non-positive `dt` change nothing and notify no one.
    pub fn step(&mut self, input: TickInput) -> Option<LandingOutcome> {
        if !(input.dt > 0.0 && input.dt.is_finite()) {
            return None;
        }
        let result = tick(&self.state, &input, &self.physics);
        self.state = result.state;
        self.last_dt = input.dt;
        self.notify(result.outcome);
        result.outcome
    }

    /// One discrete rotation step, as a tap on a rotation button gives. Uses the
    /// duration of the last tick.
    pub fn nudge(&mut self, direction: RotationInput) {
        let angle = dynamics::rotate(
            self.state.angle,
            direction,
            self.physics.rotation_rate,
            self.last_dt,
        );
        if angle != self.state.angle {
            self.state.angle = angle;
            self.notify(None);
        }
    }

    /// Puts the lander back at `spawn`. Listeners are kept.
    pub fn respawn(&mut self, spawn: &SpawnPoint) {
        self.state = LanderState::spawn(spawn, &self.physics);
        self.notify(None);
    }

    fn notify(&mut self, outcome: Option<LandingOutcome>) {
        let state = self.state;
        for listener in self.listeners.iter_mut() {
            listener(&state, outcome);
        }
    }
}
