use bevy::prelude::*;
use std::f32::consts::TAU;

use crate::config::PhysicalConstants;

use super::{touchdown, LanderState, RotationInput, TickInput, TickResult};

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Rotates by `rotation_rate * dt` in the direction of the input.
pub fn rotate(angle: f32, rotation: RotationInput, rotation_rate: f32, dt: f32) -> f32 {
    if rotation == RotationInput::Straight {
        return angle;
    }
    wrap_angle(angle + rotation.sign() * rotation_rate * dt)
}

/// Unit vector the engine pushes along. 0 rad points along +x, π/2 straight up.
pub fn thrust_direction(angle: f32) -> Vec2 {
    Vec2::from_angle(angle).normalize_or_zero()
}

/// Vertical force that cancels any net downward push while resting on the ground.
pub fn ground_reaction(applied: Vec2) -> Vec2 {
    Vec2::new(0.0, -applied.y.min(0.0))
}

pub fn net_acceleration(
    angle: f32,
    thrust_on: bool,
    grounded: bool,
    physics: &PhysicalConstants,
) -> Vec2 {
    let throttle = if thrust_on { 1.0 } else { 0.0 };
    let thrust_force = thrust_direction(angle) * physics.max_thrust * throttle;
    let gravity_force = physics.gravity * physics.mass;
    let applied = thrust_force + gravity_force;

    let reaction_force = if grounded {
        ground_reaction(applied)
    } else {
        Vec2::ZERO
    };

    (applied + reaction_force) / physics.mass
}

/// Clamps a velocity to what the ground allows: no sliding, no sinking.
fn resting_velocity(velocity: Vec2) -> Vec2 {
    Vec2::new(0.0, velocity.y.max(0.0))
}

/// Advances the lander by one frame.
///
/// Ground contact is evaluated on the position carried in from the previous
/// frame, so the touchdown classification sees the velocity the lander hit the
/// ground with. The `grounded` flag therefore trails the crossing by one frame:
/// the frame that carries the lowest point past the ground line still reports
/// airborne, and the next one reports the touchdown. From then on the carried-in
/// velocity is clamped before integrating, so a grounded lander never moves down.
///
/// Displacement is integrated in meters (y-up) and applied to the position in
/// points (y-down).
pub fn tick(state: &LanderState, input: &TickInput, physics: &PhysicalConstants) -> TickResult {
    let dt = input.dt;
    if !(dt > 0.0 && dt.is_finite()) {
        return TickResult {
            state: *state,
            outcome: None,
        };
    }

    let (grounded, outcome) =
        touchdown::contact_transition(state.grounded, state.position, state.velocity, physics);

    let angle = rotate(state.angle, input.rotation, physics.rotation_rate, dt);
    let acceleration = net_acceleration(angle, input.thrust_on, grounded, physics);

    let initial_velocity = if grounded {
        resting_velocity(state.velocity)
    } else {
        state.velocity
    };

    let displacement = initial_velocity * dt + 0.5 * acceleration * dt * dt;
    let mut velocity = initial_velocity + acceleration * dt;
    let position =
        state.position + Vec2::new(displacement.x, -displacement.y) * physics.points_per_meter;

    if grounded {
        velocity = resting_velocity(velocity);
    }

    TickResult {
        state: LanderState {
            angle,
            position,
            velocity,
            acceleration,
            grounded,
            thrust_on: input.thrust_on,
            rotation: input.rotation,
        },
        outcome,
    }
}
