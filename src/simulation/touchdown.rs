use bevy::prelude::*;

use crate::config::PhysicalConstants;

use super::LandingOutcome;

/// Lowest point of the lander in presentation coordinates (y grows downward).
pub fn lowest_point(position: Vec2, physics: &PhysicalConstants) -> f32 {
    position.y + physics.half_height_points()
}

/// True while the lowest point is at or below the ground line.
pub fn is_in_contact(position: Vec2, physics: &PhysicalConstants) -> bool {
    lowest_point(position, physics) >= physics.ground_level
}

/// Height of the lowest point above the ground line, in meters. Zero when grounded.
pub fn altitude(position: Vec2, physics: &PhysicalConstants) -> f32 {
    ((physics.ground_level - lowest_point(position, physics)) / physics.points_per_meter).max(0.0)
}

/// Per-axis check of the touchdown velocity against the configured limits.
pub fn classify(velocity: Vec2, max_landing_speed: Vec2) -> LandingOutcome {
    let safe =
        velocity.x.abs() <= max_landing_speed.x && velocity.y.abs() <= max_landing_speed.y;
    if safe {
        LandingOutcome::Safe
    } else {
        LandingOutcome::Crashed
    }
}

/// Ground contact edge detection. Only the airborne to grounded edge yields an outcome.
pub fn contact_transition(
    was_grounded: bool,
    position: Vec2,
    velocity: Vec2,
    physics: &PhysicalConstants,
) -> (bool, Option<LandingOutcome>) {
    let grounded = is_in_contact(position, physics);
    let outcome = (grounded && !was_grounded)
        .then(|| classify(velocity, physics.max_landing_speed));
    (grounded, outcome)
}
