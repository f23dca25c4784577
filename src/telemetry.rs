use bevy::prelude::*;
use std::fmt;

use crate::simulation::LanderState;

/// Read-only snapshot published to display collaborators after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Resource, Default)]
pub struct Telemetry {
    pub frame_rate: Option<f32>,
    pub angle_degrees: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub altitude: f32, // meters above the ground line
    pub grounded: bool,
    pub thrust_on: bool,
}

impl Telemetry {
    pub fn capture(state: &LanderState, dt: f32, altitude: f32) -> Self {
        Self {
            frame_rate: (dt > 0.0).then(|| 1.0 / dt),
            angle_degrees: state.angle_degrees(),
            position: state.position,
            velocity: state.velocity,
            acceleration: state.acceleration,
            altitude,
            grounded: state.grounded,
            thrust_on: state.thrust_on,
        }
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_rate {
            Some(fps) => write!(f, "FPS: {fps:.2}")?,
            None => write!(f, "FPS: --")?,
        }
        write!(
            f,
            " | Angle: {:.2}° | Velocity x: {:.2} y: {:.2} m/s | Acceleration x: {:.2} y: {:.2} m/s**2 | Altitude: {:.1} m",
            self.angle_degrees,
            self.velocity.x,
            self.velocity.y,
            self.acceleration.x,
            self.acceleration.y,
            self.altitude,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhysicalConstants, SpawnPoint};

    #[test]
    fn test_capture_derives_degrees_and_frame_rate() {
        let state = LanderState::spawn(&SpawnPoint::default(), &PhysicalConstants::default());
        let telemetry = Telemetry::capture(&state, 0.02, 37.25);
        assert!((telemetry.angle_degrees - 90.0).abs() < 1e-4);
        assert!((telemetry.frame_rate.unwrap() - 50.0).abs() < 1e-3);
        assert_eq!(telemetry.acceleration, Vec2::new(0.0, -1.62));
        assert!(!telemetry.grounded);
    }

    #[test]
    fn test_no_frame_rate_without_elapsed_time() {
        let state = LanderState::spawn(&SpawnPoint::default(), &PhysicalConstants::default());
        assert_eq!(Telemetry::capture(&state, 0.0, 0.0).frame_rate, None);
        assert_eq!(Telemetry::capture(&state, -1.0, 0.0).frame_rate, None);
    }

    #[test]
    fn test_display_matches_hud_lines() {
        let state = LanderState::spawn(&SpawnPoint::default(), &PhysicalConstants::default());
        let line = Telemetry::capture(&state, 0.0, 37.25).to_string();
        assert!(line.starts_with("FPS: --"));
        assert!(line.contains("Angle: 90.00°"));
        assert!(line.contains("Velocity x: 0.00 y: 0.00 m/s"));
        assert!(line.contains("Acceleration x: 0.00 y: -1.62 m/s**2"));
        assert!(line.contains("Altitude: 37.2 m") || line.contains("Altitude: 37.3 m"));
    }
}
