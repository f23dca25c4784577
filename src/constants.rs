use std::f32::consts::PI;

// Presentation scale
pub const POINTS_PER_METER: f32 = 10.0; // one meter is 10 points

// Physical dimensions in meters
pub const LANDER_HEIGHT: f32 = 5.5;

// Lunar environment and lander (launch mass, fuel burn not modelled)
pub const MOON_GRAVITY: [f32; 2] = [0.0, -1.62]; // m/s²
pub const LANDER_MASS: f32 = 5103.0; // kg
pub const LANDER_MAX_THRUST: f32 = 16000.0; // N
pub const LANDER_ROTATION_RATE: f32 = (70.0 / 180.0) * PI; // rad/s

// Touchdown limits, per axis
pub const MAX_LANDING_SPEED: [f32; 2] = [1.0, 2.0]; // m/s

// Ground line in points from the top of the screen (y-down)
pub const GROUND_LEVEL: f32 = 600.0;

// Spawn
pub const SPAWN_POSITION: [f32; 2] = [200.0, 200.0]; // points
pub const SPAWN_ANGLE: f32 = PI / 2.0; // pointing up

pub const TICK_RATE_HZ: f64 = 60.0;
