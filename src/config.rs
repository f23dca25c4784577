use bevy::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, fs, io, path::Path};

use crate::constants::{
    GROUND_LEVEL, LANDER_HEIGHT, LANDER_MASS, LANDER_MAX_THRUST, LANDER_ROTATION_RATE,
    MAX_LANDING_SPEED, MOON_GRAVITY, POINTS_PER_METER, SPAWN_ANGLE, SPAWN_POSITION, TICK_RATE_HZ,
};

/// Immutable physical constants, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    #[serde(with = "vec2_tuple")]
    pub gravity: Vec2, // m/s², world frame (y-up)
    pub mass: f32,          // kg
    pub max_thrust: f32,    // N
    pub rotation_rate: f32, // rad/s
    #[serde(with = "vec2_tuple")]
    pub max_landing_speed: Vec2, // m/s per axis
    pub ground_level: f32,     // points, presentation frame (y-down)
    pub points_per_meter: f32, // presentation scale
    pub lander_height: f32,    // meters
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            gravity: Vec2::from_array(MOON_GRAVITY),
            mass: LANDER_MASS,
            max_thrust: LANDER_MAX_THRUST,
            rotation_rate: LANDER_ROTATION_RATE,
            max_landing_speed: Vec2::from_array(MAX_LANDING_SPEED),
            ground_level: GROUND_LEVEL,
            points_per_meter: POINTS_PER_METER,
            lander_height: LANDER_HEIGHT,
        }
    }
}

impl PhysicalConstants {
    /// Distance from the lander's center to its lowest point, in points.
    pub fn half_height_points(&self) -> f32 {
        self.lander_height * self.points_per_meter / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("gravity.x", self.gravity.x),
            ("gravity.y", self.gravity.y),
            ("mass", self.mass),
            ("max_thrust", self.max_thrust),
            ("rotation_rate", self.rotation_rate),
            ("max_landing_speed.x", self.max_landing_speed.x),
            ("max_landing_speed.y", self.max_landing_speed.y),
            ("ground_level", self.ground_level),
            ("points_per_meter", self.points_per_meter),
            ("lander_height", self.lander_height),
        ];
        if let Some((field, _)) = scalars.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFiniteValue { field });
        }
        if self.mass <= 0.0 {
            return Err(ConfigError::NonPositiveMass { mass: self.mass });
        }
        if self.max_landing_speed.x < 0.0 || self.max_landing_speed.y < 0.0 {
            return Err(ConfigError::NegativeLandingSpeed {
                x: self.max_landing_speed.x,
                y: self.max_landing_speed.y,
            });
        }
        if self.points_per_meter <= 0.0 {
            return Err(ConfigError::NonPositiveValue {
                field: "points_per_meter",
                value: self.points_per_meter as f64,
            });
        }
        // a negative height would put the lowest point above the center
        if self.lander_height <= 0.0 {
            return Err(ConfigError::NonPositiveValue {
                field: "lander_height",
                value: self.lander_height as f64,
            });
        }
        for (field, value) in [
            ("max_thrust", self.max_thrust),
            ("rotation_rate", self.rotation_rate),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeValue { field, value });
            }
        }
        Ok(())
    }
}

/// Where the lander starts, and where the respawn policy puts it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPoint {
    #[serde(with = "vec2_tuple")]
    pub position: Vec2, // points
    #[serde(with = "vec2_tuple")]
    pub velocity: Vec2, // m/s
    pub angle: f32, // radians
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            position: Vec2::from_array(SPAWN_POSITION),
            velocity: Vec2::ZERO,
            angle: SPAWN_ANGLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct LanderConfig {
    pub physics: PhysicalConstants,
    pub spawn: SpawnPoint,
    pub tick_rate_hz: f64,
    pub respawn_on_crash: bool,
}

impl Default for LanderConfig {
    fn default() -> Self {
        Self {
            physics: PhysicalConstants::default(),
            spawn: SpawnPoint::default(),
            tick_rate_hz: TICK_RATE_HZ,
            respawn_on_crash: false,
        }
    }
}

impl LanderConfig {
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::de::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`. A missing file falls back to the built-in
    /// defaults; anything else that goes wrong is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_ron(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("No config at {}, using built-in defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        if !self.spawn.position.is_finite()
            || !self.spawn.velocity.is_finite()
            || !self.spawn.angle.is_finite()
        {
            return Err(ConfigError::NonFiniteValue { field: "spawn" });
        }
        if !(self.tick_rate_hz > 0.0 && self.tick_rate_hz.is_finite()) {
            return Err(ConfigError::NonPositiveValue {
                field: "tick_rate_hz",
                value: self.tick_rate_hz,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    NonPositiveMass { mass: f32 },
    NonFiniteValue { field: &'static str },
    NegativeLandingSpeed { x: f32, y: f32 },
    NonPositiveValue { field: &'static str, value: f64 },
    NegativeValue { field: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
            Self::NonPositiveMass { mass } => {
                write!(f, "lander mass must be positive, got {mass}")
            }
            Self::NonFiniteValue { field } => write!(f, "{field} must be finite"),
            Self::NegativeLandingSpeed { x, y } => {
                write!(f, "max landing speed must not be negative, got ({x}, {y})")
            }
            Self::NonPositiveValue { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            Self::NegativeValue { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// Vec2 as a plain `(x, y)` tuple in RON
mod vec2_tuple {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        (v.x, v.y).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        let (x, y) = <(f32, f32)>::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(LanderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_constants_match_lunar_module() {
        let physics = PhysicalConstants::default();
        assert_eq!(physics.gravity, Vec2::new(0.0, -1.62));
        assert!((physics.mass - 5103.0).abs() < f32::EPSILON);
        assert!((physics.max_thrust - 16000.0).abs() < f32::EPSILON);
        assert!((physics.rotation_rate - 70f32.to_radians()).abs() < 1e-6);
        assert!((physics.half_height_points() - 27.5).abs() < 1e-4);
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"(
            physics: (
                gravity: (0.0, -3.71),
                mass: 1000.0,
                max_thrust: 5000.0,
                rotation_rate: 1.0,
                max_landing_speed: (0.5, 1.5),
                ground_level: 500.0,
                points_per_meter: 5.0,
                lander_height: 4.0,
            ),
            spawn: (
                position: (100.0, 50.0),
                velocity: (2.0, 0.0),
                angle: 1.0,
            ),
            tick_rate_hz: 120.0,
            respawn_on_crash: true,
        )"#;
        let config = LanderConfig::from_ron(content).unwrap();
        assert_eq!(config.physics.gravity, Vec2::new(0.0, -3.71));
        assert_eq!(config.physics.max_landing_speed, Vec2::new(0.5, 1.5));
        assert_eq!(config.spawn.position, Vec2::new(100.0, 50.0));
        assert_eq!(config.spawn.velocity, Vec2::new(2.0, 0.0));
        assert!((config.tick_rate_hz - 120.0).abs() < f64::EPSILON);
        assert!(config.respawn_on_crash);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = LanderConfig::from_ron("(physics: (mass: 2000.0))").unwrap();
        assert!((config.physics.mass - 2000.0).abs() < f32::EPSILON);
        assert_eq!(config.physics.gravity, Vec2::new(0.0, -1.62));
        assert_eq!(config.spawn, SpawnPoint::default());
        assert!(!config.respawn_on_crash);
    }

    #[test]
    fn test_non_positive_mass_is_rejected() {
        let err = LanderConfig::from_ron("(physics: (mass: 0.0))").unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveMass { mass: 0.0 });

        let err = LanderConfig::from_ron("(physics: (mass: -5.0))").unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveMass { .. }));
    }

    #[test]
    fn test_negative_landing_speed_is_rejected() {
        let err = LanderConfig::from_ron("(physics: (max_landing_speed: (-1.0, 2.0)))")
            .unwrap_err();
        assert!(matches!(err, ConfigError::NegativeLandingSpeed { .. }));
    }

    #[test]
    fn test_zero_tick_rate_is_rejected() {
        let err = LanderConfig::from_ron("(tick_rate_hz: 0.0)").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositiveValue {
                field: "tick_rate_hz",
                ..
            }
        ));
    }

    #[test]
    fn test_lander_height_must_be_positive() {
        for height in ["0.0", "-5.5"] {
            let ron = format!("(physics: (lander_height: {height}))");
            let err = LanderConfig::from_ron(&ron).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::NonPositiveValue {
                    field: "lander_height",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_negative_thrust_and_rotation_rate_are_rejected() {
        let err = LanderConfig::from_ron("(physics: (max_thrust: -16000.0))").unwrap_err();
        assert_eq!(
            err,
            ConfigError::NegativeValue {
                field: "max_thrust",
                value: -16000.0,
            }
        );

        let err = LanderConfig::from_ron("(physics: (rotation_rate: -1.2))").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NegativeValue {
                field: "rotation_rate",
                ..
            }
        ));
        assert_eq!(err.to_string(), "rotation_rate must not be negative, got -1.2");

        // an engine-less lander that cannot turn is still a valid setup
        let config =
            LanderConfig::from_ron("(physics: (max_thrust: 0.0, rotation_rate: 0.0))").unwrap();
        assert_eq!(config.physics.max_thrust, 0.0);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = LanderConfig::from_ron("not ron at all").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse config"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = LanderConfig::load(Path::new("does/not/exist/lander.ron")).unwrap();
        assert_eq!(config, LanderConfig::default());
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/lander.ron");
        let config = LanderConfig::load(&path).unwrap();
        assert!(config.physics.mass > 0.0);
    }
}
