use bevy::prelude::*;
use rhai::{Dynamic, Engine, Map as RhaiMap, Scope, AST};
use std::{fmt, sync::Arc};

use crate::simulation::{LanderState, RotationInput};

/// Discrete controls a pilot asks for on a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PilotCommand {
    pub thrust_on: bool,
    pub rotation: RotationInput,
}

#[derive(Clone)]
struct ScriptCommand {
    thrust: bool,
    rotation: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    Compile(String),
    Runtime(String),
    BadCommand(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile(e) => write!(f, "Compilation error: {e}"),
            Self::Runtime(e) => write!(f, "Runtime error: {e}"),
            Self::BadCommand(t) => {
                write!(f, "control() must return pilot(thrust, rotation), got {t}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Runs a rhai `control(state)` function once per frame to fly the lander.
///
/// ```rhai
/// fn control(state) {
///     pilot(state.vy < -1.5, 0)
/// }
/// ```
///
/// `rotation` is 1 for left, -1 for right and 0 to hold the current angle.
#[derive(Resource)]
pub struct ScriptPilot {
    engine: Arc<Engine>,
    compiled_script: Option<Arc<AST>>,
    pub error_message: Option<String>,
    pub console_buffer: Vec<String>, // print() output
}

// print() has no access to the pilot, so script output is collected here
thread_local! {
    static CONSOLE_BUFFER: std::cell::RefCell<Vec<String>> = std::cell::RefCell::new(Vec::new());
}

impl Default for ScriptPilot {
    fn default() -> Self {
        let mut engine = Engine::new();

        engine.register_type::<ScriptCommand>();
        engine.register_fn("pilot", |thrust: bool, rotation: i64| -> Dynamic {
            Dynamic::from(ScriptCommand { thrust, rotation })
        });

        engine.on_print(|text| {
            CONSOLE_BUFFER.with(|buffer| {
                buffer.borrow_mut().push(text.to_string());
            });
        });

        // Disable unsafe operations
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);
        engine.set_max_modules(0);
        engine.set_max_string_size(1_000_000);
        engine.disable_symbol("eval");

        Self {
            engine: Arc::new(engine),
            compiled_script: None,
            error_message: None,
            console_buffer: Vec::new(),
        }
    }
}

impl ScriptPilot {
    pub fn from_source(script: &str) -> Result<Self, ScriptError> {
        let mut pilot = Self::default();
        pilot.compile_script(script)?;
        Ok(pilot)
    }

    pub fn is_loaded(&self) -> bool {
        self.compiled_script.is_some()
    }

    pub fn compile_script(&mut self, script: &str) -> Result<(), ScriptError> {
        self.error_message = None;
        match self.engine.compile(script) {
            Ok(ast) => {
                self.compiled_script = Some(Arc::new(ast));
                Ok(())
            }
            Err(e) => {
                let error = ScriptError::Compile(e.to_string());
                self.error_message = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Asks the script for this frame's controls. `Ok(None)` when no script is loaded.
    pub fn command(
        &mut self,
        state: &LanderState,
        altitude: f32,
    ) -> Result<Option<PilotCommand>, ScriptError> {
        let Some(ast) = self.compiled_script.clone() else {
            return Ok(None);
        };

        CONSOLE_BUFFER.with(|buffer| buffer.borrow_mut().clear());

        let map = state_map(state, altitude);
        let mut scope = Scope::new();
        let result = self
            .engine
            .call_fn::<Dynamic>(&mut scope, &ast, "control", (map,));

        CONSOLE_BUFFER.with(|buffer| {
            self.console_buffer.extend(buffer.borrow_mut().drain(..));
        });

        let outcome = match result {
            Ok(value) => {
                let type_name = value.type_name().to_string();
                match value.try_cast::<ScriptCommand>() {
                    Some(command) => Ok(Some(PilotCommand {
                        thrust_on: command.thrust,
                        rotation: RotationInput::from_sign(command.rotation),
                    })),
                    None => Err(ScriptError::BadCommand(type_name)),
                }
            }
            Err(e) => Err(ScriptError::Runtime(e.to_string())),
        };

        self.error_message = outcome.as_ref().err().map(ToString::to_string);
        outcome
    }

    pub fn take_console_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console_buffer)
    }
}

fn state_map(state: &LanderState, altitude: f32) -> RhaiMap {
    let mut map = RhaiMap::new();
    map.insert("x".into(), Dynamic::from_float(state.position.x as f64));
    map.insert("y".into(), Dynamic::from_float(state.position.y as f64));
    map.insert("vx".into(), Dynamic::from_float(state.velocity.x as f64));
    map.insert("vy".into(), Dynamic::from_float(state.velocity.y as f64));
    map.insert("ax".into(), Dynamic::from_float(state.acceleration.x as f64));
    map.insert("ay".into(), Dynamic::from_float(state.acceleration.y as f64));
    map.insert("angle".into(), Dynamic::from_float(state.angle as f64));
    map.insert("altitude".into(), Dynamic::from_float(altitude as f64));
    map.insert("grounded".into(), Dynamic::from_bool(state.grounded));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhysicalConstants, SpawnPoint};

    fn state() -> LanderState {
        LanderState::spawn(&SpawnPoint::default(), &PhysicalConstants::default())
    }

    #[test]
    fn test_no_script_means_no_command() {
        let mut pilot = ScriptPilot::default();
        assert!(!pilot.is_loaded());
        assert_eq!(pilot.command(&state(), 10.0), Ok(None));
    }

    #[test]
    fn test_script_controls_thrust_and_rotation() {
        let mut pilot = ScriptPilot::from_source(
            r#"
            fn control(state) {
                if state.altitude < 20.0 {
                    pilot(true, -1)
                } else {
                    pilot(false, 1)
                }
            }
            "#,
        )
        .unwrap();

        assert_eq!(
            pilot.command(&state(), 30.0),
            Ok(Some(PilotCommand {
                thrust_on: false,
                rotation: RotationInput::Left,
            }))
        );
        assert_eq!(
            pilot.command(&state(), 5.0),
            Ok(Some(PilotCommand {
                thrust_on: true,
                rotation: RotationInput::Right,
            }))
        );
    }

    #[test]
    fn test_state_fields_are_visible_to_script() {
        let mut pilot = ScriptPilot::from_source(
            r#"
            fn control(state) {
                let upright = state.angle > 1.57 && state.angle < 1.58;
                pilot(upright && !state.grounded && state.ay < 0.0 && state.x == 200.0, 0)
            }
            "#,
        )
        .unwrap();
        let command = pilot.command(&state(), 0.0).unwrap().unwrap();
        assert!(command.thrust_on);
    }

    #[test]
    fn test_compile_error_is_reported() {
        let err = ScriptPilot::from_source("fn control(state) { pilot(").err().unwrap();
        assert!(matches!(err, ScriptError::Compile(_)));
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let mut pilot = ScriptPilot::from_source("fn other() { 1 }").unwrap();
        let err = pilot.command(&state(), 0.0).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
        assert!(pilot.error_message.is_some());
    }

    #[test]
    fn test_wrong_return_type_is_reported() {
        let mut pilot = ScriptPilot::from_source("fn control(state) { 42 }").unwrap();
        let err = pilot.command(&state(), 0.0).unwrap_err();
        assert!(matches!(err, ScriptError::BadCommand(_)));
    }

    #[test]
    fn test_print_goes_to_console() {
        let mut pilot = ScriptPilot::from_source(
            r#"
            fn control(state) {
                print("descending");
                pilot(false, 0)
            }
            "#,
        )
        .unwrap();
        pilot.command(&state(), 0.0).unwrap();
        assert_eq!(pilot.take_console_output(), vec!["descending".to_string()]);
        assert!(pilot.take_console_output().is_empty());
    }
}
