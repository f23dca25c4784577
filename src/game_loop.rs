use bevy::prelude::*;

use crate::{
    config::LanderConfig,
    pilot::ScriptPilot,
    simulation::{touchdown, LanderState, LandingOutcome, RotationInput, Simulation, TickInput},
    telemetry::Telemetry,
};

/// Discrete control changes from whatever input layer drives the lander.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Thrust(bool),
    Rotate(RotationInput),
    /// A single tap on a rotation button.
    Nudge(RotationInput),
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct LandingEvent {
    pub outcome: LandingOutcome,
    /// Velocity the lander hit the ground with, before the ground stopped it.
    pub impact_velocity: Vec2,
    pub state: LanderState,
}

/// Engine ignition and cutoff edges, for sound collaborators.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineEvent {
    pub firing: bool,
}

/// Latest control inputs. Events overwrite them; the next tick consumes them.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInput {
    pub rotation: RotationInput,
    pub thrust_on: bool,
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlightStatus {
    #[default]
    Flying,
    Finished,
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightLimits {
    pub max_seconds: Option<f32>,
    pub landings: Option<u32>,
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightLog {
    pub ticks: u64,
    pub flight_time: f32,
    pub safe_landings: u32,
    pub crashes: u32,
}

impl FlightLog {
    pub fn touchdowns(&self) -> u32 {
        self.safe_landings + self.crashes
    }
}

#[derive(Resource)]
pub struct TelemetryLogTimer(pub Timer);

/// Runs the lander at a fixed rate inside `FixedUpdate`.
pub struct LanderPlugin {
    pub config: LanderConfig,
    pub limits: FlightLimits,
}

impl Plugin for LanderPlugin {
    fn build(&self, app: &mut App) {
        let simulation = Simulation::new(self.config.physics.clone(), &self.config.spawn);

        app.insert_resource(Time::<Fixed>::from_hz(self.config.tick_rate_hz))
            .insert_resource(self.config.clone())
            .insert_resource(simulation)
            .insert_resource(self.limits)
            .init_resource::<ControlInput>()
            .init_resource::<FlightStatus>()
            .init_resource::<FlightLog>()
            .init_resource::<Telemetry>()
            .insert_resource(TelemetryLogTimer(Timer::from_seconds(
                1.0,
                TimerMode::Repeating,
            )))
            .add_event::<ControlEvent>()
            .add_event::<LandingEvent>()
            .add_event::<EngineEvent>()
            .add_systems(
                FixedUpdate,
                (
                    pilot_system,
                    apply_controls,
                    simulation_system,
                    respawn_system,
                    flight_limit_system,
                )
                    .chain()
                    .run_if(run_simulation),
            )
            .add_systems(Update, log_telemetry);
    }
}

fn run_simulation(status: Res<FlightStatus>) -> bool {
    *status == FlightStatus::Flying
}

fn pilot_system(
    pilot: Option<ResMut<ScriptPilot>>,
    simulation: Res<Simulation>,
    input: Res<ControlInput>,
    mut controls: EventWriter<ControlEvent>,
) {
    let Some(mut pilot) = pilot.filter(|pilot| pilot.is_loaded()) else {
        return;
    };

    let state = simulation.state();
    let altitude = touchdown::altitude(state.position, simulation.physics());
    let command = pilot.command(state, altitude);

    for line in pilot.take_console_output() {
        info!("[pilot] {line}");
    }

    match command {
        Ok(Some(command)) => {
            if command.thrust_on != input.thrust_on {
                controls.send(ControlEvent::Thrust(command.thrust_on));
            }
            if command.rotation != input.rotation {
                controls.send(ControlEvent::Rotate(command.rotation));
            }
        }
        Ok(None) => {}
        // keep the previous controls and try again next frame
        Err(e) => error!("Pilot script failed: {e}"),
    }
}

fn apply_controls(
    mut events: EventReader<ControlEvent>,
    mut input: ResMut<ControlInput>,
    mut simulation: ResMut<Simulation>,
) {
    for event in events.read() {
        match *event {
            ControlEvent::Thrust(on) => input.thrust_on = on,
            ControlEvent::Rotate(rotation) => input.rotation = rotation,
            ControlEvent::Nudge(direction) => {
                simulation.nudge(direction);
                debug!(
                    "Nudged {direction:?} by one {:.4}s frame",
                    simulation.last_dt()
                );
            }
        }
    }
}

fn simulation_system(
    time: Res<Time>,
    input: Res<ControlInput>,
    mut simulation: ResMut<Simulation>,
    mut telemetry: ResMut<Telemetry>,
    mut log: ResMut<FlightLog>,
    mut landings: EventWriter<LandingEvent>,
    mut engine: EventWriter<EngineEvent>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    let before = *simulation.state();
    let outcome = simulation.step(TickInput {
        dt,
        rotation: input.rotation,
        thrust_on: input.thrust_on,
    });

    let state = *simulation.state();
    log.ticks += 1;
    log.flight_time += dt;
    *telemetry = Telemetry::capture(
        &state,
        dt,
        touchdown::altitude(state.position, simulation.physics()),
    );

    if state.thrust_on != before.thrust_on {
        engine.send(EngineEvent {
            firing: state.thrust_on,
        });
    }

    if let Some(outcome) = outcome {
        match outcome {
            LandingOutcome::Safe => {
                log.safe_landings += 1;
                info!(
                    "Touchdown at {:.1}s: safe landing (velocity x: {:.2} y: {:.2} m/s)",
                    log.flight_time, before.velocity.x, before.velocity.y
                );
            }
            LandingOutcome::Crashed => {
                log.crashes += 1;
                warn!(
                    "Touchdown at {:.1}s: crashed (velocity x: {:.2} y: {:.2} m/s)",
                    log.flight_time, before.velocity.x, before.velocity.y
                );
            }
        }
        landings.send(LandingEvent {
            outcome,
            impact_velocity: before.velocity,
            state,
        });
    }
}

fn respawn_system(
    config: Res<LanderConfig>,
    mut landings: EventReader<LandingEvent>,
    mut simulation: ResMut<Simulation>,
    mut input: ResMut<ControlInput>,
    mut engine: EventWriter<EngineEvent>,
) {
    if !config.respawn_on_crash {
        landings.clear();
        return;
    }
    let crashes = landings
        .read()
        .filter(|event| event.outcome == LandingOutcome::Crashed)
        .count();
    if crashes > 0 {
        info!("Respawning at {:?}", config.spawn.position);
        let was_firing = simulation.state().thrust_on;
        simulation.respawn(&config.spawn);
        *input = ControlInput::default();
        if was_firing {
            engine.send(EngineEvent { firing: false });
        }
    }
}

fn flight_limit_system(
    limits: Res<FlightLimits>,
    log: Res<FlightLog>,
    mut status: ResMut<FlightStatus>,
    mut exit: EventWriter<AppExit>,
) {
    let out_of_time = limits
        .max_seconds
        .is_some_and(|max| log.flight_time >= max);
    let enough_landings = limits
        .landings
        .is_some_and(|target| log.touchdowns() >= target);

    if out_of_time || enough_landings {
        info!(
            "Flight over after {:.1}s and {} ticks: {} safe, {} crashed",
            log.flight_time, log.ticks, log.safe_landings, log.crashes
        );
        *status = FlightStatus::Finished;
        exit.send(AppExit::Success);
    }
}

fn log_telemetry(
    time: Res<Time>,
    mut timer: ResMut<TelemetryLogTimer>,
    telemetry: Res<Telemetry>,
) {
    if timer.0.tick(time.delta()).just_finished() {
        debug!("{}", *telemetry);
    }
}
