use anyhow::{bail, Context, Result};
use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*};
use clap::Parser;
use std::{fs, path::PathBuf, time::Duration};

mod config;
mod constants;
mod game_loop;
mod pilot;
mod simulation;
mod telemetry;

use config::LanderConfig;
use game_loop::{FlightLimits, LanderPlugin};
use pilot::ScriptPilot;
use simulation::{LanderState, LandingOutcome, Simulation};

/// Headless lunar lander: flies the lander from its spawn point down to the ground.
#[derive(Parser, Debug)]
#[command(name = "moon-lander")]
struct Cli {
    /// Physical constants and spawn point (RON)
    #[arg(long, default_value = "assets/lander.ron")]
    config: PathBuf,

    /// Rhai pilot script defining `fn control(state)`; without one the lander falls freely
    #[arg(long)]
    script: Option<PathBuf>,

    /// Stop after this many seconds of simulated flight
    #[arg(long, default_value_t = 300.0)]
    max_seconds: f32,

    /// Stop after this many touchdowns
    #[arg(long, default_value_t = 1)]
    landings: u32,

    /// Log filter, e.g. "info,moon_lander=debug"
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LanderConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let pilot = match &cli.script {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading pilot script {}", path.display()))?;
            let pilot = ScriptPilot::from_source(&source)
                .with_context(|| format!("compiling pilot script {}", path.display()))?;
            Some(pilot)
        }
        None => None,
    };

    let frame_time = Duration::from_secs_f64(1.0 / config.tick_rate_hz);

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame_time)),
        LogPlugin {
            filter: cli.log_filter.clone(),
            ..default()
        },
    ))
    .add_plugins(LanderPlugin {
        config,
        limits: FlightLimits {
            max_seconds: Some(cli.max_seconds),
            landings: Some(cli.landings),
        },
    });

    if let Some(pilot) = pilot {
        app.insert_resource(pilot);
    }

    app.world_mut()
        .resource_mut::<Simulation>()
        .subscribe(Box::new(|state: &LanderState, outcome: Option<LandingOutcome>| {
            trace!(
                "angle {:.2}° position {:?} velocity {:?} grounded {} outcome {:?}",
                state.angle_degrees(),
                state.position,
                state.velocity,
                state.grounded,
                outcome
            );
        }));

    match app.run() {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => bail!("simulation exited with code {code}"),
    }
}
