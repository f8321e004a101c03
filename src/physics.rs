use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::solver::{RunSchedule, Simulation, SpectralGrid};
use crate::state::{self, DiagnosticRecord, InitialCondition, Snapshot};

/// Build the simulation described by a configuration, including its
/// initial condition.
pub fn create_simulation(cfg: &Config) -> Result<Simulation> {
    cfg.validate()?;
    let grid = SpectralGrid::from_dims(cfg.grid.nx, cfg.grid.ny, cfg.grid.lx, cfg.grid.ly)?;
    let params = cfg.solver_params();
    let dt = cfg.schedule().dt;
    match cfg.initial.kind {
        InitialCondition::McWilliams => {
            let mut rng = match params.seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let zeta = state::mcwilliams(&grid, &mut rng)?;
            Simulation::new(grid, params, zeta, dt)
        }
        InitialCondition::Gaussian => {
            let ic = &cfg.initial;
            let zeta = state::gaussian_blob(grid.mesh(), ic.amplitude, ic.x0, ic.y0, ic.sigma);
            Simulation::from_real(grid, params, &zeta, dt)
        }
    }
}

/// Output of the run loop, in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RunEvent {
    Diagnostic(DiagnosticRecord),
    Snapshot(Box<Snapshot>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub time: f64,
    /// Last dt used.
    pub dt: f64,
    pub courant: f64,
    /// Stopped by the running flag before reaching tmax.
    pub interrupted: bool,
}

/// Step until t >= tmax or `running` clears.
///
/// A diagnostic and a snapshot are emitted for the initial state; after that
/// each is emitted on the first step whose time passes its next due time,
/// which then moves to the current time plus the interval.
pub fn run(
    sim: &mut Simulation,
    schedule: &RunSchedule,
    running: &AtomicBool,
    mut sink: impl FnMut(RunEvent),
) -> Result<RunSummary> {
    schedule.validate()?;
    let start = sim.state().time;
    let mut next_diag = start + schedule.diag_every;
    let mut next_plot = start + schedule.plot_every;
    sink(RunEvent::Diagnostic(sim.diagnostic()?));
    sink(RunEvent::Snapshot(Box::new(sim.snapshot()?)));

    let mut steps = 0;
    while running.load(Ordering::SeqCst) && sim.state().time < schedule.tmax {
        let report = sim.step()?;
        steps += 1;
        if report.time > next_diag {
            sink(RunEvent::Diagnostic(sim.diagnostic()?));
            next_diag = report.time + schedule.diag_every;
        }
        if report.time > next_plot {
            sink(RunEvent::Snapshot(Box::new(sim.snapshot()?)));
            next_plot = report.time + schedule.plot_every;
        }
    }

    let s = sim.state();
    let summary = RunSummary {
        steps,
        time: s.time,
        dt: s.dt,
        courant: s.courant,
        interrupted: s.time < schedule.tmax,
    };
    info!("run finished: {steps} steps, t = {:.4}, dt = {:.4e}", s.time, s.dt);
    Ok(summary)
}

/// Run the loop on a worker thread, forwarding events over a channel.
/// A dropped receiver clears `running`, which stops the loop.
pub fn spawn_physics_thread(
    mut sim: Simulation,
    schedule: RunSchedule,
    running: Arc<AtomicBool>,
) -> (mpsc::Receiver<RunEvent>, JoinHandle<Result<RunSummary>>) {
    let (tx, rx) = mpsc::channel::<RunEvent>();
    let handle = std::thread::spawn(move || {
        let flag = running.clone();
        run(&mut sim, &schedule, &running, move |event| {
            if tx.send(event).is_err() {
                flag.store(false, Ordering::SeqCst);
            }
        })
    });
    (rx, handle)
}
