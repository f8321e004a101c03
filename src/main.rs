use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use barovort::config;
use barovort::physics::{self, RunEvent};
use serde_json::json;

/// Command-line overrides on top of the YAML configuration.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    tmax: Option<f64>,
    seed: Option<u64>,
}

/// Parse `--config PATH`, `--tmax T` and `--seed N`.
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut out = CliArgs::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("missing value for {flag}"));
        match flag.as_str() {
            "--config" => out.config = Some(PathBuf::from(value()?)),
            "--tmax" => {
                let v = value()?;
                out.tmax = Some(v.parse().map_err(|e| format!("invalid --tmax {v}: {e}"))?);
            }
            "--seed" => {
                let v = value()?;
                out.seed = Some(v.parse().map_err(|e| format!("invalid --seed {v}: {e}"))?);
            }
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok(out)
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("barovort: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let mut cfg = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(tmax) = cli.tmax {
        cfg.run.tmax = tmax;
    }
    if cli.seed.is_some() {
        cfg.run.seed = cli.seed;
    }

    let sim = physics::create_simulation(&cfg)?;
    let schedule = cfg.schedule();

    // Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let (events, physics_thread) = physics::spawn_physics_thread(sim, schedule, running.clone());

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for event in events {
        let line = match &event {
            RunEvent::Diagnostic(_) => serde_json::to_string(&event)?,
            // full fields stay in memory; the console gets the scalars
            RunEvent::Snapshot(s) => json!({
                "event": "snapshot",
                "step": s.step,
                "time": s.time,
                "dt": s.dt,
                "courant": s.courant,
                "urms": s.urms,
                "max_vorticity": s.max_vorticity,
                "rhines_scale": s.rhines_scale,
                "dissipation_scale": s.dissipation_scale,
            })
            .to_string(),
        };
        if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
            running.store(false, Ordering::SeqCst);
            break;
        }
    }

    let summary = physics_thread
        .join()
        .map_err(|_| "physics thread panicked")??;
    log::info!(
        "stopped at step {} (t = {:.4}){}",
        summary.steps,
        summary.time,
        if summary.interrupted { ", interrupted" } else { "" }
    );
    Ok(())
}
