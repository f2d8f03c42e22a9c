//! A simple epidemic, after J.D. Murray, Mathematical Biology, chapter 19.1
//!
//! Runs the segments configured in `demos/lockdown.toml` (before, during and after a lockdown)
//! and overlays the cumulative deaths observed in New York City.

use episolve::prelude::*;
use episolve::routines::settings::read_settings;
use eyre::Result;

const SETTINGS: &str = "demos/lockdown.toml";

fn main() -> Result<()> {
    let settings = read_settings(SETTINGS)?;
    let result = run(settings)?;

    if result.settings.model.kind == ModelKind::Enzyme {
        tracing::warn!("{} configures enzyme kinetics, not an epidemic", SETTINGS);
        return Ok(());
    }

    // An epidemic only occurs while S exceeds a / r
    let thresholds = result.thresholds()?;
    for ((label, trajectory), (_, threshold)) in result.run.segments().zip(&thresholds) {
        let susceptibles = trajectory.first_state().map(|state| state[0]);
        tracing::info!(
            "Segment '{}': threshold = {}, S at start = {:?}",
            label,
            threshold,
            susceptibles
        );
    }

    if result.trajectory.compartments().iter().any(|c| c == "D") {
        if let Some(deaths) = result.trajectory.column("D")?.last() {
            tracing::info!("Simulated deaths (population fraction): {}", deaths);
        }
    }

    Ok(())
}
