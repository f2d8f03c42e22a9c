//! Enzyme kinetics (hydrolases)
//!
//! E + S <-> ES -> E + P1, integrated under mass action and compared with the estimate of the
//! peak enzyme-substrate concentration.

use episolve::prelude::*;
use episolve::routines::output::OutputFile;
use eyre::Result;

// Rate constants
const KP1: f64 = 2.0; // E + S -> ES
const KP2: f64 = 1.9; // ES -> E + P1
const KM1: f64 = 1.5; // ES -> E + S
const E0: f64 = 2.0; // initial enzyme concentration

// Initial concentrations
const C0: f64 = 0.0;
const S0: f64 = 10.0;

const T_STOP: f64 = 10.0;

fn main() -> Result<()> {
    let settings = Settings::new(ModelKind::Enzyme)
        .with_initial("s", S0)
        .with_initial("c", C0)
        .with_segment(
            "reaction",
            (0.0, T_STOP, T_STOP / 300.0),
            &[("kp1", KP1), ("kp2", KP2), ("km1", KM1), ("e0", E0)],
        );

    let result = run(settings)?;

    let cmax = peak_complex_estimate(KP1, KP2, KM1, E0, S0);
    tracing::info!("Cmax = {}", cmax);
    if let Some((t, c)) = result.trajectory.peak("c")? {
        tracing::info!("Simulated peak of ES: {} at t = {}", c, t);
    }

    let chart = OutputFile::new(&result.settings.paths.output_folder, "hydrolases.svg")?;
    result
        .figure()?
        .hline("max(ES)", cmax)
        .render(chart.relative_path())?;

    Ok(())
}
