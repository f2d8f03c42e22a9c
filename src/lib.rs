//! Piecewise integration of compartmental models
//!
//! `episolve` integrates small compartmental ODE models (enzyme kinetics and SIR/SEIR epidemics)
//! over consecutive time segments, each with its own rate parameters, and hands the state over
//! from one segment to the next. Observed case or death counts can be loaded from a CSV file and
//! overlaid on the simulated curves.

pub mod entrypoints;
pub mod logger;
pub mod routines {
    pub mod data;
    pub mod output;
    pub mod plot;
    pub mod settings;
}
pub mod simulator;

#[cfg(test)]
mod tests;

/// Unpack a vector into named scalars, in order
///
/// ```
/// use episolve::fetch_params;
/// let p = nalgebra::DVector::from_vec(vec![0.2, 0.065]);
/// fetch_params!(p, r, a);
/// assert_eq!((r, a), (0.2, 0.065));
/// ```
#[macro_export]
macro_rules! fetch_params {
    ($p:expr, $($name:ident),*) => {
        let p = &$p;
        let mut idx = 0;
        $(
            let $name = p[idx];
            idx += 1;
        )*
        let _ = idx;
    };
}

pub mod prelude {
    pub use crate::entrypoints::{run, run_from_file, solve, SimulationResult};
    pub use crate::routines::data::{ObservedSeries, Table};
    pub use crate::routines::plot::{Curve, Figure};
    pub use crate::routines::settings::{ModelSettings, ObservedSettings, SegmentSettings, Settings};
    pub use crate::simulator::models::{
        michaelis_constant, peak_complex_estimate, EpidemicRates, SeirScenario,
    };
    pub use crate::simulator::{
        simulate, simulate_piecewise, DiffEq, Integrator, Model, ModelKind,
        PiecewiseRun, Segment, Solver, Trajectory, T, V,
    };
    pub use crate::{fetch_params, logger};
}
