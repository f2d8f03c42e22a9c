pub mod models;
pub mod solvers;
pub mod trajectory;

use eyre::{bail, Result};

pub use models::{Model, ModelKind};
pub use solvers::Solver;
pub use trajectory::{PiecewiseRun, Trajectory};

pub type T = f64;
pub type V = nalgebra::DVector<T>;

/// Right-hand side of a compartmental model
///
/// Arguments are the current state, the time, the rate parameters, and the derivative to be
/// written, in the order of the model's compartments.
pub type DiffEq = fn(&V, T, &V, &mut V);

/// A numerical integration backend
///
/// Given a derivative function with its parameters, an initial state and a monotonic time grid,
/// an integrator returns the state sampled at every requested time. The first sample is the
/// initial state itself.
pub trait Integrator {
    fn integrate(&self, diffeq: DiffEq, params: &V, y0: &V, times: &[T]) -> Result<Vec<V>>;

    /// Check the integrator's own settings before any integration starts
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A contiguous interval of simulated time with a fixed set of rate parameters
///
/// The interval is half-open, `[start, end)`, and sampled every `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub start: T,
    pub end: T,
    pub step: T,
    pub params: V,
}

impl Segment {
    pub fn new(start: T, end: T, step: T, params: V) -> Self {
        Segment {
            label: String::new(),
            start,
            end,
            step,
            params,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sample times `start, start + step, ...`, strictly below `end`
    ///
    /// Empty when `end <= start`.
    pub fn times(&self) -> Vec<T> {
        if self.end <= self.start || self.step <= 0.0 {
            return vec![];
        }
        let n = ((self.end - self.start) / self.step).ceil() as usize;
        (0..n)
            .map(|i| self.start + i as T * self.step)
            .collect()
    }
}

/// Integrate a model over a single segment
pub fn simulate<I>(model: &Model, integrator: &I, y0: &V, segment: &Segment) -> Result<Trajectory>
where
    I: Integrator + ?Sized,
{
    integrator.validate()?;
    validate(model, y0, std::slice::from_ref(segment))?;
    integrate_segment(model, integrator, y0, segment)
}

/// Integrate a model over consecutive segments, handing the state over at every boundary
///
/// The first segment starts from `y0`. Every following segment starts from the last sampled
/// state of the segment before it. Segments without samples pass the state through unchanged.
pub fn simulate_piecewise<I>(
    model: &Model,
    integrator: &I,
    y0: &V,
    segments: &[Segment],
) -> Result<PiecewiseRun>
where
    I: Integrator + ?Sized,
{
    integrator.validate()?;
    validate(model, y0, segments)?;

    let mut run = PiecewiseRun::new();
    let mut state = y0.clone();
    for segment in segments {
        let trajectory = integrate_segment(model, integrator, &state, segment)?;
        match trajectory.last_state() {
            Some(last) => state = last.clone(),
            None => tracing::debug!(
                "Segment '{}' [{}, {}) is empty, carrying the state forward",
                segment.label,
                segment.start,
                segment.end
            ),
        }
        run.push(segment.label.clone(), trajectory);
    }
    Ok(run)
}

fn integrate_segment<I>(model: &Model, integrator: &I, y0: &V, segment: &Segment) -> Result<Trajectory>
where
    I: Integrator + ?Sized,
{
    let times = segment.times();
    tracing::debug!(
        "Integrating {} model over '{}' [{}, {}) with {} samples",
        model.kind(),
        segment.label,
        segment.start,
        segment.end,
        times.len()
    );
    let states = integrator.integrate(model.diffeq(), &segment.params, y0, &times)?;
    Trajectory::from_samples(model.compartments(), times, states)
}

fn validate(model: &Model, y0: &V, segments: &[Segment]) -> Result<()> {
    if y0.len() != model.nstates() {
        bail!(
            "Initial state has {} compartments, the {} model has {}",
            y0.len(),
            model.kind(),
            model.nstates()
        );
    }
    for segment in segments {
        if segment.params.len() != model.nparams() {
            bail!(
                "Segment '{}' has {} parameters, the {} model expects {:?}",
                segment.label,
                segment.params.len(),
                model.kind(),
                model.parameters()
            );
        }
        if !(segment.step > 0.0) {
            bail!(
                "Segment '{}' has a non-positive step of {}",
                segment.label,
                segment.step
            );
        }
    }
    Ok(())
}
