use eyre::{bail, eyre, Result};
use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, Rk4};
use serde_derive::{Deserialize, Serialize};

use crate::simulator::{DiffEq, Integrator, T, V};

const RTOL: f64 = 1e-6;
const ATOL: f64 = 1e-8;
const RK4_STEP: f64 = 0.01;

// Step control for the Dormand-Prince stepper, as recommended by Hairer
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const MAX_STEPS: u32 = 100_000;
const STIFFNESS_CHECK: u32 = 1000;

/// Integration backends provided by `ode_solvers`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Solver {
    /// Adaptive Dormand-Prince 5(4)
    Dopri5 {
        #[serde(default = "default_rtol")]
        rtol: f64,
        #[serde(default = "default_atol")]
        atol: f64,
    },
    /// Classic fixed-step Runge-Kutta, `step` being the largest internal step
    Rk4 {
        #[serde(default = "default_rk4_step")]
        step: f64,
    },
}

impl Default for Solver {
    fn default() -> Self {
        Solver::Dopri5 {
            rtol: RTOL,
            atol: ATOL,
        }
    }
}

impl Solver {
    pub fn dopri5(rtol: f64, atol: f64) -> Self {
        Solver::Dopri5 { rtol, atol }
    }

    pub fn rk4(step: f64) -> Self {
        Solver::Rk4 { step }
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        bail!("The solver {} must be positive and finite, got {}", name, value);
    }
    Ok(())
}

struct OdeSystem<'a> {
    diffeq: DiffEq,
    params: &'a V,
}

impl ode_solvers::System<T, V> for OdeSystem<'_> {
    fn system(&self, t: T, y: &V, dy: &mut V) {
        (self.diffeq)(y, t, self.params, dy)
    }
}

impl Integrator for Solver {
    fn integrate(&self, diffeq: DiffEq, params: &V, y0: &V, times: &[T]) -> Result<Vec<V>> {
        self.validate()?;
        let mut states = Vec::with_capacity(times.len());
        let mut x = y0.clone();
        for (index, &t) in times.iter().enumerate() {
            if index > 0 {
                x = self.advance(diffeq, params, x, times[index - 1], t)?;
            }
            states.push(x.clone());
        }
        Ok(states)
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Solver::Dopri5 { rtol, atol } => {
                positive("rtol", rtol)?;
                positive("atol", atol)
            }
            Solver::Rk4 { step } => positive("step", step),
        }
    }
}

impl Solver {
    /// Advance the state `x` from `ti` to `tf`
    fn advance(&self, diffeq: DiffEq, params: &V, x: V, ti: T, tf: T) -> Result<V> {
        if ti > tf {
            return Err(eyre!("Time grid is not monotonic: {} follows {}", tf, ti));
        } else if ti == tf {
            return Ok(x);
        }
        let system = OdeSystem { diffeq, params };
        let (x_out, y_out) = match *self {
            Solver::Dopri5 { rtol, atol } => {
                let mut stepper = Dopri5::from_param(
                    system,
                    ti,
                    tf,
                    0.0,
                    x,
                    rtol,
                    atol,
                    SAFETY_FACTOR,
                    BETA,
                    FAC_MIN,
                    FAC_MAX,
                    tf - ti,
                    0.0,
                    MAX_STEPS,
                    STIFFNESS_CHECK,
                    OutputType::Sparse,
                );
                stepper
                    .integrate()
                    .map_err(|e| eyre!("Dopri5 failed between t = {} and {}: {:?}", ti, tf, e))?;
                (stepper.x_out().to_vec(), stepper.y_out().to_vec())
            }
            Solver::Rk4 { step } => {
                let nsteps = ((tf - ti) / step).ceil().max(1.0);
                let mut stepper = Rk4::new(system, ti, x, tf, (tf - ti) / nsteps);
                stepper
                    .integrate()
                    .map_err(|e| eyre!("Rk4 failed between t = {} and {}: {:?}", ti, tf, e))?;
                (stepper.x_out().to_vec(), stepper.y_out().to_vec())
            }
        };
        closest_to(&x_out, y_out, tf)
    }
}

/// The output state whose time is closest to `t`
fn closest_to(x_out: &[T], y_out: Vec<V>, t: T) -> Result<V> {
    let index = x_out
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - t).abs().total_cmp(&(*b - t).abs()))
        .map(|(index, _)| index)
        .ok_or_else(|| eyre!("The integrator returned no output for t = {}", t))?;
    y_out
        .into_iter()
        .nth(index)
        .ok_or_else(|| eyre!("The integrator returned no state for t = {}", t))
}

fn default_rtol() -> f64 {
    RTOL
}

fn default_atol() -> f64 {
    ATOL
}

fn default_rk4_step() -> f64 {
    RK4_STEP
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decay(y: &V, _t: T, p: &V, dy: &mut V) {
        dy[0] = -p[0] * y[0];
    }

    #[test]
    fn exponential_decay() {
        let params = V::from_vec(vec![0.5]);
        let y0 = V::from_vec(vec![1.0]);
        let times = vec![0.0, 0.5, 1.0, 2.0, 4.0];
        for solver in [Solver::default(), Solver::rk4(0.01)] {
            let states = solver.integrate(decay, &params, &y0, &times).unwrap();
            assert_eq!(states.len(), times.len());
            assert_eq!(states[0], y0);
            for (t, state) in times.iter().zip(&states) {
                assert_relative_eq!(state[0], (-0.5 * t).exp(), max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn empty_grid() {
        let states = Solver::default()
            .integrate(decay, &V::from_vec(vec![0.5]), &V::from_vec(vec![1.0]), &[])
            .unwrap();
        assert!(states.is_empty());
    }

    #[test]
    fn rejects_decreasing_times() {
        let result = Solver::rk4(0.1).integrate(
            decay,
            &V::from_vec(vec![0.5]),
            &V::from_vec(vec![1.0]),
            &[1.0, 0.5],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_invalid_rk4_step() {
        let params = V::from_vec(vec![0.5]);
        let y0 = V::from_vec(vec![1.0]);
        let times = [0.0, 0.5, 1.0];
        assert!(Solver::rk4(0.0).integrate(decay, &params, &y0, &times).is_err());
        assert!(Solver::rk4(-0.01).integrate(decay, &params, &y0, &times).is_err());
        assert!(Solver::rk4(0.01).validate().is_ok());
        assert!(Solver::dopri5(-1e-6, 1e-8).validate().is_err());
        assert!(Solver::default().validate().is_ok());
    }

    #[test]
    fn solver_from_json() {
        #[derive(Deserialize)]
        struct Wrapper {
            solver: Solver,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"solver": {"kind": "rk4"}}"#).unwrap();
        assert_eq!(parsed.solver, Solver::rk4(RK4_STEP));
        let parsed: Wrapper =
            serde_json::from_str(r#"{"solver": {"kind": "dopri5", "rtol": 1e-9}}"#).unwrap();
        assert_eq!(parsed.solver, Solver::dopri5(1e-9, ATOL));
    }
}
