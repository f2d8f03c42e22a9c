use std::collections::HashMap;
use std::fmt;

use eyre::{bail, Result};
use serde_derive::{Deserialize, Serialize};

use crate::fetch_params;
use crate::simulator::{DiffEq, T, V};

/// The compartmental models that can be simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Enzyme kinetics (hydrolases), state `(s, c)`
    Enzyme,
    /// Susceptible-Infective-Removed
    Sir,
    /// SIR with a separate compartment for deaths
    SirDeath,
    /// SIR with an exposed (incubating) compartment and deaths
    SeirDeath,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Enzyme => "enzyme",
            ModelKind::Sir => "sir",
            ModelKind::SirDeath => "sir_death",
            ModelKind::SeirDeath => "seir_death",
        };
        write!(f, "{}", name)
    }
}

/// A model couples a derivative function with the names of its compartments and parameters
///
/// The order of `compartments` is the order of the state vector, and the order of `parameters`
/// is the order in which the derivative function expects its rate constants.
#[derive(Debug, Clone)]
pub struct Model {
    kind: ModelKind,
    diffeq: DiffEq,
    compartments: &'static [&'static str],
    parameters: &'static [&'static str],
}

impl Model {
    pub fn new(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Enzyme => Model {
                kind,
                diffeq: enzyme,
                compartments: &["s", "c"],
                parameters: &["kp1", "kp2", "km1", "e0"],
            },
            ModelKind::Sir => Model {
                kind,
                diffeq: sir,
                compartments: &["S", "I", "R"],
                parameters: &["r", "a"],
            },
            ModelKind::SirDeath => Model {
                kind,
                diffeq: sir_death,
                compartments: &["S", "I", "R", "D"],
                parameters: &["r", "a", "d"],
            },
            ModelKind::SeirDeath => Model {
                kind,
                diffeq: seir_death,
                compartments: &["S", "E", "I", "R", "D"],
                parameters: &["r", "a", "d", "c"],
            },
        }
    }

    pub fn enzyme() -> Self {
        Self::new(ModelKind::Enzyme)
    }

    pub fn sir() -> Self {
        Self::new(ModelKind::Sir)
    }

    pub fn sir_death() -> Self {
        Self::new(ModelKind::SirDeath)
    }

    pub fn seir_death() -> Self {
        Self::new(ModelKind::SeirDeath)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn diffeq(&self) -> DiffEq {
        self.diffeq
    }

    pub fn compartments(&self) -> &'static [&'static str] {
        self.compartments
    }

    pub fn parameters(&self) -> &'static [&'static str] {
        self.parameters
    }

    pub fn nstates(&self) -> usize {
        self.compartments.len()
    }

    pub fn nparams(&self) -> usize {
        self.parameters.len()
    }

    /// The value of a named parameter in an ordered parameter vector
    pub fn parameter(&self, params: &V, name: &str) -> Option<f64> {
        position(self.parameters, name).and_then(|index| params.get(index).copied())
    }

    /// Evaluate the derivative at `(y, t)` for the given parameters
    pub fn derivative(&self, y: &V, t: T, params: &V) -> V {
        let mut dy = V::zeros(self.nstates());
        (self.diffeq)(y, t, params, &mut dy);
        dy
    }

    /// Build a state vector from compartment values given by name
    ///
    /// Compartments that are not present in `values` start at zero.
    pub fn state_from_map(&self, values: &HashMap<String, f64>) -> Result<V> {
        if let Some(unknown) = values
            .keys()
            .find(|key| position(self.compartments, key).is_none())
        {
            bail!(
                "Compartment {} is not part of the {} model, expected one of {:?}",
                unknown,
                self.kind,
                self.compartments
            );
        }
        let mut state = V::zeros(self.nstates());
        for (name, value) in values {
            if let Some(index) = position(self.compartments, name) {
                state[index] = *value;
            }
        }
        Ok(state)
    }

    /// Build an ordered parameter vector from rate constants given by name
    ///
    /// Every parameter of the model must be present, and no others.
    pub fn params_from_map(&self, values: &HashMap<String, f64>) -> Result<V> {
        if let Some(unknown) = values
            .keys()
            .find(|key| position(self.parameters, key).is_none())
        {
            bail!(
                "Parameter {} is not used by the {} model, expected {:?}",
                unknown,
                self.kind,
                self.parameters
            );
        }
        let mut params = V::zeros(self.nparams());
        for (i, name) in self.parameters.iter().enumerate() {
            match values.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some((_, value)) => params[i] = *value,
                None => bail!("Parameter {} is missing for the {} model", name, self.kind),
            }
        }
        Ok(params)
    }
}

// Names are matched ignoring case, the configuration layer may lowercase keys
fn position(names: &[&str], key: &str) -> Option<usize> {
    names.iter().position(|name| name.eq_ignore_ascii_case(key))
}

/// Enzyme kinetics under mass action
///
/// E + S <-> ES -> E + P1, with `c = [ES]`, `s = [S]` and `[E] = e0 - c`.
pub fn enzyme(y: &V, _t: T, p: &V, dy: &mut V) {
    fetch_params!(p, kp1, kp2, km1, e0);
    fetch_params!(y, s, c);
    dy[0] = -kp1 * (e0 - c) * s + km1 * c;
    dy[1] = -(km1 + kp2) * c + kp1 * (e0 - c) * s;
}

/// Kermack-McKendrick SIR model
pub fn sir(y: &V, _t: T, p: &V, dy: &mut V) {
    fetch_params!(p, r, a);
    fetch_params!(y, s, i);
    dy[0] = -r * s * i;
    dy[1] = r * s * i - a * i;
    dy[2] = a * i;
}

/// SIR model where infectives are also lost to deaths at rate `d`
pub fn sir_death(y: &V, _t: T, p: &V, dy: &mut V) {
    fetch_params!(p, r, a, d);
    fetch_params!(y, s, i);
    dy[0] = -r * s * i;
    dy[1] = r * s * i - (a + d) * i;
    dy[2] = a * i;
    dy[3] = d * i;
}

/// SEIR model with deaths, `c` being the rate at which exposed individuals become infective
pub fn seir_death(y: &V, _t: T, p: &V, dy: &mut V) {
    fetch_params!(p, r, a, d, c);
    fetch_params!(y, s, e, i);
    dy[0] = -r * s * i;
    dy[1] = r * s * i - c * e;
    dy[2] = c * e - (a + d) * i;
    dy[3] = (a - d) * i;
    dy[4] = d * i;
}

/// The Michaelis constant `km = (km1 + kp2) / kp1`
pub fn michaelis_constant(kp1: f64, kp2: f64, km1: f64) -> f64 {
    (km1 + kp2) / kp1
}

/// Estimate of the peak enzyme-substrate complex concentration
///
/// Only meaningful when the initial substrate far exceeds the enzyme, `s0 >> e0`.
pub fn peak_complex_estimate(kp1: f64, kp2: f64, km1: f64, e0: f64, s0: f64) -> f64 {
    e0 * s0 / (s0 + michaelis_constant(kp1, kp2, km1))
}

/// Epidemic rates derived from interventions
///
/// The infection rate is reduced by social distancing, and quarantine adds to the rate at which
/// infectives are removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpidemicRates {
    pub infection_rate: f64,
    pub distancing_factor: f64,
    pub recovery_rate: f64,
    pub quarantine_rate: f64,
    pub death_rate: f64,
}

impl Default for EpidemicRates {
    fn default() -> Self {
        EpidemicRates {
            infection_rate: 0.2,
            distancing_factor: 0.0,
            recovery_rate: 0.065,
            quarantine_rate: 0.0,
            death_rate: 0.01,
        }
    }
}

impl EpidemicRates {
    /// Effective infection rate `r`
    pub fn r(&self) -> f64 {
        self.infection_rate * (1.0 - self.distancing_factor)
    }

    /// Removal rate `a`
    pub fn a(&self) -> f64 {
        self.quarantine_rate + self.recovery_rate
    }

    /// Death rate `d`
    pub fn d(&self) -> f64 {
        self.death_rate
    }

    /// Susceptible fraction above which the number of infectives grows, `a / r`
    pub fn threshold(&self) -> f64 {
        self.a() / self.r()
    }

    /// The derived `r`, `a` and `d` that the model takes, by name
    ///
    /// Fails for models without any of these parameters.
    pub fn parameters_for(&self, model: &Model) -> Result<HashMap<String, f64>> {
        let derived = [("r", self.r()), ("a", self.a()), ("d", self.d())];
        let named: HashMap<String, f64> = derived
            .into_iter()
            .filter(|(name, _)| position(model.parameters(), name).is_some())
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        if named.is_empty() {
            bail!(
                "Epidemic rates do not apply to the {} model, expected {:?}",
                model.kind(),
                model.parameters()
            );
        }
        Ok(named)
    }
}

/// The default SEIR scenario, over one time unit
#[derive(Debug, Clone, PartialEq)]
pub struct SeirScenario {
    pub r: f64,
    pub a: f64,
    pub d: f64,
    pub c: f64,
    pub i0: f64,
    pub r0: f64,
    pub d0: f64,
    pub t_start: f64,
    pub t_stop: f64,
    pub t_inc: f64,
}

impl Default for SeirScenario {
    fn default() -> Self {
        SeirScenario {
            r: 0.4,
            a: 0.01,
            d: 0.01,
            c: 0.2,
            i0: 0.0001,
            r0: 0.0,
            d0: 0.0,
            t_start: 0.0,
            t_stop: 1.0,
            t_inc: 0.01,
        }
    }
}

impl SeirScenario {
    /// Initial state `(S, E, I, R, D)`, with everyone not infective or removed being susceptible
    pub fn initial_state(&self) -> V {
        let s0 = 1.0 - self.r0 - self.i0;
        V::from_vec(vec![s0, 0.0, self.i0, self.r0, self.d0])
    }

    pub fn parameters(&self) -> V {
        V::from_vec(vec![self.r, self.a, self.d, self.c])
    }
}
