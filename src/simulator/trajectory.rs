use eyre::{bail, eyre, Result};
use ndarray::Array2;

use crate::simulator::{T, V};

/// Time-ordered samples of a model state
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    compartments: Vec<String>,
    times: Vec<T>,
    states: Vec<V>,
}

impl Trajectory {
    pub fn new(compartments: &[&str]) -> Self {
        Trajectory {
            compartments: compartments.iter().map(|c| c.to_string()).collect(),
            times: vec![],
            states: vec![],
        }
    }

    pub fn from_samples(compartments: &[&str], times: Vec<T>, states: Vec<V>) -> Result<Self> {
        if times.len() != states.len() {
            bail!(
                "Got {} sample times but {} states from the integrator",
                times.len(),
                states.len()
            );
        }
        let mut trajectory = Trajectory::new(compartments);
        trajectory.times = times;
        trajectory.states = states;
        Ok(trajectory)
    }

    pub fn push(&mut self, time: T, state: V) {
        self.times.push(time);
        self.states.push(state);
    }

    /// Append the samples of another trajectory of the same model
    pub fn extend(&mut self, other: &Trajectory) {
        self.times.extend_from_slice(&other.times);
        self.states.extend(other.states.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn compartments(&self) -> &[String] {
        &self.compartments
    }

    pub fn times(&self) -> &[T] {
        &self.times
    }

    pub fn states(&self) -> &[V] {
        &self.states
    }

    pub fn first_state(&self) -> Option<&V> {
        self.states.first()
    }

    pub fn last_state(&self) -> Option<&V> {
        self.states.last()
    }

    fn index_of(&self, compartment: &str) -> Result<usize> {
        self.compartments
            .iter()
            .position(|c| c == compartment)
            .ok_or_else(|| {
                eyre!(
                    "Unknown compartment {}, expected one of {:?}",
                    compartment,
                    self.compartments
                )
            })
    }

    /// The values of one compartment over time
    pub fn column(&self, compartment: &str) -> Result<Vec<T>> {
        let index = self.index_of(compartment)?;
        Ok(self.states.iter().map(|state| state[index]).collect())
    }

    /// Time and value of the largest sample of a compartment
    pub fn peak(&self, compartment: &str) -> Result<Option<(T, T)>> {
        let values = self.column(compartment)?;
        Ok(self
            .times
            .iter()
            .zip(values)
            .fold(None, |best: Option<(T, T)>, (&t, value)| match best {
                Some((_, max)) if max >= value => best,
                _ => Some((t, value)),
            }))
    }

    /// Sum of all compartments at every sample
    pub fn totals(&self) -> Vec<T> {
        self.states.iter().map(|state| state.sum()).collect()
    }

    /// Shift all sample times by a constant offset
    pub fn shifted(&self, offset: T) -> Self {
        let mut shifted = self.clone();
        shifted.times.iter_mut().for_each(|t| *t += offset);
        shifted
    }

    /// The samples as a matrix, one row per sample with time in the first column
    pub fn to_array(&self) -> Array2<f64> {
        let ncols = self.compartments.len() + 1;
        Array2::from_shape_fn((self.len(), ncols), |(row, col)| match col {
            0 => self.times[row],
            _ => self.states[row][col - 1],
        })
    }
}

/// The result of a piecewise simulation, one trajectory per segment
#[derive(Debug, Clone, Default)]
pub struct PiecewiseRun {
    segments: Vec<(String, Trajectory)>,
}

impl PiecewiseRun {
    pub fn new() -> Self {
        PiecewiseRun { segments: vec![] }
    }

    pub fn push(&mut self, label: String, trajectory: Trajectory) {
        self.segments.push((label, trajectory));
    }

    pub fn nsegments(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Option<&Trajectory> {
        self.segments.get(index).map(|(_, trajectory)| trajectory)
    }

    pub fn segments(&self) -> impl Iterator<Item = (&str, &Trajectory)> {
        self.segments
            .iter()
            .map(|(label, trajectory)| (label.as_str(), trajectory))
    }

    /// All segments concatenated in time order
    pub fn trajectory(&self) -> Option<Trajectory> {
        let mut iter = self.segments.iter().map(|(_, trajectory)| trajectory);
        let mut full = iter.next()?.clone();
        for trajectory in iter {
            full.extend(trajectory);
        }
        Some(full)
    }

    /// Last sampled state of the whole run
    pub fn final_state(&self) -> Option<&V> {
        self.segments
            .iter()
            .rev()
            .find_map(|(_, trajectory)| trajectory.last_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trajectory {
        Trajectory::from_samples(
            &["S", "I"],
            vec![0.0, 1.0, 2.0],
            vec![
                V::from_vec(vec![0.9, 0.1]),
                V::from_vec(vec![0.7, 0.3]),
                V::from_vec(vec![0.6, 0.2]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn columns_and_peaks() {
        let trajectory = sample();
        assert_eq!(trajectory.column("I").unwrap(), vec![0.1, 0.3, 0.2]);
        assert_eq!(trajectory.peak("I").unwrap(), Some((1.0, 0.3)));
        assert!(trajectory.column("R").is_err());
    }

    #[test]
    fn matrix_layout() {
        let array = sample().to_array();
        assert_eq!(array.shape(), &[3, 3]);
        assert_eq!(array[[1, 0]], 1.0);
        assert_eq!(array[[2, 1]], 0.6);
        assert_eq!(array[[2, 2]], 0.2);
    }

    #[test]
    fn shifting_keeps_states() {
        let shifted = sample().shifted(14.0);
        assert_eq!(shifted.times(), &[14.0, 15.0, 16.0]);
        assert_eq!(shifted.states(), sample().states());
    }

    #[test]
    fn mismatched_samples() {
        assert!(Trajectory::from_samples(&["S"], vec![0.0], vec![]).is_err());
    }

    #[test]
    fn concatenation() {
        let mut run = PiecewiseRun::new();
        run.push("before".to_string(), sample());
        run.push("empty".to_string(), Trajectory::new(&["S", "I"]));
        run.push("after".to_string(), sample().shifted(3.0));
        let full = run.trajectory().unwrap();
        assert_eq!(full.len(), 6);
        assert_eq!(full.times()[3], 3.0);
        assert_eq!(run.final_state(), Some(&V::from_vec(vec![0.6, 0.2])));
        assert!(PiecewiseRun::new().trajectory().is_none());
    }
}
