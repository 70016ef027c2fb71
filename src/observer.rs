use crate::error::SimError;
use crate::state::{ChemicalState, Species};

/// Receives the trajectory one fired reaction at a time.
///
/// Called after each accepted step with the new time and the post-reaction
/// state, in time order. Never called for a step that found no reaction able
/// to fire.
///
/// Observers are borrowed per call through
/// [`SimulationEngine::step_observed`](crate::SimulationEngine::step_observed)
/// and [`SimulationEngine::run_observed`](crate::SimulationEngine::run_observed)
/// rather than attached to the engine, so the caller keeps ownership of a
/// recorder and reads it back after the run. `step` and `run` are the
/// unobserved forms.
pub trait Observer {
    fn notify(&mut self, time: f64, state: &ChemicalState);
}

impl<F> Observer for F
where
    F: FnMut(f64, &ChemicalState),
{
    fn notify(&mut self, time: f64, state: &ChemicalState) {
        self(time, state)
    }
}

/// Keeps every notified event in memory.
#[derive(Clone, Debug, Default)]
pub struct TrajectoryRecorder {
    species: Vec<Species>,
    times: Vec<f64>,
    rows: Vec<Vec<u64>>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column labels for [`TrajectoryRecorder::rows`], taken from the first
    /// recorded state.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn clear(&mut self) {
        self.species.clear();
        self.times.clear();
        self.rows.clear();
    }
}

impl Observer for TrajectoryRecorder {
    fn notify(&mut self, time: f64, state: &ChemicalState) {
        if self.species.is_empty() {
            self.species = state.species().cloned().collect();
        }
        self.times.push(time);
        self.rows.push(state.counts());
    }
}

/// Samples the piecewise-constant trajectory at fixed time points.
///
/// A point `tp` takes the state that held on `[t_prev, t_next)` around it,
/// i.e. the state before the first event strictly after `tp`.
#[derive(Clone, Debug)]
pub struct GridRecorder {
    t_points: Vec<f64>,
    next_idx: usize,
    held: ChemicalState,
    n_species: usize,
    data: Vec<u64>,
}

impl GridRecorder {
    /// `t_points` must be ascending; `initial` is the state at time zero.
    pub fn new(t_points: Vec<f64>, initial: &ChemicalState) -> Result<Self, SimError> {
        if t_points.iter().any(|t| t.is_nan()) {
            return Err(SimError::InvalidArgument(
                "t_points must not contain NaN".into(),
            ));
        }
        if t_points.windows(2).any(|w| w[0] > w[1]) {
            return Err(SimError::InvalidArgument(
                "t_points must be sorted in ascending order".into(),
            ));
        }
        let n_species = initial.len();
        Ok(Self {
            data: Vec::with_capacity(t_points.len() * n_species),
            t_points,
            next_idx: 0,
            held: initial.clone(),
            n_species,
        })
    }

    pub fn t_points(&self) -> &[f64] {
        &self.t_points
    }

    fn record_held(&mut self) {
        self.data.extend(self.held.iter().map(|(_, count)| count));
        self.next_idx += 1;
    }

    /// Fills every point not yet reached with `state` and returns the
    /// row-major `time × species` samples.
    pub fn finish(mut self, state: &ChemicalState) -> Vec<u64> {
        self.held.copy_from(state);
        while self.next_idx < self.t_points.len() {
            self.record_held();
        }
        debug_assert_eq!(self.data.len(), self.t_points.len() * self.n_species);
        self.data
    }
}

impl Observer for GridRecorder {
    fn notify(&mut self, time: f64, state: &ChemicalState) {
        while let Some(&tp) = self.t_points.get(self.next_idx) {
            if tp < time {
                self.record_held();
            } else {
                break;
            }
        }
        self.held.copy_from(state);
    }
}
