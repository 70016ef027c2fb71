use crate::engine::{SimulationEngine, StopReason};
use crate::error::SimError;
use crate::observer::GridRecorder;
use crate::reaction::{PropensityLaw, ReactionRule};
use crate::state::{ChemicalState, Species};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Timeseries,
    #[default]
    FinalOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleOptions {
    pub n_trajectories: usize,
    pub max_time: f64,
    /// Sampling grid for [`OutputMode::Timeseries`]; ascending, within
    /// `max_time`.
    pub t_points: Vec<f64>,
    pub mode: OutputMode,
    /// Dedicated pool size; the global rayon pool when absent.
    pub n_threads: Option<usize>,
    pub seed: Option<u64>,
    pub propensity: PropensityLaw,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self {
            n_trajectories: 1,
            max_time: 1.0,
            t_points: Vec::new(),
            mode: OutputMode::FinalOnly,
            n_threads: None,
            seed: None,
            propensity: PropensityLaw::default(),
        }
    }
}

impl EnsembleOptions {
    fn validate(&self) -> Result<(), SimError> {
        if self.n_trajectories == 0 {
            return Err(SimError::InvalidArgument(
                "number of trajectories must be greater than zero".into(),
            ));
        }
        if !self.max_time.is_finite() || self.max_time <= 0.0 {
            return Err(SimError::InvalidArgument(
                "max_time must be positive and finite".into(),
            ));
        }
        if self.mode == OutputMode::Timeseries {
            if self.t_points.is_empty() {
                return Err(SimError::InvalidArgument(
                    "timeseries mode requires t_points".into(),
                ));
            }
            if self.t_points.iter().any(|&t| t.is_nan() || t < 0.0) {
                return Err(SimError::InvalidArgument(
                    "t_points must be non-negative numbers".into(),
                ));
            }
            if self.t_points.windows(2).any(|w| w[0] > w[1]) {
                return Err(SimError::InvalidArgument(
                    "t_points must be sorted in ascending order".into(),
                ));
            }
            if self.t_points.last().is_some_and(|&t| t > self.max_time) {
                return Err(SimError::InvalidArgument(
                    "t_points cannot exceed max_time".into(),
                ));
            }
        }
        Ok(())
    }

    fn n_times(&self) -> usize {
        match self.mode {
            OutputMode::Timeseries => self.t_points.len(),
            OutputMode::FinalOnly => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleOutput {
    pub species: Vec<Species>,
    pub n_trajectories: usize,
    pub n_times: usize,
    /// Row-major `trajectory × time × species` counts.
    pub data: Vec<u64>,
    pub stops: Vec<StopReason>,
}

impl EnsembleOutput {
    /// `time × species` block of one trajectory, `None` past the last one.
    pub fn trajectory(&self, idx: usize) -> Option<&[u64]> {
        if idx >= self.n_trajectories {
            return None;
        }
        let stride = self.n_times * self.species.len();
        self.data.get(idx * stride..(idx + 1) * stride)
    }

    /// Mean count of `species` at each sampled time across trajectories.
    pub fn mean(&self, species: &str) -> Option<Vec<f64>> {
        let column = self.species.iter().position(|s| s.as_str() == species)?;
        let n_species = self.species.len();
        let mut sums = vec![0.0; self.n_times];
        for block in self.data.chunks_exact(self.n_times * n_species) {
            for (t, row) in block.chunks_exact(n_species).enumerate() {
                sums[t] += row[column] as f64;
            }
        }
        let n = self.n_trajectories as f64;
        Some(sums.into_iter().map(|sum| sum / n).collect())
    }
}

/// Runs independent trajectories in parallel, one engine and one random
/// stream per trajectory. Results depend only on `options.seed`, never on
/// the thread count.
pub fn run_ensemble(
    initial: &ChemicalState,
    rules: &[ReactionRule],
    options: &EnsembleOptions,
) -> Result<EnsembleOutput, SimError> {
    options.validate()?;
    let rules: Arc<[ReactionRule]> = rules.into();
    let species: Vec<Species> = initial.species().cloned().collect();
    let n_times = options.n_times();
    let stride = n_times * species.len();
    let mut data = vec![0u64; options.n_trajectories * stride];
    let mut stops = vec![StopReason::TimeLimit; options.n_trajectories];
    debug!(
        n_trajectories = options.n_trajectories,
        n_threads = ?options.n_threads,
        mode = ?options.mode,
        "ensemble started"
    );

    let mut simulate = || -> Result<(), SimError> {
        if stride == 0 {
            return stops.par_iter_mut().enumerate().try_for_each(|(idx, stop)| {
                *stop = simulate_single(initial, &rules, options, idx, &mut [])?;
                Ok(())
            });
        }
        data.par_chunks_mut(stride)
            .zip(stops.par_iter_mut())
            .enumerate()
            .try_for_each(|(idx, (chunk, stop))| {
                *stop = simulate_single(initial, &rules, options, idx, chunk)?;
                Ok(())
            })
    };

    match options.n_threads {
        Some(n) => ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| SimError::ThreadPool(e.to_string()))?
            .install(|| simulate())?,
        None => simulate()?,
    }

    debug!(n_trajectories = options.n_trajectories, "ensemble finished");
    Ok(EnsembleOutput {
        species,
        n_trajectories: options.n_trajectories,
        n_times,
        data,
        stops,
    })
}

fn simulate_single(
    initial: &ChemicalState,
    rules: &Arc<[ReactionRule]>,
    options: &EnsembleOptions,
    idx: usize,
    output: &mut [u64],
) -> Result<StopReason, SimError> {
    let rng = ChaCha8Rng::seed_from_u64(derive_seed(options.seed, idx as u64));
    let mut engine =
        SimulationEngine::with_rng(initial.clone(), Arc::clone(rules), options.propensity, rng)?;
    let t_points = match options.mode {
        OutputMode::Timeseries => options.t_points.clone(),
        OutputMode::FinalOnly => vec![options.max_time],
    };
    // Points before the event that overshoots max_time are sampled when that
    // event is notified; only points never crossed fall through to finish.
    let mut recorder = GridRecorder::new(t_points, initial)?;
    let summary = engine.run_observed(options.max_time, &mut recorder)?;
    output.copy_from_slice(&recorder.finish(&engine.state()));
    Ok(summary.stop)
}

/// SplitMix64 over the base seed and trajectory index.
pub(crate) fn derive_seed(seed: Option<u64>, trajectory: u64) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;
    let base = seed.unwrap_or(0xDEADBEEFCAFEBABE);
    let mut z = base ^ (trajectory.wrapping_mul(GOLDEN_GAMMA));
    // SplitMix64
    z = z.wrapping_add(GOLDEN_GAMMA);
    let mut result = z;
    result = (result ^ (result >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    result = (result ^ (result >> 27)).wrapping_mul(0x94D049BB133111EB);
    result ^ (result >> 31)
}
