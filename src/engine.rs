use crate::clock::SimulationClock;
use crate::error::SimError;
use crate::observer::Observer;
use crate::propensity::PropensityTable;
use crate::reaction::{PropensityLaw, ReactionRule};
use crate::state::ChemicalState;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the instance's random stream; drawn from the thread RNG
    /// when absent.
    pub seed: Option<u64>,
    pub propensity: PropensityLaw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    /// Freshly built or reset, `T == 0`.
    Ready,
    /// At least one reaction fired since the last reset.
    Running,
    /// Total propensity reached zero; nothing can fire again until reset.
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    Fired { rule: usize, time: f64, dt: f64 },
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeLimit,
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub stop: StopReason,
}

struct NoObserver;

impl Observer for NoObserver {
    #[inline]
    fn notify(&mut self, _time: f64, _state: &ChemicalState) {}
}

/// Exact SSA over a fixed rule list.
pub struct SimulationEngine {
    rules: Arc<[ReactionRule]>,
    law: PropensityLaw,
    initial: ChemicalState,
    state: ChemicalState,
    clock: SimulationClock,
    table: PropensityTable,
    status: EngineStatus,
    rng: ChaCha8Rng,
}

impl SimulationEngine {
    pub fn new(
        initial: ChemicalState,
        rules: Vec<ReactionRule>,
        config: EngineConfig,
    ) -> Result<Self, SimError> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(initial, rules.into(), config.propensity, rng)
    }

    /// Builds an engine over a rule list shared with other instances.
    pub fn with_rng(
        initial: ChemicalState,
        rules: Arc<[ReactionRule]>,
        law: PropensityLaw,
        rng: ChaCha8Rng,
    ) -> Result<Self, SimError> {
        for rule in rules.iter() {
            if let Some(species) = rule.species().find(|s| !initial.contains(s.as_str())) {
                return Err(SimError::UnknownSpecies {
                    rule: rule.to_string(),
                    species: species.clone(),
                });
            }
        }
        debug!(
            n_species = initial.len(),
            n_rules = rules.len(),
            ?law,
            "simulation engine initialised"
        );
        Ok(Self {
            table: PropensityTable::new(rules.len()),
            state: initial.clone(),
            initial,
            rules,
            law,
            clock: SimulationClock::new(),
            status: EngineStatus::Ready,
            rng,
        })
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Owned copy of the live state.
    pub fn state(&self) -> ChemicalState {
        self.state.clone()
    }

    pub fn initial_state(&self) -> &ChemicalState {
        &self.initial
    }

    pub fn rules(&self) -> &[ReactionRule] {
        &self.rules
    }

    pub fn propensity_law(&self) -> PropensityLaw {
        self.law
    }

    /// Table computed by the most recent step.
    pub fn propensities(&self) -> &PropensityTable {
        &self.table
    }

    /// Back to `T == 0` with the initial populations. The random stream
    /// keeps going; see [`SimulationEngine::reseed`].
    pub fn reset(&mut self) {
        self.state.copy_from(&self.initial);
        self.clock.reset();
        self.table = PropensityTable::new(self.rules.len());
        self.status = EngineStatus::Ready;
        debug!("simulation engine reset");
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        debug!(seed, "simulation engine reseeded");
    }

    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        self.step_observed(&mut NoObserver)
    }

    /// One SSA step. A failed rule application leaves time and state as
    /// they were before the call.
    pub fn step_observed<O>(&mut self, observer: &mut O) -> Result<StepOutcome, SimError>
    where
        O: Observer + ?Sized,
    {
        if self.status == EngineStatus::Exhausted {
            return Ok(StepOutcome::Exhausted);
        }
        let total = self.table.recompute(&self.rules, &self.state, self.law)?;
        if total <= 0.0 {
            self.status = EngineStatus::Exhausted;
            debug!(time = self.clock.time(), "no reaction can fire, simulation exhausted");
            return Ok(StepOutcome::Exhausted);
        }

        let dt = SimulationClock::sample(&mut self.rng, total);
        // A subnormal total propensity overflows the waiting time.
        if !dt.is_finite() {
            return Err(SimError::DegeneratePropensity(total));
        }
        let chosen = self.table.draw(&mut self.rng);
        let rule = &self.rules[chosen];
        if let Err(err) = rule.apply(&mut self.state) {
            warn!(rule = %rule, time = self.clock.time(), %err, "reaction rejected");
            return Err(err);
        }
        let time = self.clock.advance_by(dt);
        self.status = EngineStatus::Running;
        trace!(rule = chosen, time, dt, "reaction fired");
        observer.notify(time, &self.state);
        Ok(StepOutcome::Fired {
            rule: chosen,
            time,
            dt,
        })
    }

    pub fn run(&mut self, max_time: f64) -> Result<RunSummary, SimError> {
        self.run_observed(max_time, &mut NoObserver)
    }

    /// Steps until `T >= max_time` or the network is exhausted. The last
    /// fired event may land past `max_time`.
    pub fn run_observed<O>(&mut self, max_time: f64, observer: &mut O) -> Result<RunSummary, SimError>
    where
        O: Observer + ?Sized,
    {
        if !max_time.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "max_time must be finite, got {max_time}"
            )));
        }
        let mut steps = 0u64;
        while self.clock.time() < max_time && self.status != EngineStatus::Exhausted {
            if let StepOutcome::Fired { .. } = self.step_observed(observer)? {
                steps += 1;
            }
        }
        let stop = if self.status == EngineStatus::Exhausted {
            StopReason::Exhausted
        } else {
            StopReason::TimeLimit
        };
        debug!(steps, time = self.clock.time(), ?stop, "run finished");
        Ok(RunSummary { steps, stop })
    }
}
