use crate::error::SimError;
use crate::reaction::{PropensityLaw, ReactionRule};
use crate::state::ChemicalState;
use rand::Rng;

/// Per-rule propensities for the current state, in registration order.
///
/// Rebuilt from scratch on every step; nothing carries over between steps,
/// so overlapping reactants never leave stale entries behind.
#[derive(Clone, Debug, Default)]
pub struct PropensityTable {
    values: Vec<f64>,
    total: f64,
}

impl PropensityTable {
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            total: 0.0,
        }
    }

    pub fn recompute(
        &mut self,
        rules: &[ReactionRule],
        state: &ChemicalState,
        law: PropensityLaw,
    ) -> Result<f64, SimError> {
        self.values.clear();
        self.values.reserve(rules.len());
        let mut total = 0.0;
        for rule in rules {
            let value = rule.propensity(state, law);
            total += value;
            self.values.push(value);
        }
        self.total = total;
        if !total.is_finite() {
            return Err(SimError::DegeneratePropensity(total));
        }
        Ok(total)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// No rule can fire.
    pub fn is_exhausted(&self) -> bool {
        self.total <= 0.0
    }

    /// Index of the first rule whose cumulative share of the total exceeds
    /// `r ∈ [0, 1)`.
    ///
    /// When rounding leaves every cumulative share at or below `r`, the last
    /// rule with positive propensity is returned instead.
    pub fn select(&self, r: f64) -> usize {
        debug_assert!(self.total > 0.0);
        let mut tally = 0.0;
        for (idx, &value) in self.values.iter().enumerate() {
            tally += value;
            if tally / self.total > r {
                return idx;
            }
        }
        self.values
            .iter()
            .rposition(|&value| value > 0.0)
            .unwrap_or(self.values.len().saturating_sub(1))
    }

    /// Draws `r` uniformly from `[0, 1)` and selects with it.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r: f64 = rng.random();
        self.select(r)
    }
}
