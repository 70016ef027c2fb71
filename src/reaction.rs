use crate::error::SimError;
use crate::state::{ChemicalState, Species};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How reactant counts enter a rule's propensity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropensityLaw {
    /// `rate · Π countᵏ`, one multiplication by the count per unit of
    /// coefficient. Exact for first-order reactants only; over-counts
    /// reactions consuming several identical molecules.
    #[default]
    RepeatedProduct,
    /// `rate · Π count!/(count-k)!`, the falling factorial over
    /// indistinguishable molecules.
    Combinatorial,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoichiometryEntry {
    pub species: Species,
    pub coefficient: u32,
}

impl StoichiometryEntry {
    pub fn new(species: impl Into<Species>, coefficient: u32) -> Self {
        Self {
            species: species.into(),
            coefficient,
        }
    }
}

impl<S: Into<Species>> From<(S, u32)> for StoichiometryEntry {
    fn from((species, coefficient): (S, u32)) -> Self {
        Self::new(species, coefficient)
    }
}

/// One reaction channel. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionRule {
    name: Option<String>,
    reactants: Vec<StoichiometryEntry>,
    products: Vec<StoichiometryEntry>,
    rate: f64,
}

impl ReactionRule {
    pub fn new<R, P>(reactants: R, products: P, rate: f64) -> Result<Self, SimError>
    where
        R: IntoIterator,
        R::Item: Into<StoichiometryEntry>,
        P: IntoIterator,
        P::Item: Into<StoichiometryEntry>,
    {
        let rule = Self {
            name: None,
            reactants: reactants.into_iter().map(Into::into).collect(),
            products: products.into_iter().map(Into::into).collect(),
            rate,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Attaches a label used in diagnostics instead of the rendered equation.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self) -> Result<(), SimError> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(SimError::InvalidRule(format!(
                "{self}: rate constant must be a finite non-negative number, got {}",
                self.rate
            )));
        }
        for (side, entries) in [("reactant", &self.reactants), ("product", &self.products)] {
            for (idx, entry) in entries.iter().enumerate() {
                if entry.coefficient == 0 {
                    return Err(SimError::InvalidRule(format!(
                        "{self}: {side} '{}' has a zero coefficient",
                        entry.species
                    )));
                }
                if entries[..idx].iter().any(|prev| prev.species == entry.species) {
                    return Err(SimError::InvalidRule(format!(
                        "{self}: {side} '{}' listed more than once",
                        entry.species
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn reactants(&self) -> &[StoichiometryEntry] {
        &self.reactants
    }

    pub fn products(&self) -> &[StoichiometryEntry] {
        &self.products
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Every species the rule reads or writes.
    pub fn species(&self) -> impl Iterator<Item = &Species> + '_ {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|entry| &entry.species)
    }

    /// Net change in `species` from one firing.
    pub fn net_change(&self, species: &str) -> i64 {
        let side = |entries: &[StoichiometryEntry]| -> i64 {
            entries
                .iter()
                .filter(|entry| entry.species.as_str() == species)
                .map(|entry| i64::from(entry.coefficient))
                .sum()
        };
        side(&self.products) - side(&self.reactants)
    }

    #[inline]
    pub fn propensity(&self, state: &ChemicalState, law: PropensityLaw) -> f64 {
        let mut propensity = self.rate;
        for reactant in &self.reactants {
            let available = state.count(reactant.species.as_str());
            match law {
                PropensityLaw::RepeatedProduct => {
                    for _ in 0..reactant.coefficient {
                        propensity *= available as f64;
                    }
                }
                PropensityLaw::Combinatorial => {
                    propensity *= falling_factorial(available, reactant.coefficient);
                }
            }
        }
        propensity
    }

    /// Fires the rule once against `state`.
    ///
    /// Every reactant is checked before any count is written, so a failed
    /// application leaves `state` exactly as it was.
    pub fn apply(&self, state: &mut ChemicalState) -> Result<(), SimError> {
        for reactant in &self.reactants {
            let available = state.count(reactant.species.as_str());
            let required = u64::from(reactant.coefficient);
            if available < required {
                return Err(SimError::NegativePopulation {
                    rule: self.to_string(),
                    species: reactant.species.clone(),
                    available,
                    required,
                });
            }
        }
        for product in &self.products {
            let current = state.count(product.species.as_str());
            let consumed = self
                .reactants
                .iter()
                .find(|r| r.species == product.species)
                .map_or(0, |r| u64::from(r.coefficient));
            if (current - consumed)
                .checked_add(u64::from(product.coefficient))
                .is_none()
            {
                return Err(SimError::PopulationOverflow {
                    rule: self.to_string(),
                    species: product.species.clone(),
                });
            }
        }

        for reactant in &self.reactants {
            if let Some(slot) = state.slot_mut(reactant.species.as_str()) {
                *slot -= u64::from(reactant.coefficient);
            }
        }
        for product in &self.products {
            let coefficient = u64::from(product.coefficient);
            match state.slot_mut(product.species.as_str()) {
                Some(slot) => *slot += coefficient,
                None => {
                    state.insert(product.species.clone(), coefficient);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ReactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        fn side(f: &mut fmt::Formatter<'_>, entries: &[StoichiometryEntry]) -> fmt::Result {
            if entries.is_empty() {
                return f.write_str("0");
            }
            for (idx, entry) in entries.iter().enumerate() {
                if idx > 0 {
                    f.write_str(" + ")?;
                }
                if entry.coefficient != 1 {
                    write!(f, "{}", entry.coefficient)?;
                }
                write!(f, "{}", entry.species)?;
            }
            Ok(())
        }
        side(f, &self.reactants)?;
        f.write_str(" -> ")?;
        side(f, &self.products)
    }
}

#[inline]
pub(crate) fn falling_factorial(value: u64, count: u32) -> f64 {
    let count = u64::from(count);
    match count {
        0 => 1.0,
        1 => value as f64,
        _ if value < count => 0.0,
        2 => (value as f64) * ((value - 1) as f64),
        _ => {
            let mut acc = 1.0;
            for i in 0..count {
                acc *= (value - i) as f64;
            }
            acc
        }
    }
}
