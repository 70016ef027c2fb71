use crate::state::Species;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid reaction rule: {0}")]
    InvalidRule(String),
    #[error("rule {rule} references species '{species}' missing from the initial state")]
    UnknownSpecies { rule: String, species: Species },
    #[error(
        "rule {rule} would drive '{species}' negative: {available} available, {required} required"
    )]
    NegativePopulation {
        rule: String,
        species: Species,
        available: u64,
        required: u64,
    },
    #[error("rule {rule} overflows the population of '{species}'")]
    PopulationOverflow { rule: String, species: Species },
    #[error("total propensity {0} yields no finite waiting time")]
    DegeneratePropensity(f64),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}
