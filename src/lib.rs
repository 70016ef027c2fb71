//! Exact stochastic simulation (Gillespie's direct method) of well-mixed
//! chemical reaction networks over integer populations.

mod clock;
mod engine;
mod ensemble;
mod error;
mod observer;
mod propensity;
mod reaction;
mod state;

pub use clock::{SimulationClock, waiting_time};
pub use engine::{
    EngineConfig, EngineStatus, RunSummary, SimulationEngine, StepOutcome, StopReason,
};
pub use ensemble::{EnsembleOptions, EnsembleOutput, OutputMode, run_ensemble};
pub use error::SimError;
pub use observer::{GridRecorder, Observer, TrajectoryRecorder};
pub use propensity::PropensityTable;
pub use reaction::{PropensityLaw, ReactionRule, StoichiometryEntry};
pub use state::{ChemicalState, Species};
