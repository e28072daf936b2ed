/// Discrete control inputs
pub mod action;

/// Policy interface
pub mod agent;

/// Implemented policies
pub mod algo;

/// Implementations of strategies for time-varying hyperparameters
pub mod decay;

/// Observation bucketing for tabular agents
pub mod discretize;

/// Episode loops and training schedules
pub mod driver;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// Environments
pub mod gym;

/// Terminal dashboards and rendering
#[cfg(feature = "viz")]
pub mod viz;

mod util;

pub use error::{Error, Result};
