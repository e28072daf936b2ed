pub mod random;
pub mod tabular;

pub use random::RandomPolicy;
pub use tabular::mc_table::{McTableAgent, McTableAgentConfig};
