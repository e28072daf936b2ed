use thiserror::Error;

/// Errors produced while configuring or running an agent in an environment
#[derive(Debug, Error)]
pub enum Error {
    /// A constructor was given parameters it cannot work with
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An episode grew past the agent's transition ceiling, which means the
    /// environment never produced a terminal step
    #[error("episode exceeded {limit} transitions without ending")]
    RunawayEpisode { limit: usize },
    /// A value-table checkpoint does not match the table it is loaded into
    #[error("checkpoint holds {found} values, table expects {expected}")]
    CheckpointSize { expected: usize, found: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::InvalidConfig`] unless `cond` holds
pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<()> {
    cond.then_some(()).ok_or_else(|| Error::InvalidConfig(msg()))
}
