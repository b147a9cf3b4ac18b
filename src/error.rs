use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("architecture must contain at least one node")]
    EmptyGraph,
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),
    #[error("duplicate edge id '{0}'")]
    DuplicateEdgeId(String),
    #[error("node id must not be empty")]
    EmptyNodeId,
    #[error("edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },
    #[error("think time must be at least 1 ms for client '{0}'")]
    InvalidThinkTime(String),
    #[error("capacity must be > 0 for '{0}'")]
    InvalidCapacity(String),
    #[error("probability '{field}' must be within [0, 1] (got {value})")]
    InvalidProbability { field: String, value: f64 },
    #[error("request mix must sum to at most 1 (got {0})")]
    InvalidRequestMix(f64),
    #[error("tick interval must be > 0")]
    InvalidTickInterval,
    #[error("ticks must be greater than 0")]
    TicksZero,
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
