use thiserror::Error;

/// Canonical encoding of hash input failed.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to encode hash input: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("no block at index {0}")]
    UnknownBlock(usize),
    #[error("block {block} has no transaction at index {tx}")]
    UnknownTransaction { block: usize, tx: usize },
    #[error(transparent)]
    Digest(#[from] DigestError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("node count must be at least 1")]
    NoNodes,
    #[error("round duration must be non-zero")]
    ZeroRoundDuration,
    #[error("{name} must lie in (0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("pbft phase fractions must be strictly increasing")]
    UnorderedPhases,
    #[error("fault probability must lie in [0, 1], got {0}")]
    FaultProbability(f64),
    #[error("{name} range is empty ({low}..={high})")]
    EmptyRange {
        name: &'static str,
        low: u64,
        high: u64,
    },
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    #[error("difficulty {difficulty} exceeds the digest width of {max}")]
    DifficultyTooHigh { difficulty: u32, max: u32 },
}
