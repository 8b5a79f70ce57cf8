use thiserror::Error;

use crate::types::DistributionKind;

/// Scenario construction and validation errors.
///
/// These are detected before any engine call. A scenario carrying any of them
/// must not be sent to the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Variable name must not be empty")]
    EmptyName,
    #[error("Formula output name must not be empty")]
    EmptyOutput,
    #[error("Formula expression must not be empty")]
    EmptyExpression,
    #[error("Variable and output names must be unique (duplicate: {0})")]
    DuplicateName(String),
    #[error("Trial count must be a positive integer")]
    ZeroTrials,
    #[error("Unknown distribution type: {0}")]
    UnknownDistribution(String),
    #[error("Missing parameter '{field}' for {kind} distribution")]
    MissingParam {
        kind: DistributionKind,
        field: &'static str,
    },
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParam { field: String, reason: String },
    #[error("Parameter '{field}' out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Engine reply violates the shape the derivation pipeline relies on.
///
/// Scoped to a single derived view: the caller skips that view and keeps
/// rendering the rest.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractBreach {
    #[error("Output '{output}': {histogram} histogram bins but {bin_edges} bin edges")]
    BinEdgeMismatch {
        output: String,
        histogram: usize,
        bin_edges: usize,
    },
    #[error("Output '{output}': missing percentile '{label}'")]
    MissingPercentile { output: String, label: String },
    #[error("Samples for '{x}' ({x_len}) and '{y}' ({y_len}) are not trial-aligned")]
    SampleLengthMismatch {
        x: String,
        y: String,
        x_len: usize,
        y_len: usize,
    },
    #[error("Output '{output}': histogram counts overflow u64")]
    CountOverflow { output: String },
}

/// Main SDK error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Scenario rejected before reaching the engine
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Engine answered with an explicit `{error}` reply
    #[error("Simulation error: {0}")]
    Engine(String),

    /// Engine could not be reached or answered garbage
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reply shape broke a derivation invariant
    #[error("Contract breach: {0}")]
    ContractBreach(#[from] ContractBreach),

    /// Saved scenario not found
    #[error("Scenario not found: {0}")]
    NotFound(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// Filesystem error from the key-value store
    #[error("Storage error: {0}")]
    Io(String),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a JSON parse error
    pub fn json_parse(msg: impl Into<String>) -> Self {
        Error::JsonParse(msg.into())
    }

    /// Whether the user can fix this by editing the scenario or the name they typed.
    pub fn is_correctable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonParse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_error() {
        let err: Error = ValidationError::DuplicateName("Profit".to_string()).into();
        assert!(matches!(err, Error::Validation(ValidationError::DuplicateName(ref n)) if n == "Profit"));
        assert!(err.is_correctable());
        assert!(err.to_string().contains("Profit"));
    }

    #[test]
    fn test_engine_and_transport_are_not_correctable() {
        assert!(!Error::Engine("bad expression".into()).is_correctable());
        assert!(!Error::transport("connection refused").is_correctable());
        assert!(Error::NotFound("S1".into()).is_correctable());
    }
}
