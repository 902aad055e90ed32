use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StrategyError>;

/// Everything that can go wrong while building a race or fitting tyre curves.
///
/// Running out of legal strategies is not in here: an infeasible race comes back
/// as a normal `StrategyResult`.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid race configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid coefficients for {compound}: {reason}")]
    InvalidCoefficients { compound: String, reason: String },

    #[error("invalid stint length {length}, a stint must cover at least one lap")]
    InvalidLength { length: usize },

    #[error("no coefficients available for compound {0}")]
    UnknownCompound(String),

    #[error("could not fit degradation curve for {compound}: {reason}")]
    Fit { compound: String, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
