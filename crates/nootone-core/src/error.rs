//! Error types for nootone

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NootoneError {
    #[error("Invalid collection name: {0}")]
    UnknownVocabulary(String),
    #[error("Dimension mismatch: index has {expected} dimensions, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Cannot build an index from an empty point set")]
    EmptyPointSet,
    #[error("Invalid range: min ({min}) must be less than max ({max})")]
    InvalidRange { min: f64, max: f64 },
    #[error("Invalid pitch range {min}..{max}: {reason}")]
    InvalidPitchRange { min: i32, max: i32, reason: &'static str },
    #[error("Cannot place {requested} attacks on a grid of {available} slots")]
    NotEnoughSlots { requested: usize, available: usize },
    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),
    #[error("Invalid tempo: {0}")]
    InvalidTempo(f64),
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NootoneError>;
