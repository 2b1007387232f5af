//! Error type shared by the plotting entry points

use thiserror::Error;

/// Precondition failures reported before any computation starts
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no fields given")]
    NoFields,

    #[error("expected {expected} titles (one per field), got {got}")]
    TitleCount { expected: usize, got: usize },

    #[error("expected {expected} labels (one per field), got {got}")]
    LabelCount { expected: usize, got: usize },

    #[error("{what} override must have 1 or {expected} entries, got {got}")]
    OverrideCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("field {index} has rank {rank}, need at least {min}")]
    Rank { index: usize, rank: usize, min: usize },

    #[error("field {index} with shape {shape:?} has no elements")]
    EmptyField { index: usize, shape: Vec<usize> },

    #[error("field transform returned {got} fields for {expected} inputs")]
    TransformCount { expected: usize, got: usize },

    #[error("shape {shape:?} needs {expected} values, buffer holds {got}")]
    Shape {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),
}
