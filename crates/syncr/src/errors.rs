//! errors raised while normalising configuration
//!
//! Every error is fatal and carries the dotted path of the config value that caused it.

/// A single normalisation failure
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("{path}: {message} (got {got})")]
    InvalidValue {
        path: String,
        message: String,
        got: String,
    },

    #[error("{path}: template {wanted:?} doesn't exist (available: {available:?})")]
    UnknownTemplate {
        path: String,
        wanted: String,
        available: Vec<String>,
    },

    #[error("{path}: unknown account {account:?}")]
    UnknownAccount { path: String, account: String },

    #[error("{path}: no __self__ {expected} for this resource (declared by a {self_type})")]
    InvalidSelfReference {
        path: String,
        expected: &'static str,
        self_type: String,
    },

    #[error("{path}: resource type {wanted:?} is not supported here (available: {available:?})")]
    UnsupportedResourceType {
        path: String,
        wanted: String,
        available: Vec<String>,
    },

    #[error("{path}: {message}")]
    MissingField { path: String, message: String },

    #[error("{path}: {message}")]
    InvalidCode { path: String, message: String },

    #[error("{path}: no default function handler for runtime {runtime:?}")]
    NoDefaultHandler { path: String, runtime: String },

    #[error("{path}: bad reference ${{{reference}}}: {message}")]
    BadReference {
        path: String,
        reference: String,
        message: String,
    },
}

impl SpecError {
    /// Dotted config path the error is attached to
    pub fn path(&self) -> &str {
        match self {
            SpecError::InvalidValue { path, .. }
            | SpecError::UnknownTemplate { path, .. }
            | SpecError::UnknownAccount { path, .. }
            | SpecError::InvalidSelfReference { path, .. }
            | SpecError::UnsupportedResourceType { path, .. }
            | SpecError::MissingField { path, .. }
            | SpecError::InvalidCode { path, .. }
            | SpecError::NoDefaultHandler { path, .. }
            | SpecError::BadReference { path, .. } => path,
        }
    }
}

pub type SpecResult<T> = Result<T, SpecError>;
