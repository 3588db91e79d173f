use thiserror::Error;

use crate::params::ParamType;

pub type MacResult<T> = Result<T, MacError>;

#[derive(Debug, Error)]
pub enum MacError {
    #[error("allocation failure")]
    AllocationFailure,

    #[error("unresolved cipher: {0}")]
    UnresolvedCipher(String),

    #[error("unresolved engine: {0}")]
    UnresolvedEngine(String),

    #[error("parameter '{key}' has type {found}, expected {expected}")]
    InvalidParameterType {
        key: String,
        expected: ParamType,
        found: ParamType,
    },

    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("output buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("key binding failed: {0}")]
    BindingFailure(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
