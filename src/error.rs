//! Error taxonomy for query compilation and document patching.
//!
//! Every failure the core can produce is an [`ApiError`]. Callers that speak a
//! transport protocol map [`ApiError::status`] onto their own responses.

use serde::Serialize;
use thiserror::Error;

/// HTTP-like status class carried by every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    BadRequest,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("RQL syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("Invalid {clause} function token '{token}'")]
    UnknownFunction { clause: &'static str, token: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("You can't use the _key() function unless your table has an index named '{index}' (collection '{collection}')")]
    UnknownIndex { collection: String, index: String },

    #[error("Key '{key}' for index '{index}' has {actual} parts but the index has {expected} columns")]
    KeyArity {
        index: String,
        expected: usize,
        actual: usize,
        key: String,
    },

    #[error("{message}")]
    Unsupported { backend: &'static str, message: String },

    #[error("Unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("Unknown property '{property}' on collection '{collection}'")]
    UnknownProperty { collection: String, property: String },

    #[error("Value '{value}' for '{property}' is not a valid {expected}")]
    InvalidValue {
        property: String,
        value: String,
        expected: &'static str,
    },

    #[error("{0}")]
    Patch(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::UnknownCollection(_) | ApiError::UnknownProperty { .. } => Status::NotFound,
            ApiError::Backend(_) => Status::InternalServerError,
            _ => Status::BadRequest,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        ApiError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn unsupported(backend: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unsupported {
            backend,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
