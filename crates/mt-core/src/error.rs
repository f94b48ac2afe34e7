//! Engine-wide base error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::{EdgeId, NodeId};

/// The top-level error type for `mt-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `mt-core`.
pub type CoreResult<T> = Result<T, CoreError>;
