//! Network-subsystem error type.

use thiserror::Error;

use mt_core::{EdgeId, NodeId};

/// Errors produced by `mt-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found in network")]
    EdgeNotFound(EdgeId),

    #[error("network has no nodes to snap to")]
    EmptyNetwork,
}

pub type NetworkResult<T> = Result<T, NetworkError>;
