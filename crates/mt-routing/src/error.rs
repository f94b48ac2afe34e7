//! Routing-subsystem error type.

use thiserror::Error;

use mt_core::NodeId;

/// Errors produced by `mt-routing`.
///
/// "No path" is not an error; it is [`RouteOutcome::NoPath`](crate::RouteOutcome).
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    /// Every worker has died and the restart budget is spent.
    #[error("path-computation pool unavailable: no live workers")]
    PoolUnavailable,

    #[error("failed to start routing worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
