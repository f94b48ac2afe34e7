//! Traffic-subsystem error type.

use thiserror::Error;

use mt_core::NodeId;
use mt_network::{BarrierTarget, NetworkError};

/// Errors produced by `mt-traffic`.
///
/// A full edge is not an error; it is [`Admission::Refused`](crate::Admission).
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("{0} is already blocked")]
    AlreadyBlocked(BarrierTarget),

    #[error("{0} is not blocked")]
    NotBlocked(BarrierTarget),

    #[error("traffic light at {node}: toggle period must be at least 1")]
    ZeroTogglePeriod { node: NodeId },

    #[error("congestion sample interval must be at least 1")]
    ZeroSampleInterval,
}

pub type TrafficResult<T> = Result<T, TrafficError>;
