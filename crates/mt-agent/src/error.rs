use mt_core::{AgentId, NodeId, TravelMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent {0} does not exist or has been retired")]
    UnknownAgent(AgentId),

    #[error("node {0} not found in network")]
    UnknownNode(NodeId),

    #[error("node {node} has no {mode} edges to start from")]
    ModeUnavailable { node: NodeId, mode: TravelMode },

    #[error("{destination} cannot be reached from {origin} on the {mode} network")]
    Unreachable { origin: NodeId, destination: NodeId, mode: TravelMode },

    #[error("agent {0} has no outstanding path request")]
    NotAwaitingRoute(AgentId),

    #[error("agent {0} has already arrived or failed")]
    AlreadyFinished(AgentId),
}

pub type AgentResult<T> = Result<T, AgentError>;
