use mt_agent::AgentError;
use mt_core::CoreError;
use mt_network::NetworkError;
use mt_routing::RoutingError;
use mt_traffic::TrafficError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("cannot spawn {requested} {class} agents: {reason}")]
    Population {
        class:     &'static str,
        requested: u32,
        reason:    String,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Fatal: the path-computation pool can no longer answer requests.
    #[error("path service failure: {0}")]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Traffic(#[from] TrafficError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type SimResult<T> = Result<T, SimError>;
