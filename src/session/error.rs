//! Error types for VPC session operations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::snapshot::{PeeringSide, SnapshotError};

/// Errors raised by [`super::VpcSession`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    /// Raised at construction when the configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// No cached route table carries a route to the destination.
    #[error("no route table routes {destination}")]
    RouteNotFound {
        /// Destination CIDR the caller asked for.
        destination: String,
    },
    /// The filtered peering lookup returned nothing.
    #[error("no peering connection matches {side} VPC {peer_vpc_id}")]
    PeeringNotFound {
        /// Cache slot the lookup addressed.
        side: PeeringSide,
        /// VPC identifier on the far side of the filter.
        peer_vpc_id: String,
    },
    /// The filtered peering lookup returned more than one connection.
    #[error("{matches} peering connections match {side} VPC {peer_vpc_id}; refusing to pick one")]
    AmbiguousPeering {
        /// Cache slot the lookup addressed.
        side: PeeringSide,
        /// VPC identifier on the far side of the filter.
        peer_vpc_id: String,
        /// How many connections the provider returned.
        matches: usize,
    },
    /// A bounded wait elapsed before the resource reached the target state.
    #[error("timeout waiting for {action} on {resource_id}")]
    Timeout {
        /// Wait that was being performed.
        action: String,
        /// Provider identifier of the resource being waited on.
        resource_id: String,
    },
    /// Wrapper for provider level failures.
    #[error("provider error: {message}")]
    Api {
        /// Message returned by the provider.
        message: String,
    },
    /// Raised when a pre-mutation capture is malformed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl SessionError {
    /// Wraps a provider error, keeping its message.
    pub(super) fn api<E: std::error::Error>(error: E) -> Self {
        Self::Api {
            message: error.to_string(),
        }
    }
}
