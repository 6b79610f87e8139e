//! Core library for the Mezha VPC operations toolkit.
//!
//! The crate exposes a provider abstraction for inspecting and mutating
//! virtual network resources (route tables, subnets, peering connections),
//! a batch instance lifecycle runner, and a session type that caches the
//! last-fetched state, records pre-mutation snapshots, and exports a fixed
//! subset of state as JSON.

pub mod api;
pub mod config;
pub mod rest;
pub mod session;
pub mod snapshot;
pub mod test_support;

pub use api::{
    ApiFuture, CloudApi, InstanceDescription, InstanceState, PeeringConnection, PeeringFilter,
    PeeringRequest, PeeringStatus, PeeringVpcInfo, Route, RouteState, RouteTable, StopOptions,
    Subnet, VpcDescription,
};
pub use config::{ConfigError, CredentialMode, DryRun, MezhaConfig};
pub use rest::{RestApiError, RestCloudApi};
pub use session::{
    ExportError, InstanceOutcome, PeeringState, SessionError, VpcSession,
};
pub use snapshot::{
    CaptureTarget, PeeringSide, SnapshotEntry, SnapshotError, SnapshotLog, SnapshotValue,
};
