//! Provider API abstraction for virtual-network and instance operations.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// A single routing rule inside a [`RouteTable`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Route {
    /// Destination CIDR block matched by this rule.
    pub destination: String,
    /// Provider identifier of the routing target (gateway, peering, …).
    pub target: String,
    /// Whether the route is currently usable.
    pub state: RouteState,
}

/// Provider-reported state of a route.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteState {
    /// The route resolves to a live target.
    Active,
    /// The route's target is gone; traffic is dropped.
    Blackhole,
}

/// Route table document as returned by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RouteTable {
    /// Provider-assigned route table identifier.
    pub id: String,
    /// Identifier of the VPC owning this table.
    pub vpc_id: String,
    /// Routing rules, in provider order.
    pub routes: Vec<Route>,
    /// Subnet identifiers associated with this table.
    #[serde(default)]
    pub associations: Vec<String>,
    /// Provider tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Subnet document as returned by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Subnet {
    /// Provider-assigned subnet identifier.
    pub id: String,
    /// Identifier of the VPC owning this subnet.
    pub vpc_id: String,
    /// Address block carved out for this subnet.
    pub cidr_block: String,
    /// Availability zone hosting the subnet.
    pub availability_zone: String,
    /// Provider tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One side of a peering connection.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PeeringVpcInfo {
    /// VPC identifier on this side of the link.
    pub vpc_id: String,
    /// Account that owns the VPC.
    pub owner_id: String,
    /// Region hosting the VPC.
    pub region: String,
    /// Address block of the VPC, when the provider discloses it.
    #[serde(default)]
    pub cidr_block: Option<String>,
}

/// Handshake state of a peering connection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeeringStatus {
    /// The requester has issued the request but the provider has not
    /// surfaced it to the accepter yet.
    InitiatingRequest,
    /// Waiting for the accepter side to accept.
    PendingAcceptance,
    /// Accepted; the provider is wiring up routing.
    Provisioning,
    /// Established and usable.
    Active,
    /// Deletion requested.
    Deleting,
    /// Torn down.
    Deleted,
    /// Declined by the accepter.
    Rejected,
    /// The pending request lapsed before acceptance.
    Expired,
    /// The provider could not establish the link.
    Failed,
}

/// Peering connection document as returned by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PeeringConnection {
    /// Provider-assigned connection identifier.
    pub id: String,
    /// Current handshake state.
    pub status: PeeringStatus,
    /// The side that initiated the handshake.
    pub requester: PeeringVpcInfo,
    /// The side that must accept the handshake.
    pub accepter: PeeringVpcInfo,
}

/// VPC description fetched once at session construction.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VpcDescription {
    /// Provider-assigned VPC identifier.
    pub id: String,
    /// Address block of the VPC.
    pub cidr_block: String,
    /// Account that owns the VPC.
    pub owner_id: String,
}

/// Lifecycle state of a compute instance.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    /// Being provisioned.
    Pending,
    /// Up and serving.
    Running,
    /// Stop requested, still winding down.
    Stopping,
    /// Halted but retained.
    Stopped,
    /// Termination in progress.
    ShuttingDown,
    /// Gone for good.
    Terminated,
}

/// Instance description returned by state polling.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceDescription {
    /// Provider-assigned instance identifier.
    pub id: String,
    /// Current lifecycle state.
    pub state: InstanceState,
}

/// Filter for peering connection lookups. Unset sides match anything.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PeeringFilter {
    /// VPC that initiated the handshake, when constrained.
    pub requester_vpc_id: Option<String>,
    /// VPC expected to accept the handshake, when constrained.
    pub accepter_vpc_id: Option<String>,
}

impl PeeringFilter {
    /// Matches connections where `vpc_id` initiated the handshake.
    #[must_use]
    pub fn by_requester(vpc_id: &str) -> Self {
        Self {
            requester_vpc_id: Some(vpc_id.to_owned()),
            accepter_vpc_id: None,
        }
    }

    /// Matches connections where `vpc_id` is expected to accept.
    #[must_use]
    pub fn by_accepter(vpc_id: &str) -> Self {
        Self {
            requester_vpc_id: None,
            accepter_vpc_id: Some(vpc_id.to_owned()),
        }
    }

    /// Constrains both sides of the handshake.
    #[must_use]
    pub fn between(requester_vpc_id: &str, accepter_vpc_id: &str) -> Self {
        Self {
            requester_vpc_id: Some(requester_vpc_id.to_owned()),
            accepter_vpc_id: Some(accepter_vpc_id.to_owned()),
        }
    }
}

/// Parameters for requesting a new peering connection.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PeeringRequest {
    /// VPC initiating the handshake.
    pub requester_vpc_id: String,
    /// VPC on the far side of the link.
    pub peer_vpc_id: String,
    /// Region hosting the far side.
    pub peer_region: String,
    /// Account owning the far side.
    pub peer_owner_id: String,
}

/// Options for stopping an instance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StopOptions {
    /// Request hibernation instead of a plain stop.
    pub hibernate: bool,
    /// Force the stop even if the guest OS does not cooperate.
    pub force: bool,
}

/// Future returned by provider API operations.
pub type ApiFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Interface implemented by cloud providers.
///
/// Every `dry_run` flag is forwarded verbatim; when set, the provider is
/// expected to validate the request without applying any state change.
pub trait CloudApi {
    /// Provider specific error type returned by API calls.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Describes a VPC (address block and ownership).
    fn describe_vpc<'a>(&'a self, vpc_id: &'a str) -> ApiFuture<'a, VpcDescription, Self::Error>;

    /// Lists the route tables attached to a VPC.
    fn list_route_tables<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<RouteTable>, Self::Error>;

    /// Deletes a single route, addressed by table and destination CIDR.
    fn delete_route<'a>(
        &'a self,
        route_table_id: &'a str,
        destination: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), Self::Error>;

    /// Lists the subnets of a VPC.
    fn list_subnets<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<Subnet>, Self::Error>;

    /// Lists peering connections matching the filter.
    fn describe_peering_connections<'a>(
        &'a self,
        filter: &'a PeeringFilter,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<PeeringConnection>, Self::Error>;

    /// Looks up a single peering connection by identifier.
    ///
    /// Returns `None` while the resource is not yet visible; existence
    /// polling is built on top of this call.
    fn describe_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
    ) -> ApiFuture<'a, Option<PeeringConnection>, Self::Error>;

    /// Requests a new peering connection.
    fn request_peering_connection<'a>(
        &'a self,
        request: &'a PeeringRequest,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, Self::Error>;

    /// Accepts a pending peering connection.
    fn accept_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, Self::Error>;

    /// Deletes a peering connection, returning the provider's success flag.
    fn delete_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, bool, Self::Error>;

    /// Looks up a single instance by identifier.
    ///
    /// Returns `None` when the provider no longer reports the instance.
    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Option<InstanceDescription>, Self::Error>;

    /// Issues a stop against an instance.
    fn stop_instance<'a>(
        &'a self,
        instance_id: &'a str,
        options: StopOptions,
        dry_run: bool,
    ) -> ApiFuture<'a, (), Self::Error>;

    /// Issues a start against an instance.
    fn start_instance<'a>(
        &'a self,
        instance_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), Self::Error>;
}
