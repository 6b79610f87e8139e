//! Shared document builders for session integration tests.

use std::collections::BTreeMap;

use mezha::{
    PeeringConnection, PeeringStatus, PeeringVpcInfo, Route, RouteState, RouteTable, Subnet,
    VpcDescription,
};

/// Region used by every integration scenario.
pub const REGION: &str = "us-east-1";
/// VPC the session is constructed over.
pub const VPC_ID: &str = "vpc-123";
/// Account owning [`VPC_ID`].
pub const OWNER_ID: &str = "123456789012";
/// Address block of [`VPC_ID`].
pub const CIDR_BLOCK: &str = "10.0.0.0/16";

/// Description of the session VPC.
pub fn vpc() -> VpcDescription {
    VpcDescription {
        id: VPC_ID.to_owned(),
        cidr_block: CIDR_BLOCK.to_owned(),
        owner_id: OWNER_ID.to_owned(),
    }
}

/// A route table with a single active route.
pub fn route_table(id: &str, destination: &str) -> RouteTable {
    RouteTable {
        id: id.to_owned(),
        vpc_id: VPC_ID.to_owned(),
        routes: vec![Route {
            destination: destination.to_owned(),
            target: String::from("igw-1"),
            state: RouteState::Active,
        }],
        associations: Vec::new(),
        tags: BTreeMap::new(),
    }
}

/// A subnet in the session VPC.
pub fn subnet(id: &str, cidr_block: &str) -> Subnet {
    Subnet {
        id: id.to_owned(),
        vpc_id: VPC_ID.to_owned(),
        cidr_block: cidr_block.to_owned(),
        availability_zone: format!("{REGION}a"),
        tags: BTreeMap::new(),
    }
}

/// A pending peering connection between two VPCs.
pub fn peering(id: &str, requester_vpc_id: &str, accepter_vpc_id: &str) -> PeeringConnection {
    PeeringConnection {
        id: id.to_owned(),
        status: PeeringStatus::PendingAcceptance,
        requester: PeeringVpcInfo {
            vpc_id: requester_vpc_id.to_owned(),
            owner_id: OWNER_ID.to_owned(),
            region: REGION.to_owned(),
            cidr_block: None,
        },
        accepter: PeeringVpcInfo {
            vpc_id: accepter_vpc_id.to_owned(),
            owner_id: OWNER_ID.to_owned(),
            region: REGION.to_owned(),
            cidr_block: None,
        },
    }
}
