//! Session over one VPC: cached state, pre-mutation snapshots, operations.

mod error;
mod export;
mod lifecycle;
mod peering;
mod routes;

pub use error::SessionError;
pub use export::ExportError;
pub use lifecycle::InstanceOutcome;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{CloudApi, PeeringConnection, PeeringFilter, RouteTable, Subnet};
use crate::config::MezhaConfig;
use crate::snapshot::SnapshotLog;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Cached peering connections, split by handshake role.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PeeringState {
    /// Connections where this VPC is the accepter.
    pub accepted: BTreeMap<String, PeeringConnection>,
    /// Connections where this VPC is the requester.
    pub requested: BTreeMap<String, PeeringConnection>,
}

/// Handle over one VPC and its configured instance set.
///
/// Holds the last-fetched copies of route tables, subnets, and peering
/// connections, replaced wholesale on re-fetch. Mutating operations record
/// the prior cache contents in the [`SnapshotLog`] before touching the
/// provider.
pub struct VpcSession<A: CloudApi> {
    api: A,
    config: MezhaConfig,
    region: String,
    vpc_id: String,
    owner_id: String,
    cidr_block: String,
    instance_ids: Vec<String>,
    route_tables: BTreeMap<String, RouteTable>,
    subnets: BTreeMap<String, Subnet>,
    peering: PeeringState,
    snapshots: SnapshotLog,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl<A: CloudApi> VpcSession<A> {
    /// Validates the configuration and performs the initial full fetch: VPC
    /// description, route tables, subnets, and peering connections on both
    /// sides of the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when the configuration is invalid
    /// and [`SessionError::Api`] when any initial fetch fails.
    pub async fn connect(
        api: A,
        config: MezhaConfig,
        region: impl Into<String>,
        vpc: impl Into<String>,
        instance_ids: Vec<String>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let vpc_id = vpc.into();

        let description = api
            .describe_vpc(&vpc_id)
            .await
            .map_err(SessionError::api)?;
        let tables = api
            .list_route_tables(&vpc_id, false)
            .await
            .map_err(SessionError::api)?;
        let subnets = api
            .list_subnets(&vpc_id, false)
            .await
            .map_err(SessionError::api)?;
        let accepted = api
            .describe_peering_connections(&PeeringFilter::by_accepter(&vpc_id), false)
            .await
            .map_err(SessionError::api)?;
        let requested = api
            .describe_peering_connections(&PeeringFilter::by_requester(&vpc_id), false)
            .await
            .map_err(SessionError::api)?;

        Ok(Self {
            api,
            config,
            region: region.into(),
            vpc_id,
            owner_id: description.owner_id,
            cidr_block: description.cidr_block,
            instance_ids,
            route_tables: index_by_id(tables, |table| table.id.clone()),
            subnets: index_by_id(subnets, |subnet| subnet.id.clone()),
            peering: PeeringState {
                accepted: index_by_id(accepted, |connection| connection.id.clone()),
                requested: index_by_id(requested, |connection| connection.id.clone()),
            },
            snapshots: SnapshotLog::new(),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        })
    }

    /// Region this session operates in.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Identifier of the VPC this session operates on.
    #[must_use]
    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    /// Account owning the VPC, as reported at construction.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Address block of the VPC, as reported at construction.
    #[must_use]
    pub fn cidr_block(&self) -> &str {
        &self.cidr_block
    }

    /// Instance identifiers this session manages, in configured order.
    #[must_use]
    pub fn instance_ids(&self) -> &[String] {
        &self.instance_ids
    }

    /// Last-fetched route tables, keyed by identifier.
    #[must_use]
    pub const fn route_tables(&self) -> &BTreeMap<String, RouteTable> {
        &self.route_tables
    }

    /// Last-fetched subnets, keyed by identifier.
    #[must_use]
    pub const fn subnets(&self) -> &BTreeMap<String, Subnet> {
        &self.subnets
    }

    /// Last-fetched peering connections, both sides.
    #[must_use]
    pub const fn peering(&self) -> &PeeringState {
        &self.peering
    }

    /// The pre-mutation snapshot log.
    #[must_use]
    pub const fn snapshots(&self) -> &SnapshotLog {
        &self.snapshots
    }
}

fn index_by_id<T>(items: Vec<T>, id_of: impl Fn(&T) -> String) -> BTreeMap<String, T> {
    items.into_iter().map(|item| (id_of(&item), item)).collect()
}
