//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::api::{
    ApiFuture, CloudApi, InstanceDescription, InstanceState, PeeringConnection, PeeringFilter,
    PeeringRequest, PeeringStatus, PeeringVpcInfo, RouteTable, StopOptions, Subnet,
    VpcDescription,
};
use crate::config::{DryRun, MezhaConfig};

/// Error type returned by [`FakeCloudApi`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{message}")]
pub struct FakeApiError {
    /// Scripted or synthesized failure message.
    pub message: String,
}

impl FakeApiError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Records a single call made through [`FakeCloudApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordedCall {
    /// `describe_vpc` was invoked.
    DescribeVpc {
        /// VPC identifier passed by the caller.
        vpc_id: String,
    },
    /// `list_route_tables` was invoked.
    ListRouteTables {
        /// VPC identifier passed by the caller.
        vpc_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `delete_route` was invoked.
    DeleteRoute {
        /// Table addressed by the delete.
        route_table_id: String,
        /// Destination CIDR addressed by the delete.
        destination: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `list_subnets` was invoked.
    ListSubnets {
        /// VPC identifier passed by the caller.
        vpc_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `describe_peering_connections` was invoked.
    DescribePeerings {
        /// Requester-side filter, when constrained.
        requester_vpc_id: Option<String>,
        /// Accepter-side filter, when constrained.
        accepter_vpc_id: Option<String>,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `describe_peering_connection` was invoked.
    DescribePeering {
        /// Connection identifier passed by the caller.
        connection_id: String,
    },
    /// `request_peering_connection` was invoked.
    RequestPeering {
        /// Far-side VPC identifier from the request.
        peer_vpc_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `accept_peering_connection` was invoked.
    AcceptPeering {
        /// Connection identifier passed by the caller.
        connection_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `delete_peering_connection` was invoked.
    DeletePeering {
        /// Connection identifier passed by the caller.
        connection_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `describe_instance` was invoked.
    DescribeInstance {
        /// Instance identifier passed by the caller.
        instance_id: String,
    },
    /// `stop_instance` was invoked.
    StopInstance {
        /// Instance identifier passed by the caller.
        instance_id: String,
        /// Hibernate flag forwarded by the caller.
        hibernate: bool,
        /// Force flag forwarded by the caller.
        force: bool,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
    /// `start_instance` was invoked.
    StartInstance {
        /// Instance identifier passed by the caller.
        instance_id: String,
        /// Dry-run flag forwarded by the caller.
        dry_run: bool,
    },
}

#[derive(Debug, Default)]
struct FakeState {
    vpc: Option<VpcDescription>,
    route_tables: Vec<RouteTable>,
    subnets: Vec<Subnet>,
    peerings: Vec<PeeringConnection>,
    instances: BTreeMap<String, InstanceState>,
    stop_errors: BTreeMap<String, String>,
    start_errors: BTreeMap<String, String>,
    frozen: bool,
    hide_created_peerings: bool,
    created_peerings: usize,
    calls: Vec<RecordedCall>,
}

/// In-memory [`CloudApi`] double with seedable state, scripted failures,
/// and invocation recording.
#[derive(Clone, Debug, Default)]
pub struct FakeCloudApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloudApi {
    /// Creates an empty fake with nothing seeded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds the VPC description returned by `describe_vpc`.
    pub fn seed_vpc(&self, vpc: VpcDescription) {
        self.lock().vpc = Some(vpc);
    }

    /// Replaces the route tables returned by `list_route_tables`.
    pub fn seed_route_tables(&self, tables: Vec<RouteTable>) {
        self.lock().route_tables = tables;
    }

    /// Replaces the subnets returned by `list_subnets`.
    pub fn seed_subnets(&self, subnets: Vec<Subnet>) {
        self.lock().subnets = subnets;
    }

    /// Replaces the peering connections visible to lookups.
    pub fn seed_peerings(&self, connections: Vec<PeeringConnection>) {
        self.lock().peerings = connections;
    }

    /// Seeds one instance with an initial lifecycle state.
    pub fn seed_instance(&self, instance_id: &str, state: InstanceState) {
        self.lock()
            .instances
            .insert(instance_id.to_owned(), state);
    }

    /// Scripts `stop_instance` to fail for one instance.
    pub fn fail_stop(&self, instance_id: &str, message: &str) {
        self.lock()
            .stop_errors
            .insert(instance_id.to_owned(), message.to_owned());
    }

    /// Scripts `start_instance` to fail for one instance.
    pub fn fail_start(&self, instance_id: &str, message: &str) {
        self.lock()
            .start_errors
            .insert(instance_id.to_owned(), message.to_owned());
    }

    /// Stops accepted lifecycle calls from transitioning instance state,
    /// so state waits never complete.
    pub fn freeze_transitions(&self) {
        self.lock().frozen = true;
    }

    /// Makes freshly requested peering connections invisible to
    /// `describe_peering_connection`, so visibility waits never complete.
    pub fn hide_created_peerings(&self) {
        self.lock().hide_created_peerings = true;
    }

    /// Snapshot of every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded `delete_route` calls.
    #[must_use]
    pub fn delete_route_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::DeleteRoute { .. }))
            .count()
    }
}

impl CloudApi for FakeCloudApi {
    type Error = FakeApiError;

    fn describe_vpc<'a>(&'a self, vpc_id: &'a str) -> ApiFuture<'a, VpcDescription, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DescribeVpc {
                vpc_id: vpc_id.to_owned(),
            });
            state
                .vpc
                .clone()
                .ok_or_else(|| FakeApiError::new(format!("vpc {vpc_id} not seeded")))
        })
    }

    fn list_route_tables<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<RouteTable>, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::ListRouteTables {
                vpc_id: vpc_id.to_owned(),
                dry_run,
            });
            Ok(state.route_tables.clone())
        })
    }

    fn delete_route<'a>(
        &'a self,
        route_table_id: &'a str,
        destination: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DeleteRoute {
                route_table_id: route_table_id.to_owned(),
                destination: destination.to_owned(),
                dry_run,
            });
            if !dry_run {
                for table in &mut state.route_tables {
                    if table.id == route_table_id {
                        table.routes.retain(|route| route.destination != destination);
                    }
                }
            }
            Ok(())
        })
    }

    fn list_subnets<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<Subnet>, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::ListSubnets {
                vpc_id: vpc_id.to_owned(),
                dry_run,
            });
            Ok(state.subnets.clone())
        })
    }

    fn describe_peering_connections<'a>(
        &'a self,
        filter: &'a PeeringFilter,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<PeeringConnection>, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DescribePeerings {
                requester_vpc_id: filter.requester_vpc_id.clone(),
                accepter_vpc_id: filter.accepter_vpc_id.clone(),
                dry_run,
            });
            let matches = state
                .peerings
                .iter()
                .filter(|connection| {
                    filter
                        .requester_vpc_id
                        .as_ref()
                        .is_none_or(|vpc| &connection.requester.vpc_id == vpc)
                        && filter
                            .accepter_vpc_id
                            .as_ref()
                            .is_none_or(|vpc| &connection.accepter.vpc_id == vpc)
                })
                .cloned()
                .collect();
            Ok(matches)
        })
    }

    fn describe_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
    ) -> ApiFuture<'a, Option<PeeringConnection>, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DescribePeering {
                connection_id: connection_id.to_owned(),
            });
            Ok(state
                .peerings
                .iter()
                .find(|connection| connection.id == connection_id)
                .cloned())
        })
    }

    fn request_peering_connection<'a>(
        &'a self,
        request: &'a PeeringRequest,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::RequestPeering {
                peer_vpc_id: request.peer_vpc_id.clone(),
                dry_run,
            });
            state.created_peerings += 1;
            let connection = PeeringConnection {
                id: format!("pcx-{:04}", state.created_peerings),
                status: PeeringStatus::PendingAcceptance,
                requester: PeeringVpcInfo {
                    vpc_id: request.requester_vpc_id.clone(),
                    owner_id: String::from("000000000000"),
                    region: String::from("local"),
                    cidr_block: None,
                },
                accepter: PeeringVpcInfo {
                    vpc_id: request.peer_vpc_id.clone(),
                    owner_id: request.peer_owner_id.clone(),
                    region: request.peer_region.clone(),
                    cidr_block: None,
                },
            };
            if !state.hide_created_peerings {
                state.peerings.push(connection.clone());
            }
            Ok(connection)
        })
    }

    fn accept_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::AcceptPeering {
                connection_id: connection_id.to_owned(),
                dry_run,
            });
            let found = state
                .peerings
                .iter_mut()
                .find(|connection| connection.id == connection_id);
            match found {
                Some(connection) => {
                    if !dry_run {
                        connection.status = PeeringStatus::Active;
                    }
                    Ok(connection.clone())
                }
                None => Err(FakeApiError::new(format!(
                    "peering connection {connection_id} not found"
                ))),
            }
        })
    }

    fn delete_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, bool, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DeletePeering {
                connection_id: connection_id.to_owned(),
                dry_run,
            });
            let known = state
                .peerings
                .iter()
                .any(|connection| connection.id == connection_id);
            if !known {
                return Err(FakeApiError::new(format!(
                    "peering connection {connection_id} not found"
                )));
            }
            if !dry_run {
                state
                    .peerings
                    .retain(|connection| connection.id != connection_id);
            }
            Ok(true)
        })
    }

    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Option<InstanceDescription>, FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::DescribeInstance {
                instance_id: instance_id.to_owned(),
            });
            Ok(state
                .instances
                .get(instance_id)
                .map(|current| InstanceDescription {
                    id: instance_id.to_owned(),
                    state: *current,
                }))
        })
    }

    fn stop_instance<'a>(
        &'a self,
        instance_id: &'a str,
        options: StopOptions,
        dry_run: bool,
    ) -> ApiFuture<'a, (), FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::StopInstance {
                instance_id: instance_id.to_owned(),
                hibernate: options.hibernate,
                force: options.force,
                dry_run,
            });
            if let Some(message) = state.stop_errors.get(instance_id) {
                return Err(FakeApiError::new(message.clone()));
            }
            if !dry_run && !state.frozen {
                state
                    .instances
                    .insert(instance_id.to_owned(), InstanceState::Stopped);
            }
            Ok(())
        })
    }

    fn start_instance<'a>(
        &'a self,
        instance_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), FakeApiError> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(RecordedCall::StartInstance {
                instance_id: instance_id.to_owned(),
                dry_run,
            });
            if let Some(message) = state.start_errors.get(instance_id) {
                return Err(FakeApiError::new(message.clone()));
            }
            if !dry_run && !state.frozen {
                state
                    .instances
                    .insert(instance_id.to_owned(), InstanceState::Running);
            }
            Ok(())
        })
    }
}

/// A filled-in configuration for tests that never loads external sources.
#[must_use]
pub fn sample_config() -> MezhaConfig {
    MezhaConfig {
        dry_run: DryRun::new(false),
        log_path: Utf8PathBuf::from("logs"),
        api_base_url: String::from("https://api.example.test/v1"),
        use_profile: false,
        profile_name: None,
        access_key: Some(String::from("AK")),
        secret_key: Some(String::from("SK")),
    }
}
