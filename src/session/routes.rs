//! Route-table and subnet operations.

use std::collections::BTreeMap;

use crate::api::{CloudApi, RouteTable, Subnet};
use crate::snapshot::{CaptureTarget, SnapshotValue};

use super::{SessionError, VpcSession, index_by_id};

impl<A: CloudApi> VpcSession<A> {
    /// Returns the first cached route table containing a route whose
    /// destination CIDR exactly matches `destination`, or `None` when no
    /// table routes it.
    #[must_use]
    pub fn route_table_by_destination(&self, destination: &str) -> Option<&RouteTable> {
        self.route_tables.values().find(|table| {
            table
                .routes
                .iter()
                .any(|route| route.destination == destination)
        })
    }

    /// Re-fetches the subnets of this VPC, snapshotting the previous subnet
    /// map first, and returns the refreshed cache.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] when the provider call fails.
    pub async fn fetch_subnets(
        &mut self,
        dry_run: Option<bool>,
    ) -> Result<&BTreeMap<String, Subnet>, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        self.snapshots.record(
            CaptureTarget::Subnets,
            SnapshotValue::Subnets(self.subnets.clone()),
        )?;
        let listed = self
            .api
            .list_subnets(&self.vpc_id, effective)
            .await
            .map_err(SessionError::api)?;
        self.subnets = index_by_id(listed, |subnet| subnet.id.clone());
        Ok(&self.subnets)
    }

    /// Deletes the route to `destination` from the cached table that carries
    /// it, then re-fetches the route-table cache.
    ///
    /// The table is resolved before anything else; when no cached table
    /// routes the destination the call fails without touching the provider.
    /// The route-table cache is snapshotted before the delete is issued.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RouteNotFound`] when no cached table routes
    /// the destination and [`SessionError::Api`] when a provider call fails.
    pub async fn delete_route(
        &mut self,
        destination: &str,
        dry_run: Option<bool>,
    ) -> Result<(), SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let table_id = self
            .route_table_by_destination(destination)
            .map(|table| table.id.clone())
            .ok_or_else(|| SessionError::RouteNotFound {
                destination: destination.to_owned(),
            })?;

        self.snapshots.record(
            CaptureTarget::RouteTables,
            SnapshotValue::RouteTables(self.route_tables.clone()),
        )?;
        self.api
            .delete_route(&table_id, destination, effective)
            .await
            .map_err(SessionError::api)?;

        let listed = self
            .api
            .list_route_tables(&self.vpc_id, effective)
            .await
            .map_err(SessionError::api)?;
        self.route_tables = index_by_id(listed, |table| table.id.clone());
        Ok(())
    }
}
