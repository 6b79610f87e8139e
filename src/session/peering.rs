//! Peering connection workflow: find, request, accept, tear down.

use std::time::Instant;

use tokio::time::sleep;

use crate::api::{CloudApi, PeeringConnection, PeeringFilter, PeeringRequest};
use crate::snapshot::{CaptureTarget, PeeringSide, SnapshotValue};

use super::{SessionError, VpcSession};

impl<A: CloudApi> VpcSession<A> {
    /// Finds the peering connection where this VPC is the requester and
    /// `accepter_vpc_id` the accepter, snapshots the accepted cache slot,
    /// stores the result there, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PeeringNotFound`] on zero matches,
    /// [`SessionError::AmbiguousPeering`] on more than one, and
    /// [`SessionError::Api`] when the provider call fails.
    pub async fn find_peering_by_accepter(
        &mut self,
        accepter_vpc_id: &str,
        dry_run: Option<bool>,
    ) -> Result<PeeringConnection, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let filter = PeeringFilter::between(&self.vpc_id, accepter_vpc_id);
        let connection = self
            .lookup_single(&filter, PeeringSide::Accepted, accepter_vpc_id, effective)
            .await?;

        self.snapshots.record(
            CaptureTarget::PeeringSlot(PeeringSide::Accepted),
            SnapshotValue::PeeringSlot(self.peering.accepted.clone()),
        )?;
        self.peering
            .accepted
            .insert(connection.id.clone(), connection.clone());
        Ok(connection)
    }

    /// Finds the peering connection where `requester_vpc_id` is the
    /// requester and this VPC the accepter, snapshots the requested cache
    /// slot, stores the result there, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PeeringNotFound`] on zero matches,
    /// [`SessionError::AmbiguousPeering`] on more than one, and
    /// [`SessionError::Api`] when the provider call fails.
    pub async fn find_peering_by_requester(
        &mut self,
        requester_vpc_id: &str,
        dry_run: Option<bool>,
    ) -> Result<PeeringConnection, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let filter = PeeringFilter::between(requester_vpc_id, &self.vpc_id);
        let connection = self
            .lookup_single(&filter, PeeringSide::Requested, requester_vpc_id, effective)
            .await?;

        self.snapshots.record(
            CaptureTarget::PeeringSlot(PeeringSide::Requested),
            SnapshotValue::PeeringSlot(self.peering.requested.clone()),
        )?;
        self.peering
            .requested
            .insert(connection.id.clone(), connection.clone());
        Ok(connection)
    }

    /// Requests a new peering connection towards `target_vpc_id` and waits
    /// until the provider makes the new resource visible.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] when the provider rejects the request
    /// and [`SessionError::Timeout`] when the resource never becomes
    /// visible within the session wait budget.
    pub async fn request_peering(
        &mut self,
        target_vpc_id: &str,
        target_region: &str,
        owner_id: &str,
        dry_run: Option<bool>,
    ) -> Result<PeeringConnection, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let request = PeeringRequest {
            requester_vpc_id: self.vpc_id.clone(),
            peer_vpc_id: target_vpc_id.to_owned(),
            peer_region: target_region.to_owned(),
            peer_owner_id: owner_id.to_owned(),
        };
        let created = self
            .api
            .request_peering_connection(&request, effective)
            .await
            .map_err(SessionError::api)?;
        self.wait_for_peering_visible(&created.id).await
    }

    /// Accepts the pending peering request initiated by
    /// `requester_vpc_id`, waiting for the resource to be visible first.
    /// The requested cache slot is updated with the accepted document.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from [`Self::find_peering_by_requester`]
    /// and returns [`SessionError::Api`] when the accept call fails.
    pub async fn accept_peering(
        &mut self,
        requester_vpc_id: &str,
        dry_run: Option<bool>,
    ) -> Result<PeeringConnection, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let pending = self
            .find_peering_by_requester(requester_vpc_id, dry_run)
            .await?;
        self.wait_for_peering_visible(&pending.id).await?;

        let accepted = self
            .api
            .accept_peering_connection(&pending.id, effective)
            .await
            .map_err(SessionError::api)?;
        self.peering
            .requested
            .insert(accepted.id.clone(), accepted.clone());
        Ok(accepted)
    }

    /// Deletes the peering connection initiated by `requester_vpc_id`,
    /// returning the provider's success flag.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from [`Self::find_peering_by_requester`]
    /// and returns [`SessionError::Api`] when the delete call fails.
    pub async fn delete_peering(
        &mut self,
        requester_vpc_id: &str,
        dry_run: Option<bool>,
    ) -> Result<bool, SessionError> {
        let effective = self.config.dry_run_or(dry_run);
        let pending = self
            .find_peering_by_requester(requester_vpc_id, dry_run)
            .await?;
        self.api
            .delete_peering_connection(&pending.id, effective)
            .await
            .map_err(SessionError::api)
    }

    async fn lookup_single(
        &self,
        filter: &PeeringFilter,
        side: PeeringSide,
        peer_vpc_id: &str,
        dry_run: bool,
    ) -> Result<PeeringConnection, SessionError> {
        let mut connections = self
            .api
            .describe_peering_connections(filter, dry_run)
            .await
            .map_err(SessionError::api)?;

        if connections.len() > 1 {
            return Err(SessionError::AmbiguousPeering {
                side,
                peer_vpc_id: peer_vpc_id.to_owned(),
                matches: connections.len(),
            });
        }
        connections.pop().ok_or_else(|| SessionError::PeeringNotFound {
            side,
            peer_vpc_id: peer_vpc_id.to_owned(),
        })
    }

    async fn wait_for_peering_visible(
        &self,
        connection_id: &str,
    ) -> Result<PeeringConnection, SessionError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            let visible = self
                .api
                .describe_peering_connection(connection_id)
                .await
                .map_err(SessionError::api)?;
            if let Some(connection) = visible {
                return Ok(connection);
            }
            sleep(self.poll_interval).await;
        }

        Err(SessionError::Timeout {
            action: String::from("wait_for_peering_visible"),
            resource_id: connection_id.to_owned(),
        })
    }
}
