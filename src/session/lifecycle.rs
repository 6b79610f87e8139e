//! Batch instance lifecycle: stop and start with bounded state waits.

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::time::sleep;

use crate::api::{CloudApi, InstanceState, StopOptions};

use super::{SessionError, VpcSession};

/// Outcome of one instance in a batch operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstanceOutcome {
    /// The instance reached the stopped state.
    Stopped,
    /// The instance reached the running state.
    Started,
    /// The stop/start call or the state wait failed; the batch continued.
    Failed {
        /// What went wrong, as reported by the provider or the wait.
        message: String,
    },
}

impl<A: CloudApi> VpcSession<A> {
    /// Stops every configured instance, one at a time, waiting for each to
    /// reach the stopped state before moving on.
    ///
    /// Per-instance failures are captured in the returned map and never
    /// abort the remaining instances. Under dry-run the provider only
    /// validates the request, so the state wait is skipped.
    pub async fn stop_all(
        &mut self,
        options: StopOptions,
        dry_run: Option<bool>,
    ) -> BTreeMap<String, InstanceOutcome> {
        let effective = self.config.dry_run_or(dry_run);
        let ids = self.instance_ids.clone();
        let mut outcomes = BTreeMap::new();
        for instance_id in ids {
            let result = self.stop_one(&instance_id, options, effective).await;
            let outcome = Self::outcome(&instance_id, result, InstanceOutcome::Stopped);
            outcomes.insert(instance_id, outcome);
        }
        outcomes
    }

    /// Starts every configured instance, one at a time, waiting for each to
    /// reach the running state before moving on. Same per-instance fault
    /// isolation as [`Self::stop_all`].
    pub async fn start_all(&mut self, dry_run: Option<bool>) -> BTreeMap<String, InstanceOutcome> {
        let effective = self.config.dry_run_or(dry_run);
        let ids = self.instance_ids.clone();
        let mut outcomes = BTreeMap::new();
        for instance_id in ids {
            let result = self.start_one(&instance_id, effective).await;
            let outcome = Self::outcome(&instance_id, result, InstanceOutcome::Started);
            outcomes.insert(instance_id, outcome);
        }
        outcomes
    }

    fn outcome(
        instance_id: &str,
        result: Result<(), SessionError>,
        success: InstanceOutcome,
    ) -> InstanceOutcome {
        match result {
            Ok(()) => success,
            Err(error) => {
                tracing::warn!(instance_id, %error, "instance lifecycle operation failed");
                InstanceOutcome::Failed {
                    message: error.to_string(),
                }
            }
        }
    }

    async fn stop_one(
        &self,
        instance_id: &str,
        options: StopOptions,
        dry_run: bool,
    ) -> Result<(), SessionError> {
        self.api
            .stop_instance(instance_id, options, dry_run)
            .await
            .map_err(SessionError::api)?;
        if dry_run {
            return Ok(());
        }
        tracing::info!(instance_id, "waiting for instance to stop");
        self.wait_for_instance_state(instance_id, InstanceState::Stopped)
            .await
    }

    async fn start_one(&self, instance_id: &str, dry_run: bool) -> Result<(), SessionError> {
        self.api
            .start_instance(instance_id, dry_run)
            .await
            .map_err(SessionError::api)?;
        if dry_run {
            return Ok(());
        }
        tracing::info!(instance_id, "waiting for instance to start");
        self.wait_for_instance_state(instance_id, InstanceState::Running)
            .await
    }

    async fn wait_for_instance_state(
        &self,
        instance_id: &str,
        target: InstanceState,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            let described = self
                .api
                .describe_instance(instance_id)
                .await
                .map_err(SessionError::api)?;
            if let Some(instance) = described
                && instance.state == target
            {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }

        Err(SessionError::Timeout {
            action: String::from("wait_for_instance_state"),
            resource_id: instance_id.to_owned(),
        })
    }
}
