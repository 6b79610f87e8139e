//! REST-backed implementation of the provider API.

mod credentials;
mod error;

pub use error::RestApiError;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::{
    ApiFuture, CloudApi, InstanceDescription, PeeringConnection, PeeringFilter, PeeringRequest,
    RouteTable, StopOptions, Subnet, VpcDescription,
};
use crate::config::MezhaConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider client speaking the network/compute HTTP+JSON API.
///
/// Endpoint layout is regional: every resource path is rooted at
/// `<base_url>/regions/<region>`.
#[derive(Clone, Debug)]
pub struct RestCloudApi {
    client: Client,
    base_url: String,
    region: String,
}

#[derive(Debug, serde::Deserialize)]
struct DeletionStatus {
    deleted: bool,
}

impl RestCloudApi {
    /// Builds a client from validated configuration, resolving credentials
    /// according to the configured mode.
    ///
    /// # Errors
    ///
    /// Returns [`RestApiError::Config`] when the configuration is invalid,
    /// [`RestApiError::Credentials`] when no usable credential source can be
    /// established, and [`RestApiError::Http`] when the HTTP client cannot
    /// be constructed.
    pub fn new(config: &MezhaConfig, region: impl Into<String>) -> Result<Self, RestApiError> {
        config.validate()?;
        let mode = config.credential_mode()?;
        let headers = credentials::auth_headers(&mode)?;
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(RestApiError::from)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            region: region.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/regions/{}/{path}", self.base_url, self.region)
    }

    async fn check(response: Response) -> Result<Response, RestApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RestApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RestApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(RestApiError::from)?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(RestApiError::from)
    }

    async fn get_json_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, RestApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(RestApiError::from)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map(Some)
            .map_err(RestApiError::from)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        query: &[(&str, String)],
    ) -> Result<T, RestApiError> {
        let response = self
            .client
            .post(self.url(path))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(RestApiError::from)?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(RestApiError::from)
    }

    async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RestApiError> {
        let response = self
            .client
            .post(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(RestApiError::from)?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(RestApiError::from)
    }

    async fn delete_checked(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, RestApiError> {
        let response = self
            .client
            .delete(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(RestApiError::from)?;
        Self::check(response).await
    }
}

fn dry_run_query(dry_run: bool) -> Vec<(&'static str, String)> {
    vec![("dry_run", dry_run.to_string())]
}

impl CloudApi for RestCloudApi {
    type Error = RestApiError;

    fn describe_vpc<'a>(&'a self, vpc_id: &'a str) -> ApiFuture<'a, VpcDescription, RestApiError> {
        Box::pin(async move { self.get_json(&format!("vpcs/{vpc_id}"), &[]).await })
    }

    fn list_route_tables<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<RouteTable>, RestApiError> {
        Box::pin(async move {
            self.get_json(
                &format!("vpcs/{vpc_id}/route-tables"),
                &dry_run_query(dry_run),
            )
            .await
        })
    }

    fn delete_route<'a>(
        &'a self,
        route_table_id: &'a str,
        destination: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), RestApiError> {
        Box::pin(async move {
            let mut query = dry_run_query(dry_run);
            query.push(("destination", destination.to_owned()));
            self.delete_checked(&format!("route-tables/{route_table_id}/routes"), &query)
                .await?;
            Ok(())
        })
    }

    fn list_subnets<'a>(
        &'a self,
        vpc_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<Subnet>, RestApiError> {
        Box::pin(async move {
            self.get_json(&format!("vpcs/{vpc_id}/subnets"), &dry_run_query(dry_run))
                .await
        })
    }

    fn describe_peering_connections<'a>(
        &'a self,
        filter: &'a PeeringFilter,
        dry_run: bool,
    ) -> ApiFuture<'a, Vec<PeeringConnection>, RestApiError> {
        Box::pin(async move {
            let mut query = dry_run_query(dry_run);
            if let Some(requester) = &filter.requester_vpc_id {
                query.push(("requester_vpc_id", requester.clone()));
            }
            if let Some(accepter) = &filter.accepter_vpc_id {
                query.push(("accepter_vpc_id", accepter.clone()));
            }
            self.get_json("peering-connections", &query).await
        })
    }

    fn describe_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
    ) -> ApiFuture<'a, Option<PeeringConnection>, RestApiError> {
        Box::pin(async move {
            self.get_json_optional(&format!("peering-connections/{connection_id}"))
                .await
        })
    }

    fn request_peering_connection<'a>(
        &'a self,
        request: &'a PeeringRequest,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, RestApiError> {
        Box::pin(async move {
            self.post_json("peering-connections", request, &dry_run_query(dry_run))
                .await
        })
    }

    fn accept_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, PeeringConnection, RestApiError> {
        Box::pin(async move {
            self.post_empty(
                &format!("peering-connections/{connection_id}/accept"),
                &dry_run_query(dry_run),
            )
            .await
        })
    }

    fn delete_peering_connection<'a>(
        &'a self,
        connection_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, bool, RestApiError> {
        Box::pin(async move {
            let response = self
                .delete_checked(
                    &format!("peering-connections/{connection_id}"),
                    &dry_run_query(dry_run),
                )
                .await?;
            let status: DeletionStatus = response.json().await.map_err(RestApiError::from)?;
            Ok(status.deleted)
        })
    }

    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> ApiFuture<'a, Option<InstanceDescription>, RestApiError> {
        Box::pin(async move {
            self.get_json_optional(&format!("instances/{instance_id}"))
                .await
        })
    }

    fn stop_instance<'a>(
        &'a self,
        instance_id: &'a str,
        options: StopOptions,
        dry_run: bool,
    ) -> ApiFuture<'a, (), RestApiError> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(&format!("instances/{instance_id}/stop")))
                .query(&dry_run_query(dry_run))
                .json(&options)
                .send()
                .await
                .map_err(RestApiError::from)?;
            Self::check(response).await?;
            Ok(())
        })
    }

    fn start_instance<'a>(
        &'a self,
        instance_id: &'a str,
        dry_run: bool,
    ) -> ApiFuture<'a, (), RestApiError> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(&format!("instances/{instance_id}/start")))
                .query(&dry_run_query(dry_run))
                .send()
                .await
                .map_err(RestApiError::from)?;
            Self::check(response).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_config;

    #[test]
    fn url_is_rooted_at_the_regional_prefix() {
        let api = RestCloudApi::new(&sample_config(), "us-east-1")
            .unwrap_or_else(|err| panic!("client should build: {err}"));
        assert_eq!(
            api.url("vpcs/vpc-123"),
            "https://api.example.test/v1/regions/us-east-1/vpcs/vpc-123"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = MezhaConfig {
            api_base_url: String::from("https://api.example.test/v1/"),
            ..sample_config()
        };
        let api = RestCloudApi::new(&config, "us-east-1")
            .unwrap_or_else(|err| panic!("client should build: {err}"));
        assert_eq!(
            api.url("subnets"),
            "https://api.example.test/v1/regions/us-east-1/subnets"
        );
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let config = MezhaConfig {
            access_key: None,
            secret_key: None,
            ..sample_config()
        };
        let error = RestCloudApi::new(&config, "us-east-1")
            .expect_err("construction should fail without credentials");
        assert!(matches!(error, RestApiError::Credentials { .. }));
    }
}
