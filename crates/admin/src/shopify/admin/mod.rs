//! Shopify Admin API GraphQL client.
//!
//! This module provides a type-safe client for the Shopify Admin API,
//! authenticated with a store access token. Domain operations are split
//! across submodules, each adding an `impl AdminClient` block.

use std::sync::Arc;

use graphql_client::{GraphQLQuery, QueryBody};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::ShopifyStoreConfig;

use super::{AdminShopifyError, GraphQLError};

pub mod classify;
mod collections;
mod companies;
mod customers;
mod discounts;
mod files;
mod lookups;
mod metafields;
mod products;
pub mod queries;
mod retry;

pub use classify::{Classification, check_user_errors, classify};
pub use companies::AddressType;
pub use retry::RetryPolicy;

/// Maximum characters of an unexpected response body kept in the error.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Page size for search queries. Searches should return a handful of
/// records; more than this is treated as whatever came back.
pub(crate) const SEARCH_PAGE_SIZE: i64 = 10;

/// Shopify Admin API GraphQL client.
///
/// Cheap to clone; clones share the HTTP connection pool.
///
/// # Security
///
/// The access token has HIGH PRIVILEGE access to the store. It is never
/// logged and is redacted from `Debug` output.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    retry: RetryPolicy,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("endpoint", &self.inner.endpoint)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyStoreConfig, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint(),
                access_token: config.access_token.clone(),
                retry,
            }),
        }
    }

    /// The GraphQL endpoint requests go to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation, retrying while throttled.
    pub(crate) async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError>
    where
        Q::Variables: Sync,
        Q::ResponseData: DeserializeOwned,
    {
        let body = Q::build_query(variables);
        self.post(&body).await
    }

    /// Send a prepared request body, retrying while throttled.
    ///
    /// Used directly when the operation is only known at runtime.
    pub(crate) async fn post<V, R>(&self, body: &QueryBody<V>) -> Result<R, AdminShopifyError>
    where
        V: Serialize + Sync,
        R: DeserializeOwned,
    {
        retry::retry_with_backoff(self.inner.retry, || self.send_once(body)).await
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn send_once<V, R>(&self, body: &QueryBody<V>) -> Result<R, AdminShopifyError>
    where
        V: Serialize + Sync,
        R: DeserializeOwned,
    {
        tracing::debug!(operation = body.operation_name, "sending GraphQL request");

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|secs| secs.max(0.0).ceil() as u64);
            return Err(AdminShopifyError::RateLimited { retry_after_secs });
        }

        // Check for unauthorized
        if status == StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or revoked access token".to_string(),
            ));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::UnexpectedStatus {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let graphql_response: graphql_client::Response<R> = serde_json::from_slice(&bytes)?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted: Vec<GraphQLError> = errors.into_iter().map(convert_error).collect();
            if converted
                .iter()
                .any(|e| e.code.as_deref() == Some("THROTTLED"))
            {
                return Err(AdminShopifyError::RateLimited {
                    retry_after_secs: None,
                });
            }
            return Err(AdminShopifyError::GraphQL(converted));
        }

        graphql_response
            .data
            .ok_or_else(|| AdminShopifyError::MissingPayload("data".to_string()))
    }
}

fn convert_error(error: graphql_client::Error) -> GraphQLError {
    let path = error
        .path
        .unwrap_or_default()
        .into_iter()
        .map(|fragment| match fragment {
            graphql_client::PathFragment::Key(key) => key,
            graphql_client::PathFragment::Index(index) => index.to_string(),
        })
        .collect();
    let code = error
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("code"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    GraphQLError {
        message: error.message,
        path,
        code,
    }
}

/// Shopify search syntax for an exact field match, with quotes escaped.
pub(crate) fn search_term(field: &str, value: &str) -> String {
    let escaped = value.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("{field}:\"{escaped}\"")
}

/// Unwrap a mutation payload.
///
/// `operation` is the payload field name, e.g. `companyCreate`.
pub(crate) fn require_payload<P>(
    operation: &str,
    payload: Option<P>,
) -> Result<P, AdminShopifyError> {
    payload.ok_or_else(|| AdminShopifyError::MissingPayload(operation.to_string()))
}

/// Unwrap the entity a successful mutation returns.
pub(crate) fn require_entity<T>(field: &str, entity: Option<T>) -> Result<T, AdminShopifyError> {
    entity.ok_or_else(|| AdminShopifyError::MissingPayload(field.to_string()))
}
