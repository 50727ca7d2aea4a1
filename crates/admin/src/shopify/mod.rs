//! Shopify Admin API client.
//!
//! # Architecture
//!
//! - Operations are `.graphql` documents sent through `graphql_client`'s
//!   [`QueryBody`](graphql_client::QueryBody); one document may hold several
//!   operations, selected by `operationName`
//! - Rate limiting (HTTP 429 or a `THROTTLED` GraphQL error) is retried with
//!   exponential backoff; every other error fails fast
//! - Mutation `userErrors` go through one classification table, see
//!   [`classify`](admin::classify)
//!
//! # Example
//!
//! ```rust,ignore
//! use storebridge_admin::shopify::{AdminClient, RetryPolicy};
//!
//! let client = AdminClient::new(&config.target, RetryPolicy::default());
//! let company = client.get_company(&id, 250).await?;
//! ```

pub mod admin;
pub mod types;

pub use admin::{AdminClient, RetryPolicy};
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify (HTTP 429 or `THROTTLED`).
    #[error(
        "Rate limited{}",
        .retry_after_secs.map(|s| format!(", retry after {s} seconds")).unwrap_or_default()
    )]
    RateLimited {
        /// Value of the `Retry-After` header, when sent.
        retry_after_secs: Option<u64>,
    },

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus {
        /// Status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// A mutation returned user errors that are not known to be benign.
    #[error("{operation} rejected: {}", format_user_errors(.errors))]
    UserErrors {
        /// Mutation field name, e.g. `companyCreate`.
        operation: String,
        /// The errors as returned.
        errors: Vec<UserError>,
    },

    /// The response carried no data for the requested field.
    #[error("No {0} returned in response")]
    MissingPayload(String),
}

impl AdminShopifyError {
    /// Whether the request may succeed if sent again unchanged.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<String>,
    /// `extensions.code`, e.g. `THROTTLED`.
    pub code: Option<String>,
}

/// A field-scoped error from a mutation payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserError {
    /// Input path the error refers to.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable code, when the payload exposes one.
    #[serde(default)]
    pub code: Option<String>,
}

impl UserError {
    /// Build a user error from a message alone.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
            code: None,
        }
    }
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
                code: None,
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                path: vec![],
                code: None,
            },
        ];
        let err = AdminShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AdminShopifyError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");
        let err = AdminShopifyError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "Rate limited");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_user_errors_display() {
        let err = AdminShopifyError::UserErrors {
            operation: "companyCreate".to_string(),
            errors: vec![
                UserError {
                    field: Some(vec!["input".into(), "company".into(), "name".into()]),
                    message: "can't be blank".into(),
                    code: Some("BLANK".into()),
                },
                UserError::message("Something else"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "companyCreate rejected: input.company.name: can't be blank; Something else"
        );
    }

    #[test]
    fn test_unauthorized_error() {
        let err = AdminShopifyError::Unauthorized("Invalid token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Invalid token");
    }
}
