//! Result events emitted by a transport for one operation.

use serde_json_bytes::Value;

use crate::configuration::ErrorPolicy;
use crate::error::NetworkError;
use crate::graphql;

/// One event of a result stream.
///
/// Either `data`/`errors` or `error` is set, following the shape of the
/// events a GraphQL client reports. The consumer checks both independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// The response data.
    pub data: Option<Value>,
    /// GraphQL errors reported alongside data.
    pub errors: Option<Vec<graphql::Error>>,
    /// The operation failed.
    pub error: Option<OperationError>,
}

/// Why an operation failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationError {
    /// Errors returned by the server.
    pub graphql_errors: Vec<graphql::Error>,
    /// The transport failed.
    pub network_error: Option<NetworkError>,
}

impl OperationResult {
    /// Turns a GraphQL response into an event, according to the policy.
    pub fn from_response(response: graphql::Response, policy: ErrorPolicy) -> Self {
        match policy {
            ErrorPolicy::None if !response.errors.is_empty() => {
                Self::graphql_errors(response.errors)
            }
            ErrorPolicy::None => Self {
                data: response.data,
                ..Default::default()
            },
            ErrorPolicy::All => Self {
                data: response.data,
                errors: (!response.errors.is_empty()).then_some(response.errors),
                error: None,
            },
        }
    }

    /// An event carrying only GraphQL errors.
    pub fn graphql_errors(errors: Vec<graphql::Error>) -> Self {
        Self {
            error: Some(OperationError {
                graphql_errors: errors,
                network_error: None,
            }),
            ..Default::default()
        }
    }

    /// An event carrying a transport failure.
    pub fn network_error(error: NetworkError) -> Self {
        Self {
            error: Some(OperationError {
                graphql_errors: Vec::new(),
                network_error: Some(error),
            }),
            ..Default::default()
        }
    }
}
