//! Runner errors.
use displaydoc::Display;
use thiserror::Error;
use tower::BoxError;

/// Errors that abort a whole [`execute_operation`] call.
///
/// Everything else is either reported through the result channel or only
/// logged.
///
/// [`execute_operation`]: crate::NetworkExecutor::execute_operation
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ExecutionError {
    /// cannot parse operation document: {0}
    Parse(String),

    /// cannot load the project fragment definitions: {0}
    FragmentDefinitions(BoxError),

    /// cannot resolve fragment dependencies: {0}
    FragmentResolution(BoxError),
}

/// Errors raised while building a client for one operation, or while
/// starting that operation.
///
/// They are isolated to the operation they belong to.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// cannot build the HTTP client for '{url}': {reason}
    HttpClient {
        /// The endpoint URL.
        url: String,
        /// The reason the build failed.
        reason: String,
    },

    /// cannot derive a websocket url from '{url}': {reason}
    WebSocketUrl {
        /// The endpoint URL.
        url: String,
        /// The reason the rewrite failed.
        reason: String,
    },

    /// cannot create the websocket request for '{url}': {reason}
    WebSocketRequest {
        /// The websocket URL.
        url: String,
        /// The reason the request could not be built.
        reason: String,
    },

    /// the client for '{url}' was not built for subscriptions
    SubscriptionsUnavailable {
        /// The endpoint URL.
        url: String,
    },
}

/// Transport level failures, reported as the `networkError` of a result
/// event.
///
/// Note that these relate to the transport and not to GraphQL errors.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NetworkError {
    /// HTTP fetch failed from '{url}': {reason}
    Http {
        /// The endpoint URL.
        url: String,
        /// The reason the fetch failed.
        reason: String,
    },

    /// Response not successful: Received status code {status_code}
    HttpStatus {
        /// The HTTP status code returned by the endpoint.
        status_code: u16,
    },

    /// response from '{url}' was malformed: {reason}
    MalformedResponse {
        /// The endpoint URL.
        url: String,
        /// The reason the response could not be read.
        reason: String,
    },

    /// Websocket fetch failed from '{url}': {reason}
    WebSocket {
        /// The websocket URL.
        url: String,
        /// The reason the connection failed.
        reason: String,
    },
}
