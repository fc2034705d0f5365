//! Logic for loading configuration in to an object model
use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub use crate::protocols::websocket::WebSocketProtocol;


/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    InvalidConfiguration(#[from] serde_yaml::Error),
}

/// The configuration for running operations.
///
/// It is handed to the executor explicitly and read when each per-operation
/// client is built.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// TLS settings for outgoing requests.
    pub tls: Tls,

    /// Subscription settings.
    pub subscription: Subscription,

    /// How a response carrying GraphQL errors is reported.
    pub error_policy: ErrorPolicy,
}

impl Configuration {
    /// The JSON schema of the configuration file.
    pub fn json_schema() -> RootSchema {
        schemars::schema_for!(Configuration)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Configuration::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }
}

/// TLS settings.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Tls {
    /// Verify the certificate of `https` endpoints. Defaults to true.
    ///
    /// Has no effect on `http` endpoints.
    pub reject_unauthorized: bool,
}

impl Default for Tls {
    fn default() -> Self {
        Self {
            reject_unauthorized: true,
        }
    }
}

#[buildstructor::buildstructor]
impl Tls {
    #[builder(visibility = "pub")]
    fn new(reject_unauthorized: Option<bool>) -> Self {
        Self {
            reject_unauthorized: reject_unauthorized.unwrap_or(true),
        }
    }
}

/// Subscription settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Subscription {
    /// The websocket subprotocol spoken to the endpoint.
    pub protocol: WebSocketProtocol,
}

/// How a response carrying GraphQL errors is reported.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// GraphQL errors are reported as an error event and any partial data is
    /// dropped.
    #[default]
    None,
    /// Data and GraphQL errors are reported together.
    All,
}
