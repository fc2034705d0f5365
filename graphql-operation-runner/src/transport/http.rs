//! Queries and mutations over HTTP.

use futures::StreamExt;
use futures::stream;
use http::HeaderValue;
use http::header::ACCEPT;
use url::Url;

use crate::configuration::Configuration;
use crate::configuration::ErrorPolicy;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::error::NetworkError;
use crate::graphql;
use crate::graphql::ResultStream;
use crate::result::OperationResult;

static ACCEPT_GRAPHQL_JSON: HeaderValue =
    HeaderValue::from_static("application/json, application/graphql-response+json");

/// POSTs GraphQL requests to an endpoint.
#[derive(Clone, Debug)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    accept_invalid_certs: bool,
    error_policy: ErrorPolicy,
}

impl HttpTransport {
    pub(crate) fn new(
        endpoint: &Endpoint,
        configuration: &Configuration,
    ) -> Result<Self, ClientError> {
        // certificate verification only applies to secure endpoints
        let accept_invalid_certs = endpoint.is_secure() && !configuration.tls.reject_unauthorized;

        let mut builder = reqwest::Client::builder().default_headers(endpoint.headers.clone());
        if accept_invalid_certs {
            tracing::warn!(
                url = %endpoint.url,
                "TLS certificate verification is disabled for this endpoint"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|err| ClientError::HttpClient {
            url: endpoint.url.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            client,
            url: endpoint.url.clone(),
            accept_invalid_certs,
            error_policy: configuration.error_policy,
        })
    }

    pub(crate) fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    /// A single-event stream with the outcome of the request.
    pub(crate) fn stream(&self, request: graphql::Request) -> ResultStream {
        let transport = self.clone();
        stream::once(async move { transport.execute(request).await }).boxed()
    }

    pub(crate) async fn execute(&self, request: graphql::Request) -> OperationResult {
        tracing::debug!(
            url = %self.url,
            operation_name = ?request.operation_name,
            "sending GraphQL request"
        );
        let response = match self
            .client
            .post(self.url.clone())
            .header(ACCEPT, ACCEPT_GRAPHQL_JSON.clone())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return OperationResult::network_error(NetworkError::Http {
                    url: self.url.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                return OperationResult::network_error(NetworkError::Http {
                    url: self.url.to_string(),
                    reason: err.to_string(),
                });
            }
        };
        tracing::trace!(url = %self.url, %status, "received GraphQL response");

        match graphql::Response::from_bytes(&body) {
            Ok(response) if status.is_success() => {
                OperationResult::from_response(response, self.error_policy)
            }
            // servers commonly reject invalid operations with a 4xx and a list of errors
            Ok(response) if !response.errors.is_empty() => {
                OperationResult::graphql_errors(response.errors)
            }
            Err(reason) if status.is_success() => {
                OperationResult::network_error(NetworkError::MalformedResponse {
                    url: self.url.to_string(),
                    reason,
                })
            }
            _ => OperationResult::network_error(NetworkError::HttpStatus {
                status_code: status.as_u16(),
            }),
        }
    }
}
