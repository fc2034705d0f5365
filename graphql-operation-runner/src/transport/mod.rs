//! Clients carrying operations to an endpoint.

mod http;
#[cfg(test)]
mod testing;
mod websocket;

use url::Url;

pub use self::websocket::websocket_url;
use crate::configuration::Configuration;
use crate::document::OperationKind;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::graphql;
use crate::graphql::ResultStream;
use self::http::HttpTransport;
use self::websocket::WebSocketTransport;

/// Sends operations to one endpoint.
///
/// Each method starts the operation and hands back its events. Failures that
/// happen once the operation is underway are events too.
pub trait OperationClient: Send + Sync {
    /// Starts a query.
    fn query(&self, request: graphql::Request) -> Result<ResultStream, ClientError>;

    /// Starts a mutation.
    fn mutate(&self, request: graphql::Request) -> Result<ResultStream, ClientError>;

    /// Starts a subscription.
    fn subscribe(&self, request: graphql::Request) -> Result<ResultStream, ClientError>;
}

/// Builds the client for one operation.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        endpoint: &Endpoint,
        kind: OperationKind,
        configuration: &Configuration,
    ) -> Result<Box<dyn OperationClient>, ClientError>;
}

/// Queries and mutations over HTTP, subscriptions over WebSocket.
#[derive(Clone, Debug)]
pub struct TransportClient {
    http: HttpTransport,
    websocket: Option<WebSocketTransport>,
    endpoint_url: Url,
}

impl TransportClient {
    /// Builds a client for an operation of the given kind.
    ///
    /// The WebSocket side is only set up for subscriptions.
    pub fn new(
        endpoint: &Endpoint,
        kind: OperationKind,
        configuration: &Configuration,
    ) -> Result<Self, ClientError> {
        let websocket = match kind {
            OperationKind::Subscription => {
                Some(WebSocketTransport::new(endpoint, configuration)?)
            }
            OperationKind::Query | OperationKind::Mutation => None,
        };
        Ok(Self {
            http: HttpTransport::new(endpoint, configuration)?,
            websocket,
            endpoint_url: endpoint.url.clone(),
        })
    }

    /// Whether invalid TLS certificates are accepted on HTTP requests.
    pub fn accepts_invalid_certs(&self) -> bool {
        self.http.accepts_invalid_certs()
    }

    /// The URL subscriptions connect to, if the client supports them.
    pub fn websocket_url(&self) -> Option<&Url> {
        self.websocket.as_ref().map(WebSocketTransport::url)
    }
}

impl OperationClient for TransportClient {
    fn query(&self, request: graphql::Request) -> Result<ResultStream, ClientError> {
        Ok(self.http.stream(request))
    }

    fn mutate(&self, request: graphql::Request) -> Result<ResultStream, ClientError> {
        Ok(self.http.stream(request))
    }

    fn subscribe(&self, request: graphql::Request) -> Result<ResultStream, ClientError> {
        match &self.websocket {
            Some(websocket) => Ok(websocket.subscribe(request)),
            None => Err(ClientError::SubscriptionsUnavailable {
                url: self.endpoint_url.to_string(),
            }),
        }
    }
}

/// Builds a [`TransportClient`] per operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportClientFactory;

impl ClientFactory for TransportClientFactory {
    fn create(
        &self,
        endpoint: &Endpoint,
        kind: OperationKind,
        configuration: &Configuration,
    ) -> Result<Box<dyn OperationClient>, ClientError> {
        Ok(Box::new(TransportClient::new(
            endpoint,
            kind,
            configuration,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;
    use crate::configuration::Tls;
    use crate::result::OperationResult;

    fn endpoint(url: &str) -> Endpoint {
        Endpoint::new(Url::parse(url).unwrap())
    }

    #[test]
    fn subscriptions_get_a_websocket_side() {
        let endpoint = endpoint("https://example.com/graphql");
        let configuration = Configuration::default();

        let client =
            TransportClient::new(&endpoint, OperationKind::Subscription, &configuration).unwrap();
        assert_eq!(
            client.websocket_url().map(Url::as_str),
            Some("wss://example.com/graphql")
        );

        let client = TransportClient::new(&endpoint, OperationKind::Query, &configuration).unwrap();
        assert_eq!(client.websocket_url(), None);
        assert!(matches!(
            client.subscribe(graphql::Request::builder().query("subscription { a }").build()),
            Err(ClientError::SubscriptionsUnavailable { .. })
        ));
    }

    #[test]
    fn subscription_client_needs_a_websocket_url() {
        let endpoint = endpoint("ftp://example.com/graphql");
        let configuration = Configuration::default();
        assert!(matches!(
            TransportClient::new(&endpoint, OperationKind::Subscription, &configuration),
            Err(ClientError::WebSocketUrl { .. })
        ));
    }

    #[test(tokio::test)]
    async fn tls_configuration_reaches_the_client() {
        let configuration = Configuration {
            tls: Tls::builder().reject_unauthorized(false).build(),
            ..Default::default()
        };
        let url = testing::self_signed_server(r#"{"data":{"renamed":true}}"#).await;
        let client =
            TransportClient::new(&Endpoint::new(url), OperationKind::Mutation, &configuration)
                .unwrap();
        assert!(client.accepts_invalid_certs());

        let results: Vec<OperationResult> = client
            .mutate(graphql::Request::builder().query("mutation { renamed }").build())
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            results,
            vec![OperationResult {
                data: Some(json!({"renamed": true})),
                ..Default::default()
            }]
        );
    }
}
