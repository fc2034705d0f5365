//! Subscriptions over WebSocket.

use futures::StreamExt;
use futures::future;
use futures::stream;
use http::HeaderMap;
use http::header::SEC_WEBSOCKET_PROTOCOL;
use serde_json_bytes::ByteString;
use serde_json_bytes::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use url::Url;
use uuid::Uuid;

use crate::configuration::Configuration;
use crate::configuration::ErrorPolicy;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::error::NetworkError;
use crate::graphql;
use crate::graphql::Object;
use crate::graphql::ResultStream;
use crate::protocols::websocket;
use crate::protocols::websocket::WebSocketProtocol;
use crate::result::OperationResult;

/// Derives the URL subscriptions connect to from an endpoint URL.
///
/// `http` becomes `ws` and `https` becomes `wss`. The rest of the URL is kept
/// as is.
pub fn websocket_url(url: &Url) -> Result<Url, ClientError> {
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::WebSocketUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    };
    let mut ws_url = url.clone();
    ws_url
        .set_scheme(scheme)
        .map_err(|()| ClientError::WebSocketUrl {
            url: url.to_string(),
            reason: format!("cannot set the scheme '{scheme}'"),
        })?;
    Ok(ws_url)
}

/// Opens one WebSocket connection per subscription.
#[derive(Clone, Debug)]
pub(crate) struct WebSocketTransport {
    url: Url,
    headers: HeaderMap,
    protocol: WebSocketProtocol,
    connection_params: Option<Value>,
    error_policy: ErrorPolicy,
}

impl WebSocketTransport {
    pub(crate) fn new(
        endpoint: &Endpoint,
        configuration: &Configuration,
    ) -> Result<Self, ClientError> {
        let transport = Self {
            url: websocket_url(&endpoint.url)?,
            headers: endpoint.headers.clone(),
            protocol: configuration.subscription.protocol,
            connection_params: connection_params(&endpoint.headers),
            error_policy: configuration.error_policy,
        };
        // the upgrade request is rebuilt per subscription, make sure it can be
        transport.upgrade_request()?;
        Ok(transport)
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    fn upgrade_request(&self) -> Result<http::Request<()>, ClientError> {
        let mut request = self.url.as_str().into_client_request().map_err(|err| {
            ClientError::WebSocketRequest {
                url: self.url.to_string(),
                reason: err.to_string(),
            }
        })?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, self.protocol.into());

        // endpoint headers first, the upgrade headers take precedence
        let mut headers = self.headers.clone();
        headers.extend(request.headers_mut().drain());
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// The events of one subscription.
    ///
    /// The connection is only opened when the stream is first polled. A
    /// failure to connect is the single event of the stream.
    pub(crate) fn subscribe(&self, request: graphql::Request) -> ResultStream {
        let transport = self.clone();
        stream::once(async move {
            match transport.connect(request).await {
                Ok(results) => results,
                Err(err) => {
                    tracing::debug!(url = %transport.url, error = %err, "subscription failed");
                    stream::once(future::ready(OperationResult::network_error(err))).boxed()
                }
            }
        })
        .flatten()
        .boxed()
    }

    async fn connect(&self, request: graphql::Request) -> Result<ResultStream, NetworkError> {
        let url = self.url.to_string();
        let upgrade_request = self
            .upgrade_request()
            .map_err(|err| NetworkError::WebSocket {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        tracing::debug!(url = %self.url, protocol = ?self.protocol, "connecting websocket");
        let (ws_stream, _response) =
            connect_async(upgrade_request)
                .await
                .map_err(|err| NetworkError::WebSocket {
                    url: url.clone(),
                    reason: format!("cannot connect websocket: {err}"),
                })?;

        let subscription = websocket::subscribe(
            ws_stream,
            self.protocol,
            Uuid::new_v4().to_string(),
            self.connection_params.clone(),
            request,
        )
        .await
        .map_err(|err| NetworkError::WebSocket {
            url,
            reason: err.to_string(),
        })?;

        let policy = self.error_policy;
        Ok(subscription
            .map(move |response| OperationResult::from_response(response, policy))
            .boxed())
    }
}

// Endpoint headers double as the `connection_init` payload.
fn connection_params(headers: &HeaderMap) -> Option<Value> {
    if headers.is_empty() {
        return None;
    }
    let params: Object = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (ByteString::from(name.as_str()), Value::from(value)))
        })
        .collect();
    Some(Value::Object(params))
}

#[cfg(test)]
mod tests {
    use http::HeaderName;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;

    fn parse(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn http_schemes_map_to_websocket_schemes() {
        assert_eq!(
            websocket_url(&parse("http://localhost:4000/graphql"))
                .unwrap()
                .as_str(),
            "ws://localhost:4000/graphql"
        );
        assert_eq!(
            websocket_url(&parse("https://example.com/api/graphql?x=1"))
                .unwrap()
                .as_str(),
            "wss://example.com/api/graphql?x=1"
        );
        assert_eq!(
            websocket_url(&parse("wss://example.com/graphql"))
                .unwrap()
                .as_str(),
            "wss://example.com/graphql"
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert_eq!(
            websocket_url(&parse("ftp://example.com/graphql")),
            Err(ClientError::WebSocketUrl {
                url: "ftp://example.com/graphql".to_string(),
                reason: "unsupported scheme 'ftp'".to_string(),
            })
        );
    }

    #[test]
    fn upgrade_request_carries_endpoint_headers_and_subprotocol() {
        let endpoint = Endpoint::new(parse("https://example.com/graphql")).with_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer XXX"),
        );
        let transport = WebSocketTransport::new(&endpoint, &Configuration::default()).unwrap();
        assert_eq!(transport.url().as_str(), "wss://example.com/graphql");

        let request = transport.upgrade_request().unwrap();
        assert_eq!(request.uri(), "wss://example.com/graphql");
        assert_eq!(
            request.headers().get("authorization"),
            Some(&HeaderValue::from_static("Bearer XXX"))
        );
        assert_eq!(
            request.headers().get(SEC_WEBSOCKET_PROTOCOL),
            Some(&HeaderValue::from_static("graphql-transport-ws"))
        );
        assert_eq!(
            transport.connection_params,
            Some(json!({"authorization": "Bearer XXX"}))
        );
    }

    #[test]
    fn no_headers_no_connection_params() {
        assert_eq!(connection_params(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_single_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::new(parse(&format!("http://{address}/graphql")));
        let transport = WebSocketTransport::new(&endpoint, &Configuration::default()).unwrap();
        let results: Vec<OperationResult> = transport
            .subscribe(
                graphql::Request::builder()
                    .query("subscription { userWasCreated { id } }")
                    .build(),
            )
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        let network_error = results[0]
            .error
            .as_ref()
            .and_then(|error| error.network_error.as_ref())
            .unwrap();
        assert!(
            network_error
                .to_string()
                .starts_with(&format!("Websocket fetch failed from 'ws://{address}/graphql'"))
        );
    }
}
