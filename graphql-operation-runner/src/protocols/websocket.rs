//! GraphQL over WebSocket, client side.
//!
//! Two subprotocols are spoken. `graphql-transport-ws` is the protocol of the
//! graphql-ws project. `graphql-ws` is the older subscriptions-transport-ws
//! protocol, kept for servers that never moved on.
//!
//! A subscription owns its socket: [`subscribe`] runs the handshake and hands
//! back a stream of responses. Dropping that stream stops the subscription on
//! the server and closes the socket.

use std::time::Duration;

use displaydoc::Display;
use futures::Sink;
use futures::SinkExt;
use futures::Stream;
use futures::StreamExt;
use futures::stream;
use http::HeaderValue;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::graphql;

/// How long the server has to acknowledge `connection_init`.
pub(crate) const CONNECTION_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// The subscription protocol spoken over the socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebSocketProtocol {
    /// graphql-ws, subprotocol `graphql-transport-ws`.
    #[default]
    GraphqlWs,
    /// subscriptions-transport-ws, subprotocol `graphql-ws`.
    SubscriptionsTransportWs,
}

impl WebSocketProtocol {
    /// The `Sec-WebSocket-Protocol` value of the upgrade request.
    pub(crate) const fn subprotocol(self) -> &'static str {
        match self {
            WebSocketProtocol::GraphqlWs => "graphql-transport-ws",
            WebSocketProtocol::SubscriptionsTransportWs => "graphql-ws",
        }
    }

    fn start(self, id: &str, payload: graphql::Request) -> ClientMessage {
        let id = id.to_string();
        match self {
            WebSocketProtocol::GraphqlWs => ClientMessage::Subscribe { id, payload },
            WebSocketProtocol::SubscriptionsTransportWs => ClientMessage::Start { id, payload },
        }
    }

    fn stop(self, id: &str) -> ClientMessage {
        let id = id.to_string();
        match self {
            WebSocketProtocol::GraphqlWs => ClientMessage::Complete { id },
            WebSocketProtocol::SubscriptionsTransportWs => ClientMessage::Stop { id },
        }
    }
}

impl From<WebSocketProtocol> for HeaderValue {
    fn from(protocol: WebSocketProtocol) -> Self {
        HeaderValue::from_static(protocol.subprotocol())
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Subscribe {
        id: String,
        payload: graphql::Request,
    },
    Start {
        id: String,
        payload: graphql::Request,
    },
    Complete {
        id: String,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
    Pong,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck,
    ConnectionError {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    #[serde(alias = "data")]
    Next {
        id: String,
        payload: graphql::Response,
    },
    Error {
        id: String,
        payload: ErrorPayload,
    },
    Complete {
        id: String,
    },
    Ping,
    Pong,
    #[serde(rename = "ka")]
    KeepAlive,
}

// graphql-ws sends a list of errors, subscriptions-transport-ws a single one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Many(Vec<graphql::Error>),
    One(graphql::Error),
}

impl ErrorPayload {
    fn into_errors(self) -> Vec<graphql::Error> {
        match self {
            ErrorPayload::Many(errors) => errors,
            ErrorPayload::One(error) => vec![error],
        }
    }
}

/// Failures before the first result.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
pub(crate) enum ProtocolError {
    /// cannot send to websocket connection: {0}
    Send(String),
    /// cannot read from websocket connection: {0}
    Read(String),
    /// cannot receive connection ack from websocket connection
    AckTimeout,
    /// connection rejected by the server: {0}
    Rejected(String),
    /// expected a connection ack, received: {0}
    UnexpectedMessage(String),
    /// websocket connection closed before the connection ack
    ClosedBeforeAck,
}

/// An upgraded socket.
pub(crate) trait Socket:
    Stream<Item = Result<Message, tungstenite::Error>>
    + Sink<Message, Error = tungstenite::Error>
    + Unpin
    + Send
    + 'static
{
}

impl<T> Socket for T where
    T: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin
        + Send
        + 'static
{
}

/// Starts subscription `id` on an upgraded socket.
///
/// Sends `connection_init` with `connection_params` and waits at most
/// [`CONNECTION_ACK_TIMEOUT`] for the server to acknowledge it. Pings received
/// in the meantime are answered.
pub(crate) async fn subscribe<S: Socket>(
    mut socket: S,
    protocol: WebSocketProtocol,
    id: String,
    connection_params: Option<Value>,
    request: graphql::Request,
) -> Result<impl Stream<Item = graphql::Response> + Send + 'static, ProtocolError> {
    send(
        &mut socket,
        &ClientMessage::ConnectionInit {
            payload: connection_params,
        },
    )
    .await?;
    tokio::time::timeout(CONNECTION_ACK_TIMEOUT, wait_for_ack(&mut socket))
        .await
        .map_err(|_| ProtocolError::AckTimeout)??;

    send(&mut socket, &protocol.start(&id, request)).await?;
    tracing::debug!(%id, ?protocol, "subscription started");

    let session = Session {
        socket: Some(socket),
        id,
        protocol,
    };
    Ok(stream::unfold(session, |mut session| async move {
        let response = session.next_response().await?;
        Some((response, session))
    }))
}

async fn wait_for_ack<S: Socket>(socket: &mut S) -> Result<(), ProtocolError> {
    while let Some(message) = socket.next().await {
        let message = message.map_err(|err| ProtocolError::Read(err.to_string()))?;
        match decode(message) {
            Incoming::Message(ServerMessage::ConnectionAck) => return Ok(()),
            Incoming::Message(ServerMessage::Ping) => send(socket, &ClientMessage::Pong).await?,
            Incoming::Message(ServerMessage::Pong | ServerMessage::KeepAlive) | Incoming::Ignored => {}
            Incoming::Message(ServerMessage::ConnectionError { payload }) => {
                return Err(ProtocolError::Rejected(
                    payload.map(|payload| payload.to_string()).unwrap_or_default(),
                ));
            }
            Incoming::Message(other) => {
                return Err(ProtocolError::UnexpectedMessage(format!("{other:?}")));
            }
            Incoming::Invalid(err) => {
                return Err(ProtocolError::UnexpectedMessage(err.to_string()));
            }
            Incoming::Closed(_) => return Err(ProtocolError::ClosedBeforeAck),
        }
    }
    Err(ProtocolError::ClosedBeforeAck)
}

async fn send<S: Socket>(socket: &mut S, message: &ClientMessage) -> Result<(), ProtocolError> {
    let text = serde_json::to_string(message).map_err(|err| ProtocolError::Send(err.to_string()))?;
    socket
        .send(Message::text(text))
        .await
        .map_err(|err| ProtocolError::Send(err.to_string()))
}

enum Incoming {
    Message(ServerMessage),
    Invalid(serde_json::Error),
    Closed(Option<CloseFrame>),
    Ignored,
}

fn decode(message: Message) -> Incoming {
    let parsed = match message {
        Message::Text(text) => serde_json::from_str(text.as_str()),
        Message::Binary(bytes) => serde_json::from_slice(&bytes),
        Message::Close(frame) => return Incoming::Closed(frame),
        // frame level pings are answered by tungstenite
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Incoming::Ignored,
    };
    match parsed {
        Ok(message) => Incoming::Message(message),
        Err(err) => Incoming::Invalid(err),
    }
}

fn error_response(message: String, code: &str) -> graphql::Response {
    graphql::Response::builder()
        .error(
            graphql::Error::builder()
                .message(message)
                .extension_code(code)
                .build(),
        )
        .build()
}

/// A started subscription. `socket` is `None` once the subscription is over.
struct Session<S: Socket> {
    socket: Option<S>,
    id: String,
    protocol: WebSocketProtocol,
}

impl<S: Socket> Session<S> {
    async fn next_response(&mut self) -> Option<graphql::Response> {
        loop {
            let socket = self.socket.as_mut()?;
            let incoming = match socket.next().await {
                Some(Ok(message)) => decode(message),
                Some(Err(err)) => {
                    self.socket = None;
                    return Some(error_response(
                        format!("cannot read message from websocket: {err}"),
                        "WEBSOCKET_MESSAGE_ERROR",
                    ));
                }
                None => {
                    self.socket = None;
                    return None;
                }
            };

            match incoming {
                Incoming::Message(ServerMessage::Next { id, payload }) if id == self.id => {
                    return Some(payload);
                }
                Incoming::Message(ServerMessage::Error { id, payload }) if id == self.id => {
                    self.finish().await;
                    return Some(
                        graphql::Response::builder()
                            .errors(payload.into_errors())
                            .build(),
                    );
                }
                Incoming::Message(ServerMessage::Complete { id }) if id == self.id => {
                    self.finish().await;
                    return None;
                }
                Incoming::Message(ServerMessage::Ping) => {
                    if let Err(err) = send(socket, &ClientMessage::Pong).await {
                        tracing::debug!(id = %self.id, "cannot answer ping: {err}");
                    }
                }
                Incoming::Message(_) | Incoming::Ignored => {}
                Incoming::Invalid(err) => {
                    return Some(error_response(
                        format!("cannot deserialize websocket server message: {err}"),
                        "INVALID_WEBSOCKET_SERVER_MESSAGE_FORMAT",
                    ));
                }
                Incoming::Closed(frame) => {
                    self.socket = None;
                    return match frame {
                        Some(frame) if frame.code != CloseCode::Normal => Some(error_response(
                            format!(
                                "websocket connection has been closed with error code '{}' and reason '{}'",
                                frame.code, frame.reason
                            ),
                            "WEBSOCKET_CLOSE_ERROR",
                        )),
                        _ => None,
                    };
                }
            }
        }
    }

    // The server ended the subscription, nothing to stop.
    async fn finish(&mut self) {
        if let Some(socket) = self.socket.take() {
            close(socket, self.protocol, None).await;
        }
    }
}

impl<S: Socket> Drop for Session<S> {
    fn drop(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        let stop = self.protocol.stop(&self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close(socket, self.protocol, Some(stop)));
            }
            Err(_) => tracing::debug!(id = %self.id, "no runtime left to stop the subscription"),
        }
    }
}

async fn close<S: Socket>(mut socket: S, protocol: WebSocketProtocol, stop: Option<ClientMessage>) {
    let terminate = (protocol == WebSocketProtocol::SubscriptionsTransportWs)
        .then_some(ClientMessage::ConnectionTerminate);
    for message in stop.iter().chain(terminate.iter()) {
        if let Err(err) = send(&mut socket, message).await {
            tracing::debug!("cannot stop subscription: {err}");
            return;
        }
    }
    if let Err(err) = socket.close().await {
        tracing::trace!("cannot close websocket: {err}");
    }
}
