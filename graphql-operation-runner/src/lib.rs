//! Runs the GraphQL operations of an editor document against a remote
//! endpoint and streams their results back to the editor.
//!
//! Queries and mutations are POSTed over HTTP, subscriptions go over a
//! WebSocket. Fragments the document depends on are inlined before sending.

#![warn(unreachable_pub)]

pub mod configuration;
pub mod consumer;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod graphql;
pub mod result;
pub mod transport;

mod protocols {
    pub(crate) mod websocket;
}

pub use configuration::Configuration;
pub use consumer::ResultConsumer;
pub use consumer::UpdateCallback;
pub use document::ExtractedTemplateLiteral;
pub use document::OperationKind;
pub use endpoint::Endpoint;
pub use error::ClientError;
pub use error::ExecutionError;
pub use error::NetworkError;
pub use executor::DiagnosticSink;
pub use executor::NetworkExecutor;
pub use result::OperationError;
pub use result::OperationResult;
