//! GraphQL wire types shared by both transports.

mod request;
mod response;

use std::fmt;
use std::pin::Pin;

use futures::Stream;
pub use request::Request;
pub use response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::result::OperationResult;

/// A JSON object, as used for variables and extensions.
pub type Object = JsonMap<ByteString, Value>;

/// An asynchronous [`Stream`] of [`OperationResult`]s.
///
/// A query or mutation yields a single event; a subscription yields one event
/// per message pushed by the server, until the server completes it.
pub type ResultStream = Pin<Box<dyn Stream<Item = OperationResult> + Send>>;

/// A 1-based line and column in the operation text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// One segment of the path to a field in [`Response::data`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum PathElement {
    /// An index in a list.
    Index(usize),
    /// A key in an object.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

/// An entry of a response's `errors` list.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Error {
    pub message: String,

    /// Where in the operation text the error happened.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// Path of the failing field in the response data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathElement>>,

    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    /// `Error::builder().message(..)` plus any of `location`, `path`,
    /// `extension` and `extension_code`.
    ///
    /// `extension_code` fills `extensions.code` unless an `extension("code", ..)`
    /// was given.
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Vec<PathElement>>,
        extension_code: Option<String>,
        // spelled out so buildstructor generates the `extension` adder
        mut extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        if let Some(code) = extension_code {
            extensions.entry("code").or_insert(Value::from(code));
        }
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
