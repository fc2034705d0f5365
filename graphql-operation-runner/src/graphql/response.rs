use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;

use super::Error;
use super::Object;

/// A graphql response as returned by the endpoint, over HTTP or as the
/// payload of a WebSocket `next` message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>, extensions: Map<ByteString, Value>) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    /// Create a [`Response`] from the supplied bytes.
    ///
    /// Returns the reason when the bytes are not a GraphQL response.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Response, String> {
        let response: Response = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
        // Graphql spec says:
        // If the data entry in the response is not present, the errors entry in the response must not be empty.
        if response.data.is_none() && response.errors.is_empty() {
            return Err(
                "graphql response without data must contain at least one error".to_string(),
            );
        }
        Ok(response)
    }
}
