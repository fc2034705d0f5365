//! The remote server operations are sent to.

use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// A configured remote GraphQL server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// The URL queries and mutations are POSTed to.
    ///
    /// Subscriptions connect to the same URL with the `ws`/`wss` scheme.
    pub url: Url,

    /// Headers sent with every request.
    #[serde(with = "http_serde::header_map", default)]
    pub headers: HeaderMap,
}

impl Endpoint {
    /// An endpoint without any headers.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether the endpoint is reached over TLS.
    pub(crate) fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}
