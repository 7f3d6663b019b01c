//! Intercepted request descriptors.

use gatekeeper_core::cache::compute_cache_key;
use reqwest::{Method, header};
use url::Url;

/// How the request was initiated by the browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// A top-level document load.
    Navigate,
    /// Anything else: scripts, images, XHR/fetch calls.
    #[default]
    Subresource,
}

/// An HTTP request as seen by the gatekeeper.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub mode: RequestMode,
}

impl Request {
    /// A plain subresource GET with no extra headers.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: header::HeaderMap::new(), mode: RequestMode::Subresource }
    }

    /// A document navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header; invalid values are dropped with a debug log.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        match header::HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(e) => tracing::debug!("dropping invalid {} header: {}", name, e),
        }
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Whether the declared `Accept` preference includes HTML.
    ///
    /// A missing or non-UTF-8 header counts as not accepting HTML.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
    }

    /// The URL that identifies this request in the cache; the fragment never reaches the server.
    pub fn identity_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// Cache key of this request's identity (method + URL).
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.identity_url().as_str())
    }
}
