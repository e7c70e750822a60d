#![deny(missing_docs)]

//! # Traffic Model
//!
//! Plain snapshots of an HTTP exchange, independent of any client library.
//! The pipeline builds one of each per call; the engine and whitelist rules only
//! ever see these shapes.

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered multimap used for headers and query parameters.
pub type MultiMap = IndexMap<String, Vec<String>>;

/// The API operation a request resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Operation {
    /// `operationId` from the contract, if the operation declares one and was resolved.
    pub id: Option<String>,
}

impl Operation {
    /// Creates an operation with the given id.
    pub fn new(id: Option<String>) -> Self {
        Self { id }
    }
}

/// Snapshot of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// HTTP method, upper case (e.g. `POST`).
    pub method: Option<String>,
    /// Percent-encoded request path without query string.
    pub path: Option<String>,
    /// Request headers in wire order.
    pub headers: MultiMap,
    /// Decoded query parameters in wire order.
    pub query_parameters: MultiMap,
    /// Request body as text. `None` when the request carries no body.
    pub body: Option<String>,
}

impl NormalizedRequest {
    /// Starts a request snapshot for `method` and `path`.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Some(method.into().to_ascii_uppercase()),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Appends a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Appends values for a query parameter.
    pub fn with_query_param<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.query_parameters
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets the body. Empty strings are stored as "no body".
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    /// Header values by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        find_header(&self.headers, name)
    }

    /// First `Content-Type` value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Snapshot of an incoming response, taken after the body was buffered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedResponse {
    /// HTTP status code. `None` while validating the request half of an exchange.
    pub status_code: Option<u16>,
    /// Response headers in wire order.
    pub headers: MultiMap,
    /// Response body as text. `None` when the body was empty.
    pub body: Option<String>,
}

impl NormalizedResponse {
    /// Starts a response snapshot with `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status_code: Some(status),
            ..Self::default()
        }
    }

    /// Appends a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Sets the body. Empty strings are stored as "no body".
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    /// Header values by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        find_header(&self.headers, name)
    }

    /// First `Content-Type` value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

fn find_header<'a>(headers: &'a MultiMap, name: &str) -> Option<&'a [String]> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = NormalizedRequest::new("post", "/users")
            .with_header("Content-Type", "application/json")
            .with_header("X-Trace", "a")
            .with_header("x-trace", "b");

        assert_eq!(req.method.as_deref(), Some("POST"));
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.header("x-trace").unwrap(), ["a"]);
        assert_eq!(req.headers.len(), 3);
    }

    #[test]
    fn test_empty_body_is_absent() {
        let req = NormalizedRequest::new("GET", "/users").with_body("");
        assert!(req.body.is_none());

        let resp = NormalizedResponse::new(204).with_body("");
        assert!(resp.body.is_none());
        assert_eq!(resp.status_code, Some(204));
    }

    #[test]
    fn test_query_params_accumulate() {
        let req = NormalizedRequest::new("GET", "/users")
            .with_query_param("tag", ["a"])
            .with_query_param("tag", ["b", "c"]);
        assert_eq!(req.query_parameters["tag"], ["a", "b", "c"]);
    }
}
