//! Conversion of buffered `http` messages into the traffic model.

use crate::error::{ValidatorError, ValidatorResult};
use crate::model::{MultiMap, NormalizedRequest, NormalizedResponse};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;

/// Snapshot of a request whose body was collected into `body`.
///
/// Bodies that are not valid UTF-8 are rejected.
pub(crate) fn normalize_request(
    parts: &http::request::Parts,
    body: &Bytes,
) -> ValidatorResult<NormalizedRequest> {
    let mut request = NormalizedRequest::new(parts.method.as_str(), parts.uri.path());
    request.headers = header_multimap(&parts.headers);

    if let Some(query) = parts.uri.query() {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            request
                .query_parameters
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }

    if !body.is_empty() {
        let text = std::str::from_utf8(body).map_err(|e| ValidatorError::UnsupportedPayload {
            content_type: parts
                .headers
                .get(CONTENT_TYPE)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_else(|| "<none>".to_string()),
            reason: format!("request body is not valid UTF-8 ({})", e),
        })?;
        request.body = Some(text.to_string());
    }
    Ok(request)
}

/// Snapshot of a response whose body was collected into `body`. Invalid UTF-8 is replaced.
pub(crate) fn normalize_response(parts: &http::response::Parts, body: &Bytes) -> NormalizedResponse {
    let mut response = NormalizedResponse::new(parts.status.as_u16());
    response.headers = header_multimap(&parts.headers);
    if !body.is_empty() {
        response.body = Some(String::from_utf8_lossy(body).into_owned());
    }
    response
}

fn header_multimap(headers: &HeaderMap) -> MultiMap {
    let mut out = MultiMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}
