#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Resolves `$ref` targets inside the loaded document.
//!
//! References are never fetched: a reference is followed only when it is a local
//! JSON Pointer (`#/...`) or when its document part matches the document's own
//! `$self` URI or retrieval location.

use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::path::Path;
use url::Url;

/// Normalizes a `$ref` to a local JSON Pointer (e.g. `#/components/...`) if it targets the
/// current document.
///
/// Returns `None` if the reference is external or lacks a fragment.
pub(crate) fn normalize_ref_to_local(ref_str: &str, self_uris: &[&str]) -> Option<String> {
    if ref_str.starts_with("#/") || ref_str == "#" {
        return Some(ref_str.to_string());
    }

    let (document, fragment) = ref_str.split_once('#')?;
    if self_uris
        .iter()
        .any(|self_uri| ref_doc_matches_self(document, self_uri))
    {
        return Some(format!("#{}", fragment));
    }
    None
}

/// Looks up a local pointer (`#/a/b`) in `document`.
pub(crate) fn resolve_local<'a>(document: &'a Value, local: &str) -> Option<&'a Value> {
    let pointer = local.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(document);
    }

    let mut current = document;
    for segment in pointer.trim_start_matches('/').split('/') {
        let key = decode_pointer_segment(segment);
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent-encoding).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Escapes a key for use as a JSON Pointer segment.
pub(crate) fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn ref_doc_matches_self(ref_doc: &str, self_uri: &str) -> bool {
    if ref_doc == self_uri {
        return true;
    }

    if let (Ok(ref_url), Ok(self_url)) = (Url::parse(ref_doc), Url::parse(self_uri)) {
        return ref_url.scheme() == self_url.scheme()
            && ref_url.host() == self_url.host()
            && ref_url.port() == self_url.port()
            && ref_url.path() == self_url.path();
    }

    // An absolute-path `$self` (e.g. "/api/openapi") compares against the URL path.
    if self_uri.starts_with('/') {
        if let Ok(ref_url) = Url::parse(ref_doc) {
            return ref_url.path() == self_uri;
        }
    }

    if !self_uri.contains("://") && !ref_doc.contains("://") {
        return Path::new(ref_doc) == Path::new(self_uri);
    }

    false
}
