//! Media type matching and response status selection.

use indexmap::IndexMap;

/// Lower-cased media type without parameters (`application/json; charset=utf-8` becomes
/// `application/json`).
pub(crate) fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase()
}

fn is_sequential_json_media_type(normalized: &str) -> bool {
    matches!(
        normalized,
        "application/jsonl" | "application/x-ndjson" | "application/json-seq"
    ) || normalized.ends_with("+jsonl")
        || normalized.ends_with("+ndjson")
        || normalized.ends_with("+json-seq")
}

/// Single-document JSON media types (`application/json`, `*+json`).
pub(crate) fn is_json_media_type(media_type: &str) -> bool {
    let normalized = normalize_media_type(media_type);
    normalized == "application/json"
        || normalized == "application/*+json"
        || (normalized.ends_with("+json") && !is_sequential_json_media_type(&normalized))
}

/// `application/x-www-form-urlencoded`.
pub(crate) fn is_form_media_type(media_type: &str) -> bool {
    normalize_media_type(media_type) == "application/x-www-form-urlencoded"
}

/// `text/*` and XML types.
pub(crate) fn is_text_media_type(media_type: &str) -> bool {
    let normalized = normalize_media_type(media_type);
    normalized.starts_with("text/")
        || normalized == "application/xml"
        || normalized.ends_with("+xml")
}

/// How well a declared media range matches an actual content type.
///
/// Exact match scores 3, `type/*+suffix` 2, `type/*` 1, `*/*` 0; `None` when it
/// does not match at all.
pub(crate) fn media_type_specificity(pattern: &str, actual: &str) -> Option<i32> {
    let pattern = normalize_media_type(pattern);
    let actual = normalize_media_type(actual);

    if pattern == actual {
        return Some(3);
    }
    if pattern == "*/*" {
        return Some(0);
    }
    if let Some(idx) = pattern.find('*') {
        let (prefix, rest) = pattern.split_at(idx);
        let suffix = &rest[1..];
        if !prefix.is_empty() && !actual.starts_with(prefix) {
            return None;
        }
        if !suffix.is_empty() && !actual.ends_with(suffix) {
            return None;
        }
        let score = if !prefix.is_empty() && !suffix.is_empty() {
            2
        } else {
            1
        };
        return Some(score);
    }
    None
}

/// Picks the declared media entry that best matches `content_type`.
pub(crate) fn select_media_for_content_type<'a, T>(
    content: &'a IndexMap<String, T>,
    content_type: &str,
) -> Option<(&'a str, &'a T)> {
    let mut best: Option<(&'a str, &'a T, i32)> = None;
    for (key, value) in content {
        if let Some(score) = media_type_specificity(key, content_type) {
            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((key.as_str(), value, score));
            }
        }
    }
    best.map(|(k, v, _)| (k, v))
}

/// Picks a media entry when the message carries no `Content-Type`.
///
/// Preference: `application/json`, any `+json`, `text/plain`, other text types,
/// `application/*`, `*/*`, then the first declared entry.
pub(crate) fn select_default_media<T>(content: &IndexMap<String, T>) -> Option<(&str, &T)> {
    let by_key = |wanted: &str| {
        content
            .get_key_value(wanted)
            .map(|(k, v)| (k.as_str(), v))
    };
    let by_pred = |pred: fn(&str) -> bool| {
        content
            .iter()
            .find(|(k, _)| pred(k))
            .map(|(k, v)| (k.as_str(), v))
    };

    by_key("application/json")
        .or_else(|| by_pred(is_json_media_type))
        .or_else(|| by_key("text/plain"))
        .or_else(|| by_pred(is_text_media_type))
        .or_else(|| by_key("application/*"))
        .or_else(|| by_key("*/*"))
        .or_else(|| content.iter().next().map(|(k, v)| (k.as_str(), v)))
}

/// Response entry for `status`: exact code, then `NXX` / `Nxx` range, then `default`.
pub(crate) fn select_response_for_status<T>(
    responses: &IndexMap<String, T>,
    status: u16,
) -> Option<&T> {
    let class = status / 100;
    responses
        .get(&status.to_string())
        .or_else(|| responses.get(&format!("{}XX", class)))
        .or_else(|| responses.get(&format!("{}xx", class)))
        .or_else(|| responses.get("default"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(keys: &[&str]) -> IndexMap<String, usize> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i))
            .collect()
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json; charset=utf-8"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("application/x-ndjson"));
        assert!(!is_json_media_type("text/plain"));
        assert!(is_form_media_type("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_specificity_prefers_exact() {
        let declared = content(&["*/*", "application/*", "application/json"]);
        let (key, _) =
            select_media_for_content_type(&declared, "application/json; charset=utf-8").unwrap();
        assert_eq!(key, "application/json");

        let (key, _) = select_media_for_content_type(&declared, "application/xml").unwrap();
        assert_eq!(key, "application/*");

        let (key, _) = select_media_for_content_type(&declared, "image/png").unwrap();
        assert_eq!(key, "*/*");

        let only_json = content(&["application/json"]);
        assert!(select_media_for_content_type(&only_json, "text/plain").is_none());
    }

    #[test]
    fn test_default_media_order() {
        let declared = content(&["application/xml", "text/plain", "application/hal+json"]);
        assert_eq!(select_default_media(&declared).unwrap().0, "application/hal+json");

        let declared = content(&["image/png", "application/octet-stream"]);
        assert_eq!(select_default_media(&declared).unwrap().0, "image/png");
    }

    #[test]
    fn test_status_selection() {
        let responses = content(&["200", "4XX", "default"]);
        assert_eq!(select_response_for_status(&responses, 200), Some(&0));
        assert_eq!(select_response_for_status(&responses, 404), Some(&1));
        assert_eq!(select_response_for_status(&responses, 500), Some(&2));

        let strict = content(&["200"]);
        assert_eq!(select_response_for_status(&strict, 404), None);
    }
}
