#![deny(missing_docs)]

//! # Built-in Rules
//!
//! Ready-made [`RuleMatcher`]s for the common suppression cases, plus combinators.

use crate::whitelist::RuleMatcher;

/// Matches findings whose key equals `key`.
pub fn message_has_key(key: impl Into<String>) -> RuleMatcher {
    let key = key.into();
    RuleMatcher::from_fn(move |ctx| ctx.message.key == key)
}

/// Matches findings whose text contains `fragment`.
pub fn message_contains(fragment: impl Into<String>) -> RuleMatcher {
    let fragment = fragment.into();
    RuleMatcher::from_fn(move |ctx| ctx.message.text.contains(fragment.as_str()))
}

/// Matches findings raised while validating a request.
pub fn is_request() -> RuleMatcher {
    RuleMatcher::from_fn(|ctx| ctx.message.key.starts_with("validation.request."))
}

/// Matches findings raised while validating a response.
pub fn is_response() -> RuleMatcher {
    RuleMatcher::from_fn(|ctx| ctx.message.key.starts_with("validation.response."))
}

/// Matches exchanges using `method` (case-insensitive).
pub fn method_is(method: impl Into<String>) -> RuleMatcher {
    let method = method.into();
    RuleMatcher::from_fn(move |ctx| {
        ctx.request
            .method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(&method))
    })
}

/// Matches exchanges whose request path contains `fragment`.
pub fn path_contains(fragment: impl Into<String>) -> RuleMatcher {
    let fragment = fragment.into();
    RuleMatcher::from_fn(move |ctx| {
        ctx.request
            .path
            .as_deref()
            .is_some_and(|p| p.contains(fragment.as_str()))
    })
}

/// Matches responses with status `code`.
pub fn response_status_is(code: u16) -> RuleMatcher {
    RuleMatcher::from_fn(move |ctx| ctx.response.status_code == Some(code))
}

/// Matches findings on the operation with `operationId == id`.
pub fn operation_id_is(id: impl Into<String>) -> RuleMatcher {
    let id = id.into();
    RuleMatcher::from_fn(move |ctx| ctx.operation.id.as_deref() == Some(id.as_str()))
}

/// Matches when every rule matches. An empty list matches nothing.
pub fn all_of(rules: impl IntoIterator<Item = RuleMatcher>) -> RuleMatcher {
    let rules: Vec<RuleMatcher> = rules.into_iter().collect();
    RuleMatcher::from_fn(move |ctx| !rules.is_empty() && rules.iter().all(|r| r.matches(ctx)))
}

/// Matches when any rule matches.
pub fn any_of(rules: impl IntoIterator<Item = RuleMatcher>) -> RuleMatcher {
    let rules: Vec<RuleMatcher> = rules.into_iter().collect();
    RuleMatcher::from_fn(move |ctx| rules.iter().any(|r| r.matches(ctx)))
}

/// Inverts a rule.
pub fn not(rule: RuleMatcher) -> RuleMatcher {
    RuleMatcher::from_fn(move |ctx| !rule.matches(ctx))
}
