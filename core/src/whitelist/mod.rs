#![deny(missing_docs)]

//! # Whitelist
//!
//! Named predicates that suppress findings. A finding is dropped when any rule
//! matches; rules run in insertion order and stop at the first match.
//!
//! ```
//! use oav_core::whitelist::{RuleMatcher, Whitelist};
//!
//! let whitelist = Whitelist::new()
//!     .with_rule("ignore not found", RuleMatcher::from_fn(|ctx| ctx.response.status_code == Some(404)));
//! assert_eq!(whitelist.len(), 1);
//! ```

pub mod rules;

use crate::model::{NormalizedRequest, NormalizedResponse, Operation};
use crate::report::Message;
use std::fmt;
use std::sync::Arc;

/// Borrowed view of one finding and the exchange it came from.
///
/// Built once per finding and shared by every rule, so evaluating a rule never allocates.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Resolved operation; `id` is `None` when nothing matched.
    pub operation: &'a Operation,
    /// The request half of the exchange.
    pub request: &'a NormalizedRequest,
    /// The response half; `status_code` is `None` for request findings.
    pub response: &'a NormalizedResponse,
    /// The finding under consideration.
    pub message: &'a Message,
}

type Predicate = dyn Fn(&RuleContext<'_>) -> bool + Send + Sync;

/// A stateless, reusable suppression predicate.
#[derive(Clone)]
pub struct RuleMatcher {
    predicate: Arc<Predicate>,
}

impl RuleMatcher {
    /// Builds a matcher from a plain function over the rule context.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluates the predicate.
    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RuleMatcher(..)")
    }
}

#[derive(Debug, Clone)]
struct WhitelistRule {
    name: String,
    matcher: RuleMatcher,
}

/// Ordered set of named suppression rules.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    rules: Vec<WhitelistRule>,
}

impl Whitelist {
    /// An empty whitelist that suppresses nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, returning the extended whitelist.
    pub fn with_rule(mut self, name: impl Into<String>, matcher: RuleMatcher) -> Self {
        self.push(name, matcher);
        self
    }

    /// Adds a rule in place.
    pub fn push(&mut self, name: impl Into<String>, matcher: RuleMatcher) {
        self.rules.push(WhitelistRule {
            name: name.into(),
            matcher,
        });
    }

    /// Appends every rule of `other`, keeping its order.
    pub fn extend(&mut self, other: Whitelist) {
        self.rules.extend(other.rules);
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Name of the first rule that matches, if any.
    pub fn matching_rule(&self, ctx: &RuleContext<'_>) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(ctx))
            .map(|rule| rule.name.as_str())
    }
}
