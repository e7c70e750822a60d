//! Raw findings collected before levels and the whitelist are applied.

use derive_more::Display;

/// Which half of the exchange is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum Direction {
    #[display("request")]
    Request,
    #[display("response")]
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Finding {
    pub(crate) key: String,
    pub(crate) text: String,
}

/// Ordered findings for one direction. Keys are `validation.<direction>.<kind>`.
#[derive(Debug)]
pub(crate) struct Findings {
    direction: Direction,
    items: Vec<Finding>,
}

impl Findings {
    pub(crate) fn new(direction: Direction) -> Self {
        Self {
            direction,
            items: Vec::new(),
        }
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn push(&mut self, kind: &str, text: impl Into<String>) {
        self.items.push(Finding {
            key: format!("validation.{}.{}", self.direction, kind),
            text: text.into(),
        });
    }

    pub(crate) fn into_inner(self) -> Vec<Finding> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_prefixed_by_direction() {
        let mut findings = Findings::new(Direction::Response);
        findings.push("status.unknown", "Response status 418 not documented");
        let items = findings.into_inner();
        assert_eq!(items[0].key, "validation.response.status.unknown");
    }
}
