//! Per-key severity overrides.

use crate::report::Level;
use indexmap::IndexMap;

/// Maps finding keys to levels; the longest matching dotted prefix wins.
///
/// `validation.request` matches `validation.request.body.schema` but not
/// `validation.requests.x`. Keys without an override resolve to [`Level::Error`].
#[derive(Debug, Clone, Default)]
pub struct LevelResolver {
    overrides: IndexMap<String, Level>,
}

impl LevelResolver {
    /// Sets the level for `key` and everything below it.
    pub fn set(&mut self, key: impl Into<String>, level: Level) {
        self.overrides.insert(key.into(), level);
    }

    /// Level for a finding key.
    pub fn level_for(&self, key: &str) -> Level {
        self.overrides
            .iter()
            .filter(|(prefix, _)| covers(prefix, key))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
            .unwrap_or(Level::Error)
    }
}

fn covers(prefix: &str, key: &str) -> bool {
    key == prefix
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        let mut levels = LevelResolver::default();
        levels.set("validation.response", Level::Warn);
        levels.set("validation.response.header", Level::Ignore);

        assert_eq!(levels.level_for("validation.request.body.schema"), Level::Error);
        assert_eq!(levels.level_for("validation.response.body.schema"), Level::Warn);
        assert_eq!(levels.level_for("validation.response.header.missing"), Level::Ignore);
        assert_eq!(levels.level_for("validation.responses"), Level::Error);
    }

    #[test]
    fn test_later_override_replaces_earlier() {
        let mut levels = LevelResolver::default();
        levels.set("validation.request.body", Level::Info);
        levels.set("validation.request.body", Level::Error);
        assert_eq!(levels.level_for("validation.request.body.missing"), Level::Error);
    }
}
