//! Rewrite callbacks and trigger configuration.

use std::fmt;

use crate::highlight::Highlighter;

/// A content rewrite run on every settled keystroke.
///
/// Receives the region's serialized content (with the caret marker in it)
/// and returns the new content. Implementations must keep the marker
/// character wherever they keep the text around it.
pub trait Rewrite {
    fn rewrite(&self, content: &str) -> String;
}

impl<F> Rewrite for F
where
    F: Fn(&str) -> String,
{
    fn rewrite(&self, content: &str) -> String {
        self(content)
    }
}

/// How a region is (re)configured when bound.
#[derive(Default)]
pub enum TriggerSpec {
    /// Keep the current rewrite; on first bind this is an empty highlighter.
    #[default]
    Keep,
    /// Use the built-in highlighter with these trigger characters.
    Triggers(Vec<char>),
    /// Use a custom rewrite.
    Rewrite(Box<dyn Rewrite>),
}

impl TriggerSpec {
    /// Every char of `triggers` is a trigger.
    pub fn chars(triggers: &str) -> Self {
        Self::Triggers(triggers.chars().collect())
    }

    pub fn rewrite(rewrite: impl Rewrite + 'static) -> Self {
        Self::Rewrite(Box::new(rewrite))
    }

    /// Resolve into a rewrite, falling back to `current` for [`TriggerSpec::Keep`].
    pub(crate) fn into_rewrite(self, current: Option<Box<dyn Rewrite>>) -> Box<dyn Rewrite> {
        match self {
            Self::Keep => current.unwrap_or_else(|| Box::new(Highlighter::default())),
            Self::Triggers(chars) => Box::new(Highlighter::new(chars)),
            Self::Rewrite(rewrite) => rewrite,
        }
    }
}

impl fmt::Debug for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("Keep"),
            Self::Triggers(chars) => f.debug_tuple("Triggers").field(chars).finish(),
            Self::Rewrite(_) => f.write_str("Rewrite(..)"),
        }
    }
}

impl From<&str> for TriggerSpec {
    fn from(triggers: &str) -> Self {
        Self::chars(triggers)
    }
}

impl From<Vec<char>> for TriggerSpec {
    fn from(triggers: Vec<char>) -> Self {
        Self::Triggers(triggers)
    }
}

impl From<&[char]> for TriggerSpec {
    fn from(triggers: &[char]) -> Self {
        Self::Triggers(triggers.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_defaults_to_noop_highlighter() {
        let rewrite = TriggerSpec::Keep.into_rewrite(None);
        assert_eq!(rewrite.rewrite("@abc"), "@abc");
    }

    #[test]
    fn test_keep_preserves_current() {
        let current: Box<dyn Rewrite> = Box::new(|s: &str| s.to_uppercase());
        let rewrite = TriggerSpec::Keep.into_rewrite(Some(current));
        assert_eq!(rewrite.rewrite("abc"), "ABC");
    }

    #[test]
    fn test_string_splits_into_triggers() {
        let spec = TriggerSpec::from("@#");
        assert!(matches!(&spec, TriggerSpec::Triggers(chars) if chars == &['@', '#']));
        let rewrite = spec.into_rewrite(None);
        assert_eq!(
            rewrite.rewrite("#ab"),
            "<span class=\"tag tag2\">#ab</span>"
        );
    }
}
