use std::fmt;

use serde::{Deserialize, Serialize};

/// Cascade ordering category of an atomic rule.
///
/// Rules are emitted and inserted bucket by bucket so that pseudo-class rules
/// always follow the base rules they override, in link / visited /
/// focus-within / focus / focus-visible / hover / active order, with at-rules
/// last. The derived `Ord` is that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Bucket {
    Plain,
    Link,
    Visited,
    FocusWithin,
    Focus,
    FocusVisible,
    Hover,
    Active,
    AtRule,
}

impl Bucket {
    pub const ALL: [Bucket; 9] = [
        Bucket::Plain,
        Bucket::Link,
        Bucket::Visited,
        Bucket::FocusWithin,
        Bucket::Focus,
        Bucket::FocusVisible,
        Bucket::Hover,
        Bucket::Active,
        Bucket::AtRule,
    ];

    /// Short key written to the `data-c` attribute of a bucket's style container.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Bucket::Plain => "",
            Bucket::Link => "l",
            Bucket::Visited => "v",
            Bucket::FocusWithin => "w",
            Bucket::Focus => "f",
            Bucket::FocusVisible => "i",
            Bucket::Hover => "h",
            Bucket::Active => "a",
            Bucket::AtRule => "m",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Bucket> {
        Bucket::ALL.into_iter().find(|b| b.key() == key)
    }

    /// The pseudo-class that selects this bucket, if any.
    #[must_use]
    pub fn pseudo_class(self) -> Option<&'static str> {
        match self {
            Bucket::Link => Some(":link"),
            Bucket::Visited => Some(":visited"),
            Bucket::FocusWithin => Some(":focus-within"),
            Bucket::Focus => Some(":focus"),
            Bucket::FocusVisible => Some(":focus-visible"),
            Bucket::Hover => Some(":hover"),
            Bucket::Active => Some(":active"),
            Bucket::Plain | Bucket::AtRule => None,
        }
    }

    /// Classifies a rule from its text.
    ///
    /// At-rules go to [`Bucket::AtRule`]. Otherwise the selector after the
    /// leading class name must be exactly one of the bucket pseudo-classes;
    /// anything else (compound pseudos, pseudo-elements, combinators) is
    /// [`Bucket::Plain`].
    #[must_use]
    pub fn classify(rule: &str) -> Bucket {
        let rule = rule.trim_start();
        if rule.starts_with('@') {
            return Bucket::AtRule;
        }
        let selector = rule.split('{').next().unwrap_or_default().trim_end();
        let Some(after_dot) = selector.strip_prefix('.') else {
            return Bucket::Plain;
        };
        let suffix = after_dot.trim_start_matches(|c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        });
        let suffix = suffix.to_ascii_lowercase();
        Bucket::ALL
            .into_iter()
            .find(|b| b.pseudo_class() == Some(suffix.as_str()))
            .unwrap_or(Bucket::Plain)
    }

    /// Buckets that sort after `self`, nearest first.
    pub fn following(self) -> impl Iterator<Item = Bucket> {
        Bucket::ALL.into_iter().filter(move |b| *b > self)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bucket::Plain => "plain",
            Bucket::Link => "link",
            Bucket::Visited => "visited",
            Bucket::FocusWithin => "focus-within",
            Bucket::Focus => "focus",
            Bucket::FocusVisible => "focus-visible",
            Bucket::Hover => "hover",
            Bucket::Active => "active",
            Bucket::AtRule => "at-rule",
        };
        f.write_str(name)
    }
}

/// Stable sort of rule strings by bucket; discovery order is kept within a bucket.
pub fn sort_by_bucket<S: AsRef<str>>(rules: &mut [S]) {
    rules.sort_by_key(|r| Bucket::classify(r.as_ref()));
}
