use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::InvariantViolation;

/// Placeholder for the rule's own class inside a selector template.
pub const SELF_SELECTOR: &str = "&";

/// Where a declaration applies: enclosing at-rules, outermost first, and a
/// selector template in which `&` stands for the generated class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nesting {
    pub at_rules: Vec<String>,
    pub selector: String,
}

impl Default for Nesting {
    fn default() -> Self {
        Self::root()
    }
}

impl Nesting {
    /// The element itself, outside any at-rule.
    #[must_use]
    pub fn root() -> Self {
        Self {
            at_rules: Vec::new(),
            selector: SELF_SELECTOR.to_owned(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.at_rules.is_empty() && self.selector == SELF_SELECTOR
    }

    /// Descends into a nested selector key (a single selector, not a comma list).
    ///
    /// `&`-templates substitute the current selector, `:`-prefixed keys attach
    /// to it, and anything else is a descendant.
    #[must_use]
    pub fn with_selector(&self, key: &str) -> Self {
        let key = key.trim();
        let selector = if key.contains(SELF_SELECTOR) {
            key.replace(SELF_SELECTOR, &self.selector)
        } else if key.starts_with(':') {
            format!("{}{key}", self.selector)
        } else {
            format!("{} {key}", self.selector)
        };
        Self {
            at_rules: self.at_rules.clone(),
            selector,
        }
    }

    #[must_use]
    pub fn with_at_rule(&self, at_rule: impl Into<String>) -> Self {
        let mut at_rules = self.at_rules.clone();
        at_rules.push(at_rule.into());
        Self {
            at_rules,
            selector: self.selector.clone(),
        }
    }

    /// The selector with `&` replaced by `.class_name`.
    #[must_use]
    pub fn resolve_selector(&self, class_name: &str) -> String {
        self.selector
            .replace(SELF_SELECTOR, &format!(".{class_name}"))
    }
}

/// One canonical property/value pair in its nesting context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
    pub nesting: Nesting,
}

impl Declaration {
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
            nesting: Nesting::root(),
        }
    }

    #[must_use]
    pub fn important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    #[must_use]
    pub fn nested(mut self, nesting: Nesting) -> Self {
        self.nesting = nesting;
        self
    }

    /// `property:value` with the `!important` flag, as written inside a rule body.
    #[must_use]
    pub fn body(&self) -> String {
        if self.important {
            format!("{}:{}!important", self.property, self.value)
        } else {
            format!("{}:{}", self.property, self.value)
        }
    }

    /// Checks the shape the normalizer guarantees.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation`] naming the first non-canonical part.
    pub fn check_canonical(&self) -> Result<(), InvariantViolation> {
        let property_ok = if let Some(custom) = self.property.strip_prefix("--") {
            !custom.is_empty() && !custom.contains(|c: char| c.is_whitespace() || c == ':')
        } else {
            !self.property.is_empty()
                && self
                    .property
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        };
        if !property_ok {
            return Err(InvariantViolation::NonCanonicalProperty(
                self.property.clone(),
            ));
        }
        let value_ok = !self.value.is_empty()
            && self.value.trim() == self.value
            && !self.value.contains(['{', '}', ';'])
            && !self.value.to_ascii_lowercase().contains("!important");
        if !value_ok {
            return Err(InvariantViolation::NonCanonicalValue {
                property: self.property.clone(),
                value: self.value.clone(),
            });
        }
        if !self.nesting.selector.contains(SELF_SELECTOR) {
            return Err(InvariantViolation::SelectorWithoutClass(
                self.nesting.selector.clone(),
            ));
        }
        if let Some(bad) = self.nesting.at_rules.iter().find(|a| !a.starts_with('@')) {
            return Err(InvariantViolation::InvalidAtRule(bad.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for at_rule in &self.nesting.at_rules {
            write!(f, "{at_rule} ")?;
        }
        write!(f, "{} {{ {} }}", self.nesting.selector, self.body())
    }
}
