//! Atomic rule generation.
//!
//! Every canonical [`Declaration`] maps to exactly one class name, derived
//! only from the declaration's content. Two tables built independently, in
//! different processes or builds, therefore agree on every class they share.

mod class_names;
mod hash;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::types::{AtomicRule, Bucket, Declaration, InvariantViolation};

pub use class_names::{compress, merge_class_names};
pub use hash::{class_name, group_hash, hash4, rule_css, value_hash};

#[derive(Debug, Clone)]
struct Entry {
    declaration: Declaration,
    rule: AtomicRule,
}

/// Declaration → rule table for one compilation run.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    compression: HashMap<String, String>,
    index: HashMap<Declaration, usize>,
    entries: Vec<Entry>,
    shared: Option<SharedRuleCache>,
}

impl RuleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `map` to shorten class names. See [`compress`].
    #[must_use]
    pub fn with_compression(mut self, map: HashMap<String, String>) -> Self {
        self.compression = map;
        self
    }

    /// Shares generated rules with other tables through `cache`. Tables sharing
    /// one cache must use the same compression map.
    #[must_use]
    pub fn with_shared_cache(mut self, cache: SharedRuleCache) -> Self {
        self.shared = Some(cache);
        self
    }

    #[must_use]
    pub fn compression(&self) -> &HashMap<String, String> {
        &self.compression
    }

    /// Returns the rule for `decl`, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation`] if `decl` is not canonical.
    pub fn intern(&mut self, decl: &Declaration) -> Result<&AtomicRule, InvariantViolation> {
        if let Some(&i) = self.index.get(decl) {
            return Ok(&self.entries[i].rule);
        }
        decl.check_canonical()?;
        let rule = match &self.shared {
            Some(shared) => shared.get_or_insert_with(decl, || self.build(decl)),
            None => self.build(decl),
        };
        trace!(class = %rule.class_name, bucket = %rule.bucket, "interned rule");
        let i = self.entries.len();
        self.index.insert(decl.clone(), i);
        self.entries.push(Entry {
            declaration: decl.clone(),
            rule,
        });
        Ok(&self.entries[i].rule)
    }

    fn build(&self, decl: &Declaration) -> AtomicRule {
        let full = class_name(decl);
        let class = compress(&full, &self.compression).unwrap_or(full);
        let css = rule_css(decl, &class);
        AtomicRule::new(class, css)
    }

    #[must_use]
    pub fn get(&self, decl: &Declaration) -> Option<&AtomicRule> {
        self.index.get(decl).map(|&i| &self.entries[i].rule)
    }

    /// Rules in the order they were first generated.
    pub fn rules(&self) -> impl Iterator<Item = &AtomicRule> {
        self.entries.iter().map(|e| &e.rule)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.iter().map(|e| &e.declaration)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All rule texts in cascade order.
    #[must_use]
    pub fn stylesheet(&self, sort_at_rules: bool) -> String {
        let mut css: Vec<&str> = self.rules().map(|r| r.css.as_str()).collect();
        sort_rules(&mut css, sort_at_rules);
        css.concat()
    }
}

/// Rule cache shared by tables on several threads, keyed by declaration hash.
#[derive(Debug, Clone, Default)]
pub struct SharedRuleCache {
    inner: Arc<RwLock<HashMap<String, AtomicRule>>>,
}

impl SharedRuleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(decl: &Declaration) -> String {
        blake3::hash(decl.to_string().as_bytes()).to_hex().to_string()
    }

    /// The cached rule for `decl`, or the one `build` produces, which is
    /// then cached.
    pub fn get_or_insert_with(
        &self,
        decl: &Declaration,
        build: impl FnOnce() -> AtomicRule,
    ) -> AtomicRule {
        let key = Self::key(decl);
        if let Some(rule) = self.inner.read().get(&key) {
            return rule.clone();
        }
        self.inner.write().entry(key).or_insert_with(build).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Every cached rule, in cascade order with ties broken by class name.
    #[must_use]
    pub fn rules(&self) -> Vec<AtomicRule> {
        let mut rules: Vec<AtomicRule> = self.inner.read().values().cloned().collect();
        rules.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        rules.sort_by_key(|r| r.bucket);
        rules
    }

    #[must_use]
    pub fn stylesheet(&self, sort_at_rules: bool) -> String {
        let rules = self.rules();
        let mut css: Vec<&str> = rules.iter().map(|r| r.css.as_str()).collect();
        sort_rules(&mut css, sort_at_rules);
        css.concat()
    }
}

/// Orders `@media` rules mobile-first: `min-width` ascending, then
/// `max-width` descending, then the rest.
fn media_key(rule: &str) -> (u8, f64) {
    let prelude = rule.split('{').next().unwrap_or_default();
    if !prelude.starts_with("@media") {
        return (2, 0.0);
    }
    let width = |feature: &str| -> Option<f64> {
        let start = prelude.find(feature)? + feature.len();
        let digits: String = prelude[start..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        digits.parse().ok()
    };
    if let Some(min) = width("min-width:") {
        (0, min)
    } else if let Some(max) = width("max-width:") {
        (1, -max)
    } else {
        (2, 0.0)
    }
}

/// Sorts rule texts into cascade order. The sort is stable: within a bucket
/// rules keep their discovery order.
pub fn sort_rules<S: AsRef<str>>(rules: &mut [S], sort_at_rules: bool) {
    rules.sort_by_key(|r| Bucket::classify(r.as_ref()));
    if sort_at_rules {
        let start = rules.partition_point(|r| Bucket::classify(r.as_ref()) < Bucket::AtRule);
        rules[start..].sort_by(|a, b| {
            let (ka, va) = media_key(a.as_ref());
            let (kb, vb) = media_key(b.as_ref());
            ka.cmp(&kb)
                .then(va.partial_cmp(&vb).unwrap_or(Ordering::Equal))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nesting;

    #[test]
    fn identical_declarations_share_a_rule() {
        let mut table = RuleTable::new();
        let a = table.intern(&Declaration::new("color", "blue")).unwrap().clone();
        let b = table.intern(&Declaration::new("color", "blue")).unwrap().clone();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(a.css, format!(".{}{{color:blue}}", a.class_name));
    }

    #[test]
    fn independent_tables_agree() {
        let decl = Declaration::new("margin-top", "4px").nested(Nesting::root().with_selector(":hover"));
        let mut first = RuleTable::new();
        let mut second = RuleTable::new();
        second.intern(&Declaration::new("color", "red")).unwrap();
        assert_eq!(
            first.intern(&decl).unwrap().class_name,
            second.intern(&decl).unwrap().class_name
        );
    }

    #[test]
    fn non_canonical_declarations_are_rejected() {
        let mut table = RuleTable::new();
        assert!(matches!(
            table.intern(&Declaration::new("fontSize", "12px")),
            Err(InvariantViolation::NonCanonicalProperty(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn compression_map_is_applied() {
        let decl = Declaration::new("color", "red");
        let full = class_name(&decl);
        let map = HashMap::from([(full[1..].to_owned(), "r".to_owned())]);
        let mut table = RuleTable::new().with_compression(map);
        let rule = table.intern(&decl).unwrap();
        assert_eq!(rule.class_name, format!("{}_r", &full[..5]));
        assert_eq!(rule.css, format!(".{}_r{{color:red}}", &full[..5]));
    }

    #[test]
    fn stylesheet_is_bucket_ordered() {
        let mut table = RuleTable::new();
        table
            .intern(&Declaration::new("color", "red").nested(Nesting::root().with_selector(":hover")))
            .unwrap();
        table
            .intern(&Declaration::new("color", "blue").nested(Nesting::root().with_at_rule("@media print")))
            .unwrap();
        table.intern(&Declaration::new("color", "green")).unwrap();
        let css = table.stylesheet(true);
        let green = css.find("color:green").unwrap();
        let red = css.find("color:red").unwrap();
        let blue = css.find("color:blue").unwrap();
        assert!(green < red && red < blue, "{css}");
    }

    #[test]
    fn media_rules_sort_mobile_first() {
        let mut rules = vec![
            "@media (max-width:400px){._a{color:red}}",
            "@media print{._b{color:red}}",
            "@media (min-width:900px){._c{color:red}}",
            "._d{color:red}",
            "@media (max-width:800px){._e{color:red}}",
            "@media (min-width:500px){._f{color:red}}",
        ];
        sort_rules(&mut rules, true);
        let order: Vec<_> = rules.iter().map(|r| &r[r.find("._").unwrap() + 2..][..1]).collect();
        assert_eq!(order, vec!["d", "f", "c", "e", "a", "b"]);

        sort_rules(&mut rules, false);
        assert_eq!(rules[0], "._d{color:red}");
    }

    #[test]
    fn shared_cache_deduplicates_across_tables() {
        let cache = SharedRuleCache::new();
        let mut first = RuleTable::new().with_shared_cache(cache.clone());
        let mut second = RuleTable::new().with_shared_cache(cache.clone());
        first.intern(&Declaration::new("color", "red")).unwrap();
        second.intern(&Declaration::new("color", "red")).unwrap();
        second.intern(&Declaration::new("color", "blue")).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.rules().len(), 2);
        assert!(cache.stylesheet(true).contains("color:blue"));
    }
}
