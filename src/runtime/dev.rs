use tracing::warn;

/// Structural pseudo-classes whose matches change with the position of
/// injected `<style>` elements during server rendering.
const ORDER_SENSITIVE: &[&str] = &[
    ":first-child",
    ":last-child",
    ":only-child",
    ":nth-child",
    ":nth-last-child",
];

/// The first order-sensitive pseudo-class in the selector of `rule`.
#[must_use]
pub fn order_sensitive_pseudo(rule: &str) -> Option<&'static str> {
    let selector = rule.rsplit_once('{').map_or(rule, |(prelude, _)| prelude);
    ORDER_SENSITIVE
        .iter()
        .copied()
        .find(|pseudo| selector.contains(pseudo))
}

pub(crate) fn warn_order_sensitive(rule: &str) {
    if let Some(pseudo) = order_sensitive_pseudo(rule) {
        warn!(
            rule,
            pseudo,
            "selector may match server-rendered style elements; prefer :first-of-type style selectors"
        );
    }
}
