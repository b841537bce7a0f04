use crate::types::format_number;

/// Properties whose bare numbers are not lengths.
const UNITLESS: &[&str] = &[
    "animation-iteration-count",
    "aspect-ratio",
    "border-image-outset",
    "border-image-slice",
    "border-image-width",
    "box-flex",
    "box-flex-group",
    "box-ordinal-group",
    "column-count",
    "columns",
    "fill-opacity",
    "flex",
    "flex-grow",
    "flex-negative",
    "flex-order",
    "flex-positive",
    "flex-shrink",
    "flood-opacity",
    "font-size-adjust",
    "font-weight",
    "grid-area",
    "grid-column",
    "grid-column-end",
    "grid-column-span",
    "grid-column-start",
    "grid-row",
    "grid-row-end",
    "grid-row-span",
    "grid-row-start",
    "line-clamp",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "stop-opacity",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "tab-size",
    "widows",
    "z-index",
    "zoom",
];

const CONTENT_KEYWORDS: &[&str] = &[
    "inherit", "initial", "none", "normal", "revert", "revert-layer", "unset",
];

/// Converts a style-object key into a CSS property name.
///
/// `backgroundColor` becomes `background-color`, `WebkitLineClamp` becomes
/// `-webkit-line-clamp` and `msFlex` becomes `-ms-flex`. Custom properties
/// and names that are already hyphenated keep their spelling.
#[must_use]
pub fn property_name(key: &str) -> String {
    if key.starts_with("--") {
        return key.to_owned();
    }
    let mut out = String::with_capacity(key.len() + 4);
    let rest = match key.strip_prefix("ms") {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => {
            out.push_str("-ms");
            rest
        }
        _ => key,
    };
    for c in rest.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `property` (already hyphenated) takes bare numbers.
#[must_use]
pub fn is_unitless(property: &str) -> bool {
    let unprefixed = ["-webkit-", "-moz-", "-ms-", "-o-"]
        .iter()
        .find_map(|p| property.strip_prefix(p))
        .unwrap_or(property);
    UNITLESS.binary_search(&unprefixed).is_ok()
}

/// Renders a numeric value, appending `px` where the property expects a length.
#[must_use]
pub fn number_value(property: &str, n: f64) -> String {
    let text = format_number(n);
    if property.starts_with("--") || is_unitless(property) || n == 0.0 || !n.is_finite() {
        text
    } else {
        format!("{text}px")
    }
}

/// Splits a trailing `!important` from a value.
fn split_important(value: &str) -> (&str, bool) {
    let trimmed = value.trim_end();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(head) = lower.strip_suffix("important") {
        let head = head.trim_end();
        if let Some(head) = head.strip_suffix('!') {
            return (trimmed[..head.len()].trim_end(), true);
        }
    }
    (trimmed, false)
}

/// Collapses whitespace outside quotes and drops it next to `(`, `)` and `,`.
/// With `tight_colons` whitespace around `:` goes as well.
pub(crate) fn tighten(text: &str, tight_colons: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    let mut escaped = false;
    for c in text.trim().chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        let hugs = |ch: char| matches!(ch, '(' | ',') || (tight_colons && ch == ':');
        let closes = matches!(c, ')' | ',') || (tight_colons && c == ':');
        if pending_space && !closes && !out.ends_with(hugs) && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

/// Lowercases hex colour literals outside quotes.
fn lowercase_hex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut in_hex = false;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                if c == '#' {
                    in_hex = true;
                    out.push(c);
                } else if in_hex && c.is_ascii_hexdigit() {
                    out.push(c.to_ascii_lowercase());
                } else {
                    in_hex = false;
                    out.push(c);
                }
            }
        }
    }
    out
}

fn quote_content(value: &str) -> String {
    let is_function = value
        .split_once('(')
        .is_some_and(|(name, _)| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == '-'));
    let is_keyword = CONTENT_KEYWORDS.contains(&value) || value.ends_with("-quote");
    if value.contains(['"', '\'']) || is_function || is_keyword {
        value.to_owned()
    } else {
        format!("\"{value}\"")
    }
}

/// Canonical text of a string value and its `!important` flag. `None` when
/// nothing is left to declare.
#[must_use]
pub fn string_value(property: &str, raw: &str) -> Option<(String, bool)> {
    let (value, important) = split_important(raw);
    let value = lowercase_hex(&tighten(value, false));
    if property == "content" {
        if value.is_empty() {
            return Some(("\"\"".to_owned(), important));
        }
        return Some((quote_content(&value), important));
    }
    if value.is_empty() {
        return None;
    }
    Some((value, important))
}

/// Canonical at-rule prelude, e.g. `@media (min-width:500px)`.
#[must_use]
pub fn at_rule(key: &str) -> String {
    tighten(key, true)
}
