//! Flattening of resolved style objects into canonical declarations.
//!
//! The output keeps source order. Shorthands are expanded in place, so a
//! longhand written later in the same object lands after the matching
//! shorthand-derived declaration and wins by class order; nothing is deleted.

mod shorthand;
mod units;

pub use shorthand::expand as expand_shorthand;
pub use units::{at_rule, is_unitless, number_value, property_name, string_value};

use crate::types::{Declaration, Nesting, NormalizeError, Value};

/// Flattens a style object applied at the element itself.
///
/// # Errors
///
/// Returns [`NormalizeError`] if `style` is not an object, a value is neither
/// a string nor a number, or a nested key has an empty selector.
pub fn normalize(style: &Value) -> Result<Vec<Declaration>, NormalizeError> {
    normalize_in(style, &Nesting::root())
}

/// Flattens a style object whose declarations apply within `nesting`.
///
/// # Errors
///
/// See [`normalize`].
pub fn normalize_in(style: &Value, nesting: &Nesting) -> Result<Vec<Declaration>, NormalizeError> {
    let Value::Object(fields) = style else {
        return Err(NormalizeError::NotAnObject {
            found: style.type_name(),
        });
    };
    let mut out = Vec::new();
    flatten(fields, nesting, &mut out)?;
    Ok(out)
}

fn flatten(
    fields: &[(String, Value)],
    nesting: &Nesting,
    out: &mut Vec<Declaration>,
) -> Result<(), NormalizeError> {
    for (key, value) in fields {
        if let Value::Object(inner) = value {
            for nested in nested_contexts(key, nesting)? {
                flatten(inner, &nested, out)?;
            }
            continue;
        }
        declare(key, value, nesting, out)?;
    }
    Ok(())
}

/// The nesting contexts a nested key opens: one per selector in a comma list,
/// or a single at-rule wrapper.
fn nested_contexts(key: &str, nesting: &Nesting) -> Result<Vec<Nesting>, NormalizeError> {
    let trimmed = key.trim();
    if trimmed.starts_with('@') {
        return Ok(vec![nesting.with_at_rule(at_rule(trimmed))]);
    }
    let mut contexts = Vec::new();
    for part in split_selector_list(trimmed) {
        let part = part.trim();
        if part.is_empty() {
            return Err(NormalizeError::EmptySelector { key: key.to_owned() });
        }
        contexts.push(nesting.with_selector(&units::tighten(part, false)));
    }
    Ok(contexts)
}

/// Splits `a, b` on top-level commas; commas inside `:is(…)` and the like stay.
fn split_selector_list(key: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in key.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&key[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&key[start..]);
    parts
}

fn declare(
    key: &str,
    value: &Value,
    nesting: &Nesting,
    out: &mut Vec<Declaration>,
) -> Result<(), NormalizeError> {
    let property = property_name(key.trim());
    let (text, important) = match value {
        Value::Str(s) => match string_value(&property, s) {
            Some(canonical) => canonical,
            None => return Ok(()),
        },
        Value::Num(n) => (number_value(&property, *n), false),
        Value::Null | Value::Undefined | Value::Bool(_) => return Ok(()),
        other => {
            return Err(NormalizeError::InvalidValue {
                property,
                found: other.type_name(),
            });
        }
    };
    if text.contains(['{', '}', ';']) {
        return Err(NormalizeError::InvalidValue {
            property,
            found: "string with '{', '}' or ';'",
        });
    }
    let longhands = expand_shorthand(&property, &text)
        .unwrap_or_else(|| vec![(property, text)]);
    for (property, value) in longhands {
        out.push(
            Declaration::new(property, value)
                .important(important)
                .nested(nesting.clone()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(fields: &[(&str, Value)]) -> Value {
        Value::Object(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        )
    }

    fn bodies(decls: &[Declaration]) -> Vec<String> {
        decls.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn flat_object() {
        let decls = normalize(&obj(&[
            ("backgroundColor", Value::from("#FFF")),
            ("fontSize", Value::Num(12.0)),
            ("lineHeight", Value::Num(1.5)),
        ]))
        .unwrap();
        assert_eq!(
            bodies(&decls),
            vec![
                "& { background-color:#fff }",
                "& { font-size:12px }",
                "& { line-height:1.5 }",
            ]
        );
    }

    #[test]
    fn shorthand_then_longhand_keeps_both() {
        let decls = normalize(&obj(&[
            ("padding", Value::from("10px 20px")),
            ("paddingLeft", Value::from("5px")),
        ]))
        .unwrap();
        let props: Vec<_> = decls
            .iter()
            .map(|d| format!("{}:{}", d.property, d.value))
            .collect();
        assert_eq!(
            props,
            vec![
                "padding-top:10px",
                "padding-right:20px",
                "padding-bottom:10px",
                "padding-left:20px",
                "padding-left:5px",
            ]
        );
    }

    #[test]
    fn nested_pseudo_and_at_rules() {
        let decls = normalize(&obj(&[
            ("color", Value::from("red")),
            (":hover", obj(&[("color", Value::from("blue"))])),
            (
                "@media (min-width: 500px)",
                obj(&[("&:focus, &:active", obj(&[("color", Value::from("green"))]))]),
            ),
        ]))
        .unwrap();
        assert_eq!(
            bodies(&decls),
            vec![
                "& { color:red }",
                "&:hover { color:blue }",
                "@media (min-width:500px) &:focus { color:green }",
                "@media (min-width:500px) &:active { color:green }",
            ]
        );
    }

    #[test]
    fn descendant_selectors() {
        let decls = normalize(&obj(&[(
            "span",
            obj(&[("margin", Value::Num(0.0))]),
        )]))
        .unwrap();
        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].nesting.selector, "& span");
        assert_eq!(decls[0].value, "0");
    }

    #[test]
    fn important_flag() {
        let decls = normalize(&obj(&[("color", Value::from("red !important"))])).unwrap();
        assert!(decls[0].important);
        assert_eq!(decls[0].value, "red");
    }

    #[test]
    fn empty_values_are_skipped() {
        let decls = normalize(&obj(&[
            ("color", Value::Null),
            ("margin", Value::Undefined),
            ("display", Value::Bool(false)),
            ("width", Value::from("")),
        ]))
        .unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            normalize(&Value::from("red")),
            Err(NormalizeError::NotAnObject { found: "string" })
        );
        assert_eq!(
            normalize(&obj(&[("color", Value::Array(vec![]))])),
            Err(NormalizeError::InvalidValue {
                property: "color".into(),
                found: "array"
            })
        );
        assert!(matches!(
            normalize(&obj(&[("color", Value::from("red; background: blue"))])),
            Err(NormalizeError::InvalidValue { .. })
        ));
        assert_eq!(
            normalize(&obj(&[("&:hover,", obj(&[]))])),
            Err(NormalizeError::EmptySelector {
                key: "&:hover,".into()
            })
        );
    }

    #[test]
    fn selector_lists_respect_parentheses() {
        assert_eq!(
            split_selector_list(":is(a, b), &:hover"),
            vec![":is(a, b)", " &:hover"]
        );
    }

    #[test]
    fn every_declaration_is_canonical() {
        let decls = normalize(&obj(&[
            ("WebkitLineClamp", Value::Num(3.0)),
            ("--brand", Value::from("  #ABCDEF ")),
            ("border", Value::from("1px  solid red")),
            ("&:not(:last-child)", obj(&[("marginBottom", Value::Num(4.0))])),
        ]))
        .unwrap();
        for decl in &decls {
            decl.check_canonical().unwrap();
        }
    }
}
