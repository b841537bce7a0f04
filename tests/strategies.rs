#![allow(dead_code)]

use proptest::prelude::*;
use stylebake::{Declaration, Nesting, Value};

// --- Fixed style vocabulary ---
// Properties are camelCase keys as written in components; a few are
// shorthands, a few unitless, the rest plain lengths or keywords.

const LENGTH_PROPS: &[&str] = &["marginTop", "paddingLeft", "width", "fontSize", "top", "gap"];
const UNITLESS_PROPS: &[&str] = &["lineHeight", "zIndex", "opacity", "flexGrow", "fontWeight"];
const KEYWORD_PROPS: &[&str] = &["color", "display", "textAlign", "cursor"];
const SHORTHAND_PROPS: &[&str] = &["margin", "padding", "borderRadius"];
const KEYWORDS: &[&str] = &["red", "blue", "block", "flex", "center", "pointer", "inherit", "#FFF"];
const LENGTHS: &[&str] = &["1px", "2em", "50%", "auto", "0"];

const PSEUDOS: &[&str] = &[
    ":link",
    ":visited",
    ":focus-within",
    ":focus",
    ":focus-visible",
    ":hover",
    ":active",
];
const MEDIA: &[&str] = &[
    "@media (min-width: 500px)",
    "@media (max-width:800px)",
    "@media print",
    "@supports (display: grid)",
];

/// A property key with a value that normalizes successfully.
pub fn arb_entry() -> impl Strategy<Value = (String, Value)> {
    prop_oneof![
        (prop::sample::select(LENGTH_PROPS), 0u32..200)
            .prop_map(|(p, n)| (p.to_owned(), Value::Num(f64::from(n)))),
        (prop::sample::select(LENGTH_PROPS), prop::sample::select(LENGTHS))
            .prop_map(|(p, v)| (p.to_owned(), Value::Str(v.to_owned()))),
        (prop::sample::select(UNITLESS_PROPS), 0u32..10)
            .prop_map(|(p, n)| (p.to_owned(), Value::Num(f64::from(n)))),
        (prop::sample::select(KEYWORD_PROPS), prop::sample::select(KEYWORDS))
            .prop_map(|(p, v)| (p.to_owned(), Value::Str(v.to_owned()))),
        (
            prop::sample::select(SHORTHAND_PROPS),
            prop::collection::vec(prop::sample::select(LENGTHS), 1..=4),
        )
            .prop_map(|(p, parts)| (p.to_owned(), Value::Str(parts.join(" ")))),
    ]
}

fn dedupe(entries: Vec<(String, Value)>) -> Vec<(String, Value)> {
    let mut out: Vec<(String, Value)> = Vec::new();
    for (key, value) in entries {
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    out
}

/// A flat style object.
pub fn arb_flat_style() -> impl Strategy<Value = Value> {
    prop::collection::vec(arb_entry(), 1..8).prop_map(|e| Value::Object(dedupe(e)))
}

/// A style object with at most one level of pseudo-class or at-rule nesting.
pub fn arb_style() -> impl Strategy<Value = Value> {
    let nested_key = prop_oneof![prop::sample::select(PSEUDOS), prop::sample::select(MEDIA)];
    (
        prop::collection::vec(arb_entry(), 1..6),
        prop::collection::vec((nested_key, arb_flat_style()), 0..3),
    )
        .prop_map(|(flat, nested)| {
            let mut entries = flat;
            entries.extend(nested.into_iter().map(|(k, v)| (k.to_owned(), v)));
            Value::Object(dedupe(entries))
        })
}

/// A canonical declaration in a random nesting context.
pub fn arb_declaration() -> impl Strategy<Value = Declaration> {
    let nesting = prop_oneof![
        Just(Nesting::root()),
        prop::sample::select(PSEUDOS).prop_map(|p| Nesting::root().with_selector(p)),
        prop::sample::select(MEDIA).prop_map(|m| Nesting::root().with_at_rule(m)),
    ];
    (
        prop::sample::select(&["color", "margin-top", "z-index", "display"][..]),
        prop::sample::select(KEYWORDS),
        any::<bool>(),
        nesting,
    )
        .prop_map(|(property, value, important, nesting)| {
            Declaration::new(property, value.to_ascii_lowercase())
                .important(important)
                .nested(nesting)
        })
}

/// Rule texts in every bucket, in random order.
pub fn arb_rules() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        (
            "[a-z0-9]{8}",
            prop_oneof![
                Just(String::new()),
                prop::sample::select(PSEUDOS).prop_map(str::to_owned),
                Just(" span".to_owned()),
                Just(":hover:focus".to_owned()),
            ],
            any::<bool>(),
        )
            .prop_map(|(class, pseudo, media)| {
                let rule = format!("._{class}{pseudo}{{color:red}}");
                if media {
                    format!("@media print{{{rule}}}")
                } else {
                    rule
                }
            }),
        0..24,
    )
}
