//! Shorthand properties expanded into longhands before hashing, so a later
//! longhand for the same side shares the shorthand-derived rule's class group.

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];
const GLOBAL_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert", "revert-layer"];

/// Splits a value on top-level whitespace, keeping parentheses and quotes whole.
fn split_words(value: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                continue;
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '(' => depth += 1,
            None if c == ')' => depth = depth.saturating_sub(1),
            None if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    words.push(&value[s..i]);
                }
                continue;
            }
            None => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(&value[s..]);
    }
    words
}

/// CSS box syntax: 1 to 4 values for top, right, bottom and left.
fn box_values<'a>(words: &[&'a str]) -> Option<[&'a str; 4]> {
    match *words {
        [all] => Some([all; 4]),
        [vertical, horizontal] => Some([vertical, horizontal, vertical, horizontal]),
        [top, horizontal, bottom] => Some([top, horizontal, bottom, horizontal]),
        [top, right, bottom, left] => Some([top, right, bottom, left]),
        _ => None,
    }
}

fn pair<'a>(words: &[&'a str]) -> Option<[&'a str; 2]> {
    match *words {
        [both] => Some([both; 2]),
        [first, second] => Some([first, second]),
        _ => None,
    }
}

fn is_number(word: &str) -> bool {
    word.parse::<f64>().is_ok()
}

fn flex<'a>(words: &[&'a str]) -> Option<[&'a str; 3]> {
    match *words {
        ["none"] => Some(["0", "0", "auto"]),
        ["auto"] => Some(["1", "1", "auto"]),
        ["initial"] => Some(["0", "1", "auto"]),
        [keyword] if GLOBAL_KEYWORDS.contains(&keyword) => Some([keyword; 3]),
        [grow] if is_number(grow) => Some([grow, "1", "0%"]),
        [basis] => Some(["1", "1", basis]),
        [grow, shrink] if is_number(grow) && is_number(shrink) => Some([grow, shrink, "0%"]),
        [grow, basis] if is_number(grow) => Some([grow, "1", basis]),
        [grow, shrink, basis] if is_number(grow) && is_number(shrink) => {
            Some([grow, shrink, basis])
        }
        _ => None,
    }
}

/// Longhand `(property, value)` pairs for a shorthand, or `None` when the
/// property is not a shorthand or its value cannot be split safely.
#[must_use]
pub fn expand(property: &str, value: &str) -> Option<Vec<(String, String)>> {
    // A variable may stand for several words.
    if value.contains("var(") {
        return None;
    }
    let words = split_words(value);
    let sided = |prefix: &str, suffix: &str| -> Option<Vec<(String, String)>> {
        let values = box_values(&words)?;
        Some(
            SIDES
                .iter()
                .zip(values)
                .map(|(side, v)| (format!("{prefix}{side}{suffix}"), v.to_owned()))
                .collect(),
        )
    };
    let paired = |names: [&str; 2]| -> Option<Vec<(String, String)>> {
        let values = pair(&words)?;
        Some(
            names
                .iter()
                .zip(values)
                .map(|(name, v)| ((*name).to_owned(), v.to_owned()))
                .collect(),
        )
    };
    match property {
        "margin" => sided("margin-", ""),
        "padding" => sided("padding-", ""),
        "inset" => sided("", ""),
        "scroll-margin" => sided("scroll-margin-", ""),
        "scroll-padding" => sided("scroll-padding-", ""),
        "border-width" => sided("border-", "-width"),
        "border-style" => sided("border-", "-style"),
        "border-color" => sided("border-", "-color"),
        "border-radius" => {
            if value.contains('/') {
                return None;
            }
            let values = box_values(&words)?;
            Some(
                CORNERS
                    .iter()
                    .zip(values)
                    .map(|(corner, v)| (format!("border-{corner}-radius"), v.to_owned()))
                    .collect(),
            )
        }
        "gap" => paired(["row-gap", "column-gap"]),
        "overflow" => paired(["overflow-x", "overflow-y"]),
        "place-items" => paired(["align-items", "justify-items"]),
        "place-content" => paired(["align-content", "justify-content"]),
        "place-self" => paired(["align-self", "justify-self"]),
        "flex" => {
            let [grow, shrink, basis] = flex(&words)?;
            Some(vec![
                ("flex-grow".to_owned(), grow.to_owned()),
                ("flex-shrink".to_owned(), shrink.to_owned()),
                ("flex-basis".to_owned(), basis.to_owned()),
            ])
        }
        _ => None,
    }
}
