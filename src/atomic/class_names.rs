use std::collections::HashMap;

/// Length of `_` plus the group hash.
const GROUP_PREFIX: usize = 5;

/// The override group of a class: atomic classes group by their first five
/// characters, any other class only with itself.
fn group(class: &str) -> &str {
    if class.starts_with('_') && class.len() > GROUP_PREFIX && class.is_char_boundary(GROUP_PREFIX) {
        &class[..GROUP_PREFIX]
    } else {
        class
    }
}

/// Joins class lists so the last class of each group wins.
///
/// A group keeps the position of its first occurrence, so merging is stable
/// however often the same groups repeat.
#[must_use]
pub fn merge_class_names<'a, I>(classes: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut winners: HashMap<&str, &str> = HashMap::new();
    for class in classes.into_iter().flat_map(str::split_whitespace) {
        let key = group(class);
        if winners.insert(key, class).is_none() {
            order.push(key);
        }
    }
    let mut out = String::new();
    for key in order {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(winners[key]);
    }
    out
}

/// Applies a compression map. The map is keyed by the class without its
/// leading `_`; a mapped class keeps its group so merging still works.
#[must_use]
pub fn compress(class_name: &str, map: &HashMap<String, String>) -> Option<String> {
    let key = class_name.strip_prefix('_')?;
    let short = map.get(key)?;
    Some(format!("{}_{short}", group(class_name)))
}
