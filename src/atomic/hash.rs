use crate::types::Declaration;

const GROUP_LEN: usize = 4;
const BASE: u32 = 36;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Four base-36 characters derived from the BLAKE3 digest of `input`.
#[must_use]
pub fn hash4(input: &str) -> String {
    let digest = blake3::hash(input.as_bytes());
    let bytes = digest.as_bytes();
    let mut n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % BASE.pow(4);
    let mut out = [b'0'; GROUP_LEN];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(n % BASE) as usize];
        n /= BASE;
    }
    out.iter().map(|&b| char::from(b)).collect()
}

/// Where a declaration applies and to which property; declarations sharing
/// a group override each other.
#[must_use]
pub fn group_hash(decl: &Declaration) -> String {
    let mut input = decl.nesting.at_rules.concat();
    input.push_str(&decl.nesting.selector);
    input.push_str(&decl.property);
    hash4(&input)
}

#[must_use]
pub fn value_hash(decl: &Declaration) -> String {
    if decl.important {
        hash4(&format!("{}!important", decl.value))
    } else {
        hash4(&decl.value)
    }
}

/// The atomic class for a canonical declaration: `_` + group hash + value hash.
#[must_use]
pub fn class_name(decl: &Declaration) -> String {
    format!("_{}{}", group_hash(decl), value_hash(decl))
}

/// Full rule text for `decl` styled through `class_name`, at-rules wrapping
/// the style rule outermost first.
#[must_use]
pub fn rule_css(decl: &Declaration, class_name: &str) -> String {
    let mut css = String::new();
    for at_rule in &decl.nesting.at_rules {
        css.push_str(at_rule);
        css.push('{');
    }
    css.push_str(&decl.nesting.resolve_selector(class_name));
    css.push('{');
    css.push_str(&decl.body());
    css.push('}');
    for _ in &decl.nesting.at_rules {
        css.push('}');
    }
    css
}
