use serde::{Deserialize, Serialize};

use super::bucket::Bucket;

/// A single hashed class and the CSS rule that styles it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicRule {
    pub class_name: String,
    /// Complete rule text, e.g. `@media print{._a1b2c3d4:hover{color:red}}`.
    pub css: String,
    pub bucket: Bucket,
}

impl AtomicRule {
    #[must_use]
    pub fn new(class_name: impl Into<String>, css: impl Into<String>) -> Self {
        let css = css.into();
        let bucket = Bucket::classify(&css);
        Self {
            class_name: class_name.into(),
            css,
            bucket,
        }
    }

    /// The selector of the innermost style rule, with any at-rule wrappers removed.
    #[must_use]
    pub fn selector_text(&self) -> &str {
        let innermost = self.css.rsplit_once('{').map_or("", |(head, _)| head);
        let start = innermost.rfind('{').map_or(0, |i| i + 1);
        &innermost[start..]
    }
}
