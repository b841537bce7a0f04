//! Runtime style insertion.
//!
//! [`StyleManager`] keeps one `<style data-c="…">` container per bucket in the
//! document head, in bucket order, and inserts each rule at most once per
//! page. On its first insertion it adopts whatever a server render left
//! behind: `<style data-ssr>` elements written by [`ServerStyleSheet`] are
//! moved into the bucket containers and removed, and their rules count as
//! already inserted.

mod dev;
mod document;
mod server;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::Options;
use crate::types::Bucket;

pub use dev::order_sensitive_pseudo;
pub use document::{DocumentHead, HeadDocument, NodeId};
pub use server::ServerStyleSheet;

/// Attribute naming a container's bucket.
pub const BUCKET_ATTR: &str = "data-c";
/// Marks containers written during a server render.
pub const SSR_ATTR: &str = "data-ssr";
pub const NONCE_ATTR: &str = "nonce";

/// Splits concatenated rule text into top-level rules.
///
/// Braces inside quoted strings do not count.
#[must_use]
pub fn split_rules(css: &str) -> Vec<&str> {
    let mut rules = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in css.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let rule = css[start..=i].trim();
                    if !rule.is_empty() {
                        rules.push(rule);
                    }
                    start = i + 1;
                }
            }
            _ => {}
        }
    }
    rules
}

/// Client-side inserted-rule cache and bucket containers.
#[derive(Debug, Clone, Default)]
pub struct StyleManager {
    inserted: HashSet<String>,
    containers: HashMap<Bucket, NodeId>,
    hydrated: bool,
    nonce: Option<String>,
    development: bool,
}

impl StyleManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager carrying the `nonce` and `development` settings of `options`.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        Self {
            nonce: options.nonce.clone(),
            development: options.development,
            ..Self::default()
        }
    }

    /// Nonce written to every container the manager creates.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Warns about rules whose selectors depend on element order.
    #[must_use]
    pub fn development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    #[must_use]
    pub fn is_inserted(&self, rule: &str) -> bool {
        self.inserted.contains(rule)
    }

    /// Number of distinct rules present in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    /// Ensures every rule in `rules` is present in `head`. Returns how many
    /// were newly inserted.
    pub fn insert<'r, D, I>(&mut self, head: &mut D, rules: I) -> usize
    where
        D: DocumentHead + ?Sized,
        I: IntoIterator<Item = &'r str>,
    {
        if !self.hydrated {
            self.hydrate(head);
        }
        let mut added = 0;
        for rule in rules {
            if self.inserted.contains(rule) {
                continue;
            }
            if self.development {
                dev::warn_order_sensitive(rule);
            }
            let container = self.container(head, Bucket::classify(rule));
            head.append_text(container, rule);
            self.inserted.insert(rule.to_owned());
            added += 1;
        }
        added
    }

    /// Adopts existing containers and consumes server-rendered ones.
    fn hydrate<D: DocumentHead + ?Sized>(&mut self, head: &mut D) {
        self.hydrated = true;
        let mut server_nodes = Vec::new();
        for node in head.style_elements() {
            let Some(key) = head.attribute(node, BUCKET_ATTR) else {
                continue;
            };
            if head.attribute(node, SSR_ATTR).is_some() {
                server_nodes.push(node);
                continue;
            }
            let Some(bucket) = Bucket::from_key(&key) else {
                continue;
            };
            if self.containers.contains_key(&bucket) {
                continue;
            }
            self.containers.insert(bucket, node);
            for text in head.text_nodes(node) {
                for rule in split_rules(&text) {
                    self.inserted.insert(rule.to_owned());
                }
            }
        }

        let mut moved = 0;
        for node in server_nodes {
            for text in head.text_nodes(node) {
                for rule in split_rules(&text) {
                    if self.inserted.insert(rule.to_owned()) {
                        let container = self.container(head, Bucket::classify(rule));
                        head.append_text(container, rule);
                        moved += 1;
                    }
                }
            }
            head.remove(node);
        }
        debug!(
            containers = self.containers.len(),
            moved, "hydrated style containers"
        );
    }

    /// The container for `bucket`, created in bucket order on first use.
    fn container<D: DocumentHead + ?Sized>(&mut self, head: &mut D, bucket: Bucket) -> NodeId {
        if let Some(node) = self.containers.get(&bucket) {
            return *node;
        }
        let before = bucket
            .following()
            .find_map(|b| self.containers.get(&b).copied());
        let mut attrs = vec![(BUCKET_ATTR, bucket.key())];
        if let Some(nonce) = &self.nonce {
            attrs.push((NONCE_ATTR, nonce.as_str()));
        }
        let node = head.create_style(&attrs, before);
        self.containers.insert(bucket, node);
        node
    }
}
