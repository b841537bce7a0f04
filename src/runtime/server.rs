use std::collections::HashSet;

use crate::config::Options;
use crate::types::Bucket;

use super::document::escape_attr;
use super::{dev, BUCKET_ATTR, NONCE_ATTR, SSR_ATTR};

/// Server-render counterpart of [`StyleManager`](super::StyleManager).
///
/// Use one sheet per request. Each call to [`render`](Self::render) returns
/// inline markup for the rules not yet rendered in that request, one
/// `<style data-ssr>` element per bucket, buckets in cascade order.
#[derive(Debug, Clone, Default)]
pub struct ServerStyleSheet {
    rendered: HashSet<String>,
    nonce: Option<String>,
    development: bool,
}

impl ServerStyleSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet carrying the `nonce` and `development` settings of `options`.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        Self {
            nonce: options.nonce.clone(),
            development: options.development,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    #[must_use]
    pub fn development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    /// Markup for the new rules among `rules`; empty when all were rendered.
    pub fn render<'r, I>(&mut self, rules: I) -> String
    where
        I: IntoIterator<Item = &'r str>,
    {
        let mut by_bucket: Vec<(Bucket, Vec<&str>)> = Vec::new();
        for rule in rules {
            if !self.rendered.insert(rule.to_owned()) {
                continue;
            }
            if self.development {
                dev::warn_order_sensitive(rule);
            }
            let bucket = Bucket::classify(rule);
            match by_bucket.iter_mut().find(|(b, _)| *b == bucket) {
                Some((_, list)) => list.push(rule),
                None => by_bucket.push((bucket, vec![rule])),
            }
        }
        by_bucket.sort_by_key(|(b, _)| *b);

        let mut out = String::new();
        for (bucket, list) in by_bucket {
            out.push_str(&format!("<style {SSR_ATTR} {BUCKET_ATTR}=\"{}\"", bucket.key()));
            if let Some(nonce) = &self.nonce {
                out.push_str(&format!(" {NONCE_ATTR}=\"{}\"", escape_attr(nonce)));
            }
            out.push('>');
            for rule in list {
                out.push_str(rule);
            }
            out.push_str("</style>");
        }
        out
    }

    /// Number of distinct rules rendered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_buckets_in_order() {
        let mut sheet = ServerStyleSheet::new().with_nonce("r4nd");
        let markup = sheet.render([
            "._b:active{color:red}",
            "._a{color:red}",
            "._c{margin:0}",
        ]);
        assert_eq!(
            markup,
            "<style data-ssr data-c=\"\" nonce=\"r4nd\">._a{color:red}._c{margin:0}</style>\
             <style data-ssr data-c=\"a\" nonce=\"r4nd\">._b:active{color:red}</style>"
        );
    }

    #[test]
    fn sheet_takes_nonce_and_development_from_options() {
        let options = Options {
            nonce: Some("a\"b".into()),
            development: true,
            ..Options::default()
        };
        let mut sheet = ServerStyleSheet::from_options(&options);
        assert!(sheet.development);
        assert_eq!(
            sheet.render(["._a{color:red}"]),
            "<style data-ssr data-c=\"\" nonce=\"a&quot;b\">._a{color:red}</style>"
        );
        let mut plain = ServerStyleSheet::from_options(&Options::default());
        assert!(!plain.development);
        assert_eq!(
            plain.render(["._a{color:red}"]),
            "<style data-ssr data-c=\"\">._a{color:red}</style>"
        );
    }

    #[test]
    fn rules_render_once_per_request() {
        let mut sheet = ServerStyleSheet::new();
        assert!(!sheet.render(["._a{color:red}"]).is_empty());
        assert_eq!(sheet.render(["._a{color:red}"]), "");
        assert_eq!(sheet.len(), 1);
    }
}
