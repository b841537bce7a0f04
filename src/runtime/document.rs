/// Handle to a style element inside a [`DocumentHead`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The slice of a document the style manager touches: the `<style>`
/// elements of its head.
pub trait DocumentHead {
    /// Style elements in document order.
    fn style_elements(&self) -> Vec<NodeId>;

    /// Attribute value; boolean attributes read as the empty string.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Text node contents of `node`, in order.
    fn text_nodes(&self, node: NodeId) -> Vec<String>;

    /// Creates an empty style element before `before`, or at the end of
    /// the head when `before` is `None`.
    fn create_style(&mut self, attrs: &[(&str, &str)], before: Option<NodeId>) -> NodeId;

    fn append_text(&mut self, node: NodeId, text: &str);

    fn remove(&mut self, node: NodeId);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StyleNode {
    attrs: Vec<(String, Option<String>)>,
    texts: Vec<String>,
}

/// In-memory document head, used on the server and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadDocument {
    nodes: Vec<Option<StyleNode>>,
    order: Vec<NodeId>,
}

impl HeadDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the `<style>` elements out of `markup`, ignoring everything else.
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::new();
        let mut rest = markup;
        while let Some(open) = rest.find("<style") {
            rest = &rest[open + "<style".len()..];
            let Some(tag_end) = rest.find('>') else {
                break;
            };
            let attrs = parse_attrs(&rest[..tag_end]);
            rest = &rest[tag_end + 1..];
            let close = rest.find("</style>").unwrap_or(rest.len());
            let text = &rest[..close];
            rest = &rest[(close + "</style>".len()).min(rest.len())..];
            let mut texts = Vec::new();
            if !text.is_empty() {
                texts.push(text.to_owned());
            }
            doc.push(StyleNode { attrs, texts }, None);
        }
        doc
    }

    fn push(&mut self, node: StyleNode, before: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        let at = before
            .and_then(|b| self.order.iter().position(|n| *n == b))
            .unwrap_or(self.order.len());
        self.order.insert(at, id);
        id
    }

    fn node(&self, id: NodeId) -> Option<&StyleNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Serializes the head's style elements back to markup.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in self.order.iter().filter_map(|id| self.node(*id)) {
            out.push_str("<style");
            for (name, value) in &node.attrs {
                match value {
                    Some(value) => {
                        out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
                    }
                    None => {
                        out.push_str(&format!(" {name}"));
                    }
                }
            }
            out.push('>');
            for text in &node.texts {
                out.push_str(text);
            }
            out.push_str("</style>");
        }
        out
    }
}

impl DocumentHead for HeadDocument {
    fn style_elements(&self) -> Vec<NodeId> {
        self.order.clone()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone().unwrap_or_default())
    }

    fn text_nodes(&self, node: NodeId) -> Vec<String> {
        self.node(node).map(|n| n.texts.clone()).unwrap_or_default()
    }

    fn create_style(&mut self, attrs: &[(&str, &str)], before: Option<NodeId>) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(n, v)| ((*n).to_owned(), Some((*v).to_owned())))
            .collect();
        self.push(
            StyleNode {
                attrs,
                texts: Vec::new(),
            },
            before,
        )
    }

    fn append_text(&mut self, node: NodeId, text: &str) {
        if let Some(Some(n)) = self.nodes.get_mut(node.0) {
            n.texts.push(text.to_owned());
        }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(slot) = self.nodes.get_mut(node.0) {
            *slot = None;
        }
        self.order.retain(|n| *n != node);
    }
}

pub(crate) fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape_attr(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}

fn parse_attrs(mut input: &str) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    loop {
        input = input.trim_start();
        let name_end = input
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(input.len());
        if name_end == 0 {
            if input.is_empty() {
                break;
            }
            input = &input[1..];
            continue;
        }
        let name = input[..name_end].to_owned();
        input = input[name_end..].trim_start();
        let Some(after_eq) = input.strip_prefix('=') else {
            attrs.push((name, None));
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, rest) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                let end = body.find(q).unwrap_or(body.len());
                (&body[..end], &body[(end + 1).min(body.len())..])
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        attrs.push((name, Some(unescape_attr(value))));
        input = rest;
    }
    attrs
}
