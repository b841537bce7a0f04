//! Syntax tree for the component-source subset the compiler understands.
//!
//! The tree is produced by [`parse`](crate::parse::parse), read by the
//! [`Resolver`](crate::Resolver), rewritten by the bake pass, and rewritten
//! again by the extraction pass. Only expressions carry spans; they are the
//! nodes errors point at.

mod visit;

use std::fmt;

pub use visit::{
    Visit, VisitMut, walk_element, walk_element_mut, walk_expr, walk_expr_mut, walk_module,
    walk_module_mut, walk_stmt, walk_stmt_mut,
};

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A span for synthesized nodes that have no source position.
    #[must_use]
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// One-based line and column of `start` within `source`.
    #[must_use]
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let upto = &source[..self.start.min(source.len())];
        let line = upto.matches('\n').count() + 1;
        let column = match upto.rfind('\n') {
            Some(nl) => upto[nl + 1..].chars().count() + 1,
            None => upto.chars().count() + 1,
        };
        (line, column)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Export(ExportDecl),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import local from "…"`
    Default { local: String },
    /// `import { imported as local } from "…"`
    Named { imported: String, local: String },
    /// `import * as local from "…"`
    Namespace { local: String },
}

impl ImportSpecifier {
    #[must_use]
    pub fn local(&self) -> &str {
        match self {
            ImportSpecifier::Default { local }
            | ImportSpecifier::Named { local, .. }
            | ImportSpecifier::Namespace { local } => local,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export const …` / `export function …`
    Decl(Stmt),
    /// `export default <expr>`
    Default(Expr),
    /// `export { local as exported }`, optionally `from "…"`.
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export * from "…"` or `export * as alias from "…"`.
    All {
        source: String,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Fn(FnDecl),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    /// Whether bindings of this kind can be reassigned.
    #[must_use]
    pub fn is_mutable(self) -> bool {
        !matches!(self, VarKind::Const)
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Const => f.write_str("const"),
            VarKind::Let => f.write_str("let"),
            VarKind::Var => f.write_str("var"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub function: Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<Pattern>,
    pub body: FnBody,
    /// Arrow functions have an expression or block body; `function` ones always a block.
    pub is_arrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FnBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Binding patterns for declarations and parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<String>,
    },
    Array {
        elems: Vec<Option<Pattern>>,
        rest: Option<String>,
    },
    /// `target = default`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
}

impl Pattern {
    /// All identifiers this pattern binds, in source order.
    #[must_use]
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Ident(name) => out.push(name),
            Pattern::Object { props, rest } => {
                for prop in props {
                    prop.value.collect_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest);
                }
            }
            Pattern::Array { elems, rest } => {
                for elem in elems.iter().flatten() {
                    elem.collect_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest);
                }
            }
            Pattern::Assign { target, .. } => target.collect_names(out),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropKey,
    pub value: Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    #[must_use]
    pub fn synthetic(kind: ExprKind) -> Self {
        Self::new(kind, Span::synthetic())
    }

    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Ident(name.into()))
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Str(value.into()))
    }

    /// The identifier name, if this expression is a bare identifier.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    TaggedTemplate {
        tag: Box<Expr>,
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Ident(String),
    Object(Vec<Prop>),
    Array(Vec<ArrayElem>),
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ArrayElem>,
    },
    Function(Box<Function>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cond {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Element(Box<Element>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue { key: PropKey, value: Expr },
    Shorthand(String),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(f64),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElem {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Ident(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    StrictEq,
    StrictNotEq,
    LooseEq,
    LooseNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Nullish,
}

/// A markup element: `<name attrs…>children</name>`. Fragments have an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Child>,
    pub self_closing: bool,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Position of the named attribute, ignoring spreads.
    #[must_use]
    pub fn attr_index(&self, name: &str) -> Option<usize> {
        self.attrs
            .iter()
            .position(|a| matches!(a, Attr::Named { name: n, .. } if n == name))
    }

    /// Child elements, skipping text and expression containers.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Child::Element(el) => Some(el.as_ref()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Named {
        name: String,
        value: Option<AttrValue>,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(String),
    Expr(Expr),
    Element(Box<Element>),
}
