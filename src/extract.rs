//! The extraction pass: lifts baked rules out of the component tree.
//!
//! Runs over the output of [`bake`](crate::bake()). Every style island is
//! replaced by the element it wraps, the rule constants it referenced are
//! removed once nothing else uses them, and the collected rules are emitted
//! according to the configured [`Emission`] policy.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{
    walk_element, walk_element_mut, walk_expr, walk_expr_mut, ArrayElem, Child, Element,
    ExportDecl, Expr, ExprKind, ImportDecl, ImportSpecifier, Item, Module, Pattern, Prop, Span,
    Stmt, Visit, VarKind, VisitMut,
};
use crate::atomic::sort_rules;
use crate::bake::{SHEET, WRAPPER};
use crate::config::{Emission, Options};
use crate::types::{ExtractError, Location};

/// A stylesheet file produced by directory emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedStylesheet {
    pub path: PathBuf,
    pub css: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOutput {
    /// Unique rules in discovery order.
    pub style_rules: Vec<String>,
    /// Set only by directory emission when the module had rules.
    pub stylesheet: Option<ExtractedStylesheet>,
    /// Number of islands removed.
    pub islands: usize,
}

/// Extracts every style island of `module` in place.
///
/// # Errors
///
/// Returns [`ExtractError::UntraceableSheet`] when a rule reference is not a
/// top-level string constant, [`ExtractError::MalformedIsland`] when an
/// island does not have the baked shape, and
/// [`ExtractError::OutsideSourceDirectory`] when directory emission is
/// configured for a file outside its source root.
pub fn extract(
    module: &mut Module,
    path: &Path,
    source: &str,
    emission: &Emission,
    options: &Options,
) -> Result<ExtractOutput, ExtractError> {
    let names = runtime_locals(module, &options.runtime_module);
    let (Some(wrapper), Some(sheet)) = (names.get(WRAPPER), names.get(SHEET)) else {
        debug!(file = %path.display(), "no style islands");
        return Ok(ExtractOutput::default());
    };

    let mut extractor = Extractor {
        path,
        source,
        wrapper: wrapper.clone(),
        sheet: sheet.clone(),
        constants: sheet_constants(module),
        referenced: HashSet::new(),
        seen: HashSet::new(),
        rules: Vec::new(),
        islands: 0,
        span: Span::synthetic(),
        error: None,
    };
    extractor.visit_module_mut(module);
    if let Some(err) = extractor.error {
        return Err(err);
    }
    let Extractor {
        referenced,
        rules,
        islands,
        ..
    } = extractor;

    remove_unused_constants(module, &referenced);
    prune_runtime_import(module, &options.runtime_module);

    let mut output = ExtractOutput {
        style_rules: rules,
        stylesheet: None,
        islands,
    };
    match emission {
        Emission::StyleSheetPath(target) => {
            let imports = output.style_rules.iter().map(|rule| {
                Item::Import(ImportDecl {
                    specifiers: Vec::new(),
                    source: format!("{target}?style={}", urlencoding::encode(rule)),
                })
            });
            module.items.splice(0..0, imports);
        }
        Emission::Directory { source: root, dest } => {
            if !output.style_rules.is_empty() {
                let sheet = stylesheet_file(path, root, dest, &output.style_rules, options)?;
                let file_name = sheet
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                module.items.insert(
                    0,
                    Item::Import(ImportDecl {
                        specifiers: Vec::new(),
                        source: format!("./{file_name}"),
                    }),
                );
                output.stylesheet = Some(sheet);
            }
        }
        Emission::Metadata => {}
    }
    debug!(
        file = %path.display(),
        islands = output.islands,
        rules = output.style_rules.len(),
        "extracted styles"
    );
    Ok(output)
}

fn stylesheet_file(
    path: &Path,
    root: &Path,
    dest: &Path,
    rules: &[String],
    options: &Options,
) -> Result<ExtractedStylesheet, ExtractError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ExtractError::OutsideSourceDirectory {
            file: path.to_path_buf(),
            source_dir: root.to_path_buf(),
        })?;
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = dest.to_path_buf();
    if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
        out.push(parent);
    }
    out.push(format!("{stem}.compiled.css"));

    let mut sorted: Vec<&str> = rules.iter().map(String::as_str).collect();
    sort_rules(&mut sorted, options.sort_at_rules);
    Ok(ExtractedStylesheet {
        path: out,
        css: sorted.join("\n"),
    })
}

/// Local names of the runtime components, keyed by their exported names.
fn runtime_locals(module: &Module, runtime_module: &str) -> HashMap<&'static str, String> {
    let mut out = HashMap::new();
    for item in &module.items {
        let Item::Import(import) = item else {
            continue;
        };
        if import.source != runtime_module {
            continue;
        }
        for specifier in &import.specifiers {
            if let ImportSpecifier::Named { imported, local } = specifier {
                for name in [WRAPPER, SHEET] {
                    if imported == name {
                        out.insert(name, local.clone());
                    }
                }
            }
        }
    }
    out
}

/// Top-level `const _N = "…"` bindings a sheet may reference.
///
/// A name bound more than once at the top level is left out, so a sheet
/// naming it fails as untraceable rather than picking either binding.
fn sheet_constants(module: &Module) -> HashMap<String, String> {
    let mut bindings: HashMap<&str, usize> = HashMap::new();
    for item in &module.items {
        let names: Vec<&str> = match item {
            Item::Import(import) => import.specifiers.iter().map(ImportSpecifier::local).collect(),
            Item::Stmt(stmt) | Item::Export(ExportDecl::Decl(stmt)) => stmt_bindings(stmt),
            Item::Export(_) => Vec::new(),
        };
        for name in names {
            *bindings.entry(name).or_default() += 1;
        }
    }

    module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Stmt(Stmt::Var(decl)) if decl.kind == VarKind::Const => {
                match decl.declarators.as_slice() {
                    [declarator] => match (&declarator.pattern, &declarator.init) {
                        (
                            Pattern::Ident(name),
                            Some(Expr {
                                kind: ExprKind::Str(css),
                                ..
                            }),
                        ) if bindings.get(name.as_str()) == Some(&1) => {
                            Some((name.clone(), css.clone()))
                        }
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        })
        .collect()
}

fn stmt_bindings(stmt: &Stmt) -> Vec<&str> {
    match stmt {
        Stmt::Var(decl) => decl
            .declarators
            .iter()
            .flat_map(|d| d.pattern.bound_names())
            .collect(),
        Stmt::Fn(decl) => vec![decl.name.as_str()],
        _ => Vec::new(),
    }
}

struct Extractor<'a> {
    path: &'a Path,
    source: &'a str,
    wrapper: String,
    sheet: String,
    constants: HashMap<String, String>,
    /// Constants referenced from removed islands.
    referenced: HashSet<String>,
    seen: HashSet<String>,
    rules: Vec<String>,
    islands: usize,
    /// Span of the innermost markup expression, for island errors.
    span: Span,
    error: Option<ExtractError>,
}

impl Extractor<'_> {
    fn location(&self, span: Span) -> Location {
        let (line, column) = span.line_col(self.source);
        Location::new(self.path, line, column)
    }

    fn malformed(&self, detail: &'static str) -> ExtractError {
        ExtractError::MalformedIsland {
            location: self.location(self.span),
            detail,
        }
    }

    /// Replaces the island `element` with what it wraps.
    fn unwrap_island(&mut self, element: &mut Element) -> Result<(), ExtractError> {
        let mut children: Vec<Child> = std::mem::take(&mut element.children)
            .into_iter()
            .filter(|c| !matches!(c, Child::Text(t) if t.trim().is_empty()))
            .collect();
        let sheet_at = children
            .iter()
            .position(|c| matches!(c, Child::Element(el) if el.name == self.sheet))
            .ok_or_else(|| self.malformed("has no style sheet"))?;
        let Child::Element(sheet) = children.remove(sheet_at) else {
            return Err(self.malformed("has no style sheet"));
        };
        self.collect_sheet(&sheet)?;

        let replacement = match children.len() {
            1 => match children.pop() {
                Some(Child::Element(styled)) => *styled,
                Some(other) => fragment(vec![other]),
                None => return Err(self.malformed("wraps nothing")),
            },
            0 => return Err(self.malformed("wraps nothing")),
            _ => fragment(children),
        };
        *element = replacement;
        self.islands += 1;
        Ok(())
    }

    fn collect_sheet(&mut self, sheet: &Element) -> Result<(), ExtractError> {
        let mut exprs = sheet.children.iter().filter_map(|c| match c {
            Child::Expr(e) => Some(e),
            _ => None,
        });
        let (Some(list), None) = (exprs.next(), exprs.next()) else {
            return Err(self.malformed("sheet must hold one rule array"));
        };
        let ExprKind::Array(elems) = &list.kind else {
            return Err(self.malformed("sheet must hold one rule array"));
        };
        for elem in elems {
            let ArrayElem::Expr(reference) = elem else {
                return Err(self.malformed("sheet must not spread rules"));
            };
            let name = match &reference.kind {
                ExprKind::Ident(name) => name,
                // Inline rule strings need no binding.
                ExprKind::Str(css) => {
                    self.record(css.clone());
                    continue;
                }
                _ => {
                    return Err(ExtractError::UntraceableSheet {
                        location: self.location(reference.span),
                        name: "<expression>".to_owned(),
                    });
                }
            };
            let Some(css) = self.constants.get(name).cloned() else {
                return Err(ExtractError::UntraceableSheet {
                    location: self.location(reference.span),
                    name: name.clone(),
                });
            };
            self.referenced.insert(name.clone());
            self.record(css);
        }
        Ok(())
    }

    fn record(&mut self, css: String) {
        if self.seen.insert(css.clone()) {
            self.rules.push(css);
        }
    }
}

fn fragment(children: Vec<Child>) -> Element {
    let mut element = Element::new("");
    element.children = children;
    element
}

impl VisitMut for Extractor<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if matches!(expr.kind, ExprKind::Element(_)) {
            let outer = std::mem::replace(&mut self.span, expr.span);
            walk_expr_mut(self, expr);
            self.span = outer;
        } else {
            walk_expr_mut(self, expr);
        }
    }

    fn visit_element_mut(&mut self, element: &mut Element) {
        while self.error.is_none() && element.name == self.wrapper {
            if let Err(err) = self.unwrap_island(element) {
                self.error = Some(err);
            }
        }
        if self.error.is_none() {
            walk_element_mut(self, element);
        }
    }
}

/// Counts identifier and element-name uses across a module.
#[derive(Default)]
struct Uses {
    idents: HashMap<String, usize>,
    elements: HashMap<String, usize>,
}

impl Uses {
    fn of(module: &Module) -> Self {
        let mut uses = Uses::default();
        uses.visit_module(module);
        for item in &module.items {
            if let Item::Export(ExportDecl::Named {
                specifiers,
                source: None,
            }) = item
            {
                for specifier in specifiers {
                    *uses.idents.entry(specifier.local.clone()).or_default() += 1;
                }
            }
        }
        uses
    }
}

impl Visit for Uses {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => *self.idents.entry(name.clone()).or_default() += 1,
            ExprKind::Object(props) => {
                for prop in props {
                    if let Prop::Shorthand(name) = prop {
                        *self.idents.entry(name.clone()).or_default() += 1;
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_element(&mut self, element: &Element) {
        *self.elements.entry(element.name.clone()).or_default() += 1;
        walk_element(self, element);
    }
}

fn remove_unused_constants(module: &mut Module, referenced: &HashSet<String>) {
    if referenced.is_empty() {
        return;
    }
    let uses = Uses::of(module);
    module.items.retain(|item| {
        let Item::Stmt(Stmt::Var(decl)) = item else {
            return true;
        };
        let [declarator] = decl.declarators.as_slice() else {
            return true;
        };
        let Pattern::Ident(name) = &declarator.pattern else {
            return true;
        };
        !referenced.contains(name) || uses.idents.contains_key(name)
    });
}

fn prune_runtime_import(module: &mut Module, runtime_module: &str) {
    let uses = Uses::of(module);
    module.items.retain_mut(|item| {
        let Item::Import(import) = item else {
            return true;
        };
        if import.source != runtime_module || import.specifiers.is_empty() {
            return true;
        }
        import.specifiers.retain(|specifier| match specifier {
            ImportSpecifier::Named { imported, local } if imported == WRAPPER || imported == SHEET => {
                uses.elements.contains_key(local) || uses.idents.contains_key(local)
            }
            _ => true,
        });
        !import.specifiers.is_empty()
    });
}
