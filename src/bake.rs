//! The bake pass: turns `css` attributes into atomic class names.
//!
//! Each styled element becomes a style island
//!
//! ```text
//! <CC><CS>{[_0, _1]}</CS><div className={ax(["_1a2b3c4d _5e6f7g8h", existing])} /></CC>
//! ```
//!
//! where `_0`, `_1` are module-level constants holding the rule texts. The
//! island is self-contained: the runtime wrapper inserts the rules on render,
//! and the extraction pass can later lift them out again without looking at
//! anything but the island and the constants.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{
    walk_element_mut, walk_expr, walk_expr_mut, walk_stmt, walk_stmt_mut, ArrayElem, Attr,
    AttrValue, Child, Declarator, Element, Expr, ExprKind, ImportDecl, ImportSpecifier, Item,
    Module, Pattern, Prop, Stmt, VarDecl, VarKind, Visit, VisitMut,
};
use crate::atomic::{merge_class_names, RuleTable};
use crate::config::Options;
use crate::error::StyleBakeError;
use crate::normalize::normalize;
use crate::resolve::{Env, ModuleId, ModuleLoader, Resolver};
use crate::runtime::NONCE_ATTR;
use crate::types::{AtomicRule, Declaration, Location, NormalizeError, ResolveError, Value};

/// Runtime component that renders an island.
pub const WRAPPER: &str = "CC";
/// Runtime component that carries an island's rules.
pub const SHEET: &str = "CS";
/// Runtime class merging function.
pub const MERGE_CLASSES: &str = "ax";

const CSS_ATTR: &str = "css";
const CLASS_ATTR: &str = "className";

/// Classes applied to one styled element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementStyles {
    /// Tag or component name.
    pub element: String,
    /// Position of the `css` attribute value.
    pub location: Location,
    /// Atomic classes in application order, each with its position in that order.
    pub classes: Vec<(String, usize)>,
    /// The classes after last-class-wins merging.
    pub class_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct BakeOutput {
    pub elements: Vec<ElementStyles>,
    /// Unique rules the module references, in discovery order.
    pub rules: Vec<AtomicRule>,
    /// Modules read while resolving styles, excluding the baked one.
    pub included_files: Vec<PathBuf>,
}

/// Bakes every styled element of `module`.
///
/// Modules that import nothing from an import source are returned unchanged.
///
/// # Errors
///
/// Returns [`StyleBakeError::Resolve`] when a style is not statically
/// analyzable, [`StyleBakeError::Normalize`] when it is not a valid style
/// object, and [`StyleBakeError::Invariant`] on internal inconsistencies.
pub fn bake(
    module: &mut Module,
    path: &Path,
    source: &str,
    options: &Options,
    loader: &dyn ModuleLoader,
    table: &mut RuleTable,
) -> Result<BakeOutput, StyleBakeError> {
    let uses_styles = module.items.iter().any(|item| {
        matches!(item, Item::Import(import) if options.import_sources.contains(&import.source))
    });
    if !uses_styles {
        debug!(file = %path.display(), "no style imports, skipping");
        return Ok(BakeOutput::default());
    }

    let mut resolver =
        Resolver::new(loader).with_import_sources(options.import_sources.iter().cloned());
    let id = resolver.add_entry(path, source, module);
    let mut baker = Baker {
        resolver,
        module: id,
        env: Env::new(),
        depth: 0,
        table,
        nonce: options.nonce.clone(),
        taken: taken_names(module),
        next_sheet: 0,
        sheet_names: HashMap::new(),
        constants: Vec::new(),
        rules: Vec::new(),
        elements: Vec::new(),
        islands: 0,
        error: None,
    };
    baker.visit_module_mut(module);
    if let Some(err) = baker.error {
        return Err(err);
    }

    let Baker {
        resolver,
        constants,
        rules,
        elements,
        islands,
        ..
    } = baker;
    if islands > 0 {
        add_runtime_import(module, &options.runtime_module);
        add_sheet_constants(module, &constants, &rules);
    }
    debug!(
        file = %path.display(),
        elements = elements.len(),
        rules = rules.len(),
        "baked module"
    );
    Ok(BakeOutput {
        elements,
        rules,
        included_files: resolver.included_files(),
    })
}

/// Candidate name for the `n`th rule constant. Candidates already used by
/// the module are skipped.
fn sheet_name(n: usize) -> String {
    format!("_{n}")
}

/// Every identifier the module binds or references, at any depth.
#[derive(Default)]
struct Names(HashSet<String>);

impl Names {
    fn add_pattern(&mut self, pattern: &Pattern) {
        self.0.extend(pattern.bound_names().into_iter().map(str::to_owned));
    }
}

impl Visit for Names {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                for declarator in &decl.declarators {
                    self.add_pattern(&declarator.pattern);
                }
            }
            Stmt::Fn(decl) => {
                self.0.insert(decl.name.clone());
                decl.function.params.iter().for_each(|p| self.add_pattern(p));
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => {
                self.0.insert(name.clone());
            }
            ExprKind::Object(props) => {
                for prop in props {
                    if let Prop::Shorthand(name) = prop {
                        self.0.insert(name.clone());
                    }
                }
            }
            ExprKind::Function(function) => {
                function.params.iter().for_each(|p| self.add_pattern(p));
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn taken_names(module: &Module) -> HashSet<String> {
    let mut names = Names::default();
    for item in &module.items {
        if let Item::Import(import) = item {
            names
                .0
                .extend(import.specifiers.iter().map(|s| s.local().to_owned()));
        }
    }
    names.visit_module(module);
    names.0
}

struct Baker<'l, 't> {
    resolver: Resolver<'l>,
    module: ModuleId,
    /// Function-local bindings in scope.
    env: Env,
    /// Function nesting; zero at module level.
    depth: usize,
    table: &'t mut RuleTable,
    nonce: Option<String>,
    /// Names the module already uses; rule constants avoid them.
    taken: HashSet<String>,
    next_sheet: usize,
    sheet_names: HashMap<String, String>,
    /// Constant name per entry of `rules`.
    constants: Vec<String>,
    rules: Vec<AtomicRule>,
    elements: Vec<ElementStyles>,
    islands: usize,
    error: Option<StyleBakeError>,
}

impl Baker<'_, '_> {
    fn bind_params(&mut self, params: &[Pattern]) {
        for param in params {
            for name in param.bound_names() {
                self.env = self
                    .env
                    .bind_dynamic(name, "is a function parameter and only known at runtime");
            }
        }
    }

    fn bind_locals(&mut self, decl: &VarDecl) {
        for declarator in &decl.declarators {
            let names = declarator.pattern.bound_names();
            if decl.kind.is_mutable() {
                let reason = format!("is declared with `{}` and can be reassigned", decl.kind);
                for name in names {
                    self.env = self.env.bind_dynamic(name, reason.clone());
                }
                continue;
            }
            let Some(init) = &declarator.init else {
                continue;
            };
            match self
                .resolver
                .bind_const(self.module, &self.env, &declarator.pattern, init)
            {
                Ok(env) => self.env = env,
                Err(err) => {
                    let reason = match err {
                        ResolveError::UnresolvableExpression { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    for name in names {
                        self.env = self
                            .env
                            .bind_dynamic(name, format!("is not constant ({reason})"));
                    }
                }
            }
        }
    }

    fn sheet_ident(&mut self, rule: &AtomicRule) -> String {
        if let Some(name) = self.sheet_names.get(&rule.css) {
            return name.clone();
        }
        let name = loop {
            let candidate = sheet_name(self.next_sheet);
            self.next_sheet += 1;
            if !self.taken.contains(&candidate) {
                break candidate;
            }
        };
        self.sheet_names.insert(rule.css.clone(), name.clone());
        self.constants.push(name.clone());
        self.rules.push(rule.clone());
        name
    }

    fn bake_element(&mut self, element: &mut Element, index: usize) -> Result<(), StyleBakeError> {
        let expr = match element.attrs.remove(index) {
            Attr::Named {
                value: Some(AttrValue::Expr(e)),
                ..
            } => e,
            Attr::Named {
                value: Some(AttrValue::Str(s)),
                ..
            } => Expr::string(s),
            _ => return Ok(()),
        };
        let location = self.resolver.location(self.module, expr.span);
        let value = self.resolver.evaluate(self.module, &self.env, &expr)?;
        let mut decls = Vec::new();
        collect_declarations(&value, &mut decls).map_err(|source| StyleBakeError::Normalize {
            location: location.clone(),
            source,
        })?;

        let mut classes = Vec::with_capacity(decls.len());
        let mut sheet = Vec::new();
        for (order, decl) in decls.iter().enumerate() {
            let rule = self.table.intern(decl)?.clone();
            let ident = self.sheet_ident(&rule);
            if !sheet.contains(&ident) {
                sheet.push(ident);
            }
            classes.push((rule.class_name, order));
        }
        let class_name = merge_class_names(classes.iter().map(|(c, _)| c.as_str()));
        self.elements.push(ElementStyles {
            element: element.name.clone(),
            location,
            classes,
            class_name: class_name.clone(),
        });
        if sheet.is_empty() {
            return Ok(());
        }

        let existing = element
            .attr_index(CLASS_ATTR)
            .map(|i| element.attrs.remove(i))
            .and_then(|attr| match attr {
                Attr::Named {
                    value: Some(AttrValue::Str(s)),
                    ..
                } => Some(Expr::string(s)),
                Attr::Named {
                    value: Some(AttrValue::Expr(e)),
                    ..
                } => Some(e),
                _ => None,
            });
        let mut parts = vec![ArrayElem::Expr(Expr::string(class_name))];
        parts.extend(existing.map(ArrayElem::Expr));
        let merged = Expr::synthetic(ExprKind::Call {
            callee: Box::new(Expr::ident(MERGE_CLASSES)),
            args: vec![ArrayElem::Expr(Expr::synthetic(ExprKind::Array(parts)))],
        });
        element.attrs.push(Attr::Named {
            name: CLASS_ATTR.to_owned(),
            value: Some(AttrValue::Expr(merged)),
        });

        let mut style_sheet = Element::new(SHEET);
        if let Some(nonce) = &self.nonce {
            style_sheet.attrs.push(Attr::Named {
                name: NONCE_ATTR.to_owned(),
                value: Some(AttrValue::Str(nonce.clone())),
            });
        }
        style_sheet
            .children
            .push(Child::Expr(Expr::synthetic(ExprKind::Array(
                sheet
                    .into_iter()
                    .map(|name| ArrayElem::Expr(Expr::ident(name)))
                    .collect(),
            ))));
        let styled = std::mem::replace(element, Element::new(WRAPPER));
        element.children = vec![
            Child::Element(Box::new(style_sheet)),
            Child::Element(Box::new(styled)),
        ];
        self.islands += 1;
        Ok(())
    }
}

impl VisitMut for Baker<'_, '_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if self.error.is_some() {
            return;
        }
        match &*stmt {
            Stmt::Block(_) => {
                let saved = self.env.clone();
                walk_stmt_mut(self, stmt);
                self.env = saved;
            }
            Stmt::Fn(decl) => {
                if self.depth > 0 {
                    let value = self.resolver.closure(self.module, &self.env, &decl.function);
                    self.env = self.env.bind(decl.name.clone(), value);
                }
                let saved = self.env.clone();
                self.bind_params(&decl.function.params);
                self.depth += 1;
                walk_stmt_mut(self, stmt);
                self.depth -= 1;
                self.env = saved;
            }
            Stmt::Var(decl) => {
                if self.depth > 0 {
                    self.bind_locals(decl);
                }
                walk_stmt_mut(self, stmt);
            }
            _ => walk_stmt_mut(self, stmt),
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if let ExprKind::Function(function) = &expr.kind {
            let saved = self.env.clone();
            self.bind_params(&function.params);
            self.depth += 1;
            walk_expr_mut(self, expr);
            self.depth -= 1;
            self.env = saved;
            return;
        }
        walk_expr_mut(self, expr);
    }

    fn visit_element_mut(&mut self, element: &mut Element) {
        if self.error.is_some() {
            return;
        }
        walk_element_mut(self, element);
        if self.error.is_some() {
            return;
        }
        if let Some(index) = element.attr_index(CSS_ATTR) {
            if let Err(err) = self.bake_element(element, index) {
                self.error = Some(err);
            }
        }
    }
}

/// Flattens a `css` value: an object, or a possibly nested array of objects
/// applied in order. Falsy entries from conditionals are skipped.
fn collect_declarations(value: &Value, out: &mut Vec<Declaration>) -> Result<(), NormalizeError> {
    match value {
        Value::Object(_) => out.extend(normalize(value)?),
        Value::Array(items) => {
            for item in items {
                collect_declarations(item, out)?;
            }
        }
        Value::Null | Value::Undefined | Value::Bool(_) => {}
        other => {
            return Err(NormalizeError::NotAnObject {
                found: other.type_name(),
            });
        }
    }
    Ok(())
}

fn after_imports(module: &Module) -> usize {
    module
        .items
        .iter()
        .rposition(|item| matches!(item, Item::Import(_)))
        .map_or(0, |i| i + 1)
}

fn add_runtime_import(module: &mut Module, runtime_module: &str) {
    let wanted = [MERGE_CLASSES, WRAPPER, SHEET];
    let existing = module.items.iter_mut().find_map(|item| match item {
        Item::Import(import) if import.source == runtime_module => Some(import),
        _ => None,
    });
    let specifier = |name: &str| ImportSpecifier::Named {
        imported: name.to_owned(),
        local: name.to_owned(),
    };
    match existing {
        Some(import) => {
            for name in wanted {
                if !import.specifiers.iter().any(|s| s.local() == name) {
                    import.specifiers.push(specifier(name));
                }
            }
        }
        None => {
            let at = after_imports(module);
            module.items.insert(
                at,
                Item::Import(ImportDecl {
                    specifiers: wanted.into_iter().map(specifier).collect(),
                    source: runtime_module.to_owned(),
                }),
            );
        }
    }
}

fn add_sheet_constants(module: &mut Module, names: &[String], rules: &[AtomicRule]) {
    let at = after_imports(module);
    let constants = names.iter().zip(rules).map(|(name, rule)| {
        Item::Stmt(Stmt::Var(VarDecl {
            kind: VarKind::Const,
            declarators: vec![Declarator {
                pattern: Pattern::Ident(name.clone()),
                init: Some(Expr::string(rule.css.clone())),
            }],
        }))
    });
    module.items.splice(at..at, constants);
}
