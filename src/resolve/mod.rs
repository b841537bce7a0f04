//! Static evaluation of style expressions across module boundaries.
//!
//! Modules and their top-level bindings live in an arena addressed by
//! [`ModuleId`] and [`BindingId`]. Each binding, destructuring declaration
//! and `(module, export)` pair is resolved at most once per [`Resolver`];
//! re-entering one that is still being resolved is reported as a cycle
//! instead of recursing forever.

mod eval;
mod graph;
mod loader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::ast::{Declarator, Expr, Function, Module, Pattern, Span, VarKind};
use crate::parse::parse;
use crate::types::{Location, ResolveError, Value};

pub use eval::{Closure, Env};
pub use loader::{FsLoader, MemoryLoader, ModuleLoader};

/// Handle of a module in the resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

/// Handle of a top-level binding in the resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeclId(usize);

/// Name under which `export default <expr>` is bound.
const DEFAULT_BINDING: &str = "*default*";

const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone)]
enum Memo<T> {
    InProgress,
    Done(Result<T, ResolveError>),
}

#[derive(Debug, Clone, PartialEq)]
enum Imported {
    Default,
    Named(String),
    Namespace,
}

#[derive(Debug, Clone, PartialEq)]
enum ExportEntry {
    Local(String),
    Reexport { specifier: String, imported: Imported },
}

#[derive(Debug)]
enum BindingKind {
    /// A `const` declarator; destructured names share one [`DeclId`].
    Declared(DeclId),
    Mutable(VarKind),
    Reassigned,
    Function(Rc<Function>),
    Import { specifier: String, imported: Imported },
}

#[derive(Debug)]
struct BindingRecord {
    name: String,
    kind: BindingKind,
}

#[derive(Debug)]
struct DeclRecord {
    module: ModuleId,
    declarator: Rc<Declarator>,
    memo: Option<Memo<Rc<HashMap<String, Value>>>>,
}

#[derive(Debug)]
struct ModuleRecord {
    path: PathBuf,
    source: String,
    bindings: HashMap<String, BindingId>,
    exports: HashMap<String, ExportEntry>,
    star_exports: Vec<String>,
}

/// Where an expression being evaluated sits; errors are reported here.
#[derive(Debug, Clone, Copy)]
struct Site {
    module: ModuleId,
    span: Span,
}

/// Module-aware constant evaluator.
///
/// A resolver owns its module cache; create one per compiled file.
pub struct Resolver<'l> {
    loader: &'l dyn ModuleLoader,
    import_sources: Vec<String>,
    modules: Vec<ModuleRecord>,
    by_path: HashMap<PathBuf, ModuleId>,
    bindings: Vec<BindingRecord>,
    decls: Vec<DeclRecord>,
    export_memo: HashMap<(ModuleId, String), Memo<Value>>,
    entry: Option<ModuleId>,
    depth: usize,
}

impl<'l> Resolver<'l> {
    #[must_use]
    pub fn new(loader: &'l dyn ModuleLoader) -> Self {
        Self {
            loader,
            import_sources: vec![crate::config::DEFAULT_IMPORT_SOURCE.to_owned()],
            modules: Vec::new(),
            by_path: HashMap::new(),
            bindings: Vec::new(),
            decls: Vec::new(),
            export_memo: HashMap::new(),
            entry: None,
            depth: 0,
        }
    }

    /// Module specifiers whose `css` export is the style function.
    #[must_use]
    pub fn with_import_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Registers the module being compiled from an already parsed tree.
    pub fn add_entry(&mut self, path: impl Into<PathBuf>, source: &str, ast: &Module) -> ModuleId {
        let id = self.index_module(path.into(), source.to_owned(), ast);
        self.entry = Some(id);
        id
    }

    /// Loads, parses and indexes the module at `path` (once).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ModuleLoad`] or [`ResolveError::Parse`].
    pub fn load(&mut self, path: &Path) -> Result<ModuleId, ResolveError> {
        self.load_module(path, &path.display().to_string(), path)
    }

    fn load_module(
        &mut self,
        path: &Path,
        specifier: &str,
        importer: &Path,
    ) -> Result<ModuleId, ResolveError> {
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }
        let source = self
            .loader
            .load(path)
            .map_err(|e| ResolveError::ModuleLoad {
                specifier: specifier.to_owned(),
                importer: importer.to_path_buf(),
                message: e.to_string(),
            })?;
        let ast = parse(&source).map_err(|error| ResolveError::Parse {
            file: path.to_path_buf(),
            error,
        })?;
        debug!(path = %path.display(), "loaded module");
        Ok(self.index_module(path.to_path_buf(), source, &ast))
    }

    /// Statically evaluates `expr` as it appears in `module`, with `env`
    /// holding any function-local bindings in scope.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnresolvableExpression`] when any part of the
    /// expression is not provably constant.
    pub fn evaluate(
        &mut self,
        module: ModuleId,
        env: &Env,
        expr: &Expr,
    ) -> Result<Value, ResolveError> {
        self.eval(module, env, expr)
    }

    /// Evaluates a function-local `const` declarator and returns `env`
    /// extended with the names its pattern binds.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the initializer is not constant or does
    /// not fit the pattern.
    pub fn bind_const(
        &mut self,
        module: ModuleId,
        env: &Env,
        pattern: &Pattern,
        init: &Expr,
    ) -> Result<Env, ResolveError> {
        let value = self.eval(module, env, init)?;
        let site = Site {
            module,
            span: init.span,
        };
        self.bind_pattern(module, env, pattern, value, site)
    }

    /// A function value closing over `env`.
    #[must_use]
    pub fn closure(&self, module: ModuleId, env: &Env, function: &Function) -> Value {
        Value::Function(Rc::new(Closure {
            function: Rc::new(function.clone()),
            env: env.clone(),
            module,
        }))
    }

    /// Resolves the value a module exports under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the export is missing or not constant.
    pub fn export_value(&mut self, module: ModuleId, name: &str) -> Result<Value, ResolveError> {
        let site = Site {
            module,
            span: Span::synthetic(),
        };
        self.resolve_export(module, name, site)
    }

    /// Every module visited so far except the entry, in load order. Builds
    /// register these as dependencies of the compiled file.
    #[must_use]
    pub fn included_files(&self) -> Vec<PathBuf> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(ModuleId(*i)) != self.entry)
            .map(|(_, m)| m.path.clone())
            .collect()
    }

    #[must_use]
    pub fn module_path(&self, module: ModuleId) -> &Path {
        &self.modules[module.0].path
    }

    /// Whether `specifier` is one of the configured import sources.
    #[must_use]
    pub fn is_import_source(&self, specifier: &str) -> bool {
        self.import_sources.iter().any(|s| s == specifier)
    }

    /// File, line and column of `span` within `module`.
    #[must_use]
    pub fn location(&self, module: ModuleId, span: Span) -> Location {
        let record = &self.modules[module.0];
        let (line, column) = span.line_col(&record.source);
        Location::new(record.path.clone(), line, column)
    }

    fn fail(&self, site: Site, reason: impl Into<String>) -> ResolveError {
        ResolveError::UnresolvableExpression {
            location: self.location(site.module, site.span),
            reason: reason.into(),
        }
    }
}
