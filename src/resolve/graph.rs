use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::{
    walk_expr, Declarator, ExportDecl, Expr, ExprKind, ImportSpecifier, Item, Module, Pattern,
    Span, Stmt, Visit,
};
use crate::types::{ResolveError, Value};

use super::{
    BindingId, BindingKind, BindingRecord, Closure, DeclId, DeclRecord, Env, ExportEntry,
    Imported, Memo, ModuleId, ModuleRecord, Resolver, Site, DEFAULT_BINDING,
};

/// Root identifiers that are assigned to anywhere in a module, including
/// through member targets (`theme.color = …` reassigns `theme`).
#[derive(Default)]
struct AssignedNames(HashSet<String>);

impl Visit for AssignedNames {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Assign { target, .. } = &expr.kind {
            let mut root = target.as_ref();
            while let ExprKind::Member { object, .. } = &root.kind {
                root = object;
            }
            if let Some(name) = root.as_ident() {
                self.0.insert(name.to_owned());
            }
        }
        walk_expr(self, expr);
    }
}

impl Resolver<'_> {
    pub(super) fn index_module(&mut self, path: PathBuf, source: String, ast: &Module) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(ModuleRecord {
            path: path.clone(),
            source,
            bindings: HashMap::new(),
            exports: HashMap::new(),
            star_exports: Vec::new(),
        });
        self.by_path.insert(path, id);

        let mut assigned = AssignedNames::default();
        assigned.visit_module(ast);
        let assigned = assigned.0;

        for item in &ast.items {
            match item {
                Item::Import(decl) => {
                    for spec in &decl.specifiers {
                        let imported = match spec {
                            ImportSpecifier::Default { .. } => Imported::Default,
                            ImportSpecifier::Named { imported, .. } => {
                                Imported::Named(imported.clone())
                            }
                            ImportSpecifier::Namespace { .. } => Imported::Namespace,
                        };
                        self.add_binding(
                            id,
                            spec.local(),
                            BindingKind::Import {
                                specifier: decl.source.clone(),
                                imported,
                            },
                        );
                    }
                }
                Item::Export(ExportDecl::Decl(stmt)) => {
                    for name in self.index_stmt(id, stmt, &assigned) {
                        self.modules[id.0]
                            .exports
                            .insert(name.clone(), ExportEntry::Local(name));
                    }
                }
                Item::Export(ExportDecl::Default(expr)) => {
                    let declarator = Declarator {
                        pattern: Pattern::Ident(DEFAULT_BINDING.to_owned()),
                        init: Some(expr.clone()),
                    };
                    let decl = self.add_decl(id, declarator);
                    self.add_binding(id, DEFAULT_BINDING, BindingKind::Declared(decl));
                    self.modules[id.0].exports.insert(
                        "default".to_owned(),
                        ExportEntry::Local(DEFAULT_BINDING.to_owned()),
                    );
                }
                Item::Export(ExportDecl::Named {
                    specifiers,
                    source: None,
                }) => {
                    for spec in specifiers {
                        self.modules[id.0]
                            .exports
                            .insert(spec.exported.clone(), ExportEntry::Local(spec.local.clone()));
                    }
                }
                Item::Export(ExportDecl::Named {
                    specifiers,
                    source: Some(source),
                }) => {
                    for spec in specifiers {
                        self.modules[id.0].exports.insert(
                            spec.exported.clone(),
                            ExportEntry::Reexport {
                                specifier: source.clone(),
                                imported: Imported::Named(spec.local.clone()),
                            },
                        );
                    }
                }
                Item::Export(ExportDecl::All {
                    source,
                    alias: Some(alias),
                }) => {
                    self.modules[id.0].exports.insert(
                        alias.clone(),
                        ExportEntry::Reexport {
                            specifier: source.clone(),
                            imported: Imported::Namespace,
                        },
                    );
                }
                Item::Export(ExportDecl::All {
                    source,
                    alias: None,
                }) => self.modules[id.0].star_exports.push(source.clone()),
                Item::Stmt(stmt) => {
                    self.index_stmt(id, stmt, &assigned);
                }
            }
        }
        id
    }

    /// Adds the top-level bindings a statement declares and returns their names.
    fn index_stmt(
        &mut self,
        module: ModuleId,
        stmt: &Stmt,
        assigned: &HashSet<String>,
    ) -> Vec<String> {
        let mut names = Vec::new();
        match stmt {
            Stmt::Var(var) => {
                for declarator in &var.declarators {
                    let bound: Vec<String> = declarator
                        .pattern
                        .bound_names()
                        .into_iter()
                        .map(str::to_owned)
                        .collect();
                    if var.kind.is_mutable() {
                        for name in &bound {
                            self.add_binding(module, name, BindingKind::Mutable(var.kind));
                        }
                    } else {
                        let decl = self.add_decl(module, declarator.clone());
                        for name in &bound {
                            let kind = if assigned.contains(name) {
                                BindingKind::Reassigned
                            } else {
                                BindingKind::Declared(decl)
                            };
                            self.add_binding(module, name, kind);
                        }
                    }
                    names.extend(bound);
                }
            }
            Stmt::Fn(f) => {
                let kind = if assigned.contains(&f.name) {
                    BindingKind::Reassigned
                } else {
                    BindingKind::Function(Rc::new(f.function.clone()))
                };
                self.add_binding(module, &f.name, kind);
                names.push(f.name.clone());
            }
            _ => {}
        }
        names
    }

    fn add_binding(&mut self, module: ModuleId, name: &str, kind: BindingKind) -> BindingId {
        let id = BindingId(self.bindings.len());
        self.bindings.push(BindingRecord {
            name: name.to_owned(),
            kind,
        });
        self.modules[module.0].bindings.insert(name.to_owned(), id);
        id
    }

    fn add_decl(&mut self, module: ModuleId, declarator: Declarator) -> DeclId {
        let id = DeclId(self.decls.len());
        self.decls.push(DeclRecord {
            module,
            declarator: Rc::new(declarator),
            memo: None,
        });
        id
    }

    /// Resolves a top-level name of `module`, if the module declares or imports it.
    pub(super) fn lookup_top_level(
        &mut self,
        module: ModuleId,
        name: &str,
        site: Site,
    ) -> Option<Result<Value, ResolveError>> {
        let id = self.modules[module.0].bindings.get(name).copied()?;
        Some(self.resolve_binding(module, id, site))
    }

    fn resolve_binding(
        &mut self,
        module: ModuleId,
        id: BindingId,
        site: Site,
    ) -> Result<Value, ResolveError> {
        let record = &self.bindings[id.0];
        let name = record.name.clone();
        match &record.kind {
            BindingKind::Declared(decl) => {
                let decl = *decl;
                let values = self.resolve_decl(decl)?;
                Ok(values.get(&name).cloned().unwrap_or(Value::Undefined))
            }
            BindingKind::Mutable(kind) => Err(self.fail(
                site,
                format!("'{name}' is declared with `{kind}` and can be reassigned"),
            )),
            BindingKind::Reassigned => {
                Err(self.fail(site, format!("'{name}' is reassigned after its declaration")))
            }
            BindingKind::Function(function) => Ok(Value::Function(Rc::new(Closure {
                function: Rc::clone(function),
                env: Env::default(),
                module,
            }))),
            BindingKind::Import {
                specifier,
                imported,
            } => {
                let (specifier, imported) = (specifier.clone(), imported.clone());
                self.resolve_import(module, &specifier, &imported, site)
            }
        }
    }

    fn resolve_decl(&mut self, decl: DeclId) -> Result<Rc<HashMap<String, Value>>, ResolveError> {
        let record = &self.decls[decl.0];
        let module = record.module;
        let declarator = Rc::clone(&record.declarator);
        let site = Site {
            module,
            span: declarator
                .init
                .as_ref()
                .map_or_else(Span::synthetic, |e| e.span),
        };
        match &record.memo {
            Some(Memo::Done(result)) => return result.clone(),
            Some(Memo::InProgress) => {
                let names = declarator.pattern.bound_names().join(", ");
                return Err(self.fail(site, format!("circular reference to '{names}'")));
            }
            None => {}
        }
        self.decls[decl.0].memo = Some(Memo::InProgress);
        let result = self.evaluate_declarator(module, &declarator, site);
        self.decls[decl.0].memo = Some(Memo::Done(result.clone()));
        result
    }

    fn evaluate_declarator(
        &mut self,
        module: ModuleId,
        declarator: &Declarator,
        site: Site,
    ) -> Result<Rc<HashMap<String, Value>>, ResolveError> {
        let Some(init) = &declarator.init else {
            return Err(self.fail(site, "constant declared without a value"));
        };
        let env = Env::default();
        let value = self.eval(module, &env, init)?;
        let mut bound = Vec::new();
        self.destructure(module, &env, &declarator.pattern, value, site, &mut bound)?;
        Ok(Rc::new(bound.into_iter().collect()))
    }

    pub(super) fn resolve_import(
        &mut self,
        importer: ModuleId,
        specifier: &str,
        imported: &Imported,
        site: Site,
    ) -> Result<Value, ResolveError> {
        if self.is_import_source(specifier) {
            return match imported {
                Imported::Named(name) if name == "css" => Ok(Value::StyleFn),
                Imported::Named(name) => Err(self.fail(
                    site,
                    format!("'{name}' from '{specifier}' is only available at runtime"),
                )),
                Imported::Default | Imported::Namespace => Err(self.fail(
                    site,
                    format!("'{specifier}' is only available at runtime"),
                )),
            };
        }
        let target = self.load_dependency(importer, specifier, site)?;
        match imported {
            Imported::Default => self.resolve_export(target, "default", site),
            Imported::Named(name) => self.resolve_export(target, name, site),
            Imported::Namespace => Ok(Value::Namespace(target)),
        }
    }

    fn load_dependency(
        &mut self,
        importer: ModuleId,
        specifier: &str,
        site: Site,
    ) -> Result<ModuleId, ResolveError> {
        let importer_path = self.modules[importer.0].path.clone();
        let Some(path) = self.loader.resolve(specifier, &importer_path) else {
            return Err(self.fail(
                site,
                format!("'{specifier}' is an external module and cannot be evaluated"),
            ));
        };
        self.load_module(&path, specifier, &importer_path)
    }

    pub(super) fn resolve_export(
        &mut self,
        module: ModuleId,
        name: &str,
        site: Site,
    ) -> Result<Value, ResolveError> {
        let key = (module, name.to_owned());
        match self.export_memo.get(&key) {
            Some(Memo::Done(result)) => return result.clone(),
            Some(Memo::InProgress) => {
                return Err(self.fail(site, format!("circular re-export of '{name}'")));
            }
            None => {}
        }
        self.export_memo.insert(key.clone(), Memo::InProgress);
        let result = self.resolve_export_uncached(module, name, site);
        self.export_memo.insert(key, Memo::Done(result.clone()));
        result
    }

    fn resolve_export_uncached(
        &mut self,
        module: ModuleId,
        name: &str,
        site: Site,
    ) -> Result<Value, ResolveError> {
        match self.modules[module.0].exports.get(name).cloned() {
            Some(ExportEntry::Local(local)) => match self.lookup_top_level(module, &local, site) {
                Some(result) => result,
                None => Err(self.fail(
                    site,
                    format!("export '{name}' refers to undeclared '{local}'"),
                )),
            },
            Some(ExportEntry::Reexport {
                specifier,
                imported,
            }) => self.resolve_import(module, &specifier, &imported, site),
            None => {
                if name != "default" {
                    let mut visited = HashSet::new();
                    if let Some(target) = self.find_star_export(module, name, site, &mut visited)? {
                        return self.resolve_export(target, name, site);
                    }
                }
                let path = self.modules[module.0].path.display().to_string();
                Err(self.fail(site, format!("'{path}' has no export named '{name}'")))
            }
        }
    }

    /// The module reached through `export *` chains that exports `name` directly.
    fn find_star_export(
        &mut self,
        module: ModuleId,
        name: &str,
        site: Site,
        visited: &mut HashSet<ModuleId>,
    ) -> Result<Option<ModuleId>, ResolveError> {
        if !visited.insert(module) {
            return Ok(None);
        }
        for specifier in self.modules[module.0].star_exports.clone() {
            let target = self.load_dependency(module, &specifier, site)?;
            if self.modules[target.0].exports.contains_key(name) {
                return Ok(Some(target));
            }
            if let Some(found) = self.find_star_export(target, name, site, visited)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// All names a module exports, following `export *` (which never forwards `default`).
    fn export_names(
        &mut self,
        module: ModuleId,
        site: Site,
        visited: &mut HashSet<ModuleId>,
    ) -> Result<Vec<String>, ResolveError> {
        if !visited.insert(module) {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self.modules[module.0].exports.keys().cloned().collect();
        names.sort();
        for specifier in self.modules[module.0].star_exports.clone() {
            let target = self.load_dependency(module, &specifier, site)?;
            for name in self.export_names(target, site, visited)? {
                if name != "default" && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Materializes a namespace import into an object of all its exports.
    pub(super) fn namespace_object(
        &mut self,
        module: ModuleId,
        site: Site,
    ) -> Result<Vec<(String, Value)>, ResolveError> {
        let names = self.export_names(module, site, &mut HashSet::new())?;
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let value = self.resolve_export(module, &name, site)?;
            fields.push((name, value));
        }
        Ok(fields)
    }
}
