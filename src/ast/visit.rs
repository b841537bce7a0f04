use super::{
    ArrayElem, Attr, AttrValue, Child, Element, ExportDecl, Expr, ExprKind, FnBody, Function,
    Item, MemberProp, Module, Pattern, Prop, PropKey, Stmt,
};

/// Read-only traversal. Override a method and call the matching `walk_*`
/// function to keep descending.
pub trait Visit {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_element(&mut self, element: &Element) {
        walk_element(self, element);
    }
}

/// Mutating traversal, mirroring [`Visit`].
pub trait VisitMut {
    fn visit_module_mut(&mut self, module: &mut Module) {
        walk_module_mut(self, module);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_element_mut(&mut self, element: &mut Element) {
        walk_element_mut(self, element);
    }
}

// -- Read-only walkers ------------------------------------------------------

pub fn walk_module<V: Visit + ?Sized>(v: &mut V, module: &Module) {
    for item in &module.items {
        match item {
            Item::Import(_) => {}
            Item::Export(export) => match export {
                ExportDecl::Decl(stmt) => v.visit_stmt(stmt),
                ExportDecl::Default(expr) => v.visit_expr(expr),
                ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
            },
            Item::Stmt(stmt) => v.visit_stmt(stmt),
        }
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Var(decl) => {
            for d in &decl.declarators {
                walk_pattern(v, &d.pattern);
                if let Some(init) = &d.init {
                    v.visit_expr(init);
                }
            }
        }
        Stmt::Fn(decl) => walk_function(v, &decl.function),
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_stmt(consequent);
            if let Some(alt) = alternate {
                v.visit_stmt(alt);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
        Stmt::Expr(expr) => v.visit_expr(expr),
    }
}

fn walk_function<V: Visit + ?Sized>(v: &mut V, function: &Function) {
    for param in &function.params {
        walk_pattern(v, param);
    }
    match &function.body {
        FnBody::Expr(expr) => v.visit_expr(expr),
        FnBody::Block(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
    }
}

fn walk_pattern<V: Visit + ?Sized>(v: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Ident(_) => {}
        Pattern::Object { props, .. } => {
            for prop in props {
                if let PropKey::Computed(key) = &prop.key {
                    v.visit_expr(key);
                }
                walk_pattern(v, &prop.value);
            }
        }
        Pattern::Array { elems, .. } => {
            for elem in elems.iter().flatten() {
                walk_pattern(v, elem);
            }
        }
        Pattern::Assign { target, default } => {
            walk_pattern(v, target);
            v.visit_expr(default);
        }
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Str(_)
        | ExprKind::Num(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Undefined
        | ExprKind::Ident(_) => {}
        ExprKind::Template { exprs, .. } => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        ExprKind::TaggedTemplate { tag, exprs, .. } => {
            v.visit_expr(tag);
            for e in exprs {
                v.visit_expr(e);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        if let PropKey::Computed(key) = key {
                            v.visit_expr(key);
                        }
                        v.visit_expr(value);
                    }
                    Prop::Shorthand(_) => {}
                    Prop::Spread(e) => v.visit_expr(e),
                }
            }
        }
        ExprKind::Array(elems) => {
            for elem in elems {
                match elem {
                    ArrayElem::Expr(e) | ArrayElem::Spread(e) => v.visit_expr(e),
                }
            }
        }
        ExprKind::Member {
            object, property, ..
        } => {
            v.visit_expr(object);
            if let MemberProp::Computed(p) = property {
                v.visit_expr(p);
            }
        }
        ExprKind::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                match arg {
                    ArrayElem::Expr(e) | ArrayElem::Spread(e) => v.visit_expr(e),
                }
            }
        }
        ExprKind::Function(function) => walk_function(v, function),
        ExprKind::Unary { arg, .. } => v.visit_expr(arg),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Cond {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Element(element) => v.visit_element(element),
    }
}

pub fn walk_element<V: Visit + ?Sized>(v: &mut V, element: &Element) {
    for attr in &element.attrs {
        match attr {
            Attr::Named {
                value: Some(AttrValue::Expr(e)),
                ..
            }
            | Attr::Spread(e) => v.visit_expr(e),
            Attr::Named { .. } => {}
        }
    }
    for child in &element.children {
        match child {
            Child::Text(_) => {}
            Child::Expr(e) => v.visit_expr(e),
            Child::Element(el) => v.visit_element(el),
        }
    }
}

// -- Mutating walkers -------------------------------------------------------

pub fn walk_module_mut<V: VisitMut + ?Sized>(v: &mut V, module: &mut Module) {
    for item in &mut module.items {
        match item {
            Item::Import(_) => {}
            Item::Export(export) => match export {
                ExportDecl::Decl(stmt) => v.visit_stmt_mut(stmt),
                ExportDecl::Default(expr) => v.visit_expr_mut(expr),
                ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
            },
            Item::Stmt(stmt) => v.visit_stmt_mut(stmt),
        }
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Var(decl) => {
            for d in &mut decl.declarators {
                if let Some(init) = &mut d.init {
                    v.visit_expr_mut(init);
                }
            }
        }
        Stmt::Fn(decl) => walk_function_mut(v, &mut decl.function),
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr_mut(arg);
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr_mut(test);
            v.visit_stmt_mut(consequent);
            if let Some(alt) = alternate {
                v.visit_stmt_mut(alt);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                v.visit_stmt_mut(s);
            }
        }
        Stmt::Expr(expr) => v.visit_expr_mut(expr),
    }
}

fn walk_function_mut<V: VisitMut + ?Sized>(v: &mut V, function: &mut Function) {
    match &mut function.body {
        FnBody::Expr(expr) => v.visit_expr_mut(expr),
        FnBody::Block(stmts) => {
            for s in stmts {
                v.visit_stmt_mut(s);
            }
        }
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Str(_)
        | ExprKind::Num(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Undefined
        | ExprKind::Ident(_) => {}
        ExprKind::Template { exprs, .. } => {
            for e in exprs {
                v.visit_expr_mut(e);
            }
        }
        ExprKind::TaggedTemplate { tag, exprs, .. } => {
            v.visit_expr_mut(tag);
            for e in exprs {
                v.visit_expr_mut(e);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        if let PropKey::Computed(key) = key {
                            v.visit_expr_mut(key);
                        }
                        v.visit_expr_mut(value);
                    }
                    Prop::Shorthand(_) => {}
                    Prop::Spread(e) => v.visit_expr_mut(e),
                }
            }
        }
        ExprKind::Array(elems) => {
            for elem in elems {
                match elem {
                    ArrayElem::Expr(e) | ArrayElem::Spread(e) => v.visit_expr_mut(e),
                }
            }
        }
        ExprKind::Member {
            object, property, ..
        } => {
            v.visit_expr_mut(object);
            if let MemberProp::Computed(p) = property {
                v.visit_expr_mut(p);
            }
        }
        ExprKind::Call { callee, args } => {
            v.visit_expr_mut(callee);
            for arg in args {
                match arg {
                    ArrayElem::Expr(e) | ArrayElem::Spread(e) => v.visit_expr_mut(e),
                }
            }
        }
        ExprKind::Function(function) => walk_function_mut(v, function),
        ExprKind::Unary { arg, .. } => v.visit_expr_mut(arg),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr_mut(left);
            v.visit_expr_mut(right);
        }
        ExprKind::Cond {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr_mut(test);
            v.visit_expr_mut(consequent);
            v.visit_expr_mut(alternate);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(value);
        }
        ExprKind::Element(element) => v.visit_element_mut(element),
    }
}

pub fn walk_element_mut<V: VisitMut + ?Sized>(v: &mut V, element: &mut Element) {
    for attr in &mut element.attrs {
        match attr {
            Attr::Named {
                value: Some(AttrValue::Expr(e)),
                ..
            }
            | Attr::Spread(e) => v.visit_expr_mut(e),
            Attr::Named { .. } => {}
        }
    }
    for child in &mut element.children {
        match child {
            Child::Text(_) => {}
            Child::Expr(e) => v.visit_expr_mut(e),
            Child::Element(el) => v.visit_element_mut(el),
        }
    }
}
