use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::ast::{
    ArrayElem, BinaryOp, Expr, ExprKind, FnBody, Function, MemberProp, Pattern, Prop, PropKey,
    Span, Stmt, UnaryOp, VarKind,
};
use crate::types::{format_number, object_insert, ResolveError, Value};

use super::{ModuleId, Resolver, Site, MAX_CALL_DEPTH};

#[derive(Debug, Clone)]
enum Slot {
    Value(Value),
    /// Bound, but not a compile-time constant; the reason completes
    /// "'name' …" in diagnostics.
    Dynamic(String),
}

struct Frame {
    name: String,
    slot: Slot,
    parent: Env,
}

/// Function-local scope: an immutable chain of bindings, innermost first.
#[derive(Clone, Default)]
pub struct Env(Option<Rc<Frame>>);

impl Env {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A child scope binding `name` to a constant.
    #[must_use]
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Env {
        self.push(name.into(), Slot::Value(value))
    }

    /// A child scope in which `name` shadows outer bindings but cannot be evaluated.
    #[must_use]
    pub fn bind_dynamic(&self, name: impl Into<String>, reason: impl Into<String>) -> Env {
        self.push(name.into(), Slot::Dynamic(reason.into()))
    }

    fn push(&self, name: String, slot: Slot) -> Env {
        Env(Some(Rc::new(Frame {
            name,
            slot,
            parent: self.clone(),
        })))
    }

    fn lookup(&self, name: &str) -> Option<&Slot> {
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            if frame.name == name {
                return Some(&frame.slot);
            }
            current = frame.parent.0.as_deref();
        }
        None
    }

    /// Whether `name` is bound in this scope chain.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            names.push(frame.name.as_str());
            current = frame.parent.0.as_deref();
        }
        f.debug_tuple("Env").field(&names).finish()
    }
}

/// A function value and the scope it was created in.
pub struct Closure {
    pub(super) function: Rc<Function>,
    pub(super) env: Env,
    pub(super) module: ModuleId,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.function.params.len())
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Num(n) => Some(*n),
        Value::Str(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                Some(s.parse().unwrap_or(f64::NAN))
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Undefined => Some(f64::NAN),
        _ => None,
    }
}

/// `===`; `None` for reference types, whose identity is not tracked.
fn strict_equals(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x == y),
        (Value::Num(x), Value::Num(y)) => Some(x == y),
        (Value::Bool(x), Value::Bool(y)) => Some(x == y),
        (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => Some(true),
        (
            Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Namespace(_),
            _,
        )
        | (
            _,
            Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Namespace(_),
        ) => None,
        _ => Some(false),
    }
}

/// `==` for primitives.
fn loose_equals(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (x, y) if x.is_nullish() || y.is_nullish() => Some(x.is_nullish() && y.is_nullish()),
        (Value::Str(_), Value::Str(_)) => strict_equals(a, b),
        (
            Value::Num(_) | Value::Str(_) | Value::Bool(_),
            Value::Num(_) | Value::Str(_) | Value::Bool(_),
        ) => Some(to_number(a)? == to_number(b)?),
        _ => strict_equals(a, b),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Option<Ordering>> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(Some(x.cmp(y))),
        _ => Some(to_number(a)?.partial_cmp(&to_number(b)?)),
    }
}

fn concatenates(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::Array(_))
}

impl Resolver<'_> {
    pub(super) fn eval(
        &mut self,
        module: ModuleId,
        env: &Env,
        expr: &Expr,
    ) -> Result<Value, ResolveError> {
        let site = Site {
            module,
            span: expr.span,
        };
        match &expr.kind {
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Num(n) => Ok(Value::Num(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(part) = exprs.get(i) {
                        let value = self.eval(module, env, part)?;
                        let Some(text) = value.to_js_string() else {
                            return Err(self.fail(
                                Site {
                                    module,
                                    span: part.span,
                                },
                                format!("cannot interpolate {} into a template", value.type_name()),
                            ));
                        };
                        out.push_str(&text);
                    }
                }
                Ok(Value::Str(out))
            }
            ExprKind::TaggedTemplate { .. } => {
                Err(self.fail(site, "tagged templates are not supported in style values"))
            }
            ExprKind::Ident(name) => self.eval_ident(module, env, name, site),
            ExprKind::Object(props) => self.eval_object(module, env, props, expr.span),
            ExprKind::Array(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for elem in elems {
                    match elem {
                        ArrayElem::Expr(e) => items.push(self.eval(module, env, e)?),
                        ArrayElem::Spread(e) => match self.eval(module, env, e)? {
                            Value::Array(more) => items.extend(more),
                            other => {
                                return Err(self.fail(
                                    Site {
                                        module,
                                        span: e.span,
                                    },
                                    format!("cannot spread {} into an array", other.type_name()),
                                ));
                            }
                        },
                    }
                }
                Ok(Value::Array(items))
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval(module, env, object)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = match property {
                    MemberProp::Ident(name) => name.clone(),
                    MemberProp::Computed(e) => self.property_key(module, env, e)?,
                };
                self.member(target, &key, site)
            }
            ExprKind::Call { callee, args } => self.eval_call(module, env, callee, args, site),
            ExprKind::Function(function) => Ok(Value::Function(Rc::new(Closure {
                function: Rc::new(function.as_ref().clone()),
                env: env.clone(),
                module,
            }))),
            ExprKind::Unary { op, arg } => {
                let value = self.eval(module, env, arg)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::TypeOf => Ok(Value::Str(value.type_of().to_owned())),
                    UnaryOp::Minus | UnaryOp::Plus => {
                        let Some(n) = to_number(&value) else {
                            return Err(self.fail(
                                site,
                                format!("cannot convert {} to a number", value.type_name()),
                            ));
                        };
                        Ok(Value::Num(if *op == UnaryOp::Minus { -n } else { n }))
                    }
                }
            }
            ExprKind::Binary { op, left, right } => {
                self.eval_binary(module, env, *op, left, right, site)
            }
            ExprKind::Cond {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(module, env, test)?.is_truthy() {
                    self.eval(module, env, consequent)
                } else {
                    self.eval(module, env, alternate)
                }
            }
            ExprKind::Assign { .. } => {
                Err(self.fail(site, "assignments are not statically analyzable"))
            }
            ExprKind::Element(_) => Err(self.fail(site, "markup is not a constant value")),
        }
    }

    fn eval_ident(
        &mut self,
        module: ModuleId,
        env: &Env,
        name: &str,
        site: Site,
    ) -> Result<Value, ResolveError> {
        match env.lookup(name) {
            Some(Slot::Value(value)) => return Ok(value.clone()),
            Some(Slot::Dynamic(reason)) => {
                return Err(self.fail(site, format!("'{name}' {reason}")));
            }
            None => {}
        }
        match self.lookup_top_level(module, name, site) {
            Some(result) => result,
            None => Err(self.fail(site, format!("'{name}' is not defined in module scope"))),
        }
    }

    fn property_key(
        &mut self,
        module: ModuleId,
        env: &Env,
        expr: &Expr,
    ) -> Result<String, ResolveError> {
        match self.eval(module, env, expr)? {
            Value::Str(s) => Ok(s),
            Value::Num(n) => Ok(format_number(n)),
            other => Err(self.fail(
                Site {
                    module,
                    span: expr.span,
                },
                format!("{} cannot be used as a property key", other.type_name()),
            )),
        }
    }

    fn prop_key(
        &mut self,
        module: ModuleId,
        env: &Env,
        key: &PropKey,
    ) -> Result<String, ResolveError> {
        match key {
            PropKey::Ident(s) | PropKey::Str(s) => Ok(s.clone()),
            PropKey::Num(n) => Ok(format_number(*n)),
            PropKey::Computed(e) => self.property_key(module, env, e),
        }
    }

    fn member(&mut self, target: Value, key: &str, site: Site) -> Result<Value, ResolveError> {
        if let Value::Namespace(ns) = target {
            return self.resolve_export(ns, key, site);
        }
        match target.get(key) {
            Some(value) => Ok(value),
            None => {
                let reason = match &target {
                    Value::Object(_) => format!("property '{key}' does not exist"),
                    Value::Array(_) => format!("index '{key}' is out of range"),
                    other => format!("cannot read '{key}' of {}", other.type_name()),
                };
                Err(self.fail(site, reason))
            }
        }
    }

    fn eval_object(
        &mut self,
        module: ModuleId,
        env: &Env,
        props: &[Prop],
        span: Span,
    ) -> Result<Value, ResolveError> {
        let mut fields = Vec::with_capacity(props.len());
        for prop in props {
            match prop {
                Prop::KeyValue { key, value } => {
                    let key = self.prop_key(module, env, key)?;
                    let value = self.eval(module, env, value)?;
                    object_insert(&mut fields, key, value);
                }
                Prop::Shorthand(name) => {
                    let site = Site { module, span };
                    let value = self.eval_ident(module, env, name, site)?;
                    object_insert(&mut fields, name.clone(), value);
                }
                Prop::Spread(e) => {
                    let site = Site {
                        module,
                        span: e.span,
                    };
                    match self.eval(module, env, e)? {
                        Value::Object(more) => {
                            for (k, v) in more {
                                object_insert(&mut fields, k, v);
                            }
                        }
                        Value::Namespace(ns) => {
                            for (k, v) in self.namespace_object(ns, site)? {
                                object_insert(&mut fields, k, v);
                            }
                        }
                        Value::Array(items) => {
                            for (i, v) in items.into_iter().enumerate() {
                                object_insert(&mut fields, i.to_string(), v);
                            }
                        }
                        Value::Null | Value::Undefined => {}
                        other => {
                            return Err(self.fail(
                                site,
                                format!("cannot spread {} into an object", other.type_name()),
                            ));
                        }
                    }
                }
            }
        }
        Ok(Value::Object(fields))
    }

    fn eval_call(
        &mut self,
        module: ModuleId,
        env: &Env,
        callee: &Expr,
        args: &[ArrayElem],
        site: Site,
    ) -> Result<Value, ResolveError> {
        let function = self.eval(module, env, callee)?;
        let immediately_invoked = matches!(callee.kind, ExprKind::Function(_));
        match &function {
            Value::StyleFn => {
                if args.len() != 1 {
                    return Err(self.fail(site, "css() takes exactly one argument"));
                }
            }
            Value::Function(_) => {
                if !immediately_invoked && !args.is_empty() {
                    return Err(self.fail(
                        site,
                        "calls with arguments are only evaluated for immediately-invoked functions",
                    ));
                }
            }
            other => {
                return Err(self.fail(site, format!("{} is not callable", other.type_name())));
            }
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                ArrayElem::Expr(e) => values.push(self.eval(module, env, e)?),
                ArrayElem::Spread(e) => match self.eval(module, env, e)? {
                    Value::Array(items) => values.extend(items),
                    other => {
                        return Err(self.fail(
                            site,
                            format!("cannot spread {} into arguments", other.type_name()),
                        ));
                    }
                },
            }
        }
        match function {
            Value::Function(closure) => self.call_closure(&closure, values, site),
            _ => Ok(values.into_iter().next().unwrap_or(Value::Undefined)),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        site: Site,
    ) -> Result<Value, ResolveError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(self.fail(site, "call depth limit exceeded"));
        }
        self.depth += 1;
        let result = self.invoke(closure, args, site);
        self.depth -= 1;
        result
    }

    fn invoke(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        site: Site,
    ) -> Result<Value, ResolveError> {
        let module = closure.module;
        let mut env = closure.env.clone();
        let mut args = args.into_iter();
        for param in &closure.function.params {
            let arg = args.next().unwrap_or(Value::Undefined);
            env = self.bind_pattern(module, &env, param, arg, site)?;
        }
        match &closure.function.body {
            FnBody::Expr(body) => self.eval(module, &env, body),
            FnBody::Block(stmts) => self.run_body(module, env, stmts),
        }
    }

    /// Evaluates a helper body made only of `const`/function declarations
    /// followed by a `return`.
    fn run_body(
        &mut self,
        module: ModuleId,
        mut env: Env,
        stmts: &[Stmt],
    ) -> Result<Value, ResolveError> {
        for stmt in stmts {
            match stmt {
                Stmt::Var(decl) if decl.kind == VarKind::Const => {
                    for declarator in &decl.declarators {
                        let Some(init) = &declarator.init else {
                            return Err(self.fail(
                                Site {
                                    module,
                                    span: Span::synthetic(),
                                },
                                "constant declared without a value",
                            ));
                        };
                        let site = Site {
                            module,
                            span: init.span,
                        };
                        let value = self.eval(module, &env, init)?;
                        env = self.bind_pattern(module, &env, &declarator.pattern, value, site)?;
                    }
                }
                Stmt::Var(decl) => {
                    let span = decl
                        .declarators
                        .iter()
                        .find_map(|d| d.init.as_ref().map(|e| e.span))
                        .unwrap_or_default();
                    return Err(self.fail(
                        Site { module, span },
                        format!("`{}` declarations are not statically analyzable", decl.kind),
                    ));
                }
                Stmt::Fn(f) => {
                    let closure = Closure {
                        function: Rc::new(f.function.clone()),
                        env: env.clone(),
                        module,
                    };
                    env = env.bind(f.name.clone(), Value::Function(Rc::new(closure)));
                }
                Stmt::Return(Some(value)) => return self.eval(module, &env, value),
                Stmt::Return(None) => return Ok(Value::Undefined),
                Stmt::Expr(e) | Stmt::If { test: e, .. } => {
                    return Err(self.fail(
                        Site {
                            module,
                            span: e.span,
                        },
                        "function bodies may only declare constants and return a value",
                    ));
                }
                Stmt::Block(_) => {
                    return Err(self.fail(
                        Site {
                            module,
                            span: Span::synthetic(),
                        },
                        "function bodies may only declare constants and return a value",
                    ));
                }
            }
        }
        Ok(Value::Undefined)
    }

    pub(super) fn bind_pattern(
        &mut self,
        module: ModuleId,
        env: &Env,
        pattern: &Pattern,
        value: Value,
        site: Site,
    ) -> Result<Env, ResolveError> {
        let mut bound = Vec::new();
        self.destructure(module, env, pattern, value, site, &mut bound)?;
        Ok(bound
            .into_iter()
            .fold(env.clone(), |env, (name, value)| env.bind(name, value)))
    }

    /// Matches `value` against `pattern`, collecting each bound name.
    pub(super) fn destructure(
        &mut self,
        module: ModuleId,
        env: &Env,
        pattern: &Pattern,
        value: Value,
        site: Site,
        out: &mut Vec<(String, Value)>,
    ) -> Result<(), ResolveError> {
        match pattern {
            Pattern::Ident(name) => out.push((name.clone(), value)),
            Pattern::Assign { target, default } => {
                let value = if matches!(value, Value::Undefined) {
                    self.eval(module, env, default)?
                } else {
                    value
                };
                self.destructure(module, env, target, value, site, out)?;
            }
            Pattern::Object { props, rest } => {
                let value = match value {
                    Value::Namespace(ns) => Value::Object(self.namespace_object(ns, site)?),
                    other => other,
                };
                if value.is_nullish() {
                    return Err(self.fail(
                        site,
                        format!("cannot destructure {}", value.type_name()),
                    ));
                }
                let mut used = Vec::with_capacity(props.len());
                for prop in props {
                    let key = self.prop_key(module, env, &prop.key)?;
                    let field = value.get(&key).unwrap_or(Value::Undefined);
                    self.destructure(module, env, &prop.value, field, site, out)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let Value::Object(fields) = &value else {
                        return Err(self.fail(
                            site,
                            format!("cannot collect the rest of {}", value.type_name()),
                        ));
                    };
                    let remaining = fields
                        .iter()
                        .filter(|(k, _)| !used.contains(k))
                        .cloned()
                        .collect();
                    out.push((rest.clone(), Value::Object(remaining)));
                }
            }
            Pattern::Array { elems, rest } => {
                let items = match value {
                    Value::Array(items) => items,
                    Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    other => {
                        return Err(self.fail(
                            site,
                            format!("cannot destructure {} as an array", other.type_name()),
                        ));
                    }
                };
                for (i, elem) in elems.iter().enumerate() {
                    if let Some(pattern) = elem {
                        let item = items.get(i).cloned().unwrap_or(Value::Undefined);
                        self.destructure(module, env, pattern, item, site, out)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = items.iter().skip(elems.len()).cloned().collect();
                    out.push((rest.clone(), Value::Array(remaining)));
                }
            }
        }
        Ok(())
    }

    fn eval_binary(
        &mut self,
        module: ModuleId,
        env: &Env,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        site: Site,
    ) -> Result<Value, ResolveError> {
        let lhs = self.eval(module, env, left)?;
        match op {
            BinaryOp::And => {
                return if lhs.is_truthy() {
                    self.eval(module, env, right)
                } else {
                    Ok(lhs)
                };
            }
            BinaryOp::Or => {
                return if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.eval(module, env, right)
                };
            }
            BinaryOp::Nullish => {
                return if lhs.is_nullish() {
                    self.eval(module, env, right)
                } else {
                    Ok(lhs)
                };
            }
            _ => {}
        }
        let rhs = self.eval(module, env, right)?;
        let value = match op {
            BinaryOp::Add if concatenates(&lhs) || concatenates(&rhs) => {
                match (lhs.to_js_string(), rhs.to_js_string()) {
                    (Some(a), Some(b)) => Value::Str(a + &b),
                    _ => return Err(self.operator_error(site, &lhs, &rhs)),
                }
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                let (Some(a), Some(b)) = (to_number(&lhs), to_number(&rhs)) else {
                    return Err(self.operator_error(site, &lhs, &rhs));
                };
                Value::Num(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                })
            }
            BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                let Some(eq) = strict_equals(&lhs, &rhs) else {
                    return Err(self.operator_error(site, &lhs, &rhs));
                };
                Value::Bool(eq == (op == BinaryOp::StrictEq))
            }
            BinaryOp::LooseEq | BinaryOp::LooseNotEq => {
                let Some(eq) = loose_equals(&lhs, &rhs) else {
                    return Err(self.operator_error(site, &lhs, &rhs));
                };
                Value::Bool(eq == (op == BinaryOp::LooseEq))
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let Some(ordering) = compare(&lhs, &rhs) else {
                    return Err(self.operator_error(site, &lhs, &rhs));
                };
                Value::Bool(match (op, ordering) {
                    (_, None) => false,
                    (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                    (BinaryOp::LtEq, Some(o)) => o != Ordering::Greater,
                    (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                })
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => lhs,
        };
        Ok(value)
    }

    fn operator_error(&self, site: Site, lhs: &Value, rhs: &Value) -> ResolveError {
        self.fail(
            site,
            format!(
                "cannot apply operator to {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
        )
    }
}
