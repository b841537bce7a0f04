use winnow::combinator::{alt, cut_err, delimited, eof, not, opt, peek, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::LocatingSlice;
use winnow::token::{any, one_of, take_until, take_while};

use crate::ast::{
    ArrayElem, Attr, AttrValue, BinaryOp, Child, Declarator, Element, ExportDecl,
    ExportSpecifier, Expr, ExprKind, FnBody, FnDecl, Function, ImportDecl, ImportSpecifier, Item,
    MemberProp, Module, ObjectPatternProp, Pattern, Prop, PropKey, Span, Stmt, UnaryOp, VarDecl,
    VarKind,
};

pub(crate) type Input<'i> = LocatingSlice<&'i str>;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "do", "else", "export", "false",
    "for", "function", "if", "import", "let", "new", "null", "return", "switch", "this", "throw",
    "true", "try", "typeof", "undefined", "var", "while",
];

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_whitespace()).void(),
            ("//", take_while(0.., |c: char| c != '\n')).void(),
            ("/*", take_until(0.., "*/"), "*/").void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

/// Punctuation, preceded by optional whitespace.
fn sym<'i>(text: &'static str) -> impl FnMut(&mut Input<'i>) -> ModalResult<()> {
    move |input: &mut Input<'i>| {
        ws.parse_next(input)?;
        text.void().parse_next(input)
    }
}

/// An operator that must not be followed by any of `forbid` (so `=` never
/// matches the front of `==`).
fn operator<'i>(
    text: &'static str,
    forbid: &'static [char],
) -> impl FnMut(&mut Input<'i>) -> ModalResult<()> {
    move |input: &mut Input<'i>| {
        ws.parse_next(input)?;
        text.void().parse_next(input)?;
        not(one_of(move |c: char| forbid.contains(&c))).parse_next(input)
    }
}

fn keyword<'i>(kw: &'static str) -> impl FnMut(&mut Input<'i>) -> ModalResult<()> {
    move |input: &mut Input<'i>| {
        ws.parse_next(input)?;
        kw.void().parse_next(input)?;
        not(one_of(is_ident_continue)).parse_next(input)
    }
}

/// Runs `parser` after skipping whitespace and records the byte range it consumed.
fn spanned<'i, O, P>(mut parser: P) -> impl FnMut(&mut Input<'i>) -> ModalResult<(O, Span)>
where
    P: Parser<Input<'i>, O, ErrMode<winnow::error::ContextError>>,
{
    move |input: &mut Input<'i>| {
        ws.parse_next(input)?;
        let (out, range) = parser.by_ref().with_span().parse_next(input)?;
        Ok((out, Span::new(range.start, range.end)))
    }
}

// -- Identifiers ------------------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn ident_name<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (one_of(is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)
}

/// A binding identifier: any name that is not a reserved word.
fn identifier(input: &mut Input<'_>) -> ModalResult<String> {
    ws.parse_next(input)?;
    ident_name
        .verify(|name: &str| !RESERVED.contains(&name))
        .map(str::to_owned)
        .context(StrContext::Expected(StrContextValue::Description(
            "identifier",
        )))
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn push_escape(input: &mut Input<'_>, out: &mut String) -> ModalResult<()> {
    let esc = any.parse_next(input)?;
    match esc {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        '0' => out.push('\0'),
        '\n' => {}
        'u' => {
            let hex = take_while(4, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
            let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) else {
                return Err(ErrMode::from_input(input).cut());
            };
            out.push(ch);
        }
        other => out.push(other),
    }
    Ok(())
}

fn string_literal(input: &mut Input<'_>) -> ModalResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Label("string literal"))
            .parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => push_escape(input, &mut s)?,
            '\n' => {
                return Err(ErrMode::from_input(input).cut());
            }
            c => s.push(c),
        }
    }
}

fn number(input: &mut Input<'_>) -> ModalResult<f64> {
    alt((
        ("0x", take_while(1.., |c: char| c.is_ascii_hexdigit()))
            .take()
            .try_map(|s: &str| i64::from_str_radix(&s[2..], 16))
            .map(|v| v as f64),
        (
            take_while(0.., |c: char| c.is_ascii_digit()),
            opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
            opt((
                one_of(['e', 'E']),
                opt(one_of(['+', '-'])),
                take_while(1.., |c: char| c.is_ascii_digit()),
            )),
        )
            .take()
            .verify(|s: &str| s.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
            .try_map(|s: &str| s.parse::<f64>()),
    ))
    .parse_next(input)
}

/// Backtick literal, split into its string pieces and `${}` expressions.
fn template_parts(input: &mut Input<'_>) -> ModalResult<(Vec<String>, Vec<Expr>)> {
    '`'.parse_next(input)?;
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut current = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Label("template literal"))
            .parse_next(input)?;
        match ch {
            '`' => {
                quasis.push(current);
                return Ok((quasis, exprs));
            }
            '\\' => push_escape(input, &mut current)?,
            '$' => {
                if opt('{').parse_next(input)?.is_some() {
                    quasis.push(std::mem::take(&mut current));
                    exprs.push(cut_err(expression).parse_next(input)?);
                    cut_err(sym("}")).parse_next(input)?;
                } else {
                    current.push('$');
                }
            }
            c => current.push(c),
        }
    }
}

// -- Expressions ------------------------------------------------------------

pub(crate) fn expression(input: &mut Input<'_>) -> ModalResult<Expr> {
    assignment(input)
}

fn assignment(input: &mut Input<'_>) -> ModalResult<Expr> {
    if let Some(arrow) = opt(arrow_function).parse_next(input)? {
        return Ok(arrow);
    }
    let target = conditional(input)?;
    let op = opt(alt((
        operator("??=", &[]).value("??="),
        operator("||=", &[]).value("||="),
        operator("&&=", &[]).value("&&="),
        operator("+=", &[]).value("+="),
        operator("-=", &[]).value("-="),
        operator("*=", &[]).value("*="),
        operator("/=", &[]).value("/="),
        operator("%=", &[]).value("%="),
        operator("=", &['=', '>']).value("="),
    )))
    .parse_next(input)?;
    let Some(op) = op else {
        return Ok(target);
    };
    let value = cut_err(assignment).parse_next(input)?;
    let span = Span::new(target.span.start, value.span.end);
    Ok(Expr::new(
        ExprKind::Assign {
            op: op.to_owned(),
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    ))
}

fn arrow_function(input: &mut Input<'_>) -> ModalResult<Expr> {
    let (function, span) = spanned(arrow_inner).parse_next(input)?;
    Ok(Expr::new(ExprKind::Function(Box::new(function)), span))
}

fn arrow_inner(input: &mut Input<'_>) -> ModalResult<Function> {
    let params = alt((
        identifier.map(|name| vec![Pattern::Ident(name)]),
        delimited(sym("("), params_list, sym(")")),
    ))
    .parse_next(input)?;
    operator("=>", &[]).parse_next(input)?;
    let body = cut_err(arrow_body).parse_next(input)?;
    Ok(Function {
        params,
        body,
        is_arrow: true,
    })
}

fn arrow_body(input: &mut Input<'_>) -> ModalResult<FnBody> {
    ws.parse_next(input)?;
    if opt(peek('{')).parse_next(input)?.is_some() {
        return block.map(FnBody::Block).parse_next(input);
    }
    assignment
        .map(|e| FnBody::Expr(Box::new(e)))
        .parse_next(input)
}

fn conditional(input: &mut Input<'_>) -> ModalResult<Expr> {
    let test = logical_or(input)?;
    if opt(operator("?", &['.', '?'])).parse_next(input)?.is_none() {
        return Ok(test);
    }
    let consequent = cut_err(assignment).parse_next(input)?;
    cut_err(sym(":")).parse_next(input)?;
    let alternate = cut_err(assignment).parse_next(input)?;
    let span = Span::new(test.span.start, alternate.span.end);
    Ok(Expr::new(
        ExprKind::Cond {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        },
        span,
    ))
}

type OperatorTable = [(&'static str, &'static [char], BinaryOp)];

/// Left-associative chain of `operand (op operand)*`.
fn binary_chain(
    input: &mut Input<'_>,
    operand: fn(&mut Input<'_>) -> ModalResult<Expr>,
    ops: &OperatorTable,
) -> ModalResult<Expr> {
    let mut left = operand(input)?;
    loop {
        let mut matched = None;
        for &(text, forbid, op) in ops {
            if opt(operator(text, forbid)).parse_next(input)?.is_some() {
                matched = Some(op);
                break;
            }
        }
        let Some(op) = matched else {
            return Ok(left);
        };
        let right = cut_err(operand).parse_next(input)?;
        let span = Span::new(left.span.start, right.span.end);
        left = Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
    }
}

fn logical_or(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(
        input,
        logical_and,
        &[
            ("||", &['='], BinaryOp::Or),
            ("??", &['='], BinaryOp::Nullish),
        ],
    )
}

fn logical_and(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(input, equality, &[("&&", &['='], BinaryOp::And)])
}

fn equality(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(
        input,
        relational,
        &[
            ("===", &[], BinaryOp::StrictEq),
            ("!==", &[], BinaryOp::StrictNotEq),
            ("==", &[], BinaryOp::LooseEq),
            ("!=", &[], BinaryOp::LooseNotEq),
        ],
    )
}

fn relational(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(
        input,
        additive,
        &[
            ("<=", &[], BinaryOp::LtEq),
            (">=", &[], BinaryOp::GtEq),
            ("<", &['/'], BinaryOp::Lt),
            (">", &[], BinaryOp::Gt),
        ],
    )
}

fn additive(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(
        input,
        multiplicative,
        &[
            ("+", &['+', '='], BinaryOp::Add),
            ("-", &['-', '='], BinaryOp::Sub),
        ],
    )
}

fn multiplicative(input: &mut Input<'_>) -> ModalResult<Expr> {
    binary_chain(
        input,
        unary,
        &[
            ("*", &['*', '='], BinaryOp::Mul),
            ("/", &['='], BinaryOp::Div),
            ("%", &['='], BinaryOp::Rem),
        ],
    )
}

fn unary_op(input: &mut Input<'_>) -> ModalResult<UnaryOp> {
    alt((
        operator("!", &['=']).value(UnaryOp::Not),
        operator("-", &['-', '=']).value(UnaryOp::Minus),
        operator("+", &['+', '=']).value(UnaryOp::Plus),
        keyword("typeof").value(UnaryOp::TypeOf),
    ))
    .parse_next(input)
}

fn unary(input: &mut Input<'_>) -> ModalResult<Expr> {
    let Some((op, op_span)) = opt(spanned(unary_op)).parse_next(input)? else {
        return postfix(input);
    };
    let arg = cut_err(unary).parse_next(input)?;
    let span = Span::new(op_span.start, arg.span.end);
    Ok(Expr::new(
        ExprKind::Unary {
            op,
            arg: Box::new(arg),
        },
        span,
    ))
}

#[derive(Clone)]
enum Suffix {
    Member { name: String, optional: bool },
    Computed(Expr),
    Call(Vec<ArrayElem>),
    Tagged(Vec<String>, Vec<Expr>),
    AsConst,
}

fn suffix(input: &mut Input<'_>) -> ModalResult<Suffix> {
    alt((
        preceded(operator("?.", &['(', '[']), cut_err(ident_name)).map(|name: &str| {
            Suffix::Member {
                name: name.to_owned(),
                optional: true,
            }
        }),
        preceded(operator(".", &['.']), preceded(ws, cut_err(ident_name))).map(|name: &str| {
            Suffix::Member {
                name: name.to_owned(),
                optional: false,
            }
        }),
        preceded('[', (cut_err(expression), cut_err(sym("]"))))
            .map(|(e, ())| Suffix::Computed(e)),
        preceded('(', |i: &mut Input<'_>| elements_until(i, ")")).map(Suffix::Call),
        template_parts.map(|(quasis, exprs)| Suffix::Tagged(quasis, exprs)),
        (keyword("as"), keyword("const")).value(Suffix::AsConst),
    ))
    .parse_next(input)
}

fn postfix(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut expr = primary(input)?;
    while let Some((suffix, suffix_span)) = opt(spanned(suffix)).parse_next(input)? {
        let span = Span::new(expr.span.start, suffix_span.end);
        let kind = match suffix {
            Suffix::Member { name, optional } => ExprKind::Member {
                object: Box::new(expr),
                property: MemberProp::Ident(name),
                optional,
            },
            Suffix::Computed(property) => ExprKind::Member {
                object: Box::new(expr),
                property: MemberProp::Computed(Box::new(property)),
                optional: false,
            },
            Suffix::Call(args) => ExprKind::Call {
                callee: Box::new(expr),
                args,
            },
            Suffix::Tagged(quasis, exprs) => ExprKind::TaggedTemplate {
                tag: Box::new(expr),
                quasis,
                exprs,
            },
            Suffix::AsConst => continue,
        };
        expr = Expr::new(kind, span);
    }
    Ok(expr)
}

fn primary(input: &mut Input<'_>) -> ModalResult<Expr> {
    let (kind, span) = spanned(primary_kind).parse_next(input)?;
    Ok(Expr::new(kind, span))
}

fn primary_kind(input: &mut Input<'_>) -> ModalResult<ExprKind> {
    alt((
        string_literal.map(ExprKind::Str),
        template_parts.map(|(quasis, exprs)| ExprKind::Template { quasis, exprs }),
        number.map(ExprKind::Num),
        keyword("true").value(ExprKind::Bool(true)),
        keyword("false").value(ExprKind::Bool(false)),
        keyword("null").value(ExprKind::Null),
        keyword("undefined").value(ExprKind::Undefined),
        function_expr.map(|f| ExprKind::Function(Box::new(f))),
        object_literal.map(ExprKind::Object),
        preceded('[', |i: &mut Input<'_>| elements_until(i, "]")).map(ExprKind::Array),
        element.map(|el| ExprKind::Element(Box::new(el))),
        delimited('(', cut_err(expression), cut_err(sym(")"))).map(|e| e.kind),
        identifier.map(ExprKind::Ident),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

/// Comma-separated elements (with spreads) up to `close`; the opener is already consumed.
fn elements_until(input: &mut Input<'_>, close: &'static str) -> ModalResult<Vec<ArrayElem>> {
    let mut elems = Vec::new();
    loop {
        if opt(sym(close)).parse_next(input)?.is_some() {
            return Ok(elems);
        }
        let elem = if opt(sym("...")).parse_next(input)?.is_some() {
            ArrayElem::Spread(cut_err(assignment).parse_next(input)?)
        } else {
            ArrayElem::Expr(cut_err(assignment).parse_next(input)?)
        };
        elems.push(elem);
        if opt(sym(",")).parse_next(input)?.is_none() {
            cut_err(sym(close)).parse_next(input)?;
            return Ok(elems);
        }
    }
}

fn prop_key(input: &mut Input<'_>) -> ModalResult<PropKey> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(PropKey::Str),
        number.map(PropKey::Num),
        delimited('[', cut_err(expression), cut_err(sym("]")))
            .map(|e| PropKey::Computed(Box::new(e))),
        ident_name.map(|s: &str| PropKey::Ident(s.to_owned())),
    ))
    .parse_next(input)
}

fn object_literal(input: &mut Input<'_>) -> ModalResult<Vec<Prop>> {
    '{'.parse_next(input)?;
    let mut props = Vec::new();
    loop {
        if opt(sym("}")).parse_next(input)?.is_some() {
            return Ok(props);
        }
        props.push(cut_err(object_prop).parse_next(input)?);
        if opt(sym(",")).parse_next(input)?.is_none() {
            cut_err(sym("}")).parse_next(input)?;
            return Ok(props);
        }
    }
}

fn object_prop(input: &mut Input<'_>) -> ModalResult<Prop> {
    if opt(sym("...")).parse_next(input)?.is_some() {
        return cut_err(assignment).map(Prop::Spread).parse_next(input);
    }
    let key = prop_key(input)?;
    if opt(sym(":")).parse_next(input)?.is_some() {
        let value = cut_err(assignment).parse_next(input)?;
        return Ok(Prop::KeyValue { key, value });
    }
    // method shorthand: `key(params) { … }`
    if let Some((params, span)) =
        opt(spanned(delimited('(', params_list, sym(")")))).parse_next(input)?
    {
        let body = cut_err(block).parse_next(input)?;
        let function = Function {
            params,
            body: FnBody::Block(body),
            is_arrow: false,
        };
        return Ok(Prop::KeyValue {
            key,
            value: Expr::new(ExprKind::Function(Box::new(function)), span),
        });
    }
    match key {
        PropKey::Ident(name) => Ok(Prop::Shorthand(name)),
        _ => Err(ErrMode::from_input(input).cut()),
    }
}

fn function_expr(input: &mut Input<'_>) -> ModalResult<Function> {
    keyword("function").parse_next(input)?;
    let _name = opt(identifier).parse_next(input)?;
    function_rest(input)
}

/// Parameter list and block body following `function name`.
fn function_rest(input: &mut Input<'_>) -> ModalResult<Function> {
    let params = cut_err(delimited(sym("("), params_list, sym(")"))).parse_next(input)?;
    let body = cut_err(block).parse_next(input)?;
    Ok(Function {
        params,
        body: FnBody::Block(body),
        is_arrow: false,
    })
}

// -- Patterns ---------------------------------------------------------------

fn params_list(input: &mut Input<'_>) -> ModalResult<Vec<Pattern>> {
    let params: Vec<Pattern> = separated(0.., param, sym(",")).parse_next(input)?;
    let _ = opt(sym(",")).parse_next(input)?;
    Ok(params)
}

fn param(input: &mut Input<'_>) -> ModalResult<Pattern> {
    if opt(sym("...")).parse_next(input)?.is_some() {
        return identifier.map(Pattern::Ident).parse_next(input);
    }
    pattern_with_default(input)
}

fn pattern(input: &mut Input<'_>) -> ModalResult<Pattern> {
    ws.parse_next(input)?;
    alt((object_pattern, array_pattern, identifier.map(Pattern::Ident))).parse_next(input)
}

fn with_default(input: &mut Input<'_>, target: Pattern) -> ModalResult<Pattern> {
    if opt(operator("=", &['=', '>'])).parse_next(input)?.is_none() {
        return Ok(target);
    }
    let default = cut_err(assignment).parse_next(input)?;
    Ok(Pattern::Assign {
        target: Box::new(target),
        default: Box::new(default),
    })
}

fn pattern_with_default(input: &mut Input<'_>) -> ModalResult<Pattern> {
    let target = pattern(input)?;
    with_default(input, target)
}

fn object_pattern(input: &mut Input<'_>) -> ModalResult<Pattern> {
    '{'.parse_next(input)?;
    let mut props = Vec::new();
    let mut rest = None;
    loop {
        if opt(sym("}")).parse_next(input)?.is_some() {
            break;
        }
        if opt(sym("...")).parse_next(input)?.is_some() {
            rest = Some(identifier(input)?);
        } else {
            let key = prop_key(input)?;
            let value = if opt(sym(":")).parse_next(input)?.is_some() {
                pattern_with_default(input)?
            } else {
                match &key {
                    PropKey::Ident(name) => with_default(input, Pattern::Ident(name.clone()))?,
                    _ => return Err(ErrMode::from_input(input)),
                }
            };
            props.push(ObjectPatternProp { key, value });
        }
        if opt(sym(",")).parse_next(input)?.is_none() {
            sym("}").parse_next(input)?;
            break;
        }
    }
    Ok(Pattern::Object { props, rest })
}

fn array_pattern(input: &mut Input<'_>) -> ModalResult<Pattern> {
    '['.parse_next(input)?;
    let mut elems = Vec::new();
    let mut rest = None;
    loop {
        if opt(sym("]")).parse_next(input)?.is_some() {
            break;
        }
        if opt(sym(",")).parse_next(input)?.is_some() {
            elems.push(None);
            continue;
        }
        if opt(sym("...")).parse_next(input)?.is_some() {
            rest = Some(identifier(input)?);
        } else {
            elems.push(Some(pattern_with_default(input)?));
        }
        if opt(sym(",")).parse_next(input)?.is_none() {
            sym("]").parse_next(input)?;
            break;
        }
    }
    Ok(Pattern::Array { elems, rest })
}

// -- Markup -----------------------------------------------------------------

fn is_tag_char(c: char) -> bool {
    is_ident_continue(c) || c == '.' || c == '-' || c == ':'
}

fn element(input: &mut Input<'_>) -> ModalResult<Element> {
    '<'.parse_next(input)?;
    if opt((ws, '>')).parse_next(input)?.is_some() {
        let children = cut_err(|i: &mut Input<'_>| element_children(i, "")).parse_next(input)?;
        return Ok(Element {
            name: String::new(),
            attrs: Vec::new(),
            children,
            self_closing: false,
        });
    }
    let name = take_while(1.., is_tag_char).parse_next(input)?.to_owned();
    let mut attrs = Vec::new();
    loop {
        ws.parse_next(input)?;
        if opt("/>").parse_next(input)?.is_some() {
            return Ok(Element {
                name,
                attrs,
                children: Vec::new(),
                self_closing: true,
            });
        }
        if opt('>').parse_next(input)?.is_some() {
            let children =
                cut_err(|i: &mut Input<'_>| element_children(i, &name)).parse_next(input)?;
            return Ok(Element {
                name,
                attrs,
                children,
                self_closing: false,
            });
        }
        attrs.push(
            cut_err(attribute)
                .context(StrContext::Label("attribute"))
                .parse_next(input)?,
        );
    }
}

fn attribute(input: &mut Input<'_>) -> ModalResult<Attr> {
    if opt('{').parse_next(input)?.is_some() {
        sym("...").parse_next(input)?;
        let expr = expression(input)?;
        sym("}").parse_next(input)?;
        return Ok(Attr::Spread(expr));
    }
    let name = take_while(1.., is_tag_char).parse_next(input)?.to_owned();
    if opt(sym("=")).parse_next(input)?.is_none() {
        return Ok(Attr::Named { name, value: None });
    }
    ws.parse_next(input)?;
    let value = alt((
        string_literal.map(AttrValue::Str),
        delimited('{', expression, sym("}")).map(AttrValue::Expr),
    ))
    .parse_next(input)?;
    Ok(Attr::Named {
        name,
        value: Some(value),
    })
}

fn element_children(input: &mut Input<'_>, name: &str) -> ModalResult<Vec<Child>> {
    let mut children = Vec::new();
    loop {
        if opt("</").parse_next(input)?.is_some() {
            ws.parse_next(input)?;
            let closing = take_while(0.., is_tag_char).parse_next(input)?;
            if closing != name {
                return Err(ErrMode::from_input(input).cut());
            }
            sym(">").parse_next(input)?;
            return Ok(children);
        }
        if opt('{').parse_next(input)?.is_some() {
            if opt(sym("}")).parse_next(input)?.is_some() {
                continue;
            }
            let expr = expression(input)?;
            sym("}").parse_next(input)?;
            children.push(Child::Expr(expr));
            continue;
        }
        if opt(peek('<')).parse_next(input)?.is_some() {
            children.push(Child::Element(Box::new(element(input)?)));
            continue;
        }
        let text = take_while(1.., |c: char| c != '<' && c != '{').parse_next(input)?;
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            children.push(Child::Text(collapsed));
        }
    }
}

// -- Statements -------------------------------------------------------------

fn semicolons(input: &mut Input<'_>) -> ModalResult<()> {
    let _: () = repeat(0.., sym(";")).parse_next(input)?;
    Ok(())
}

fn block(input: &mut Input<'_>) -> ModalResult<Vec<Stmt>> {
    sym("{").parse_next(input)?;
    let mut stmts = Vec::new();
    loop {
        semicolons(input)?;
        if opt(sym("}")).parse_next(input)?.is_some() {
            return Ok(stmts);
        }
        stmts.push(cut_err(statement).parse_next(input)?);
    }
}

fn var_kind(input: &mut Input<'_>) -> ModalResult<VarKind> {
    alt((
        keyword("const").value(VarKind::Const),
        keyword("let").value(VarKind::Let),
        keyword("var").value(VarKind::Var),
    ))
    .parse_next(input)
}

fn declarator(input: &mut Input<'_>) -> ModalResult<Declarator> {
    let pattern = pattern(input)?;
    let init = opt(preceded(operator("=", &['=', '>']), cut_err(assignment))).parse_next(input)?;
    Ok(Declarator { pattern, init })
}

fn var_decl(input: &mut Input<'_>) -> ModalResult<VarDecl> {
    let kind = var_kind(input)?;
    let declarators = cut_err(separated(1.., declarator, sym(",")))
        .context(StrContext::Label("declaration"))
        .parse_next(input)?;
    Ok(VarDecl { kind, declarators })
}

fn fn_decl(input: &mut Input<'_>) -> ModalResult<FnDecl> {
    keyword("function").parse_next(input)?;
    let name = identifier(input)?;
    let function = function_rest(input)?;
    Ok(FnDecl { name, function })
}

fn return_stmt(input: &mut Input<'_>) -> ModalResult<Stmt> {
    keyword("return").parse_next(input)?;
    let value = opt(expression).parse_next(input)?;
    Ok(Stmt::Return(value))
}

fn if_stmt(input: &mut Input<'_>) -> ModalResult<Stmt> {
    keyword("if").parse_next(input)?;
    let test = cut_err(delimited(sym("("), expression, sym(")"))).parse_next(input)?;
    let consequent = cut_err(statement).parse_next(input)?;
    let alternate = opt(preceded(keyword("else"), cut_err(statement))).parse_next(input)?;
    Ok(Stmt::If {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    })
}

fn statement(input: &mut Input<'_>) -> ModalResult<Stmt> {
    ws.parse_next(input)?;
    let stmt = alt((
        var_decl.map(Stmt::Var),
        fn_decl.map(Stmt::Fn),
        return_stmt,
        if_stmt,
        block.map(Stmt::Block),
        expression.map(Stmt::Expr),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "statement",
    )))
    .parse_next(input)?;
    semicolons(input)?;
    Ok(stmt)
}

// -- Modules ----------------------------------------------------------------

fn module_name(input: &mut Input<'_>) -> ModalResult<String> {
    ws.parse_next(input)?;
    alt((
        string_literal,
        ident_name.map(str::to_owned),
    ))
    .parse_next(input)
}

fn import_specifier(input: &mut Input<'_>) -> ModalResult<ImportSpecifier> {
    let imported = module_name(input)?;
    let local = match opt(preceded(keyword("as"), cut_err(identifier))).parse_next(input)? {
        Some(local) => local,
        None => imported.clone(),
    };
    Ok(ImportSpecifier::Named { imported, local })
}

fn import_decl(input: &mut Input<'_>) -> ModalResult<ImportDecl> {
    keyword("import").parse_next(input)?;
    ws.parse_next(input)?;
    if let Some(source) = opt(string_literal).parse_next(input)? {
        return Ok(ImportDecl {
            specifiers: Vec::new(),
            source,
        });
    }
    let _ = opt(keyword("type")).parse_next(input)?;
    let mut specifiers = Vec::new();
    let mut more = true;
    if let Some(local) = opt(identifier).parse_next(input)? {
        specifiers.push(ImportSpecifier::Default { local });
        more = opt(sym(",")).parse_next(input)?.is_some();
    }
    if more {
        if opt(sym("*")).parse_next(input)?.is_some() {
            cut_err(keyword("as")).parse_next(input)?;
            let local = cut_err(identifier).parse_next(input)?;
            specifiers.push(ImportSpecifier::Namespace { local });
        } else if opt(sym("{")).parse_next(input)?.is_some() {
            let named: Vec<ImportSpecifier> =
                separated(0.., import_specifier, sym(",")).parse_next(input)?;
            specifiers.extend(named);
            let _ = opt(sym(",")).parse_next(input)?;
            cut_err(sym("}")).parse_next(input)?;
        }
    }
    cut_err(keyword("from"))
        .context(StrContext::Expected(StrContextValue::StringLiteral("from")))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let source = cut_err(string_literal).parse_next(input)?;
    semicolons(input)?;
    Ok(ImportDecl { specifiers, source })
}

fn export_specifier(input: &mut Input<'_>) -> ModalResult<ExportSpecifier> {
    let local = module_name(input)?;
    let exported = match opt(preceded(keyword("as"), cut_err(module_name))).parse_next(input)? {
        Some(exported) => exported,
        None => local.clone(),
    };
    Ok(ExportSpecifier { local, exported })
}

fn export_from(input: &mut Input<'_>) -> ModalResult<Option<String>> {
    if opt(keyword("from")).parse_next(input)?.is_none() {
        return Ok(None);
    }
    ws.parse_next(input)?;
    cut_err(string_literal).map(Some).parse_next(input)
}

fn export_decl(input: &mut Input<'_>) -> ModalResult<ExportDecl> {
    keyword("export").parse_next(input)?;
    if opt(keyword("default")).parse_next(input)?.is_some() {
        let expr = cut_err(alt((
            spanned(preceded(keyword("function"), (opt(identifier), function_rest)))
                .map(|((_, f), span)| Expr::new(ExprKind::Function(Box::new(f)), span)),
            assignment,
        )))
        .parse_next(input)?;
        semicolons(input)?;
        return Ok(ExportDecl::Default(expr));
    }
    if opt(sym("*")).parse_next(input)?.is_some() {
        let alias = opt(preceded(keyword("as"), cut_err(module_name))).parse_next(input)?;
        let Some(source) = export_from(input)? else {
            return Err(ErrMode::from_input(input).cut());
        };
        semicolons(input)?;
        return Ok(ExportDecl::All { source, alias });
    }
    if opt(sym("{")).parse_next(input)?.is_some() {
        let specifiers: Vec<ExportSpecifier> =
            separated(0.., export_specifier, sym(",")).parse_next(input)?;
        let _ = opt(sym(",")).parse_next(input)?;
        cut_err(sym("}")).parse_next(input)?;
        let source = export_from(input)?;
        semicolons(input)?;
        return Ok(ExportDecl::Named { specifiers, source });
    }
    let decl = cut_err(alt((var_decl.map(Stmt::Var), fn_decl.map(Stmt::Fn))))
        .context(StrContext::Label("export"))
        .parse_next(input)?;
    semicolons(input)?;
    Ok(ExportDecl::Decl(decl))
}

fn item(input: &mut Input<'_>) -> ModalResult<Item> {
    alt((
        import_decl.map(Item::Import),
        export_decl.map(Item::Export),
        statement.map(Item::Stmt),
    ))
    .parse_next(input)
}

pub(crate) fn module(input: &mut Input<'_>) -> ModalResult<Module> {
    let mut items = Vec::new();
    loop {
        semicolons(input)?;
        ws.parse_next(input)?;
        if opt(eof).parse_next(input)?.is_some() {
            return Ok(Module { items });
        }
        items.push(cut_err(item).parse_next(input)?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn expr(src: &str) -> Expr {
        let mut input = LocatingSlice::new(src);
        let e = expression(&mut input).unwrap();
        ws(&mut input).unwrap();
        assert!(input.is_empty(), "unconsumed input in {src:?}");
        e
    }

    fn first_stmt(src: &str) -> Stmt {
        match parse(src).unwrap().items.into_iter().next().unwrap() {
            Item::Stmt(stmt) => stmt,
            other => panic!("expected statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_literals() {
        assert_eq!(expr("'blue'").kind, ExprKind::Str("blue".into()));
        assert_eq!(expr("\"a\\\"b\"").kind, ExprKind::Str("a\"b".into()));
        assert_eq!(expr("12").kind, ExprKind::Num(12.0));
        assert_eq!(expr(".5").kind, ExprKind::Num(0.5));
        assert_eq!(expr("1e3").kind, ExprKind::Num(1000.0));
        assert_eq!(expr("0xff").kind, ExprKind::Num(255.0));
        assert_eq!(expr("true").kind, ExprKind::Bool(true));
        assert_eq!(expr("null").kind, ExprKind::Null);
        assert_eq!(expr("undefined").kind, ExprKind::Undefined);
    }

    #[test]
    fn parse_unicode_escape() {
        assert_eq!(expr("'\\u201C'").kind, ExprKind::Str("\u{201C}".into()));
    }

    #[test]
    fn parse_template_literal() {
        let e = expr("`${a}px solid ${b}`");
        let ExprKind::Template { quasis, exprs } = e.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["", "px solid ", ""]);
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].as_ident(), Some("a"));
    }

    #[test]
    fn parse_object_literal_forms() {
        let e = expr("{ color: 'red', 'font-size': 12, [key]: 1, short, ...rest, fn() { return 1; } }");
        let ExprKind::Object(props) = e.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 6);
        assert!(matches!(&props[0], Prop::KeyValue { key: PropKey::Ident(k), .. } if k == "color"));
        assert!(matches!(&props[1], Prop::KeyValue { key: PropKey::Str(k), .. } if k == "font-size"));
        assert!(matches!(&props[2], Prop::KeyValue { key: PropKey::Computed(_), .. }));
        assert_eq!(props[3], Prop::Shorthand("short".into()));
        assert!(matches!(&props[4], Prop::Spread(_)));
        assert!(matches!(
            &props[5],
            Prop::KeyValue { value: Expr { kind: ExprKind::Function(_), .. }, .. }
        ));
    }

    #[test]
    fn parse_precedence() {
        let e = expr("a + b * c");
        let ExprKind::Binary { op, right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parse_conditional_and_logical() {
        let e = expr("a && b ? c ?? d : -e");
        let ExprKind::Cond { test, consequent, alternate } = e.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(test.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
        assert!(matches!(consequent.kind, ExprKind::Binary { op: BinaryOp::Nullish, .. }));
        assert!(matches!(alternate.kind, ExprKind::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn parse_member_call_chain() {
        let e = expr("theme.colors['primary'].get()");
        let ExprKind::Call { callee, args } = e.kind else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        assert!(matches!(callee.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn parse_optional_member_and_as_const() {
        let e = expr("a?.b as const");
        assert!(matches!(e.kind, ExprKind::Member { optional: true, .. }));
    }

    #[test]
    fn parse_arrow_functions() {
        let e = expr("(a, { b = 1 }) => a + b");
        let ExprKind::Function(f) = e.kind else {
            panic!("expected function");
        };
        assert!(f.is_arrow);
        assert_eq!(f.params.len(), 2);
        assert!(matches!(f.body, FnBody::Expr(_)));

        let e = expr("x => { return x; }");
        let ExprKind::Function(f) = e.kind else {
            panic!("expected function");
        };
        assert!(matches!(f.body, FnBody::Block(ref stmts) if stmts.len() == 1));
    }

    #[test]
    fn parse_parenthesized_is_not_arrow() {
        let e = expr("(props.a)");
        assert!(matches!(e.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn parse_iife() {
        let e = expr("(() => ({ color: 'red' }))()");
        let ExprKind::Call { callee, .. } = e.kind else {
            panic!("expected call");
        };
        assert!(matches!(callee.kind, ExprKind::Function(_)));
    }

    #[test]
    fn parse_tagged_template() {
        let e = expr("css`color: ${c};`");
        assert!(matches!(e.kind, ExprKind::TaggedTemplate { .. }));
    }

    #[test]
    fn parse_element_with_attrs_and_children() {
        let e = expr("<div css={{ color: 'red' }} id=\"x\" hidden {...rest}>Hi {name}<b /></div>");
        let ExprKind::Element(el) = e.kind else {
            panic!("expected element");
        };
        assert_eq!(el.name, "div");
        assert_eq!(el.attrs.len(), 4);
        assert_eq!(el.attr_index("css"), Some(0));
        assert!(matches!(&el.attrs[2], Attr::Named { value: None, .. }));
        assert!(matches!(&el.attrs[3], Attr::Spread(_)));
        assert_eq!(el.children.len(), 3);
        assert_eq!(el.children[0], Child::Text("Hi".into()));
        assert_eq!(el.child_elements().count(), 1);
    }

    #[test]
    fn parse_fragment_and_comment_child() {
        let e = expr("<>{/* note */}<span>a b\n  c</span></>");
        let ExprKind::Element(el) = e.kind else {
            panic!("expected element");
        };
        assert_eq!(el.name, "");
        assert_eq!(el.children.len(), 1);
        let inner = el.child_elements().next().unwrap();
        assert_eq!(inner.children, vec![Child::Text("a b c".into())]);
    }

    #[test]
    fn parse_mismatched_closing_tag_fails() {
        assert!(parse("const a = <div></span>;").is_err());
    }

    #[test]
    fn parse_var_decl_patterns() {
        let Stmt::Var(decl) = first_stmt("const { a, b: [c, , ...d], e = 2 } = obj;") else {
            panic!("expected var decl");
        };
        assert_eq!(decl.kind, VarKind::Const);
        assert_eq!(decl.declarators[0].pattern.bound_names(), vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn parse_multiple_declarators() {
        let Stmt::Var(decl) = first_stmt("let a = 1, b;") else {
            panic!("expected var decl");
        };
        assert_eq!(decl.kind, VarKind::Let);
        assert_eq!(decl.declarators.len(), 2);
        assert!(decl.declarators[1].init.is_none());
    }

    #[test]
    fn parse_function_and_if() {
        let Stmt::Fn(f) = first_stmt("function pick(x) { if (x) { return 1; } else return 2 }") else {
            panic!("expected fn decl");
        };
        assert_eq!(f.name, "pick");
        let FnBody::Block(body) = &f.function.body else {
            panic!("expected block body");
        };
        assert!(matches!(&body[0], Stmt::If { alternate: Some(_), .. }));
    }

    #[test]
    fn parse_imports() {
        let m = parse(
            "import React, { useState as useS, default as d } from 'react';\n\
             import * as tokens from './tokens';\n\
             import './side-effect';",
        )
        .unwrap();
        assert_eq!(m.items.len(), 3);
        let Item::Import(first) = &m.items[0] else {
            panic!("expected import");
        };
        assert_eq!(first.source, "react");
        let locals: Vec<_> = first.specifiers.iter().map(ImportSpecifier::local).collect();
        assert_eq!(locals, vec!["React", "useS", "d"]);
        let Item::Import(ns) = &m.items[1] else {
            panic!("expected import");
        };
        assert!(matches!(&ns.specifiers[0], ImportSpecifier::Namespace { local } if local == "tokens"));
        let Item::Import(side) = &m.items[2] else {
            panic!("expected import");
        };
        assert!(side.specifiers.is_empty());
    }

    #[test]
    fn parse_exports() {
        let m = parse(
            "export const a = 1;\n\
             export default function App() { return <div />; }\n\
             export { a as b, c };\n\
             export { d } from './d';\n\
             export * from './all';",
        )
        .unwrap();
        assert_eq!(m.items.len(), 5);
        assert!(matches!(&m.items[0], Item::Export(ExportDecl::Decl(Stmt::Var(_)))));
        assert!(matches!(&m.items[1], Item::Export(ExportDecl::Default(_))));
        let Item::Export(ExportDecl::Named { specifiers, source: None }) = &m.items[2] else {
            panic!("expected named export");
        };
        assert_eq!(specifiers[0].exported, "b");
        assert!(matches!(
            &m.items[3],
            Item::Export(ExportDecl::Named { source: Some(s), .. }) if s == "./d"
        ));
        assert!(matches!(&m.items[4], Item::Export(ExportDecl::All { alias: None, .. })));
    }

    #[test]
    fn parse_comments_and_asi() {
        let m = parse("// leading\nconst a = 1 /* inline */\nconst b = 2\n").unwrap();
        assert_eq!(m.items.len(), 2);
    }

    #[test]
    fn parse_error_reports_position() {
        let err = parse("const a = 1;\nconst b = ;").unwrap_err();
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn expression_spans_cover_source() {
        let src = "const x = a.b + 1;";
        let Stmt::Var(decl) = first_stmt(src) else {
            panic!("expected var decl");
        };
        let init = decl.declarators[0].init.as_ref().unwrap();
        assert_eq!(&src[init.span.start..init.span.end], "a.b + 1");
    }
}
