//! The syntax tree and its node protocol.
//!
//! Parsing, type adoption, linearity tracking and output generation all
//! meet in [`Node`]. A node answers four questions:
//!
//! - [`Node::type_of`] names the type its value would have,
//! - [`Node::consume`] marks the value as used, adopting the expected
//!   type where literals are flexible and folding constants on the way,
//! - [`Node::provide`] marks the target as written, for the left side
//!   of an assignment,
//! - [`Node::emit_cst`] prints the canonical source form back out.
//!
//! Errors never abort a walk. A failed parse leaves a [`Node::Empty`]
//! poison node behind, which types as `@unknown`, consumes silently and
//! emits nothing, so one reported error does not echo through every
//! enclosing expression.

use crate::error::{stream_span, LinearError, TypeError, Warning};
use crate::ops;
use crate::report::Reporter;
use crate::scope::{FnSig, Symbol, VarRef};
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use crate::util;
use cstar_val::{CstStr, CstType, Status, Value, UINT_TYPES};

#[derive(Debug, Clone)]
pub enum Node {
    /// Poison: stands in for an expression that already reported an error.
    Empty,

    Int {
        value: i64,
        ty: CstType,
        tokens: TokenStream,
    },
    Float {
        value: f64,
        /// Normalized decimal form, e.g. `0.5` for `.5`.
        text: CstStr,
        ty: CstType,
        tokens: TokenStream,
    },
    Bool {
        value: bool,
        tokens: TokenStream,
    },
    Char {
        /// Quoted form as written, e.g. `'\n'`.
        text: CstStr,
        tokens: TokenStream,
    },
    Str {
        /// Quoted form as written.
        text: CstStr,
        tokens: TokenStream,
    },
    Null {
        ty: CstType,
        tokens: TokenStream,
    },
    /// `[]`, an array literal with no elements and no element type yet.
    EmptyArray {
        ty: CstType,
        tokens: TokenStream,
    },
    Array {
        elems: Vec<Node>,
        ty: CstType,
        /// Total element count when every element is constant.
        const_len: Option<usize>,
        tokens: TokenStream,
    },
    /// `value x amount` inside an array literal.
    Repeat {
        elem: Box<Node>,
        count: Box<Node>,
        tokens: TokenStream,
    },

    /// A (possibly qualified) name resolved to a symbol.
    Access {
        name: CstStr,
        target: Symbol,
        tokens: TokenStream,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
        tokens: TokenStream,
    },
    Index {
        of: Box<Node>,
        index: Box<Node>,
        tokens: TokenStream,
    },
    Binary {
        op: Token,
        lhs: Box<Node>,
        rhs: Box<Node>,
        /// Set by `nowrap (...)`: a wrapped constant fold stays silent.
        no_wrap: bool,
        value: Option<Value>,
        tokens: TokenStream,
    },
    Unary {
        op: Token,
        of: Box<Node>,
        no_wrap: bool,
        value: Option<Value>,
        tokens: TokenStream,
    },
    Cast {
        of: Box<Node>,
        ty: CstType,
        tokens: TokenStream,
    },
    /// `expr?`, unwrapping an optional.
    Check {
        of: Box<Node>,
        tokens: TokenStream,
    },
    /// `expr.len()`.
    Length {
        of: Box<Node>,
        tokens: TokenStream,
    },
    Call {
        name: CstStr,
        /// Arguments in call order; named arguments carry their name.
        args: Vec<(Option<CstStr>, Node)>,
        sig: FnSig,
        /// Token of the matched declaration, for cross-references.
        decl: Token,
        tokens: TokenStream,
    },
    /// A parenthesized expression.
    Group {
        inner: Box<Node>,
    },

    Decl {
        var: VarRef,
        tokens: TokenStream,
    },
    Init {
        var: VarRef,
        value: Box<Node>,
        tokens: TokenStream,
    },
    Delete {
        vars: Vec<Node>,
        tokens: TokenStream,
    },
    If {
        cond: Box<Node>,
        body: Box<Node>,
        tokens: TokenStream,
    },
    Return {
        value: Option<Box<Node>>,
        tokens: TokenStream,
    },
    Block {
        nodes: Vec<Node>,
        has_returned: bool,
    },
    Namespace {
        name: CstStr,
        body: Box<Node>,
        tokens: TokenStream,
    },
    Func {
        name: CstStr,
        /// Positional parameters in declaration order.
        params: Vec<(CstStr, CstType)>,
        sig: FnSig,
        body: Box<Node>,
        tokens: TokenStream,
    },
}

impl Node {
    /// The type this node's value would have right now. Literal nodes
    /// report their current guess; [`Node::consume`] may still adopt a
    /// different width afterwards.
    pub fn type_of(&self) -> CstType {
        match self {
            Node::Empty => CstType::unknown(),
            Node::Int { ty, .. } => ty.clone(),
            Node::Float { ty, .. } => ty.clone(),
            Node::Bool { .. } => CstType::new("bool"),
            Node::Char { .. } => CstType::new("char"),
            Node::Str { .. } => CstType::new("string"),
            Node::Null { ty, .. } => ty.clone(),
            Node::EmptyArray { ty, .. } => ty.clone(),
            Node::Array { ty, .. } => ty.clone(),
            Node::Repeat { elem, .. } => elem.type_of(),
            Node::Access { target, .. } => match target {
                Symbol::Var(v) => v.borrow().ty.clone(),
                Symbol::Scope(_) => CstType::unknown(),
            },
            Node::Assign { value, .. } => value.type_of(),
            Node::Index { of, .. } => of.type_of().element().unwrap_or_else(CstType::unknown),
            Node::Binary { op, lhs, rhs, .. } => {
                ops::has_op(&lhs.type_of(), &rhs.type_of(), op.kind)
                    .unwrap_or_else(CstType::unknown)
            }
            Node::Unary { op, of, .. } => {
                let ty = of.type_of();
                ops::has_op(&ty, &ty, op.kind).unwrap_or_else(CstType::unknown)
            }
            Node::Cast { ty, .. } => ty.clone(),
            Node::Check { of, .. } => of.type_of().some().unwrap_or_else(CstType::unknown),
            Node::Length { .. } => CstType::new("usize"),
            Node::Call { sig, .. } => sig.ret.clone(),
            Node::Group { inner } => inner.type_of(),
            _ => CstType::void(),
        }
    }

    /// Mark this value as used, expecting `expected`. Flexible literals
    /// adopt the expected type, fixed ones report a mismatch, variables
    /// step their linearity state, and constant subtrees fold.
    ///
    /// `@unknown` expectations are satisfied by anything.
    pub fn consume(&mut self, expected: &CstType, reporter: &mut Reporter) {
        match self {
            Node::Empty => {}

            Node::Int { value, ty, tokens } => {
                if ops::is_int_name(expected.as_str()) {
                    if *value < 0 && UINT_TYPES.contains(&expected.as_str()) {
                        report(
                            reporter,
                            tokens,
                            TypeError::SignMismatch {
                                expected: expected.to_string(),
                                found: "a signed value".into(),
                                span: stream_span(tokens),
                            },
                        );
                    } else {
                        *ty = expected.clone();
                    }
                } else if !expected.is_unknown() {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: ty.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Float { ty, tokens, .. } => {
                if ops::is_float_name(expected.as_str()) {
                    *ty = expected.clone();
                } else if !expected.is_unknown() {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: ty.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Bool { tokens, .. } => {
                if *expected != CstType::new("bool") {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: "bool".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Char { tokens, .. } => {
                if *expected != CstType::new("char") {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: "char".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Str { tokens, .. } => {
                if *expected != CstType::new("string") && *expected != CstType::new("char[]") {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: "string".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Null { ty, tokens } => {
                if expected.is_optional() {
                    *ty = expected.clone();
                } else if !expected.is_unknown() {
                    report(
                        reporter,
                        tokens,
                        TypeError::UnknownOperator {
                            op: "null".into(),
                            lhs: expected.to_string(),
                            rhs: "null".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::EmptyArray { ty, tokens } => {
                if expected.is_array() {
                    *ty = expected.clone();
                } else if !expected.is_unknown() {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: "an empty array".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Array { elems, ty, tokens, .. } => {
                if !expected.is_array() {
                    if expected.is_unknown() {
                        for elem in elems.iter_mut() {
                            elem.consume(&CstType::unknown(), reporter);
                        }
                    } else {
                        report(
                            reporter,
                            tokens,
                            TypeError::Mismatch {
                                expected: expected.to_string(),
                                found: "an array".into(),
                                span: stream_span(tokens),
                            },
                        );
                    }
                    return;
                }
                let elem_ty = expected.element().unwrap_or_else(CstType::unknown);
                for elem in elems.iter_mut() {
                    elem.consume(&elem_ty, reporter);
                }
                *ty = expected.clone();
            }

            Node::Repeat { elem, .. } => {
                // the amount was checked against usize at the parse
                elem.consume(expected, reporter);
            }

            Node::Access { name, target, tokens } => match target {
                Symbol::Var(var) => {
                    let (vty, prev_last, decl) = {
                        let v = var.borrow();
                        (v.ty.clone(), v.last.clone(), v.decl.clone())
                    };
                    if vty != *expected {
                        report(
                            reporter,
                            tokens,
                            TypeError::Mismatch {
                                expected: expected.to_string(),
                                found: format!("a variable of type {vty}"),
                                span: stream_span(tokens),
                            },
                        );
                    }
                    let Some(at) = tokens.first().cloned() else {
                        return;
                    };
                    if let Err(fault) = var.borrow_mut().consume(&at) {
                        use cstar_val::LinearFault::*;
                        match fault {
                            UseBeforeInit => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::UseBeforeInit {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                                reporter.note(&decl, "declared here");
                            }
                            ConsumedAgain => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::ConsumedAgain {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                                reporter.note(&prev_last, "last consumed here");
                            }
                            Unsupported => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::BorrowUnsupported {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                            }
                            _ => {}
                        }
                    }
                }
                Symbol::Scope(_) => {
                    if !expected.is_unknown() {
                        report(
                            reporter,
                            tokens,
                            TypeError::Mismatch {
                                expected: expected.to_string(),
                                found: "a namespace".into(),
                                span: stream_span(tokens),
                            },
                        );
                    }
                }
            },

            Node::Assign { value, tokens, .. } => {
                let vty = value.type_of();
                if vty != *expected {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: vty.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Index { of, .. } => {
                // indexing reads one element, not the array's value;
                // the array stays readable afterwards
                of.consume(&expected.array_of(), reporter);
                force_provided(of);
            }

            Node::Binary { op, lhs, rhs, no_wrap, value, tokens } => {
                let lty = lhs.type_of();
                let push_down = (ops::is_int_name(lty.as_str())
                    && ops::is_int_name(expected.as_str()))
                    || (ops::is_float_name(lty.as_str())
                        && ops::is_float_name(expected.as_str()));
                if push_down {
                    lhs.consume(expected, reporter);
                    rhs.consume(expected, reporter);
                } else {
                    let lt = lhs.type_of();
                    lhs.consume(&lt, reporter);
                    let rt = rhs.type_of();
                    rhs.consume(&rt, reporter);
                }

                let lty = lhs.type_of();
                let rty = rhs.type_of();
                match ops::has_op(&lty, &rty, op.kind) {
                    None => {
                        report(
                            reporter,
                            tokens,
                            TypeError::UnknownOperator {
                                op: op.text.to_string(),
                                lhs: lty.to_string(),
                                rhs: rty.to_string(),
                                span: stream_span(tokens),
                            },
                        );
                    }
                    Some(ret) => {
                        if ret != *expected {
                            report(
                                reporter,
                                tokens,
                                TypeError::Mismatch {
                                    expected: expected.to_string(),
                                    found: ret.to_string(),
                                    span: stream_span(tokens),
                                },
                            );
                        } else if crate::folding() && !ret.is_unknown() {
                            if let (Some(lv), Some(rv)) = (lhs.const_value(), rhs.const_value()) {
                                if let Some((v, wrapped)) =
                                    ops::fold_binary(op.kind, &lv, &rv, &ret)
                                {
                                    if wrapped && !*no_wrap {
                                        report(
                                            reporter,
                                            tokens,
                                            Warning::ConstantWrapped {
                                                ty: ret.to_string(),
                                                span: stream_span(tokens),
                                            },
                                        );
                                    }
                                    *value = Some(v);
                                }
                            }
                        }
                    }
                }
            }

            Node::Unary { op, of, no_wrap, value, tokens } => {
                let oty = of.type_of();
                of.consume(&oty, reporter);
                let oty = of.type_of();
                match ops::has_op(&oty, &oty, op.kind) {
                    None => {
                        report(
                            reporter,
                            tokens,
                            TypeError::UnknownOperator {
                                op: op.text.to_string(),
                                lhs: oty.to_string(),
                                rhs: oty.to_string(),
                                span: stream_span(tokens),
                            },
                        );
                    }
                    Some(ret) => {
                        if ret != *expected {
                            report(
                                reporter,
                                tokens,
                                TypeError::Mismatch {
                                    expected: expected.to_string(),
                                    found: ret.to_string(),
                                    span: stream_span(tokens),
                                },
                            );
                        } else if crate::folding() && !ret.is_unknown() {
                            if let Some(ov) = of.const_value() {
                                if let Some((v, wrapped)) = ops::fold_unary(op.kind, &ov, &ret) {
                                    if wrapped && !*no_wrap {
                                        report(
                                            reporter,
                                            tokens,
                                            Warning::ConstantWrapped {
                                                ty: ret.to_string(),
                                                span: stream_span(tokens),
                                            },
                                        );
                                    }
                                    *value = Some(v);
                                }
                            }
                        }
                    }
                }
            }

            Node::Cast { of, ty, tokens } => {
                let from_ty = of.type_of();
                if ops::has_op(&from_ty, ty, TokenKind::As).is_none() {
                    report(
                        reporter,
                        tokens,
                        TypeError::UnknownOperator {
                            op: "as".into(),
                            lhs: from_ty.to_string(),
                            rhs: ty.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                }
                let from_ty = of.type_of();
                of.consume(&from_ty, reporter);
                if *ty != *expected {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: ty.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Check { of, tokens } => {
                let oty = of.type_of();
                if oty.is_unknown() {
                    return;
                }
                of.consume(&oty, reporter);
                match oty.some() {
                    Some(stripped) => {
                        if stripped != *expected {
                            report(
                                reporter,
                                tokens,
                                TypeError::Mismatch {
                                    expected: expected.to_string(),
                                    found: stripped.to_string(),
                                    span: stream_span(tokens),
                                },
                            );
                        }
                    }
                    None => {
                        report(
                            reporter,
                            tokens,
                            TypeError::Mismatch {
                                expected: oty.optional_of().to_string(),
                                found: oty.to_string(),
                                span: stream_span(tokens),
                            },
                        );
                    }
                }
            }

            Node::Length { of, tokens } => {
                of.consume(&CstType::unknown().array_of(), reporter);
                if *expected != CstType::new("usize") {
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: "usize".into(),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Call { sig, tokens, .. } => {
                // arguments were consumed against the matched signature
                // at the parse
                if sig.ret != *expected {
                    let what = if sig.is_method { "method" } else { "function" };
                    report(
                        reporter,
                        tokens,
                        TypeError::Mismatch {
                            expected: expected.to_string(),
                            found: format!("a {what} returning {}", sig.ret),
                            span: stream_span(tokens),
                        },
                    );
                }
            }

            Node::Group { inner } => inner.consume(expected, reporter),

            // statements have no value to consume
            _ => {}
        }
    }

    /// Mark this node as the target of an assignment and return the type
    /// the written value must have. Only variables, indexed elements and
    /// lvalue calls can stand on the left of a `=`.
    pub fn provide(&mut self, reporter: &mut Reporter) -> CstType {
        match self {
            Node::Empty => CstType::unknown(),

            Node::Access { name, target, tokens } => match target {
                Symbol::Var(var) => {
                    let (vty, prev_last, decl, free) = {
                        let v = var.borrow();
                        (v.ty.clone(), v.last.clone(), v.decl.clone(), v.perms.is_free)
                    };
                    let Some(at) = tokens.first().cloned() else {
                        return vty;
                    };
                    if let Err(fault) = var.borrow_mut().provide(&at) {
                        use cstar_val::LinearFault::*;
                        match fault {
                            SetConstant => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::SetConstant {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                                reporter.note(&decl, "defined here");
                            }
                            SetImmutable => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::SetImmutable {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                                reporter.note(&decl, "defined here");
                            }
                            NeverConsumed { .. } => {
                                if free {
                                    report(
                                        reporter,
                                        tokens,
                                        Warning::NeverConsumed {
                                            name: name.to_string(),
                                            hint: String::new(),
                                            span: stream_span(tokens),
                                        },
                                    );
                                } else {
                                    report(
                                        reporter,
                                        tokens,
                                        LinearError::NeverConsumed {
                                            name: name.to_string(),
                                            hint: String::new(),
                                            span: stream_span(tokens),
                                        },
                                    );
                                }
                                reporter.note(&prev_last, "last provided here");
                            }
                            Unsupported => {
                                report(
                                    reporter,
                                    tokens,
                                    LinearError::BorrowUnsupported {
                                        name: name.to_string(),
                                        span: stream_span(tokens),
                                    },
                                );
                            }
                            _ => {}
                        }
                    }
                    vty
                }
                Symbol::Scope(_) => {
                    report(
                        reporter,
                        tokens,
                        TypeError::Unassignable { span: stream_span(tokens) },
                    );
                    CstType::unknown()
                }
            },

            Node::Index { of, .. } => {
                // writing one element re-provides nothing and consumes
                // nothing of the array itself
                of.consume(&CstType::unknown().array_of(), reporter);
                force_provided(of);
                of.type_of().element().unwrap_or_else(CstType::unknown)
            }

            Node::Check { of, tokens } => {
                let oty = of.type_of();
                of.consume(&oty, reporter);
                match oty.some() {
                    Some(stripped) => stripped,
                    None => {
                        if !oty.is_unknown() {
                            report(
                                reporter,
                                tokens,
                                TypeError::Unassignable { span: stream_span(tokens) },
                            );
                        }
                        CstType::unknown()
                    }
                }
            }

            Node::Call { sig, decl, tokens, .. } => {
                if sig.is_lvalue {
                    sig.ret.clone()
                } else {
                    report(
                        reporter,
                        tokens,
                        TypeError::Unassignable { span: stream_span(tokens) },
                    );
                    reporter.note(decl, "mark this function as lvalue to allow assignments");
                    CstType::unknown()
                }
            }

            Node::Group { inner } => inner.provide(reporter),

            node => {
                if let Some(tokens) = node.window() {
                    report(
                        reporter,
                        tokens,
                        TypeError::Unassignable { span: stream_span(tokens) },
                    );
                }
                CstType::unknown()
            }
        }
    }

    /// The canonical source form. Parsing the emitted text again yields
    /// the same tree.
    pub fn emit_cst(&self) -> String {
        match self {
            Node::Empty => String::new(),
            Node::Int { value, .. } => value.to_string(),
            Node::Float { text, .. } => text.to_string(),
            Node::Bool { value, .. } => if *value { "true" } else { "false" }.to_string(),
            Node::Char { text, .. } => text.to_string(),
            Node::Str { text, .. } => text.to_string(),
            Node::Null { .. } => "null".to_string(),
            Node::EmptyArray { .. } => "[]".to_string(),
            Node::Array { elems, .. } => {
                let parts: Vec<String> = elems.iter().map(Node::emit_cst).collect();
                format!("[{}]", parts.join(", "))
            }
            Node::Repeat { elem, count, .. } => {
                format!("{} x {}", elem.emit_cst(), count.emit_cst())
            }
            Node::Access { name, .. } => name.to_string(),
            Node::Assign { target, value, .. } => {
                format!("{} = {}", target.emit_cst(), value.emit_cst())
            }
            Node::Index { of, index, .. } => {
                format!("{}[{}]", of.emit_cst(), index.emit_cst())
            }
            Node::Binary { op, lhs, rhs, no_wrap, .. } => {
                let text = format!("{} {} {}", lhs.emit_cst(), op.text, rhs.emit_cst());
                if *no_wrap {
                    format!("nowrap ({text})")
                } else {
                    text
                }
            }
            Node::Unary { op, of, no_wrap, .. } => {
                let gap = if op.text.chars().all(char::is_alphabetic) {
                    " "
                } else {
                    ""
                };
                let text = format!("{}{}{}", op.text, gap, of.emit_cst());
                if *no_wrap {
                    format!("nowrap ({text})")
                } else {
                    text
                }
            }
            Node::Cast { of, ty, .. } => format!("{} as {}", of.emit_cst(), ty),
            Node::Check { of, .. } => format!("{}?", of.emit_cst()),
            Node::Length { of, .. } => format!("{}.len()", of.emit_cst()),
            Node::Call { name, args, .. } => {
                let parts: Vec<String> = args
                    .iter()
                    .map(|(argname, value)| match argname {
                        Some(n) => format!("{} = {}", n, value.emit_cst()),
                        None => value.emit_cst(),
                    })
                    .collect();
                format!("{}({})", name, parts.join(", "))
            }
            Node::Group { inner } => format!("({})", inner.emit_cst()),
            Node::Decl { var, .. } => {
                let v = var.borrow();
                format!("{}{} {};", mods_prefix(&v.perms), v.ty, v.name)
            }
            Node::Init { var, value, .. } => {
                let v = var.borrow();
                format!(
                    "{}{} {} = {};",
                    mods_prefix(&v.perms),
                    v.ty,
                    v.name,
                    value.emit_cst()
                )
            }
            Node::Delete { vars, .. } => {
                let parts: Vec<String> = vars.iter().map(Node::emit_cst).collect();
                format!("delete {};", parts.join(", "))
            }
            Node::If { cond, body, .. } => {
                format!(
                    "if {} {{\n{}\n}}",
                    cond.emit_cst(),
                    util::indent(&body.emit_cst())
                )
            }
            Node::Return { value: Some(value), .. } => format!("return {};", value.emit_cst()),
            Node::Return { value: None, .. } => "return;".to_string(),
            Node::Block { nodes, .. } => {
                let parts: Vec<String> = nodes.iter().map(stmt_line).collect();
                parts.join("\n")
            }
            Node::Namespace { name, body, .. } => {
                format!(
                    "namespace {} {{\n{}\n}}",
                    name,
                    util::indent(&body.emit_cst())
                )
            }
            Node::Func { name, params, sig, body, .. } => {
                let mut parts: Vec<String> = params
                    .iter()
                    .map(|(pname, ty)| format!("{ty} {pname}"))
                    .collect();
                for (pname, ty, default) in &sig.named_params {
                    parts.push(format!("{} {} = {}", ty, pname, default.emit_cst()));
                }
                format!(
                    "{} {}({}) {{\n{}\n}}",
                    sig.ret,
                    name,
                    parts.join(", "),
                    util::indent(&body.emit_cst())
                )
            }
        }
    }

    /// Whether the node's value is known at compile time.
    pub fn is_const(&self) -> bool {
        match self {
            Node::Int { .. }
            | Node::Float { .. }
            | Node::Bool { .. }
            | Node::Char { .. }
            | Node::Str { .. }
            | Node::Null { .. }
            | Node::EmptyArray { .. } => true,
            Node::Array { elems, .. } => elems.iter().all(Node::is_const),
            Node::Repeat { elem, count, .. } => elem.is_const() && count.is_const(),
            Node::Access { target: Symbol::Var(v), .. } => v.borrow().perms.is_const,
            Node::Binary { value, .. } | Node::Unary { value, .. } => value.is_some(),
            Node::Group { inner } => inner.is_const(),
            Node::Length { .. } => self.const_value().is_some(),
            _ => false,
        }
    }

    /// The compile-time value, where one exists.
    pub fn const_value(&self) -> Option<Value> {
        match self {
            Node::Int { value, .. } => Some(Value::Int(*value)),
            Node::Float { value, .. } => Some(Value::Float(*value)),
            Node::Bool { value, .. } => Some(Value::Bool(*value)),
            Node::Char { text, .. } => char_value(text).map(Value::Char),
            Node::Str { text, .. } => Some(Value::Str(unquote(text))),
            Node::Null { .. } => Some(Value::Nil),
            Node::Access { target: Symbol::Var(v), .. } => v.borrow().const_value.clone(),
            Node::Binary { value, .. } | Node::Unary { value, .. } => value.clone(),
            Node::Group { inner } => inner.const_value(),
            Node::Length { of, .. } => match &**of {
                Node::EmptyArray { .. } => Some(Value::Int(0)),
                Node::Array { const_len: Some(n), .. } => Some(Value::Int(*n as i64)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Expression nodes yield a value; their statement forms fall under
    /// the discarded-result checks of the surrounding block.
    pub fn is_expression(&self) -> bool {
        match self {
            Node::Assign { .. }
            | Node::Index { .. }
            | Node::Binary { .. }
            | Node::Unary { .. }
            | Node::Cast { .. }
            | Node::Check { .. }
            | Node::Length { .. }
            | Node::Call { .. } => true,
            Node::Group { inner } => inner.is_expression(),
            _ => false,
        }
    }

    /// The token window this node was parsed from.
    pub fn window(&self) -> Option<&TokenStream> {
        match self {
            Node::Int { tokens, .. }
            | Node::Float { tokens, .. }
            | Node::Bool { tokens, .. }
            | Node::Char { tokens, .. }
            | Node::Str { tokens, .. }
            | Node::Null { tokens, .. }
            | Node::EmptyArray { tokens, .. }
            | Node::Array { tokens, .. }
            | Node::Repeat { tokens, .. }
            | Node::Access { tokens, .. }
            | Node::Assign { tokens, .. }
            | Node::Index { tokens, .. }
            | Node::Binary { tokens, .. }
            | Node::Unary { tokens, .. }
            | Node::Cast { tokens, .. }
            | Node::Check { tokens, .. }
            | Node::Length { tokens, .. }
            | Node::Call { tokens, .. }
            | Node::Decl { tokens, .. }
            | Node::Init { tokens, .. }
            | Node::Delete { tokens, .. }
            | Node::If { tokens, .. }
            | Node::Return { tokens, .. }
            | Node::Namespace { tokens, .. }
            | Node::Func { tokens, .. } => Some(tokens),
            Node::Group { inner } => inner.window(),
            Node::Empty | Node::Block { .. } => None,
        }
    }
}

/// Report `err` against the window's file, with include-chain notes.
fn report(reporter: &mut Reporter, tokens: &TokenStream, err: impl Into<crate::error::CstError>) {
    match tokens.first() {
        Some(at) => reporter.report_at(at, err),
        None => {}
    }
}

/// Modifier keywords of a declaration, each with a trailing space.
fn mods_prefix(perms: &cstar_val::Perms) -> String {
    let mut prefix = String::new();
    if perms.is_static {
        prefix.push_str("static ");
    }
    if perms.is_const {
        prefix.push_str("const ");
    }
    if perms.is_mut {
        prefix.push_str("mut ");
    }
    prefix
}

/// One statement line of a block. Expression statements and bare
/// variable reads carry their terminating semicolon here.
fn stmt_line(node: &Node) -> String {
    let text = node.emit_cst();
    if node.is_expression() || matches!(node, Node::Access { .. }) {
        text + ";"
    } else {
        text
    }
}

/// Indexing reads elements without consuming the array value itself, so
/// the underlying variable is pinned to the provided state around it.
fn force_provided(node: &mut Node) {
    match node {
        Node::Access { target: Symbol::Var(v), .. } => {
            v.borrow_mut().status = Status::Provided;
        }
        Node::Group { inner } => force_provided(inner),
        Node::Index { of, .. } => force_provided(of),
        _ => {}
    }
}

/// Decode a quoted char literal, including `\n`-style escapes and
/// `\uXXXX` forms.
fn char_value(text: &str) -> Option<char> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if first != '\\' {
        return match chars.next() {
            None => Some(first),
            Some(_) => None,
        };
    }
    match chars.next()? {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'a' => Some('\x07'),
        'f' => Some('\x0c'),
        'v' => Some('\x0b'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        'u' => {
            let code = u32::from_str_radix(chars.as_str(), 16).ok()?;
            char::from_u32(code)
        }
        _ => None,
    }
}

fn unquote(text: &str) -> CstStr {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    CstStr::from(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Pos;
    use std::rc::Rc;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, Pos::new(1, 1, 0, text.len()), text, Rc::new(CstStr::from("test.cst")))
    }

    fn window(kinds: &[(TokenKind, &str)]) -> TokenStream {
        let mut builder = crate::stream::TokenBuffer::new();
        for (kind, text) in kinds {
            builder.push(tok(*kind, text));
        }
        builder.freeze()
    }

    #[test]
    fn test_int_adoption() {
        let tokens = window(&[(TokenKind::Int, "5")]);
        let mut node = Node::Int { value: 5, ty: CstType::new("uint32"), tokens };
        let mut reporter = Reporter::silent();
        node.consume(&CstType::new("int64"), &mut reporter);
        assert_eq!(node.type_of().as_str(), "int64");
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn test_negative_int_rejects_unsigned() {
        let tokens = window(&[(TokenKind::Sub, "-"), (TokenKind::Int, "5")]);
        let mut node = Node::Int { value: -5, ty: CstType::new("int32"), tokens };
        let mut reporter = Reporter::silent();
        node.consume(&CstType::new("uint8"), &mut reporter);
        assert_eq!(reporter.error_count(), 1);
        assert!(reporter.codes().iter().any(|c| c.contains("E0102")));
    }

    #[test]
    fn test_emit_shapes() {
        let five = Node::Int {
            value: 5,
            ty: CstType::new("uint32"),
            tokens: window(&[(TokenKind::Int, "5")]),
        };
        let neg = Node::Unary {
            op: tok(TokenKind::Neg, "~"),
            of: Box::new(five.clone()),
            no_wrap: false,
            value: None,
            tokens: window(&[(TokenKind::Neg, "~"), (TokenKind::Int, "5")]),
        };
        assert_eq!(neg.emit_cst(), "~5");

        let not = Node::Unary {
            op: tok(TokenKind::Not, "not"),
            of: Box::new(Node::Bool {
                value: true,
                tokens: window(&[(TokenKind::Bool, "true")]),
            }),
            no_wrap: false,
            value: None,
            tokens: window(&[(TokenKind::Not, "not"), (TokenKind::Bool, "true")]),
        };
        assert_eq!(not.emit_cst(), "not true");

        let sum = Node::Binary {
            op: tok(TokenKind::Add, "+"),
            lhs: Box::new(five.clone()),
            rhs: Box::new(five),
            no_wrap: false,
            value: None,
            tokens: window(&[
                (TokenKind::Int, "5"),
                (TokenKind::Add, "+"),
                (TokenKind::Int, "5"),
            ]),
        };
        assert_eq!(sum.emit_cst(), "5 + 5");
    }

    #[test]
    fn test_binary_fold() {
        let tokens = window(&[
            (TokenKind::Int, "2"),
            (TokenKind::Add, "+"),
            (TokenKind::Int, "3"),
        ]);
        let mut node = Node::Binary {
            op: tok(TokenKind::Add, "+"),
            lhs: Box::new(Node::Int {
                value: 2,
                ty: CstType::new("uint32"),
                tokens: tokens.slice(0, 1),
            }),
            rhs: Box::new(Node::Int {
                value: 3,
                ty: CstType::new("uint32"),
                tokens: tokens.slice(2, 3),
            }),
            no_wrap: false,
            value: None,
            tokens,
        };
        let mut reporter = Reporter::silent();
        node.consume(&CstType::new("int32"), &mut reporter);
        assert_eq!(reporter.error_count(), 0);
        assert!(node.is_const());
        assert_eq!(node.const_value(), Some(Value::Int(5)));
    }

    #[test]
    fn test_mixed_width_reports_unknown_operator() {
        let tokens = window(&[
            (TokenKind::Int, "1"),
            (TokenKind::Add, "+"),
            (TokenKind::Bool, "true"),
        ]);
        let mut node = Node::Binary {
            op: tok(TokenKind::Add, "+"),
            lhs: Box::new(Node::Int {
                value: 1,
                ty: CstType::new("uint32"),
                tokens: tokens.slice(0, 1),
            }),
            rhs: Box::new(Node::Bool { value: true, tokens: tokens.slice(2, 3) }),
            no_wrap: false,
            value: None,
            tokens,
        };
        let mut reporter = Reporter::silent();
        node.consume(&CstType::unknown(), &mut reporter);
        assert_eq!(reporter.error_count(), 1);
        assert!(reporter.codes().iter().any(|c| c.contains("E0104")));
    }

    #[test]
    fn test_char_values() {
        assert_eq!(char_value("'a'"), Some('a'));
        assert_eq!(char_value("'\\n'"), Some('\n'));
        assert_eq!(char_value("'\\u0041'"), Some('A'));
        assert_eq!(char_value("'ab'"), None);
    }
}
