//! Operator expressions.
//!
//! Precedence comes from the order of [`TIERS`]: the binary parser
//! tries each tier from loosest to tightest binding and splits the
//! window on the rightmost top-level occurrence, so `a - b - c` nests
//! left. A `-` whose left neighbour cannot end a value is a sign, not
//! a subtraction; the splitter skips it and rescans what remains.

use super::{expr_or_report, matching_close, matching_open, Ctx};
use crate::ast::Node;
use crate::error::{stream_span, NameError, SyntaxError};
use crate::stream::{StreamFault, TokenStream};
use crate::token::TokenKind;
use cstar_val::CstType;

/// Binary operator tiers, loosest binding first.
const TIERS: &[&[TokenKind]] = &[
    &[TokenKind::LOr],
    &[TokenKind::LAnd],
    &[TokenKind::Eq, TokenKind::Neq],
    &[TokenKind::Lt, TokenKind::Gt, TokenKind::Leq, TokenKind::Geq],
    &[TokenKind::And, TokenKind::Or, TokenKind::Xor],
    &[TokenKind::Shl, TokenKind::Shr, TokenKind::Lshr],
    &[TokenKind::Add, TokenKind::Sub],
    &[TokenKind::Mul, TokenKind::Div, TokenKind::Mod],
    &[TokenKind::Pow],
];

/// True when a token of this kind can end a value, which makes a `-`
/// (or any shared sign/operator) after it binary rather than unary.
fn ends_value(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Hex
            | TokenKind::Binary
            | TokenKind::Bool
            | TokenKind::Str
            | TokenKind::Char
            | TokenKind::Null
            | TokenKind::Close
            | TokenKind::IndexClose
            | TokenKind::Question
    )
}

/// Find the rightmost top-level separator from `seps` that sits in
/// binary position. Answers the split index and the bracket faults of
/// the scan that found it.
fn binary_split(tokens: &TokenStream, seps: &[TokenKind]) -> (Option<usize>, Vec<StreamFault>) {
    let mut window = tokens.clone();
    loop {
        let (m, faults) = window.rsplit_stack(seps);
        if !m.found() || m.at() == 0 {
            return (None, faults);
        }
        let at = m.at();
        if ends_value(window.kind(at as isize - 1)) {
            return (Some(at), faults);
        }
        // a sign, not an operator; look further left
        window = window.slice(0, at as isize);
    }
}

pub fn parse_binary(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    for tier in TIERS {
        let (split, faults) = binary_split(tokens, tier);
        let Some(at) = split else { continue };
        ctx.reporter.report_faults(&faults);
        let op = tokens.get(at as isize)?.clone();
        let lhs = expr_or_report(&tokens.slice(0, at as isize), &op, depth, ctx, expected);
        let rhs = expr_or_report(&tokens.skip(at as isize + 1), &op, depth, ctx, expected);
        return Some(Node::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            no_wrap: false,
            value: None,
            tokens: tokens.clone(),
        });
    }
    None
}

/// `expr as type`. Binds tighter than any binary operator because the
/// binary tiers split the window first.
pub fn parse_cast(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    let (m, faults) = tokens.rsplit_stack(&[TokenKind::As]);
    if !m.found() || m.at() == 0 {
        return None;
    }
    ctx.reporter.report_faults(&faults);
    let at = m.token()?.clone();
    let of = expr_or_report(&m.before(), &at, depth, ctx, expected);
    let ty = match super::types::parse_type(&m.after(), ctx) {
        Some(ty) => ty,
        None => {
            let found = m
                .after()
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            ctx.reporter.report_at(
                &at,
                SyntaxError::TypeExpected {
                    found,
                    span: stream_span(&m.after()),
                },
            );
            CstType::unknown()
        }
    };
    Some(Node::Cast {
        of: Box::new(of),
        ty,
        tokens: tokens.clone(),
    })
}

pub fn parse_unary(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    if tokens.size() < 2
        || !matches!(tokens.kind(0), TokenKind::Not | TokenKind::Neg | TokenKind::Sub)
    {
        return None;
    }
    let op = tokens.first()?.clone();
    let of = expr_or_report(&tokens.skip(1), &op, depth, ctx, expected);
    Some(Node::Unary {
        op,
        of: Box::new(of),
        no_wrap: false,
        value: None,
        tokens: tokens.clone(),
    })
}

fn set_no_wrap(node: &mut Node) {
    match node {
        Node::Binary { no_wrap, .. } | Node::Unary { no_wrap, .. } => *no_wrap = true,
        Node::Group { inner } => set_no_wrap(inner),
        _ => {}
    }
}

/// `nowrap (expr)`: constant folds inside may wrap without a warning.
pub fn parse_nowrap(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::NoWrap
        || tokens.kind(1) != TokenKind::Open
        || matching_close(tokens, 1) != Some(tokens.size() - 1)
    {
        return None;
    }
    let anchor = tokens.first()?.clone();
    let mut inner = expr_or_report(&tokens.slice(2, -1), &anchor, depth, ctx, expected);
    set_no_wrap(&mut inner);
    Some(inner)
}

/// `expr.len()`.
pub fn parse_length(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    let n = tokens.size() as isize;
    if n < 5
        || tokens.kind(n - 4) != TokenKind::Access
        || tokens.kind(n - 3) != TokenKind::Ident
        || tokens.get(n - 3)?.text != "len"
        || tokens.kind(n - 2) != TokenKind::Open
        || tokens.kind(n - 1) != TokenKind::Close
    {
        return None;
    }
    let anchor = tokens.get(n - 3)?.clone();
    let of = expr_or_report(&tokens.slice(0, n - 4), &anchor, depth, ctx, expected);
    Some(Node::Length {
        of: Box::new(of),
        tokens: tokens.clone(),
    })
}

/// `expr?`, unwrapping an optional.
pub fn parse_check(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    let n = tokens.size() as isize;
    if n < 2 || tokens.kind(n - 1) != TokenKind::Question {
        return None;
    }
    let anchor = tokens.last()?.clone();
    let of = expr_or_report(&tokens.slice(0, n - 1), &anchor, depth, ctx, expected);
    Some(Node::Check {
        of: Box::new(of),
        tokens: tokens.clone(),
    })
}

/// `expr[index]`. The index is checked against `usize` here; the
/// consumers downstream never look at it again.
pub fn parse_index(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    let n = tokens.size();
    if n < 3 || tokens.kind(n as isize - 1) != TokenKind::IndexClose {
        return None;
    }
    let open = matching_open(tokens, n - 1)?;
    if open == 0 || tokens.kind(open as isize) != TokenKind::IndexOpen {
        return None;
    }
    let anchor = tokens.get(open as isize)?.clone();
    let of = expr_or_report(&tokens.slice(0, open as isize), &anchor, depth, ctx, expected);
    let mut index = expr_or_report(
        &tokens.slice(open as isize + 1, n as isize - 1),
        &anchor,
        depth,
        ctx,
        &CstType::new("usize"),
    );
    index.consume(&CstType::new("usize"), &mut ctx.reporter);
    Some(Node::Index {
        of: Box::new(of),
        index: Box::new(index),
        tokens: tokens.clone(),
    })
}

/// A fully parenthesized expression.
pub fn parse_group(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::Open
        || matching_close(tokens, 0) != Some(tokens.size() - 1)
    {
        return None;
    }
    let anchor = tokens.first()?.clone();
    let inner = tokens.slice(1, -1);
    if inner.is_empty() {
        ctx.reporter.report_at(
            &anchor,
            SyntaxError::ExpressionExpected {
                hint: "The parentheses hold nothing".into(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    let inner = expr_or_report(&inner, &anchor, depth, ctx, expected);
    Some(Node::Group { inner: Box::new(inner) })
}

/// `recv.name(...)`: methods beyond `len` do not exist yet, so a call
/// through `.` is reported as such instead of falling through to the
/// generic "expression expected".
pub fn parse_method_probe(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    let n = tokens.size();
    if n < 4 || tokens.kind(n as isize - 1) != TokenKind::Close {
        return None;
    }
    let (m, _) = tokens.rsplit_stack(&[TokenKind::Access]);
    if !m.found() || m.at() == 0 {
        return None;
    }
    let at = m.at();
    if tokens.kind(at as isize + 1) != TokenKind::Ident
        || tokens.kind(at as isize + 2) != TokenKind::Open
        || matching_close(tokens, at + 2) != Some(n - 1)
    {
        return None;
    }
    let name = tokens.get(at as isize + 1)?.clone();
    let recv = expr_or_report(&m.before(), &name, depth, ctx, expected);
    ctx.reporter.report_at(
        &name,
        NameError::UnknownMethod {
            name: name.text.to_string(),
            ty: recv.type_of().to_string(),
            span: stream_span(tokens),
        },
    );
    Some(Node::Empty)
}
