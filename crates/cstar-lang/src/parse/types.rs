//! Type windows: `int32`, `&buffer`, `vec[]`, `string?`, and the sized
//! array form `[int32 x 4]`.

use super::Ctx;
use crate::error::{stream_span, SyntaxError};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use cstar_val::{CstType, ATOMIC_TYPES};

/// True when `name` can stand in type position: a builtin, or a name
/// the table resolves to a scope (a namespace, struct or enum).
pub fn is_type_name(name: &str, ctx: &Ctx) -> bool {
    if ATOMIC_TYPES.contains(&name) || matches!(name, "string" | "void") {
        return true;
    }
    ctx.table
        .lookup(name)
        .iter()
        .any(|s| s.as_scope().is_some())
}

/// Read a whole window as a type. Answers `None` when the window does
/// not look like a type at all; a window that is recognizably a sized
/// array but broken inside reports and yields a poisoned element type.
pub fn parse_type(tokens: &TokenStream, ctx: &mut Ctx) -> Option<CstType> {
    if tokens.kind(0) == TokenKind::IndexOpen {
        return parse_sized_array(tokens, ctx);
    }

    let (base, mut used) = match (tokens.kind(0), tokens.kind(1)) {
        (TokenKind::And, TokenKind::Ident) => {
            (CstType::new(format!("&{}", tokens.get(1)?.text)), 2)
        }
        (TokenKind::Ident, _) => {
            let name = tokens.first()?.text.as_str();
            if !is_type_name(name, ctx) {
                return None;
            }
            (CstType::new(name), 1)
        }
        _ => return None,
    };

    let mut ty = base;
    while used < tokens.size() {
        match (tokens.kind(used as isize), tokens.kind(used as isize + 1)) {
            (TokenKind::IndexOpen, TokenKind::IndexClose) => {
                ty = ty.array_of();
                used += 2;
            }
            (TokenKind::Question, _) => {
                ty = ty.optional_of();
                used += 1;
            }
            _ => return None,
        }
    }
    Some(ty)
}

/// `[elem x amount]`. Reports on the pieces so callers only see the
/// resulting array type.
fn parse_sized_array(tokens: &TokenStream, ctx: &mut Ctx) -> Option<CstType> {
    if super::matching_close(tokens, 0) != Some(tokens.size() - 1) {
        return None;
    }
    let inner = tokens.slice(1, -1);
    let (m, faults) = inner.split_stack(&[TokenKind::X], 0);
    if !m.found() {
        return None;
    }
    ctx.reporter.report_faults(&faults);

    let elem = match parse_type(&m.before(), ctx) {
        Some(elem) => elem,
        None => {
            super::report_first(
                ctx,
                tokens,
                SyntaxError::ArrayTypeMissing { span: stream_span(tokens) },
            );
            CstType::unknown()
        }
    };

    let amount = m.after();
    let is_count = amount.size() == 1 && amount.kind(0) == TokenKind::Int;
    if !is_count {
        // a resolvable constant also counts
        let const_ok = super::qualified_name(&amount, 0)
            .filter(|(_, used)| *used == amount.size())
            .map(|(name, _)| {
                ctx.table
                    .lookup(name.as_str())
                    .iter()
                    .any(|s| s.as_var().map(|v| v.borrow().const_value.is_some()).unwrap_or(false))
            })
            .unwrap_or(false);
        if !const_ok {
            let found = amount
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            super::report_first(
                ctx,
                tokens,
                SyntaxError::AmountExpected {
                    found,
                    span: stream_span(&amount),
                },
            );
        }
    }
    Some(elem.array_of())
}

/// The fixed element count of a sized array window, when it has one.
pub fn sized_amount(tokens: &TokenStream, ctx: &Ctx) -> Option<usize> {
    if tokens.kind(0) != TokenKind::IndexOpen {
        return None;
    }
    let inner = tokens.slice(1, -1);
    let (m, _) = inner.split_stack(&[TokenKind::X], 0);
    if !m.found() {
        return None;
    }
    let amount = m.after();
    if amount.size() == 1 && amount.kind(0) == TokenKind::Int {
        return amount.first()?.text.parse().ok();
    }
    let (name, used) = super::qualified_name(&amount, 0)?;
    if used != amount.size() {
        return None;
    }
    ctx.table.lookup(name.as_str()).iter().find_map(|s| {
        let var = s.as_var()?.borrow();
        match var.const_value.as_ref()? {
            cstar_val::Value::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    })
}
