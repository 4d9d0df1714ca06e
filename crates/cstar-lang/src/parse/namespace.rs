//! `namespace Name { ... }` blocks.
//!
//! A namespace seen a second time reopens the existing scope, so its
//! members accumulate across blocks and across module files.

use super::Ctx;
use crate::ast::Node;
use crate::error::{pos_to_span, stream_span, NameError, SyntaxError, Warning};
use crate::scope::{ScopeKind, Symbol};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use crate::util;
use cstar_val::CstType;

fn pascal_cased(name: &str) -> String {
    let mut fixed = util::to_camel_case(name);
    if let Some(first) = fixed.get(0..1) {
        let upper = first.to_uppercase();
        fixed.replace_range(0..1, &upper);
    }
    fixed
}

pub fn parse_namespace(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::Namespace {
        return None;
    }
    if !ctx.caps().sub_classes {
        super::report_first(
            ctx,
            tokens,
            NameError::NamespaceForbidden {
                kind: ctx.kind(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    let Some(name_tok) = tokens.get(1).cloned() else {
        super::report_first(
            ctx,
            tokens,
            SyntaxError::NameExpected {
                found: String::new(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    };
    if name_tok.kind != TokenKind::Ident {
        ctx.reporter.report_at(
            &name_tok,
            SyntaxError::NameExpected {
                found: name_tok.text.to_string(),
                span: pos_to_span(&name_tok.pos),
            },
        );
        return Some(Node::Empty);
    }
    if !util::is_pascal_case(&name_tok.text) {
        ctx.reporter.report_at(
            &name_tok,
            Warning::WrongCasing {
                kind: "Namespace".into(),
                style: "PascalCase".into(),
                fixed: pascal_cased(&name_tok.text),
                span: pos_to_span(&name_tok.pos),
            },
        );
    }

    if tokens.kind(2) != TokenKind::BlockOpen {
        ctx.reporter.report_at(
            &name_tok,
            SyntaxError::ExpectedBlockOpen {
                found: name_tok.text.to_string(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    let body = if super::matching_close(tokens, 2) == Some(tokens.size() - 1) {
        tokens.slice(3, tokens.size() as isize - 1)
    } else {
        let found = tokens.last().map(|t| t.text.to_string()).unwrap_or_default();
        super::report_first(
            ctx,
            tokens,
            SyntaxError::ExpectedBlockClose {
                found,
                span: stream_span(tokens),
            },
        );
        tokens.skip(3)
    };

    // reopen an existing namespace of the same name, if there is one
    let existing = ctx
        .table
        .cur_scope()
        .local(&name_tok.text)
        .iter()
        .find_map(|s| match s {
            Symbol::Scope(sid) => {
                let scope = ctx.table.scope(sid)?;
                (scope.kind == ScopeKind::Namespace).then(|| sid.clone())
            }
            Symbol::Var(_) => None,
        });
    let conflict = existing.is_none()
        && ctx
            .table
            .cur_scope()
            .local(&name_tok.text)
            .iter()
            .any(|s| s.as_var().is_some());
    if conflict {
        ctx.reporter.report_at(
            &name_tok,
            NameError::AlreadyDefined {
                name: name_tok.text.to_string(),
                span: pos_to_span(&name_tok.pos),
            },
        );
        return Some(Node::Empty);
    }

    match existing {
        Some(sid) => ctx.table.move_to(&sid),
        None => {
            ctx.table.enter(name_tok.text.clone(), ScopeKind::Namespace);
            ctx.table.cur_scope_mut().decl = Some(name_tok.clone());
        }
    }
    let body_node = super::flow::parse_block(&body, depth + 1, ctx);
    ctx.table.exit();

    Some(Node::Namespace {
        name: name_tok.text.clone(),
        body: Box::new(body_node),
        tokens: tokens.clone(),
    })
}
