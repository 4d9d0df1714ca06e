//! Statement sequencing and control flow.
//!
//! [`parse_block`] cuts a window into statements on top-level `;` and
//! `}` tokens and drives [`super::parse_statement`] over them. It also
//! owns the dead-code check after a `return` and the end-of-scope
//! linearity sweep.

use super::{expr_or_report, Ctx};
use crate::ast::Node;
use crate::error::{
    pos_to_span, stream_span, LinearError, NameError, SyntaxError, TypeError, Warning,
};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use cstar_val::{CstType, Status};

/// Parse a statement sequence. The window holds everything between the
/// enclosing braces (or the whole module).
pub fn parse_block(tokens: &TokenStream, depth: usize, ctx: &mut Ctx) -> Node {
    let mut nodes = Vec::new();
    let mut has_returned = false;
    let mut window = tokens.clone();
    let mut past_imports = false;

    loop {
        if window.is_empty() {
            break;
        }
        let (m, faults) = window.split_stack(&[TokenKind::EndCmd, TokenKind::BlockClose], 0);
        ctx.reporter.report_faults(&faults);

        let stmt = if !m.found() {
            // the last statement is missing its terminator
            if let Some(last) = window.last() {
                let last = last.clone();
                ctx.reporter.report_at(
                    &last,
                    SyntaxError::ExpectedSemicolon { span: pos_to_span(&last.pos) },
                );
            }
            window.clone()
        } else if m.token().map(|t| t.kind) == Some(TokenKind::BlockClose) {
            m.through()
        } else {
            m.before()
        };
        let rest = if m.found() { m.after() } else { TokenStream::empty() };

        if !stmt.is_empty() {
            if has_returned {
                // one report covers everything below the return
                let span = match (stmt.first(), tokens.last()) {
                    (Some(first), Some(last)) => pos_to_span(&first.pos.to(&last.pos)),
                    _ => stream_span(&stmt),
                };
                super::report_first(ctx, &stmt, SyntaxError::UnreachableCode { span });
                break;
            }
            if stmt.kind(0) == TokenKind::Import {
                if past_imports {
                    super::report_first(
                        ctx,
                        &stmt,
                        Warning::ImportNotAtTop { span: stream_span(&stmt) },
                    );
                }
            } else {
                past_imports = true;
            }

            let node = super::parse_statement(&stmt, depth + 1, ctx);
            if matches!(node, Node::Return { .. }) {
                has_returned = true;
                sweep_scope(ctx);
            }
            nodes.push(node);
        }

        window = rest;
        if !m.found() {
            break;
        }
    }

    Node::Block { nodes, has_returned }
}

/// `if cond { body }`. Both paths must leave the enclosing scope's
/// variables in the same linearity state, unless the body returns.
pub fn parse_if(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::If {
        return None;
    }
    if !ctx.caps().sub_blocks {
        super::report_first(
            ctx,
            tokens,
            NameError::ExpressionForbidden {
                kind: ctx.kind(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }

    let (m, faults) = tokens.split_stack(&[TokenKind::BlockOpen], 0);
    ctx.reporter.report_faults(&faults);
    if !m.found() {
        let found = tokens.last().map(|t| t.text.to_string()).unwrap_or_default();
        super::report_first(
            ctx,
            tokens,
            SyntaxError::ExpectedBlockOpen {
                found,
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }

    let if_tok = tokens.first()?.clone();
    let mut cond = expr_or_report(&m.before().skip(1), &if_tok, depth, ctx, &CstType::new("bool"));
    cond.consume(&CstType::new("bool"), &mut ctx.reporter);

    let open_at = m.at();
    let body = if tokens.kind(tokens.size() as isize - 1) == TokenKind::BlockClose
        && super::matching_close(tokens, open_at) == Some(tokens.size() - 1)
    {
        tokens.slice(open_at as isize + 1, tokens.size() as isize - 1)
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
        tokens.skip(open_at as isize + 1)
    };

    let outer = ctx.table.cur_sid().clone();
    let before = ctx.table.snapshot(&outer);
    ctx.table.enter_block();
    let body_node = parse_block(&body, depth + 1, ctx);
    ctx.table.exit();
    let after = ctx.table.snapshot(&outer);

    let returned = matches!(body_node, Node::Block { has_returned: true, .. });
    if !returned && !before.matches(&after) {
        super::report_first(
            ctx,
            tokens,
            LinearError::BranchDiverged { span: stream_span(tokens) },
        );
        for (var, was, now) in before.diff(&after) {
            let (name, last) = {
                let v = var.borrow();
                (v.name.clone(), v.last.clone())
            };
            ctx.reporter.note(
                &last,
                format!("'{name}' was {was} before the block, {now} now"),
            );
        }
    }

    Some(Node::If {
        cond: Box::new(cond),
        body: Box::new(body_node),
        tokens: tokens.clone(),
    })
}

pub fn parse_return(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::Return {
        return None;
    }
    let sid = ctx.table.cur_sid().clone();
    if ctx.table.kind_name(&sid) != "Function" {
        super::report_first(
            ctx,
            tokens,
            NameError::ReturnForbidden {
                kind: ctx.kind(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }

    let ret = ctx.table.return_type(&sid);
    let rest = tokens.skip(1);
    if rest.is_empty() {
        if !ret.is_void() && !ret.is_unknown() {
            super::report_first(
                ctx,
                tokens,
                TypeError::Mismatch {
                    expected: ret.to_string(),
                    found: "void".into(),
                    span: stream_span(tokens),
                },
            );
        }
        return Some(Node::Return {
            value: None,
            tokens: tokens.clone(),
        });
    }

    let ret_tok = tokens.first()?.clone();
    let mut value = expr_or_report(&rest, &ret_tok, depth, ctx, &ret);
    value.consume(&ret, &mut ctx.reporter);
    Some(Node::Return {
        value: Some(Box::new(value)),
        tokens: tokens.clone(),
    })
}

/// `...` and `noimpl` placeholder bodies.
pub fn parse_todo(
    tokens: &TokenStream,
    _depth: usize,
    _ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.size() == 1
        && matches!(tokens.kind(0), TokenKind::DotDotDot | TokenKind::NoImpl)
    {
        return Some(Node::Empty);
    }
    None
}

/// A bare expression in statement position: evaluate it and complain
/// about a silently dropped result.
pub fn discarded(mut node: Node, ctx: &mut Ctx) -> Node {
    if !ctx.caps().expressions {
        if let Some(tokens) = node.window() {
            let tokens = tokens.clone();
            super::report_first(
                ctx,
                &tokens,
                NameError::ExpressionForbidden {
                    kind: ctx.kind(),
                    span: stream_span(&tokens),
                },
            );
        }
        return Node::Empty;
    }
    let ty = node.type_of();
    node.consume(&ty, &mut ctx.reporter);
    if ty.is_void() || ty.is_unknown() {
        return node;
    }
    let Some(tokens) = node.window().cloned() else {
        return node;
    };
    if ty.is_atomic() {
        if !matches!(node, Node::Call { .. }) {
            super::report_first(
                ctx,
                &tokens,
                Warning::UnusedOutput { span: stream_span(&tokens) },
            );
        }
    } else {
        super::report_first(
            ctx,
            &tokens,
            LinearError::DiscardedValue {
                ty: ty.to_string(),
                span: stream_span(&tokens),
            },
        );
    }
    node
}

/// End-of-scope check: every strictly-tracked value must have been
/// consumed, statics must end provided, and declared-but-unused names
/// get a warning. A `_` prefix opts a variable out.
pub fn sweep_scope(ctx: &mut Ctx) {
    let sid = ctx.table.cur_sid().clone();
    for var in ctx.table.variables(&sid) {
        let (name, status, perms, decl, last) = {
            let v = var.borrow();
            (v.name.clone(), v.status, v.perms, v.decl.clone(), v.last.clone())
        };
        if name.starts_with('_') {
            continue;
        }
        match status {
            Status::Uninitialized => {
                ctx.reporter.report_at(
                    &decl,
                    Warning::UnusedVariable {
                        name: name.to_string(),
                        hint: format!("; name it '_{name}' if this is intended"),
                        span: pos_to_span(&decl.pos),
                    },
                );
            }
            Status::Provided if !perms.is_static => {
                if perms.is_free {
                    ctx.reporter.report_at(
                        &last,
                        Warning::NeverConsumed {
                            name: name.to_string(),
                            hint: String::new(),
                            span: pos_to_span(&last.pos),
                        },
                    );
                } else {
                    ctx.reporter.report_at(
                        &last,
                        LinearError::NeverConsumed {
                            name: name.to_string(),
                            hint: "; consume or delete it before the scope ends".into(),
                            span: pos_to_span(&last.pos),
                        },
                    );
                }
            }
            Status::Consumed if perms.is_static => {
                ctx.reporter.report_at(
                    &last,
                    LinearError::StaticNeverProvided {
                        name: name.to_string(),
                        span: pos_to_span(&last.pos),
                    },
                );
            }
            _ => {}
        }
    }
}
