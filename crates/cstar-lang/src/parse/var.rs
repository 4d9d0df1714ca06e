//! Variable statements: initializations, declarations, assignments,
//! name accesses and `delete`.

use super::{check_name, expr_or_report, qualified_name, Ctx};
use crate::ast::Node;
use crate::error::{
    pos_to_span, stream_span, LinearError, NameError, SyntaxError, TypeError, Warning,
};
use crate::scope::{Symbol, Variable};
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use crate::util;
use cstar_val::CstType;

#[derive(Default, Clone, Copy)]
struct Mods {
    is_const: bool,
    is_mut: bool,
    is_static: bool,
    count: usize,
}

fn strip_mods(tokens: &TokenStream) -> Mods {
    let mut mods = Mods::default();
    while tokens.kind(mods.count as isize).is_modifier() {
        match tokens.kind(mods.count as isize) {
            TokenKind::Const => mods.is_const = true,
            TokenKind::Mut => mods.is_mut = true,
            TokenKind::Static => mods.is_static = true,
            _ => {}
        }
        mods.count += 1;
    }
    mods
}

/// Shared capability and modifier checks for `Init` and `Decl`.
fn check_mods(mods: Mods, name_tok: &Token, tokens: &TokenStream, ctx: &mut Ctx) {
    let caps = ctx.caps();
    if mods.is_static && !caps.statics {
        ctx.reporter.report_at(
            name_tok,
            SyntaxError::ModifierNotAllowed {
                modifier: "static".into(),
                span: stream_span(tokens),
            },
        );
    }
    if mods.is_const && !caps.consts {
        ctx.reporter.report_at(
            name_tok,
            SyntaxError::ModifierNotAllowed {
                modifier: "const".into(),
                span: stream_span(tokens),
            },
        );
    }
    if !mods.is_static && !mods.is_const && !(caps.non_static || caps.var_decl) {
        ctx.reporter.report_at(
            name_tok,
            NameError::StaticOnly {
                kind: ctx.kind(),
                span: stream_span(tokens),
            },
        );
    }
    if mods.is_const && mods.is_mut {
        ctx.reporter.report_at(
            name_tok,
            LinearError::ConstAndMut {
                name: name_tok.text.to_string(),
                span: stream_span(tokens),
            },
        );
    }
    if mods.is_const && mods.is_static {
        ctx.reporter.report_at(
            name_tok,
            Warning::ConstAndStatic {
                name: name_tok.text.to_string(),
                span: stream_span(tokens),
            },
        );
    }
    // constants may also be SCREAMING_CASE
    let cased = util::is_snake_case(&name_tok.text)
        || (mods.is_const && util::is_upper_case(&name_tok.text));
    if !cased {
        ctx.reporter.report_at(
            name_tok,
            Warning::WrongCasing {
                kind: "Variable".into(),
                style: "snake_case".into(),
                fixed: util::to_snake_case(&name_tok.text),
                span: pos_to_span(&name_tok.pos),
            },
        );
    }
}

/// True when the name is still free in the current scope; reports the
/// collision otherwise.
fn check_fresh(name_tok: &Token, ctx: &mut Ctx) -> bool {
    let prev = ctx.table.cur_scope().local(&name_tok.text).first().cloned();
    let Some(prev) = prev else { return true };
    ctx.reporter.report_at(
        name_tok,
        NameError::AlreadyDefined {
            name: name_tok.text.to_string(),
            span: pos_to_span(&name_tok.pos),
        },
    );
    let site = match &prev {
        Symbol::Var(v) => Some(v.borrow().decl.clone()),
        Symbol::Scope(sid) => ctx.table.scope(sid).and_then(|s| s.decl.clone()),
    };
    if let Some(site) = site {
        ctx.reporter.note(&site, "first defined here");
    }
    false
}

/// `mods type name = value;` or, with at least one modifier, the
/// inferred form `mods name = value;`.
pub fn parse_init(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (m, faults) = tokens.rsplit_stack(&[TokenKind::Set]);
    if !m.found() || m.at() == 0 {
        return None;
    }
    let head = m.before();
    let mods = strip_mods(&head);
    let rest = head.skip(mods.count as isize);

    let declared_ty = if rest.size() >= 2 && rest.kind(rest.size() as isize - 1) == TokenKind::Ident
    {
        match super::types::parse_type(&rest.slice(0, -1), ctx) {
            Some(ty) => Some(ty),
            None => return None,
        }
    } else if rest.size() == 1 && rest.kind(0) == TokenKind::Ident && mods.count > 0 {
        // the type is inferred from the value
        None
    } else {
        return None;
    };

    ctx.reporter.report_faults(&faults);
    let name_tok = rest.last()?.clone();
    let set_tok = m.token()?.clone();

    if !check_name(&name_tok, ctx) {
        let mut value = expr_or_report(&m.after(), &set_tok, depth, ctx, &CstType::unknown());
        value.consume(&CstType::unknown(), &mut ctx.reporter);
        return Some(Node::Empty);
    }
    check_mods(mods, &name_tok, tokens, ctx);

    let expect = declared_ty.clone().unwrap_or_else(CstType::unknown);
    let mut value = expr_or_report(&m.after(), &set_tok, depth, ctx, &expect);
    value.consume(&expect, &mut ctx.reporter);
    let ty = declared_ty.unwrap_or_else(|| value.type_of());

    if !check_fresh(&name_tok, ctx) {
        return Some(Node::Empty);
    }

    let mut var = Variable::new(name_tok.text.clone(), ty, &name_tok);
    var.perms.is_const = mods.is_const;
    var.perms.is_mut = mods.is_mut;
    var.perms.is_static = mods.is_static;
    if mods.is_const {
        match value.const_value() {
            Some(v) => var.const_value = Some(v),
            None => {
                ctx.reporter.report_at(
                    &name_tok,
                    LinearError::NonConstInConst {
                        name: name_tok.text.to_string(),
                        span: stream_span(tokens),
                    },
                );
            }
        }
    }
    // set directly: provide() would refuse const variables
    var.status = cstar_val::Status::Provided;
    var.last = name_tok.clone();
    let var = var.shared();
    ctx.table.add(&name_tok.text, Symbol::Var(var.clone()));

    Some(Node::Init {
        var,
        value: Box::new(value),
        tokens: tokens.clone(),
    })
}

/// `mods type name;` without a value.
pub fn parse_decl(
    tokens: &TokenStream,
    _depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let mods = strip_mods(tokens);
    let rest = tokens.skip(mods.count as isize);
    if rest.size() < 2 || rest.kind(rest.size() as isize - 1) != TokenKind::Ident {
        return None;
    }
    let ty = super::types::parse_type(&rest.slice(0, -1), ctx)?;
    let name_tok = rest.last()?.clone();

    if !check_name(&name_tok, ctx) {
        return Some(Node::Empty);
    }
    check_mods(mods, &name_tok, tokens, ctx);
    if mods.is_const {
        ctx.reporter.report_at(
            &name_tok,
            LinearError::ConstWithoutInit { span: stream_span(tokens) },
        );
    }
    if mods.is_static {
        ctx.reporter.report_at(
            &name_tok,
            LinearError::StaticWithoutInit {
                name: name_tok.text.to_string(),
                span: stream_span(tokens),
            },
        );
    }
    if !mods.is_mut && !mods.is_const && !ctx.caps().var_decl {
        ctx.reporter.report_at(
            &name_tok,
            LinearError::ImmutableWithoutInit { span: stream_span(tokens) },
        );
    }
    if !check_fresh(&name_tok, ctx) {
        return Some(Node::Empty);
    }

    let mut var = Variable::new(name_tok.text.clone(), ty, &name_tok);
    var.perms.is_const = mods.is_const;
    var.perms.is_mut = mods.is_mut;
    var.perms.is_static = mods.is_static;
    let var = var.shared();
    ctx.table.add(&name_tok.text, Symbol::Var(var.clone()));

    Some(Node::Decl {
        var,
        tokens: tokens.clone(),
    })
}

/// `target = value;`.
pub fn parse_assign(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (m, faults) = tokens.rsplit_stack(&[TokenKind::Set]);
    if !m.found() || m.at() == 0 {
        return None;
    }
    ctx.reporter.report_faults(&faults);
    let set_tok = m.token()?.clone();
    if !ctx.caps().expressions {
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

    let mut target = expr_or_report(&m.before(), &set_tok, depth, ctx, &CstType::unknown());
    if !matches!(
        target,
        Node::Access { .. }
            | Node::Index { .. }
            | Node::Call { .. }
            | Node::Check { .. }
            | Node::Group { .. }
            | Node::Empty
    ) {
        super::report_first(
            ctx,
            tokens,
            TypeError::Unassignable { span: stream_span(&m.before()) },
        );
        target = Node::Empty;
    }
    let want = target.provide(&mut ctx.reporter);
    let mut value = expr_or_report(&m.after(), &set_tok, depth, ctx, &want);
    value.consume(&want, &mut ctx.reporter);

    Some(Node::Assign {
        target: Box::new(target),
        value: Box::new(value),
        tokens: tokens.clone(),
    })
}

/// A window that is nothing but a (possibly qualified) name.
pub fn parse_access(
    tokens: &TokenStream,
    _depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (name, used) = qualified_name(tokens, 0)?;
    if used != tokens.size() {
        return None;
    }
    let found = ctx.table.lookup(name.as_str());
    let Some(target) = found.first().cloned() else {
        if ctx.table.mark_unknown(name.clone()) {
            super::report_first(
                ctx,
                tokens,
                NameError::UnknownVariable {
                    name: name.to_string(),
                    span: stream_span(tokens),
                },
            );
        }
        return Some(Node::Empty);
    };
    Some(Node::Access {
        name,
        target,
        tokens: tokens.clone(),
    })
}

/// `delete a, b;` consumes each named value by hand.
pub fn parse_delete(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::Delete {
        return None;
    }
    let rest = tokens.skip(1);
    let (segments, faults) = rest.list(&[TokenKind::Comma], false);
    ctx.reporter.report_faults(&faults);
    if segments.is_empty() {
        super::report_first(
            ctx,
            tokens,
            SyntaxError::NameListExpected { span: stream_span(tokens) },
        );
        return Some(Node::Empty);
    }

    let mut vars = Vec::with_capacity(segments.len());
    for seg in &segments {
        let named = qualified_name(seg, 0)
            .map(|(_, used)| used == seg.size())
            .unwrap_or(false);
        if !named {
            super::report_first(
                ctx,
                seg,
                SyntaxError::NameListExpected { span: stream_span(seg) },
            );
            continue;
        }
        let Some(mut node) = parse_access(seg, depth, ctx, &CstType::unknown()) else {
            continue;
        };
        if let Node::Access { name, target: Symbol::Var(var), .. } = &node {
            if var.borrow().perms.is_free {
                super::report_first(
                    ctx,
                    seg,
                    LinearError::DeleteFree {
                        name: name.to_string(),
                        span: stream_span(seg),
                    },
                );
                continue;
            }
        }
        let ty = node.type_of();
        node.consume(&ty, &mut ctx.reporter);
        vars.push(node);
    }
    Some(Node::Delete {
        vars,
        tokens: tokens.clone(),
    })
}
