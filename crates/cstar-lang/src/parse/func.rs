//! Function definitions and calls.
//!
//! Definitions open a function scope, bind the parameters as provided
//! variables and attach the signature before the body is parsed, so
//! `return` statements inside the body can see their expected type.
//! Calls resolve through the overload set a name accumulates in the
//! table and pick the first signature the arguments fit.

use super::{check_name, expr_or_report, matching_close, qualified_name, Ctx};
use crate::ast::Node;
use crate::error::{
    pos_to_span, stream_span, NameError, SyntaxError, TypeError, Warning,
};
use crate::ops;
use crate::scope::{FnSig, ScopeKind, Symbol, Variable, Visibility};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use crate::util;
use cstar_val::{CstStr, CstType, Status, UINT_TYPES};

/// `[visibility] ret-type name(params) { body }`, with `...`, `noimpl`
/// or nothing at all standing in for the body of a declaration.
pub fn parse_def(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (visibility, vis_count) = match tokens.kind(0) {
        TokenKind::Public => (Visibility::Public, 1),
        TokenKind::Private => (Visibility::Private, 1),
        TokenKind::Protected => (Visibility::Protected, 1),
        _ => (Visibility::Guarded, 0),
    };
    let rest = tokens.skip(vis_count);

    let (m, faults) = rest.split_stack(&[TokenKind::Open], 0);
    if !m.found() {
        return None;
    }
    let head = m.before();
    if head.size() < 2 || head.kind(head.size() as isize - 1) != TokenKind::Ident {
        return None;
    }
    let ret = super::types::parse_type(&head.slice(0, -1), ctx)?;
    let open_at = m.at();
    let close_at = matching_close(&rest, open_at)?;

    // committed from here on
    ctx.reporter.report_faults(&faults);
    let name_tok = head.last()?.clone();
    if !ctx.caps().functions {
        ctx.reporter.report_at(
            &name_tok,
            NameError::FunctionForbidden {
                kind: ctx.kind(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    if vis_count > 0 && !ctx.caps().visibility {
        let modifier = tokens.first().map(|t| t.text.to_string()).unwrap_or_default();
        super::report_first(
            ctx,
            tokens,
            SyntaxError::ModifierNotAllowed {
                modifier,
                span: stream_span(tokens),
            },
        );
    }
    if !check_name(&name_tok, ctx) {
        return Some(Node::Empty);
    }
    if !util::is_camel_case(&name_tok.text) {
        ctx.reporter.report_at(
            &name_tok,
            Warning::WrongCasing {
                kind: "Function".into(),
                style: "camelCase".into(),
                fixed: util::to_camel_case(&name_tok.text),
                span: pos_to_span(&name_tok.pos),
            },
        );
    }

    ctx.table.enter(name_tok.text.clone(), ScopeKind::Function);
    ctx.table.cur_scope_mut().decl = Some(name_tok.clone());
    // the function body sees the surrounding names
    let parent = ctx.table.cur_sid().parent().unwrap_or_else(|| {
        crate::scope::SID_GLOBAL.clone()
    });
    ctx.table.include(parent);

    let mut sig = FnSig::new(ret.clone());
    sig.visibility = visibility;
    let mut params: Vec<(CstStr, CstType)> = Vec::new();
    parse_params(&rest.slice(open_at as isize + 1, close_at as isize), &mut sig, &mut params, depth, ctx);
    ctx.table.cur_scope_mut().sig = Some(sig.clone());

    let after = rest.skip(close_at as isize + 1);
    let body = parse_body(&after, &name_tok, &ret, depth, ctx);
    ctx.table.exit();

    Some(Node::Func {
        name: name_tok.text.clone(),
        params,
        sig,
        body: Box::new(body),
        tokens: tokens.clone(),
    })
}

fn parse_params(
    window: &TokenStream,
    sig: &mut FnSig,
    params: &mut Vec<(CstStr, CstType)>,
    depth: usize,
    ctx: &mut Ctx,
) {
    let (segments, faults) = window.list(&[TokenKind::Comma], false);
    ctx.reporter.report_faults(&faults);
    let mut taken: Vec<CstStr> = Vec::new();
    let mut has_default = false;

    for seg in &segments {
        let (m, _) = seg.split_stack(&[TokenKind::Set], 0);
        let (decl_part, default) = if m.found() {
            (m.before(), Some(m.after()))
        } else {
            (seg.clone(), None)
        };
        if decl_part.size() < 2
            || decl_part.kind(decl_part.size() as isize - 1) != TokenKind::Ident
        {
            let found = seg
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            super::report_first(
                ctx,
                seg,
                SyntaxError::NameExpected {
                    found,
                    span: stream_span(seg),
                },
            );
            continue;
        }
        let Some(name_tok) = decl_part.last().cloned() else { continue };
        let ty = match super::types::parse_type(&decl_part.slice(0, -1), ctx) {
            Some(ty) => ty,
            None => {
                let found = decl_part
                    .slice(0, -1)
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                super::report_first(
                    ctx,
                    seg,
                    SyntaxError::TypeExpected {
                        found,
                        span: stream_span(seg),
                    },
                );
                CstType::unknown()
            }
        };

        if taken.contains(&name_tok.text) {
            ctx.reporter.report_at(
                &name_tok,
                NameError::ParamNameReused {
                    name: name_tok.text.to_string(),
                    span: pos_to_span(&name_tok.pos),
                },
            );
            continue;
        }
        taken.push(name_tok.text.clone());

        match default {
            Some(value) => {
                has_default = true;
                let mut value = expr_or_report(&value, &name_tok, depth, ctx, &ty);
                value.consume(&ty, &mut ctx.reporter);
                sig.named_params.push((name_tok.text.clone(), ty.clone(), value));
            }
            None => {
                if has_default {
                    ctx.reporter.report_at(
                        &name_tok,
                        NameError::PositionalAfterNamed { span: pos_to_span(&name_tok.pos) },
                    );
                }
                sig.params.push(ty.clone());
                params.push((name_tok.text.clone(), ty.clone()));
            }
        }

        let mut var = Variable::new(name_tok.text.clone(), ty, &name_tok);
        var.status = Status::Provided;
        ctx.table.add(&name_tok.text, Symbol::Var(var.shared()));
    }
}

/// Whatever follows the parameter list: a braced body, a placeholder,
/// or nothing for a header declaration.
fn parse_body(
    after: &TokenStream,
    name_tok: &crate::token::Token,
    ret: &CstType,
    depth: usize,
    ctx: &mut Ctx,
) -> Node {
    if after.is_empty()
        || (after.size() == 1
            && matches!(after.kind(0), TokenKind::DotDotDot | TokenKind::NoImpl))
    {
        return Node::Empty;
    }
    if after.kind(0) != TokenKind::BlockOpen {
        let found = after.first().map(|t| t.text.to_string()).unwrap_or_default();
        super::report_first(
            ctx,
            after,
            SyntaxError::ExpectedBlockOpen {
                found,
                span: stream_span(after),
            },
        );
        return Node::Empty;
    }
    let inner = if after.kind(after.size() as isize - 1) == TokenKind::BlockClose
        && matching_close(after, 0) == Some(after.size() - 1)
    {
        after.slice(1, -1)
    } else {
        let found = after.last().map(|t| t.text.to_string()).unwrap_or_default();
        super::report_first(
            ctx,
            after,
            SyntaxError::ExpectedBlockClose {
                found,
                span: stream_span(after),
            },
        );
        after.skip(1)
    };

    let body = super::flow::parse_block(&inner, depth + 1, ctx);
    if !matches!(body, Node::Block { has_returned: true, .. }) {
        if !ret.is_void() && !ret.is_unknown() {
            ctx.reporter.report_at(
                name_tok,
                TypeError::Unreturned {
                    name: name_tok.text.to_string(),
                    ret: ret.to_string(),
                    span: pos_to_span(&name_tok.pos),
                },
            );
        }
        super::flow::sweep_scope(ctx);
    }
    body
}

/// A literal argument fits any parameter its family can adopt; anything
/// else must match the parameter type exactly.
fn arg_matches(node: &Node, param: &CstType) -> bool {
    match node {
        Node::Int { value, .. } => {
            ops::is_int_name(param.as_str())
                && !(*value < 0 && UINT_TYPES.contains(&param.as_str()))
        }
        Node::Float { .. } => ops::is_float_name(param.as_str()),
        _ => node.type_of() == *param,
    }
}

/// `name(args)` with positional and `name = value` arguments.
pub fn parse_call(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (name, used) = qualified_name(tokens, 0)?;
    if tokens.kind(used as isize) != TokenKind::Open
        || matching_close(tokens, used) != Some(tokens.size() - 1)
    {
        return None;
    }
    let call_tok = tokens.first()?.clone();
    let arg_window = tokens.slice(used as isize + 1, tokens.size() as isize - 1);
    let (segments, faults) = arg_window.list(&[TokenKind::Comma], false);
    ctx.reporter.report_faults(&faults);

    let mut args: Vec<(Option<CstStr>, Node)> = Vec::new();
    let mut seen_named = false;
    for seg in &segments {
        if seg.kind(0) == TokenKind::Ident && seg.kind(1) == TokenKind::Set {
            seen_named = true;
            let arg_name = seg.first()?.text.clone();
            let node = expr_or_report(&seg.skip(2), &call_tok, depth, ctx, &CstType::unknown());
            args.push((Some(arg_name), node));
        } else {
            if seen_named {
                super::report_first(
                    ctx,
                    seg,
                    NameError::PositionalAfterOptional { span: stream_span(seg) },
                );
            }
            let node = expr_or_report(seg, &call_tok, depth, ctx, &CstType::unknown());
            args.push((None, node));
        }
    }

    let candidates: Vec<_> = ctx
        .table
        .lookup(name.as_str())
        .iter()
        .filter_map(|s| {
            let sid = s.as_scope()?;
            let scope = ctx.table.scope(sid)?;
            if scope.kind != ScopeKind::Function {
                return None;
            }
            Some((sid.clone(), scope.sig.clone()?, scope.decl.clone()))
        })
        .collect();

    if candidates.is_empty() {
        if ctx.table.mark_unknown(name.clone()) {
            ctx.reporter.report_at(
                &call_tok,
                NameError::UnknownFunction {
                    name: name.to_string(),
                    span: stream_span(tokens),
                },
            );
        }
        for (_, node) in args.iter_mut() {
            node.consume(&CstType::unknown(), &mut ctx.reporter);
        }
        return Some(Node::Empty);
    }

    let fits = |sig: &FnSig| {
        let positional: Vec<&Node> =
            args.iter().filter(|(n, _)| n.is_none()).map(|(_, a)| a).collect();
        positional.len() == sig.params.len()
            && positional.iter().zip(&sig.params).all(|(a, p)| arg_matches(a, p))
    };
    let Some((_, sig, decl)) = candidates.iter().find(|(_, sig, _)| fits(sig)) else {
        let options = candidates
            .iter()
            .map(|(_, sig, _)| format!("'{}'", sig.sig_type()))
            .collect::<Vec<_>>()
            .join(", ");
        ctx.reporter.report_at(
            &call_tok,
            TypeError::MismatchingOperands {
                options: format!("No signature of '{name}' fits these arguments; have {options}"),
                span: stream_span(tokens),
            },
        );
        for (_, node) in args.iter_mut() {
            node.consume(&CstType::unknown(), &mut ctx.reporter);
        }
        return Some(Node::Empty);
    };

    let mut positional = 0usize;
    for (arg_name, node) in args.iter_mut() {
        match arg_name {
            None => {
                let want = sig.params.get(positional).cloned().unwrap_or_else(CstType::unknown);
                node.consume(&want, &mut ctx.reporter);
                positional += 1;
            }
            Some(arg_name) => match sig.named(arg_name) {
                Some((_, pty, _)) => {
                    let want = pty.clone();
                    node.consume(&want, &mut ctx.reporter);
                }
                None => {
                    ctx.reporter.report_at(
                        &call_tok,
                        NameError::IllegalOptionalArgName {
                            name: arg_name.to_string(),
                            span: stream_span(tokens),
                        },
                    );
                    node.consume(&CstType::unknown(), &mut ctx.reporter);
                }
            },
        }
    }

    Some(Node::Call {
        name,
        args,
        sig: sig.clone(),
        decl: decl.clone().unwrap_or(call_tok),
        tokens: tokens.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> Ctx {
        let (_, ctx) = crate::check_snippet(text, true);
        ctx
    }

    fn check_module(text: &str) -> Ctx {
        let mut ctx = Ctx::silent();
        ctx.reporter.add_source("<test>", text);
        let ts = crate::lexer::tokenize(text, "<test>", &mut ctx.reporter).freeze();
        super::super::flow::parse_block(&ts, 0, &mut ctx);
        ctx
    }

    #[test]
    fn test_def_and_call() {
        let ctx = check_module(
            "int32 twice(int32 n) { return n * 2; } \
             int32 main() { return twice(21); }",
        );
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_unknown_function() {
        let ctx = check("int32 a = missing(1);");
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0202"]);
    }

    #[test]
    fn test_overload_resolution() {
        let ctx = check_module(
            "int32 twice(int32 n) { return n * 2; } \
             float64 twice(float64 n) { return n * 2.0; } \
             int32 main() { float64 f = twice(1.5); int32 i = twice(4); return i + f as int32; }",
        );
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_no_fitting_overload() {
        let ctx = check_module(
            "int32 twice(int32 n) { return n * 2; } \
             void main() { bool b = true; twice(b, b); return; }",
        );
        assert_eq!(ctx.reporter.codes(), ["cst_type_E0103"]);
    }

    #[test]
    fn test_named_argument_uses_default_type() {
        let ctx = check_module(
            "int32 scaled(int32 n, int32 factor = 2) { return n * factor; } \
             int32 main() { int32 a = scaled(3); int32 b = scaled(3, factor = 4); \
             return a + b; }",
        );
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_unknown_named_argument() {
        let ctx = check_module(
            "int32 scaled(int32 n, int32 factor = 2) { return n * factor; } \
             int32 main() { int32 a = scaled(3, other = 4); return a; }",
        );
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0207"]);
    }

    #[test]
    fn test_positional_after_defaulted_param() {
        let ctx = check_module("int32 weird(int32 a = 1, int32 b) { return a + b; }");
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0210"]);
    }

    #[test]
    fn test_param_name_reused() {
        let ctx = check_module("int32 f(int32 a, int32 a) { return a; }");
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0209"]);
    }

    #[test]
    fn test_missing_return_value() {
        let ctx = check_module("int32 noReturn() { int32 a = 1; int32 b = a; }");
        // never returns, and b is left unconsumed at the sweep
        assert!(ctx.reporter.codes().contains(&"cst_type_E0106".to_string()));
    }

    #[test]
    fn test_function_forbidden_inside_function() {
        let ctx = check("int32 inner() { return 1; }");
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0212"]);
    }

    #[test]
    fn test_header_declaration_without_body() {
        let ctx = check_module("int32 twice(int32 n); void main() { int32 a = twice(2); return a; }");
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_function_casing_warning() {
        let ctx = check_module("void do_thing() { return; }");
        assert_eq!(ctx.reporter.codes(), ["cst_warn_W0003"]);
    }
}
