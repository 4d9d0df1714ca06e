//! Import statements.
//!
//! Imports only rearrange the symbol table; they produce no node of
//! their own. Four shapes are accepted:
//!
//! ```text
//! import a::b;          // bind 'b' to the module scope a::b
//! import m as alias;    // bind 'alias' to the module scope m
//! import m: { x, y };   // alias individual members into this scope
//! import m::*;          // search m whenever a local lookup misses
//! ```
//!
//! Module scopes hang off the root, so every form resolves from there.
//! An unresolved module stays silent here; the module loader already
//! reported why it could not be read.

use super::Ctx;
use crate::ast::Node;
use crate::error::{pos_to_span, stream_span, ModuleError, NameError};
use crate::scope::{Symbol, SID_GLOBAL};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use cstar_val::CstType;

pub fn parse_import(
    tokens: &TokenStream,
    _depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::Import {
        return None;
    }
    let rest = tokens.skip(1);
    let Some((path, used)) = super::qualified_name(&rest, 0) else {
        super::report_first(
            ctx,
            tokens,
            ModuleError::UnexpectedImport { span: stream_span(tokens) },
        );
        return Some(Node::Empty);
    };

    // import m::*;
    if rest.kind(used as isize) == TokenKind::SubNs
        && rest.kind(used as isize + 1) == TokenKind::Mul
    {
        if rest.size() != used + 2 {
            super::report_first(
                ctx,
                tokens,
                ModuleError::ImportAllPlacement { span: stream_span(&rest) },
            );
            return Some(Node::Empty);
        }
        if let Some(sid) = resolve_scope(ctx, &path) {
            ctx.table.include(sid);
        }
        return Some(Node::Empty);
    }

    // import a::b;
    if rest.size() == used {
        if let Some(sid) = resolve_scope(ctx, &path) {
            let leaf = path.rsplit("::").next().unwrap_or(&path).to_string();
            ctx.table.cur_scope_mut().put(leaf, Symbol::Scope(sid));
        }
        return Some(Node::Empty);
    }

    // import m as alias;
    if rest.kind(used as isize) == TokenKind::As {
        let alias = rest.get(used as isize + 1);
        match alias {
            Some(tok) if tok.kind == TokenKind::Ident && rest.size() == used + 2 => {
                let tok = tok.clone();
                if let Some(sid) = resolve_scope(ctx, &path) {
                    ctx.table
                        .cur_scope_mut()
                        .put(tok.text.clone(), Symbol::Scope(sid));
                }
                return Some(Node::Empty);
            }
            _ => {
                super::report_first(
                    ctx,
                    tokens,
                    ModuleError::UnexpectedImport { span: stream_span(tokens) },
                );
                return Some(Node::Empty);
            }
        }
    }

    // import m: { x, y };
    if rest.kind(used as isize) == TokenKind::In {
        let inner = member_list(&rest, used + 1);
        let Some(inner) = inner else {
            super::report_first(
                ctx,
                tokens,
                ModuleError::UnexpectedImport { span: stream_span(tokens) },
            );
            return Some(Node::Empty);
        };
        let (segs, faults) = inner.list(&[TokenKind::Comma], false);
        ctx.reporter.report_faults(&faults);
        for seg in segs {
            let Some(member) = seg.first().cloned() else { continue };
            if seg.size() != 1 || member.kind != TokenKind::Ident {
                ctx.reporter.report_at(
                    &member,
                    ModuleError::UnexpectedImport { span: stream_span(&seg) },
                );
                continue;
            }
            let target = format!("{}::{}", path, member.text);
            if resolve_scope(ctx, &path).is_some()
                && ctx.table.lookup_in(&SID_GLOBAL, &target).is_empty()
            {
                ctx.reporter.report_at(
                    &member,
                    NameError::UnknownVariable {
                        name: target.clone(),
                        span: pos_to_span(&member.pos),
                    },
                );
                continue;
            }
            ctx.table
                .cur_scope_mut()
                .import_from
                .insert(member.text.clone(), target.into());
        }
        return Some(Node::Empty);
    }

    super::report_first(
        ctx,
        tokens,
        ModuleError::UnexpectedImport { span: stream_span(tokens) },
    );
    Some(Node::Empty)
}

/// The `{ x, y }` member window, or the bare `x, y` form without braces.
fn member_list(rest: &TokenStream, from: usize) -> Option<TokenStream> {
    if rest.kind(from as isize) == TokenKind::BlockOpen {
        let close = super::matching_close(rest, from)?;
        if close != rest.size() - 1 {
            return None;
        }
        Some(rest.slice(from as isize + 1, close as isize))
    } else if rest.size() > from {
        Some(rest.skip(from as isize))
    } else {
        None
    }
}

fn resolve_scope(ctx: &Ctx, path: &str) -> Option<crate::scope::Sid> {
    ctx.table
        .lookup_in(&SID_GLOBAL, path)
        .iter()
        .find_map(|s| s.as_scope().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;

    fn ctx_with_module() -> Ctx {
        let mut ctx = Ctx::silent();
        ctx.table.enter("math", ScopeKind::Namespace);
        ctx.table.enter("inner", ScopeKind::Namespace);
        ctx.table.exit();
        ctx.table.exit();
        ctx
    }

    fn run_import(text: &str, ctx: &mut Ctx) {
        let ts = crate::lexer::tokenize(text, "<test>", &mut ctx.reporter).freeze();
        let node = parse_import(&ts, 0, ctx, &CstType::unknown());
        assert!(matches!(node, Some(Node::Empty)));
    }

    #[test]
    fn test_import_qualified_binds_leaf() {
        let mut ctx = ctx_with_module();
        run_import("import math::inner", &mut ctx);
        assert!(!ctx.table.lookup("inner").is_empty());
        assert!(ctx.reporter.codes().is_empty());
    }

    #[test]
    fn test_import_alias() {
        let mut ctx = ctx_with_module();
        run_import("import math as m", &mut ctx);
        assert!(!ctx.table.lookup("m").is_empty());
        assert!(ctx.reporter.codes().is_empty());
    }

    #[test]
    fn test_import_members() {
        let mut ctx = ctx_with_module();
        run_import("import math: { inner }", &mut ctx);
        assert!(!ctx.table.lookup("inner").is_empty());
        assert!(ctx.reporter.codes().is_empty());
    }

    #[test]
    fn test_import_unknown_member() {
        let mut ctx = ctx_with_module();
        run_import("import math: { missing }", &mut ctx);
        assert_eq!(ctx.reporter.codes(), ["cst_name_E0201"]);
    }

    #[test]
    fn test_import_all_must_end() {
        let mut ctx = ctx_with_module();
        run_import("import math::* as m", &mut ctx);
        assert_eq!(ctx.reporter.codes(), ["cst_module_E0404"]);
    }

    #[test]
    fn test_import_all_includes() {
        let mut ctx = ctx_with_module();
        run_import("import math::*", &mut ctx);
        assert!(!ctx.table.lookup("inner").is_empty());
        assert!(ctx.reporter.codes().is_empty());
    }

    #[test]
    fn test_import_malformed() {
        let mut ctx = ctx_with_module();
        run_import("import 42", &mut ctx);
        assert_eq!(ctx.reporter.codes(), ["cst_module_E0403"]);
    }

    #[test]
    fn test_import_unresolved_is_silent() {
        let mut ctx = Ctx::silent();
        run_import("import nowhere", &mut ctx);
        assert!(ctx.reporter.codes().is_empty());
    }
}
