//! The single-pass recursive parser.
//!
//! Every parse function shares one protocol: it takes a token window, a
//! recursion depth, the parsing context and the type the surrounding
//! code expects, and answers `None` when the window does not have its
//! shape. `None` is not an error; the dispatcher simply tries the next
//! alternative. A function that recognizes its shape is committed: it
//! reports whatever is wrong inside the window itself and returns a
//! node, falling back to the [`Node::Empty`] poison when the pieces are
//! too broken to build from.
//!
//! The statement and expression dispatchers order their alternatives so
//! the first match is the right one: statements from imports down to
//! bare expressions, expressions from the loosest-binding operator tier
//! down to literals and names.

pub mod flow;
pub mod func;
pub mod import;
pub mod literal;
pub mod math;
pub mod namespace;
pub mod types;
pub mod var;

use crate::ast::Node;
use crate::error::{pos_to_span, stream_span, ModuleError, SyntaxError};
use crate::report::Reporter;
use crate::scope::{Caps, SymbolTable};
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use cstar_val::{CstStr, CstType, ATOMIC_TYPES};

/// Recursion cutoff; anything deeper is a degenerate input.
pub const MAX_DEPTH: usize = 500;

/// Everything a parse function needs besides the tokens: the symbol
/// table it resolves against and the reporter its diagnostics go to.
pub struct Ctx {
    pub table: SymbolTable,
    pub reporter: Reporter,
}

impl Ctx {
    pub fn new() -> Self {
        Ctx {
            table: SymbolTable::new(),
            reporter: Reporter::new(),
        }
    }

    pub fn silent() -> Self {
        Ctx {
            table: SymbolTable::new(),
            reporter: Reporter::silent(),
        }
    }

    /// Capabilities of the scope being parsed into.
    pub(crate) fn caps(&self) -> Caps {
        self.table.cur_scope().caps
    }

    /// The block-type word for capability errors.
    pub(crate) fn kind(&self) -> String {
        let sid = self.table.cur_sid().clone();
        self.table.kind_name(&sid).to_string()
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared shape of every parse alternative.
pub type ParseFn = fn(&TokenStream, usize, &mut Ctx, &CstType) -> Option<Node>;

/// Try the alternatives in order; the first one that recognizes the
/// window wins.
pub fn parse_one_of(
    tokens: &TokenStream,
    fns: &[ParseFn],
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    for f in fns {
        if let Some(node) = f(tokens, depth, ctx, expected) {
            return Some(node);
        }
    }
    None
}

const EXPR_ALTS: &[ParseFn] = &[
    math::parse_binary,
    math::parse_cast,
    literal::parse_float,
    literal::parse_int,
    literal::parse_bool,
    literal::parse_char,
    literal::parse_str,
    literal::parse_null,
    literal::parse_array,
    math::parse_unary,
    math::parse_nowrap,
    math::parse_length,
    math::parse_check,
    math::parse_index,
    func::parse_call,
    math::parse_group,
    math::parse_method_probe,
    var::parse_access,
];

/// Expression dispatcher. Operator tiers go first, loosest binding
/// first, so the top-level split of the window is always the operator
/// that binds least tightly.
pub fn parse_expr(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Option<Node> {
    if tokens.is_empty() {
        return None;
    }
    if depth > MAX_DEPTH {
        report_first(
            ctx,
            tokens,
            SyntaxError::ExpressionExpected {
                hint: "The expression nests too deeply".into(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    parse_one_of(tokens, EXPR_ALTS, depth + 1, ctx, expected)
}

const STMT_ALTS: &[ParseFn] = &[
    import::parse_import,
    namespace::parse_namespace,
    func::parse_def,
    flow::parse_if,
    flow::parse_return,
    var::parse_delete,
    flow::parse_todo,
    var::parse_init,
    var::parse_decl,
    var::parse_assign,
];

/// Statement dispatcher. Always yields a node; a window no alternative
/// recognizes falls through to the expression parser and finally to an
/// "expression expected" poison.
pub fn parse_statement(tokens: &TokenStream, depth: usize, ctx: &mut Ctx) -> Node {
    if depth > MAX_DEPTH {
        report_first(
            ctx,
            tokens,
            SyntaxError::ExpressionExpected {
                hint: "The statement nests too deeply".into(),
                span: stream_span(tokens),
            },
        );
        return Node::Empty;
    }
    if let Some(node) = parse_one_of(tokens, STMT_ALTS, depth + 1, ctx, &CstType::unknown()) {
        return node;
    }
    if let Some(node) = parse_expr(tokens, depth + 1, ctx, &CstType::unknown()) {
        return flow::discarded(node, ctx);
    }

    // nothing matched; pick the most telling complaint
    if tokens.iter().any(|t| t.kind == TokenKind::Import) {
        report_first(
            ctx,
            tokens,
            ModuleError::UnexpectedImport { span: stream_span(tokens) },
        );
    } else if tokens.kind(0).is_modifier() {
        let modifier = tokens.first().map(|t| t.text.to_string()).unwrap_or_default();
        report_first(
            ctx,
            tokens,
            SyntaxError::ModifierNotAllowed {
                modifier,
                span: stream_span(tokens),
            },
        );
    } else {
        report_first(
            ctx,
            tokens,
            SyntaxError::ExpressionExpected {
                hint: "This does not form a statement or expression".into(),
                span: stream_span(tokens),
            },
        );
    }
    Node::Empty
}

/// Parse a sub-window that must hold an expression, poisoning with a
/// report when it does not. `anchor` places the diagnostic when the
/// window is empty.
pub(crate) fn expr_or_report(
    tokens: &TokenStream,
    anchor: &Token,
    depth: usize,
    ctx: &mut Ctx,
    expected: &CstType,
) -> Node {
    if let Some(node) = parse_expr(tokens, depth, ctx, expected) {
        return node;
    }
    let span = match tokens.span() {
        Some(pos) => pos_to_span(&pos),
        None => pos_to_span(&anchor.pos),
    };
    let at = tokens.first().unwrap_or(anchor).clone();
    ctx.reporter.report_at(
        &at,
        SyntaxError::ExpressionExpected {
            hint: format!("Expected an expression near '{}'", anchor.text),
            span,
        },
    );
    Node::Empty
}

/// Report `err` anchored at the window's first token.
pub(crate) fn report_first(
    ctx: &mut Ctx,
    tokens: &TokenStream,
    err: impl Into<crate::error::CstError>,
) {
    if let Some(at) = tokens.first().cloned() {
        ctx.reporter.report_at(&at, err);
    } else {
        ctx.reporter.report(&CstStr::from("<empty>"), err);
    }
}

/// Read a (possibly `::`-qualified) name starting at `from`. Returns
/// the joined name and how many tokens it spans.
pub(crate) fn qualified_name(tokens: &TokenStream, from: usize) -> Option<(CstStr, usize)> {
    let first = tokens.get(from as isize)?;
    if first.kind != TokenKind::Ident {
        return None;
    }
    let mut name = first.text.to_string();
    let mut used = 1;
    while tokens.kind((from + used) as isize) == TokenKind::SubNs
        && tokens.kind((from + used + 1) as isize) == TokenKind::Ident
    {
        name.push_str("::");
        name.push_str(&tokens.get((from + used + 1) as isize)?.text);
        used += 2;
    }
    Some((CstStr::from(name), used))
}

/// Reject names that are not identifiers or that shadow a type name.
/// Reports and answers false on a bad name.
pub(crate) fn check_name(tok: &Token, ctx: &mut Ctx) -> bool {
    use crate::error::NameError;
    if tok.kind != TokenKind::Ident {
        let tok = tok.clone();
        ctx.reporter.report_at(
            &tok,
            NameError::InvalidName {
                name: tok.text.to_string(),
                span: pos_to_span(&tok.pos),
            },
        );
        return false;
    }
    let name = tok.text.as_str();
    if ATOMIC_TYPES.contains(&name) || matches!(name, "string" | "void") {
        let tok = tok.clone();
        ctx.reporter.report_at(
            &tok,
            NameError::UnsupportedName {
                name: tok.text.to_string(),
                span: pos_to_span(&tok.pos),
            },
        );
        return false;
    }
    true
}

/// Index of the closer matching the opener at `open`, if the window
/// contains it.
pub(crate) fn matching_close(tokens: &TokenStream, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in open..tokens.size() {
        let kind = tokens.kind(i as isize);
        if kind.is_opener() {
            depth += 1;
        } else if kind.is_closer() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the opener matching the closer at `close`.
pub(crate) fn matching_open(tokens: &TokenStream, close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close.min(tokens.size().saturating_sub(1))).rev() {
        let kind = tokens.kind(i as isize);
        if kind.is_closer() {
            depth += 1;
        } else if kind.is_opener() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
