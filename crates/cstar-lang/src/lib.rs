//! Front end of the C* compiler.
//!
//! The pipeline is tokenize → freeze → parse: the lexer fills a
//! [`stream::TokenBuffer`], the module loader splices includes and
//! loads imports, and the single-pass parser walks cheap windows of
//! the frozen stream while checking types and linear variable usage
//! as it goes. Everything it finds to complain about funnels through
//! one [`report::Reporter`].

pub mod ast;
pub mod error;
pub mod lexer;
pub mod module;
pub mod ops;
pub mod parse;
pub mod repl;
pub mod report;
pub mod scope;
pub mod stream;
pub mod token;
pub mod util;

#[cfg(test)]
mod tests;

pub use crate::module::ModuleGraph;
pub use crate::parse::Ctx;
pub use crate::report::Reporter;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Stop after rendering the first error instead of recovering.
static EXIT_ON_FIRST_ERROR: AtomicBool = AtomicBool::new(false);

/// Treat warnings as errors for the process exit status.
static PUNISH: AtomicBool = AtomicBool::new(false);

/// Longest source line before the lexer warns.
static MAX_LINE_LEN: AtomicUsize = AtomicUsize::new(100);

/// Fold constant expressions while parsing.
static FOLDING: AtomicBool = AtomicBool::new(true);

pub fn set_exit_on_first_error(on: bool) {
    EXIT_ON_FIRST_ERROR.store(on, Ordering::SeqCst);
}

pub fn exit_on_first_error() -> bool {
    EXIT_ON_FIRST_ERROR.load(Ordering::SeqCst)
}

pub fn set_punish(on: bool) {
    PUNISH.store(on, Ordering::SeqCst);
}

pub fn punish() -> bool {
    PUNISH.load(Ordering::SeqCst)
}

pub fn set_max_line_len(len: usize) {
    MAX_LINE_LEN.store(len, Ordering::SeqCst);
}

pub fn max_line_len() -> usize {
    MAX_LINE_LEN.load(Ordering::SeqCst)
}

pub fn set_folding(on: bool) {
    FOLDING.store(on, Ordering::SeqCst);
}

pub fn folding() -> bool {
    FOLDING.load(Ordering::SeqCst)
}

/// Parse `path` and everything it imports. The returned graph holds
/// every loaded module in dependency order; the flag says whether the
/// root file itself could be read.
pub fn check_file(
    path: impl AsRef<Path>,
    no_std_lang: bool,
    ctx: &mut Ctx,
) -> (ModuleGraph, bool) {
    let mut graph = ModuleGraph::new(no_std_lang);
    let found = graph.compile(path.as_ref(), ctx).is_some();
    (graph, found)
}

/// Parse a free-standing statement sequence in a scratch function
/// scope, the way the REPL does. Expressions are legal at the top
/// level and no end-of-scope sweep runs, so snippets need not consume
/// everything they declare.
pub fn check_snippet(text: &str, silent: bool) -> (ast::Node, Ctx) {
    let mut ctx = if silent { Ctx::silent() } else { Ctx::new() };
    ctx.reporter.add_source("<snippet>", text);
    let tokens = lexer::tokenize(text, "<snippet>", &mut ctx.reporter).freeze();
    ctx.table.enter("snippet", scope::ScopeKind::Function);
    let node = parse::flow::parse_block(&tokens, 0, &mut ctx);
    (node, ctx)
}

