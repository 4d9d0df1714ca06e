//! Cross-module integration tests: whole programs through the real
//! tokenize → freeze → parse pipeline, asserting on the collected
//! diagnostic codes and counters.

mod linearity_tests;
mod parser_tests;

use crate::parse::Ctx;

/// Parse a whole program at module level with the reporter muted.
pub(crate) fn check_program(text: &str) -> Ctx {
    let mut ctx = Ctx::silent();
    ctx.reporter.add_source("<test>", text);
    let tokens = crate::lexer::tokenize(text, "<test>", &mut ctx.reporter).freeze();
    crate::parse::flow::parse_block(&tokens, 0, &mut ctx);
    ctx
}
