//! Interactive parse loop.
//!
//! Lines accumulate until their brackets balance and they end in `;`
//! or `}`, then the whole chunk parses as a statement block in a scope
//! that persists across entries. Each chunk gets its own `<repl:N>`
//! source name so diagnostics render the right line.

use crate::parse::Ctx;
use crate::scope::ScopeKind;
use crate::token::TokenKind;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};

enum CmdResult {
    Exit,
    Continue,
}

fn try_command(line: &str, ctx: &mut Ctx) -> Option<CmdResult> {
    match line.trim() {
        "" => Some(CmdResult::Continue),
        "help" => {
            println!("help  - show this help");
            println!("scope - list the names declared so far");
            println!("q     - leave");
            Some(CmdResult::Continue)
        }
        "q" | "quit" | "exit" => Some(CmdResult::Exit),
        "scope" => {
            for (name, symbols) in ctx.table.cur_scope().names() {
                println!("{} ({})", name, symbols.len());
            }
            Some(CmdResult::Continue)
        }
        _ => None,
    }
}

/// True once every bracket opened in `text` is closed again and the
/// text ends in a statement or block terminator.
fn is_complete(text: &str, ctx: &mut Ctx) -> bool {
    let was_silent = ctx.reporter.is_silent();
    ctx.reporter.set_silent(true);
    let buffer = crate::lexer::tokenize(text, "<repl>", &mut ctx.reporter);
    ctx.reporter.set_silent(was_silent);
    let mut depth = 0i32;
    for token in buffer.iter() {
        match token.kind {
            TokenKind::Open | TokenKind::IndexOpen | TokenKind::BlockOpen => depth += 1,
            TokenKind::Close | TokenKind::IndexClose | TokenKind::BlockClose => depth -= 1,
            _ => {}
        }
    }
    if depth > 0 {
        return false;
    }
    matches!(
        buffer.last().map(|t| t.kind),
        Some(TokenKind::EndCmd) | Some(TokenKind::BlockClose) | None
    )
}

fn check_chunk(chunk: &str, entry: usize, ctx: &mut Ctx) {
    let filename = format!("<repl:{}>", entry);
    ctx.reporter.add_source(filename.clone(), chunk.to_string());
    let errors_before = ctx.reporter.error_count();
    let tokens = crate::lexer::tokenize(chunk, filename, &mut ctx.reporter).freeze();
    let node = crate::parse::flow::parse_block(&tokens, 0, ctx);
    if ctx.reporter.error_count() == errors_before {
        let echo = node.emit_cst();
        if !echo.is_empty() {
            println!("{}", echo);
        }
        let declared = ctx.table.cur_scope().names().count();
        println!("ok, {} name(s) in scope", declared);
    }
}

fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".cstc_history"))
}

pub fn main_loop() -> Result<()> {
    crate::report::install_render_hook();
    let mut rl = DefaultEditor::new()?;
    #[cfg(feature = "with-file-history")]
    let history = history_path();
    #[cfg(feature = "with-file-history")]
    if let Some(history) = &history {
        let _ = rl.load_history(history);
    }

    let mut ctx = Ctx::new();
    // one long-lived scope, so names survive between entries
    ctx.table.enter("repl", ScopeKind::Function);
    let mut pending = String::new();
    let mut entry = 0;

    loop {
        let prompt = if pending.is_empty() { ">> " } else { ".. " };
        match rl.readline(prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    if let Some(cmd) = try_command(&line, &mut ctx) {
                        match cmd {
                            CmdResult::Exit => break,
                            CmdResult::Continue => continue,
                        }
                    }
                }
                let _ = rl.add_history_entry(line.as_str());
                pending.push_str(&line);
                pending.push('\n');
                if !is_complete(&pending, &mut ctx) {
                    continue;
                }
                entry += 1;
                let chunk = std::mem::take(&mut pending);
                check_chunk(&chunk, entry, &mut ctx);
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {:?}", err);
                break;
            }
        }
    }

    #[cfg(feature = "with-file-history")]
    if let Some(history) = &history {
        let _ = rl.save_history(history);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(text: &str) -> bool {
        let mut ctx = Ctx::silent();
        is_complete(text, &mut ctx)
    }

    #[test]
    fn test_is_complete() {
        assert!(complete("int32 a = 1;"));
        assert!(complete("if a { delete a; }"));
        assert!(!complete("int32 a = "));
        assert!(!complete("if a {"));
        assert!(complete(""));
    }
}
