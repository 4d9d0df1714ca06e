//! The diagnostic sink.
//!
//! Every error, warning and note the front end produces funnels through one
//! [`Reporter`]. It keeps the running counters for the final summary, knows
//! the full text of every loaded file so diagnostics render with source
//! snippets, and deduplicates bracket faults that several precedence tiers
//! would otherwise report for the same spot.

use crate::error::{pos_to_span, CstError, Note, SyntaxError, WithSource};
use crate::stream::StreamFault;
use crate::token::{Pos, Token};
use cstar_val::CstStr;
use miette::{MietteHandlerOpts, NamedSource, Report};
use std::collections::{HashMap, HashSet};

/// Install the miette handler that renders diagnostics with source snippets
/// and terminal links. Safe to call more than once.
pub fn install_render_hook() {
    miette::set_hook(Box::new(|_| {
        Box::new(MietteHandlerOpts::new().terminal_links(true).build())
    }))
    .ok();
}

#[derive(Default)]
pub struct Reporter {
    sources: HashMap<CstStr, String>,
    errors: usize,
    warnings: usize,
    silent: bool,
    codes: Vec<String>,
    seen_faults: HashSet<(&'static str, CstStr, usize)>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// A reporter that counts and records but prints nothing. Used by tests
    /// and by probing parses that may be retried.
    pub fn silent() -> Self {
        Reporter { silent: true, ..Reporter::default() }
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Register the full text of a file so diagnostics pointing into it can
    /// show the offending line.
    pub fn add_source(&mut self, filename: impl Into<CstStr>, text: impl Into<String>) {
        self.sources.insert(filename.into(), text.into());
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// The codes of every diagnostic reported so far, in order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Report a diagnostic anchored in `file`. Errors and warnings bump their
    /// counters; notes ride along uncounted. With the exit-on-first-error
    /// flag set the process stops right after rendering the first error.
    pub fn report(&mut self, file: &CstStr, err: impl Into<CstError>) {
        let err = err.into();
        let warning = err.is_warning();
        let advice = err.is_note();
        if let Some(code) = miette::Diagnostic::code(&err) {
            self.codes.push(code.to_string());
        }
        if warning {
            self.warnings += 1;
        } else if !advice {
            self.errors += 1;
        }
        self.render(file, err);
        if !warning && !advice && crate::exit_on_first_error() {
            std::process::exit(2);
        }
    }

    /// Report a diagnostic anchored at a token, adding an "included from
    /// here" note when the token was spliced in by an include directive.
    pub fn report_at(&mut self, at: &Token, err: impl Into<CstError>) {
        let included = at.included.clone();
        self.report(&at.filename, err);
        if let Some(origin) = included {
            self.note(&origin, "included from here");
        }
    }

    /// Attach a remark to an earlier diagnostic, pointing at `at`.
    pub fn note(&mut self, at: &Token, message: impl Into<String>) {
        self.note_span(&at.filename, &at.pos, message);
    }

    pub fn note_span(&mut self, file: &CstStr, pos: &Pos, message: impl Into<String>) {
        self.report(
            file,
            Note { message: message.into(), span: pos_to_span(pos) },
        );
    }

    /// Report the structural faults collected by a stream scan.
    ///
    /// The precedence tiers re-scan the same window once per operator set, so
    /// the same broken bracket surfaces many times; each fault is reported
    /// only the first time its span is seen.
    pub fn report_faults(&mut self, faults: &[StreamFault]) {
        for fault in faults {
            let (tag, anchor) = match fault {
                StreamFault::Mismatched { close, .. } => ("mismatched", close),
                StreamFault::Unopened { close } => ("unopened", close),
                StreamFault::Unclosed { open } => ("unclosed", open),
                StreamFault::EmptySegment { sep } => ("empty", sep),
            };
            let key = (tag, (*anchor.filename).clone(), anchor.pos.at);
            if !self.seen_faults.insert(key) {
                continue;
            }
            match fault {
                StreamFault::Mismatched { open, close } => {
                    self.report_at(
                        close,
                        SyntaxError::MismatchedBracket {
                            open: open.text.to_string(),
                            close: close.text.to_string(),
                            open_span: pos_to_span(&open.pos),
                            span: pos_to_span(&close.pos),
                        },
                    );
                }
                StreamFault::Unopened { close } => {
                    self.report_at(
                        close,
                        SyntaxError::UnopenedBracket {
                            close: close.text.to_string(),
                            span: pos_to_span(&close.pos),
                        },
                    );
                }
                StreamFault::Unclosed { open } => {
                    self.report_at(
                        open,
                        SyntaxError::UnclosedBracket {
                            open: open.text.to_string(),
                            span: pos_to_span(&open.pos),
                        },
                    );
                }
                StreamFault::EmptySegment { sep } => {
                    self.report_at(
                        sep,
                        SyntaxError::EmptySegment { span: pos_to_span(&sep.pos) },
                    );
                }
            }
        }
    }

    fn render(&self, file: &CstStr, err: CstError) {
        if self.silent {
            return;
        }
        let report = match self.sources.get(file) {
            Some(text) => Report::new(WithSource {
                source: NamedSource::new(file.as_str(), text.clone()),
                error: err,
            }),
            None => Report::new(err),
        };
        eprintln!("{:?}", report);
    }

    /// The trailing one-line summary, or `None` when nothing was reported.
    pub fn summary(&self) -> Option<String> {
        if self.errors == 0 && self.warnings == 0 {
            return None;
        }
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("1 {}", word)
            } else {
                format!("{} {}s", n, word)
            }
        };
        let line = match (self.errors, self.warnings) {
            (0, w) => format!("{} generated.", plural(w, "warning")),
            (e, 0) => format!("{} generated.", plural(e, "error")),
            (e, w) => format!("{}, {} generated.", plural(e, "error"), plural(w, "warning")),
        };
        Some(line)
    }

    pub fn print_summary(&self) {
        if let Some(line) = self.summary() {
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::span_from;
    use crate::error::NameError;
    use crate::stream::StreamFault;
    use crate::token::TokenKind;
    use std::rc::Rc;

    fn tok(kind: TokenKind, text: &str, at: usize) -> Token {
        Token::new(kind, Pos::new(1, at + 1, at, text.len()), text, Rc::new(CstStr::from("t.cst")))
    }

    #[test]
    fn test_counters_and_summary() {
        let mut r = Reporter::silent();
        assert!(r.summary().is_none());

        let file = CstStr::from("t.cst");
        r.report(&file, NameError::UnknownVariable { name: "x".into(), span: span_from(0, 1) });
        r.report(&file, crate::error::Warning::UnusedOutput { span: span_from(2, 1) });
        assert_eq!(r.error_count(), 1);
        assert_eq!(r.warning_count(), 1);
        assert_eq!(r.summary().as_deref(), Some("1 error, 1 warning generated."));
        assert_eq!(r.codes(), &["cst_name_E0201".to_string(), "cst_warn_W0004".to_string()]);
    }

    #[test]
    fn test_notes_do_not_count() {
        let mut r = Reporter::silent();
        let t = tok(TokenKind::Ident, "x", 0);
        r.note(&t, "declared here");
        assert_eq!(r.error_count(), 0);
        assert_eq!(r.warning_count(), 0);
        assert_eq!(r.codes(), &["cst_note".to_string()]);
    }

    #[test]
    fn test_same_bracket_fault_reports_once() {
        let mut r = Reporter::silent();
        let open = tok(TokenKind::Open, "(", 4);
        let fault = StreamFault::Unclosed { open };
        r.report_faults(std::slice::from_ref(&fault));
        r.report_faults(std::slice::from_ref(&fault));
        assert_eq!(r.error_count(), 1);
    }

    #[test]
    fn test_included_token_adds_a_note() {
        let mut r = Reporter::silent();
        let origin = Rc::new(tok(TokenKind::Include, "include", 0));
        let mut t = tok(TokenKind::Ident, "y", 9);
        t.included = Some(origin);
        r.report_at(&t, NameError::UnknownVariable { name: "y".into(), span: span_from(9, 1) });
        assert_eq!(r.error_count(), 1);
        assert_eq!(r.codes(), &["cst_name_E0201".to_string(), "cst_note".to_string()]);
    }
}
