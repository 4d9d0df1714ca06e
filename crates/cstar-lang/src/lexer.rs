//! The tokenizer.
//!
//! One forward pass over the raw text that produces a [`TokenBuffer`]. The
//! lexer is deliberately dumb: it knows operators, literals, keywords and
//! comments, but nothing about the grammar. It does raise a few diagnostics
//! of its own, for problems that are invisible once the text has become
//! tokens: comment nesting, merge-conflict markers, overlong lines.

use crate::error::{SyntaxError, Warning};
use crate::report::Reporter;
use crate::stream::TokenBuffer;
use crate::token::{Pos, Token, TokenKind};
use cstar_val::CstStr;
use std::rc::Rc;

/// Kind of a one-character token, or `None` when `c` starts something longer.
fn single_kind(c: u8) -> TokenKind {
    match c {
        b';' => TokenKind::EndCmd,

        b'=' => TokenKind::Set,
        b'+' => TokenKind::Add,
        b'-' => TokenKind::Sub,
        b'*' => TokenKind::Mul,
        b'/' => TokenKind::Div,
        b'%' => TokenKind::Mod,
        b'~' => TokenKind::Neg,
        b'&' => TokenKind::And,
        b'|' => TokenKind::Or,
        b'^' => TokenKind::Xor,

        b'<' => TokenKind::Lt,
        b'>' => TokenKind::Gt,

        b'?' => TokenKind::Question,
        b':' => TokenKind::In,
        b'#' => TokenKind::Ref,
        b'.' => TokenKind::Access,
        b',' => TokenKind::Comma,

        b'(' => TokenKind::Open,
        b')' => TokenKind::Close,
        b'{' => TokenKind::BlockOpen,
        b'}' => TokenKind::BlockClose,
        b'[' => TokenKind::IndexOpen,
        b']' => TokenKind::IndexClose,
        _ => TokenKind::None,
    }
}

/// Kind of a two-character token, or `None`.
fn double_kind(a: u8, b: u8) -> TokenKind {
    match (a, b) {
        (b'+', b'+') => TokenKind::Inc,
        (b'-', b'-') => TokenKind::Dec,
        (b'*', b'*') => TokenKind::Pow,

        (b'<', b'<') => TokenKind::Shl,
        (b'>', b'>') => TokenKind::Shr,
        (b'!', b'>') => TokenKind::Lshr,

        (b'=', b'=') => TokenKind::Eq,
        (b'!', b'=') => TokenKind::Neq,
        (b'>', b'=') => TokenKind::Geq,
        (b'<', b'=') => TokenKind::Leq,

        (b'<', b'-') => TokenKind::Unpack,
        (b':', b':') => TokenKind::SubNs,
        (b'.', b'.') => TokenKind::DotDot,
        _ => TokenKind::None,
    }
}

/// Kind of a buffered word: literal, keyword, or plain identifier.
fn word_kind(w: &str) -> TokenKind {
    if w == "true" || w == "false" {
        return TokenKind::Bool;
    }
    if !w.is_empty() && w.bytes().all(|b| b.is_ascii_digit()) {
        return TokenKind::Int;
    }
    if let Some(digits) = w.strip_prefix("0x") {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return TokenKind::Hex;
        }
    }
    if let Some(digits) = w.strip_prefix("0b") {
        if !digits.is_empty() && digits.bytes().all(|b| b == b'0' || b == b'1') {
            return TokenKind::Binary;
        }
    }

    match w {
        "as" => TokenKind::As,
        "and" => TokenKind::LAnd,
        "or" => TokenKind::LOr,
        "not" => TokenKind::Not,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "continue" => TokenKind::Continue,
        "break" => TokenKind::Break,
        "loop" => TokenKind::Loop,
        "namespace" => TokenKind::Namespace,
        "import" => TokenKind::Import,
        "include" => TokenKind::Include,
        "macro" => TokenKind::Macro,
        "friend" => TokenKind::Friend,
        "final" => TokenKind::Final,
        "noimpl" => TokenKind::NoImpl,
        "class" => TokenKind::Class,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "mut" => TokenKind::Mut,
        "const" => TokenKind::Const,
        "static" => TokenKind::Static,
        "abstract" => TokenKind::Abstract,
        "virtual" => TokenKind::Virtual,
        "public" => TokenKind::Public,
        "private" => TokenKind::Private,
        "protected" => TokenKind::Protected,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "throw" => TokenKind::Throw,
        "new" => TokenKind::New,
        "delete" => TokenKind::Delete,
        "operator" => TokenKind::Operator,
        "finally" => TokenKind::Finally,
        "nowrap" => TokenKind::NoWrap,
        "null" => TokenKind::Null,
        "x" => TokenKind::X,
        _ => TokenKind::Ident,
    }
}

pub struct Lexer<'a, 'r> {
    text: &'a str,
    bytes: &'a [u8],
    filename: Rc<CstStr>,
    reporter: &'r mut Reporter,
    tokens: TokenBuffer,
    i: usize,
    line: usize,
    line_start: usize,
    word_start: Option<usize>,
    /// nesting depth of multiline comments, 0 = not inside one
    ml_depth: u32,
    /// position of the outermost `/*`, for the unclosed warning
    ml_open: Option<Pos>,
    /// byte spans of tokens ending past the line-length limit, per line
    long_spans: Vec<(usize, usize)>,
}

/// Tokenize `text`, reporting lexical diagnostics as they are found.
pub fn tokenize(text: &str, filename: impl Into<CstStr>, reporter: &mut Reporter) -> TokenBuffer {
    Lexer::new(text, filename, reporter).run()
}

impl<'a, 'r> Lexer<'a, 'r> {
    pub fn new(text: &'a str, filename: impl Into<CstStr>, reporter: &'r mut Reporter) -> Self {
        Lexer {
            text,
            bytes: text.as_bytes(),
            filename: Rc::new(filename.into()),
            reporter,
            tokens: TokenBuffer::new(),
            i: 0,
            line: 1,
            line_start: 0,
            word_start: None,
            ml_depth: 0,
            ml_open: None,
            long_spans: Vec::new(),
        }
    }

    fn col_of(&self, idx: usize) -> usize {
        idx - self.line_start + 1
    }

    fn pos_at(&self, start: usize, len: usize) -> Pos {
        Pos::new(self.line, self.col_of(start), start, len)
    }

    fn peek(&self, ahead: usize) -> u8 {
        self.bytes.get(self.i + ahead).copied().unwrap_or(0)
    }

    fn push(&mut self, kind: TokenKind, start: usize, len: usize) {
        let max = crate::max_line_len();
        if max > 0 && self.col_of(start + len) > max + 1 {
            self.long_spans.push((start, start + len));
        }
        let text = &self.text[start..start + len];
        self.tokens
            .push(Token::new(kind, self.pos_at(start, len), text, self.filename.clone()));
    }

    fn flush_word(&mut self) {
        if let Some(start) = self.word_start.take() {
            let word = &self.text[start..self.i];
            self.push(word_kind(word), start, word.len());
        }
    }

    /// Called with `self.i` on a `\n`.
    fn newline(&mut self) {
        let max = crate::max_line_len();
        if !self.long_spans.is_empty() {
            let first = self.long_spans[0].0;
            let last = self.long_spans[self.long_spans.len() - 1].1;
            let span = self.pos_at(first, last.saturating_sub(first).max(1));
            let len = self.i - self.line_start;
            self.reporter.report(
                &self.filename,
                Warning::LineTooLong {
                    len,
                    max,
                    span: crate::error::pos_to_span(&span),
                },
            );
            self.reporter.note_span(
                &self.filename,
                &span,
                format!(
                    "current max length is {}, you can adjust this with the --max-line-len argument",
                    max
                ),
            );
            self.long_spans.clear();
        }
        self.line += 1;
        self.line_start = self.i + 1;
    }

    /// Consume a quoted literal starting at the opening quote. The token text
    /// keeps its quotes; escape pairs are carried through verbatim for the
    /// parser to interpret.
    fn quoted(&mut self, quote: u8, kind: TokenKind) {
        let start = self.i;
        self.i += 1;
        while self.i < self.bytes.len() {
            match self.bytes[self.i] {
                b'\\' => self.i += 2,
                b'\n' => break,
                c if c == quote => {
                    self.i += 1;
                    self.push(kind, start, self.i - start);
                    return;
                }
                _ => self.i += 1,
            }
        }
        self.reporter.report(
            &self.filename,
            SyntaxError::UnterminatedLiteral {
                span: crate::error::pos_to_span(&self.pos_at(start, 1)),
            },
        );
        // take what we got, so the parser sees something
        let len = self.i.min(self.bytes.len()) - start;
        self.push(kind, start, len);
    }

    /// Skip an unresolved merge conflict: everything from `<<<<<<<` through
    /// the end of the `>>>>>>>` line. Returns false when the file ends before
    /// the conflict does.
    fn skip_merge_conflict(&mut self) -> bool {
        self.reporter.report(
            &self.filename,
            SyntaxError::MergeConflict {
                span: crate::error::pos_to_span(&self.pos_at(self.i, 7)),
            },
        );
        loop {
            // advance to the end of the current line
            while self.i < self.bytes.len() && self.bytes[self.i] != b'\n' {
                self.i += 1;
            }
            if self.i >= self.bytes.len() {
                return false;
            }
            let line_was_end = self.text[self.line_start..self.i].starts_with(">>>>>>>");
            self.newline();
            self.i += 1;
            if line_was_end {
                return true;
            }
        }
    }

    pub fn run(mut self) -> TokenBuffer {
        while self.i < self.bytes.len() {
            let c = self.bytes[self.i];

            if c == b'\n' {
                self.flush_word();
                self.newline();
                self.i += 1;
                continue;
            }

            // inside a multiline comment only nesting markers matter
            if self.ml_depth > 0 {
                if c == b'/' && self.peek(1) == b'*' {
                    self.ml_depth += 1;
                    self.i += 2;
                } else if c == b'*' && self.peek(1) == b'/' {
                    self.ml_depth -= 1;
                    self.i += 2;
                } else {
                    self.i += 1;
                }
                continue;
            }

            // literals come first: a // or /* inside a string is text
            if c == b'"' {
                self.flush_word();
                self.quoted(b'"', TokenKind::Str);
                continue;
            }
            if c == b'\'' {
                self.flush_word();
                self.quoted(b'\'', TokenKind::Char);
                continue;
            }

            if c == b'/' && self.peek(1) == b'/' {
                self.flush_word();
                while self.i < self.bytes.len() && self.bytes[self.i] != b'\n' {
                    self.i += 1;
                }
                continue;
            }
            if c == b'/' && self.peek(1) == b'*' {
                self.flush_word();
                self.ml_depth = 1;
                self.ml_open = Some(self.pos_at(self.i, 2));
                self.i += 2;
                continue;
            }
            if c == b'*' && self.peek(1) == b'/' {
                self.flush_word();
                self.reporter.report(
                    &self.filename,
                    SyntaxError::UnopenedComment {
                        span: crate::error::pos_to_span(&self.pos_at(self.i, 2)),
                    },
                );
                self.i += 2;
                continue;
            }

            if c == b'<' && self.text[self.i..].starts_with("<<<<<<< HEAD") {
                if !self.skip_merge_conflict() {
                    return TokenBuffer::new();
                }
                continue;
            }

            if c == b'.' && self.peek(1) == b'.' && self.peek(2) == b'.' {
                self.flush_word();
                self.push(TokenKind::DotDotDot, self.i, 3);
                self.i += 3;
                continue;
            }

            let dk = double_kind(c, self.peek(1));
            if dk != TokenKind::None {
                self.flush_word();
                self.push(dk, self.i, 2);
                self.i += 2;
                continue;
            }

            let sk = single_kind(c);
            if sk != TokenKind::None {
                self.flush_word();
                self.push(sk, self.i, 1);
                self.i += 1;
                continue;
            }

            if c == b' ' || c == b'\t' || c == b'\r' {
                self.flush_word();
            } else if self.word_start.is_none() {
                self.word_start = Some(self.i);
            }
            self.i += 1;
        }

        self.flush_word();
        self.newline(); // flush a pending line-length warning on the last line
        if self.ml_depth > 0 {
            if let Some(open) = self.ml_open.take() {
                self.reporter.report(
                    &self.filename,
                    Warning::UnclosedComment {
                        span: crate::error::pos_to_span(&open),
                    },
                );
            }
        }
        if self.tokens.is_empty() && !self.reporter.is_silent() {
            eprintln!("WARNING: {} appears to be empty.", self.filename);
        }
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> (Vec<TokenKind>, Vec<String>) {
        let mut reporter = Reporter::silent();
        let buf = tokenize(text, "<test>", &mut reporter);
        let kinds = buf.iter().map(|t| t.kind).collect();
        (kinds, reporter.codes().to_vec())
    }

    use TokenKind::*;

    #[test]
    fn test_declaration_tokens() {
        let (kinds, codes) = lex("mut int32 a = 4;");
        assert_eq!(kinds, vec![Mut, Ident, Ident, Set, Int, EndCmd]);
        assert!(codes.is_empty());
    }

    #[test]
    fn test_operators_longest_first() {
        let (kinds, _) = lex("a ** b << c !> d <- e :: f ... g .. h . i");
        assert_eq!(
            kinds,
            vec![
                Ident, Pow, Ident, Shl, Ident, Lshr, Ident, Unpack, Ident, SubNs, Ident,
                DotDotDot, Ident, DotDot, Ident, Access, Ident
            ]
        );
    }

    #[test]
    fn test_tokens_without_spaces() {
        let (kinds, _) = lex("f(a,b)*2;");
        assert_eq!(kinds, vec![Ident, Open, Ident, Comma, Ident, Close, Mul, Int, EndCmd]);
    }

    #[test]
    fn test_number_literals() {
        let (kinds, _) = lex("12 0xfF 0b101 0xg 0b2");
        assert_eq!(kinds, vec![Int, Hex, Binary, Ident, Ident]);
    }

    #[test]
    fn test_keywords_and_reserved_words() {
        let (kinds, _) = lex("if else not and or as null nowrap x");
        assert_eq!(kinds, vec![If, Else, Not, LAnd, LOr, As, Null, NoWrap, X]);
        // these have kinds reserved but are still plain identifiers
        let (kinds, _) = lex("loop macro friend final");
        assert_eq!(kinds, vec![Ident, Ident, Ident, Ident]);
    }

    #[test]
    fn test_string_keeps_quotes_and_hides_comments() {
        let mut reporter = Reporter::silent();
        let buf = tokenize("a = \"url: //host/*x*/\";", "<test>", &mut reporter);
        let texts: Vec<String> = buf.iter().map(|t| t.text.to_string()).collect();
        assert_eq!(texts, vec!["a", "=", "\"url: //host/*x*/\"", ";"]);
        assert_eq!(buf.get(2).unwrap().kind, Str);
        assert!(reporter.codes().is_empty());
    }

    #[test]
    fn test_char_literal_with_escape() {
        let (kinds, codes) = lex(r"c = '\n';");
        assert_eq!(kinds, vec![Ident, Set, Char, EndCmd]);
        assert!(codes.is_empty());
    }

    #[test]
    fn test_unterminated_string_reports() {
        let (_, codes) = lex("a = \"oops\nnext;");
        assert_eq!(codes, vec!["cst_syntax_E0021".to_string()]);
    }

    #[test]
    fn test_line_comment_swallows_rest_of_line() {
        let (kinds, _) = lex("a; // b c d\ne;");
        assert_eq!(kinds, vec![Ident, EndCmd, Ident, EndCmd]);
    }

    #[test]
    fn test_nested_multiline_comment() {
        let (kinds, codes) = lex("a /* x /* y */ z */ b");
        assert_eq!(kinds, vec![Ident, Ident]);
        assert!(codes.is_empty());
    }

    #[test]
    fn test_unclosed_comment_warns_at_opener() {
        let mut reporter = Reporter::silent();
        let buf = tokenize("a; /* rest", "<test>", &mut reporter);
        assert_eq!(buf.len(), 2);
        assert_eq!(reporter.codes(), &["cst_warn_W0007".to_string()]);
        assert_eq!(reporter.warning_count(), 1);
    }

    #[test]
    fn test_unopened_comment_is_an_error() {
        let (kinds, codes) = lex("a */ b;");
        assert_eq!(kinds, vec![Ident, Ident, EndCmd]);
        assert_eq!(codes, vec!["cst_syntax_E0013".to_string()]);
    }

    #[test]
    fn test_merge_conflict_reports_and_skips() {
        let text = "a;\n<<<<<<< HEAD\nmine();\n=======\ntheirs();\n>>>>>>> branch\nb;\n";
        let (kinds, codes) = lex(text);
        assert_eq!(codes, vec!["cst_syntax_E0014".to_string()]);
        assert_eq!(kinds, vec![Ident, EndCmd, Ident, EndCmd]);
    }

    #[test]
    fn test_merge_conflict_without_end_drops_everything() {
        let text = "a;\n<<<<<<< HEAD\nmine();\n";
        let mut reporter = Reporter::silent();
        let buf = tokenize(text, "<test>", &mut reporter);
        assert!(buf.is_empty());
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn test_long_line_warns_once_with_note() {
        let long = format!("a = {};", "b".repeat(200));
        let (_, codes) = lex(&long);
        assert_eq!(
            codes,
            vec!["cst_warn_W0006".to_string(), "cst_note".to_string()]
        );
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let mut reporter = Reporter::silent();
        let buf = tokenize("ab cd\n efg", "<test>", &mut reporter);
        let t0 = buf.get(0).unwrap();
        assert_eq!((t0.pos.line, t0.pos.col, t0.pos.at, t0.pos.len), (1, 1, 0, 2));
        let t1 = buf.get(1).unwrap();
        assert_eq!((t1.pos.line, t1.pos.col, t1.pos.at), (1, 4, 3));
        let t2 = buf.get(2).unwrap();
        assert_eq!((t2.pos.line, t2.pos.col, t2.pos.at, t2.pos.len), (2, 2, 7, 3));
    }
}
