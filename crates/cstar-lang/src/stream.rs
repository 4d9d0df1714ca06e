//! Shared-buffer token windows.
//!
//! The lexer fills a [`TokenBuffer`]; the module loader may still cut
//! directives out of it or splice included files into it. Once frozen, the
//! tokens become one immutable [`TokenStream`] backed by a reference-counted
//! vector, and every parser below the root works on cheap `(start, stop)`
//! windows of that same allocation. Slicing never copies tokens.

use crate::token::{Token, TokenKind};
use std::fmt;
use std::rc::Rc;

/// Mutable token sequence, produced by the lexer and edited by the module
/// loader before parsing starts.
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        TokenBuffer { tokens: Vec::new() }
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx)
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Remove the tokens in `from..to` (clamped to the buffer).
    pub fn cut(&mut self, from: usize, to: usize) {
        let to = to.min(self.tokens.len());
        if from >= to {
            return;
        }
        self.tokens.drain(from..to);
    }

    /// Splice `spliced` into the buffer at `at`, tagging every inserted token
    /// with the include directive `origin` so diagnostics can point back to
    /// the include site. Tokens that already carry a tag keep it; nested
    /// includes report their innermost origin.
    pub fn include(&mut self, at: usize, spliced: Vec<Token>, origin: Rc<Token>) {
        let at = at.min(self.tokens.len());
        let tagged = spliced.into_iter().map(|mut t| {
            if t.included.is_none() {
                t.included = Some(origin.clone());
            }
            t
        });
        self.tokens.splice(at..at, tagged);
    }

    /// Freeze the buffer into an immutable stream covering all tokens.
    pub fn freeze(self) -> TokenStream {
        let len = self.tokens.len();
        TokenStream {
            tokens: Rc::new(self.tokens),
            start: 0,
            stop: len,
        }
    }
}

impl From<Vec<Token>> for TokenBuffer {
    fn from(tokens: Vec<Token>) -> Self {
        TokenBuffer { tokens }
    }
}

/// A structural problem found while scanning for a depth-zero separator.
///
/// Searches keep going after recording a fault so that one stray bracket does
/// not hide every later diagnostic in the statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFault {
    /// An opener was closed by the wrong kind of closer, e.g. `(a]`.
    Mismatched { open: Token, close: Token },
    /// A closer with no opener before it in the window, e.g. `a)`.
    Unopened { close: Token },
    /// An opener never closed inside the window, e.g. `(a`.
    Unclosed { open: Token },
    /// An empty segment between two separators where one was not allowed,
    /// e.g. the second comma of `f(a,,b)`.
    EmptySegment { sep: Token },
}

/// Result of a bracket-aware separator search over a [`TokenStream`].
#[derive(Debug, Clone)]
pub struct Match {
    found: bool,
    at: usize,
    on: TokenStream,
}

impl Match {
    fn hit(at: usize, on: &TokenStream) -> Self {
        Match { found: true, at, on: on.clone() }
    }

    fn miss(on: &TokenStream) -> Self {
        Match { found: false, at: on.size(), on: on.clone() }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    /// Window-relative index of the separator. When nothing was found this is
    /// one past the end, so [`Match::before`] covers the whole window and
    /// [`Match::after`] is empty.
    pub fn at(&self) -> usize {
        self.at
    }

    pub fn token(&self) -> Option<&Token> {
        if self.found {
            self.on.get(self.at as isize)
        } else {
            None
        }
    }

    /// Everything before the separator.
    pub fn before(&self) -> TokenStream {
        self.on.slice(0, self.at as isize)
    }

    /// Everything after the separator.
    pub fn after(&self) -> TokenStream {
        self.on.slice(self.at as isize + 1, self.on.size() as isize)
    }

    /// Everything up to and including the separator.
    pub fn through(&self) -> TokenStream {
        self.on.slice(0, self.at as isize + 1)
    }
}

/// An immutable window `[start, stop)` over a shared token vector.
///
/// All indices taken by the accessors are window-relative; negative values
/// count from the back, so `-1` is the last token of the window.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Rc<Vec<Token>>,
    start: usize,
    stop: usize,
}

impl TokenStream {
    pub fn new(tokens: Rc<Vec<Token>>, start: usize, stop: usize) -> Self {
        let stop = stop.min(tokens.len());
        let start = start.min(stop);
        TokenStream { tokens, start, stop }
    }

    /// An empty stream with no backing buffer to speak of.
    pub fn empty() -> Self {
        TokenStream { tokens: Rc::new(Vec::new()), start: 0, stop: 0 }
    }

    pub fn size(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Map a window-relative index (negative counts from the back) to an
    /// absolute index into the shared buffer.
    fn resolve(&self, idx: isize) -> Option<usize> {
        let size = self.size() as isize;
        let idx = if idx < 0 { idx + size } else { idx };
        if idx < 0 || idx >= size {
            return None;
        }
        Some(self.start + idx as usize)
    }

    pub fn get(&self, idx: isize) -> Option<&Token> {
        self.resolve(idx).map(|i| &self.tokens[i])
    }

    /// The kind at `idx`, or [`TokenKind::None`] when the index is outside
    /// the window. Lets parsers probe shapes without length checks.
    pub fn kind(&self, idx: isize) -> TokenKind {
        self.get(idx).map(|t| t.kind).unwrap_or(TokenKind::None)
    }

    pub fn first(&self) -> Option<&Token> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&Token> {
        self.get(-1)
    }

    /// A sub-window `[from, to)` of this window. Negative indices count from
    /// the back; out-of-range bounds are clamped rather than panicking, so a
    /// slice past the end is simply empty.
    pub fn slice(&self, from: isize, to: isize) -> TokenStream {
        let size = self.size() as isize;
        let from = if from < 0 { from + size } else { from }.clamp(0, size) as usize;
        let to = if to < 0 { to + size } else { to }.clamp(0, size) as usize;
        let start = self.start + from;
        let stop = self.start + to.max(from);
        TokenStream { tokens: self.tokens.clone(), start, stop }
    }

    /// The window without its first `n` tokens.
    pub fn skip(&self, n: isize) -> TokenStream {
        self.slice(n, self.size() as isize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens[self.start..self.stop].iter()
    }

    /// Source range covered by the window, from the first token to the last.
    pub fn span(&self) -> Option<crate::token::Pos> {
        let first = self.first()?;
        let last = self.last()?;
        Some(first.pos.to(&last.pos))
    }

    /// Scan forward for the first separator at bracket depth zero.
    ///
    /// Openers push onto a bracket stack and closers pop it; a separator only
    /// matches while the stack is empty. A closer that empties the stack is
    /// itself checked against `seps` after popping, so a `}` can terminate
    /// the block statement it closes. Bracket problems are recorded in the
    /// returned fault list and the scan continues past them.
    pub fn split_stack(&self, seps: &[TokenKind], from: usize) -> (Match, Vec<StreamFault>) {
        self.scan(seps, from, false)
    }

    /// Scan backward from the end for the last separator at bracket depth
    /// zero. Closers push and openers pop, mirroring [`Self::split_stack`].
    /// This is how a left-associative binary operator finds its top-level
    /// split point: the rightmost occurrence outside any brackets.
    pub fn rsplit_stack(&self, seps: &[TokenKind]) -> (Match, Vec<StreamFault>) {
        self.scan(seps, 0, true)
    }

    fn scan(&self, seps: &[TokenKind], from: usize, backward: bool) -> (Match, Vec<StreamFault>) {
        let mut stack: Vec<&Token> = Vec::new();
        let mut faults = Vec::new();
        let size = self.size();

        let indices: Box<dyn Iterator<Item = usize>> = if backward {
            Box::new((0..size).rev())
        } else {
            Box::new(from..size)
        };

        for i in indices {
            let t = match self.get(i as isize) {
                Some(t) => t,
                None => break,
            };
            if stack.is_empty() && seps.contains(&t.kind) {
                return (Match::hit(i, self), faults);
            }

            let pushes = if backward { t.kind.is_closer() } else { t.kind.is_opener() };
            let pops = if backward { t.kind.is_opener() } else { t.kind.is_closer() };

            if pushes {
                stack.push(t);
            } else if pops {
                match stack.pop() {
                    Some(open) => {
                        let pair = if backward { t.kind.closer() } else { open.kind.closer() };
                        let other = if backward { open.kind } else { t.kind };
                        if pair != Some(other) {
                            let (open, close) = if backward {
                                (t.clone(), open.clone())
                            } else {
                                (open.clone(), t.clone())
                            };
                            faults.push(StreamFault::Mismatched { open, close });
                        }
                    }
                    None => {
                        if backward {
                            faults.push(StreamFault::Unclosed { open: t.clone() });
                        } else {
                            faults.push(StreamFault::Unopened { close: t.clone() });
                        }
                    }
                }
                // a closer can double as the separator of the block it ends
                if stack.is_empty() && seps.contains(&t.kind) {
                    return (Match::hit(i, self), faults);
                }
            }
        }

        while let Some(open) = stack.pop() {
            if backward {
                faults.push(StreamFault::Unopened { close: open.clone() });
            } else {
                faults.push(StreamFault::Unclosed { open: open.clone() });
            }
        }

        (Match::miss(self), faults)
    }

    /// Partition the window on depth-zero separators.
    ///
    /// With `allow_empty` the segments between adjacent separators may be
    /// empty and are silently dropped, so `,a,,b,` on `,` yields exactly
    /// `a` and `b`. Without it every empty segment is recorded as an
    /// [`StreamFault::EmptySegment`] anchored at its separator, and still
    /// dropped from the result.
    pub fn list(&self, seps: &[TokenKind], allow_empty: bool) -> (Vec<TokenStream>, Vec<StreamFault>) {
        let mut parts = Vec::new();
        let mut faults = Vec::new();
        let mut rest = self.clone();
        let mut prev_sep: Option<Token> = None;

        loop {
            let (m, mut sf) = rest.split_stack(seps, 0);
            faults.append(&mut sf);
            let segment = m.before();
            if segment.is_empty() {
                // a trailing empty segment anchors at the separator before it
                let anchor = m.token().cloned().or_else(|| prev_sep.clone());
                if !allow_empty {
                    if let Some(sep) = anchor {
                        faults.push(StreamFault::EmptySegment { sep });
                    }
                }
            } else {
                parts.push(segment);
            }
            if !m.found() {
                break;
            }
            prev_sep = m.token().cloned();
            rest = m.after();
        }

        (parts, faults)
    }
}

impl fmt::Display for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for t in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", t.text)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Pos;
    use cstar_val::CstStr;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, Pos::new(1, 1, 0, text.len()), text, Rc::new(CstStr::from("<test>")))
    }

    fn stream(kinds: &[(TokenKind, &str)]) -> TokenStream {
        let mut buf = TokenBuffer::new();
        for (k, s) in kinds {
            buf.push(tok(*k, s));
        }
        buf.freeze()
    }

    use TokenKind::*;

    #[test]
    fn test_slice_is_a_window_not_a_copy() {
        let ts = stream(&[(Ident, "a"), (Comma, ","), (Ident, "b"), (Comma, ","), (Ident, "c")]);
        let s = ts.slice(1, 4);
        assert_eq!(s.size(), 3);
        assert_eq!(s.kind(0), Comma);
        assert_eq!(s.kind(-1), Comma);
        // nested slices stay relative to the inner window
        let inner = s.slice(1, 2);
        assert_eq!(inner.size(), 1);
        assert_eq!(inner.to_string(), "b");
    }

    #[test]
    fn test_negative_indices_count_from_the_back() {
        let ts = stream(&[(Ident, "x"), (Set, "="), (Int, "1")]);
        assert_eq!(ts.kind(-1), Int);
        assert_eq!(ts.kind(-3), Ident);
        assert_eq!(ts.kind(-4), None);
        assert_eq!(ts.kind(3), None);
        assert_eq!(ts.slice(1, -1).to_string(), "=");
    }

    #[test]
    fn test_slice_clamps_out_of_range() {
        let ts = stream(&[(Ident, "a"), (Ident, "b")]);
        assert_eq!(ts.slice(0, 10).size(), 2);
        assert_eq!(ts.slice(5, 10).size(), 0);
        assert_eq!(ts.slice(1, 0).size(), 0);
    }

    #[test]
    fn test_split_stack_skips_bracketed_separators() {
        // f ( a , b ) , c
        let ts = stream(&[
            (Ident, "f"),
            (Open, "("),
            (Ident, "a"),
            (Comma, ","),
            (Ident, "b"),
            (Close, ")"),
            (Comma, ","),
            (Ident, "c"),
        ]);
        let (m, faults) = ts.split_stack(&[Comma], 0);
        assert!(faults.is_empty());
        assert!(m.found());
        assert_eq!(m.at(), 6);
        assert_eq!(m.before().to_string(), "f ( a , b )");
        assert_eq!(m.after().to_string(), "c");
    }

    #[test]
    fn test_rsplit_stack_finds_the_same_depth_zero_separator() {
        let ts = stream(&[
            (Open, "("),
            (Ident, "a"),
            (Comma, ","),
            (Ident, "b"),
            (Close, ")"),
            (Comma, ","),
            (Ident, "c"),
        ]);
        let (m, faults) = ts.rsplit_stack(&[Comma]);
        assert!(faults.is_empty());
        assert_eq!(m.at(), 5);
        assert_eq!(m.after().to_string(), "c");
    }

    #[test]
    fn test_separator_only_inside_brackets_is_not_found(){
        let ts = stream(&[(Open, "("), (Ident, "a"), (Comma, ","), (Ident, "b"), (Close, ")")]);
        let (m, faults) = ts.split_stack(&[Comma], 0);
        assert!(faults.is_empty());
        assert!(!m.found());
        assert_eq!(m.at(), ts.size());
        assert_eq!(m.before().size(), ts.size());
        assert_eq!(m.after().size(), 0);
    }

    #[test]
    fn test_closer_that_empties_the_stack_matches_as_separator() {
        // if c { y ; } z ;   — the `}` terminates the first statement
        let ts = stream(&[
            (If, "if"),
            (Ident, "c"),
            (BlockOpen, "{"),
            (Ident, "y"),
            (EndCmd, ";"),
            (BlockClose, "}"),
            (Ident, "z"),
            (EndCmd, ";"),
        ]);
        let (m, faults) = ts.split_stack(&[EndCmd, BlockClose], 0);
        assert!(faults.is_empty());
        assert_eq!(m.at(), 5);
        assert_eq!(m.through().to_string(), "if c { y ; }");
        assert_eq!(m.after().to_string(), "z ;");
    }

    #[test]
    fn test_mismatched_brackets_fault_and_continue() {
        // ( a ] , b
        let ts = stream(&[(Open, "("), (Ident, "a"), (IndexClose, "]"), (Comma, ","), (Ident, "b")]);
        let (m, faults) = ts.split_stack(&[Comma], 0);
        assert_eq!(faults.len(), 1);
        assert!(matches!(faults[0], StreamFault::Mismatched { .. }));
        // best-effort: the pop still happened, so the comma is at depth zero
        assert!(m.found());
        assert_eq!(m.at(), 3);
    }

    #[test]
    fn test_unopened_and_unclosed_faults() {
        let ts = stream(&[(Ident, "a"), (Close, ")")]);
        let (m, faults) = ts.split_stack(&[Comma], 0);
        assert!(!m.found());
        assert_eq!(faults, vec![StreamFault::Unopened { close: ts.get(1).unwrap().clone() }]);

        let ts = stream(&[(Open, "("), (Ident, "a")]);
        let (_, faults) = ts.split_stack(&[Comma], 0);
        assert_eq!(faults, vec![StreamFault::Unclosed { open: ts.get(0).unwrap().clone() }]);

        // mirrored roles when scanning backward
        let ts = stream(&[(Ident, "a"), (Close, ")")]);
        let (_, faults) = ts.rsplit_stack(&[Comma]);
        assert_eq!(faults, vec![StreamFault::Unopened { close: ts.get(1).unwrap().clone() }]);
    }

    #[test]
    fn test_rsplit_stack_finds_rightmost_operator() {
        // a - b - c   → split at the second minus
        let ts = stream(&[(Ident, "a"), (Sub, "-"), (Ident, "b"), (Sub, "-"), (Ident, "c")]);
        let (m, _) = ts.rsplit_stack(&[Sub]);
        assert_eq!(m.at(), 3);
        assert_eq!(m.before().to_string(), "a - b");
        assert_eq!(m.after().to_string(), "c");
    }

    #[test]
    fn test_rsplit_stack_skips_nested_operators() {
        // a + ( b + c )
        let ts = stream(&[
            (Ident, "a"),
            (Add, "+"),
            (Open, "("),
            (Ident, "b"),
            (Add, "+"),
            (Ident, "c"),
            (Close, ")"),
        ]);
        let (m, faults) = ts.rsplit_stack(&[Add]);
        assert!(faults.is_empty());
        assert_eq!(m.at(), 1);
    }

    #[test]
    fn test_list_drops_empty_segments_when_allowed() {
        // , a , , b ,
        let ts = stream(&[
            (Comma, ","),
            (Ident, "a"),
            (Comma, ","),
            (Comma, ","),
            (Ident, "b"),
            (Comma, ","),
        ]);
        let (parts, faults) = ts.list(&[Comma], true);
        assert!(faults.is_empty());
        let texts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_list_reports_empty_segments_when_forbidden() {
        let ts = stream(&[(Ident, "a"), (Comma, ","), (Comma, ","), (Ident, "b")]);
        let (parts, faults) = ts.list(&[Comma], false);
        assert_eq!(parts.len(), 2);
        assert_eq!(faults.len(), 1);
        assert!(matches!(faults[0], StreamFault::EmptySegment { .. }));
    }

    #[test]
    fn test_list_reports_trailing_empty_segment() {
        let ts = stream(&[(Ident, "a"), (Comma, ",")]);
        let (parts, faults) = ts.list(&[Comma], false);
        assert_eq!(parts.len(), 1);
        assert_eq!(faults.len(), 1);
        assert!(matches!(faults[0], StreamFault::EmptySegment { .. }));
    }

    #[test]
    fn test_list_respects_bracket_depth() {
        // a , f ( b , c ) , d
        let ts = stream(&[
            (Ident, "a"),
            (Comma, ","),
            (Ident, "f"),
            (Open, "("),
            (Ident, "b"),
            (Comma, ","),
            (Ident, "c"),
            (Close, ")"),
            (Comma, ","),
            (Ident, "d"),
        ]);
        let (parts, faults) = ts.list(&[Comma], false);
        assert!(faults.is_empty());
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].to_string(), "f ( b , c )");
    }

    #[test]
    fn test_buffer_cut_and_include() {
        let mut buf = TokenBuffer::new();
        for t in [(Import, "import"), (Ident, "io"), (EndCmd, ";"), (Ident, "x")] {
            buf.push(tok(t.0, t.1));
        }
        buf.cut(0, 3);
        assert_eq!(buf.len(), 1);

        let origin = Rc::new(tok(Include, "include"));
        buf.include(0, vec![tok(Ident, "y"), tok(EndCmd, ";")], origin);
        let ts = buf.freeze();
        assert_eq!(ts.to_string(), "y ; x");
        assert!(ts.get(0).unwrap().included.is_some());
        assert!(ts.get(2).unwrap().included.is_none());
    }
}
