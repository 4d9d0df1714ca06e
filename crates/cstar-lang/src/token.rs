use cstar_val::CstStr;
use std::fmt;
use std::rc::Rc;

/// Source position of a token: 1-based line, 1-based column, absolute
/// byte offset and byte length (offset + length drive span rendering).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
    pub at: usize,
    pub len: usize,
}

impl Pos {
    pub fn new(line: usize, col: usize, at: usize, len: usize) -> Self {
        Pos { line, col, at, len }
    }

    /// Covering position from self through `last`.
    pub fn to(&self, last: &Pos) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
            at: self.at,
            len: (last.at + last.len).saturating_sub(self.at),
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    // Specials
    None,
    Ident,
    Eof,
    EndCmd, // ;

    // Literals
    Int,
    Hex,
    Binary,
    Bool,
    Str,
    Char,
    Null,

    // Math
    Set, // =
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
    Pow, // **
    Inc, // ++
    Dec, // --
    Neg, // ~
    And, // &
    Or,  // |
    Xor, // ^
    Shl, // <<
    Shr, // >>
    Lshr, // !>

    // Logical
    LAnd, // and
    LOr,  // or
    Not,  // not

    // Comparison
    Eq,  // ==
    Neq, // !=
    Lt,  // <
    Gt,  // >
    Geq, // >=
    Leq, // <=

    // Flow / punctuation
    Question, // ?
    In,       // :
    Unpack,   // <-
    Ref,      // #
    SubNs,    // ::
    Access,   // .
    Comma,    // ,
    DotDot,   // ..
    DotDotDot, // ...

    // Brackets
    Open,       // (
    Close,      // )
    BlockOpen,  // {
    BlockClose, // }
    IndexOpen,  // [
    IndexClose, // ]

    // Keywords
    If,
    Else,
    For,
    While,
    Loop,
    Throw,
    Break,
    Continue,
    NoImpl,
    Return,
    As,
    Operator,
    Switch,
    Case,
    Finally,
    New,
    Delete,
    Import,
    Macro,
    Include,
    Class,
    Enum,
    Struct,
    Virtual,
    Abstract,
    Final,
    Namespace,
    Friend,
    Protected,
    Private,
    Static,
    Public,
    Mut,
    Const,
    NoWrap,
    X,
}

impl TokenKind {
    /// Closing counterpart of an opening bracket.
    pub fn closer(&self) -> Option<TokenKind> {
        match self {
            TokenKind::Open => Some(TokenKind::Close),
            TokenKind::BlockOpen => Some(TokenKind::BlockClose),
            TokenKind::IndexOpen => Some(TokenKind::IndexClose),
            _ => None,
        }
    }

    /// Opening counterpart of a closing bracket.
    pub fn opener(&self) -> Option<TokenKind> {
        match self {
            TokenKind::Close => Some(TokenKind::Open),
            TokenKind::BlockClose => Some(TokenKind::BlockOpen),
            TokenKind::IndexClose => Some(TokenKind::IndexOpen),
            _ => None,
        }
    }

    pub fn is_opener(&self) -> bool {
        self.closer().is_some()
    }

    pub fn is_closer(&self) -> bool {
        self.opener().is_some()
    }

    /// Declaration modifier keywords stripped before declaration parsing.
    pub fn is_modifier(&self) -> bool {
        matches!(self, TokenKind::Const | TokenKind::Mut | TokenKind::Static)
    }
}

/// One lexed token. `filename` owns the file the span points into;
/// `included` points at the include directive that spliced this token in
/// from another file, `expanded` is reserved for macro provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
    pub text: CstStr,
    pub filename: Rc<CstStr>,
    pub included: Option<Rc<Token>>,
    pub expanded: Option<Rc<Token>>,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos, text: impl Into<CstStr>, filename: Rc<CstStr>) -> Self {
        Token {
            kind,
            pos,
            text: text.into(),
            filename,
            included: None,
            expanded: None,
        }
    }

    pub fn eof(pos: Pos, filename: Rc<CstStr>) -> Self {
        Token::new(TokenKind::Eof, pos, "", filename)
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::EndCmd => write!(f, "<;>"),
            TokenKind::Set => write!(f, "<=>"),
            TokenKind::Add => write!(f, "<+>"),
            TokenKind::Sub => write!(f, "<->"),
            TokenKind::Mul => write!(f, "<*>"),
            TokenKind::Div => write!(f, "</>"),
            TokenKind::Mod => write!(f, "<%>"),
            TokenKind::Pow => write!(f, "<**>"),
            TokenKind::Neg => write!(f, "<~>"),
            TokenKind::And => write!(f, "<&>"),
            TokenKind::Or => write!(f, "<|>"),
            TokenKind::Xor => write!(f, "<^>"),
            TokenKind::Shl => write!(f, "<<<>"),
            TokenKind::Shr => write!(f, "<>>>"),
            TokenKind::Lshr => write!(f, "<!>>"),
            TokenKind::Eq => write!(f, "<==>"),
            TokenKind::Neq => write!(f, "<!=>"),
            TokenKind::Lt => write!(f, "<lt>"),
            TokenKind::Gt => write!(f, "<gt>"),
            TokenKind::Geq => write!(f, "<ge>"),
            TokenKind::Leq => write!(f, "<le>"),
            TokenKind::Question => write!(f, "<?>"),
            TokenKind::In => write!(f, "<:>"),
            TokenKind::Unpack => write!(f, "<<->"),
            TokenKind::Ref => write!(f, "<#>"),
            TokenKind::SubNs => write!(f, "<::>"),
            TokenKind::Access => write!(f, "<.>"),
            TokenKind::Comma => write!(f, "<,>"),
            TokenKind::DotDot => write!(f, "<..>"),
            TokenKind::DotDotDot => write!(f, "<...>"),
            TokenKind::Open => write!(f, "<(>"),
            TokenKind::Close => write!(f, "<)>"),
            TokenKind::BlockOpen => write!(f, "<{{>"),
            TokenKind::BlockClose => write!(f, "<}}>"),
            TokenKind::IndexOpen => write!(f, "<[>"),
            TokenKind::IndexClose => write!(f, "<]>"),
            TokenKind::Eof => write!(f, "<eof>"),
            TokenKind::None => write!(f, "<none>"),
            TokenKind::Ident => write!(f, "<id:{}>", self.text),
            TokenKind::Char => write!(f, "<'{}'>", self.text),
            TokenKind::Str => write!(f, "<{}>", self.text),
            _ => {
                if self.text.is_empty() {
                    write!(f, "<{}>", self.kind)
                } else {
                    write!(f, "<{}>", self.text)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Rc<CstStr> {
        Rc::new(CstStr::from("<test>"))
    }

    #[test]
    fn test_pos_to() {
        let a = Pos::new(1, 1, 0, 3);
        let b = Pos::new(1, 9, 8, 2);
        let merged = a.to(&b);
        assert_eq!(merged.at, 0);
        assert_eq!(merged.len, 10);
        assert_eq!(merged.line, 1);
    }

    #[test]
    fn test_bracket_pairing() {
        assert_eq!(TokenKind::Open.closer(), Some(TokenKind::Close));
        assert_eq!(TokenKind::IndexClose.opener(), Some(TokenKind::IndexOpen));
        assert!(TokenKind::BlockOpen.is_opener());
        assert!(!TokenKind::Comma.is_opener());
    }

    #[test]
    fn test_display() {
        let t = Token::new(TokenKind::Ident, Pos::default(), "foo", file());
        assert_eq!(t.to_string(), "<id:foo>");
        let t = Token::new(TokenKind::EndCmd, Pos::default(), ";", file());
        assert_eq!(t.to_string(), "<;>");
        let t = Token::new(TokenKind::Mut, Pos::default(), "mut", file());
        assert_eq!(t.to_string(), "<mut>");
    }

    #[test]
    fn test_kind_display_snake_case() {
        assert_eq!(TokenKind::EndCmd.to_string(), "end_cmd");
        assert_eq!(TokenKind::BlockOpen.to_string(), "block_open");
    }
}
