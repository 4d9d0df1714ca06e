//! Error types and diagnostics for the C* front end.
//!
//! Every diagnostic the compiler can emit lives here as one variant of a
//! family enum, with a stable code, a source-span label and (usually) a help
//! text, rendered through the `miette` diagnostic library. The families group
//! related codes: syntax `E00xx`, types `E01xx`, names and scopes `E02xx`,
//! linearity `E03xx`, modules `E04xx`, warnings `W00xx`.

use crate::token::Pos;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub use miette::{MietteError, Result};

/// Convert a `Pos` to a `SourceSpan` for use with miette diagnostics
pub fn pos_to_span(pos: &Pos) -> SourceSpan {
    SourceSpan::new(pos.at.into(), pos.len)
}

/// Create a span from absolute position and length
pub fn span_from(offset: usize, len: usize) -> SourceSpan {
    SourceSpan::new(offset.into(), len)
}

/// Span covering a whole token window. Empty windows collapse to a
/// zero-length span at the origin.
pub fn stream_span(tokens: &crate::stream::TokenStream) -> SourceSpan {
    match tokens.span() {
        Some(pos) => pos_to_span(&pos),
        None => span_from(0, 0),
    }
}

/// A diagnostic with the source code of its file attached, so rendering can
/// show the offending line with a caret under the span.
#[derive(Debug)]
pub struct WithSource {
    pub source: NamedSource<String>,
    pub error: CstError,
}

impl std::fmt::Display for WithSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for WithSource {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Diagnostic for WithSource {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.error.code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        self.error.severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.error.help()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.error.url()
    }

    fn labels<'a>(&'a self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + 'a>> {
        self.error.labels()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source)
    }
}

/// Alias for Result with C* front-end errors
pub type CstResult<T> = std::result::Result<T, CstError>;

/// Umbrella error type for the whole front end.
#[derive(Error, Debug)]
pub enum CstError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Linear(#[from] LinearError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Warning(#[from] Warning),

    #[error(transparent)]
    Note(#[from] Note),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Msg(String),
}

// Manual implementation of Diagnostic for CstError to properly delegate
// to the family that actually carries the code and span.
impl Diagnostic for CstError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            CstError::Syntax(e) => e.code(),
            CstError::Type(e) => e.code(),
            CstError::Name(e) => e.code(),
            CstError::Linear(e) => e.code(),
            CstError::Module(e) => e.code(),
            CstError::Warning(e) => e.code(),
            CstError::Note(e) => e.code(),
            CstError::Io(_) => None,
            CstError::Msg(_) => None,
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            CstError::Syntax(e) => e.severity(),
            CstError::Type(e) => e.severity(),
            CstError::Name(e) => e.severity(),
            CstError::Linear(e) => e.severity(),
            CstError::Module(e) => e.severity(),
            CstError::Warning(e) => e.severity(),
            CstError::Note(e) => e.severity(),
            CstError::Io(_) => None,
            CstError::Msg(_) => None,
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            CstError::Syntax(e) => e.help(),
            CstError::Type(e) => e.help(),
            CstError::Name(e) => e.help(),
            CstError::Linear(e) => e.help(),
            CstError::Module(e) => e.help(),
            CstError::Warning(e) => e.help(),
            CstError::Note(e) => e.help(),
            CstError::Io(_) => None,
            CstError::Msg(_) => None,
        }
    }

    fn labels<'a>(&'a self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + 'a>> {
        match self {
            CstError::Syntax(e) => e.labels(),
            CstError::Type(e) => e.labels(),
            CstError::Name(e) => e.labels(),
            CstError::Linear(e) => e.labels(),
            CstError::Module(e) => e.labels(),
            CstError::Warning(e) => e.labels(),
            CstError::Note(e) => e.labels(),
            CstError::Io(_) => None,
            CstError::Msg(_) => None,
        }
    }
}

impl From<String> for CstError {
    fn from(msg: String) -> Self {
        CstError::Msg(msg)
    }
}

impl<'a> From<&'a str> for CstError {
    fn from(msg: &'a str) -> Self {
        CstError::Msg(msg.to_string())
    }
}

impl CstError {
    pub fn is_warning(&self) -> bool {
        matches!(self.severity(), Some(miette::Severity::Warning))
    }

    pub fn is_note(&self) -> bool {
        matches!(self.severity(), Some(miette::Severity::Advice))
    }
}

// ============================================================================
// Syntax errors (E0001-E0099)
// ============================================================================

/// Errors in the shape of the token stream: missing pieces, stray tokens,
/// unbalanced brackets, malformed literals.
#[derive(Error, Diagnostic, Debug)]
pub enum SyntaxError {
    #[error("expression expected")]
    #[diagnostic(code(cst_syntax_E0001), help("{hint}"))]
    ExpressionExpected {
        hint: String,
        #[label("expected a valid expression here")]
        span: SourceSpan,
    },

    /// Array declarations take a literal element count.
    #[error("amount expected")]
    #[diagnostic(
        code(cst_syntax_E0002),
        help("Expected an integer amount, but found '{found}'")
    )]
    AmountExpected {
        found: String,
        #[label("not an amount")]
        span: SourceSpan,
    },

    #[error("name expected")]
    #[diagnostic(code(cst_syntax_E0003), help("Expected a name, but found '{found}'"))]
    NameExpected {
        found: String,
        #[label("not a name")]
        span: SourceSpan,
    },

    #[error("type expected")]
    #[diagnostic(code(cst_syntax_E0004), help("Expected a type, but found '{found}'"))]
    TypeExpected {
        found: String,
        #[label("not a type")]
        span: SourceSpan,
    },

    #[error("empty character literal")]
    #[diagnostic(code(cst_syntax_E0005), help("A character literal holds exactly one character"))]
    EmptyChar {
        #[label("empty")]
        span: SourceSpan,
    },

    #[error("invalid character literal")]
    #[diagnostic(
        code(cst_syntax_E0006),
        help("A character literal holds exactly one character, but '{text}' has more")
    )]
    InvalidChar {
        text: String,
        #[label("more than one character")]
        span: SourceSpan,
    },

    #[error("expected a '{{'")]
    #[diagnostic(code(cst_syntax_E0007), help("Expected a block to open after '{found}'"))]
    ExpectedBlockOpen {
        found: String,
        #[label("block should open here")]
        span: SourceSpan,
    },

    #[error("expected a '}}'")]
    #[diagnostic(code(cst_syntax_E0008), help("Expected a '}}' token after '{found}'"))]
    ExpectedBlockClose {
        found: String,
        #[label("block should close here")]
        span: SourceSpan,
    },

    #[error("expected a ';'")]
    #[diagnostic(code(cst_syntax_E0009), help("Statements end with a ';'"))]
    ExpectedSemicolon {
        #[label("';' expected at the end of this statement")]
        span: SourceSpan,
    },

    #[error("array type not specified")]
    #[diagnostic(
        code(cst_syntax_E0010),
        help("An array type names its element type, like '[int32 x 4]'")
    )]
    ArrayTypeMissing {
        #[label("element type missing")]
        span: SourceSpan,
    },

    #[error("expected a list of names")]
    #[diagnostic(code(cst_syntax_E0011))]
    NameListExpected {
        #[label("expected one or more names here")]
        span: SourceSpan,
    },

    #[error("unexpected token")]
    #[diagnostic(code(cst_syntax_E0012), help("Did not expect '{found}' here"))]
    UnexpectedToken {
        found: String,
        #[label("unexpected")]
        span: SourceSpan,
    },

    #[error("unopened multiline comment")]
    #[diagnostic(
        code(cst_syntax_E0013),
        help("This '*/' has no matching '/*' before it")
    )]
    UnopenedComment {
        #[label("closes nothing")]
        span: SourceSpan,
    },

    #[error("unresolved merge conflict")]
    #[diagnostic(
        code(cst_syntax_E0014),
        help("Resolve the version-control conflict and recompile")
    )]
    MergeConflict {
        #[label("conflict marker")]
        span: SourceSpan,
    },

    #[error("modifier not allowed")]
    #[diagnostic(code(cst_syntax_E0015), help("The modifier '{modifier}' cannot be used here"))]
    ModifierNotAllowed {
        modifier: String,
        #[label("not allowed here")]
        span: SourceSpan,
    },

    #[error("unreachable code")]
    #[diagnostic(
        code(cst_syntax_E0016),
        help("Statements after a return can never run")
    )]
    UnreachableCode {
        #[label("never reached")]
        span: SourceSpan,
    },

    #[error("mismatched brackets")]
    #[diagnostic(
        code(cst_syntax_E0017),
        help("'{open}' was closed by '{close}'")
    )]
    MismatchedBracket {
        open: String,
        close: String,
        #[label("opened here")]
        open_span: SourceSpan,
        #[label("closed by this")]
        span: SourceSpan,
    },

    #[error("unopened bracket")]
    #[diagnostic(code(cst_syntax_E0018), help("'{close}' has no matching opener"))]
    UnopenedBracket {
        close: String,
        #[label("closes nothing")]
        span: SourceSpan,
    },

    #[error("unclosed bracket")]
    #[diagnostic(code(cst_syntax_E0019), help("'{open}' is never closed"))]
    UnclosedBracket {
        open: String,
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("empty list entry")]
    #[diagnostic(code(cst_syntax_E0020), help("Remove the extra separator"))]
    EmptySegment {
        #[label("nothing between separators")]
        span: SourceSpan,
    },

    #[error("unterminated literal")]
    #[diagnostic(
        code(cst_syntax_E0021),
        help("The closing quote is missing before the end of the line")
    )]
    UnterminatedLiteral {
        #[label("opened here")]
        span: SourceSpan,
    },
}

// ============================================================================
// Type errors (E0101-E0199)
// ============================================================================

/// Errors found while checking expression and declaration types.
#[derive(Error, Diagnostic, Debug)]
pub enum TypeError {
    #[error("type mismatch")]
    #[diagnostic(
        code(cst_type_E0101),
        help("Expected type '{expected}', but found '{found}'")
    )]
    Mismatch {
        expected: String,
        found: String,
        #[label("this has type '{found}'")]
        span: SourceSpan,
    },

    #[error("sign mismatch")]
    #[diagnostic(
        code(cst_type_E0102),
        help("Expected type '{expected}', but found '{found}'; the signs differ")
    )]
    SignMismatch {
        expected: String,
        found: String,
        #[label("this has type '{found}'")]
        span: SourceSpan,
    },

    /// No overload of a call matches the argument types.
    #[error("mismatching operands")]
    #[diagnostic(code(cst_type_E0103), help("{options}"))]
    MismatchingOperands {
        options: String,
        #[label("no match for these arguments")]
        span: SourceSpan,
    },

    #[error("unknown operator")]
    #[diagnostic(
        code(cst_type_E0104),
        help("The operator '{op}' is not defined for '{lhs}' and '{rhs}'")
    )]
    UnknownOperator {
        op: String,
        lhs: String,
        rhs: String,
        #[label("not defined for these types")]
        span: SourceSpan,
    },

    #[error("expression unassignable")]
    #[diagnostic(code(cst_type_E0105), help("Only variables can be assigned to"))]
    Unassignable {
        #[label("cannot assign to this")]
        span: SourceSpan,
    },

    #[error("function never returns")]
    #[diagnostic(
        code(cst_type_E0106),
        help("'{name}' declares a return type of '{ret}' but has no return statement")
    )]
    Unreturned {
        name: String,
        ret: String,
        #[label("missing a return")]
        span: SourceSpan,
    },
}

// ============================================================================
// Name and scope errors (E0201-E0299)
// ============================================================================

/// Name resolution failures and block-capability violations.
#[derive(Error, Diagnostic, Debug)]
pub enum NameError {
    #[error("unknown variable")]
    #[diagnostic(
        code(cst_name_E0201),
        help("The variable '{name}' is not defined in this scope")
    )]
    UnknownVariable {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("unknown function")]
    #[diagnostic(code(cst_name_E0202), help("The function '{name}' is not defined"))]
    UnknownFunction {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("unknown method")]
    #[diagnostic(
        code(cst_name_E0203),
        help("No method '{name}' on a value of type '{ty}'")
    )]
    UnknownMethod {
        name: String,
        ty: String,
        #[label("no such method")]
        span: SourceSpan,
    },

    #[error("symbol already defined")]
    #[diagnostic(code(cst_name_E0204), help("The name '{name}' is already taken in this scope"))]
    AlreadyDefined {
        name: String,
        #[label("redefined here")]
        span: SourceSpan,
    },

    /// Reserved words and type names cannot name a variable.
    #[error("unsupported name")]
    #[diagnostic(code(cst_name_E0205), help("'{name}' cannot be used as a name here"))]
    UnsupportedName {
        name: String,
        #[label("reserved")]
        span: SourceSpan,
    },

    #[error("invalid name")]
    #[diagnostic(code(cst_name_E0206), help("'{name}' is not a valid name"))]
    InvalidName {
        name: String,
        #[label("invalid")]
        span: SourceSpan,
    },

    #[error("illegal optional argument name")]
    #[diagnostic(
        code(cst_name_E0207),
        help("The function takes no optional parameter named '{name}'")
    )]
    IllegalOptionalArgName {
        name: String,
        #[label("no such parameter")]
        span: SourceSpan,
    },

    #[error("positional argument after optional argument")]
    #[diagnostic(
        code(cst_name_E0208),
        help("Positional arguments come before named ones")
    )]
    PositionalAfterOptional {
        #[label("positional after named")]
        span: SourceSpan,
    },

    #[error("parameter name already used")]
    #[diagnostic(code(cst_name_E0209), help("A parameter named '{name}' already exists"))]
    ParamNameReused {
        name: String,
        #[label("duplicate parameter")]
        span: SourceSpan,
    },

    #[error("positional parameter after named parameter")]
    #[diagnostic(
        code(cst_name_E0210),
        help("Once a parameter has a default, all following parameters need one")
    )]
    PositionalAfterNamed {
        #[label("needs a default value")]
        span: SourceSpan,
    },

    #[error("expression forbidden")]
    #[diagnostic(
        code(cst_name_E0211),
        help("A block of type {kind} does not allow expressions")
    )]
    ExpressionForbidden {
        kind: String,
        #[label("not allowed in this block")]
        span: SourceSpan,
    },

    #[error("function forbidden")]
    #[diagnostic(
        code(cst_name_E0212),
        help("A block of type {kind} does not allow function definitions")
    )]
    FunctionForbidden {
        kind: String,
        #[label("not allowed in this block")]
        span: SourceSpan,
    },

    #[error("return forbidden")]
    #[diagnostic(
        code(cst_name_E0213),
        help("Return statements are not allowed in a block of type {kind}")
    )]
    ReturnForbidden {
        kind: String,
        #[label("not allowed in this block")]
        span: SourceSpan,
    },

    #[error("namespace not allowed")]
    #[diagnostic(
        code(cst_name_E0214),
        help("A block of type {kind} does not allow namespaces")
    )]
    NamespaceForbidden {
        kind: String,
        #[label("not allowed in this block")]
        span: SourceSpan,
    },

    #[error("only static variables allowed")]
    #[diagnostic(
        code(cst_name_E0215),
        help("A block of type {kind} only holds static variables")
    )]
    StaticOnly {
        kind: String,
        #[label("must be static")]
        span: SourceSpan,
    },
}

// ============================================================================
// Linearity errors (E0301-E0399)
// ============================================================================

/// Violations of the provide/consume discipline.
#[derive(Error, Diagnostic, Debug)]
pub enum LinearError {
    #[error("value never consumed")]
    #[diagnostic(
        code(cst_linear_E0301),
        help("'{name}' was provided, but never consumed{hint}")
    )]
    NeverConsumed {
        name: String,
        hint: String,
        #[label("provided here")]
        span: SourceSpan,
    },

    #[error("value consumed twice")]
    #[diagnostic(
        code(cst_linear_E0302),
        help("'{name}' is consumed at this point and holds no value anymore")
    )]
    ConsumedAgain {
        name: String,
        #[label("consumed again here")]
        span: SourceSpan,
    },

    #[error("variable used before initialization")]
    #[diagnostic(
        code(cst_linear_E0303),
        help("'{name}' is uninitialized at this point and holds no value yet")
    )]
    UseBeforeInit {
        name: String,
        #[label("used here")]
        span: SourceSpan,
    },

    #[error("cannot set a constant")]
    #[diagnostic(code(cst_linear_E0304), help("'{name}' is declared const"))]
    SetConstant {
        name: String,
        #[label("written here")]
        span: SourceSpan,
    },

    #[error("cannot set an immutable variable")]
    #[diagnostic(
        code(cst_linear_E0305),
        help("'{name}' is not declared mut, so it can only be provided once")
    )]
    SetImmutable {
        name: String,
        #[label("written here")]
        span: SourceSpan,
    },

    #[error("const declaration without initialization")]
    #[diagnostic(
        code(cst_linear_E0306),
        help("A constant needs its value at the declaration")
    )]
    ConstWithoutInit {
        #[label("no value")]
        span: SourceSpan,
    },

    #[error("immutable declaration without initialization")]
    #[diagnostic(
        code(cst_linear_E0307),
        help("An immutable variable can never be set later; give it a value here or declare it mut")
    )]
    ImmutableWithoutInit {
        #[label("no value")]
        span: SourceSpan,
    },

    #[error("static variable requires an initial value")]
    #[diagnostic(code(cst_linear_E0308), help("'{name}' is static and must start initialized"))]
    StaticWithoutInit {
        name: String,
        #[label("no value")]
        span: SourceSpan,
    },

    #[error("variable declared both constant and mutable")]
    #[diagnostic(code(cst_linear_E0309), help("'const' and 'mut' contradict each other"))]
    ConstAndMut {
        name: String,
        #[label("contradictory modifiers")]
        span: SourceSpan,
    },

    #[error("non-constant value in constant variable")]
    #[diagnostic(
        code(cst_linear_E0310),
        help("'{name}' is const, so its value must be known at compile time")
    )]
    NonConstInConst {
        name: String,
        #[label("not a compile-time constant")]
        span: SourceSpan,
    },

    #[error("cannot delete a free variable")]
    #[diagnostic(
        code(cst_linear_E0311),
        help("'{name}' has an atomic type and is cleaned up automatically")
    )]
    DeleteFree {
        name: String,
        #[label("deleted here")]
        span: SourceSpan,
    },

    #[error("static value never provided")]
    #[diagnostic(
        code(cst_linear_E0312),
        help("The static variable '{name}' was consumed, but never provided again")
    )]
    StaticNeverProvided {
        name: String,
        #[label("last consumed here")]
        span: SourceSpan,
    },

    #[error("value discarded")]
    #[diagnostic(
        code(cst_linear_E0313),
        help("The (non-atomic) result of type '{ty}' from this expression is discarded")
    )]
    DiscardedValue {
        ty: String,
        #[label("result unused")]
        span: SourceSpan,
    },

    #[error("branches disagree on variable state")]
    #[diagnostic(
        code(cst_linear_E0314),
        help("The variables in this block are not in the same state as before it")
    )]
    BranchDiverged {
        #[label("this block")]
        span: SourceSpan,
    },

    #[error("borrowing is not supported yet")]
    #[diagnostic(code(cst_linear_E0315), help("'{name}' is in a borrowed state"))]
    BorrowUnsupported {
        name: String,
        #[label("borrowed")]
        span: SourceSpan,
    },
}

// ============================================================================
// Module errors (E0401-E0499)
// ============================================================================

/// Import resolution and module loading failures.
#[derive(Error, Diagnostic, Debug)]
pub enum ModuleError {
    #[error("module not found")]
    #[diagnostic(
        code(cst_module_E0401),
        help("No module named '{name}' in the search path")
    )]
    ModuleNotFound {
        name: String,
        #[label("unknown module")]
        span: SourceSpan,
    },

    #[error("file not found")]
    #[diagnostic(code(cst_module_E0402), help("Cannot read '{path}'"))]
    FileNotFound {
        path: String,
        #[label("referenced here")]
        span: SourceSpan,
    },

    #[error("unexpected import")]
    #[diagnostic(
        code(cst_module_E0403),
        help("Imports name a module, optionally followed by '::' members")
    )]
    UnexpectedImport {
        #[label("malformed import")]
        span: SourceSpan,
    },

    #[error("import-all must end the line")]
    #[diagnostic(
        code(cst_module_E0404),
        help("'*' imports every member and cannot be followed by more names")
    )]
    ImportAllPlacement {
        #[label("nothing may follow '*'")]
        span: SourceSpan,
    },

    #[error("include cycle")]
    #[diagnostic(
        code(cst_module_E0405),
        help("'{path}' is already being included; including it again would never finish")
    )]
    IncludeCycle {
        path: String,
        #[label("includes itself")]
        span: SourceSpan,
    },
}

// ============================================================================
// Warnings (W0001-W0099)
// ============================================================================

/// Diagnostics that never stop compilation (unless warnings are punished).
#[derive(Error, Diagnostic, Debug)]
pub enum Warning {
    #[error("unused variable")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0001),
        help("'{name}' was declared, but never used{hint}")
    )]
    UnusedVariable {
        name: String,
        hint: String,
        #[label("declared here")]
        span: SourceSpan,
    },

    /// The relaxed form of a linearity violation, for free variables.
    #[error("value never consumed")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0002),
        help("'{name}' was provided, but never consumed{hint}")
    )]
    NeverConsumed {
        name: String,
        hint: String,
        #[label("provided here")]
        span: SourceSpan,
    },

    #[error("wrong casing")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0003),
        help("{kind} names are written in {style}, like '{fixed}'")
    )]
    WrongCasing {
        kind: String,
        style: String,
        fixed: String,
        #[label("casing")]
        span: SourceSpan,
    },

    #[error("unused output")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0004),
        help("The result of this expression is discarded")
    )]
    UnusedOutput {
        #[label("result unused")]
        span: SourceSpan,
    },

    #[error("variable declared both constant and static")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0005),
        help("A constant is implicitly static; drop the 'static'")
    )]
    ConstAndStatic {
        name: String,
        #[label("redundant modifier")]
        span: SourceSpan,
    },

    #[error("line too long")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0006),
        help("This line is {len} characters long, the limit is {max}")
    )]
    LineTooLong {
        len: usize,
        max: usize,
        #[label("over the limit")]
        span: SourceSpan,
    },

    #[error("unclosed multiline comment")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0007),
        help("This '/*' is never closed; the rest of the file is a comment")
    )]
    UnclosedComment {
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("no implementation file found")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0008),
        help("The header of '{module}' was found, but no implementation next to it")
    )]
    NoImplementationFile {
        module: String,
        #[label("imported here")]
        span: SourceSpan,
    },

    #[error("import not at the top of the file")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0009),
        help("Move imports above the first declaration")
    )]
    ImportNotAtTop {
        #[label("late import")]
        span: SourceSpan,
    },

    #[error("Constant expression wraps around in '{ty}'")]
    #[diagnostic(
        severity(warning),
        code(cst_warn_W0010),
        help("Wrap the expression in 'nowrap (...)' if this is intended")
    )]
    ConstantWrapped {
        ty: String,
        #[label("overflows its type")]
        span: SourceSpan,
    },
}

/// A secondary remark pointing at a related location, rendered after the
/// diagnostic it belongs to.
#[derive(Error, Diagnostic, Debug)]
#[error("{message}")]
#[diagnostic(severity(advice), code(cst_note))]
pub struct Note {
    pub message: String,
    #[label("{message}")]
    pub span: SourceSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_carry_codes() {
        let e: CstError = SyntaxError::ExpectedSemicolon { span: span_from(0, 1) }.into();
        assert_eq!(e.code().map(|c| c.to_string()), Some("cst_syntax_E0009".to_string()));
        assert!(!e.is_warning());

        let w: CstError = Warning::LineTooLong { len: 140, max: 100, span: span_from(0, 1) }.into();
        assert_eq!(w.code().map(|c| c.to_string()), Some("cst_warn_W0006".to_string()));
        assert!(w.is_warning());
    }

    #[test]
    fn test_pos_to_span_uses_absolute_offset() {
        let pos = Pos::new(3, 5, 42, 7);
        let span = pos_to_span(&pos);
        assert_eq!(span.offset(), 42);
        assert_eq!(span.len(), 7);
    }

    #[test]
    fn test_with_source_shows_the_file() {
        let err: CstError = NameError::UnknownVariable {
            name: "x".into(),
            span: span_from(4, 1),
        }
        .into();
        let with = WithSource {
            source: NamedSource::new("demo.cst", "a + x;".to_string()),
            error: err,
        };
        assert!(with.source_code().is_some());
        assert_eq!(with.to_string(), "unknown variable");
    }
}
