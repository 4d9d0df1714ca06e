use crate::CstStr;
use std::fmt;

/// Textual type tag of a C* expression or variable.
///
/// Tags compare by family, not just by spelling: `@unknown` (the error
/// placeholder) equals every type, and the literal families `@int`,
/// `@uint` and `@float` equal every member of their family. This keeps
/// one bad subexpression from cascading into mismatch errors upstream.
#[derive(Debug, Clone, Default, Hash)]
pub struct CstType(CstStr);

/// Signed and unsigned integer type names, widest family first.
pub const INT_TYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "ssize", "uint8", "uint16", "uint32", "uint64", "usize",
];

/// Unsigned integer type names.
pub const UINT_TYPES: &[&str] = &["uint8", "uint16", "uint32", "uint64", "usize"];

/// Floating point type names resolvable from a float literal.
pub const FLOAT_TYPES: &[&str] = &["float16", "float32", "float64"];

/// Every atomic (free) value type. Atomic values are exempt from strict
/// linearity tracking.
pub const ATOMIC_TYPES: &[&str] = &[
    "uint8", "uint16", "uint32", "uint64", "usize", "int8", "int16", "int32", "int64", "ssize",
    "float16", "float32", "float64", "float80", "bool", "char",
];

impl CstType {
    pub fn new(s: impl Into<CstStr>) -> Self {
        CstType(s.into())
    }

    /// The poisoned placeholder type carried by error nodes.
    pub fn unknown() -> Self {
        CstType(CstStr::from("@unknown"))
    }

    pub fn void() -> Self {
        CstType(CstStr::from("void"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == "@unknown"
    }

    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }

    /// Atomic types (and `&` references) are "free": they may be read
    /// repeatedly without being consumed.
    pub fn is_atomic(&self) -> bool {
        ATOMIC_TYPES.contains(&self.as_str()) || self.0.starts_with('&')
    }

    pub fn is_optional(&self) -> bool {
        self.0.ends_with('?')
    }

    pub fn is_array(&self) -> bool {
        self.0.ends_with("[]")
    }

    /// `T` -> `T[]`
    pub fn array_of(&self) -> CstType {
        CstType(CstStr::from(format!("{}[]", self.0)))
    }

    /// `T` -> `T?`
    pub fn optional_of(&self) -> CstType {
        CstType(CstStr::from(format!("{}?", self.0)))
    }

    /// `T[]` -> `T`
    pub fn element(&self) -> Option<CstType> {
        self.as_str()
            .strip_suffix("[]")
            .map(|s| CstType(CstStr::from(s)))
    }

    /// `T?` -> `T`
    pub fn some(&self) -> Option<CstType> {
        self.as_str()
            .strip_suffix('?')
            .map(|s| CstType(CstStr::from(s)))
    }

    /// Display form of a function: `[ret<-p1,p2]`.
    pub fn function(ret: &CstType, params: &[CstType]) -> CstType {
        let ps: Vec<&str> = params.iter().map(|p| p.as_str()).collect();
        CstType(CstStr::from(format!("[{}<-{}]", ret, ps.join(","))))
    }

    fn family_eq(a: &str, b: &str) -> bool {
        if a == "@unknown" || b == "@unknown" {
            return true;
        }
        if a == b {
            return true;
        }
        if let (Some(a), Some(b)) = (a.strip_suffix("[]"), b.strip_suffix("[]")) {
            return Self::family_eq(a, b);
        }
        if let (Some(a), Some(b)) = (a.strip_suffix('?'), b.strip_suffix('?')) {
            return Self::family_eq(a, b);
        }
        if a == "@int" {
            return INT_TYPES.contains(&b) || b == "@uint";
        }
        if b == "@int" {
            return INT_TYPES.contains(&a) || a == "@uint";
        }
        if a == "@uint" {
            return UINT_TYPES.contains(&b);
        }
        if b == "@uint" {
            return UINT_TYPES.contains(&a);
        }
        if a == "@float" {
            return FLOAT_TYPES.contains(&b);
        }
        if b == "@float" {
            return FLOAT_TYPES.contains(&a);
        }
        false
    }
}

impl PartialEq for CstType {
    fn eq(&self, other: &Self) -> bool {
        CstType::family_eq(self.as_str(), other.as_str())
    }
}

impl PartialEq<&str> for CstType {
    fn eq(&self, other: &&str) -> bool {
        CstType::family_eq(self.as_str(), other)
    }
}

impl From<&str> for CstType {
    fn from(s: &str) -> Self {
        CstType(CstStr::from(s))
    }
}

impl From<CstStr> for CstType {
    fn from(s: CstStr) -> Self {
        CstType(s)
    }
}

impl From<String> for CstType {
    fn from(s: String) -> Self {
        CstType(CstStr::from(s))
    }
}

impl fmt::Display for CstType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_equals_everything() {
        assert_eq!(CstType::unknown(), CstType::from("int32"));
        assert_eq!(CstType::from("bool"), CstType::unknown());
        assert_eq!(CstType::unknown(), CstType::unknown());
    }

    #[test]
    fn test_int_family() {
        assert_eq!(CstType::from("@int"), CstType::from("int32"));
        assert_eq!(CstType::from("@int"), CstType::from("usize"));
        assert_eq!(CstType::from("@int"), CstType::from("@uint"));
        assert_ne!(CstType::from("@int"), CstType::from("float32"));
        assert_ne!(CstType::from("@int"), CstType::from("bool"));
    }

    #[test]
    fn test_uint_family() {
        assert_eq!(CstType::from("@uint"), CstType::from("uint8"));
        assert_ne!(CstType::from("@uint"), CstType::from("int8"));
    }

    #[test]
    fn test_float_family() {
        assert_eq!(CstType::from("@float"), CstType::from("float64"));
        assert_ne!(CstType::from("@float"), CstType::from("float80"));
        assert_ne!(CstType::from("@float"), CstType::from("int32"));
    }

    #[test]
    fn test_plain_mismatch() {
        assert_ne!(CstType::from("int32"), CstType::from("int64"));
        assert_ne!(CstType::from("char"), CstType::from("bool"));
    }

    #[test]
    fn test_compound_family() {
        assert_eq!(CstType::from("@unknown[]"), CstType::from("int32[]"));
        assert_eq!(CstType::from("@unknown?"), CstType::from("string?"));
        assert_eq!(CstType::from("@int[]"), CstType::from("uint8[]"));
        assert_ne!(CstType::from("int32[]"), CstType::from("int32"));
        assert_ne!(CstType::from("int32?"), CstType::from("int32"));
        assert_ne!(CstType::from("int32[]"), CstType::from("int64[]"));
    }

    #[test]
    fn test_atomic() {
        assert!(CstType::from("int32").is_atomic());
        assert!(CstType::from("float80").is_atomic());
        assert!(CstType::from("bool").is_atomic());
        assert!(CstType::from("&buffer").is_atomic());
        assert!(!CstType::from("string").is_atomic());
        assert!(!CstType::from("char[]").is_atomic());
    }

    #[test]
    fn test_compound_helpers() {
        let t = CstType::from("int32");
        assert_eq!(t.array_of().as_str(), "int32[]");
        assert_eq!(t.array_of().element().unwrap().as_str(), "int32");
        assert_eq!(t.optional_of().as_str(), "int32?");
        assert_eq!(t.optional_of().some().unwrap().as_str(), "int32");
        assert!(t.element().is_none());
    }

    #[test]
    fn test_function_display() {
        let f = CstType::function(
            &CstType::from("int32"),
            &[CstType::from("bool"), CstType::from("char")],
        );
        assert_eq!(f.as_str(), "[int32<-bool,char]");
    }
}
