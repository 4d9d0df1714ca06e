use std::path::Path;

use lazy_static::lazy_static;
use normalize_path::NormalizePath;
use regex::Regex;

use cstar_val::CstStr;

lazy_static! {
    static ref SNAKE_CASE: Regex = Regex::new("^_?[a-z][a-z0-9_]*$").unwrap();
    static ref CAMEL_CASE: Regex = Regex::new("^_?[a-z][a-zA-Z0-9]*$").unwrap();
    static ref PASCAL_CASE: Regex = Regex::new("^_?[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref UPPER_CASE: Regex = Regex::new("^_?[A-Z][A-Z0-9_]*$").unwrap();
}

/// Variable names: `word_by_word`.
pub fn is_snake_case(name: &str) -> bool {
    SNAKE_CASE.is_match(name)
}

/// Function names: `wordByWord`.
pub fn is_camel_case(name: &str) -> bool {
    CAMEL_CASE.is_match(name)
}

pub fn is_pascal_case(name: &str) -> bool {
    PASCAL_CASE.is_match(name)
}

pub fn is_upper_case(name: &str) -> bool {
    UPPER_CASE.is_match(name)
}

/// The snake_case rendition of a name, for casing-warning fixits.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The camelCase rendition of a name.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut raise = false;
    for c in name.chars() {
        if c == '_' && !out.is_empty() {
            raise = true;
        } else if raise {
            out.push(c.to_ascii_uppercase());
            raise = false;
        } else if out.trim_start_matches('_').is_empty() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Indent every non-empty line by one level.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Forward-slash rendition of a path, for source names that read the
/// same on every platform.
pub trait PathExt {
    fn unified(&self) -> CstStr;
}

impl PathExt for Path {
    fn unified(&self) -> CstStr {
        let res: CstStr = self.normalize().to_string_lossy().replace('\\', "/").into();
        if res.is_empty() {
            ".".into()
        } else {
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_predicates() {
        assert!(is_snake_case("my_var"));
        assert!(is_snake_case("_scratch"));
        assert!(!is_snake_case("myVar"));
        assert!(is_camel_case("doThing"));
        assert!(is_camel_case("_hidden"));
        assert!(!is_camel_case("DoThing"));
        assert!(!is_camel_case("do_thing"));
        assert!(is_pascal_case("Matrix"));
        assert!(is_upper_case("MAX_LEN"));
    }

    #[test]
    fn test_case_fixers() {
        assert_eq!(to_snake_case("myVar"), "my_var");
        assert_eq!(to_snake_case("MyVar"), "my_var");
        assert_eq!(to_snake_case("already_fine"), "already_fine");
        assert_eq!(to_camel_case("do_thing"), "doThing");
        assert_eq!(to_camel_case("DoThing"), "doThing");
        assert_eq!(to_camel_case("_my_var"), "_myVar");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb"), "    a\n\n    b");
    }

    #[test]
    fn test_unified_paths() {
        assert_eq!(Path::new("a/./b.cst").unified(), "a/b.cst");
        assert_eq!(Path::new("").unified(), ".");
    }
}
