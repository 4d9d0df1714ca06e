//! Operator typing and constant evaluation.
//!
//! [`has_op`] is the oracle every expression node consults: given the
//! operand types and the operator token it names the result type, or
//! rules the combination out so the caller can report an unknown
//! operator. Unary nodes pass their operand type on both sides.
//!
//! Operators never convert: arithmetic, bitwise and comparison forms
//! require both operands to share one concrete type, and widening only
//! happens through an explicit `as` cast. `@unknown` absorbs every
//! operator so one bad subexpression does not cascade.

use crate::token::TokenKind;
use cstar_val::{CstType, Value};

pub(crate) fn is_int_name(s: &str) -> bool {
    matches!(
        s,
        "int8"
            | "int16"
            | "int32"
            | "int64"
            | "ssize"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "usize"
    )
}

pub(crate) fn is_float_name(s: &str) -> bool {
    matches!(s, "float16" | "float32" | "float64" | "float80")
}

/// A cast can target any atomic scalar apart from the source itself.
fn is_cast_target(s: &str) -> bool {
    s == "bool" || s == "char" || is_int_name(s) || is_float_name(s)
}

/// Result type of `lhs op rhs`, or `None` when the operator does not
/// exist for that pair.
pub fn has_op(lhs: &CstType, rhs: &CstType, op: TokenKind) -> Option<CstType> {
    if lhs.is_unknown() || rhs.is_unknown() {
        return Some(CstType::unknown());
    }

    let l = lhs.as_str();
    let r = rhs.as_str();

    // `x as T?` wraps a value of T into its optional.
    if op == TokenKind::As && r.strip_suffix('?') == Some(l) {
        return Some(rhs.clone());
    }

    if l == "bool" {
        return match op {
            TokenKind::Not => Some(lhs.clone()),
            TokenKind::LAnd
            | TokenKind::LOr
            | TokenKind::Eq
            | TokenKind::Neq
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Xor
                if r == "bool" =>
            {
                Some(lhs.clone())
            }
            TokenKind::As if is_int_name(r) => Some(rhs.clone()),
            _ => None,
        };
    }

    if is_int_name(l) {
        return match op {
            TokenKind::Neg => Some(lhs.clone()),
            TokenKind::As if is_cast_target(r) => Some(rhs.clone()),
            TokenKind::And
            | TokenKind::Or
            | TokenKind::Xor
            | TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Mul
            | TokenKind::Div
            | TokenKind::Mod
            | TokenKind::Pow
                if r == l =>
            {
                Some(lhs.clone())
            }
            TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Geq
            | TokenKind::Leq
            | TokenKind::Eq
            | TokenKind::Neq
                if r == l =>
            {
                Some(CstType::new("bool"))
            }
            _ => None,
        };
    }

    if is_float_name(l) {
        return match op {
            TokenKind::As if is_cast_target(r) => Some(rhs.clone()),
            TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Mul
            | TokenKind::Div
            | TokenKind::Mod
            | TokenKind::Pow
                if r == l =>
            {
                Some(lhs.clone())
            }
            TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Geq
            | TokenKind::Leq
            | TokenKind::Eq
            | TokenKind::Neq
                if r == l =>
            {
                Some(CstType::new("bool"))
            }
            _ => None,
        };
    }

    None
}

/// Fold a binary operator over two known values. The result is masked
/// to `ty`; the flag reports whether masking changed the bits, so the
/// caller can warn about a wrapped constant.
///
/// Division and modulo by zero refuse to fold and the expression simply
/// stays non-constant.
pub fn fold_binary(op: TokenKind, lhs: &Value, rhs: &Value, ty: &CstType) -> Option<(Value, bool)> {
    let raw = match op {
        TokenKind::Add => lhs.add(rhs),
        TokenKind::Sub => lhs.sub(rhs),
        TokenKind::Mul => lhs.mul(rhs),
        TokenKind::Div => lhs.div(rhs),
        TokenKind::Mod => lhs.rem(rhs),
        TokenKind::Pow => lhs.pow(rhs),
        TokenKind::And => lhs.bit_and(rhs),
        TokenKind::Or => lhs.bit_or(rhs),
        TokenKind::Xor => lhs.bit_xor(rhs),
        TokenKind::LAnd => lhs.land(rhs),
        TokenKind::LOr => lhs.lor(rhs),
        TokenKind::Eq => lhs.cmp_eq(rhs),
        TokenKind::Neq => lhs.cmp_ne(rhs),
        TokenKind::Lt => lhs.cmp_lt(rhs),
        TokenKind::Gt => lhs.cmp_gt(rhs),
        TokenKind::Leq => lhs.cmp_le(rhs),
        TokenKind::Geq => lhs.cmp_ge(rhs),
        _ => None,
    }?;
    Some(raw.wrap_to(ty))
}

/// Fold a unary operator over a known value.
pub fn fold_unary(op: TokenKind, of: &Value, ty: &CstType) -> Option<(Value, bool)> {
    let raw = match op {
        TokenKind::Not => of.not(),
        TokenKind::Neg => of.neg_bits(),
        _ => None,
    }?;
    Some(raw.wrap_to(ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CstType {
        CstType::new(s)
    }

    fn yields(lhs: &str, rhs: &str, op: TokenKind) -> String {
        match has_op(&t(lhs), &t(rhs), op) {
            Some(ty) => ty.as_str().to_string(),
            None => "-".to_string(),
        }
    }

    #[test]
    fn test_unknown_absorbs() {
        assert_eq!(yields("@unknown", "int32", TokenKind::Add), "@unknown");
        assert_eq!(yields("bool", "@unknown", TokenKind::LAnd), "@unknown");
    }

    #[test]
    fn test_int_arith_same_type_only() {
        assert_eq!(yields("int32", "int32", TokenKind::Add), "int32");
        assert_eq!(yields("uint8", "uint8", TokenKind::Mod), "uint8");
        assert_eq!(yields("usize", "usize", TokenKind::Mul), "usize");
        assert_eq!(yields("int32", "int64", TokenKind::Add), "-");
        assert_eq!(yields("int32", "float32", TokenKind::Add), "-");
    }

    #[test]
    fn test_comparisons_yield_bool() {
        assert_eq!(yields("int64", "int64", TokenKind::Lt), "bool");
        assert_eq!(yields("float64", "float64", TokenKind::Neq), "bool");
        assert_eq!(yields("int64", "int32", TokenKind::Lt), "-");
    }

    #[test]
    fn test_bool_ops() {
        assert_eq!(yields("bool", "bool", TokenKind::LAnd), "bool");
        assert_eq!(yields("bool", "bool", TokenKind::Xor), "bool");
        assert_eq!(yields("bool", "bool", TokenKind::Not), "bool");
        assert_eq!(yields("bool", "bool", TokenKind::Add), "-");
        assert_eq!(yields("bool", "bool", TokenKind::Neg), "-");
    }

    #[test]
    fn test_unary_on_ints() {
        assert_eq!(yields("uint16", "uint16", TokenKind::Neg), "uint16");
        assert_eq!(yields("int32", "int32", TokenKind::Not), "-");
        assert_eq!(yields("float32", "float32", TokenKind::Neg), "-");
    }

    #[test]
    fn test_casts() {
        assert_eq!(yields("int32", "float64", TokenKind::As), "float64");
        assert_eq!(yields("int32", "usize", TokenKind::As), "usize");
        assert_eq!(yields("float32", "uint8", TokenKind::As), "uint8");
        assert_eq!(yields("float64", "float80", TokenKind::As), "float80");
        assert_eq!(yields("uint32", "char", TokenKind::As), "char");
        assert_eq!(yields("bool", "uint8", TokenKind::As), "uint8");
        assert_eq!(yields("bool", "float32", TokenKind::As), "-");
        assert_eq!(yields("int32", "int32?", TokenKind::As), "int32?");
        assert_eq!(yields("char", "uint8", TokenKind::As), "-");
    }

    #[test]
    fn test_fold_binary() {
        let (v, wrapped) =
            fold_binary(TokenKind::Add, &Value::Int(2), &Value::Int(3), &t("int32")).unwrap();
        assert_eq!(v, Value::Int(5));
        assert!(!wrapped);

        let (v, wrapped) =
            fold_binary(TokenKind::Add, &Value::Int(250), &Value::Int(10), &t("uint8")).unwrap();
        assert_eq!(v, Value::Int(4));
        assert!(wrapped);

        assert_eq!(
            fold_binary(TokenKind::Div, &Value::Int(1), &Value::Int(0), &t("int32")),
            None
        );
        assert_eq!(
            fold_binary(TokenKind::Lt, &Value::Int(2), &Value::Int(3), &t("bool")),
            Some((Value::Bool(true), false))
        );
        assert_eq!(
            fold_binary(TokenKind::LAnd, &Value::Bool(true), &Value::Bool(false), &t("bool")),
            Some((Value::Bool(false), false))
        );
    }

    #[test]
    fn test_fold_unary() {
        assert_eq!(
            fold_unary(TokenKind::Not, &Value::Bool(true), &t("bool")),
            Some((Value::Bool(false), false))
        );
        let (v, _) = fold_unary(TokenKind::Neg, &Value::Int(0), &t("uint8")).unwrap();
        assert_eq!(v, Value::Int(255));
    }
}
