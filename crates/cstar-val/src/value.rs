use crate::{CstStr, CstType};
use std::fmt;

/// A compile-time constant value, carried by literal nodes and folded
/// through constant binary/unary expressions.
///
/// Integers are held as `i64` bit patterns regardless of the declared
/// width; [`Value::wrap_to`] masks a result down to its concrete type
/// and reports whether any wrapping occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(CstStr),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Literal source form, suitable for pretty-printed output.
    pub fn repr(&self) -> CstStr {
        match self {
            Value::Nil => CstStr::from("null"),
            Value::Int(v) => CstStr::from(v.to_string()),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    CstStr::from(format!("{}.0", v))
                } else {
                    CstStr::from(v.to_string())
                }
            }
            Value::Bool(v) => CstStr::from(if *v { "true" } else { "false" }),
            Value::Char(c) => CstStr::from(format!("'{}'", c)),
            Value::Str(s) => CstStr::from(format!("\"{}\"", s)),
        }
    }

    pub fn add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_add(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a + b)),
            _ => None,
        }
    }

    pub fn sub(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_sub(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a - b)),
            _ => None,
        }
    }

    pub fn mul(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_mul(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a * b)),
            _ => None,
        }
    }

    /// Integer division by zero folds to nothing; the node survives
    /// unfolded and later stages handle it.
    pub fn div(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => None,
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_div(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a / b)),
            _ => None,
        }
    }

    pub fn rem(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => None,
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_rem(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a % b)),
            _ => None,
        }
    }

    pub fn pow(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b < 0 || *b > u32::MAX as i64 {
                    return None;
                }
                Some(Value::Int(a.wrapping_pow(*b as u32)))
            }
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a.powf(*b))),
            _ => None,
        }
    }

    pub fn bit_and(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a & b)),
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a & b)),
            _ => None,
        }
    }

    pub fn bit_or(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a | b)),
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a | b)),
            _ => None,
        }
    }

    pub fn bit_xor(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a ^ b)),
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a ^ b)),
            _ => None,
        }
    }

    pub fn shl(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if (0..64).contains(b) => {
                Some(Value::Int(a.wrapping_shl(*b as u32)))
            }
            _ => None,
        }
    }

    pub fn shr(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if (0..64).contains(b) => {
                Some(Value::Int(a.wrapping_shr(*b as u32)))
            }
            _ => None,
        }
    }

    /// Logical shift right: the sign bit is shifted in as zero.
    pub fn lshr(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if (0..64).contains(b) => {
                Some(Value::Int(((*a as u64) >> *b as u32) as i64))
            }
            _ => None,
        }
    }

    pub fn land(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(*a && *b)),
            _ => None,
        }
    }

    pub fn lor(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(*a || *b)),
            _ => None,
        }
    }

    pub fn not(&self) -> Option<Value> {
        match self {
            Value::Bool(a) => Some(Value::Bool(!a)),
            _ => None,
        }
    }

    /// Bitwise complement (`~`).
    pub fn neg_bits(&self) -> Option<Value> {
        match self {
            Value::Int(a) => Some(Value::Int(!a)),
            _ => None,
        }
    }

    pub fn cmp_lt(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Bool(a < b)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Bool(a < b)),
            (Value::Char(a), Value::Char(b)) => Some(Value::Bool(a < b)),
            _ => None,
        }
    }

    pub fn cmp_gt(&self, other: &Value) -> Option<Value> {
        other.cmp_lt(self)
    }

    pub fn cmp_le(&self, other: &Value) -> Option<Value> {
        match self.cmp_gt(other) {
            Some(Value::Bool(b)) => Some(Value::Bool(!b)),
            _ => None,
        }
    }

    pub fn cmp_ge(&self, other: &Value) -> Option<Value> {
        match self.cmp_lt(other) {
            Some(Value::Bool(b)) => Some(Value::Bool(!b)),
            _ => None,
        }
    }

    pub fn cmp_eq(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Bool(a == b)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Bool(a == b)),
            (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a == b)),
            (Value::Char(a), Value::Char(b)) => Some(Value::Bool(a == b)),
            (Value::Str(a), Value::Str(b)) => Some(Value::Bool(a == b)),
            _ => None,
        }
    }

    pub fn cmp_ne(&self, other: &Value) -> Option<Value> {
        match self.cmp_eq(other) {
            Some(Value::Bool(b)) => Some(Value::Bool(!b)),
            _ => None,
        }
    }

    /// Mask an integer result down to the width and signedness of `ty`
    /// (floats narrow through `f32` for `float32`/`float16`). The flag
    /// reports whether the stored bits changed, i.e. the fold wrapped.
    pub fn wrap_to(&self, ty: &CstType) -> (Value, bool) {
        match self {
            Value::Int(v) => {
                let wrapped = match ty.as_str() {
                    "int8" => *v as i8 as i64,
                    "int16" => *v as i16 as i64,
                    "int32" => *v as i32 as i64,
                    "uint8" => *v as u8 as i64,
                    "uint16" => *v as u16 as i64,
                    "uint32" => *v as u32 as i64,
                    _ => *v,
                };
                (Value::Int(wrapped), wrapped != *v)
            }
            Value::Float(v) => match ty.as_str() {
                "float16" | "float32" => {
                    let narrowed = *v as f32 as f64;
                    (Value::Float(narrowed), false)
                }
                _ => (self.clone(), false),
            },
            _ => (self.clone(), false),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arith() {
        assert_eq!(
            Value::Int(2).add(&Value::Int(3)),
            Some(Value::Int(5))
        );
        assert_eq!(
            Value::Int(7).rem(&Value::Int(4)),
            Some(Value::Int(3))
        );
        assert_eq!(
            Value::Int(2).pow(&Value::Int(10)),
            Some(Value::Int(1024))
        );
        assert_eq!(Value::Int(1).div(&Value::Int(0)), None);
    }

    #[test]
    fn test_mixed_types_do_not_fold() {
        assert_eq!(Value::Int(1).add(&Value::Float(1.0)), None);
        assert_eq!(Value::Bool(true).add(&Value::Bool(false)), None);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(Value::Int(1).shl(&Value::Int(4)), Some(Value::Int(16)));
        assert_eq!(Value::Int(-8).shr(&Value::Int(1)), Some(Value::Int(-4)));
        assert_eq!(
            Value::Int(-1).lshr(&Value::Int(63)),
            Some(Value::Int(1))
        );
        assert_eq!(Value::Int(1).shl(&Value::Int(64)), None);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            Value::Int(1).cmp_lt(&Value::Int(2)),
            Some(Value::Bool(true))
        );
        assert_eq!(
            Value::Char('a').cmp_ge(&Value::Char('b')),
            Some(Value::Bool(false))
        );
        assert_eq!(
            Value::Str(CstStr::from("x")).cmp_eq(&Value::Str(CstStr::from("x"))),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn test_wrap_to() {
        let (v, wrapped) = Value::Int(300).wrap_to(&CstType::from("uint8"));
        assert_eq!(v, Value::Int(44));
        assert!(wrapped);

        let (v, wrapped) = Value::Int(300).wrap_to(&CstType::from("int32"));
        assert_eq!(v, Value::Int(300));
        assert!(!wrapped);

        let (v, wrapped) = Value::Int(-1).wrap_to(&CstType::from("uint16"));
        assert_eq!(v, Value::Int(65535));
        assert!(wrapped);
    }

    #[test]
    fn test_repr() {
        assert_eq!(Value::Int(42).repr(), CstStr::from("42"));
        assert_eq!(Value::Float(2.0).repr(), CstStr::from("2.0"));
        assert_eq!(Value::Bool(true).repr(), CstStr::from("true"));
        assert_eq!(Value::Char('x').repr(), CstStr::from("'x'"));
        assert_eq!(Value::Nil.repr(), CstStr::from("null"));
    }
}
