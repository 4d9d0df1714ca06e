//! Literal parsers.
//!
//! The lexer has no float token; a decimal like `3.14` arrives as the
//! three tokens `3` `.` `14`, so the float parser works on token shapes
//! rather than a single token. Integer literals carry a width guess
//! (`int32`, `uint32`, ...) that [`crate::ast::Node::consume`] replaces
//! with the width the surrounding code expects.

use super::{expr_or_report, Ctx};
use crate::ast::Node;
use crate::error::{stream_span, SyntaxError};
use crate::stream::TokenStream;
use crate::token::TokenKind;
use cstar_val::{CstStr, CstType};

pub fn parse_int(
    tokens: &TokenStream,
    _depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (neg, tok) = match (tokens.size(), tokens.kind(0)) {
        (1, TokenKind::Int | TokenKind::Hex | TokenKind::Binary) => (false, tokens.first()?),
        (2, TokenKind::Sub) if tokens.kind(1) == TokenKind::Int => (true, tokens.get(1)?),
        _ => return None,
    };
    let (value, ty) = match tok.kind {
        TokenKind::Int => match tok.text.parse::<i64>() {
            Ok(v) => {
                let v = if neg { -v } else { v };
                let ty = if i32::try_from(v).is_ok() { "int32" } else { "int64" };
                (v, ty)
            }
            Err(_) => {
                let tok = tok.clone();
                ctx.reporter.report_at(
                    &tok,
                    SyntaxError::ExpressionExpected {
                        hint: format!("The integer literal '{}' does not fit 64 bits", tok.text),
                        span: stream_span(tokens),
                    },
                );
                return Some(Node::Empty);
            }
        },
        kind => {
            let (digits, radix) = if kind == TokenKind::Hex {
                (&tok.text[2..], 16)
            } else {
                (&tok.text[2..], 2)
            };
            match u64::from_str_radix(digits, radix) {
                Ok(v) => {
                    let ty = if u32::try_from(v).is_ok() { "uint32" } else { "uint64" };
                    (v as i64, ty)
                }
                Err(_) => {
                    let tok = tok.clone();
                    ctx.reporter.report_at(
                        &tok,
                        SyntaxError::ExpressionExpected {
                            hint: format!("The literal '{}' does not fit 64 bits", tok.text),
                            span: stream_span(tokens),
                        },
                    );
                    return Some(Node::Empty);
                }
            }
        }
    };
    Some(Node::Int {
        value,
        ty: CstType::new(ty),
        tokens: tokens.clone(),
    })
}

/// `3.14`, `1.`, `.5`, with an optional leading `-`. The text is
/// normalized back to a full `a.b` form.
pub fn parse_float(
    tokens: &TokenStream,
    _depth: usize,
    _ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    let (neg, rest) = if tokens.kind(0) == TokenKind::Sub {
        (true, tokens.skip(1))
    } else {
        (false, tokens.clone())
    };
    let (whole, frac) = match (rest.size(), rest.kind(0), rest.kind(1), rest.kind(2)) {
        (3, TokenKind::Int, TokenKind::Access, TokenKind::Int) => {
            (rest.first()?.text.clone(), rest.get(2)?.text.clone())
        }
        (2, TokenKind::Int, TokenKind::Access, _) => (rest.first()?.text.clone(), CstStr::from("0")),
        (2, TokenKind::Access, TokenKind::Int, _) => (CstStr::from("0"), rest.get(1)?.text.clone()),
        _ => return None,
    };
    let sign = if neg { "-" } else { "" };
    let text = CstStr::from(format!("{sign}{whole}.{frac}"));
    let value: f64 = text.parse().ok()?;
    Some(Node::Float {
        value,
        text,
        ty: CstType::new("float64"),
        tokens: tokens.clone(),
    })
}

pub fn parse_bool(
    tokens: &TokenStream,
    _depth: usize,
    _ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.size() != 1 || tokens.kind(0) != TokenKind::Bool {
        return None;
    }
    Some(Node::Bool {
        value: tokens.first()?.text == "true",
        tokens: tokens.clone(),
    })
}

pub fn parse_char(
    tokens: &TokenStream,
    _depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.size() != 1 || tokens.kind(0) != TokenKind::Char {
        return None;
    }
    let tok = tokens.first()?.clone();
    let content = tok.text.trim_matches('\'');
    let ok = if let Some(esc) = content.strip_prefix('\\') {
        esc.chars().count() == 1
    } else {
        content.chars().count() == 1
    };
    if content.is_empty() {
        ctx.reporter.report_at(
            &tok,
            SyntaxError::EmptyChar { span: stream_span(tokens) },
        );
        return Some(Node::Empty);
    }
    if !ok {
        ctx.reporter.report_at(
            &tok,
            SyntaxError::InvalidChar {
                text: content.to_string(),
                span: stream_span(tokens),
            },
        );
        return Some(Node::Empty);
    }
    Some(Node::Char {
        text: tok.text.clone(),
        tokens: tokens.clone(),
    })
}

pub fn parse_str(
    tokens: &TokenStream,
    _depth: usize,
    _ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.size() != 1 || tokens.kind(0) != TokenKind::Str {
        return None;
    }
    Some(Node::Str {
        text: tokens.first()?.text.clone(),
        tokens: tokens.clone(),
    })
}

pub fn parse_null(
    tokens: &TokenStream,
    _depth: usize,
    _ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.size() != 1 || tokens.kind(0) != TokenKind::Null {
        return None;
    }
    Some(Node::Null {
        ty: CstType::unknown().optional_of(),
        tokens: tokens.clone(),
    })
}

/// `[a, b, c]` and the repeat form `[elem x amount]`. Repeat amounts
/// are checked against `usize` here so consumers never see them again.
pub fn parse_array(
    tokens: &TokenStream,
    depth: usize,
    ctx: &mut Ctx,
    _expected: &CstType,
) -> Option<Node> {
    if tokens.kind(0) != TokenKind::IndexOpen
        || super::matching_close(tokens, 0) != Some(tokens.size() - 1)
    {
        return None;
    }
    let inner = tokens.slice(1, -1);
    if inner.is_empty() {
        return Some(Node::EmptyArray {
            ty: CstType::unknown().array_of(),
            tokens: tokens.clone(),
        });
    }

    let open = tokens.first()?.clone();
    let (segments, faults) = inner.list(&[TokenKind::Comma], false);
    ctx.reporter.report_faults(&faults);

    let mut elems = Vec::with_capacity(segments.len());
    let mut const_len = Some(0usize);
    for seg in &segments {
        let (m, faults) = seg.split_stack(&[TokenKind::X], 0);
        ctx.reporter.report_faults(&faults);
        if m.found() {
            let elem = expr_or_report(&m.before(), &open, depth, ctx, &CstType::unknown());
            let mut count = expr_or_report(&m.after(), &open, depth, ctx, &CstType::unknown());
            count.consume(&CstType::new("usize"), &mut ctx.reporter);
            const_len = match (&count, const_len) {
                (Node::Int { value, .. }, Some(n)) if *value >= 0 => Some(n + *value as usize),
                _ => None,
            };
            elems.push(Node::Repeat {
                elem: Box::new(elem),
                count: Box::new(count),
                tokens: seg.clone(),
            });
        } else {
            const_len = const_len.map(|n| n + 1);
            elems.push(expr_or_report(seg, &open, depth, ctx, &CstType::unknown()));
        }
    }

    let ty = elems
        .first()
        .map(|e| e.type_of().array_of())
        .unwrap_or_else(|| CstType::unknown().array_of());
    Some(Node::Array {
        elems,
        ty,
        const_len,
        tokens: tokens.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parse::parse_expr;

    fn parse(text: &str) -> (Option<Node>, Ctx) {
        let mut ctx = Ctx::silent();
        let ts = tokenize(text, "<test>", &mut ctx.reporter).freeze();
        let node = parse_expr(&ts, 0, &mut ctx, &CstType::unknown());
        (node, ctx)
    }

    #[test]
    fn test_int_widths() {
        let (node, _) = parse("42");
        match node.unwrap() {
            Node::Int { value, ty, .. } => {
                assert_eq!(value, 42);
                assert_eq!(ty.as_str(), "int32");
            }
            other => panic!("expected an int, got {other:?}"),
        }
        let (node, _) = parse("4294967296");
        assert_eq!(node.unwrap().type_of().as_str(), "int64");
    }

    #[test]
    fn test_negative_int() {
        let (node, ctx) = parse("-7");
        match node.unwrap() {
            Node::Int { value, .. } => assert_eq!(value, -7),
            other => panic!("expected an int, got {other:?}"),
        }
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_hex_and_binary_are_unsigned() {
        let (node, _) = parse("0xff");
        match node.unwrap() {
            Node::Int { value, ty, .. } => {
                assert_eq!(value, 255);
                assert_eq!(ty.as_str(), "uint32");
            }
            other => panic!("expected an int, got {other:?}"),
        }
        let (node, _) = parse("0b101");
        match node.unwrap() {
            Node::Int { value, .. } => assert_eq!(value, 5),
            other => panic!("expected an int, got {other:?}"),
        }
        let (node, _) = parse("0xffffffffff");
        assert_eq!(node.unwrap().type_of().as_str(), "uint64");
    }

    #[test]
    fn test_float_shapes() {
        for (src, want) in [("3.14", "3.14"), ("1.", "1.0"), (".5", "0.5"), ("-2.5", "-2.5")] {
            let (node, _) = parse(src);
            match node.unwrap() {
                Node::Float { text, ty, .. } => {
                    assert_eq!(text, want, "source {src}");
                    assert_eq!(ty.as_str(), "float64");
                }
                other => panic!("expected a float for {src}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_char_literals() {
        let (node, ctx) = parse("'a'");
        assert!(matches!(node.unwrap(), Node::Char { .. }));
        assert!(!ctx.reporter.has_errors());

        let (node, ctx) = parse(r"'\n'");
        assert!(matches!(node.unwrap(), Node::Char { .. }));
        assert!(!ctx.reporter.has_errors());

        let (_, ctx) = parse("''");
        assert_eq!(ctx.reporter.codes(), ["cst_syntax_E0005"]);
        let (_, ctx) = parse("'ab'");
        assert_eq!(ctx.reporter.codes(), ["cst_syntax_E0006"]);
    }

    #[test]
    fn test_array_literal_with_repeat() {
        let (node, ctx) = parse("[1, 2 x 3, 4]");
        match node.unwrap() {
            Node::Array { elems, const_len, .. } => {
                assert_eq!(elems.len(), 3);
                assert_eq!(const_len, Some(5));
                assert!(matches!(elems[1], Node::Repeat { .. }));
            }
            other => panic!("expected an array, got {other:?}"),
        }
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_empty_array() {
        let (node, ctx) = parse("[]");
        assert!(matches!(node.unwrap(), Node::EmptyArray { .. }));
        assert!(ctx.reporter.codes().is_empty());
    }

    #[test]
    fn test_array_with_empty_segment() {
        let (_, ctx) = parse("[1,,2]");
        assert_eq!(ctx.reporter.codes(), ["cst_syntax_E0020"]);
    }
}
