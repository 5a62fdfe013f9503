//! Turns `name : type = value` statements into typed values.
//!
//! Numbers are accumulated digit by digit with wrapping arithmetic, so
//! out-of-range literals wrap instead of failing. A leading `-` negates the
//! literal for every numeric type; unsigned targets receive the wrapped bits.

use super::ast::{NodeId, Op, SyntaxTree};
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::lexer::{Token, TokenKind};
use crate::model::{TypeTag, Value};

/// Most components a vector literal can carry.
pub const MAX_VECTOR_LEN: usize = 4;

/// The checked shape of one declaration statement.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub name: Token<'a>,
    pub ty: Token<'a>,
    /// `None` when the type name is not in the vocabulary.
    pub tag: Option<TypeTag>,
    pub value: NodeId,
}

impl Declaration<'_> {
    pub fn line(&self) -> usize {
        self.name.line
    }
}

/// Checks that `stmt` is `=` over a `:` whose children are leaves.
pub fn declaration<'a>(
    tree: &SyntaxTree<'a>,
    stmt: NodeId,
    diagnostics: &mut Diagnostics,
) -> Option<Declaration<'a>> {
    let root = tree.node(stmt);
    let line = root.line();

    let shape = (root.op == Op::Assign)
        .then_some(())
        .and_then(|()| root.left)
        .filter(|&colon| tree.op(colon) == Op::Colon)
        .and_then(|colon| Some((tree.left(colon)?, tree.right(colon)?)))
        .filter(|&(name, ty)| tree.node(name).is_leaf() && tree.node(ty).is_leaf())
        .zip(root.right);

    let Some(((name, ty), value)) = shape else {
        diagnostics.report(
            DiagnosticKind::Syntax,
            line,
            format!("expected `name : type = value`, found {}", tree.render(stmt)),
        );
        return None;
    };

    let ty = tree.node(ty).token;
    Some(Declaration {
        name: tree.node(name).token,
        ty,
        tag: TypeTag::parse(ty.text),
        value,
    })
}

/// Materializes one declaration into its name and value.
///
/// Returns `None` only when the statement has the wrong shape. Unknown types
/// and arity mismatches are reported and still produce a (defaulted) value.
pub fn materialize<'a>(
    tree: &SyntaxTree<'a>,
    stmt: NodeId,
    diagnostics: &mut Diagnostics,
) -> Option<(&'a str, Value)> {
    let decl = declaration(tree, stmt, diagnostics)?;
    let value = match decl.tag {
        Some(TypeTag::Obj) => {
            diagnostics.report(
                DiagnosticKind::Type,
                decl.line(),
                format!("`{}` references an object outside an object table", decl.name.text),
            );
            Value::I32(0)
        }
        Some(tag) => materialize_value(tree, tag, decl.value, diagnostics),
        None => unknown_type(&decl, diagnostics),
    };
    Some((decl.name.text, value))
}

pub(crate) fn unknown_type(decl: &Declaration<'_>, diagnostics: &mut Diagnostics) -> Value {
    diagnostics.report(
        DiagnosticKind::Type,
        decl.line(),
        format!("unknown type `{}` for `{}`", decl.ty.text, decl.name.text),
    );
    Value::I32(0)
}

/// Builds a value of type `tag` from the expression at `node`.
pub fn materialize_value(
    tree: &SyntaxTree<'_>,
    tag: TypeTag,
    node: NodeId,
    diagnostics: &mut Diagnostics,
) -> Value {
    let line = tree.node(node).line();

    if let Some(arity) = tag.arity() {
        if !matches!(tree.op(node), Op::Group(_)) {
            diagnostics.report(
                DiagnosticKind::Type,
                line,
                format!("{} needs a bracketed value, found {}", tag.name(), tree.render(node)),
            );
            return vector(tag, &[]);
        }
        let leaves = tree.leaves(node);
        if leaves.len() != arity {
            diagnostics.report(
                DiagnosticKind::Type,
                line,
                format!("{} expects {arity} components, found {}", tag.name(), leaves.len()),
            );
        }
        let mut components = [0.0f64; MAX_VECTOR_LEN];
        for (slot, &leaf) in components.iter_mut().zip(&leaves) {
            *slot = number(tree.node(leaf).token, diagnostics).unwrap_or(0.0);
        }
        return vector(tag, &components);
    }

    match tree.op(node) {
        Op::None => scalar(tag, tree.node(node).token, diagnostics),
        Op::Group(_) | Op::Comma if tag.is_scalar() => Value::Array {
            elem: tag,
            items: tree
                .leaves(node)
                .into_iter()
                .map(|leaf| scalar(tag, tree.node(leaf).token, diagnostics))
                .collect(),
        },
        _ => {
            diagnostics.report(
                DiagnosticKind::Type,
                line,
                format!("{} needs a single value, found {}", tag.name(), tree.render(node)),
            );
            default_value(tag)
        }
    }
}

/// Zero value for a tag.
pub fn default_value(tag: TypeTag) -> Value {
    match tag {
        TypeTag::Str => Value::Str(String::new()),
        TypeTag::Obj => Value::I32(0),
        t if t.arity().is_some() => vector(t, &[]),
        t => scalar_from(t, 0, 0.0),
    }
}

/// Converts one leaf token to a scalar of type `tag`.
pub fn scalar(tag: TypeTag, token: Token<'_>, diagnostics: &mut Diagnostics) -> Value {
    match tag {
        TypeTag::Str => Value::Str(token.text.to_string()),
        TypeTag::Bool => match (token.kind, token.text) {
            (TokenKind::Ident, "true") => Value::Bool(true),
            (TokenKind::Ident, "false") => Value::Bool(false),
            _ => {
                diagnostics.report(
                    DiagnosticKind::Type,
                    token.line,
                    format!("expected true or false, found `{}`", token.text),
                );
                Value::Bool(false)
            }
        },
        TypeTag::R32 | TypeTag::R64 => {
            let v = number(token, diagnostics).unwrap_or(0.0);
            scalar_from(tag, v as i64 as u64, v)
        }
        _ => {
            let bits = match token.kind {
                TokenKind::Int | TokenKind::Float => parse_int(token.text),
                _ => {
                    number(token, diagnostics);
                    0
                }
            };
            scalar_from(tag, bits, bits as i64 as f64)
        }
    }
}

/// Numeric value of a literal, reported as a type error for anything else.
fn number(token: Token<'_>, diagnostics: &mut Diagnostics) -> Option<f64> {
    match token.kind {
        TokenKind::Int | TokenKind::Float => Some(parse_float(token.text)),
        _ => {
            diagnostics.report(
                DiagnosticKind::Type,
                token.line,
                format!("expected a number, found `{}`", token.text),
            );
            None
        }
    }
}

fn scalar_from(tag: TypeTag, bits: u64, float: f64) -> Value {
    match tag {
        TypeTag::Bool => Value::Bool(bits != 0),
        TypeTag::I8 => Value::I8(bits as i8),
        TypeTag::I16 => Value::I16(bits as i16),
        TypeTag::I32 => Value::I32(bits as i32),
        TypeTag::I64 => Value::I64(bits as i64),
        TypeTag::U8 => Value::U8(bits as u8),
        TypeTag::U16 => Value::U16(bits as u16),
        TypeTag::U32 => Value::U32(bits as u32),
        TypeTag::U64 => Value::U64(bits),
        TypeTag::R32 => Value::F32(float as f32),
        TypeTag::R64 => Value::F64(float),
        _ => Value::I32(bits as i32),
    }
}

fn vector(tag: TypeTag, components: &[f64]) -> Value {
    let f = |i: usize| components.get(i).copied().unwrap_or(0.0);
    let n = |i: usize| f(i) as i32;
    match tag {
        TypeTag::IVec2 => Value::IVec2([n(0), n(1)]),
        TypeTag::IVec3 => Value::IVec3([n(0), n(1), n(2)]),
        TypeTag::IVec4 => Value::IVec4([n(0), n(1), n(2), n(3)]),
        TypeTag::Vec2 => Value::Vec2([f(0) as f32, f(1) as f32]),
        TypeTag::Vec3 => Value::Vec3([f(0) as f32, f(1) as f32, f(2) as f32]),
        _ => Value::Vec4([f(0) as f32, f(1) as f32, f(2) as f32, f(3) as f32]),
    }
}

/// Integer part of a decimal literal as wrapped 64-bit two's complement.
pub fn parse_int(text: &str) -> u64 {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut acc: u64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        acc = acc.wrapping_mul(10).wrapping_add(u64::from(b - b'0'));
    }
    if negative { acc.wrapping_neg() } else { acc }
}

/// Decimal literal with at most one `.`.
pub fn parse_float(text: &str) -> f64 {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut mantissa = 0.0f64;
    let mut scale: i32 = 0;
    let mut fraction = false;
    for b in digits.bytes() {
        match b {
            b'0'..=b'9' => {
                mantissa = mantissa * 10.0 + f64::from(b - b'0');
                if fraction {
                    scale += 1;
                }
            }
            b'.' if !fraction => fraction = true,
            _ => break,
        }
    }
    let v = mantissa / 10f64.powi(scale);
    if negative { -v } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::parse;

    fn one(src: &str) -> (Option<(String, Value)>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tree = parse(src, &mut diags);
        let stmt = tree.statements[0];
        let out = materialize(&tree, stmt, &mut diags).map(|(n, v)| (n.to_string(), v));
        (out, diags)
    }

    #[test]
    fn test_materialize_scalars_and_vectors() {
        let test_cases = vec![
            ("a:i32=1", Value::I32(1)),
            ("a : i64 = -9000000000", Value::I64(-9_000_000_000)),
            ("a : u32 = 7", Value::U32(7)),
            ("a : u64 = 18446744073709551615", Value::U64(u64::MAX)),
            ("a : r32 = 2.5", Value::F32(2.5)),
            ("a : r32 = 3", Value::F32(3.0)),
            ("a : r64 = -0.125", Value::F64(-0.125)),
            ("a : i8 = 127", Value::I8(127)),
            ("a : u16 = 65535", Value::U16(65535)),
            ("a : bool = true", Value::Bool(true)),
            ("a:vec3=[1.0,2.0,3.0]", Value::Vec3([1.0, 2.0, 3.0])),
            ("a : vec2 = [0.5, -1]", Value::Vec2([0.5, -1.0])),
            ("a : vec4 = [1, 2, 3, 4]", Value::Vec4([1.0, 2.0, 3.0, 4.0])),
            ("a : ivec2 = [3, -4]", Value::IVec2([3, -4])),
            ("a : ivec3 = [1, 2, 3]", Value::IVec3([1, 2, 3])),
            ("a : ivec4 = [(1), 2, [3], 4]", Value::IVec4([1, 2, 3, 4])),
            ("a : str = \"hello world\"", Value::Str("hello world".into())),
            ("a : str = basic", Value::Str("basic".into())),
            (
                "a : i32 = [1, 2, 3]",
                Value::Array {
                    elem: TypeTag::I32,
                    items: vec![Value::I32(1), Value::I32(2), Value::I32(3)],
                },
            ),
            (
                "a : r32 = []",
                Value::Array {
                    elem: TypeTag::R32,
                    items: vec![],
                },
            ),
        ];

        for (src, expected) in test_cases {
            let (out, diags) = one(src);
            assert_eq!(out, Some(("a".to_string(), expected)), "source: {src}");
            assert!(diags.is_empty(), "source: {src}: {diags:?}");
        }
    }

    #[test]
    fn test_integer_literals_wrap() {
        let (out, _) = one("a : i32 = 4294967297");
        assert_eq!(out.unwrap().1, Value::I32(1));
        let (out, _) = one("a : u8 = -1");
        assert_eq!(out.unwrap().1, Value::U8(255));
        let (out, _) = one("a : i32 = 12.9");
        assert_eq!(out.unwrap().1, Value::I32(12));
    }

    #[test]
    fn test_arity_mismatch_keeps_padded_vector() {
        let (out, diags) = one("a : vec3 = [1.0, 2.0]");
        assert_eq!(out.unwrap().1, Value::Vec3([1.0, 2.0, 0.0]));
        assert_eq!(diags.count(DiagnosticKind::Type), 1);

        let (out, diags) = one("a : vec2 = [1, 2, 3, 4, 5]");
        assert_eq!(out.unwrap().1, Value::Vec2([1.0, 2.0]));
        assert_eq!(diags.count(DiagnosticKind::Type), 1);

        let (out, diags) = one("a : vec2 = 1");
        assert_eq!(out.unwrap().1, Value::Vec2([0.0, 0.0]));
        assert_eq!(diags.count(DiagnosticKind::Type), 1);
    }

    #[test]
    fn test_unknown_type_defaults() {
        let (out, diags) = one("a : f32 = 1.0");
        assert_eq!(out, Some(("a".to_string(), Value::I32(0))));
        assert_eq!(diags.count(DiagnosticKind::Type), 1);
    }

    #[test]
    fn test_bad_literals_are_reported() {
        let test_cases = vec!["a : i32 = nope", "a : bool = 1", "a : vec2 = [1, x]"];
        for src in test_cases {
            let (out, diags) = one(src);
            assert!(out.is_some(), "source: {src}");
            assert_eq!(diags.count(DiagnosticKind::Type), 1, "source: {src}");
        }
    }

    #[test]
    fn test_wrong_shape_is_syntax_error() {
        for src in ["a = 1", "a : i32", "(a : i32) = 1", "a : i32 : u32 = 1", "x : (i32) = 1"] {
            let (out, diags) = one(src);
            assert_eq!(out, None, "source: {src}");
            assert_eq!(diags.count(DiagnosticKind::Syntax), 1, "source: {src}");
        }
    }

    #[test]
    fn test_parse_number_helpers() {
        assert_eq!(parse_int("0"), 0);
        assert_eq!(parse_int("-5") as i64, -5);
        assert_eq!(parse_float("1.25"), 1.25);
        assert_eq!(parse_float("-3."), -3.0);
        assert_eq!(parse_float("0.1") as f32, 0.1f32);
    }
}
