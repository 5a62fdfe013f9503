//! Lays out uniform / push-constant blocks.
//!
//! A block starts with `(set = S | binding = B)` and owns every following
//! `index : type = value` line up to the next block header, `{Header}` or end
//! of input. Each field is padded to 16 bytes and fields are packed in index
//! order into one buffer.

use std::collections::BTreeMap;

use super::ast::{NodeId, Op, SyntaxTree};
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::lexer::TokenKind;
use super::value::{declaration, materialize_value, unknown_type};
use crate::model::{BlockField, TypeTag, UniformBlock, Value, align_up};

/// True if `stmt` is `|`-rooted, possibly inside brackets.
pub fn is_block_header(tree: &SyntaxTree<'_>, stmt: NodeId) -> bool {
    tree.strip_groups(stmt)
        .is_some_and(|root| tree.op(root) == Op::Pipe)
}

fn ends_block(tree: &SyntaxTree<'_>, stmt: NodeId) -> bool {
    is_block_header(tree, stmt) || tree.node(stmt).is_header()
}

struct PendingField {
    ty: TypeTag,
    bytes: Vec<u8>,
    array_len: Option<usize>,
}

/// Assembles the block whose header is `statements[start]`.
///
/// Returns the block (or `None` if it was rejected) and the index of the
/// first statement after it. Rejection happens when the header is malformed
/// or the field indices do not densely cover `0..count`.
pub fn assemble_block(
    tree: &SyntaxTree<'_>,
    statements: &[NodeId],
    start: usize,
    diagnostics: &mut Diagnostics,
) -> (Option<UniformBlock>, usize) {
    let header = statements[start];
    let line = tree.node(header).line();

    let Some((set, binding)) = block_header(tree, header, diagnostics) else {
        return (None, start + 1);
    };

    let mut fields = BTreeMap::<u32, PendingField>::new();
    let mut next = start + 1;
    while let Some(&stmt) = statements.get(next).filter(|&&s| !ends_block(tree, s)) {
        next += 1;
        let Some((index, field)) = block_field(tree, stmt, diagnostics) else {
            continue;
        };
        if fields.contains_key(&index) {
            diagnostics.report(
                DiagnosticKind::DuplicateKey,
                tree.node(stmt).line(),
                format!("field {index} already declared in block (set {set}, binding {binding})"),
            );
            continue;
        }
        fields.insert(index, field);
    }

    // Keys are sorted and distinct, so the first position whose key differs
    // from it (or whose data is empty) is the first uncovered index.
    let first_missing = fields
        .iter()
        .enumerate()
        .find(|(i, (index, field))| **index as usize != *i || field.bytes.is_empty())
        .map(|(i, _)| i);
    if let Some(first) = first_missing {
        let count = fields.keys().next_back().map_or(0, |&last| last as usize + 1);
        let covered = fields.values().filter(|f| !f.bytes.is_empty()).count();
        diagnostics.report(
            DiagnosticKind::Syntax,
            line,
            format!(
                "block (set {set}, binding {binding}) rejected: no data for field {first} ({} of {count} missing)",
                count - covered
            ),
        );
        return (None, next);
    }

    let size: usize = fields.values().map(|f| align_up(f.bytes.len())).sum();
    let mut bytes = vec![0u8; size];
    let mut layout = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for (index, field) in fields {
        let padded = align_up(field.bytes.len());
        bytes[offset..offset + field.bytes.len()].copy_from_slice(&field.bytes);
        layout.push(BlockField {
            index,
            ty: field.ty,
            offset,
            size: padded,
            array_len: field.array_len,
        });
        offset += padded;
    }

    log::debug!(
        "block set {set} binding {binding}: {} fields, {size} bytes",
        layout.len()
    );
    (
        Some(UniformBlock {
            set,
            binding,
            size,
            bytes,
            fields: layout,
        }),
        next,
    )
}

/// Assembles every block in the file. Statements outside a block are
/// reported and skipped.
pub fn assemble_blocks(tree: &SyntaxTree<'_>, diagnostics: &mut Diagnostics) -> Vec<UniformBlock> {
    let statements = &tree.statements;
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < statements.len() {
        if is_block_header(tree, statements[i]) {
            let (block, next) = assemble_block(tree, statements, i, diagnostics);
            blocks.extend(block);
            i = next;
        } else {
            diagnostics.report(
                DiagnosticKind::Syntax,
                tree.node(statements[i]).line(),
                format!("{} is not inside a block; skipped", tree.render(statements[i])),
            );
            i += 1;
        }
    }
    blocks
}

fn block_header(
    tree: &SyntaxTree<'_>,
    stmt: NodeId,
    diagnostics: &mut Diagnostics,
) -> Option<(u32, u32)> {
    let line = tree.node(stmt).line();
    let Some(pipe) = tree.strip_groups(stmt).filter(|&n| tree.op(n) == Op::Pipe) else {
        diagnostics.report(
            DiagnosticKind::Syntax,
            line,
            format!("expected `(set = N | binding = N)`, found {}", tree.render(stmt)),
        );
        return None;
    };

    let mut set = None;
    let mut binding = None;
    for side in [tree.left(pipe), tree.right(pipe)].into_iter().flatten() {
        let assign = (tree.op(side) == Op::Assign)
            .then(|| Some((tree.leaf_text(tree.left(side)?)?, tree.node(tree.right(side)?))))
            .flatten()
            .filter(|(_, value)| value.token.kind == TokenKind::Int)
            .and_then(|(name, value)| Some((name, value.text().parse::<u32>().ok()?)));
        match assign {
            Some((name, n)) if name.eq_ignore_ascii_case("set") => set = Some(n),
            Some((name, n)) if name.eq_ignore_ascii_case("binding") => binding = Some(n),
            _ => diagnostics.report(
                DiagnosticKind::Syntax,
                line,
                format!("expected `set = N` or `binding = N`, found {}", tree.render(side)),
            ),
        }
    }

    let mut or_default = |slot: Option<u32>, name: &str| {
        slot.unwrap_or_else(|| {
            diagnostics.report(
                DiagnosticKind::Syntax,
                line,
                format!("block header has no `{name}`; using 0"),
            );
            0
        })
    };
    let set = or_default(set, "set");
    let binding = or_default(binding, "binding");
    Some((set, binding))
}

fn block_field(
    tree: &SyntaxTree<'_>,
    stmt: NodeId,
    diagnostics: &mut Diagnostics,
) -> Option<(u32, PendingField)> {
    let decl = declaration(tree, stmt, diagnostics)?;

    if decl.name.kind != TokenKind::Int || decl.name.text.starts_with('-') {
        diagnostics.report(
            DiagnosticKind::Syntax,
            decl.line(),
            format!("block field index must be a non-negative integer, found `{}`", decl.name.text),
        );
        return None;
    }
    let Ok(index) = decl.name.text.parse::<u32>() else {
        diagnostics.report(
            DiagnosticKind::Syntax,
            decl.line(),
            format!("block field index `{}` is out of range", decl.name.text),
        );
        return None;
    };

    let Some(tag) = decl.tag else {
        unknown_type(&decl, diagnostics);
        return None;
    };
    if tag.natural_size().is_none() {
        diagnostics.report(
            DiagnosticKind::Type,
            decl.line(),
            format!("{} cannot be stored in a uniform block", tag.name()),
        );
        return None;
    }

    let value = materialize_value(tree, tag, decl.value, diagnostics);
    let array_len = match &value {
        Value::Array { items, .. } => Some(items.len()),
        _ => None,
    };
    let mut bytes = Vec::new();
    write_value(&value, &mut bytes);
    Some((index, PendingField { ty: tag, bytes, array_len }))
}

/// Appends the unpadded in-memory representation of `value`.
pub fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bool(v) => out.extend_from_slice(bytemuck::bytes_of(&u32::from(*v))),
        Value::I8(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::I16(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::I32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::I64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::U8(v) => out.push(*v),
        Value::U16(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::U32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::U64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::F32(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::F64(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::IVec2(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::IVec3(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::IVec4(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::Vec2(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::Vec3(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::Vec4(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        Value::Array { items, .. } => items.iter().for_each(|item| write_value(item, out)),
        Value::Str(_) | Value::Object(_) => {}
    }
}

/// Reads back one element of type `tag` from the start of `bytes`.
pub fn read_value(tag: TypeTag, bytes: &[u8]) -> Option<Value> {
    let size = tag.natural_size()?;
    let raw = bytes.get(..size)?;
    Some(match tag {
        TypeTag::Bool => Value::Bool(bytemuck::pod_read_unaligned::<u32>(raw) != 0),
        TypeTag::I8 => Value::I8(bytemuck::pod_read_unaligned(raw)),
        TypeTag::I16 => Value::I16(bytemuck::pod_read_unaligned(raw)),
        TypeTag::I32 => Value::I32(bytemuck::pod_read_unaligned(raw)),
        TypeTag::I64 => Value::I64(bytemuck::pod_read_unaligned(raw)),
        TypeTag::U8 => Value::U8(raw[0]),
        TypeTag::U16 => Value::U16(bytemuck::pod_read_unaligned(raw)),
        TypeTag::U32 => Value::U32(bytemuck::pod_read_unaligned(raw)),
        TypeTag::U64 => Value::U64(bytemuck::pod_read_unaligned(raw)),
        TypeTag::R32 => Value::F32(bytemuck::pod_read_unaligned(raw)),
        TypeTag::R64 => Value::F64(bytemuck::pod_read_unaligned(raw)),
        TypeTag::IVec2 => Value::IVec2(bytemuck::pod_read_unaligned(raw)),
        TypeTag::IVec3 => Value::IVec3(bytemuck::pod_read_unaligned(raw)),
        TypeTag::IVec4 => Value::IVec4(bytemuck::pod_read_unaligned(raw)),
        TypeTag::Vec2 => Value::Vec2(bytemuck::pod_read_unaligned(raw)),
        TypeTag::Vec3 => Value::Vec3(bytemuck::pod_read_unaligned(raw)),
        TypeTag::Vec4 => Value::Vec4(bytemuck::pod_read_unaligned(raw)),
        TypeTag::Str | TypeTag::Obj => return None,
    })
}

/// Decodes the value stored for `field`.
pub fn field_value(block: &UniformBlock, field: &BlockField) -> Option<Value> {
    let bytes = block.field_bytes(field);
    match field.array_len {
        Some(len) => {
            let step = field.ty.natural_size()?;
            let items = (0..len)
                .map(|i| read_value(field.ty, bytes.get(i * step..)?))
                .collect::<Option<Vec<_>>>()?;
            Some(Value::Array {
                elem: field.ty,
                items,
            })
        }
        None => read_value(field.ty, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::parse;

    fn assemble_src(src: &str) -> (Vec<UniformBlock>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tree = parse(src, &mut diags);
        let blocks = assemble_blocks(&tree, &mut diags);
        (blocks, diags)
    }

    #[test]
    fn test_scalar_and_vec3_layout() {
        let (blocks, diags) = assemble_src("(set = 0 | binding = 1)\n0 : i32 = 5\n1 : vec3 = [1,2,3]\n");
        assert!(diags.is_empty(), "{diags:?}");
        let block = &blocks[0];
        assert_eq!((block.set, block.binding), (0, 1));
        assert_eq!(block.size, 32);
        assert_eq!(block.bytes.len(), 32);

        let offsets: Vec<_> = block.fields.iter().map(|f| (f.index, f.offset)).collect();
        assert_eq!(offsets, vec![(0, 0), (1, 16)]);

        let int: i32 = bytemuck::pod_read_unaligned(&block.bytes[0..4]);
        assert_eq!(int, 5);
        let v: [f32; 3] = bytemuck::pod_read_unaligned(&block.bytes[16..28]);
        assert_eq!(v, [1.0, 2.0, 3.0]);
        // padding stays zeroed
        assert!(block.bytes[4..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fields_are_placed_by_index_not_line_order() {
        let src = "(binding = 3 | set = 2)\n2 : vec4 = [1, 1, 1, 1]\n0 : r32 = 0.5\n1 : i64 = -2\n";
        let (blocks, diags) = assemble_src(src);
        assert!(diags.is_empty(), "{diags:?}");
        let block = &blocks[0];
        assert_eq!((block.set, block.binding), (2, 3));
        assert_eq!(block.size, 48);
        assert_eq!(block.field(0).unwrap().offset, 0);
        assert_eq!(block.field(1).unwrap().offset, 16);
        assert_eq!(block.field(2).unwrap().offset, 32);
        assert_eq!(field_value(block, block.field(1).unwrap()), Some(Value::I64(-2)));
        assert_eq!(field_value(block, block.field(0).unwrap()), Some(Value::F32(0.5)));
    }

    #[test]
    fn test_scalar_arrays_pack_tightly() {
        let src = "(set = 0 | binding = 0)\n0 : r32 = [1.0, 2.0, 3.0, 4.0, 5.0]\n1 : u32 = 9, 8\n";
        let (blocks, diags) = assemble_src(src);
        assert!(diags.is_empty(), "{diags:?}");
        let block = &blocks[0];
        let first = block.field(0).unwrap();
        assert_eq!((first.size, first.array_len), (32, Some(5)));
        assert_eq!(block.field(1).unwrap().offset, 32);
        assert_eq!(block.size, 48);
        assert_eq!(
            field_value(block, block.field(1).unwrap()),
            Some(Value::Array {
                elem: TypeTag::U32,
                items: vec![Value::U32(9), Value::U32(8)],
            })
        );
    }

    #[test]
    fn test_gap_rejects_block() {
        let src = "(set = 0 | binding = 0)\n0 : i32 = 1\n2 : i32 = 3\n(set = 1 | binding = 0)\n0 : i32 = 1\n";
        let (blocks, diags) = assemble_src(src);
        assert_eq!(blocks.len(), 1, "second block still assembles");
        assert_eq!(blocks[0].set, 1);
        assert_eq!(diags.count(DiagnosticKind::Syntax), 1);
    }

    #[test]
    fn test_large_field_indices() {
        let test_cases = vec![
            // sole field at the top of the u32 range leaves 0.. uncovered
            ("4294967295 : i32 = 7", "no data for field 0"),
            ("5000000 : i32 = 7", "no data for field 0"),
            ("0 : i32 = 1\n1 : i32 = 2\n4000000000 : i32 = 3", "no data for field 2"),
        ];
        for (fields, expected) in test_cases {
            let src = format!("(set = 0 | binding = 0)\n{fields}\n");
            let (blocks, diags) = assemble_src(&src);
            assert!(blocks.is_empty(), "{src:?} produced {blocks:?}");
            assert_eq!(diags.count(DiagnosticKind::Syntax), 1, "{src:?}: {diags:?}");

            let message = &diags.iter().next().unwrap().message;
            assert!(message.contains(expected), "{src:?}: {message}");
            assert!(message.len() < 200, "{src:?}: diagnostic is {} bytes", message.len());
        }
    }

    #[test]
    fn test_index_out_of_u32_range_is_not_truncated() {
        let test_cases = vec!["4294967296", "99999999999999999999999"];
        for index in test_cases {
            let src = format!("(set = 0 | binding = 0)\n0 : i32 = 1\n{index} : i32 = 7\n");
            let (blocks, diags) = assemble_src(&src);
            assert_eq!(diags.count(DiagnosticKind::Syntax), 1, "{src:?}: {diags:?}");
            assert!(diags.iter().next().unwrap().message.contains("out of range"));
            // the wrapped index would have collided with field 0
            assert_eq!(diags.count(DiagnosticKind::DuplicateKey), 0);
            assert_eq!(blocks[0].fields.len(), 1);
            assert_eq!(field_value(&blocks[0], &blocks[0].fields[0]), Some(Value::I32(1)));
        }
    }

    #[test]
    fn test_oversized_header_numbers() {
        let (blocks, diags) = assemble_src("(set = 4294967296 | binding = 1)\n0 : i32 = 1\n");
        assert_eq!((blocks[0].set, blocks[0].binding), (0, 1));
        assert_eq!(diags.count(DiagnosticKind::Syntax), 2);
    }

    #[test]
    fn test_bad_fields() {
        let test_cases = vec![
            ("(set = 0 | binding = 0)\n0 : str = \"x\"\n", DiagnosticKind::Type),
            ("(set = 0 | binding = 0)\n0 : mat4 = 1\n", DiagnosticKind::Type),
            ("(set = 0 | binding = 0)\nfoo : i32 = 1\n", DiagnosticKind::Syntax),
            ("(set = 0 | binding = 0)\n0 : i32 = 1\n0 : i32 = 2\n", DiagnosticKind::DuplicateKey),
        ];
        for (src, kind) in test_cases {
            let (_, diags) = assemble_src(src);
            assert_eq!(diags.count(kind), 1, "source: {src:?}: {diags:?}");
        }
    }

    #[test]
    fn test_duplicate_index_keeps_first() {
        let (blocks, _) = assemble_src("(set = 0 | binding = 0)\n0 : i32 = 1\n0 : i32 = 2\n");
        assert_eq!(field_value(&blocks[0], &blocks[0].fields[0]), Some(Value::I32(1)));
    }

    #[test]
    fn test_header_variants() {
        let (blocks, diags) = assemble_src("SET = 4 | Binding = 5\n0 : u8 = 1\n");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!((blocks[0].set, blocks[0].binding), (4, 5));
        assert_eq!(blocks[0].size, 16);

        let (blocks, diags) = assemble_src("(set = 1 | colour = 2)\n0 : bool = true\n");
        assert_eq!((blocks[0].set, blocks[0].binding), (1, 0));
        assert_eq!(diags.count(DiagnosticKind::Syntax), 2);
        assert_eq!(field_value(&blocks[0], &blocks[0].fields[0]), Some(Value::Bool(true)));
    }

    #[test]
    fn test_stray_statement_outside_block() {
        let (blocks, diags) = assemble_src("0 : i32 = 1\n(set = 0 | binding = 0)\n0 : i32 = 1\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(diags.count(DiagnosticKind::Syntax), 1);
    }

    #[test]
    fn test_empty_block_has_no_fields() {
        let (blocks, diags) = assemble_src("(set = 0 | binding = 0)\n");
        assert!(diags.is_empty());
        assert_eq!(blocks[0].size, 0);
        assert!(blocks[0].fields.is_empty());
    }
}
