//! Writes objects and blocks back out in the description language.
//!
//! The output re-parses to the same values: floats use `Display`, which never
//! switches to exponent notation, and nested objects are written as their own
//! headers ahead of the object that references them.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::model::{Object, ObjectTable, UniformBlock, Value};
use crate::processor::block::field_value;

/// Writes every object in the table, in declaration order.
pub fn write_object_table<W: Write>(out: &mut W, table: &ObjectTable) -> io::Result<()> {
    let mut written = HashSet::new();
    for object in table.values() {
        write_object(out, object, &mut written)?;
    }
    Ok(())
}

fn write_object<'a, W: Write>(
    out: &mut W,
    object: &'a Object,
    written: &mut HashSet<&'a str>,
) -> io::Result<()> {
    if written.contains(object.name.as_str()) {
        return Ok(());
    }
    for value in object.members.values() {
        if let Value::Object(nested) = value {
            write_object(out, nested, written)?;
        }
    }

    if !written.is_empty() {
        writeln!(out)?;
    }
    written.insert(object.name.as_str());
    writeln!(out, "{{{}}}", object.name)?;
    for (name, value) in object.members.iter() {
        writeln!(out, "{name} : {} = {}", value.type_tag().name(), literal(value))?;
    }
    Ok(())
}

pub fn write_blocks<W: Write>(out: &mut W, blocks: &[UniformBlock]) -> io::Result<()> {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_block(out, block)?;
    }
    Ok(())
}

pub fn write_block<W: Write>(out: &mut W, block: &UniformBlock) -> io::Result<()> {
    writeln!(out, "(set = {} | binding = {})", block.set, block.binding)?;
    for field in &block.fields {
        let value = field_value(block, field);
        let text = value.as_ref().map(literal).unwrap_or_default();
        writeln!(out, "{} : {} = {text}", field.index, field.ty.name())?;
    }
    Ok(())
}

/// Source text for the right-hand side of a declaration.
pub fn literal(value: &Value) -> String {
    fn join<T: ToString>(items: &[T]) -> String {
        let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
        format!("[{}]", parts.join(", "))
    }

    match value {
        Value::Bool(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::IVec2(v) => join(v),
        Value::IVec3(v) => join(v),
        Value::IVec4(v) => join(v),
        Value::Vec2(v) => join(v),
        Value::Vec3(v) => join(v),
        Value::Vec4(v) => join(v),
        Value::Str(s) => format!("\"{s}\""),
        Value::Object(obj) => obj.name.clone(),
        Value::Array { items, .. } => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}
