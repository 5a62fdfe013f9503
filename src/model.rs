use serde::Serialize;

use crate::processor::diagnostics::{DiagnosticKind, Diagnostics};
use crate::processor::table::Map;

/// Uniform buffer fields are padded to this many bytes.
pub const BLOCK_ALIGNMENT: usize = 16;

/// Type tags accepted after the `:` of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    R32,
    R64,
    IVec2,
    IVec3,
    IVec4,
    Vec2,
    Vec3,
    Vec4,
    Str,
    Obj,
}

impl TypeTag {
    pub const ALL: &'static [TypeTag] = &[
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::R32,
        Self::R64,
        Self::IVec2,
        Self::IVec3,
        Self::IVec4,
        Self::Vec2,
        Self::Vec3,
        Self::Vec4,
        Self::Str,
        Self::Obj,
    ];

    /// Case-sensitive lookup of a type name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::R32 => "r32",
            Self::R64 => "r64",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Str => "str",
            Self::Obj => "obj",
        }
    }

    /// Component count for vector tags.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::IVec2 | Self::Vec2 => Some(2),
            Self::IVec3 | Self::Vec3 => Some(3),
            Self::IVec4 | Self::Vec4 => Some(4),
            _ => None,
        }
    }

    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Str | Self::Obj) && self.arity().is_none()
    }

    /// Unpadded size inside a uniform block, `None` if the type cannot live
    /// in one. Booleans occupy a full 32-bit word.
    pub fn natural_size(self) -> Option<usize> {
        match self {
            Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::Bool | Self::I32 | Self::U32 | Self::R32 => Some(4),
            Self::I64 | Self::U64 | Self::R64 | Self::IVec2 | Self::Vec2 => Some(8),
            Self::IVec3 | Self::Vec3 => Some(12),
            Self::IVec4 | Self::Vec4 => Some(16),
            Self::Str | Self::Obj => None,
        }
    }
}

/// Rounds `size` up to the next multiple of [`BLOCK_ALIGNMENT`].
pub fn align_up(size: usize) -> usize {
    size.div_ceil(BLOCK_ALIGNMENT) * BLOCK_ALIGNMENT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    #[serde(rename = "r32")]
    F32(f32),
    #[serde(rename = "r64")]
    F64(f64),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Str(String),
    #[serde(rename = "obj")]
    Object(Object),
    Array { elem: TypeTag, items: Vec<Value> },
}

impl Value {
    /// Tag of the value, or of its elements for an array.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Bool(_) => TypeTag::Bool,
            Self::I8(_) => TypeTag::I8,
            Self::I16(_) => TypeTag::I16,
            Self::I32(_) => TypeTag::I32,
            Self::I64(_) => TypeTag::I64,
            Self::U8(_) => TypeTag::U8,
            Self::U16(_) => TypeTag::U16,
            Self::U32(_) => TypeTag::U32,
            Self::U64(_) => TypeTag::U64,
            Self::F32(_) => TypeTag::R32,
            Self::F64(_) => TypeTag::R64,
            Self::IVec2(_) => TypeTag::IVec2,
            Self::IVec3(_) => TypeTag::IVec3,
            Self::IVec4(_) => TypeTag::IVec4,
            Self::Vec2(_) => TypeTag::Vec2,
            Self::Vec3(_) => TypeTag::Vec3,
            Self::Vec4(_) => TypeTag::Vec4,
            Self::Str(_) => TypeTag::Str,
            Self::Object(_) => TypeTag::Obj,
            Self::Array { elem, .. } => *elem,
        }
    }
}

/// A named group of typed members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    pub name: String,
    pub members: Map<String, Value>,
}

pub type ObjectTable = Map<String, Object>;

/// Conversion used by the typed getters on [`Object`].
pub trait FromValue: Sized + Default {
    const TAG: TypeTag;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value {
    ($ty:ty, $tag:ident, $variant:ident) => {
        impl FromValue for $ty {
            const TAG: TypeTag = TypeTag::$tag;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

from_value!(bool, Bool, Bool);
from_value!(i32, I32, I32);
from_value!(i64, I64, I64);
from_value!(u32, U32, U32);
from_value!(u64, U64, U64);
from_value!(f32, R32, F32);
from_value!([f32; 2], Vec2, Vec2);
from_value!([f32; 3], Vec3, Vec3);
from_value!([f32; 4], Vec4, Vec4);
from_value!(String, Str, Str);

impl Default for Object {
    fn default() -> Self {
        Self::new("")
    }
}

impl FromValue for Object {
    const TAG: TypeTag = TypeTag::Obj;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(obj.clone()),
            _ => None,
        }
    }
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Map::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    /// Typed lookup. A missing member or a member of another type is
    /// reported and yields `T::default()`.
    pub fn get<T: FromValue>(&self, name: &str, diagnostics: &mut Diagnostics) -> T {
        match self.members.get(name) {
            Some(value) => T::from_value(value).unwrap_or_else(|| {
                diagnostics.report(
                    DiagnosticKind::LookupMiss,
                    0,
                    format!(
                        "{}.{name} is {}, not {}",
                        self.name,
                        value.type_tag().name(),
                        T::TAG.name()
                    ),
                );
                T::default()
            }),
            None => {
                diagnostics.report(
                    DiagnosticKind::LookupMiss,
                    0,
                    format!("{} has no member `{name}`", self.name),
                );
                T::default()
            }
        }
    }

    pub fn get_bool(&self, name: &str, diagnostics: &mut Diagnostics) -> bool {
        self.get(name, diagnostics)
    }

    pub fn get_i32(&self, name: &str, diagnostics: &mut Diagnostics) -> i32 {
        self.get(name, diagnostics)
    }

    pub fn get_i64(&self, name: &str, diagnostics: &mut Diagnostics) -> i64 {
        self.get(name, diagnostics)
    }

    pub fn get_u32(&self, name: &str, diagnostics: &mut Diagnostics) -> u32 {
        self.get(name, diagnostics)
    }

    pub fn get_u64(&self, name: &str, diagnostics: &mut Diagnostics) -> u64 {
        self.get(name, diagnostics)
    }

    pub fn get_r32(&self, name: &str, diagnostics: &mut Diagnostics) -> f32 {
        self.get(name, diagnostics)
    }

    pub fn get_vec2(&self, name: &str, diagnostics: &mut Diagnostics) -> [f32; 2] {
        self.get(name, diagnostics)
    }

    pub fn get_vec3(&self, name: &str, diagnostics: &mut Diagnostics) -> [f32; 3] {
        self.get(name, diagnostics)
    }

    pub fn get_vec4(&self, name: &str, diagnostics: &mut Diagnostics) -> [f32; 4] {
        self.get(name, diagnostics)
    }

    pub fn get_str(&self, name: &str, diagnostics: &mut Diagnostics) -> String {
        self.get(name, diagnostics)
    }

    pub fn get_obj(&self, name: &str, diagnostics: &mut Diagnostics) -> Object {
        self.get(name, diagnostics)
    }
}

/// Placement of one field inside a [`UniformBlock`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockField {
    pub index: u32,
    pub ty: TypeTag,
    /// Byte offset inside the block buffer.
    pub offset: usize,
    /// Padded size in bytes.
    pub size: usize,
    /// Element count when the field holds an array of scalars.
    pub array_len: Option<usize>,
}

/// One densely packed uniform or push-constant block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformBlock {
    pub set: u32,
    pub binding: u32,
    pub size: usize,
    pub bytes: Vec<u8>,
    /// Ordered by index.
    pub fields: Vec<BlockField>,
}

impl UniformBlock {
    pub fn field(&self, index: u32) -> Option<&BlockField> {
        self.fields.iter().find(|f| f.index == index)
    }

    /// Bytes belonging to `field`, padding included.
    pub fn field_bytes(&self, field: &BlockField) -> &[u8] {
        &self.bytes[field.offset..field.offset + field.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::parse(tag.name()), Some(*tag));
        }
        assert_eq!(TypeTag::parse("I32"), None, "type names are case-sensitive");
        assert_eq!(TypeTag::parse("f32"), None);
    }

    #[test]
    fn test_align_up() {
        let test_cases = vec![(0, 0), (1, 16), (4, 16), (12, 16), (16, 16), (17, 32), (40, 48)];
        for (size, expected) in test_cases {
            assert_eq!(align_up(size), expected, "size {size}");
        }
    }

    #[test]
    fn test_getters_default_on_miss() {
        let mut obj = Object::new("Player");
        obj.members.insert("health".into(), Value::I32(100));
        obj.members.insert("name".into(), Value::Str("hero".into()));

        let mut diags = Diagnostics::new();
        assert_eq!(obj.get_i32("health", &mut diags), 100);
        assert_eq!(obj.get_str("name", &mut diags), "hero");
        assert!(diags.is_empty());

        assert_eq!(obj.get_vec3("position", &mut diags), [0.0; 3]);
        assert_eq!(obj.get_u64("health", &mut diags), 0, "wrong type is a miss");
        assert!(!obj.get_bool("alive", &mut diags));
        assert_eq!(obj.get_obj("weapon", &mut diags), Object::default());
        assert_eq!(diags.count(DiagnosticKind::LookupMiss), 4);
    }

    #[test]
    fn test_value_serializes_with_type_names() {
        let json = serde_json::to_string(&Value::F32(1.5)).unwrap();
        assert_eq!(json, r#"{"r32":1.5}"#);
        let json = serde_json::to_string(&Value::Vec3([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(json, r#"{"vec3":[1.0,2.0,3.0]}"#);
    }
}
