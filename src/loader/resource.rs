//! Engine resource files: materials, material instances, models and scenes.
//!
//! A resource file is a `{Name}` header, declarations routed to the
//! resource's fields by name, and optionally uniform blocks. Each resource
//! kind has one dispatch table from field name to setter, built on first use.

use std::sync::LazyLock;

use serde::Serialize;

use crate::model::{FromValue, TypeTag, UniformBlock, Value};
use crate::processor::block::{assemble_block, is_block_header};
use crate::processor::diagnostics::{DiagnosticKind, Diagnostics};
use crate::processor::table::Map;
use crate::processor::{parse, value};

/// Stores one value into a resource; `Err` carries the expected type.
pub type Setter<T> = fn(&mut T, &Value) -> Result<(), TypeTag>;

pub struct ResourceSchema<T> {
    kind: &'static str,
    setters: Map<&'static str, Setter<T>>,
    header: fn(&mut T, &str),
    block: Option<fn(&mut T, UniformBlock)>,
}

impl<T> ResourceSchema<T> {
    fn new(kind: &'static str, header: fn(&mut T, &str), fields: &[(&'static str, Setter<T>)]) -> Self {
        let mut setters = Map::with_capacity(fields.len() * 2 + 1);
        for &(name, setter) in fields {
            setters.insert(name, setter);
        }
        Self {
            kind,
            setters,
            header,
            block: None,
        }
    }

    fn with_blocks(mut self, block: fn(&mut T, UniformBlock)) -> Self {
        self.block = Some(block);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.setters.keys().copied()
    }

    fn apply(&self, out: &mut T, name: &str, value: &Value, line: usize, diagnostics: &mut Diagnostics) {
        let Some(setter) = self.setters.get(name) else {
            diagnostics.report(
                DiagnosticKind::LookupMiss,
                line,
                format!("{} has no field `{name}`", self.kind),
            );
            return;
        };
        if let Err(expected) = setter(out, value) {
            diagnostics.report(
                DiagnosticKind::Type,
                line,
                format!(
                    "{}.{name} expects {}, found {}",
                    self.kind,
                    expected.name(),
                    value.type_tag().name()
                ),
            );
        }
    }
}

fn expect<V: FromValue>(value: &Value) -> Result<V, TypeTag> {
    V::from_value(value).ok_or(V::TAG)
}

/// Runs the shared pipeline and routes every statement through `schema`.
pub fn load_resource<T>(
    out: &mut T,
    contents: &str,
    schema: &ResourceSchema<T>,
    diagnostics: &mut Diagnostics,
) {
    let tree = parse(contents, diagnostics);
    let statements = &tree.statements;
    let mut seen_header = false;
    let mut i = 0;

    while i < statements.len() {
        let stmt = statements[i];
        let node = tree.node(stmt);

        if is_block_header(&tree, stmt) {
            let (block, next) = assemble_block(&tree, statements, i, diagnostics);
            match (block, schema.block) {
                (Some(block), Some(store)) => store(out, block),
                (Some(_), None) => diagnostics.report(
                    DiagnosticKind::Syntax,
                    node.line(),
                    format!("{} files have no uniform blocks", schema.kind),
                ),
                (None, _) => {}
            }
            i = next;
            continue;
        }
        i += 1;

        if node.is_header() {
            seen_header = true;
            (schema.header)(out, node.text());
            continue;
        }
        if !seen_header {
            diagnostics.report(
                DiagnosticKind::Syntax,
                node.line(),
                format!("{} field before the {{Name}} header; skipped", schema.kind),
            );
            continue;
        }
        if let Some((name, value)) = value::materialize(&tree, stmt, diagnostics) {
            schema.apply(out, name, &value, node.line(), diagnostics);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub double_sided: bool,
    pub transparent: bool,
    pub blocks: Vec<UniformBlock>,
}

static MATERIAL: LazyLock<ResourceSchema<Material>> = LazyLock::new(|| {
    ResourceSchema::<Material>::new(
        "material",
        |m, name| m.name = name.to_string(),
        &[
            ("vertex", |m, v| expect(v).map(|x| m.vertex_shader = x)),
            ("fragment", |m, v| expect(v).map(|x| m.fragment_shader = x)),
            ("double_sided", |m, v| expect(v).map(|x| m.double_sided = x)),
            ("transparent", |m, v| expect(v).map(|x| m.transparent = x)),
        ],
    )
    .with_blocks(|m, block| m.blocks.push(block))
});

pub fn load_material_from_file(out: &mut Material, contents: &str, diagnostics: &mut Diagnostics) {
    load_resource(out, contents, &MATERIAL, diagnostics);
}

/// A material with its uniform values overridden.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialInstance {
    pub name: String,
    pub material: String,
    pub blocks: Vec<UniformBlock>,
}

static MATERIAL_INSTANCE: LazyLock<ResourceSchema<MaterialInstance>> = LazyLock::new(|| {
    ResourceSchema::<MaterialInstance>::new(
        "material instance",
        |m, name| m.name = name.to_string(),
        &[("material", |m, v| expect(v).map(|x| m.material = x))],
    )
    .with_blocks(|m, block| m.blocks.push(block))
});

pub fn load_material_instance_from_file(
    out: &mut MaterialInstance,
    contents: &str,
    diagnostics: &mut Diagnostics,
) {
    load_resource(out, contents, &MATERIAL_INSTANCE, diagnostics);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub name: String,
    pub mesh: String,
    pub material: String,
    pub scale: [f32; 3],
    pub cast_shadows: bool,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: String::new(),
            material: String::new(),
            scale: [1.0; 3],
            cast_shadows: true,
        }
    }
}

static MODEL: LazyLock<ResourceSchema<Model>> = LazyLock::new(|| {
    ResourceSchema::<Model>::new(
        "model",
        |m, name| m.name = name.to_string(),
        &[
            ("mesh", |m, v| expect(v).map(|x| m.mesh = x)),
            ("material", |m, v| expect(v).map(|x| m.material = x)),
            ("scale", |m, v| expect(v).map(|x| m.scale = x)),
            ("cast_shadows", |m, v| expect(v).map(|x| m.cast_shadows = x)),
        ],
    )
});

pub fn load_model_from_file(out: &mut Model, contents: &str, diagnostics: &mut Diagnostics) {
    load_resource(out, contents, &MODEL, diagnostics);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEntity {
    pub name: String,
    pub model: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl SceneEntity {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: String::new(),
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

/// Every `{Name}` header in a scene file starts a new entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub entities: Vec<SceneEntity>,
}

impl Scene {
    fn current(&mut self) -> &mut SceneEntity {
        if self.entities.is_empty() {
            self.entities.push(SceneEntity::new(""));
        }
        let last = self.entities.len() - 1;
        &mut self.entities[last]
    }
}

static SCENE: LazyLock<ResourceSchema<Scene>> = LazyLock::new(|| {
    ResourceSchema::<Scene>::new(
        "scene",
        |s, name| s.entities.push(SceneEntity::new(name)),
        &[
            ("model", |s, v| expect(v).map(|x| s.current().model = x)),
            ("position", |s, v| expect(v).map(|x| s.current().position = x)),
            ("rotation", |s, v| expect(v).map(|x| s.current().rotation = x)),
            ("scale", |s, v| expect(v).map(|x| s.current().scale = x)),
        ],
    )
});

pub fn load_scene_from_file(out: &mut Scene, contents: &str, diagnostics: &mut Diagnostics) {
    load_resource(out, contents, &SCENE, diagnostics);
}
