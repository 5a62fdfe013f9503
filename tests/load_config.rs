use std::path::PathBuf;

use resdecl::loader::{self, Material, load_material_from_file};
use resdecl::model::Value;
use resdecl::processor::diagnostics::{DiagnosticKind, Diagnostics};
use resdecl::processor::object_table;
use resdecl::writer::text;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

#[test]
fn loads_player_config() {
    let parsed = loader::load_config_file(fixture("player.rdl")).unwrap();
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.value.len(), 2);

    let mut diags = Diagnostics::new();
    let player = parsed.value.get("Player").unwrap();
    assert_eq!(player.get_str("name", &mut diags), "Ada");
    assert_eq!(player.get_u32("health", &mut diags), 100);
    assert_eq!(player.get_r32("speed", &mut diags), 4.25);
    assert_eq!(player.get_vec3("spawn", &mut diags), [0.0, 1.5, -3.0]);
    assert!(player.get_bool("alive", &mut diags));
    assert_eq!(player.get_obj("weapon", &mut diags).get_i32("damage", &mut diags), 12);
    assert!(diags.is_empty(), "{diags:?}");

    assert_eq!(
        player.value("inventory"),
        Some(&Value::Array {
            elem: resdecl::model::TypeTag::I32,
            items: vec![Value::I32(1), Value::I32(2), Value::I32(3)],
        })
    );
}

#[test]
fn getter_misses_are_reported() {
    let parsed = loader::load_config_file(fixture("player.rdl")).unwrap();
    let player = parsed.value.get("Player").unwrap();

    let mut diags = Diagnostics::new();
    let test_cases = vec![
        // missing member
        player.get_i32("mana", &mut diags),
        // wrong type
        player.get_i32("health", &mut diags),
    ];
    assert_eq!(test_cases, vec![0, 0]);
    assert_eq!(diags.count(DiagnosticKind::LookupMiss), 2);
}

#[test]
fn broken_file_keeps_good_lines() {
    let parsed = loader::load_config_file(fixture("broken.rdl")).unwrap();
    let diags = &parsed.diagnostics;
    assert_eq!(diags.count(DiagnosticKind::DuplicateKey), 1);
    assert_eq!(diags.count(DiagnosticKind::Syntax), 1);
    assert_eq!(diags.count(DiagnosticKind::Type), 1);

    let thing = parsed.value.get("Thing").unwrap();
    assert_eq!(thing.value("a"), Some(&Value::I32(1)));
    assert_eq!(thing.value("b"), None);
    assert_eq!(thing.value("d"), Some(&Value::I32(4)));
}

#[test]
fn formatted_config_reparses_identically() {
    let parsed = loader::load_config_file(fixture("player.rdl")).unwrap();
    let mut out = Vec::new();
    text::write_object_table(&mut out, &parsed.value).unwrap();
    let text = String::from_utf8(out).unwrap();
    let again = object_table(&text);
    assert!(again.is_clean(), "{text}\n{:?}", again.diagnostics);
    assert_eq!(parsed.value, again.value);
}

#[test]
fn loads_blocks_file() {
    let parsed = loader::load_blocks_file(fixture("blocks.rdl")).unwrap();
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);

    let sizes: Vec<_> = parsed.value.iter().map(|b| (b.set, b.binding, b.size)).collect();
    assert_eq!(sizes, vec![(0, 1, 32), (1, 0, 16)]);
}

#[test]
fn loads_material_file() {
    let contents = std::fs::read_to_string(fixture("brick.mat")).unwrap();
    let mut material = Material::default();
    let mut diags = Diagnostics::new();
    load_material_from_file(&mut material, &contents, &mut diags);

    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(material.name, "Brick");
    assert_eq!(material.fragment_shader, "shaders/brick.frag");
    assert_eq!(material.blocks.len(), 1);
    assert_eq!(material.blocks[0].size, 32);
}

#[test]
fn invalid_utf8_keeps_earlier_statements() {
    let parsed = loader::load_config_file(fixture("truncated.rdl")).unwrap();
    assert_eq!(parsed.diagnostics.count(DiagnosticKind::Lex), 1);

    let a = parsed.value.get("A").unwrap();
    assert_eq!(a.value("x"), Some(&Value::I32(1)));
    assert_eq!(a.value("y"), None);
}

#[test]
fn missing_file_is_an_error() {
    let err = loader::load_config_file(fixture("nope.rdl")).unwrap_err();
    assert!(format!("{err:#}").contains("Reading"));
}
