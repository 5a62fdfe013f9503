//! Groups declarations under `{Header}` statements into named objects.

use super::ast::{NodeId, SyntaxTree};
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::value::{declaration, materialize_value, unknown_type};
use crate::model::{Object, ObjectTable, TypeTag, Value};

/// Builds the object table for a parsed file.
///
/// Declarations before the first header have no object to land in and are
/// skipped. A header naming an existing object is reported and its members
/// are dropped; the first definition wins.
pub fn assemble(tree: &SyntaxTree<'_>, diagnostics: &mut Diagnostics) -> ObjectTable {
    let mut table = ObjectTable::new();
    let mut current: Option<(Object, usize)> = None;

    for &stmt in &tree.statements {
        let node = tree.node(stmt);

        if node.is_header() {
            if let Some((object, line)) = current.take() {
                store(&mut table, object, line, diagnostics);
            }
            current = Some((Object::new(node.text()), node.line()));
            continue;
        }

        let Some((object, _)) = current.as_mut() else {
            diagnostics.report(
                DiagnosticKind::Syntax,
                node.line(),
                "declaration before any {Header}; skipped",
            );
            continue;
        };

        let Some(decl) = declaration(tree, stmt, diagnostics) else {
            continue;
        };
        let value = match decl.tag {
            Some(TypeTag::Obj) => {
                let Some(nested) = resolve(&table, tree, decl.value) else {
                    diagnostics.report(
                        DiagnosticKind::LookupMiss,
                        decl.line(),
                        format!(
                            "`{}` references unknown object {}",
                            decl.name.text,
                            tree.render(decl.value)
                        ),
                    );
                    continue;
                };
                Value::Object(nested)
            }
            Some(tag) => materialize_value(tree, tag, decl.value, diagnostics),
            None => unknown_type(&decl, diagnostics),
        };

        if !object.members.insert(decl.name.text.to_string(), value) {
            diagnostics.report(
                DiagnosticKind::DuplicateKey,
                decl.line(),
                format!("{}.{} already defined; keeping the first", object.name, decl.name.text),
            );
        }
    }

    if let Some((object, line)) = current {
        store(&mut table, object, line, diagnostics);
    }

    log::debug!("assembled {} objects", table.len());
    table
}

fn resolve(table: &ObjectTable, tree: &SyntaxTree<'_>, value: NodeId) -> Option<Object> {
    let name = tree.leaf_text(value)?;
    table.get(name).cloned()
}

fn store(table: &mut ObjectTable, object: Object, line: usize, diagnostics: &mut Diagnostics) {
    let name = object.name.clone();
    if !table.insert(name.clone(), object) {
        diagnostics.report(
            DiagnosticKind::DuplicateKey,
            line,
            format!("object {{{name}}} already defined; keeping the first"),
        );
    }
}
