//! Entry points that read files from disk.
pub mod resource;

use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{ObjectTable, UniformBlock};
use crate::processor::{
    self,
    diagnostics::{DiagnosticKind, Diagnostics, Parsed},
};

pub use resource::{
    Material, MaterialInstance, Model, Scene, SceneEntity, load_material_from_file,
    load_material_instance_from_file, load_model_from_file, load_scene_from_file,
};

/// Reads a whole file and parses it as `{Header}` objects.
///
/// Only I/O fails; everything wrong inside the file is reported in the
/// returned diagnostics.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<Parsed<ObjectTable>> {
    let path = path.as_ref();
    let source = read(path)?;
    let mut parsed = processor::object_table(&source.text);
    source.report_tail(&mut parsed.diagnostics);
    log::info!(
        "{}: {} objects, {} diagnostics",
        path.display(),
        parsed.value.len(),
        parsed.diagnostics.len()
    );
    Ok(parsed)
}

/// Reads a whole file and assembles every uniform block in it.
pub fn load_blocks_file(path: impl AsRef<Path>) -> Result<Parsed<Vec<UniformBlock>>> {
    let path = path.as_ref();
    let source = read(path)?;
    let mut parsed = processor::uniform_blocks(&source.text);
    source.report_tail(&mut parsed.diagnostics);
    log::info!(
        "{}: {} blocks, {} diagnostics",
        path.display(),
        parsed.value.len(),
        parsed.diagnostics.len()
    );
    Ok(parsed)
}

/// File contents up to the first byte that is not valid UTF-8.
pub(crate) struct Source {
    pub text: String,
    invalid: Option<u8>,
}

impl Source {
    pub fn from_bytes(mut bytes: Vec<u8>) -> Self {
        let end = std::str::from_utf8(&bytes).err().map(|e| e.valid_up_to());
        let invalid = end.map(|end| {
            let byte = bytes[end];
            bytes.truncate(end);
            byte
        });
        let text = String::from_utf8(bytes).unwrap_or_default();
        Self { text, invalid }
    }

    /// Lexing stops at an unreadable byte; record it like any other lex error.
    pub fn report_tail(&self, diagnostics: &mut Diagnostics) {
        if let Some(byte) = self.invalid {
            let line = self.text.bytes().filter(|&b| b == b'\n').count() + 1;
            diagnostics.report(
                DiagnosticKind::Lex,
                line,
                format!("unrecognised byte 0x{byte:02x}; input ends here"),
            );
        }
    }
}

pub(crate) fn read(path: &Path) -> Result<Source> {
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    log::debug!("File loaded, size: {} bytes", bytes.len());
    Ok(Source::from_bytes(bytes))
}
