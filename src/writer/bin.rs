//! Dump assembled uniform blocks as raw byte files.

use crate::model::UniformBlock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes one `set{S}_binding{B}.bin` per block and returns the paths.
pub fn emit(blocks: &[UniformBlock], out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(blocks.len());
    for block in blocks {
        let path = out_dir.join(file_name(block));
        fs::write(&path, &block.bytes)?;
        log::info!("wrote {} ({} bytes)", path.display(), block.size);
        written.push(path);
    }
    Ok(written)
}

pub fn file_name(block: &UniformBlock) -> String {
    format!("set{}_binding{}.bin", block.set, block.binding)
}
