//! The language front end.
//!
//! Text goes through the lexer, then one tree per line, then into either the
//! object table or the uniform-block assembler.
pub mod ast;
pub mod block;
pub mod diagnostics;
pub mod lexer;
pub mod object;
pub mod statements;
pub mod table;
pub mod tree_builder;
pub mod value;

use crate::model::{ObjectTable, UniformBlock};
use ast::SyntaxTree;
use diagnostics::{Diagnostics, Parsed};

/// Lexes `src` and builds the statement trees. The returned tree borrows
/// `src` and is meant to be dropped once its values are materialized.
pub fn parse<'a>(src: &'a str, diagnostics: &mut Diagnostics) -> SyntaxTree<'a> {
    let tokens = lexer::tokenize(src, diagnostics);
    statements::sequence(&tokens, diagnostics)
}

/// Parses `src` as a file of `{Header}` objects.
pub fn object_table(src: &str) -> Parsed<ObjectTable> {
    let mut diagnostics = Diagnostics::new();
    let tree = parse(src, &mut diagnostics);
    let value = object::assemble(&tree, &mut diagnostics);
    Parsed { value, diagnostics }
}

/// Parses `src` as a file of uniform blocks.
pub fn uniform_blocks(src: &str) -> Parsed<Vec<UniformBlock>> {
    let mut diagnostics = Diagnostics::new();
    let tree = parse(src, &mut diagnostics);
    let value = block::assemble_blocks(&tree, &mut diagnostics);
    Parsed { value, diagnostics }
}
