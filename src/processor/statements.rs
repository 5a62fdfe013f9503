//! Splits a token stream into lines and collects one tree per non-blank line.

use super::ast::SyntaxTree;
use super::diagnostics::Diagnostics;
use super::lexer::{TokenKind, Tokens};
use super::tree_builder::build_statement;

/// Builds every statement in `tokens`, in source order.
///
/// Blank lines (and lines whose statement was rejected) contribute nothing.
pub fn sequence<'a>(tokens: &Tokens<'a>, diagnostics: &mut Diagnostics) -> SyntaxTree<'a> {
    let mut tree = SyntaxTree::with_capacity(tokens.line_count + 1);

    for line in tokens.tokens.split(|t| t.kind == TokenKind::Newline) {
        if let Some(root) = build_statement(&mut tree, line, diagnostics) {
            tree.statements.push(root);
        }
    }

    log::debug!(
        "sequenced {} statements from {} lines",
        tree.statements.len(),
        tokens.line_count + 1
    );
    tree
}
