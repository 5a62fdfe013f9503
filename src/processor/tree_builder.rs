//! Operator-precedence tree builder for a single statement.
//!
//! Works like precedence climbing with an explicit operator stack: an
//! incoming operator first reduces every stacked operator that binds at least
//! as tightly, so equal ranks associate to the left and tighter operators take
//! the preceding operand as their left child. Brackets push a marker that
//! stops reduction until the matching closer arrives.

use super::ast::{Bracket, NodeId, Op, SyntaxTree};
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::lexer::{Token, TokenKind};

enum Pending<'a> {
    Binary(Op, Token<'a>),
    Open(Bracket, Token<'a>),
}

struct StatementBuilder<'t, 'a> {
    tree: &'t mut SyntaxTree<'a>,
    operands: Vec<NodeId>,
    pending: Vec<Pending<'a>>,
    expect_operand: bool,
    just_opened: bool,
}

impl<'t, 'a> StatementBuilder<'t, 'a> {
    fn new(tree: &'t mut SyntaxTree<'a>) -> Self {
        Self {
            tree,
            operands: Vec::new(),
            pending: Vec::new(),
            expect_operand: true,
            just_opened: false,
        }
    }

    fn push_value(&mut self, tok: Token<'a>) -> Result<(), String> {
        if !self.expect_operand {
            return Err(format!("expected an operator before `{}`", tok.text));
        }
        let leaf = self.tree.alloc(tok, Op::None);
        self.operands.push(leaf);
        self.expect_operand = false;
        self.just_opened = false;
        Ok(())
    }

    fn push_operator(&mut self, op: Op, tok: Token<'a>) -> Result<(), String> {
        if self.expect_operand {
            return Err(format!("missing operand before `{}`", tok.text));
        }
        while let Some(Pending::Binary(top, _)) = self.pending.last() {
            if top.rank() < op.rank() {
                break;
            }
            self.reduce()?;
        }
        self.pending.push(Pending::Binary(op, tok));
        self.expect_operand = true;
        self.just_opened = false;
        Ok(())
    }

    fn open(&mut self, bracket: Bracket, tok: Token<'a>) -> Result<(), String> {
        if !self.expect_operand {
            return Err(format!("expected an operator before `{}`", tok.text));
        }
        self.pending.push(Pending::Open(bracket, tok));
        self.just_opened = true;
        Ok(())
    }

    fn close(&mut self, bracket: Bracket) -> Result<(), String> {
        let empty = self.just_opened;
        if self.expect_operand && !empty {
            return Err(format!("missing operand before `{}`", bracket.close()));
        }
        loop {
            match self.pending.last() {
                Some(Pending::Binary(..)) => self.reduce()?,
                Some(Pending::Open(..)) => break,
                None => return Err(format!("`{}` without matching opener", bracket.close())),
            }
        }
        let Some(Pending::Open(opened, tok)) = self.pending.pop() else {
            unreachable!("loop above stops on an opener");
        };
        if opened != bracket {
            return Err(format!(
                "`{}` closes `{}` opened on this line",
                bracket.close(),
                opened.open()
            ));
        }
        let inner = if empty { None } else { self.operands.pop() };
        let group = self.tree.alloc(tok, Op::Group(bracket));
        self.tree.set_left(group, inner);
        self.operands.push(group);
        self.expect_operand = false;
        self.just_opened = false;
        Ok(())
    }

    fn reduce(&mut self) -> Result<(), String> {
        let Some(Pending::Binary(op, tok)) = self.pending.pop() else {
            return Err("internal: reduce without operator".into());
        };
        let (Some(right), Some(left)) = (self.operands.pop(), self.operands.pop()) else {
            return Err(format!("missing operand for `{}`", tok.text));
        };
        let node = self.tree.alloc(tok, op);
        self.tree.set_left(node, Some(left));
        self.tree.set_right(node, Some(right));
        self.operands.push(node);
        Ok(())
    }

    fn finish(mut self) -> Result<Option<NodeId>, String> {
        if self.pending.is_empty() && self.operands.is_empty() {
            return Ok(None);
        }
        if self.expect_operand {
            return Err("statement ends with a dangling operator".into());
        }
        while let Some(top) = self.pending.last() {
            match top {
                Pending::Binary(..) => self.reduce()?,
                Pending::Open(bracket, _) => {
                    return Err(format!("unclosed `{}`", bracket.open()));
                }
            }
        }
        match self.operands.as_slice() {
            [root] => Ok(Some(*root)),
            _ => Err("statement does not reduce to a single expression".into()),
        }
    }
}

/// Builds the tree for one line of tokens (no trailing newline).
///
/// Returns `None` for a blank line or a statement that failed to build; the
/// latter is reported as a syntax error and its nodes are discarded.
pub fn build_statement<'a>(
    tree: &mut SyntaxTree<'a>,
    line: &[Token<'a>],
    diagnostics: &mut Diagnostics,
) -> Option<NodeId> {
    let first = line.first()?;

    if first.kind == TokenKind::Header {
        let root = tree.alloc(*first, Op::None);
        if let Some(extra) = line.get(1).filter(|t| t.kind != TokenKind::Invalid) {
            diagnostics.report(
                DiagnosticKind::Syntax,
                extra.line,
                format!("unexpected `{}` after header {{{}}}", extra.text, first.text),
            );
        }
        return Some(root);
    }

    let mark = tree.node_count();
    match build_expression(tree, line) {
        Ok(root) => root,
        Err(BuildError::Invalid) => {
            // already reported by the lexer
            tree.truncate(mark);
            None
        }
        Err(BuildError::Syntax(message)) => {
            diagnostics.report(DiagnosticKind::Syntax, first.line, message);
            tree.truncate(mark);
            None
        }
    }
}

enum BuildError {
    Invalid,
    Syntax(String),
}

impl From<String> for BuildError {
    fn from(message: String) -> Self {
        Self::Syntax(message)
    }
}

fn build_expression<'a>(
    tree: &mut SyntaxTree<'a>,
    line: &[Token<'a>],
) -> Result<Option<NodeId>, BuildError> {
    let mut builder = StatementBuilder::new(tree);
    for tok in line {
        match tok.kind {
            k if k.is_value() => builder.push_value(*tok)?,
            TokenKind::LParen => builder.open(Bracket::Paren, *tok)?,
            TokenKind::LBracket => builder.open(Bracket::Square, *tok)?,
            TokenKind::RParen => builder.close(Bracket::Paren)?,
            TokenKind::RBracket => builder.close(Bracket::Square)?,
            TokenKind::Header => {
                return Err(format!("header {{{}}} must start its own line", tok.text).into());
            }
            TokenKind::Invalid => return Err(BuildError::Invalid),
            kind => match Op::from_token(kind) {
                Some(op) => builder.push_operator(op, *tok)?,
                None => return Err(format!("unexpected `{}`", tok.text).into()),
            },
        }
    }
    Ok(builder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::tokenize;

    fn render_line(src: &str) -> (Option<String>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let toks = tokenize(src, &mut diags);
        let mut tree = SyntaxTree::default();
        let root = build_statement(&mut tree, &toks.tokens, &mut diags);
        (root.map(|r| tree.render(r)), diags)
    }

    #[test]
    fn test_precedence_shapes() {
        let test_cases = vec![
            ("a : i32 = 1", "(= (: a i32) 1)"),
            ("a:vec3=[1.0,2.0,3.0]", "(= (: a vec3) [(, (, 1.0 2.0) 3.0)])"),
            ("(set = 0 | binding = 1)", "((| (= set 0) (= binding 1)))"),
            ("set = 0 | binding = 1", "(| (= set 0) (= binding 1))"),
            ("0 : r32 = 1.0, 2.0", "(= (: 0 r32) (, 1.0 2.0))"),
            ("a = b = c", "(= (= a b) c)"),
            ("x : s = \"hi\"", "(= (: x s) \"hi\")"),
            ("v = [[1, 2], [3]]", "(= v [(, [(, 1 2)] [3])])"),
            ("e : vec2 = []", "(= (: e vec2) [])"),
        ];

        for (src, expected) in test_cases {
            let (rendered, diags) = render_line(src);
            assert_eq!(rendered.as_deref(), Some(expected), "source: {src}");
            assert!(diags.is_empty(), "source: {src}: {diags:?}");
        }
    }

    #[test]
    fn test_parent_links_point_back_up() {
        let mut diags = Diagnostics::new();
        let toks = tokenize("a : i32 = 1", &mut diags);
        let mut tree = SyntaxTree::default();
        let root = build_statement(&mut tree, &toks.tokens, &mut diags).unwrap();
        assert_eq!(tree.parent(root), None);
        let colon = tree.left(root).unwrap();
        assert_eq!(tree.parent(colon), Some(root));
        let name = tree.left(colon).unwrap();
        assert_eq!(tree.parent(name), Some(colon));
        assert_eq!(tree.leaf_text(name), Some("a"));
    }

    #[test]
    fn test_malformed_statements_are_skipped() {
        let test_cases = vec![
            "(a,b]",
            "[a,b)",
            "a = 1)",
            "a = [1, 2",
            "a : = 1",
            "a : i32 =",
            "a b",
            "= 1",
            "a = 1 {Header}",
        ];

        for src in test_cases {
            let (rendered, diags) = render_line(src);
            assert_eq!(rendered, None, "source: {src}");
            assert_eq!(diags.count(DiagnosticKind::Syntax), 1, "source: {src}");
        }
    }

    #[test]
    fn test_failed_statement_leaves_no_nodes() {
        let mut diags = Diagnostics::new();
        let toks = tokenize("a = [1, 2", &mut diags);
        let mut tree = SyntaxTree::default();
        assert!(build_statement(&mut tree, &toks.tokens, &mut diags).is_none());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_header_is_single_leaf() {
        let (rendered, diags) = render_line("{MyObject}");
        assert_eq!(rendered.as_deref(), Some("{MyObject}"));
        assert!(diags.is_empty());

        let (rendered, diags) = render_line("{MyObject} x");
        assert_eq!(rendered.as_deref(), Some("{MyObject}"));
        assert_eq!(diags.count(DiagnosticKind::Syntax), 1);
    }

    #[test]
    fn test_depth_first_leaf_order() {
        let mut diags = Diagnostics::new();
        let toks = tokenize("[1, [2, 3], 4]", &mut diags);
        let mut tree = SyntaxTree::default();
        let root = build_statement(&mut tree, &toks.tokens, &mut diags).unwrap();
        let texts: Vec<_> = tree
            .leaves(root)
            .into_iter()
            .filter_map(|id| tree.leaf_text(id))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
    }
}
