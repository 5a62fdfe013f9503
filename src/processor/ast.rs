//! Statement trees, one per non-blank source line.
//!
//! Nodes live in an index arena owned by [`SyntaxTree`]; children and the
//! parent back-reference are `NodeId`s into it. The tree borrows the source
//! buffer through its tokens and is dropped once values are materialized.

use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Paren,
    Square,
}

impl Bracket {
    pub fn open(self) -> char {
        match self {
            Self::Paren => '(',
            Self::Square => '[',
        }
    }

    pub fn close(self) -> char {
        match self {
            Self::Paren => ')',
            Self::Square => ']',
        }
    }
}

/// Operator carried by a node. Leaves carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    None,
    /// `|`, separates the two halves of a block header.
    Pipe,
    /// `=`
    Assign,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// A bracketed group; the enclosed expression is the left child.
    Group(Bracket),
}

impl Op {
    /// Binding strength, loosest first: `| < = < , < : < brackets`.
    pub fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Pipe => 1,
            Self::Assign => 2,
            Self::Comma => 3,
            Self::Colon => 4,
            Self::Group(_) => 5,
        }
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Pipe => Some(Self::Pipe),
            TokenKind::Assign => Some(Self::Assign),
            TokenKind::Comma => Some(Self::Comma),
            TokenKind::Colon => Some(Self::Colon),
            _ => None,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Self::Pipe | Self::Assign | Self::Comma | Self::Colon)
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode<'a> {
    pub token: Token<'a>,
    pub op: Op,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
}

impl<'a> SyntaxNode<'a> {
    pub fn is_leaf(&self) -> bool {
        self.op == Op::None
    }

    pub fn is_header(&self) -> bool {
        self.token.kind == TokenKind::Header
    }

    pub fn text(&self) -> &'a str {
        self.token.text
    }

    pub fn line(&self) -> usize {
        self.token.line
    }
}

/// Arena of nodes plus the ordered statement roots of one parse.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree<'a> {
    nodes: Vec<SyntaxNode<'a>>,
    pub statements: Vec<NodeId>,
}

impl<'a> SyntaxTree<'a> {
    pub fn with_capacity(statements: usize) -> Self {
        Self {
            nodes: Vec::new(),
            statements: Vec::with_capacity(statements),
        }
    }

    pub fn alloc(&mut self, token: Token<'a>, op: Op) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            token,
            op,
            left: None,
            right: None,
            parent: None,
        });
        id
    }

    pub fn set_left(&mut self, parent: NodeId, child: Option<NodeId>) {
        self.nodes[parent.index()].left = child;
        if let Some(child) = child {
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    pub fn set_right(&mut self, parent: NodeId, child: Option<NodeId>) {
        self.nodes[parent.index()].right = child;
        if let Some(child) = child {
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    /// Drops every node allocated at or after `mark`; used to discard a
    /// statement that failed to build.
    pub fn truncate(&mut self, mark: usize) {
        self.nodes.truncate(mark);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode<'a> {
        &self.nodes[id.index()]
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn op(&self, id: NodeId) -> Op {
        self.node(id).op
    }

    /// Looks through any bracket groups wrapping `id`.
    pub fn strip_groups(&self, mut id: NodeId) -> Option<NodeId> {
        while let Op::Group(_) = self.op(id) {
            id = self.left(id)?;
        }
        Some(id)
    }

    /// Text of `id` if it is a leaf.
    pub fn leaf_text(&self, id: NodeId) -> Option<&'a str> {
        let node = self.node(id);
        node.is_leaf().then_some(node.token.text)
    }

    /// Leaves under `id`, depth-first: a node's own value, then its left
    /// subtree, then its right subtree.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_leaf() {
                out.push(id);
            }
            // right first so the left subtree is visited first
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }

    /// Compact s-expression rendering, handy in tests and debug logs.
    pub fn render(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.op {
            Op::None => match node.token.kind {
                TokenKind::Str => format!("\"{}\"", node.token.text),
                TokenKind::Header => format!("{{{}}}", node.token.text),
                _ => node.token.text.to_string(),
            },
            Op::Group(bracket) => {
                let inner = node.left.map(|l| self.render(l)).unwrap_or_default();
                format!("{}{}{}", bracket.open(), inner, bracket.close())
            }
            _ => {
                let l = node.left.map(|l| self.render(l)).unwrap_or_default();
                let r = node.right.map(|r| self.render(r)).unwrap_or_default();
                format!("({} {} {})", node.token.text, l, r)
            }
        }
    }
}
