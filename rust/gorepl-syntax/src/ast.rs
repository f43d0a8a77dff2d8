//! Syntax nodes for REPL fragments.
//!
//! Nodes keep their token stream and are rendered back to source by the
//! [`printer`](crate::printer); the parser only records the structure the
//! session needs (bound names, declaration names).

use crate::printer;
use crate::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Func,
    Type,
    Var,
    Const,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    /// Names introduced by the declaration (empty for grouped forms).
    pub names: Vec<String>,
    pub tokens: Vec<Token>,
}

impl Decl {
    pub fn render(&self) -> String {
        printer::render(&self.tokens)
    }
}

/// How a binding statement introduces or updates its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOp {
    /// `a, b := ...`
    Define,
    /// `a, b = ...`
    Assign,
    /// `a += ...` and the other compound assignments
    Update,
    /// `var a, b T = ...` inside a function body
    Var,
}

/// An assignment-form statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub op: BindOp,
    /// Rendered left-hand side expressions, in order.
    pub targets: Vec<String>,
    pub tokens: Vec<Token>,
}

impl Binding {
    pub fn render(&self) -> String {
        printer::render(&self.tokens)
    }

    /// Targets that must be passed through the sink. The blank identifier is
    /// not a value and is skipped.
    pub fn sink_targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str).filter(|t| *t != "_")
    }
}

/// Any statement that is not a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub tokens: Vec<Token>,
}

impl Statement {
    pub fn render(&self) -> String {
        printer::render(&self.tokens)
    }
}

/// A statement as stored in the session body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Binding(Binding),
    Plain(Statement),
}

impl Stmt {
    pub fn render(&self) -> String {
        match self {
            Stmt::Binding(b) => b.render(),
            Stmt::Plain(s) => s.render(),
        }
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, Stmt::Binding(_))
    }

    pub fn sink_targets(&self) -> Vec<&str> {
        match self {
            Stmt::Binding(b) => b.sink_targets().collect(),
            Stmt::Plain(_) => Vec::new(),
        }
    }
}

/// The parse of one line of code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Declarations(Vec<Decl>),
    Statements(Vec<Stmt>),
}

impl Fragment {
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            Fragment::Declarations(decls) => decls.into_iter().map(Node::Declaration).collect(),
            Fragment::Statements(stmts) => stmts.into_iter().map(Node::from).collect(),
        }
    }
}

/// Every kind of program piece a REPL line can contribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Import(String),
    Declaration(Decl),
    Statement(Statement),
    Binding(Binding),
}

impl From<Stmt> for Node {
    fn from(stmt: Stmt) -> Self {
        match stmt {
            Stmt::Binding(b) => Node::Binding(b),
            Stmt::Plain(s) => Node::Statement(s),
        }
    }
}
