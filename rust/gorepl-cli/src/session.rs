//! Accumulated program state for one REPL session.

use std::collections::BTreeSet;
use std::fmt;

use gorepl_syntax::{Node, Stmt};
use tracing::trace;

/// The three index-addressable parts of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Imports,
    Declarations,
    Statements,
}

impl Collection {
    /// Map a removal selector letter. `c` (code) is an alias for statements.
    pub fn from_selector(ch: char) -> Option<Self> {
        match ch {
            'p' => Some(Collection::Imports),
            'd' => Some(Collection::Declarations),
            's' | 'c' => Some(Collection::Statements),
            _ => None,
        }
    }

    /// Label letter used in annotated source.
    pub fn letter(self) -> char {
        match self {
            Collection::Imports => 'p',
            Collection::Declarations => 'd',
            Collection::Statements => 's',
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Imports => "packages",
            Collection::Declarations => "declarations",
            Collection::Statements => "statements",
        })
    }
}

/// Committed lengths of the session, taken before a tentative edit.
///
/// Tentative edits only append, so rolling back is a truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    imports: usize,
    declarations: usize,
    statements: usize,
    next_line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub imports: Vec<String>,
    /// Rendered top-level declarations.
    pub declarations: Vec<String>,
    pub statements: Vec<Stmt>,
    /// The latest non-binding expression; lives for one input cycle.
    pub trailing: Option<String>,
    pub write_only: bool,
    pub unstable: bool,
    next_line: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            imports: Vec::new(),
            declarations: Vec::new(),
            statements: Vec::new(),
            trailing: None,
            write_only: false,
            unstable: false,
            next_line: 1,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session line number the next parsed fragment starts on.
    pub fn next_line(&self) -> usize {
        self.next_line
    }

    pub fn advance_lines(&mut self, src: &str) {
        self.next_line += src.lines().count().max(1);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            imports: self.imports.len(),
            declarations: self.declarations.len(),
            statements: self.statements.len(),
            next_line: self.next_line,
        }
    }

    /// Restore the state captured by `checkpoint`, dropping anything
    /// appended since. The trailing expression never survives a rollback.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.imports.truncate(checkpoint.imports);
        self.declarations.truncate(checkpoint.declarations);
        self.statements.truncate(checkpoint.statements);
        self.next_line = checkpoint.next_line;
        self.trailing = None;
    }

    /// Clear everything back to the start-of-process state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Merge one node into the session and report whether persistent state
    /// changed. With `persist_plain`, non-binding statements join the
    /// session body instead of becoming the trailing expression.
    pub fn apply(&mut self, node: Node, persist_plain: bool) -> bool {
        match node {
            Node::Import(pkg) => {
                trace!(%pkg, "import added");
                self.imports.push(pkg);
                true
            }
            Node::Declaration(decl) => {
                trace!(kind = ?decl.kind, names = ?decl.names, "declaration added");
                self.declarations.push(decl.render());
                true
            }
            Node::Binding(binding) => {
                trace!(op = ?binding.op, targets = ?binding.targets, "binding added");
                self.statements.push(Stmt::Binding(binding));
                true
            }
            Node::Statement(stmt) if persist_plain => {
                self.statements.push(Stmt::Plain(stmt));
                true
            }
            Node::Statement(stmt) => {
                let text = stmt.render();
                self.trailing = Some(match self.trailing.take() {
                    Some(prev) => format!("{}; {}", prev, text),
                    None => text,
                });
                false
            }
        }
    }

    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::Imports => self.imports.len(),
            Collection::Declarations => self.declarations.len(),
            Collection::Statements => self.statements.len(),
        }
    }

    /// Remove the given indices from one collection in a single stable pass.
    pub fn remove_indices(&mut self, collection: Collection, indices: &BTreeSet<usize>) {
        match collection {
            Collection::Imports => compact(&mut self.imports, indices),
            Collection::Declarations => compact(&mut self.declarations, indices),
            Collection::Statements => compact(&mut self.statements, indices),
        }
    }
}

fn compact<T>(items: &mut Vec<T>, indices: &BTreeSet<usize>) {
    let mut index = 0;
    items.retain(|_| {
        let keep = !indices.contains(&index);
        index += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorepl_syntax::{FragmentParser, GoParser};

    fn nodes(src: &str) -> Vec<Node> {
        GoParser.parse_fragment(src, 1).unwrap().into_nodes()
    }

    #[test]
    fn test_apply_classifies_nodes() {
        let mut session = Session::new();
        let changed: Vec<bool> = nodes("x := 1; fmt.Println(x)")
            .into_iter()
            .map(|n| session.apply(n, false))
            .collect();
        assert_eq!(changed, vec![true, false]);
        assert_eq!(session.statements.len(), 1);
        assert_eq!(session.trailing.as_deref(), Some("fmt.Println(x)"));
    }

    #[test]
    fn test_trailing_statements_are_joined() {
        let mut session = Session::new();
        for node in nodes("a(); b()") {
            session.apply(node, false);
        }
        assert_eq!(session.trailing.as_deref(), Some("a(); b()"));
    }

    #[test]
    fn test_persist_plain_statements() {
        let mut session = Session::new();
        for node in nodes("fmt.Println(1)") {
            assert!(session.apply(node, true));
        }
        assert_eq!(session.statements.len(), 1);
        assert!(session.trailing.is_none());
    }

    #[test]
    fn test_imports_are_nodes() {
        let mut session = Session::new();
        assert!(session.apply(Node::Import("fmt".into()), false));
        assert_eq!(session.imports, vec!["fmt"]);
        assert!(session.trailing.is_none());
    }

    #[test]
    fn test_rollback_restores_lengths_and_line() {
        let mut session = Session::new();
        session.imports.push("fmt".into());
        session.advance_lines("x := 1");
        let before = session.clone();

        let checkpoint = session.checkpoint();
        session.apply(Node::Import("os".into()), false);
        for node in nodes("func f() {}; var y = 2") {
            session.apply(node, false);
        }
        session.advance_lines("func f() {}; var y = 2");
        session.rollback(checkpoint);

        assert_eq!(session, before);
    }

    #[test]
    fn test_compact_is_stable() {
        let mut items = vec!["a", "b", "c", "d"];
        compact(&mut items, &BTreeSet::from([0, 2]));
        assert_eq!(items, vec!["b", "d"]);
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new();
        session.imports.push("fmt".into());
        session.unstable = true;
        session.write_only = true;
        session.advance_lines("x");
        session.reset();
        assert_eq!(session, Session::new());
        assert_eq!(session.next_line(), 1);
    }

    #[test]
    fn test_selectors() {
        assert_eq!(Collection::from_selector('c'), Some(Collection::Statements));
        assert_eq!(Collection::from_selector('x'), None);
        assert_eq!(Collection::Imports.to_string(), "packages");
    }
}
