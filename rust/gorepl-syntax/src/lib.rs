//! Go fragment syntax for the REPL.
//!
//! Turns one line of input into declarations or statements and renders
//! syntax nodes back to source text.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod tokens;

pub use ast::{BindOp, Binding, Decl, DeclKind, Fragment, Node, Statement, Stmt};
pub use parser::ParseError;

/// The parsing capability the session controller depends on.
pub trait FragmentParser {
    /// Parse a bare code line: declarations first, then statements.
    fn parse_fragment(&self, src: &str, base_line: usize) -> Result<Fragment, ParseError>;

    /// Parse a line that can only hold statements.
    fn parse_statements(&self, src: &str, base_line: usize) -> Result<Vec<Stmt>, ParseError>;
}

/// The built-in Go parser backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoParser;

impl FragmentParser for GoParser {
    fn parse_fragment(&self, src: &str, base_line: usize) -> Result<Fragment, ParseError> {
        parser::parse_fragment(src, base_line)
    }

    fn parse_statements(&self, src: &str, base_line: usize) -> Result<Vec<Stmt>, ParseError> {
        parser::parse_stmt_list(src, base_line)
    }
}
