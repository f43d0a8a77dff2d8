use std::fmt;
use strum::{AsRefStr, EnumString};

/// Source location of a token within the session's input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// 1-based line number, relative to the session's input
    pub line: usize,
    /// 1-based column number
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Go's reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,
}

impl Keyword {
    /// Keywords that may appear inside an expression (type literals and
    /// function literals).
    pub fn starts_operand(self) -> bool {
        matches!(
            self,
            Keyword::Func | Keyword::Map | Keyword::Chan | Keyword::Struct | Keyword::Interface
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Rune,
    Str,
}

/// Token classes for Go source. The exact spelling of every token lives in
/// [`Token::text`]; the kind carries only what the parser branches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    Literal(LitKind),

    Define,   // :=
    Assign,   // =
    OpAssign, // += -= *= /= %= &= |= ^= <<= >>= &^=
    IncDec,   // ++ --
    Arrow,    // <-
    Ellipsis, // ...
    /// Any other unary or binary operator.
    Operator,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,
    Dot,
}

impl TokenKind {
    pub fn is_operand(&self) -> bool {
        matches!(self, TokenKind::Ident(_) | TokenKind::Literal(_))
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, TokenKind::Define | TokenKind::Assign | TokenKind::OpAssign)
    }

    /// Operators in the wide sense: anything that combines operands.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Operator
                | TokenKind::Arrow
                | TokenKind::IncDec
                | TokenKind::Define
                | TokenKind::Assign
                | TokenKind::OpAssign
        )
    }

    pub fn opens(&self) -> Option<char> {
        match self {
            TokenKind::LParen => Some('('),
            TokenKind::LBracket => Some('['),
            TokenKind::LBrace => Some('{'),
            _ => None,
        }
    }

    pub fn closes(&self) -> Option<char> {
        match self {
            TokenKind::RParen => Some('('),
            TokenKind::RBracket => Some('['),
            TokenKind::RBrace => Some('{'),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// Set for semicolons the lexer inserted at a line end.
    pub implicit: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span, implicit: false }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        if self.implicit {
            "newline".to_string()
        } else {
            format!("'{}'", self.text)
        }
    }
}
