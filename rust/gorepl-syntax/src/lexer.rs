//! Lexer for Go fragments, including Go's automatic semicolon insertion.

use crate::tokens::{Keyword, LitKind, Span, Token, TokenKind};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string literal at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("unterminated rune literal at line {line}, col {col}")]
    UnterminatedRune { line: usize, col: usize },
    #[error("unterminated comment at line {line}, col {col}")]
    UnterminatedComment { line: usize, col: usize },
}

/// Operators ordered longest first so the scan takes the longest match.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::OpAssign),
    (">>=", TokenKind::OpAssign),
    ("&^=", TokenKind::OpAssign),
    ("...", TokenKind::Ellipsis),
    ("&&", TokenKind::Operator),
    ("||", TokenKind::Operator),
    ("<-", TokenKind::Arrow),
    ("++", TokenKind::IncDec),
    ("--", TokenKind::IncDec),
    ("==", TokenKind::Operator),
    ("!=", TokenKind::Operator),
    ("<=", TokenKind::Operator),
    (">=", TokenKind::Operator),
    (":=", TokenKind::Define),
    ("+=", TokenKind::OpAssign),
    ("-=", TokenKind::OpAssign),
    ("*=", TokenKind::OpAssign),
    ("/=", TokenKind::OpAssign),
    ("%=", TokenKind::OpAssign),
    ("&=", TokenKind::OpAssign),
    ("|=", TokenKind::OpAssign),
    ("^=", TokenKind::OpAssign),
    ("<<", TokenKind::Operator),
    (">>", TokenKind::Operator),
    ("&^", TokenKind::Operator),
    ("+", TokenKind::Operator),
    ("-", TokenKind::Operator),
    ("*", TokenKind::Operator),
    ("/", TokenKind::Operator),
    ("%", TokenKind::Operator),
    ("&", TokenKind::Operator),
    ("|", TokenKind::Operator),
    ("^", TokenKind::Operator),
    ("<", TokenKind::Operator),
    (">", TokenKind::Operator),
    ("!", TokenKind::Operator),
    ("~", TokenKind::Operator),
    ("=", TokenKind::Assign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
    (".", TokenKind::Dot),
];

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    base_line: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    /// `base_line` is the session line number of the fragment's first line.
    pub fn new(source: &str, base_line: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            base_line,
            tokens: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> { self.source.get(self.pos).copied() }
    fn peek(&self) -> Option<char> { self.source.get(self.pos + 1).copied() }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' { self.line += 1; self.col = 1; } else { self.col += 1; }
        Some(ch)
    }

    fn abs_line(&self, line: usize) -> usize {
        self.base_line + line - 1
    }

    fn span_from(&self, sl: usize, sc: usize) -> Span {
        Span::new(self.abs_line(sl), sc)
    }

    /// Go inserts a semicolon at a line end when the line's final token could
    /// end a statement.
    fn needs_semicolon(&self) -> bool {
        let Some(last) = self.tokens.last() else { return false };
        match &last.kind {
            TokenKind::Ident(_) | TokenKind::Literal(_) => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::Break | Keyword::Continue | Keyword::Fallthrough | Keyword::Return
            ),
            TokenKind::IncDec | TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => true,
            _ => false,
        }
    }

    fn insert_semicolon(&mut self) {
        if self.needs_semicolon() {
            let span = Span::new(self.abs_line(self.line), self.col);
            let mut token = Token::new(TokenKind::Semicolon, ";", span);
            token.implicit = true;
            self.tokens.push(token);
        }
    }

    fn skip_line_comment(&mut self) {
        while matches!(self.current(), Some(c) if c != '\n') { self.advance(); }
    }

    /// Returns whether the comment spanned a newline, which then acts like one.
    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let (sl, sc) = (self.line, self.col);
        self.advance();
        self.advance();
        let mut newline = false;
        loop {
            match self.current() {
                None => return Err(LexError::UnterminatedComment { line: self.abs_line(sl), col: sc }),
                Some('*') if self.peek() == Some('/') => { self.advance(); self.advance(); return Ok(newline); }
                Some(c) => { newline |= c == '\n'; self.advance(); }
            }
        }
    }

    fn read_ident(&mut self) -> Token {
        let (sl, sc) = (self.line, self.col);
        let mut id = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' { id.push(ch); self.advance(); } else { break; }
        }
        let span = self.span_from(sl, sc);
        match Keyword::from_str(&id) {
            Ok(kw) => Token::new(TokenKind::Keyword(kw), id, span),
            Err(_) => Token::new(TokenKind::Ident(id.clone()), id, span),
        }
    }

    /// Numbers are scanned loosely; the Go compiler has the final word on
    /// their validity.
    fn read_number(&mut self) -> Token {
        let (sl, sc) = (self.line, self.col);
        let mut text = String::new();
        let hex = self.current() == Some('0') && matches!(self.peek(), Some('x' | 'X'));
        let mut kind = LitKind::Int;
        while let Some(ch) = self.current() {
            let exponent = if hex { matches!(ch, 'p' | 'P') } else { matches!(ch, 'e' | 'E') };
            if ch == '.' {
                if self.peek() == Some('.') { break; }
                kind = LitKind::Float;
                text.push(ch);
                self.advance();
            } else if exponent {
                kind = LitKind::Float;
                text.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current() { text.push(sign); self.advance(); }
            } else if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if text.ends_with('i') { kind = LitKind::Imag; }
        Token::new(TokenKind::Literal(kind), text, self.span_from(sl, sc))
    }

    fn read_quoted(&mut self, quote: char) -> Result<Token, LexError> {
        let (sl, sc) = (self.line, self.col);
        let mut text = String::new();
        text.push(quote);
        self.advance();
        let unterminated = |line| match quote {
            '\'' => LexError::UnterminatedRune { line, col: sc },
            _ => LexError::UnterminatedString { line, col: sc },
        };
        loop {
            match self.current() {
                None | Some('\n') => return Err(unterminated(self.abs_line(sl))),
                Some('\\') => {
                    text.push('\\');
                    self.advance();
                    match self.advance() {
                        Some('\n') | None => return Err(unterminated(self.abs_line(sl))),
                        Some(c) => text.push(c),
                    }
                }
                Some(c) if c == quote => { text.push(c); self.advance(); break; }
                Some(c) => { text.push(c); self.advance(); }
            }
        }
        let kind = if quote == '\'' { LitKind::Rune } else { LitKind::Str };
        Ok(Token::new(TokenKind::Literal(kind), text, self.span_from(sl, sc)))
    }

    fn read_raw_string(&mut self) -> Result<Token, LexError> {
        let (sl, sc) = (self.line, self.col);
        let mut text = String::from("`");
        self.advance();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { line: self.abs_line(sl), col: sc }),
                Some('`') => { text.push('`'); break; }
                Some(c) => text.push(c),
            }
        }
        Ok(Token::new(TokenKind::Literal(LitKind::Str), text, self.span_from(sl, sc)))
    }

    fn read_operator(&mut self) -> Result<Token, LexError> {
        let (sl, sc) = (self.line, self.col);
        for (op, kind) in OPERATORS {
            let matches = op.chars().enumerate().all(|(i, c)| self.source.get(self.pos + i) == Some(&c));
            if matches {
                for _ in 0..op.chars().count() { self.advance(); }
                return Ok(Token::new(kind.clone(), *op, self.span_from(sl, sc)));
            }
        }
        let ch = self.current().unwrap_or('\0');
        Err(LexError::UnexpectedChar { ch, line: self.abs_line(sl), col: sc })
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.current() {
            match ch {
                '\n' => { self.insert_semicolon(); self.advance(); }
                ' ' | '\t' | '\r' => { self.advance(); }
                '/' if self.peek() == Some('/') => self.skip_line_comment(),
                '/' if self.peek() == Some('*') => {
                    if self.skip_block_comment()? { self.insert_semicolon(); }
                }
                '"' | '\'' => { let t = self.read_quoted(ch)?; self.tokens.push(t); }
                '`' => { let t = self.read_raw_string()?; self.tokens.push(t); }
                '0'..='9' => { let t = self.read_number(); self.tokens.push(t); }
                '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => {
                    let t = self.read_number();
                    self.tokens.push(t);
                }
                c if c.is_alphabetic() || c == '_' => { let t = self.read_ident(); self.tokens.push(t); }
                _ => { let t = self.read_operator()?; self.tokens.push(t); }
            }
        }
        self.insert_semicolon();
        Ok(self.tokens)
    }
}

/// Tokenize a fragment whose first line is session line `base_line`.
pub fn tokenize(source: &str, base_line: usize) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, base_line).tokenize()
}
