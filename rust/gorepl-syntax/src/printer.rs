//! Renders token streams back into single-line Go source.
//!
//! The output is not gofmt-exact. It only has to lex back into the same token
//! sequence, which holds as long as two operator tokens are never glued
//! together.

use crate::tokens::{Keyword as Kw, Token, TokenKind};

pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    let mut prev_unary = false;
    for tok in tokens {
        if let Some(p) = prev {
            if needs_space(p, prev_unary, tok) {
                out.push(' ');
            }
        }
        out.push_str(&tok.text);
        prev_unary = matches!(tok.kind, TokenKind::Operator | TokenKind::Arrow)
            && in_unary_position(prev);
        prev = Some(tok);
    }
    out
}

/// An operator is unary when nothing that could end an operand precedes it.
fn in_unary_position(prev: Option<&Token>) -> bool {
    let Some(prev) = prev else { return true };
    match &prev.kind {
        TokenKind::Ident(_) | TokenKind::Literal(_) => false,
        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::IncDec => false,
        _ => true,
    }
}

fn needs_space(prev: &Token, prev_unary: bool, next: &Token) -> bool {
    use TokenKind::*;

    if prev.kind.is_operator() && next.kind.is_operator() {
        return true;
    }
    match (&prev.kind, &next.kind) {
        (_, RParen | RBracket | Comma | Semicolon | Dot | Colon | IncDec | Ellipsis) => false,
        (LParen | LBracket | Dot | Ellipsis, _) => false,
        (LBrace, RBrace) => false,
        _ if prev_unary => false,
        (Ident(_) | Literal(_) | RParen | RBracket | RBrace, LParen | LBracket) => false,
        (Keyword(Kw::Func), LParen) => false,
        (Keyword(Kw::Map), LBracket) => false,
        (RBracket, Ident(_) | Keyword(_)) => false,
        _ => true,
    }
}
