//! Shallow parser for Go fragments.
//!
//! Each fragment is split into top-level items at depth-0 semicolons and
//! every item is checked for shape only: balanced delimiters, declaration
//! headers, statement forms and assignment targets. Type checking is left
//! to the Go toolchain.

use crate::ast::{BindOp, Binding, Decl, DeclKind, Fragment, Statement, Stmt};
use crate::lexer::{tokenize, LexError};
use crate::printer;
use crate::tokens::{Keyword, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("line {line}, col {col}: unexpected {found}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        line: usize,
        col: usize,
    },
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str, line: usize },
    #[error("line {line}, col {col}: '{delim}' is never closed")]
    Unclosed { delim: String, line: usize, col: usize },
    #[error("line {line}, col {col}: unmatched '{found}'")]
    Unmatched { found: String, line: usize, col: usize },
    #[error("empty input")]
    Empty,
}

fn unexpected(tok: &Token, expected: &'static str) -> ParseError {
    ParseError::Unexpected {
        found: tok.describe(),
        expected,
        line: tok.span.line,
        col: tok.span.col,
    }
}

fn end_after(tok: &Token, expected: &'static str) -> ParseError {
    ParseError::UnexpectedEnd { expected, line: tok.span.line }
}

/// Parse a line as one or more top-level declarations.
pub fn parse_decl_list(src: &str, base_line: usize) -> Result<Vec<Decl>, ParseError> {
    let tokens = tokenize(src, base_line)?;
    let items = split_items(&tokens)?;
    if items.is_empty() {
        return Err(ParseError::Empty);
    }
    items.into_iter().map(parse_decl).collect()
}

/// Parse a line as one or more statements of a function body.
pub fn parse_stmt_list(src: &str, base_line: usize) -> Result<Vec<Stmt>, ParseError> {
    let tokens = tokenize(src, base_line)?;
    let items = split_items(&tokens)?;
    if items.is_empty() {
        return Err(ParseError::Empty);
    }
    items.into_iter().map(parse_stmt).collect()
}

/// Declarations are tried first, then statements. When both fail, the error
/// reported is the one for the form the line most resembles.
pub fn parse_fragment(src: &str, base_line: usize) -> Result<Fragment, ParseError> {
    let decl_err = match parse_decl_list(src, base_line) {
        Ok(decls) => return Ok(Fragment::Declarations(decls)),
        Err(e) => e,
    };
    match parse_stmt_list(src, base_line) {
        Ok(stmts) => Ok(Fragment::Statements(stmts)),
        Err(stmt_err) if looks_like_declaration(src) => {
            tracing::trace!(%stmt_err, "statement parse also failed");
            Err(decl_err)
        }
        Err(stmt_err) => Err(stmt_err),
    }
}

fn looks_like_declaration(src: &str) -> bool {
    let Ok(tokens) = tokenize(src, 1) else { return false };
    match tokens.as_slice() {
        [first, second, ..] if first.is_keyword(Keyword::Func) => second.ident().is_some(),
        [first, ..] => first.is_keyword(Keyword::Type) || first.is_keyword(Keyword::Const),
        [] => false,
    }
}

// ── Item splitting ──────────────────────────────────────────────────

/// Split a token stream at depth-0 semicolons. The header of an `if`, `for`
/// or `switch` may itself contain semicolons; those do not end the item.
fn split_items(tokens: &[Token]) -> Result<Vec<&[Token]>, ParseError> {
    let mut stack: Vec<&Token> = Vec::new();
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_header = false;

    for (i, tok) in tokens.iter().enumerate() {
        if i == start {
            in_header = matches!(
                tok.kind,
                TokenKind::Keyword(Keyword::If | Keyword::For | Keyword::Switch)
            );
        }
        if tok.kind.opens().is_some() {
            if stack.is_empty() && tok.kind == TokenKind::LBrace {
                in_header = false;
            }
            stack.push(tok);
        } else if let Some(open) = tok.kind.closes() {
            match stack.pop() {
                Some(o) if o.kind.opens() == Some(open) => {}
                _ => {
                    return Err(ParseError::Unmatched {
                        found: tok.text.clone(),
                        line: tok.span.line,
                        col: tok.span.col,
                    })
                }
            }
        } else if tok.kind == TokenKind::Semicolon && stack.is_empty() && !in_header {
            items.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    if let Some(open) = stack.last() {
        return Err(ParseError::Unclosed {
            delim: open.text.clone(),
            line: open.span.line,
            col: open.span.col,
        });
    }
    if start < tokens.len() {
        items.push(&tokens[start..]);
    }
    items.retain(|item| !item.is_empty());
    Ok(items)
}

fn find_top_level(tokens: &[Token], pred: impl Fn(&TokenKind) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if depth == 0 && pred(&tok.kind) {
            return Some(i);
        }
        if tok.kind.opens().is_some() {
            depth += 1;
        } else if tok.kind.closes().is_some() {
            depth = depth.saturating_sub(1);
        }
    }
    None
}

fn split_top_level(tokens: &[Token], pred: impl Fn(&TokenKind) -> bool) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut rest = tokens;
    while let Some(pos) = find_top_level(rest, &pred) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + 1..];
    }
    parts.push(rest);
    parts
}

/// Index of the delimiter closing the one opened at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.kind.opens().is_some() {
            depth += 1;
        } else if tok.kind.closes().is_some() {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the delimiter opening the block that the last token closes.
fn matching_open_of_last(tokens: &[Token]) -> Option<usize> {
    tokens.last()?.kind.closes()?;
    let mut opens = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind.opens().is_some() {
            opens.push(i);
        } else if tok.kind.closes().is_some() {
            let open = opens.pop()?;
            if i == tokens.len() - 1 {
                return Some(open);
            }
        }
    }
    None
}

// ── Declarations ────────────────────────────────────────────────────

fn parse_decl(item: &[Token]) -> Result<Decl, ParseError> {
    let first = &item[0];
    let kind = match first.kind {
        TokenKind::Keyword(Keyword::Func) => return parse_func_decl(item),
        TokenKind::Keyword(Keyword::Type) => DeclKind::Type,
        TokenKind::Keyword(Keyword::Var) => DeclKind::Var,
        TokenKind::Keyword(Keyword::Const) => DeclKind::Const,
        _ => return Err(unexpected(first, "declaration")),
    };
    parse_spec_decl(kind, item)
}

fn parse_func_decl(item: &[Token]) -> Result<Decl, ParseError> {
    let mut i = 1;
    if item.get(i).map(|t| &t.kind) == Some(&TokenKind::LParen) {
        i = matching_close(item, i).ok_or_else(|| end_after(&item[i], "')'"))? + 1;
    }
    let name = match item.get(i) {
        Some(tok) => tok.ident().ok_or_else(|| unexpected(tok, "function name"))?,
        None => return Err(end_after(&item[i - 1], "function name")),
    };
    i += 1;

    let last = &item[item.len() - 1];
    if last.kind != TokenKind::RBrace {
        return Err(end_after(last, "function body"));
    }
    let body = matching_open_of_last(item).ok_or_else(|| unexpected(last, "function body"))?;
    if item.get(i).map(|t| &t.kind) == Some(&TokenKind::LBracket) {
        i = matching_close(item, i).ok_or_else(|| end_after(&item[i], "']'"))? + 1;
    }
    match item.get(i) {
        Some(tok) if tok.kind == TokenKind::LParen && i < body => {}
        Some(tok) => return Err(unexpected(tok, "'('")),
        None => return Err(end_after(last, "'('")),
    }

    Ok(Decl {
        kind: DeclKind::Func,
        names: vec![name.to_string()],
        tokens: item.to_vec(),
    })
}

/// `type`, `var` and `const` declarations, single or grouped.
fn parse_spec_decl(kind: DeclKind, item: &[Token]) -> Result<Decl, ParseError> {
    let keyword = &item[0];
    let names = match item.get(1) {
        None => return Err(end_after(keyword, "name")),
        Some(tok) if tok.kind == TokenKind::LParen => {
            let close = matching_close(item, 1).ok_or_else(|| end_after(tok, "')'"))?;
            if let Some(extra) = item.get(close + 1) {
                return Err(unexpected(extra, "end of declaration"));
            }
            Vec::new()
        }
        Some(tok) if tok.ident().is_some() => match kind {
            DeclKind::Type => {
                if item.len() < 3 {
                    return Err(end_after(tok, "type"));
                }
                vec![tok.text.clone()]
            }
            _ => parse_value_spec(item)?,
        },
        Some(tok) => return Err(unexpected(tok, "name")),
    };
    Ok(Decl { kind, names, tokens: item.to_vec() })
}

/// `var a, b T = x, y` after the keyword: names, then a type and/or values.
fn parse_value_spec(item: &[Token]) -> Result<Vec<String>, ParseError> {
    let mut names = Vec::new();
    let mut i = 1;
    loop {
        let tok = item.get(i).ok_or_else(|| end_after(&item[i - 1], "name"))?;
        let name = tok.ident().ok_or_else(|| unexpected(tok, "name"))?;
        names.push(name.to_string());
        i += 1;
        match item.get(i) {
            Some(t) if t.kind == TokenKind::Comma => i += 1,
            _ => break,
        }
    }

    let rest = &item[i..];
    if rest.is_empty() {
        return Err(end_after(&item[i - 1], "type or '='"));
    }
    if let Some(pos) = find_top_level(rest, |k| *k == TokenKind::Assign) {
        let values = &rest[pos + 1..];
        if values.is_empty() {
            return Err(end_after(&rest[pos], "expression"));
        }
        validate_list(values, &rest[pos])?;
    }
    Ok(names)
}

// ── Statements ──────────────────────────────────────────────────────

fn plain(item: &[Token]) -> Stmt {
    Stmt::Plain(Statement { tokens: item.to_vec() })
}

fn parse_stmt(item: &[Token]) -> Result<Stmt, ParseError> {
    let first = &item[0];
    let TokenKind::Keyword(kw) = first.kind else {
        if let [label, colon, rest @ ..] = item {
            if label.ident().is_some() && colon.kind == TokenKind::Colon {
                if !rest.is_empty() {
                    parse_stmt(rest)?;
                }
                return Ok(plain(item));
            }
        }
        return parse_simple_stmt(item);
    };

    match kw {
        Keyword::Var => {
            let decl = parse_spec_decl(DeclKind::Var, item)?;
            if decl.names.is_empty() {
                Ok(plain(item))
            } else {
                Ok(Stmt::Binding(Binding {
                    op: BindOp::Var,
                    targets: decl.names,
                    tokens: item.to_vec(),
                }))
            }
        }
        Keyword::Const => parse_spec_decl(DeclKind::Const, item).map(|_| plain(item)),
        Keyword::Type => parse_spec_decl(DeclKind::Type, item).map(|_| plain(item)),
        Keyword::If | Keyword::For | Keyword::Switch | Keyword::Select => {
            check_block_stmt(kw, item)?;
            Ok(plain(item))
        }
        Keyword::Go | Keyword::Defer => {
            let call = &item[1..];
            if call.is_empty() {
                return Err(end_after(first, "function call"));
            }
            validate_expr(call)?;
            Ok(plain(item))
        }
        Keyword::Return => {
            if item.len() > 1 {
                validate_list(&item[1..], first)?;
            }
            Ok(plain(item))
        }
        Keyword::Break | Keyword::Continue | Keyword::Goto => match &item[1..] {
            [] if kw != Keyword::Goto => Ok(plain(item)),
            [] => Err(end_after(first, "label")),
            [label] if label.ident().is_some() => Ok(plain(item)),
            [other, ..] => Err(unexpected(other, "label")),
        },
        Keyword::Fallthrough => match item.get(1) {
            None => Ok(plain(item)),
            Some(other) => Err(unexpected(other, "end of statement")),
        },
        kw if kw.starts_operand() => parse_simple_stmt(item),
        _ => Err(unexpected(first, "statement")),
    }
}

fn parse_simple_stmt(item: &[Token]) -> Result<Stmt, ParseError> {
    if let Some(pos) = find_top_level(item, TokenKind::is_assignment) {
        return parse_assignment(item, pos);
    }

    let last = &item[item.len() - 1];
    if last.kind == TokenKind::IncDec {
        let operand = &item[..item.len() - 1];
        if operand.is_empty() {
            return Err(unexpected(last, "expression"));
        }
        validate_expr(operand)?;
        return Ok(plain(item));
    }

    if let Some(pos) = find_top_level(item, |k| *k == TokenKind::Arrow).filter(|&p| p > 0) {
        let (channel, value) = (&item[..pos], &item[pos + 1..]);
        if value.is_empty() {
            return Err(end_after(&item[pos], "expression"));
        }
        validate_expr(channel)?;
        validate_expr(value)?;
        return Ok(plain(item));
    }

    validate_expr(item)?;
    Ok(plain(item))
}

fn parse_assignment(item: &[Token], pos: usize) -> Result<Stmt, ParseError> {
    let op_tok = &item[pos];
    let op = match op_tok.kind {
        TokenKind::Define => BindOp::Define,
        TokenKind::Assign => BindOp::Assign,
        _ => BindOp::Update,
    };
    let (lhs, rhs) = (&item[..pos], &item[pos + 1..]);
    if lhs.is_empty() {
        return Err(unexpected(op_tok, "expression"));
    }
    if rhs.is_empty() {
        return Err(end_after(op_tok, "expression"));
    }

    let targets = split_top_level(lhs, |k| *k == TokenKind::Comma);
    for target in &targets {
        match *target {
            [] => return Err(unexpected(op_tok, "expression")),
            [single] if op == BindOp::Define && single.ident().is_none() => {
                return Err(unexpected(single, "identifier"));
            }
            [_, second, ..] if op == BindOp::Define => {
                return Err(unexpected(second, "':=' or ','"));
            }
            expr => validate_expr(expr)?,
        }
    }
    if op == BindOp::Update && targets.len() > 1 {
        return Err(unexpected(op_tok, "single operand"));
    }
    validate_list(rhs, op_tok)?;

    Ok(Stmt::Binding(Binding {
        op,
        targets: targets.iter().map(|t| printer::render(t)).collect(),
        tokens: item.to_vec(),
    }))
}

/// `if`/`for`/`switch`/`select`: a header followed by a block, and for `if`
/// an optional `else` chain.
fn check_block_stmt(kw: Keyword, item: &[Token]) -> Result<(), ParseError> {
    let segments = split_top_level(item, |k| *k == TokenKind::Keyword(Keyword::Else));
    let count = segments.len();
    let mut consumed = 0;
    for (i, seg) in segments.iter().enumerate() {
        let anchor = &item[consumed.min(item.len() - 1)];
        consumed += seg.len() + 1;
        if kw != Keyword::If && i > 0 {
            return Err(unexpected(anchor, "end of statement"));
        }
        let Some(last) = seg.last() else {
            return Err(end_after(anchor, "block"));
        };
        if last.kind != TokenKind::RBrace {
            return Err(end_after(last, "'{'"));
        }
        let body = matching_open_of_last(seg).ok_or_else(|| unexpected(last, "block"))?;

        if i > 0 && !seg[0].is_keyword(Keyword::If) {
            if i + 1 < count {
                return Err(unexpected(&seg[0], "'if'"));
            }
            if body != 0 {
                return Err(unexpected(&seg[0], "block"));
            }
            continue;
        }
        if seg[0].is_keyword(Keyword::If) && body == 1 {
            return Err(unexpected(&seg[1], "condition"));
        }
    }
    Ok(())
}

fn validate_list(tokens: &[Token], anchor: &Token) -> Result<(), ParseError> {
    for expr in split_top_level(tokens, |k| *k == TokenKind::Comma) {
        if expr.is_empty() {
            return Err(end_after(anchor, "expression"));
        }
        validate_expr(expr)?;
    }
    Ok(())
}

fn is_binary_only(op: &str) -> bool {
    matches!(
        op,
        "/" | "%" | "<<" | ">>" | "&^" | "&&" | "||" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "|"
    )
}

/// Structural checks on an expression: it must start and end with something
/// that can begin and end an operand, and two operands may not be adjacent
/// at depth zero.
fn validate_expr(tokens: &[Token]) -> Result<(), ParseError> {
    let Some(first) = tokens.first() else {
        return Err(ParseError::Empty);
    };
    let bad_start = match first.kind {
        TokenKind::Operator => is_binary_only(&first.text),
        TokenKind::Dot | TokenKind::Comma | TokenKind::Colon | TokenKind::IncDec => true,
        TokenKind::Define | TokenKind::Assign | TokenKind::OpAssign => true,
        _ => false,
    };
    if bad_start {
        return Err(unexpected(first, "expression"));
    }

    let last = &tokens[tokens.len() - 1];
    if last.kind.is_operator() || matches!(last.kind, TokenKind::Dot | TokenKind::Comma | TokenKind::Colon) {
        return Err(end_after(last, "operand"));
    }

    let mut depth = 0usize;
    let mut prev: Option<&Token> = None;
    for tok in tokens {
        if depth == 0 {
            if let TokenKind::Keyword(kw) = tok.kind {
                if !kw.starts_operand() {
                    return Err(unexpected(tok, "expression"));
                }
            }
            if tok.kind.is_assignment() {
                return Err(unexpected(tok, "expression"));
            }
            if tok.kind.is_operand() && prev.is_some_and(|p| p.kind.is_operand()) {
                return Err(unexpected(tok, "operator"));
            }
            // `func name` only starts a declaration, never an expression.
            if tok.ident().is_some() && prev.is_some_and(|p| p.is_keyword(Keyword::Func)) {
                return Err(unexpected(tok, "'('"));
            }
        }
        if tok.kind.opens().is_some() {
            depth += 1;
        } else if tok.kind.closes().is_some() {
            depth = depth.saturating_sub(1);
        }
        prev = Some(tok);
    }
    Ok(())
}
