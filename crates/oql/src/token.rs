//! Token types produced by the lexer and consumed by the parser.

use serde::Serialize;
use std::fmt;

/// Byte offset plus 1-based line/column, attached to every token and AST root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Registry-known operation keyword (possibly folded from two words).
    Operation,
    /// Registry-known clause keyword (WHERE, ORDER BY, ...).
    Clause,
    /// Symbolic or keyword operator, normalized (`<>` -> `!=`).
    Operator,
    /// Boolean literal.
    Bool,
    /// Anything word-shaped the registry does not recognize.
    Ident,
    Number,
    /// Quoted string; `text` holds the unescaped contents.
    Str,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Backslash,
}

/// One lexed token. Keyword-kinded tokens carry canonical uppercase text;
/// identifiers keep their source spelling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Case-insensitive keyword comparison against `upper` (already uppercase).
    pub fn is_word(&self, upper: &str) -> bool {
        matches!(
            self.kind,
            TokenKind::Operation
                | TokenKind::Clause
                | TokenKind::Operator
                | TokenKind::Ident
                | TokenKind::Bool
        ) && self.text.eq_ignore_ascii_case(upper)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.text)
    }
}
