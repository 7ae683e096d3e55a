//! Byte-level tokenizer.
//!
//! Scans the raw statement text into position-tagged tokens, classifying
//! every word against the registry. Two-word keywords (`CREATE TABLE`,
//! `ORDER BY`, `NOT IN`, ...) are folded greedily: after a word, the lexer
//! looks ahead for a second word and folds when the pair is registry-known
//! *and* the second word is all-uppercase in the source. That single casing
//! rule is what distinguishes `CREATE TABLE` the keyword from `CREATE User`
//! the row insert.
//!
//! Unknown words are never rejected here (they become identifiers); only
//! symbolic operators the registry cannot normalize are fatal.

use thiserror::Error;

use crate::registry::{Registry, WordClass};
use crate::token::{Position, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} ({position})")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

/// Tokenize a full statement. Fails on unterminated string literals and
/// unrecognized symbols; never on unknown words.
pub fn tokenize(text: &str, registry: &Registry) -> Result<Vec<Token>, LexError> {
    Lexer::new(text, registry).run()
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    registry: &'a Registry,
    tokens: Vec<Token>,
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@'
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'@')
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str, registry: &'a Registry) -> Self {
        Lexer {
            src: text.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            registry,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_whitespace();
            let Some(b) = self.peek() else { break };
            let start = self.position();

            if is_word_start(b) {
                self.scan_word(start)?;
            } else if b.is_ascii_digit() || (b == b'-' && self.minus_starts_number()) {
                self.scan_number(start);
            } else if b == b'\'' || b == b'"' {
                self.scan_string(start)?;
            } else if b == b'$' && self.peek_at(1) == Some(b'$') {
                self.scan_dollar_string(start)?;
            } else {
                self.scan_symbol(start)?;
            }
        }
        Ok(self.tokens)
    }

    // ============ Cursor primitives ============

    fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, position: Position) {
        self.tokens.push(Token::new(kind, text, position));
    }

    fn error(&self, message: impl Into<String>, position: Position) -> LexError {
        LexError {
            message: message.into(),
            position,
        }
    }

    // ============ Words and keyword folding ============

    fn scan_word(&mut self, start: Position) -> Result<(), LexError> {
        let raw = self.take_word();
        let upper = raw.to_ascii_uppercase();

        if let Some((kind, folded)) = self.try_fold(&upper) {
            self.push(kind, folded, start);
            return Ok(());
        }

        match self.registry.classify(&upper) {
            WordClass::Operation(_) => self.push(TokenKind::Operation, upper, start),
            WordClass::Clause => self.push(TokenKind::Clause, upper, start),
            WordClass::Operator => self.push(TokenKind::Operator, upper, start),
            WordClass::Bool => self.push(TokenKind::Bool, upper, start),
            WordClass::Ident => self.push(TokenKind::Ident, raw, start),
        }
        Ok(())
    }

    fn take_word(&mut self) -> String {
        let from = self.pos;
        while let Some(b) = self.peek() {
            if is_word_char(b) {
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.src[from..self.pos]).into_owned()
    }

    /// Lookahead for a second word forming a known two-word keyword. The
    /// second word must be all-uppercase in the source; on any failure the
    /// cursor is restored to just after the first word.
    fn try_fold(&mut self, first_upper: &str) -> Option<(TokenKind, String)> {
        let saved = (self.pos, self.line, self.column);
        self.skip_whitespace();

        let next = self.peek()?;
        if !is_word_start(next) {
            (self.pos, self.line, self.column) = saved;
            return None;
        }

        let second_raw = self.take_word();
        let combined = format!("{} {}", first_upper, second_raw.to_ascii_uppercase());
        let all_upper = second_raw
            .bytes()
            .all(|b| !b.is_ascii_lowercase());

        if all_upper && self.registry.is_two_word(&combined) {
            let kind = if self.registry.operation(&combined).is_some() {
                TokenKind::Operation
            } else if self.registry.is_clause(&combined) {
                TokenKind::Clause
            } else {
                TokenKind::Operator
            };
            return Some((kind, combined));
        }

        (self.pos, self.line, self.column) = saved;
        None
    }

    // ============ Numbers ============

    /// A leading `-` starts a numeric literal only after an operator, `=`,
    /// `(`, `,`, `[`, or at start of input. Everywhere else it is binary
    /// subtraction.
    fn minus_starts_number(&self) -> bool {
        if !self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            return false;
        }
        match self.tokens.last() {
            None => true,
            Some(t) => matches!(
                t.kind,
                TokenKind::Operator | TokenKind::LParen | TokenKind::Comma | TokenKind::LBracket
            ),
        }
    }

    fn scan_number(&mut self, start: Position) {
        let from = self.pos;
        if self.peek() == Some(b'-') {
            self.bump();
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = String::from_utf8_lossy(&self.src[from..self.pos]).into_owned();
        self.push(TokenKind::Number, text, start);
    }

    // ============ Strings ============

    fn scan_string(&mut self, start: Position) -> Result<(), LexError> {
        let quote = self.bump().unwrap_or_default();
        // Collect raw bytes and validate once, so multi-byte UTF-8 sequences
        // pass through intact.
        let mut bytes = Vec::new();

        loop {
            let Some(b) = self.bump() else {
                return Err(self.error("unterminated string literal", start));
            };
            if b == quote {
                break;
            }
            if b == b'\\' {
                let Some(escaped) = self.bump() else {
                    return Err(self.error("unterminated string literal", start));
                };
                bytes.push(match escaped {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    other => other,
                });
            } else {
                bytes.push(b);
            }
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| self.error("string literal is not valid UTF-8", start))?;
        self.push(TokenKind::Str, text, start);
        Ok(())
    }

    /// PostgreSQL-style `$$...$$` literal; newlines inside count toward line
    /// tracking via `bump`.
    fn scan_dollar_string(&mut self, start: Position) -> Result<(), LexError> {
        self.bump();
        self.bump();
        let from = self.pos;

        loop {
            if self.peek().is_none() {
                return Err(self.error("unterminated dollar-quoted string", start));
            }
            if self.peek() == Some(b'$') && self.peek_at(1) == Some(b'$') {
                let text = String::from_utf8_lossy(&self.src[from..self.pos]).into_owned();
                self.bump();
                self.bump();
                self.push(TokenKind::Str, text, start);
                return Ok(());
            }
            self.bump();
        }
    }

    // ============ Symbols and operators ============

    fn scan_symbol(&mut self, start: Position) -> Result<(), LexError> {
        let b = self.bump().unwrap_or_default();

        let kind = match b {
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b',' => Some(TokenKind::Comma),
            b';' => Some(TokenKind::Semicolon),
            b'.' => Some(TokenKind::Dot),
            b':' => Some(TokenKind::Colon),
            b'\\' => Some(TokenKind::Backslash),
            _ => None,
        };
        if let Some(kind) = kind {
            self.push(kind, (b as char).to_string(), start);
            return Ok(());
        }

        // Greedy two-character operator, then single.
        let mut sym = (b as char).to_string();
        if let Some(next) = self.peek() {
            let two = format!("{}{}", b as char, next as char);
            if matches!(two.as_str(), "<=" | ">=" | "!=" | "<>" | "==") {
                self.bump();
                sym = two;
            }
        }

        match self.registry.normalize_symbol(&sym) {
            Some(normalized) => {
                self.push(TokenKind::Operator, normalized, start);
                Ok(())
            }
            None => {
                let message = match self.registry.suggest(&sym) {
                    Some(hint) => format!("unknown token '{sym}'. Did you mean '{hint}'?"),
                    None => format!("unknown token '{sym}'"),
                };
                Err(self.error(message, start))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        tokenize(text, &Registry::new()).unwrap()
    }

    #[test]
    fn words_classify_against_registry() {
        let toks = lex("GET User WHERE age > 25");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Operation,
                TokenKind::Ident,
                TokenKind::Clause,
                TokenKind::Ident,
                TokenKind::Operator,
                TokenKind::Number,
            ]
        );
        assert_eq!(toks[1].text, "User");
        assert_eq!(toks[2].text, "WHERE");
    }

    #[test]
    fn two_word_folding_requires_uppercase_second_word() {
        let toks = lex("CREATE TABLE User");
        assert_eq!(toks[0].kind, TokenKind::Operation);
        assert_eq!(toks[0].text, "CREATE TABLE");

        // "CREATE User" stays a CRUD insert into entity User.
        let toks = lex("CREATE User name = 'x'");
        assert_eq!(toks[0].text, "CREATE");
        assert_eq!(toks[1].text, "User");
        assert_eq!(toks[1].kind, TokenKind::Ident);
    }

    #[test]
    fn order_by_folds_into_one_clause_token() {
        let toks = lex("GET User ORDER BY name DESC");
        assert!(toks.iter().any(|t| t.text == "ORDER BY" && t.kind == TokenKind::Clause));
        assert!(toks.iter().any(|t| t.text == "DESC"));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let toks = lex("GET User\nWHERE age > 1");
        let where_tok = toks.iter().find(|t| t.text == "WHERE").unwrap();
        assert_eq!(where_tok.position.line, 2);
        assert_eq!(where_tok.position.column, 1);
    }

    #[test]
    fn unary_minus_only_after_operator_comma_or_open() {
        let toks = lex("WHERE x = -5");
        assert_eq!(toks.last().unwrap().text, "-5");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Number);

        // After an identifier the minus is subtraction.
        let toks = lex("WITH price - 5");
        assert!(toks.iter().any(|t| t.kind == TokenKind::Operator && t.text == "-"));
        assert!(toks.iter().any(|t| t.kind == TokenKind::Number && t.text == "5"));
    }

    #[test]
    fn string_escapes_and_termination() {
        let toks = lex(r#"WHERE name = 'O\'Brien'"#);
        assert_eq!(toks.last().unwrap().text, "O'Brien");

        let err = tokenize("WHERE name = 'oops", &Registry::new()).unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn non_ascii_string_literals_survive() {
        let toks = lex("GET User WHERE name = 'café'");
        let s = toks.iter().find(|t| t.kind == TokenKind::Str).unwrap();
        assert_eq!(s.text, "café");

        let toks = lex("CREATE City name = '東京'");
        let s = toks.iter().find(|t| t.kind == TokenKind::Str).unwrap();
        assert_eq!(s.text, "東京");
    }

    #[test]
    fn dollar_quoted_counts_newlines() {
        let toks = lex("CREATE FUNCTION f body:x $$line1\nline2$$ WHERE");
        let s = toks.iter().find(|t| t.kind == TokenKind::Str).unwrap();
        assert_eq!(s.text, "line1\nline2");
        let after = toks.iter().find(|t| t.text == "WHERE").unwrap();
        assert_eq!(after.position.line, 2);
    }

    #[test]
    fn unknown_symbol_suggests_keyword() {
        let err = tokenize("GET User WHERE a ! 1", &Registry::new()).unwrap_err();
        assert!(err.message.contains("unknown token"), "{}", err.message);
    }

    #[test]
    fn ddl_attributes_lex_as_single_words() {
        let toks = lex("CREATE TABLE User id:int:primary name:varchar(50)");
        assert!(toks.iter().any(|t| t.text == "id:int:primary"));
    }
}
