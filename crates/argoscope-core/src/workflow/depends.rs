//! Parser for `depends` expressions.
//!
//! A `depends` string is a boolean expression over task terms such as
//! `fetch.Succeeded && (test.Failed || !lint)`. Only the referenced task
//! names matter for drawing edges, so the parser walks the grammar to check
//! it is well formed and collects the name part of every term. The AND/OR/NOT
//! structure and the `.Condition` suffixes are dropped.
//!
//! Grammar:
//!
//! ```text
//! or   := and ('||' and)*
//! and  := expr ('&&' expr)*
//! expr := '(' or ')' | '!' expr | term
//! ```

use std::fmt;

use thiserror::Error;

use super::push_unique;

/// Deepest run of nested `(` and `!` accepted before giving up.
pub const MAX_NESTING: usize = 256;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from a malformed `depends` expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependsError {
    /// A token appeared where a term or operator was not allowed.
    #[error("unexpected token '{token}' at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    /// The expression stopped where a term was required.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// An opening parenthesis was never closed.
    #[error("missing closing parenthesis for '(' at offset {offset}")]
    MissingClosingParen { offset: usize },

    /// Parentheses or negations nested deeper than [`MAX_NESTING`].
    #[error("expression nested deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: usize, limit: usize },
}

impl DependsError {
    /// The offending token, if the error points at one.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::UnexpectedToken { token, .. } => Some(token),
            Self::MissingClosingParen { .. } => Some("("),
            Self::UnexpectedEnd | Self::TooDeep { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Term(&'a str),
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("&&"),
            Self::Or => f.write_str("||"),
            Self::Not => f.write_str("!"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Term(term) => f.write_str(term),
        }
    }
}

/// A token and its byte offset in the source expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub offset: usize,
}

/// Split an expression into tokens.
///
/// Operators delimit terms even without surrounding whitespace, so
/// `a&&!b` yields `a`, `&&`, `!`, `b`. A lone `&` or `|` is part of a term.
pub fn tokenize(expression: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut term_start: Option<usize> = None;
    let bytes = expression.as_bytes();
    let mut i = 0;

    fn flush<'a>(tokens: &mut Vec<Token<'a>>, source: &'a str, start: &mut Option<usize>, end: usize) {
        if let Some(s) = start.take() {
            tokens.push(Token {
                kind: TokenKind::Term(&source[s..end]),
                offset: s,
            });
        }
    }

    while i < bytes.len() {
        let (kind, width) = match bytes[i] {
            b'&' if bytes.get(i + 1) == Some(&b'&') => (Some(TokenKind::And), 2),
            b'|' if bytes.get(i + 1) == Some(&b'|') => (Some(TokenKind::Or), 2),
            b'!' => (Some(TokenKind::Not), 1),
            b'(' => (Some(TokenKind::LParen), 1),
            b')' => (Some(TokenKind::RParen), 1),
            b if b.is_ascii_whitespace() => (None, 1),
            _ => {
                term_start.get_or_insert(i);
                i += 1;
                continue;
            }
        };
        flush(&mut tokens, expression, &mut term_start, i);
        if let Some(kind) = kind {
            tokens.push(Token { kind, offset: i });
        }
        i += width;
    }
    flush(&mut tokens, expression, &mut term_start, bytes.len());

    tokens
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    depth: usize,
    terms: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            terms: Vec::new(),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.position).copied()
    }

    fn consume(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    fn parse_or(&mut self) -> Result<(), DependsError> {
        self.parse_and()?;
        while matches!(self.peek(), Some(Token { kind: TokenKind::Or, .. })) {
            self.consume();
            self.parse_and()?;
        }
        Ok(())
    }

    fn parse_and(&mut self) -> Result<(), DependsError> {
        self.parse_expression()?;
        while matches!(self.peek(), Some(Token { kind: TokenKind::And, .. })) {
            self.consume();
            self.parse_expression()?;
        }
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<(), DependsError> {
        let Some(token) = self.peek() else {
            return self.parse_term();
        };
        if !matches!(token.kind, TokenKind::LParen | TokenKind::Not) {
            return self.parse_term();
        }

        if self.depth >= MAX_NESTING {
            return Err(DependsError::TooDeep {
                offset: token.offset,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = if token.kind == TokenKind::LParen {
            self.parse_parentheses()
        } else {
            self.consume();
            self.parse_expression()
        };
        self.depth -= 1;
        result
    }

    fn parse_parentheses(&mut self) -> Result<(), DependsError> {
        let open = self.consume().map(|t| t.offset).unwrap_or_default();
        self.parse_or()?;
        match self.consume() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(other) => Err(DependsError::UnexpectedToken {
                token: other.kind.to_string(),
                offset: other.offset,
            }),
            None => Err(DependsError::MissingClosingParen { offset: open }),
        }
    }

    fn parse_term(&mut self) -> Result<(), DependsError> {
        match self.consume() {
            Some(Token {
                kind: TokenKind::Term(term),
                ..
            }) => {
                let name = term.split('.').next().unwrap_or(term);
                push_unique(&mut self.terms, name.to_string());
                Ok(())
            }
            Some(other) => Err(DependsError::UnexpectedToken {
                token: other.kind.to_string(),
                offset: other.offset,
            }),
            None => Err(DependsError::UnexpectedEnd),
        }
    }
}

/// Parse a `depends` expression and return the referenced task names.
///
/// Names are unique and in first-seen order. An empty expression references
/// nothing.
pub fn parse_depends(expression: &str) -> Result<Vec<String>, DependsError> {
    let tokens = tokenize(expression);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = Parser::new(tokens);
    parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        return Err(DependsError::UnexpectedToken {
            token: extra.kind.to_string(),
            offset: extra.offset,
        });
    }

    Ok(parser.terms)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
