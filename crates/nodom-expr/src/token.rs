//! Token Types
//!
//! Tokens of the template expression language.

/// Source span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Token with kind and span
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Piece of a backtick template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(Box<str>),
    /// Raw source of a `${...}` substitution, parsed later
    Substitution { source: Box<str>, offset: u32 },
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(Box<str>),
    Template(Vec<TemplateChunk>),
    Boolean(bool),
    Null,
    Undefined,

    Identifier(Box<str>),
    Typeof,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    QuestionDot,
    Question,
    QuestionQuestion,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    AmpersandAmpersand,
    PipePipe,

    Eof,
    Error(Box<str>),
}

/// Keyword lookup for identifiers
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "true" => Some(TokenKind::Boolean(true)),
        "false" => Some(TokenKind::Boolean(false)),
        "null" => Some(TokenKind::Null),
        "undefined" => Some(TokenKind::Undefined),
        "typeof" => Some(TokenKind::Typeof),
        _ => None,
    }
}
