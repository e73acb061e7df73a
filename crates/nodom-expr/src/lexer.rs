//! Expression Lexer
//!
//! Tokenizes template expressions. String and template literal contents are
//! consumed whole here, so nothing inside them is ever seen as an identifier.

use std::iter::Peekable;
use std::str::Chars;

use crate::token::{keyword_from_str, Span, TemplateChunk, Token, TokenKind};

/// Expression lexer
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<Chars<'src>>,
    pos: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            pos: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.pos as usize..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            c if is_ident_start(c) => self.scan_identifier(start),
            '0'..='9' => self.scan_number(start),
            '"' | '\'' => self.scan_string(c),
            '`' => self.scan_template(),

            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            '.' => {
                if matches!(self.peek(), Some('0'..='9')) {
                    self.scan_number(start)
                } else {
                    TokenKind::Dot
                }
            }

            '?' => match self.peek() {
                Some('?') => {
                    self.advance();
                    TokenKind::QuestionQuestion
                }
                // `a?.5:1` is a conditional, not optional chaining
                Some('.') if !matches!(self.peek_next(), Some('0'..='9')) => {
                    self.advance();
                    TokenKind::QuestionDot
                }
                _ => TokenKind::Question,
            },

            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Error("Assignment is not allowed in expressions".into())
                }
            }

            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Bang
                }
            }

            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::LessThanEq
                } else {
                    TokenKind::LessThan
                }
            }

            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GreaterThanEq
                } else {
                    TokenKind::GreaterThan
                }
            }

            '&' if self.peek() == Some('&') => {
                self.advance();
                TokenKind::AmpersandAmpersand
            }

            '|' if self.peek() == Some('|') => {
                self.advance();
                TokenKind::PipePipe
            }

            _ => TokenKind::Error(format!("Unexpected character: {}", c).into()),
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    fn scan_identifier(&mut self, start: u32) -> TokenKind {
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.advance();
        }
        let text = &self.source[start as usize..self.pos as usize];
        keyword_from_str(text).unwrap_or_else(|| TokenKind::Identifier(text.into()))
    }

    fn scan_number(&mut self, start: u32) -> TokenKind {
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_next(), Some('0'..='9')) {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut ahead = self.source[self.pos as usize..].chars().skip(1);
            let next = ahead.next();
            let valid = match next {
                Some('0'..='9') => true,
                Some('+' | '-') => matches!(ahead.next(), Some('0'..='9')),
                _ => false,
            };
            if valid {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some('0'..='9')) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start as usize..self.pos as usize];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Error(format!("Invalid number: {}", text).into()),
        }
    }

    fn scan_escape(&mut self) -> Option<char> {
        let c = self.advance()?;
        Some(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self.peek().and_then(|d| d.to_digit(16))?;
                    self.advance();
                    code = code * 16 + digit;
                }
                char::from_u32(code)?
            }
            other => other,
        })
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return TokenKind::Error("Unterminated string".into()),
                Some(c) if c == quote => break,
                Some('\\') => match self.scan_escape() {
                    Some(c) => value.push(c),
                    None => return TokenKind::Error("Invalid escape sequence".into()),
                },
                Some(c) => value.push(c),
            }
        }
        TokenKind::String(value.into())
    }

    fn scan_template(&mut self) -> TokenKind {
        let mut chunks = Vec::new();
        let mut text = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Error("Unterminated template literal".into()),
                Some('`') => break,
                Some('\\') => match self.scan_escape() {
                    Some(c) => text.push(c),
                    None => return TokenKind::Error("Invalid escape sequence".into()),
                },
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    if !text.is_empty() {
                        chunks.push(TemplateChunk::Text(std::mem::take(&mut text).into()));
                    }
                    let offset = self.pos;
                    match self.scan_substitution() {
                        Some(source) => chunks.push(TemplateChunk::Substitution {
                            source: source.into(),
                            offset,
                        }),
                        None => {
                            return TokenKind::Error("Unterminated template substitution".into());
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }

        if !text.is_empty() {
            chunks.push(TemplateChunk::Text(text.into()));
        }
        TokenKind::Template(chunks)
    }

    /// Raw text up to the `}` closing a `${`, skipping nested braces and strings
    fn scan_substitution(&mut self) -> Option<&'src str> {
        let source = self.source;
        let start = self.pos as usize;
        let mut depth = 0usize;
        loop {
            let c = self.advance()?;
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => {
                    let end = self.pos as usize - 1;
                    return Some(&source[start..end]);
                }
                '}' => depth -= 1,
                '"' | '\'' | '`' => {
                    while let Some(inner) = self.advance() {
                        if inner == '\\' {
                            self.advance();
                        } else if inner == c {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a === b ?? c?.d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::EqEqEq,
                TokenKind::Identifier("b".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Identifier("c".into()),
                TokenKind::QuestionDot,
                TokenKind::Identifier("d".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1 2.5 .5 1e3"), vec![
            TokenKind::Number(1.0),
            TokenKind::Number(2.5),
            TokenKind::Number(0.5),
            TokenKind::Number(1000.0),
        ]);
    }

    #[test]
    fn test_string_contents_are_opaque() {
        assert_eq!(kinds(r#"'a + b' "x\"y""#), vec![
            TokenKind::String("a + b".into()),
            TokenKind::String("x\"y".into()),
        ]);
    }

    #[test]
    fn test_template_literal_chunks() {
        let tokens = kinds("`hi ${name}!`");
        let TokenKind::Template(chunks) = &tokens[0] else {
            panic!("expected template");
        };
        assert_eq!(chunks.len(), 3);
        assert!(matches!(&chunks[1], TemplateChunk::Substitution { source, .. } if &**source == "name"));
    }

    #[test]
    fn test_conditional_with_fraction_is_not_optional_chain() {
        assert_eq!(kinds("a?.5:1")[1], TokenKind::Question);
    }

    #[test]
    fn test_single_equals_is_error() {
        assert!(matches!(kinds("a = 1")[1], TokenKind::Error(_)));
    }
}
