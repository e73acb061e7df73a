//! Expression Parser
//!
//! Recursive descent, lowest precedence first:
//! conditional, `??`, `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, call/member, primary.

use serde_json::Value;

use crate::ast::{BinaryOp, Expr, LogicalOp, TemplatePart, UnaryOp};
use crate::lexer::Lexer;
use crate::token::{TemplateChunk, Token, TokenKind};
use crate::value;
use crate::ExprError;

/// Expression parser
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    /// Added to reported positions (nested template substitutions)
    offset: u32,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_offset(source, 0)
    }

    fn with_offset(source: &'src str, offset: u32) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            offset,
        }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.current.kind == TokenKind::Eof {
            return Err(self.error("Empty expression"));
        }
        let expr = self.parse_expression()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(format!("Unexpected token {:?}", self.current.kind)));
        }
        Ok(expr)
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            message: message.into(),
            position: self.current.span.start + self.offset,
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn consume(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?}", kind, self.current.kind)))
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ExprError> {
        if let TokenKind::Error(message) = &self.current.kind {
            return Err(self.error(message.to_string()));
        }
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.parse_nullish()?;
        if !self.check(&TokenKind::Question) {
            return Ok(test);
        }
        self.advance();
        let consequent = self.parse_expression()?;
        self.consume(TokenKind::Colon)?;
        let alternate = self.parse_expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_nullish(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_logical_or()?;
        while self.check(&TokenKind::QuestionQuestion) {
            self.advance();
            let right = self.parse_logical_or()?;
            left = logical(LogicalOp::Nullish, left, right);
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_logical_and()?;
        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Equal,
                TokenKind::NotEq => BinaryOp::NotEqual,
                TokenKind::EqEqEq => BinaryOp::StrictEqual,
                TokenKind::NotEqEq => BinaryOp::StrictNotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LessThan => BinaryOp::LessThan,
                TokenKind::LessThanEq => BinaryOp::LessThanEq,
                TokenKind::GreaterThan => BinaryOp::GreaterThan,
                TokenKind::GreaterThanEq => BinaryOp::GreaterThanEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            _ => return self.parse_call(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_call(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                    };
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    if self.check(&TokenKind::LBracket) {
                        self.advance();
                        let index = self.parse_expression()?;
                        self.consume(TokenKind::RBracket)?;
                        expr = Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: true,
                        };
                    } else {
                        let property = self.parse_property_name()?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property,
                            optional: true,
                        };
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: false,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    expr = match expr {
                        Expr::Field(name) => Expr::MethodCall { name, args },
                        Expr::Member {
                            object,
                            property,
                            optional,
                        } => Expr::Call {
                            object,
                            method: property,
                            args,
                            optional,
                        },
                        _ => return Err(self.error("Expression is not callable")),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Arguments after `(`, consuming the closing `)`
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    /// Property names may be keywords (`a.null`, `x.typeof`)
    fn parse_property_name(&mut self) -> Result<String, ExprError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.to_string(),
            TokenKind::Boolean(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Undefined => "undefined".to_string(),
            TokenKind::Typeof => "typeof".to_string(),
            other => return Err(self.error(format!("Expected property name, got {:?}", other))),
        };
        self.advance();
        Ok(name)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(value::number(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Value::String(s.into()))),
            TokenKind::Boolean(b) => Ok(Expr::Literal(Value::Bool(b))),
            TokenKind::Null | TokenKind::Undefined => Ok(Expr::Literal(Value::Null)),
            TokenKind::Identifier(name) => Ok(Expr::Field(name.into())),
            TokenKind::Template(chunks) => self.parse_template(chunks),
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Error(message) => Err(ExprError::Syntax {
                message: message.into(),
                position: token.span.start + self.offset,
            }),
            TokenKind::Eof => Err(self.error("Unexpected end of expression")),
            other => Err(ExprError::Syntax {
                message: format!("Unexpected token {:?}", other),
                position: token.span.start + self.offset,
            }),
        }
    }

    fn parse_template(&mut self, chunks: Vec<TemplateChunk>) -> Result<Expr, ExprError> {
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(text) => parts.push(TemplatePart::Text(text.into())),
                TemplateChunk::Substitution { source, offset } => {
                    let inner = Parser::with_offset(&source, self.offset + offset).parse()?;
                    parts.push(TemplatePart::Expr(inner));
                }
            }
        }
        Ok(Expr::Template(parts))
    }

    fn parse_array(&mut self) -> Result<Expr, ExprError> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(TokenKind::RBracket)?;
        Ok(Expr::Array(items))
    }

    /// Object literal; keys are never model fields
    fn parse_object(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.advance().kind {
                TokenKind::Identifier(name) => name.to_string(),
                TokenKind::String(s) => s.to_string(),
                TokenKind::Number(n) => value::to_display(&value::number(n)),
                other => {
                    return Err(self.error(format!("Invalid object key {:?}", other)));
                }
            };

            if self.check(&TokenKind::Colon) {
                self.advance();
                let value = self.parse_expression()?;
                entries.push((key, value));
            } else {
                // Shorthand `{ name }`
                entries.push((key.clone(), Expr::Field(key)));
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Expr::Object(entries))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
