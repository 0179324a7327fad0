//! Scaling equations for converting raw cells into physical values.
//!
//! Definition documents store the conversion as text such as `X*0.75-48` or
//! `(X-128)/2`. The text is parsed once into a small expression tree with a
//! single free variable `X`; evaluation is pure arithmetic.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | 'X' | '(' expr ')'
//! ```
//!
//! A comma is accepted as decimal separator.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var,
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Var => x,
            Expr::Neg(inner) => -inner.eval(x),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                }
            }
        }
    }
}

/// A parsed scaling equation
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    source: String,
    expr: Expr,
}

impl Equation {
    /// The identity conversion `X`
    pub fn identity() -> Self {
        Self {
            source: "X".to_string(),
            expr: Expr::Var,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);
        let expr = parser.expr()?;
        parser.skip_whitespace();
        if let Some(c) = parser.peek() {
            return Err(parser.error(format!("unexpected character '{}'", c)));
        }

        Ok(Self {
            source: text.trim().to_string(),
            expr,
        })
    }

    /// Evaluate with `X` bound to `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        self.expr.eval(x)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_identity(&self) -> bool {
        self.expr == Expr::Var
    }
}

impl Default for Equation {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: String) -> Error {
        Error::InvalidEquation {
            equation: self.text.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinaryOp::Add
            } else if self.eat('-') {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinaryOp::Mul
            } else if self.eat('/') {
                BinaryOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat('-') {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat('+') {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if !self.eat(')') {
                    return Err(self.error("missing closing parenthesis".to_string()));
                }
                Ok(inner)
            }
            Some('X') | Some('x') => {
                self.pos += 1;
                Ok(Expr::Var)
            }
            Some(c) if c.is_ascii_digit() || c == '.' || c == ',' => self.number(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input".to_string())),
        }
    }

    fn number(&mut self) -> Result<Expr> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ',')
        {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos]
            .iter()
            .map(|&c| if c == ',' { '.' } else { c })
            .collect();
        literal
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", literal)))
    }
}

/// Format a converted value with a fixed number of decimals.
///
/// Integral results of an identity conversion are printed without decimals.
pub fn format_value(value: f64, precision: usize, integral: bool) -> String {
    if integral && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.*}", precision, value)
    }
}
