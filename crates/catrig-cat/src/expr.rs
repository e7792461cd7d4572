//! Conversion expressions.
//!
//! A `CONVERT` entry maps a wire number to a display number (or back) with a
//! one-variable arithmetic expression such as `x*255/100` or `(x-50)*2`.
//! Declaration files may come from third parties, so expressions are parsed
//! by a small recursive-descent parser into an [`Expression`] tree and then
//! evaluated; nothing is ever handed to an interpreter.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | 'x' | '(' expr ')'
//! NUMBER  := DIGIT+ ('.' DIGIT+)?
//! ```

use std::fmt;

/// Nesting limit for parentheses and unary operators.
const MAX_DEPTH: usize = 64;

/// Why an expression failed to parse or evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character {ch:?} at offset {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number at offset {pos}")]
    InvalidNumber { pos: usize },
    #[error("expression nested too deeply")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite integer-representable number")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var,
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
}

/// A parsed conversion expression in the single variable `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse `source`. Fails on anything outside the grammar above.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let mut parser = Parser {
            src: source.as_bytes(),
            pos: 0,
            depth: 0,
        };
        parser.skip_ws();
        if parser.at_end() {
            return Err(ExprError::Empty);
        }
        let root = parser.expr()?;
        parser.skip_ws();
        if let Some(ch) = parser.peek() {
            return Err(ExprError::UnexpectedChar {
                pos: parser.pos,
                ch: ch as char,
            });
        }
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    /// The text the expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `x` bound to `x`.
    pub fn eval(&self, x: f64) -> Result<f64, ExprError> {
        let v = eval_node(&self.root, x)?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ExprError::OutOfRange)
        }
    }

    /// Evaluate and round to the nearest integer, halves away from zero.
    pub fn eval_rounded(&self, x: f64) -> Result<i64, ExprError> {
        let v = self.eval(x)?.round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
        if v >= -(i64::MAX as f64) && v < i64::MAX as f64 {
            Ok(v as i64)
        } else {
            Err(ExprError::OutOfRange)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn eval_node(node: &Node, x: f64) -> Result<f64, ExprError> {
    match node {
        Node::Num(n) => Ok(*n),
        Node::Var => Ok(x),
        Node::Neg(inner) => Ok(-eval_node(inner, x)?),
        Node::Bin(op, lhs, rhs) => {
            let a = eval_node(lhs, x)?;
            let b = eval_node(rhs, x)?;
            match op {
                BinOp::Add => Ok(a + b),
                BinOp::Sub => Ok(a - b),
                BinOp::Mul => Ok(a * b),
                BinOp::Div if b == 0.0 => Err(ExprError::DivisionByZero),
                BinOp::Div => Ok(a / b),
            }
        }
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ExprError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.term()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'+') => BinOp::Add,
                Some(b'-') => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'*') => BinOp::Mul,
                Some(b'/') => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Node::Neg(Box::new(inner)))
            }
            Some(b'+') => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ExprError::UnexpectedEnd),
            Some(b'x') => {
                self.pos += 1;
                Ok(Node::Var)
            }
            Some(b'(') => {
                self.pos += 1;
                self.enter()?;
                let inner = self.expr()?;
                self.skip_ws();
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        self.depth -= 1;
                        Ok(inner)
                    }
                    Some(ch) => Err(ExprError::UnexpectedChar {
                        pos: self.pos,
                        ch: ch as char,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(b'0'..=b'9') => self.number(),
            Some(ch) => Err(ExprError::UnexpectedChar {
                pos: self.pos,
                ch: ch as char,
            }),
        }
    }

    fn number(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            let frac_start = self.pos;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            if self.pos == frac_start {
                return Err(ExprError::InvalidNumber { pos: start });
            }
        }
        // The slice is ASCII digits and at most one dot.
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .map(Node::Num)
            .ok_or(ExprError::InvalidNumber { pos: start })
    }
}
