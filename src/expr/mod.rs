//! Source expressions: values of pressure and flow sources as functions of time.
//!
//! Element values are either constants or infix expressions in the time
//! variable `t`. A [`SourceEvaluator`] turns either form into a callable
//! [`SourceFn`]; [`Calculator`] is the built-in evaluator.
//!
//! # Grammar
//!
//! ```text
//! expr     = level8
//! level(n) = level(n-1) { op(n) level(n-1) }     (left-associative)
//! level(0) = factor
//! factor   = number | constant | "t" | ("+"|"-") factor
//!          | function "(" expr ")" | "(" expr ")"
//!
//! op(1) = "**"           op(5) = "==" | "!="
//! op(2) = "*" | "/" | "%"  op(6) = "&"
//! op(3) = "+" | "-"      op(7) = "^"
//! op(4) = "<" | "<=" | ">" | ">="   op(8) = "|"
//!
//! number   = digits ["." digits] [("e"|"E") ["+"|"-"] digits] | "." digits
//! function = sin | cos | tan | asin | acos | atan | abs | floor | sqrt | exp | ln
//! constant = e | pi
//! ```
//!
//! Comparisons and logical operators yield `1.0` for true and `0.0` for false,
//! so `10*(t>1)` is a step of height 10 at `t = 1`.

mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Function};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::circuit::SourceValue;
use crate::error::Result;

/// A source value as a function of time.
pub type SourceFn = Box<dyn Fn(f64) -> f64>;

/// Turns element values into callables of time.
pub trait SourceEvaluator {
    fn evaluate(&self, value: &SourceValue<'_>) -> Result<SourceFn>;
}

/// Parse an expression string into a tree.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}

/// Built-in infix calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Calculator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an expression at a single time.
    pub fn calculate(&self, input: &str, t: f64) -> Result<f64> {
        Ok(parse(input)?.eval(t))
    }
}

impl SourceEvaluator for Calculator {
    fn evaluate(&self, value: &SourceValue<'_>) -> Result<SourceFn> {
        match *value {
            SourceValue::Constant(v) => Ok(Box::new(move |_| v)),
            SourceValue::Expression(text) => {
                let expr = parse(text)?;
                if expr.uses_time() {
                    Ok(Box::new(move |t| expr.eval(t)))
                } else {
                    let v = expr.eval(0.0);
                    Ok(Box::new(move |_| v))
                }
            }
        }
    }
}
