// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::lexer::{IntLiteral, StrLiteral};
use crate::types::CType;

/// Deepest expression tree the parser builds and the evaluator folds. Deeper expressions are
/// rejected so that both stay within the stack of a worker thread.
pub const MAX_NESTING: usize = 256;

/// A C expression, as far as the analyzer needs to understand it.
/// Each variant is described by the C code that produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `42u`
    Int(IntLiteral),
    /// `'a'`
    Char(i64),
    /// `1.5`
    Float(String),
    /// `"text"`
    Str(StrLiteral),
    /// `x`
    Ident(String),
    /// `op e`
    Unary { op: UnaryOperator, e: Box<Expr> },
    /// `e++` or `e--`
    Postfix { increment: bool, e: Box<Expr> },
    /// `lhs op rhs`
    Binary { op: BinaryOperator, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `lhs = rhs`, `lhs += rhs`, ...
    Assign { op: Option<BinaryOperator>, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `c ? t : e`
    Conditional { c: Box<Expr>, t: Box<Expr>, e: Box<Expr> },
    /// `(typ) e`
    Cast { typ: CType, e: Box<Expr> },
    /// `sizeof(typ)`
    SizeOfType(CType),
    /// `sizeof e`
    SizeOfExpr(Box<Expr>),
    /// `function(arguments)`
    Call { function: Box<Expr>, arguments: Vec<Expr> },
    /// `array[index]`
    Index { array: Box<Expr>, index: Box<Expr> },
    /// `lhs.field` or `lhs->field`
    Member { lhs: Box<Expr>, field: String, arrow: bool },
    /// `lhs, rhs`
    Comma { lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `!e`
    Not,
    /// `~e`
    Bitnot,
    /// `-e`
    UnaryMinus,
    /// `+e`
    UnaryPlus,
    /// `&e`
    AddressOf,
    /// `*e`
    Dereference,
    /// `++e`
    PreIncrement,
    /// `--e`
    PreDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Mult,
    Div,
    Mod,
    Plus,
    Minus,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Equal,
    Notequal,
    Bitand,
    Bitxor,
    Bitor,
    And,
    Or,
}

impl BinaryOperator {
    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        use BinaryOperator::*;
        match self {
            Or => 1,
            And => 2,
            Bitor => 3,
            Bitxor => 4,
            Bitand => 5,
            Equal | Notequal => 6,
            Lt | Gt | Le | Ge => 7,
            Shl | Shr => 8,
            Plus | Minus => 9,
            Mult | Div | Mod => 10,
        }
    }
}

impl Expr {
    pub fn unary(op: UnaryOperator, e: Expr) -> Expr {
        Expr::Unary { op, e: Box::new(e) }
    }

    pub fn binary(op: BinaryOperator, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }
}
