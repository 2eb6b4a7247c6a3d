// SPDX-License-Identifier: MIT

//! Abstract syntax tree for guard and template expressions

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Comparison expression: left op right
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// Logical AND
    And(Box<Expression>, Box<Expression>),
    /// Logical OR
    Or(Box<Expression>, Box<Expression>),
    /// Logical NOT
    Not(Box<Expression>),
    /// A bare operand, evaluated by truthiness in boolean position
    Operand(Operand),
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A dotted variable reference
    Var(String),
    /// A literal value
    Literal(Literal),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
    /// contains (substring, array membership, object key)
    Contains,
    /// in (reversed membership)
    In,
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::Contains => write!(f, "contains"),
            CompareOp::In => write!(f, "in"),
        }
    }
}
