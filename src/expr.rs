use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree; the
/// parser copies (or converts) the value at parse‑time so the AST can
/// outlive the lexer's token buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal (Lox's `null`).
    Nil,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*
/// in Lox.
///
/// The four variants the resolver needs to pin to a binding distance
/// (`Variable`, `Assign`, `This`, `Super`) carry an `id`: a counter the
/// parser hands out exactly once per node.  The resolver's side table is
/// keyed by that id, so two textually identical references in different
/// scopes stay distinct.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        /// Operand to which the operator is applied.
        right: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        /// Operator token such as `+`, `*`, `==`, …
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Variable access ‑ resolves to the identifier's value at runtime.
    Variable { id: usize, name: Token },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: usize,
        name: Token,
        value: Box<Expr>,
    },

    /// Function‑ or method‑call expression
    /// *Example:* `clock()` or `add(1, 2)`
    Call {
        /// Expression that evaluates to a callable (variable, property, etc.).
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The 'this' keyword inside a method.
    This { id: usize, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: usize,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    /// Source line of the token that anchors this node, for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,

            Expr::Unary { operator, .. } => operator.line,

            Expr::Binary { operator, .. } => operator.line,

            Expr::Logical { operator, .. } => operator.line,

            Expr::Grouping(inner) => inner.line(),

            Expr::Variable { name, .. } => name.line,

            Expr::Assign { name, .. } => name.line,

            Expr::Call { paren, .. } => paren.line,

            Expr::Get { name, .. } => name.line,

            Expr::Set { name, .. } => name.line,

            Expr::This { keyword, .. } => keyword.line,

            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}
