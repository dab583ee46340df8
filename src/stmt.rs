use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration.
///
/// Reference‑counted so a function *value* (a closure) can share the
/// declaration with the AST and keep it alive after the declaring
/// statement list is gone — a REPL drops each line's AST once it has run,
/// but closures defined on that line may live for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255, softly enforced by the parser).
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements* (complete executable
/// constructs).  A program is a sequence of these nodes returned by
/// [`crate::parser::Parser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops desugar to this at parse time.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Class declaration with an optional superclass and a method list.
    Class {
        name: Token,

        /// Always an `Expr::Variable` naming the superclass, validated to
        /// be a class value at runtime.
        superclass: Option<Expr>,

        methods: Vec<Rc<FunctionDecl>>,
    },
}
