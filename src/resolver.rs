//! Static resolver pass.
//!
//! One AST walk that does three things:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in an initializer,
//!    invalid `return`/`this`/`super`, a class inheriting from itself).
//! 3. Record, for *each* resolvable node, its binding distance by calling
//!    back into the interpreter — nodes left unrecorded are globals,
//!    looked up dynamically at run time.
//!
//! Errors are collected, never thrown: the walk always finishes, so every
//! independent mistake in a program surfaces in one pass.  Method bodies
//! resolve inside synthetic `this` (and, for subclasses, `super`) scopes
//! that have no source‑level block — the interpreter mirrors those frames
//! when it builds class values, which is what keeps the recorded distances
//! honest.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body encloses the current node?  Gates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body encloses the current node?  Gates `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.  Returns every static diagnostic
    /// found; an empty `Ok` means the program is safe to evaluate.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<(), Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so the
                // initializer cannot observe the name it defines.
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // The name is visible *inside* its own body (recursion).
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.report(keyword, "Cannot return from top-level code");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.report(keyword, "Cannot return a value from an initializer");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class: ClassType = self.current_class;
        self.current_class = ClassType::Class;

        // The class name is bound before the superclass expression resolves:
        // valid references to an *earlier* class of the same name are gone,
        // so a self‑referential superclass is a hard static error.
        self.declare(name);
        self.define(name);

        if let Some(sup) = superclass {
            if let Expr::Variable { name: sup_name, .. } = sup {
                if sup_name.lexeme == name.lexeme {
                    self.report(sup_name, "A class cannot inherit from itself");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(sup);

            // Synthetic scope holding `super`, between the enclosing scope
            // and the one holding `this`.
            self.begin_scope();
            self.scope_insert("super");
        }

        self.begin_scope();
        self.scope_insert("this");

        for method in methods {
            let declaration: FunctionType = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        debug!("Resolving expr: {:?}", expr);

        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read a local in its own initializer: the name is
                // declared (flag false) but not yet defined.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.report(name, "Cannot read local variable in its own initializer");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS.
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.report(keyword, "Cannot use 'this' outside of a class");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.report(keyword, "Cannot use 'super' outside of a class");
                        return;
                    }

                    ClassType::Class => {
                        self.report(keyword, "Cannot use 'super' in a class with no superclass");
                        return;
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.  Parameters
    /// are defined immediately — they have no initializer‑ordering hazard.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Seed the innermost scope with a synthetic, already‑defined name.
    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(LoxError::resolve(
                    name.line,
                    "Variable already declared in this scope",
                ));
                return;
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn report(&mut self, token: &Token, message: &str) {
        debug!("Static diagnostic at '{}': {}", token.lexeme, message);

        self.errors.push(LoxError::resolve(token.line, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the innermost
    /// scope that declares it, or leave it global if no scope does.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        // Innermost → outermost.
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        // Not found in any local scope ⇒ global.
        debug!("Resolved '{}' as global", name.lexeme);
    }
}
