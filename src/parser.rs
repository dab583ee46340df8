/*!
Recursive‑descent parser producing the [`Expr`]/[`Stmt`] tree.

Grammar (EBNF — condensed, Crafting Interpreters dialect)
--------------------------------------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
               expression? ";" expression? ")" statement ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "super" "." IDENT | IDENT | "(" expression ")" ;
```

`for` has no AST node of its own — it desugars during parsing into a block
holding the initializer and a `while` loop whose body appends the increment.

Error recovery
--------------

The parser *collects* diagnostics instead of aborting: a malformed
production records one [`LoxError::Parse`] and `synchronize`s to the next
statement boundary (a `;` or a keyword that begins a declaration or
statement), then parsing resumes.  This bounds cascades to roughly one
diagnostic per malformed statement.  Soft limits (255 parameters or
arguments, invalid assignment targets) record a diagnostic without
discarding any input at all.

Logging: lifecycle milestones at `info`, grammar descent and error paths
at `debug`.
*/

use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,

    /// Next identity to hand out to a resolvable node
    /// (`Variable`/`Assign`/`This`/`Super`).
    next_id: usize,

    /// Diagnostics collected so far.  Never cleared by recovery.
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self::resuming(tokens, 0)
    }

    /// Construct a parser whose node ids start at `next_id`.
    ///
    /// A REPL threads the counter from line to line: the interpreter's
    /// binding table persists for the session, and closures defined on an
    /// earlier line keep their entries, so ids must never collide.
    pub fn resuming(tokens: &'a [Token], next_id: usize) -> Self {
        info!(
            "Parser created with {} tokens, node ids from {}",
            tokens.len(),
            next_id
        );

        Self {
            tokens,
            current: 0,
            next_id,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.
    ///
    /// Returns every statement that parsed cleanly together with every
    /// diagnostic collected along the way.  An empty diagnostic list means
    /// the program is syntactically complete.
    pub fn parse(&mut self) -> (Vec<Stmt>, Vec<LoxError>) {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parse phase finished: {} statement(s), {} diagnostic(s)",
            statements.len(),
            self.errors.len()
        );

        (statements, std::mem::take(&mut self.errors))
    }

    /// Parse the input as a single expression (the `parse` / `evaluate`
    /// CLI modes operate on expression files).
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let expr: Expr = self.expression()?;

        // Soft diagnostics (argument caps, bad assignment targets) still
        // fail an expression‑only parse.
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        Ok(expr)
    }

    /// Node ids handed out so far; the driver feeds this into
    /// [`Parser::resuming`] for the next REPL line.
    pub fn next_node_id(&self) -> usize {
        self.next_id
    }

    // ──────────────────────── declaration rules ───────────────────

    /// One declaration, or `None` after recording a diagnostic and
    /// synchronizing past the malformed construct.
    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration");

        let result: Result<Stmt> = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),

            Err(e) => {
                debug!("Recovering from parse error: {}", e);

                self.errors.push(e);
                self.synchronize();

                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name")?
            .clone();

        let superclass: Option<Expr> = if self.matches(TokenType::LESS) {
            let sup: Token = self
                .consume(TokenType::IDENTIFIER, "Expected superclass name")?
                .clone();

            Some(Expr::Variable {
                id: self.node_id(),
                name: sup,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// Shared by top‑level functions and class methods; `kind` only labels
    /// error messages.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, format!("Expected {kind} name"))?
            .clone();

        self.consume(
            TokenType::LEFT_PAREN,
            format!("Expected '(' after {kind} name"),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    // Soft limit: report once per offender, keep parsing.
                    self.report(
                        self.peek().line,
                        "Cannot have more than 255 parameters",
                    );
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        self.consume(
            TokenType::LEFT_BRACE,
            format!("Expected '{{' before {kind} body"),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    /// `for` desugars into `{ init; while (cond) { body; incr; } }`.
    /// A missing condition becomes the literal `true`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let mut body: Stmt = self.statement()?;

        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        body = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::True)),
            body: Box::new(body),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;

        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(Expr::Assign {
                        id: self.node_id(),
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Get { object, name } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                    });
                }

                _ => {
                    // Reported, not thrown: the surrounding statement keeps
                    // parsing so one bad target costs one diagnostic.
                    self.report(equals.line, "Invalid assignment target");
                }
            }

            return Ok(value);
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    self.report(self.peek().line, "Cannot have more than 255 arguments");
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }

        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }

        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.matches(TokenType::NUMBER(0.0)) {
            if let TokenType::NUMBER(n) = self.previous().token_type.clone() {
                return Ok(Expr::Literal(LiteralValue::Number(n)));
            }
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s: String = s.clone();
            self.advance();

            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: self.node_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();

            self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
            let method: Token = self
                .consume(TokenType::IDENTIFIER, "Expected superclass method name")?
                .clone();

            return Ok(Expr::Super {
                id: self.node_id(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: self.node_id(),
                name: self.previous().clone(),
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse(self.peek().line, "Expected expression"))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Hand out a fresh node identity for the resolver's side table.
    #[inline(always)]
    fn node_id(&mut self) -> usize {
        let id: usize = self.next_id;
        self.next_id += 1;

        id
    }

    /// Record a non‑fatal diagnostic and keep parsing.
    fn report(&mut self, line: usize, message: &str) {
        debug!("Soft parse diagnostic: [line {}] {}", line, message);

        self.errors.push(LoxError::parse(line, message));
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: impl Into<String>) -> Result<&Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(LoxError::parse(self.peek().line, message.into()))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
