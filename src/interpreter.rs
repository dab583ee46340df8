//! Tree‑walking evaluator.
//!
//! Executes a resolved AST against a chain of [`Environment`] frames rooted
//! at a single global frame that lives for the whole session.  Variable
//! reads and writes consult the resolver's side table (`locals`): a recorded
//! distance jumps exactly that many enclosing links, anything unrecorded
//! goes to the global frame dynamically — which is what lets a REPL redefine
//! top‑level names without re‑resolving old code.
//!
//! `return` is ordinary control flow, not an error: statement execution
//! yields a [`Flow`] outcome that callers check and propagate up to the
//! nearest function call.  Runtime errors are [`LoxError::Runtime`] values
//! unwinding through `Result` to the top‑level driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::object::{LoxClass, LoxFunction, LoxInstance};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: either fall through to the next
/// statement, or unwind to the nearest enclosing function call with a value.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    /// The one frame that outlives every program unit.
    globals: Rc<RefCell<Environment>>,

    /// Currently active frame; swapped (and always restored) around blocks
    /// and call bodies.
    environment: Rc<RefCell<Environment>>,

    /// Resolver side table: node id → binding distance.  Persistent for the
    /// session so closures from earlier REPL lines keep their bindings.
    locals: HashMap<usize, usize>,

    /// Sink for `print`; stdout in production, a shared buffer in tests.
    out: Rc<RefCell<dyn Write>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with native functions
    /// such as `clock` predefined in globals.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// Creates an Interpreter with a caller‑supplied `print` sink.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        info!("Initializing Interpreter");

        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// The global frame, exposed for the driver and tests.
    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        self.globals.clone()
    }

    /// Record a resolved binding distance for a node.  Called by the
    /// resolver; absence of an entry means "global".
    pub fn note_local(&mut self, id: usize, depth: usize) {
        debug!("Noting local binding: node {} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Resolved distance for a node, if it was bound as a local.
    pub fn binding_distance(&self, id: usize) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────── statement execution ──────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out.borrow_mut(), "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let child: Environment = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(child)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        // `return` punches through loops to the call frame.
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the *defining* frame; binding the function
                // under its own name there is what enables self‑recursion.
                let function: LoxFunction =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Executes `statements` with `environment` as the current frame,
    /// restoring the previous frame on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        let mut outcome: Result<Flow> = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}

                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;

        outcome
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Flow> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(expr.line(), "Superclass must be a class."));
                }
            },

            None => None,
        };

        // Two‑step definition so methods resolving the class name find it.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Synthetic `super` frame sits between the class's scope and every
        // method closure, mirroring the scope the resolver opened.
        let enclosing: Option<Rc<RefCell<Environment>>> = superclass_value.as_ref().map(|sc| {
            let previous: Rc<RefCell<Environment>> = self.environment.clone();

            let mut frame: Environment = Environment::with_enclosing(previous.clone());
            frame.define("super", Value::Class(sc.clone()));
            self.environment = Rc::new(RefCell::new(frame));

            previous
        });

        let mut table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";

            let function: LoxFunction =
                LoxFunction::new(method.clone(), self.environment.clone(), is_initializer);

            table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class: Value = Value::Class(Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass_value,
            table,
        )));

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, class)
            .map_err(|msg| LoxError::runtime(name.line, msg))?;

        Ok(Flow::Normal)
    }

    // ───────────────────────── expression evaluation ────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value: Value = self.evaluate(left)?;

                // Short‑circuit: the operand *value* is returned, not a
                // coerced boolean.
                match operator.token_type {
                    TokenType::OR if left_value.is_truthy() => Ok(left_value),
                    TokenType::AND if !left_value.is_truthy() => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                if let Some(&distance) = self.locals.get(id) {
                    environment::assign_at(&self.environment, distance, &name.lexeme, value.clone());
                } else {
                    self.globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone())
                        .map_err(|msg| LoxError::runtime(name.line, msg))?;
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value: Value = self.evaluate(callee)?;

                let mut argument_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee_value, paren, &argument_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),

                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;

                    instance.borrow_mut().set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.")),
            },

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!right_value.is_truthy())),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        // Strict left‑before‑right evaluation.
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a * b))
            }

            // IEEE‑754 semantics: dividing by zero yields an infinity or
            // NaN, never an error.
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value.equals(&right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left_value.equals(&right_value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_super(&mut self, id: usize, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Cannot use 'super' outside of a class.")
        })?;

        let superclass: Rc<LoxClass> =
            match environment::get_at(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,

                _ => {
                    return Err(LoxError::runtime(
                        keyword.line,
                        "Cannot use 'super' in a class with no superclass.",
                    ));
                }
            };

        // The receiver sits one frame below the synthetic `super` scope.
        let object: Rc<RefCell<LoxInstance>> =
            match environment::get_at(&self.environment, distance - 1, "this") {
                Some(Value::Instance(instance)) => instance,

                _ => {
                    return Err(LoxError::runtime(
                        keyword.line,
                        "Cannot use 'super' outside of a method.",
                    ));
                }
            };

        let found: Rc<LoxFunction> = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }

    fn look_up_variable(&self, name: &Token, id: usize) -> Result<Value> {
        if let Some(&distance) = self.locals.get(&id) {
            environment::get_at(&self.environment, distance, &name.lexeme).ok_or_else(|| {
                LoxError::runtime(
                    name.line,
                    format!("Undefined variable '{}'.", name.lexeme),
                )
            })
        } else {
            self.globals
                .borrow()
                .get(&name.lexeme)
                .map_err(|msg| LoxError::runtime(name.line, msg))
        }
    }

    /// Invokes a callable (native function, user function, or class).
    fn invoke_callable(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: &[Value],
    ) -> Result<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(arity, arguments.len(), paren)?;

                func(arguments).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                LoxClass::instantiate(&class, self, arguments)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

/// Exact‑arity check shared by every callable kind; the message cites both
/// expected and actual counts and the body is never entered on mismatch.
fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

/// Both operands must be numbers; anything else is a runtime type error
/// carrying the operator's line.
fn number_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),

        _ => Err(LoxError::runtime(
            operator.line,
            "Operands must be numbers.",
        )),
    }
}
