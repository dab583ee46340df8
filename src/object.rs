//! The runtime object model: user functions, classes, and instances.
//!
//! All three are shared through `Rc`; the interpreter clones handles, never
//! the underlying objects.  A [`LoxFunction`] pairs a declaration with the
//! environment frame that was live at its definition — that pairing *is*
//! the closure, and the `Rc` link is what keeps the frame alive after its
//! block ends.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// A user‑defined function or method, closed over its defining frame.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,

    /// `init` methods implicitly return the new instance, never a value.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a *new* function sharing this declaration, whose closure is
    /// a fresh frame defining `this` — method access re‑binds on every read
    /// so the receiver travels with the extracted method value.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", Value::Instance(instance));

        LoxFunction::new(
            self.declaration.clone(),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }

    /// Execute the body in a fresh child of the closure frame.  The caller
    /// has already checked arity.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            environment.define(&param.lexeme, argument.clone());
        }

        let flow: Flow =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)))?;

        if self.is_initializer {
            // `return;` inside init still yields the instance.
            let this: Value = environment::get_at(&self.closure, 0, "this")
                .expect("initializer closure defines 'this'");

            return Ok(this);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// A class value: name, optional superclass, and a method table.
/// Classes are callable; calling one constructs an instance.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Method lookup walks the superclass chain, nearest definition wins.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        if let Some(superclass) = &self.superclass {
            return superclass.find_method(name);
        }

        None
    }

    /// A class called as a constructor has its initializer's arity, or 0.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Allocate an instance and run `init` (if any) bound to it.  The
    /// call's result is always the new instance, whatever `init` returns.
    pub fn instantiate(
        this: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", this.name);

        let instance: Rc<RefCell<LoxInstance>> =
            Rc::new(RefCell::new(LoxInstance::new(this.clone())));

        if let Some(initializer) = this.find_method("init") {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance: a class reference plus a field table.  Fields spring into
/// existence on first assignment.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: fields shadow methods; a found method is re‑bound to
    /// the receiver on every access.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.borrow().class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(instance.clone()))));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: creates the field if it does not exist.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
