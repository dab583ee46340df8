//! Runtime values.
//!
//! The dynamically‑typed universe of the interpreter: every expression
//! evaluates to one of these.  Callable and object variants hold `Rc`s so
//! values can be cloned freely while sharing the underlying function,
//! class, or instance.

use std::cell::RefCell;
use std::rc::Rc;

use crate::object::{LoxClass, LoxFunction, LoxInstance};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,

    Bool(bool),

    Number(f64),

    String(String),

    /// Host‑provided function (e.g. `clock`), dispatched through a plain
    /// function pointer.
    NativeFunction {
        name: String,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    },

    /// User‑defined function or bound method.
    Function(Rc<LoxFunction>),

    /// Class values are themselves callable (constructors).
    Class(Rc<LoxClass>),

    Instance(Rc<RefCell<LoxInstance>>),
}

impl Value {
    /// `nil` and `false` are falsy; every other value (including `0` and
    /// `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    /// Lox equality: `nil` equals only `nil`; numbers, strings, and
    /// booleans compare by value; functions, classes, and instances
    /// compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                // Canonical form strips the ".0" from whole numbers.
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(func) => write!(f, "<fn {}>", func.name()),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class.name)
            }
        }
    }
}
