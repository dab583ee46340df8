//! Lexical environment frames.
//!
//! A frame maps names to values and links to its enclosing frame.  Frames
//! are shared through `Rc<RefCell<…>>`: a closure keeps its defining frame
//! alive after the defining block has structurally ended, and two closures
//! over the same frame alias the same mutable slots — assigning through
//! one is visible through the other.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    pub enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in *this* frame, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup: walk the chain outward until the name is found.
    /// Used only for globals; resolved locals go through [`get_at`].
    ///
    /// The error is a bare message; the evaluator attaches the source line.
    pub fn get(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Dynamic assignment, walking the chain like [`Environment::get`].
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), String> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }
}

/// The frame exactly `distance` enclosing‑links above `env`.
///
/// The resolver guarantees the chain is at least that deep whenever it
/// records a distance, so running out of links is a bug in resolution,
/// not in user code.
pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
    let mut frame: Rc<RefCell<Environment>> = env.clone();

    for _ in 0..distance {
        let next: Rc<RefCell<Environment>> = frame
            .borrow()
            .enclosing
            .as_ref()
            .expect("resolved distance exceeds environment depth")
            .clone();

        frame = next;
    }

    frame
}

/// Read a name at a statically resolved distance.
pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
    ancestor(env, distance).borrow().values.get(name).cloned()
}

/// Write a name at a statically resolved distance.
pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
    ancestor(env, distance)
        .borrow_mut()
        .values
        .insert(name.to_string(), value);
}
