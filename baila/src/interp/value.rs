//! Runtime values for the interpreter

use super::error::{InterpResult, RuntimeError};
use super::function::FunctionValue;
use super::heap::Handle;
use crate::ast::BailaType;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Runtime value
///
/// Everything but lists is immutable; assignment replaces the binding.
/// Lists are shared, so an element write is visible through every alias.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit floating point
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    /// Named overload set
    Function(Rc<FunctionValue>),
    List(Rc<RefCell<Vec<Value>>>),
    /// Heap reference, `None` is the null reference
    Object(Option<Handle>),
}

impl Value {
    pub fn null() -> Value {
        Value::Object(None)
    }

    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Object(None))
    }

    /// Numeric coercion. Objects coerce to -1.
    pub fn as_number(&self) -> InterpResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                RuntimeError::type_error(format!("Cannot convert '{s}' to Number"))
            }),
            Value::Function(_) | Value::List(_) => Ok(0.0),
            Value::Object(_) => Ok(-1.0),
        }
    }

    /// Truth value used by conditions and `!`
    pub fn as_boolean(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
            Value::Function(_) => false,
            Value::List(_) => true,
            Value::Object(handle) => handle.is_some(),
        }
    }

    /// Type of a non-object value. Objects need the heap, see
    /// `Interpreter::type_of`.
    pub fn primitive_type(&self) -> Option<BailaType> {
        match self {
            Value::Number(_) => Some(BailaType::number()),
            Value::String(_) => Some(BailaType::string()),
            Value::Boolean(_) => Some(BailaType::boolean()),
            Value::Function(_) => Some(BailaType::function()),
            Value::List(_) => Some(BailaType::list()),
            Value::Object(None) => Some(BailaType::null()),
            Value::Object(Some(_)) => None,
        }
    }

    /// Copy for a fresh instance field: lists are duplicated element by
    /// element, object references still point at the same container.
    /// Sharing and cycles among the copied lists are kept.
    pub fn deep_clone(&self) -> Value {
        self.clone_with(&mut HashMap::new())
    }

    fn clone_with(&self, copies: &mut HashMap<*const RefCell<Vec<Value>>, ListRef>) -> Value {
        let Value::List(items) = self else {
            return self.clone();
        };
        if let Some(copy) = copies.get(&Rc::as_ptr(items)) {
            return Value::List(Rc::clone(copy));
        }
        let copy: ListRef = Rc::new(RefCell::new(Vec::new()));
        copies.insert(Rc::as_ptr(items), Rc::clone(&copy));
        let elements = items
            .borrow()
            .iter()
            .map(|item| item.clone_with(copies))
            .collect();
        *copy.borrow_mut() = elements;
        Value::List(copy)
    }
}

type ListRef = Rc<RefCell<Vec<Value>>>;

/// Whole numbers print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}
