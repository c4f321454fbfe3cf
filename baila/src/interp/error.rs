//! Runtime errors for the interpreter

use crate::ast::BailaType;
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name not defined in any enclosing scope
    ReferenceError,
    /// Operand, overload, member or return type mismatch
    TypeError,
    /// Everything not promoted to a dedicated kind yet
    Runtime,
    /// List index outside `0..len`
    IndexOutOfBounds,
    /// Call depth limit reached
    StackOverflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ReferenceError => write!(f, "ReferenceError"),
            ErrorKind::TypeError => write!(f, "TypeError"),
            ErrorKind::Runtime => write!(f, "RuntimeError"),
            ErrorKind::IndexOutOfBounds => write!(f, "IndexOutOfBounds"),
            ErrorKind::StackOverflow => write!(f, "StackOverflow"),
        }
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn not_defined(name: &str, suggestion: Option<&str>) -> Self {
        let hint = suggestion
            .map(|s| format!(", did you mean '{s}'?"))
            .unwrap_or_default();
        Self::new(ErrorKind::ReferenceError, format!("'{name}' is not defined{hint}"))
    }

    pub fn null_reference(member: &str) -> Self {
        Self::type_error(format!("Cannot access '{member}' of null"))
    }

    pub fn field_is_undefined(member: &str, type_name: &str) -> Self {
        Self::type_error(format!("Field '{member}' is undefined in type '{type_name}'"))
    }

    pub fn field_is_constant(type_name: &str, member: &str) -> Self {
        Self::type_error(format!(
            "Cannot reassign {type_name}.{member}: field is constant"
        ))
    }

    pub fn not_callable(repr: &str) -> Self {
        Self::type_error(format!("Object {repr} is not callable"))
    }

    pub fn unable_to_find_overload(name: &str, arg_types: &[BailaType]) -> Self {
        let types = if arg_types.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
            format!(": {}", list.join(", "))
        };
        Self::type_error(format!(
            "{name}(): Unable to find overload with {} parameter(s){types}",
            arg_types.len()
        ))
    }

    pub fn index_out_of_bounds(index: f64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("Index {index} out of bounds for length {len}"),
        )
    }

    pub fn stack_overflow(depth: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("Maximum call depth of {depth} exceeded"),
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_kind_prefix() {
        let err = RuntimeError::not_defined("x", None);
        assert_eq!(err.to_string(), "ReferenceError: 'x' is not defined");
        assert_eq!(
            RuntimeError::runtime("boom").to_string(),
            "RuntimeError: boom"
        );
    }

    #[test]
    fn test_not_defined_with_suggestion() {
        let err = RuntimeError::not_defined("cnt", Some("count"));
        assert_eq!(err.message, "'cnt' is not defined, did you mean 'count'?");
    }

    #[test]
    fn test_overload_message() {
        let err = RuntimeError::unable_to_find_overload("f", &[BailaType::boolean()]);
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(
            err.message,
            "f(): Unable to find overload with 1 parameter(s): Boolean"
        );
        let err = RuntimeError::unable_to_find_overload("g", &[]);
        assert_eq!(err.message, "g(): Unable to find overload with 0 parameter(s)");
    }

    #[test]
    fn test_index_error() {
        let err = RuntimeError::index_out_of_bounds(5.0, 3);
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        assert_eq!(err.message, "Index 5 out of bounds for length 3");
    }
}
