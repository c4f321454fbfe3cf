//! Environment for variable bindings

use super::error::{InterpResult, RuntimeError};
use super::value::Value;
use crate::ast::BailaType;
use crate::types::{Ancestry, compare_types_strict, is_assignable};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Shared reference to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

/// A variable or constant slot
#[derive(Debug, Clone)]
pub struct Binding {
    /// Declared (or inferred) type; assignments must stay covariant to it
    pub ty: BailaType,
    pub value: Value,
    pub immutable: bool,
}

/// One lexical scope
#[derive(Debug, Default)]
pub struct Environment {
    bindings: BTreeMap<String, Binding>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new environment with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            bindings: BTreeMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn parent(&self) -> Option<&EnvRef> {
        self.parent.as_ref()
    }

    /// Binding declared in this very scope
    pub fn local(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.bindings.iter()
    }

    /// Bind a name in this scope, replacing whatever it held.
    pub fn define(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Declare a variable. Redeclaring a name in the same scope is allowed
    /// only with the very same type, and never over a constant.
    pub fn add_variable(&mut self, name: &str, ty: BailaType, value: Value) -> InterpResult<()> {
        if let Some(existing) = self.bindings.get(name) {
            if existing.immutable {
                return Err(RuntimeError::runtime(format!(
                    "Constant '{name}' is already defined"
                )));
            }
            if !compare_types_strict(&existing.ty, &ty) {
                return Err(RuntimeError::type_error(format!(
                    "Cannot convert type {ty} to the type {} of the variable {name}",
                    existing.ty
                )));
            }
        }
        self.bindings.insert(
            name.to_string(),
            Binding {
                ty,
                value,
                immutable: false,
            },
        );
        Ok(())
    }

    /// Declare a constant; the name must be new to this scope.
    pub fn add_constant(&mut self, name: &str, ty: BailaType, value: Value) -> InterpResult<()> {
        if self.bindings.contains_key(name) {
            return Err(RuntimeError::runtime(format!(
                "Constant '{name}' is already defined"
            )));
        }
        self.bindings.insert(
            name.to_string(),
            Binding {
                ty,
                value,
                immutable: true,
            },
        );
        Ok(())
    }

    /// Reassign a binding of this scope. `value_ty` is the runtime type of
    /// `value`.
    pub fn set_variable(
        &mut self,
        name: &str,
        value: Value,
        value_ty: &BailaType,
        classes: &dyn Ancestry,
    ) -> InterpResult<()> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| RuntimeError::not_defined(name, None))?;
        if binding.immutable {
            return Err(RuntimeError::runtime(format!(
                "Cannot redefine constant '{name}'"
            )));
        }
        if !is_assignable(value_ty, &binding.ty, classes) {
            return Err(RuntimeError::type_error(format!(
                "'{value_ty}' type cannot be stored inside of variable '{name}' with type '{}'",
                binding.ty
            )));
        }
        binding.value = value;
        Ok(())
    }

    /// Look up a variable in the scope chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.bindings.get(name) {
            Some(binding.value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }

    /// Check if a variable exists in the scope chain
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.borrow().contains(name))
    }

    /// Every name visible from this scope, innermost first
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.borrow().visible_names());
        }
        names
    }
}

/// Create a child environment from a parent reference
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}

/// Innermost scope, starting at `env`, that declares `name`
pub fn find_scope(env: &EnvRef, name: &str) -> Option<EnvRef> {
    let mut current = Rc::clone(env);
    loop {
        if current.borrow().local(name).is_some() {
            return Some(current);
        }
        let parent = current.borrow().parent().cloned()?;
        current = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::types::ClassRegistry;

    fn number(n: f64) -> Value {
        Value::Number(n)
    }

    fn as_number(value: Option<Value>) -> Option<f64> {
        match value {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.add_variable("x", BailaType::number(), number(42.0))
            .expect("declare");
        assert_eq!(as_number(env.get("x")), Some(42.0));
        assert!(env.get("y").is_none());
    }

    #[test]
    fn test_scope_chain() {
        let parent = Environment::new().into_ref();
        parent
            .borrow_mut()
            .add_variable("x", BailaType::number(), number(1.0))
            .expect("declare");

        let child = child_env(&parent);
        child
            .borrow_mut()
            .add_variable("y", BailaType::number(), number(2.0))
            .expect("declare");

        // Child can see parent's bindings
        assert_eq!(as_number(child.borrow().get("x")), Some(1.0));
        assert_eq!(as_number(child.borrow().get("y")), Some(2.0));
        // Parent cannot see child's bindings
        assert!(parent.borrow().get("y").is_none());
    }

    #[test]
    fn test_find_scope_reaches_root() {
        let root = Environment::new().into_ref();
        root.borrow_mut()
            .add_variable("g", BailaType::number(), number(0.0))
            .expect("declare");
        let leaf = child_env(&child_env(&root));
        let owner = find_scope(&leaf, "g").expect("found in root");
        assert!(Rc::ptr_eq(&owner, &root));
        assert!(find_scope(&leaf, "missing").is_none());
    }

    #[test]
    fn test_shadowing() {
        let outer = Environment::new().into_ref();
        outer
            .borrow_mut()
            .add_variable("x", BailaType::number(), number(1.0))
            .expect("declare");
        let inner = child_env(&outer);
        inner
            .borrow_mut()
            .add_variable("x", BailaType::string(), Value::string("s"))
            .expect("shadow with another type");
        assert!(matches!(inner.borrow().get("x"), Some(Value::String(_))));
        assert_eq!(as_number(outer.borrow().get("x")), Some(1.0));
    }

    #[test]
    fn test_redeclare_same_scope_needs_same_type() {
        let mut env = Environment::new();
        env.add_variable("x", BailaType::number(), number(1.0))
            .expect("declare");
        env.add_variable("x", BailaType::number(), number(2.0))
            .expect("same type");
        let err = env
            .add_variable("x", BailaType::string(), Value::string("s"))
            .expect_err("type change");
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_constants() {
        let classes = ClassRegistry::new();
        let mut env = Environment::new();
        env.add_constant("c", BailaType::number(), number(5.0))
            .expect("declare");
        let err = env
            .set_variable("c", number(6.0), &BailaType::number(), &classes)
            .expect_err("constant");
        assert_eq!(err.message, "Cannot redefine constant 'c'");
        let err = env
            .add_constant("c", BailaType::number(), number(7.0))
            .expect_err("redeclare");
        assert_eq!(err.message, "Constant 'c' is already defined");
        assert!(env
            .add_variable("c", BailaType::number(), number(7.0))
            .is_err());
    }

    #[test]
    fn test_set_variable_checks_type() {
        let classes = ClassRegistry::new();
        let mut env = Environment::new();
        env.add_variable("n", BailaType::number(), number(1.0))
            .expect("declare");
        env.set_variable("n", number(2.0), &BailaType::number(), &classes)
            .expect("same type");
        let err = env
            .set_variable("n", Value::string("x"), &BailaType::string(), &classes)
            .expect_err("wrong type");
        assert_eq!(err.kind, ErrorKind::TypeError);
    }
}
