//! Type compatibility rules
//!
//! Classes form a single-inheritance tree rooted at `Object`. The registry
//! only records each class's parent name; everything else about a class
//! lives in its container on the heap. Names can be reused by classes in
//! inner scopes, so checks on live values go through a [`Lineage`] that
//! carries each value's actual ancestor chain.

use std::collections::HashMap;

pub use crate::ast::BailaType;

/// Known classes and their declared parent
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    parents: HashMap<String, Option<String>>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// A registry holding the built-in `Object` root and the `Type` class.
    pub fn new() -> Self {
        let mut registry = ClassRegistry {
            parents: HashMap::new(),
        };
        registry.define(BailaType::OBJECT, None);
        registry.define(BailaType::TYPE, Some(BailaType::OBJECT.to_string()));
        registry
    }

    pub fn define(&mut self, name: impl Into<String>, parent: Option<String>) {
        self.parents.insert(name.into(), parent);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).and_then(|p| p.as_deref())
    }

    /// Ancestors of `name`, nearest first, not including `name` itself.
    pub fn ancestors<'a>(&'a self, name: &'a str) -> Ancestors<'a> {
        Ancestors {
            registry: self,
            current: name,
            // A redefined class can name its own previous definition as
            // parent; the budget stops the walk on such a loop.
            budget: self.parents.len(),
        }
    }
}

/// Answers subclass questions by class name
pub trait Ancestry {
    /// `descendant` is `ancestor` or inherits from it.
    fn is_subclass(&self, descendant: &str, ancestor: &str) -> bool;
}

impl Ancestry for ClassRegistry {
    fn is_subclass(&self, descendant: &str, ancestor: &str) -> bool {
        descendant == ancestor || self.ancestors(descendant).any(|a| a == ancestor)
    }
}

/// Registry view with known ancestor chains taking precedence over the
/// registry's latest definition of a name.
pub struct Lineage<'a> {
    chains: Vec<Vec<String>>,
    registry: &'a ClassRegistry,
}

impl<'a> Lineage<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        Lineage {
            chains: Vec::new(),
            registry,
        }
    }

    /// Add a chain of class names, the class itself first.
    pub fn push(&mut self, chain: Vec<String>) {
        self.chains.push(chain);
    }
}

impl Ancestry for Lineage<'_> {
    fn is_subclass(&self, descendant: &str, ancestor: &str) -> bool {
        match self
            .chains
            .iter()
            .find(|chain| chain.first().is_some_and(|name| name == descendant))
        {
            Some(chain) => chain.iter().any(|name| name == ancestor),
            None => self.registry.is_subclass(descendant, ancestor),
        }
    }
}

pub struct Ancestors<'a> {
    registry: &'a ClassRegistry,
    current: &'a str,
    budget: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.budget == 0 {
            return None;
        }
        self.budget -= 1;
        let parent = self.registry.parent_of(self.current)?;
        self.current = parent;
        Some(parent)
    }
}

/// Structural equality of name, nullability and generic arguments.
pub fn compare_types_strict(a: &BailaType, b: &BailaType) -> bool {
    a == b
}

/// Can a value of type `child` be stored where `parent` is expected?
///
/// Equal types match. `Object` accepts everything. A nullable target also
/// accepts its non-null form. Otherwise `child`'s class must have `parent`
/// among its ancestors. Generic arguments never vary, but runtime types
/// carry none, so an unparameterized `child` is not held to them.
pub fn compare_types_covariant(
    child: &BailaType,
    parent: &BailaType,
    classes: &dyn Ancestry,
) -> bool {
    if compare_types_strict(child, parent) {
        return true;
    }
    if child.nullable && !parent.nullable {
        return false;
    }
    if parent.name == BailaType::OBJECT && parent.generics.is_empty() {
        return true;
    }
    if !child.generics.is_empty() && child.generics != parent.generics {
        return false;
    }
    classes.is_subclass(&child.name, &parent.name)
}

/// [`compare_types_covariant`] with the arguments the other way round.
pub fn compare_types_contravariant(
    parent: &BailaType,
    child: &BailaType,
    classes: &dyn Ancestry,
) -> bool {
    compare_types_covariant(child, parent, classes)
}

/// The null reference fits nullable slots and any class-typed slot.
pub fn accepts_null(target: &BailaType) -> bool {
    target.nullable || !target.is_primitive()
}

/// Can a value whose runtime type is `value` be stored in a `target` slot?
/// Only the null reference has a nullable runtime type.
pub fn is_assignable(value: &BailaType, target: &BailaType, classes: &dyn Ancestry) -> bool {
    if value.nullable {
        accepts_null(target)
    } else {
        compare_types_covariant(value, target, classes)
    }
}
