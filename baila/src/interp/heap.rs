//! Heap of type containers addressed by integer handles
//!
//! Handles come from a counter that only grows, so a handle is never
//! reissued even after `clean` drops its container.

use super::env::EnvRef;
use super::error::{InterpResult, RuntimeError};
use super::function::{Callable, FunctionOverload, FunctionValue};
use super::value::Value;
use crate::ast::{Accessibility, BailaType, BinOp, UnOp};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// Index of a container on the heap
pub type Handle = usize;

#[derive(Debug, Clone)]
pub enum ContainerKind {
    /// A class definition. Seen as a value, its type is `Type`.
    Class { parent: Option<Handle> },
    Instance { class: Handle },
}

/// Member slot of a class or instance
#[derive(Debug, Clone)]
pub enum ClassMember {
    /// Plain field; methods are readonly fields holding a function
    Field {
        access: Accessibility,
        readonly: bool,
        ty: BailaType,
        value: Value,
        owner: String,
    },
    /// Field with optional accessor bodies around a cached value
    Property {
        access: Accessibility,
        ty: BailaType,
        getter: Option<Rc<FunctionOverload>>,
        setter: Option<Rc<FunctionOverload>>,
        value: Value,
        owner: String,
    },
}

impl ClassMember {
    pub fn access(&self) -> Accessibility {
        match self {
            ClassMember::Field { access, .. } | ClassMember::Property { access, .. } => *access,
        }
    }

    /// Class that declared the member
    pub fn owner(&self) -> &str {
        match self {
            ClassMember::Field { owner, .. } | ClassMember::Property { owner, .. } => owner,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            ClassMember::Field { value, .. } | ClassMember::Property { value, .. } => value,
        }
    }

    /// Declared type every stored value must stay assignable to
    pub fn ty(&self) -> &BailaType {
        match self {
            ClassMember::Field { ty, .. } | ClassMember::Property { ty, .. } => ty,
        }
    }

    pub fn value_mut(&mut self) -> &mut Value {
        match self {
            ClassMember::Field { value, .. } | ClassMember::Property { value, .. } => value,
        }
    }

    fn fresh_copy(&self) -> ClassMember {
        let mut copy = self.clone();
        *copy.value_mut() = self.value().deep_clone();
        copy
    }
}

/// A class or an instance of one
#[derive(Debug, Clone)]
pub struct TypeContainer {
    pub name: String,
    pub kind: ContainerKind,
    /// Empty for instances
    pub constructors: FunctionValue,
    /// Instance members: templates on a class, live slots on an instance
    pub members: HashMap<String, ClassMember>,
    /// Only classes hold static members
    pub statics: HashMap<String, ClassMember>,
    pub binary_ops: HashMap<BinOp, FunctionValue>,
    pub unary_ops: HashMap<UnOp, FunctionValue>,
}

impl TypeContainer {
    pub fn class(name: impl Into<String>, parent: Option<Handle>) -> Self {
        let name = name.into();
        TypeContainer {
            constructors: FunctionValue::new(name.clone()),
            name,
            kind: ContainerKind::Class { parent },
            members: HashMap::new(),
            statics: HashMap::new(),
            binary_ops: HashMap::new(),
            unary_ops: HashMap::new(),
        }
    }

    /// A new instance whose fields are fresh copies of the class templates.
    pub fn instance_of(class_handle: Handle, class: &TypeContainer) -> Self {
        TypeContainer {
            name: class.name.clone(),
            kind: ContainerKind::Instance {
                class: class_handle,
            },
            constructors: FunctionValue::default(),
            members: class
                .members
                .iter()
                .map(|(name, member)| (name.clone(), member.fresh_copy()))
                .collect(),
            statics: HashMap::new(),
            binary_ops: HashMap::new(),
            unary_ops: HashMap::new(),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ContainerKind::Class { .. })
    }

    /// Type of a reference to this container
    pub fn runtime_type(&self) -> BailaType {
        match self.kind {
            ContainerKind::Class { .. } => BailaType::named(BailaType::TYPE),
            ContainerKind::Instance { .. } => BailaType::named(self.name.clone()),
        }
    }

    /// Class holding the operator tables and statics for this container
    pub fn class_handle(&self, own: Handle) -> Handle {
        match self.kind {
            ContainerKind::Class { .. } => own,
            ContainerKind::Instance { class } => class,
        }
    }

    fn trace(&self, tracer: &mut Tracer) {
        match self.kind {
            ContainerKind::Class {
                parent: Some(parent),
            } => tracer.handles.push(parent),
            ContainerKind::Class { parent: None } => {}
            ContainerKind::Instance { class } => tracer.handles.push(class),
        }
        tracer.function(&self.constructors);
        for member in self.members.values().chain(self.statics.values()) {
            tracer.value(member.value());
            if let ClassMember::Property { getter, setter, .. } = member {
                for accessor in getter.iter().chain(setter.iter()) {
                    tracer.callable(&accessor.callable);
                }
            }
        }
        for function in self.binary_ops.values().chain(self.unary_ops.values()) {
            tracer.function(function);
        }
    }
}

/// Collects handles reachable from values and scopes
#[derive(Default)]
struct Tracer {
    handles: Vec<Handle>,
    seen_envs: HashSet<usize>,
    seen_lists: HashSet<usize>,
}

impl Tracer {
    fn value(&mut self, value: &Value) {
        match value {
            Value::Object(Some(handle)) => self.handles.push(*handle),
            Value::List(items) => {
                if self.seen_lists.insert(Rc::as_ptr(items) as usize) {
                    for item in items.borrow().iter() {
                        self.value(item);
                    }
                }
            }
            Value::Function(function) => self.function(function),
            Value::Number(_) | Value::String(_) | Value::Boolean(_) | Value::Object(None) => {}
        }
    }

    fn function(&mut self, function: &FunctionValue) {
        for overload in &function.overloads {
            self.callable(&overload.callable);
        }
    }

    fn callable(&mut self, callable: &Callable) {
        if let Callable::Script { env, .. } = callable {
            self.env(env);
        }
    }

    fn env(&mut self, env: &EnvRef) {
        if !self.seen_envs.insert(Rc::as_ptr(env) as usize) {
            return;
        }
        let scope = env.borrow();
        for (_, binding) in scope.bindings() {
            self.value(&binding.value);
        }
        if let Some(parent) = scope.parent() {
            self.env(parent);
        }
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    containers: BTreeMap<Handle, TypeContainer>,
    next: Handle,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, container: TypeContainer) -> Handle {
        let handle = self.next;
        self.next += 1;
        tracing::trace!(handle, name = %container.name, "heap allocation");
        self.containers.insert(handle, container);
        handle
    }

    pub fn get(&self, handle: Handle) -> InterpResult<&TypeContainer> {
        self.containers
            .get(&handle)
            .ok_or_else(|| missing(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> InterpResult<&mut TypeContainer> {
        self.containers
            .get_mut(&handle)
            .ok_or_else(|| missing(handle))
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Class, starting at `class` and walking up the parents, that declares
    /// the static member `name`.
    pub fn find_static(&self, class: Handle, name: &str) -> InterpResult<Option<Handle>> {
        let mut current = Some(class);
        // Parent links only point at classes allocated earlier, so the walk
        // cannot loop.
        while let Some(handle) = current {
            let container = self.get(handle)?;
            if container.statics.contains_key(name) {
                return Ok(Some(handle));
            }
            current = match container.kind {
                ContainerKind::Class { parent } => parent,
                ContainerKind::Instance { .. } => None,
            };
        }
        Ok(None)
    }

    /// Names of an instance's class and of that class's ancestors, nearest
    /// first. `None` when `handle` is a class.
    pub fn class_chain(&self, handle: Handle) -> InterpResult<Option<Vec<String>>> {
        let ContainerKind::Instance { class } = self.get(handle)?.kind else {
            return Ok(None);
        };
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(handle) = current {
            let container = self.get(handle)?;
            chain.push(container.name.clone());
            current = match container.kind {
                ContainerKind::Class { parent } => parent,
                ContainerKind::Instance { .. } => None,
            };
        }
        Ok(Some(chain))
    }

    /// Mark everything reachable from `scope` and `extra_roots`, drop the
    /// rest. Returns the number of containers dropped.
    pub fn clean(&mut self, scope: &EnvRef, extra_roots: impl IntoIterator<Item = Handle>) -> usize {
        let mut tracer = Tracer::default();
        tracer.env(scope);
        tracer.handles.extend(extra_roots);

        let mut marked = HashSet::new();
        while let Some(handle) = tracer.handles.pop() {
            if !marked.insert(handle) {
                continue;
            }
            if let Some(container) = self.containers.get(&handle) {
                container.trace(&mut tracer);
            }
        }

        let before = self.containers.len();
        self.containers.retain(|handle, _| marked.contains(handle));
        let swept = before - self.containers.len();
        tracing::debug!(swept, live = self.containers.len(), "heap sweep");
        swept
    }
}

fn missing(handle: Handle) -> RuntimeError {
    RuntimeError::runtime(format!("Object by index {handle} is not on heap"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::env::Environment;

    fn field(value: Value) -> ClassMember {
        ClassMember::Field {
            access: Accessibility::Public,
            readonly: false,
            ty: BailaType::object(),
            value,
            owner: "Point".to_string(),
        }
    }

    #[test]
    fn test_handles_are_monotonic() {
        let mut heap = Heap::new();
        let a = heap.alloc(TypeContainer::class("A", None));
        let b = heap.alloc(TypeContainer::class("B", Some(a)));
        assert_eq!((a, b), (0, 1));
        assert_eq!(heap.get(b).map(|c| c.name.clone()), Ok("B".to_string()));
        assert!(heap.get(7).is_err());
    }

    #[test]
    fn test_instance_copies_templates() {
        let mut class = TypeContainer::class("Point", None);
        class
            .members
            .insert("xs".to_string(), field(Value::list(vec![])));
        let first = TypeContainer::instance_of(0, &class);
        if let Value::List(items) = first.members["xs"].value() {
            items.borrow_mut().push(Value::Number(1.0));
        }
        let second = TypeContainer::instance_of(0, &class);
        let Value::List(items) = second.members["xs"].value() else {
            panic!("Expected list");
        };
        assert!(items.borrow().is_empty());
        assert_eq!(second.runtime_type(), BailaType::named("Point"));
        assert_eq!(class.runtime_type(), BailaType::named("Type"));
    }

    #[test]
    fn test_find_static_walks_parents() {
        let mut heap = Heap::new();
        let mut base = TypeContainer::class("Base", None);
        base.statics
            .insert("count".to_string(), field(Value::Number(0.0)));
        let base = heap.alloc(base);
        let derived = heap.alloc(TypeContainer::class("Derived", Some(base)));
        assert_eq!(heap.find_static(derived, "count"), Ok(Some(base)));
        assert_eq!(heap.find_static(derived, "other"), Ok(None));
    }

    #[test]
    fn test_clean_keeps_reachable() {
        let mut heap = Heap::new();
        let class = heap.alloc(TypeContainer::class("A", None));
        let kept = {
            let container = TypeContainer::instance_of(class, heap.get(class).expect("class"));
            heap.alloc(container)
        };
        let dropped = {
            let container = TypeContainer::instance_of(class, heap.get(class).expect("class"));
            heap.alloc(container)
        };

        let scope = Environment::new().into_ref();
        scope
            .borrow_mut()
            .add_variable("a", BailaType::named("A"), Value::Object(Some(kept)))
            .expect("declare");

        assert_eq!(heap.clean(&scope, []), 1);
        assert!(heap.get(kept).is_ok());
        assert!(heap.get(class).is_ok(), "class is reachable from its instance");
        assert!(heap.get(dropped).is_err());

        let next = heap.alloc(TypeContainer::class("B", None));
        assert_eq!(next, 3, "handles are never reused");
    }
}
