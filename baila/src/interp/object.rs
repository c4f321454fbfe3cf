//! Class definition, construction and member access

use super::env::EnvRef;
use super::error::{InterpResult, RuntimeError};
use super::function::{Callable, FunctionOverload, FunctionValue};
use super::heap::{ClassMember, Handle, TypeContainer};
use super::value::Value;
use super::{Binding, Flow, Interpreter, child_env};
use crate::ast::{
    Accessibility, BailaType, BinOp, ClassDecl, Expr, FunctionDecl, MemberDecl, MemberKind,
    OperatorDecl, UnOp,
};
use crate::types::Ancestry;
use std::collections::HashSet;
use std::rc::Rc;

/// Where a located member lives
#[derive(Debug, Clone, Copy)]
struct MemberSlot {
    handle: Handle,
    is_static: bool,
}

/// Names a class body has declared so far. Inherited members may be
/// replaced once; a second declaration in the same body is an error,
/// except for methods and operators which gain overloads.
#[derive(Default)]
struct Declared {
    members: HashSet<String>,
    statics: HashSet<String>,
    binary_ops: HashSet<BinOp>,
    unary_ops: HashSet<UnOp>,
}

impl Interpreter {
    pub(crate) fn define_class(&mut self, decl: &ClassDecl, env: &EnvRef) -> InterpResult<()> {
        if env.borrow().local(&decl.name).is_some() {
            return Err(RuntimeError::runtime(format!(
                "Constant '{}' is already defined",
                decl.name
            )));
        }

        let mut parent: Option<Handle> = None;
        for base in &decl.bases {
            let value = env
                .borrow()
                .get(&base.name)
                .ok_or_else(|| self.undefined(&base.name, env))?;
            let handle = match value {
                Value::Object(Some(handle)) if self.heap.get(handle)?.is_class() => handle,
                _ => {
                    return Err(RuntimeError::type_error(format!(
                        "Type '{}' is not a class",
                        base.name
                    )));
                }
            };
            if let Some(existing) = parent {
                return Err(RuntimeError::runtime(format!(
                    "Multiple inheritance is not allowed: '{}' already extends '{}'",
                    decl.name,
                    self.heap.get(existing)?.name
                )));
            }
            parent = Some(handle);
        }
        let parent = parent.unwrap_or(self.object_class);

        let mut class = TypeContainer::class(decl.name.clone(), Some(parent));
        let parent_name = {
            let base = self.heap.get(parent)?;
            class.members = base.members.clone();
            class.binary_ops = base.binary_ops.clone();
            class.unary_ops = base.unary_ops.clone();
            base.name.clone()
        };
        self.classes.define(decl.name.clone(), Some(parent_name.clone()));

        let populated = self.with_class_context(Some(decl.name.as_str()), |interp| {
            let mut declared = Declared::default();
            decl.members
                .iter()
                .try_for_each(|member| interp.add_member(&mut class, member, &mut declared, env))
        });
        populated?;

        if class.constructors.overloads.is_empty() {
            class.constructors.overloads.push(Rc::new(FunctionOverload::native(
                Vec::new(),
                None,
                |_, _| Ok(None),
            )));
        }

        let handle = self.heap.alloc(class);
        tracing::debug!(class = %decl.name, parent = %parent_name, handle, "defined class");
        env.borrow_mut().add_constant(
            &decl.name,
            BailaType::named(BailaType::TYPE),
            Value::Object(Some(handle)),
        )
    }

    fn add_member(
        &mut self,
        class: &mut TypeContainer,
        member: &MemberDecl,
        declared: &mut Declared,
        env: &EnvRef,
    ) -> InterpResult<()> {
        let owner = class.name.clone();
        match &member.kind {
            MemberKind::Field {
                name,
                readonly,
                ty,
                value,
            } => {
                let (ty, value) = self.initial_member_value(name, ty.as_ref(), value.as_ref(), env)?;
                let slot = ClassMember::Field {
                    access: member.access,
                    readonly: *readonly,
                    ty,
                    value,
                    owner,
                };
                insert_member(class, declared, member.is_static, name, slot)
            }

            MemberKind::Property {
                name,
                ty,
                getter,
                setter,
                value,
            } => {
                let (ty, value) = self.initial_member_value(name, ty.as_ref(), value.as_ref(), env)?;
                let accessor = |decl: &Option<Rc<FunctionDecl>>| {
                    decl.as_ref()
                        .map(|decl| Rc::new(self.script_overload(decl, env)))
                };
                let slot = ClassMember::Property {
                    access: member.access,
                    ty,
                    getter: accessor(getter),
                    setter: accessor(setter),
                    value,
                    owner,
                };
                insert_member(class, declared, member.is_static, name, slot)
            }

            MemberKind::Method(decl) => {
                let overload = self.script_overload(decl, env);
                let (members, seen) = if member.is_static {
                    (&mut class.statics, &mut declared.statics)
                } else {
                    (&mut class.members, &mut declared.members)
                };
                let mut function = match members.get(&decl.name) {
                    Some(ClassMember::Field {
                        value: Value::Function(function),
                        ..
                    }) if seen.contains(&decl.name) => (**function).clone(),
                    Some(_) if seen.contains(&decl.name) => {
                        return Err(duplicate_member(&owner, &decl.name));
                    }
                    _ => FunctionValue::new(decl.name.clone()),
                };
                function.add_overload(overload)?;
                seen.insert(decl.name.clone());
                members.insert(
                    decl.name.clone(),
                    ClassMember::Field {
                        access: member.access,
                        readonly: true,
                        ty: BailaType::function(),
                        value: Value::Function(Rc::new(function)),
                        owner,
                    },
                );
                Ok(())
            }

            MemberKind::Constructor(decl) => {
                let overload = self.script_overload(decl, env);
                class.constructors.add_overload(overload)
            }

            MemberKind::Operator(OperatorDecl::Binary { op, decl }) => {
                let overload = self.script_overload(decl, env);
                let table = &mut class.binary_ops;
                if declared.binary_ops.insert(*op) {
                    table.insert(*op, FunctionValue::new(decl.name.clone()));
                }
                match table.get_mut(op) {
                    Some(function) => function.add_overload(overload),
                    None => Ok(()),
                }
            }

            MemberKind::Operator(OperatorDecl::Unary { op, decl }) => {
                let overload = self.script_overload(decl, env);
                let table = &mut class.unary_ops;
                if declared.unary_ops.insert(*op) {
                    table.insert(*op, FunctionValue::new(decl.name.clone()));
                }
                match table.get_mut(op) {
                    Some(function) => function.add_overload(overload),
                    None => Ok(()),
                }
            }
        }
    }

    /// Type and starting value of a field or property
    fn initial_member_value(
        &mut self,
        name: &str,
        ty: Option<&BailaType>,
        value: Option<&Expr>,
        env: &EnvRef,
    ) -> InterpResult<(BailaType, Value)> {
        match (ty, value) {
            (None, None) => Ok((BailaType::null(), Value::null())),
            (Some(ty), None) => Ok((ty.clone(), self.default_value(ty, env)?)),
            (None, Some(expr)) => {
                let value = self.eval(expr, env)?;
                Ok((self.type_of(&value)?, value))
            }
            (Some(ty), Some(expr)) => {
                let value = self.eval(expr, env)?;
                let value_ty = self.type_of(&value)?;
                if !self.fits(&value, &value_ty, ty)? {
                    return Err(RuntimeError::type_error(format!(
                        "'{value_ty}' type cannot be stored inside of field '{name}' with type '{ty}'"
                    )));
                }
                Ok((ty.clone(), value))
            }
        }
    }

    /// Allocate an instance of `class` and run the constructor matching
    /// `args` on it.
    pub(crate) fn construct(&mut self, class: Handle, args: Vec<Value>) -> InterpResult<Value> {
        let arg_types = args
            .iter()
            .map(|arg| self.type_of(arg))
            .collect::<InterpResult<Vec<_>>>()?;
        let (overload, instance) = {
            let container = self.heap.get(class)?;
            let overload = container
                .constructors
                .resolve(&arg_types, &self.lineage(&args)?)?;
            (overload, TypeContainer::instance_of(class, container))
        };
        let name = instance.name.clone();
        let this = Value::Object(Some(self.heap.alloc(instance)));
        self.invoke(&name, &overload, args, Some(this.clone()))?;
        Ok(this)
    }

    /// Read `object.name`
    pub(crate) fn member_get(&mut self, object: &Value, name: &str) -> InterpResult<Value> {
        let handle = self.object_handle(object, name)?;
        let (slot, member) = self.locate_member(handle, name)?;
        self.check_access(&member, name)?;
        match member {
            ClassMember::Field { value, .. } => Ok(value),
            ClassMember::Property {
                getter: None,
                value,
                ..
            } => Ok(value),
            ClassMember::Property {
                getter: Some(getter),
                ty,
                value,
                ..
            } => {
                let (result, field) = self.run_accessor(&getter, object, &ty, value, None)?;
                *self.slot_mut(slot, name)?.value_mut() = field.clone();
                Ok(result.unwrap_or(field))
            }
        }
    }

    /// Write `object.name = value`
    pub(crate) fn member_set(
        &mut self,
        object: &Value,
        name: &str,
        value: Value,
    ) -> InterpResult<Value> {
        let handle = self.object_handle(object, name)?;
        let (slot, member) = self.locate_member(handle, name)?;
        self.check_access(&member, name)?;
        let type_name = self.heap.get(handle)?.name.clone();

        if let ClassMember::Field { readonly: true, .. } = &member {
            return Err(RuntimeError::field_is_constant(&type_name, name));
        }
        let value_ty = self.type_of(&value)?;
        if !self.fits(&value, &value_ty, member.ty())? {
            return Err(RuntimeError::type_error(format!(
                "'{value_ty}' type cannot be stored inside of field '{name}' with type '{}'",
                member.ty()
            )));
        }

        let stored = match member {
            ClassMember::Property { setter: None, .. } => {
                return Err(RuntimeError::type_error(format!(
                    "Property '{type_name}.{name}' is read-only"
                )));
            }
            ClassMember::Property {
                setter: Some(setter),
                ty,
                value: cached,
                ..
            } => {
                let (_, field) =
                    self.run_accessor(&setter, object, &ty, cached, Some(value.clone()))?;
                field
            }
            ClassMember::Field { .. } => value.clone(),
        };
        *self.slot_mut(slot, name)?.value_mut() = stored;
        Ok(value)
    }

    fn object_handle(&self, object: &Value, name: &str) -> InterpResult<Handle> {
        match object {
            Value::Object(Some(handle)) => Ok(*handle),
            Value::Object(None) => Err(RuntimeError::null_reference(name)),
            other => Err(RuntimeError::field_is_undefined(name, &self.type_of(other)?.to_string())),
        }
    }

    /// Instance members first, then statics up the class chain
    fn locate_member(&self, handle: Handle, name: &str) -> InterpResult<(MemberSlot, ClassMember)> {
        let container = self.heap.get(handle)?;
        if !container.is_class() {
            if let Some(member) = container.members.get(name) {
                let slot = MemberSlot {
                    handle,
                    is_static: false,
                };
                return Ok((slot, member.clone()));
            }
        }
        let class = container.class_handle(handle);
        let owner = self
            .heap
            .find_static(class, name)?
            .ok_or_else(|| RuntimeError::field_is_undefined(name, &container.name))?;
        let member = self
            .heap
            .get(owner)?
            .statics
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::field_is_undefined(name, &container.name))?;
        let slot = MemberSlot {
            handle: owner,
            is_static: true,
        };
        Ok((slot, member))
    }

    fn slot_mut(&mut self, slot: MemberSlot, name: &str) -> InterpResult<&mut ClassMember> {
        let container = self.heap.get_mut(slot.handle)?;
        let type_name = container.name.clone();
        let members = if slot.is_static {
            &mut container.statics
        } else {
            &mut container.members
        };
        members
            .get_mut(name)
            .ok_or_else(|| RuntimeError::field_is_undefined(name, &type_name))
    }

    /// Public members are open to everyone, private ones to code of the
    /// declaring class, protected ones to code of subclasses too.
    fn check_access(&self, member: &ClassMember, name: &str) -> InterpResult<()> {
        let owner = member.owner();
        let context = self.class_context.last().and_then(Option::as_deref);
        let allowed = match member.access() {
            Accessibility::Public => true,
            Accessibility::Private => context.is_some_and(|class| class == owner),
            Accessibility::Protected => {
                context.is_some_and(|class| self.classes.is_subclass(class, owner))
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(RuntimeError::type_error(format!(
                "'{owner}.{name}' is {} and cannot be accessed here",
                member.access()
            )))
        }
    }

    /// Run a getter or setter body. `field` holds the cached value and
    /// `value` the incoming one for setters. Returns what the body produced
    /// and the cached value it left behind.
    fn run_accessor(
        &mut self,
        accessor: &FunctionOverload,
        this: &Value,
        ty: &BailaType,
        field: Value,
        value: Option<Value>,
    ) -> InterpResult<(Option<Value>, Value)> {
        let Callable::Script { body, env } = &accessor.callable else {
            let args: Vec<Value> = value.into_iter().collect();
            let result = self.invoke("accessor", accessor, args, Some(this.clone()))?;
            return Ok((Some(result), field));
        };
        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth));
        }

        let scope = child_env(env);
        {
            let mut scope = scope.borrow_mut();
            scope.define(
                "this",
                Binding {
                    ty: self.type_of(this)?,
                    value: this.clone(),
                    immutable: true,
                },
            );
            scope.define(
                "field",
                Binding {
                    ty: ty.clone(),
                    value: field.clone(),
                    immutable: false,
                },
            );
            if let Some(value) = value {
                scope.define(
                    "value",
                    Binding {
                        ty: ty.clone(),
                        value,
                        immutable: false,
                    },
                );
            }
        }

        self.call_depth += 1;
        let flow = self.with_class_context(accessor.owner.as_deref(), |interp| {
            interp.execute(body, &scope)
        });
        self.call_depth -= 1;
        let result = match flow? {
            Flow::Return(result) | Flow::Normal(result) => result,
        };
        let field = scope.borrow().local("field").map_or(field, |b| b.value.clone());
        Ok((result, field))
    }
}

fn insert_member(
    class: &mut TypeContainer,
    declared: &mut Declared,
    is_static: bool,
    name: &str,
    member: ClassMember,
) -> InterpResult<()> {
    let (members, seen) = if is_static {
        (&mut class.statics, &mut declared.statics)
    } else {
        (&mut class.members, &mut declared.members)
    };
    if !seen.insert(name.to_string()) {
        return Err(duplicate_member(&class.name, name));
    }
    members.insert(name.to_string(), member);
    Ok(())
}

fn duplicate_member(class: &str, name: &str) -> RuntimeError {
    RuntimeError::runtime(format!("Member '{name}' is already defined in class '{class}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn run(source: &str) -> InterpResult<Option<Value>> {
        let tokens = tokenize(source, "test.baila").expect("lex");
        let program = parse(tokens).expect("parse");
        Interpreter::new().run(&program)
    }

    fn number(source: &str) -> f64 {
        match run(source) {
            Ok(Some(Value::Number(n))) => n,
            other => panic!("Expected number from {source:?}, got {other:?}"),
        }
    }

    fn error(source: &str) -> RuntimeError {
        run(source).expect_err(source)
    }

    const POINT: &str = "
        class Point {
            public var x: Number;
            public var y: Number;
            constructor(x: Number, y: Number) {
                this.x = x;
                this.y = y
            };
            public function sum() = this.x + this.y;
        };
    ";

    #[test]
    fn test_construct_and_read_fields() {
        assert_eq!(number(&format!("{POINT} var p = Point(3, 4); p.sum()")), 7.0);
        assert_eq!(number(&format!("{POINT} var p = Point(3, 4); p.x = 10; p.x")), 10.0);
    }

    #[test]
    fn test_instances_do_not_share_lists() {
        let source = "
            class Holder { public var items = [0] };
            var a = Holder(); var b = Holder();
            a.items[0] = 5;
            b.items[0]
        ";
        assert_eq!(number(source), 0.0);
    }

    #[test]
    fn test_default_constructor() {
        assert_eq!(number("class A { public var n = 3 }; A().n"), 3.0);
        let err = error("class A { }; A(1)");
        assert!(err.message.contains("Unable to find overload"));
    }

    #[test]
    fn test_private_by_default() {
        let err = error("class A { var secret = 1 }; A().secret");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(
            number("class A { var secret = 1; public function reveal() = this.secret }; A().reveal()"),
            1.0
        );
    }

    #[test]
    fn test_private_not_visible_to_free_function_called_from_method() {
        let source = "
            function peek(a: Object) = a.secret;
            class A { var secret = 42; public function leak() = peek(this) };
            A().leak()
        ";
        let err = error(source);
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "'A.secret' is private and cannot be accessed here");
    }

    #[test]
    fn test_function_defined_in_method_keeps_class_access() {
        let source = "
            class A {
                var secret = 7;
                public function reveal() {
                    function inner(a: A) = a.secret;
                    return inner(this)
                }
            };
            A().reveal()
        ";
        assert_eq!(number(source), 7.0);
    }

    #[test]
    fn test_protected_visible_to_subclass() {
        let source = "
            class Base { protected var level = 2 };
            class Derived : Base { public function read() = this.level * 10 };
            Derived().read()
        ";
        assert_eq!(number(source), 20.0);
        assert_eq!(
            error("class Base { protected var level = 2 }; Base().level").kind,
            ErrorKind::TypeError
        );
    }

    #[test]
    fn test_inherited_method_and_override() {
        let source = "
            class Animal { public function sound() = \"...\"; public function twice() = this.sound() + this.sound() };
            class Dog : Animal { public function sound() = \"woof\" };
            Dog().twice()
        ";
        match run(source) {
            Ok(Some(Value::String(s))) => assert_eq!(&*s, "woofwoof"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_constant_field() {
        let err = error("class A { public const k = 1 }; var a = A(); a.k = 2");
        assert_eq!(err.message, "Cannot reassign A.k: field is constant");
    }

    #[test]
    fn test_field_type_checked() {
        let err = error("class A { public var n: Number }; A().n = \"s\"");
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_unknown_member_and_null() {
        let err = error("class A { }; A().missing");
        assert_eq!(err.message, "Field 'missing' is undefined in type 'A'");
        let err = error("var a = null; a.x");
        assert_eq!(err.message, "Cannot access 'x' of null");
    }

    #[test]
    fn test_statics() {
        let source = "
            class Counter {
                public static var count = 0;
                public static function bump() { Counter.count = Counter.count + 1 };
            };
            Counter.bump(); Counter.bump();
            Counter.count
        ";
        assert_eq!(number(source), 2.0);
    }

    #[test]
    fn test_property_accessors() {
        let source = "
            class Temp {
                public prop celsius: Number {
                    get = field;
                    set { field = value * 2 }
                } = 1;
            };
            var t = Temp();
            t.celsius = 5;
            t.celsius
        ";
        assert_eq!(number(source), 10.0);
    }

    #[test]
    fn test_property_without_setter_is_read_only() {
        let source = "class A { public prop p: Number { get = 4 } }; var a = A(); a.p = 1";
        assert!(error(source).message.contains("read-only"));
        assert_eq!(number("class A { public prop p: Number { get = 4 } }; A().p"), 4.0);
    }

    #[test]
    fn test_multiple_inheritance_rejected() {
        let err = error("class A { }; class B { }; class C : A, B { }");
        assert!(err.message.starts_with("Multiple inheritance is not allowed"));
        let err = error("var n = 1; class C : n { }");
        assert_eq!(err.message, "Type 'n' is not a class");
    }

    #[test]
    fn test_subclass_fits_base_slot() {
        let source = "
            class A { };
            class B : A { };
            var a: A = B();
            var o: Object = a;
            1
        ";
        assert_eq!(number(source), 1.0);
        assert_eq!(
            error("class A { }; class B { }; var a: A = B()").kind,
            ErrorKind::TypeError
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = error("class A { var x = 1; var x = 2 }");
        assert_eq!(err.message, "Member 'x' is already defined in class 'A'");
    }
}
