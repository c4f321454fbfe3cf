//! Built-in classes and functions of the global scope

use super::env::{Binding, EnvRef};
use super::error::InterpResult;
use super::function::{FunctionOverload, FunctionValue, NativeFn};
use super::heap::{ClassMember, Handle, Heap, TypeContainer};
use super::value::Value;
use super::Interpreter;
use crate::ast::{Accessibility, BailaType, Param};
use std::rc::Rc;

/// Types `print` and `println` accept; objects cover lists and functions
/// too, since every type fits an `Object` slot.
const PRINTABLE: [&str; 4] = [
    BailaType::STRING,
    BailaType::NUMBER,
    BailaType::BOOLEAN,
    BailaType::OBJECT,
];

/// Populate `global` with the `Object`, `Type` and `String` classes and
/// the `print` and `println` functions. Returns the handles of `Object`
/// and `Type`.
pub(super) fn install(global: &EnvRef, heap: &mut Heap) -> (Handle, Handle) {
    let object_class = heap.alloc(builtin_class(BailaType::OBJECT, None));
    let type_class = heap.alloc(builtin_class(BailaType::TYPE, Some(object_class)));
    let string_class = heap.alloc(string_class(object_class));

    let mut scope = global.borrow_mut();
    for (name, handle) in [
        (BailaType::OBJECT, object_class),
        (BailaType::TYPE, type_class),
        (BailaType::STRING, string_class),
    ] {
        scope.define(
            name,
            Binding {
                ty: BailaType::named(BailaType::TYPE),
                value: Value::Object(Some(handle)),
                immutable: true,
            },
        );
    }
    scope.define("print", function_binding(printer("print", print)));
    scope.define("println", function_binding(printer("println", println)));

    tracing::debug!(object_class, type_class, "installed builtins");
    (object_class, type_class)
}

fn builtin_class(name: &str, parent: Option<Handle>) -> TypeContainer {
    let mut class = TypeContainer::class(name, parent);
    class
        .constructors
        .overloads
        .push(Rc::new(FunctionOverload::native(Vec::new(), None, |_, _| Ok(None))));
    class
}

/// `String` with a readonly `empty` field and a static `hello`
fn string_class(object_class: Handle) -> TypeContainer {
    let mut class = builtin_class(BailaType::STRING, Some(object_class));
    let text = |readonly: bool, value: &str| ClassMember::Field {
        access: Accessibility::Public,
        readonly,
        ty: BailaType::string(),
        value: Value::string(value),
        owner: BailaType::STRING.to_string(),
    };
    class.members.insert("empty".to_string(), text(true, ""));
    class.statics.insert("hello".to_string(), text(false, "Hello"));
    class
}

/// One `text` overload per printable type, all running `f`
fn printer(name: &str, f: NativeFn) -> FunctionValue {
    PRINTABLE
        .iter()
        .fold(FunctionValue::new(name), |function, ty| {
            let param = Param {
                name: "text".to_string(),
                ty: BailaType::named(*ty),
                default: None,
            };
            function.with_overload(FunctionOverload::native(vec![param], None, f))
        })
}

fn function_binding(function: FunctionValue) -> Binding {
    Binding {
        ty: BailaType::function(),
        value: Value::Function(Rc::new(function)),
        immutable: false,
    }
}

fn print(interp: &mut Interpreter, args: &[Value]) -> InterpResult<Option<Value>> {
    let text = match args.first() {
        Some(value) => interp.stringify(value)?,
        None => String::new(),
    };
    interp.write_output(&text)?;
    Ok(None)
}

fn println(interp: &mut Interpreter, args: &[Value]) -> InterpResult<Option<Value>> {
    let mut text = match args.first() {
        Some(value) => interp.stringify(value)?,
        None => String::new(),
    };
    text.push('\n');
    interp.write_output(&text)?;
    Ok(None)
}
