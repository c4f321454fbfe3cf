//! Tree-walking interpreter
//!
//! Statements run against a chain of scopes. Classes and their instances
//! live on a handle-addressed heap; everything else is a plain [`Value`].

mod builtins;
pub mod env;
pub mod error;
mod eval;
pub mod function;
pub mod heap;
mod object;
mod ops;
pub mod value;

pub use env::{Binding, EnvRef, Environment, child_env};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::Flow;
pub use function::{Callable, FunctionOverload, FunctionValue, NativeFn, parse_param};
pub use heap::{Handle, Heap};
pub use value::{Value, format_number};

use crate::ast::BailaType;
use crate::types::{ClassRegistry, Lineage, is_assignable};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Calls nested deeper than this fail with a stack overflow error
    pub max_call_depth: usize,
    /// Emit a trace event for every call
    pub trace_calls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_call_depth: 10_000,
            trace_calls: false,
        }
    }
}

/// The interpreter
pub struct Interpreter {
    /// Global environment
    global_env: EnvRef,
    heap: Heap,
    classes: ClassRegistry,
    config: Config,
    /// Current call nesting
    call_depth: usize,
    /// Owner class of each running function, innermost last. `None` for
    /// code that belongs to no class.
    class_context: Vec<Option<String>>,
    object_class: Handle,
    type_class: Handle,
    /// Sink for `print` and `println`
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let global_env = Environment::new().into_ref();
        let mut heap = Heap::new();
        let (object_class, type_class) = builtins::install(&global_env, &mut heap);
        Interpreter {
            global_env,
            heap,
            classes: ClassRegistry::new(),
            config,
            call_depth: 0,
            class_context: Vec::new(),
            object_class,
            type_class,
            out: Box::new(io::stdout()),
        }
    }

    /// Redirect program output
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn global_env(&self) -> &EnvRef {
        &self.global_env
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Runtime type of a value
    pub fn type_of(&self, value: &Value) -> InterpResult<BailaType> {
        match (value.primitive_type(), value) {
            (Some(ty), _) => Ok(ty),
            (None, Value::Object(Some(handle))) => Ok(self.heap.get(*handle)?.runtime_type()),
            (None, _) => Ok(BailaType::object()),
        }
    }

    /// Class view that knows the actual ancestors of every instance in
    /// `values`, whatever their class names mean in the registry now.
    pub(crate) fn lineage(&self, values: &[Value]) -> InterpResult<Lineage<'_>> {
        let mut lineage = Lineage::new(&self.classes);
        for value in values {
            if let Value::Object(Some(handle)) = value {
                if let Some(chain) = self.heap.class_chain(*handle)? {
                    lineage.push(chain);
                }
            }
        }
        Ok(lineage)
    }

    /// Whether `value`, whose runtime type is `value_ty`, may be stored in
    /// a slot of type `target`
    pub(crate) fn fits(
        &self,
        value: &Value,
        value_ty: &BailaType,
        target: &BailaType,
    ) -> InterpResult<bool> {
        let lineage = self.lineage(std::slice::from_ref(value))?;
        Ok(is_assignable(value_ty, target, &lineage))
    }

    /// Text form used by `print` and string interpolation
    pub fn stringify(&self, value: &Value) -> InterpResult<String> {
        self.stringify_nested(value, &mut Vec::new())
    }

    /// `open` holds the lists being rendered around `value`; meeting one of
    /// them again renders `[...]`.
    fn stringify_nested(
        &self,
        value: &Value,
        open: &mut Vec<*const RefCell<Vec<Value>>>,
    ) -> InterpResult<String> {
        Ok(match value {
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Function(function) if function.name.is_empty() => "[function]".to_string(),
            Value::Function(function) => format!("[function {}]", function.name),
            Value::List(items) if open.contains(&Rc::as_ptr(items)) => "[...]".to_string(),
            Value::List(items) => {
                open.push(Rc::as_ptr(items));
                let parts = items
                    .borrow()
                    .iter()
                    .map(|item| self.stringify_nested(item, open))
                    .collect::<InterpResult<Vec<_>>>();
                open.pop();
                format!("[ {} ]", parts?.join(", "))
            }
            Value::Object(None) => "null".to_string(),
            Value::Object(Some(handle)) => {
                let container = self.heap.get(*handle)?;
                if container.is_class() {
                    format!("[class {}]", container.name)
                } else {
                    format!("[object {}]", container.name)
                }
            }
        })
    }

    /// Value a declaration of type `ty` starts with when none is given.
    /// Class names are looked up in `env`.
    pub fn default_value(&self, ty: &BailaType, env: &EnvRef) -> InterpResult<Value> {
        if ty.nullable {
            return Ok(Value::null());
        }
        match ty.name.as_str() {
            BailaType::NUMBER => Ok(Value::Number(0.0)),
            BailaType::STRING => Ok(Value::string("")),
            BailaType::BOOLEAN => Ok(Value::Boolean(false)),
            BailaType::LIST => Ok(Value::list(Vec::new())),
            BailaType::FUNCTION => Ok(Value::Function(Rc::new(FunctionValue::default()))),
            name if env.borrow().contains(name) || self.classes.contains(name) => {
                Ok(Value::null())
            }
            name => Err(self.undefined(name, env)),
        }
    }

    /// Drop every heap container the program can no longer reach.
    /// Returns how many were dropped.
    pub fn collect_garbage(&mut self) -> usize {
        let roots = [self.object_class, self.type_class];
        self.heap.clean(&self.global_env, roots)
    }

    /// Register a native global function. Each parameter is written as a
    /// `name: Type` shorthand; a second registration under the same name
    /// adds an overload.
    pub fn define_native(
        &mut self,
        name: &str,
        params: &[&str],
        return_type: Option<BailaType>,
        f: NativeFn,
    ) -> InterpResult<()> {
        let params = params
            .iter()
            .map(|shorthand| parse_param(shorthand))
            .collect::<InterpResult<Vec<_>>>()?;
        let overload = FunctionOverload::native(params, return_type, f);

        let existing = self.global_env.borrow().local(name).cloned();
        let mut function = match existing {
            None => FunctionValue::new(name),
            Some(Binding {
                value: Value::Function(function),
                ..
            }) => (*function).clone(),
            Some(binding) => {
                return Err(RuntimeError::runtime(format!(
                    "Cannot overload variable '{name}' of type '{}'",
                    binding.ty
                )));
            }
        };
        function.add_overload(overload)?;
        self.global_env.borrow_mut().define(
            name,
            Binding {
                ty: BailaType::function(),
                value: Value::Function(Rc::new(function)),
                immutable: false,
            },
        );
        Ok(())
    }

    /// Write program output
    pub(crate) fn write_output(&mut self, text: &str) -> InterpResult<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| RuntimeError::runtime(format!("Cannot write output: {e}")))
    }

    /// ReferenceError for `name`, with a close visible name as hint
    pub(crate) fn undefined(&self, name: &str, env: &EnvRef) -> RuntimeError {
        let names = env.borrow().visible_names();
        let candidates: Vec<&str> = names.iter().map(String::as_str).collect();
        let suggestion = crate::util::find_similar_name(name, &candidates, name.len().div_ceil(3));
        RuntimeError::not_defined(name, suggestion)
    }
}
