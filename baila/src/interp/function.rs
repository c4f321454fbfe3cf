//! Functions, overload sets and overload resolution

use super::Interpreter;
use super::env::EnvRef;
use super::error::{InterpResult, RuntimeError};
use super::value::Value;
use crate::ast::{BailaType, Param, Stmt};
use crate::types::{Ancestry, compare_types_strict, is_assignable};
use std::fmt;
use std::rc::Rc;

/// Built-in function body. `None` means no value.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> InterpResult<Option<Value>>;

/// Code behind an overload
#[derive(Clone)]
pub enum Callable {
    Native(NativeFn),
    /// Script body closing over the scope it was defined in
    Script { body: Rc<Stmt>, env: EnvRef },
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "Native"),
            Callable::Script { body, .. } => f.debug_tuple("Script").field(body).finish(),
        }
    }
}

/// One signature of a function
#[derive(Debug, Clone)]
pub struct FunctionOverload {
    pub params: Vec<Param>,
    /// `None` leaves the returned value unchecked
    pub return_type: Option<BailaType>,
    pub callable: Callable,
    /// Class whose members this code may see regardless of accessibility
    pub owner: Option<String>,
}

impl FunctionOverload {
    pub fn native(params: Vec<Param>, return_type: Option<BailaType>, f: NativeFn) -> Self {
        FunctionOverload {
            params,
            return_type,
            callable: Callable::Native(f),
            owner: None,
        }
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_required()).count()
    }

    fn param_types(&self) -> impl Iterator<Item = &BailaType> {
        self.params.iter().map(|p| &p.ty)
    }

    fn required_types(&self) -> impl Iterator<Item = &BailaType> {
        self.params.iter().filter(|p| p.is_required()).map(|p| &p.ty)
    }

    fn accepts_count(&self, count: usize) -> bool {
        count >= self.required_count() && count <= self.params.len()
    }

    /// Same declared types for the given arguments, position by position.
    fn is_exact_match(&self, arg_types: &[BailaType]) -> bool {
        self.params.len() == arg_types.len()
            && self
                .param_types()
                .zip(arg_types)
                .all(|(param, arg)| compare_types_strict(param, arg))
    }

    fn is_compatible(&self, arg_types: &[BailaType], classes: &dyn Ancestry) -> bool {
        self.param_types()
            .zip(arg_types)
            .all(|(param, arg)| is_assignable(arg, param, classes))
    }
}

/// A name bearing an ordered list of overloads
#[derive(Debug, Clone, Default)]
pub struct FunctionValue {
    pub name: String,
    pub overloads: Vec<Rc<FunctionOverload>>,
}

impl FunctionValue {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionValue {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: FunctionOverload) -> Self {
        self.overloads.push(Rc::new(overload));
        self
    }

    /// Add a script-defined overload, rejecting duplicates and overloads
    /// that could never be told apart from an existing one.
    pub fn add_overload(&mut self, overload: FunctionOverload) -> InterpResult<()> {
        check_parameter_order(&self.name, &overload.params)?;

        let types: Vec<&BailaType> = overload.param_types().collect();
        if self
            .overloads
            .iter()
            .any(|existing| existing.param_types().eq(types.iter().copied()))
        {
            let signature = if types.is_empty() {
                "no parameters".to_string()
            } else {
                let list: Vec<String> = types.iter().map(|t| format!("'{t}'")).collect();
                format!("{} parameters of types {}", types.len(), list.join(", "))
            };
            return Err(RuntimeError::runtime(format!(
                "Overload of '{}' with {signature} already exists",
                self.name
            )));
        }

        let required: Vec<&BailaType> = overload.required_types().collect();
        if self
            .overloads
            .iter()
            .any(|existing| existing.required_types().eq(required.iter().copied()))
        {
            let list: Vec<String> = required.iter().map(ToString::to_string).collect();
            return Err(RuntimeError::runtime(format!(
                "Potentially ambiguous overload: {}({})",
                self.name,
                list.join(", ")
            )));
        }

        tracing::debug!(function = %self.name, params = overload.params.len(), "registered overload");
        self.overloads.push(Rc::new(overload));
        Ok(())
    }

    /// Overloads that accept the argument types. The first exact match
    /// ends the scan and is returned alone.
    pub fn candidates(
        &self,
        arg_types: &[BailaType],
        classes: &dyn Ancestry,
    ) -> Vec<Rc<FunctionOverload>> {
        let mut found = Vec::new();
        for overload in &self.overloads {
            if !overload.accepts_count(arg_types.len()) {
                continue;
            }
            if overload.is_exact_match(arg_types) {
                return vec![Rc::clone(overload)];
            }
            if overload.is_compatible(arg_types, classes) {
                found.push(Rc::clone(overload));
            }
        }
        found
    }

    /// The single overload a call with these argument types selects.
    pub fn resolve(
        &self,
        arg_types: &[BailaType],
        classes: &dyn Ancestry,
    ) -> InterpResult<Rc<FunctionOverload>> {
        let mut found = self.candidates(arg_types, classes);
        match found.len() {
            0 => Err(RuntimeError::unable_to_find_overload(&self.name, arg_types)),
            1 => Ok(found.remove(0)),
            n => {
                let list: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
                let of_types = if list.is_empty() {
                    String::new()
                } else {
                    format!(" of types {}", list.join(", "))
                };
                Err(RuntimeError::runtime(format!(
                    "Ambiguous overload matching: found {n} overloads of '{}' for {} argument(s){of_types}",
                    self.name,
                    arg_types.len()
                )))
            }
        }
    }
}

/// Required parameters must all come before the first defaulted one.
pub fn check_parameter_order(name: &str, params: &[Param]) -> InterpResult<()> {
    let mut seen_optional = false;
    for param in params {
        if param.is_required() && seen_optional {
            return Err(RuntimeError::runtime(format!(
                "Required parameter '{}' of '{name}' follows a parameter with a default value",
                param.name
            )));
        }
        seen_optional |= !param.is_required();
    }
    Ok(())
}

/// Parse a `name: Type` parameter shorthand, as used when registering
/// native functions.
pub fn parse_param(shorthand: &str) -> InterpResult<Param> {
    let malformed = || RuntimeError::runtime(format!("Malformed parameter shorthand '{shorthand}'"));
    let (name, ty) = shorthand.split_once(':').ok_or_else(malformed)?;
    let (name, ty) = (name.trim(), ty.trim());
    let is_ident = |s: &str| {
        s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && s.chars().all(|c| c.is_alphanumeric() || c == '_')
    };
    let (nullable, ty) = match ty.strip_prefix('?') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, ty),
    };
    if !is_ident(name) || !is_ident(ty) {
        return Err(malformed());
    }
    let ty = BailaType::named(ty);
    Ok(Param {
        name: name.to_string(),
        ty: if nullable { ty.into_nullable() } else { ty },
        default: None,
    })
}
