//! Statement execution and expression evaluation

use super::env::{Binding, EnvRef, child_env, find_scope};
use super::error::{InterpResult, RuntimeError};
use super::function::{Callable, FunctionOverload, FunctionValue};
use super::value::Value;
use super::Interpreter;
use crate::ast::{BailaType, Expr, FunctionDecl, Literal, Program, Stmt, TemplatePart};
use std::cell::RefCell;
use std::rc::Rc;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// How a statement finished
#[derive(Debug, Clone)]
pub enum Flow {
    /// Ran to the end; carries the value of a trailing expression
    Normal(Option<Value>),
    /// A `return` is unwinding to the enclosing call
    Return(Option<Value>),
}

impl Interpreter {
    /// Run a program in the global scope. Yields the value of the last
    /// statement, or of a top-level `return`.
    pub fn run(&mut self, program: &Program) -> InterpResult<Option<Value>> {
        tracing::debug!(statements = program.statements.len(), "running program");
        let env = Rc::clone(&self.global_env);
        match self.execute_all(&program.statements, &env)? {
            Flow::Normal(value) | Flow::Return(value) => Ok(value),
        }
    }

    fn execute_all(&mut self, statements: &[Stmt], env: &EnvRef) -> InterpResult<Flow> {
        let mut last = None;
        for stmt in statements {
            match self.execute(stmt, env)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// Execute one statement
    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> InterpResult<Flow> {
        match stmt {
            Stmt::Expr(expr) => Ok(Flow::Normal(Some(self.eval(expr, env)?))),

            Stmt::Var { name, ty, value } => {
                self.declare_variable(name, ty.as_ref(), value.as_ref(), env)?;
                Ok(Flow::Normal(None))
            }

            Stmt::Const { name, value } => {
                let value = self.eval(value, env)?;
                let ty = self.type_of(&value)?;
                env.borrow_mut().add_constant(name, ty, value)?;
                Ok(Flow::Normal(None))
            }

            Stmt::Function(decl) => {
                self.define_function(decl, env)?;
                Ok(Flow::Normal(None))
            }

            Stmt::Class(decl) => {
                self.define_class(decl, env)?;
                Ok(Flow::Normal(None))
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.as_boolean() {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Flow::Normal(None))
                }
            }

            Stmt::For {
                var,
                start,
                end,
                step,
                body,
            } => self.execute_for(var, start, end, step.as_ref(), body, env),

            Stmt::While { cond, body } => {
                while self.eval(cond, env)?.as_boolean() {
                    if let flow @ Flow::Return(_) = self.execute(body, env)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(None))
            }

            Stmt::DoWhile { body, cond } => {
                loop {
                    if let flow @ Flow::Return(_) = self.execute(body, env)? {
                        return Ok(flow);
                    }
                    if !self.eval(cond, env)?.as_boolean() {
                        break;
                    }
                }
                Ok(Flow::Normal(None))
            }

            Stmt::Return(value) => {
                let value = value.as_ref().map(|e| self.eval(e, env)).transpose()?;
                Ok(Flow::Return(value))
            }

            Stmt::Block(statements) => {
                let scope = child_env(env);
                self.execute_all(statements, &scope)
            }
        }
    }

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Option<&BailaType>,
        value: Option<&Expr>,
        env: &EnvRef,
    ) -> InterpResult<()> {
        let (ty, value) = match (ty, value) {
            (None, None) => {
                return Err(RuntimeError::runtime(format!(
                    "Either type or value should be provided for the variable {name}"
                )));
            }
            (Some(ty), None) => (ty.clone(), self.default_value(ty, env)?),
            (None, Some(expr)) => {
                let value = self.eval(expr, env)?;
                (self.type_of(&value)?, value)
            }
            (Some(ty), Some(expr)) => {
                let value = self.eval(expr, env)?;
                let value_ty = self.type_of(&value)?;
                if !self.fits(&value, &value_ty, ty)? {
                    return Err(RuntimeError::type_error(format!(
                        "'{value_ty}' type cannot be stored inside of variable '{name}' with type '{ty}'"
                    )));
                }
                (ty.clone(), value)
            }
        };
        env.borrow_mut().add_variable(name, ty, value)
    }

    /// Bind a function, or add an overload to the one the current scope
    /// already holds under that name.
    fn define_function(&mut self, decl: &FunctionDecl, env: &EnvRef) -> InterpResult<()> {
        let overload = self.script_overload(decl, env);
        let existing = env.borrow().local(&decl.name).cloned();
        let mut function = match existing {
            None => FunctionValue::new(decl.name.clone()),
            Some(Binding {
                value: Value::Function(function),
                ..
            }) => (*function).clone(),
            Some(binding) => {
                return Err(RuntimeError::runtime(format!(
                    "Cannot overload variable '{}' of type '{}'",
                    decl.name, binding.ty
                )));
            }
        };
        function.add_overload(overload)?;
        let value = Value::Function(Rc::new(function));
        let mut scope = env.borrow_mut();
        if scope.local(&decl.name).is_some() {
            scope.set_variable(&decl.name, value, &BailaType::function(), &self.classes)
        } else {
            scope.add_variable(&decl.name, BailaType::function(), value)
        }
    }

    /// Overload running `decl` in a closure over `env`
    pub(crate) fn script_overload(&self, decl: &FunctionDecl, env: &EnvRef) -> FunctionOverload {
        FunctionOverload {
            params: decl.params.clone(),
            return_type: decl.return_type.clone(),
            callable: Callable::Script {
                body: Rc::clone(&decl.body),
                env: Rc::clone(env),
            },
            owner: self.class_context.last().cloned().flatten(),
        }
    }

    /// `for var = start to end [step n]`. The bounds are evaluated once;
    /// the loop counts up when `start < end` and down otherwise.
    fn execute_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Stmt,
        env: &EnvRef,
    ) -> InterpResult<Flow> {
        let scope = child_env(env);
        let start = self.eval(start, &scope)?.as_number()?;
        let end = self.eval(end, &scope)?.as_number()?;
        let step = match step {
            Some(step) => self.eval(step, &scope)?.as_number()?.abs(),
            None => 1.0,
        };
        if step == 0.0 || step.is_nan() {
            return Err(RuntimeError::runtime("For loop step must be a non-zero number"));
        }
        let ascending = start < end;
        let delta = if ascending { step } else { -step };

        scope
            .borrow_mut()
            .add_variable(var, BailaType::number(), Value::Number(start))?;
        let counter = |scope: &EnvRef| -> InterpResult<f64> {
            let value = scope.borrow().get(var).unwrap_or_else(Value::null);
            value.as_number()
        };

        loop {
            let current = counter(&scope)?;
            let in_range = if ascending {
                current <= end
            } else {
                current >= end
            };
            if !in_range {
                break;
            }
            if let flow @ Flow::Return(_) = self.execute(body, &scope)? {
                return Ok(flow);
            }
            let next = counter(&scope)? + delta;
            scope.borrow_mut().set_variable(
                var,
                Value::Number(next),
                &BailaType::number(),
                &self.classes,
            )?;
        }
        Ok(Flow::Normal(None))
    }

    /// Evaluate an expression
    pub fn eval(&mut self, expr: &Expr, env: &EnvRef) -> InterpResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::string(s.as_str()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Null => Value::null(),
            }),

            Expr::Template(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(s) => text.push_str(s),
                        TemplatePart::Expr(expr) => {
                            let value = self.eval(expr, env)?;
                            text.push_str(&self.stringify(&value)?);
                        }
                    }
                }
                Ok(Value::string(text))
            }

            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<InterpResult<Vec<_>>>()?;
                Ok(Value::list(items))
            }

            Expr::Var(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| self.undefined(name, env)),

            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.binary_op(*op, left, right)
            }

            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                self.unary_op(*op, operand)
            }

            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                let scope = find_scope(env, name).ok_or_else(|| self.undefined(name, env))?;
                let value_ty = self.type_of(&value)?;
                let lineage = self.lineage(std::slice::from_ref(&value))?;
                scope
                    .borrow_mut()
                    .set_variable(name, value.clone(), &value_ty, &lineage)?;
                Ok(value)
            }

            Expr::Call { callee, args } => {
                let (callee, receiver) = match callee.as_ref() {
                    Expr::Member { object, name } => {
                        let object = self.eval(object, env)?;
                        (self.member_get(&object, name)?, Some(object))
                    }
                    other => (self.eval(other, env)?, None),
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<InterpResult<Vec<_>>>()?;
                self.call_value(callee, receiver, args)
            }

            Expr::Index { target, index } => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?;
                let (items, i) = self.list_slot(&target, &index)?;
                let item = items.borrow()[i].clone();
                Ok(item)
            }

            Expr::IndexSet {
                target,
                index,
                value,
            } => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?;
                let value = self.eval(value, env)?;
                let (items, i) = self.list_slot(&target, &index)?;
                items.borrow_mut()[i] = value.clone();
                Ok(value)
            }

            Expr::Member { object, name } => {
                let object = self.eval(object, env)?;
                self.member_get(&object, name)
            }

            Expr::MemberSet {
                object,
                name,
                value,
            } => {
                let object = self.eval(object, env)?;
                let value = self.eval(value, env)?;
                self.member_set(&object, name, value)
            }
        }
    }

    /// Shared list storage and checked position for an indexer access
    fn list_slot(
        &self,
        target: &Value,
        index: &Value,
    ) -> InterpResult<(Rc<RefCell<Vec<Value>>>, usize)> {
        let Value::List(items) = target else {
            return Err(RuntimeError::type_error(format!(
                "Cannot access indexer of type '{}'",
                self.type_of(target)?
            )));
        };
        let position = index.as_number()?;
        let len = items.borrow().len();
        if position < 0.0 || position.fract() != 0.0 || position >= len as f64 {
            return Err(RuntimeError::index_out_of_bounds(position, len));
        }
        Ok((Rc::clone(items), position as usize))
    }

    /// Call a value: functions run an overload, class objects construct an
    /// instance. `receiver` is the object a member callee was read from.
    fn call_value(
        &mut self,
        callee: Value,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> InterpResult<Value> {
        match &callee {
            Value::Function(function) => {
                let this = match receiver {
                    Some(Value::Object(Some(handle))) if !self.heap.get(handle)?.is_class() => {
                        Some(Value::Object(Some(handle)))
                    }
                    _ => None,
                };
                self.call_function(function, args, this)
            }
            Value::Object(Some(handle)) if self.heap.get(*handle)?.is_class() => {
                self.construct(*handle, args)
            }
            other => Err(RuntimeError::not_callable(&self.stringify(other)?)),
        }
    }

    /// Resolve the overload matching `args` and run it
    pub fn call_function(
        &mut self,
        function: &FunctionValue,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> InterpResult<Value> {
        let arg_types = args
            .iter()
            .map(|arg| self.type_of(arg))
            .collect::<InterpResult<Vec<_>>>()?;
        let overload = function.resolve(&arg_types, &self.lineage(&args)?)?;
        self.invoke(&function.name, &overload, args, this)
    }

    /// Run one overload, with depth accounting
    pub(crate) fn invoke(
        &mut self,
        name: &str,
        overload: &FunctionOverload,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> InterpResult<Value> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth));
        }
        self.call_depth += 1;
        if self.config.trace_calls {
            tracing::trace!(function = name, depth = self.call_depth, args = args.len(), "call");
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke_inner(name, overload, args, this)
        });
        self.call_depth -= 1;
        result
    }

    fn invoke_inner(
        &mut self,
        name: &str,
        overload: &FunctionOverload,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> InterpResult<Value> {
        let (produced, env) = match &overload.callable {
            Callable::Native(f) => (f(self, &args)?, Rc::clone(&self.global_env)),
            Callable::Script { body, env } => {
                let call_env = child_env(env);
                if let Some(this) = this {
                    let ty = self.type_of(&this)?;
                    call_env.borrow_mut().define(
                        "this",
                        Binding {
                            ty,
                            value: this,
                            immutable: true,
                        },
                    );
                }
                let mut args = args.into_iter();
                for param in &overload.params {
                    let value = match (args.next(), &param.default) {
                        (Some(value), _) => value,
                        (None, Some(default)) => {
                            let value = self.eval(default, &call_env)?;
                            let value_ty = self.type_of(&value)?;
                            if !self.fits(&value, &value_ty, &param.ty)? {
                                return Err(RuntimeError::type_error(format!(
                                    "Default value of type '{value_ty}' does not fit parameter '{}' of type '{}'",
                                    param.name, param.ty
                                )));
                            }
                            value
                        }
                        (None, None) => {
                            return Err(RuntimeError::runtime(format!(
                                "Missing argument for parameter '{}' of '{name}'",
                                param.name
                            )));
                        }
                    };
                    call_env.borrow_mut().define(
                        param.name.as_str(),
                        Binding {
                            ty: param.ty.clone(),
                            value,
                            immutable: false,
                        },
                    );
                }

                let flow = self.with_class_context(overload.owner.as_deref(), |interp| {
                    interp.execute(body, &call_env)
                });
                let produced = match flow? {
                    Flow::Return(value) => value,
                    Flow::Normal(value) => value.filter(|v| !v.is_null()),
                };
                (produced, Rc::clone(env))
            }
        };
        self.finish_call(name, overload, produced, &env)
    }

    /// Run `f` with `owner` as the innermost class context
    pub(crate) fn with_class_context<T>(
        &mut self,
        owner: Option<&str>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.class_context.push(owner.map(str::to_string));
        let result = f(self);
        self.class_context.pop();
        result
    }

    /// Check the produced value against the declared return type, or fill
    /// in that type's default when nothing was produced.
    fn finish_call(
        &self,
        name: &str,
        overload: &FunctionOverload,
        produced: Option<Value>,
        env: &EnvRef,
    ) -> InterpResult<Value> {
        match (&overload.return_type, produced) {
            (None, value) => Ok(value.unwrap_or_else(Value::null)),
            (Some(ty), None) => self.default_value(ty, env),
            (Some(ty), Some(value)) => {
                let value_ty = self.type_of(&value)?;
                if self.fits(&value, &value_ty, ty)? {
                    Ok(value)
                } else {
                    Err(RuntimeError::type_error(format!(
                        "Cannot convert returned value of type '{value_ty}' to the return type '{ty}' of '{name}'"
                    )))
                }
            }
        }
    }
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

    #[test]
    fn test_last_statement_is_result() {
        assert_eq!(number("1; 2; 3"), 3.0);
        assert!(matches!(run("var x = 1"), Ok(None)));
    }

    #[test]
    fn test_variables_and_assignment() {
        assert_eq!(number("var x = 1; x = x + 41; x"), 42.0);
        assert_eq!(number("var n: Number; n"), 0.0);
        assert_eq!(number("var x = 2; x **= 3; x"), 8.0);
    }

    #[test]
    fn test_var_needs_type_or_value() {
        let err = error("var z");
        assert_eq!(
            err.message,
            "Either type or value should be provided for the variable z"
        );
    }

    #[test]
    fn test_var_type_mismatch() {
        assert_eq!(error("var x: Number = \"s\"").kind, ErrorKind::TypeError);
        assert_eq!(error("var x = 1; x = \"s\"").kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_undefined_name() {
        let err = error("counter = 1");
        assert_eq!(err.kind, ErrorKind::ReferenceError);
        let err = error("var count = 1; cuont");
        assert_eq!(err.message, "'cuont' is not defined, did you mean 'count'?");
    }

    #[test]
    fn test_block_scope() {
        assert_eq!(number("var x = 1; { var x = \"inner\"; x = \"changed\" }; x"), 1.0);
        assert_eq!(number("var x = 1; { x = 5 }; x"), 5.0);
        assert_eq!(error("{ var y = 1 }; y").kind, ErrorKind::ReferenceError);
    }

    #[test]
    fn test_if_else() {
        assert_eq!(number("var r = 0; if (1 < 2) r = 1 else r = 2; r"), 1.0);
        assert_eq!(number("var r = 0; if (\"\") { r = 1 } else { r = 2 }; r"), 2.0);
    }

    #[test]
    fn test_for_counts_both_ways() {
        assert_eq!(number("var s = 0; for i = 1 to 4 { s = s + i }; s"), 10.0);
        assert_eq!(number("var n = 0; for i = 3 to 0 { n = n + 1 }; n"), 4.0);
        assert_eq!(number("var n = 0; for i = 0 to 10 step 5 { n = n + 1 }; n"), 3.0);
        assert_eq!(number("var n = 0; for i = 2 to 2 { n = n + 1 }; n"), 1.0);
    }

    #[test]
    fn test_for_rejects_zero_step() {
        assert!(error("for i = 0 to 3 step 0 { }").message.contains("non-zero"));
    }

    #[test]
    fn test_while_and_do_while() {
        assert_eq!(number("var i = 0; while (i < 5) i = i + 1; i"), 5.0);
        assert_eq!(number("var i = 10; do { i = i + 1 } while (i < 5); i"), 11.0);
    }

    #[test]
    fn test_function_results() {
        assert_eq!(number("function f(x: Number) = x * 2; f(21)"), 42.0);
        assert_eq!(number("function f() { 7 }; f()"), 7.0);
        assert_eq!(number("function f(): Number { }; f()"), 0.0);
        assert_eq!(
            number("function f(n: Number) { if (n > 0) return n; return -n }; f(-3)"),
            3.0
        );
        assert!(matches!(run("function f() { }; f()"), Ok(Some(Value::Object(None)))));
    }

    #[test]
    fn test_return_type_is_checked() {
        let err = error("function f(): Number = \"s\"; f()");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.starts_with("Cannot convert returned value"));
    }

    #[test]
    fn test_default_parameters() {
        assert_eq!(number("function f(a: Number, b: Number = 10) = a + b; f(1)"), 11.0);
        assert_eq!(number("function f(a: Number, b: Number = a * 2) = b; f(4)"), 8.0);
    }

    #[test]
    fn test_overloads_in_scope() {
        assert_eq!(
            number("function f() = 1; function f(x: Number) = 2; f() + f(0)"),
            3.0
        );
        let err = error("var f = 1; function f() = 2");
        assert_eq!(err.message, "Cannot overload variable 'f' of type 'Number'");
    }

    #[test]
    fn test_closures_capture_scope() {
        let source = "
            function counter() {
                var n = 0;
                function next() { n = n + 1; n };
                next
            };
            var c = counter();
            c(); c(); c()
        ";
        assert_eq!(number(source), 3.0);
    }

    #[test]
    fn test_recursion_and_depth_limit() {
        let fib = "function fib(n: Number): Number { if (n < 2) return n; return fib(n - 1) + fib(n - 2) }; fib(15)";
        assert_eq!(number(fib), 610.0);
        let err = error("function f(): Number = f(); f()");
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn test_index_access() {
        assert_eq!(number("[1, 2, 3][1]"), 2.0);
        assert_eq!(number("var xs = [1, 2]; var ys = xs; ys[0] = 9; xs[0]"), 9.0);
        assert_eq!(error("[1][1]").kind, ErrorKind::IndexOutOfBounds);
        assert_eq!(error("[1][-1]").kind, ErrorKind::IndexOutOfBounds);
        assert_eq!(error("5[0]").message, "Cannot access indexer of type 'Number'");
    }

    #[test]
    fn test_not_callable() {
        assert_eq!(error("var x = 3; x()").message, "Object 3 is not callable");
    }
}
