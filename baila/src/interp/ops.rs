//! Binary and unary operators
//!
//! Built-in meanings come first. When none applies, a class operator of
//! the left operand gets a chance before the operation fails.

use super::error::{InterpResult, RuntimeError};
use super::heap::Handle;
use super::value::Value;
use super::Interpreter;
use crate::ast::{BinOp, UnOp};

impl Interpreter {
    pub(crate) fn binary_op(&mut self, op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
        if matches!(op, BinOp::Eq | BinOp::Ne) {
            if let Some(result) = self.binary_overload(op, &left, &right)? {
                return Ok(result);
            }
            let equal = self.default_equals(&left, &right)?;
            return Ok(Value::Boolean(equal == (op == BinOp::Eq)));
        }
        if let Some(result) = builtin_binary(op, &left, &right, |v| self.stringify(v))? {
            return Ok(result);
        }
        if op.is_overloadable() {
            if let Some(result) = self.binary_overload(op, &left, &right)? {
                return Ok(result);
            }
        }
        Err(RuntimeError::type_error(format!(
            "Cannot {} '{}' and '{}'",
            verb(op),
            self.type_of(&left)?,
            self.type_of(&right)?
        )))
    }

    pub(crate) fn unary_op(&mut self, op: UnOp, operand: Value) -> InterpResult<Value> {
        if let Some(result) = self.unary_overload(op, &operand)? {
            return Ok(result);
        }
        Ok(match op {
            UnOp::Not => Value::Boolean(!operand.as_boolean()),
            UnOp::BitNot => Value::Number(f64::from(!(operand.as_number()? as i32))),
            UnOp::Plus => Value::Number(operand.as_number()?),
            UnOp::Neg => Value::Number(-operand.as_number()?),
        })
    }

    /// Same runtime type and same text form. Distinct objects that print
    /// alike are equal.
    fn default_equals(&self, left: &Value, right: &Value) -> InterpResult<bool> {
        Ok(self.type_of(left)? == self.type_of(right)?
            && self.stringify(left)? == self.stringify(right)?)
    }

    /// Class of an instance operand, if any
    fn operand_class(&self, value: &Value) -> InterpResult<Option<Handle>> {
        match value {
            Value::Object(Some(handle)) => {
                let container = self.heap.get(*handle)?;
                if container.is_class() {
                    Ok(None)
                } else {
                    Ok(Some(container.class_handle(*handle)))
                }
            }
            _ => Ok(None),
        }
    }

    fn binary_overload(
        &mut self,
        op: BinOp,
        left: &Value,
        right: &Value,
    ) -> InterpResult<Option<Value>> {
        let Some(class) = self.operand_class(left)? else {
            return Ok(None);
        };
        let Some(function) = self.heap.get(class)?.binary_ops.get(&op).cloned() else {
            return Ok(None);
        };
        let arg_types = [self.type_of(right)?];
        let overload = {
            let lineage = self.lineage(std::slice::from_ref(right))?;
            if function.candidates(&arg_types, &lineage).is_empty() {
                return Ok(None);
            }
            function.resolve(&arg_types, &lineage)?
        };
        self.invoke(&function.name, &overload, vec![right.clone()], Some(left.clone()))
            .map(Some)
    }

    fn unary_overload(&mut self, op: UnOp, operand: &Value) -> InterpResult<Option<Value>> {
        let Some(class) = self.operand_class(operand)? else {
            return Ok(None);
        };
        let Some(function) = self.heap.get(class)?.unary_ops.get(&op).cloned() else {
            return Ok(None);
        };
        let overload = function.resolve(&[], &self.classes)?;
        self.invoke(&function.name, &overload, Vec::new(), Some(operand.clone()))
            .map(Some)
    }
}

/// Operators on numbers, strings and booleans. `None` when the operand
/// types have no built-in meaning for `op`.
fn builtin_binary(
    op: BinOp,
    left: &Value,
    right: &Value,
    stringify: impl Fn(&Value) -> InterpResult<String>,
) -> InterpResult<Option<Value>> {
    use Value::{Number, String as Str};

    let result = match (op, left, right) {
        (BinOp::Add, Number(a), Number(b)) => Number(a + b),
        (BinOp::Add, Str(_), _) | (BinOp::Add, _, Str(_)) => {
            Value::string(stringify(left)? + &stringify(right)?)
        }
        (BinOp::Sub, Number(a), Number(b)) => Number(a - b),
        (BinOp::Mul, Number(a), Number(b)) => Number(a * b),
        (BinOp::Mul, Str(s), Number(n)) | (BinOp::Mul, Number(n), Str(s)) => {
            Value::string(repeat(s, *n)?)
        }
        (BinOp::Div, Number(a), Number(b)) => Number(a / b),
        (BinOp::IntDiv, Number(a), Number(b)) => Number((a / b).trunc()),
        (BinOp::Rem, Number(a), Number(b)) => Number(a % b),
        (BinOp::Pow, Number(a), Number(b)) => Number(a.powf(*b)),
        (BinOp::BitAnd, Number(a), Number(b)) => Number(f64::from(*a as i32 & *b as i32)),
        (BinOp::BitOr, Number(a), Number(b)) => Number(f64::from(*a as i32 | *b as i32)),
        (BinOp::BitXor, Number(a), Number(b)) => Number(f64::from(*a as i32 ^ *b as i32)),
        (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge, Number(a), Number(b)) => {
            Value::Boolean(compare(op, a, b))
        }
        (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge, Str(a), Str(b)) => {
            Value::Boolean(compare(op, a, b))
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn compare<T: PartialOrd + ?Sized>(op: BinOp, a: &T, b: &T) -> bool {
    match op {
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        _ => a >= b,
    }
}

/// Longest string, in bytes, that `*` may build
const MAX_REPEAT_LEN: usize = 1 << 30;

/// `text * factor`: whole repetitions, or a prefix for factors below one.
fn repeat(text: &str, factor: f64) -> InterpResult<String> {
    if !factor.is_finite() {
        return Err(RuntimeError::type_error(format!(
            "Cannot multiply 'String' by {factor}"
        )));
    }
    if factor < 1.0 {
        let len = text.chars().count() as f64;
        let keep = (factor * len).max(0.0) as usize;
        return Ok(text.chars().take(keep).collect());
    }
    let count = factor as usize;
    match text.len().checked_mul(count) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(text.repeat(count)),
        _ => Err(RuntimeError::runtime(format!(
            "Repeated string would exceed {MAX_REPEAT_LEN} bytes"
        ))),
    }
}

fn verb(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "subtract",
        BinOp::Mul => "multiply",
        BinOp::Div => "divide",
        BinOp::IntDiv => "intdiv",
        BinOp::Rem => "get remainder of",
        BinOp::Pow => "exponentiate",
        BinOp::BitAnd => "perform bitwise conjunction on",
        BinOp::BitOr => "perform bitwise disjunction on",
        BinOp::BitXor => "perform bitwise exclusive disjunction on",
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => "compare",
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

    fn string(source: &str) -> String {
        match run(source) {
            Ok(Some(Value::String(s))) => s.to_string(),
            other => panic!("Expected string from {source:?}, got {other:?}"),
        }
    }

    fn boolean(source: &str) -> bool {
        match run(source) {
            Ok(Some(Value::Boolean(b))) => b,
            other => panic!("Expected boolean from {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(number("7 // 2"), 3.0);
        assert_eq!(number("-7 // 2"), -3.0);
        assert_eq!(number("7 % 4"), 3.0);
        assert_eq!(number("2 ** 10"), 1024.0);
        assert_eq!(number("6 & 3"), 2.0);
        assert_eq!(number("6 | 3"), 7.0);
        assert_eq!(number("6 ^ 3"), 5.0);
        assert_eq!(number("~5"), -6.0);
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(string("\"a\" + 1"), "a1");
        assert_eq!(string("1 + \"a\""), "1a");
        assert_eq!(string("\"ab\" * 3"), "ababab");
        assert_eq!(string("\"abcd\" * 0.5"), "ab");
        assert_eq!(string("\"x\" + [1, 2]"), "x[ 1, 2 ]");
        assert!(boolean("\"abc\" < \"abd\""));
    }

    #[test]
    fn test_equality() {
        assert!(boolean("1 == 1"));
        assert!(!boolean("1 == \"1\""));
        assert!(boolean("[1, 2] == [1, 2]"));
        assert!(boolean("null == null"));
        assert!(boolean("class A { }; A() == A()"));
        assert!(boolean("class A { }; var a = A(); a == a"));
        assert!(boolean("class A { }; class B { }; A() != B()"));
        assert!(boolean("class A { }; A() != null"));
    }

    #[test]
    fn test_huge_string_repetition_fails() {
        let err = run("\"ab\" * (10 ** 19)").expect_err("too long");
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.message, "Repeated string would exceed 1073741824 bytes");
        assert_eq!(string("\"ab\" * 2"), "abab");
    }

    #[test]
    fn test_unary() {
        assert!(boolean("!0"));
        assert!(!boolean("!\"text\""));
        assert_eq!(number("-\"4\""), -4.0);
        assert_eq!(number("+true"), 1.0);
    }

    #[test]
    fn test_type_errors() {
        let err = run("1 - \"a\"").expect_err("subtract");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "Cannot subtract 'Number' and 'String'");
        let err = run("true < 1").expect_err("compare");
        assert_eq!(err.message, "Cannot compare 'Boolean' and 'Number'");
        let err = run("[1] % 2").expect_err("remainder");
        assert_eq!(err.message, "Cannot get remainder of 'List' and 'Number'");
    }

    #[test]
    fn test_operator_overloads() {
        let source = "
            class V {
                public var x: Number;
                constructor(x: Number) { this.x = x };
                operator + (other: V) = V(this.x + other.x);
                operator + (n: Number) = V(this.x + n);
                operator - () = V(-this.x);
                operator == (other: V) = this.x == other.x;
            };
            var v = -(V(1) + V(2) + 3);
            v.x
        ";
        assert_eq!(number(source), -6.0);
        let source = "
            class V {
                public var x: Number;
                constructor(x: Number) { this.x = x };
                operator == (other: V) = this.x == other.x;
            };
            V(1) == V(1)
        ";
        assert!(boolean(source));
    }

    #[test]
    fn test_overload_with_wrong_operand_falls_through() {
        let source = "
            class V { operator + (other: V) = 1 };
            V() + true
        ";
        let err = run(source).expect_err("no operator for Boolean");
        assert_eq!(err.message, "Cannot add 'V' and 'Boolean'");
    }
}
