//! Integration tests for the Baila interpreter
//!
//! Drive the full pipeline (lexer, parser, evaluator) through
//! `baila::run_source` and check values, printed output and errors.

use baila::interp::{ErrorKind, Value};
use baila::{Config, Error, Interpreter, run_source};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Output sink shared between the interpreter and the test
#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("utf8 output")
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn eval(source: &str) -> Result<Option<Value>, Error> {
    let mut interp = Interpreter::new().with_output(Captured::default());
    run_source(&mut interp, source, "test.baila")
}

/// Run and return everything the program printed
fn output(source: &str) -> String {
    let sink = Captured::default();
    let mut interp = Interpreter::new().with_output(sink.clone());
    if let Err(e) = run_source(&mut interp, source, "test.baila") {
        panic!("{source:?} failed: {e}");
    }
    sink.text()
}

fn number(source: &str) -> f64 {
    match eval(source) {
        Ok(Some(Value::Number(n))) => n,
        other => panic!("Expected number from {source:?}, got {other:?}"),
    }
}

fn string(source: &str) -> String {
    match eval(source) {
        Ok(Some(Value::String(s))) => s.to_string(),
        other => panic!("Expected string from {source:?}, got {other:?}"),
    }
}

fn runtime_error(source: &str) -> baila::interp::RuntimeError {
    match eval(source) {
        Err(Error::Runtime(e)) => e,
        other => panic!("Expected runtime error from {source:?}, got {other:?}"),
    }
}

// ============================================
// Literals
// ============================================

#[test]
fn test_digit_separators() {
    assert_eq!(number("1_000"), 1000.0);
    assert_eq!(number("1_000.5"), 1000.5);
}

#[test]
fn test_radix_literals() {
    assert_eq!(number("0b101"), 5.0);
    assert_eq!(number("0o17"), 15.0);
    assert_eq!(number("0xFF"), 255.0);
}

#[test]
fn test_string_interpolation() {
    assert_eq!(string("\"a${1+2}b\""), "a3b");
    assert_eq!(string("'x{1+2}y'"), "x3y");
    assert_eq!(string("var name = \"Ann\"; \"hi $name!\""), "hi Ann!");
    assert_eq!(string("var xs = [1, 2]; \"xs = {xs}\""), "xs = [ 1, 2 ]");
}

#[test]
fn test_interpolation_sees_current_scope() {
    let source = "
        var out = \"\";
        for i = 1 to 3 { out = out + \"<$i>\" };
        out
    ";
    assert_eq!(string(source), "<1><2><3>");
}

#[test]
fn test_list_index() {
    assert_eq!(number("[1,2,3][1]"), 2.0);
}

#[test]
fn test_self_containing_list() {
    let source = "var l = [0]; l[0] = l;";
    assert_eq!(string(&format!("{source} \"{{l}}\"")), "[ [...] ]");
    assert!(matches!(
        eval(&format!("{source} l == l")),
        Ok(Some(Value::Boolean(true)))
    ));
    assert_eq!(string("var a = [1]; var b = [a, a]; \"{b}\""), "[ [ 1 ], [ 1 ] ]");
}

#[test]
fn test_objects_that_print_alike_are_equal() {
    assert!(matches!(
        eval("class A { }; A() == A()"),
        Ok(Some(Value::Boolean(true)))
    ));
    assert!(matches!(
        eval("class A { }; class B { }; A() == B()"),
        Ok(Some(Value::Boolean(false)))
    ));
}

// ============================================
// Scopes
// ============================================

#[test]
fn test_block_variable_not_visible_after_block() {
    let err = runtime_error("{ var inner = 1 }; inner");
    assert_eq!(err.kind, ErrorKind::ReferenceError);
}

#[test]
fn test_shadowing_versus_assignment() {
    assert_eq!(number("var x = 1; { var x = 2; x = 3 }; x"), 1.0);
    assert_eq!(number("var x = 1; { x = 3 }; x"), 3.0);
}

#[test]
fn test_failed_statement_keeps_earlier_state() {
    let mut interp = Interpreter::new().with_output(Captured::default());
    let result = run_source(&mut interp, "var kept = 42; missing()", "session.baila");
    assert!(matches!(result, Err(Error::Runtime(_))));
    let value = run_source(&mut interp, "kept", "session.baila").expect("second input");
    assert!(matches!(value, Some(Value::Number(n)) if n == 42.0));
}

// ============================================
// Overloads
// ============================================

const OVERLOADS: &str = "
    function f() = \"none\";
    function f(x: Number) = \"number\";
    function f(x: String) = \"string\";
";

#[test]
fn test_overload_resolution() {
    assert_eq!(string(&format!("{OVERLOADS} f()")), "none");
    assert_eq!(string(&format!("{OVERLOADS} f(5)")), "number");
    assert_eq!(string(&format!("{OVERLOADS} f(\"s\")")), "string");
}

#[test]
fn test_overload_not_found() {
    let err = runtime_error(&format!("{OVERLOADS} f(true)"));
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert!(err.message.contains("Unable to find overload"));
}

#[test]
fn test_duplicate_overload_rejected() {
    let err = runtime_error("function g(a: Number) = 1; function g(b: Number) = 2");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("already exists"));
}

// ============================================
// Types
// ============================================

#[test]
fn test_covariant_assignment() {
    let classes = "class A { }; class B : A { };";
    assert_eq!(number(&format!("{classes} var v: A; v = B(); 1")), 1.0);
    let err = runtime_error(&format!("{classes} var v: B; v = A()"));
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_inner_class_does_not_rewire_outer_class() {
    let source = "
        class A { };
        class B : A { };
        function shadow() { class B { }; 1 };
        shadow();
        var a: A = B();
        1
    ";
    assert_eq!(number(source), 1.0);

    let source = "
        class A { };
        function make() { class B { }; return B() };
        var a: A = make()
    ";
    assert_eq!(runtime_error(source).kind, ErrorKind::TypeError);
}

#[test]
fn test_null_fits_class_slots_only() {
    assert_eq!(number("class A { }; var a: A = A(); a = null; 1"), 1.0);
    assert_eq!(number("var n: ?Number = null; n = 3; n"), 3.0);
    assert_eq!(runtime_error("var n: Number = null").kind, ErrorKind::TypeError);
}

// ============================================
// Loops
// ============================================

#[test]
fn test_for_ascending_inclusive() {
    assert_eq!(output("for i = 0 to 3 { print(i) }"), "0123");
}

#[test]
fn test_for_descending_inclusive() {
    assert_eq!(output("for i = 3 to 0 { print(i) }"), "3210");
}

#[test]
fn test_for_with_parens_and_step() {
    assert_eq!(output("for (i = 10 to 0 step 5) print(i)"), "1050");
}

// ============================================
// Constants
// ============================================

#[test]
fn test_constant_reassignment_fails() {
    let err = runtime_error("const x = 5; x = 6");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.message, "Cannot redefine constant 'x'");
}

#[test]
fn test_constant_redeclaration_fails() {
    let err = runtime_error("const x = 5; const x = 7");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.message, "Constant 'x' is already defined");
}

// ============================================
// Programs
// ============================================

#[test]
fn test_class_program_output() {
    let source = "
        class Shape {
            protected var name = \"shape\";
            public function describe() = \"$name with area {this.area()}\";
            public function area() = 0;
        };
        class Square : Shape {
            public var side: Number;
            constructor(side: Number) {
                this.side = side;
                this.name = \"square\"
            };
            public function area() = this.side ** 2;
        };
        print(Square(3).describe())
    ";
    // `$name` inside a method reads the variable scope, not the field.
    let err = eval(source).expect_err("name is a field, not a variable");
    assert!(matches!(err, Error::Runtime(e) if e.kind == ErrorKind::ReferenceError));

    let source = source.replace("$name", "{this.name}");
    insta::assert_snapshot!(output(&source), @"square with area 9");
}

#[test]
fn test_fizzbuzz() {
    let source = "
        function label(n: Number): String {
            if (n % 15 == 0) return \"FizzBuzz\";
            if (n % 3 == 0) return \"Fizz\";
            if (n % 5 == 0) return \"Buzz\";
            return \"\" + n
        };
        var parts = \"\";
        for i = 1 to 15 { parts = parts + label(i) + \" \" };
        parts
    ";
    assert_eq!(
        string(source),
        "1 2 Fizz 4 Buzz Fizz 7 8 Fizz Buzz 11 Fizz 13 14 FizzBuzz "
    );
}

#[test]
fn test_operator_overload_program() {
    let source = "
        class Vec2 {
            public var x: Number;
            public var y: Number;
            constructor(x: Number, y: Number) { this.x = x; this.y = y };
            operator + (other: Vec2) = Vec2(this.x + other.x, this.y + other.y);
            operator * (k: Number) = Vec2(this.x * k, this.y * k);
        };
        var v = (Vec2(1, 2) + Vec2(3, 4)) * 2;
        \"{v.x},{v.y}\"
    ";
    assert_eq!(string(source), "8,12");
}

#[test]
fn test_properties_program() {
    let source = "
        class Account {
            public prop balance: Number {
                get = field;
                set {
                    if (value < 0) field = 0 else field = value
                }
            } = 100;
        };
        var a = Account();
        a.balance = a.balance - 250;
        a.balance
    ";
    assert_eq!(number(source), 0.0);
}

#[test]
fn test_statics_shared_across_instances() {
    let source = "
        class Id {
            public static var next = 1;
            public var value: Number;
            constructor() { this.value = Id.next; Id.next = Id.next + 1 };
        };
        Id(); Id();
        Id().value
    ";
    assert_eq!(number(source), 3.0);
}

// ============================================
// Errors
// ============================================

#[test]
fn test_compile_errors_surface() {
    assert!(matches!(eval("var x = \"open"), Err(Error::Compile(_))));
    assert!(matches!(eval("var = 1"), Err(Error::Compile(_))));
}

#[test]
fn test_error_display_has_kind() {
    let err = runtime_error("undefinedThing");
    assert_eq!(err.to_string(), "ReferenceError: 'undefinedThing' is not defined");
}

#[test]
fn test_null_member_access() {
    let err = runtime_error("var o = null; o.field");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "Cannot access 'field' of null");
}

#[test]
fn test_call_depth_limit() {
    let config = Config {
        max_call_depth: 50,
        ..Config::default()
    };
    let mut interp = Interpreter::with_config(config);
    let err = run_source(&mut interp, "function down(n: Number) = down(n + 1); down(0)", "deep.baila")
        .expect_err("too deep");
    assert!(matches!(err, Error::Runtime(e) if e.kind == ErrorKind::StackOverflow));
}

// ============================================
// Embedding
// ============================================

fn double(_: &mut Interpreter, args: &[Value]) -> baila::interp::InterpResult<Option<Value>> {
    match args.first() {
        Some(Value::Number(n)) => Ok(Some(Value::Number(n * 2.0))),
        _ => Ok(None),
    }
}

#[test]
fn test_define_native() {
    let mut interp = Interpreter::new();
    interp
        .define_native("double", &["n: Number"], None, double)
        .expect("register");
    let value = run_source(&mut interp, "double(21)", "native.baila").expect("run");
    assert!(matches!(value, Some(Value::Number(n)) if n == 42.0));

    let err = interp
        .define_native("broken", &["n Number"], None, double)
        .expect_err("bad shorthand");
    assert!(err.message.starts_with("Malformed parameter shorthand"));
}

#[test]
fn test_collect_garbage_keeps_live_objects() {
    let mut interp = Interpreter::new().with_output(Captured::default());
    let source = "
        class Node { public var next: ?Node = null };
        var head = Node();
        head.next = Node();
        for i = 1 to 5 { Node() };
        1
    ";
    run_source(&mut interp, source, "gc.baila").expect("run");
    let before = interp.heap().len();
    let swept = interp.collect_garbage();
    assert_eq!(swept, 5);
    assert_eq!(interp.heap().len(), before - 5);
    let value = run_source(&mut interp, "head.next.next == null", "gc.baila").expect("run");
    assert!(matches!(value, Some(Value::Boolean(true))));
}
