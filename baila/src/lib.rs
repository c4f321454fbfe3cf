//! Baila interpreter library
//!
//! A small expression-oriented scripting language with classes, typed
//! overloads and string interpolation, run by a tree-walking interpreter.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod util;

pub use ast::Span;
pub use error::{CompileError, Error, Result};
pub use interp::{Config, Interpreter, Value};

/// Lex, parse and run `source` on `interp`. Yields the value of the last
/// top-level statement.
pub fn run_source(
    interp: &mut Interpreter,
    source: &str,
    file_name: &str,
) -> std::result::Result<Option<Value>, Error> {
    let tokens = lexer::tokenize(source, file_name)?;
    let program = parser::parse(tokens)?;
    Ok(interp.run(&program)?)
}
