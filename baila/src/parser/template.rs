//! String literal templates
//!
//! The lexer leaves string text with escapes still marking literal
//! characters: `\x` is a literal `x`, `{...}` is an embedded expression,
//! `${...}` is the same thing and `$name` interpolates a single variable.

use super::parse_expression;
use crate::ast::{Expr, TemplatePart};
use crate::error::{CompileError, Result, SyntaxErrorKind};
use crate::lexer::{Token, tokenize};

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Code(String),
}

fn split(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    let flush = |literal: &mut String, segments: &mut Vec<Segment>| {
        if !literal.is_empty() {
            segments.push(Segment::Text(std::mem::take(literal)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\\' => literal.extend(chars.next()),
            '$' if chars.peek() == Some(&'{') => {}
            '$' if chars.peek().is_some_and(|&n| n.is_alphabetic() || n == '_') => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !(n.is_alphanumeric() || n == '_') {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                flush(&mut literal, &mut segments);
                segments.push(Segment::Code(name));
            }
            '{' => {
                let mut depth = 1usize;
                let mut code = String::new();
                for n in chars.by_ref() {
                    match n {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    code.push(n);
                }
                flush(&mut literal, &mut segments);
                segments.push(Segment::Code(code));
            }
            other => literal.push(other),
        }
    }
    flush(&mut literal, &mut segments);
    segments
}

/// Turn a string token into a literal, or a template when it embeds code.
pub(super) fn parse_template(token: &Token) -> Result<Expr> {
    let segments = split(&token.value);
    if !segments.iter().any(|s| matches!(s, Segment::Code(_))) {
        let text = segments
            .into_iter()
            .map(|s| match s {
                Segment::Text(t) | Segment::Code(t) => t,
            })
            .collect::<String>();
        return Ok(Expr::string(text));
    }

    let mut parts = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => parts.push(TemplatePart::Text(text)),
            Segment::Code(code) => {
                let expr = tokenize(&code, &token.pos.file)
                    .and_then(parse_expression)
                    .map_err(|e| {
                        CompileError::syntax(
                            SyntaxErrorKind::UnexpectedToken,
                            format!("In interpolation '{{{code}}}': {}", e.message()),
                            token,
                        )
                    })?;
                parts.push(TemplatePart::Expr(expr));
            }
        }
    }
    Ok(Expr::Template(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    fn code(s: &str) -> Segment {
        Segment::Code(s.to_string())
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(split("hello"), vec![text("hello")]);
        assert_eq!(split(""), vec![]);
    }

    #[test]
    fn test_split_braces_and_dollar() {
        assert_eq!(split("a${1+2}b"), vec![text("a"), code("1+2"), text("b")]);
        assert_eq!(split("x{y}z"), vec![text("x"), code("y"), text("z")]);
        assert_eq!(split("hi $name!"), vec![text("hi "), code("name"), text("!")]);
    }

    #[test]
    fn test_split_escapes_are_literal() {
        assert_eq!(split(r"\{lit\}"), vec![text("{lit}")]);
        assert_eq!(split(r"\$5 \\"), vec![text("$5 \\")]);
        assert_eq!(split("cost: $5"), vec![text("cost: $5")]);
    }

    #[test]
    fn test_split_nested_braces() {
        assert_eq!(split("{f({1})}"), vec![code("f({1})")]);
    }
}
