//! Hand-written lexer
//!
//! A single forward cursor with two modes: after a value (literal,
//! identifier, closing bracket) the lexer expects an operator, anywhere else
//! it expects a value. The mode decides whether `/` is division or the start
//! of a regex literal, whether `/*` opens a comment, and whether `!in`,
//! `!is` and `?as` are single tokens.
//!
//! String literals are emitted as template text: escapes are resolved,
//! literal `\`, `$`, `{` and `}` are re-escaped with a backslash, and
//! interpolation regions are kept as raw source between unescaped braces.
//! `parser::template` splits that text back into parts.

mod token;

pub use token::{keyword, operator, Quote, Token, TokenKind, MAX_OPERATOR_LEN};

use crate::ast::{SourcePos, Span};
use crate::error::{CompileError, Result};
use std::rc::Rc;

/// Tokenize source code. The returned list always ends with an `Eof` token.
pub fn tokenize(source: &str, file_name: &str) -> Result<Vec<Token>> {
    let tokens = Lexer::new(source, file_name).tokenize()?;
    tracing::trace!(file = file_name, count = tokens.len(), "tokenized");
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Value,
    Operator,
}

pub struct Lexer {
    chars: Vec<char>,
    lines: Vec<Rc<str>>,
    file: Rc<str>,
    pos: usize,
    line: usize,
    column: usize,
    mode: Mode,
    tokens: Vec<Token>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

impl Lexer {
    pub fn new(source: &str, file_name: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            lines: source
                .split('\n')
                .map(|line| Rc::from(line.strip_suffix('\r').unwrap_or(line)))
                .collect(),
            file: Rc::from(file_name),
            pos: 0,
            line: 1,
            column: 1,
            mode: Mode::Value,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek(0) {
            let start = self.here();
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => self.skip_line_comment(),
                c if c.is_ascii_digit() => self.number(start)?,
                '.' if self.mode == Mode::Value && self.peek_is(1, |n| n.is_ascii_digit()) => {
                    self.number(start)?
                }
                c if is_ident_start(c) => self.identifier(start),
                '/' if self.mode == Mode::Value => self.regex(start)?,
                '/' if self.peek(1) == Some('*') => self.block_comment(start)?,
                c => match Quote::from_char(c) {
                    Some(quote) => self.string(start, quote)?,
                    None => self.operator(start)?,
                },
            }
        }
        let eof = self.here();
        self.push(TokenKind::Eof, String::new(), eof);
        Ok(self.tokens)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn peek_is(&self, ahead: usize, pred: impl Fn(char) -> bool) -> bool {
        self.peek(ahead).is_some_and(pred)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> SourcePos {
        SourcePos {
            file: Rc::clone(&self.file),
            line: self.line,
            column: self.column,
            offset: self.pos,
            line_text: self
                .lines
                .get(self.line - 1)
                .cloned()
                .unwrap_or_else(|| Rc::from("")),
        }
    }

    fn push(&mut self, kind: TokenKind, value: String, pos: SourcePos) {
        let span = Span::new(pos.offset, self.pos);
        self.mode = match kind {
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String(_)
            | TokenKind::Regex => Mode::Operator,
            k if k.closes_group() => Mode::Operator,
            k if token::keyword(&value) == Some(k) => Mode::Operator,
            _ => Mode::Value,
        };
        self.tokens.push(Token {
            kind,
            value,
            pos,
            span,
        });
    }

    fn error(&self, message: impl Into<String>, start: SourcePos) -> CompileError {
        let span = Span::new(start.offset, self.pos);
        CompileError::lex(message, start, span)
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn block_comment(&mut self, start: SourcePos) -> Result<()> {
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated block comment", start)),
                Some('*') if self.peek(0) == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn number(&mut self, start: SourcePos) -> Result<()> {
        if self.peek(0) == Some('0') {
            let radix = match self.peek(1) {
                Some('b' | 'B') => Some(2),
                Some('o' | 'O') => Some(8),
                Some('x' | 'X') => Some(16),
                _ => None,
            };
            if let Some(radix) = radix {
                return self.radix_number(start, radix);
            }
        }

        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek(0) {
            match c {
                '_' => {
                    self.bump();
                }
                '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '.' if self.peek_is(1, |n| n.is_ascii_digit()) => {
                    if seen_dot {
                        self.bump();
                        return Err(self.error("malformed number: second decimal point", start));
                    }
                    seen_dot = true;
                    if text.is_empty() {
                        text.push('0');
                    }
                    text.push('.');
                    self.bump();
                }
                'f' | 'c' => {
                    text.push(c);
                    self.bump();
                    break;
                }
                _ => break,
            }
        }
        self.push(TokenKind::Number, text, start);
        Ok(())
    }

    /// `0b`, `0o` and `0x` literals, converted to decimal text here.
    fn radix_number(&mut self, start: SourcePos, radix: u32) -> Result<()> {
        self.bump();
        self.bump();
        let mut digits = String::new();
        while let Some(c) = self.peek(0) {
            if c == '_' {
                self.bump();
            } else if c.is_digit(radix) {
                digits.push(c);
                self.bump();
            } else if c.is_ascii_alphanumeric() {
                self.bump();
                return Err(self.error(
                    format!("invalid digit '{c}' in base {radix} literal"),
                    start,
                ));
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(self.error(format!("base {radix} literal has no digits"), start));
        }
        let value = u64::from_str_radix(&digits, radix)
            .map_err(|_| self.error(format!("base {radix} literal is too large"), start.clone()))?;
        self.push(TokenKind::Number, value.to_string(), start);
        Ok(())
    }

    fn identifier(&mut self, start: SourcePos) {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if !is_ident_continue(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        let kind = token::keyword(&text).unwrap_or(TokenKind::Identifier);
        self.push(kind, text, start);
    }

    fn string(&mut self, start: SourcePos, quote: Quote) -> Result<()> {
        self.bump();
        let raw = quote == Quote::Backtick;
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("unterminated string literal", start));
            };
            match c {
                c if c == quote.as_char() => break,
                '\\' if !raw => {
                    let Some(escaped) = self.bump() else {
                        return Err(self.error("unterminated string literal", start));
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'b' => out.push('\u{8}'),
                        '0' => out.push('\0'),
                        '\\' | '$' | '{' | '}' => {
                            out.push('\\');
                            out.push(escaped);
                        }
                        other => out.push(other),
                    }
                }
                '\\' => out.push_str("\\\\"),
                '{' if quote != Quote::Single && self.peek(0) == Some('{') => {
                    self.bump();
                    out.push_str("\\{");
                }
                '}' if quote != Quote::Single && self.peek(0) == Some('}') => {
                    self.bump();
                    out.push_str("\\}");
                }
                '{' => {
                    out.push('{');
                    self.interpolation(&start, &mut out)?;
                }
                '}' => {
                    return Err(self.error("unbalanced '}' in string literal", start));
                }
                other => out.push(other),
            }
        }
        self.push(TokenKind::String(quote), out, start);
        Ok(())
    }

    /// Copies an interpolation region verbatim up to its matching `}`.
    fn interpolation(&mut self, start: &SourcePos, out: &mut String) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            let Some(c) = self.bump() else {
                return Err(self.error("unbalanced '{' in string literal", start.clone()));
            };
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            out.push(c);
        }
        Ok(())
    }

    fn regex(&mut self, start: SourcePos) -> Result<()> {
        let mut text = String::from("/");
        self.bump();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error("unterminated regex literal", start));
                }
                Some('\\') => {
                    text.push('\\');
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some('/') => {
                    text.push('/');
                    break;
                }
                Some(c) => text.push(c),
            }
        }
        while let Some(c) = self.peek(0) {
            if !c.is_ascii_alphabetic() {
                break;
            }
            text.push(c);
            self.bump();
        }
        self.push(TokenKind::Regex, text, start);
        Ok(())
    }

    fn operator(&mut self, start: SourcePos) -> Result<()> {
        for len in (1..=MAX_OPERATOR_LEN).rev() {
            if self.pos + len > self.chars.len() {
                continue;
            }
            let text: String = self.chars[self.pos..self.pos + len].iter().collect();
            let Some(kind) = token::operator(&text) else {
                continue;
            };
            let word = matches!(
                kind,
                TokenKind::NotIn | TokenKind::NotIs | TokenKind::QuestionAs
            );
            if word && (self.mode == Mode::Value || self.peek_is(len, is_ident_continue)) {
                continue;
            }
            for _ in 0..len {
                self.bump();
            }
            self.push(kind, text, start);
            return Ok(());
        }
        let c = self.peek(0).unwrap_or('\0');
        self.bump();
        Err(self.error(format!("unexpected character '{c}'"), start))
    }
}
