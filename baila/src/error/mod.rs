//! Error types and reporting

use crate::ast::{SourcePos, Span};
use crate::interp::RuntimeError;
use crate::lexer::Token;
use thiserror::Error;

/// Result type alias for lexing and parsing
pub type Result<T> = std::result::Result<T, CompileError>;

/// Which syntax rule was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnexpectedToken,
    DuplicateStatic,
    DuplicateAccessibility,
    DuplicateGetter,
    DuplicateSetter,
    MalformedMemberTerminator,
}

/// Error raised before evaluation starts
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("LexError: {message}")]
    Lex {
        message: String,
        pos: SourcePos,
        span: Span,
    },

    #[error("SyntaxError: {message}")]
    Syntax {
        kind: SyntaxErrorKind,
        message: String,
        token: Box<Token>,
    },
}

impl CompileError {
    pub fn lex(message: impl Into<String>, pos: SourcePos, span: Span) -> Self {
        Self::Lex {
            message: message.into(),
            pos,
            span,
        }
    }

    pub fn syntax(kind: SyntaxErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Self::Syntax {
            kind,
            message: message.into(),
            token: Box::new(token.clone()),
        }
    }

    pub fn unexpected(token: &Token) -> Self {
        Self::syntax(
            SyntaxErrorKind::UnexpectedToken,
            format!("Unexpected token '{token}'"),
            token,
        )
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Lex { span, .. } => *span,
            Self::Syntax { token, .. } => token.span,
        }
    }

    pub fn pos(&self) -> &SourcePos {
        match self {
            Self::Lex { pos, .. } => pos,
            Self::Syntax { token, .. } => &token.pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lex { message, .. } | Self::Syntax { message, .. } => message,
        }
    }

    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Self::Syntax { kind, .. } => Some(*kind),
            Self::Lex { .. } => None,
        }
    }

    /// The offending source line with a caret underline below the error.
    pub fn snippet(&self) -> String {
        let width = self.span().len().max(1);
        self.pos().caret_snippet(width)
    }
}

/// Any error the pipeline can produce, from lexing through evaluation
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        CompileError::Lex { .. } => "LexError",
        CompileError::Syntax { .. } => "SyntaxError",
    };
    let span = error.span();
    let range = span.start..span.end.max(span.start + 1);

    Report::build(ReportKind::Error, (filename, range.clone()))
        .with_message(kind)
        .with_label(
            Label::new((filename, range))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn parse_err(source: &str) -> CompileError {
        tokenize(source, "test.baila")
            .and_then(parse)
            .expect_err("source should not compile")
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = parse_err("var x = )");
        assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedToken));
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token ')'");
    }

    #[test]
    fn test_syntax_snippet() {
        let err = parse_err("var a = 1;\nvar b = * 2");
        insta::assert_snapshot!(err.snippet(), @r"
        var b = * 2
                ^
        ");
    }

    #[test]
    fn test_lex_error_snippet() {
        let err = parse_err("var s = 'abc");
        assert!(matches!(err, CompileError::Lex { .. }));
        assert!(err.snippet().starts_with("var s = 'abc\n        ^"));
    }

    #[test]
    fn test_position_points_at_token() {
        let err = parse_err("var x = 1;\n  var = 2");
        assert_eq!(err.pos().line, 2);
        assert_eq!(err.pos().column, 7);
    }

    #[test]
    fn test_wraps_into_crate_error() {
        let err: Error = parse_err("if").into();
        assert!(matches!(err, Error::Compile(_)));
    }
}
