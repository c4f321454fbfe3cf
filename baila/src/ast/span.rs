//! Source location tracking

use std::fmt;
use std::rc::Rc;

/// A span in the source code, in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// Where a token starts: file, 1-based line and column, absolute offset,
/// and the full text of the line it starts on (for caret diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub line_text: Rc<str>,
}

impl SourcePos {
    /// Renders the source line with a caret underline of `width` characters
    /// starting at this position's column.
    pub fn caret_snippet(&self, width: usize) -> String {
        let indent: String = self
            .line_text
            .chars()
            .take(self.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!("{}\n{}{}", self.line_text, indent, "^".repeat(width.max(1)))
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
