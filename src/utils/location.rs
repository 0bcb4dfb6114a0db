//! Source locations for diagnostics.
//!
//! Domain descriptions are short (a header line plus a few statements), so
//! spans only need to be precise enough to point at the offending token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of input
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// The location of the first character.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Span {
    /// Create a span from start and end locations.
    pub fn from_locations(start: SourceLocation, end: SourceLocation) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
        }
    }

    /// A span for nodes that were synthesized rather than parsed.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Check if this span is a dummy span.
    pub fn is_dummy(&self) -> bool {
        self.start_line == 0 && self.end_line == 0
    }

    fn start(&self) -> SourceLocation {
        SourceLocation::new(self.start_line, self.start_column, self.start_offset)
    }

    fn end(&self) -> SourceLocation {
        SourceLocation::new(self.end_line, self.end_column, self.end_offset)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        if self.is_dummy() {
            return *other;
        }
        if other.is_dummy() {
            return *self;
        }
        let start = if self.start_offset <= other.start_offset {
            self.start()
        } else {
            other.start()
        };
        let end = if self.end_offset >= other.end_offset {
            self.end()
        } else {
            other.end()
        };
        Span::from_locations(start, end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

/// Returns the given 1-indexed line of `source`, without its newline.
pub fn source_line(source: &str, line_number: usize) -> Option<&str> {
    if line_number == 0 {
        return None;
    }
    source.lines().nth(line_number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let span = Span::from_locations(SourceLocation::new(1, 5, 4), SourceLocation::new(1, 10, 9));
        assert_eq!(span.to_string(), "1:5-10");

        let span = Span::from_locations(SourceLocation::new(1, 5, 4), SourceLocation::new(3, 10, 40));
        assert_eq!(span.to_string(), "1:5-3:10");
    }

    #[test]
    fn test_span_merge() {
        let a = Span::from_locations(SourceLocation::new(1, 1, 0), SourceLocation::new(1, 5, 4));
        let b = Span::from_locations(SourceLocation::new(1, 10, 9), SourceLocation::new(1, 15, 14));
        let merged = a.merge(&b);
        assert_eq!(merged.start_column, 1);
        assert_eq!(merged.end_column, 15);
        assert_eq!(Span::dummy().merge(&b), b);
    }

    #[test]
    fn test_source_line() {
        let source = "dmv = {[i]: 0 <= i < N}\ny[i] = x[i]";
        assert_eq!(source_line(source, 2), Some("y[i] = x[i]"));
        assert_eq!(source_line(source, 0), None);
        assert_eq!(source_line(source, 3), None);
    }
}
