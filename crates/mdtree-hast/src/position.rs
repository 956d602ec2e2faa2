//! Source positions attached to nodes upstream.

use std::fmt;

/// One place in the source document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
    /// 0-indexed byte offset, when the producer tracked it.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub offset: Option<usize>,
}

impl Point {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            offset: None,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Span of a node in the source document.
///
/// Positions are computed upstream and only ever forwarded by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    #[must_use]
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// Formats as `line:column-line:column`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}
