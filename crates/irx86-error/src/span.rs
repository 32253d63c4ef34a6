//! Span - where a token sits in the IR text

/// A point in the IR text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-indexed
    pub line: u32,
    /// 1-indexed, counted in characters
    pub column: u32,
    /// Byte offset
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// Half-open region `[start, end)` of one file in the `SourceCache`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub file_id: u32,
}

impl Span {
    pub fn new(start: Position, end: Position, file_id: u32) -> Self {
        Self { start, end, file_id }
    }
}
