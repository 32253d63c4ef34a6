//! Diagnostic - rustc-style reports for malformed IR
//!
//! ```text
//! error[EP005]: use of undefined value '%x'
//!  --> add1.ll:2:11
//!    |
//!  2 |   ret i64 %x
//!    |           ^^ not defined in this function
//! ```

use crate::span::Span;
use std::fmt::{self, Write};

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Makes the module unusable
    Error,
    /// Reported, but the module is still translated
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Error => "error",
            Level::Warning => "warning",
        })
    }
}

/// Pipeline stage an error code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexer,
    Parser,
}

impl Stage {
    fn letter(self) -> char {
        match self {
            Stage::Lexer => 'L',
            Stage::Parser => 'P',
        }
    }
}

/// Stable code shown as `E<stage><number>`, e.g. `EP005`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub stage: Stage,
    pub number: u16,
}

impl ErrorCode {
    const fn lexer(number: u16) -> Self {
        Self { stage: Stage::Lexer, number }
    }

    const fn parser(number: u16) -> Self {
        Self { stage: Stage::Parser, number }
    }

    pub const UNEXPECTED_CHAR: Self = Self::lexer(1);
    pub const UNTERMINATED_STRING: Self = Self::lexer(2);
    pub const INVALID_NUMBER: Self = Self::lexer(3);

    pub const UNEXPECTED_TOKEN: Self = Self::parser(1);
    pub const EXPECTED_VALUE: Self = Self::parser(2);
    pub const EXPECTED_TYPE: Self = Self::parser(3);
    pub const INVALID_SYNTAX: Self = Self::parser(4);
    pub const UNDEFINED_VALUE: Self = Self::parser(5);
    pub const DUPLICATE_DEFINITION: Self = Self::parser(6);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}{:03}", self.stage.letter(), self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// Underlined with `^`
    Primary,
    /// Underlined with `-`, for related locations
    Secondary,
}

/// A message attached to a region of the IR text
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub style: LabelStyle,
}

/// A complete diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_label(self, span: Span, message: impl Into<String>) -> Self {
        self.labeled(span, message, LabelStyle::Primary)
    }

    pub fn with_secondary_label(self, span: Span, message: impl Into<String>) -> Self {
        self.labeled(span, message, LabelStyle::Secondary)
    }

    fn labeled(mut self, span: Span, message: impl Into<String>, style: LabelStyle) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
            style,
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

/// One IR text registered for quoting
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Text of a 1-indexed line, without its line terminator
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = number.checked_sub(1)?;
        self.source.lines().nth(index as usize)
    }
}

/// Keeps the IR text around so diagnostics can quote it
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file; the returned id goes into every `Span` of it
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> u32 {
        self.files.push(SourceFile::new(name, source));
        (self.files.len() - 1) as u32
    }

    pub fn get(&self, id: u32) -> Option<&SourceFile> {
        self.files.get(id as usize)
    }
}

/// ANSI escapes, empty when colors are off
#[derive(Debug, Clone, Copy)]
struct Palette {
    error: &'static str,
    warning: &'static str,
    gutter: &'static str,
    help: &'static str,
    bold: &'static str,
    reset: &'static str,
}

impl Palette {
    const COLORED: Palette = Palette {
        error: "\x1b[1;31m",
        warning: "\x1b[1;33m",
        gutter: "\x1b[1;34m",
        help: "\x1b[1;32m",
        bold: "\x1b[1m",
        reset: "\x1b[0m",
    };

    const PLAIN: Palette = Palette {
        error: "",
        warning: "",
        gutter: "",
        help: "",
        bold: "",
        reset: "",
    };

    fn level(&self, level: Level) -> &'static str {
        match level {
            Level::Error => self.error,
            Level::Warning => self.warning,
        }
    }
}

/// Renders diagnostics for the terminal
pub struct DiagnosticRenderer<'a> {
    cache: &'a SourceCache,
    palette: Palette,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(cache: &'a SourceCache) -> Self {
        Self {
            cache,
            palette: Palette::COLORED,
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.palette = Palette::PLAIN;
        self
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_diagnostic(&mut out, diagnostic);
        out
    }

    fn write_diagnostic(&self, out: &mut String, diagnostic: &Diagnostic) -> fmt::Result {
        let p = self.palette;
        let color = p.level(diagnostic.level);

        write!(out, "{}{}", color, diagnostic.level)?;
        if let Some(code) = diagnostic.code {
            write!(out, "[{}]", code)?;
        }
        writeln!(out, "{}{}: {}{}", p.reset, p.bold, diagnostic.message, p.reset)?;

        for label in &diagnostic.labels {
            self.write_label(out, label, color)?;
        }
        for note in &diagnostic.notes {
            writeln!(out, "  = {}note{}: {}", p.bold, p.reset, note)?;
        }
        for help in &diagnostic.help {
            writeln!(out, "  = {}help{}: {}", p.help, p.reset, help)?;
        }
        Ok(())
    }

    fn write_label(&self, out: &mut String, label: &Label, color: &str) -> fmt::Result {
        let p = self.palette;
        let Some(file) = self.cache.get(label.span.file_id) else {
            return Ok(());
        };
        let start = label.span.start;
        let end = label.span.end;

        writeln!(out, " {}-->{} {}:{}:{}", p.gutter, p.reset, file.name, start.line, start.column)?;
        let Some(text) = file.line(start.line) else {
            return Ok(());
        };

        let number = start.line.to_string();
        let gutter = " ".repeat(number.len());
        writeln!(out, " {} {}|{}", gutter, p.gutter, p.reset)?;
        writeln!(out, " {}{} |{} {}", p.gutter, number, p.reset, text)?;

        let indent = start.column.saturating_sub(1) as usize;
        // a multi-line span is underlined to the end of its first line
        let width = if start.line == end.line {
            end.column.saturating_sub(start.column) as usize
        } else {
            text.chars().count().saturating_sub(indent)
        };
        let (mark, mark_color) = match label.style {
            LabelStyle::Primary => ('^', color),
            LabelStyle::Secondary => ('-', p.gutter),
        };
        let underline: String = std::iter::repeat(mark).take(width.max(1)).collect();

        writeln!(
            out,
            " {} {}|{} {:indent$}{}{}{} {}",
            gutter,
            p.gutter,
            p.reset,
            "",
            mark_color,
            underline,
            p.reset,
            label.message,
            indent = indent
        )
    }
}
