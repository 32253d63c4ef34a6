//! irx86-error - Diagnostics for reading IR text
//!
//! Lexer and parser collect [`Diagnostic`]s into a [`Diagnostics`] list
//! instead of stopping at the first problem. Only errors make a module
//! invalid; warnings are shown and the module is still translated.
//!
//! ```rust
//! use irx86_error::{Diagnostic, Diagnostics, DiagnosticRenderer, ErrorCode, SourceCache};
//! use irx86_error::span::{Position, Span};
//!
//! let mut cache = SourceCache::new();
//! let file = cache.add("add1.ll", "ret i64 %x");
//!
//! let mut diags = Diagnostics::new();
//! diags.push(
//!     Diagnostic::error("use of undefined value '%x'")
//!         .with_code(ErrorCode::UNDEFINED_VALUE)
//!         .with_label(Span::new(Position::new(1, 9, 8), Position::new(1, 11, 10), file), "here"),
//! );
//!
//! let text = diags.render(&DiagnosticRenderer::new(&cache).without_colors());
//! assert!(text.starts_with("error[EP005]"));
//! ```

pub mod diagnostic;
pub mod span;

pub use diagnostic::{
    Diagnostic, DiagnosticRenderer, ErrorCode, Label, LabelStyle, Level, SourceCache, SourceFile, Stage,
};
pub use span::{Position, Span};

/// Diagnostics accumulated while reading one module
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Appends the diagnostics of a later stage
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other);
    }

    pub fn error_count(&self) -> usize {
        self.count(Level::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, level: Level) -> usize {
        self.items.iter().filter(|d| d.level == level).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// One rendered block per diagnostic, separated by blank lines
    pub fn render(&self, renderer: &DiagnosticRenderer<'_>) -> String {
        let blocks: Vec<String> = self.iter().map(|d| renderer.render(d)).collect();
        blocks.join("\n")
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
