//! Lexer for the textual IR
//!
//! Wraps the `logos` scanner: attaches line/column spans to every token and
//! turns scanner errors into diagnostics instead of stopping.

use crate::token::{Token, TokenKind};
use irx86_error::{
    span::{Position, Span},
    Diagnostic, Diagnostics, ErrorCode,
};
use logos::Logos;

/// The IR lexer
pub struct Lexer<'src> {
    source: &'src str,
    file_id: u32,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
    diagnostics: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u32) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            source,
            file_id,
            line_starts,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes and returns the diagnostics
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn position(&self, offset: usize) -> Position {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_idx];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position::new(line_idx as u32 + 1, column as u32, offset)
    }

    fn make_span(&self, range: std::ops::Range<usize>) -> Span {
        Span::new(self.position(range.start), self.position(range.end), self.file_id)
    }

    /// Tokenizes the whole input; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut scanner = TokenKind::lexer(self.source);

        while let Some(result) = scanner.next() {
            let span = self.make_span(scanner.span());
            match result {
                Ok(kind) => tokens.push(Token::new(kind, span)),
                Err(()) => {
                    let diagnostic = self.scan_error(scanner.slice(), span);
                    self.diagnostics.push(diagnostic);
                }
            }
        }

        let end = self.source.len();
        tokens.push(Token::new(TokenKind::Eof, self.make_span(end..end)));
        tokens
    }

    fn scan_error(&self, slice: &str, span: Span) -> Diagnostic {
        let digits = slice.trim_start_matches('-');
        if slice.starts_with('"') || slice.starts_with("c\"") {
            Diagnostic::error("unterminated string literal")
                .with_code(ErrorCode::UNTERMINATED_STRING)
                .with_label(span, "string starts here")
                .with_note("string literals cannot span lines")
        } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Diagnostic::error(format!("integer literal '{}' is out of range", slice))
                .with_code(ErrorCode::INVALID_NUMBER)
                .with_label(span, "does not fit in 128 bits")
        } else {
            Diagnostic::error(format!("unexpected character '{}'", slice))
                .with_code(ErrorCode::UNEXPECTED_CHAR)
                .with_label(span, "not valid in IR text")
        }
    }
}

/// Tokenizes `source`, returning the tokens and any lexical diagnostics
pub fn tokenize(source: &str, file_id: u32) -> (Vec<Token>, Diagnostics) {
    let mut lexer = Lexer::new(source, file_id);
    let tokens = lexer.tokenize();
    (tokens, lexer.take_diagnostics())
}
