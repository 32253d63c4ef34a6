//! irx86-lexer - Tokenizer for the textual IR
//!
//! Converts IR text (an LLVM assembly subset) into tokens with spans.
//!
//! # Features
//!
//! - Line-oriented: every newline is a token, `;` comments are skipped
//! - Named (`%x`, `@puts`) and numbered (`%3`) values, quoted names
//! - Integer, float and string literals
//! - Block labels (`entry:`)
//!
//! # Example
//!
//! ```rust
//! use irx86_lexer::{Lexer, TokenKind};
//!
//! let source = "define i64 @add1() {\n  ret i64 5\n}\n";
//!
//! let mut lexer = Lexer::new(source, 0);
//! let tokens = lexer.tokenize();
//!
//! assert!(matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
//! ```

pub mod lexer;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use token::{Token, TokenKind};
