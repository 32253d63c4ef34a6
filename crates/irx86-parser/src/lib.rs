//! irx86-parser - Parser for the textual IR
//!
//! Converts tokens into an `irx86_ir::Module`. Only what the translator reads
//! is modeled precisely (functions, blocks, `alloca`/`store`/`call`/`ret`,
//! globals); other instructions keep their mnemonic and operands, and
//! metadata, attribute groups and target lines are skipped.
//!
//! # Example
//!
//! ```rust
//! use irx86_lexer::Lexer;
//! use irx86_parser::parse;
//!
//! let source = "define i64 @add1() {\nentry:\n  ret i64 5\n}\n";
//! let mut lexer = Lexer::new(source, 0);
//! let tokens = lexer.tokenize();
//!
//! let (module, diagnostics) = parse(tokens);
//! assert!(!diagnostics.has_errors());
//! assert_eq!(module.functions[0].name, "add1");
//! ```

pub mod parser;

pub use parser::{parse, Parser};

use irx86_error::Diagnostics;
use irx86_ir::Module;

/// Tokenizes and parses `source`, returning lexical and syntax diagnostics together
pub fn parse_source(source: &str, file_id: u32) -> (Module, Diagnostics) {
    let (tokens, mut diagnostics) = irx86_lexer::tokenize(source, file_id);
    let (module, parse_diagnostics) = parse(tokens);
    diagnostics.extend(parse_diagnostics);
    (module, diagnostics)
}
