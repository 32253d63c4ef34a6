//! End-to-end tests of the irx86 pipeline
//!
//! IR text → Lexer → Parser → IR Module → x86-64 Backend → assembly text

use irx86_codegen::{CodeGen, X86Backend};
use irx86_error::Diagnostics;
use irx86_ir::Module;
use irx86_lexer::Lexer;
use irx86_parser::parse;

/// Result of translating one IR module
#[derive(Debug)]
pub struct CompileResult {
    /// Whether the module was read without errors
    pub success: bool,
    /// Lexer and parser diagnostics, warnings included
    pub diagnostics: Diagnostics,
    /// The parsed module (also present when parsing reported errors)
    pub module: Module,
    /// Generated assembly (if successful)
    pub asm: Option<String>,
}

/// Runs IR text through the whole pipeline with default target options
pub fn compile(source: &str) -> CompileResult {
    // Phase 1: Lexing
    let mut lexer = Lexer::new(source, 0);
    let tokens = lexer.tokenize();
    let mut diagnostics = lexer.take_diagnostics();

    // Phase 2: Parsing
    let (module, parse_diags) = parse(tokens);
    diagnostics.extend(parse_diags);
    if diagnostics.has_errors() {
        return CompileResult {
            success: false,
            diagnostics,
            module,
            asm: None,
        };
    }

    // Phase 3: Code generation
    let asm = match X86Backend::default().generate(&module) {
        Ok(asm) => asm,
        Err(err) => panic!("writing to memory cannot fail: {}", err),
    };

    CompileResult {
        success: true,
        diagnostics,
        module,
        asm: Some(asm),
    }
}

/// Translates `source`, panicking with the diagnostics if it does not parse
pub fn compile_ok(source: &str) -> String {
    let result = compile(source);
    match result.asm {
        Some(asm) if result.success => asm,
        _ => panic!(
            "Expected IR to translate, but got errors:\n{:?}",
            result.diagnostics
        ),
    }
}

/// Asserts that IR text translates without errors
pub fn assert_compiles(source: &str) {
    compile_ok(source);
}

/// Asserts that IR text is rejected
pub fn assert_compile_fails(source: &str) {
    let result = compile(source);
    if result.success {
        panic!("Expected IR to be rejected, but it translated");
    }
}

/// Asserts that the assembly output contains a specific string
pub fn assert_asm_contains(source: &str, expected: &str) {
    let asm = compile_ok(source);
    if !asm.contains(expected) {
        panic!(
            "Expected assembly to contain '{}', but it didn't.\n\nGenerated assembly:\n{}",
            expected, asm
        );
    }
}

/// Asserts that the given lines appear in the output in this order (not necessarily adjacent)
pub fn assert_asm_in_order(source: &str, expected: &[&str]) {
    let asm = compile_ok(source);
    let mut lines = asm.lines();
    for wanted in expected {
        if !lines.any(|line| line == *wanted) {
            panic!(
                "Expected line '{}' (in order), but it was not found.\n\nGenerated assembly:\n{}",
                wanted, asm
            );
        }
    }
}
