//! irx86-codegen - x86-64 assembly-text generation
//!
//! Walks an IR module once and writes an AT&T-syntax listing:
//! - **Value resolution**: operand → immediate (constant, stack slot size, or fallback)
//! - **Symbol naming**: operand → label / call target
//! - **Instruction templates**: `alloca`, `ret`, `store`, `call`; anything else
//!   becomes a single comment line
//!
//! # Example
//!
//! ```rust
//! use irx86_codegen::{CodeGen, X86Backend};
//! use irx86_ir::{Function, Instruction, IrType, Local, Module, Value};
//!
//! let mut module = Module::new("add1.c");
//! let mut func = Function::define("add1", IrType::Int(64));
//! let entry = func.add_block(Some(Local::named("entry")));
//! func.push(entry, Instruction::ret(Some(Value::const_int(64, 5))));
//! module.add_function(func);
//!
//! let asm = X86Backend::default().generate(&module).unwrap();
//! assert!(asm.contains("movl\t$5, %eax"));
//! ```

pub mod resolve;
pub mod symbol;
pub mod x86_backend;

pub use resolve::{Address, Resolved, ValueKind, ValueResolver};
pub use symbol::{name_of, Symbol};
pub use x86_backend::X86Backend;

/// Trait for code generation backends
pub trait CodeGen {
    /// Backend output type
    type Output;

    /// Generates code from the IR module
    fn generate(&self, module: &irx86_ir::Module) -> Self::Output;
}

/// Target conventions of the emitted listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOptions {
    /// Program entry point as named in the IR
    pub entry_symbol: String,
    /// Name the linker expects for the entry point
    pub entry_alias: String,
    /// Prefix the platform ABI puts on external symbols
    pub extern_prefix: String,
    /// Immediate used for operands with no numeric interpretation
    pub fallback_width: i64,
    /// Tag of the trailing comment that echoes each IR instruction
    pub echo_tag: String,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            entry_symbol: "main".to_string(),
            entry_alias: "_main".to_string(),
            extern_prefix: "_".to_string(),
            fallback_width: 8,
            echo_tag: "IR".to_string(),
        }
    }
}
