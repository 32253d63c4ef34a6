//! irx86-ir - In-memory IR graph
//!
//! The graph the translator reads. It is built once by the front-end
//! (`irx86-parser`) or by hand, then only borrowed.
//!
//! # Architecture
//!
//! ```text
//! IR text (.ll)
//!         ↓
//!   [irx86-parser]
//!         ↓
//!   IR Module
//!   ├── Functions (declarations and definitions)
//!   │   └── Basic Blocks
//!   │       └── Instructions → operand Values
//!   └── Globals
//!         ↓
//!   [irx86-codegen]
//!         ↓
//!   x86-64 assembly text
//! ```

pub mod instruction;
pub mod module;
pub mod types;

pub use instruction::{Bare, ConstInt, InstId, Instruction, Local, Opcode, Value};
pub use module::{BasicBlock, Function, Global, Module, Param};
pub use types::IrType;
