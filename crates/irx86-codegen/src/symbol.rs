//! Symbol names of IR entities

use irx86_ir::{BasicBlock, Function, Global, Value};

/// Anything that can appear as a label or call target
pub trait Symbol {
    /// Textual symbol name, "" when the entity is anonymous
    fn symbol_name(&self) -> &str;
}

impl Symbol for Value {
    fn symbol_name(&self) -> &str {
        match self {
            Value::Global { name, .. } => name,
            Value::Inst { name, .. } | Value::Argument { name, .. } | Value::Label(name) => name.symbol(),
            Value::ConstInt(_) | Value::Undef(_) | Value::Literal { .. } => "",
        }
    }
}

impl Symbol for Function {
    fn symbol_name(&self) -> &str {
        &self.name
    }
}

impl Symbol for BasicBlock {
    fn symbol_name(&self) -> &str {
        self.name()
    }
}

impl Symbol for Global {
    fn symbol_name(&self) -> &str {
        &self.name
    }
}

/// Name of an operand that may be absent
pub fn name_of(value: Option<&Value>) -> &str {
    value.map(|v| v.symbol_name()).unwrap_or("")
}
