//! Value resolution - turning operands into immediates
//!
//! Every operand the templates print as `$N` goes through [`ValueResolver`].
//! Resolution is total: a value with no numeric meaning falls back to the
//! configured width instead of failing.

use irx86_ir::{ConstInt, Function, Instruction, IrType, Opcode, Value};

/// How a value is interpreted by the resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind<'f> {
    ConstantInteger(ConstInt),
    /// Result of an `alloca` in the enclosing function
    AllocaResult(&'f Instruction),
    Other,
}

/// A resolution result together with the diagnostic notes produced on the way
///
/// Notes are comment text without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub notes: Vec<String>,
}

impl<T> Resolved<T> {
    fn quiet(value: T) -> Self {
        Self {
            value,
            notes: Vec::new(),
        }
    }
}

/// Destination of a `store`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Stack slot of an `alloca`, by size in bytes
    StackSlot { size: i64 },
    /// Named global storage
    Symbol(String),
    /// Anything else; rendered as the fallback width
    Unknown,
}

impl Address {
    /// Operand text used in the `movq` template
    pub fn render(&self, fallback_width: i64) -> String {
        match self {
            Address::StackSlot { size } => size.to_string(),
            Address::Symbol(name) => name.clone(),
            Address::Unknown => fallback_width.to_string(),
        }
    }
}

/// Resolves operands of the instructions of one function
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'f> {
    func: &'f Function,
    fallback_width: i64,
}

impl<'f> ValueResolver<'f> {
    pub fn new(func: &'f Function, fallback_width: i64) -> Self {
        Self { func, fallback_width }
    }

    pub fn classify(&self, value: Option<&Value>) -> ValueKind<'f> {
        match value {
            Some(Value::ConstInt(c)) => ValueKind::ConstantInteger(*c),
            Some(Value::Inst { id, .. }) => match self.func.instruction(*id) {
                Some(inst) if inst.opcode == Opcode::Alloca => ValueKind::AllocaResult(inst),
                _ => ValueKind::Other,
            },
            _ => ValueKind::Other,
        }
    }

    /// Resolves a value to a signed 64-bit immediate.
    ///
    /// - constant integer: its sign-extended value
    /// - alloca result: bit width of the allocated element type / 8
    /// - anything else (including an absent operand): the fallback width
    pub fn resolve(&self, value: Option<&Value>) -> Resolved<i64> {
        match self.classify(value) {
            ValueKind::ConstantInteger(c) => Resolved::quiet(c.sext_value()),
            ValueKind::AllocaResult(inst) => {
                let ty = inst.operand(0).map(Value::ty).unwrap_or(IrType::Void);
                let width = ty.int_width();
                tracing::debug!(operands = inst.num_operands(), %ty, width, "resolved stack slot");
                Resolved {
                    value: i64::from(width / 8),
                    notes: vec![
                        format!("alloca {}", inst.num_operands()),
                        format!("type: {}", ty),
                        format!("width: {}", width),
                    ],
                }
            }
            ValueKind::Other => self.fallback(value),
        }
    }

    fn fallback(&self, value: Option<&Value>) -> Resolved<i64> {
        match value {
            Some(value) => tracing::debug!(%value, "operand is not a constant"),
            None => tracing::debug!("operand is missing"),
        }
        Resolved {
            value: self.fallback_width,
            notes: vec!["Not a constant!".to_string()],
        }
    }

    /// Resolves the destination operand of a `store`
    pub fn address(&self, value: Option<&Value>) -> Resolved<Address> {
        if let Some(Value::Global { name, .. }) = value {
            return Resolved::quiet(Address::Symbol(name.clone()));
        }
        match self.classify(value) {
            ValueKind::AllocaResult(_) => {
                let size = self.resolve(value);
                Resolved {
                    value: Address::StackSlot { size: size.value },
                    notes: size.notes,
                }
            }
            _ => {
                let fallback = self.fallback(value);
                Resolved {
                    value: Address::Unknown,
                    notes: fallback.notes,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irx86_ir::{InstId, Local};
    use pretty_assertions::assert_eq;

    fn function_with_slots() -> (Function, Value, Value) {
        let mut func = Function::define("f", IrType::Void);
        let entry = func.add_block(Some(Local::named("entry")));
        let wide = func.push(entry, Instruction::alloca(Local::Slot(1), IrType::Int(64))).unwrap();
        let narrow = func.push(entry, Instruction::alloca(Local::named("b"), IrType::Int(16))).unwrap();
        let wide = func.value(wide).unwrap();
        let narrow = func.value(narrow).unwrap();
        (func, wide, narrow)
    }

    #[test]
    fn test_constants_sign_extend() {
        let func = Function::define("f", IrType::Void);
        let resolver = ValueResolver::new(&func, 8);

        let byte = Value::const_int(8, 255);
        assert_eq!(resolver.resolve(Some(&byte)), Resolved::quiet(-1));

        let big = Value::const_int(64, 1 << 40);
        assert_eq!(resolver.resolve(Some(&big)).value, 1 << 40);

        let flag = Value::const_int(1, 1);
        assert_eq!(resolver.resolve(Some(&flag)).value, -1);
    }

    #[test]
    fn test_alloca_results_resolve_to_byte_width() {
        let (func, wide, narrow) = function_with_slots();
        let resolver = ValueResolver::new(&func, 8);

        let resolved = resolver.resolve(Some(&wide));
        assert_eq!(resolved.value, 8);
        assert_eq!(resolved.notes, vec!["alloca 1", "type: i64", "width: 64"]);

        assert_eq!(resolver.resolve(Some(&narrow)).value, 2);
    }

    #[test]
    fn test_non_integer_slot_has_zero_width() {
        let mut func = Function::define("f", IrType::Void);
        let entry = func.add_block(None);
        let id = func.push(entry, Instruction::alloca(Local::Slot(0), IrType::Ptr)).unwrap();
        let slot = func.value(id).unwrap();

        let resolved = ValueResolver::new(&func, 8).resolve(Some(&slot));
        assert_eq!(resolved.value, 0);
        assert_eq!(resolved.notes[2], "width: 0");
    }

    #[test]
    fn test_everything_else_falls_back() {
        let mut func = Function::define("f", IrType::Void);
        let arg = func.add_param(Local::named("x"), IrType::Int(32));
        let resolver = ValueResolver::new(&func, 8);

        for value in [arg, Value::global("g"), Value::Undef(IrType::Int(64))] {
            let resolved = resolver.resolve(Some(&value));
            assert_eq!(resolved.value, 8);
            assert_eq!(resolved.notes, vec!["Not a constant!"]);
        }
        assert_eq!(resolver.resolve(None).value, 8);
    }

    #[test]
    fn test_reference_to_non_alloca_instruction_is_other() {
        let mut func = Function::define("f", IrType::Void);
        let entry = func.add_block(None);
        let id = func
            .push(entry, Instruction::unknown("load", Some(Local::Slot(2)), IrType::Int(64), Vec::new()))
            .unwrap();
        let loaded = func.value(id).unwrap();
        let dangling = Value::Inst {
            id: InstId { block: 7, index: 0 },
            name: Local::Slot(9),
            ty: IrType::Ptr,
        };

        let resolver = ValueResolver::new(&func, 4);
        assert_eq!(resolver.classify(Some(&loaded)), ValueKind::Other);
        assert_eq!(resolver.resolve(Some(&loaded)).value, 4);
        assert_eq!(resolver.classify(Some(&dangling)), ValueKind::Other);
    }

    #[test]
    fn test_store_addresses() {
        let (func, wide, _) = function_with_slots();
        let resolver = ValueResolver::new(&func, 8);

        let slot = resolver.address(Some(&wide));
        assert_eq!(slot.value, Address::StackSlot { size: 8 });
        assert_eq!(slot.notes.len(), 3);

        let global = resolver.address(Some(&Value::global("counter")));
        assert_eq!(global, Resolved::quiet(Address::Symbol("counter".into())));

        let unknown = resolver.address(None);
        assert_eq!(unknown.value, Address::Unknown);
        assert_eq!(unknown.notes, vec!["Not a constant!"]);
    }

    #[test]
    fn test_address_rendering() {
        assert_eq!(Address::StackSlot { size: 4 }.render(8), "4");
        assert_eq!(Address::Symbol("counter".into()).render(8), "counter");
        assert_eq!(Address::Unknown.render(8), "8");
    }
}
