//! IR Instructions and operand values

use crate::types::IrType;
use std::fmt;

/// Name of an instruction result, argument or block
///
/// `%x` is named; `%3` is an unnamed slot that only has a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Local {
    Named(String),
    Slot(u32),
}

impl Local {
    pub fn named(name: impl Into<String>) -> Self {
        Local::Named(name.into())
    }

    /// Symbol name, or "" for an unnamed slot
    pub fn symbol(&self) -> &str {
        match self {
            Local::Named(name) => name,
            Local::Slot(_) => "",
        }
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Local::Named(name) => write!(f, "%{}", name),
            Local::Slot(n) => write!(f, "%{}", n),
        }
    }
}

/// Position of an instruction inside its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId {
    pub block: usize,
    pub index: usize,
}

/// Fixed-width integer constant
///
/// The bits are stored truncated to the width, so `i8 255` and `i8 -1` are the
/// same constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstInt {
    width: u32,
    raw: u64,
}

impl ConstInt {
    pub fn new(width: u32, value: i128) -> Self {
        let width = width.max(1);
        Self {
            width,
            raw: (value as u64) & Self::mask(width),
        }
    }

    fn mask(width: u32) -> u64 {
        if width >= 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Value sign-extended from the constant's width to 64 bits
    pub fn sext_value(&self) -> i64 {
        if self.width >= 64 {
            self.raw as i64
        } else {
            let shift = 64 - self.width;
            ((self.raw << shift) as i64) >> shift
        }
    }

    /// Value zero-extended to 64 bits
    pub fn zext_value(&self) -> u64 {
        self.raw
    }
}

impl fmt::Display for ConstInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 1 {
            write!(f, "{}", self.raw != 0)
        } else {
            write!(f, "{}", self.sext_value())
        }
    }
}

/// Operand of an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer constant
    ConstInt(ConstInt),
    /// Result of an instruction of the enclosing function
    Inst { id: InstId, name: Local, ty: IrType },
    /// Function parameter
    Argument { index: usize, name: Local, ty: IrType },
    /// Function or global variable (`@name`)
    Global { name: String, ty: IrType },
    /// Basic block (`label %name`)
    Label(Local),
    /// Typed value without contents
    Undef(IrType),
    /// Any other constant (`null`, `zeroinitializer`, floats, strings, aggregates)
    Literal { ty: IrType, text: String },
}

impl Value {
    pub fn const_int(width: u32, value: i128) -> Self {
        Value::ConstInt(ConstInt::new(width, value))
    }

    pub fn global(name: impl Into<String>) -> Self {
        Value::Global { name: name.into(), ty: IrType::Ptr }
    }

    /// Declared type of the value
    pub fn ty(&self) -> IrType {
        match self {
            Value::ConstInt(c) => IrType::Int(c.width()),
            Value::Inst { ty, .. } | Value::Argument { ty, .. } | Value::Global { ty, .. } => ty.clone(),
            Value::Label(_) => IrType::Label,
            Value::Undef(ty) | Value::Literal { ty, .. } => ty.clone(),
        }
    }

    pub fn as_const_int(&self) -> Option<&ConstInt> {
        match self {
            Value::ConstInt(c) => Some(c),
            _ => None,
        }
    }

    /// The instruction this value is the result of
    pub fn as_inst(&self) -> Option<InstId> {
        match self {
            Value::Inst { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Renders the value without its type (`%1`, `@puts`, `5`)
    pub fn bare(&self) -> Bare<'_> {
        Bare(self)
    }
}

/// Untyped rendering of a [`Value`]
pub struct Bare<'a>(&'a Value);

impl fmt::Display for Bare<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::ConstInt(c) => write!(f, "{}", c),
            Value::Inst { name, .. } | Value::Argument { name, .. } | Value::Label(name) => {
                write!(f, "{}", name)
            }
            Value::Global { name, .. } => write!(f, "@{}", name),
            Value::Undef(_) => write!(f, "undef"),
            Value::Literal { text, .. } => write!(f, "{}", text),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty(), self.bare())
    }
}

/// Opcode classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    Alloca,
    Return,
    Store,
    Call,
    /// Every other instruction, by mnemonic
    Unknown(String),
}

impl Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic {
            "alloca" => Opcode::Alloca,
            "ret" => Opcode::Return,
            "store" => Opcode::Store,
            "call" => Opcode::Call,
            other => Opcode::Unknown(other.to_string()),
        }
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            Opcode::Alloca => "alloca",
            Opcode::Return => "ret",
            Opcode::Store => "store",
            Opcode::Call => "call",
            Opcode::Unknown(m) => m,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// IR Instruction
///
/// Operand layouts:
/// - `alloca`: `[undef <element type>]`
/// - `ret`: `[]` or `[value]`
/// - `store`: `[value, pointer]`
/// - `call`: `[args..., callee]`
///
/// An instruction read from IR text keeps that text, and `Display` prints it
/// unchanged. Instructions built in code are printed from their parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Result name, if the instruction defines one
    pub result: Option<Local>,
    /// Result type (`void` when there is none)
    pub ty: IrType,
    pub operands: Vec<Value>,
    /// Source text, flags, predicates and attachments included
    pub text: Option<String>,
}

impl Instruction {
    /// `%result = alloca <elem>`
    pub fn alloca(result: Local, elem: IrType) -> Self {
        Self {
            opcode: Opcode::Alloca,
            result: Some(result),
            ty: IrType::Ptr,
            operands: vec![Value::Undef(elem)],
            text: None,
        }
    }

    /// `store <value>, <ptr>`
    pub fn store(value: Value, ptr: Value) -> Self {
        Self {
            opcode: Opcode::Store,
            result: None,
            ty: IrType::Void,
            operands: vec![value, ptr],
            text: None,
        }
    }

    /// `[%result =] call <ret> <callee>(<args>)`
    pub fn call(result: Option<Local>, ret: IrType, callee: Value, args: Vec<Value>) -> Self {
        let mut operands = args;
        operands.push(callee);
        Self {
            opcode: Opcode::Call,
            result,
            ty: ret,
            operands,
            text: None,
        }
    }

    /// `ret <value>` or `ret void`
    pub fn ret(value: Option<Value>) -> Self {
        Self {
            opcode: Opcode::Return,
            result: None,
            ty: IrType::Void,
            operands: value.into_iter().collect(),
            text: None,
        }
    }

    /// Any instruction the translator has no template for
    pub fn unknown(mnemonic: impl Into<String>, result: Option<Local>, ty: IrType, operands: Vec<Value>) -> Self {
        Self {
            opcode: Opcode::Unknown(mnemonic.into()),
            result,
            ty,
            operands,
            text: None,
        }
    }

    /// Attaches the text the instruction was read from
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn operand(&self, index: usize) -> Option<&Value> {
        self.operands.get(index)
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// The invoked function of a call
    pub fn callee(&self) -> Option<&Value> {
        match self.opcode {
            Opcode::Call => self.operands.last(),
            _ => None,
        }
    }

    /// Element type of an alloca
    pub fn allocated_type(&self) -> Option<IrType> {
        match self.opcode {
            Opcode::Alloca => self.operands.first().map(Value::ty),
            _ => None,
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[Value]) -> fmt::Result {
    for (i, op) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", op)?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            return f.write_str(text);
        }
        if let Some(result) = &self.result {
            write!(f, "{} = ", result)?;
        }
        match &self.opcode {
            Opcode::Alloca => {
                let elem = self.allocated_type().unwrap_or(IrType::Void);
                write!(f, "alloca {}", elem)
            }
            Opcode::Return => match self.operands.first() {
                Some(value) => write!(f, "ret {}", value),
                None => write!(f, "ret void"),
            },
            Opcode::Call => {
                write!(f, "call {} ", self.ty)?;
                let (args, callee) = match self.operands.split_last() {
                    Some((callee, args)) => (args, Some(callee)),
                    None => (&self.operands[..], None),
                };
                if let Some(callee) = callee {
                    write!(f, "{}", callee.bare())?;
                }
                write!(f, "(")?;
                write_operands(f, args)?;
                write!(f, ")")
            }
            Opcode::Store | Opcode::Unknown(_) => {
                write!(f, "{}", self.opcode)?;
                if !self.operands.is_empty() {
                    write!(f, " ")?;
                    write_operands(f, &self.operands)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extension() {
        assert_eq!(ConstInt::new(8, 255).sext_value(), -1);
        assert_eq!(ConstInt::new(8, -1).sext_value(), -1);
        assert_eq!(ConstInt::new(8, 127).sext_value(), 127);
        assert_eq!(ConstInt::new(32, 5).sext_value(), 5);
        assert_eq!(ConstInt::new(32, 0xFFFF_FFFF).sext_value(), -1);
        assert_eq!(ConstInt::new(64, i64::MIN as i128).sext_value(), i64::MIN);
        assert_eq!(ConstInt::new(1, 1).sext_value(), -1);
        assert_eq!(ConstInt::new(1, 1).zext_value(), 1);
    }

    #[test]
    fn test_const_int_equality_after_truncation() {
        assert_eq!(ConstInt::new(8, 255), ConstInt::new(8, -1));
        assert_ne!(ConstInt::new(16, 255), ConstInt::new(16, -1));
    }

    #[test]
    fn test_instruction_display() {
        let slot = Value::Inst {
            id: InstId { block: 0, index: 0 },
            name: Local::Slot(1),
            ty: IrType::Ptr,
        };

        let alloca = Instruction::alloca(Local::Slot(1), IrType::Int(64));
        assert_eq!(alloca.to_string(), "%1 = alloca i64");

        let store = Instruction::store(Value::const_int(64, 5), slot.clone());
        assert_eq!(store.to_string(), "store i64 5, ptr %1");

        let ret = Instruction::ret(Some(Value::const_int(64, 5)));
        assert_eq!(ret.to_string(), "ret i64 5");
        assert_eq!(Instruction::ret(None).to_string(), "ret void");

        let load = Instruction::unknown("load", Some(Local::named("v")), IrType::Int(64), vec![slot]);
        assert_eq!(load.to_string(), "%v = load ptr %1");
    }

    #[test]
    fn test_source_text_wins_over_parts() {
        let cmp = Instruction::unknown("icmp", Some(Local::Slot(5)), IrType::Int(1), Vec::new())
            .with_text("%5 = icmp sgt i32 %4, 0");
        assert_eq!(cmp.to_string(), "%5 = icmp sgt i32 %4, 0");
        assert_eq!(cmp.ty, IrType::Int(1));
    }

    #[test]
    fn test_call_display() {
        let call = Instruction::call(
            Some(Local::Slot(2)),
            IrType::Int(32),
            Value::global("puts"),
            vec![Value::global("msg")],
        );
        assert_eq!(call.to_string(), "%2 = call i32 @puts(ptr @msg)");
        assert_eq!(call.operand(1), Some(&Value::global("puts")));
        assert_eq!(call.callee(), Some(&Value::global("puts")));
    }

    #[test]
    fn test_opcode_classification() {
        assert_eq!(Opcode::from_mnemonic("alloca"), Opcode::Alloca);
        assert_eq!(Opcode::from_mnemonic("ret"), Opcode::Return);
        assert_eq!(Opcode::from_mnemonic("add"), Opcode::Unknown("add".to_string()));
        assert_eq!(Opcode::Unknown("icmp".to_string()).mnemonic(), "icmp");
    }
}
