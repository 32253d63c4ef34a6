//! IR Module - functions, basic blocks and global symbols

use crate::instruction::{InstId, Instruction, Local, Value};
use crate::types::IrType;

/// IR Module - one translation unit
#[derive(Debug, Default)]
pub struct Module {
    /// Name of the file the module was compiled from ("" when unknown)
    pub source_filename: String,
    /// Functions, in declaration order
    pub functions: Vec<Function>,
    /// Global variables, in declaration order
    pub globals: Vec<Global>,
}

impl Module {
    pub fn new(source_filename: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    pub fn add_global(&mut self, global: Global) {
        self.globals.push(global);
    }

    /// Finds a function by name
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Finds a global variable by name
    pub fn get_global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Number of functions that have a body
    pub fn definition_count(&self) -> usize {
        self.functions.iter().filter(|f| !f.is_declaration).count()
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Local,
    pub ty: IrType,
}

/// Function in IR
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub return_type: IrType,
    pub params: Vec<Param>,
    /// External function without a body
    pub is_declaration: bool,
    /// Basic blocks (always empty for declarations)
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// `define <ret> @name(...)`
    pub fn define(name: impl Into<String>, return_type: IrType) -> Self {
        Self {
            name: name.into(),
            return_type,
            params: Vec::new(),
            is_declaration: false,
            blocks: Vec::new(),
        }
    }

    /// `declare <ret> @name(...)`
    pub fn declare(name: impl Into<String>, return_type: IrType) -> Self {
        Self {
            is_declaration: true,
            ..Self::define(name, return_type)
        }
    }

    /// Adds a parameter and returns the value that refers to it
    pub fn add_param(&mut self, name: Local, ty: IrType) -> Value {
        let index = self.params.len();
        self.params.push(Param { name: name.clone(), ty: ty.clone() });
        Value::Argument { index, name, ty }
    }

    /// Appends a block and returns its index
    pub fn add_block(&mut self, label: Option<Local>) -> usize {
        self.blocks.push(BasicBlock::new(label));
        self.blocks.len() - 1
    }

    /// Appends an instruction to a block.
    ///
    /// Returns `None` when `block` does not exist.
    pub fn push(&mut self, block: usize, inst: Instruction) -> Option<InstId> {
        let bb = self.blocks.get_mut(block)?;
        bb.push(inst);
        Some(InstId {
            block,
            index: bb.instructions.len() - 1,
        })
    }

    pub fn instruction(&self, id: InstId) -> Option<&Instruction> {
        self.blocks.get(id.block)?.instructions.get(id.index)
    }

    /// The value an instruction defines, if it has a result
    pub fn value(&self, id: InstId) -> Option<Value> {
        let inst = self.instruction(id)?;
        let name = inst.result.clone()?;
        Some(Value::Inst {
            id,
            name,
            ty: inst.ty.clone(),
        })
    }

    /// Instructions of all blocks, in order
    pub fn instructions(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.blocks.iter().enumerate().flat_map(|(block, bb)| {
            bb.instructions
                .iter()
                .enumerate()
                .map(move |(index, inst)| (InstId { block, index }, inst))
        })
    }
}

/// Basic Block - straight-line sequence of instructions
#[derive(Debug, Default)]
pub struct BasicBlock {
    /// Block label (`None` for an unlabeled entry block)
    pub label: Option<Local>,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: Option<Local>) -> Self {
        Self {
            label,
            instructions: Vec::new(),
        }
    }

    /// Label name, or "" when the block is unlabeled or only numbered
    pub fn name(&self) -> &str {
        self.label.as_ref().map(Local::symbol).unwrap_or("")
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }
}

/// Global variable
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    /// Type of the stored value
    pub ty: IrType,
    /// `None` for `external` globals
    pub initializer: Option<Value>,
    pub is_constant: bool,
}

impl Global {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
            initializer: None,
            is_constant: false,
        }
    }

    pub fn with_init(mut self, value: Value) -> Self {
        self.initializer = Some(value);
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }
}
