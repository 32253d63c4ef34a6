//! x86-64 Backend - AT&T-syntax assembly text
//!
//! Single forward pass over the module: header, functions in declaration
//! order, then globals. Output is written as it is produced; nothing is
//! patched afterwards. Instructions without a template become one comment
//! line, so any module can be listed.

use crate::resolve::ValueResolver;
use crate::symbol::{name_of, Symbol};
use crate::{CodeGen, TargetOptions};
use irx86_ir::{Function, Instruction, Module, Opcode};
use std::io::{self, Write};

/// x86-64 assembly-text backend
#[derive(Debug, Clone, Default)]
pub struct X86Backend {
    options: TargetOptions,
}

impl X86Backend {
    pub fn new(options: TargetOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TargetOptions {
        &self.options
    }

    /// Writes the listing for `module` to `out`
    pub fn emit<W: Write>(&self, module: &Module, out: &mut W) -> io::Result<()> {
        self.emit_header(module, out)?;

        for func in &module.functions {
            self.emit_function(func, out)?;
            writeln!(out)?;
        }

        for global in &module.globals {
            // initializers are not translated; every global gets the same placeholder
            writeln!(out, "{}: .string \"\"", global.symbol_name())?;
        }

        tracing::debug!(
            functions = module.functions.len(),
            globals = module.globals.len(),
            "emitted module"
        );
        Ok(())
    }

    fn emit_header<W: Write>(&self, module: &Module, out: &mut W) -> io::Result<()> {
        if !module.source_filename.is_empty() {
            writeln!(out, "# Source File: {}", module.source_filename)?;
        }
        writeln!(out, ".global {}", self.options.entry_alias)?;
        writeln!(out, ".equ {}, {}", self.options.entry_alias, self.options.entry_symbol)
    }

    fn emit_function<W: Write>(&self, func: &Function, out: &mut W) -> io::Result<()> {
        let name = func.symbol_name();

        if func.is_declaration {
            tracing::trace!(function = name, "external declaration");
            writeln!(out, "# External function declaration: {}", name)?;
            return writeln!(out, ".equ {}, {}{}", name, self.options.extern_prefix, name);
        }

        tracing::debug!(function = name, blocks = func.blocks.len(), "emitting function");
        writeln!(out, "{}:\t# Function", name)?;
        writeln!(out, "\tpushq\t%rbp     \t# Save Old Base Pointer")?;
        writeln!(out, "\tmovq\t%rsp, %rbp\t# Save Old Stack Pointer")?;

        let resolver = ValueResolver::new(func, self.options.fallback_width);
        for block in &func.blocks {
            let label = block.symbol_name();
            if !label.is_empty() {
                writeln!(out, "{}:\t# Basic Block", label)?;
            }
            for inst in &block.instructions {
                self.emit_instruction(&resolver, inst, out)?;
            }
        }
        Ok(())
    }

    fn emit_instruction<W: Write>(
        &self,
        resolver: &ValueResolver<'_>,
        inst: &Instruction,
        out: &mut W,
    ) -> io::Result<()> {
        tracing::trace!(%inst, "translating");

        match &inst.opcode {
            Opcode::Alloca => {
                let size = resolver.resolve(inst.operand(0));
                self.emit_notes(&size.notes, out)?;
                self.echo(&format!("subq\t${}, %rsp", size.value), inst, out)
            }
            Opcode::Return => {
                let value = resolver.resolve(inst.operand(0));
                self.emit_notes(&value.notes, out)?;
                self.echo(&format!("movl\t${}, %eax", value.value), inst, out)?;
                writeln!(out, "\tmovq\t%rbp, %rsp\t# Restore Old Stack Pointer")?;
                writeln!(out, "\tpopq\t%rbp     \t# Restore Old Base Pointer")?;
                writeln!(out, "\tretq            \t# Return from function")
            }
            Opcode::Store => {
                let value = resolver.resolve(inst.operand(0));
                let dest = resolver.address(inst.operand(1));
                self.emit_notes(&value.notes, out)?;
                self.emit_notes(&dest.notes, out)?;
                let dest = dest.value.render(self.options.fallback_width);
                self.echo(&format!("movq\t${}, {}", value.value, dest), inst, out)
            }
            Opcode::Call => {
                // operands are `args..., callee`
                let target = name_of(inst.operand(1));
                self.echo(&format!("callq\t{:<8}", target), inst, out)
            }
            Opcode::Unknown(mnemonic) => {
                tracing::debug!(mnemonic = mnemonic.as_str(), "no template for instruction");
                self.echo("# UNKNOWN INSTRUCTION", inst, out)
            }
        }
    }

    /// Writes one assembly line followed by the IR it came from
    fn echo<W: Write>(&self, asm: &str, inst: &Instruction, out: &mut W) -> io::Result<()> {
        writeln!(out, "\t{}\t# {}: {}", asm, self.options.echo_tag, inst)
    }

    fn emit_notes<W: Write>(&self, notes: &[String], out: &mut W) -> io::Result<()> {
        for note in notes {
            writeln!(out, "# {}", note)?;
        }
        Ok(())
    }
}

impl CodeGen for X86Backend {
    type Output = io::Result<String>;

    fn generate(&self, module: &Module) -> Self::Output {
        let mut buffer = Vec::new();
        self.emit(module, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irx86_ir::{Global, IrType, Local, Value};
    use pretty_assertions::assert_eq;

    fn generate(module: &Module) -> String {
        X86Backend::default().generate(module).unwrap()
    }

    fn add1_module() -> Module {
        let mut module = Module::new("add1.c");
        let mut func = Function::define("add1", IrType::Int(64));
        let entry = func.add_block(Some(Local::named("entry")));
        let slot = func.push(entry, Instruction::alloca(Local::Slot(1), IrType::Int(64))).unwrap();
        let slot = func.value(slot).unwrap();
        func.push(entry, Instruction::store(Value::const_int(64, 5), slot));
        func.push(entry, Instruction::ret(Some(Value::const_int(64, 5))));
        module.add_function(func);
        module
    }

    #[test]
    fn test_add1_listing() {
        let expected = "\
# Source File: add1.c
.global _main
.equ _main, main
add1:\t# Function
\tpushq\t%rbp     \t# Save Old Base Pointer
\tmovq\t%rsp, %rbp\t# Save Old Stack Pointer
entry:\t# Basic Block
# Not a constant!
\tsubq\t$8, %rsp\t# IR: %1 = alloca i64
# alloca 1
# type: i64
# width: 64
\tmovq\t$5, 8\t# IR: store i64 5, ptr %1
\tmovl\t$5, %eax\t# IR: ret i64 5
\tmovq\t%rbp, %rsp\t# Restore Old Stack Pointer
\tpopq\t%rbp     \t# Restore Old Base Pointer
\tretq            \t# Return from function

";
        assert_eq!(generate(&add1_module()), expected);
    }

    #[test]
    fn test_declaration_emits_only_alias() {
        let mut module = Module::default();
        module.add_function(Function::declare("puts", IrType::Int(32)));

        let expected = "\
.global _main
.equ _main, main
# External function declaration: puts
.equ puts, _puts

";
        assert_eq!(generate(&module), expected);
    }

    #[test]
    fn test_unknown_instruction_is_one_line() {
        let mut module = Module::default();
        let mut func = Function::define("f", IrType::Void);
        let block = func.add_block(None);
        func.push(
            block,
            Instruction::unknown("fence", None, IrType::Void, Vec::new()),
        );
        module.add_function(func);

        let asm = generate(&module);
        let body: Vec<&str> = asm.lines().skip(5).collect();
        assert_eq!(body, vec!["\t# UNKNOWN INSTRUCTION\t# IR: fence", ""]);
    }

    #[test]
    fn test_functions_keep_declaration_order() {
        let mut module = Module::default();
        for name in ["zeta", "alpha", "mid"] {
            let mut func = Function::define(name, IrType::Void);
            let block = func.add_block(None);
            func.push(block, Instruction::ret(None));
            module.add_function(func);
        }

        let asm = generate(&module);
        let labels: Vec<&str> = asm
            .lines()
            .filter_map(|line| line.strip_suffix(":\t# Function"))
            .collect();
        assert_eq!(labels, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_ret_void_uses_fallback() {
        let mut module = Module::default();
        let mut func = Function::define("f", IrType::Void);
        let block = func.add_block(None);
        func.push(block, Instruction::ret(None));
        module.add_function(func);

        let asm = generate(&module);
        assert!(asm.contains("# Not a constant!\n\tmovl\t$8, %eax\t# IR: ret void\n"));
        // unlabeled block: no label line
        assert!(!asm.contains("# Basic Block"));
    }

    #[test]
    fn test_call_names_callee() {
        let mut module = Module::default();
        let mut func = Function::define("main", IrType::Int(32));
        let block = func.add_block(Some(Local::named("entry")));
        func.push(
            block,
            Instruction::call(
                Some(Local::Slot(1)),
                IrType::Int(32),
                Value::global("puts"),
                vec![Value::global("msg")],
            ),
        );
        func.push(block, Instruction::call(None, IrType::Void, Value::global("abort"), Vec::new()));
        module.add_function(func);

        let asm = generate(&module);
        assert!(asm.contains("\tcallq\tputs    \t# IR: %1 = call i32 @puts(ptr @msg)\n"));
        // a call without arguments has no operand 1
        assert!(asm.contains("\tcallq\t        \t# IR: call void @abort()\n"));
    }

    #[test]
    fn test_store_destinations() {
        let mut module = Module::default();
        let mut func = Function::define("f", IrType::Void);
        let arg = func.add_param(Local::named("p"), IrType::Ptr);
        let block = func.add_block(None);
        func.push(block, Instruction::store(Value::const_int(32, -2), Value::global("counter")));
        func.push(block, Instruction::store(Value::const_int(32, 3), arg));
        module.add_function(func);

        let asm = generate(&module);
        assert!(asm.contains("\tmovq\t$-2, counter\t# IR: store i32 -2, ptr @counter\n"));
        assert!(asm.contains("# Not a constant!\n\tmovq\t$3, 8\t# IR: store i32 3, ptr %p\n"));
    }

    #[test]
    fn test_globals_follow_functions() {
        let mut module = add1_module();
        module.add_global(Global::new("msg", IrType::Array(6, Box::new(IrType::Int(8)))).constant());
        module.add_global(Global::new("counter", IrType::Int(32)));

        let asm = generate(&module);
        assert!(asm.ends_with("\tretq            \t# Return from function\n\nmsg: .string \"\"\ncounter: .string \"\"\n"));
    }

    #[test]
    fn test_empty_source_filename_has_no_header_comment() {
        let asm = generate(&Module::default());
        assert_eq!(asm, ".global _main\n.equ _main, main\n");
    }

    #[test]
    fn test_target_options() {
        let options = TargetOptions {
            entry_alias: "start".into(),
            extern_prefix: String::new(),
            echo_tag: "LLVM".into(),
            fallback_width: 4,
            ..TargetOptions::default()
        };
        let mut module = Module::default();
        module.add_function(Function::declare("puts", IrType::Int(32)));
        let mut func = Function::define("main", IrType::Void);
        let block = func.add_block(None);
        func.push(block, Instruction::ret(None));
        module.add_function(func);

        let asm = X86Backend::new(options).generate(&module).unwrap();
        assert!(asm.starts_with(".global start\n.equ start, main\n"));
        assert!(asm.contains(".equ puts, puts\n"));
        assert!(asm.contains("\tmovl\t$4, %eax\t# LLVM: ret void\n"));
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_errors_propagate() {
        let err = X86Backend::default().emit(&add1_module(), &mut FailingSink).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
