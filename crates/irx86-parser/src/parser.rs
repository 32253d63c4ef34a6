//! Parser for the textual IR
//!
//! Recursive descent over the token stream. Builds an `irx86_ir::Module`
//! and records problems as diagnostics instead of stopping at the first one.
//! Constructs the translator has no use for (metadata, attribute groups,
//! target information) are recognized and skipped.

use irx86_error::{Diagnostic, Diagnostics, ErrorCode, Span};
use irx86_ir::{Function, Global, InstId, Instruction, IrType, Local, Module, Opcode, Value};
use irx86_lexer::{Token, TokenKind};
use std::collections::HashMap;

/// Opcodes that may appear as constant expressions inside operands
const CONSTANT_EXPRESSIONS: &[&str] = &[
    "getelementptr",
    "bitcast",
    "ptrtoint",
    "inttoptr",
    "addrspacecast",
    "trunc",
    "zext",
    "sext",
    "add",
    "sub",
    "mul",
    "shl",
    "xor",
    "icmp",
    "select",
    "blockaddress",
    "dso_local_equivalent",
    "no_cfi",
];

/// Keywords that stand for a constant value
const VALUE_KEYWORDS: &[&str] = &["true", "false", "null", "undef", "poison", "zeroinitializer", "none"];

/// An operand as written. Locals are bound once the whole body has been read,
/// since a value may be used before the line that defines it.
#[derive(Debug)]
enum Operand {
    Ready(Value),
    Local { local: Local, ty: IrType, span: Span },
}

/// A local operand waiting for its definition
#[derive(Debug)]
struct Fixup {
    inst: InstId,
    operand: usize,
    local: Local,
    span: Span,
}

/// State of the function body being read
#[derive(Debug, Default)]
struct Body {
    /// Parameters and instruction results, with their definition site
    values: HashMap<Local, (Value, Span)>,
    /// Block labels, with their definition site
    labels: HashMap<Local, Span>,
    fixups: Vec<Fixup>,
    current_block: Option<usize>,
    /// Number the next unnamed definition would get
    next_slot: u32,
}

impl Body {
    fn define(&mut self, local: Local, value: Value, span: Span, diagnostics: &mut Diagnostics) {
        if let Some((_, previous)) = self.values.get(&local) {
            diagnostics.push(
                Diagnostic::error(format!("redefinition of value '{}'", local))
                    .with_code(ErrorCode::DUPLICATE_DEFINITION)
                    .with_label(span, "defined again here")
                    .with_secondary_label(*previous, "first defined here"),
            );
            return;
        }
        self.values.insert(local, (value, span));
    }
}

/// What the generic instruction reader found on a line
#[derive(Debug, Default)]
struct GenericOperands {
    operands: Vec<Operand>,
    /// Types in the order they are written
    types: Vec<IrType>,
    /// A `to` was read; the next type is the cast target
    casting: bool,
    cast_target: Option<IrType>,
}

impl GenericOperands {
    fn saw_type(&mut self, ty: &IrType) {
        if self.casting && self.cast_target.is_none() {
            self.cast_target = Some(ty.clone());
        }
        self.types.push(ty.clone());
    }

    /// Result type of `mnemonic`, derived from the types on its line
    fn result_type(&self, mnemonic: &str) -> IrType {
        if let Some(target) = &self.cast_target {
            return target.clone();
        }
        let first = self.types.first().cloned().unwrap_or(IrType::Void);
        match mnemonic {
            "icmp" | "fcmp" => match first {
                IrType::Vector(lanes, _) => IrType::Vector(lanes, Box::new(IrType::Int(1))),
                _ => IrType::Int(1),
            },
            "getelementptr" => IrType::Ptr,
            // `select i1 %c, T %a, T %b` and `va_arg ptr %ap, T`
            "select" | "va_arg" => self.types.get(1).cloned().unwrap_or(first),
            _ => first,
        }
    }
}

/// Parser for the textual IR
pub struct Parser {
    /// Tokens to be parsed
    tokens: Vec<Token>,
    /// Current position
    pos: usize,
    /// Accumulated diagnostics
    diagnostics: Diagnostics,
    /// Definition site of every function and global
    symbols: HashMap<String, Span>,
    /// Where `source_filename` was set, if it was
    source_filename_at: Option<Span>,
}

impl Parser {
    /// Creates a new parser
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, span));
        }

        Self {
            tokens,
            pos: 0,
            diagnostics: Diagnostics::new(),
            symbols: HashMap::new(),
            source_filename_at: None,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes and returns the diagnostics
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    // =========================================
    // Helpers
    // =========================================

    /// Token `offset` places ahead; the trailing `Eof` repeats forever
    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn check_ident(&self, word: &str) -> bool {
        self.peek_kind().is_ident(word)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn is_at_line_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof)
    }

    /// Advances and returns the token that was current
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Requires a specific token or reports an error
    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
            Err(())
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skips to the end of the current line, leaving the newline in place
    fn skip_rest_of_line(&mut self) {
        while !self.is_at_line_end() {
            self.advance();
        }
    }

    /// Skips a top-level entity that may continue across lines inside braces
    fn skip_entity(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Newline if depth == 0 => return,
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn error_at_current(&mut self, code: ErrorCode, message: &str) {
        let token = self.peek().clone();
        self.diagnostics.push(
            Diagnostic::error(message)
                .with_code(code)
                .with_label(token.span, format!("found: {}", token.kind)),
        );
    }

    /// Skips to the next line that starts a top-level entity
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if matches!(self.advance().kind, TokenKind::Newline) && self.at_top_level_start() {
                return;
            }
        }
    }

    fn at_top_level_start(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Ident(word) => matches!(
                word.as_str(),
                "define" | "declare" | "source_filename" | "target" | "attributes"
            ),
            TokenKind::GlobalName(_) | TokenKind::Metadata(_) | TokenKind::Comdat(_) => true,
            _ => false,
        }
    }

    fn is_type_keyword(word: &str) -> bool {
        IrType::from_keyword(word).is_some()
    }

    /// Whether the current token can only begin a type
    fn at_type_start(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Ident(word) => Self::is_type_keyword(word),
            TokenKind::LocalName(_) | TokenKind::LocalSlot(_) | TokenKind::LBrace => true,
            TokenKind::LBracket | TokenKind::Less => self.at_sequence_type(),
            _ => false,
        }
    }

    /// `[N x T]` or `<N x T>`, as opposed to a bracketed value
    fn at_sequence_type(&self) -> bool {
        let counted = matches!(self.peek_at(1).kind, TokenKind::Int(_)) && self.peek_at(2).kind.is_ident("x");
        let packed = matches!(self.peek_kind(), TokenKind::Less) && matches!(self.peek_at(1).kind, TokenKind::LBrace);
        counted || packed
    }

    /// `{ T, T }`, as opposed to a constant aggregate `{ T v, T v }`
    fn at_struct_type(&self) -> bool {
        match &self.peek_at(1).kind {
            TokenKind::RBrace => true,
            TokenKind::Ident(word) if Self::is_type_keyword(word) => {
                matches!(self.peek_at(2).kind, TokenKind::Comma | TokenKind::RBrace)
            }
            _ => false,
        }
    }

    /// Reads a balanced bracketed group (or a single token) and returns its text
    fn capture_balanced(&mut self) -> Result<String, ()> {
        let start = self.peek().span;
        let mut depth = 0usize;
        let mut kinds = Vec::new();

        loop {
            let kind = self.peek_kind().clone();
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::Less => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Greater => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Newline | TokenKind::Eof => {
                    self.diagnostics.push(
                        Diagnostic::error("unbalanced brackets")
                            .with_code(ErrorCode::INVALID_SYNTAX)
                            .with_label(start, "opened here and never closed on this line"),
                    );
                    return Err(());
                }
                _ => {}
            }
            self.advance();
            kinds.push(kind);
            if depth == 0 {
                return Ok(spell(&kinds));
            }
        }
    }

    /// Skips flags and attributes (`dso_local`, `noundef`, `align 8`,
    /// `dereferenceable(8)`, `#0`) up to the next type or value
    fn skip_attributes(&mut self) -> Result<(), ()> {
        loop {
            match self.peek_kind().clone() {
                TokenKind::Ident(word)
                    if !Self::is_type_keyword(&word) && !VALUE_KEYWORDS.contains(&word.as_str()) =>
                {
                    if CONSTANT_EXPRESSIONS.contains(&word.as_str())
                        && matches!(self.peek_at(1).kind, TokenKind::LParen)
                    {
                        return Ok(());
                    }
                    self.advance();
                    match self.peek_kind() {
                        TokenKind::LParen => {
                            self.capture_balanced()?;
                        }
                        TokenKind::Int(_) if word == "align" || word == "addrspace" => {
                            self.advance();
                        }
                        TokenKind::Str(_) if matches!(word.as_str(), "section" | "partition" | "gc") => {
                            self.advance();
                        }
                        _ => {}
                    }
                }
                TokenKind::AttrGroup(_) => {
                    self.advance();
                }
                _ => return Ok(()),
            }
        }
    }

    // =========================================
    // Main parsing
    // =========================================

    /// Parses the whole module
    pub fn parse(&mut self) -> Module {
        let mut module = Module::default();
        self.skip_newlines();

        while !self.is_at_end() {
            match self.parse_top_level(&mut module) {
                Ok(()) => {
                    if !self.is_at_line_end() {
                        self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected end of line");
                        self.synchronize();
                    }
                }
                Err(()) => self.synchronize(),
            }
            self.skip_newlines();
        }

        tracing::debug!(
            functions = module.functions.len(),
            globals = module.globals.len(),
            errors = self.diagnostics.error_count(),
            "parsed module"
        );
        module
    }

    fn parse_top_level(&mut self, module: &mut Module) -> Result<(), ()> {
        match self.peek_kind().clone() {
            TokenKind::Ident(word) => match word.as_str() {
                "source_filename" => self.parse_source_filename(module),
                "define" | "declare" => {
                    let func = self.parse_function()?;
                    module.add_function(func);
                    Ok(())
                }
                "target" | "attributes" | "module" | "uselistorder" | "uselistorder_bb" => {
                    self.skip_entity();
                    Ok(())
                }
                _ => {
                    self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected a top-level entity");
                    Err(())
                }
            },
            TokenKind::GlobalName(_) => {
                if let Some(global) = self.parse_global()? {
                    module.add_global(global);
                }
                Ok(())
            }
            // named types, metadata and comdats
            TokenKind::LocalName(_) | TokenKind::LocalSlot(_) | TokenKind::Metadata(_) | TokenKind::Comdat(_) => {
                self.skip_entity();
                Ok(())
            }
            _ => {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected a top-level entity");
                Err(())
            }
        }
    }

    /// Parse: `source_filename = "name"`
    fn parse_source_filename(&mut self, module: &mut Module) -> Result<(), ()> {
        let keyword = self.advance();
        self.expect(&TokenKind::Equals, "expected '=' after source_filename")?;

        let name = match self.peek_kind().clone() {
            TokenKind::Str(text) => {
                self.advance();
                unquote(&text)
            }
            _ => {
                self.error_at_current(ErrorCode::EXPECTED_VALUE, "expected a quoted file name");
                return Err(());
            }
        };

        if let Some(previous) = self.source_filename_at {
            self.diagnostics.push(
                Diagnostic::warning("source_filename is set more than once")
                    .with_label(keyword.span, "this one is used")
                    .with_secondary_label(previous, "earlier value ignored"),
            );
        }
        self.source_filename_at = Some(keyword.span);
        module.source_filename = name;
        Ok(())
    }

    fn define_symbol(&mut self, name: &str, span: Span) {
        if let Some(previous) = self.symbols.get(name) {
            self.diagnostics.push(
                Diagnostic::error(format!("redefinition of symbol '@{}'", name))
                    .with_code(ErrorCode::DUPLICATE_DEFINITION)
                    .with_label(span, "defined again here")
                    .with_secondary_label(*previous, "first defined here"),
            );
        } else {
            self.symbols.insert(name.to_string(), span);
        }
    }

    // =========================================
    // Globals
    // =========================================

    /// Parse: `@name = [linkage...] global|constant <type> [init] [, align N ...]`
    ///
    /// Aliases and ifuncs are skipped with a warning.
    fn parse_global(&mut self) -> Result<Option<Global>, ()> {
        let name_token = self.advance();
        let name = match &name_token.kind {
            TokenKind::GlobalName(name) => name.clone(),
            _ => return Err(()),
        };
        self.expect(&TokenKind::Equals, "expected '=' after global name")?;

        let mut external = false;
        let is_constant = loop {
            match self.peek_kind().clone() {
                TokenKind::Ident(word) => match word.as_str() {
                    "global" => break false,
                    "constant" => break true,
                    "alias" | "ifunc" => {
                        self.diagnostics.push(
                            Diagnostic::warning(format!("{} '@{}' is not translated", word, name))
                                .with_label(name_token.span, "skipped"),
                        );
                        self.skip_entity();
                        return Ok(None);
                    }
                    "external" | "extern_weak" => {
                        external = true;
                        self.advance();
                    }
                    _ => {
                        self.advance();
                        if self.check(&TokenKind::LParen) {
                            self.capture_balanced()?;
                        }
                    }
                },
                _ => {
                    self.error_at_current(ErrorCode::INVALID_SYNTAX, "expected 'global' or 'constant'");
                    return Err(());
                }
            }
        };
        self.advance();

        let ty = self.parse_type()?;
        let mut global = Global::new(name.clone(), ty.clone());
        if is_constant {
            global = global.constant();
        }

        if !external && !self.check(&TokenKind::Comma) && !self.is_at_line_end() {
            match self.parse_value(&ty)? {
                Operand::Ready(value) => global = global.with_init(value),
                Operand::Local { span, .. } => {
                    self.diagnostics.push(
                        Diagnostic::error("global initializer must be a constant")
                            .with_code(ErrorCode::EXPECTED_VALUE)
                            .with_label(span, "local value used here"),
                    );
                    return Err(());
                }
            }
        }

        // section, align, comdat, metadata attachments
        self.skip_rest_of_line();
        self.define_symbol(&name, name_token.span);
        Ok(Some(global))
    }

    // =========================================
    // Types
    // =========================================

    fn parse_type(&mut self) -> Result<IrType, ()> {
        let mut ty = match self.peek_kind().clone() {
            TokenKind::Ident(word) => match IrType::from_keyword(&word) {
                Some(ty) => {
                    self.advance();
                    ty
                }
                None => return self.expected_type(),
            },
            TokenKind::LocalName(name) => {
                self.advance();
                IrType::Named(name)
            }
            TokenKind::LocalSlot(n) => {
                self.advance();
                IrType::Named(n.to_string())
            }
            TokenKind::LBracket => {
                self.advance();
                let (len, elem) = self.parse_sequence_type()?;
                self.expect(&TokenKind::RBracket, "expected ']' after array type")?;
                IrType::Array(len, Box::new(elem))
            }
            TokenKind::Less => {
                self.advance();
                if self.check(&TokenKind::LBrace) {
                    let fields = self.parse_struct_fields()?;
                    self.expect(&TokenKind::Greater, "expected '>' after packed struct")?;
                    IrType::Struct { fields, packed: true }
                } else {
                    let (len, elem) = self.parse_sequence_type()?;
                    self.expect(&TokenKind::Greater, "expected '>' after vector type")?;
                    IrType::Vector(len, Box::new(elem))
                }
            }
            TokenKind::LBrace => IrType::Struct {
                fields: self.parse_struct_fields()?,
                packed: false,
            },
            _ => return self.expected_type(),
        };

        loop {
            if self.match_token(&TokenKind::Star) {
                // typed pointer syntax of older IR
                ty = IrType::Ptr;
            } else if self.check(&TokenKind::LParen) {
                ty = self.parse_function_type(ty)?;
            } else if self.check_ident("addrspace") && matches!(ty, IrType::Ptr) {
                self.advance();
                self.capture_balanced()?;
            } else {
                return Ok(ty);
            }
        }
    }

    fn expected_type<T>(&mut self) -> Result<T, ()> {
        self.error_at_current(ErrorCode::EXPECTED_TYPE, "expected a type");
        Err(())
    }

    /// Parse the inside of `[N x T]` / `<N x T>`
    fn parse_sequence_type(&mut self) -> Result<(u64, IrType), ()> {
        let len = match self.peek_kind().clone() {
            TokenKind::Int(n) if n >= 0 && n <= u64::MAX as i128 => {
                self.advance();
                n as u64
            }
            _ => {
                self.error_at_current(ErrorCode::INVALID_SYNTAX, "expected an element count");
                return Err(());
            }
        };
        if !self.check_ident("x") {
            self.error_at_current(ErrorCode::INVALID_SYNTAX, "expected 'x' after element count");
            return Err(());
        }
        self.advance();
        Ok((len, self.parse_type()?))
    }

    /// Parse: `{ T, T, ... }`
    fn parse_struct_fields(&mut self) -> Result<Vec<IrType>, ()> {
        self.expect(&TokenKind::LBrace, "expected '{'")?;
        let mut fields = Vec::new();
        if self.match_token(&TokenKind::RBrace) {
            return Ok(fields);
        }
        loop {
            fields.push(self.parse_type()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "expected '}' after struct fields")?;
        Ok(fields)
    }

    /// Parse: `(T, T, ...)` following a return type
    fn parse_function_type(&mut self, ret: IrType) -> Result<IrType, ()> {
        self.expect(&TokenKind::LParen, "expected '('")?;
        let mut params = Vec::new();
        let mut varargs = false;

        while !self.check(&TokenKind::RParen) {
            if self.match_token(&TokenKind::Ellipsis) {
                varargs = true;
            } else {
                params.push(self.parse_type()?);
                self.skip_attributes()?;
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "expected ')' after parameter types")?;

        Ok(IrType::Function {
            ret: Box::new(ret),
            params,
            varargs,
        })
    }

    // =========================================
    // Values
    // =========================================

    /// Parses one operand of type `ty`
    fn parse_value(&mut self, ty: &IrType) -> Result<Operand, ()> {
        if *ty == IrType::Metadata && self.at_type_start() {
            // `metadata ptr %1` wraps a value; it stays opaque
            let (inner_ty, inner) = self.parse_typed_value()?;
            let inner = match inner {
                Operand::Ready(value) => value.bare().to_string(),
                Operand::Local { local, .. } => local.to_string(),
            };
            return Ok(Operand::Ready(Value::Literal {
                ty: IrType::Metadata,
                text: format!("{} {}", inner_ty, inner),
            }));
        }

        let token = self.peek().clone();
        let literal = |text: String| Value::Literal { ty: ty.clone(), text };

        let value = match token.kind {
            TokenKind::Int(v) => {
                self.advance();
                match ty {
                    IrType::Int(width) => Value::const_int(*width, v),
                    _ => literal(v.to_string()),
                }
            }
            TokenKind::Float(text) | TokenKind::Str(text) => {
                self.advance();
                literal(text)
            }
            TokenKind::GlobalName(name) => {
                self.advance();
                Value::global(name)
            }
            TokenKind::LocalName(name) => {
                self.advance();
                return Ok(local_operand(Local::Named(name), ty, token.span));
            }
            TokenKind::LocalSlot(n) => {
                self.advance();
                return Ok(local_operand(Local::Slot(n), ty, token.span));
            }
            TokenKind::Metadata(name) => {
                self.advance();
                let mut text = format!("!{}", name);
                if self.check(&TokenKind::LBrace) || self.check(&TokenKind::LParen) {
                    text.push_str(&self.capture_balanced()?);
                }
                literal(text)
            }
            TokenKind::LBracket | TokenKind::LBrace | TokenKind::Less => literal(self.capture_balanced()?),
            TokenKind::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.advance();
                    let bit = i128::from(word == "true");
                    match ty {
                        IrType::Int(width) => Value::const_int(*width, bit),
                        _ => literal(word.clone()),
                    }
                }
                "undef" => {
                    self.advance();
                    Value::Undef(ty.clone())
                }
                "null" | "poison" | "zeroinitializer" | "none" => {
                    self.advance();
                    literal(word.clone())
                }
                _ if matches!(self.peek_at(1).kind, TokenKind::LParen) => {
                    self.advance();
                    let group = self.capture_balanced()?;
                    literal(format!("{} {}", word, group))
                }
                _ if CONSTANT_EXPRESSIONS.contains(&word.as_str()) => {
                    // `getelementptr inbounds (...)` carries flags before the group
                    self.advance();
                    let mut text = word.clone();
                    while let Some(flag) = self.peek_kind().ident().map(str::to_string) {
                        text.push(' ');
                        text.push_str(&flag);
                        self.advance();
                    }
                    let group = self.capture_balanced()?;
                    literal(format!("{} {}", text, group))
                }
                _ => return self.expected_value(),
            },
            _ => return self.expected_value(),
        };

        Ok(Operand::Ready(value))
    }

    fn expected_value<T>(&mut self) -> Result<T, ()> {
        self.error_at_current(ErrorCode::EXPECTED_VALUE, "expected a value");
        Err(())
    }

    /// Parse: `<type> [attributes] <value>`
    fn parse_typed_value(&mut self) -> Result<(IrType, Operand), ()> {
        let ty = self.parse_type()?;
        self.skip_attributes()?;
        let value = self.parse_value(&ty)?;
        Ok((ty, value))
    }

    // =========================================
    // Functions
    // =========================================

    /// Parse: `define|declare [flags] <ret> @name(<params>) [attrs] [{ body }]`
    fn parse_function(&mut self) -> Result<Function, ()> {
        let is_definition = self.advance().kind.is_ident("define");

        self.skip_attributes()?;
        if !self.at_type_start() {
            return self.expected_type();
        }
        let return_type = self.parse_type()?;

        let name_token = self.expect(&TokenKind::GlobalName(String::new()), "expected function name")?;
        let name = match name_token.kind {
            TokenKind::GlobalName(name) => name,
            _ => return Err(()),
        };
        self.define_symbol(&name, name_token.span);

        let mut func = if is_definition {
            Function::define(name, return_type)
        } else {
            Function::declare(name, return_type)
        };

        let mut body = Body::default();
        self.parse_params(&mut func, &mut body)?;

        // unnamed_addr, #0, section "...", personality ptr @f, !dbg !7
        while !self.is_at_line_end() && !self.check(&TokenKind::LBrace) {
            self.advance();
        }

        if is_definition {
            self.skip_newlines();
            self.expect(&TokenKind::LBrace, "expected '{' to start the function body")?;
            self.parse_body(&mut func, body)?;
        }

        tracing::trace!(
            function = %func.name,
            declaration = func.is_declaration,
            blocks = func.blocks.len(),
            "parsed function"
        );
        Ok(func)
    }

    /// Parse: `(<type> [attrs] [%name], ..., [...])`
    fn parse_params(&mut self, func: &mut Function, body: &mut Body) -> Result<(), ()> {
        self.expect(&TokenKind::LParen, "expected '(' after function name")?;
        let mut unnamed = 0u32;

        while !self.check(&TokenKind::RParen) {
            if !self.match_token(&TokenKind::Ellipsis) {
                let ty = self.parse_type()?;
                self.skip_attributes()?;

                let token = self.peek().clone();
                let name = match token.kind {
                    TokenKind::LocalName(name) => {
                        self.advance();
                        Local::Named(name)
                    }
                    TokenKind::LocalSlot(n) => {
                        self.advance();
                        unnamed = n + 1;
                        Local::Slot(n)
                    }
                    _ => {
                        unnamed += 1;
                        Local::Slot(unnamed - 1)
                    }
                };

                let value = func.add_param(name.clone(), ty);
                if !func.is_declaration {
                    body.define(name, value, token.span, &mut self.diagnostics);
                }
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RParen, "expected ')' after parameters")?;
        body.next_slot = unnamed;
        Ok(())
    }

    /// Parses blocks up to the closing `}` and binds every local operand
    fn parse_body(&mut self, func: &mut Function, mut body: Body) -> Result<(), ()> {
        loop {
            self.skip_newlines();
            match self.peek_kind().clone() {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected '}' to close the function body");
                    return Err(());
                }
                TokenKind::Label(name) => {
                    let token = self.advance();
                    let label = match name.parse::<u32>() {
                        Ok(n) => Local::Slot(n),
                        Err(_) => Local::Named(name),
                    };
                    if let Some(previous) = body.labels.get(&label) {
                        self.diagnostics.push(
                            Diagnostic::error(format!("redefinition of block '{}'", label))
                                .with_code(ErrorCode::DUPLICATE_DEFINITION)
                                .with_label(token.span, "defined again here")
                                .with_secondary_label(*previous, "first defined here"),
                        );
                    } else {
                        body.labels.insert(label.clone(), token.span);
                    }
                    body.current_block = Some(func.add_block(Some(label)));
                }
                TokenKind::DebugRecord(name) => {
                    // records describe variables; they are not instructions
                    tracing::trace!(record = %name, "skipping debug record");
                    self.skip_rest_of_line();
                }
                _ => {
                    if self.parse_instruction(func, &mut body).is_err() {
                        self.skip_rest_of_line();
                    } else if !self.is_at_line_end() {
                        self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected end of line");
                        self.skip_rest_of_line();
                    }
                }
            }
        }

        self.bind_locals(func, body);
        Ok(())
    }

    /// Replaces placeholder operands with the values they name
    fn bind_locals(&mut self, func: &mut Function, body: Body) {
        for fixup in body.fixups {
            let value = match body.values.get(&fixup.local) {
                Some((value, _)) => value.clone(),
                None if body.labels.contains_key(&fixup.local) => Value::Label(fixup.local.clone()),
                None => {
                    self.diagnostics.push(
                        Diagnostic::error(format!("use of undefined value '{}'", fixup.local))
                            .with_code(ErrorCode::UNDEFINED_VALUE)
                            .with_label(fixup.span, "not defined in this function"),
                    );
                    continue;
                }
            };

            let slot = func
                .blocks
                .get_mut(fixup.inst.block)
                .and_then(|bb| bb.instructions.get_mut(fixup.inst.index))
                .and_then(|inst| inst.operands.get_mut(fixup.operand));
            if let Some(slot) = slot {
                *slot = value;
            }
        }
    }

    // =========================================
    // Instructions
    // =========================================

    /// Parse: `[%result =] <opcode> ...`
    fn parse_instruction(&mut self, func: &mut Function, body: &mut Body) -> Result<(), ()> {
        let first = self.pos;
        let start = self.peek().span;
        let result = match self.peek_kind().clone() {
            TokenKind::LocalName(name) if matches!(self.peek_at(1).kind, TokenKind::Equals) => {
                self.pos += 2;
                Some(Local::Named(name))
            }
            TokenKind::LocalSlot(n) if matches!(self.peek_at(1).kind, TokenKind::Equals) => {
                self.pos += 2;
                Some(Local::Slot(n))
            }
            _ => None,
        };

        let mut mnemonic = match self.peek_kind().clone() {
            TokenKind::Ident(word) => {
                self.advance();
                word
            }
            _ => {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected an instruction");
                return Err(());
            }
        };
        if matches!(mnemonic.as_str(), "tail" | "musttail" | "notail") && self.check_ident("call") {
            self.advance();
            mnemonic = "call".to_string();
        }

        let opcode = Opcode::from_mnemonic(&mnemonic);
        if result.is_some() && matches!(opcode, Opcode::Store | Opcode::Return) {
            self.diagnostics.push(
                Diagnostic::error(format!("'{}' does not produce a value", mnemonic))
                    .with_code(ErrorCode::INVALID_SYNTAX)
                    .with_label(start, "result name given here"),
            );
            return Err(());
        }

        let (inst, operands) = match opcode {
            Opcode::Alloca => {
                let Some(result) = result.clone() else {
                    self.diagnostics.push(
                        Diagnostic::error("alloca must name its result")
                            .with_code(ErrorCode::INVALID_SYNTAX)
                            .with_label(start, "no '%name =' before alloca"),
                    );
                    return Err(());
                };
                self.skip_attributes()?;
                let elem = self.parse_type()?;
                // element count, align, addrspace
                self.skip_rest_of_line();
                (Instruction::alloca(result, elem), Vec::new())
            }
            Opcode::Store => {
                self.skip_attributes()?;
                let (_, value) = self.parse_typed_value()?;
                self.expect(&TokenKind::Comma, "expected ',' between stored value and pointer")?;
                let (_, ptr) = self.parse_typed_value()?;
                self.skip_rest_of_line();
                (Instruction::store(Value::Undef(IrType::Void), Value::Undef(IrType::Void)), vec![value, ptr])
            }
            Opcode::Return => {
                let operands = if self.check_ident("void") {
                    self.advance();
                    Vec::new()
                } else {
                    vec![self.parse_typed_value()?.1]
                };
                self.skip_rest_of_line();
                (Instruction::ret(None), operands)
            }
            Opcode::Call => {
                let (ret, operands) = self.parse_call()?;
                (Instruction::call(result.clone(), ret, Value::Undef(IrType::Ptr), Vec::new()), operands)
            }
            Opcode::Unknown(_) => {
                let generic = self.parse_generic_operands()?;
                let ty = match result {
                    Some(_) => generic.result_type(&mnemonic),
                    None => IrType::Void,
                };
                (Instruction::unknown(mnemonic, result.clone(), ty, Vec::new()), generic.operands)
            }
        };

        let inst = inst.with_text(source_text(&self.tokens[first..self.pos]));
        self.push_instruction(func, body, inst, operands, result, start);
        Ok(())
    }

    /// Parse the rest of: `call [flags] <ret> [(<param types>)] <callee>(<args>)`
    ///
    /// Returns the result type and the operands in `[args..., callee]` order.
    fn parse_call(&mut self) -> Result<(IrType, Vec<Operand>), ()> {
        self.skip_attributes()?;
        let ret = match self.parse_type()? {
            IrType::Function { ret, .. } => *ret,
            ty => ty,
        };

        let callee = self.parse_value(&IrType::Ptr)?;
        self.expect(&TokenKind::LParen, "expected '(' before call arguments")?;

        let mut operands = Vec::new();
        while !self.check(&TokenKind::RParen) {
            operands.push(self.parse_typed_value()?.1);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "expected ')' after call arguments")?;
        // function attributes, operand bundles, !dbg
        self.skip_rest_of_line();

        operands.push(callee);
        Ok((ret, operands))
    }

    /// Reads the operands of an instruction without a dedicated grammar.
    ///
    /// Every value on the line becomes an operand, typed by the closest type
    /// before it. Brackets may continue the instruction onto following lines
    /// (`switch`).
    fn parse_generic_operands(&mut self) -> Result<GenericOperands, ()> {
        let mut generic = GenericOperands::default();
        let mut current = IrType::Void;
        let mut depth = 0usize;

        loop {
            match self.peek_kind().clone() {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Ident(word) if Self::is_type_keyword(&word) => {
                    current = self.parse_type()?;
                    generic.saw_type(&current);
                }
                TokenKind::LBracket | TokenKind::Less if self.at_sequence_type() => {
                    current = self.parse_type()?;
                    generic.saw_type(&current);
                }
                TokenKind::LBrace if self.at_struct_type() => {
                    current = self.parse_type()?;
                    generic.saw_type(&current);
                }
                TokenKind::Ident(word) if VALUE_KEYWORDS.contains(&word.as_str()) => {
                    generic.operands.push(self.parse_value(&current)?);
                }
                TokenKind::Ident(word) => {
                    if matches!(self.peek_at(1).kind, TokenKind::LParen)
                        && CONSTANT_EXPRESSIONS.contains(&word.as_str())
                    {
                        generic.operands.push(self.parse_value(&current)?);
                    } else {
                        // flags and keywords: nsw, inbounds, eq, to, align
                        self.advance();
                        generic.casting |= word == "to";
                        if word == "align" && matches!(self.peek_kind(), TokenKind::Int(_)) {
                            self.advance();
                        }
                    }
                }
                TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::GlobalName(_)
                | TokenKind::LocalName(_)
                | TokenKind::LocalSlot(_) => {
                    generic.operands.push(self.parse_value(&current)?);
                }
                TokenKind::Metadata(_) => {
                    // `!dbg !5` and other attachments
                    self.advance();
                }
                TokenKind::LBracket | TokenKind::LParen | TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBracket | TokenKind::RParen | TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }

        Ok(generic)
    }

    /// Appends an instruction to the current block, filling in its operands
    fn push_instruction(
        &mut self,
        func: &mut Function,
        body: &mut Body,
        mut inst: Instruction,
        operands: Vec<Operand>,
        result: Option<Local>,
        span: Span,
    ) {
        let block = match body.current_block {
            Some(block) => block,
            None => {
                // an unlabeled entry block still takes the next slot number
                body.labels.insert(Local::Slot(body.next_slot), span);
                let block = func.add_block(None);
                body.current_block = Some(block);
                block
            }
        };

        let mut pending = Vec::new();
        if !operands.is_empty() {
            inst.operands = operands
                .into_iter()
                .enumerate()
                .map(|(index, operand)| match operand {
                    Operand::Ready(value) => value,
                    Operand::Local { local, ty, span } => {
                        pending.push((index, local, span));
                        Value::Undef(ty)
                    }
                })
                .collect();
        }

        let Some(id) = func.push(block, inst) else {
            return;
        };
        body.fixups.extend(pending.into_iter().map(|(operand, local, span)| Fixup {
            inst: id,
            operand,
            local,
            span,
        }));

        if let (Some(local), Some(value)) = (result, func.value(id)) {
            body.define(local, value, span, &mut self.diagnostics);
        }
    }
}

/// A local operand; labels need no binding
fn local_operand(local: Local, ty: &IrType, span: Span) -> Operand {
    match ty {
        IrType::Label => Operand::Ready(Value::Label(local)),
        _ => Operand::Local {
            local,
            ty: ty.clone(),
            span,
        },
    }
}

/// The text of `tokens` as written, with whitespace runs collapsed to one space
fn source_text(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut previous_end = None;

    for token in tokens {
        if matches!(token.kind, TokenKind::Newline | TokenKind::Eof) {
            continue;
        }
        if previous_end.is_some_and(|end| token.span.start.offset > end) {
            text.push(' ');
        }
        text.push_str(&token.kind.spelling());
        previous_end = Some(token.span.end.offset);
    }
    text
}

/// Joins token spellings back into readable IR text
fn spell(kinds: &[TokenKind]) -> String {
    let mut text = String::new();
    let mut previous: Option<&TokenKind> = None;

    for kind in kinds {
        let tight_before = matches!(
            kind,
            TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket | TokenKind::Greater
        );
        let tight_after = matches!(
            previous,
            Some(TokenKind::LParen | TokenKind::LBracket | TokenKind::Less) | None
        );
        if !tight_before && !tight_after {
            text.push(' ');
        }
        text.push_str(&kind.spelling());
        previous = Some(kind);
    }
    text
}

/// Decodes a quoted IR string: `"a\5Cb"` -> `a\b`
fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('c').unwrap_or(text);
    let inner = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(inner);

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if bytes.get(i + 1) == Some(&b'\\') {
                out.push(b'\\');
                i += 2;
                continue;
            }
            let hex = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses a token stream into a module
pub fn parse(tokens: Vec<Token>) -> (Module, Diagnostics) {
    let mut parser = Parser::new(tokens);
    let module = parser.parse();
    (module, parser.take_diagnostics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use irx86_ir::ConstInt;
    use irx86_lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Module, Diagnostics) {
        let mut lexer = Lexer::new(source, 0);
        let tokens = lexer.tokenize();
        assert!(lexer.diagnostics().is_empty(), "lexer errors: {:?}", lexer.diagnostics());
        parse(tokens)
    }

    fn parse_ok(source: &str) -> Module {
        let (module, diags) = parse_source(source);
        assert!(!diags.has_errors(), "unexpected errors: {:?}", diags);
        module
    }

    fn codes(diags: &Diagnostics) -> Vec<ErrorCode> {
        diags.iter().filter_map(|d| d.code).collect()
    }

    const ADD1: &str = r#"; ModuleID = 'add1.c'
source_filename = "add1.c"
target datalayout = "e-m:o-i64:64-i128:128-n32:64-S128"
target triple = "x86_64-apple-macosx13.0.0"

; Function Attrs: noinline nounwind optnone ssp uwtable
define i64 @add1() #0 {
entry:
  %1 = alloca i64, align 8
  store i64 5, ptr %1, align 8
  ret i64 5
}

attributes #0 = { noinline nounwind optnone "frame-pointer"="all" }

!llvm.module.flags = !{!0}
!0 = !{i32 1, !"wchar_size", i32 4}
"#;

    #[test]
    fn test_parse_add1() {
        let module = parse_ok(ADD1);
        assert_eq!(module.source_filename, "add1.c");
        assert_eq!(module.functions.len(), 1);

        let func = &module.functions[0];
        assert_eq!(func.name, "add1");
        assert_eq!(func.return_type, IrType::Int(64));
        assert!(!func.is_declaration);
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.blocks[0].name(), "entry");

        let insts = &func.blocks[0].instructions;
        assert_eq!(insts.len(), 3);
        assert_eq!(insts[0].opcode, Opcode::Alloca);
        assert_eq!(insts[0].allocated_type(), Some(IrType::Int(64)));
        assert_eq!(insts[1].opcode, Opcode::Store);
        assert_eq!(insts[2].opcode, Opcode::Return);
    }

    #[test]
    fn test_store_binds_alloca_result() {
        let module = parse_ok(ADD1);
        let insts = &module.functions[0].blocks[0].instructions;

        assert_eq!(insts[1].operand(0), Some(&Value::const_int(64, 5)));
        let ptr = insts[1].operand(1).unwrap();
        assert_eq!(ptr.as_inst(), Some(InstId { block: 0, index: 0 }));
        assert_eq!(ptr.ty(), IrType::Ptr);
    }

    #[test]
    fn test_instruction_display_round_trips_text() {
        let module = parse_ok(ADD1);
        let lines: Vec<String> = module.functions[0].blocks[0]
            .instructions
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(
            lines,
            vec!["%1 = alloca i64, align 8", "store i64 5, ptr %1, align 8", "ret i64 5"]
        );
    }

    #[test]
    fn test_declaration_and_global() {
        let module = parse_ok(
            "@msg = private unnamed_addr constant [6 x i8] c\"hello\\00\", align 1\n\
             @counter = external global i32\n\
             declare i32 @puts(ptr noundef) #1\n",
        );

        assert_eq!(module.globals.len(), 2);
        let msg = &module.globals[0];
        assert_eq!(msg.name, "msg");
        assert!(msg.is_constant);
        assert_eq!(msg.ty, IrType::Array(6, Box::new(IrType::Int(8))));
        assert!(matches!(&msg.initializer, Some(Value::Literal { text, .. }) if text == "c\"hello\\00\""));
        assert!(module.globals[1].initializer.is_none());

        let puts = &module.functions[0];
        assert!(puts.is_declaration);
        assert!(puts.blocks.is_empty());
        assert_eq!(puts.params.len(), 1);
        assert_eq!(puts.params[0].ty, IrType::Ptr);
    }

    #[test]
    fn test_call_operands_end_with_callee() {
        let module = parse_ok(
            "declare i32 @puts(ptr)\n\
             @msg = constant [3 x i8] c\"hi\\00\"\n\
             define i32 @main() {\n\
             \x20 %r = tail call i32 @puts(ptr noundef @msg)\n\
             \x20 call void (...) @f(i32 signext 7)\n\
             \x20 ret i32 %r\n\
             }\n",
        );

        let insts = &module.get_function("main").unwrap().blocks[0].instructions;
        assert_eq!(insts[0].opcode, Opcode::Call);
        assert_eq!(insts[0].ty, IrType::Int(32));
        assert_eq!(insts[0].operands, vec![Value::global("msg"), Value::global("puts")]);

        assert_eq!(insts[1].ty, IrType::Void);
        assert_eq!(insts[1].operand(0), Some(&Value::const_int(32, 7)));
        assert_eq!(insts[1].callee(), Some(&Value::global("f")));

        assert_eq!(insts[2].operand(0).and_then(Value::as_inst), Some(InstId { block: 0, index: 0 }));
    }

    #[test]
    fn test_ret_void_has_no_operands() {
        let module = parse_ok("define void @f() {\n  ret void\n}\n");
        let ret = &module.functions[0].blocks[0].instructions[0];
        assert_eq!(ret.opcode, Opcode::Return);
        assert_eq!(ret.num_operands(), 0);
        // unlabeled entry block
        assert_eq!(module.functions[0].blocks[0].label, None);
    }

    #[test]
    fn test_constants_are_truncated_to_their_width() {
        let module = parse_ok("define i8 @f() {\n  ret i8 255\n}\n");
        let ret = &module.functions[0].blocks[0].instructions[0];
        let c = ret.operand(0).and_then(Value::as_const_int).copied();
        assert_eq!(c, Some(ConstInt::new(8, -1)));
        assert_eq!(c.map(|c| c.sext_value()), Some(-1));
    }

    #[test]
    fn test_unknown_instructions_keep_operands() {
        let module = parse_ok(
            "define i64 @f(i64 %a) {\n\
             entry:\n\
             \x20 %p = alloca i64, align 8\n\
             \x20 %v = load i64, ptr %p, align 8\n\
             \x20 %s = add nsw i64 %v, %a\n\
             \x20 br label %exit\n\
             exit:\n\
             \x20 ret i64 %s\n\
             }\n",
        );

        let func = &module.functions[0];
        assert_eq!(func.blocks.len(), 2);
        let load = &func.blocks[0].instructions[1];
        assert_eq!(load.opcode, Opcode::Unknown("load".into()));
        assert_eq!(load.ty, IrType::Int(64));
        assert_eq!(load.operand(0).and_then(Value::as_inst), Some(InstId { block: 0, index: 0 }));

        let add = &func.blocks[0].instructions[2];
        assert_eq!(add.num_operands(), 2);
        assert!(matches!(add.operand(1), Some(Value::Argument { index: 0, .. })));

        let br = &func.blocks[0].instructions[3];
        assert_eq!(br.operands, vec![Value::Label(Local::named("exit"))]);
        assert_eq!(br.ty, IrType::Void);
    }

    #[test]
    fn test_forward_reference_and_numeric_labels() {
        let module = parse_ok(
            "define i32 @f(i1 %c) {\n\
             \x20 br i1 %c, label %2, label %3\n\
             2:\n\
             \x20 br label %3\n\
             3:\n\
             \x20 %4 = phi i32 [ 1, %0 ], [ 2, %2 ]\n\
             \x20 ret i32 %4\n\
             }\n",
        );
        // %0 names the unlabeled entry block
        let func = &module.functions[0];
        assert_eq!(func.blocks.len(), 3);
        assert_eq!(func.blocks[1].name(), "");
        assert_eq!(func.blocks[1].label, Some(Local::Slot(2)));
    }

    #[test]
    fn test_undefined_value_is_reported() {
        let (_, diags) = parse_source("define i64 @f() {\n  ret i64 %missing\n}\n");
        assert_eq!(codes(&diags), vec![ErrorCode::UNDEFINED_VALUE]);
    }

    #[test]
    fn test_duplicate_definitions_are_reported() {
        let (_, diags) = parse_source(
            "define void @f() {\n  %x = alloca i32\n  %x = alloca i32\n  ret void\n}\n\
             declare void @f()\n",
        );
        assert_eq!(
            codes(&diags),
            vec![ErrorCode::DUPLICATE_DEFINITION, ErrorCode::DUPLICATE_DEFINITION]
        );
        let first = diags.iter().next().unwrap();
        assert_eq!(first.labels.len(), 2);
    }

    #[test]
    fn test_errors_recover_and_continue() {
        let (module, diags) = parse_source(
            "define void @broken() {\n  store i32, ptr\n  ret void\n}\n\
             garbage here\n\
             define void @ok() {\n  ret void\n}\n",
        );
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 2);
        assert!(module.get_function("broken").is_some());
        assert!(module.get_function("ok").is_some());
    }

    #[test]
    fn test_missing_closing_brace() {
        let (_, diags) = parse_source("define void @f() {\n  ret void\n");
        assert!(diags.has_errors());
    }

    #[test]
    fn test_repeated_source_filename_warns() {
        let (module, diags) = parse_source("source_filename = \"a.c\"\nsource_filename = \"b\\5Cc.c\"\n");
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
        assert_eq!(module.source_filename, "b\\c.c");
    }

    #[test]
    fn test_function_order_is_preserved() {
        let module = parse_ok(
            "define void @b() {\n  ret void\n}\n\
             declare void @a()\n\
             define void @c() {\n  ret void\n}\n",
        );
        let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(module.definition_count(), 2);
    }

    #[test]
    fn test_spell_joins_tokens() {
        let kinds = vec![
            TokenKind::LBracket,
            TokenKind::Ident("i8".into()),
            TokenKind::Int(1),
            TokenKind::Comma,
            TokenKind::Ident("i8".into()),
            TokenKind::Int(2),
            TokenKind::RBracket,
        ];
        assert_eq!(spell(&kinds), "[i8 1, i8 2]");
    }

    #[test]
    fn test_instructions_keep_their_source_text() {
        let module = parse_ok(
            "define i32 @f(i32 %a) {\n\
             \x20 %c = icmp sgt i32 %a,   0 ; positive?\n\
             \x20 br i1 %c, label %yes, label %no, !dbg !7\n\
             yes:\n\
             \x20 ret i32 1\n\
             no:\n\
             \x20 ret i32 0\n\
             }\n",
        );
        let func = &module.functions[0];
        let lines: Vec<String> = func.instructions().map(|(_, i)| i.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "%c = icmp sgt i32 %a, 0",
                "br i1 %c, label %yes, label %no, !dbg !7",
                "ret i32 1",
                "ret i32 0",
            ]
        );
    }

    #[test]
    fn test_generic_result_types() {
        let module = parse_ok(
            "define void @f(i32 %a, i8 %b, ptr %p) {\n\
             \x20 %c = icmp eq i32 %a, 0\n\
             \x20 %w = zext i8 %b to i64\n\
             \x20 %s = select i1 %c, i16 1, i16 2\n\
             \x20 %g = getelementptr inbounds i32, ptr %p, i64 1\n\
             \x20 %v = load i32, ptr %g, align 4\n\
             \x20 ret void\n\
             }\n",
        );
        let types: Vec<IrType> = module.functions[0].instructions().map(|(_, i)| i.ty.clone()).collect();
        assert_eq!(
            types,
            vec![IrType::Int(1), IrType::Int(64), IrType::Int(16), IrType::Ptr, IrType::Int(32), IrType::Void]
        );

        // uses see the result type, not the first type on the defining line
        let load = &module.functions[0].blocks[0].instructions[4];
        assert_eq!(load.operand(0).map(Value::ty), Some(IrType::Ptr));
    }

    #[test]
    fn test_metadata_wrapped_call_arguments() {
        let module = parse_ok(
            "declare void @llvm.dbg.declare(metadata, metadata, metadata)\n\
             define void @f() {\n\
             \x20 %1 = alloca i32, align 4\n\
             \x20 call void @llvm.dbg.declare(metadata ptr %1, metadata !12, metadata !DIExpression()), !dbg !14\n\
             \x20 ret void\n\
             }\n",
        );
        let call = &module.get_function("f").unwrap().blocks[0].instructions[1];
        assert_eq!(
            call.operands,
            vec![
                Value::Literal { ty: IrType::Metadata, text: "ptr %1".into() },
                Value::Literal { ty: IrType::Metadata, text: "!12".into() },
                Value::Literal { ty: IrType::Metadata, text: "!DIExpression()".into() },
                Value::global("llvm.dbg.declare"),
            ]
        );
    }

    #[test]
    fn test_debug_records_are_skipped() {
        let module = parse_ok(
            "define void @f() {\n\
             \x20 %1 = alloca i32, align 4\n\
             \x20   #dbg_declare(ptr %1, !12, !DIExpression(), !14)\n\
             \x20 ret void\n\
             }\n",
        );
        let ops: Vec<Opcode> = module.functions[0].instructions().map(|(_, i)| i.opcode.clone()).collect();
        assert_eq!(ops, vec![Opcode::Alloca, Opcode::Return]);
    }
}
