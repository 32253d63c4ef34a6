//! Tokens of the textual IR

use irx86_error::span::Span;
use logos::Logos;
use std::fmt;

fn sigil_name(lex: &mut logos::Lexer<'_, TokenKind>) -> String {
    lex.slice()[1..].to_string()
}

fn quoted_name(lex: &mut logos::Lexer<'_, TokenKind>) -> String {
    let slice = lex.slice();
    slice[2..slice.len() - 1].to_string()
}

fn slot_number(lex: &mut logos::Lexer<'_, TokenKind>) -> Option<u32> {
    lex.slice()[1..].parse().ok()
}

fn label_name(lex: &mut logos::Lexer<'_, TokenKind>) -> String {
    let slice = lex.slice();
    slice[..slice.len() - 1].to_string()
}

fn quoted_label(lex: &mut logos::Lexer<'_, TokenKind>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 2].to_string()
}

/// All token types of the textual IR
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r";[^\n]*")]
pub enum TokenKind {
    // =========================================
    // Layout and punctuation
    // =========================================
    /// End of line; instructions never span lines
    #[token("\n")]
    Newline,
    #[token("=")]
    Equals,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("*")]
    Star,
    #[token("...")]
    Ellipsis,
    /// Flag unions in metadata (`DIFlagPrototyped | DIFlagArtificial`)
    #[token("|")]
    Pipe,

    // =========================================
    // Names
    // =========================================
    /// Block label definition (`entry:`, `3:`)
    #[regex(r"[A-Za-z$._][A-Za-z0-9$._-]*:", label_name)]
    #[regex(r"[0-9]+:", label_name)]
    #[regex(r#""[^"\n]*":"#, quoted_label)]
    Label(String),
    /// `%name`
    #[regex(r"%[A-Za-z$._-][A-Za-z0-9$._-]*", sigil_name)]
    #[regex(r#"%"[^"\n]*""#, quoted_name)]
    LocalName(String),
    /// `%3`
    #[regex(r"%[0-9]+", slot_number)]
    LocalSlot(u32),
    /// `@name`, `@0`
    #[regex(r"@[A-Za-z$._-][A-Za-z0-9$._-]*", sigil_name)]
    #[regex(r"@[0-9]+", sigil_name)]
    #[regex(r#"@"[^"\n]*""#, quoted_name)]
    GlobalName(String),
    /// `!dbg`, `!0`, `!`
    #[regex(r"![A-Za-z0-9$._-]*", sigil_name)]
    Metadata(String),
    /// `$name` comdat
    #[regex(r"\$[A-Za-z$._-][A-Za-z0-9$._-]*", sigil_name)]
    Comdat(String),
    /// `#0` attribute group reference
    #[regex(r"#[0-9]+", slot_number)]
    AttrGroup(u32),
    /// `#dbg_declare`, `#dbg_value`: debug records between instructions
    #[regex(r"#dbg_[a-z_]+", sigil_name)]
    DebugRecord(String),
    /// Keywords, types and opcodes (`define`, `i32`, `alloca`, ...)
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice().to_string())]
    Ident(String),

    // =========================================
    // Literals
    // =========================================
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    Int(i128),
    /// Decimal or hexadecimal floating point literal, kept as written
    #[regex(r"-?[0-9]+\.[0-9]*([eE][-+]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"0x[KLMHR]?[0-9A-Fa-f]+", |lex| lex.slice().to_string())]
    Float(String),
    /// `"..."` or `c"..."`, kept as written
    #[regex(r#"c?"[^"\n]*""#, |lex| lex.slice().to_string())]
    Str(String),

    /// End of input (never produced by the scanner itself)
    Eof,
}

impl TokenKind {
    /// The word, if this is an identifier
    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(word) => Some(word),
            _ => None,
        }
    }

    pub fn is_ident(&self, word: &str) -> bool {
        self.ident() == Some(word)
    }

    /// The token as it is written in IR text
    pub fn spelling(&self) -> String {
        match self {
            TokenKind::Newline => "\n".to_string(),
            TokenKind::Equals => "=".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBrace => "{".to_string(),
            TokenKind::RBrace => "}".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::Less => "<".to_string(),
            TokenKind::Greater => ">".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Ellipsis => "...".to_string(),
            TokenKind::Pipe => "|".to_string(),
            TokenKind::Label(name) => format!("{}:", name),
            TokenKind::LocalName(name) => format!("%{}", name),
            TokenKind::LocalSlot(n) => format!("%{}", n),
            TokenKind::GlobalName(name) => format!("@{}", name),
            TokenKind::Metadata(name) => format!("!{}", name),
            TokenKind::Comdat(name) => format!("${}", name),
            TokenKind::AttrGroup(n) => format!("#{}", n),
            TokenKind::DebugRecord(name) => format!("#{}", name),
            TokenKind::Ident(word) => word.clone(),
            TokenKind::Int(v) => v.to_string(),
            TokenKind::Float(text) | TokenKind::Str(text) => text.clone(),
            TokenKind::Eof => String::new(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Equals => write!(f, "'='"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Ellipsis => write!(f, "'...'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::Label(name) => write!(f, "label '{}:'", name),
            TokenKind::LocalName(name) => write!(f, "'%{}'", name),
            TokenKind::LocalSlot(n) => write!(f, "'%{}'", n),
            TokenKind::GlobalName(name) => write!(f, "'@{}'", name),
            TokenKind::Metadata(name) => write!(f, "'!{}'", name),
            TokenKind::Comdat(name) => write!(f, "'${}'", name),
            TokenKind::AttrGroup(n) => write!(f, "'#{}'", n),
            TokenKind::DebugRecord(name) => write!(f, "debug record '#{}'", name),
            TokenKind::Ident(word) => write!(f, "'{}'", word),
            TokenKind::Int(v) => write!(f, "integer '{}'", v),
            TokenKind::Float(text) => write!(f, "float '{}'", text),
            TokenKind::Str(text) => write!(f, "string {}", text),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// A token with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
