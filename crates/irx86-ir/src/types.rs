//! IR Type System
//!
//! First-class types of the textual IR. Only integer widths carry meaning for
//! the translator; every other type is kept so it can be printed back.

use std::fmt;

/// IR Types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// No value (`void`)
    Void,
    /// Integer of the given bit width (`i1`, `i8`, `i64`, ...)
    Int(u32),
    /// Floating point of the given bit width (`half`, `float`, `double`, `x86_fp80`, `fp128`)
    Float(u32),
    /// Opaque pointer (`ptr`)
    Ptr,
    /// Basic block reference (`label`)
    Label,
    /// Metadata operand (`metadata`)
    Metadata,
    /// Fixed-size array (`[N x T]`)
    Array(u64, Box<IrType>),
    /// SIMD vector (`<N x T>`)
    Vector(u64, Box<IrType>),
    /// Literal struct (`{ T, ... }`, or `<{ T, ... }>` when packed)
    Struct { fields: Vec<IrType>, packed: bool },
    /// Named type (`%struct.point`)
    Named(String),
    /// Function type (`ret (params...)`)
    Function {
        ret: Box<IrType>,
        params: Vec<IrType>,
        varargs: bool,
    },
}

impl IrType {
    /// Parses a primitive type keyword (`i32`, `ptr`, `double`, ...)
    pub fn from_keyword(word: &str) -> Option<Self> {
        let ty = match word {
            "void" => IrType::Void,
            "ptr" => IrType::Ptr,
            "label" => IrType::Label,
            "metadata" => IrType::Metadata,
            "half" | "bfloat" => IrType::Float(16),
            "float" => IrType::Float(32),
            "double" => IrType::Float(64),
            "x86_fp80" => IrType::Float(80),
            "fp128" | "ppc_fp128" => IrType::Float(128),
            _ => {
                let bits = word.strip_prefix('i')?;
                if bits.is_empty() || !bits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                IrType::Int(bits.parse().ok().filter(|w| *w > 0)?)
            }
        };
        Some(ty)
    }

    /// Bit width of an integer type.
    ///
    /// Non-integer types report 0: their width has no meaning for stack
    /// slot sizing, and asking must never fail.
    pub fn int_width(&self) -> u32 {
        match self {
            IrType::Int(bits) => *bits,
            _ => 0,
        }
    }
}

fn float_name(bits: u32) -> &'static str {
    match bits {
        16 => "half",
        32 => "float",
        64 => "double",
        80 => "x86_fp80",
        _ => "fp128",
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[IrType]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::Float(bits) => write!(f, "{}", float_name(*bits)),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Label => write!(f, "label"),
            IrType::Metadata => write!(f, "metadata"),
            IrType::Array(len, elem) => write!(f, "[{} x {}]", len, elem),
            IrType::Vector(len, elem) => write!(f, "<{} x {}>", len, elem),
            IrType::Struct { fields, packed } => {
                if *packed {
                    write!(f, "<")?;
                }
                if fields.is_empty() {
                    write!(f, "{{}}")?;
                } else {
                    write!(f, "{{ ")?;
                    write_list(f, fields)?;
                    write!(f, " }}")?;
                }
                if *packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
            IrType::Named(name) => write!(f, "%{}", name),
            IrType::Function { ret, params, varargs } => {
                write!(f, "{} (", ret)?;
                write_list(f, params)?;
                if *varargs {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ir_type_display() {
        assert_eq!(IrType::Int(64).to_string(), "i64");
        assert_eq!(IrType::Array(6, Box::new(IrType::Int(8))).to_string(), "[6 x i8]");
        assert_eq!(
            IrType::Struct { fields: vec![IrType::Int(32), IrType::Ptr], packed: false }.to_string(),
            "{ i32, ptr }"
        );
        assert_eq!(
            IrType::Function { ret: Box::new(IrType::Int(32)), params: vec![IrType::Ptr], varargs: true }
                .to_string(),
            "i32 (ptr, ...)"
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(IrType::from_keyword("i1"), Some(IrType::Int(1)));
        assert_eq!(IrType::from_keyword("i128"), Some(IrType::Int(128)));
        assert_eq!(IrType::from_keyword("double"), Some(IrType::Float(64)));
        assert_eq!(IrType::from_keyword("ptr"), Some(IrType::Ptr));
        assert_eq!(IrType::from_keyword("i"), None);
        assert_eq!(IrType::from_keyword("i0"), None);
        assert_eq!(IrType::from_keyword("inbounds"), None);
        assert_eq!(IrType::from_keyword("entry"), None);
    }

    #[test]
    fn test_int_width() {
        assert_eq!(IrType::Int(32).int_width(), 32);
        assert_eq!(IrType::Ptr.int_width(), 0);
        assert_eq!(IrType::Float(64).int_width(), 0);
    }
}
