//! Typed tag values.

use crate::cip::types::CipType;
use crate::error::{CipError, Error};
use enipcrab_wire::EnipWireRead;

/// A value read from the controller, tagged with its CIP type.
///
/// Batched reads return one entry per requested tag; a slot whose service failed carries
/// [`TagValue::Error`] so the output stays positional with the input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TagValue {
    /// CIP `BOOL` (`0xC1`), or a single bit sliced out of a wider word.
    Bool(bool),
    /// CIP `SINT` (`0xC2`).
    Sint(i8),
    /// CIP `INT` (`0xC3`).
    Int(i16),
    /// CIP `DINT` (`0xC4`).
    Dint(i32),
    /// CIP `LINT` (`0xC5`).
    Lint(i64),
    /// CIP `USINT` (`0xC6`).
    Usint(u8),
    /// CIP `UINT` (`0xC7`).
    Uint(u16),
    /// CIP `UDINT` (`0xC8`).
    Udint(u32),
    /// CIP `LWORD` (`0xC9`).
    Lword(u64),
    /// CIP `REAL` (`0xCA`).
    Real(f32),
    /// CIP `LREAL` (`0xCB`).
    Lreal(f64),
    /// CIP `DWORD` (`0xD3`) read as a whole word rather than as packed BOOLs.
    Dword(u32),
    /// Logix `STRING` (`0xDA`) or a string-like structure (`0xA0`).
    String(String),
    /// The service for this slot failed.
    Error(CipError),
}

impl TagValue {
    /// Decode one fixed-width scalar of type `ty` from the start of `buf`.
    pub fn decode_scalar(ty: CipType, buf: &[u8]) -> Result<Self, Error> {
        let value = match ty {
            CipType::Bool => Self::Bool(bool::unpack_from_slice(buf)?),
            CipType::Sint => Self::Sint(i8::unpack_from_slice(buf)?),
            CipType::Int => Self::Int(i16::unpack_from_slice(buf)?),
            CipType::Dint => Self::Dint(i32::unpack_from_slice(buf)?),
            CipType::Lint => Self::Lint(i64::unpack_from_slice(buf)?),
            CipType::Usint => Self::Usint(u8::unpack_from_slice(buf)?),
            CipType::Uint => Self::Uint(u16::unpack_from_slice(buf)?),
            CipType::Udint => Self::Udint(u32::unpack_from_slice(buf)?),
            CipType::Lword => Self::Lword(u64::unpack_from_slice(buf)?),
            CipType::Real => Self::Real(f32::unpack_from_slice(buf)?),
            CipType::Lreal => Self::Lreal(f64::unpack_from_slice(buf)?),
            CipType::Dword => Self::Dword(u32::unpack_from_slice(buf)?),
            CipType::Struct | CipType::String => {
                // Variable-width types never reach the scalar loop; their layouts are handled by
                // the reply parser.
                unreachable!("variable-width type in scalar decode")
            }
        };

        Ok(value)
    }

    /// Decode one element of type `ty` as an unsigned word for bit slicing.
    pub fn decode_word(ty: CipType, buf: &[u8]) -> Result<u64, Error> {
        let word = match ty.size() {
            1 => u64::from(u8::unpack_from_slice(buf)?),
            2 => u64::from(u16::unpack_from_slice(buf)?),
            4 => u64::from(u32::unpack_from_slice(buf)?),
            8 => u64::unpack_from_slice(buf)?,
            _ => return Err(crate::error::ProtocolError::UnknownCipType(ty.type_code()).into()),
        };

        Ok(word)
    }

    /// The CIP type this value decodes as, if it has one.
    pub fn cip_type(&self) -> Option<CipType> {
        match self {
            Self::Bool(_) => Some(CipType::Bool),
            Self::Sint(_) => Some(CipType::Sint),
            Self::Int(_) => Some(CipType::Int),
            Self::Dint(_) => Some(CipType::Dint),
            Self::Lint(_) => Some(CipType::Lint),
            Self::Usint(_) => Some(CipType::Usint),
            Self::Uint(_) => Some(CipType::Uint),
            Self::Udint(_) => Some(CipType::Udint),
            Self::Lword(_) => Some(CipType::Lword),
            Self::Real(_) => Some(CipType::Real),
            Self::Lreal(_) => Some(CipType::Lreal),
            Self::Dword(_) => Some(CipType::Dword),
            Self::String(_) => Some(CipType::String),
            Self::Error(_) => None,
        }
    }

    /// `true` if the slot carries an error rather than a value.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl core::fmt::Display for TagValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::Sint(v) => write!(f, "{}", v),
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Dint(v) => write!(f, "{}", v),
            TagValue::Lint(v) => write!(f, "{}", v),
            TagValue::Usint(v) => write!(f, "{}", v),
            TagValue::Uint(v) => write!(f, "{}", v),
            TagValue::Udint(v) => write!(f, "{}", v),
            TagValue::Lword(v) => write!(f, "{}", v),
            TagValue::Real(v) => write!(f, "{}", v),
            TagValue::Lreal(v) => write!(f, "{}", v),
            TagValue::Dword(v) => write!(f, "{:#010x}", v),
            TagValue::String(v) => f.write_str(v),
            TagValue::Error(e) => write!(f, "error: {}", e),
        }
    }
}
