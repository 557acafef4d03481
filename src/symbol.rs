//! The controller tag directory.
//!
//! Symbol Object instances (class `0x6B`) are harvested with Get Instance Attribute List; each
//! record is `{instance id, type word, byte count, name length, name}`. Controller-scoped names
//! come back bare; program-scoped names are prefixed with their `Program:…` owner.

use crate::cip::types::CipType;
use crate::error::{Error, ProtocolError};
use crate::reply::{TAG_LIST_DATA_OFFSET, decode_utf8};
use enipcrab_wire::EnipWireRead;

/// One entry of the controller's tag directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SymbolInstance {
    /// Symbol Object instance id.
    pub instance_id: u32,
    /// Low byte of the symbol type word.
    pub type_code: u8,
    /// Bit position within the containing word; only meaningful for `BOOL` symbols.
    pub bit_position: u8,
    /// Number of array dimensions, 0 to 3.
    pub array_dims: u8,
    /// The symbol is a structure; `type_code` is then a template id fragment, not a CIP type.
    pub is_struct: bool,
    /// The symbol is controller-internal.
    pub is_system: bool,
    /// Tag name, prefixed with `Program:…` for program-scoped symbols.
    pub name: String,
}

impl SymbolInstance {
    /// The CIP type for atomic symbols, `None` for structures and template fragments.
    pub fn cip_type(&self) -> Option<CipType> {
        if self.is_struct {
            return None;
        }

        CipType::from_type_code(self.type_code)
    }

    /// `true` for entries the directory listing hides: system symbols and `__` internals.
    pub fn is_hidden(&self) -> bool {
        self.is_system || self.name.starts_with("__")
    }

    fn parse(record: &[u8], name_length: usize, program: Option<&str>) -> Result<Self, Error> {
        let instance_id = u32::unpack_from_slice(record).unwrap_or(0);
        let type_code = record[4];
        let descriptor = record[5];

        // The type word's high byte: bits 8..10 are the bit position for BOOLs, bits 13..14 the
        // array dimension count, bit 15 the structure flag, bit 12 the system flag.
        let bit_position = if type_code == CipType::Bool.type_code() {
            descriptor & 0x07
        } else {
            0
        };

        let name = decode_utf8(&record[10..10 + name_length])?;
        let name = match program {
            Some(program) => format!("{}.{}", program, name),
            None => name,
        };

        Ok(Self {
            instance_id,
            type_code,
            bit_position,
            array_dims: (descriptor & 0x60) >> 5,
            is_struct: descriptor & 0x80 != 0,
            is_system: descriptor & 0x10 != 0,
            name,
        })
    }
}

/// One parsed tag-list reply: the records it carried and the resume cursor for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagListPage {
    /// All records in the reply, unfiltered.
    pub symbols: Vec<SymbolInstance>,
    /// Instance id of the last record seen, if any.
    pub last_instance: Option<u32>,
}

/// Walk the records of a Get Instance Attribute List reply, starting at frame byte 50.
///
/// Records are walked until a zero name length or the end of the buffer; a record whose name runs
/// past the buffer is a truncation error.
pub(crate) fn parse_tag_list_reply(
    frame: &[u8],
    program: Option<&str>,
) -> Result<TagListPage, Error> {
    let mut symbols = Vec::new();
    let mut last_instance = None;
    let mut start = TAG_LIST_DATA_OFFSET;

    while start + 10 <= frame.len() {
        let name_length = usize::from(u16::unpack_from_slice(&frame[start + 8..])?);

        if name_length == 0 {
            break;
        }

        let end = start + 10 + name_length;

        if end > frame.len() {
            return Err(ProtocolError::TruncatedFrame {
                expected: end,
                received: frame.len(),
            }
            .into());
        }

        let symbol = SymbolInstance::parse(&frame[start..end], name_length, program)?;

        last_instance = Some(symbol.instance_id);
        symbols.push(symbol);

        start = end;
    }

    Ok(TagListPage {
        symbols,
        last_instance,
    })
}
