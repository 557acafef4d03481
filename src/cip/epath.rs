//! CIP EPATH (Internal Object Identifier) encoding.
//!
//! Logix symbolic addressing packs a tag expression into a sequence of path segments: ANSI
//! extended symbols for names, element segments for array subscripts, and logical class/instance
//! segments for object addressing. Defined in ODVA Vol. 1 Appendix C-1.

use crate::tag::TagPath;

/// ANSI extended symbol segment: `0x91`, length byte, name bytes, optional pad.
const ANSI_EXTENDED_SYMBOL: u8 = 0x91;
/// Element segment headers by index width.
const ELEMENT_U8: u8 = 0x28;
const ELEMENT_U16: u8 = 0x29;
const ELEMENT_U32: u8 = 0x2a;
/// Logical class segment header (8-bit form).
const CLASS_U8: u8 = 0x20;
const CLASS_U16: u8 = 0x21;
/// Logical instance segment headers by id width.
const INSTANCE_U8: u8 = 0x24;
const INSTANCE_U16: u8 = 0x25;
const INSTANCE_U32: u8 = 0x26;

/// Bits per packed BOOL-array word; a final subscript addresses the containing DWORD.
const BOOL_ARRAY_BITS: u32 = 32;

/// An encoded EPATH, built segment by segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Epath {
    bytes: Vec<u8>,
}

impl Epath {
    /// An empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the symbolic path for a parsed tag expression.
    ///
    /// A trailing bit-of-word selector contributes nothing: the bit is sliced out of the word
    /// after reading. With `bool_array` set the final subscript is divided by 32 so the path
    /// addresses the DWORD containing the requested bit.
    pub fn symbolic(path: &TagPath, bool_array: bool) -> Self {
        let mut epath = Self::new();
        let last_segment = path.segments().len().saturating_sub(1);

        for (seg_idx, segment) in path.segments().iter().enumerate() {
            epath.push_symbol(&segment.name);

            let last_index = segment.indices.len().saturating_sub(1);

            for (idx_pos, &index) in segment.indices.iter().enumerate() {
                let index = if bool_array && seg_idx == last_segment && idx_pos == last_index {
                    index / BOOL_ARRAY_BITS
                } else {
                    index
                };

                epath.push_element(index);
            }
        }

        epath
    }

    /// Append an ANSI extended symbol segment, padding odd-length names so following segments stay
    /// word aligned.
    pub fn push_symbol(&mut self, name: &str) {
        self.bytes.push(ANSI_EXTENDED_SYMBOL);
        self.bytes.push(name.len() as u8);
        self.bytes.extend_from_slice(name.as_bytes());

        if name.len() % 2 != 0 {
            self.bytes.push(0x00);
        }
    }

    /// Append an element (array subscript) segment in the narrowest encoding that holds `index`.
    pub fn push_element(&mut self, index: u32) {
        if index < 0x100 {
            self.bytes.extend_from_slice(&[ELEMENT_U8, index as u8]);
        } else if index < 0x1_0000 {
            self.bytes.push(ELEMENT_U16);
            self.bytes.push(0x00);
            self.bytes.extend_from_slice(&(index as u16).to_le_bytes());
        } else {
            self.bytes.push(ELEMENT_U32);
            self.bytes.push(0x00);
            self.bytes.extend_from_slice(&index.to_le_bytes());
        }
    }

    /// Append a logical class segment.
    pub fn push_class(&mut self, class: u16) {
        if class < 0x100 {
            self.bytes.extend_from_slice(&[CLASS_U8, class as u8]);
        } else {
            self.bytes.push(CLASS_U16);
            self.bytes.push(0x00);
            self.bytes.extend_from_slice(&class.to_le_bytes());
        }
    }

    /// Append a logical instance segment in the narrowest encoding that holds `instance`.
    pub fn push_instance(&mut self, instance: u32) {
        if instance < 0x100 {
            self.bytes.extend_from_slice(&[INSTANCE_U8, instance as u8]);
        } else if instance < 0x1_0000 {
            self.bytes.push(INSTANCE_U16);
            self.bytes.push(0x00);
            self.bytes.extend_from_slice(&(instance as u16).to_le_bytes());
        } else {
            self.bytes.push(INSTANCE_U32);
            self.bytes.push(0x00);
            self.bytes.extend_from_slice(&instance.to_le_bytes());
        }
    }

    /// The encoded path bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded length in bytes. Always even: symbol segments are padded.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if no segments have been pushed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The path size in 16-bit words, as carried in CIP request headers.
    pub fn word_len(&self) -> u8 {
        (self.bytes.len() / 2) as u8
    }
}
