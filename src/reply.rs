//! Parsing of connected CIP replies.
//!
//! Reply offsets count from the start of the received SendUnitData frame: the CIP payload begins
//! at byte 46, so the general status sits at byte 48, the data type code at byte 50 and element
//! data at byte 52 (54 for structures, whose 16-bit handle precedes the data).

use crate::cip::status::GeneralStatus;
use crate::cip::types::CipType;
use crate::error::{CipError, Error, ProtocolError};
use crate::value::TagValue;
use enipcrab_wire::{EnipWireRead, WireError};

/// CIP general status byte; byte 49 is the additional-status word count.
pub const STATUS_OFFSET: usize = 48;

/// Data type code of a read reply.
pub const TYPE_OFFSET: usize = 50;

/// First element of a scalar read reply.
pub const DATA_OFFSET: usize = 52;

/// First element of a structure reply; bytes 52..54 are the structure handle.
pub const STRUCT_DATA_OFFSET: usize = 54;

/// Start of the record array in a tag-directory reply.
pub const TAG_LIST_DATA_OFFSET: usize = 50;

/// Decode a string field, rejecting bytes that are not valid UTF-8.
pub(crate) fn decode_utf8(bytes: &[u8]) -> Result<String, Error> {
    core::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| WireError::InvalidUtf8.into())
}

/// Pull the general status out of a reply frame.
pub fn general_status(frame: &[u8]) -> Result<GeneralStatus, ProtocolError> {
    if frame.len() <= STATUS_OFFSET + 1 {
        return Err(ProtocolError::TruncatedFrame {
            expected: STATUS_OFFSET + 2,
            received: frame.len(),
        });
    }

    Ok(GeneralStatus::from(frame[STATUS_OFFSET]))
}

/// Pull the data type code out of a read reply.
pub fn reply_type(frame: &[u8]) -> Result<u8, ProtocolError> {
    frame
        .get(TYPE_OFFSET)
        .copied()
        .ok_or(ProtocolError::TruncatedFrame {
            expected: TYPE_OFFSET + 1,
            received: frame.len(),
        })
}

/// Number of words a packed-bit read must fetch to cover `elements` bits starting at bit `start`.
///
/// The trailing round-up tests against 32 regardless of the element width; kept exactly as
/// well-known Logix clients compute it, over-reading at worst one word.
pub fn word_count(start: u32, elements: u16, bits_per_element: u32) -> u16 {
    let total_bits = start + u32::from(elements);
    let mut words = total_bits / bits_per_element;

    if total_bits % 32 != 0 {
        words += 1;
    }

    words as u16
}

/// Decode the elements of a successful read reply.
///
/// `STRING` and string-like `STRUCT` replies yield a single [`TagValue::String`]; everything else
/// yields `elements` scalars starting at byte 52.
pub fn parse_read_values(
    frame: &[u8],
    ty: CipType,
    elements: u16,
) -> Result<Vec<TagValue>, Error> {
    match ty {
        CipType::String => {
            let length = usize::from(*frame.get(DATA_OFFSET).ok_or(
                ProtocolError::TruncatedFrame {
                    expected: DATA_OFFSET + 1,
                    received: frame.len(),
                },
            )?);

            let start = DATA_OFFSET + 1;
            let bytes = frame
                .get(start..start + length)
                .ok_or(ProtocolError::TruncatedFrame {
                    expected: start + length,
                    received: frame.len(),
                })?;

            Ok(vec![TagValue::String(decode_utf8(bytes)?)])
        }
        CipType::Struct => {
            // Byte 52..54 carry the structure handle; string-like structures follow with a 32-bit
            // length and the character data.
            let length = u32::unpack_from_slice(frame.get(STRUCT_DATA_OFFSET..).ok_or(
                ProtocolError::TruncatedFrame {
                    expected: STRUCT_DATA_OFFSET + 4,
                    received: frame.len(),
                },
            )?)? as usize;

            let start = STRUCT_DATA_OFFSET + 4;
            let bytes = frame
                .get(start..start + length)
                .ok_or(ProtocolError::TruncatedFrame {
                    expected: start + length,
                    received: frame.len(),
                })?;

            Ok(vec![TagValue::String(decode_utf8(bytes)?)])
        }
        scalar => {
            let size = scalar.size();
            let mut values = Vec::with_capacity(usize::from(elements));

            for element in 0..usize::from(elements) {
                let offset = DATA_OFFSET + element * size;

                let window = frame.get(offset..).ok_or(ProtocolError::TruncatedFrame {
                    expected: offset + size,
                    received: frame.len(),
                })?;

                values.push(TagValue::decode_scalar(scalar, window)?);
            }

            Ok(values)
        }
    }
}

/// Decode `count` words of a packed-bit reply as raw unsigned words.
pub fn parse_words(frame: &[u8], ty: CipType, count: u16) -> Result<Vec<u64>, Error> {
    let size = ty.size();
    let mut words = Vec::with_capacity(usize::from(count));

    for word in 0..usize::from(count) {
        let offset = DATA_OFFSET + word * size;

        let window = frame.get(offset..).ok_or(ProtocolError::TruncatedFrame {
            expected: offset + size,
            received: frame.len(),
        })?;

        words.push(TagValue::decode_word(ty, window)?);
    }

    Ok(words)
}

/// Expand words into booleans, least significant bit first, and slice out the requested run.
pub fn expand_bits(
    words: &[u64],
    bits_per_element: u32,
    bit_pos: u32,
    elements: u16,
) -> Result<Vec<TagValue>, Error> {
    let total_bits = words.len() as u32 * bits_per_element;
    let end = bit_pos + u32::from(elements);

    if end > total_bits {
        return Err(ProtocolError::TruncatedFrame {
            expected: end as usize,
            received: total_bits as usize,
        }
        .into());
    }

    let values = (bit_pos..end)
        .map(|bit| {
            let word = words[(bit / bits_per_element) as usize];

            TagValue::Bool(enipcrab_wire::bit(word, bit % bits_per_element))
        })
        .collect();

    Ok(values)
}

/// Walk a Multiple Service Packet reply, producing one value or error per service.
///
/// Offsets are relative to byte 50 (the service-count field). Each window is
/// `{service echo, reserved, status, additional status size, data…}`; the value's type code sits
/// at window offset 4 and its data at offset 6 (offset 12 for string-like replies, whose length
/// byte is at offset 8).
pub fn parse_multi_reply(frame: &[u8]) -> Result<Vec<TagValue>, Error> {
    let stripped = frame
        .get(TAG_LIST_DATA_OFFSET..)
        .ok_or(ProtocolError::TruncatedFrame {
            expected: TAG_LIST_DATA_OFFSET + 2,
            received: frame.len(),
        })?;

    let count = usize::from(u16::unpack_from_slice(stripped)?);
    let mut values = Vec::with_capacity(count);

    for service in 0..count {
        let offset = usize::from(u16::unpack_from_slice(
            stripped
                .get(2 + service * 2..)
                .ok_or(ProtocolError::TruncatedFrame {
                    expected: TAG_LIST_DATA_OFFSET + 4 + service * 2,
                    received: frame.len(),
                })?,
        )?);

        let window = stripped.get(offset..).ok_or(ProtocolError::TruncatedFrame {
            expected: TAG_LIST_DATA_OFFSET + offset,
            received: frame.len(),
        })?;

        values.push(parse_multi_window(window)?);
    }

    Ok(values)
}

fn parse_multi_window(window: &[u8]) -> Result<TagValue, Error> {
    let status = *window.get(2).ok_or(ProtocolError::TruncatedFrame {
        expected: 4,
        received: window.len(),
    })?;
    let additional = *window.get(3).unwrap_or(&0);

    if status != 0 || additional != 0 {
        return Ok(TagValue::Error(CipError::new(GeneralStatus::from(status))));
    }

    let type_code = *window.get(4).ok_or(ProtocolError::TruncatedFrame {
        expected: 5,
        received: window.len(),
    })?;

    // String-like replies carry their length byte at offset 8 and data at offset 12.
    if type_code == CipType::Struct.type_code() || type_code == CipType::String.type_code() {
        let length = usize::from(*window.get(8).ok_or(ProtocolError::TruncatedFrame {
            expected: 9,
            received: window.len(),
        })?);

        let bytes = window
            .get(12..12 + length)
            .ok_or(ProtocolError::TruncatedFrame {
                expected: 12 + length,
                received: window.len(),
            })?;

        return Ok(TagValue::String(decode_utf8(bytes)?));
    }

    let ty =
        CipType::from_type_code(type_code).ok_or(ProtocolError::UnknownCipType(type_code))?;

    TagValue::decode_scalar(ty, window.get(6..).ok_or(ProtocolError::TruncatedFrame {
        expected: 6 + ty.size(),
        received: window.len(),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A SendUnitData reply around the given CIP payload, so the payload's byte 2 lands at frame
    /// offset 48.
    fn frame(cip: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; 46];

        frame.extend_from_slice(cip);

        frame
    }

    #[test]
    fn word_count_matches_reference_client() {
        // Bit 3 of a 16-bit word: one word.
        assert_eq!(word_count(3, 1, 16), 1);
        // 100 bits into a DWORD array: over-reads from word zero, exactly as the reference does.
        assert_eq!(word_count(100, 1, 32), 4);
        // A full 32-bit word needs no round-up.
        assert_eq!(word_count(0, 32, 32), 1);
        assert_eq!(word_count(0, 33, 32), 2);
    }

    #[test]
    fn scalar_reply() {
        let reply = frame(&[0xcc, 0x00, 0x00, 0x00, 0xc4, 0x00, 0x7b, 0x00, 0x00, 0x00]);

        assert_eq!(general_status(&reply).unwrap(), GeneralStatus::Success);
        assert_eq!(reply_type(&reply).unwrap(), 0xc4);
        assert_eq!(
            parse_read_values(&reply, CipType::Dint, 1).unwrap(),
            vec![TagValue::Dint(123)]
        );
    }

    #[test]
    fn multi_element_reply() {
        let reply = frame(&[
            0xcc, 0x00, 0x00, 0x00, 0xc3, 0x00, // INT
            0x01, 0x00, 0x02, 0x00, 0x03, 0x00,
        ]);

        assert_eq!(
            parse_read_values(&reply, CipType::Int, 3).unwrap(),
            vec![TagValue::Int(1), TagValue::Int(2), TagValue::Int(3)]
        );
    }

    #[test]
    fn string_reply() {
        let mut cip = vec![0xcc, 0x00, 0x00, 0x00, 0xda, 0x00, 0x05];

        cip.extend_from_slice(b"hello");

        assert_eq!(
            parse_read_values(&frame(&cip), CipType::String, 1).unwrap(),
            vec![TagValue::String("hello".into())]
        );
    }

    #[test]
    fn non_utf8_string_is_an_error() {
        let cip = [0xcc, 0x00, 0x00, 0x00, 0xda, 0x00, 0x02, 0xff, 0xfe];

        assert_eq!(
            parse_read_values(&frame(&cip), CipType::String, 1),
            Err(Error::Wire(WireError::InvalidUtf8))
        );
    }

    #[test]
    fn struct_string_reply() {
        let mut cip = vec![0xcc, 0x00, 0x00, 0x00, 0xa0, 0x00];

        cip.extend_from_slice(&0x0fce_u16.to_le_bytes()); // structure handle
        cip.extend_from_slice(&4u32.to_le_bytes());
        cip.extend_from_slice(b"logx");

        assert_eq!(
            parse_read_values(&frame(&cip), CipType::Struct, 1).unwrap(),
            vec![TagValue::String("logx".into())]
        );
    }

    #[test]
    fn truncated_reply_is_an_error() {
        assert!(general_status(&[0u8; 20]).is_err());

        let reply = frame(&[0xcc, 0x00, 0x00, 0x00, 0xc4, 0x00, 0x7b]);

        assert!(parse_read_values(&reply, CipType::Dint, 1).is_err());
    }

    #[test]
    fn bit_expansion_slices_the_requested_run() {
        // Bit 3 of 0x000c is set.
        let bits = expand_bits(&[0x000c], 16, 3, 1).unwrap();

        assert_eq!(bits, vec![TagValue::Bool(true)]);

        // Bits 2..6 of 0x000c: 1, 1, 0, 0.
        let run = expand_bits(&[0x000c], 16, 2, 4).unwrap();

        assert_eq!(
            run,
            vec![
                TagValue::Bool(true),
                TagValue::Bool(true),
                TagValue::Bool(false),
                TagValue::Bool(false),
            ]
        );

        // A run crossing a word boundary picks up the next word's low bits.
        let crossing = expand_bits(&[0x8000_0000, 0x0000_0001], 32, 31, 2).unwrap();

        assert_eq!(crossing, vec![TagValue::Bool(true), TagValue::Bool(true)]);

        assert!(expand_bits(&[0x0], 32, 30, 4).is_err());
    }

    #[test]
    fn multi_reply_walk() {
        // Two services: a DINT of 63 and a path segment error.
        let mut cip = vec![0x8a, 0x00, 0x00, 0x00];

        cip.extend_from_slice(&2u16.to_le_bytes());
        cip.extend_from_slice(&6u16.to_le_bytes()); // first window at stripped offset 6
        cip.extend_from_slice(&16u16.to_le_bytes()); // second at 16

        // Window one: service echo, reserved, status 0, extended 0, type DINT, pad, value.
        cip.extend_from_slice(&[0xcc, 0x00, 0x00, 0x00, 0xc4, 0x00]);
        cip.extend_from_slice(&63i32.to_le_bytes());
        // Window two: status 0x04.
        cip.extend_from_slice(&[0xcc, 0x00, 0x04, 0x00]);

        let values = parse_multi_reply(&frame(&cip)).unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0], TagValue::Dint(63));
        assert_eq!(
            values[1],
            TagValue::Error(CipError::new(GeneralStatus::PathSegmentError))
        );
    }

    #[test]
    fn multi_reply_string_window() {
        let mut cip = vec![0x8a, 0x00, 0x00, 0x00];

        cip.extend_from_slice(&1u16.to_le_bytes());
        cip.extend_from_slice(&4u16.to_le_bytes());

        // Window: echo, reserved, status, extended, type 0xDA, pad, struct handle, length byte at
        // +8, pad, then data at +12.
        cip.extend_from_slice(&[0xcc, 0x00, 0x00, 0x00, 0xda, 0x00, 0xce, 0x0f]);
        cip.push(0x02);
        cip.extend_from_slice(&[0x00, 0x00, 0x00]);
        cip.extend_from_slice(b"ok");

        let values = parse_multi_reply(&frame(&cip)).unwrap();

        assert_eq!(values, vec![TagValue::String("ok".into())]);
    }
}
