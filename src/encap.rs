//! ENIP encapsulation framing.
//!
//! Every exchange with the controller travels inside a 24-byte encapsulation header followed by
//! command-specific data (ODVA Vol. 2 Section 2-3). Session management uses RegisterSession and
//! UnregisterSession; unconnected CIP (Forward Open/Close) rides in SendRRData; everything after
//! forward-open rides in SendUnitData with a connected address item and a 16-bit sequence
//! counter.

use crate::error::ProtocolError;
use enipcrab_wire::{EnipWireRead, EnipWireWriteSized};

/// Encapsulation header length (ODVA Vol. 2 Section 2-3.1).
pub const HEADER_LEN: usize = 24;

/// Largest encapsulated payload a conformant peer may send (ODVA Vol. 2 Section 2-3.3). The
/// length field is a `u16`, so values above this are possible on the wire but never legitimate.
pub const MAX_PAYLOAD: usize = 65_511;

/// Offset of the assigned session handle in a RegisterSession reply.
pub const REGISTER_HANDLE_OFFSET: usize = 4;

/// Offset of the echoed sequence counter in a SendUnitData reply.
pub const UNIT_DATA_SEQUENCE_OFFSET: usize = 44;

/// Offset of the CIP payload in a SendUnitData reply.
pub const UNIT_DATA_PAYLOAD_OFFSET: usize = 46;

/// Common Packet Format item type ids (ODVA Vol. 2 Table 2-6.3).
const ITEM_NULL: u16 = 0x0000;
const ITEM_CONNECTED_ADDRESS: u16 = 0x00a1;
const ITEM_CONNECTED_DATA: u16 = 0x00b1;
const ITEM_UNCONNECTED_DATA: u16 = 0x00b2;

/// Encapsulation commands (ODVA Vol. 2 Table 2-3.2).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum EncapCommand {
    /// Open a session: the peer assigns the session handle echoed in all later frames.
    RegisterSession = 0x0065,
    /// Close a session. No reply is required.
    UnregisterSession = 0x0066,
    /// Carry an unconnected CIP request/reply pair.
    SendRRData = 0x006f,
    /// Carry connected class-3 CIP data with a sequence counter.
    SendUnitData = 0x0070,
}

/// The 24-byte encapsulation header present on every ENIP frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncapHeader {
    /// Encapsulation command code.
    pub command: u16,
    /// Length in bytes of everything following this header.
    pub length: u16,
    /// Session handle assigned at RegisterSession, zero before that.
    pub session_handle: u32,
    /// Status word; non-zero means the peer rejected the frame.
    pub status: u32,
    /// Opaque sender context, echoed verbatim by the peer.
    pub context: u64,
    /// Options, always zero.
    pub options: u32,
}

impl EncapHeader {
    /// Pack the header into its 24-byte wire form.
    pub fn pack(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];

        buf[0..2].copy_from_slice(&self.command.pack());
        buf[2..4].copy_from_slice(&self.length.pack());
        buf[4..8].copy_from_slice(&self.session_handle.pack());
        buf[8..12].copy_from_slice(&self.status.pack());
        buf[12..20].copy_from_slice(&self.context.pack());
        buf[20..24].copy_from_slice(&self.options.pack());

        buf
    }

    /// Unpack a header from the first 24 bytes of a received frame.
    pub fn unpack(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedFrame {
                expected: HEADER_LEN,
                received: buf.len(),
            });
        }

        // Infallible from here: the length check above covers every field.
        let field = |range: core::ops::Range<usize>| &buf[range];

        Ok(Self {
            command: u16::unpack_from_slice(field(0..2)).unwrap(),
            length: u16::unpack_from_slice(field(2..4)).unwrap(),
            session_handle: u32::unpack_from_slice(field(4..8)).unwrap(),
            status: u32::unpack_from_slice(field(8..12)).unwrap(),
            context: u64::unpack_from_slice(field(12..20)).unwrap(),
            options: u32::unpack_from_slice(field(20..24)).unwrap(),
        })
    }
}

/// Build a RegisterSession request: header plus protocol version 1 and option flags 0
/// (ODVA Vol. 2 Section 2-4.4).
pub fn register_session(context: u64) -> Vec<u8> {
    let header = EncapHeader {
        command: EncapCommand::RegisterSession as u16,
        length: 4,
        session_handle: 0,
        status: 0,
        context,
        options: 0,
    };

    let mut frame = Vec::with_capacity(HEADER_LEN + 4);

    frame.extend_from_slice(&header.pack());
    frame.extend_from_slice(&1u16.pack());
    frame.extend_from_slice(&0u16.pack());

    frame
}

/// Build an UnregisterSession request. The peer closes the TCP connection without replying.
pub fn unregister_session(session_handle: u32, context: u64) -> Vec<u8> {
    let header = EncapHeader {
        command: EncapCommand::UnregisterSession as u16,
        length: 0,
        session_handle,
        status: 0,
        context,
        options: 0,
    };

    header.pack().to_vec()
}

/// Wrap an unconnected CIP payload in a SendRRData envelope: null address item plus unconnected
/// data item (ODVA Vol. 2 Section 2-4.7).
pub fn send_rr_data(session_handle: u32, context: u64, payload: &[u8]) -> Vec<u8> {
    let header = EncapHeader {
        command: EncapCommand::SendRRData as u16,
        // Interface handle + timeout + item count + two item headers.
        length: (16 + payload.len()) as u16,
        session_handle,
        status: 0,
        context,
        options: 0,
    };

    let mut frame = Vec::with_capacity(HEADER_LEN + 16 + payload.len());

    frame.extend_from_slice(&header.pack());
    frame.extend_from_slice(&0u32.pack()); // Interface handle, always CIP
    frame.extend_from_slice(&0u16.pack()); // Timeout
    frame.extend_from_slice(&2u16.pack()); // Item count
    frame.extend_from_slice(&ITEM_NULL.pack());
    frame.extend_from_slice(&0u16.pack()); // Null item carries no data
    frame.extend_from_slice(&ITEM_UNCONNECTED_DATA.pack());
    frame.extend_from_slice(&(payload.len() as u16).pack());
    frame.extend_from_slice(payload);

    frame
}

/// Wrap a connected CIP payload in a SendUnitData envelope: connected address item carrying the
/// O→T connection id, then the connected data item with the sequence counter prepended
/// (ODVA Vol. 2 Section 2-4.8).
pub fn send_unit_data(
    session_handle: u32,
    context: u64,
    ot_connection_id: u32,
    sequence: u16,
    payload: &[u8],
) -> Vec<u8> {
    let header = EncapHeader {
        command: EncapCommand::SendUnitData as u16,
        // 22 bytes of command specific data plus the CIP payload.
        length: (22 + payload.len()) as u16,
        session_handle,
        status: 0,
        context,
        options: 0,
    };

    let mut frame = Vec::with_capacity(HEADER_LEN + 22 + payload.len());

    frame.extend_from_slice(&header.pack());
    frame.extend_from_slice(&0u32.pack()); // Interface handle, always CIP
    frame.extend_from_slice(&0u16.pack()); // Timeout
    frame.extend_from_slice(&2u16.pack()); // Item count
    frame.extend_from_slice(&ITEM_CONNECTED_ADDRESS.pack());
    frame.extend_from_slice(&4u16.pack());
    frame.extend_from_slice(&ot_connection_id.pack());
    frame.extend_from_slice(&ITEM_CONNECTED_DATA.pack());
    frame.extend_from_slice(&((payload.len() + 2) as u16).pack());
    frame.extend_from_slice(&sequence.pack());
    frame.extend_from_slice(payload);

    frame
}

/// The size of a SendUnitData envelope, as counted by the request packetizer.
pub const fn unit_data_envelope_len() -> usize {
    UNIT_DATA_PAYLOAD_OFFSET
}

/// Number of entries in the opaque sender-context table.
pub const SENDER_CONTEXT_ENTRIES: usize = 156;

/// Pick the sender context for the given pointer, wrapping modulo the table size.
pub fn sender_context(pointer: usize) -> u64 {
    SENDER_CONTEXT[pointer % SENDER_CONTEXT_ENTRIES]
}

// The context field is officially opaque: the peer echoes it untouched. This table is what
// well-known Logix clients put there, word by word. Kept verbatim for wire compatibility; it has
// no semantic meaning.
#[rustfmt::skip]
const SENDER_CONTEXT: [u64; SENDER_CONTEXT_ENTRIES] = [
    0x6572276557, 0x6f6e, 0x676e61727473, 0x737265,
    0x6f74, 0x65766f6c, 0x756f59, 0x776f6e6b,
    0x656874, 0x73656c7572, 0x646e61, 0x6f73,
    0x6f64, 0x49, 0x41, 0x6c6c7566,
    0x74696d6d6f63, 0x7327746e656d, 0x74616877, 0x6d2749,
    0x6b6e696874, 0x676e69, 0x666f, 0x756f59,
    0x746e646c756f77, 0x746567, 0x73696874, 0x6d6f7266,
    0x796e61, 0x726568746f, 0x797567, 0x49,
    0x7473756a, 0x616e6e6177, 0x6c6c6574, 0x756f79,
    0x776f68, 0x6d2749, 0x676e696c656566, 0x6174746f47,
    0x656b616d, 0x756f79, 0x7265646e75, 0x646e617473,
    0x726576654e, 0x616e6e6f67, 0x65766967, 0x756f79,
    0x7075, 0x726576654e, 0x616e6e6f67, 0x74656c,
    0x756f79, 0x6e776f64, 0x726576654e, 0x616e6e6f67,
    0x6e7572, 0x646e756f7261, 0x646e61, 0x747265736564,
    0x756f79, 0x726576654e, 0x616e6e6f67, 0x656b616d,
    0x756f79, 0x797263, 0x726576654e, 0x616e6e6f67,
    0x796173, 0x657962646f6f67, 0x726576654e, 0x616e6e6f67,
    0x6c6c6574, 0x61, 0x65696c, 0x646e61,
    0x74727568, 0x756f79, 0x6576276557, 0x6e776f6e6b,
    0x68636165, 0x726568746f, 0x726f66, 0x6f73,
    0x676e6f6c, 0x72756f59, 0x73277472616568, 0x6e656562,
    0x676e69686361, 0x747562, 0x657227756f59, 0x6f6f74,
    0x796873, 0x6f74, 0x796173, 0x7469,
    0x656469736e49, 0x6577, 0x68746f62, 0x776f6e6b,
    0x732774616877, 0x6e656562, 0x676e696f67, 0x6e6f,
    0x6557, 0x776f6e6b, 0x656874, 0x656d6167,
    0x646e61, 0x6572276577, 0x616e6e6f67, 0x79616c70,
    0x7469, 0x646e41, 0x6669, 0x756f79,
    0x6b7361, 0x656d, 0x776f68, 0x6d2749,
    0x676e696c656566, 0x74276e6f44, 0x6c6c6574, 0x656d,
    0x657227756f79, 0x6f6f74, 0x646e696c62, 0x6f74,
    0x656573, 0x726576654e, 0x616e6e6f67, 0x65766967,
    0x756f79, 0x7075, 0x726576654e, 0x616e6e6f67,
    0x74656c, 0x756f79, 0x6e776f64, 0x726576654e,
    0x6e7572, 0x646e756f7261, 0x646e61, 0x747265736564,
    0x756f79, 0x726576654e, 0x616e6e6f67, 0x656b616d,
    0x756f79, 0x797263, 0x726576654e, 0x616e6e6f67,
    0x796173, 0x657962646f6f67, 0x726576654e, 0xa680e2616e6e6f67,
];
