//! Utilities to replay scripted controller exchanges as part of integration tests.
//!
//! A scripted PLC listens on a loopback port, reads whole encapsulated frames, asserts whatever
//! each exchange expects about the client's request, and answers with canned reply frames.
//! Sequence counters are deterministic (they restart at 1 per TCP connection), so replies
//! hardcode them.

#![allow(unused)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;

/// Session handle the scripted PLC assigns at RegisterSession.
pub const SESSION_HANDLE: u32 = 0xdead_beef;

/// O→T connection id the scripted PLC assigns at ForwardOpen.
pub const OT_CONNECTION_ID: u32 = 0x1122_3344;

/// What to assert about one request frame.
pub enum Expect {
    /// The encapsulation command word.
    Command(u16),
    /// The CIP service code of a SendUnitData payload (frame byte 46).
    Service(u8),
    /// The frame contains this byte sequence somewhere.
    Contains(Vec<u8>),
    /// The whole frame, byte for byte.
    Frame(Vec<u8>),
    /// The whole frame is at most this many bytes.
    MaxLen(usize),
    /// Anything goes.
    Any,
}

/// One request/reply step of the script.
pub struct Exchange {
    pub expects: Vec<Expect>,
    /// Frames written back verbatim. Empty for commands with no reply (UnregisterSession).
    pub replies: Vec<Vec<u8>>,
}

impl Exchange {
    pub fn new(expect: Expect, reply: Vec<u8>) -> Self {
        Self {
            expects: vec![expect],
            replies: vec![reply],
        }
    }

    pub fn checked(expects: Vec<Expect>, reply: Vec<u8>) -> Self {
        Self {
            expects,
            replies: vec![reply],
        }
    }

    pub fn no_reply(expect: Expect) -> Self {
        Self {
            expects: vec![expect],
            replies: Vec::new(),
        }
    }
}

/// Spawn the scripted PLC. Join the returned handle at the end of the test so script assertions
/// propagate.
pub fn spawn_plc(script: Vec<Exchange>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind scripted PLC");
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");

        for (step, exchange) in script.into_iter().enumerate() {
            let frame = read_frame(&mut stream, step);

            for expect in &exchange.expects {
                check(&frame, expect, step);
            }

            for reply in &exchange.replies {
                stream.write_all(reply).expect("scripted reply");
            }
        }
    });

    (addr, handle)
}

fn read_frame(stream: &mut TcpStream, step: usize) -> Vec<u8> {
    let mut frame = vec![0u8; 24];

    stream
        .read_exact(&mut frame)
        .unwrap_or_else(|e| panic!("step {}: reading request header: {}", step, e));

    let length = u16::from_le_bytes([frame[2], frame[3]]) as usize;

    frame.resize(24 + length, 0);

    stream
        .read_exact(&mut frame[24..])
        .unwrap_or_else(|e| panic!("step {}: reading request payload: {}", step, e));

    frame
}

fn check(frame: &[u8], expect: &Expect, step: usize) {
    match expect {
        Expect::Command(command) => {
            let got = u16::from_le_bytes([frame[0], frame[1]]);

            assert_eq!(got, *command, "step {}: encapsulation command", step);
        }
        Expect::Service(service) => {
            assert_eq!(frame[46], *service, "step {}: CIP service", step);
        }
        Expect::Contains(needle) => {
            assert!(
                frame
                    .windows(needle.len())
                    .any(|window| window == needle.as_slice()),
                "step {}: frame {:02x?} does not contain {:02x?}",
                step,
                frame,
                needle
            );
        }
        Expect::Frame(expected) => {
            assert_eq!(frame, expected.as_slice(), "step {}: whole frame", step);
        }
        Expect::MaxLen(limit) => {
            assert!(
                frame.len() <= *limit,
                "step {}: frame of {} bytes exceeds {}",
                step,
                frame.len(),
                limit
            );
        }
        Expect::Any => {}
    }
}

/// An encapsulation reply: header with the given command and session handle, then the payload.
pub fn encap_reply(command: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(24 + payload.len());

    frame.extend_from_slice(&command.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(&SESSION_HANDLE.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes()); // status
    frame.extend_from_slice(&0u64.to_le_bytes()); // context
    frame.extend_from_slice(&0u32.to_le_bytes()); // options
    frame.extend_from_slice(payload);

    frame
}

/// The RegisterSession reply: protocol version 1, option flags 0, handle in the header.
pub fn register_reply() -> Vec<u8> {
    encap_reply(0x0065, &[0x01, 0x00, 0x00, 0x00])
}

/// A SendRRData reply whose CIP payload starts at frame byte 40.
pub fn rr_reply(cip: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();

    payload.extend_from_slice(&0u32.to_le_bytes()); // interface handle
    payload.extend_from_slice(&0u16.to_le_bytes()); // timeout
    payload.extend_from_slice(&2u16.to_le_bytes()); // item count
    payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // null item
    payload.extend_from_slice(&0x00b2u16.to_le_bytes());
    payload.extend_from_slice(&(cip.len() as u16).to_le_bytes());
    payload.extend_from_slice(cip);

    encap_reply(0x006f, &payload)
}

/// The ForwardOpen success reply: O→T connection id at frame byte 44.
pub fn forward_open_reply() -> Vec<u8> {
    let mut cip = vec![0xd4, 0x00, 0x00, 0x00];

    cip.extend_from_slice(&OT_CONNECTION_ID.to_le_bytes());
    cip.extend_from_slice(&0x2000_0001u32.to_le_bytes()); // T→O id echoed back
    cip.extend_from_slice(&[0u8; 18]); // serials, RPIs, application reply
    rr_reply(&cip)
}

/// The ForwardClose success reply.
pub fn forward_close_reply() -> Vec<u8> {
    let mut cip = vec![0xce, 0x00, 0x00, 0x00];

    cip.extend_from_slice(&[0u8; 16]);

    rr_reply(&cip)
}

/// A SendUnitData reply with the given echoed sequence counter; the CIP payload starts at frame
/// byte 46.
pub fn unit_data_reply(sequence: u16, cip: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();

    payload.extend_from_slice(&0u32.to_le_bytes()); // interface handle
    payload.extend_from_slice(&0u16.to_le_bytes()); // timeout
    payload.extend_from_slice(&2u16.to_le_bytes()); // item count
    payload.extend_from_slice(&0x00a1u16.to_le_bytes());
    payload.extend_from_slice(&4u16.to_le_bytes());
    payload.extend_from_slice(&0x2000_0001u32.to_le_bytes()); // T→O id
    payload.extend_from_slice(&0x00b1u16.to_le_bytes());
    payload.extend_from_slice(&((cip.len() + 2) as u16).to_le_bytes());
    payload.extend_from_slice(&sequence.to_le_bytes());
    payload.extend_from_slice(cip);

    encap_reply(0x0070, &payload)
}

/// A Read Tag reply: echoed service `0xCC`, the given status and type code, then element data.
pub fn read_reply(sequence: u16, status: u8, type_code: u8, data: &[u8]) -> Vec<u8> {
    let mut cip = vec![0xcc, 0x00, status, 0x00, type_code, 0x00];

    cip.extend_from_slice(data);

    unit_data_reply(sequence, &cip)
}

/// A Read Tag Fragmented (type probe) reply.
pub fn probe_reply(sequence: u16, status: u8, type_code: u8, data: &[u8]) -> Vec<u8> {
    let mut cip = vec![0xd2, 0x00, status, 0x00, type_code, 0x00];

    cip.extend_from_slice(data);

    unit_data_reply(sequence, &cip)
}

/// A Get Instance Attribute List reply: echoed service `0xD5`, status, then symbol records.
pub fn tag_list_reply(sequence: u16, status: u8, records: &[u8]) -> Vec<u8> {
    let mut cip = vec![0xd5, 0x00, status, 0x00];

    cip.extend_from_slice(records);

    unit_data_reply(sequence, &cip)
}

/// One tag-directory record.
pub fn symbol_record(instance: u32, type_code: u8, descriptor: u8, name: &str) -> Vec<u8> {
    let mut record = Vec::new();

    record.extend_from_slice(&instance.to_le_bytes());
    record.push(type_code);
    record.push(descriptor);
    record.extend_from_slice(&[0x00, 0x00]); // byte count attribute, unused by the parser
    record.extend_from_slice(&(name.len() as u16).to_le_bytes());
    record.extend_from_slice(name.as_bytes());

    record
}

/// The session bring-up preamble shared by every scripted session.
pub fn bring_up_script() -> Vec<Exchange> {
    vec![
        Exchange::new(Expect::Command(0x0065), register_reply()),
        Exchange::new(
            Expect::Contains(vec![0x54, 0x02, 0x20, 0x06, 0x24, 0x01]),
            forward_open_reply(),
        ),
    ]
}
