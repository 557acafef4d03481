//! CIP service request builders and the multi-read packetizer.

use crate::cip::epath::Epath;
use crate::encap;
use crate::error::Error;
use core::ops::Range;
use enipcrab_wire::EnipWireWriteSized;

/// CIP service codes used by this client.
pub mod service {
    /// Read Tag.
    pub const READ_TAG: u8 = 0x4c;
    /// Read Tag Fragmented; also used with offset 0 as the initial type probe.
    pub const READ_TAG_FRAGMENTED: u8 = 0x52;
    /// Multiple Service Packet, addressed to the Message Router.
    pub const MULTIPLE_SERVICE_PACKET: u8 = 0x0a;
    /// Get Instance Attribute List, addressed to the Symbol Object.
    pub const GET_INSTANCE_ATTRIBUTE_LIST: u8 = 0x55;
    /// Get Attribute List, used for the controller wall clock.
    pub const GET_ATTRIBUTE_LIST: u8 = 0x03;
    /// Forward Open.
    pub const FORWARD_OPEN: u8 = 0x54;
    /// Forward Close.
    pub const FORWARD_CLOSE: u8 = 0x4e;
}

/// Hard cap on one multi-service request, envelope included (256 CIP words).
pub const REQUEST_BUDGET: usize = 512;

/// Message Router class used by the multi-service header.
const MESSAGE_ROUTER_CLASS: u8 = 0x02;
/// Symbol Object class holding the tag directory.
const SYMBOL_OBJECT_CLASS: u16 = 0x6b;
/// Wall Clock Time object class.
const WALL_CLOCK_CLASS: u8 = 0x8b;
/// Wall clock attribute: microseconds since the Unix epoch.
const WALL_CLOCK_ATTRIBUTE: u16 = 0x0b;

/// Tag directory attributes harvested per symbol instance: symbol type, byte count, name.
const SYMBOL_ATTRIBUTES: [u16; 3] = [0x0002, 0x0007, 0x0001];

/// O→T connection id proposed in Forward Open; the controller replies with its own choice.
pub const PROPOSED_OT_CONNECTION_ID: u32 = 0x2000_0002;
/// T→O connection id, client-chosen.
pub const TO_CONNECTION_ID: u32 = 0x2000_0001;

/// Identity material baked into Forward Open/Close for one client instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    /// Backplane slot of the processor module.
    pub slot: u8,
    /// Micro800 controllers take no backplane route in the connection path.
    pub micro800: bool,
    /// Random per-client connection serial.
    pub connection_serial: u16,
    /// Vendor id; arbitrary but fixed.
    pub vendor_id: u16,
    /// Originator serial; arbitrary but fixed.
    pub originator_serial: u32,
}

/// Build a Read Tag request: service, path and element count.
pub fn read_tag(path: &Epath, elements: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + path.len());

    body.push(service::READ_TAG);
    body.push(path.word_len());
    body.extend_from_slice(path.as_bytes());
    body.extend_from_slice(&elements.pack());

    body
}

/// Build a Read Tag Fragmented request with a byte offset into the tag's data.
///
/// With `elements = 1, offset = 0` this doubles as the initial probe that discovers a tag's type
/// code.
pub fn read_tag_fragmented(path: &Epath, elements: u16, offset: u32) -> Vec<u8> {
    let mut body = Vec::with_capacity(8 + path.len());

    body.push(service::READ_TAG_FRAGMENTED);
    body.push(path.word_len());
    body.extend_from_slice(path.as_bytes());
    body.extend_from_slice(&elements.pack());
    body.extend_from_slice(&offset.pack());

    body
}

/// The fixed Multiple Service Packet header: service, two-word path to the Message Router.
fn multi_service_header() -> [u8; 6] {
    [
        service::MULTIPLE_SERVICE_PACKET,
        0x02,
        0x20,
        MESSAGE_ROUTER_CLASS,
        0x24,
        0x01,
    ]
}

/// Size of everything in a multi-service frame that is not per-tag payload: the SendUnitData
/// envelope, the router header and the service-count field.
const MULTI_FIXED_OVERHEAD: usize = encap::unit_data_envelope_len() + 6 + 2;

/// Split per-tag service segments into batches that each fit [`REQUEST_BUDGET`].
///
/// Each batch accounts for the envelope, router header, service count and one offset-table entry
/// per service. Returns an error if a single segment cannot fit a frame on its own.
pub fn plan_multi_batches(segments: &[Vec<u8>]) -> Result<Vec<Range<usize>>, Error> {
    let mut batches = Vec::new();
    let mut start = 0;

    while start < segments.len() {
        let mut packet_size = MULTI_FIXED_OVERHEAD;
        let mut end = start;

        for segment in &segments[start..] {
            packet_size += 2 + segment.len();

            if packet_size < REQUEST_BUDGET {
                end += 1;
            } else {
                break;
            }
        }

        if end == start {
            return Err(Error::RequestTooLarge {
                size: packet_size,
            });
        }

        batches.push(start..end);
        start = end;
    }

    Ok(batches)
}

/// Assemble one Multiple Service Packet from the given range of per-tag segments.
///
/// Offsets are relative to the service-count field; the first service starts right after the
/// offset table.
pub fn multi_service(segments: &[Vec<u8>], batch: Range<usize>) -> Vec<u8> {
    let count = batch.len();
    let mut body = Vec::new();

    body.extend_from_slice(&multi_service_header());
    body.extend_from_slice(&(count as u16).pack());

    let mut offset = 2 + 2 * count;

    for segment in &segments[batch.clone()] {
        body.extend_from_slice(&(offset as u16).pack());
        offset += segment.len();
    }

    for segment in &segments[batch] {
        body.extend_from_slice(segment);
    }

    body
}

/// Build a Get Instance Attribute List request against the Symbol Object, resuming from
/// `instance`. Program-scoped requests prefix the program name as a symbolic segment.
pub fn tag_list(program: Option<&str>, instance: u32) -> Vec<u8> {
    let mut path = Epath::new();

    if let Some(program) = program {
        path.push_symbol(program);
    }

    path.push_class(SYMBOL_OBJECT_CLASS);
    path.push_instance(instance);

    let mut body = Vec::with_capacity(4 + path.len() + 8);

    body.push(service::GET_INSTANCE_ATTRIBUTE_LIST);
    body.push(path.word_len());
    body.extend_from_slice(path.as_bytes());
    body.extend_from_slice(&(SYMBOL_ATTRIBUTES.len() as u16).pack());

    for attribute in SYMBOL_ATTRIBUTES {
        body.extend_from_slice(&attribute.pack());
    }

    body
}

/// Build the wall-clock request: Get Attribute List on the Wall Clock Time object.
pub fn plc_time() -> Vec<u8> {
    let mut body = Vec::with_capacity(10);

    body.push(service::GET_ATTRIBUTE_LIST);
    body.push(0x02);
    body.extend_from_slice(&[0x20, WALL_CLOCK_CLASS, 0x24, 0x01]);
    body.extend_from_slice(&1u16.pack());
    body.extend_from_slice(&WALL_CLOCK_ATTRIBUTE.pack());

    body
}

/// The backplane route to the processor, or nothing at all for Micro800.
fn connection_path(identity: &ConnectionIdentity) -> Vec<u8> {
    let mut path = Vec::with_capacity(6);

    if !identity.micro800 {
        path.extend_from_slice(&[0x01, identity.slot]);
    }

    path.extend_from_slice(&[0x20, 0x02, 0x24, 0x01]);

    path
}

/// Build a Forward Open request (ODVA Vol. 1 Section 3-5.5.2).
///
/// The RPI and connection-parameter words are the fixed values Logix accepts for class-3
/// explicit messaging; only the identifiers vary per client.
pub fn forward_open(identity: &ConnectionIdentity) -> Vec<u8> {
    let mut body = Vec::with_capacity(42 + 8);

    body.push(service::FORWARD_OPEN);
    body.push(0x02);
    body.extend_from_slice(&[0x20, 0x06, 0x24, 0x01]); // Connection Manager
    body.push(0x0a); // Priority/tick time
    body.push(0x0e); // Timeout ticks
    body.extend_from_slice(&PROPOSED_OT_CONNECTION_ID.pack());
    body.extend_from_slice(&TO_CONNECTION_ID.pack());
    body.extend_from_slice(&identity.connection_serial.pack());
    body.extend_from_slice(&identity.vendor_id.pack());
    body.extend_from_slice(&identity.originator_serial.pack());
    body.extend_from_slice(&0x03u32.pack()); // Connection timeout multiplier
    body.extend_from_slice(&0x0020_1234u32.pack()); // O→T RPI
    body.extend_from_slice(&0x43f4u16.pack()); // O→T connection parameters
    body.extend_from_slice(&0x0020_4001u32.pack()); // T→O RPI
    body.extend_from_slice(&0x43f4u16.pack()); // T→O connection parameters
    body.push(0xa3); // Transport class 3, application trigger

    let path = connection_path(identity);

    body.push((path.len() / 2) as u8);
    body.extend_from_slice(&path);

    body
}

/// Build a Forward Close request (ODVA Vol. 1 Section 3-5.5.3).
pub fn forward_close(identity: &ConnectionIdentity) -> Vec<u8> {
    let mut body = Vec::with_capacity(20 + 8);

    body.push(service::FORWARD_CLOSE);
    body.push(0x02);
    body.extend_from_slice(&[0x20, 0x06, 0x24, 0x01]);
    body.push(0x0a);
    body.push(0x0e);
    body.extend_from_slice(&identity.connection_serial.pack());
    body.extend_from_slice(&identity.vendor_id.pack());
    body.extend_from_slice(&identity.originator_serial.pack());

    let path = connection_path(identity);

    body.extend_from_slice(&((path.len() / 2) as u16).pack());
    body.extend_from_slice(&path);

    body
}
