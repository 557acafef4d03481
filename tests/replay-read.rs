//! Single-tag reads against a scripted controller.

mod util;

use enipcrab::error::{CipError, Error};
use enipcrab::{Client, ClientConfig, GeneralStatus, TagValue};
use util::{Exchange, Expect};

fn client_for(addr: std::net::SocketAddr) -> Client {
    Client::new(ClientConfig {
        port: addr.port(),
        ..ClientConfig::new(addr.ip())
    })
}

#[test]
fn scalar_read() {
    let mut script = util::bring_up_script();

    // The first touch of an unknown tag probes its type with a zero-offset fragmented read.
    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xc4, &[0x7b, 0x00, 0x00, 0x00]),
    ));
    // Then the read proper: service 0x4C, 4-word IOI, one element.
    script.push(Exchange::new(
        Expect::Contains(b"\x4c\x04\x91\x06MyDint\x01\x00".to_vec()),
        util::read_reply(2, 0, 0xc4, &[0x7b, 0x00, 0x00, 0x00]),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("MyDint", 1).unwrap(),
        vec![TagValue::Dint(123)]
    );

    plc.join().unwrap();
}

#[test]
fn cached_tag_skips_the_probe() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xc4, &[0x7b, 0x00, 0x00, 0x00]),
    ));
    script.push(Exchange::new(
        Expect::Service(0x4c),
        util::read_reply(2, 0, 0xc4, &[0x7b, 0x00, 0x00, 0x00]),
    ));
    // Second read of the same tag: straight to 0x4C, no probe.
    script.push(Exchange::new(
        Expect::Service(0x4c),
        util::read_reply(3, 0, 0xc4, &[0x2a, 0x00, 0x00, 0x00]),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    client.read("MyDint", 1).unwrap();

    assert_eq!(client.read("MyDint", 1).unwrap(), vec![TagValue::Dint(42)]);

    plc.join().unwrap();
}

#[test]
fn array_element_read_uses_two_byte_index() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xc4, &[0x00, 0x00, 0x00, 0x00]),
    ));
    script.push(Exchange::checked(
        vec![
            Expect::Service(0x4c),
            // Index 257 must take the 0x29 form.
            Expect::Contains(vec![0x29, 0x00, 0x01, 0x01]),
        ],
        util::read_reply(2, 0, 0xc4, &[0x3f, 0x00, 0x00, 0x00]),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("Arr[257]", 1).unwrap(),
        vec![TagValue::Dint(63)]
    );

    plc.join().unwrap();
}

#[test]
fn bit_of_word_read() {
    let mut script = util::bring_up_script();

    // The probe addresses the word, not the bit.
    script.push(Exchange::checked(
        vec![
            Expect::Service(0x52),
            Expect::Contains(b"\x91\x06Status".to_vec()),
        ],
        util::probe_reply(1, 0, 0xc3, &[0x0c, 0x00]),
    ));
    // One 16-bit word covers bit 3.
    script.push(Exchange::new(
        Expect::Contains(b"\x4c\x04\x91\x06Status\x01\x00".to_vec()),
        util::read_reply(2, 0, 0xc3, &[0x0c, 0x00]),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    // Bit 3 of 0x000C is set.
    assert_eq!(
        client.read("Status.3", 1).unwrap(),
        vec![TagValue::Bool(true)]
    );

    plc.join().unwrap();
}

#[test]
fn packed_bool_array_read() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xd3, &[0x00, 0x00, 0x00, 0x00]),
    ));

    // Element 100 lives in DWORD 3; the word count over-reads from word zero: four words.
    let mut words = Vec::new();

    words.extend_from_slice(&(1u32 << 4).to_le_bytes()); // bit 100 = bit 4 of the first word read
    words.extend_from_slice(&[0u8; 12]);

    script.push(Exchange::checked(
        vec![
            Expect::Service(0x4c),
            // The final index is divided by 32 to address the containing DWORD.
            Expect::Contains(b"\x91\x06Packed\x28\x03\x04\x00".to_vec()),
        ],
        util::read_reply(2, 0, 0xd3, &words),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("Packed[100]", 1).unwrap(),
        vec![TagValue::Bool(true)]
    );

    plc.join().unwrap();
}

#[test]
fn string_read() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xda, &[0x00]),
    ));

    let mut data = vec![0x05];

    data.extend_from_slice(b"hello");

    script.push(Exchange::new(
        Expect::Service(0x4c),
        util::read_reply(2, 0, 0xda, &data),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("Recipe.Name", 1).unwrap(),
        vec![TagValue::String("hello".into())]
    );

    plc.join().unwrap();
}

#[test]
fn nonexistent_tag_surfaces_the_cip_status() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0x05, 0x00, &[]),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("NoSuchTag", 1),
        Err(Error::Cip(CipError {
            status: GeneralStatus::PathDestinationUnknown
        }))
    );

    plc.join().unwrap();
}

#[test]
fn partial_transfer_continues_with_fragmented_reads() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Service(0x52),
        util::probe_reply(1, 0, 0xc4, &[0x00, 0x00, 0x00, 0x00]),
    ));

    // First reply carries two of four DINTs and reports partial transfer.
    let mut first = Vec::new();

    first.extend_from_slice(&1i32.to_le_bytes());
    first.extend_from_slice(&2i32.to_le_bytes());

    script.push(Exchange::new(
        Expect::Service(0x4c),
        util::read_reply(2, 0x06, 0xc4, &first),
    ));

    // The continuation must be a fragmented read resuming at byte offset 8.
    let mut rest = Vec::new();

    rest.extend_from_slice(&3i32.to_le_bytes());
    rest.extend_from_slice(&4i32.to_le_bytes());

    script.push(Exchange::checked(
        vec![
            Expect::Service(0x52),
            Expect::Contains(vec![0x04, 0x00, 0x08, 0x00, 0x00, 0x00]),
        ],
        util::read_reply(3, 0, 0xc4, &rest),
    ));

    let (addr, plc) = util::spawn_plc(script);
    let mut client = client_for(addr);

    assert_eq!(
        client.read("Big[0]", 4).unwrap(),
        vec![
            TagValue::Dint(1),
            TagValue::Dint(2),
            TagValue::Dint(3),
            TagValue::Dint(4),
        ]
    );

    plc.join().unwrap();
}
