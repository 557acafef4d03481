//! Session bring-up and teardown against a scripted controller.

mod util;

use enipcrab::{Client, ClientConfig};
use util::{Exchange, Expect};

fn client_for(addr: std::net::SocketAddr) -> Client {
    Client::new(ClientConfig {
        port: addr.port(),
        ..ClientConfig::new(addr.ip())
    })
}

/// The exact RegisterSession frame a fresh client must emit.
fn register_request() -> Vec<u8> {
    let mut frame = Vec::new();

    frame.extend_from_slice(&[0x65, 0x00, 0x04, 0x00]); // command, length
    frame.extend_from_slice(&[0x00; 20]); // handle, status, context, options all zero
    frame.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // protocol version 1, flags 0

    frame
}

#[test]
fn session_bring_up() {
    let (addr, plc) = util::spawn_plc(vec![
        Exchange::new(Expect::Frame(register_request()), util::register_reply()),
        Exchange::new(
            Expect::Contains(vec![0x54, 0x02, 0x20, 0x06, 0x24, 0x01]),
            util::forward_open_reply(),
        ),
    ]);

    let mut client = client_for(addr);

    client.connect().expect("bring-up");

    assert_eq!(client.session_handle(), util::SESSION_HANDLE);
    assert_eq!(client.ot_connection_id(), util::OT_CONNECTION_ID);
    assert!(client.is_connected());

    plc.join().unwrap();
}

#[test]
fn close_sends_forward_close_then_unregister() {
    let mut script = util::bring_up_script();

    script.push(Exchange::new(
        Expect::Contains(vec![0x4e, 0x02, 0x20, 0x06, 0x24, 0x01]),
        util::forward_close_reply(),
    ));
    script.push(Exchange::no_reply(Expect::Command(0x0066)));

    let (addr, plc) = util::spawn_plc(script);

    let mut client = client_for(addr);

    client.connect().expect("bring-up");
    client.close();

    assert!(!client.is_connected());

    plc.join().unwrap();
}

#[test]
fn connect_is_idempotent() {
    let (addr, plc) = util::spawn_plc(util::bring_up_script());

    let mut client = client_for(addr);

    client.connect().expect("bring-up");
    // No further exchanges are scripted: a second connect must be a no-op.
    client.connect().expect("already connected");

    plc.join().unwrap();
}
