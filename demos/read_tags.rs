//! Poll a set of tags and print each `(tag, value)` pair, the way a metrics host adapter would
//! feed its sink.
//!
//! Run with e.g. `cargo run --example read-tags -- 192.168.14.169 BAT1_MIX1_OPS Status.3`.

use enipcrab::{Client, ClientConfig};
use std::time::Duration;

fn main() -> Result<(), enipcrab::error::Error> {
    env_logger::init();

    let mut args = std::env::args().skip(1);

    let ip = args
        .next()
        .expect("usage: read-tags <controller ip> <tag>…")
        .parse()
        .expect("controller ip");

    let tags = args.collect::<Vec<_>>();

    assert!(!tags.is_empty(), "at least one tag to read");

    let tag_refs = tags.iter().map(String::as_str).collect::<Vec<_>>();

    let mut client = Client::new(ClientConfig::new(ip));

    loop {
        match client.multi_read(&tag_refs) {
            Ok(values) => {
                for (tag, value) in tag_refs.iter().zip(values) {
                    println!("{}\t{}", tag, value);
                }
            }
            Err(e) => {
                // The session re-registers on the next tick.
                eprintln!("sample failed: {}", e);
            }
        }

        std::thread::sleep(Duration::from_secs(1));
    }
}
