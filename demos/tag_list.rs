//! Dump a controller's tag directory.
//!
//! Run with e.g. `cargo run --example tag-list -- 192.168.14.169`.

use enipcrab::{Client, ClientConfig};

fn main() -> Result<(), enipcrab::error::Error> {
    env_logger::init();

    let ip = std::env::args()
        .nth(1)
        .expect("usage: tag-list <controller ip>")
        .parse()
        .expect("controller ip");

    let mut client = Client::new(ClientConfig::new(ip));

    client.tag_list()?;
    client.print_tag_list(None);
    client.close();

    Ok(())
}
