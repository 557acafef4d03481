//! An EtherNet/IP (ENIP) explicit-messaging client for Allen-Bradley Logix controllers.
//!
//! One [`Client`] binds to one controller by IP address and processor slot and speaks CIP class-3
//! explicit messaging over a forward-opened connection: single tag reads (scalars, array
//! elements, bits of words, packed BOOL arrays), batched multi-reads under a 512-byte request
//! budget, the controller wall clock, and the tag directory across controller and program
//! scopes.
//!
//! Sessions connect lazily and recover from dropped sockets on the next operation. All I/O is
//! blocking with per-call deadlines; a client must not be shared between threads without external
//! mutual exclusion.
//!
//! ```no_run
//! use enipcrab::{Client, ClientConfig};
//!
//! let mut client = Client::new(ClientConfig {
//!     slot: 2,
//!     ..ClientConfig::new([192, 168, 14, 169].into())
//! });
//!
//! let values = client.multi_read(&["BAT1_MASTER_RUN_PRESENT", "BAT1_MIX1_PARAMS[3]"])?;
//!
//! for (tag, value) in ["BAT1_MASTER_RUN_PRESENT", "BAT1_MIX1_PARAMS[3]"].iter().zip(values) {
//!     println!("{} = {}", tag, value);
//! }
//!
//! client.close();
//! # Ok::<(), enipcrab::error::Error>(())
//! ```
//!
//! Tag writes, subscriptions, class-1 implicit I/O and controller discovery are out of scope.

#![deny(missing_docs)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod cip;
mod client;
mod client_config;
mod connection;
mod encap;
pub mod error;
mod reply;
mod symbol;
mod tag;
mod value;

pub use cip::status::GeneralStatus;
pub use cip::types::CipType;
pub use client::Client;
pub use client_config::{ClientConfig, DEFAULT_PORT, Timeouts};
pub use symbol::SymbolInstance;
pub use tag::{PathSegment, TagPath};
pub use value::TagValue;
