//! The public client: tag reads, batched reads, the controller clock and the tag directory.

use crate::cip::epath::Epath;
use crate::cip::request;
use crate::cip::status::GeneralStatus;
use crate::cip::types::CipType;
use crate::client_config::ClientConfig;
use crate::connection::Connection;
use crate::error::{CipError, Error, ProtocolError};
use crate::reply::{self, DATA_OFFSET};
use crate::symbol::SymbolInstance;
use crate::tag::TagPath;
use crate::value::TagValue;
use enipcrab_wire::EnipWireRead;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Offset of the microseconds-since-epoch value in a wall-clock reply.
const PLC_TIME_OFFSET: usize = 56;

/// What the initial probe learned about a tag: its reply type code and the encapsulation data
/// length of the probe reply (only meaningful for `STRING` sizing).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct TagInfo {
    type_code: u8,
    data_len: u16,
}

/// An explicit-messaging client bound to one controller.
///
/// One client owns one TCP session and must not be shared across concurrent callers without
/// external mutual exclusion: the socket, sequence counter and known-tag cache all mutate per
/// request.
///
/// Operations connect lazily; a session dropped by the network re-registers on the next call.
///
/// ```no_run
/// use enipcrab::{Client, ClientConfig};
///
/// let mut client = Client::new(ClientConfig::new([192, 168, 14, 169].into()));
///
/// for value in client.read("BAT1_MIX1_OPS", 1)? {
///     println!("{}", value);
/// }
///
/// client.close();
/// # Ok::<(), enipcrab::error::Error>(())
/// ```
#[derive(Debug)]
pub struct Client {
    connection: Connection,
    known_tags: HashMap<String, TagInfo>,
    tag_list: Vec<SymbolInstance>,
    program_names: Vec<String>,
}

impl Client {
    /// Create a client for the given controller. No I/O happens until the first operation.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            connection: Connection::new(config),
            known_tags: HashMap::new(),
            tag_list: Vec::new(),
            program_names: Vec::new(),
        }
    }

    /// Bring the session up now instead of on the first read.
    pub fn connect(&mut self) -> Result<(), Error> {
        self.connection.ensure_connected()
    }

    /// `true` once the class-3 connection is forward-opened.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// The session handle assigned by the controller at RegisterSession.
    pub fn session_handle(&self) -> u32 {
        self.connection.session_handle()
    }

    /// The O→T connection id assigned by the controller at ForwardOpen.
    pub fn ot_connection_id(&self) -> u32 {
        self.connection.ot_connection_id()
    }

    /// Read `elements` values of a single tag.
    ///
    /// Scalars and array elements decode per the CIP type table; `tag.N` expressions and packed
    /// BOOL arrays (`DWORD` symbols) read whole words and slice the requested bits out. A
    /// partial-transfer reply is continued with Read Tag Fragmented until the controller reports
    /// success.
    pub fn read(&mut self, tag: &str, elements: u16) -> Result<Vec<TagValue>, Error> {
        let path = TagPath::parse(tag)?;

        self.connection.ensure_connected()?;

        let info = self.initial_probe(&path)?;

        let ty = CipType::from_type_code(info.type_code)
            .ok_or(ProtocolError::UnknownCipType(info.type_code))?;

        if ty.is_bit_packed() {
            // A DWORD symbol is a packed BOOL array: address the containing word, fetch enough
            // words for the run, then slice bits.
            let epath = Epath::symbolic(&path, true);
            let start = path.element_index();
            let words = reply::word_count(start, elements, ty.bits());
            let frame = self
                .connection
                .transact(&request::read_tag(&epath, words))?;

            self.check_read_status(&frame)?;

            let words = reply::parse_words(&frame, ty, words)?;

            reply::expand_bits(&words, ty.bits(), start % ty.bits(), elements)
        } else if let Some(bit) = path.bit_index() {
            let epath = Epath::symbolic(&path, false);
            let words = reply::word_count(bit, elements, ty.bits());
            let frame = self
                .connection
                .transact(&request::read_tag(&epath, words))?;

            self.check_read_status(&frame)?;

            let words = reply::parse_words(&frame, ty, words)?;

            reply::expand_bits(&words, ty.bits(), bit, elements)
        } else {
            self.read_elements(&path, ty, elements)
        }
    }

    /// Plain element read, continuing across partial transfers.
    fn read_elements(
        &mut self,
        path: &TagPath,
        ty: CipType,
        elements: u16,
    ) -> Result<Vec<TagValue>, Error> {
        let epath = Epath::symbolic(path, false);
        let frame = self
            .connection
            .transact(&request::read_tag(&epath, elements))?;

        let status = self.check_read_status(&frame)?;

        if !status.is_partial() || ty.size() == 0 {
            return reply::parse_read_values(&frame, ty, elements);
        }

        // Partial transfer: decode what arrived, then pull the rest with fragmented reads,
        // advancing the byte offset past the data already received.
        let size = ty.size();
        let mut values = Vec::with_capacity(usize::from(elements));
        let mut frame = frame;

        loop {
            let available = frame.len().saturating_sub(DATA_OFFSET) / size;
            let remaining = usize::from(elements) - values.len();
            let take = available.min(remaining) as u16;

            // A partial reply that carries no whole element would loop forever.
            if take == 0 {
                return Err(ProtocolError::TruncatedFrame {
                    expected: DATA_OFFSET + size,
                    received: frame.len(),
                }
                .into());
            }

            values.extend(reply::parse_read_values(&frame, ty, take)?);

            if values.len() >= usize::from(elements) {
                break;
            }

            let offset = (values.len() * size) as u32;

            log::trace!("Continuing fragmented read of {} at byte {}", path, offset);

            frame = self
                .connection
                .transact(&request::read_tag_fragmented(&epath, elements, offset))?;

            let status = self.check_read_status(&frame)?;

            if status.is_success() {
                let available = frame.len().saturating_sub(DATA_OFFSET) / size;
                let remaining = usize::from(elements) - values.len();
                let take = available.min(remaining) as u16;

                values.extend(reply::parse_read_values(&frame, ty, take)?);

                break;
            }
        }

        Ok(values)
    }

    /// Read many tags in one batched request, one element each.
    ///
    /// The result is positional: the value (or per-slot error) at index `n` belongs to `tags[n]`.
    /// Requests are packetized under the 512-byte budget and issued as Multiple Service Packets;
    /// if a whole batch fails its slots all carry the batch's error.
    pub fn multi_read(&mut self, tags: &[&str]) -> Result<Vec<TagValue>, Error> {
        self.connection.ensure_connected()?;

        let mut segments = Vec::with_capacity(tags.len());

        for tag in tags {
            let path = TagPath::parse(tag)?;
            let epath = Epath::symbolic(&path, false);

            segments.push(request::read_tag(&epath, 1));
        }

        let batches = request::plan_multi_batches(&segments)?;
        let mut values = Vec::with_capacity(tags.len());

        for batch in batches {
            let body = request::multi_service(&segments, batch.clone());
            let frame = self.connection.transact(&body)?;
            let status = reply::general_status(&frame)?;

            if status.is_success() {
                values.extend(reply::parse_multi_reply(&frame)?);
            } else {
                log::warn!(
                    "Batch of {} reads failed: {}",
                    batch.len(),
                    status
                );

                values.extend(
                    batch.map(|_| TagValue::Error(CipError::new(status))),
                );
            }
        }

        Ok(values)
    }

    /// Read the controller's wall clock.
    pub fn plc_time(&mut self) -> Result<SystemTime, Error> {
        self.connection.ensure_connected()?;

        let frame = self.connection.transact(&request::plc_time())?;
        let status = reply::general_status(&frame)?;

        if !status.is_success() {
            return Err(status.into());
        }

        let micros = u64::unpack_from_slice(frame.get(PLC_TIME_OFFSET..).ok_or(
            ProtocolError::TruncatedFrame {
                expected: PLC_TIME_OFFSET + 8,
                received: frame.len(),
            },
        )?)?;

        Ok(UNIX_EPOCH + Duration::from_micros(micros))
    }

    /// Enumerate the controller's tag directory: controller-scoped symbols first, then every
    /// discovered `Program:…` scope. System symbols and `__` internals are filtered out.
    pub fn tag_list(&mut self) -> Result<&[SymbolInstance], Error> {
        self.connection.ensure_connected()?;

        self.tag_list.clear();
        self.program_names.clear();

        self.harvest_scope(None)?;

        let programs = core::mem::take(&mut self.program_names);

        for program in &programs {
            self.harvest_scope(Some(program))?;
        }

        self.program_names = programs;

        Ok(&self.tag_list)
    }

    /// One scope's worth of Get Instance Attribute List requests, resuming on partial transfer
    /// from the last instance id seen.
    fn harvest_scope(&mut self, program: Option<&str>) -> Result<(), Error> {
        let mut instance = 0u32;

        loop {
            let body = request::tag_list(program, instance);
            let frame = self.connection.transact(&body)?;
            let status = reply::general_status(&frame)?;

            if !status.is_success() && !status.is_partial() {
                return Err(status.into());
            }

            let page = crate::symbol::parse_tag_list_reply(&frame, program)?;

            if let Some(last) = page.last_instance {
                instance = last + 1;
            } else {
                instance += 1;
            }

            for symbol in page.symbols {
                if program.is_none() && symbol.name.starts_with("Program:") {
                    self.program_names.push(symbol.name.clone());
                }

                if !symbol.is_hidden() {
                    self.tag_list.push(symbol);
                }
            }

            if status.is_success() {
                return Ok(());
            }
        }
    }

    /// Names from the last harvested tag list, optionally restricted to one CIP type.
    pub fn filter_tag_list(&self, ty: Option<CipType>) -> Vec<&str> {
        self.tag_list
            .iter()
            .filter(|symbol| ty.is_none_or(|ty| symbol.type_code == ty.type_code()))
            .map(|symbol| symbol.name.as_str())
            .collect()
    }

    /// Dump the last harvested tag list to stdout.
    pub fn print_tag_list(&self, ty: Option<CipType>) {
        println!("Instance\tType\tStruct\tSystem\tDims\tTag Name");

        for symbol in &self.tag_list {
            if ty.is_none_or(|ty| symbol.type_code == ty.type_code()) {
                println!(
                    "{}\t{:#04x}\t{}\t{}\t{}\t{}",
                    symbol.instance_id,
                    symbol.type_code,
                    symbol.is_struct,
                    symbol.is_system,
                    symbol.array_dims,
                    symbol.name
                );
            }
        }
    }

    /// Close the session: best-effort ForwardClose and UnregisterSession, then drop the socket.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// Probe an unknown tag with a zero-offset fragmented read to learn its type code, then cache
    /// it. Cached entries skip the probe entirely.
    fn initial_probe(&mut self, path: &TagPath) -> Result<TagInfo, Error> {
        if let Some(info) = self.known_tags.get(path.base()) {
            return Ok(*info);
        }

        let mut epath = Epath::new();

        for segment in path.segments() {
            epath.push_symbol(&segment.name);
        }

        let frame = self
            .connection
            .transact_probe(&request::read_tag_fragmented(&epath, 1, 0))?;

        let status = reply::general_status(&frame)?;

        if !status.is_success() && !status.is_partial() {
            return Err(status.into());
        }

        let info = TagInfo {
            type_code: reply::reply_type(&frame)?,
            // The encapsulation data length, which sizes STRING replies.
            data_len: u16::unpack_from_slice(&frame[2..4])?,
        };

        log::debug!(
            "Probed {}: type {:#04x}, {} data bytes",
            path.base(),
            info.type_code,
            info.data_len
        );

        self.known_tags.insert(path.base().to_string(), info);

        Ok(info)
    }

    /// Map a read reply's status: success and partial pass through, anything else is an error.
    fn check_read_status(&self, frame: &[u8]) -> Result<GeneralStatus, Error> {
        let status = reply::general_status(frame)?;

        if status.is_success() || status.is_partial() {
            Ok(status)
        } else {
            Err(status.into())
        }
    }
}
