//! The ENIP connection state machine.
//!
//! ```text
//! IDLE ─connect→ TCP_OPEN ─register_session→ SESSION ─forward_open→ CONNECTED ─…read…→ CONNECTED
//!    └──────────────────────────────────────────────────────────────┴─forward_close→ SESSION ─unregister→ CLOSED
//! ```
//!
//! One connection is owned by a single logical thread of execution; requests on it are totally
//! ordered by the 16-bit sequence counter. Every I/O call carries an absolute deadline from
//! [`Timeouts`](crate::Timeouts).

use crate::cip::request::{self, ConnectionIdentity};
use crate::client_config::ClientConfig;
use crate::encap::{self, EncapHeader};
use crate::error::{Error, IoOp, ProtocolError, TransportError};
use core::time::Duration;
use enipcrab_wire::EnipWireRead;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

/// Offset of the peer-assigned O→T connection id in a Forward Open reply.
const FORWARD_OPEN_OT_ID_OFFSET: usize = 44;

/// Offset of the CIP general status in a SendRRData reply.
const RR_STATUS_OFFSET: usize = 42;

/// Stale frames tolerated per receive before the mismatch becomes an error.
const MAX_STALE_FRAMES: usize = 8;

#[derive(Debug)]
pub(crate) struct Connection {
    config: ClientConfig,
    identity: ConnectionIdentity,
    stream: Option<TcpStream>,
    session_handle: u32,
    ot_connection_id: u32,
    sequence: u16,
    context_pointer: usize,
    session_registered: bool,
    forward_open_done: bool,
}

impl Connection {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self {
            config,
            identity: ConnectionIdentity {
                slot: config.slot,
                micro800: config.micro800,
                connection_serial: rand::random::<u16>(),
                vendor_id: config.vendor_id,
                originator_serial: config.originator_serial,
            },
            stream: None,
            session_handle: 0,
            ot_connection_id: 0,
            sequence: 1,
            context_pointer: 0,
            session_registered: false,
            forward_open_done: false,
        }
    }

    pub(crate) fn session_handle(&self) -> u32 {
        self.session_handle
    }

    pub(crate) fn ot_connection_id(&self) -> u32 {
        self.ot_connection_id
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.forward_open_done && self.stream.is_some()
    }

    /// Bring the session up if it is not already: dial, RegisterSession, ForwardOpen.
    ///
    /// Any failure tears the session back down to IDLE so the next call starts from a clean
    /// socket; a half-registered session is never left behind.
    pub(crate) fn ensure_connected(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            return Ok(());
        }

        self.reset();

        let result = self.bring_up();

        if result.is_err() {
            self.reset();
        }

        result
    }

    fn bring_up(&mut self) -> Result<(), Error> {
        let addr = self.config.socket_addr();

        log::debug!("Dialling {}", addr);

        let stream = TcpStream::connect_timeout(&addr, self.config.timeouts.connect)
            .map_err(|e| TransportError::new(IoOp::Connect, &e))?;

        stream.set_nodelay(true).ok();

        self.stream = Some(stream);
        self.sequence = 1;

        // Register the session; the peer assigns the handle echoed in every later frame.
        self.send_frame(&encap::register_session(0))?;

        let reply = self.read_frame(self.config.timeouts.read)?;

        let header = EncapHeader::unpack(&reply)?;

        if header.status != 0 {
            return Err(ProtocolError::EncapStatus(header.status).into());
        }

        self.session_handle = u32::unpack_from_slice(&reply[encap::REGISTER_HANDLE_OFFSET..])?;
        self.session_registered = true;

        log::debug!("Session registered, handle {:#010x}", self.session_handle);

        // Forward-open the class-3 connection.
        let reply = self.transact_unconnected(&request::forward_open(&self.identity))?;

        let status = *reply
            .get(RR_STATUS_OFFSET)
            .ok_or(ProtocolError::TruncatedFrame {
                expected: RR_STATUS_OFFSET + 1,
                received: reply.len(),
            })?;

        if status != 0 {
            return Err(crate::cip::status::GeneralStatus::from(status).into());
        }

        self.ot_connection_id = u32::unpack_from_slice(
            reply
                .get(FORWARD_OPEN_OT_ID_OFFSET..)
                .ok_or(ProtocolError::TruncatedFrame {
                    expected: FORWARD_OPEN_OT_ID_OFFSET + 4,
                    received: reply.len(),
                })?,
        )?;
        self.forward_open_done = true;

        log::debug!(
            "Forward open complete, O→T connection id {:#010x}",
            self.ot_connection_id
        );

        Ok(())
    }

    /// Send one unconnected CIP payload in SendRRData and read the reply.
    fn transact_unconnected(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let frame = encap::send_rr_data(self.session_handle, 0, payload);

        self.send_frame(&frame)?;
        self.read_frame(self.config.timeouts.read)
    }

    /// Send one connected CIP payload in SendUnitData and read the matching reply.
    ///
    /// Advances the sequence counter and context pointer per frame. Replies whose echoed counter
    /// is older than the request's are logged and discarded; any other mismatch is an error.
    pub(crate) fn transact(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        self.transact_with_read_timeout(payload, self.config.timeouts.read)
    }

    /// [`transact`](Self::transact) with the longer probe deadline.
    pub(crate) fn transact_probe(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        self.transact_with_read_timeout(payload, self.config.timeouts.probe_read)
    }

    fn transact_with_read_timeout(
        &mut self,
        payload: &[u8],
        read_timeout: Duration,
    ) -> Result<Vec<u8>, Error> {
        let sequence = self.sequence;
        let context = encap::sender_context(self.context_pointer);

        self.sequence = self.sequence.wrapping_add(1);
        self.context_pointer = (self.context_pointer + 1) % encap::SENDER_CONTEXT_ENTRIES;

        let frame = encap::send_unit_data(
            self.session_handle,
            context,
            self.ot_connection_id,
            sequence,
            payload,
        );

        log::trace!(
            "TX seq {} service {:#04x} ({} byte frame)",
            sequence,
            payload.first().copied().unwrap_or(0),
            frame.len()
        );

        self.send_frame(&frame)?;

        let mut last_echoed = sequence;

        for _ in 0..MAX_STALE_FRAMES {
            let reply = self.read_frame(read_timeout)?;

            let header = EncapHeader::unpack(&reply)?;

            if header.status != 0 {
                return Err(ProtocolError::EncapStatus(header.status).into());
            }

            let Some(echoed) = reply
                .get(encap::UNIT_DATA_SEQUENCE_OFFSET..encap::UNIT_DATA_SEQUENCE_OFFSET + 2)
                .map(|raw| u16::from_le_bytes([raw[0], raw[1]]))
            else {
                return Err(ProtocolError::TruncatedFrame {
                    expected: encap::UNIT_DATA_PAYLOAD_OFFSET,
                    received: reply.len(),
                }
                .into());
            };

            if echoed == sequence {
                return Ok(reply);
            }

            // An older counter means a late reply to an abandoned request. Drop it and keep
            // reading; anything else is a peer we no longer understand.
            if sequence.wrapping_sub(echoed) < 0x8000 {
                log::warn!("Discarding stale reply with sequence {} (at {})", echoed, sequence);

                last_echoed = echoed;
            } else {
                return Err(ProtocolError::SequenceMismatch {
                    sent: sequence,
                    received: echoed,
                }
                .into());
            }
        }

        Err(ProtocolError::SequenceMismatch {
            sent: sequence,
            received: last_echoed,
        }
        .into())
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), Error> {
        let timeout = self.config.timeouts.write;

        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError {
                op: IoOp::Write,
                kind: std::io::ErrorKind::NotConnected,
            }
            .into());
        };

        stream.set_write_timeout(Some(timeout)).ok();

        if let Err(e) = stream.write_all(frame) {
            // A failed write means the TCP stream is gone; force a full bring-up next time.
            self.reset();

            return Err(TransportError::new(IoOp::Write, &e).into());
        }

        Ok(())
    }

    /// Read one whole encapsulated frame: the 24-byte header, then exactly the payload length it
    /// advertises.
    fn read_frame(&mut self, timeout: Duration) -> Result<Vec<u8>, Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError {
                op: IoOp::Read,
                kind: std::io::ErrorKind::NotConnected,
            }
            .into());
        };

        stream.set_read_timeout(Some(timeout)).ok();

        let mut frame = vec![0u8; encap::HEADER_LEN];

        // A timeout or EOF here does NOT drop the socket: the session may still be healthy and
        // the caller decides whether to retry or tear down.
        stream
            .read_exact(&mut frame)
            .map_err(|e| TransportError::new(IoOp::Read, &e))?;

        let length = usize::from(u16::unpack_from_slice(&frame[2..4])?);

        if length > encap::MAX_PAYLOAD {
            return Err(ProtocolError::FrameTooLong { length }.into());
        }

        frame.resize(encap::HEADER_LEN + length, 0);

        stream
            .read_exact(&mut frame[encap::HEADER_LEN..])
            .map_err(|e| TransportError::new(IoOp::Read, &e))?;

        Ok(frame)
    }

    /// Best-effort teardown: ForwardClose, UnregisterSession, then close the socket. Errors are
    /// ignored; the peer drops the TCP connection either way.
    pub(crate) fn close(&mut self) {
        if self.stream.is_some() {
            log::debug!("Closing session {:#010x}", self.session_handle);

            if self.forward_open_done {
                let payload = request::forward_close(&self.identity);

                if self.transact_unconnected(&payload).is_err() {
                    log::debug!("Forward close was not acknowledged");
                }
            }

            if self.session_registered {
                let frame = encap::unregister_session(self.session_handle, 0);

                self.send_frame(&frame).ok();
            }

            if let Some(stream) = self.stream.take() {
                stream.shutdown(Shutdown::Both).ok();
            }
        }

        self.reset();
    }

    fn reset(&mut self) {
        self.stream = None;
        self.session_handle = 0;
        self.ot_connection_id = 0;
        self.sequence = 1;
        self.session_registered = false;
        self.forward_open_done = false;
    }
}
