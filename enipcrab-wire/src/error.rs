//! Encode/decode error.

/// Wire encode/decode errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer is too short to unpack the requested item from.
    ReadBufferTooShort,
    /// The buffer is too short to pack the item into.
    WriteBufferTooShort,
    /// A string field did not contain valid UTF-8.
    InvalidUtf8,
}

impl std::error::Error for WireError {}

impl core::fmt::Display for WireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WireError::ReadBufferTooShort => f.write_str("read buffer too short"),
            WireError::WriteBufferTooShort => f.write_str("write buffer too short"),
            WireError::InvalidUtf8 => f.write_str("string field is not valid UTF-8"),
        }
    }
}
