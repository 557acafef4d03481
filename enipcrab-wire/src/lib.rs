//! Traits used to pack/unpack ENIP and CIP items on the wire.
//!
//! Everything EtherNet/IP puts on the wire is little-endian and byte aligned
//! (ODVA Vol. 2 Section 2-3), so these traits are deliberately small: a
//! little-endian codec for primitives plus fixed-size buffers for items whose
//! packed length is known at compile time.

#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

mod error;
mod impls;

pub use error::WireError;

/// A type that can be unpacked from the wire, little-endian.
pub trait EnipWireRead: Sized {
    /// Unpack this type from the beginning of the given buffer.
    fn unpack_from_slice(buf: &[u8]) -> Result<Self, WireError>;
}

/// A type that can be packed onto the wire, little-endian.
pub trait EnipWireWrite {
    /// Pack the type and write it into the beginning of `buf`.
    ///
    /// # Panics
    ///
    /// This method must panic if `buf` is too short to hold the packed data.
    fn pack_to_slice_unchecked<'buf>(&self, buf: &'buf mut [u8]) -> &'buf [u8];

    /// Pack the type and write it into the beginning of `buf`.
    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], WireError> {
        if buf.len() < self.packed_len() {
            return Err(WireError::WriteBufferTooShort);
        }

        Ok(self.pack_to_slice_unchecked(buf))
    }

    /// Get the length in bytes of this item when packed.
    fn packed_len(&self) -> usize;
}

/// Implemented for types whose packed size is known at compile time.
pub trait EnipWireSized {
    /// Packed size in bytes.
    const PACKED_LEN: usize;

    /// Used to define an array of the correct length. This type should ALWAYS be of the form
    /// `[u8; N]` where `N` is a fixed value or const generic as per the type this trait is
    /// implemented on.
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;

    /// Create a buffer sized to contain the packed representation of this item.
    fn buffer() -> Self::Buffer;
}

/// Implemented for writeable types with a known packed size.
pub trait EnipWireWriteSized: EnipWireWrite + EnipWireSized {
    /// Pack this item to a fixed sized array.
    fn pack(&self) -> Self::Buffer;
}

/// A readable type with a known packed size.
pub trait EnipWireReadSized: EnipWireRead + EnipWireSized {}

impl<T> EnipWireReadSized for T where T: EnipWireRead + EnipWireSized {}

/// Returns bit `index` of `value`, counting from the least significant bit.
pub const fn bit(value: u64, index: u32) -> bool {
    value & (1u64 << index) != 0
}
