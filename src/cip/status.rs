//! CIP general status codes.

/// CIP General Status code, returned in every Message Router reply.
///
/// Defined in ODVA Vol. 1 Appendix B, Table B-1.1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GeneralStatus {
    /// Success
    Success,
    /// Connection failure
    ConnectionFailure,
    /// Resource unavailable
    ResourceUnavailable,
    /// Invalid parameter value
    InvalidParameterValue,
    /// Path segment error
    PathSegmentError,
    /// Path destination unknown
    PathDestinationUnknown,
    /// Partial transfer. Not an error: the reply was truncated and the request should be reissued
    /// with an advanced cursor.
    PartialTransfer,
    /// Connection lost
    ConnectionLost,
    /// Service not supported
    ServiceNotSupported,
    /// Invalid attribute
    InvalidAttribute,
    /// Attribute list error
    AttributeListError,
    /// Already in requested mode/state
    AlreadyInRequestedMode,
    /// Object state conflict
    ObjectStateConflict,
    /// Object already exists
    ObjectAlreadyExists,
    /// Attribute not settable
    AttributeNotSettable,
    /// Privilege violation
    PrivilegeViolation,
    /// Device state conflict
    DeviceStateConflict,
    /// Reply data too large
    ReplyDataTooLarge,
    /// Fragmentation of a primitive value
    FragmentationOfPrimitive,
    /// Not enough data
    NotEnoughData,
    /// Attribute not supported
    AttributeNotSupported,
    /// Too much data
    TooMuchData,
    /// Object does not exist
    ObjectDoesNotExist,
    /// Service fragmentation sequence not in progress
    FragmentationOutOfSequence,
    /// No stored attribute data
    NoStoredAttributeData,
    /// Store operation failure
    StoreOperationFailure,
    /// Routing failure, request packet too large
    RequestPacketTooLarge,
    /// Routing failure, response packet too large
    ResponsePacketTooLarge,
    /// Missing attribute list entry data
    MissingAttributeListEntry,
    /// Invalid attribute value list
    InvalidAttributeValueList,
    /// Embedded service error
    EmbeddedServiceError,
    /// Vendor specific
    VendorSpecific,
    /// Invalid parameter
    InvalidParameter,
    /// Write once value or medium already written
    WriteOnceAlreadyWritten,
    /// Invalid reply received
    InvalidReplyReceived,
    /// Buffer overflow
    BufferOverflow,
    /// Invalid message format
    InvalidMessageFormat,
    /// Key failure in path
    KeyFailureInPath,
    /// Path size invalid
    PathSizeInvalid,
    /// Unexpected attribute in list
    UnexpectedAttributeInList,
    /// Invalid member ID
    InvalidMemberId,
    /// Member not settable
    MemberNotSettable,
    /// Group 2 only server general failure
    Group2OnlyServerFailure,
    /// Unknown Modbus error
    UnknownModbusError,
    /// Attribute not gettable
    AttributeNotGettable,
    /// A code this table does not map.
    Unknown(u8),
}

impl GeneralStatus {
    /// The raw status byte.
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::ConnectionFailure => 0x01,
            Self::ResourceUnavailable => 0x02,
            Self::InvalidParameterValue => 0x03,
            Self::PathSegmentError => 0x04,
            Self::PathDestinationUnknown => 0x05,
            Self::PartialTransfer => 0x06,
            Self::ConnectionLost => 0x07,
            Self::ServiceNotSupported => 0x08,
            Self::InvalidAttribute => 0x09,
            Self::AttributeListError => 0x0a,
            Self::AlreadyInRequestedMode => 0x0b,
            Self::ObjectStateConflict => 0x0c,
            Self::ObjectAlreadyExists => 0x0d,
            Self::AttributeNotSettable => 0x0e,
            Self::PrivilegeViolation => 0x0f,
            Self::DeviceStateConflict => 0x10,
            Self::ReplyDataTooLarge => 0x11,
            Self::FragmentationOfPrimitive => 0x12,
            Self::NotEnoughData => 0x13,
            Self::AttributeNotSupported => 0x14,
            Self::TooMuchData => 0x15,
            Self::ObjectDoesNotExist => 0x16,
            Self::FragmentationOutOfSequence => 0x17,
            Self::NoStoredAttributeData => 0x18,
            Self::StoreOperationFailure => 0x19,
            Self::RequestPacketTooLarge => 0x1a,
            Self::ResponsePacketTooLarge => 0x1b,
            Self::MissingAttributeListEntry => 0x1c,
            Self::InvalidAttributeValueList => 0x1d,
            Self::EmbeddedServiceError => 0x1e,
            Self::VendorSpecific => 0x1f,
            Self::InvalidParameter => 0x20,
            Self::WriteOnceAlreadyWritten => 0x21,
            Self::InvalidReplyReceived => 0x22,
            Self::BufferOverflow => 0x23,
            Self::InvalidMessageFormat => 0x24,
            Self::KeyFailureInPath => 0x25,
            Self::PathSizeInvalid => 0x26,
            Self::UnexpectedAttributeInList => 0x27,
            Self::InvalidMemberId => 0x28,
            Self::MemberNotSettable => 0x29,
            Self::Group2OnlyServerFailure => 0x2a,
            Self::UnknownModbusError => 0x2b,
            Self::AttributeNotGettable => 0x2c,
            Self::Unknown(code) => code,
        }
    }

    /// `true` for status `0x00`.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// `true` for status `0x06`, i.e. a truncated reply that should be continued, not surfaced as
    /// an error.
    pub const fn is_partial(self) -> bool {
        matches!(self, Self::PartialTransfer)
    }
}

impl From<u8> for GeneralStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Success,
            0x01 => Self::ConnectionFailure,
            0x02 => Self::ResourceUnavailable,
            0x03 => Self::InvalidParameterValue,
            0x04 => Self::PathSegmentError,
            0x05 => Self::PathDestinationUnknown,
            0x06 => Self::PartialTransfer,
            0x07 => Self::ConnectionLost,
            0x08 => Self::ServiceNotSupported,
            0x09 => Self::InvalidAttribute,
            0x0a => Self::AttributeListError,
            0x0b => Self::AlreadyInRequestedMode,
            0x0c => Self::ObjectStateConflict,
            0x0d => Self::ObjectAlreadyExists,
            0x0e => Self::AttributeNotSettable,
            0x0f => Self::PrivilegeViolation,
            0x10 => Self::DeviceStateConflict,
            0x11 => Self::ReplyDataTooLarge,
            0x12 => Self::FragmentationOfPrimitive,
            0x13 => Self::NotEnoughData,
            0x14 => Self::AttributeNotSupported,
            0x15 => Self::TooMuchData,
            0x16 => Self::ObjectDoesNotExist,
            0x17 => Self::FragmentationOutOfSequence,
            0x18 => Self::NoStoredAttributeData,
            0x19 => Self::StoreOperationFailure,
            0x1a => Self::RequestPacketTooLarge,
            0x1b => Self::ResponsePacketTooLarge,
            0x1c => Self::MissingAttributeListEntry,
            0x1d => Self::InvalidAttributeValueList,
            0x1e => Self::EmbeddedServiceError,
            0x1f => Self::VendorSpecific,
            0x20 => Self::InvalidParameter,
            0x21 => Self::WriteOnceAlreadyWritten,
            0x22 => Self::InvalidReplyReceived,
            0x23 => Self::BufferOverflow,
            0x24 => Self::InvalidMessageFormat,
            0x25 => Self::KeyFailureInPath,
            0x26 => Self::PathSizeInvalid,
            0x27 => Self::UnexpectedAttributeInList,
            0x28 => Self::InvalidMemberId,
            0x29 => Self::MemberNotSettable,
            0x2a => Self::Group2OnlyServerFailure,
            0x2b => Self::UnknownModbusError,
            0x2c => Self::AttributeNotGettable,
            other => Self::Unknown(other),
        }
    }
}

impl From<GeneralStatus> for u8 {
    fn from(status: GeneralStatus) -> Self {
        status.code()
    }
}

impl core::fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let description = match self {
            Self::Success => "Success",
            Self::ConnectionFailure => "Connection failure",
            Self::ResourceUnavailable => "Resource unavailable",
            Self::InvalidParameterValue => "Invalid parameter value",
            Self::PathSegmentError => "Path segment error",
            Self::PathDestinationUnknown => "Path destination unknown",
            Self::PartialTransfer => "Partial transfer",
            Self::ConnectionLost => "Connection lost",
            Self::ServiceNotSupported => "Service not supported",
            Self::InvalidAttribute => "Invalid attribute",
            Self::AttributeListError => "Attribute list error",
            Self::AlreadyInRequestedMode => "Already in requested mode/state",
            Self::ObjectStateConflict => "Object state conflict",
            Self::ObjectAlreadyExists => "Object already exists",
            Self::AttributeNotSettable => "Attribute not settable",
            Self::PrivilegeViolation => "Privilege violation",
            Self::DeviceStateConflict => "Device state conflict",
            Self::ReplyDataTooLarge => "Reply data too large",
            Self::FragmentationOfPrimitive => "Fragmentation of a primitive value",
            Self::NotEnoughData => "Not enough data",
            Self::AttributeNotSupported => "Attribute not supported",
            Self::TooMuchData => "Too much data",
            Self::ObjectDoesNotExist => "Object does not exist",
            Self::FragmentationOutOfSequence => {
                "Service fragmentation sequence not in progress"
            }
            Self::NoStoredAttributeData => "No stored attribute data",
            Self::StoreOperationFailure => "Store operation failure",
            Self::RequestPacketTooLarge => "Routing failure, request packet too large",
            Self::ResponsePacketTooLarge => "Routing failure, response packet too large",
            Self::MissingAttributeListEntry => "Missing attribute list entry data",
            Self::InvalidAttributeValueList => "Invalid attribute value list",
            Self::EmbeddedServiceError => "Embedded service error",
            Self::VendorSpecific => "Vendor specific",
            Self::InvalidParameter => "Invalid parameter",
            Self::WriteOnceAlreadyWritten => "Write once value or medium already written",
            Self::InvalidReplyReceived => "Invalid reply received",
            Self::BufferOverflow => "Buffer overflow",
            Self::InvalidMessageFormat => "Invalid message format",
            Self::KeyFailureInPath => "Key failure in path",
            Self::PathSizeInvalid => "Path size invalid",
            Self::UnexpectedAttributeInList => "Unexpected attribute in list",
            Self::InvalidMemberId => "Invalid member ID",
            Self::MemberNotSettable => "Member not settable",
            Self::Group2OnlyServerFailure => "Group 2 only server general failure",
            Self::UnknownModbusError => "Unknown Modbus error",
            Self::AttributeNotGettable => "Attribute not gettable",
            Self::Unknown(_) => "Unknown error",
        };

        f.write_str(description)
    }
}
