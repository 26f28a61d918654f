//! RPMsg error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base of the firmware error code range
pub const RPMSG_ERROR_BASE: i32 = -2000;

/// Errors surfaced by RPMsg operations
///
/// Success is expressed as `Ok(..)`. Every other outcome of the firmware
/// taxonomy is a variant here, plus the address-specific failures raised while
/// resolving an endpoint address.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpmsgError {
    /// Memory could not be allocated
    #[error("Out of memory")]
    OutOfMemory,

    /// No transport buffer is available
    #[error("No buffer available")]
    NoBuffer,

    /// An argument was rejected before reaching the transport
    #[error("Invalid parameter")]
    InvalidParam,

    /// The device is not in a state that allows the operation
    #[error("Invalid device state")]
    InvalidDeviceState,

    /// The payload does not fit the buffer
    #[error("Invalid buffer size")]
    InvalidBufferSize,

    /// Endpoint initialization failed (name-service announce rejected)
    #[error("Initialization failed")]
    InitFailure,

    /// The address lies outside every bindable range
    #[error("Invalid address")]
    InvalidAddress,

    /// The dynamic address is already owned by a live endpoint
    #[error("Address already in use")]
    AddressInUse,

    /// The dynamic address pool is exhausted
    #[error("No free address")]
    NoAddress,

    /// The transport does not grant this operation
    #[error("Permission denied")]
    PermissionDenied,

    /// No endpoint matched the lookup
    #[error("Endpoint not found")]
    NotFound,
}

/// Result type for RPMsg operations
pub type Result<T> = core::result::Result<T, RpmsgError>;

impl RpmsgError {
    /// Returns the numeric code reported by the remote firmware
    ///
    /// All address failures share `RPMSG_ERR_ADDR`. `NotFound` never crosses
    /// the wire; it is given the next free code so logs stay unambiguous.
    pub const fn code(self) -> i32 {
        match self {
            RpmsgError::OutOfMemory => RPMSG_ERROR_BASE - 1,
            RpmsgError::NoBuffer => RPMSG_ERROR_BASE - 2,
            RpmsgError::InvalidParam => RPMSG_ERROR_BASE - 3,
            RpmsgError::InvalidDeviceState => RPMSG_ERROR_BASE - 4,
            RpmsgError::InvalidBufferSize => RPMSG_ERROR_BASE - 5,
            RpmsgError::InitFailure => RPMSG_ERROR_BASE - 6,
            RpmsgError::InvalidAddress | RpmsgError::AddressInUse | RpmsgError::NoAddress => {
                RPMSG_ERROR_BASE - 7
            }
            RpmsgError::PermissionDenied => RPMSG_ERROR_BASE - 8,
            RpmsgError::NotFound => RPMSG_ERROR_BASE - 9,
        }
    }

    /// Maps a firmware code back to an error
    ///
    /// `RPMSG_ERR_ADDR` decodes to [`RpmsgError::InvalidAddress`]. Zero and
    /// unknown codes yield `None`.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code.wrapping_sub(RPMSG_ERROR_BASE) {
            -1 => Some(RpmsgError::OutOfMemory),
            -2 => Some(RpmsgError::NoBuffer),
            -3 => Some(RpmsgError::InvalidParam),
            -4 => Some(RpmsgError::InvalidDeviceState),
            -5 => Some(RpmsgError::InvalidBufferSize),
            -6 => Some(RpmsgError::InitFailure),
            -7 => Some(RpmsgError::InvalidAddress),
            -8 => Some(RpmsgError::PermissionDenied),
            -9 => Some(RpmsgError::NotFound),
            _ => None,
        }
    }

    /// Returns the firmware constant name for diagnostics
    pub const fn code_name(self) -> &'static str {
        match self {
            RpmsgError::OutOfMemory => "RPMSG_ERR_NO_MEM",
            RpmsgError::NoBuffer => "RPMSG_ERR_NO_BUFF",
            RpmsgError::InvalidParam => "RPMSG_ERR_PARAM",
            RpmsgError::InvalidDeviceState => "RPMSG_ERR_DEV_STATE",
            RpmsgError::InvalidBufferSize => "RPMSG_ERR_BUFF_SIZE",
            RpmsgError::InitFailure => "RPMSG_ERR_INIT",
            RpmsgError::InvalidAddress | RpmsgError::AddressInUse | RpmsgError::NoAddress => {
                "RPMSG_ERR_ADDR"
            }
            RpmsgError::PermissionDenied => "RPMSG_ERR_PERM",
            RpmsgError::NotFound => "RPMSG_ERR_NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware_codes() {
        assert_eq!(RpmsgError::OutOfMemory.code(), -2001);
        assert_eq!(RpmsgError::NoBuffer.code(), -2002);
        assert_eq!(RpmsgError::InvalidParam.code(), -2003);
        assert_eq!(RpmsgError::InvalidDeviceState.code(), -2004);
        assert_eq!(RpmsgError::InvalidBufferSize.code(), -2005);
        assert_eq!(RpmsgError::InitFailure.code(), -2006);
        assert_eq!(RpmsgError::PermissionDenied.code(), -2008);
    }

    #[test]
    fn test_address_errors_share_code() {
        assert_eq!(RpmsgError::InvalidAddress.code(), -2007);
        assert_eq!(RpmsgError::AddressInUse.code(), -2007);
        assert_eq!(RpmsgError::NoAddress.code(), -2007);
        assert_eq!(RpmsgError::from_code(-2007), Some(RpmsgError::InvalidAddress));
    }

    #[test]
    fn test_from_code_rejects_unknown() {
        assert_eq!(RpmsgError::from_code(0), None);
        assert_eq!(RpmsgError::from_code(-1), None);
        assert_eq!(RpmsgError::from_code(-2010), None);
        assert_eq!(RpmsgError::from_code(-2005), Some(RpmsgError::InvalidBufferSize));
    }

    #[test]
    fn test_code_names() {
        assert_eq!(RpmsgError::NoBuffer.code_name(), "RPMSG_ERR_NO_BUFF");
        assert_eq!(RpmsgError::AddressInUse.code_name(), "RPMSG_ERR_ADDR");
        assert_eq!(RpmsgError::InitFailure.to_string(), "Initialization failed");
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&RpmsgError::NoAddress).unwrap();
        let decoded: RpmsgError = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, RpmsgError::NoAddress);
    }
}
