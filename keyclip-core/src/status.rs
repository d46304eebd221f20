//! Status codes reported by the secure-storage backend.
//!
//! Codes follow the platform keychain's `OSStatus` numbering so that a status
//! surfaced by any backend reads the same way in logs and errors.

use std::fmt;

/// A secure-storage status code.
///
/// `Status::SUCCESS` is never carried by an error; every other value is a
/// failure, of which only [`Status::ITEM_NOT_FOUND`] is treated as an
/// expected absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    /// No error.
    pub const SUCCESS: Status = Status(0);
    /// Function or operation not implemented.
    pub const UNIMPLEMENTED: Status = Status(-4);
    /// One or more parameters were not valid.
    pub const PARAM: Status = Status(-50);
    /// Failed to allocate memory.
    pub const ALLOCATE: Status = Status(-108);
    /// No keychain is available.
    pub const NOT_AVAILABLE: Status = Status(-25291);
    /// Authorization or authentication failed.
    pub const AUTH_FAILED: Status = Status(-25293);
    /// The item already exists.
    pub const DUPLICATE_ITEM: Status = Status(-25299);
    /// The item could not be found.
    pub const ITEM_NOT_FOUND: Status = Status(-25300);
    /// User interaction is not allowed.
    pub const INTERACTION_NOT_ALLOWED: Status = Status(-25308);
    /// The caller has no access to the item's access group.
    pub const NO_ACCESS_FOR_ITEM: Status = Status(-25243);
    /// Unable to decode the provided data.
    pub const DECODE: Status = Status(-26275);
    /// An internal component failed.
    pub const INTERNAL_COMPONENT: Status = Status(-26276);
    /// A required entitlement (usually the access group) is missing.
    pub const MISSING_ENTITLEMENT: Status = Status(-34018);

    /// Wrap a raw status code.
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    /// The raw status code.
    pub const fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn is_not_found(self) -> bool {
        self == Self::ITEM_NOT_FOUND
    }

    /// Human-readable description of the status.
    pub fn message(self) -> String {
        let known = match self {
            Self::SUCCESS => "No error.",
            Self::UNIMPLEMENTED => "Function or operation not implemented.",
            Self::PARAM => "One or more parameters passed to a function were not valid.",
            Self::ALLOCATE => "Failed to allocate memory.",
            Self::NOT_AVAILABLE => {
                "No keychain is available. You may need to restart your computer."
            }
            Self::AUTH_FAILED => "The user name or passphrase you entered is not correct.",
            Self::DUPLICATE_ITEM => "The specified item already exists in the keychain.",
            Self::ITEM_NOT_FOUND => "The specified item could not be found in the keychain.",
            Self::INTERACTION_NOT_ALLOWED => "User interaction is not allowed.",
            Self::NO_ACCESS_FOR_ITEM => {
                "Ignore the access group if running on the iPhone simulator."
            }
            Self::DECODE => "Unable to decode the provided data.",
            Self::INTERNAL_COMPONENT => "An internal component failed.",
            Self::MISSING_ENTITLEMENT => {
                "A required entitlement isn't present. Check the access group."
            }
            _ => return format!("Refer to SecBase.h for description (status:{})", self.0),
        };
        known.to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status: {})", self.message(), self.0)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}
