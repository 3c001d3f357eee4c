//! Identifier types for the entitlement engine.
//!
//! Accounts and plans use stable integer identifiers allocated by the
//! storage layer. Order numbers embed a ULID so they are globally unique
//! and naturally time-ordered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Prefix for generated order numbers.
const ORDER_NO_PREFIX: &str = "STK";

/// Macro to define an integer-based identifier type with standard trait
/// implementations: `Display`, `FromStr`, big-endian byte encoding (for
/// ordered storage keys), and string-based serde.
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier from a raw integer.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Return the raw integer value.
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }

            /// Return the big-endian byte encoding (8 bytes).
            ///
            /// Big-endian ordering keeps storage keys sorted by id.
            #[must_use]
            pub fn to_be_bytes(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            /// Decode an identifier from big-endian bytes.
            ///
            /// # Errors
            ///
            /// Returns `IdError::InvalidBytes` if the slice is not 8 bytes.
            pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, IdError> {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| IdError::InvalidBytes)?;
                Ok(Self(u64::from_be_bytes(arr)))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self).map_err(|_| IdError::InvalidInteger)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

int_id_type!(AccountId, "A stable integer account identifier allocated at registration.");
int_id_type!(PlanId, "A stable integer subscription-plan identifier.");

/// A globally-unique payment order number (`out_trade_no`).
///
/// Format: `STK` followed by a ULID, so order numbers sort
/// chronologically and never collide across concurrent checkouts.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNo(String);

impl OrderNo {
    /// Generate a new order number with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{ORDER_NO_PREFIX}{}", Ulid::new()))
    }

    /// Return the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the UTF-8 bytes of the order number (storage key).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for OrderNo {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid_part = s.strip_prefix(ORDER_NO_PREFIX).ok_or(IdError::InvalidOrderNo)?;
        Ulid::from_string(ulid_part).map_err(|_| IdError::InvalidOrderNo)?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for OrderNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderNo({})", self.0)
    }
}

impl fmt::Display for OrderNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid integer.
    #[error("invalid integer identifier")]
    InvalidInteger,

    /// The byte slice has the wrong length.
    #[error("invalid identifier bytes")]
    InvalidBytes,

    /// The input is not a valid order number.
    #[error("invalid order number format")]
    InvalidOrderNo,
}
