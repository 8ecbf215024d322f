//! Time-sortable 128-bit identifiers backed by ULIDs
//!
//! Ids render as 26 Crockford base32 characters, so byte order, textual
//! order and creation order all agree.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;
use ulid::{Generator, Ulid};

/// Length of the textual form of an [`Id`]
pub const ID_TEXT_LEN: usize = 26;

/// Errors produced when parsing an [`Id`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("id must be {ID_TEXT_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("id value overflows 128 bits")]
    Overflow,

    #[error("invalid id: {0}")]
    Invalid(String),

    #[error("id must be 16 bytes, got {0}")]
    InvalidByteLength(usize),
}

/// 128-bit identifier whose ordering equals creation order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(Ulid);

/// Every entity is scoped to a workspace
pub type WorkspaceId = Id;

impl Id {
    /// The all-zero id, never produced by the generator
    pub const fn nil() -> Self {
        Id(Ulid(0))
    }

    /// Generate a fresh id from the process-wide generator
    pub fn new() -> Self {
        IdGenerator::global().next_id()
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Id(Ulid::from_bytes(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdParseError> {
        let array: [u8; 16] = bytes
            .try_into()
            .map_err(|_| IdParseError::InvalidByteLength(bytes.len()))?;
        Ok(Id::from_bytes(array))
    }

    pub fn as_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Milliseconds since the unix epoch at which this id was generated
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::nil()
    }
}

impl From<Ulid> for Id {
    fn from(ulid: Ulid) -> Self {
        Id(ulid)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != ID_TEXT_LEN {
            return Err(IdParseError::InvalidLength(len));
        }
        // The leading character only carries the top 3 bits
        if s.starts_with(|c: char| matches!(c, '8'..='9') || c.is_ascii_alphabetic()) {
            return Err(IdParseError::Overflow);
        }
        Ulid::from_string(s)
            .map(Id)
            .map_err(|e| IdParseError::Invalid(e.to_string()))
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_string()
    }
}

impl TryFrom<&str> for Id {
    type Error = IdParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Monotonic id generator
///
/// Ids handed out by one generator are strictly increasing across threads.
pub struct IdGenerator {
    inner: Mutex<Generator>,
}

static GLOBAL: Lazy<IdGenerator> = Lazy::new(IdGenerator::new);

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Process-wide generator shared by [`Id::new`]
    pub fn global() -> &'static IdGenerator {
        &GLOBAL
    }

    pub fn next_id(&self) -> Id {
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match generator.generate() {
            Ok(ulid) => Id(ulid),
            Err(e) => {
                warn!(error = %e, "Id entropy exhausted within one millisecond");
                Id(Ulid::new())
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}
