//! Document identifiers.
//!
//! An [`ObjectId`] is 12 bytes laid out like a document database object id:
//!
//! ```text
//! ┌───────────────┬─────────────────────┬─────────────┐
//! │ seconds (4 B) │ process random (5 B)│ counter (3B)│
//! └───────────────┴─────────────────────┴─────────────┘
//! ```
//!
//! The wire form is always 24 lowercase hex characters.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use rand::Rng;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Number of raw bytes in an identifier.
pub const OBJECT_ID_LEN: usize = 12;

/// Number of hex characters in the textual form.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Random value fixed for the lifetime of the process.
static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(|| rand::rng().random());

/// Counter seeded randomly so restarts don't replay the same sequence.
static COUNTER: LazyLock<AtomicU32> = LazyLock::new(|| AtomicU32::new(rand::rng().random()));

/// Failure to parse an identifier from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the provided hex string is not a valid ObjectID: {input:?}")]
pub struct ObjectIdError {
    input: String,
}

/// Globally unique, immutable document identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        // Timestamps before 1970 or past 2106 wrap; both are out of range in practice.
        let seconds = Utc::now().timestamp() as u32;
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

        let [s0, s1, s2, s3] = seconds.to_be_bytes();
        let [p0, p1, p2, p3, p4] = *PROCESS_UNIQUE;
        // Low 24 bits of the counter
        let [_, c0, c1, c2] = counter.to_be_bytes();

        Self([s0, s1, s2, s3, p0, p1, p2, p3, p4, c0, c1, c2])
    }

    /// Build an identifier from raw bytes.
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the identifier.
    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parse a 24-character hex string.
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        let invalid = || ObjectIdError {
            input: s.to_string(),
        };

        // from_str_radix would accept a leading '+', so check digits up front
        if s.len() != OBJECT_ID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (byte, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }

        Ok(Self(bytes))
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Seconds since the Unix epoch embedded in the identifier.
    pub fn timestamp_secs(&self) -> u32 {
        let [s0, s1, s2, s3, ..] = self.0;
        u32::from_be_bytes([s0, s1, s2, s3])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = ObjectId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 24 character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ObjectId::parse_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
