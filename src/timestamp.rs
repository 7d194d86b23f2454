//! The timestamp extension (type `-1`).
//!
//! Three payload layouts exist and the shortest one that can hold the value is
//! always produced:
//!
//! ```text
//! timestamp32: [seconds: u32]                          (4 bytes)
//! timestamp64: [nanoseconds: 30 bits | seconds: 34 bits] (8 bytes)
//! timestamp96: [nanoseconds: u32] [seconds: i64]       (12 bytes)
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// The extension type reserved for timestamps.
pub const TIMESTAMP_EXT_TYPE: i8 = -1;

/// The largest timestamp payload (timestamp96).
pub const MAX_TIMESTAMP_SIZE: usize = 12;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// A point in time relative to the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl Timestamp {
    /// Creates a timestamp. `nanoseconds` must be below one billion.
    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self> {
        if nanoseconds >= NANOS_PER_SECOND {
            return Err(Error::invalid(format!(
                "timestamp nanoseconds out of range: {nanoseconds}"
            )));
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Creates a timestamp from whole seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds: 0,
        }
    }

    /// Seconds since the Unix epoch.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Nanoseconds within the second.
    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    /// Size of the payload [`Timestamp::encode`] produces.
    pub fn encoded_len(&self) -> u32 {
        if self.seconds >> 34 == 0 {
            if self.nanoseconds == 0 && self.seconds <= i64::from(u32::MAX) {
                4
            } else {
                8
            }
        } else {
            12
        }
    }

    /// Encodes the payload (without the extension header) into `buf` and
    /// returns the number of bytes used.
    pub fn encode(&self, buf: &mut [u8; MAX_TIMESTAMP_SIZE]) -> usize {
        match self.encoded_len() {
            4 => {
                buf[..4].copy_from_slice(&(self.seconds as u32).to_be_bytes());
                4
            }
            8 => {
                let packed = (u64::from(self.nanoseconds) << 34) | self.seconds as u64;
                buf[..8].copy_from_slice(&packed.to_be_bytes());
                8
            }
            _ => {
                buf[..4].copy_from_slice(&self.nanoseconds.to_be_bytes());
                buf[4..12].copy_from_slice(&self.seconds.to_be_bytes());
                12
            }
        }
    }

    /// Decodes a timestamp payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        match payload.len() {
            4 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(payload);
                Ok(Self::from_seconds(i64::from(u32::from_be_bytes(b))))
            }
            8 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(payload);
                let packed = u64::from_be_bytes(b);
                let nanoseconds = (packed >> 34) as u32;
                let seconds = (packed & 0x3_ffff_ffff) as i64;
                Self::new(seconds, nanoseconds)
            }
            12 => {
                let mut n = [0u8; 4];
                let mut s = [0u8; 8];
                n.copy_from_slice(&payload[..4]);
                s.copy_from_slice(&payload[4..]);
                Self::new(i64::from_be_bytes(s), u32::from_be_bytes(n))
            }
            len => Err(Error::invalid(format!(
                "timestamp payload of {len} bytes (expected 4, 8 or 12)"
            ))),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}
