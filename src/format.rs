//! The tag codec: the physical wire layout of one MessagePack value header.
//!
//! Every encoded value begins with a single discriminant byte. Small values
//! (fixint, fixstr, fixarray, fixmap) carry their payload inside the
//! discriminant itself; everything else is followed by a big-endian payload of
//! a width selected by the discriminant.
//!
//! ```text
//! 0x00..=0x7f  positive fixint        0xc0        nil
//! 0x80..=0x8f  fixmap                 0xc1        (reserved)
//! 0x90..=0x9f  fixarray               0xc2, 0xc3  false, true
//! 0xa0..=0xbf  fixstr                 0xc4..0xc6  bin 8/16/32
//! 0xe0..=0xff  negative fixint        0xc7..0xc9  ext 8/16/32
//! 0xca, 0xcb   float 32/64            0xcc..0xcf  uint 8/16/32/64
//! 0xd0..0xd3   int 8/16/32/64         0xd4..0xd8  fixext 1/2/4/8/16
//! 0xd9..0xdb   str 8/16/32            0xdc, 0xdd  array 16/32
//! 0xde, 0xdf   map 16/32
//! ```
//!
//! Only the header is handled here. String, binary and extension payloads
//! follow the header as raw bytes and are moved by the reader and writer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The largest possible encoded tag: a discriminant plus an 8-byte payload.
pub const MAX_TAG_SIZE: usize = 9;

const NIL: u8 = 0xc0;
const RESERVED: u8 = 0xc1;
const FALSE: u8 = 0xc2;
const TRUE: u8 = 0xc3;
const BIN8: u8 = 0xc4;
const BIN16: u8 = 0xc5;
const BIN32: u8 = 0xc6;
const EXT8: u8 = 0xc7;
const EXT16: u8 = 0xc8;
const EXT32: u8 = 0xc9;
const FLOAT32: u8 = 0xca;
const FLOAT64: u8 = 0xcb;
const UINT8: u8 = 0xcc;
const UINT16: u8 = 0xcd;
const UINT32: u8 = 0xce;
const UINT64: u8 = 0xcf;
const INT8: u8 = 0xd0;
const INT16: u8 = 0xd1;
const INT32: u8 = 0xd2;
const INT64: u8 = 0xd3;
const FIXEXT1: u8 = 0xd4;
const FIXEXT16: u8 = 0xd8;
const STR8: u8 = 0xd9;
const STR16: u8 = 0xda;
const STR32: u8 = 0xdb;
const ARRAY16: u8 = 0xdc;
const ARRAY32: u8 = 0xdd;
const MAP16: u8 = 0xde;
const MAP32: u8 = 0xdf;

const FIXMAP: u8 = 0x80;
const FIXARRAY: u8 = 0x90;
const FIXSTR: u8 = 0xa0;

/// Which revision of the wire format to produce and accept.
///
/// The legacy v4 format predates the str8, bin and ext families: strings and
/// binary blobs shared the "raw" discriminants (fixstr, str16, str32). Selecting
/// [`Version::V4`] makes the writer emit only those forms and the reader reject
/// the newer ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Version {
    /// The current MessagePack format.
    #[default]
    Current,
    /// The legacy v4 format.
    #[cfg(feature = "compatibility")]
    V4,
}

impl Version {
    /// Returns true for the legacy v4 format.
    pub fn is_legacy(self) -> bool {
        match self {
            Self::Current => false,
            #[cfg(feature = "compatibility")]
            Self::V4 => true,
        }
    }
}

/// The kind of a value, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `nil`
    Nil,
    /// `true` or `false`
    Bool,
    /// A non-negative integer.
    Uint,
    /// A signed integer (negative, or encoded with an int discriminant).
    Int,
    /// An IEEE-754 single precision float.
    Float,
    /// An IEEE-754 double precision float.
    Double,
    /// A UTF-8 string (validity is checked only when requested).
    Str,
    /// A binary blob.
    Bin,
    /// An array of values.
    Array,
    /// A map of key/value pairs.
    Map,
    /// An extension value: a type byte plus a binary blob.
    #[cfg(feature = "extensions")]
    Ext,
}

impl Kind {
    /// Returns the lowercase name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::Uint => "uint",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Str => "str",
            Self::Bin => "bin",
            Self::Array => "array",
            Self::Map => "map",
            #[cfg(feature = "extensions")]
            Self::Ext => "ext",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded value header.
///
/// Scalars carry their value. Compound and variable-length kinds carry their
/// declared count: elements for arrays, key/value pairs for maps, bytes for
/// strings, binary blobs and extensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tag {
    /// `nil`
    Nil,
    /// A boolean.
    Bool(bool),
    /// A non-negative integer.
    Uint(u64),
    /// A signed integer. Non-negative values are encoded with uint forms.
    Int(i64),
    /// A single precision float.
    Float(f32),
    /// A double precision float.
    Double(f64),
    /// A string header with its length in bytes.
    Str(u32),
    /// A binary blob header with its length in bytes.
    Bin(u32),
    /// An array header with its element count.
    Array(u32),
    /// A map header with its key/value pair count.
    Map(u32),
    /// An extension header with its type and length in bytes.
    #[cfg(feature = "extensions")]
    Ext(i8, u32),
}

impl Tag {
    /// Returns the kind of this tag.
    ///
    /// Signed integers that hold a non-negative value still report
    /// [`Kind::Int`]; the distinction only reflects the wire discriminant.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Nil => Kind::Nil,
            Self::Bool(_) => Kind::Bool,
            Self::Uint(_) => Kind::Uint,
            Self::Int(_) => Kind::Int,
            Self::Float(_) => Kind::Float,
            Self::Double(_) => Kind::Double,
            Self::Str(_) => Kind::Str,
            Self::Bin(_) => Kind::Bin,
            Self::Array(_) => Kind::Array,
            Self::Map(_) => Kind::Map,
            #[cfg(feature = "extensions")]
            Self::Ext(..) => Kind::Ext,
        }
    }

    /// Returns the declared count of a compound or variable-length tag.
    pub fn count(&self) -> Option<u32> {
        match *self {
            Self::Str(n) | Self::Bin(n) | Self::Array(n) | Self::Map(n) => Some(n),
            #[cfg(feature = "extensions")]
            Self::Ext(_, n) => Some(n),
            _ => None,
        }
    }

    /// Encodes the tag into `buf` using the shortest form for its payload and
    /// returns the number of bytes used.
    pub fn encode(&self, version: Version, buf: &mut [u8; MAX_TAG_SIZE]) -> usize {
        match *self {
            Self::Nil => put(buf, NIL, &[]),
            Self::Bool(false) => put(buf, FALSE, &[]),
            Self::Bool(true) => put(buf, TRUE, &[]),
            Self::Uint(v) => encode_uint(buf, v),
            Self::Int(v) => encode_int(buf, v),
            Self::Float(v) => put(buf, FLOAT32, &v.to_be_bytes()),
            Self::Double(v) => put(buf, FLOAT64, &v.to_be_bytes()),
            Self::Str(n) => encode_str(buf, n, version),
            Self::Bin(n) if version.is_legacy() => encode_str(buf, n, version),
            Self::Bin(n) => {
                if let Ok(n) = u8::try_from(n) {
                    put(buf, BIN8, &[n])
                } else if let Ok(n) = u16::try_from(n) {
                    put(buf, BIN16, &n.to_be_bytes())
                } else {
                    put(buf, BIN32, &n.to_be_bytes())
                }
            }
            Self::Array(n) => {
                if n <= 15 {
                    put(buf, FIXARRAY | n as u8, &[])
                } else if let Ok(n) = u16::try_from(n) {
                    put(buf, ARRAY16, &n.to_be_bytes())
                } else {
                    put(buf, ARRAY32, &n.to_be_bytes())
                }
            }
            Self::Map(n) => {
                if n <= 15 {
                    put(buf, FIXMAP | n as u8, &[])
                } else if let Ok(n) = u16::try_from(n) {
                    put(buf, MAP16, &n.to_be_bytes())
                } else {
                    put(buf, MAP32, &n.to_be_bytes())
                }
            }
            #[cfg(feature = "extensions")]
            Self::Ext(ext_type, n) => {
                let ty = ext_type as u8;
                match n {
                    1 => put(buf, FIXEXT1, &[ty]),
                    2 => put(buf, FIXEXT1 + 1, &[ty]),
                    4 => put(buf, FIXEXT1 + 2, &[ty]),
                    8 => put(buf, FIXEXT1 + 3, &[ty]),
                    16 => put(buf, FIXEXT16, &[ty]),
                    _ => {
                        if let Ok(n) = u8::try_from(n) {
                            put(buf, EXT8, &[n, ty])
                        } else if let Ok(n) = u16::try_from(n) {
                            let [a, b] = n.to_be_bytes();
                            put(buf, EXT16, &[a, b, ty])
                        } else {
                            let [a, b, c, d] = n.to_be_bytes();
                            put(buf, EXT32, &[a, b, c, d, ty])
                        }
                    }
                }
            }
        }
    }

    /// Encodes the tag into a freshly allocated vector.
    pub fn to_vec(&self, version: Version) -> Vec<u8> {
        let mut buf = [0u8; MAX_TAG_SIZE];
        let len = self.encode(version, &mut buf);
        buf[..len].to_vec()
    }
}

fn put(buf: &mut [u8; MAX_TAG_SIZE], head: u8, payload: &[u8]) -> usize {
    buf[0] = head;
    buf[1..=payload.len()].copy_from_slice(payload);
    1 + payload.len()
}

fn encode_uint(buf: &mut [u8; MAX_TAG_SIZE], v: u64) -> usize {
    if v <= 0x7f {
        put(buf, v as u8, &[])
    } else if let Ok(v) = u8::try_from(v) {
        put(buf, UINT8, &[v])
    } else if let Ok(v) = u16::try_from(v) {
        put(buf, UINT16, &v.to_be_bytes())
    } else if let Ok(v) = u32::try_from(v) {
        put(buf, UINT32, &v.to_be_bytes())
    } else {
        put(buf, UINT64, &v.to_be_bytes())
    }
}

fn encode_int(buf: &mut [u8; MAX_TAG_SIZE], v: i64) -> usize {
    if v >= 0 {
        return encode_uint(buf, v as u64);
    }
    if v >= -32 {
        put(buf, v as i8 as u8, &[])
    } else if let Ok(v) = i8::try_from(v) {
        put(buf, INT8, &v.to_be_bytes())
    } else if let Ok(v) = i16::try_from(v) {
        put(buf, INT16, &v.to_be_bytes())
    } else if let Ok(v) = i32::try_from(v) {
        put(buf, INT32, &v.to_be_bytes())
    } else {
        put(buf, INT64, &v.to_be_bytes())
    }
}

fn encode_str(buf: &mut [u8; MAX_TAG_SIZE], n: u32, version: Version) -> usize {
    if n <= 31 {
        put(buf, FIXSTR | n as u8, &[])
    } else if n <= 0xff && !version.is_legacy() {
        put(buf, STR8, &[n as u8])
    } else if let Ok(n) = u16::try_from(n) {
        put(buf, STR16, &n.to_be_bytes())
    } else {
        put(buf, STR32, &n.to_be_bytes())
    }
}

/// Returns the full size of the tag introduced by `first`, discriminant included.
///
/// A reader must make this many bytes available before calling [`decode_tag`].
pub fn tag_size(first: u8) -> usize {
    match first {
        0x00..=0xc3 | 0xe0..=0xff => 1,
        BIN8 | STR8 | UINT8 | INT8 => 2,
        FIXEXT1..=FIXEXT16 => 2,
        BIN16 | STR16 | UINT16 | INT16 | ARRAY16 | MAP16 | EXT8 => 3,
        EXT16 => 4,
        BIN32 | STR32 | UINT32 | INT32 | ARRAY32 | MAP32 | FLOAT32 => 5,
        EXT32 => 6,
        UINT64 | INT64 | FLOAT64 => 9,
    }
}

fn be<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// Decodes one tag from the front of `bytes`, returning it together with the
/// number of bytes it occupied.
///
/// Fails with [`Error::Invalid`] on the reserved discriminant, on discriminants
/// the selected `version` does not know, on extension discriminants when the
/// `extensions` feature is disabled, and when `bytes` is shorter than the tag.
pub fn decode_tag(bytes: &[u8], version: Version) -> Result<(Tag, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| Error::invalid("truncated input: expected a tag"))?;
    let size = tag_size(first);
    if bytes.len() < size {
        return Err(Error::invalid(format!(
            "truncated input: tag 0x{first:02x} needs {size} bytes, {} available",
            bytes.len()
        )));
    }

    if version.is_legacy() && matches!(first, BIN8..=EXT32 | FIXEXT1..=STR8) {
        return Err(Error::invalid(format!(
            "discriminant 0x{first:02x} is not part of the v4 format"
        )));
    }

    let tag = match first {
        0x00..=0x7f => Tag::Uint(u64::from(first)),
        0x80..=0x8f => Tag::Map(u32::from(first & 0x0f)),
        0x90..=0x9f => Tag::Array(u32::from(first & 0x0f)),
        0xa0..=0xbf => Tag::Str(u32::from(first & 0x1f)),
        0xe0..=0xff => Tag::Int(i64::from(first as i8)),
        NIL => Tag::Nil,
        RESERVED => return Err(Error::invalid("reserved discriminant 0xc1")),
        FALSE => Tag::Bool(false),
        TRUE => Tag::Bool(true),
        BIN8 => Tag::Bin(u32::from(bytes[1])),
        BIN16 => Tag::Bin(u32::from(u16::from_be_bytes(be(bytes, 1)))),
        BIN32 => Tag::Bin(u32::from_be_bytes(be(bytes, 1))),
        FLOAT32 => Tag::Float(f32::from_be_bytes(be(bytes, 1))),
        FLOAT64 => Tag::Double(f64::from_be_bytes(be(bytes, 1))),
        UINT8 => Tag::Uint(u64::from(bytes[1])),
        UINT16 => Tag::Uint(u64::from(u16::from_be_bytes(be(bytes, 1)))),
        UINT32 => Tag::Uint(u64::from(u32::from_be_bytes(be(bytes, 1)))),
        UINT64 => Tag::Uint(u64::from_be_bytes(be(bytes, 1))),
        INT8 => Tag::Int(i64::from(bytes[1] as i8)),
        INT16 => Tag::Int(i64::from(i16::from_be_bytes(be(bytes, 1)))),
        INT32 => Tag::Int(i64::from(i32::from_be_bytes(be(bytes, 1)))),
        INT64 => Tag::Int(i64::from_be_bytes(be(bytes, 1))),
        STR8 => Tag::Str(u32::from(bytes[1])),
        STR16 => Tag::Str(u32::from(u16::from_be_bytes(be(bytes, 1)))),
        STR32 => Tag::Str(u32::from_be_bytes(be(bytes, 1))),
        ARRAY16 => Tag::Array(u32::from(u16::from_be_bytes(be(bytes, 1)))),
        ARRAY32 => Tag::Array(u32::from_be_bytes(be(bytes, 1))),
        MAP16 => Tag::Map(u32::from(u16::from_be_bytes(be(bytes, 1)))),
        MAP32 => Tag::Map(u32::from_be_bytes(be(bytes, 1))),
        EXT8..=EXT32 | FIXEXT1..=FIXEXT16 => decode_ext(first, bytes)?,
    };
    Ok((tag, size))
}

#[cfg(feature = "extensions")]
fn decode_ext(first: u8, bytes: &[u8]) -> Result<Tag> {
    let (len, ty) = match first {
        EXT8 => (u32::from(bytes[1]), bytes[2]),
        EXT16 => (u32::from(u16::from_be_bytes(be(bytes, 1))), bytes[3]),
        EXT32 => (u32::from_be_bytes(be(bytes, 1)), bytes[5]),
        _ => (1u32 << (first - FIXEXT1), bytes[1]),
    };
    Ok(Tag::Ext(ty as i8, len))
}

#[cfg(not(feature = "extensions"))]
fn decode_ext(first: u8, _bytes: &[u8]) -> Result<Tag> {
    Err(Error::invalid(format!(
        "extension discriminant 0x{first:02x} found but extension types are disabled"
    )))
}
