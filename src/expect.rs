//! Typed reads on top of [`Reader`].
//!
//! Each `expect_*` method reads one value and fails with [`Error::Type`] if the
//! value on the wire is not of the asserted kind. Integers are accepted from
//! either signed or unsigned encodings as long as the value fits the requested
//! width. The only floating point conversion is narrowing a double to `f32`.
//!
//! Like every reader operation, a failed expectation latches, so a decoder can
//! run a whole sequence of expectations and check the reader once:
//!
//! ```rust
//! use tagpack::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.start_map(2)?;
//! writer.write_str("id")?;
//! writer.write_u32(7)?;
//! writer.write_str("name")?;
//! writer.write_str("seven")?;
//! writer.finish_map()?;
//! let bytes = writer.finish()?;
//!
//! let mut reader = Reader::new(&bytes);
//! let pairs = reader.expect_map()?;
//! reader.expect_str_match("id")?;
//! let id = reader.expect_u32()?;
//! reader.expect_str_match("name")?;
//! let name = reader.expect_str()?;
//! reader.done_map()?;
//! reader.finish()?;
//!
//! assert_eq!((pairs, id, name.as_str()), (2, 7, "seven"));
//! # Ok::<(), tagpack::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::format::{Kind, Tag};
use crate::reader::Reader;

impl<'a> Reader<'a> {
    fn expect_with<T>(&mut self, convert: impl FnOnce(Tag) -> Result<T>) -> Result<T> {
        let tag = self.read_tag()?;
        let result = convert(tag);
        self.latch(result)
    }

    fn expect_unsigned<T: TryFrom<u64>>(&mut self, name: &'static str) -> Result<T> {
        self.expect_with(|tag| {
            let value = match tag {
                Tag::Uint(v) => v,
                Tag::Int(v) if v >= 0 => v as u64,
                other => return Err(Error::mismatch(name, other.kind())),
            };
            T::try_from(value).map_err(|_| Error::mismatch(name, tag.kind()))
        })
    }

    fn expect_signed<T: TryFrom<i64>>(&mut self, name: &'static str) -> Result<T> {
        self.expect_with(|tag| {
            let value = match tag {
                Tag::Int(v) => v,
                Tag::Uint(v) => i64::try_from(v).map_err(|_| Error::mismatch(name, Kind::Uint))?,
                other => return Err(Error::mismatch(name, other.kind())),
            };
            T::try_from(value).map_err(|_| Error::mismatch(name, tag.kind()))
        })
    }

    /// Reads a `nil`.
    pub fn expect_nil(&mut self) -> Result<()> {
        self.expect_with(|tag| match tag {
            Tag::Nil => Ok(()),
            other => Err(Error::mismatch("nil", other.kind())),
        })
    }

    /// Reads a boolean.
    pub fn expect_bool(&mut self) -> Result<bool> {
        self.expect_with(|tag| match tag {
            Tag::Bool(b) => Ok(b),
            other => Err(Error::mismatch("bool", other.kind())),
        })
    }

    /// Reads an integer that fits in a `u8`.
    pub fn expect_u8(&mut self) -> Result<u8> {
        self.expect_unsigned("u8")
    }

    /// Reads an integer that fits in a `u16`.
    pub fn expect_u16(&mut self) -> Result<u16> {
        self.expect_unsigned("u16")
    }

    /// Reads an integer that fits in a `u32`.
    pub fn expect_u32(&mut self) -> Result<u32> {
        self.expect_unsigned("u32")
    }

    /// Reads a non-negative integer.
    pub fn expect_u64(&mut self) -> Result<u64> {
        self.expect_unsigned("u64")
    }

    /// Reads an integer that fits in an `i8`.
    pub fn expect_i8(&mut self) -> Result<i8> {
        self.expect_signed("i8")
    }

    /// Reads an integer that fits in an `i16`.
    pub fn expect_i16(&mut self) -> Result<i16> {
        self.expect_signed("i16")
    }

    /// Reads an integer that fits in an `i32`.
    pub fn expect_i32(&mut self) -> Result<i32> {
        self.expect_signed("i32")
    }

    /// Reads an integer that fits in an `i64`.
    pub fn expect_i64(&mut self) -> Result<i64> {
        self.expect_signed("i64")
    }

    /// Reads a float, narrowing a double if necessary.
    pub fn expect_f32(&mut self) -> Result<f32> {
        self.expect_with(|tag| match tag {
            Tag::Float(v) => Ok(v),
            Tag::Double(v) => Ok(v as f32),
            other => Err(Error::mismatch("float", other.kind())),
        })
    }

    /// Reads a double. Single precision floats are not widened.
    pub fn expect_f64(&mut self) -> Result<f64> {
        self.expect_with(|tag| match tag {
            Tag::Double(v) => Ok(v),
            other => Err(Error::mismatch("double", other.kind())),
        })
    }

    /// Opens an array and returns its element count. Close it with
    /// [`Reader::done_array`].
    pub fn expect_array(&mut self) -> Result<u32> {
        self.expect_with(|tag| match tag {
            Tag::Array(n) => Ok(n),
            other => Err(Error::mismatch("array", other.kind())),
        })
    }

    /// Like [`Reader::expect_array`], failing with [`Error::TooBig`] above
    /// `max` elements.
    pub fn expect_array_max(&mut self, max: u32) -> Result<u32> {
        let count = self.expect_array()?;
        self.latch(check_max(count, max))
    }

    /// Opens a map and returns its pair count. Close it with
    /// [`Reader::done_map`].
    pub fn expect_map(&mut self) -> Result<u32> {
        self.expect_with(|tag| match tag {
            Tag::Map(n) => Ok(n),
            other => Err(Error::mismatch("map", other.kind())),
        })
    }

    /// Like [`Reader::expect_map`], failing with [`Error::TooBig`] above `max`
    /// pairs.
    pub fn expect_map_max(&mut self, max: u32) -> Result<u32> {
        let count = self.expect_map()?;
        self.latch(check_max(count, max))
    }

    fn expect_str_len(&mut self) -> Result<u32> {
        self.expect_with(|tag| match tag {
            Tag::Str(n) => Ok(n),
            other => Err(Error::mismatch("str", other.kind())),
        })
    }

    fn expect_bin_len(&mut self) -> Result<u32> {
        self.expect_with(|tag| match tag {
            Tag::Bin(n) => Ok(n),
            other => Err(Error::mismatch("bin", other.kind())),
        })
    }

    fn finish_utf8(&mut self, bytes: Vec<u8>) -> Result<String> {
        let result = String::from_utf8(bytes).map_err(|_| Error::mismatch("utf-8 str", Kind::Str));
        self.latch(result)
    }

    /// Reads a complete UTF-8 string.
    pub fn expect_str(&mut self) -> Result<String> {
        let len = self.expect_str_len()?;
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_str()?;
        self.finish_utf8(bytes)
    }

    /// Like [`Reader::expect_str`], failing with [`Error::TooBig`] above `max`
    /// bytes before anything is allocated.
    pub fn expect_str_max(&mut self, max: u32) -> Result<String> {
        let len = self.expect_str_len()?;
        self.latch(check_max(len, max))?;
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_str()?;
        self.finish_utf8(bytes)
    }

    /// Reads a string and fails with [`Error::Data`] unless it equals `expected`.
    pub fn expect_str_match(&mut self, expected: &str) -> Result<()> {
        let len = self.expect_str_len()?;
        if len as usize != expected.len() {
            let err = Error::data(format!(
                "expected the {}-byte string {expected:?}, found a {len}-byte string",
                expected.len()
            ));
            return self.latch(Err(err));
        }
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_str()?;
        if bytes != expected.as_bytes() {
            let err = Error::data(format!("expected the string {expected:?}"));
            return self.latch(Err(err));
        }
        Ok(())
    }

    /// Reads a string and returns the index of the matching entry of `keys`,
    /// failing with [`Error::Data`] if none matches. Useful for decoding map
    /// keys into struct fields or enum variants.
    pub fn expect_enum(&mut self, keys: &[&str]) -> Result<usize> {
        let len = self.expect_str_len()?;
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_str()?;
        let found = keys.iter().position(|k| k.as_bytes() == bytes.as_slice());
        let result = found.ok_or_else(|| {
            Error::data(format!(
                "string {:?} is not one of {keys:?}",
                String::from_utf8_lossy(&bytes)
            ))
        });
        self.latch(result)
    }

    /// Reads a string borrowed from the input. Only slice readers support
    /// this.
    pub fn expect_str_borrowed(&mut self) -> Result<&'a str> {
        let len = self.expect_str_len()?;
        let bytes = self.read_borrowed(len as usize)?;
        self.done_str()?;
        let result =
            std::str::from_utf8(bytes).map_err(|_| Error::mismatch("utf-8 str", Kind::Str));
        self.latch(result)
    }

    /// Reads a complete binary blob.
    pub fn expect_bin(&mut self) -> Result<Vec<u8>> {
        let len = self.expect_bin_len()?;
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_bin()?;
        Ok(bytes)
    }

    /// Like [`Reader::expect_bin`], failing with [`Error::TooBig`] above `max`
    /// bytes before anything is allocated.
    pub fn expect_bin_max(&mut self, max: u32) -> Result<Vec<u8>> {
        let len = self.expect_bin_len()?;
        self.latch(check_max(len, max))?;
        let bytes = self.read_bytes_vec(len as usize)?;
        self.done_bin()?;
        Ok(bytes)
    }

    /// Reads a binary blob borrowed from the input. Only slice readers
    /// support this.
    pub fn expect_bin_borrowed(&mut self) -> Result<&'a [u8]> {
        let len = self.expect_bin_len()?;
        let bytes = self.read_borrowed(len as usize)?;
        self.done_bin()?;
        Ok(bytes)
    }
}

fn check_max(count: u32, max: u32) -> Result<u32> {
    if count > max {
        return Err(Error::TooBig {
            size: u64::from(count),
            limit: u64::from(max),
        });
    }
    Ok(count)
}
