//! The read-side engine.
//!
//! A [`Reader`] is a sequential cursor over MessagePack data. It reads either
//! straight out of a borrowed slice, or out of an owned buffer that it refills
//! from any [`std::io::Read`] source whenever more bytes are needed. Refills
//! are the only point where the reader calls out; the decoding logic itself
//! never blocks.
//!
//! Reading is pull based: [`Reader::read_tag`] yields the next header, and the
//! caller walks into compounds, pulls their contents and closes them with the
//! matching `done_*` call. A [`Track`] stack checks that every compound is
//! consumed exactly. For typed reads see the `expect_*` family in
//! [`crate::expect`].
//!
//! The first error is latched: every later call returns it again without
//! touching the input.
//!
//! ```rust
//! use tagpack::{Reader, Tag};
//!
//! let data = [0x92, 0x01, 0xa2, b'h', b'i'];
//! let mut reader = Reader::new(&data);
//!
//! assert_eq!(reader.read_tag()?, Tag::Array(2));
//! assert_eq!(reader.read_tag()?, Tag::Uint(1));
//! assert_eq!(reader.read_tag()?, Tag::Str(2));
//! assert_eq!(reader.read_borrowed(2)?, b"hi");
//! reader.done_str()?;
//! reader.done_array()?;
//! reader.finish()?;
//! # Ok::<(), tagpack::Error>(())
//! ```

use std::fmt;
use std::io::{self, Read};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{decode_tag, tag_size, Tag};
use crate::track::{Compound, Track};

enum Buffer<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

/// A pull-based MessagePack decoder.
pub struct Reader<'a> {
    data: Buffer<'a>,
    /// Cursor within `data`.
    pos: usize,
    /// End of the valid bytes in `data`.
    end: usize,
    /// Bytes consumed before the current buffer window.
    base: u64,
    source: Option<Box<dyn Read + 'a>>,
    track: Track,
    error: Option<Error>,
    config: Config,
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("position", &self.position())
            .field("buffered", &(self.end - self.pos))
            .field("streaming", &self.source.is_some())
            .field("depth", &self.track.depth())
            .field("error", &self.error)
            .finish()
    }
}

impl<'a> Reader<'a> {
    /// Creates a reader over a complete in-memory message with the default
    /// configuration.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, Config::default())
    }

    /// Creates a reader over a complete in-memory message.
    pub fn with_config(data: &'a [u8], config: Config) -> Self {
        Self {
            end: data.len(),
            data: Buffer::Borrowed(data),
            pos: 0,
            base: 0,
            source: None,
            track: Track::new(config.max_depth),
            error: None,
            config,
        }
    }

    /// Creates a streaming reader that pulls bytes from `source` into an
    /// owned buffer of [`Config::buffer_size`] bytes.
    pub fn from_source<R: Read + 'a>(source: R, config: Config) -> Self {
        let capacity = config.stream_buffer_size();
        Self {
            data: Buffer::Owned(vec![0u8; capacity]),
            pos: 0,
            end: 0,
            base: 0,
            source: Some(Box::new(source)),
            track: Track::new(config.max_depth),
            error: None,
            config,
        }
    }

    /// The configuration this reader was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The latched error, if any operation has failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Total number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Bytes available without refilling. For slice readers this is all of
    /// the unread input.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Number of compounds currently open.
    pub fn depth(&self) -> usize {
        self.track.depth()
    }

    fn buf(&self) -> &[u8] {
        match &self.data {
            Buffer::Borrowed(b) => b,
            Buffer::Owned(v) => v,
        }
    }

    fn capacity(&self) -> usize {
        self.buf().len()
    }

    pub(crate) fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        if self.error.is_none() {
            tracing::debug!(error = %err, position = self.position(), "reader failed");
            self.error = Some(err.clone());
        }
        err
    }

    /// Latches the error of `result`, if any, and passes it through.
    pub(crate) fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    /// Makes at least `n` bytes available after the cursor, refilling from
    /// the source when needed. `n` must not exceed the buffer capacity.
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.end - self.pos >= n {
            return Ok(());
        }
        let Some(source) = self.source.as_mut() else {
            return Err(Error::invalid(format!(
                "truncated input: {n} bytes needed, {} left",
                self.end - self.pos
            )));
        };
        let Buffer::Owned(buf) = &mut self.data else {
            return Err(Error::misuse("streaming reader without an owned buffer"));
        };
        if n > buf.len() {
            return Err(Error::TooBig {
                size: n as u64,
                limit: buf.len() as u64,
            });
        }

        buf.copy_within(self.pos..self.end, 0);
        self.base += self.pos as u64;
        self.end -= self.pos;
        self.pos = 0;

        while self.end < n {
            match source.read(&mut buf[self.end..]) {
                Ok(0) => return Err(Error::eof()),
                Ok(read) => {
                    tracing::trace!(bytes = read, "reader refilled");
                    self.end += read;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Decodes the next tag without tracking it.
    fn next_tag(&mut self, consume: bool) -> Result<Tag> {
        self.ensure(1)?;
        let first = self.buf()[self.pos];
        let size = tag_size(first);
        if size > 1 {
            self.ensure(size)?;
        }
        let (tag, used) = decode_tag(&self.buf()[self.pos..self.end], self.config.version)?;
        if consume {
            self.pos += used;
        }
        Ok(tag)
    }

    fn read_tag_inner(&mut self) -> Result<Tag> {
        let tag = self.next_tag(true)?;
        self.track.element()?;
        match tag {
            Tag::Str(n) => {
                self.config.check_size(n)?;
                self.track.push(Compound::Str, n)?;
            }
            Tag::Bin(n) => {
                self.config.check_size(n)?;
                self.track.push(Compound::Bin, n)?;
            }
            Tag::Array(n) => self.track.push(Compound::Array, n)?,
            Tag::Map(n) => self.track.push(Compound::Map, n)?,
            #[cfg(feature = "extensions")]
            Tag::Ext(_, n) => {
                self.config.check_size(n)?;
                self.track.push(Compound::Ext, n)?;
            }
            _ => {}
        }
        Ok(tag)
    }

    /// Reads the next tag.
    ///
    /// For arrays and maps the caller must then read exactly the declared
    /// number of values (twice that for maps, keys and values alternating) and
    /// call [`Reader::done_array`] / [`Reader::done_map`]. For strings, binary
    /// blobs and extensions the caller must consume exactly the declared
    /// number of bytes and call the matching `done_*`.
    pub fn read_tag(&mut self) -> Result<Tag> {
        self.check()?;
        let result = self.read_tag_inner();
        self.latch(result)
    }

    /// Decodes the next tag without consuming it.
    pub fn peek_tag(&mut self) -> Result<Tag> {
        self.check()?;
        let result = self.next_tag(false);
        self.latch(result)
    }

    /// Copies `n` bytes out of the input without tracking them.
    fn copy_out(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            let available = self.end - self.pos;
            if available == 0 {
                let left = out.len() - filled;
                if self.source.is_some() && left >= self.capacity() {
                    return self.read_direct(&mut out[filled..]);
                }
                self.ensure(left.min(self.capacity()))?;
                continue;
            }
            let take = available.min(out.len() - filled);
            out[filled..filled + take].copy_from_slice(&self.buf()[self.pos..self.pos + take]);
            self.pos += take;
            filled += take;
        }
        Ok(())
    }

    /// Reads straight from the source, bypassing the (empty) buffer.
    fn read_direct(&mut self, out: &mut [u8]) -> Result<()> {
        let Some(source) = self.source.as_mut() else {
            return Err(Error::invalid("truncated input"));
        };
        source.read_exact(out).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::eof()
            } else {
                Error::from(e)
            }
        })?;
        self.base += out.len() as u64;
        Ok(())
    }

    /// Drops `n` bytes of input without tracking them.
    fn discard(&mut self, mut n: u64) -> Result<()> {
        loop {
            let available = (self.end - self.pos) as u64;
            let take = available.min(n);
            self.pos += take as usize;
            n -= take;
            if n == 0 {
                return Ok(());
            }
            let chunk = (n as usize).min(self.capacity()).max(1);
            self.ensure(chunk)?;
        }
    }

    /// Fills `out` with the next bytes of the open string, binary blob or
    /// extension.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        self.check()?;
        let result = self.track.bytes(out.len()).and_then(|()| self.copy_out(out));
        self.latch(result)
    }

    /// Reads the next `n` bytes of the open string, binary blob or extension
    /// into a new vector.
    pub fn read_bytes_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        self.check()?;
        let result = self.track.bytes(n).and_then(|()| {
            if self.source.is_none() {
                // Slice input holds the whole payload or none of it.
                self.ensure(n)?;
                let out = self.buf()[self.pos..self.pos + n].to_vec();
                self.pos += n;
                return Ok(out);
            }
            // Grow with the bytes that actually arrive.
            let mut out = Vec::with_capacity(n.min(self.capacity()));
            while out.len() < n {
                let filled = out.len();
                let chunk = (n - filled).min(self.capacity().max(1));
                out.resize(filled + chunk, 0);
                self.copy_out(&mut out[filled..])?;
            }
            Ok(out)
        });
        self.latch(result)
    }

    /// Returns the next `n` bytes of the open string, binary blob or
    /// extension as a view into the reader's buffer.
    ///
    /// For streaming readers `n` must fit in the buffer; larger requests fail
    /// with [`Error::TooBig`].
    pub fn read_bytes_inplace(&mut self, n: usize) -> Result<&[u8]> {
        self.check()?;
        let result = self.track.bytes(n).and_then(|()| self.ensure(n));
        if let Err(e) = result {
            return Err(self.fail(e));
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf()[start..start + n])
    }

    /// Returns the next `n` bytes of the open string, binary blob or
    /// extension borrowed from the input slice for its full lifetime.
    ///
    /// Only slice readers support this; streaming readers fail with
    /// [`Error::Misuse`].
    pub fn read_borrowed(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check()?;
        let data: &'a [u8] = match self.data {
            Buffer::Borrowed(data) => data,
            Buffer::Owned(_) => {
                let err = Error::misuse("borrowed reads need a reader over a slice");
                return Err(self.fail(err));
            }
        };
        let result = self.track.bytes(n).and_then(|()| self.ensure(n));
        if let Err(e) = result {
            return Err(self.fail(e));
        }
        let start = self.pos;
        self.pos += n;
        Ok(&data[start..start + n])
    }

    /// Skips the next `n` bytes of the open string, binary blob or extension.
    pub fn skip_bytes(&mut self, n: usize) -> Result<()> {
        self.check()?;
        let result = self.track.bytes(n).and_then(|()| self.discard(n as u64));
        self.latch(result)
    }

    pub(crate) fn done(&mut self, kind: Compound) -> Result<()> {
        self.check()?;
        let result = self.track.pop(kind);
        self.latch(result)
    }

    /// Closes the innermost array once all of its elements have been read.
    pub fn done_array(&mut self) -> Result<()> {
        self.done(Compound::Array)
    }

    /// Closes the innermost map once all of its keys and values have been read.
    pub fn done_map(&mut self) -> Result<()> {
        self.done(Compound::Map)
    }

    /// Closes the innermost string once all of its bytes have been read.
    pub fn done_str(&mut self) -> Result<()> {
        self.done(Compound::Str)
    }

    /// Closes the innermost binary blob once all of its bytes have been read.
    pub fn done_bin(&mut self) -> Result<()> {
        self.done(Compound::Bin)
    }

    /// Closes the innermost extension once all of its bytes have been read.
    #[cfg(feature = "extensions")]
    pub fn done_ext(&mut self) -> Result<()> {
        self.done(Compound::Ext)
    }

    /// Skips one complete value, compounds included.
    ///
    /// Nested compounds are walked with a counter stack rather than by
    /// recursion and may be at most [`Config::max_depth`] deep, counting the
    /// compounds the caller already has open.
    pub fn skip_value(&mut self) -> Result<()> {
        self.check()?;
        let result = self.skip_value_inner();
        self.latch(result)
    }

    fn skip_value_inner(&mut self) -> Result<()> {
        self.track.element()?;
        let mut parents: Vec<u64> = Vec::new();
        let mut left: u64 = 1;
        loop {
            if left == 0 {
                match parents.pop() {
                    Some(l) => {
                        left = l;
                        continue;
                    }
                    None => return Ok(()),
                }
            }
            left -= 1;

            let children = match self.next_tag(true)? {
                Tag::Str(n) | Tag::Bin(n) => {
                    self.config.check_size(n)?;
                    self.discard(u64::from(n))?;
                    0
                }
                #[cfg(feature = "extensions")]
                Tag::Ext(_, n) => {
                    self.config.check_size(n)?;
                    self.discard(u64::from(n))?;
                    0
                }
                Tag::Array(n) => u64::from(n),
                Tag::Map(n) => u64::from(n) * 2,
                _ => 0,
            };
            if children > 0 {
                if self.track.depth() + parents.len() + 1 > self.config.max_depth {
                    return Err(Error::TooDeep {
                        limit: self.config.max_depth,
                    });
                }
                parents.push(left);
                left = children;
            }
        }
    }

    /// Reads an extension value, returning its type and payload.
    #[cfg(feature = "extensions")]
    pub fn read_ext(&mut self) -> Result<(i8, Vec<u8>)> {
        match self.read_tag()? {
            Tag::Ext(ext_type, n) => {
                let payload = self.read_bytes_vec(n as usize)?;
                self.done_ext()?;
                Ok((ext_type, payload))
            }
            other => {
                let err = Error::mismatch("ext", other.kind());
                Err(self.fail(err))
            }
        }
    }

    /// Reads a timestamp extension value.
    #[cfg(feature = "extensions")]
    pub fn read_timestamp(&mut self) -> Result<crate::timestamp::Timestamp> {
        use crate::timestamp::{Timestamp, MAX_TIMESTAMP_SIZE, TIMESTAMP_EXT_TYPE};

        match self.read_tag()? {
            Tag::Ext(TIMESTAMP_EXT_TYPE, n) if n as usize <= MAX_TIMESTAMP_SIZE => {
                let mut payload = [0u8; MAX_TIMESTAMP_SIZE];
                let payload = &mut payload[..n as usize];
                self.read_bytes(payload)?;
                self.done_ext()?;
                let result = Timestamp::decode(payload);
                self.latch(result)
            }
            Tag::Ext(TIMESTAMP_EXT_TYPE, n) => {
                let err = Error::invalid(format!("timestamp payload of {n} bytes"));
                Err(self.fail(err))
            }
            other => {
                let err = Error::mismatch("timestamp", other.kind());
                Err(self.fail(err))
            }
        }
    }

    /// Finishes reading: fails with the latched error, or with
    /// [`Error::Misuse`] if compounds are still open. Unread input after the
    /// last value is allowed; see [`Reader::remaining`].
    pub fn finish(&mut self) -> Result<()> {
        self.check()?;
        let result = self.track.check_empty();
        self.latch(result)
    }
}

/// Returns the encoded size of the first complete value in `data`.
///
/// ```rust
/// let data = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x92, 0x02, 0x03, 0xc0];
/// assert_eq!(tagpack::reader::value_size(&data)?, 9);
/// # Ok::<(), tagpack::Error>(())
/// ```
pub fn value_size(data: &[u8]) -> Result<usize> {
    let mut reader = Reader::new(data);
    reader.skip_value()?;
    Ok(reader.position() as usize)
}
