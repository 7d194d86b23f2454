//! The write-side engine.
//!
//! A [`Writer`] encodes values push-style. It either grows an in-memory
//! vector (returned by [`Writer::finish`]) or buffers output and flushes it to
//! any [`std::io::Write`] sink whenever the buffer fills. Flushing is the only
//! point where the writer calls out.
//!
//! Compounds with a known size are written with `start_*` / `finish_*` pairs.
//! A [`Track`] stack checks that exactly the declared number of elements or
//! bytes is written in between. Compounds whose size is not known upfront are
//! written with [`Writer::build_array`] / [`Writer::build_map`]; see
//! [`crate::builder`].
//!
//! The first error is latched: every later call returns it again and writes
//! nothing.
//!
//! ```rust
//! use tagpack::Writer;
//!
//! let mut writer = Writer::new();
//! writer.start_map(2)?;
//! writer.write_str("a")?;
//! writer.write_u8(1)?;
//! writer.write_str("b")?;
//! writer.start_array(2)?;
//! writer.write_u8(2)?;
//! writer.write_u8(3)?;
//! writer.finish_array()?;
//! writer.finish_map()?;
//!
//! let bytes = writer.finish()?;
//! assert_eq!(bytes, [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x92, 0x02, 0x03]);
//! # Ok::<(), tagpack::Error>(())
//! ```

use std::fmt;
use std::io::Write;

use crate::builder::Builder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{Tag, MAX_TAG_SIZE};
use crate::track::{Compound, Track};

/// A push-based MessagePack encoder.
pub struct Writer<'a> {
    buffer: Vec<u8>,
    sink: Option<Box<dyn Write + 'a>>,
    /// Bytes handed to the sink so far.
    flushed: u64,
    track: Track,
    builder: Builder,
    error: Option<Error>,
    config: Config,
}

impl fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("buffered", &self.buffer.len())
            .field("flushed", &self.flushed)
            .field("streaming", &self.sink.is_some())
            .field("depth", &self.track.depth())
            .field("building", &self.builder.depth())
            .field("built_bytes", &self.builder.len())
            .field("error", &self.error)
            .finish()
    }
}

impl Default for Writer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Writer<'a> {
    /// Creates a writer that accumulates its output in memory.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an in-memory writer with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            buffer: Vec::new(),
            sink: None,
            flushed: 0,
            track: Track::new(config.max_depth),
            builder: Builder::new(config.builder_page_size),
            error: None,
            config,
        }
    }

    /// Creates a writer that flushes to `sink` every time its buffer of
    /// [`Config::buffer_size`] bytes fills up.
    pub fn with_sink<W: Write + 'a>(sink: W, config: Config) -> Self {
        let capacity = config.stream_buffer_size();
        Self {
            buffer: Vec::with_capacity(capacity),
            sink: Some(Box::new(sink)),
            flushed: 0,
            track: Track::new(config.max_depth),
            builder: Builder::new(config.builder_page_size),
            error: None,
            config,
        }
    }

    /// The configuration this writer was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The latched error, if any operation has failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Total bytes produced so far, flushed or buffered. Bytes held by open
    /// builder frames are not counted until the outermost frame completes.
    pub fn position(&self) -> u64 {
        self.flushed + self.buffer.len() as u64
    }

    /// Number of compounds currently open, builder frames included.
    pub fn depth(&self) -> usize {
        self.track.depth()
    }

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|err| {
            if self.error.is_none() {
                tracing::debug!(error = %err, position = self.position(), "writer failed");
                self.error = Some(err.clone());
            }
            err
        })
    }

    fn run(&mut self, op: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.check()?;
        let result = op(self);
        self.latch(result)
    }

    /// Sends bytes to the builder while a frame is open, otherwise to the
    /// output.
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if self.builder.is_active() {
            self.builder.append(bytes);
            Ok(())
        } else {
            self.output(bytes)
        }
    }

    fn output(&mut self, bytes: &[u8]) -> Result<()> {
        let capacity = self.config.stream_buffer_size();
        if self.sink.is_none() {
            self.buffer.extend_from_slice(bytes);
            return Ok(());
        }
        if self.buffer.len() + bytes.len() > capacity {
            self.flush_buffer()?;
        }
        if bytes.len() >= capacity {
            self.write_to_sink_direct(bytes)
        } else {
            self.buffer.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn write_to_sink_direct(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(bytes)?;
            self.flushed += bytes.len() as u64;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        if self.buffer.is_empty() {
            return Ok(());
        }
        sink.write_all(&self.buffer)?;
        tracing::trace!(bytes = self.buffer.len(), "writer flushed");
        self.flushed += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    fn emit_tag(&mut self, tag: Tag) -> Result<()> {
        let mut buf = [0u8; MAX_TAG_SIZE];
        let len = tag.encode(self.config.version, &mut buf);
        self.emit(&buf[..len])
    }

    fn write_value(&mut self, tag: Tag) -> Result<()> {
        self.run(|w| {
            w.track.element()?;
            w.emit_tag(tag)
        })
    }

    fn open(&mut self, tag: Tag) -> Result<()> {
        let compound = match tag {
            Tag::Str(_) => Compound::Str,
            Tag::Bin(_) => Compound::Bin,
            Tag::Array(_) => Compound::Array,
            Tag::Map(_) => Compound::Map,
            #[cfg(feature = "extensions")]
            Tag::Ext(..) => Compound::Ext,
            _ => return self.write_value(tag),
        };
        let count = tag.count().unwrap_or(0);
        self.run(|w| {
            w.track.element()?;
            w.track.push(compound, count)?;
            w.emit_tag(tag)
        })
    }

    fn close(&mut self, kind: Compound) -> Result<()> {
        self.run(|w| w.track.pop(kind))
    }

    fn write_payload(&mut self, tag: Tag, payload: &[u8]) -> Result<()> {
        self.run(|w| {
            w.track.element()?;
            w.emit_tag(tag)?;
            w.emit(payload)
        })
    }

    fn payload_len(&mut self, len: usize) -> Result<u32> {
        let result = u32::try_from(len).map_err(|_| Error::TooBig {
            size: len as u64,
            limit: u64::from(u32::MAX),
        });
        self.latch(result)
    }

    /// Writes a tag. Compound tags open the compound, which must then be
    /// filled and closed with the matching `finish_*` call.
    pub fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.open(tag)
    }

    /// Writes `nil`.
    pub fn write_nil(&mut self) -> Result<()> {
        self.write_value(Tag::Nil)
    }

    /// Writes a boolean.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_value(Tag::Bool(value))
    }

    /// Writes an unsigned integer in the shortest form.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_value(Tag::Uint(u64::from(value)))
    }

    /// Writes an unsigned integer in the shortest form.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_value(Tag::Uint(u64::from(value)))
    }

    /// Writes an unsigned integer in the shortest form.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_value(Tag::Uint(u64::from(value)))
    }

    /// Writes an unsigned integer in the shortest form.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_value(Tag::Uint(value))
    }

    /// Writes a signed integer in the shortest form. Non-negative values use
    /// the unsigned encodings.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_value(Tag::Int(i64::from(value)))
    }

    /// Writes a signed integer in the shortest form.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_value(Tag::Int(i64::from(value)))
    }

    /// Writes a signed integer in the shortest form.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_value(Tag::Int(i64::from(value)))
    }

    /// Writes a signed integer in the shortest form.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_value(Tag::Int(value))
    }

    /// Writes a single precision float.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_value(Tag::Float(value))
    }

    /// Writes a double precision float.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_value(Tag::Double(value))
    }

    /// Writes a complete string.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let len = self.payload_len(value.len())?;
        self.write_payload(Tag::Str(len), value.as_bytes())
    }

    /// Writes a complete binary blob.
    pub fn write_bin(&mut self, value: &[u8]) -> Result<()> {
        let len = self.payload_len(value.len())?;
        self.write_payload(Tag::Bin(len), value)
    }

    /// Writes a complete extension value.
    #[cfg(feature = "extensions")]
    pub fn write_ext(&mut self, ext_type: i8, payload: &[u8]) -> Result<()> {
        let len = self.payload_len(payload.len())?;
        self.write_payload(Tag::Ext(ext_type, len), payload)
    }

    /// Writes a timestamp extension value in its shortest layout.
    #[cfg(feature = "extensions")]
    pub fn write_timestamp(&mut self, timestamp: crate::timestamp::Timestamp) -> Result<()> {
        use crate::timestamp::{MAX_TIMESTAMP_SIZE, TIMESTAMP_EXT_TYPE};

        let mut payload = [0u8; MAX_TIMESTAMP_SIZE];
        let len = timestamp.encode(&mut payload);
        self.write_ext(TIMESTAMP_EXT_TYPE, &payload[..len])
    }

    /// Writes a pre-encoded value verbatim. It counts as one element of the
    /// enclosing compound; its contents are not checked.
    pub fn write_raw_value(&mut self, encoded: &[u8]) -> Result<()> {
        self.run(|w| {
            w.track.element()?;
            w.emit(encoded)
        })
    }

    /// Opens an array of `count` elements.
    pub fn start_array(&mut self, count: u32) -> Result<()> {
        self.open(Tag::Array(count))
    }

    /// Opens a map of `count` key/value pairs. Keys and values are written
    /// alternately.
    pub fn start_map(&mut self, count: u32) -> Result<()> {
        self.open(Tag::Map(count))
    }

    /// Opens a string of `len` bytes, to be supplied with
    /// [`Writer::write_bytes`].
    pub fn start_str(&mut self, len: u32) -> Result<()> {
        self.open(Tag::Str(len))
    }

    /// Opens a binary blob of `len` bytes, to be supplied with
    /// [`Writer::write_bytes`].
    pub fn start_bin(&mut self, len: u32) -> Result<()> {
        self.open(Tag::Bin(len))
    }

    /// Opens an extension value of `len` bytes, to be supplied with
    /// [`Writer::write_bytes`].
    #[cfg(feature = "extensions")]
    pub fn start_ext(&mut self, ext_type: i8, len: u32) -> Result<()> {
        self.open(Tag::Ext(ext_type, len))
    }

    /// Writes part of the payload of the open string, binary blob or
    /// extension.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.run(|w| {
            w.track.bytes(bytes.len())?;
            w.emit(bytes)
        })
    }

    /// Closes the innermost array after all its elements have been written.
    pub fn finish_array(&mut self) -> Result<()> {
        self.close(Compound::Array)
    }

    /// Closes the innermost map after all its keys and values have been
    /// written.
    pub fn finish_map(&mut self) -> Result<()> {
        self.close(Compound::Map)
    }

    /// Closes the innermost string after all its bytes have been written.
    pub fn finish_str(&mut self) -> Result<()> {
        self.close(Compound::Str)
    }

    /// Closes the innermost binary blob after all its bytes have been written.
    pub fn finish_bin(&mut self) -> Result<()> {
        self.close(Compound::Bin)
    }

    /// Closes the innermost extension after all its bytes have been written.
    #[cfg(feature = "extensions")]
    pub fn finish_ext(&mut self) -> Result<()> {
        self.close(Compound::Ext)
    }

    fn build(&mut self, kind: Compound) -> Result<()> {
        self.run(|w| {
            w.track.element()?;
            w.track.push_open(kind)?;
            w.builder.begin(kind);
            Ok(())
        })
    }

    fn complete(&mut self, kind: Compound) -> Result<()> {
        self.run(|w| {
            let count = w.track.pop_open(kind)?;
            let tag = match kind {
                Compound::Map => Tag::Map(count),
                _ => Tag::Array(count),
            };
            let mut header = [0u8; MAX_TAG_SIZE];
            let len = tag.encode(w.config.version, &mut header);
            w.builder.end(kind, &header[..len])?;
            if w.builder.is_active() {
                return Ok(());
            }

            let drained = w.builder.drain();
            tracing::trace!(bytes = drained.total_len(), "builder drained");
            drained.for_each_chunk(|chunk| w.output(chunk))
        })
    }

    /// Opens an array whose element count is determined when it is
    /// completed with [`Writer::complete_array`].
    pub fn build_array(&mut self) -> Result<()> {
        self.build(Compound::Array)
    }

    /// Opens a map whose pair count is determined when it is completed with
    /// [`Writer::complete_map`].
    pub fn build_map(&mut self) -> Result<()> {
        self.build(Compound::Map)
    }

    /// Completes the innermost array opened with [`Writer::build_array`].
    pub fn complete_array(&mut self) -> Result<()> {
        self.complete(Compound::Array)
    }

    /// Completes the innermost map opened with [`Writer::build_map`]. Fails if
    /// a key was written without its value.
    pub fn complete_map(&mut self) -> Result<()> {
        self.complete(Compound::Map)
    }

    /// Flushes buffered output to the sink. Fails while a builder frame is
    /// open, since its length prefixes are not final yet.
    pub fn flush(&mut self) -> Result<()> {
        self.run(|w| {
            if w.builder.is_active() {
                return Err(Error::misuse("cannot flush while a built compound is open"));
            }
            w.flush_buffer()?;
            if let Some(sink) = w.sink.as_mut() {
                sink.flush()?;
            }
            Ok(())
        })
    }

    /// Finishes writing and returns the encoded bytes.
    ///
    /// Fails with the latched error, or with [`Error::Misuse`] if compounds
    /// are still open. A writer created with [`Writer::with_sink`] flushes
    /// everything to its sink and returns an empty vector.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.run(|w| w.track.check_empty())?;
        if self.sink.is_some() {
            self.flush()?;
            return Ok(Vec::new());
        }
        Ok(std::mem::take(&mut self.buffer))
    }
}
