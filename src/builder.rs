//! Deferred-size compounds.
//!
//! MessagePack puts the element count of an array or map *before* its
//! contents, which is awkward when the count is only known once everything has
//! been written. [`Writer::build_array`](crate::Writer::build_array) and
//! [`Writer::build_map`](crate::Writer::build_map) open a builder frame; while
//! any frame is open the writer diverts its output into the pages held here,
//! and the tracking stack counts the elements written directly inside each
//! frame.
//!
//! Completing a frame does not move any bytes. It records a *patch*: the
//! shortest header for the final count, to be spliced in at the offset where
//! the frame began. When the outermost frame completes, the pages are streamed
//! to the real output with every patch inserted at its offset, so the result
//! is byte-identical to what a writer that knew the counts upfront produces.
//!
//! ```rust
//! use tagpack::Writer;
//!
//! let mut writer = Writer::new();
//! writer.build_map()?;
//! for (key, value) in [("a", 1u32), ("b", 2)] {
//!     writer.write_str(key)?;
//!     writer.write_u32(value)?;
//! }
//! writer.complete_map()?;
//!
//! assert_eq!(writer.finish()?, [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x02]);
//! # Ok::<(), tagpack::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::format::MAX_TAG_SIZE;
use crate::track::Compound;

/// An open builder frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub(crate) kind: Compound,
    /// Offset in the page list where this frame's header belongs.
    pub(crate) offset: usize,
    /// Open order within the outermost frame.
    seq: u64,
}

/// A header to insert into the buffered bytes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Patch {
    pub(crate) offset: usize,
    /// Open order of the frame this header belongs to.
    seq: u64,
    header: [u8; MAX_TAG_SIZE],
    len: u8,
}

impl Patch {
    pub(crate) fn header(&self) -> &[u8] {
        &self.header[..usize::from(self.len)]
    }
}

/// Paged storage for the output of open builder frames.
#[derive(Debug)]
pub(crate) struct Builder {
    pages: Vec<Vec<u8>>,
    page_size: usize,
    len: usize,
    frames: Vec<Frame>,
    patches: Vec<Patch>,
    seq: u64,
}

/// Buffered output of a completed outermost frame.
#[derive(Debug)]
pub(crate) struct Drained {
    pages: Vec<Vec<u8>>,
    page_size: usize,
    len: usize,
    patches: Vec<Patch>,
}

impl Builder {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            pages: Vec::new(),
            page_size: page_size.max(1),
            len: 0,
            frames: Vec::new(),
            patches: Vec::new(),
            seq: 0,
        }
    }

    /// True while at least one frame is open.
    pub(crate) fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Number of open frames.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bytes buffered so far, headers of completed frames excluded.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn begin(&mut self, kind: Compound) {
        self.frames.push(Frame {
            kind,
            offset: self.len,
            seq: self.seq,
        });
        self.seq += 1;
    }

    /// Closes the innermost frame with its encoded header.
    pub(crate) fn end(&mut self, kind: Compound, header: &[u8]) -> Result<Frame> {
        let frame = match self.frames.pop() {
            Some(frame) if frame.kind == kind => frame,
            Some(frame) => {
                self.frames.push(frame);
                return Err(Error::misuse(format!(
                    "completing a built {kind} but the innermost frame is a {}",
                    frame.kind
                )));
            }
            None => return Err(Error::misuse(format!("no built {kind} is open"))),
        };
        let mut patch = Patch {
            offset: frame.offset,
            seq: frame.seq,
            header: [0u8; MAX_TAG_SIZE],
            len: header.len() as u8,
        };
        patch.header[..header.len()].copy_from_slice(header);
        self.patches.push(patch);
        Ok(frame)
    }

    /// Appends bytes, filling the last page before starting a new one so that
    /// every page but the last is exactly `page_size` long.
    pub(crate) fn append(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let needs_page = self
                .pages
                .last()
                .map_or(true, |page| page.len() == self.page_size);
            if needs_page {
                tracing::trace!(
                    page = self.pages.len(),
                    size = self.page_size,
                    "builder page allocated"
                );
                self.pages.push(Vec::with_capacity(self.page_size));
            }
            let Some(page) = self.pages.last_mut() else {
                return;
            };
            let take = (self.page_size - page.len()).min(bytes.len());
            page.extend_from_slice(&bytes[..take]);
            self.len += take;
            bytes = &bytes[take..];
        }
    }

    /// Takes all buffered bytes and patches, leaving the builder empty.
    pub(crate) fn drain(&mut self) -> Drained {
        let mut patches = std::mem::take(&mut self.patches);
        // Frames sharing an offset opened with no bytes between them, either
        // nested or after an empty sibling. Their headers go in open order.
        patches.sort_by(|a, b| a.offset.cmp(&b.offset).then(a.seq.cmp(&b.seq)));
        let drained = Drained {
            pages: std::mem::take(&mut self.pages),
            page_size: self.page_size,
            len: self.len,
            patches,
        };
        self.len = 0;
        self.seq = 0;
        drained
    }
}

impl Drained {
    /// Visits the final byte sequence in order, as a series of slices.
    pub(crate) fn for_each_chunk(
        &self,
        mut emit: impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        let mut pos = 0;
        for patch in &self.patches {
            self.emit_range(pos, patch.offset, &mut emit)?;
            emit(patch.header())?;
            pos = patch.offset;
        }
        self.emit_range(pos, self.len, &mut emit)
    }

    fn emit_range(
        &self,
        mut from: usize,
        to: usize,
        emit: &mut impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        while from < to {
            let page_index = from / self.page_size;
            let within = from % self.page_size;
            let page = self
                .pages
                .get(page_index)
                .ok_or_else(|| Error::misuse("builder offset past the buffered bytes"))?;
            let end = (to - from).min(page.len().saturating_sub(within));
            if end == 0 {
                return Err(Error::misuse("builder page shorter than expected"));
            }
            emit(&page[within..within + end])?;
            from += end;
        }
        Ok(())
    }

    /// Total size including spliced headers.
    pub(crate) fn total_len(&self) -> usize {
        self.len + self.patches.iter().map(|p| usize::from(p.len)).sum::<usize>()
    }
}
