//! Compound size tracking.
//!
//! Every open array, map, string, binary blob or extension owns one [`Entry`]
//! recording how many elements (or bytes) are still owed. Readers and writers
//! push an entry when they enter a compound, tick it for every element or byte
//! that passes through, and pop it when the compound is closed. Getting any of
//! these counts wrong becomes an immediate [`Error::Misuse`] instead of corrupt
//! output or a misaligned read.
//!
//! The stack is a plain `Vec` with a hard depth limit, so arbitrarily deep
//! input can never recurse or grow it without bound.

use std::fmt;

use crate::error::{Error, Result};

/// The kind of an open compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compound {
    /// An array; counts elements.
    Array,
    /// A map; counts keys and values individually.
    Map,
    /// A string; counts bytes.
    Str,
    /// A binary blob; counts bytes.
    Bin,
    /// An extension payload; counts bytes.
    #[cfg(feature = "extensions")]
    Ext,
}

impl Compound {
    /// Whether the compound holds raw bytes rather than values.
    pub fn holds_bytes(self) -> bool {
        !matches!(self, Self::Array | Self::Map)
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Array => "array",
            Self::Map => "map",
            Self::Str => "str",
            Self::Bin => "bin",
            #[cfg(feature = "extensions")]
            Self::Ext => "ext",
        };
        f.write_str(name)
    }
}

/// One open compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// What kind of compound is open.
    pub kind: Compound,
    /// Elements or bytes still owed. For open-ended entries this instead
    /// counts the elements seen so far.
    pub count: u64,
    /// True for builder frames, whose size is only known when they close.
    pub open_ended: bool,
}

/// The depth-bounded stack of open compounds.
#[derive(Debug, Clone)]
pub struct Track {
    entries: Vec<Entry>,
    max_depth: usize,
}

impl Track {
    /// Creates an empty stack allowing at most `max_depth` open compounds.
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_depth,
        }
    }

    fn push_entry(&mut self, entry: Entry) -> Result<()> {
        if self.entries.len() >= self.max_depth {
            return Err(Error::TooDeep {
                limit: self.max_depth,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Opens a compound of known size. `count` is in elements for arrays,
    /// pairs for maps and bytes otherwise.
    pub fn push(&mut self, kind: Compound, count: u32) -> Result<()> {
        let count = match kind {
            Compound::Map => u64::from(count) * 2,
            _ => u64::from(count),
        };
        self.push_entry(Entry {
            kind,
            count,
            open_ended: false,
        })
    }

    /// Opens an array or map whose size will be counted instead of declared.
    pub fn push_open(&mut self, kind: Compound) -> Result<()> {
        if kind.holds_bytes() {
            return Err(Error::misuse(format!("a {kind} cannot be built open-ended")));
        }
        self.push_entry(Entry {
            kind,
            count: 0,
            open_ended: true,
        })
    }

    /// Accounts for one value inside the innermost compound. A value at the
    /// top level is always accepted.
    pub fn element(&mut self) -> Result<()> {
        let Some(top) = self.entries.last_mut() else {
            return Ok(());
        };
        if top.kind.holds_bytes() {
            return Err(Error::misuse(format!(
                "a value cannot be placed inside an open {}; it expects raw bytes",
                top.kind
            )));
        }
        if top.open_ended {
            top.count += 1;
        } else if top.count == 0 {
            return Err(Error::misuse(format!(
                "too many elements for {}",
                top.kind
            )));
        } else {
            top.count -= 1;
        }
        Ok(())
    }

    /// Accounts for `n` raw bytes inside the innermost string, binary blob or
    /// extension.
    pub fn bytes(&mut self, n: usize) -> Result<()> {
        let Some(top) = self.entries.last_mut() else {
            return Err(Error::misuse("raw bytes outside of a str, bin or ext"));
        };
        if !top.kind.holds_bytes() {
            return Err(Error::misuse(format!(
                "raw bytes cannot be placed directly inside an open {}",
                top.kind
            )));
        }
        let n = n as u64;
        if n > top.count {
            return Err(Error::misuse(format!(
                "{n} bytes exceed the {} remaining in {}",
                top.count, top.kind
            )));
        }
        top.count -= n;
        Ok(())
    }

    fn check_top(&self, kind: Compound, open_ended: bool) -> Result<Entry> {
        let top = self
            .entries
            .last()
            .copied()
            .ok_or_else(|| Error::misuse(format!("closing {kind} but nothing is open")))?;
        if top.kind != kind || top.open_ended != open_ended {
            return Err(Error::misuse(format!(
                "closing {kind} but the innermost open compound is {}{}",
                if top.open_ended { "a built " } else { "" },
                top.kind
            )));
        }
        Ok(top)
    }

    /// Closes the innermost compound, which must be of `kind` and complete.
    pub fn pop(&mut self, kind: Compound) -> Result<()> {
        let top = self.check_top(kind, false)?;
        if top.count != 0 {
            return Err(Error::misuse(format!(
                "closing {kind} with {} {} still owed",
                top.count,
                if kind.holds_bytes() { "bytes" } else { "elements" }
            )));
        }
        self.entries.pop();
        Ok(())
    }

    /// Closes the innermost open-ended compound and returns its element count
    /// (pairs for maps).
    pub fn pop_open(&mut self, kind: Compound) -> Result<u32> {
        let top = self.check_top(kind, true)?;
        let count = match kind {
            Compound::Map if top.count % 2 != 0 => {
                return Err(Error::misuse("built map has a key without a value"));
            }
            Compound::Map => top.count / 2,
            _ => top.count,
        };
        let count = u32::try_from(count).map_err(|_| Error::TooBig {
            size: count,
            limit: u64::from(u32::MAX),
        })?;
        self.entries.pop();
        Ok(count)
    }

    /// The innermost open compound.
    pub fn top(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Number of open compounds.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// The configured depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True when no compound is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails if any compound is still open.
    pub fn check_empty(&self) -> Result<()> {
        match self.entries.last() {
            None => Ok(()),
            Some(top) => Err(Error::misuse(format!(
                "{} compound(s) still open, innermost is {}",
                self.entries.len(),
                top.kind
            ))),
        }
    }
}
