//! # tagpack
//!
//! A streaming MessagePack codec with a tracked reader and writer, a paged node
//! tree for random access, and a builder for arrays and maps whose size is not
//! known upfront.
//!
//! ## Overview
//!
//! MessagePack encodes every value as a *tag* (a discriminant byte plus an
//! immediate payload) optionally followed by data: the bytes of a string or
//! binary blob, or the elements of an array or map. tagpack is layered the same
//! way:
//!
//! *   **Tag codec** ([`format`]): encodes and decodes single tags, always
//!     choosing the shortest form when writing.
//! *   **Tracking stack** ([`track`]): a bounded stack of open compounds and
//!     their remaining element or byte counts. Both the reader and the writer
//!     use it, so a mismatched count is caught at the call that causes it.
//! *   **Reader / Writer** ([`Reader`], [`Writer`]): cursors over a borrowed
//!     slice, a growable vector, or any [`std::io::Read`] / [`std::io::Write`].
//!     The typed `expect_*` API lives in [`expect`].
//! *   **Node tree** ([`Tree`], [`NodeRef`]): parses a whole buffer into an
//!     arena of nodes that can be traversed in any order. Strings and blobs
//!     borrow from the buffer.
//! *   **Builder** ([`Writer::build_array`], [`Writer::build_map`]): writes
//!     compounds whose element count is only known once they are complete.
//!
//! ## Error handling
//!
//! Every fallible operation returns [`Result`]. Readers and writers *latch*
//! their first error: once an operation fails, every later operation returns
//! the same error. A decoder can therefore run a sequence of reads and check
//! the outcome once at the end.
//!
//! ## Usage
//!
//! ```rust
//! use tagpack::{Reader, Tree, Writer};
//!
//! let mut writer = Writer::new();
//! writer.build_array()?;
//! for word in ["alpha", "beta", "gamma"] {
//!     writer.write_str(word)?;
//! }
//! writer.complete_array()?;
//! let bytes = writer.finish()?;
//!
//! // Pull-style decoding.
//! let mut reader = Reader::new(&bytes);
//! let count = reader.expect_array()?;
//! let mut words = Vec::new();
//! for _ in 0..count {
//!     words.push(reader.expect_str()?);
//! }
//! reader.done_array()?;
//! assert_eq!(words, ["alpha", "beta", "gamma"]);
//!
//! // Random access.
//! let tree = Tree::parse(&bytes)?;
//! assert_eq!(tree.root().child(2)?.as_str()?, "gamma");
//! # Ok::<(), tagpack::Error>(())
//! ```
//!
//! ## Cargo features
//!
//! * `extensions`: extension types and the timestamp extension. Without it,
//!   ext discriminants are rejected as invalid.
//! * `compatibility`: [`Version::V4`], the legacy format without str8 and bin.
//!
//! ### Safety
//!
//! * **No Unsafe:** the crate is `#![deny(unsafe_code)]`.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Bounded Resources:** nesting depth, payload sizes and node counts are
//!   limited by [`Config`]; deep input never recurses on the native stack.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod config;
pub mod error;
pub mod expect;
pub mod format;
pub mod inspector;
pub mod node;
pub mod reader;
#[cfg(feature = "extensions")]
pub mod timestamp;
pub mod track;
pub mod writer;

// Private modules
mod builder;

// --- RE-EXPORTS ---

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use format::{Kind, Tag, Version};
pub use inspector::TreeInspector;
pub use node::{NodeId, NodeRef, Tree};
pub use reader::Reader;
#[cfg(feature = "extensions")]
pub use timestamp::Timestamp;
pub use writer::Writer;

/// Constants used throughout the library.
pub mod constants {
    /// The default buffer size for streaming readers and writers.
    pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;
    /// Smallest streaming buffer; always large enough for one tag.
    pub const MIN_BUFFER_SIZE: usize = 32;
    /// Default size in bytes of node arena and builder pages.
    pub const PAGE_SIZE: usize = 4 * 1024;
    /// Default limit on simultaneously open compounds.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;
    /// Default limit on a single string, binary or extension payload.
    pub const DEFAULT_MAX_SIZE: usize = 64 * 1024 * 1024;
    /// Default limit on the nodes of one parsed tree.
    pub const DEFAULT_MAX_NODES: usize = 16 * 1024 * 1024;
    /// Deepest compound nesting that `Serialize` for a parsed node will walk.
    pub const MAX_SERIALIZE_DEPTH: usize = 512;
}
