//! The node tree: a parsed, random-access view of one encoded value.
//!
//! [`Tree::parse`] reads a complete buffer in a single iterative pass and
//! stores one node per value in a paged arena. The children of an array or map
//! are allocated as one contiguous run inside a single page, so indexing a
//! child is constant time and nesting depth costs no native stack.
//!
//! ```rust
//! use tagpack::Tree;
//!
//! // {"a": 1, "b": [2, 3]}
//! let bytes = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x92, 0x02, 0x03];
//! let tree = Tree::parse(&bytes)?;
//! let root = tree.root();
//!
//! assert_eq!(root.value_for_key("a")?.as_u32()?, 1);
//! let b = root.value_for_key("b")?;
//! assert_eq!(b.len()?, 2);
//! assert_eq!(b.child(1)?.as_i64()?, 3);
//! # Ok::<(), tagpack::Error>(())
//! ```

mod arena;
/// Defines the `NodeId` type.
pub mod id;
mod ser;
mod tree;
mod view;

pub use id::NodeId;
pub use tree::Tree;
pub use view::{Children, Entries, NodeRef};
