//! Runtime configuration shared by readers, writers and the node parser.
//!
//! [`Config`] derives `serde` traits so it can be embedded in an application's
//! own configuration file. Every field has a default (see [`crate::constants`])
//! and missing fields fall back to it when deserializing.
//!
//! ```rust
//! use tagpack::Config;
//!
//! let config = Config::default().with_max_depth(64).with_buffer_size(16 * 1024);
//! assert_eq!(config.max_depth, 64);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, DEFAULT_MAX_SIZE, MIN_BUFFER_SIZE,
    PAGE_SIZE,
};
use crate::error::{Error, Result};
use crate::format::Version;

/// Limits and buffer sizes for the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of simultaneously open compounds. Deeper input is
    /// rejected with [`Error::TooDeep`].
    pub max_depth: usize,
    /// Largest string, binary or extension length accepted while reading.
    pub max_size: usize,
    /// Largest number of nodes a single parsed tree may hold.
    pub max_nodes: usize,
    /// Size of the internal buffer of streaming readers and writers.
    pub buffer_size: usize,
    /// Minimum size in bytes of one node arena page.
    pub node_page_size: usize,
    /// Size in bytes of one builder page.
    pub builder_page_size: usize,
    /// Wire format revision to produce and accept.
    pub version: Version,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_size: DEFAULT_MAX_SIZE,
            max_nodes: DEFAULT_MAX_NODES,
            buffer_size: DEFAULT_BUFFER_SIZE,
            node_page_size: PAGE_SIZE,
            builder_page_size: PAGE_SIZE,
            version: Version::default(),
        }
    }
}

impl Config {
    /// Sets [`Config::max_depth`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets [`Config::max_size`].
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets [`Config::max_nodes`].
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Sets [`Config::buffer_size`].
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets [`Config::node_page_size`].
    pub fn with_node_page_size(mut self, node_page_size: usize) -> Self {
        self.node_page_size = node_page_size;
        self
    }

    /// Sets [`Config::builder_page_size`].
    pub fn with_builder_page_size(mut self, builder_page_size: usize) -> Self {
        self.builder_page_size = builder_page_size;
        self
    }

    /// Sets [`Config::version`].
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// The streaming buffer size, never smaller than [`MIN_BUFFER_SIZE`].
    pub(crate) fn stream_buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUFFER_SIZE)
    }

    /// Fails with [`Error::TooBig`] if `size` exceeds [`Config::max_size`].
    pub(crate) fn check_size(&self, size: u32) -> Result<()> {
        if size as usize > self.max_size {
            return Err(Error::TooBig {
                size: u64::from(size),
                limit: self.max_size as u64,
            });
        }
        Ok(())
    }
}
