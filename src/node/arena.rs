use super::id::NodeId;
use crate::error::{Error, Result};

/// The payload of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Nil,
    Bool(bool),
    Uint(u64),
    Int(i64),
    Float(f32),
    Double(f64),
    /// Payload byte range within the parsed buffer.
    Str { offset: usize, len: u32 },
    Bin { offset: usize, len: u32 },
    #[cfg(feature = "extensions")]
    Ext { ext_type: i8, offset: usize, len: u32 },
    /// `len` elements starting at `first`.
    Array { first: NodeId, len: u32 },
    /// `len` pairs; keys and values alternate starting at `first`.
    Map { first: NodeId, len: u32 },
}

/// A node as stored in the arena.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeData {
    pub(crate) value: Value,
    pub(crate) parent: Option<NodeId>,
}

/// Paged node storage.
///
/// Pages are never reallocated once created, and a run of siblings is always
/// placed within a single page so it can be walked by slot.
#[derive(Debug)]
pub(crate) struct Arena {
    pages: Vec<Vec<NodeData>>,
    page_capacity: usize,
    max_nodes: usize,
    len: usize,
}

impl Arena {
    /// `page_size` is in bytes; each page holds as many nodes as fit.
    pub(crate) fn new(page_size: usize, max_nodes: usize) -> Self {
        let page_capacity = (page_size / std::mem::size_of::<NodeData>()).max(1);
        Self {
            pages: Vec::new(),
            page_capacity,
            max_nodes,
            len: 0,
        }
    }

    /// Allocates `n` contiguous nil nodes under `parent` and returns the id of
    /// the first. A run that does not fit in the current page starts a new
    /// one, sized up if the run alone exceeds the page capacity.
    pub(crate) fn alloc_run(&mut self, n: usize, parent: Option<NodeId>) -> Result<NodeId> {
        if n == 0 {
            return Ok(NodeId::default());
        }
        let total = self.len.saturating_add(n);
        if total > self.max_nodes {
            return Err(Error::TooBig {
                size: total as u64,
                limit: self.max_nodes as u64,
            });
        }

        let fits = self
            .pages
            .last()
            .map_or(false, |page| page.capacity() - page.len() >= n);
        if !fits {
            let capacity = self.page_capacity.max(n);
            tracing::trace!(
                page = self.pages.len(),
                capacity,
                "node page allocated"
            );
            self.pages.push(Vec::with_capacity(capacity));
        }

        let page_index = self.pages.len() - 1;
        let page_id = u32::try_from(page_index)
            .map_err(|_| Error::invalid("node arena has too many pages"))?;
        let Some(page) = self.pages.last_mut() else {
            return Err(Error::invalid("node arena has no page"));
        };
        let slot = u32::try_from(page.len())
            .map_err(|_| Error::invalid("node page has too many slots"))?;
        let blank = NodeData {
            value: Value::Nil,
            parent,
        };
        page.resize(page.len() + n, blank);
        self.len = total;
        Ok(NodeId::new(page_id, slot))
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.pages
            .get(id.page() as usize)
            .and_then(|page| page.get(id.slot() as usize))
    }

    /// Ids handed out by this arena always resolve.
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.pages[id.page() as usize][id.slot() as usize]
    }

    pub(crate) fn set(&mut self, id: NodeId, value: Value) -> Result<()> {
        let node = self
            .pages
            .get_mut(id.page() as usize)
            .and_then(|page| page.get_mut(id.slot() as usize))
            .ok_or_else(|| Error::invalid(format!("node {id} is not allocated")))?;
        node.value = value;
        Ok(())
    }

    /// Total nodes allocated.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }
}
