use std::fmt;

/// Identifies one node of a [`Tree`](super::Tree): the arena page it lives in
/// and its slot within that page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId {
    page: u32,
    slot: u32,
}

impl NodeId {
    /// Restricted to the node module; ids only come from an arena.
    pub(crate) fn new(page: u32, slot: u32) -> Self {
        Self { page, slot }
    }

    /// Index of the arena page.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Index within the page.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// The id `n` slots further along the same page. Siblings form one run,
    /// so this steps from a first child to the others.
    pub(crate) fn offset(self, n: u32) -> Self {
        Self {
            page: self.page,
            slot: self.slot + n,
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.page, self.slot)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.page, self.slot)
    }
}
