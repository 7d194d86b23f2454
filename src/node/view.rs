use std::fmt;

use super::arena::Value;
use super::id::NodeId;
use super::tree::Tree;
use crate::error::{Error, Result};
use crate::format::Kind;

/// A read-only handle to one node of a [`Tree`].
///
/// Accessors never coerce across kinds, with two exceptions: integers convert
/// between signed and unsigned when the value fits the requested type, and
/// [`NodeRef::as_f32`] narrows a double.
#[derive(Clone, Copy)]
pub struct NodeRef<'t, 'a> {
    tree: &'t Tree<'a>,
    id: NodeId,
}

impl fmt::Debug for NodeRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

impl<'t, 'a> NodeRef<'t, 'a> {
    pub(crate) fn new(tree: &'t Tree<'a>, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn value(&self) -> Value {
        self.tree.node_data(self.id).value
    }

    fn at(&self, id: NodeId) -> Self {
        Self::new(self.tree, id)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::mismatch(expected, self.kind())
    }

    /// This node's id within its tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    pub fn tree(&self) -> &'t Tree<'a> {
        self.tree
    }

    /// The kind of value held.
    pub fn kind(&self) -> Kind {
        match self.value() {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Uint(_) => Kind::Uint,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
            Value::Str { .. } => Kind::Str,
            Value::Bin { .. } => Kind::Bin,
            #[cfg(feature = "extensions")]
            Value::Ext { .. } => Kind::Ext,
            Value::Array { .. } => Kind::Array,
            Value::Map { .. } => Kind::Map,
        }
    }

    /// The enclosing array or map, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        self.tree
            .node_data(self.id)
            .parent
            .map(|parent| self.at(parent))
    }

    /// True if the node is `nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self.value(), Value::Nil)
    }

    /// Reads a boolean.
    pub fn as_bool(&self) -> Result<bool> {
        match self.value() {
            Value::Bool(v) => Ok(v),
            _ => Err(self.mismatch("bool")),
        }
    }

    fn unsigned<T: TryFrom<u64>>(&self, name: &'static str) -> Result<T> {
        let value = match self.value() {
            Value::Uint(v) => v,
            Value::Int(v) if v >= 0 => v as u64,
            _ => return Err(self.mismatch(name)),
        };
        T::try_from(value).map_err(|_| self.mismatch(name))
    }

    fn signed<T: TryFrom<i64>>(&self, name: &'static str) -> Result<T> {
        let value = match self.value() {
            Value::Int(v) => v,
            Value::Uint(v) => i64::try_from(v).map_err(|_| self.mismatch(name))?,
            _ => return Err(self.mismatch(name)),
        };
        T::try_from(value).map_err(|_| self.mismatch(name))
    }

    /// Reads an integer that fits in a `u8`.
    pub fn as_u8(&self) -> Result<u8> {
        self.unsigned("u8")
    }

    /// Reads an integer that fits in a `u16`.
    pub fn as_u16(&self) -> Result<u16> {
        self.unsigned("u16")
    }

    /// Reads an integer that fits in a `u32`.
    pub fn as_u32(&self) -> Result<u32> {
        self.unsigned("u32")
    }

    /// Reads a non-negative integer.
    pub fn as_u64(&self) -> Result<u64> {
        self.unsigned("u64")
    }

    /// Reads an integer that fits in an `i8`.
    pub fn as_i8(&self) -> Result<i8> {
        self.signed("i8")
    }

    /// Reads an integer that fits in an `i16`.
    pub fn as_i16(&self) -> Result<i16> {
        self.signed("i16")
    }

    /// Reads an integer that fits in an `i32`.
    pub fn as_i32(&self) -> Result<i32> {
        self.signed("i32")
    }

    /// Reads an integer that fits in an `i64`.
    pub fn as_i64(&self) -> Result<i64> {
        self.signed("i64")
    }

    /// Reads a float, narrowing a double.
    pub fn as_f32(&self) -> Result<f32> {
        match self.value() {
            Value::Float(v) => Ok(v),
            Value::Double(v) => Ok(v as f32),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Reads a double. Floats are not widened.
    pub fn as_f64(&self) -> Result<f64> {
        match self.value() {
            Value::Double(v) => Ok(v),
            _ => Err(self.mismatch("double")),
        }
    }

    /// The raw bytes of a string, without UTF-8 validation.
    pub fn as_str_bytes(&self) -> Result<&'a [u8]> {
        match self.value() {
            Value::Str { offset, len } => Ok(self.tree.payload(offset, len)),
            _ => Err(self.mismatch("str")),
        }
    }

    /// Reads a string borrowed from the parsed buffer.
    pub fn as_str(&self) -> Result<&'a str> {
        let bytes = self.as_str_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| Error::mismatch("utf-8 str", Kind::Str))
    }

    /// Reads a binary blob borrowed from the parsed buffer.
    pub fn as_bin(&self) -> Result<&'a [u8]> {
        match self.value() {
            Value::Bin { offset, len } => Ok(self.tree.payload(offset, len)),
            _ => Err(self.mismatch("bin")),
        }
    }

    /// Reads an extension value as its type and payload.
    #[cfg(feature = "extensions")]
    pub fn as_ext(&self) -> Result<(i8, &'a [u8])> {
        match self.value() {
            Value::Ext {
                ext_type,
                offset,
                len,
            } => Ok((ext_type, self.tree.payload(offset, len))),
            _ => Err(self.mismatch("ext")),
        }
    }

    /// Reads a timestamp extension value.
    #[cfg(feature = "extensions")]
    pub fn as_timestamp(&self) -> Result<crate::timestamp::Timestamp> {
        use crate::timestamp::{Timestamp, TIMESTAMP_EXT_TYPE};

        match self.as_ext()? {
            (TIMESTAMP_EXT_TYPE, payload) => Timestamp::decode(payload),
            _ => Err(self.mismatch("timestamp")),
        }
    }

    /// Offset within the parsed buffer where the payload of a string, binary
    /// blob or extension starts.
    pub fn data_offset(&self) -> Result<usize> {
        match self.value() {
            Value::Str { offset, .. } | Value::Bin { offset, .. } => Ok(offset),
            #[cfg(feature = "extensions")]
            Value::Ext { offset, .. } => Ok(offset),
            _ => Err(self.mismatch("str, bin or ext")),
        }
    }

    /// Elements of an array, pairs of a map, or payload bytes of a string,
    /// binary blob or extension.
    pub fn len(&self) -> Result<u32> {
        match self.value() {
            Value::Array { len, .. }
            | Value::Map { len, .. }
            | Value::Str { len, .. }
            | Value::Bin { len, .. } => Ok(len),
            #[cfg(feature = "extensions")]
            Value::Ext { len, .. } => Ok(len),
            _ => Err(self.mismatch("compound")),
        }
    }

    /// True if [`NodeRef::len`] is zero.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn array(&self) -> Result<(NodeId, u32)> {
        match self.value() {
            Value::Array { first, len } => Ok((first, len)),
            _ => Err(self.mismatch("array")),
        }
    }

    fn map(&self) -> Result<(NodeId, u32)> {
        match self.value() {
            Value::Map { first, len } => Ok((first, len)),
            _ => Err(self.mismatch("map")),
        }
    }

    /// The `index`th element of an array.
    pub fn child(&self, index: u32) -> Result<Self> {
        let (first, len) = self.array()?;
        if index >= len {
            return Err(Error::data(format!(
                "index {index} out of bounds for an array of {len}"
            )));
        }
        Ok(self.at(first.offset(index)))
    }

    /// Iterates over the elements of an array.
    pub fn children(&self) -> Result<Children<'t, 'a>> {
        let (first, len) = self.array()?;
        Ok(Children {
            tree: self.tree,
            first,
            next: 0,
            len,
        })
    }

    fn pair(&self, index: u32) -> Result<(NodeId, NodeId)> {
        let (first, len) = self.map()?;
        if index >= len {
            return Err(Error::data(format!(
                "index {index} out of bounds for a map of {len}"
            )));
        }
        Ok((first.offset(2 * index), first.offset(2 * index + 1)))
    }

    /// The key of the `index`th pair of a map.
    pub fn key_at(&self, index: u32) -> Result<Self> {
        self.pair(index).map(|(key, _)| self.at(key))
    }

    /// The value of the `index`th pair of a map.
    pub fn value_at(&self, index: u32) -> Result<Self> {
        self.pair(index).map(|(_, value)| self.at(value))
    }

    /// Iterates over the key/value pairs of a map in encoded order.
    pub fn entries(&self) -> Result<Entries<'t, 'a>> {
        let (first, len) = self.map()?;
        Ok(Entries {
            tree: self.tree,
            first,
            next: 0,
            len,
        })
    }

    /// Scans a map for the single pair whose key satisfies `matches`.
    fn find(
        &self,
        matches: impl Fn(&NodeRef<'t, 'a>) -> bool,
        describe: impl Fn() -> String,
    ) -> Result<Option<Self>> {
        let mut found = None;
        for (key, value) in self.entries()? {
            if !matches(&key) {
                continue;
            }
            if found.is_some() {
                return Err(Error::invalid(format!("duplicate map key {}", describe())));
            }
            found = Some(value);
        }
        Ok(found)
    }

    /// Looks up the value for a string key. Returns `None` when the key is
    /// missing and fails with [`Error::Invalid`] if it occurs more than once.
    pub fn get(&self, key: &str) -> Result<Option<Self>> {
        self.find(
            |k| k.as_str_bytes().map_or(false, |b| b == key.as_bytes()),
            || format!("{key:?}"),
        )
    }

    /// Like [`NodeRef::get`], failing with [`Error::Data`] when the key is
    /// missing.
    pub fn value_for_key(&self, key: &str) -> Result<Self> {
        self.get(key)?
            .ok_or_else(|| Error::data(format!("map has no key {key:?}")))
    }

    /// True if a map contains the string key.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Looks up the value for an integer key equal to `key`, whichever
    /// integer encoding the key uses.
    pub fn value_for_uint_key(&self, key: u64) -> Result<Self> {
        self.find(|k| k.as_u64().map_or(false, |v| v == key), || key.to_string())?
            .ok_or_else(|| Error::data(format!("map has no key {key}")))
    }

    /// Signed counterpart of [`NodeRef::value_for_uint_key`].
    pub fn value_for_int_key(&self, key: i64) -> Result<Self> {
        self.find(|k| k.as_i64().map_or(false, |v| v == key), || key.to_string())?
            .ok_or_else(|| Error::data(format!("map has no key {key}")))
    }
}

/// Iterator over the elements of an array node.
#[derive(Debug, Clone)]
pub struct Children<'t, 'a> {
    tree: &'t Tree<'a>,
    first: NodeId,
    next: u32,
    len: u32,
}

impl<'t, 'a> Iterator for Children<'t, 'a> {
    type Item = NodeRef<'t, 'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let node = NodeRef::new(self.tree, self.first.offset(self.next));
        self.next += 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.len - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Children<'_, '_> {}

/// Iterator over the key/value pairs of a map node.
#[derive(Debug, Clone)]
pub struct Entries<'t, 'a> {
    tree: &'t Tree<'a>,
    first: NodeId,
    next: u32,
    len: u32,
}

impl<'t, 'a> Iterator for Entries<'t, 'a> {
    type Item = (NodeRef<'t, 'a>, NodeRef<'t, 'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let key = self.first.offset(2 * self.next);
        self.next += 1;
        Some((
            NodeRef::new(self.tree, key),
            NodeRef::new(self.tree, key.offset(1)),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.len - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Entries<'_, '_> {}
