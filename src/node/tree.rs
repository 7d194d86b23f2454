use super::arena::{Arena, NodeData, Value};
use super::id::NodeId;
use super::view::NodeRef;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::Tag;
use crate::reader::Reader;
use crate::track::Compound;

/// A parsed value tree borrowing the buffer it was parsed from.
///
/// Strings, binary blobs and extension payloads are not copied: their nodes
/// hold byte ranges into the buffer.
#[derive(Debug)]
pub struct Tree<'a> {
    data: &'a [u8],
    arena: Arena,
    root: NodeId,
    consumed: usize,
}

/// One compound whose children are being filled.
#[derive(Debug)]
struct Level {
    first: NodeId,
    len: u32,
    next: u32,
    kind: Compound,
}

impl<'a> Tree<'a> {
    /// Parses the first value in `data` with the default configuration.
    /// Trailing bytes are left unparsed; see [`Tree::remaining`].
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::parse_with(data, &Config::default())
    }

    /// Parses the first value in `data`.
    pub fn parse_with(data: &'a [u8], config: &Config) -> Result<Self> {
        let result = Self::build(data, config);
        if let Err(err) = &result {
            tracing::debug!(error = %err, len = data.len(), "tree parse failed");
        }
        result
    }

    /// Parses `data`, which must hold exactly one value.
    pub fn parse_exact(data: &'a [u8], config: &Config) -> Result<Self> {
        let tree = Self::parse_with(data, config)?;
        if tree.remaining() != 0 {
            return Err(Error::data(format!(
                "{} trailing bytes after the value",
                tree.remaining()
            )));
        }
        Ok(tree)
    }

    /// Parses consecutive values until `data` is exhausted.
    pub fn parse_all(data: &'a [u8], config: &Config) -> Result<Vec<Self>> {
        let mut trees = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let tree = Self::parse_with(rest, config)?;
            rest = &rest[tree.consumed..];
            trees.push(tree);
        }
        Ok(trees)
    }

    fn build(data: &'a [u8], config: &Config) -> Result<Self> {
        let mut reader = Reader::with_config(data, config.clone());
        let mut arena = Arena::new(config.node_page_size, config.max_nodes);
        let root = arena.alloc_run(1, None)?;

        let mut stack: Vec<Level> = Vec::new();
        let mut target = root;
        'fill: loop {
            let tag = reader.read_tag()?;
            let value = match tag {
                Tag::Nil => Value::Nil,
                Tag::Bool(v) => Value::Bool(v),
                Tag::Uint(v) => Value::Uint(v),
                Tag::Int(v) => Value::Int(v),
                Tag::Float(v) => Value::Float(v),
                Tag::Double(v) => Value::Double(v),
                Tag::Str(len) => {
                    let offset = skip_payload(&mut reader, len, Compound::Str)?;
                    Value::Str { offset, len }
                }
                Tag::Bin(len) => {
                    let offset = skip_payload(&mut reader, len, Compound::Bin)?;
                    Value::Bin { offset, len }
                }
                #[cfg(feature = "extensions")]
                Tag::Ext(ext_type, len) => {
                    let offset = skip_payload(&mut reader, len, Compound::Ext)?;
                    Value::Ext {
                        ext_type,
                        offset,
                        len,
                    }
                }
                Tag::Array(len) => {
                    let first = open(&mut reader, &mut arena, &mut stack, target, len, 1)?;
                    Value::Array { first, len }
                }
                Tag::Map(len) => {
                    let first = open(&mut reader, &mut arena, &mut stack, target, len, 2)?;
                    Value::Map { first, len }
                }
            };
            arena.set(target, value)?;

            while let Some(level) = stack.last_mut() {
                if level.next < level.len {
                    target = level.first.offset(level.next);
                    level.next += 1;
                    continue 'fill;
                }
                let kind = level.kind;
                stack.pop();
                reader.done(kind)?;
            }
            break;
        }

        let consumed = reader.position() as usize;
        tracing::trace!(
            nodes = arena.len(),
            pages = arena.page_count(),
            consumed,
            "tree parsed"
        );
        Ok(Self {
            data,
            arena,
            root,
            consumed,
        })
    }

    /// The top-level value.
    pub fn root(&self) -> NodeRef<'_, 'a> {
        NodeRef::new(self, self.root)
    }

    /// Looks up a node by id, if it belongs to this tree.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, 'a>> {
        self.arena.get(id).map(|_| NodeRef::new(self, id))
    }

    /// Bytes of the buffer taken up by the parsed value.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes of the buffer after the parsed value.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.consumed
    }

    /// Total nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of arena pages backing the tree.
    pub fn page_count(&self) -> usize {
        self.arena.page_count()
    }

    /// The buffer the tree was parsed from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub(crate) fn node_data(&self, id: NodeId) -> &NodeData {
        self.arena.node(id)
    }

    pub(crate) fn payload(&self, offset: usize, len: u32) -> &'a [u8] {
        let end = offset.saturating_add(len as usize).min(self.data.len());
        &self.data[offset.min(end)..end]
    }
}

/// Consumes a str/bin/ext payload and returns its offset in the buffer.
fn skip_payload(reader: &mut Reader<'_>, len: u32, kind: Compound) -> Result<usize> {
    let offset = reader.position() as usize;
    reader.skip_bytes(len as usize)?;
    reader.done(kind)?;
    Ok(offset)
}

/// Allocates the children of an array (`per_entry == 1`) or map
/// (`per_entry == 2`) and pushes a level to fill them.
fn open(
    reader: &mut Reader<'_>,
    arena: &mut Arena,
    stack: &mut Vec<Level>,
    parent: NodeId,
    len: u32,
    per_entry: u64,
) -> Result<NodeId> {
    let kind = if per_entry == 2 {
        Compound::Map
    } else {
        Compound::Array
    };
    let children = u64::from(len) * per_entry;
    if children == 0 {
        reader.done(kind)?;
        return Ok(NodeId::default());
    }
    // Every child takes at least one byte.
    if children > reader.remaining() as u64 {
        return Err(Error::invalid(format!(
            "{kind} declares {children} children but only {} bytes remain",
            reader.remaining()
        )));
    }
    let run = u32::try_from(children)
        .map_err(|_| Error::invalid(format!("{kind} declares {children} children")))?;
    let first = arena.alloc_run(run as usize, Some(parent))?;
    stack.push(Level {
        first,
        len: run,
        next: 0,
        kind,
    });
    Ok(first)
}
