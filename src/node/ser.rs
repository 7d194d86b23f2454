//! `serde::Serialize` for parsed nodes, so a tree can be transcoded into any
//! serde format.
//!
//! Serialization recurses once per nesting level. Compounds nested deeper than
//! [`MAX_SERIALIZE_DEPTH`](crate::constants::MAX_SERIALIZE_DEPTH) fail with a
//! custom error carrying [`Error::TooDeep`], whatever `max_depth` the tree was
//! parsed with.

use serde::ser::{Error as _, SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

use super::arena::Value;
use super::view::NodeRef;
use crate::constants::MAX_SERIALIZE_DEPTH;
use crate::error::Error;

impl Serialize for NodeRef<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Bounded {
            node: *self,
            depth: 0,
        }
        .serialize(serializer)
    }
}

/// A node together with the number of compounds enclosing it.
struct Bounded<'t, 'a> {
    node: NodeRef<'t, 'a>,
    depth: usize,
}

impl Bounded<'_, '_> {
    fn child<'t, 'a>(&self, node: NodeRef<'t, 'a>) -> Bounded<'t, 'a> {
        Bounded {
            node,
            depth: self.depth + 1,
        }
    }

    fn enter<E: serde::ser::Error>(&self) -> Result<(), E> {
        if self.depth >= MAX_SERIALIZE_DEPTH {
            return Err(E::custom(Error::TooDeep {
                limit: MAX_SERIALIZE_DEPTH,
            }));
        }
        Ok(())
    }
}

impl Serialize for Bounded<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.node;
        match node.tree().node_data(node.id()).value {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(v),
            Value::Uint(v) => serializer.serialize_u64(v),
            Value::Int(v) => serializer.serialize_i64(v),
            Value::Float(v) => serializer.serialize_f32(v),
            Value::Double(v) => serializer.serialize_f64(v),
            Value::Str { .. } => {
                let s = node.as_str().map_err(S::Error::custom)?;
                serializer.serialize_str(s)
            }
            Value::Bin { .. } => {
                let bytes = node.as_bin().map_err(S::Error::custom)?;
                serializer.serialize_bytes(bytes)
            }
            #[cfg(feature = "extensions")]
            Value::Ext { .. } => {
                let (ext_type, payload) = node.as_ext().map_err(S::Error::custom)?;
                (ext_type, serde_bytes_ref(payload)).serialize(serializer)
            }
            Value::Array { len, .. } => {
                self.enter::<S::Error>()?;
                let mut seq = serializer.serialize_seq(Some(len as usize))?;
                for child in node.children().map_err(S::Error::custom)? {
                    seq.serialize_element(&self.child(child))?;
                }
                seq.end()
            }
            Value::Map { len, .. } => {
                self.enter::<S::Error>()?;
                let mut map = serializer.serialize_map(Some(len as usize))?;
                for (key, value) in node.entries().map_err(S::Error::custom)? {
                    map.serialize_entry(&self.child(key), &self.child(value))?;
                }
                map.end()
            }
        }
    }
}

/// Serializes a payload with `serialize_bytes` rather than as a sequence.
#[cfg(feature = "extensions")]
fn serde_bytes_ref(bytes: &[u8]) -> impl Serialize + '_ {
    struct Bytes<'b>(&'b [u8]);

    impl Serialize for Bytes<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    Bytes(bytes)
}
