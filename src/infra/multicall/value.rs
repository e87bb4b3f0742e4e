//! Decoded call results and the nested result tree the Multicaller writes into.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;

use alloy_primitives::{Address, Bytes, I256, U256};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::types;

/// A typed value decoded from an on-chain read, or a container of them.
///
/// Integers stay arbitrary precision; callers scale by decimals themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Decoded {
    #[default]
    Null,
    Bool(bool),
    Uint(U256),
    Int(I256),
    Address(Address),
    Bytes(Bytes),
    String(String),
    List(Vec<Decoded>),
    Map(BTreeMap<String, Decoded>),
}

impl Decoded {
    pub fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) if !v.is_negative() => Some(v.into_raw()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Decoded]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Decoded> {
        match self {
            Self::Map(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        }
    }

    pub fn get_path(&self, path: &Path) -> Option<&Decoded> {
        let mut node = self;
        for segment in path.segments() {
            node = match (segment, node) {
                (PathSegment::Index(i), Self::List(list)) => list.get(*i)?,
                (PathSegment::Index(i), Self::Map(map)) => map.get(&i.to_string())?,
                (PathSegment::Key(k), _) => node.get(k)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Assigns `value` at `path`, creating intermediate containers on the way.
    ///
    /// Lists only grow by appending: index `0` starts a new list and an index
    /// equal to the length pushes. Any index further out turns the container
    /// into a map keyed by position, so a numeric segment never pads. Scalars
    /// found mid-path are replaced by a container.
    pub fn set_path(&mut self, path: &Path, value: Decoded) {
        set_in(self, path.segments(), value);
    }
}

fn set_in(node: &mut Decoded, segments: &[PathSegment], value: Decoded) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let fits = match (head, &*node) {
        (_, Decoded::Map(_)) => true,
        (PathSegment::Index(i), Decoded::List(list)) => *i <= list.len(),
        _ => false,
    };
    if !fits {
        *node = match (head, mem::take(node)) {
            (_, Decoded::List(items)) => Decoded::Map(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect(),
            ),
            (PathSegment::Index(0), _) => Decoded::List(Vec::new()),
            _ => Decoded::map(),
        };
    }

    let child = match (head, node) {
        (PathSegment::Key(key), Decoded::Map(map)) => map.entry(key.clone()).or_default(),
        (PathSegment::Index(i), Decoded::Map(map)) => map.entry(i.to_string()).or_default(),
        (PathSegment::Index(i), Decoded::List(list)) => {
            if *i == list.len() {
                list.push(Decoded::Null);
            }
            &mut list[*i]
        }
        _ => return,
    };
    set_in(child, rest, value);
}

impl Serialize for Decoded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Uint(v) => serializer.serialize_str(&v.to_string()),
            Self::Int(v) => serializer.serialize_str(&v.to_string()),
            Self::Address(v) => serializer.serialize_str(&v.to_string()),
            Self::Bytes(v) => serializer.serialize_str(&types::bytes_to_hex0x(v)),
            Self::String(v) => serializer.serialize_str(v),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        match value.parse::<usize>() {
            Ok(i) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                Self::Index(i)
            }
            _ => Self::Key(value.to_string()),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Where a decoded result lands inside the result tree, e.g. `scores.0xabc.balance`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(mut self, segment: impl Into<PathSegment>) -> Self {
        self.0.push(segment.into());
        self
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self(value.split('.').map(PathSegment::from).collect())
    }
}

impl From<String> for Path {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for Path {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(value: [&str; N]) -> Self {
        Self(
            value
                .into_iter()
                .map(|s| PathSegment::Key(s.to_string()))
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(k) => f.write_str(k)?,
                PathSegment::Index(idx) => write!(f, "{idx}")?,
            }
        }
        Ok(())
    }
}
