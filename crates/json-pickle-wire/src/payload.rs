//! [`Payload`]: the top-level `[root_ref, node_table]` pair.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::WireError;
use crate::node::{Node, NodeKind, Ref};

#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub root: Ref,
    pub table: Vec<Node>,
}

impl Payload {
    pub fn new(root: Ref, table: Vec<Node>) -> Self {
        Self { root, table }
    }

    pub fn to_json(&self) -> Result<Value, WireError> {
        let table = self
            .table
            .iter()
            .map(Node::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(vec![self.root.to_json()?, Value::Array(table)]))
    }

    pub fn from_json(value: &Value) -> Result<Self, WireError> {
        let Some([root, table]) = value.as_array().map(Vec::as_slice) else {
            return Err(WireError::malformed(
                "payload",
                "expected a `[root, table]` pair",
            ));
        };
        let table = table
            .as_array()
            .ok_or_else(|| WireError::malformed("payload", "node table must be an array"))?;
        Ok(Self {
            root: Ref::from_json(root)?,
            table: table.iter().map(Node::from_json).collect::<Result<_, _>>()?,
        })
    }

    /// Serializes to UTF-8 JSON text.
    pub fn to_vec(&self, pretty: bool) -> Result<Vec<u8>, WireError> {
        let json = self.to_json()?;
        let bytes = if pretty {
            serde_json::to_vec_pretty(&json)?
        } else {
            serde_json::to_vec(&json)?
        };
        Ok(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let json: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&json)
    }

    /// Checks that every backreference, in the root and in every slot, points
    /// inside the table.
    pub fn validate(&self) -> Result<(), WireError> {
        let len = self.table.len();
        let check = |r: &Ref| match r {
            Ref::Backref(index) if *index >= len => Err(WireError::OutOfBounds { index: *index, len }),
            _ => Ok(()),
        };
        check(&self.root)?;
        for node in &self.table {
            let mut result = Ok(());
            node.for_each_ref(|r| {
                if result.is_ok() {
                    result = check(r);
                }
            });
            result?;
        }
        Ok(())
    }

    pub fn stats(&self) -> PayloadStats {
        let mut stats = PayloadStats::default();
        let mut count_ref = |r: &Ref| match r {
            Ref::Scalar(_) => stats.scalars += 1,
            Ref::Type(_) => stats.types += 1,
            Ref::Backref(_) => stats.backrefs += 1,
        };
        count_ref(&self.root);
        for node in &self.table {
            node.for_each_ref(&mut count_ref);
        }
        for node in &self.table {
            *stats.nodes.entry(node.kind()).or_default() += 1;
        }
        stats
    }
}

/// Per-kind counts over a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadStats {
    pub nodes: HashMap<NodeKind, usize>,
    pub scalars: usize,
    pub types: usize,
    pub backrefs: usize,
}

impl PayloadStats {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }
}
