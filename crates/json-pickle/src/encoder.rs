//! [`Pickler`]: flattens an object graph into a node table.
//!
//! Every heap value gets exactly one slot, keyed by allocation address. The
//! slot index is reserved before children are visited, so a value that
//! reaches itself encodes a backreference to its own unfinished slot.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use json_pickle_wire::{Node, ObjectNode, Payload, Ref, Scalar};
use tracing::{debug, trace};

use crate::error::PickleError;
use crate::options::Options;
use crate::registry::{Persist, TypeRegistry};
use crate::value::{address, Value};

pub struct Pickler<'r> {
    registry: &'r TypeRegistry,
    options: Options,
    memo: HashMap<usize, usize>,
    // Holds every slotted value until the walk ends so that a temporary
    // returned by a hook cannot be freed and its address handed to a later
    // allocation.
    pinned: Vec<Value>,
    table: Vec<Option<Node>>,
    depth: usize,
}

impl<'r> Pickler<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            options: Options::default(),
            memo: HashMap::new(),
            pinned: Vec::new(),
            table: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn encode(mut self, value: &Value) -> Result<Payload, PickleError> {
        let root = self.wrap(value)?;
        let table = self
            .table
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                node.ok_or_else(|| {
                    PickleError::Integrity(format!("slot {index} was reserved but never written"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(slots = table.len(), root = ?root, "encoded object graph");
        Ok(Payload::new(root, table))
    }

    fn wrap(&mut self, value: &Value) -> Result<Ref, PickleError> {
        let addr = match value {
            Value::None => return Ok(Ref::Scalar(Scalar::None)),
            Value::Bool(b) => return Ok(Ref::Scalar(Scalar::Bool(*b))),
            Value::Int(i) => return Ok(Ref::Scalar(Scalar::Int(*i))),
            Value::Float(f) => return Ok(Ref::Scalar(Scalar::Float(*f))),
            Value::Str(s) => return Ok(Ref::Scalar(Scalar::Str(s.clone()))),
            Value::Type(ty) => return Ok(Ref::Type(self.registry.type_id(ty).to_owned())),
            Value::Tuple(t) => address(t),
            Value::Bytes(b) => address(b),
            Value::List(l) => address(l),
            Value::Dict(d) => address(d),
            Value::Object(o) => address(o),
        };

        if let Some(&index) = self.memo.get(&addr) {
            trace!(index, "memo hit");
            return Ok(Ref::Backref(index));
        }

        let index = self.table.len();
        self.table.push(None);
        self.memo.insert(addr, index);
        self.pinned.push(value.clone());
        trace!(index, kind = value.kind(), "reserved slot");

        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(PickleError::DepthLimit(self.options.max_depth));
        }
        let node = self.build(value)?;
        self.depth -= 1;

        self.table[index] = Some(node);
        Ok(Ref::Backref(index))
    }

    fn build(&mut self, value: &Value) -> Result<Node, PickleError> {
        match value {
            Value::Tuple(items) => Ok(Node::Tuple(self.wrap_all(items)?)),
            Value::Bytes(bytes) => Ok(Node::Bytes(bytes.to_vec())),
            Value::List(list) => {
                let items = list.borrow().clone();
                Ok(Node::List(self.wrap_all(&items)?))
            }
            Value::Dict(dict) => {
                let entries: Vec<(Value, Value)> = dict
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in &entries {
                    pairs.push((self.wrap(key)?, self.wrap(value)?));
                }
                Ok(Node::Dict(pairs))
            }
            Value::Object(object) => self.build_object(object),
            Value::None
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Type(_) => unreachable!("inline values never occupy a slot"),
        }
    }

    fn build_object(&mut self, object: &Rc<dyn Persist>) -> Result<Node, PickleError> {
        let ty = self.registry.type_of(&**object)?;
        let args = match self.registry.construction_args(&**object)? {
            Some(args) => Some(self.wrap_all(&args)?),
            None => None,
        };
        let state = match self.registry.get_state(&**object)? {
            Some(state) => {
                let mut wrapped = IndexMap::with_capacity(state.len());
                for (name, value) in &state {
                    wrapped.insert(name.clone(), self.wrap(value)?);
                }
                Some(wrapped)
            }
            None => None,
        };
        Ok(Node::Object(ObjectNode {
            type_id: self.registry.type_id(&ty).to_owned(),
            args,
            state,
        }))
    }

    fn wrap_all(&mut self, items: &[Value]) -> Result<Vec<Ref>, PickleError> {
        items.iter().map(|item| self.wrap(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> Payload {
        let registry = TypeRegistry::new();
        Pickler::new(&registry).encode(value).unwrap()
    }

    #[test]
    fn scalars_take_no_slot() {
        for value in [
            Value::None,
            Value::Bool(true),
            Value::Int(-3),
            Value::Float(2.5),
            Value::str("x"),
        ] {
            let payload = encode(&value);
            assert!(payload.table.is_empty());
            assert!(matches!(payload.root, Ref::Scalar(_)));
        }
    }

    #[test]
    fn type_values_are_inline() {
        let registry = TypeRegistry::new();
        let int = Value::Type(registry.resolve("int").unwrap());
        let payload = Pickler::new(&registry).encode(&int).unwrap();
        assert_eq!(payload.root, Ref::Type("int".into()));
        assert!(payload.table.is_empty());
    }

    #[test]
    fn self_referential_list() {
        let list = Value::list(vec![Value::Int(1)]);
        list.as_list().unwrap().borrow_mut().push(list.clone());
        let payload = encode(&list);
        assert_eq!(payload.to_json().unwrap(), json!([[0], [["list", [1, [0]]]]]));
    }

    #[test]
    fn slots_are_assigned_in_pre_order() {
        let inner = Value::list(vec![Value::Int(2)]);
        let dict = Value::dict([(Value::str("k"), inner.clone())]);
        let root = Value::list(vec![dict, inner, Value::bytes([7u8])]);
        let payload = encode(&root);
        assert_eq!(
            payload.to_json().unwrap(),
            json!([
                [0],
                [
                    ["list", [[1], [2], [3]]],
                    ["dict", [["k", [2]]]],
                    ["list", [2]],
                    ["bytes", [7]]
                ]
            ])
        );
    }

    #[test]
    fn depth_limit() {
        let mut value = Value::list(Vec::new());
        for _ in 0..8 {
            value = Value::list(vec![value]);
        }
        let registry = TypeRegistry::new();
        let err = Pickler::new(&registry)
            .with_options(Options::default().with_max_depth(4))
            .encode(&value)
            .unwrap_err();
        assert!(matches!(err, PickleError::DepthLimit(4)));
        assert!(Pickler::new(&registry).encode(&value).is_ok());
    }
}
