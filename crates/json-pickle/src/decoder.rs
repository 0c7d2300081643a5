//! [`Unpickler`]: rebuilds an object graph from a node table.
//!
//! Slots are resolved on demand, the first time a backreference reaches
//! them. Lists, dicts and generic objects publish an empty shell into their
//! slot before their children are resolved, which is what makes cycles
//! through them resolvable. Tuples and bytes can only be built once all of
//! their children exist; a backreference that reaches one of them while it
//! is still being built is rejected.

use std::cell::RefCell;
use std::rc::Rc;

use json_pickle_wire::{Node, ObjectNode, Payload, Ref};
use tracing::{debug, trace};

use crate::error::PickleError;
use crate::options::Options;
use crate::registry::TypeRegistry;
use crate::value::{Dict, Value};

enum Slot {
    Unresolved,
    /// Building an immutable value (or resolving an object's construction
    /// arguments); nothing may reference the slot yet.
    Pending,
    Populated(Value),
}

pub struct Unpickler<'r> {
    registry: &'r TypeRegistry,
    options: Options,
}

impl<'r> Unpickler<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn decode(&self, payload: &Payload) -> Result<Value, PickleError> {
        let mut resolution = Resolution {
            registry: self.registry,
            max_depth: self.options.max_depth,
            table: &payload.table,
            slots: payload.table.iter().map(|_| Slot::Unresolved).collect(),
            depth: 0,
        };
        let value = resolution.unwrap(&payload.root)?;
        let unreached = resolution
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Unresolved))
            .count();
        debug!(slots = payload.table.len(), unreached, "decoded object graph");
        Ok(value)
    }
}

struct Resolution<'a> {
    registry: &'a TypeRegistry,
    max_depth: usize,
    table: &'a [Node],
    slots: Vec<Slot>,
    depth: usize,
}

impl<'a> Resolution<'a> {
    fn unwrap(&mut self, r: &Ref) -> Result<Value, PickleError> {
        match r {
            Ref::Scalar(scalar) => Ok(Value::from(scalar.clone())),
            Ref::Type(id) => Ok(Value::Type(self.registry.resolve(id)?)),
            Ref::Backref(index) => self.resolve(*index),
        }
    }

    fn unwrap_all(&mut self, refs: &[Ref]) -> Result<Vec<Value>, PickleError> {
        refs.iter().map(|r| self.unwrap(r)).collect()
    }

    fn resolve(&mut self, index: usize) -> Result<Value, PickleError> {
        match self.slots.get(index) {
            None => {
                return Err(PickleError::Integrity(format!(
                    "backreference {index} out of bounds for a table of {} nodes",
                    self.slots.len()
                )))
            }
            Some(Slot::Populated(value)) => return Ok(value.clone()),
            Some(Slot::Pending) => {
                return Err(PickleError::Integrity(format!(
                    "slot {index} is reached through a cycle that passes an immutable container"
                )))
            }
            Some(Slot::Unresolved) => {}
        }

        let table = self.table;
        trace!(index, kind = table[index].kind().as_str(), "resolving slot");
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(PickleError::DepthLimit(self.max_depth));
        }
        self.build(index, &table[index])?;
        self.depth -= 1;

        match &self.slots[index] {
            Slot::Populated(value) => Ok(value.clone()),
            _ => Err(PickleError::Integrity(format!(
                "slot {index} was not populated by its node"
            ))),
        }
    }

    fn build(&mut self, index: usize, node: &'a Node) -> Result<(), PickleError> {
        match node {
            Node::Tuple(items) => {
                self.slots[index] = Slot::Pending;
                let items = self.unwrap_all(items)?;
                self.tag(index, Value::tuple(items))
            }
            Node::Bytes(bytes) => self.tag(index, Value::bytes(bytes)),
            Node::List(items) => {
                let list = Rc::new(RefCell::new(Vec::with_capacity(items.len())));
                self.tag(index, Value::List(list.clone()))?;
                for item in items {
                    let value = self.unwrap(item)?;
                    list.borrow_mut().push(value);
                }
                Ok(())
            }
            Node::Dict(entries) => {
                let dict = Rc::new(RefCell::new(Dict::with_capacity(entries.len())));
                self.tag(index, Value::Dict(dict.clone()))?;
                for (key, value) in entries {
                    let key = self.unwrap(key)?;
                    let value = self.unwrap(value)?;
                    dict.borrow_mut().insert(key, value);
                }
                Ok(())
            }
            Node::Object(object) => self.build_object(index, object),
        }
    }

    fn build_object(&mut self, index: usize, node: &'a ObjectNode) -> Result<(), PickleError> {
        let ty = self.registry.resolve(&node.type_id)?;
        self.slots[index] = Slot::Pending;
        let args = match &node.args {
            Some(args) => self.unwrap_all(args)?,
            None => Vec::new(),
        };
        let instance = self.registry.raw_allocate(&ty, args)?;
        // The shell becomes visible before its state is resolved.
        self.tag(index, Value::Object(instance.clone()))?;
        if let Some(state) = &node.state {
            for (name, value) in state {
                let value = self.unwrap(value)?;
                self.registry.set_attr(&*instance, name, value)?;
            }
        }
        Ok(())
    }

    fn tag(&mut self, index: usize, value: Value) -> Result<(), PickleError> {
        if let Slot::Populated(_) = self.slots[index] {
            return Err(PickleError::Integrity(format!("slot {index} populated twice")));
        }
        self.slots[index] = Slot::Populated(value);
        Ok(())
    }
}
