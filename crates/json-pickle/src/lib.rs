//! json-pickle: object-graph serialization over tagged JSON.
//!
//! Converts a [`Value`] graph, including shared sub-objects and reference
//! cycles, into a flat table of tagged nodes and back. Sharing is preserved
//! by identity: an object reached along two paths decodes to one object.
//!
//! Custom types take part by implementing [`Persist`] and being registered
//! in a [`TypeRegistry`].
//!
//! # Example
//!
//! ```
//! use json_pickle::{dumps, loads, TypeRegistry, Value};
//!
//! let registry = TypeRegistry::new();
//!
//! // l = [1, l]
//! let list = Value::list(vec![Value::Int(1)]);
//! list.as_list().unwrap().borrow_mut().push(list.clone());
//!
//! let bytes = dumps(&list, &registry).unwrap();
//! assert_eq!(bytes, br#"[[0],[["list",[1,[0]]]]]"#);
//!
//! let back = loads(&bytes, &registry).unwrap();
//! let items = back.as_list().unwrap().borrow();
//! assert_eq!(items[0], Value::Int(1));
//! assert!(items[1].is(&back));
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod inspect;
pub mod options;
pub mod registry;
pub mod value;

pub use decoder::Unpickler;
pub use encoder::Pickler;
pub use error::PickleError;
pub use options::{Options, DEFAULT_MAX_DEPTH};
pub use registry::{AsAny, Persist, TypeHandle, TypeRegistry, BUILTIN_TYPES, TYPE_SEPARATOR};
pub use value::{Dict, DictRef, ListRef, State, Value};

pub use json_pickle_wire::{Node, NodeKind, ObjectNode, Payload, PayloadStats, Ref, Scalar, WireError};

/// Encodes `value` into a root reference and node table.
pub fn encode(value: &Value, registry: &TypeRegistry) -> Result<Payload, PickleError> {
    Pickler::new(registry).encode(value)
}

/// Rebuilds a value from a root reference and node table.
pub fn decode(payload: &Payload, registry: &TypeRegistry) -> Result<Value, PickleError> {
    Unpickler::new(registry).decode(payload)
}

pub fn dumps(value: &Value, registry: &TypeRegistry) -> Result<Vec<u8>, PickleError> {
    dumps_with(value, registry, &Options::default())
}

pub fn dumps_with(
    value: &Value,
    registry: &TypeRegistry,
    options: &Options,
) -> Result<Vec<u8>, PickleError> {
    let payload = Pickler::new(registry)
        .with_options(options.clone())
        .encode(value)?;
    Ok(payload.to_vec(options.pretty)?)
}

pub fn loads(bytes: &[u8], registry: &TypeRegistry) -> Result<Value, PickleError> {
    loads_with(bytes, registry, &Options::default())
}

/// Parses, validates and decodes a payload. Every backreference is checked
/// before any registry hook runs.
pub fn loads_with(
    bytes: &[u8],
    registry: &TypeRegistry,
    options: &Options,
) -> Result<Value, PickleError> {
    let payload = Payload::from_slice(bytes)?;
    payload.validate()?;
    Unpickler::new(registry)
        .with_options(options.clone())
        .decode(&payload)
}
