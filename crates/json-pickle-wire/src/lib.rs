//! Tagged node grammar for json-pickle payloads.
//!
//! A payload is a JSON pair `[root_ref, node_table]`. Scalars appear inline,
//! every other value lives in exactly one slot of the table and is referred
//! to by index.
//!
//! | Node kind | Wire shape |
//! |---|---|
//! | scalar | bare JSON value |
//! | type reference | `["type", type_id]` |
//! | backreference | `[index]` |
//! | tuple | `["tuple", [child...]]` |
//! | bytes | `["bytes", [byte...]]` |
//! | list | `["list", [child...]]` |
//! | dict | `["dict", [[key, value]...]]` |
//! | generic object | `[type_id, args or null, state or null]` |
//!
//! # Example
//!
//! ```
//! use json_pickle_wire::{Node, Payload, Ref, Scalar};
//! use serde_json::json;
//!
//! let payload = Payload::from_json(&json!([[0], [["list", [1, [0]]]]])).unwrap();
//! assert_eq!(payload.root, Ref::Backref(0));
//! assert_eq!(
//!     payload.table,
//!     vec![Node::List(vec![Ref::Scalar(Scalar::Int(1)), Ref::Backref(0)])]
//! );
//! payload.validate().unwrap();
//! ```

pub mod error;
pub mod node;
pub mod payload;

pub use error::WireError;
pub use node::{Node, NodeKind, ObjectNode, Ref, Scalar};
pub use payload::{Payload, PayloadStats};
