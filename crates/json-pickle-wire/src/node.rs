//! [`Ref`] and [`Node`]: the two layers of the tagged grammar.
//!
//! A [`Ref`] is what appears wherever a value is expected: the payload root,
//! container children, constructor arguments and state attributes. A
//! [`Node`] is what occupies a slot of the node table.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::error::WireError;

pub const TYPE_TAG: &str = "type";
pub const TUPLE_TAG: &str = "tuple";
pub const BYTES_TAG: &str = "bytes";
pub const LIST_TAG: &str = "list";
pub const DICT_TAG: &str = "dict";

/// Elementary value embedded directly in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn to_json(&self) -> Result<Value, WireError> {
        Ok(match self {
            Scalar::None => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::Number(Number::from(*i)),
            Scalar::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or(WireError::NonFinite(*f))?,
            Scalar::Str(s) => Value::String(s.clone()),
        })
    }

    fn from_number(n: &Number) -> Result<Self, WireError> {
        if let Some(i) = n.as_i64() {
            return Ok(Scalar::Int(i));
        }
        if n.is_u64() {
            return Err(WireError::malformed(
                "scalar",
                format!("integer {n} does not fit in 64 signed bits"),
            ));
        }
        n.as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| WireError::malformed("scalar", format!("unrepresentable number {n}")))
    }
}

/// Reference to a value: inline scalar, type name, or index into the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Ref {
    Scalar(Scalar),
    /// `["type", id]`
    Type(String),
    /// `[index]`
    Backref(usize),
}

impl Ref {
    pub fn to_json(&self) -> Result<Value, WireError> {
        Ok(match self {
            Ref::Scalar(s) => s.to_json()?,
            Ref::Type(id) => Value::Array(vec![
                Value::String(TYPE_TAG.to_owned()),
                Value::String(id.clone()),
            ]),
            Ref::Backref(index) => Value::Array(vec![Value::Number(Number::from(*index))]),
        })
    }

    pub fn from_json(value: &Value) -> Result<Self, WireError> {
        match value {
            Value::Null => Ok(Ref::Scalar(Scalar::None)),
            Value::Bool(b) => Ok(Ref::Scalar(Scalar::Bool(*b))),
            Value::Number(n) => Scalar::from_number(n).map(Ref::Scalar),
            Value::String(s) => Ok(Ref::Scalar(Scalar::Str(s.clone()))),
            Value::Array(items) => match items.as_slice() {
                [Value::Number(n)] => n
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .map(Ref::Backref)
                    .ok_or_else(|| {
                        WireError::malformed("backreference", format!("invalid index {n}"))
                    }),
                [Value::String(tag), Value::String(id)] if tag == TYPE_TAG => {
                    Ok(Ref::Type(id.clone()))
                }
                _ => Err(WireError::malformed(
                    "reference",
                    format!("expected `[index]` or `[\"type\", id]`, got {value}"),
                )),
            },
            Value::Object(_) => Err(WireError::malformed(
                "reference",
                "JSON objects are not valid references",
            )),
        }
    }
}

/// Payload of a generic-object slot: `[type_id, args | null, state | null]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub type_id: String,
    pub args: Option<Vec<Ref>>,
    pub state: Option<IndexMap<String, Ref>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Tuple(Vec<Ref>),
    Bytes(Vec<u8>),
    List(Vec<Ref>),
    Dict(Vec<(Ref, Ref)>),
    Object(ObjectNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Tuple,
    Bytes,
    List,
    Dict,
    Object,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Tuple => TUPLE_TAG,
            NodeKind::Bytes => BYTES_TAG,
            NodeKind::List => LIST_TAG,
            NodeKind::Dict => DICT_TAG,
            NodeKind::Object => "object",
        }
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Tuple(_) => NodeKind::Tuple,
            Node::Bytes(_) => NodeKind::Bytes,
            Node::List(_) => NodeKind::List,
            Node::Dict(_) => NodeKind::Dict,
            Node::Object(_) => NodeKind::Object,
        }
    }

    /// Calls `f` on every reference held directly by this node.
    pub fn for_each_ref<'a>(&'a self, mut f: impl FnMut(&'a Ref)) {
        match self {
            Node::Tuple(items) | Node::List(items) => items.iter().for_each(f),
            Node::Bytes(_) => {}
            Node::Dict(entries) => {
                for (key, value) in entries {
                    f(key);
                    f(value);
                }
            }
            Node::Object(obj) => {
                if let Some(args) = &obj.args {
                    args.iter().for_each(&mut f);
                }
                if let Some(state) = &obj.state {
                    state.values().for_each(f);
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<Value, WireError> {
        let tagged = |tag: &str, body: Value| Value::Array(vec![Value::String(tag.to_owned()), body]);
        Ok(match self {
            Node::Tuple(items) => tagged(TUPLE_TAG, refs_to_json(items)?),
            Node::List(items) => tagged(LIST_TAG, refs_to_json(items)?),
            Node::Bytes(bytes) => tagged(
                BYTES_TAG,
                Value::Array(bytes.iter().map(|b| Value::Number(Number::from(*b))).collect()),
            ),
            Node::Dict(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    pairs.push(Value::Array(vec![key.to_json()?, value.to_json()?]));
                }
                tagged(DICT_TAG, Value::Array(pairs))
            }
            Node::Object(obj) => {
                let args = match &obj.args {
                    Some(args) => refs_to_json(args)?,
                    None => Value::Null,
                };
                let state = match &obj.state {
                    Some(state) => {
                        let mut map = Map::with_capacity(state.len());
                        for (name, value) in state {
                            map.insert(name.clone(), value.to_json()?);
                        }
                        Value::Object(map)
                    }
                    None => Value::Null,
                };
                Value::Array(vec![Value::String(obj.type_id.clone()), args, state])
            }
        })
    }

    pub fn from_json(value: &Value) -> Result<Self, WireError> {
        let items = value
            .as_array()
            .ok_or_else(|| WireError::malformed("node", format!("expected an array, got {value}")))?;
        let tag = match items.first() {
            Some(Value::String(tag)) => tag.as_str(),
            _ => {
                return Err(WireError::malformed(
                    "node",
                    "first element must be a string discriminator",
                ))
            }
        };
        match tag {
            TUPLE_TAG | BYTES_TAG | LIST_TAG | DICT_TAG => {
                let [_, body] = items.as_slice() else {
                    return Err(WireError::malformed(
                        "node",
                        format!("`{tag}` node expects 2 elements, got {}", items.len()),
                    ));
                };
                let body = body.as_array().ok_or_else(|| {
                    WireError::malformed("node", format!("`{tag}` body must be an array"))
                })?;
                match tag {
                    TUPLE_TAG => Ok(Node::Tuple(refs_from_json(body)?)),
                    LIST_TAG => Ok(Node::List(refs_from_json(body)?)),
                    BYTES_TAG => bytes_from_json(body).map(Node::Bytes),
                    _ => dict_from_json(body).map(Node::Dict),
                }
            }
            type_id => {
                let [_, args, state] = items.as_slice() else {
                    return Err(WireError::malformed(
                        "object",
                        format!("`{type_id}` node expects 3 elements, got {}", items.len()),
                    ));
                };
                let args = match args {
                    Value::Null => None,
                    Value::Array(args) => Some(refs_from_json(args)?),
                    other => {
                        return Err(WireError::malformed(
                            "object",
                            format!("arguments must be an array or null, got {other}"),
                        ))
                    }
                };
                let state = match state {
                    Value::Null => None,
                    Value::Object(map) => {
                        let mut out = IndexMap::with_capacity(map.len());
                        for (name, value) in map {
                            out.insert(name.clone(), Ref::from_json(value)?);
                        }
                        Some(out)
                    }
                    other => {
                        return Err(WireError::malformed(
                            "object",
                            format!("state must be an object or null, got {other}"),
                        ))
                    }
                };
                Ok(Node::Object(ObjectNode {
                    type_id: type_id.to_owned(),
                    args,
                    state,
                }))
            }
        }
    }
}

fn refs_to_json(refs: &[Ref]) -> Result<Value, WireError> {
    refs.iter()
        .map(Ref::to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn refs_from_json(values: &[Value]) -> Result<Vec<Ref>, WireError> {
    values.iter().map(Ref::from_json).collect()
}

fn bytes_from_json(values: &[Value]) -> Result<Vec<u8>, WireError> {
    values
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| WireError::malformed("bytes", format!("{v} is not a byte value")))
        })
        .collect()
}

fn dict_from_json(values: &[Value]) -> Result<Vec<(Ref, Ref)>, WireError> {
    values
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([key, value]) => Ok((Ref::from_json(key)?, Ref::from_json(value)?)),
            _ => Err(WireError::malformed(
                "dict",
                format!("entry must be a `[key, value]` pair, got {pair}"),
            )),
        })
        .collect()
}
