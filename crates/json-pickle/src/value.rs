//! The in-memory object graph the codec walks and rebuilds.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use json_pickle_wire::Scalar;

use crate::registry::{Persist, TypeHandle};

/// Insertion-ordered mapping with arbitrary keys.
pub type Dict = IndexMap<Value, Value>;

/// Attribute snapshot of a generic object, in attribute order.
pub type State = IndexMap<String, Value>;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<Dict>>;

/// A node of an object graph.
///
/// Scalars and type handles are plain values. Every other variant is a
/// shared heap allocation whose identity is its address: two `Rc`s pointing
/// at the same list are the same list, two lists with equal contents are not.
///
/// Equality and hashing follow that split. Scalars and types compare by
/// value, tuples and bytes structurally, lists, dicts and objects by
/// identity, so comparison terminates on cyclic graphs and any value can be
/// used as a [`Dict`] key.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Type(TypeHandle),
    Tuple(Rc<[Value]>),
    Bytes(Rc<[u8]>),
    List(ListRef),
    Dict(DictRef),
    Object(Rc<dyn Persist>),
}

pub(crate) fn address<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Value::Bytes(Rc::from(bytes.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn object<T: Persist>(object: T) -> Self {
        Value::Object(Rc::new(object))
    }

    /// Allocation address for heap variants, `None` for scalars and types.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Tuple(t) => Some(address(t)),
            Value::Bytes(b) => Some(address(b)),
            Value::List(l) => Some(address(l)),
            Value::Dict(d) => Some(address(d)),
            Value::Object(o) => Some(address(o)),
            _ => None,
        }
    }

    /// `true` when both values are the same heap allocation.
    pub fn is(&self, other: &Value) -> bool {
        matches!((self.identity(), other.identity()), (Some(a), Some(b)) if a == b)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Type(_) => "type",
            Value::Tuple(_) => "tuple",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Object(o) => (**o).type_name(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&DictRef> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeHandle> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Downcasts a generic object to its concrete type.
    pub fn as_object<T: Persist>(&self) -> Option<Rc<T>> {
        match self {
            Value::Object(o) => o.clone().into_any().downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::None => Value::None,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Int(i),
            Scalar::Float(f) => Value::Float(f),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<TypeHandle> for Value {
    fn from(t: TypeHandle) -> Self {
        Value::Type(t)
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    a == b || a.to_bits() == b.to_bits()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_eq(*a, *b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || a[..] == b[..],
            (Value::Bytes(a), Value::Bytes(b)) => a[..] == b[..],
            _ => self.is(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            // 0.0 and -0.0 compare equal
            Value::Float(f) => {
                let f = if *f == 0.0 { 0.0 } else { *f };
                f.to_bits().hash(state)
            }
            Value::Str(s) => s.hash(state),
            Value::Type(t) => t.hash(state),
            Value::Tuple(t) => t[..].hash(state),
            Value::Bytes(b) => b[..].hash(state),
            Value::List(_) | Value::Dict(_) | Value::Object(_) => self.identity().hash(state),
        }
    }
}

// Mutable containers print shallowly: a cyclic graph must not recurse.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Type(t) => write!(f, "<type {}>", t.id()),
            Value::Tuple(t) => {
                f.write_str("(")?;
                for (i, item) in t.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str(")")
            }
            Value::Bytes(b) => write!(f, "b{:?}", &b[..]),
            Value::List(l) => match l.try_borrow() {
                Ok(items) => write!(f, "<list {:#x} len={}>", address(l), items.len()),
                Err(_) => write!(f, "<list {:#x}>", address(l)),
            },
            Value::Dict(d) => match d.try_borrow() {
                Ok(entries) => write!(f, "<dict {:#x} len={}>", address(d), entries.len()),
                Err(_) => write!(f, "<dict {:#x}>", address(d)),
            },
            Value::Object(o) => write!(f, "<{} {:#x}>", (**o).type_name(), address(o)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn heap_values_compare_by_identity() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = Value::list(vec![Value::Int(1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.is(&a.clone()));
        assert!(!a.is(&b));
    }

    #[test]
    fn tuples_and_bytes_compare_structurally() {
        let inner = Value::list(Vec::new());
        let a = Value::tuple(vec![Value::Int(1), inner.clone()]);
        let b = Value::tuple(vec![Value::Int(1), inner]);
        assert_eq!(a, b);
        assert!(!a.is(&b));
        assert_eq!(Value::bytes(b"ab"), Value::bytes(b"ab"));
        assert_ne!(Value::bytes(b"ab"), Value::str("ab"));
    }

    #[test]
    fn scalars_have_no_identity() {
        assert_eq!(Value::Int(3).identity(), None);
        assert_eq!(Value::str("x").identity(), None);
        assert!(!Value::None.is(&Value::None));
    }

    #[test]
    fn floats_hash_consistently() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        assert!(set.contains(&Value::Float(-0.0)));
        set.insert(Value::Float(f64::NAN));
        assert!(set.contains(&Value::Float(f64::NAN)));
    }

    #[test]
    fn heap_values_work_as_dict_keys() {
        let key = Value::list(Vec::new());
        let dict = Value::dict([(key.clone(), Value::Int(1))]);
        let entries = dict.as_dict().unwrap().borrow();
        assert_eq!(entries.get(&key), Some(&Value::Int(1)));
        assert_eq!(entries.get(&Value::list(Vec::new())), None);
    }

    #[test]
    fn debug_does_not_follow_cycles() {
        let list = Value::list(Vec::new());
        list.as_list().unwrap().borrow_mut().push(list.clone());
        let text = format!("{list:?}");
        assert!(text.starts_with("<list 0x"), "{text}");
        assert!(text.ends_with("len=1>"), "{text}");
    }
}
