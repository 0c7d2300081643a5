//! Type registry: the explicit capability set a type opts into to take part
//! in generic-object encoding.
//!
//! A participating type implements [`Persist`] and is registered under a
//! `namespace@Name` identifier. The registry answers the four questions the
//! codec asks about an object: which type it is, which construction
//! arguments rebuild it, what its state is, and how to apply state back.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::PickleError;
use crate::value::{State, Value};

pub const TYPE_SEPARATOR: char = '@';

/// Built-in types, registered under bare names.
pub const BUILTIN_TYPES: [&str; 10] = [
    "NoneType", "bool", "int", "float", "str", "type", "tuple", "bytes", "list", "dict",
];

/// Dynamic access to the concrete type behind a `dyn Persist`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Hooks a type provides to be encoded as a generic object.
///
/// State is applied after allocation through `&self`, so implementors keep
/// their persisted fields behind interior mutability (`RefCell`, `Cell`).
/// That is what lets a half-built object be shared by the objects that
/// point back at it while it is still being populated.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use json_pickle::{Persist, PickleError, State, Value};
///
/// #[derive(Default)]
/// struct Label {
///     text: RefCell<Value>,
/// }
///
/// impl Persist for Label {
///     fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
///         Ok(Label::default())
///     }
///
///     fn get_state(&self) -> Result<Option<State>, PickleError> {
///         Ok(Some(State::from([("text".to_owned(), self.text.borrow().clone())])))
///     }
///
///     fn set_attr(&self, name: &str, value: Value) -> Result<(), PickleError> {
///         match name {
///             "text" => *self.text.borrow_mut() = value,
///             other => return Err(PickleError::unknown_attribute("Label", other)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Persist: AsAny {
    /// Produces an instance without running normal initialization. `args`
    /// are the decoded construction arguments, empty when none were
    /// recorded.
    fn allocate(args: Vec<Value>) -> Result<Self, PickleError>
    where
        Self: Sized;

    fn construction_args(&self) -> Result<Option<Vec<Value>>, PickleError> {
        Ok(None)
    }

    /// `None` when the type has no mutable state.
    fn get_state(&self) -> Result<Option<State>, PickleError> {
        Ok(None)
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), PickleError> {
        let _ = value;
        Err(PickleError::unknown_attribute(self.type_name(), name))
    }
}

type Allocator = fn(Vec<Value>) -> Result<Rc<dyn Persist>, PickleError>;

fn allocate_rc<T: Persist>(args: Vec<Value>) -> Result<Rc<dyn Persist>, PickleError> {
    Ok(Rc::new(T::allocate(args)?))
}

struct TypeInfo {
    id: String,
    namespace: Option<String>,
    name: String,
    allocator: Option<Allocator>,
}

/// A type as a first-class value.
#[derive(Clone)]
pub struct TypeHandle(Rc<TypeInfo>);

impl TypeHandle {
    fn builtin(name: &str) -> Self {
        TypeHandle(Rc::new(TypeInfo {
            id: name.to_owned(),
            namespace: None,
            name: name.to_owned(),
            allocator: None,
        }))
    }

    /// Qualified identifier: `namespace@Name`, or the bare name of a built-in.
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.namespace.as_deref()
    }

    pub fn is_builtin(&self) -> bool {
        self.0.namespace.is_none()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.0.id).finish()
    }
}

pub struct TypeRegistry {
    by_id: HashMap<String, TypeHandle>,
    by_type: HashMap<TypeId, TypeHandle>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only the built-in types.
    pub fn new() -> Self {
        let by_id = BUILTIN_TYPES
            .iter()
            .map(|name| (name.to_string(), TypeHandle::builtin(name)))
            .collect();
        Self {
            by_id,
            by_type: HashMap::new(),
        }
    }

    pub fn register<T: Persist>(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Result<TypeHandle, PickleError> {
        if namespace.is_empty() || name.is_empty() {
            return Err(PickleError::Registration(format!(
                "`{namespace}{TYPE_SEPARATOR}{name}`: namespace and name must be non-empty"
            )));
        }
        if namespace.contains(TYPE_SEPARATOR) || name.contains(TYPE_SEPARATOR) {
            return Err(PickleError::Registration(format!(
                "`{namespace}{TYPE_SEPARATOR}{name}`: `{TYPE_SEPARATOR}` is reserved as the separator"
            )));
        }
        let id = format!("{namespace}{TYPE_SEPARATOR}{name}");
        if self.by_id.contains_key(&id) {
            return Err(PickleError::Registration(format!("`{id}` is already registered")));
        }
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.by_type.get(&type_id) {
            return Err(PickleError::Registration(format!(
                "{} is already registered as `{}`",
                std::any::type_name::<T>(),
                existing.id()
            )));
        }
        let handle = TypeHandle(Rc::new(TypeInfo {
            id: id.clone(),
            namespace: Some(namespace.to_owned()),
            name: name.to_owned(),
            allocator: Some(allocate_rc::<T>),
        }));
        self.by_id.insert(id, handle.clone());
        self.by_type.insert(type_id, handle.clone());
        Ok(handle)
    }

    pub fn handle_of<T: Persist>(&self) -> Option<TypeHandle> {
        self.by_type.get(&TypeId::of::<T>()).cloned()
    }

    pub fn type_id<'t>(&self, ty: &'t TypeHandle) -> &'t str {
        ty.id()
    }

    pub fn resolve(&self, type_id: &str) -> Result<TypeHandle, PickleError> {
        self.by_id
            .get(type_id)
            .cloned()
            .ok_or_else(|| PickleError::Lookup(format!("unknown type `{type_id}`")))
    }

    /// The registered type of a generic object.
    pub fn type_of(&self, object: &dyn Persist) -> Result<TypeHandle, PickleError> {
        self.by_type
            .get(&object.as_any().type_id())
            .cloned()
            .ok_or_else(|| {
                PickleError::Lookup(format!("{} is not registered", object.type_name()))
            })
    }

    pub fn construction_args(&self, object: &dyn Persist) -> Result<Option<Vec<Value>>, PickleError> {
        object.construction_args()
    }

    pub fn raw_allocate(
        &self,
        ty: &TypeHandle,
        args: Vec<Value>,
    ) -> Result<Rc<dyn Persist>, PickleError> {
        let allocate = ty.0.allocator.ok_or_else(|| {
            PickleError::Protocol(format!("type `{}` cannot be raw-allocated", ty.id()))
        })?;
        allocate(args)
    }

    pub fn get_state(&self, object: &dyn Persist) -> Result<Option<State>, PickleError> {
        object.get_state()
    }

    pub fn set_attr(&self, object: &dyn Persist, name: &str, value: Value) -> Result<(), PickleError> {
        object.set_attr(name, value)
    }

    /// Applies a snapshot attribute by attribute, in snapshot order.
    pub fn set_state(&self, object: &dyn Persist, state: State) -> Result<(), PickleError> {
        for (name, value) in state {
            object.set_attr(&name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        hits: Cell<i64>,
    }

    impl Persist for Counter {
        fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
            Ok(Counter::default())
        }

        fn get_state(&self) -> Result<Option<State>, PickleError> {
            Ok(Some(State::from([("hits".to_owned(), Value::Int(self.hits.get()))])))
        }

        fn set_attr(&self, name: &str, value: Value) -> Result<(), PickleError> {
            match (name, value) {
                ("hits", Value::Int(n)) => self.hits.set(n),
                (other, _) => return Err(PickleError::unknown_attribute("Counter", other)),
            }
            Ok(())
        }
    }

    struct Opaque;

    impl Persist for Opaque {
        fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
            Ok(Opaque)
        }
    }

    #[test]
    fn builtins_resolve_by_bare_name() {
        let registry = TypeRegistry::new();
        for name in BUILTIN_TYPES {
            let ty = registry.resolve(name).unwrap();
            assert_eq!(ty.id(), name);
            assert!(ty.is_builtin());
        }
        assert!(matches!(registry.resolve("nope"), Err(PickleError::Lookup(_))));
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = TypeRegistry::new();
        let ty = registry.register::<Counter>("stats", "Counter").unwrap();
        assert_eq!(ty.id(), "stats@Counter");
        assert_eq!(ty.namespace(), Some("stats"));
        assert_eq!(ty.name(), "Counter");
        assert_eq!(registry.resolve("stats@Counter").unwrap(), ty);
        assert_eq!(registry.handle_of::<Counter>(), Some(ty.clone()));
        assert_eq!(registry.type_id(&ty), "stats@Counter");

        let obj = Counter::default();
        assert_eq!(registry.type_of(&obj).unwrap(), ty);
        assert!(matches!(registry.type_of(&Opaque), Err(PickleError::Lookup(_))));
    }

    #[test]
    fn invalid_registrations() {
        let mut registry = TypeRegistry::new();
        assert!(registry.register::<Counter>("", "Counter").is_err());
        assert!(registry.register::<Counter>("a@b", "Counter").is_err());
        assert!(registry.register::<Counter>("stats", "").is_err());
        registry.register::<Counter>("stats", "Counter").unwrap();
        assert!(matches!(
            registry.register::<Opaque>("stats", "Counter"),
            Err(PickleError::Registration(_))
        ));
        assert!(matches!(
            registry.register::<Counter>("stats", "Other"),
            Err(PickleError::Registration(_))
        ));
    }

    #[test]
    fn allocate_and_apply_state() {
        let mut registry = TypeRegistry::new();
        let ty = registry.register::<Counter>("stats", "Counter").unwrap();
        let obj = registry.raw_allocate(&ty, Vec::new()).unwrap();
        registry
            .set_state(obj.as_ref(), State::from([("hits".to_owned(), Value::Int(4))]))
            .unwrap();
        let state = registry.get_state(obj.as_ref()).unwrap().unwrap();
        assert_eq!(state["hits"], Value::Int(4));
        assert!(registry.set_attr(obj.as_ref(), "misses", Value::Int(1)).is_err());
    }

    #[test]
    fn builtins_cannot_be_raw_allocated() {
        let registry = TypeRegistry::new();
        let list = registry.resolve("list").unwrap();
        assert!(matches!(
            registry.raw_allocate(&list, Vec::new()),
            Err(PickleError::Protocol(_))
        ));
    }

    #[test]
    fn default_hooks_report_no_args_or_state() {
        let registry = TypeRegistry::new();
        assert!(registry.construction_args(&Opaque).unwrap().is_none());
        assert!(registry.get_state(&Opaque).unwrap().is_none());
        assert!(Opaque.set_attr("x", Value::None).is_err());
    }
}
