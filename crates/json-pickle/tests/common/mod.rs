#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use json_pickle::{Persist, PickleError, State, TypeRegistry, Value};

/// Tree node with a back pointer to its parent.
pub struct TreeNode {
    pub label: RefCell<Value>,
    pub parent: RefCell<Value>,
    pub children: RefCell<Value>,
}

impl TreeNode {
    pub fn new(label: &str) -> Value {
        Value::object(TreeNode {
            label: RefCell::new(Value::str(label)),
            parent: RefCell::new(Value::None),
            children: RefCell::new(Value::list(Vec::new())),
        })
    }
}

impl Persist for TreeNode {
    fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
        Ok(TreeNode {
            label: RefCell::new(Value::None),
            parent: RefCell::new(Value::None),
            children: RefCell::new(Value::None),
        })
    }

    fn get_state(&self) -> Result<Option<State>, PickleError> {
        Ok(Some(State::from([
            ("label".to_owned(), self.label.borrow().clone()),
            ("parent".to_owned(), self.parent.borrow().clone()),
            ("children".to_owned(), self.children.borrow().clone()),
        ])))
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), PickleError> {
        let field = match name {
            "label" => &self.label,
            "parent" => &self.parent,
            "children" => &self.children,
            other => return Err(PickleError::unknown_attribute("TreeNode", other)),
        };
        *field.borrow_mut() = value;
        Ok(())
    }
}

pub fn tree(value: &Value) -> Rc<TreeNode> {
    value.as_object::<TreeNode>().expect("not a TreeNode")
}

pub fn add_child(parent: &Value, child: &Value) {
    *tree(child).parent.borrow_mut() = parent.clone();
    let node = tree(parent);
    let children = node.children.borrow();
    children
        .as_list()
        .expect("children is a list")
        .borrow_mut()
        .push(child.clone());
}

/// Immutable point rebuilt from construction arguments.
#[derive(Debug, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Persist for Point {
    fn allocate(args: Vec<Value>) -> Result<Self, PickleError> {
        match args.as_slice() {
            [Value::Int(x), Value::Int(y)] => Ok(Point { x: *x, y: *y }),
            _ => Err(PickleError::hook(format!("Point expects (int, int), got {args:?}"))),
        }
    }

    fn construction_args(&self) -> Result<Option<Vec<Value>>, PickleError> {
        Ok(Some(vec![Value::Int(self.x), Value::Int(self.y)]))
    }
}

/// Wraps a single value passed at construction time.
pub struct Frozen {
    pub inner: Value,
}

impl Persist for Frozen {
    fn allocate(mut args: Vec<Value>) -> Result<Self, PickleError> {
        match args.len() {
            1 => Ok(Frozen { inner: args.remove(0) }),
            n => Err(PickleError::hook(format!("Frozen expects 1 argument, got {n}"))),
        }
    }

    fn construction_args(&self) -> Result<Option<Vec<Value>>, PickleError> {
        Ok(Some(vec![self.inner.clone()]))
    }
}

/// No arguments, no state.
pub struct Marker;

impl Persist for Marker {
    fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
        Ok(Marker)
    }
}

/// Its state hook always fails.
pub struct Faulty;

impl Persist for Faulty {
    fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
        Ok(Faulty)
    }

    fn get_state(&self) -> Result<Option<State>, PickleError> {
        Err(PickleError::hook("Faulty refuses to snapshot"))
    }
}

/// Registered nowhere.
pub struct Stray;

impl Persist for Stray {
    fn allocate(_args: Vec<Value>) -> Result<Self, PickleError> {
        Ok(Stray)
    }
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<TreeNode>("tests", "TreeNode").unwrap();
    registry.register::<Point>("geo", "Point").unwrap();
    registry.register::<Frozen>("tests", "Frozen").unwrap();
    registry.register::<Marker>("tests", "Marker").unwrap();
    registry.register::<Faulty>("tests", "Faulty").unwrap();
    registry
}
