//! Handles, data objects, bindings and the structural events a tree view emits.
use crate::errors::ReconcileError;
use crate::schema::JsonSchema;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Opaque, stable handle to one rendered tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(Uuid);

impl NodeHandle {
    pub fn new() -> Self {
        NodeHandle(Uuid::new_v4())
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub usize);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container_{}", self.0)
    }
}

/// Global container id generator (lock-free, atomic)
static CONTAINER_COUNTER: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));

pub fn next_container_id() -> ContainerId {
    ContainerId(CONTAINER_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Type tag carried by a schema. Matching is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        SchemaId(id.to_string())
    }
}

impl From<String> for SchemaId {
    fn from(id: String) -> Self {
        SchemaId(id)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type DataRef = Rc<RefCell<DataObject>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(serde_json::Value),
    Children(Vec<DataRef>),
}

/// One object of the data model. Property order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataObject {
    fields: IndexMap<String, Field>,
}

impl DataObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_ref(self) -> DataRef {
        Rc::new(RefCell::new(self))
    }

    pub fn with_value(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), Field::Value(value.into()));
        self
    }

    pub fn with_children(mut self, key: &str, children: Vec<DataRef>) -> Self {
        self.fields.insert(key.to_string(), Field::Children(children));
        self
    }

    pub fn set(&mut self, key: &str, field: Field) -> Option<Field> {
        self.fields.insert(key.to_string(), field)
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        match self.fields.get(key) {
            Some(Field::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn children(&self, key: &str) -> Option<&Vec<DataRef>> {
        match self.fields.get(key) {
            Some(Field::Children(c)) => Some(c),
            _ => None,
        }
    }

    /// `Ok(None)` when the property is absent, an error when it holds a value.
    pub fn children_mut(&mut self, key: &str) -> Result<Option<&mut Vec<DataRef>>, ReconcileError> {
        match self.fields.get_mut(key) {
            None => Ok(None),
            Some(Field::Children(c)) => Ok(Some(c)),
            Some(Field::Value(_)) => Err(ReconcileError::NotACollection {
                property: key.to_string(),
            }),
        }
    }

    /// Like `children_mut`, but creates an empty collection when the property is absent.
    pub fn ensure_children(&mut self, key: &str) -> Result<&mut Vec<DataRef>, ReconcileError> {
        let field = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Field::Children(Vec::new()));
        match field {
            Field::Children(c) => Ok(c),
            Field::Value(_) => Err(ReconcileError::NotACollection {
                property: key.to_string(),
            }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Capability that deletes one bound object from one bound collection.
///
/// Removal is by identity. The return value is the index the object occupied,
/// or `None` when it was not found (nothing is removed in that case).
pub trait Remover {
    fn remove(&self) -> Option<usize>;
}

impl<F> Remover for F
where
    F: Fn() -> Option<usize>,
{
    fn remove(&self) -> Option<usize> {
        self()
    }
}

/// What the rendering layer knows about one visual node.
pub struct NodeBinding {
    pub data: DataRef,
    pub schema: Rc<JsonSchema>,
    /// `None` for the root node.
    pub remover: Option<Box<dyn Remover>>,
}

impl NodeBinding {
    pub fn new(data: DataRef, schema: Rc<JsonSchema>, remover: Option<Box<dyn Remover>>) -> Self {
        NodeBinding { data, schema, remover }
    }

    pub fn root(data: DataRef, schema: Rc<JsonSchema>) -> Self {
        NodeBinding { data, schema, remover: None }
    }
}

impl fmt::Debug for NodeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBinding")
            .field("schema", &self.schema.id)
            .field("has_remover", &self.remover.is_some())
            .finish()
    }
}

/// Metadata carried by a rendered child-list container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMarker {
    pub child_schema: SchemaId,
    pub property: String,
}

/// A rendered child-list container, owned by the node whose data holds the collection.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: ContainerId,
    pub owner: NodeHandle,
    pub marker: ContainerMarker,
}

impl Container {
    pub fn new(owner: NodeHandle, marker: ContainerMarker) -> Self {
        Container {
            id: next_container_id(),
            owner,
            marker,
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Container {}

#[derive(Debug, Clone, Copy)]
pub struct MoveEvent<'a> {
    pub source: &'a Container,
    pub destination: &'a Container,
    pub old_index: usize,
    pub new_index: usize,
    pub node: NodeHandle,
}

/// Fired after `node` has already left the visual container.
#[derive(Debug, Clone, Copy)]
pub struct RemoveEvent<'a> {
    pub source: &'a Container,
    /// Informational only; removal is by identity.
    pub old_index: usize,
    pub node: NodeHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct AddEvent<'a> {
    pub destination: &'a Container,
    pub new_index: usize,
    pub node: NodeHandle,
}

/// Native outcome of one successfully applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Reordered { from: usize, to: usize },
    Relocated { from: usize, to: usize },
    Removed { index: usize },
    Inserted { index: usize },
}
