//! Schema model and containment resolution
//!
//! A containment property is an array property whose items are objects. The
//! resolver lists them per schema; each one knows the marker its rendered
//! container carries and can mint removal callbacks bound to a parent instance.
use crate::errors::ReconcileError;
use crate::types::{ContainerMarker, DataObject, DataRef, Remover, SchemaId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// The subset of JSON Schema the tree view cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(default, alias = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<SchemaId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
}

impl JsonSchema {
    pub fn from_json(text: &str) -> Result<Self, ReconcileError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ReconcileError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn is_object(&self) -> bool {
        self.schema_type.as_deref() == Some("object") || !self.properties.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.schema_type.as_deref() == Some("array")
    }

    /// Whether a node bound to this schema may live in a container with `marker`.
    pub fn matches(&self, marker: &ContainerMarker) -> bool {
        self.id.as_ref() == Some(&marker.child_schema)
    }
}

pub trait ContainmentResolver {
    fn containment_properties(&self, schema: &JsonSchema) -> Vec<ContainmentProperty>;
}

/// Resolves containment from `type: "array"` properties whose `items` are object schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaContainmentResolver;

impl ContainmentResolver for SchemaContainmentResolver {
    fn containment_properties(&self, schema: &JsonSchema) -> Vec<ContainmentProperty> {
        schema
            .properties
            .iter()
            .filter(|(_, prop)| prop.is_array())
            .filter_map(|(name, prop)| {
                let items = prop.items.as_deref()?;
                items.is_object().then(|| ContainmentProperty {
                    property: name.clone(),
                    child_schema: Rc::new(items.clone()),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ContainmentProperty {
    pub property: String,
    pub child_schema: Rc<JsonSchema>,
}

impl ContainmentProperty {
    /// `None` when the child schema carries no id, since nothing could ever match it.
    pub fn marker(&self) -> Option<ContainerMarker> {
        self.child_schema.id.clone().map(|child_schema| ContainerMarker {
            child_schema,
            property: self.property.clone(),
        })
    }

    pub fn remover(&self, parent: &DataRef, child: &DataRef) -> CollectionRemover {
        CollectionRemover {
            parent: Rc::downgrade(parent),
            property: self.property.clone(),
            child: Rc::downgrade(child),
        }
    }

    /// Snapshot of the current collection; empty when the property is absent.
    pub fn children(&self, parent: &DataRef) -> Vec<DataRef> {
        parent
            .borrow()
            .children(&self.property)
            .cloned()
            .unwrap_or_default()
    }
}

/// Removal callback bound to one parent collection and one child instance.
#[derive(Debug, Clone)]
pub struct CollectionRemover {
    parent: Weak<RefCell<DataObject>>,
    property: String,
    child: Weak<RefCell<DataObject>>,
}

impl Remover for CollectionRemover {
    fn remove(&self) -> Option<usize> {
        let parent = self.parent.upgrade()?;
        let child = self.child.upgrade()?;
        let mut parent = match parent.try_borrow_mut() {
            Ok(p) => p,
            Err(_) => {
                log::warn!(
                    "CollectionRemover: parent of '{}' is borrowed, skipping",
                    self.property
                );
                return None;
            }
        };
        let collection = parent.children_mut(&self.property).ok()??;
        let index = collection.iter().position(|c| Rc::ptr_eq(c, &child))?;
        collection.remove(index);
        log::trace!("CollectionRemover: removed '{}'[{}]", self.property, index);
        Some(index)
    }
}
