//! Node registry: visual node handle -> data binding
use crate::errors::ReconcileError;
use crate::schema::{ContainmentResolver, JsonSchema};
use crate::types::{Container, DataRef, NodeBinding, NodeHandle};
use std::collections::HashMap;
use std::rc::Rc;

/// Bindings of every rendered node, the root included. Owned and kept
/// current by the rendering layer; the engine only reads it.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    bindings: HashMap<NodeHandle, NodeBinding>,
}

/// One rendered container and its children in visual order.
#[derive(Debug, Clone)]
pub struct BoundContainer {
    pub container: Container,
    pub children: Vec<NodeHandle>,
}

/// Result of binding a whole data tree.
#[derive(Debug, Clone)]
pub struct BoundTree {
    pub root: NodeHandle,
    pub containers: Vec<BoundContainer>,
}

impl BoundTree {
    pub fn container(&self, owner: NodeHandle, property: &str) -> Option<&BoundContainer> {
        self.containers
            .iter()
            .find(|c| c.container.owner == owner && c.container.marker.property == property)
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeHandle, binding: NodeBinding) -> Option<NodeBinding> {
        self.bindings.insert(node, binding)
    }

    pub fn remove(&mut self, node: NodeHandle) -> Option<NodeBinding> {
        self.bindings.remove(&node)
    }

    pub fn get(&self, node: NodeHandle) -> Option<&NodeBinding> {
        self.bindings.get(&node)
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.bindings.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Reverse lookup by data identity (linear).
    pub fn handle_of(&self, data: &DataRef) -> Option<NodeHandle> {
        self.bindings
            .iter()
            .find(|(_, b)| Rc::ptr_eq(&b.data, data))
            .map(|(h, _)| *h)
    }

    pub(crate) fn binding(&self, node: NodeHandle) -> Result<&NodeBinding, ReconcileError> {
        self.bindings.get(&node).ok_or(ReconcileError::UnknownNode(node))
    }

    pub(crate) fn owner(&self, container: &Container) -> Result<&NodeBinding, ReconcileError> {
        self.binding(container.owner)
    }

    /// Register `root` and everything reachable through containment properties,
    /// returning the containers a renderer would draw for them.
    pub fn bind_tree(
        &mut self,
        root: DataRef,
        schema: Rc<JsonSchema>,
        resolver: &dyn ContainmentResolver,
    ) -> BoundTree {
        let root_handle = NodeHandle::new();
        let mut containers = Vec::new();
        self.bind_node(root_handle, &root, &schema, resolver, &mut containers);
        self.insert(root_handle, NodeBinding::root(root, schema));
        log::debug!(
            "NodeRegistry::bind_tree: {} bindings, {} containers",
            self.len(),
            containers.len()
        );
        BoundTree {
            root: root_handle,
            containers,
        }
    }

    fn bind_node(
        &mut self,
        handle: NodeHandle,
        data: &DataRef,
        schema: &JsonSchema,
        resolver: &dyn ContainmentResolver,
        containers: &mut Vec<BoundContainer>,
    ) {
        for prop in resolver.containment_properties(schema) {
            let Some(marker) = prop.marker() else {
                log::debug!(
                    "NodeRegistry::bind_tree: '{}' has no child schema id, not rendered",
                    prop.property
                );
                continue;
            };
            let container = Container::new(handle, marker);
            let mut children = Vec::new();
            for child in prop.children(data) {
                let child_handle = NodeHandle::new();
                self.bind_node(child_handle, &child, &prop.child_schema, resolver, containers);
                let remover = prop.remover(data, &child);
                self.insert(
                    child_handle,
                    NodeBinding::new(child, prop.child_schema.clone(), Some(Box::new(remover))),
                );
                children.push(child_handle);
            }
            containers.push(BoundContainer { container, children });
        }
    }

    /// True when the collection behind `container` holds exactly the data of
    /// the registered nodes in `visual_children`, in the same order.
    pub fn mirrors(&self, container: &Container, visual_children: &[NodeHandle]) -> bool {
        let Ok(owner) = self.owner(container) else {
            return false;
        };
        let Ok(owner_data) = owner.data.try_borrow() else {
            return false;
        };
        let collection: &[DataRef] = owner_data
            .children(&container.marker.property)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let visual: Vec<&DataRef> = visual_children
            .iter()
            .filter_map(|h| self.get(*h))
            .map(|b| &b.data)
            .collect();
        collection.len() == visual.len()
            && collection.iter().zip(visual).all(|(c, v)| Rc::ptr_eq(c, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::data_from_json;
    use crate::schema::SchemaContainmentResolver;
    use serde_json::json;

    fn schema() -> Rc<JsonSchema> {
        Rc::new(
            JsonSchema::from_value(json!({
                "type": "object",
                "properties": {
                    "children": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "id": "bar",
                            "properties": {
                                "leaves": { "type": "array", "items": { "type": "object", "id": "leaf" } }
                            }
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn binds_every_node_and_container() {
        let doc = json!({ "children": [{ "name": "1", "leaves": [{}, {}] }, { "name": "2" }] });
        let schema = schema();
        let data = data_from_json(&doc, &schema, &SchemaContainmentResolver).unwrap();
        let mut registry = NodeRegistry::new();
        let tree = registry.bind_tree(data.clone(), schema, &SchemaContainmentResolver);

        // root + 2 children + 2 leaves
        assert_eq!(registry.len(), 5);
        assert!(registry.get(tree.root).unwrap().remover.is_none());
        // root "children", then "leaves" for each child
        assert_eq!(tree.containers.len(), 3);

        let children = tree.container(tree.root, "children").unwrap();
        assert_eq!(children.children.len(), 2);
        assert!(registry.mirrors(&children.container, &children.children));
        assert_eq!(registry.handle_of(&data), Some(tree.root));
    }

    #[test]
    fn mirrors_detects_order_drift() {
        let doc = json!({ "children": [{ "name": "1" }, { "name": "2" }] });
        let schema = schema();
        let data = data_from_json(&doc, &schema, &SchemaContainmentResolver).unwrap();
        let mut registry = NodeRegistry::new();
        let tree = registry.bind_tree(data, schema, &SchemaContainmentResolver);
        let bound = tree.container(tree.root, "children").unwrap();

        let mut reversed = bound.children.clone();
        reversed.reverse();
        assert!(!registry.mirrors(&bound.container, &reversed));

        // unregistered nodes are ignored
        let mut with_stranger = bound.children.clone();
        with_stranger.insert(1, NodeHandle::new());
        assert!(registry.mirrors(&bound.container, &with_stranger));
    }

    #[test]
    fn unknown_node_is_a_typed_error() {
        let registry = NodeRegistry::new();
        let handle = NodeHandle::new();
        assert!(matches!(
            registry.binding(handle),
            Err(ReconcileError::UnknownNode(h)) if h == handle
        ));
    }
}
