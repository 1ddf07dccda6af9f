//! Drag-and-drop reconciliation: structural tree events -> data collection mutations
use crate::config::{MismatchPolicy, ReconcilerConfig};
use crate::errors::ReconcileError;
use crate::registry::NodeRegistry;
use crate::types::*;
use std::rc::Rc;

pub struct DndEngine<'a> {
    registry: &'a NodeRegistry,
    config: ReconcilerConfig,
}

impl<'a> DndEngine<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self::with_config(registry, ReconcilerConfig::default())
    }

    pub fn with_config(registry: &'a NodeRegistry, config: ReconcilerConfig) -> Self {
        DndEngine { registry, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reorder within one container, or take the node out of its source
    /// collection and insert it into the destination's.
    pub fn apply_move(&self, event: &MoveEvent<'_>) -> Result<Reconciled, ReconcileError> {
        let dragged = self.registry.binding(event.node)?;
        if event.source == event.destination {
            self.reorder(event, dragged)
        } else {
            self.relocate(event, dragged)
        }
    }

    /// The node has already left the visual container; drop its data by identity.
    pub fn apply_remove(&self, event: &RemoveEvent<'_>) -> Result<Reconciled, ReconcileError> {
        let binding = self.registry.binding(event.node)?;
        let remover = binding
            .remover
            .as_ref()
            .ok_or(ReconcileError::NoRemover(event.node))?;
        let index = remover.remove().ok_or(ReconcileError::NotFound(event.node))?;
        if index != event.old_index {
            log::debug!(
                "DndEngine::apply_remove: {} removed from index {} (visual index was {})",
                event.node,
                index,
                event.old_index
            );
        }
        Ok(Reconciled::Removed { index })
    }

    pub fn apply_add(&self, event: &AddEvent<'_>) -> Result<Reconciled, ReconcileError> {
        let owner = self.registry.owner(event.destination)?;
        let dragged = self.registry.binding(event.node)?;
        self.check_compatible(event.destination, event.node, dragged)?;
        self.guard_nesting(event.destination, event.node, dragged, owner)?;
        let index = self.attach(event.destination, owner, dragged, event.new_index)?;
        Ok(Reconciled::Inserted { index })
    }

    /// Remove at `old_index`, then insert at `new_index` into the shortened
    /// collection. No off-by-one correction is needed in either direction.
    fn reorder(
        &self,
        event: &MoveEvent<'_>,
        dragged: &NodeBinding,
    ) -> Result<Reconciled, ReconcileError> {
        let container = event.source;
        let owner = self.registry.owner(container)?;
        let mut parent = owner.data.try_borrow_mut()?;
        let property = &container.marker.property;
        let collection = parent
            .children_mut(property)?
            .ok_or_else(|| ReconcileError::MissingCollection {
                container: container.id,
                property: property.clone(),
            })?;

        let len = collection.len();
        if event.old_index >= len {
            return Err(ReconcileError::IndexOutOfBounds {
                index: event.old_index,
                len,
            });
        }
        let to = self.insertion_index(event.new_index, len - 1)?;

        let item = collection.remove(event.old_index);
        if !Rc::ptr_eq(&item, &dragged.data) {
            log::debug!(
                "DndEngine::reorder: index {} of '{}' does not hold the data of {}",
                event.old_index,
                property,
                event.node
            );
        }
        collection.insert(to, item);
        log::trace!("DndEngine::reorder: '{}' {} -> {}", property, event.old_index, to);
        Ok(Reconciled::Reordered {
            from: event.old_index,
            to,
        })
    }

    fn relocate(
        &self,
        event: &MoveEvent<'_>,
        dragged: &NodeBinding,
    ) -> Result<Reconciled, ReconcileError> {
        // everything that can be checked without mutating is checked first
        let source_owner = self.registry.owner(event.source)?;
        let destination_owner = self.registry.owner(event.destination)?;
        let remover = dragged
            .remover
            .as_ref()
            .ok_or(ReconcileError::NoRemover(event.node))?;
        self.guard_nesting(event.destination, event.node, dragged, destination_owner)?;
        if !self.holds(event.source, source_owner, dragged)? {
            return Err(ReconcileError::NotFound(event.node));
        }

        let from = remover.remove().ok_or(ReconcileError::NotFound(event.node))?;

        let attached = self
            .check_compatible(event.destination, event.node, dragged)
            .and_then(|_| {
                self.attach(event.destination, destination_owner, dragged, event.new_index)
            });
        match attached {
            Ok(to) => {
                log::trace!(
                    "DndEngine::relocate: {} {} -> {}[{}]",
                    event.node,
                    event.source.id,
                    event.destination.id,
                    to
                );
                Ok(Reconciled::Relocated { from, to })
            }
            Err(err) => Err(self.recover(event, source_owner, dragged, from, err)),
        }
    }

    /// Decide what happens to data already removed from its source when the
    /// destination refuses it.
    fn recover(
        &self,
        event: &MoveEvent<'_>,
        source_owner: &NodeBinding,
        dragged: &NodeBinding,
        from: usize,
        err: ReconcileError,
    ) -> ReconcileError {
        let detached = ReconcileError::Detached {
            container: event.destination.id,
            node: event.node,
        };
        match self.config.cross_container_mismatch {
            MismatchPolicy::Detach => {
                log::warn!("DndEngine::relocate: {} left detached: {}", event.node, err);
                detached
            }
            MismatchPolicy::Restore => match self.restore(
                event.source,
                source_owner,
                dragged,
                from,
            ) {
                Ok(()) => {
                    log::debug!(
                        "DndEngine::relocate: {} restored to {}[{}]: {}",
                        event.node,
                        event.source.id,
                        from,
                        err
                    );
                    err
                }
                Err(restore_err) => {
                    log::warn!(
                        "DndEngine::relocate: could not restore {}: {} (after {})",
                        event.node,
                        restore_err,
                        err
                    );
                    detached
                }
            },
        }
    }

    fn restore(
        &self,
        source: &Container,
        source_owner: &NodeBinding,
        dragged: &NodeBinding,
        from: usize,
    ) -> Result<(), ReconcileError> {
        let property = &source.marker.property;
        let mut parent = source_owner.data.try_borrow_mut()?;
        let collection = parent
            .children_mut(property)?
            .ok_or_else(|| ReconcileError::MissingCollection {
                container: source.id,
                property: property.clone(),
            })?;
        let at = from.min(collection.len());
        collection.insert(at, dragged.data.clone());
        Ok(())
    }

    /// Whether the collection behind `container` currently holds the dragged data.
    fn holds(
        &self,
        container: &Container,
        owner: &NodeBinding,
        dragged: &NodeBinding,
    ) -> Result<bool, ReconcileError> {
        let parent = owner.data.try_borrow()?;
        Ok(parent
            .children(&container.marker.property)
            .is_some_and(|c| c.iter().any(|d| Rc::ptr_eq(d, &dragged.data))))
    }

    fn attach(
        &self,
        destination: &Container,
        owner: &NodeBinding,
        dragged: &NodeBinding,
        new_index: usize,
    ) -> Result<usize, ReconcileError> {
        let property = &destination.marker.property;
        let mut parent = owner.data.try_borrow_mut()?;
        let len = parent.children_mut(property)?.map_or(0, |c| c.len());
        let index = self.insertion_index(new_index, len)?;
        parent.ensure_children(property)?.insert(index, dragged.data.clone());
        Ok(index)
    }

    fn check_compatible(
        &self,
        destination: &Container,
        node: NodeHandle,
        dragged: &NodeBinding,
    ) -> Result<(), ReconcileError> {
        if dragged.schema.matches(&destination.marker) {
            return Ok(());
        }
        Err(ReconcileError::SchemaMismatch {
            container: destination.id,
            node,
            expected: destination.marker.child_schema.clone(),
            actual: dragged.schema.id.clone(),
        })
    }

    /// A node may not be inserted under its own data or any of its descendants.
    fn guard_nesting(
        &self,
        destination: &Container,
        node: NodeHandle,
        dragged: &NodeBinding,
        owner: &NodeBinding,
    ) -> Result<(), ReconcileError> {
        if Rc::ptr_eq(&dragged.data, &owner.data)
            || contains_descendant(&dragged.data, &owner.data)
        {
            return Err(ReconcileError::WouldNest {
                container: destination.id,
                node,
            });
        }
        Ok(())
    }

    fn insertion_index(&self, new_index: usize, len: usize) -> Result<usize, ReconcileError> {
        if new_index <= len {
            Ok(new_index)
        } else if self.config.strict_indices {
            Err(ReconcileError::IndexOutOfBounds { index: new_index, len })
        } else {
            log::debug!("DndEngine: index {} past end of {}, appending", new_index, len);
            Ok(len)
        }
    }
}

fn contains_descendant(ancestor: &DataRef, needle: &DataRef) -> bool {
    let Ok(object) = ancestor.try_borrow() else {
        return false;
    };
    object.fields().any(|(_, field)| match field {
        Field::Children(children) => children
            .iter()
            .any(|c| Rc::ptr_eq(c, needle) || contains_descendant(c, needle)),
        Field::Value(_) => false,
    })
}
