//! Keeps a hierarchical data model in step with a drag-and-drop tree view.
//!
//! The rendering layer owns a [`NodeRegistry`] that binds each visual node to
//! its data object, schema and removal callback. The handler factories below
//! turn the tree's structural events (move, remove, add) into mutations of the
//! ordered child collections behind those nodes. Events that cannot be applied
//! are no-ops; use [`DndEngine`] directly to see why.
mod config;
mod converters;
mod dnd_engine;
mod errors;
mod registry;
mod schema;
mod types;

pub use config::{MismatchPolicy, ReconcilerConfig};
pub use converters::{data_from_json, data_to_json};
pub use dnd_engine::DndEngine;
pub use errors::ReconcileError;
pub use registry::{BoundContainer, BoundTree, NodeRegistry};
pub use schema::{
    CollectionRemover, ContainmentProperty, ContainmentResolver, JsonSchema,
    SchemaContainmentResolver,
};
pub use types::{
    AddEvent, Container, ContainerId, ContainerMarker, DataObject, DataRef, Field, MoveEvent,
    NodeBinding, NodeHandle, Reconciled, RemoveEvent, Remover, SchemaId,
};

pub fn move_handler(registry: &NodeRegistry) -> impl Fn(&MoveEvent<'_>) + '_ {
    move_handler_with(registry, ReconcilerConfig::default())
}

pub fn move_handler_with(
    registry: &NodeRegistry,
    config: ReconcilerConfig,
) -> impl Fn(&MoveEvent<'_>) + '_ {
    let engine = DndEngine::with_config(registry, config);
    move |event: &MoveEvent<'_>| report("move", event.node, engine.apply_move(event))
}

pub fn remove_handler(registry: &NodeRegistry) -> impl Fn(&RemoveEvent<'_>) + '_ {
    remove_handler_with(registry, ReconcilerConfig::default())
}

pub fn remove_handler_with(
    registry: &NodeRegistry,
    config: ReconcilerConfig,
) -> impl Fn(&RemoveEvent<'_>) + '_ {
    let engine = DndEngine::with_config(registry, config);
    move |event: &RemoveEvent<'_>| report("remove", event.node, engine.apply_remove(event))
}

pub fn add_handler(registry: &NodeRegistry) -> impl Fn(&AddEvent<'_>) + '_ {
    add_handler_with(registry, ReconcilerConfig::default())
}

pub fn add_handler_with(
    registry: &NodeRegistry,
    config: ReconcilerConfig,
) -> impl Fn(&AddEvent<'_>) + '_ {
    let engine = DndEngine::with_config(registry, config);
    move |event: &AddEvent<'_>| report("add", event.node, engine.apply_add(event))
}

fn report(kind: &str, node: NodeHandle, outcome: Result<Reconciled, ReconcileError>) {
    match outcome {
        Ok(done) => log::trace!("{} handler: {} {:?}", kind, node, done),
        Err(err) if err.is_data_loss() => log::warn!("{} handler: {}", kind, err),
        Err(err) => log::debug!("{} handler ignored event for {}: {}", kind, node, err),
    }
}
