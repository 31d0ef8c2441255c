//! Action model: definitions, implementations and the registry.

mod handler;
mod registry;
mod types;

pub use handler::{handler_fn, ActionContext, ActionHandler, FnHandler};
pub use registry::Registry;
pub use types::{
    Action, ActionCall, ActionMetadata, Category, InputSpec, OutputSpec, Tier, ValueMap, ValueType,
};
