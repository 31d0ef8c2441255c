pub mod action;
pub mod runtime;

pub use action::ActionError;
pub use runtime::RuntimeError;
