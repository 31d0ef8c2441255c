//! scaffold-core: action orchestration and a local process runtime for
//! scaffolded applications.

pub mod action;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod operator;
pub mod runtime;
pub mod util;
