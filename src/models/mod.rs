//! Code Engine API model types.

mod app;
mod build;
mod common;
mod config_map;
mod job;
mod project;
mod secret;

pub use app::*;
pub use build::*;
pub use common::*;
pub use config_map::*;
pub use job::*;
pub use project::*;
pub use secret::*;
