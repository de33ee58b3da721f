//! CLI command implementations

pub mod limits;
pub mod render;
pub mod template;
pub mod validate;

mod input;
