//! Checks applied to caller input before any stream is requested.

pub mod name;
pub mod path;

pub use name::{ContainerName, validate_container_name};
pub use path::{ContainerPath, sanitize_path};
