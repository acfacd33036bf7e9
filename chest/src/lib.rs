//! Batteries built on `lumen_core`: environment lighting precomputation,
//! image textures and the material text importer.

pub mod environment;
pub mod import;
pub mod texture;

pub use environment::{bake_environment, EnvironmentConfig, EnvironmentMaps, EnvironmentSource};
