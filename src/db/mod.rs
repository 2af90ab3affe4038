//! Catalog storage for residue templates.
//!
//! Bundled catalogs are embedded at compile time and compiled once into a shared
//! [`TemplateLibrary`](crate::templates::TemplateLibrary); user catalogs go through the same
//! schema and patch machinery at runtime.

mod loader;
mod schema;
mod store;

pub(crate) use loader::compile_with_patches;
pub(crate) use schema::{CatalogFile, PatchRecord, TemplateFile};
pub(crate) use store::bundled;
