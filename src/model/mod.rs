//! Core data structures of the chorizo builder.
//!
//! Raw atom records and residue identifiers describe the input; residue templates, molecular
//! graphs and parameter tables describe what matching and preparation produce. The
//! [`chorizo::Chorizo`] container ties resolved residues and their inter-residue bonds together.

pub mod atom;
pub mod chorizo;
pub mod graph;
pub mod grid;
pub mod id;
pub mod params;
pub mod residue;
pub mod template;
pub mod types;
