//! # Chorizo Forge
//!
//! **Chorizo Forge** turns raw macromolecular atom records into a chain of template-matched
//! residues, each carrying a bonded molecular graph, a padded copy that stands in for its
//! neighbours, and per-atom parameters ready for a docking-format writer.
//!
//! ## Features
//!
//! - **Template identity resolution** – Embedded TOML residue templates with terminal patches; ambiguous names such as `HIS` or `LYS` resolve by atom evidence.
//! - **Checked inter-residue bonding** – Backbone and disulfide links are planned by distance and sequence, and every open link point must be declared blunt.
//! - **Padding for preparation** – Each residue is capped with copies of its bonded neighbours' atoms so charges and atom types see the right chemistry.
//! - **Editable container** – Templates can be swapped, residues deleted, disulfides broken and side chains flagged flexible after construction.
//! - **Export** – Static parameter tables, PDB text with template names, and a JSON document that restores the container.
//!
//! ```
//! use chorizo_forge::ops::{ChorizoBuilder, FormalChargePreparer};
//! use chorizo_forge::templates;
//!
//! let pdb = "\
//! ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
//! ATOM      2  CA  GLY A   1       1.458   0.000   0.000  1.00  0.00           C
//! ATOM      3  C   GLY A   1       2.009   1.420   0.000  1.00  0.00           C
//! ATOM      4  O   GLY A   1       1.251   2.390   0.000  1.00  0.00           O
//! ";
//! let chorizo = ChorizoBuilder::new(templates::bundled())
//!     .blunt_end("A:1".parse().unwrap(), 0)
//!     .blunt_end("A:1".parse().unwrap(), 2)
//!     .from_pdb_string(pdb, FormalChargePreparer::default())
//!     .unwrap();
//!
//! let params = chorizo.export_static_atom_params().unwrap();
//! assert_eq!(params.len(), 4);
//! ```

mod db;

pub mod io;
pub mod model;
pub mod ops;
pub mod templates;

#[cfg(test)]
mod testing;

pub use model::atom::RawAtom;
pub use model::chorizo::{BondKind, Chorizo, InterResidueBond};
pub use model::graph::{GraphAtom, MolGraph, PaddedMolecule};
pub use model::id::{LinkEnd, ResidueId};
pub use model::params::{ParamValue, PreparedAtoms};
pub use model::residue::{IgnoreReason, Residue, ResidueStatus};
pub use model::template::{LinkRole, ResidueTemplate};
pub use model::types::{BondOrder, Element, Point};
pub use templates::TemplateLibrary;
