mod error;
mod pdb;

pub mod json;

use crate::model::atom::RawAtom;
use std::io::BufRead;

pub use pdb::writer::write_chorizo as write_pdb;

pub use error::Error;

/// Reads `ATOM`/`HETATM` records of PDB text in file order.
///
/// Every other record type is skipped. Residue grouping and altloc selection are left to the
/// builder.
pub fn read_pdb_atoms<R: BufRead>(reader: R) -> Result<Vec<RawAtom>, Error> {
    pdb::reader::read(reader)
}
