use anyhow::Result;
use clap::Args;

use chorizo_forge::Chorizo;

/// Writes the chain as PDB text with template keys as residue names.
#[derive(Debug, Default, Args)]
pub struct PdbArgs {}

pub fn run(chorizo: &Chorizo, _args: &PdbArgs) -> Result<String> {
    Ok(chorizo.to_pdb()?)
}
