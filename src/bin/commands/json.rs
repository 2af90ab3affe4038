use anyhow::{Context, Result};
use clap::Args;

use chorizo_forge::Chorizo;
use chorizo_forge::ops::Preparer;

use crate::commands::{self, run_with_spinner};

/// Writes the chain as a JSON document that can be loaded back.
#[derive(Debug, Default, Args)]
pub struct JsonArgs {
    /// Residues whose side chains are flagged flexible before writing (e.g. A:42).
    #[arg(long, value_name = "RESIDUE", num_args = 1..)]
    pub flexible: Vec<String>,
}

pub fn run(chorizo: &mut Chorizo, args: &JsonArgs, preparer: &dyn Preparer) -> Result<String> {
    flexibilize(chorizo, &args.flexible, preparer)?;
    Ok(chorizo.to_json()?)
}

/// Flags the side chains of the listed residues as flexible.
pub fn flexibilize(
    chorizo: &mut Chorizo,
    residues: &[String],
    preparer: &dyn Preparer,
) -> Result<()> {
    let ids = commands::parse_residue_ids(residues)?;
    if ids.is_empty() {
        return Ok(());
    }
    run_with_spinner("Flexibilizing side chains", || {
        for id in &ids {
            let count = chorizo
                .flexibilize_sidechain(id, preparer)
                .with_context(|| format!("Failed to flexibilize {}", id))?;
            log::info!("Flagged {} atoms of {} as flexible", count, id);
        }
        Ok(())
    })
}
