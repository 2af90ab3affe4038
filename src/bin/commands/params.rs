use std::fmt::Write;

use anyhow::Result;
use clap::Args;

use chorizo_forge::Chorizo;
use chorizo_forge::ops::{Preparer, StaticParams};

use crate::commands::json::flexibilize;
use crate::commands::run_with_spinner;

/// Writes the static atom parameters as tab-separated columns.
#[derive(Debug, Default, Args)]
pub struct ParamsArgs {
    /// Residues whose side chains are excluded as flexible (e.g. A:42).
    #[arg(long, value_name = "RESIDUE", num_args = 1..)]
    pub flexible: Vec<String>,
}

pub fn run(chorizo: &mut Chorizo, args: &ParamsArgs, preparer: &dyn Preparer) -> Result<String> {
    flexibilize(chorizo, &args.flexible, preparer)?;
    let exported = run_with_spinner("Exporting static parameters", || {
        Ok(chorizo.export_static_atom_params()?)
    })?;
    Ok(render(&exported))
}

fn render(exported: &StaticParams) -> String {
    let mut out = String::new();
    let keys: Vec<&String> = exported.params.keys().collect();

    out.push_str("residue\tatom\tx\ty\tz");
    for key in &keys {
        out.push('\t');
        out.push_str(key);
    }
    out.push('\n');

    for (i, ((residue, atom), pos)) in exported.atoms.iter().zip(&exported.coords).enumerate() {
        let _ = write!(out, "{}\t{}\t{:.3}\t{:.3}\t{:.3}", residue, atom, pos.x, pos.y, pos.z);
        for key in &keys {
            let _ = write!(out, "\t{}", exported.params[*key][i]);
        }
        out.push('\n');
    }
    out
}
