use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use chorizo_forge::{Chorizo, Residue, ResidueStatus};

use crate::commands::run_with_spinner;

/// Report-only command that summarizes the built residue chain.
#[derive(Debug, Default, Args)]
pub struct InfoArgs {
    /// Print only the summary table, not one row per residue.
    #[arg(long)]
    pub summary_only: bool,
}

/// Prints residue assignments and chain statistics to stderr.
pub fn run(chorizo: &Chorizo, args: &InfoArgs) -> Result<()> {
    let (rows, summary) = run_with_spinner("Analyzing residues", || {
        let rows: Vec<ResidueReport> = chorizo.residues().iter().map(ResidueReport::from).collect();
        let summary = Summary {
            residues: chorizo.len(),
            ignored: chorizo.ignored_residues().count(),
            bonds: chorizo.bonds().len(),
            blunt_ends: chorizo.blunt_ends().len(),
            net_charge: rows.iter().map(|r| r.charge).sum(),
        };
        Ok((rows, summary))
    })?;

    let mut stderr = io::stderr().lock();
    print_boxed_label(&mut stderr, "Chorizo Report")?;
    writeln!(&mut stderr)?;

    if !args.summary_only {
        let mut residue_table = Table::new();
        print_boxed_label(&mut stderr, "Residues")?;
        residue_table.set_format(*format::consts::FORMAT_BOX_CHARS);
        residue_table.set_titles(row![
            "Residue", "Name", "Template", "Atoms", "Padding", "Charge", "Status"
        ]);
        for report in &rows {
            residue_table.add_row(row![
                report.id,
                report.name,
                report.template,
                report.atoms,
                report.padding,
                format!("{:+.3}", report.charge),
                report.status
            ]);
        }
        residue_table
            .print(&mut stderr)
            .context("Failed to render residue table")?;
        writeln!(&mut stderr)?;
    }

    let mut summary_table = Table::new();
    print_boxed_label(&mut stderr, "Summary")?;
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Metric", "Value"]);
    summary_table.add_row(row!["Residues", summary.residues]);
    summary_table.add_row(row!["Ignored Residues", summary.ignored]);
    summary_table.add_row(row!["Inter-residue Bonds", summary.bonds]);
    summary_table.add_row(row!["Blunt Ends", summary.blunt_ends]);
    summary_table.add_row(row!["Net Charge", format!("{:+.3}", summary.net_charge)]);
    summary_table
        .print(&mut stderr)
        .context("Failed to render chain summary")?;

    Ok(())
}

fn print_boxed_label<W: Write>(writer: &mut W, title: &str) -> io::Result<()> {
    let inner = format!(" {title} ");
    let width = inner.chars().count();
    writeln!(writer, "╭{}╮", "─".repeat(width))?;
    writeln!(writer, "│{}│", inner)?;
    writeln!(writer, "╰{}╯", "─".repeat(width))?;
    Ok(())
}

#[derive(Debug)]
struct ResidueReport {
    id: String,
    name: String,
    template: String,
    atoms: usize,
    padding: usize,
    charge: f64,
    status: String,
}

impl From<&Residue> for ResidueReport {
    fn from(residue: &Residue) -> Self {
        let status = match residue.status() {
            ResidueStatus::Valid if residue.flexible_count() > 0 => {
                format!("flexible ({})", residue.flexible_count())
            }
            ResidueStatus::Valid => "ok".to_string(),
            ResidueStatus::Ignored(reason) => format!("ignored: {}", reason),
        };
        Self {
            id: residue.id().to_string(),
            name: residue.res_name().to_string(),
            template: residue.template_key().unwrap_or("-").to_string(),
            atoms: residue.graph().len(),
            padding: residue.padded().map_or(0, |p| p.padding_count()),
            charge: residue.net_charge(),
            status,
        }
    }
}

#[derive(Debug)]
struct Summary {
    residues: usize,
    ignored: usize,
    bonds: usize,
    blunt_ends: usize,
    net_charge: f64,
}
