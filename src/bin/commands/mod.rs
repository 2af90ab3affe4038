use std::fs::{self, File};
use std::io::{self as stdio, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;

use chorizo_forge::io::read_pdb_atoms;
use chorizo_forge::ops::{ChorizoBuilder, Directives, FormalChargePreparer, PrepConfig};
use chorizo_forge::templates::{self, TemplateLibrary};
use chorizo_forge::{Chorizo, RawAtom, ResidueId};

pub mod info;
pub mod json;
pub mod params;
pub mod pdb;

/// Aggregated IO parameters shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct IoParameters {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Files that steer construction, shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct BuildParameters {
    pub directives: Option<PathBuf>,
    pub templates: Option<PathBuf>,
    pub prep: Option<PathBuf>,
    pub allow_bad_residues: bool,
}

/// Reads PDB atom records from the configured input source.
pub fn load_input(params: &IoParameters) -> Result<Vec<RawAtom>> {
    if let Some(path) = &params.input {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        read_atoms(BufReader::new(file))
            .with_context(|| format!("Failed to parse PDB input from {}", path.display()))
    } else {
        let stdin = stdio::stdin();
        if stdin.is_terminal() {
            bail!(
                "No --input provided and stdin is a TTY. Provide -i/--input or pipe a PDB file into chorizo."
            );
        }
        read_atoms(BufReader::new(stdin.lock())).context("Failed to parse PDB input from stdin")
    }
}

fn read_atoms<R: BufRead>(reader: R) -> Result<Vec<RawAtom>> {
    read_pdb_atoms(reader).map_err(anyhow::Error::new)
}

/// Builds a container from the input, honoring directive, catalog and preparer files.
pub fn build_chorizo(io: &IoParameters, build: &BuildParameters) -> Result<Chorizo> {
    let atoms = load_input(io)?;
    let library = load_library(build.templates.as_deref())?;
    let mut directives = match &build.directives {
        Some(path) => {
            let text = read_text(path)?;
            Directives::from_toml_str(&text)
                .with_context(|| format!("Invalid directives in {}", path.display()))?
        }
        None => Directives::default(),
    };
    directives.allow_bad_residues |= build.allow_bad_residues;
    let preparer = load_preparer(build.prep.as_deref())?;

    run_with_spinner("Building residue chain", || {
        ChorizoBuilder::new(library)
            .with_directives(directives)
            .build(&atoms, preparer)
            .map_err(anyhow::Error::new)
    })
}

pub fn load_preparer(path: Option<&Path>) -> Result<FormalChargePreparer> {
    let config = match path {
        Some(path) => {
            let text = read_text(path)?;
            toml::from_str::<PrepConfig>(&text)
                .with_context(|| format!("Invalid preparer options in {}", path.display()))?
        }
        None => PrepConfig::default(),
    };
    Ok(FormalChargePreparer::new(config))
}

fn load_library(extra: Option<&Path>) -> Result<Arc<TemplateLibrary>> {
    let bundled = templates::bundled();
    let Some(path) = extra else {
        return Ok(bundled);
    };
    let text = read_text(path)?;
    let mut library = TemplateLibrary::clone(&bundled);
    let added = library
        .extend_from_toml(&text)
        .with_context(|| format!("Invalid template catalog {}", path.display()))?;
    log::info!("Loaded {} extra templates from {}", added, path.display());
    Ok(Arc::new(library))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parses residue identifiers given on the command line.
pub fn parse_residue_ids(values: &[String]) -> Result<Vec<ResidueId>> {
    values
        .iter()
        .map(|v| {
            v.trim()
                .parse::<ResidueId>()
                .with_context(|| format!("Invalid residue identifier '{}'", v))
        })
        .collect()
}

/// Writes `text` to the configured output destination.
pub fn save_output(text: &str, params: &IoParameters) -> Result<()> {
    match &params.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(text.as_bytes())
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            writer.flush().context("Failed to flush output writer")?
        }
        None => {
            let stdout = stdio::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            writer
                .write_all(text.as_bytes())
                .context("Failed to write output to stdout")?;
            writer.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

/// Wraps long-running operations with a spinner rendered to stderr.
pub fn run_with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

/// Returns true when stdout is a TTY and no explicit output file was supplied.
pub fn interactive_stdout_requested(params: &IoParameters) -> bool {
    params.output.is_none() && stdio::stdout().is_terminal()
}

/// Ensures commands do not dump structured output directly into an interactive terminal.
pub fn ensure_noninteractive_stdout(command: &str, params: &IoParameters) -> Result<()> {
    if interactive_stdout_requested(params) {
        bail!(
            "Refusing to stream {command} results to an interactive terminal. Use -o/--output or pipe the command into a file."
        );
    }
    Ok(())
}
