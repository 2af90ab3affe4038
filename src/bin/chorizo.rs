use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::{BuildParameters, IoParameters};
use commands::{info, json, params, pdb};

#[derive(Parser, Debug)]
#[command(
    name = "chorizo",
    about = "Match PDB residues against templates, link and pad them, and export docking-ready parameters.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Input PDB file path. When omitted, stdin is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,
    /// Output file path. When omitted, stdout is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// TOML file with template overrides, deletions, blunt ends and altloc choices.
    #[arg(long, value_name = "FILE", global = true)]
    directives: Option<PathBuf>,
    /// Extra TOML template catalog layered on top of the bundled one.
    #[arg(long, value_name = "FILE", global = true)]
    templates: Option<PathBuf>,
    /// TOML file with preparer options (hydrogen merging, charge model, custom parameters).
    #[arg(long, value_name = "FILE", global = true)]
    prep: Option<PathBuf>,
    /// Keep residues no template explains instead of failing.
    #[arg(long, global = true)]
    allow_bad_residues: bool,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report template assignments and chain statistics.
    Info(info::InfoArgs),
    /// Write PDB text with template names.
    Pdb(pdb::PdbArgs),
    /// Write the JSON document of the chain.
    Json(json::JsonArgs),
    /// Write static atom parameters as tab-separated columns.
    Params(params::ParamsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let io_params = IoParameters {
        input: cli.input.clone(),
        output: cli.output.clone(),
    };
    let build_params = BuildParameters {
        directives: cli.directives.clone(),
        templates: cli.templates.clone(),
        prep: cli.prep.clone(),
        allow_bad_residues: cli.allow_bad_residues,
    };

    match cli.command {
        Command::Info(args) => {
            let chorizo = commands::build_chorizo(&io_params, &build_params)?;
            info::run(&chorizo, &args)?;
        }
        Command::Pdb(args) => {
            commands::ensure_noninteractive_stdout("pdb", &io_params)?;
            let chorizo = commands::build_chorizo(&io_params, &build_params)?;
            let text = pdb::run(&chorizo, &args)?;
            commands::save_output(&text, &io_params)?;
        }
        Command::Json(args) => {
            commands::ensure_noninteractive_stdout("json", &io_params)?;
            let mut chorizo = commands::build_chorizo(&io_params, &build_params)?;
            let preparer = commands::load_preparer(build_params.prep.as_deref())?;
            let text = json::run(&mut chorizo, &args, &preparer)?;
            commands::save_output(&text, &io_params)?;
        }
        Command::Params(args) => {
            commands::ensure_noninteractive_stdout("params", &io_params)?;
            let mut chorizo = commands::build_chorizo(&io_params, &build_params)?;
            let preparer = commands::load_preparer(build_params.prep.as_deref())?;
            let text = params::run(&mut chorizo, &args, &preparer)?;
            commands::save_output(&text, &io_params)?;
        }
    }

    Ok(())
}
