use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strata_core::hlsl::{ShaderStorageBlockFunctions, register_block_accesses};
use strata_core::interface::{self, extract_interface};
use strata_core::{InterfaceBlock, LayoutRule};
use thiserror::Error;

/// Packing rule selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Rule {
    /// Pick the rule from each block's storage qualifier (default)
    #[default]
    Auto,
    #[value(name = "std140")]
    Std140,
    #[value(name = "std430")]
    Std430,
    /// Register-packed layout
    Packed,
    /// Enumerate members without computing offsets
    Dummy,
}

impl Rule {
    fn layout_rule(self) -> Option<LayoutRule> {
        match self {
            Rule::Auto => None,
            Rule::Std140 => Some(LayoutRule::Std140),
            Rule::Std430 => Some(LayoutRule::Std430),
            Rule::Packed => Some(LayoutRule::Packed),
            Rule::Dummy => Some(LayoutRule::Dummy),
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable table (default)
    #[default]
    Text,
    Json,
}

/// Times the execution of a closure and prints the elapsed time if verbose.
fn time<T, F: FnOnce() -> T>(name: &str, verbose: bool, f: F) -> T {
    let start = Instant::now();
    let result = f();
    if verbose {
        eprintln!("{}: {}us", name, start.elapsed().as_micros());
    }
    result
}

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Shader interface block layout calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print member offsets and strides of every block in a JSON description
    Layout {
        /// Input JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Packing rule
        #[arg(short, long, default_value = "auto")]
        rule: Rule,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print RWByteAddressBuffer load/store wrappers for every block member
    Hlsl {
        /// Input JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Compilation error: {0}")]
    CompilationError(#[from] strata_core::error::CompilerError),
}

fn main() -> Result<(), DriverError> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            input,
            rule,
            format,
            output,
            verbose,
        } => {
            layout_file(&input, rule, format, output.as_deref(), verbose)?;
        }
        Commands::Hlsl {
            input,
            output,
            verbose,
        } => {
            hlsl_file(&input, output.as_deref(), verbose)?;
        }
    }

    Ok(())
}

fn read_blocks(input: &Path, verbose: bool) -> Result<Vec<InterfaceBlock>, DriverError> {
    if verbose {
        info!("Reading {}...", input.display());
    }
    let source = fs::read_to_string(input)?;
    let blocks = time("parse", verbose, || interface::parse_blocks(&source))?;
    if verbose {
        info!("Parsed {} blocks", blocks.len());
    }
    Ok(blocks)
}

fn write_output(text: &str, output: Option<&Path>, verbose: bool) -> Result<(), DriverError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            if verbose {
                info!("Wrote {}", path.display());
            }
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn layout_file(
    input: &Path,
    rule: Rule,
    format: Format,
    output: Option<&Path>,
    verbose: bool,
) -> Result<(), DriverError> {
    let blocks = read_blocks(input, verbose)?;
    let report = time("layout", verbose, || extract_interface(&blocks, rule.layout_rule()));

    let text = match format {
        Format::Text => interface::to_text(&report),
        Format::Json => {
            let mut json = interface::to_json(&report)?;
            json.push('\n');
            json
        }
    };
    write_output(&text, output, verbose)
}

fn hlsl_file(input: &Path, output: Option<&Path>, verbose: bool) -> Result<(), DriverError> {
    let blocks = read_blocks(input, verbose)?;

    let mut functions = ShaderStorageBlockFunctions::new();
    time("register", verbose, || {
        blocks.iter().try_for_each(|block| register_block_accesses(block, &mut functions))
    })?;
    if verbose {
        info!("Registered {} wrapper functions", functions.len());
    }

    let header = functions.header()?;
    write_output(&header, output, verbose)
}
