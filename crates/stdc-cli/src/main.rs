//! `stdc`: convert every tensor of a safetensors file to F32, F16 or BF16.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use stdc_cli::config::{CliConfig, Overrides};
use stdc_cli::exit::{EXIT_SUCCESS, code_for};
use stdc_cli::{logging, report};
use stdc_dtype::ConversionTarget;
use stdc_format::convert_file;

/// Convert safetensors tensors to a single float encoding
#[derive(Parser, Debug)]
#[command(name = "stdc", version)]
#[command(after_help = "\
Examples:
  stdc -i model.safetensors -o model-f16.safetensors -t F16
  stdc -i model.safetensors --replace --target bf16

F16 and BF16 tensors are kept as they are. BOOL tensors cannot be converted
and make the run fail without writing anything.")]
struct Args {
    /// Input .safetensors file
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Output file [default: output.safetensors]
    #[arg(short, long, value_name = "PATH", conflicts_with = "replace")]
    output: Option<PathBuf>,

    /// Rewrite the input file in place
    #[arg(short = 'R', long)]
    replace: bool,

    /// Target encoding: F32, F16 or BF16 [default: F32]
    #[arg(short, long, value_name = "DTYPE")]
    target: Option<ConversionTarget>,

    /// Log per-tensor details
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (.toml or .json)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a JSON conversion report to PATH
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let code = match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> Result<()> {
    let mut config = CliConfig::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    config.apply_overrides(Overrides {
        target: args.target,
        output: args.output,
        replace: args.replace,
        verbose: args.verbose,
        report: args.report,
    });
    config.validate(&args.input)?;

    logging::init(&config.log_level);
    logging::warn_if_big_endian();
    tracing::debug!(?config, "resolved configuration");

    let summary = convert_file(&args.input, &config.convert_options())
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    if let Some(path) = &config.report {
        report::write_report(path, &summary)?;
    }
    Ok(())
}
