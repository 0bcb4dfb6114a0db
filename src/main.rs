//! omegagen Command Line Interface
//!
//! Usage:
//!   omegagen [OPTIONS] <input-file>
//!   omegagen --help
//!
//! Examples:
//!   omegagen dmv.og                          # Generate C with defaults
//!   omegagen --elem-type=double spmv.og      # Double-precision fields
//!   omegagen --engine=/opt/omega/oc krp.og   # Custom Omega calculator
//!   omegagen --emit=space lap.og             # Just dump the parsed domains

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use omegagen::codegen::{CodeGenerator, RelationRenderer};
use omegagen::omega::OmegaCalc;
use omegagen::CompileConfig;
use std::fs;
use std::path::PathBuf;

/// omegagen - loop nests from polyhedral domain descriptions
#[derive(Parser, Debug)]
#[command(name = "omegagen")]
#[command(author = "omegagen Contributors")]
#[command(version)]
#[command(about = "Generate C loop nests from domain descriptions via the Omega calculator", long_about = None)]
struct Cli {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "code")]
    emit: EmitKind,

    /// C type of field elements
    #[arg(long, value_name = "TYPE")]
    elem_type: Option<String>,

    /// C type of constants and loop temporaries
    #[arg(long, value_name = "TYPE")]
    index_type: Option<String>,

    /// Omega calculator binary
    #[arg(long, value_name = "PATH")]
    engine: Option<String>,

    /// JSON configuration file; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Generated C code
    Code,
    /// Parsed domains in source form
    Space,
    /// Statement macros only
    Macros,
    /// Lowered computations as JSON
    Ir,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("omegagen v{}", omegagen::VERSION);
    debug!("Input file: {:?}", cli.input);

    let config = build_config(&cli)?;
    debug!("Compile config: {:?}", config);

    info!("Parsing...");
    let computations = omegagen::lower_file(&cli.input)
        .with_context(|| format!("Failed to compile input file: {:?}", cli.input))?;

    let engine = OmegaCalc::new(config.engine_path.clone());
    let generator = CodeGenerator::new(&engine, config);

    let output = match cli.emit {
        EmitKind::Space => computations
            .iter()
            .map(|comp| RelationRenderer::new().source_form(&comp.space))
            .collect::<Vec<_>>()
            .join("\n"),
        EmitKind::Macros => {
            let mut lines = Vec::new();
            for comp in &computations {
                lines.extend(generator.macros(comp)?);
            }
            lines.join("\n")
        }
        EmitKind::Ir => serde_json::to_string_pretty(&computations)
            .with_context(|| "Failed to serialize computations")?,
        EmitKind::Code => {
            info!("Generating code for {} computation(s)...", computations.len());
            if !engine.is_available() {
                error!("Omega calculator '{}' not found", engine.binary());
            }
            generator.generate(&computations).map_err(|e| {
                error!("Code generation failed: {}", e);
                e
            })?
        }
    };

    write_output(&cli.output, &output)
}

fn build_config(cli: &Cli) -> Result<CompileConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file: {:?}", path))?
        }
        None => CompileConfig::default(),
    };

    // Override with CLI flags
    if let Some(ref ty) = cli.elem_type {
        config.elem_type = ty.clone();
    }
    if let Some(ref ty) = cli.index_type {
        config.index_type = ty.clone();
    }
    if let Some(ref path) = cli.engine {
        config.engine_path = path.clone();
    }

    Ok(config)
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
