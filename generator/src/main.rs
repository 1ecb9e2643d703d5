//! QSpec CLI - Generate interview specs from machine-first tables
//!
//! # Main Commands
//!
//! ```bash
//! qspec generate --input tables/ --out spec.json   # Tables -> validated spec JSON
//! qspec generate --input book.json --validate-only # Check without writing
//! qspec validate spec.json                         # Validate an existing document
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! qspec parse-visibility 'W-10 e-or ["A", "B"]'    # Show parsed rule dicts
//! ```
//!
//! Exit codes: 0 on success, 1 on a generation or validation failure, 2 on a
//! usage error.

use clap::{Parser, Subcommand};
use qspec::logs::{self, LogLevel};
use qspec::validation::validate_file;
use qspec::{export_spec_to_json, generate_from_path, parse_visibility, GeneratorConfig};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qspec")]
#[command(about = "Generate interview spec JSON from machine-first tables", long_about = None)]
struct Cli {
    /// Minimum log level (debug, info, success, warning, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, validate and write a spec
    Generate {
        /// Directory of <SHEET>.csv files, or a JSON workbook
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long, required_unless_present = "validate_only")]
        out: Option<PathBuf>,

        /// Schema file replacing the embedded one
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Validate only, write nothing
        #[arg(long)]
        validate_only: bool,

        /// Spec name
        #[arg(long)]
        name: Option<String>,

        /// Spec version (MAJOR.MINOR.PATCH)
        #[arg(long)]
        spec_version: Option<String>,

        /// Note copied into the document (repeatable)
        #[arg(long = "note")]
        notes: Vec<String>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Parse a free-text visibility expression and print its rule dicts
    ParseVisibility {
        /// Expression, e.g. 'W-10 e-or ["A", "B"]'
        expression: String,
    },

    /// Validate an existing spec document
    Validate {
        /// Spec JSON file
        input: PathBuf,

        /// Schema file replacing the embedded one
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = GeneratorConfig::from_env();
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    logs::set_level(config.log_level);

    let result = match cli.command {
        Commands::Generate {
            input,
            out,
            schema,
            validate_only,
            name,
            spec_version,
            notes,
            compact,
        } => {
            if let Some(name) = name {
                config.name = name;
            }
            if let Some(version) = spec_version {
                config.version = version;
            }
            if schema.is_some() {
                config.schema_path = schema;
            }
            if !notes.is_empty() {
                config.notes = notes;
            }
            if compact {
                config.pretty = false;
            }
            cmd_generate(&input, out.as_deref(), validate_only, &config)
        }

        Commands::ParseVisibility { expression } => cmd_parse_visibility(&expression),

        Commands::Validate { input, schema } => {
            cmd_validate(&input, schema.as_deref().or(config.schema_path.as_deref()))
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_generate(
    input: &Path,
    out: Option<&Path>,
    validate_only: bool,
    config: &GeneratorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Generating from: {}", input.display());

    let generated = generate_from_path(input, config)?;
    let spec = &generated.spec;

    let question_count: usize = spec.sections().values().map(|s| s.questions().len()).sum();
    eprintln!("   Sections: {}", spec.sections().len());
    eprintln!("   Questions: {}", question_count);
    eprintln!("   Lists: {}", spec.lists().len());
    eprintln!("   Anomalies: {}", spec.anomalies().len());

    if !generated.warnings.is_empty() {
        eprintln!("\n⚠️  {} visibility warnings:", generated.warnings.len());
        for warning in &generated.warnings {
            eprintln!("   - {}", warning);
        }
    }

    if validate_only {
        eprintln!("\n✅ Spec '{}' v{} is valid", spec.name(), spec.version());
        return Ok(());
    }

    let out = out.ok_or("--out is required unless --validate-only is set")?;
    export_spec_to_json(spec, out, config.pretty)?;
    eprintln!("💾 Output written to: {}", out.display());
    Ok(())
}

fn cmd_parse_visibility(expression: &str) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = parse_visibility(expression);
    for warning in &outcome.warnings {
        eprintln!("⚠️  {}", warning);
    }
    let output = json!({ "rules": outcome.rules, "warnings": outcome.warnings });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_validate(
    input: &Path,
    schema_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());
    validate_file(input, schema_path)?;
    eprintln!("✅ Document is valid");
    Ok(())
}
