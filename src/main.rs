//! cdx-edit: CycloneDX SBOM editing tool
//!
//! Merges, amends, patches and publishes CycloneDX JSON documents.

#![allow(clippy::too_many_lines, clippy::struct_excessive_bools)]

use std::path::PathBuf;

use anyhow::Result;
use cdx_edit::{cli, set::TargetDescriptor};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cdx-edit")]
#[command(version)]
#[command(about = "CycloneDX SBOM editing tool", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success
    1  Validation findings / application error

EXAMPLES:
    # Merge a product SBOM with a firmware SBOM
    cdx-edit merge product.cdx.json firmware.cdx.json -o merged.cdx.json

    # Apply a VEX document
    cdx-edit merge-vex product.cdx.json product.vex.json -o out/

    # Patch a component field
    cdx-edit set bom.json --purl pkg:npm/lib@1.0.0 --key copyright --value '\"(c) Acme\"'

    # Fill in missing metadata and check plausibility
    cdx-edit amend bom.json -o amended.cdx.json
    cdx-edit validate amended.cdx.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `merge` subcommand
#[derive(Parser)]
struct MergeArgs {
    /// Input SBOM files, governing document first
    #[arg(num_args = 2.., required = true)]
    inputs: Vec<PathBuf>,

    /// Nest new sub-components under their surviving parent
    #[arg(long)]
    hierarchical: bool,

    /// Output file or directory (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the `merge-vex` subcommand
#[derive(Parser)]
struct MergeVexArgs {
    /// The SBOM file
    sbom: PathBuf,

    /// The VEX file
    vex: PathBuf,

    /// Output file or directory (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the `set` subcommand
#[derive(Parser)]
struct SetArgs {
    /// The SBOM file to update
    input: PathBuf,

    /// Output file or directory (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with a list of updates
    #[arg(long, conflicts_with_all = ["cpe", "purl", "swid", "name", "key", "value"])]
    from_file: Option<PathBuf>,

    /// Target component by CPE
    #[arg(long, group = "target")]
    cpe: Option<String>,

    /// Target component by PURL
    #[arg(long, group = "target")]
    purl: Option<String>,

    /// Target component by SWID tag id
    #[arg(long, group = "target")]
    swid: Option<String>,

    /// Target component by name
    #[arg(long, group = "target")]
    name: Option<String>,

    /// Component group, together with --name
    #[arg(long, requires = "name")]
    group: Option<String>,

    /// Component version, together with --name
    #[arg(long, requires = "name")]
    version: Option<String>,

    /// Version range like `semver/>=1.0.0|<2.0.0`, together with --name
    #[arg(long, requires = "name", conflicts_with = "version")]
    version_range: Option<String>,

    /// Field to set
    #[arg(long)]
    key: Option<String>,

    /// New value as JSON; bare words are taken as strings, `null` deletes
    #[arg(long)]
    value: Option<String>,

    /// Overwrite existing values without asking
    #[arg(short, long)]
    force: bool,

    /// Permit updates of identity-relevant fields
    #[arg(long)]
    allow_protected: bool,

    /// Skip updates whose target matches nothing
    #[arg(long)]
    ignore_missing: bool,

    /// JSON file declaring custom version schemes
    #[arg(long, env = "CDX_EDIT_VERSION_SCHEMES")]
    version_schemes: Option<PathBuf>,
}

/// Arguments for the `amend` subcommand
#[derive(Parser)]
struct AmendArgs {
    /// The SBOM file to amend
    input: PathBuf,

    /// Output file or directory (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Operations to run instead of the default set. Can be specified
    /// multiple times.
    #[arg(long = "operation", value_name = "NAME")]
    operations: Vec<String>,
}

/// Arguments for the `validate` subcommand
#[derive(Parser)]
struct ValidateArgs {
    /// The SBOM file to check
    input: PathBuf,
}

/// Arguments for the `build-public` subcommand
#[derive(Parser)]
struct BuildPublicArgs {
    /// The internal SBOM file
    input: PathBuf,

    /// Property name marking internal components
    #[arg(long, default_value = "internal:component")]
    internal_property: String,

    /// Output file or directory (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two or more SBOMs into one
    Merge(MergeArgs),
    /// Merge a VEX document into an SBOM
    MergeVex(MergeVexArgs),
    /// Update component fields from the command line or an update file
    Set(SetArgs),
    /// Fill in commonly missing metadata
    Amend(AmendArgs),
    /// Check the document's cross-references for plausibility
    Validate(ValidateArgs),
    /// Build the publishable variant of an internal SBOM
    BuildPublic(BuildPublicArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let exit_code = match cli.command {
        Commands::Merge(args) => {
            cli::run_merge(&args.inputs, args.hierarchical, args.output.as_deref())?
        }
        Commands::MergeVex(args) => {
            cli::run_merge_vex(&args.sbom, &args.vex, args.output.as_deref())?
        }
        Commands::Set(args) => cli::run_set(cli::SetOptions {
            input: args.input,
            output: args.output,
            from_file: args.from_file,
            target: TargetDescriptor {
                cpe: args.cpe,
                purl: args.purl,
                swid: args.swid.map(|tag_id| cdx_edit::model::Swid {
                    tag_id,
                    extra: serde_json::Map::new(),
                }),
                name: args.name,
                group: args.group,
                version: args.version,
                version_range: args.version_range,
            },
            key: args.key,
            value: args.value,
            force: args.force,
            allow_protected: args.allow_protected,
            ignore_missing: args.ignore_missing,
            schemes_file: args.version_schemes,
        })?,
        Commands::Amend(args) => {
            cli::run_amend(&args.input, args.output.as_deref(), &args.operations)?
        }
        Commands::Validate(args) => cli::run_validate(&args.input)?,
        Commands::BuildPublic(args) => cli::run_build_public(
            &args.input,
            &args.internal_property,
            args.output.as_deref(),
        )?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
