//! Set command handler.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use crate::io::{read_sbom, write_sbom};
use crate::set::{self, SetConfig, TargetDescriptor, UpdateRequest};
use crate::versions::SchemeRegistry;

/// Everything the set command needs, gathered from the command line.
pub struct SetOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// JSON file with a list of updates. Mutually exclusive with
    /// `key`/`value`.
    pub from_file: Option<PathBuf>,
    /// Target for a single command-line update.
    pub target: TargetDescriptor,
    pub key: Option<String>,
    pub value: Option<String>,
    pub force: bool,
    pub allow_protected: bool,
    pub ignore_missing: bool,
    /// JSON file declaring custom version schemes.
    pub schemes_file: Option<PathBuf>,
}

/// Run the set command.
pub fn run_set(options: SetOptions) -> Result<i32> {
    let registry = match &options.schemes_file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read scheme file {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw)
                .with_context(|| format!("scheme file {} is not valid JSON", path.display()))?;
            SchemeRegistry::from_json(&value)?
        }
        None => SchemeRegistry::new(),
    };

    let updates = match &options.from_file {
        Some(path) => {
            if options.key.is_some() || options.value.is_some() {
                bail!("--from-file cannot be combined with --key/--value");
            }
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read update file {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw)
                .with_context(|| format!("update file {} is not valid JSON", path.display()))?;
            set::parse_updates(value)?
        }
        None => {
            let (Some(key), Some(value)) = (&options.key, &options.value) else {
                bail!("either --from-file or both --key and --value are required");
            };
            // values that are not valid JSON are taken as plain strings
            let value: Value = serde_json::from_str(value)
                .unwrap_or_else(|_| Value::String(value.clone()));
            let mut update_set = Map::new();
            update_set.insert(key.clone(), value);
            vec![UpdateRequest {
                id: options.target.clone(),
                set: Some(update_set),
            }]
        }
    };

    let cfg = SetConfig {
        force: options.force,
        allow_protected: options.allow_protected,
        ignore_missing: options.ignore_missing,
    };

    let mut sbom = read_sbom(&options.input)?;
    set::run(&mut sbom, &updates, &cfg, &registry)?;
    write_sbom(&mut sbom, options.output.as_deref(), true)?;
    Ok(0)
}
