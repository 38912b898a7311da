//! Merge command handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::io::{read_sbom, write_sbom};
use crate::merge;

/// Run the merge command.
pub fn run_merge(inputs: &[PathBuf], hierarchical: bool, output: Option<&Path>) -> Result<i32> {
    if inputs.len() < 2 {
        bail!("merge requires at least two input documents");
    }

    let mut sboms = Vec::with_capacity(inputs.len());
    for path in inputs {
        sboms.push(read_sbom(path)?);
    }

    let mut merged = merge::merge(sboms, hierarchical)?;
    write_sbom(&mut merged, output, true)?;
    Ok(0)
}

/// Run the merge-vex command.
pub fn run_merge_vex(sbom_path: &Path, vex_path: &Path, output: Option<&Path>) -> Result<i32> {
    let sbom = read_sbom(sbom_path)?;
    let vex = read_sbom(vex_path)?;

    let mut merged = merge::merge_vex(sbom, vex)?;
    write_sbom(&mut merged, output, true)?;
    Ok(0)
}
