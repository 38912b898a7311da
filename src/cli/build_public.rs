//! Build-public command handler.

use std::path::Path;

use anyhow::Result;

use crate::io::{read_sbom, write_sbom};
use crate::publish::{build_public_bom, property_marker};

/// Run the build-public command. Components carrying a property named
/// `internal_property` are withheld from the output.
pub fn run_build_public(
    input: &Path,
    internal_property: &str,
    output: Option<&Path>,
) -> Result<i32> {
    let sbom = read_sbom(input)?;
    let mut public = build_public_bom(sbom, property_marker(internal_property.to_string()));
    write_sbom(&mut public, output, true)?;
    Ok(0)
}
