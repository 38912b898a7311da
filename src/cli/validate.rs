//! Validate command handler.

use std::path::Path;

use anyhow::Result;
use tracing::error;

use crate::io::read_sbom;
use crate::validate::plausibility_check;

/// Run the validate command. Exit code 1 when the document is implausible.
pub fn run_validate(input: &Path) -> Result<i32> {
    let sbom = read_sbom(input)?;
    let findings = plausibility_check(&sbom);
    for finding in &findings {
        error!("{finding}");
    }
    Ok(i32::from(!findings.is_empty()))
}
