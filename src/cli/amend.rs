//! Amend command handler.

use std::path::Path;

use anyhow::{bail, Result};

use crate::amend::{
    self, AddBomRef, Compositions, DefaultAuthor, InferCopyright, InferSupplier, Operation,
};
use crate::io::{read_sbom, write_sbom};

const OPERATION_NAMES: [&str; 5] = [
    "add-bom-ref",
    "compositions",
    "default-author",
    "infer-supplier",
    "infer-copyright",
];

/// Run the amend command. An empty operation list selects the defaults.
pub fn run_amend(input: &Path, output: Option<&Path>, operations: &[String]) -> Result<i32> {
    let mut selected: Vec<Box<dyn Operation>> = if operations.is_empty() {
        amend::default_operations()
    } else {
        operations
            .iter()
            .map(|name| operation_by_name(name))
            .collect::<Result<_>>()?
    };

    let mut sbom = read_sbom(input)?;
    amend::run(&mut sbom, &mut selected);
    write_sbom(&mut sbom, output, true)?;
    Ok(0)
}

fn operation_by_name(name: &str) -> Result<Box<dyn Operation>> {
    Ok(match name {
        "add-bom-ref" => Box::new(AddBomRef),
        "compositions" => Box::new(Compositions::default()),
        "default-author" => Box::new(DefaultAuthor),
        "infer-supplier" => Box::new(InferSupplier),
        "infer-copyright" => Box::new(InferCopyright),
        _ => bail!(
            "unknown amend operation '{name}'; available operations: {}",
            OPERATION_NAMES.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_operation_resolves() {
        for name in OPERATION_NAMES {
            assert!(operation_by_name(name).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let Err(err) = operation_by_name("delete-everything") else {
            panic!("unknown operation must be rejected");
        };
        assert!(err.to_string().contains("available operations"));
    }
}
