//! SBOM merging.
//!
//! Merging is a left fold: the first document governs, every further
//! document is merged into the accumulated result one at a time. Absent
//! optional sections behave like empty ones throughout.

mod components;
mod vulnerabilities;

use std::collections::HashSet;

use crate::error::{EditorError, Result};
use crate::model::{Composition, Dependency, Sbom};
use crate::refs::collect_bom_refs;

use components::merge_components;
use vulnerabilities::merge_vulnerabilities;
pub use vulnerabilities::vulnerabilities_match;

/// Merge documents in input order. With `hierarchical`, new sub-components
/// discovered below a dropped duplicate are nested under the surviving
/// component instead of being appended at the top level.
pub fn merge(sboms: Vec<Sbom>, hierarchical: bool) -> Result<Sbom> {
    let mut inputs = sboms.into_iter();
    let Some(mut governing) = inputs.next() else {
        return Err(EditorError::configuration(
            "nothing to merge",
            "At least one input document is required.",
        ));
    };
    for incoming in inputs {
        governing = merge_two(governing, incoming, hierarchical);
    }
    Ok(governing)
}

/// Merge one incoming document into the governing one. The governing
/// document is taken by value and returned; its metadata stays authoritative.
#[must_use]
pub fn merge_two(mut governing: Sbom, mut incoming: Sbom, hierarchical: bool) -> Sbom {
    merge_components(&mut governing, &mut incoming, hierarchical);
    merge_dependencies(&mut governing, incoming.dependencies.take());
    merge_compositions(&mut governing, incoming.compositions.take());
    merge_vulnerabilities(&mut governing, incoming.vulnerabilities.take().unwrap_or_default());
    governing
}

/// Merge a VEX document's vulnerabilities into an SBOM.
///
/// Every component the VEX claims to affect must exist in the SBOM;
/// otherwise the two documents do not belong together and the merge is
/// rejected.
pub fn merge_vex(mut sbom: Sbom, vex: Sbom) -> Result<Sbom> {
    let known: HashSet<String> = collect_bom_refs(&sbom).into_iter().collect();
    let mut unknown: Vec<&str> = vex
        .vulnerabilities
        .as_deref()
        .unwrap_or_default()
        .iter()
        .flat_map(|v| v.affects.as_deref().unwrap_or_default())
        .map(|affect| affect.affect_ref.as_str())
        .filter(|bom_ref| !known.contains(*bom_ref))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();

    if !unknown.is_empty() {
        return Err(EditorError::validation(
            "VEX affects components missing from the SBOM",
            format!(
                "The following refs are not defined by any component: {}",
                unknown.join(", ")
            ),
        ));
    }

    merge_vulnerabilities(&mut sbom, vex.vulnerabilities.unwrap_or_default());
    Ok(sbom)
}

/// Union the dependency graphs. Governing entries keep their position and
/// their `dependsOn` lists are extended with unseen refs; entries only the
/// incoming side knows are appended.
fn merge_dependencies(governing: &mut Sbom, incoming: Option<Vec<Dependency>>) {
    let mut merged = governing.dependencies.take().unwrap_or_default();
    for dependency in incoming.unwrap_or_default() {
        match merged
            .iter_mut()
            .find(|existing| existing.dependency_ref == dependency.dependency_ref)
        {
            Some(existing) => {
                let incoming = dependency.depends_on.unwrap_or_default();
                if !incoming.is_empty() {
                    let depends_on = existing.depends_on.get_or_insert_with(Vec::new);
                    for entry in incoming {
                        if !depends_on.contains(&entry) {
                            depends_on.push(entry);
                        }
                    }
                }
            }
            None => merged.push(dependency),
        }
    }
    governing.dependencies = if merged.is_empty() { None } else { Some(merged) };
}

/// Union compositions grouped by aggregate, deduplicating assemblies.
fn merge_compositions(governing: &mut Sbom, incoming: Option<Vec<Composition>>) {
    let mut merged = governing.compositions.take().unwrap_or_default();
    for composition in incoming.unwrap_or_default() {
        match merged
            .iter_mut()
            .find(|existing| existing.aggregate == composition.aggregate)
        {
            Some(existing) => {
                for assembly in composition.assemblies {
                    if !existing.assemblies.contains(&assembly) {
                        existing.assemblies.push(assembly);
                    }
                }
            }
            None => merged.push(composition),
        }
    }
    governing.compositions = if merged.is_empty() { None } else { Some(merged) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sbom(value: serde_json::Value) -> Sbom {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_requires_input() {
        assert!(matches!(
            merge(Vec::new(), false),
            Err(EditorError::Configuration { .. })
        ));
    }

    #[test]
    fn test_single_input_passes_through() {
        let doc = sbom(json!({"components": [{"bom-ref": "a", "name": "a"}]}));
        let merged = merge(vec![doc.clone()], false).unwrap();
        assert_eq!(merged, doc);
    }

    #[test]
    fn test_dependency_union_deduplicates() {
        let governing = sbom(json!({
            "dependencies": [{"ref": "app", "dependsOn": ["a", "b"]}]
        }));
        let incoming = sbom(json!({
            "dependencies": [
                {"ref": "app", "dependsOn": ["b", "c"]},
                {"ref": "c"}
            ]
        }));

        let merged = merge_two(governing, incoming, false);
        let deps = merged.dependencies.as_ref().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].depends_on.as_ref().unwrap(), &["a", "b", "c"]);
        assert_eq!(deps[1].dependency_ref, "c");
    }

    #[test]
    fn test_compositions_grouped_by_aggregate() {
        let governing = sbom(json!({
            "compositions": [{"aggregate": "complete", "assemblies": ["a"]}]
        }));
        let incoming = sbom(json!({
            "compositions": [
                {"aggregate": "complete", "assemblies": ["a", "b"]},
                {"aggregate": "incomplete", "assemblies": ["c"]}
            ]
        }));

        let merged = merge_two(governing, incoming, false);
        let compositions = merged.compositions.as_ref().unwrap();
        assert_eq!(compositions.len(), 2);
        assert_eq!(compositions[0].assemblies, vec!["a", "b"]);
        assert_eq!(compositions[1].assemblies, vec!["c"]);
    }

    #[test]
    fn test_absent_sections_are_no_error() {
        let merged = merge_two(sbom(json!({})), sbom(json!({})), false);
        assert!(merged.components.is_none());
        assert!(merged.dependencies.is_none());
        assert!(merged.compositions.is_none());
        assert!(merged.vulnerabilities.is_none());
    }

    #[test]
    fn test_governing_metadata_stays_authoritative() {
        let governing = sbom(json!({
            "metadata": {"component": {"bom-ref": "gov-app", "name": "gov-app"}}
        }));
        let incoming = sbom(json!({
            "metadata": {"component": {"bom-ref": "inc-app", "name": "inc-app",
                          "purl": "pkg:npm/inc-app@1.0.0"}}
        }));

        let merged = merge_two(governing, incoming, false);
        assert_eq!(merged.metadata_component_ref(), Some("gov-app"));
        // the incoming metadata component became an ordinary component
        let names: Vec<&str> = merged
            .components
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["inc-app"]);
    }

    #[test]
    fn test_merge_vex_rejects_unknown_refs() {
        let sbom_doc = sbom(json!({"components": [{"bom-ref": "a", "name": "a"}]}));
        let vex = sbom(json!({
            "vulnerabilities": [{"id": "CVE-1", "affects": [{"ref": "ghost"}]}]
        }));
        let err = merge_vex(sbom_doc, vex).unwrap_err();
        match err {
            EditorError::Validation { description, .. } => {
                assert!(description.contains("ghost"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_vex_appends_vulnerabilities() {
        let sbom_doc = sbom(json!({"components": [{"bom-ref": "a", "name": "a"}]}));
        let vex = sbom(json!({
            "vulnerabilities": [{"id": "CVE-1", "affects": [{"ref": "a"}]}]
        }));
        let merged = merge_vex(sbom_doc, vex).unwrap();
        assert_eq!(merged.vulnerabilities.as_ref().unwrap().len(), 1);
    }
}
