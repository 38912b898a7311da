//! Plausibility checks beyond schema validation.
//!
//! A schema cannot tell whether the cross-references of a document make
//! sense as a whole. These checks can: every ref must resolve to a
//! component, refs must be unique, no component may depend on itself
//! through any chain, and the dependency tree should connect the product
//! to every component.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::identity::ComponentIdentity;
use crate::model::Sbom;
use crate::refs::walk_components;

/// One violation, in the message plus description shape used by errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub message: String,
    pub description: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.description)
    }
}

/// Run all checks. An empty result means the document is plausible.
#[must_use]
pub fn plausibility_check(sbom: &Sbom) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_duplicate_refs(sbom, &mut findings);
    check_orphaned_refs(sbom, &mut findings);
    check_dependency_logic(sbom, &mut findings);
    findings
}

/// Identity of the component defining `bom_ref`, for messages. Falls back
/// to the ref itself when it defines nothing.
fn describe(sbom: &Sbom, bom_ref: &str) -> String {
    walk_components(sbom)
        .into_iter()
        .find(|c| c.bom_ref.as_deref() == Some(bom_ref))
        .map(|c| ComponentIdentity::create(c, true).to_string())
        .unwrap_or_else(|| bom_ref.to_string())
}

fn known_refs(sbom: &Sbom) -> Vec<&str> {
    walk_components(sbom)
        .into_iter()
        .filter_map(|c| c.bom_ref.as_deref())
        .collect()
}

fn check_duplicate_refs(sbom: &Sbom, findings: &mut Vec<Finding>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for bom_ref in known_refs(sbom) {
        *seen.entry(bom_ref).or_default() += 1;
    }
    let mut reported: HashSet<&str> = HashSet::new();
    for bom_ref in known_refs(sbom) {
        if seen[bom_ref] > 1 && reported.insert(bom_ref) {
            findings.push(Finding {
                message: "found duplicate bom-ref".to_string(),
                description: format!(
                    "The reference ({bom_ref}) is defined by {} components; \
                     references into the document are ambiguous.",
                    seen[bom_ref]
                ),
            });
        }
    }
}

fn orphaned(reference: &str, found_in: &str) -> Finding {
    Finding {
        message: "found orphaned bom-ref".to_string(),
        description: format!(
            "The reference ({reference}) in ({found_in}) does not \
             correspond to any component in the document."
        ),
    }
}

fn check_orphaned_refs(sbom: &Sbom, findings: &mut Vec<Finding>) {
    let known: HashSet<&str> = known_refs(sbom).into_iter().collect();

    for dependency in sbom.dependencies.as_deref().unwrap_or_default() {
        if known.contains(dependency.dependency_ref.as_str()) {
            for bom_ref in dependency.depends_on.as_deref().unwrap_or_default() {
                if !known.contains(bom_ref.as_str()) {
                    let dependent = describe(sbom, &dependency.dependency_ref);
                    findings.push(orphaned(
                        bom_ref,
                        &format!("dependsOn of ({dependent})"),
                    ));
                }
            }
        } else {
            findings.push(orphaned(&dependency.dependency_ref, "dependencies"));
        }
    }

    for composition in sbom.compositions.as_deref().unwrap_or_default() {
        for assembly in &composition.assemblies {
            if !known.contains(assembly.as_str()) {
                findings.push(orphaned(assembly, "compositions"));
            }
        }
    }

    for vulnerability in sbom.vulnerabilities.as_deref().unwrap_or_default() {
        for affect in vulnerability.affects.as_deref().unwrap_or_default() {
            if !known.contains(affect.affect_ref.as_str()) {
                let id = vulnerability.id.as_deref().unwrap_or("<no id>");
                findings.push(orphaned(
                    &affect.affect_ref,
                    &format!("vulnerability {id}"),
                ));
            }
        }
    }
}

/// Refs transitively reachable from `start` over the dependency graph,
/// `start` itself excluded unless it lies on a cycle.
fn reachable<'a>(start: &str, sbom: &'a Sbom) -> HashSet<&'a str> {
    let graph: HashMap<&str, &[String]> = sbom
        .dependencies
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|d| {
            (
                d.dependency_ref.as_str(),
                d.depends_on.as_deref().unwrap_or_default(),
            )
        })
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: Vec<&str> = graph.get(start).copied().unwrap_or_default().iter().map(String::as_str).collect();
    while let Some(current) = queue.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = graph.get(current) {
            queue.extend(next.iter().map(String::as_str));
        }
    }
    visited
}

fn check_dependency_logic(sbom: &Sbom, findings: &mut Vec<Finding>) {
    let known = known_refs(sbom);

    for bom_ref in &known {
        if reachable(bom_ref, sbom).contains(bom_ref) {
            findings.push(Finding {
                message: "found circular reference".to_string(),
                description: format!(
                    "The component ({}) depends on itself.",
                    describe(sbom, bom_ref)
                ),
            });
        }
    }

    // connectivity is judged from the product the document describes
    let Some(root) = sbom.metadata_component_ref() else {
        return;
    };
    let mut connected = reachable(root, sbom);
    connected.insert(root);
    for bom_ref in &known {
        if !connected.contains(bom_ref) {
            findings.push(Finding {
                message: "dependency tree is not connected".to_string(),
                description: format!(
                    "The product does not depend on component ({}), \
                     bom-ref ({bom_ref}).",
                    describe(sbom, bom_ref)
                ),
            });
        }
    }
}
