//! Component tree traversal and bom-ref rewriting.
//!
//! All operations that look at every component use the same traversal: the
//! metadata component first, then the `components` forest depth-first.

use std::collections::HashSet;

use crate::model::{Component, Sbom};

/// All components of the document in traversal order.
#[must_use]
pub fn walk_components(sbom: &Sbom) -> Vec<&Component> {
    let mut out = Vec::new();
    if let Some(component) = sbom.metadata.as_ref().and_then(|m| m.component.as_ref()) {
        collect(std::slice::from_ref(component), &mut out);
    }
    if let Some(components) = &sbom.components {
        collect(components, &mut out);
    }
    out
}

fn collect<'a>(components: &'a [Component], out: &mut Vec<&'a Component>) {
    for component in components {
        out.push(component);
        if let Some(children) = &component.components {
            collect(children, out);
        }
    }
}

/// Apply `f` to every component of the document, metadata component included.
pub fn for_each_component_mut(sbom: &mut Sbom, f: &mut impl FnMut(&mut Component)) {
    if let Some(component) = sbom.metadata.as_mut().and_then(|m| m.component.as_mut()) {
        apply(component, f);
    }
    if let Some(components) = sbom.components.as_mut() {
        for component in components {
            apply(component, f);
        }
    }
}

fn apply(component: &mut Component, f: &mut impl FnMut(&mut Component)) {
    f(component);
    if let Some(children) = component.components.as_mut() {
        for child in children {
            apply(child, f);
        }
    }
}

/// Every `bom-ref` defined by a component of the document.
#[must_use]
pub fn collect_bom_refs(sbom: &Sbom) -> Vec<String> {
    walk_components(sbom)
        .into_iter()
        .filter_map(|c| c.bom_ref.clone())
        .collect()
}

/// Whether any component of the document defines `bom_ref`.
#[must_use]
pub fn has_bom_ref(sbom: &Sbom, bom_ref: &str) -> bool {
    walk_components(sbom)
        .iter()
        .any(|c| c.bom_ref.as_deref() == Some(bom_ref))
}

/// Rename a bom-ref consistently across the whole document: the defining
/// component plus every dependency, composition assembly and vulnerability
/// affects entry that mentions it.
///
/// Returns `false` without touching the document when `new` already names a
/// component, so callers can retry with a different candidate. Renaming a
/// ref to itself is a successful no-op.
pub fn rename_bom_ref(sbom: &mut Sbom, old: &str, new: &str) -> bool {
    if old == new {
        return true;
    }
    if has_bom_ref(sbom, new) {
        return false;
    }

    for_each_component_mut(sbom, &mut |component| {
        if component.bom_ref.as_deref() == Some(old) {
            component.bom_ref = Some(new.to_string());
        }
    });

    if let Some(dependencies) = sbom.dependencies.as_mut() {
        for dependency in dependencies {
            if dependency.dependency_ref == old {
                dependency.dependency_ref = new.to_string();
            }
            if let Some(depends_on) = dependency.depends_on.as_mut() {
                for entry in depends_on {
                    if entry == old {
                        *entry = new.to_string();
                    }
                }
            }
        }
    }

    if let Some(compositions) = sbom.compositions.as_mut() {
        for composition in compositions {
            for assembly in &mut composition.assemblies {
                if assembly == old {
                    *assembly = new.to_string();
                }
            }
        }
    }

    if let Some(vulnerabilities) = sbom.vulnerabilities.as_mut() {
        for vulnerability in vulnerabilities {
            if let Some(affects) = vulnerability.affects.as_mut() {
                for affect in affects {
                    if affect.affect_ref == old {
                        affect.affect_ref = new.to_string();
                    }
                }
            }
        }
    }

    true
}

/// Rename `old` to `desired`, falling back to `desired_1`, `desired_2`, …
/// when the candidate collides with a ref in the document or in `reserved`.
/// Returns the name that was finally assigned.
pub fn rename_bom_ref_unique(
    sbom: &mut Sbom,
    old: &str,
    desired: &str,
    reserved: &HashSet<String>,
) -> String {
    let mut candidate = desired.to_string();
    let mut attempt = 0usize;
    loop {
        if !reserved.contains(&candidate) && rename_bom_ref(sbom, old, &candidate) {
            return candidate;
        }
        attempt += 1;
        candidate = format!("{desired}_{attempt}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Sbom {
        serde_json::from_value(json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.4",
            "metadata": {"component": {"bom-ref": "app", "name": "app"}},
            "components": [
                {"bom-ref": "lib-a", "name": "lib-a", "components": [
                    {"bom-ref": "lib-a-child", "name": "child"}
                ]},
                {"bom-ref": "lib-b", "name": "lib-b"}
            ],
            "dependencies": [
                {"ref": "app", "dependsOn": ["lib-a", "lib-b"]},
                {"ref": "lib-a", "dependsOn": ["lib-b"]}
            ],
            "compositions": [
                {"aggregate": "complete", "assemblies": ["lib-a", "lib-b"]}
            ],
            "vulnerabilities": [
                {"id": "CVE-2024-0001", "affects": [{"ref": "lib-a"}]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_walk_order_metadata_first_then_depth_first() {
        let sbom = sample();
        let names: Vec<&str> = walk_components(&sbom)
            .iter()
            .map(|c| c.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["app", "lib-a", "child", "lib-b"]);
    }

    #[test]
    fn test_rename_rewrites_all_sections() {
        let mut sbom = sample();
        assert!(rename_bom_ref(&mut sbom, "lib-a", "lib-a-renamed"));

        assert!(has_bom_ref(&sbom, "lib-a-renamed"));
        assert!(!has_bom_ref(&sbom, "lib-a"));

        let deps = sbom.dependencies.as_ref().unwrap();
        assert_eq!(deps[0].depends_on.as_ref().unwrap()[0], "lib-a-renamed");
        assert_eq!(deps[1].dependency_ref, "lib-a-renamed");

        let compositions = sbom.compositions.as_ref().unwrap();
        assert_eq!(compositions[0].assemblies[0], "lib-a-renamed");

        let affects = sbom.vulnerabilities.as_ref().unwrap()[0]
            .affects
            .as_ref()
            .unwrap();
        assert_eq!(affects[0].affect_ref, "lib-a-renamed");
    }

    #[test]
    fn test_rename_refuses_collisions() {
        let mut sbom = sample();
        let before = sbom.clone();
        assert!(!rename_bom_ref(&mut sbom, "lib-a", "lib-b"));
        assert_eq!(sbom, before, "failed rename must not mutate the document");
    }

    #[test]
    fn test_rename_to_self_is_noop_success() {
        let mut sbom = sample();
        assert!(rename_bom_ref(&mut sbom, "lib-a", "lib-a"));
        assert!(has_bom_ref(&sbom, "lib-a"));
    }

    #[test]
    fn test_unique_rename_appends_suffix() {
        let mut sbom = sample();
        let mut reserved = HashSet::new();
        reserved.insert("lib-b_1".to_string());

        let assigned = rename_bom_ref_unique(&mut sbom, "lib-a", "lib-b", &reserved);
        assert_eq!(assigned, "lib-b_2");
        assert!(has_bom_ref(&sbom, "lib-b_2"));
    }
}
