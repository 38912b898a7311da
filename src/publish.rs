//! Building a publishable document from an internal one.
//!
//! Two things distinguish an internal SBOM from its public counterpart:
//! components that must not be disclosed, and properties under the
//! `internal:` namespace of the CycloneDX property taxonomy. Marked
//! components are removed with their public children hoisted into their
//! place, and the dependency graph is spliced so that dependents of a
//! removed component inherit its dependencies.

use tracing::warn;

use crate::model::{Component, Dependency, Sbom};

/// Build the public variant of `sbom`. `is_internal` decides which
/// components are withheld.
///
/// The metadata component is never removed. When the marker applies to it
/// the document as a whole is probably not meant for publication, which is
/// worth a warning but not an error.
pub fn build_public_bom(mut sbom: Sbom, is_internal: impl Fn(&Component) -> bool) -> Sbom {
    let mut removed_refs: Vec<String> = Vec::new();

    let components = sbom.components.take().unwrap_or_default();
    let mut kept = filter_components(components, &is_internal, &mut removed_refs);
    for component in &mut kept {
        strip_internal_tree(component);
    }
    sbom.components = if kept.is_empty() { None } else { Some(kept) };

    if let Some(component) = sbom.metadata.as_mut().and_then(|m| m.component.as_mut()) {
        if is_internal(component) {
            warn!(
                "metadata.component was not removed even though it is marked internal; \
                 this document may not be intended for public use"
            );
        }
        strip_internal_properties(component);
    }

    let mut dependencies = sbom.dependencies.take().unwrap_or_default();
    for bom_ref in &removed_refs {
        dependencies = splice_dependencies(dependencies, bom_ref);
    }
    sbom.dependencies = if dependencies.is_empty() { None } else { Some(dependencies) };

    if let Some(compositions) = sbom.compositions.as_mut() {
        for composition in compositions {
            composition
                .assemblies
                .retain(|assembly| !removed_refs.contains(assembly));
        }
    }

    sbom
}

/// Marker predicate used by the command line: a component is internal when
/// it carries a property of the given name.
pub fn property_marker(property_name: String) -> impl Fn(&Component) -> bool {
    move |component| {
        component
            .properties
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|property| property.name == property_name)
    }
}

/// Drop every property under the `internal:` namespace. An emptied
/// properties list is removed entirely.
pub fn strip_internal_properties(component: &mut Component) {
    if let Some(mut properties) = component.properties.take() {
        properties.retain(|property| !property.name.to_lowercase().starts_with("internal:"));
        if !properties.is_empty() {
            component.properties = Some(properties);
        }
    }
}

fn strip_internal_tree(component: &mut Component) {
    strip_internal_properties(component);
    if let Some(children) = component.components.as_mut() {
        for child in children {
            strip_internal_tree(child);
        }
    }
}

/// Remove marked components depth-first. The public children of a removed
/// component take its place in the parent's list.
fn filter_components(
    components: Vec<Component>,
    is_internal: &impl Fn(&Component) -> bool,
    removed_refs: &mut Vec<String>,
) -> Vec<Component> {
    let mut kept = Vec::new();
    for mut component in components {
        let children = filter_components(
            component.components.take().unwrap_or_default(),
            is_internal,
            removed_refs,
        );
        if is_internal(&component) {
            if let Some(bom_ref) = component.bom_ref.take() {
                removed_refs.push(bom_ref);
            }
            kept.extend(children);
        } else {
            component.components = if children.is_empty() { None } else { Some(children) };
            kept.push(component);
        }
    }
    kept
}

/// Take one removed ref out of the dependency graph: its own entry is
/// dropped and every dependent inherits its `dependsOn` list.
fn splice_dependencies(dependencies: Vec<Dependency>, bom_ref: &str) -> Vec<Dependency> {
    let mut inherited: Vec<String> = Vec::new();
    let mut remaining: Vec<Dependency> = Vec::new();
    for dependency in dependencies {
        if dependency.dependency_ref == bom_ref {
            inherited = dependency.depends_on.unwrap_or_default();
        } else {
            remaining.push(dependency);
        }
    }

    for dependency in &mut remaining {
        let Some(depends_on) = dependency.depends_on.as_mut() else {
            continue;
        };
        if !depends_on.iter().any(|entry| entry == bom_ref) {
            continue;
        }
        depends_on.retain(|entry| entry != bom_ref);
        for entry in &inherited {
            if !depends_on.contains(entry) {
                depends_on.push(entry.clone());
            }
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sbom(value: serde_json::Value) -> Sbom {
        serde_json::from_value(value).unwrap()
    }

    fn marked_internal() -> impl Fn(&Component) -> bool {
        property_marker("internal:component".to_string())
    }

    #[test]
    fn test_internal_properties_are_stripped_everywhere() {
        let doc = sbom(json!({
            "metadata": {"component": {
                "bom-ref": "app", "name": "app",
                "properties": [
                    {"name": "internal:build-host", "value": "ci-3"},
                    {"name": "public", "value": "yes"}
                ]
            }},
            "components": [{
                "bom-ref": "a", "name": "a",
                "properties": [{"name": "Internal:secret", "value": "x"}],
                "components": [{
                    "bom-ref": "a1", "name": "a1",
                    "properties": [{"name": "internal:only", "value": "x"}]
                }]
            }]
        }));

        let public = build_public_bom(doc, |_| false);

        let meta = public.metadata.as_ref().unwrap().component.as_ref().unwrap();
        let names: Vec<&str> = meta
            .properties
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["public"]);

        let a = &public.components.as_ref().unwrap()[0];
        assert!(a.properties.is_none());
        assert!(a.components.as_ref().unwrap()[0].properties.is_none());
    }

    #[test]
    fn test_removed_component_children_are_hoisted() {
        let doc = sbom(json!({
            "components": [{
                "bom-ref": "secret", "name": "secret",
                "properties": [{"name": "internal:component"}],
                "components": [
                    {"bom-ref": "pub-child", "name": "pub-child"},
                    {"bom-ref": "secret-child", "name": "secret-child",
                     "properties": [{"name": "internal:component"}]}
                ]
            }]
        }));

        let public = build_public_bom(doc, marked_internal());

        let names: Vec<&str> = public
            .components
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["pub-child"]);
    }

    #[test]
    fn test_dependencies_spliced_through_removed_component() {
        let doc = sbom(json!({
            "components": [
                {"bom-ref": "app", "name": "app"},
                {"bom-ref": "secret", "name": "secret",
                 "properties": [{"name": "internal:component"}]},
                {"bom-ref": "lib", "name": "lib"}
            ],
            "dependencies": [
                {"ref": "app", "dependsOn": ["secret"]},
                {"ref": "secret", "dependsOn": ["lib"]},
                {"ref": "lib"}
            ]
        }));

        let public = build_public_bom(doc, marked_internal());

        let dependencies = public.dependencies.as_ref().unwrap();
        assert_eq!(dependencies.len(), 2);
        assert_eq!(dependencies[0].dependency_ref, "app");
        assert_eq!(dependencies[0].depends_on.as_ref().unwrap(), &["lib"]);
    }

    #[test]
    fn test_compositions_lose_removed_refs() {
        let doc = sbom(json!({
            "components": [
                {"bom-ref": "a", "name": "a"},
                {"bom-ref": "secret", "name": "secret",
                 "properties": [{"name": "internal:component"}]}
            ],
            "compositions": [{"aggregate": "incomplete", "assemblies": ["a", "secret"]}]
        }));

        let public = build_public_bom(doc, marked_internal());
        assert_eq!(public.compositions.as_ref().unwrap()[0].assemblies, vec!["a"]);
    }

    #[test]
    fn test_metadata_component_survives_marker() {
        let doc = sbom(json!({
            "metadata": {"component": {
                "bom-ref": "app", "name": "app",
                "properties": [{"name": "internal:component"}]
            }}
        }));

        let public = build_public_bom(doc, marked_internal());
        let meta = public.metadata.as_ref().unwrap().component.as_ref().unwrap();
        assert_eq!(meta.bom_ref.as_deref(), Some("app"));
        assert!(meta.properties.is_none());
    }

    #[test]
    fn test_emptied_sections_are_dropped() {
        let doc = sbom(json!({
            "components": [{"bom-ref": "secret", "name": "secret",
                            "properties": [{"name": "internal:component"}]}],
            "dependencies": [{"ref": "secret"}]
        }));

        let public = build_public_bom(doc, marked_internal());
        assert!(public.components.is_none());
        assert!(public.dependencies.is_none());
    }
}
