//! End-to-end merge behavior across whole documents.

use cdx_edit::merge::{merge, merge_two, merge_vex};
use cdx_edit::model::Sbom;
use serde_json::json;

fn sbom(value: serde_json::Value) -> Sbom {
    serde_json::from_value(value).unwrap()
}

fn component_names(sbom: &Sbom) -> Vec<&str> {
    sbom.components
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|c| c.name.as_deref().unwrap_or_default())
        .collect()
}

#[test]
fn merge_keeps_document_consistent_across_sections() {
    let governing = sbom(json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.4",
        "metadata": {"component": {"bom-ref": "product", "name": "product",
                     "purl": "pkg:generic/product@1.0.0"}},
        "components": [
            {"bom-ref": "shared-gov", "name": "shared", "purl": "pkg:npm/shared@1.0.0"}
        ],
        "dependencies": [
            {"ref": "product", "dependsOn": ["shared-gov"]},
            {"ref": "shared-gov"}
        ]
    }));
    let incoming = sbom(json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.4",
        "metadata": {"component": {"bom-ref": "firmware", "name": "firmware",
                     "purl": "pkg:generic/firmware@2.0.0"}},
        "components": [
            {"bom-ref": "shared-inc", "name": "shared", "purl": "pkg:npm/shared@1.0.0"},
            {"bom-ref": "extra", "name": "extra", "purl": "pkg:npm/extra@0.1.0"}
        ],
        "dependencies": [
            {"ref": "firmware", "dependsOn": ["shared-inc", "extra"]},
            {"ref": "shared-inc"},
            {"ref": "extra"}
        ],
        "vulnerabilities": [
            {"id": "CVE-2024-1234", "affects": [{"ref": "shared-inc"}]}
        ]
    }));

    let merged = merge_two(governing, incoming, false);

    // the duplicate shared component is gone, the rest survived
    assert_eq!(component_names(&merged), vec!["shared", "extra", "firmware"]);

    // incoming references were rewritten to the surviving bom-ref
    let dependencies = merged.dependencies.as_ref().unwrap();
    let firmware_deps = dependencies
        .iter()
        .find(|d| d.dependency_ref == "firmware")
        .unwrap();
    assert_eq!(
        firmware_deps.depends_on.as_ref().unwrap(),
        &["shared-gov", "extra"]
    );

    let affects = merged.vulnerabilities.as_ref().unwrap()[0]
        .affects
        .as_ref()
        .unwrap();
    assert_eq!(affects[0].affect_ref, "shared-gov");
}

#[test]
fn merge_is_a_left_fold_over_many_documents() {
    let first = sbom(json!({
        "components": [{"bom-ref": "a", "name": "a", "purl": "pkg:npm/a@1.0.0"}]
    }));
    let second = sbom(json!({
        "components": [{"bom-ref": "b", "name": "b", "purl": "pkg:npm/b@1.0.0"}]
    }));
    let third = sbom(json!({
        "components": [
            {"bom-ref": "a2", "name": "a", "purl": "pkg:npm/a@1.0.0"},
            {"bom-ref": "c", "name": "c", "purl": "pkg:npm/c@1.0.0"}
        ]
    }));

    let merged = merge(vec![first, second, third], false).unwrap();
    assert_eq!(component_names(&merged), vec!["a", "b", "c"]);
}

#[test]
fn merging_a_document_with_itself_changes_nothing() {
    let doc = sbom(json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.4",
        "metadata": {"component": {"bom-ref": "app", "name": "app",
                     "purl": "pkg:generic/app@1.0.0"}},
        "components": [{"bom-ref": "x", "name": "x", "purl": "pkg:npm/x@1.0.0"}],
        "dependencies": [
            {"ref": "app", "dependsOn": ["x"]},
            {"ref": "x"}
        ]
    }));

    let merged = merge_two(doc.clone(), doc.clone(), false);

    // in particular the leaf entry must not gain an empty dependsOn list
    assert_eq!(merged, doc);
}

#[test]
fn merge_folding_order_does_not_change_the_content() {
    let a = sbom(json!({"components": [
        {"bom-ref": "a1", "name": "a1", "purl": "pkg:npm/a1@1.0.0"},
        {"bom-ref": "shared", "name": "shared", "purl": "pkg:npm/shared@1.0.0"}
    ]}));
    let b = sbom(json!({"components": [
        {"bom-ref": "shared", "name": "shared", "purl": "pkg:npm/shared@1.0.0"},
        {"bom-ref": "b1", "name": "b1", "purl": "pkg:npm/b1@1.0.0"}
    ]}));
    let c = sbom(json!({"components": [
        {"bom-ref": "b1", "name": "b1", "purl": "pkg:npm/b1@1.0.0"},
        {"bom-ref": "c1", "name": "c1", "purl": "pkg:npm/c1@1.0.0"}
    ]}));

    let folded = merge(vec![a.clone(), b.clone(), c.clone()], false).unwrap();
    let pair = merge(vec![a, b], false).unwrap();
    let regrouped = merge(vec![pair, c], false).unwrap();

    assert_eq!(component_names(&folded), component_names(&regrouped));
    assert_eq!(folded.components, regrouped.components);
}

#[test]
fn colliding_refs_of_distinct_components_get_suffixes() {
    let governing = sbom(json!({
        "components": [{"bom-ref": "lib", "name": "a", "purl": "pkg:npm/a@1.0.0"}]
    }));
    let incoming = sbom(json!({
        "components": [{"bom-ref": "lib", "name": "b", "purl": "pkg:npm/b@1.0.0"}],
        "dependencies": [{"ref": "lib"}]
    }));

    let merged = merge_two(governing, incoming, false);

    let refs: Vec<&str> = merged
        .components
        .as_deref()
        .unwrap()
        .iter()
        .filter_map(|c| c.bom_ref.as_deref())
        .collect();
    assert_eq!(refs, vec!["lib", "lib_1"]);

    // the renamed component's dependency entry followed the rename
    let dependencies = merged.dependencies.as_ref().unwrap();
    assert!(dependencies.iter().any(|d| d.dependency_ref == "lib_1"));
}

#[test]
fn hierarchical_merge_places_new_children_under_parent() {
    let governing = sbom(json!({
        "metadata": {"component": {"bom-ref": "product", "name": "product",
                     "purl": "pkg:generic/product@1.0.0"}},
        "components": [
            {"bom-ref": "parent", "name": "parent", "purl": "pkg:npm/parent@1.0.0"}
        ]
    }));
    let incoming = sbom(json!({
        "components": [{
            "bom-ref": "parent-2", "name": "parent", "purl": "pkg:npm/parent@1.0.0",
            "components": [
                {"bom-ref": "child", "name": "child", "purl": "pkg:npm/child@1.0.0"}
            ]
        }]
    }));

    let merged = merge_two(governing, incoming, true);

    let components = merged.components.as_deref().unwrap();
    assert_eq!(components.len(), 1);
    let children = components[0].components.as_deref().unwrap();
    assert_eq!(children[0].name.as_deref(), Some("child"));
}

#[test]
fn merge_vex_attaches_vulnerabilities_to_known_components() {
    let sbom_doc = sbom(json!({
        "components": [{"bom-ref": "json-lib", "name": "json-lib"}]
    }));
    let vex = sbom(json!({
        "vulnerabilities": [
            {"id": "CVE-2024-11111", "affects": [{"ref": "json-lib"}]}
        ]
    }));

    let merged = merge_vex(sbom_doc, vex).unwrap();
    assert_eq!(merged.vulnerabilities.as_ref().unwrap().len(), 1);
}

#[test]
fn merge_vex_refuses_foreign_documents() {
    let sbom_doc = sbom(json!({
        "components": [{"bom-ref": "json-lib", "name": "json-lib"}]
    }));
    let vex = sbom(json!({
        "vulnerabilities": [
            {"id": "CVE-2024-11111", "affects": [{"ref": "other-product-lib"}]}
        ]
    }));

    assert!(merge_vex(sbom_doc, vex).is_err());
}

#[test]
fn repeated_vulnerability_entries_are_reconciled() {
    let governing = sbom(json!({
        "vulnerabilities": [{
            "id": "CVE-2024-1",
            "updated": "2024-01-01T00:00:00Z",
            "ratings": [{"method": "CVSSv31", "score": 9.1}],
            "affects": [{"ref": "a"}]
        }]
    }));
    let incoming = sbom(json!({
        "vulnerabilities": [{
            "id": "CVE-2024-1",
            "updated": "2024-03-01T00:00:00Z",
            "ratings": [{"method": "CVSSv31", "score": 7.4}],
            "affects": [{"ref": "b"}]
        }]
    }));

    let merged = merge_two(governing, incoming, false);

    let vulnerability = &merged.vulnerabilities.as_ref().unwrap()[0];
    let refs: Vec<&str> = vulnerability
        .affects
        .as_deref()
        .unwrap()
        .iter()
        .map(|a| a.affect_ref.as_str())
        .collect();
    assert_eq!(refs, vec!["a", "b"]);
    assert_eq!(
        vulnerability.ratings.as_deref().unwrap()[0].score,
        Some(7.4)
    );
}

#[test]
fn unknown_top_level_fields_survive_a_merge() {
    let governing = sbom(json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.6",
        "annotations": [{"text": "reviewed"}],
        "components": [{"bom-ref": "a", "name": "a"}]
    }));
    let incoming = sbom(json!({
        "components": [{"bom-ref": "b", "name": "b"}]
    }));

    let merged = merge_two(governing, incoming, false);
    let round_trip = serde_json::to_value(&merged).unwrap();
    assert_eq!(round_trip["annotations"][0]["text"], json!("reviewed"));
}
