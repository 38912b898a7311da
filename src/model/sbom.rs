//! Top-level SBOM document model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::component::Component;
use super::vulnerability::Vulnerability;

/// A CycloneDX BOM document.
///
/// Sections the editor never touches stay in the passthrough map. Optional
/// sections are `None` when absent and are treated as empty by every
/// operation; their absence is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sbom {
    #[serde(rename = "bomFormat", skip_serializing_if = "Option::is_none")]
    pub bom_format: Option<String>,

    #[serde(rename = "specVersion", skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,

    #[serde(rename = "serialNumber", skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<Dependency>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compositions: Option<Vec<Composition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<Vulnerability>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Document metadata. `tools` keeps its raw shape because the schema switched
/// from a list to an object in CycloneDX 1.5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "ref")]
    pub dependency_ref: String,

    #[serde(rename = "dependsOn", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One compositions entry grouping assemblies under an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assemblies: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sbom {
    /// The `bom-ref` of the metadata component, if any.
    #[must_use]
    pub fn metadata_component_ref(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.component.as_ref())
            .and_then(|c| c.bom_ref.as_deref())
    }

    /// Whether the document's `specVersion` is at least `major.minor`.
    ///
    /// Unparsable or missing versions compare as lower than everything.
    #[must_use]
    pub fn spec_version_at_least(&self, major: u64, minor: u64) -> bool {
        let Some(raw) = self.spec_version.as_deref() else {
            return false;
        };
        let mut parts = raw.split('.');
        let doc_major = parts.next().and_then(|p| p.parse::<u64>().ok());
        let doc_minor = parts.next().and_then(|p| p.parse::<u64>().ok());
        match (doc_major, doc_minor) {
            (Some(ma), Some(mi)) => (ma, mi) >= (major, minor),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_version_comparison() {
        let mut sbom = Sbom {
            spec_version: Some("1.5".to_string()),
            ..Sbom::default()
        };
        assert!(sbom.spec_version_at_least(1, 5));
        assert!(sbom.spec_version_at_least(1, 4));
        assert!(!sbom.spec_version_at_least(1, 6));

        sbom.spec_version = Some("garbage".to_string());
        assert!(!sbom.spec_version_at_least(1, 4));

        sbom.spec_version = None;
        assert!(!sbom.spec_version_at_least(1, 4));
    }

    #[test]
    fn test_dependency_roundtrip() {
        let dep: Dependency = serde_json::from_value(json!({
            "ref": "pkg-a",
            "dependsOn": ["pkg-b", "pkg-c"]
        }))
        .unwrap();
        assert_eq!(dep.dependency_ref, "pkg-a");

        let back = serde_json::to_value(&dep).unwrap();
        assert_eq!(back["ref"], "pkg-a");
        assert_eq!(back["dependsOn"], json!(["pkg-b", "pkg-c"]));
    }

    #[test]
    fn test_unknown_document_sections_survive() {
        let sbom: Sbom = serde_json::from_value(json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.4",
            "services": [{"name": "auth"}]
        }))
        .unwrap();
        let back = serde_json::to_value(&sbom).unwrap();
        assert_eq!(back["services"][0]["name"], "auth");
    }
}
