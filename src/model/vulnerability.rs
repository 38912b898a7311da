//! Vulnerability (VEX) model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the `vulnerabilities` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<VulnerabilityReference>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<Rating>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affects: Option<Vec<Affect>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cross-reference to the same vulnerability in another naming authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A severity rating under some scoring method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A component affected by a vulnerability, referenced by `bom-ref`.
/// Version statements stay in the passthrough map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affect {
    #[serde(rename = "ref")]
    pub affect_ref: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vulnerability {
    /// All identifiers this vulnerability is known under: its own `id` plus
    /// the ids of every reference entry.
    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        if let Some(id) = self.id.as_deref() {
            ids.push(id);
        }
        if let Some(references) = &self.references {
            for reference in references {
                if let Some(id) = reference.id.as_deref() {
                    ids.push(id);
                }
            }
        }
        ids
    }
}
