//! Component model.
//!
//! Only the fields the editing operations act on are modeled as typed struct
//! members; everything else a CycloneDX component may carry is preserved in a
//! flattened passthrough map so documents survive a read, edit, write cycle
//! without losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EditorError, Result};

/// A CycloneDX component, possibly with nested sub-components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "bom-ref", skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swid: Option<Swid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,

    /// All remaining CycloneDX fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SWID tag. Only `tagId` matters for identity; the rest is passthrough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Swid {
    #[serde(rename = "tagId")]
    pub tag_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `name`/`value` property entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Component {
    /// A human-readable identifier for log and error messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or("<unnamed>");
        match (&self.group, &self.version) {
            (Some(group), Some(version)) => format!("{group}/{name}@{version}"),
            (Some(group), None) => format!("{group}/{name}"),
            (None, Some(version)) => format!("{name}@{version}"),
            (None, None) => name.to_string(),
        }
    }

    /// Read a field by its CycloneDX name, modeled or passthrough.
    #[must_use]
    pub fn get_field(&self, field: &str) -> Option<Value> {
        match field {
            "bom-ref" => self.bom_ref.clone().map(Value::String),
            "type" => self.component_type.clone().map(Value::String),
            "name" => self.name.clone().map(Value::String),
            "group" => self.group.clone().map(Value::String),
            "version" => self.version.clone().map(Value::String),
            "cpe" => self.cpe.clone().map(Value::String),
            "purl" => self.purl.clone().map(Value::String),
            "swid" => self.swid.as_ref().and_then(|s| serde_json::to_value(s).ok()),
            "properties" => self
                .properties
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
            "components" => self
                .components
                .as_ref()
                .and_then(|c| serde_json::to_value(c).ok()),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Write a field by its CycloneDX name.
    ///
    /// Values targeting modeled fields must have the shape the schema
    /// expects; a mismatch is reported as a configuration error.
    pub fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        fn typed<T: serde::de::DeserializeOwned>(field: &str, value: Value) -> Result<T> {
            serde_json::from_value(value).map_err(|e| {
                EditorError::configuration(
                    format!("invalid value for field '{field}'"),
                    e.to_string(),
                )
            })
        }

        match field {
            "bom-ref" => self.bom_ref = Some(typed(field, value)?),
            "type" => self.component_type = Some(typed(field, value)?),
            "name" => self.name = Some(typed(field, value)?),
            "group" => self.group = Some(typed(field, value)?),
            "version" => self.version = Some(typed(field, value)?),
            "cpe" => self.cpe = Some(typed(field, value)?),
            "purl" => self.purl = Some(typed(field, value)?),
            "swid" => self.swid = Some(typed(field, value)?),
            "properties" => self.properties = Some(typed(field, value)?),
            "components" => self.components = Some(typed(field, value)?),
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
        Ok(())
    }

    /// Remove a field by its CycloneDX name. Unknown or absent fields are a no-op.
    pub fn remove_field(&mut self, field: &str) {
        match field {
            "bom-ref" => self.bom_ref = None,
            "type" => self.component_type = None,
            "name" => self.name = None,
            "group" => self.group = None,
            "version" => self.version = None,
            "cpe" => self.cpe = None,
            "purl" => self.purl = None,
            "swid" => self.swid = None,
            "properties" => self.properties = None,
            "components" => self.components = None,
            other => {
                self.extra.remove(other);
            }
        }
    }

    /// True if the field currently holds a value.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.get_field(field).is_some()
    }
}
