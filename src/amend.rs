//! Amend operations: targeted, composable SBOM enhancements.
//!
//! Each operation is small and does one thing. The caller decides which
//! operations run by passing the list explicitly; [`default_operations`]
//! is the safe everyday selection. An operation sees the document whole
//! before the walk, then the metadata block, then every component of the
//! tree depth-first, and the whole document again after the walk.

use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::model::{Component, Composition, Metadata, Sbom};

/// A single amend step.
///
/// All hooks default to doing nothing, implementors override the ones they
/// need. State collected during the walk can be written back in `finish`.
pub trait Operation {
    fn prepare(&mut self, _sbom: &mut Sbom) {}
    fn handle_metadata(&mut self, _metadata: &mut Metadata) {}
    fn handle_component(&mut self, _component: &mut Component) {}
    fn finish(&mut self, _sbom: &mut Sbom) {}
}

/// The operations that are safe to run without further thought.
///
/// [`InferCopyright`] is deliberately not part of this list. It can attach
/// legally relevant claims to components the caller did not think about.
#[must_use]
pub fn default_operations() -> Vec<Box<dyn Operation>> {
    vec![
        Box::new(AddBomRef),
        Box::new(Compositions::default()),
        Box::new(DefaultAuthor),
        Box::new(InferSupplier),
    ]
}

/// Run `operations` over the document, in order at every step.
pub fn run(sbom: &mut Sbom, operations: &mut [Box<dyn Operation>]) {
    for operation in operations.iter_mut() {
        operation.prepare(sbom);
    }

    if let Some(metadata) = sbom.metadata.as_mut() {
        for operation in operations.iter_mut() {
            operation.handle_metadata(metadata);
        }
    }

    if let Some(components) = sbom.components.as_mut() {
        for component in components {
            walk(component, operations);
        }
    }

    for operation in operations.iter_mut() {
        operation.finish(sbom);
    }
}

fn walk(component: &mut Component, operations: &mut [Box<dyn Operation>]) {
    for operation in operations.iter_mut() {
        operation.handle_component(component);
    }
    if let Some(children) = component.components.as_mut() {
        for child in children {
            walk(child, operations);
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Adds a `bom-ref` to components which don't have one yet.
///
/// The position of a component in the tree is not stable enough to derive a
/// name from, so generated refs are UUIDs.
pub struct AddBomRef;

impl AddBomRef {
    fn add(component: &mut Component) {
        if component.bom_ref.is_none() {
            component.bom_ref = Some(Uuid::new_v4().to_string());
        }
    }
}

impl Operation for AddBomRef {
    fn handle_metadata(&mut self, metadata: &mut Metadata) {
        if let Some(component) = metadata.component.as_mut() {
            Self::add(component);
        }
    }

    fn handle_component(&mut self, component: &mut Component) {
        Self::add(component);
    }
}

/// Declares the composition of all components as `incomplete`.
///
/// Existing compositions are replaced by a single `incomplete` aggregate
/// listing every component, the metadata component included.
#[derive(Default)]
pub struct Compositions {
    assemblies: Vec<String>,
}

impl Compositions {
    fn add(&mut self, component: &Component) {
        match &component.bom_ref {
            Some(bom_ref) => {
                debug!("added {bom_ref} to compositions");
                self.assemblies.push(bom_ref.clone());
            }
            None => debug!("cannot add component to compositions because it has no bom-ref"),
        }
    }
}

impl Operation for Compositions {
    fn prepare(&mut self, sbom: &mut Sbom) {
        sbom.compositions = None;
        self.assemblies.clear();
    }

    fn handle_metadata(&mut self, metadata: &mut Metadata) {
        if let Some(component) = &metadata.component {
            self.add(component);
        }
    }

    fn handle_component(&mut self, component: &mut Component) {
        self.add(component);
    }

    fn finish(&mut self, sbom: &mut Sbom) {
        sbom.compositions = Some(vec![Composition {
            aggregate: Some("incomplete".to_string()),
            assemblies: std::mem::take(&mut self.assemblies),
            extra: Map::new(),
        }]);
    }
}

/// Sets the document author to `automated`, if missing.
pub struct DefaultAuthor;

impl Operation for DefaultAuthor {
    fn handle_metadata(&mut self, metadata: &mut Metadata) {
        let authors = metadata.authors.get_or_insert_with(Vec::new);
        if authors.is_empty() {
            debug!("added default author");
            authors.push(serde_json::json!({"name": "automated"}));
        }
    }
}

/// Attempts to infer a component's supplier from other fields.
///
/// The supplier URL is taken from the first `externalReferences` entry of
/// type `website`, `issue-tracker` or `vcs`, in that order, whose URL uses
/// the http or https scheme. The supplier name falls back to `publisher`,
/// then `author`. Present supplier fields are never overwritten.
pub struct InferSupplier;

impl InferSupplier {
    fn infer(component: &mut Component) {
        if supplier_field(component, "url").is_none() {
            if let Some(url) = Self::reference_url(component) {
                debug!(
                    "set supplier of {} to URL: {url}",
                    component.bom_ref.as_deref().unwrap_or("<no bom-ref>")
                );
                set_supplier_field(component, "url", Value::Array(vec![Value::String(url)]));
            }
        }

        if supplier_field(component, "name").is_none() {
            let name = component
                .extra
                .get("publisher")
                .or_else(|| component.extra.get("author"))
                .cloned();
            if let Some(name) = name {
                set_supplier_field(component, "name", name);
            }
        }
    }

    fn reference_url(component: &Component) -> Option<String> {
        let references = component.extra.get("externalReferences")?.as_array()?;
        for wanted in ["website", "issue-tracker", "vcs"] {
            let reference = references
                .iter()
                .find(|r| r.get("type").and_then(Value::as_str) == Some(wanted));
            if let Some(url) = reference.and_then(|r| r.get("url")).and_then(Value::as_str) {
                if url.starts_with("http://") || url.starts_with("https://") {
                    return Some(url.to_string());
                }
            }
        }
        None
    }
}

impl Operation for InferSupplier {
    fn handle_metadata(&mut self, metadata: &mut Metadata) {
        if let Some(component) = metadata.component.as_mut() {
            Self::infer(component);
        }
    }

    fn handle_component(&mut self, component: &mut Component) {
        Self::infer(component);
    }
}

fn supplier_field<'a>(component: &'a Component, field: &str) -> Option<&'a Value> {
    component.extra.get("supplier")?.as_object()?.get(field)
}

fn set_supplier_field(component: &mut Component, field: &str, value: Value) {
    let supplier = component
        .extra
        .entry("supplier")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(supplier) = supplier.as_object_mut() {
        supplier.insert(field.to_string(), value);
    }
}

/// Attempts to infer copyright claims from the supplier.
///
/// Only fills components that carry neither a copyright nor any license
/// claim. Not in the default set: on the wrong input this fabricates
/// claims with legal relevance.
pub struct InferCopyright;

impl InferCopyright {
    fn infer(component: &mut Component) {
        if component.extra.contains_key("copyright") || component.extra.contains_key("licenses") {
            return;
        }
        let Some(name) = supplier_field(component, "name").and_then(Value::as_str) else {
            return;
        };
        let copyright = format!("Copyright (c) {} {name}", Utc::now().year());
        component
            .extra
            .insert("copyright".to_string(), Value::String(copyright));
    }
}

impl Operation for InferCopyright {
    fn handle_metadata(&mut self, metadata: &mut Metadata) {
        if let Some(component) = metadata.component.as_mut() {
            Self::infer(component);
        }
    }

    fn handle_component(&mut self, component: &mut Component) {
        Self::infer(component);
    }
}
