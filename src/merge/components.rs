//! Component part of the merge: identity-based deduplication, bom-ref
//! reconciliation and placement of surviving components.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::identity::ComponentIdentity;
use crate::model::{Component, Sbom};
use crate::refs::{collect_bom_refs, rename_bom_ref_unique, walk_components};

/// Identities of every component already present in the governing document,
/// metadata component included, paired with their bom-refs.
struct GoverningIndex {
    entries: Vec<(ComponentIdentity, Option<String>)>,
}

impl GoverningIndex {
    fn build(governing: &Sbom) -> Self {
        let entries = walk_components(governing)
            .into_iter()
            .map(|c| (ComponentIdentity::create(c, true), c.bom_ref.clone()))
            .collect();
        Self { entries }
    }

    /// First governing entry matching `identity`. The outer `Option` is the
    /// match, the inner one the matched component's bom-ref.
    fn lookup(&self, identity: &ComponentIdentity) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.matches(identity))
            .map(|(_, bom_ref)| bom_ref.as_deref())
    }
}

/// Merge the incoming document's components into the governing one.
///
/// The incoming metadata component takes part as an ordinary component. A
/// component whose identity already exists in the governing document is
/// dropped and its bom-ref rewritten throughout the incoming document to the
/// governing one, so that its dependency, composition and vulnerability
/// entries keep pointing at the surviving component. Everything else is
/// appended, renamed first when its ref collides with a governing ref.
pub(super) fn merge_components(governing: &mut Sbom, incoming: &mut Sbom, hierarchical: bool) {
    if let Some(metadata_component) = incoming.metadata.as_mut().and_then(|m| m.component.take()) {
        incoming
            .components
            .get_or_insert_with(Vec::new)
            .push(metadata_component);
    }

    let index = GoverningIndex::build(governing);
    let governing_refs: HashSet<String> = collect_bom_refs(governing).into_iter().collect();

    reconcile_refs(incoming, &index, &governing_refs);

    let mut hoisted: Vec<(Option<String>, Vec<Component>)> = Vec::new();
    let kept = filter_new(
        incoming.components.take().unwrap_or_default(),
        &index,
        &mut hoisted,
    );

    let mut merged = governing.components.take().unwrap_or_default();
    merged.extend(kept);

    for (governing_ref, children) in hoisted {
        let attached = hierarchical
            && governing_ref.as_deref().is_some_and(|bom_ref| {
                attach_to(governing.metadata.as_mut().and_then(|m| m.component.as_mut()), &mut merged, bom_ref, &children)
            });
        if !attached {
            merged.extend(children);
        }
    }

    governing.components = if merged.is_empty() { None } else { Some(merged) };
}

/// First pass over the incoming tree: align the refs of duplicates with their
/// governing counterparts and rename kept components whose refs collide with
/// governing ones. Rewrites are document-wide, so the incoming dependency and
/// vulnerability sections stay consistent.
fn reconcile_refs(incoming: &mut Sbom, index: &GoverningIndex, governing_refs: &HashSet<String>) {
    let snapshot: Vec<(ComponentIdentity, Option<String>)> = walk_components(incoming)
        .into_iter()
        .map(|c| (ComponentIdentity::create(c, true), c.bom_ref.clone()))
        .collect();

    let no_reserved = HashSet::new();
    for (identity, incoming_ref) in snapshot {
        match index.lookup(&identity) {
            Some(governing_ref) => {
                warn!("potential loss of information: duplicate component '{identity}' is dropped");
                if let (Some(incoming_ref), Some(governing_ref)) = (incoming_ref, governing_ref) {
                    let assigned =
                        rename_bom_ref_unique(incoming, &incoming_ref, governing_ref, &no_reserved);
                    debug!("redirected '{incoming_ref}' to '{assigned}'");
                }
            }
            None => {
                if let Some(incoming_ref) = incoming_ref {
                    if governing_refs.contains(&incoming_ref) {
                        let assigned = rename_bom_ref_unique(
                            incoming,
                            &incoming_ref,
                            &incoming_ref,
                            governing_refs,
                        );
                        debug!("renamed colliding ref '{incoming_ref}' to '{assigned}'");
                    }
                }
            }
        }
    }
}

/// Second pass: drop duplicates structurally. New children found underneath a
/// dropped duplicate are collected for reattachment near the governing match.
fn filter_new(
    components: Vec<Component>,
    index: &GoverningIndex,
    hoisted: &mut Vec<(Option<String>, Vec<Component>)>,
) -> Vec<Component> {
    let mut kept = Vec::new();
    for mut component in components {
        let children = component.components.take().unwrap_or_default();
        let new_children = filter_new(children, index, hoisted);

        let identity = ComponentIdentity::create(&component, true);
        match index.lookup(&identity) {
            Some(governing_ref) => {
                if !new_children.is_empty() {
                    hoisted.push((governing_ref.map(str::to_string), new_children));
                }
            }
            None => {
                if !new_children.is_empty() {
                    component.components = Some(new_children);
                }
                kept.push(component);
            }
        }
    }
    kept
}

/// Append `children` below the component named `bom_ref`, searching the
/// metadata component and the component forest. Returns false when the ref
/// names no component.
fn attach_to(
    metadata_component: Option<&mut Component>,
    components: &mut [Component],
    bom_ref: &str,
    children: &[Component],
) -> bool {
    if let Some(component) = metadata_component {
        if attach_in_tree(std::slice::from_mut(component), bom_ref, children) {
            return true;
        }
    }
    attach_in_tree(components, bom_ref, children)
}

fn attach_in_tree(components: &mut [Component], bom_ref: &str, children: &[Component]) -> bool {
    for component in components {
        if component.bom_ref.as_deref() == Some(bom_ref) {
            component
                .components
                .get_or_insert_with(Vec::new)
                .extend_from_slice(children);
            return true;
        }
        if let Some(nested) = component.components.as_mut() {
            if attach_in_tree(nested, bom_ref, children) {
                return true;
            }
        }
    }
    false
}
