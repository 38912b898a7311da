//! Targeted patching of component fields from an update list.
//!
//! Each update names exactly one target, either a concrete identity key or
//! coordinates with a version range, and a `set` map of field values. The
//! whole update list is validated before anything is mutated. Writing over
//! an existing value requires consent: `--force`, or an interactive yes;
//! in a non-interactive session it is an error.

use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{EditorError, Result};
use crate::identity::{ComponentIdentity, Coordinates, Key};
use crate::model::{Component, Sbom, Swid};
use crate::versions::{SchemeRegistry, VersionRange};

/// Fields that require `--allow-protected` because other tooling relies on
/// them: everything identity-relevant plus the component tree itself.
pub const PROTECTED_FIELDS: [&str; 7] =
    ["cpe", "purl", "swid", "name", "group", "version", "components"];

const IDENTIFIER_FIELDS: [&str; 6] = ["cpe", "purl", "swid", "name", "group", "version"];

/// Behavior switches for a set run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetConfig {
    /// Overwrite existing values without asking.
    pub force: bool,
    /// Permit writes to [`PROTECTED_FIELDS`].
    pub allow_protected: bool,
    /// Skip updates whose target matches nothing instead of failing.
    pub ignore_missing: bool,
}

/// One entry of an update list.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub id: TargetDescriptor,
    #[serde(default)]
    pub set: Option<Map<String, Value>>,
}

/// The raw identification block of an update entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDescriptor {
    pub cpe: Option<String>,
    pub purl: Option<String>,
    pub swid: Option<Swid>,
    pub name: Option<String>,
    pub group: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "version_range", alias = "version-range")]
    pub version_range: Option<String>,
}

/// Parse the JSON representation of an update list.
pub fn parse_updates(value: Value) -> Result<Vec<UpdateRequest>> {
    let entries = match value {
        Value::Array(_) => value,
        Value::Object(_) => Value::Array(vec![value]),
        _ => {
            return Err(EditorError::configuration(
                "invalid set file",
                "Expected an update object or an array of update objects.",
            ))
        }
    };
    serde_json::from_value(entries)
        .map_err(|e| EditorError::configuration("invalid set file", e.to_string()))
}

// ============================================================================
// Targets
// ============================================================================

/// A resolved update target: a single key, or coordinates matched against a
/// version range.
#[derive(Debug, Clone)]
enum UpdateTarget {
    Exact(Key),
    Range {
        name: String,
        group: Option<String>,
        range: VersionRange,
    },
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => write!(f, "{key}"),
            Self::Range { name, group, range } => {
                if let Some(group) = group {
                    write!(f, "{group}/")?;
                }
                write!(f, "{name}@{range}")
            }
        }
    }
}

fn resolve_target(descriptor: &TargetDescriptor, registry: &SchemeRegistry) -> Result<UpdateTarget> {
    let mut targets: Vec<UpdateTarget> = Vec::new();

    if let Some(cpe) = &descriptor.cpe {
        targets.push(UpdateTarget::Exact(Key::Cpe(cpe.clone())));
    }
    if let Some(purl) = &descriptor.purl {
        targets.push(UpdateTarget::Exact(Key::Purl(purl.clone())));
    }
    if let Some(swid) = &descriptor.swid {
        targets.push(UpdateTarget::Exact(Key::Swid(swid.tag_id.clone())));
    }
    if let Some(name) = &descriptor.name {
        // a concrete version takes precedence over a range
        let target = match (&descriptor.version, &descriptor.version_range) {
            (None, Some(expression)) => UpdateTarget::Range {
                name: name.to_lowercase(),
                group: descriptor.group.as_deref().map(str::to_lowercase),
                range: VersionRange::parse(expression, registry)?,
            },
            (version, _) => UpdateTarget::Exact(Key::Coordinates(Coordinates::new(
                name,
                descriptor.group.as_deref(),
                version.as_deref(),
            ))),
        };
        targets.push(target);
    }

    match targets.len() {
        1 => Ok(targets.remove(0)),
        0 => Err(EditorError::configuration(
            "invalid set file",
            "An update object has an empty 'id' property; provide one of \
             cpe, purl, swid or name coordinates.",
        )),
        _ => Err(EditorError::configuration(
            "invalid set file",
            "An update object names more than one identifier; \
             exactly one of cpe, purl, swid or name coordinates is allowed.",
        )),
    }
}

// ============================================================================
// Component index
// ============================================================================

/// Position of a component in the document, usable after other components
/// were mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    /// Path below the metadata component; empty means the component itself.
    Metadata(Vec<usize>),
    /// Path into the `components` forest.
    Components(Vec<usize>),
}

fn index_components(sbom: &Sbom) -> IndexMap<Key, Vec<Location>> {
    fn add(component: &Component, location: &Location, index: &mut IndexMap<Key, Vec<Location>>) {
        let identity = ComponentIdentity::create(component, true);
        for key in identity.keys() {
            index.entry(key.clone()).or_default().push(location.clone());
        }
        for (position, child) in component.components.as_deref().unwrap_or_default().iter().enumerate() {
            let child_location = match location {
                Location::Metadata(path) => {
                    let mut path = path.clone();
                    path.push(position);
                    Location::Metadata(path)
                }
                Location::Components(path) => {
                    let mut path = path.clone();
                    path.push(position);
                    Location::Components(path)
                }
            };
            add(child, &child_location, index);
        }
    }

    let mut index = IndexMap::new();
    if let Some(component) = sbom.metadata.as_ref().and_then(|m| m.component.as_ref()) {
        add(component, &Location::Metadata(Vec::new()), &mut index);
    }
    for (position, component) in sbom.components.as_deref().unwrap_or_default().iter().enumerate() {
        add(component, &Location::Components(vec![position]), &mut index);
    }
    index
}

fn resolve_location<'a>(sbom: &'a mut Sbom, location: &Location) -> Option<&'a mut Component> {
    let (mut component, path) = match location {
        Location::Metadata(path) => {
            let component = sbom.metadata.as_mut()?.component.as_mut()?;
            (component, path.as_slice())
        }
        Location::Components(path) => {
            let (first, rest) = path.split_first()?;
            let component = sbom.components.as_mut()?.get_mut(*first)?;
            (component, rest)
        }
    };
    for position in path {
        component = component.components.as_mut()?.get_mut(*position)?;
    }
    Some(component)
}

// ============================================================================
// Update application
// ============================================================================

struct UpdateOutcome {
    identity_change: Option<(ComponentIdentity, ComponentIdentity)>,
    reindex: bool,
}

fn apply_update(
    component: &mut Component,
    target: &UpdateTarget,
    update_set: &Map<String, Value>,
    cfg: &SetConfig,
) -> Result<UpdateOutcome> {
    let mut original_identity: Option<ComponentIdentity> = None;
    let mut reindex = false;

    for (field, value) in update_set {
        if value.is_null() {
            if component.has_field(field) {
                debug!("deleting '{field}' on component '{target}'");
                component.remove_field(field);
            }
            continue;
        }

        // existing list plus a scalar means append, not replace
        if let Some(Value::Array(mut existing)) = component.get_field(field) {
            if !value.is_array() {
                debug!("merging '{field}' on component '{target}'");
                existing.push(value.clone());
                component.set_field(field, Value::Array(existing))?;
                continue;
            }
        }

        if IDENTIFIER_FIELDS.contains(&field.as_str()) && original_identity.is_none() {
            original_identity = Some(ComponentIdentity::create(component, true));
        }
        if field == "components" {
            reindex = true;
        }

        if !component.has_field(field) || should_overwrite(field, target, cfg.force)? {
            debug!("setting '{field}' on component '{target}'");
            component.set_field(field, value.clone())?;
        }
    }

    let identity_change =
        original_identity.map(|old| (old, ComponentIdentity::create(component, true)));
    Ok(UpdateOutcome {
        identity_change,
        reindex,
    })
}

fn should_overwrite(field: &str, target: &UpdateTarget, force: bool) -> Result<bool> {
    if force {
        debug!("overwriting '{field}' on component '{target}'");
        return Ok(true);
    }

    if !io::stdin().is_terminal() {
        return Err(EditorError::overwrite(
            format!("the property '{field}' is already present on component '{target}'"),
            "Use the --force option to overwrite existing values without confirmation.",
        ));
    }

    Ok(prompt_for_overwrite(field, target))
}

fn prompt_for_overwrite(field: &str, target: &UpdateTarget) -> bool {
    println!("The property \"{field}\" is already present on the component \"{target}\".");
    loop {
        print!("Overwrite? [Y/n]: ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        match line.trim() {
            "" | "y" | "Y" | "yes" | "Yes" => return true,
            "n" | "N" | "no" | "No" => return false,
            _ => {}
        }
    }
}

fn remap_identity(
    index: &mut IndexMap<Key, Vec<Location>>,
    old: &ComponentIdentity,
    new: &ComponentIdentity,
    location: &Location,
) {
    for key in old.keys() {
        if let Some(locations) = index.get_mut(key) {
            locations.retain(|l| l != location);
            if locations.is_empty() {
                index.shift_remove(key);
            }
        }
    }
    for key in new.keys() {
        index.entry(key.clone()).or_default().push(location.clone());
    }
}

// ============================================================================
// Entry point
// ============================================================================

fn validate_updates(
    updates: &[UpdateRequest],
    cfg: &SetConfig,
    registry: &SchemeRegistry,
) -> Result<Vec<(UpdateTarget, Map<String, Value>)>> {
    let mut planned = Vec::with_capacity(updates.len());
    for update in updates {
        let target = resolve_target(&update.id, registry)?;

        let Some(update_set) = &update.set else {
            return Err(EditorError::configuration(
                "invalid set file",
                format!("The update object with id '{target}' is missing the 'set' property."),
            ));
        };

        let protected: Vec<&str> = update_set
            .keys()
            .map(String::as_str)
            .filter(|field| PROTECTED_FIELDS.contains(field))
            .collect();
        if !protected.is_empty() && !cfg.allow_protected {
            return Err(EditorError::configuration(
                "invalid set usage",
                format!(
                    "The following properties are protected: {}. \
                     Use the --allow-protected option to set them.",
                    protected.join(", ")
                ),
            ));
        }

        planned.push((target, update_set.clone()));
    }
    Ok(planned)
}

/// Apply an update list to the document.
pub fn run(
    sbom: &mut Sbom,
    updates: &[UpdateRequest],
    cfg: &SetConfig,
    registry: &SchemeRegistry,
) -> Result<()> {
    if updates.is_empty() {
        debug!("no updates to perform");
        return Ok(());
    }

    let planned = validate_updates(updates, cfg, registry)?;
    let mut index = index_components(sbom);

    for (target, update_set) in planned {
        let locations = find_locations(&index, &target);

        if locations.is_empty() {
            if cfg.ignore_missing {
                info!("component '{target}' was not found and could not be updated");
                continue;
            }
            return Err(EditorError::not_found(
                format!("the component '{target}' was not found and could not be updated"),
                "No component in the document matches the update target. \
                 Use --ignore-missing to skip updates without a match.",
            ));
        }

        let mut reindex = false;
        for location in &locations {
            let Some(component) = resolve_location(sbom, location) else {
                continue;
            };
            let outcome = apply_update(component, &target, &update_set, cfg)?;
            if outcome.reindex {
                reindex = true;
            } else if let Some((old, new)) = outcome.identity_change {
                remap_identity(&mut index, &old, &new, location);
            }
        }
        if reindex {
            index = index_components(sbom);
        }
    }
    Ok(())
}

fn find_locations(index: &IndexMap<Key, Vec<Location>>, target: &UpdateTarget) -> Vec<Location> {
    match target {
        UpdateTarget::Exact(key) => index.get(key).cloned().unwrap_or_default(),
        UpdateTarget::Range { name, group, range } => {
            let mut found = Vec::new();
            for (key, locations) in index {
                let Key::Coordinates(coordinates) = key else {
                    continue;
                };
                if coordinates.name != *name || coordinates.group != *group {
                    continue;
                }
                let Some(version) = &coordinates.version else {
                    continue;
                };
                match range.contains(version) {
                    Ok(true) => {
                        for location in locations {
                            if !found.contains(location) {
                                found.push(location.clone());
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(_) => {
                        debug!("version '{version}' is not comparable under '{range}', skipping");
                    }
                }
            }
            found
        }
    }
}
