//! Component identity keys and the identity matching rule.
//!
//! A component can be named by up to four kinds of key. Two identities refer
//! to the same component when any of their keys coincide; an identity without
//! keys refers to nothing. The match relation is deliberately not transitive,
//! so it is exposed as [`ComponentIdentity::matches`] rather than as `Eq`.

use std::fmt;

use crate::model::Component;

/// Key kinds in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    Cpe,
    Purl,
    Swid,
    Coordinates,
}

/// Group, name and version triple used when no registered identifier exists.
///
/// `name` and `group` are matched case-insensitively and are stored
/// lowercased; `version` is matched verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub name: String,
    pub group: Option<String>,
    pub version: Option<String>,
}

impl Coordinates {
    #[must_use]
    pub fn new(name: &str, group: Option<&str>, version: Option<&str>) -> Self {
        Self {
            name: name.to_lowercase(),
            group: group.map(str::to_lowercase),
            version: version.map(str::to_string),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(group) = &self.group {
            write!(f, "{group}/")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// A single identity key. SWID keys compare by `tagId` only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Cpe(String),
    Purl(String),
    Swid(String),
    Coordinates(Coordinates),
}

impl Key {
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Cpe(_) => KeyType::Cpe,
            Self::Purl(_) => KeyType::Purl,
            Self::Swid(_) => KeyType::Swid,
            Self::Coordinates(_) => KeyType::Coordinates,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpe(cpe) => write!(f, "{cpe}"),
            Self::Purl(purl) => write!(f, "{purl}"),
            Self::Swid(tag_id) => write!(f, "{tag_id}"),
            Self::Coordinates(coordinates) => write!(f, "{coordinates}"),
        }
    }
}

/// The full identity of a component: at most one key per kind, ordered by
/// [`KeyType`] precedence.
#[derive(Debug, Clone, Default)]
pub struct ComponentIdentity {
    keys: Vec<Key>,
}

impl ComponentIdentity {
    /// Build the identity of a component.
    ///
    /// CPE, PURL and SWID are always used. Coordinates are only included
    /// with `allow_unsafe` because name collisions across ecosystems make
    /// them a weaker signal.
    #[must_use]
    pub fn create(component: &Component, allow_unsafe: bool) -> Self {
        let mut keys = Vec::new();
        if let Some(cpe) = component.cpe.as_deref() {
            keys.push(Key::Cpe(cpe.to_string()));
        }
        if let Some(purl) = component.purl.as_deref() {
            keys.push(Key::Purl(purl.to_string()));
        }
        if let Some(swid) = &component.swid {
            keys.push(Key::Swid(swid.tag_id.clone()));
        }
        if allow_unsafe {
            if let Some(name) = component.name.as_deref() {
                keys.push(Key::Coordinates(Coordinates::new(
                    name,
                    component.group.as_deref(),
                    component.version.as_deref(),
                )));
            }
        }
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Two identities match when they share at least one key. An empty
    /// identity matches nothing, not even another empty identity.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.keys.iter().any(|key| other.keys.contains(key))
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return write!(f, "<no identity>");
        }
        let rendered: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}
