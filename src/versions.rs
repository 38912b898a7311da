//! Version range evaluation.
//!
//! A range expression is a scheme prefix followed by `|`-separated
//! constraints, e.g. `semver/>=1.2.0|<2.0.0`. Constraints are sorted by
//! version order, partitioned into sub-ranges (fixed versions, bounded or
//! half-open spans) and membership is the union over those sub-ranges.
//!
//! Three scheme families are supported: `semver` (via the `semver` crate),
//! `calver` (dotted or dashed positional integers) and caller-registered
//! custom schemes given as an ordered version list.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::info;

use crate::error::{EditorError, Result};

// ============================================================================
// Scheme registry
// ============================================================================

/// Custom versioning schemes, each an ordered list of version strings from
/// lowest to highest. Passed explicitly to every consumer; there is no
/// process-global registry.
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    schemes: IndexMap<String, Vec<String>>,
}

impl SchemeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scheme. Re-registering a name replaces the previous list.
    pub fn register(&mut self, name: impl Into<String>, ordered_versions: Vec<String>) {
        let name = name.into();
        if self.schemes.contains_key(&name) {
            info!("version scheme '{name}' already registered, replacing it");
        }
        self.schemes.insert(name, ordered_versions);
    }

    /// Load scheme definitions from their JSON representation: an object (or
    /// array of objects) with `version_type` and `version_list` fields.
    pub fn from_json(value: &Value) -> Result<Self> {
        let entries: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![value],
            _ => {
                return Err(EditorError::configuration(
                    "invalid custom version schemes",
                    "Expected an object or an array of objects with \
                     'version_type' and 'version_list' fields.",
                ))
            }
        };

        let mut registry = Self::new();
        for entry in entries {
            let name = entry.get("version_type").and_then(Value::as_str);
            let versions = entry.get("version_list").and_then(Value::as_array);
            let (Some(name), Some(versions)) = (name, versions) else {
                return Err(EditorError::configuration(
                    "invalid custom version scheme entry",
                    "'version_type' (string) and 'version_list' (array) \
                     are required properties.",
                ));
            };
            let list: Vec<String> = versions
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        EditorError::configuration(
                            format!("invalid version in scheme '{name}'"),
                            "Every entry of 'version_list' must be a string.",
                        )
                    })
                })
                .collect::<Result<_>>()?;
            registry.register(name, list);
        }
        Ok(registry)
    }

    fn order(&self, scheme: &str) -> Option<&[String]> {
        self.schemes.get(scheme).map(Vec::as_slice)
    }
}

// ============================================================================
// Schemes and constraints
// ============================================================================

/// The versioning scheme a range is expressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionScheme {
    Semver,
    Calver,
    Custom(String),
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semver => write!(f, "semver"),
            Self::Calver => write!(f, "calver"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Fixed,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl Relation {
    /// Split a constraint expression into its relation and version part.
    fn split(expression: &str) -> (Self, &str) {
        if let Some(rest) = expression.strip_prefix("<=") {
            (Self::LessEq, rest.trim_start())
        } else if let Some(rest) = expression.strip_prefix(">=") {
            (Self::GreaterEq, rest.trim_start())
        } else if let Some(rest) = expression.strip_prefix('<') {
            (Self::Less, rest.trim_start())
        } else if let Some(rest) = expression.strip_prefix('>') {
            (Self::Greater, rest.trim_start())
        } else {
            (Self::Fixed, expression)
        }
    }

    fn is_upper(self) -> bool {
        matches!(self, Self::Less | Self::LessEq)
    }
}

#[derive(Debug, Clone)]
struct Constraint<V> {
    relation: Relation,
    version: V,
}

#[derive(Debug, Clone)]
struct Bound<V> {
    version: V,
    inclusive: bool,
}

#[derive(Debug, Clone)]
enum SubRange<V> {
    Fixed(V),
    Span {
        lower: Option<Bound<V>>,
        upper: Option<Bound<V>>,
    },
}

/// Partition sorted constraints into sub-ranges. A lower bound absorbs the
/// upper bounds that immediately follow it, keeping the last and therefore
/// widest one; upper bounds without a preceding lower bound form a span open
/// towards zero; fixed versions stand alone.
fn build_sub_ranges<V: Clone>(constraints: &[Constraint<V>]) -> Vec<SubRange<V>> {
    let mut sub_ranges = Vec::new();
    let mut index = 0;
    while index < constraints.len() {
        let constraint = &constraints[index];
        match constraint.relation {
            Relation::Fixed => {
                sub_ranges.push(SubRange::Fixed(constraint.version.clone()));
                index += 1;
            }
            Relation::Greater | Relation::GreaterEq => {
                let lower = Bound {
                    version: constraint.version.clone(),
                    inclusive: constraint.relation == Relation::GreaterEq,
                };
                index += 1;
                let mut upper = None;
                while index < constraints.len() && constraints[index].relation.is_upper() {
                    upper = Some(Bound {
                        version: constraints[index].version.clone(),
                        inclusive: constraints[index].relation == Relation::LessEq,
                    });
                    index += 1;
                }
                sub_ranges.push(SubRange::Span {
                    lower: Some(lower),
                    upper,
                });
            }
            Relation::Less | Relation::LessEq => {
                let mut upper = Bound {
                    version: constraint.version.clone(),
                    inclusive: constraint.relation == Relation::LessEq,
                };
                index += 1;
                while index < constraints.len() && constraints[index].relation.is_upper() {
                    upper = Bound {
                        version: constraints[index].version.clone(),
                        inclusive: constraints[index].relation == Relation::LessEq,
                    };
                    index += 1;
                }
                sub_ranges.push(SubRange::Span {
                    lower: None,
                    upper: Some(upper),
                });
            }
        }
    }
    sub_ranges
}

fn sub_ranges_contain<V: Ord>(sub_ranges: &[SubRange<V>], version: &V) -> bool {
    sub_ranges.iter().any(|sub_range| match sub_range {
        SubRange::Fixed(fixed) => version == fixed,
        SubRange::Span { lower, upper } => {
            let above = lower.as_ref().map_or(true, |bound| {
                match version.cmp(&bound.version) {
                    Ordering::Greater => true,
                    Ordering::Equal => bound.inclusive,
                    Ordering::Less => false,
                }
            });
            let below = upper.as_ref().map_or(true, |bound| {
                match version.cmp(&bound.version) {
                    Ordering::Less => true,
                    Ordering::Equal => bound.inclusive,
                    Ordering::Greater => false,
                }
            });
            above && below
        }
    })
}

// ============================================================================
// Range
// ============================================================================

#[derive(Debug, Clone)]
enum RangeSet {
    Semver(Vec<SubRange<semver::Version>>),
    Calver(Vec<SubRange<Vec<u64>>>),
    Custom {
        order: Vec<String>,
        sub_ranges: Vec<SubRange<usize>>,
    },
}

/// A parsed, scheme-aware version range.
#[derive(Debug, Clone)]
pub struct VersionRange {
    scheme: VersionScheme,
    raw: String,
    set: RangeSet,
}

impl VersionRange {
    /// Parse a `scheme/constraints` expression.
    pub fn parse(input: &str, registry: &SchemeRegistry) -> Result<Self> {
        let Some((scheme_name, expression)) = input.split_once('/') else {
            return Err(EditorError::configuration(
                format!("missing versioning scheme in range '{input}'"),
                "Ranges have the form <scheme>/<constraints>, \
                 e.g. semver/>=1.2.0|<2.0.0",
            ));
        };

        let expressions = split_constraints(input, expression)?;

        let (scheme, set) = match scheme_name {
            "semver" => {
                let mut constraints = parse_constraints(&expressions, |version| {
                    semver::Version::parse(version).map_err(|e| {
                        EditorError::configuration(
                            format!("invalid semver version '{version}'"),
                            e.to_string(),
                        )
                    })
                })?;
                constraints.sort_by(|a, b| a.version.cmp(&b.version));
                (VersionScheme::Semver, RangeSet::Semver(build_sub_ranges(&constraints)))
            }
            "calver" => {
                let mut constraints = parse_constraints(&expressions, |version| {
                    parse_calver(version).ok_or_else(|| {
                        EditorError::configuration(
                            format!("invalid calver version '{version}'"),
                            "Calver versions are dot or dash separated \
                             non-negative integers, e.g. 2024.3.1",
                        )
                    })
                })?;
                constraints.sort_by(|a, b| a.version.cmp(&b.version));
                (VersionScheme::Calver, RangeSet::Calver(build_sub_ranges(&constraints)))
            }
            custom => {
                let Some(order) = registry.order(custom) else {
                    return Err(EditorError::configuration(
                        format!("unknown versioning scheme '{custom}'"),
                        "Supported schemes are 'semver', 'calver' and any \
                         custom scheme registered via an ordered version list.",
                    ));
                };
                let mut constraints = parse_constraints(&expressions, |version| {
                    order.iter().position(|v| v == version).ok_or_else(|| {
                        EditorError::configuration(
                            format!("unknown version '{version}'"),
                            format!(
                                "The version is not part of the ordered list \
                                 registered for scheme '{custom}'."
                            ),
                        )
                    })
                })?;
                constraints.sort_by_key(|c| c.version);
                (
                    VersionScheme::Custom(custom.to_string()),
                    RangeSet::Custom {
                        order: order.to_vec(),
                        sub_ranges: build_sub_ranges(&constraints),
                    },
                )
            }
        };

        Ok(Self {
            scheme,
            raw: input.to_string(),
            set,
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &VersionScheme {
        &self.scheme
    }

    /// Whether `version` falls into the range.
    ///
    /// The version string is interpreted under the range's own scheme; a
    /// version that cannot be read under that scheme is an
    /// [`EditorError::IncompatibleScheme`] error.
    pub fn contains(&self, version: &str) -> Result<bool> {
        match &self.set {
            RangeSet::Semver(sub_ranges) => {
                let parsed = semver::Version::parse(version).map_err(|e| {
                    incompatible(version, &self.scheme, &e.to_string())
                })?;
                Ok(sub_ranges_contain(sub_ranges, &parsed))
            }
            RangeSet::Calver(sub_ranges) => {
                let parsed = parse_calver(version).ok_or_else(|| {
                    incompatible(version, &self.scheme, "not a calver version")
                })?;
                Ok(sub_ranges_contain(sub_ranges, &parsed))
            }
            RangeSet::Custom { order, sub_ranges } => {
                let index = order.iter().position(|v| v == version).ok_or_else(|| {
                    incompatible(version, &self.scheme, "not in the registered version list")
                })?;
                Ok(sub_ranges_contain(sub_ranges, &index))
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn incompatible(version: &str, scheme: &VersionScheme, reason: &str) -> EditorError {
    EditorError::incompatible_scheme(
        format!("version '{version}' cannot be compared under scheme '{scheme}'"),
        format!("Versions of different schemes have no order: {reason}"),
    )
}

fn split_constraints<'a>(input: &str, expression: &'a str) -> Result<Vec<&'a str>> {
    let expression = expression.strip_suffix('|').unwrap_or(expression);
    let parts: Vec<&str> = expression.split('|').map(str::trim).collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return Err(EditorError::configuration(
            format!("empty constraint in range '{input}'"),
            "Constraints are '|'-separated expressions of the form \
             <v, <=v, >v, >=v or a plain version.",
        ));
    }
    Ok(parts)
}

fn parse_constraints<V>(
    expressions: &[&str],
    mut parse_version: impl FnMut(&str) -> Result<V>,
) -> Result<Vec<Constraint<V>>> {
    expressions
        .iter()
        .map(|expression| {
            let (relation, version) = Relation::split(expression);
            Ok(Constraint {
                relation,
                version: parse_version(version)?,
            })
        })
        .collect()
}

/// Parse a calver version into its positional integers. `Vec<u64>` ordering
/// gives the required comparison: position by position, a shorter sequence
/// that is a prefix of a longer one sorting first.
fn parse_calver(version: &str) -> Option<Vec<u64>> {
    static CALVER: OnceLock<Regex> = OnceLock::new();
    let pattern = CALVER.get_or_init(|| {
        Regex::new(r"^[0-9]+([.\-][0-9]+)*$").unwrap_or_else(|_| unreachable!())
    });
    if !pattern.is_match(version) {
        return None;
    }
    version
        .split(['.', '-'])
        .map(|part| part.parse::<u64>().ok())
        .collect()
}
