//! Typed CycloneDX document model with lossless passthrough of unmodeled
//! fields.

mod component;
mod sbom;
mod vulnerability;

pub use component::{Component, Property, Swid};
pub use sbom::{Composition, Dependency, Metadata, Sbom};
pub use vulnerability::{Affect, Rating, Vulnerability, VulnerabilityReference};
