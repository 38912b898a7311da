//! **A toolkit for editing CycloneDX SBOM documents.**
//!
//! `cdx-edit` manipulates Software Bills of Materials after they have been
//! generated: merging several documents into one, applying VEX data,
//! patching component fields, amending commonly missing metadata, and
//! preparing an internal document for publication. It powers a
//! command-line interface and is usable as a library.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: Typed view of a CycloneDX JSON document. Unknown
//!   fields are preserved through a read, edit and write cycle.
//! - **[`identity`]**: Component identity built from CPE, PURL, SWID and
//!   name coordinates. Two components are the same when any shared kind
//!   of key matches; the relation is deliberately not transitive and
//!   components without identifiers never match anything.
//! - **[`merge`]**: Merges documents left to right. Duplicate components
//!   are dropped and their bom-refs rewritten document-wide so that
//!   dependencies, compositions and vulnerabilities stay consistent.
//! - **[`versions`]**: Version ranges like `semver/>=1.2.0|<2.0.0`, with
//!   calendar versions and caller-registered custom schemes.
//! - **[`set`]**: Targeted field updates driven by an update list.
//! - **[`amend`]**: Composable metadata enhancements.
//! - **[`publish`]**: Builds the public variant of an internal document.
//! - **[`validate`]**: Plausibility checks for cross-references and the
//!   dependency graph.
//!
//! ## Getting Started: Merging two documents
//!
//! ```no_run
//! use cdx_edit::io::read_sbom;
//! use cdx_edit::merge::merge;
//! use std::path::Path;
//!
//! fn main() -> cdx_edit::Result<()> {
//!     let governing = read_sbom(Path::new("product.cdx.json"))?;
//!     let addition = read_sbom(Path::new("firmware.cdx.json"))?;
//!     let merged = merge(vec![governing, addition], false)?;
//!     println!("{} components", merged.components.map_or(0, |c| c.len()));
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod amend;
pub mod cli;
pub mod error;
pub mod identity;
pub mod io;
pub mod merge;
pub mod model;
pub mod publish;
pub mod refs;
pub mod set;
pub mod validate;
pub mod versions;

pub use error::{EditorError, Result};
pub use identity::{ComponentIdentity, Coordinates, Key};
pub use model::{Component, Sbom};
pub use versions::{SchemeRegistry, VersionRange};
