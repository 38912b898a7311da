//! Reading and writing SBOM files.
//!
//! Input is JSON only. XML is the other CycloneDX serialization but this
//! tool does not read it; the error says so instead of failing with a
//! parse error. Writing stamps fresh document metadata unless the caller
//! opts out.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{EditorError, Result};
use crate::model::{Metadata, Sbom};

const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
const TOOL_VENDOR: &str = "cdx-edit contributors";

/// Load an SBOM from a JSON file.
pub fn read_sbom(path: &Path) -> Result<Sbom> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default();
    if extension.eq_ignore_ascii_case("xml") {
        return Err(EditorError::input_file(
            "XML input is not supported",
            "Convert the document to CycloneDX JSON first.",
            Some(path.to_path_buf()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(|source| EditorError::io(path, source))?;
    // tolerate a UTF-8 byte order mark
    let raw = raw.trim_start_matches('\u{feff}');
    serde_json::from_str(raw).map_err(|e| {
        EditorError::input_file(
            "invalid JSON",
            format!("The input is not a well-formed CycloneDX JSON document: {e}."),
            Some(path.to_path_buf()),
        )
    })
}

/// Write an SBOM as pretty-printed JSON.
///
/// With no destination the document goes to stdout. A directory
/// destination gets a generated filename. With `update_metadata` the
/// document receives a fresh serial number, an incremented version, the
/// current timestamp and a tools entry for this tool.
pub fn write_sbom(sbom: &mut Sbom, destination: Option<&Path>, update_metadata: bool) -> Result<()> {
    if update_metadata {
        update_serial_number(sbom);
        update_version(sbom);
        update_timestamp(sbom);
        update_tools(sbom);
    }

    let Some(destination) = destination else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, sbom)?;
        writeln!(handle).map_err(|source| EditorError::io(Path::new("<stdout>"), source))?;
        return Ok(());
    };

    let destination = resolve_destination(destination, sbom)?;
    let file = fs::File::create(&destination)
        .map_err(|source| EditorError::io(&destination, source))?;
    serde_json::to_writer_pretty(file, sbom)?;
    Ok(())
}

fn resolve_destination(destination: &Path, sbom: &Sbom) -> Result<PathBuf> {
    if destination.is_dir() {
        let filename = generate_filename(sbom);
        info!("writing output to {filename}");
        return Ok(destination.join(filename));
    }
    if !destination.exists() {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| EditorError::io(parent, source))?;
            }
        }
    }
    Ok(destination.to_path_buf())
}

/// Filename derived from the document's own metadata:
/// `<name>[_<version>]_<timestamp>.cdx.json`, or `bom.json` when the
/// metadata offers nothing to name the file after.
#[must_use]
pub fn generate_filename(sbom: &Sbom) -> String {
    let metadata = sbom.metadata.as_ref();
    let component = metadata.and_then(|m| m.component.as_ref());
    let name = component.and_then(|c| c.name.as_deref());
    let version = component.and_then(|c| c.version.as_deref());
    let timestamp = metadata.and_then(|m| m.timestamp.as_deref());

    if name.is_none() && version.is_none() && timestamp.is_none() {
        return "bom.json".to_string();
    }

    let timestamp = timestamp
        .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
        .map(|stamp| stamp.with_timezone(&Utc))
        .unwrap_or_else(|| {
            info!("document has no usable timestamp, using the current time in the filename");
            Utc::now()
        });

    let mut parts = vec![name.unwrap_or("unknown").to_string()];
    if let Some(version) = version {
        parts.push(version.to_string());
    }
    parts.push(timestamp.format("%Y%m%dT%H%M%S").to_string());
    format!("{}.cdx.json", parts.join("_"))
}

fn update_serial_number(sbom: &mut Sbom) {
    sbom.serial_number = Some(format!("urn:uuid:{}", Uuid::new_v4()));
}

fn update_version(sbom: &mut Sbom) {
    sbom.version = Some(sbom.version.unwrap_or(0) + 1);
}

fn update_timestamp(sbom: &mut Sbom) {
    let metadata = sbom.metadata.get_or_insert_with(Metadata::default);
    metadata.timestamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false));
}

/// Record this tool in `metadata.tools`. From CycloneDX 1.5 on the tools
/// field is an object holding component entries, before that a plain list.
fn update_tools(sbom: &mut Sbom) {
    let object_shape = sbom.spec_version_at_least(1, 5);
    let metadata = sbom.metadata.get_or_insert_with(Metadata::default);

    let tools = metadata.tools.get_or_insert_with(|| {
        if object_shape {
            json!({})
        } else {
            json!([])
        }
    });

    let (entries, entry) = match tools {
        Value::Object(object) => {
            let components = object
                .entry("components")
                .or_insert_with(|| json!([]));
            let entry = json!({
                "type": "application",
                "name": TOOL_NAME,
                "publisher": TOOL_VENDOR,
                "version": TOOL_VERSION,
            });
            (components.as_array_mut(), entry)
        }
        Value::Array(_) => {
            let entry = json!({
                "name": TOOL_NAME,
                "vendor": TOOL_VENDOR,
                "version": TOOL_VERSION,
            });
            (tools.as_array_mut(), entry)
        }
        _ => (None, Value::Null),
    };

    if let Some(entries) = entries {
        let already_listed = entries.iter().any(|tool| {
            tool.get("name").and_then(Value::as_str) == Some(TOOL_NAME)
                && tool.get("version").and_then(Value::as_str) == Some(TOOL_VERSION)
        });
        if !already_listed {
            entries.push(entry);
        }
    }
}
