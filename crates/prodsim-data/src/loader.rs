//! Load and save network documents.
//!
//! Provides format detection (RON/JSON/TOML), parsing into a
//! [`NetworkDocument`], construction through [`GraphBuilder`] and the
//! reverse walk from a running [`Simulation`] back to a document.

use crate::schema::NetworkDocument;
use prodsim_core::builder::{BuildError, GraphBuilder};
use prodsim_core::network::Network;
use prodsim_core::sim::Simulation;
use std::fmt;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or saving a network document.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The document couldn't be written in the requested format.
    #[error("can't write {format} document: {detail}")]
    Serialize { format: Format, detail: String },

    /// The document parsed but doesn't describe a valid network.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Ron => "RON",
            Format::Toml => "TOML",
            Format::Json => "JSON",
        })
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Reading
// ===========================================================================

/// Parse `content` as a document. `origin` only labels parse errors.
pub fn parse_document(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<NetworkDocument, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and parse it according to its extension.
pub fn read_document(path: &Path) -> Result<NetworkDocument, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, format, path)
}

/// Build a network from a parsed document, using the document's settings.
pub fn build_network(document: NetworkDocument) -> Result<Network, DataLoadError> {
    let (config, records) = document.into_parts();
    Ok(GraphBuilder::with_config(config).build(&records)?)
}

/// Read, parse and build the network described by the file at `path`.
pub fn load_network(path: &Path) -> Result<Network, DataLoadError> {
    build_network(read_document(path)?)
}

// ===========================================================================
// Writing
// ===========================================================================

/// Capture a simulation's network, including its current backlogs.
///
/// Fails when two different parts share a name, as the document couldn't
/// be loaded back.
pub fn document_from(sim: &Simulation) -> Result<NetworkDocument, DataLoadError> {
    Ok(NetworkDocument::new(sim.config(), sim.to_records()?))
}

/// Render a document in `format`.
pub fn to_string(document: &NetworkDocument, format: Format) -> Result<String, DataLoadError> {
    let ser_err = |detail: String| DataLoadError::Serialize { format, detail };
    match format {
        Format::Ron => ron::ser::to_string_pretty(document, ron::ser::PrettyConfig::default())
            .map_err(|e| ser_err(e.to_string())),
        Format::Json => serde_json::to_string_pretty(document).map_err(|e| ser_err(e.to_string())),
        Format::Toml => toml::to_string_pretty(document).map_err(|e| ser_err(e.to_string())),
    }
}

/// Write the simulation's network to `path` in the format its extension
/// names.
pub fn save_network(sim: &Simulation, path: &Path) -> Result<(), DataLoadError> {
    let format = detect_format(path)?;
    let content = to_string(&document_from(sim)?, format)?;
    std::fs::write(path, content)?;
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
