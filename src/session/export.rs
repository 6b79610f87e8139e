//! JSON export of session state.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

use crate::api::CloudApi;

use super::VpcSession;

const JSON_EXTENSION: &str = ".json";
const JSON_INDENT: &[u8] = b"    ";

/// Errors raised while exporting session state.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when state cannot be rendered as JSON.
    #[error("failed to serialize session state: {message}")]
    Serialize {
        /// Serializer error message.
        message: String,
    },
}

impl<A: CloudApi> VpcSession<A> {
    /// Builds the fixed-field export document without touching disk.
    ///
    /// The top-level keys are exactly: `cidr_block`, `config`, `dry_run`,
    /// `owner_id`, `peering_connections`, `region`, `route_tables`,
    /// `subnets`, `vpc_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialize`] when state cannot be rendered.
    pub fn export_document(&self) -> Result<Value, ExportError> {
        let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
        fields.insert("config", to_value(&self.config)?);
        fields.insert("dry_run", Value::Bool(self.config.dry_run.enabled()));
        fields.insert("region", Value::String(self.region.clone()));
        fields.insert("vpc_id", Value::String(self.vpc_id.clone()));
        fields.insert("owner_id", Value::String(self.owner_id.clone()));
        fields.insert("cidr_block", Value::String(self.cidr_block.clone()));
        fields.insert("route_tables", to_value(&self.route_tables)?);
        fields.insert("subnets", to_value(&self.subnets)?);
        fields.insert("peering_connections", to_value(&self.peering)?);
        to_value(&fields)
    }

    /// Writes the export document to `<log_path>/<name>.json`, creating the
    /// directory when missing and appending the `.json` extension unless
    /// `name` already carries it. An existing file is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialize`] when state cannot be rendered and
    /// [`ExportError::Io`] when the directory or file cannot be written.
    pub fn export_to_file(&self, name: &str) -> Result<Utf8PathBuf, ExportError> {
        let document = self.export_document()?;
        let rendered = render_pretty(&document)?;

        let file_name = if name.ends_with(JSON_EXTENSION) {
            name.to_owned()
        } else {
            format!("{name}{JSON_EXTENSION}")
        };
        let directory = self.config.log_path.clone();
        let path = directory.join(&file_name);
        tracing::info!(path = %path, "exporting session state");

        Dir::create_ambient_dir_all(&directory, ambient_authority()).map_err(|err| {
            ExportError::Io {
                path: directory.clone(),
                message: err.to_string(),
            }
        })?;
        let dir = open_dir(&directory)?;
        dir.write(&file_name, rendered).map_err(|err| ExportError::Io {
            path: path.clone(),
            message: err.to_string(),
        })?;
        Ok(path)
    }
}

fn open_dir(directory: &Utf8Path) -> Result<Dir, ExportError> {
    Dir::open_ambient_dir(directory, ambient_authority()).map_err(|err| ExportError::Io {
        path: directory.to_path_buf(),
        message: err.to_string(),
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ExportError> {
    serde_json::to_value(value).map_err(|err| ExportError::Serialize {
        message: err.to_string(),
    })
}

fn render_pretty(document: &Value) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|err| ExportError::Serialize {
            message: err.to_string(),
        })?;
    Ok(buffer)
}
