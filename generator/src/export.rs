//! Writing the generated document.

use std::path::Path;

use crate::error::ExportError;
use crate::logs::log_success;
use crate::models::Spec;

/// Serialize `spec` to UTF-8 JSON at `path`. The parent directory must exist.
pub fn export_spec_to_json<P: AsRef<Path>>(
    spec: &Spec,
    path: P,
    pretty: bool,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(ExportError::MissingDirectory(parent.display().to_string()));
        }
    }

    let json = spec.to_json(pretty)?;
    std::fs::write(path, json).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    log_success(format!("Spec written to {}", path.display()));
    Ok(())
}
