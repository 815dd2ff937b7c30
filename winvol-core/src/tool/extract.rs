//! Extraction of the embedded tool to a runnable on-disk location.
//!
//! The payload is copied to a uniquely named file in the OS temp
//! directory exactly once, at facade construction. The file is deleted
//! when the handle is dropped; deletion is best-effort and a failure is
//! only logged.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, error, info};

use super::resource::ToolResource;
use crate::error::VolumeError;

// ============================================================================
// Extracted Tool
// ============================================================================

/// Handle to the extracted tool executable.
///
/// Owns the temp file for its whole lifetime; dropping the handle removes
/// the file from disk.
#[derive(Debug)]
pub struct ExtractedTool {
    path: PathBuf,
    temp: Option<TempPath>,
    verbose: bool,
}

impl ExtractedTool {
    /// Copies the payload byte-for-byte into a fresh uniquely named temp
    /// file and marks it executable.
    ///
    /// # Errors
    ///
    /// Returns `ResourceMissing` if the payload is empty (the binary was
    /// not vendored into this build), or an IO error if the temp file
    /// cannot be created or written.
    pub fn extract(resource: &ToolResource<'_>, verbose: bool) -> Result<Self, VolumeError> {
        if resource.is_empty() {
            return Err(VolumeError::ResourceMissing {
                name: resource.name.to_string(),
            });
        }

        let stem = Path::new(resource.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tool");

        let prefix = format!("{}-", stem);
        let suffix = Path::new(resource.name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| format!(".{}", ext));

        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        if let Some(suffix) = &suffix {
            builder.suffix(suffix);
        }

        let mut file = builder.tempfile()?;
        file.write_all(resource.bytes)?;
        file.flush()?;

        let temp = file.into_temp_path();
        let path = temp.to_path_buf();

        make_executable(&path)?;

        if verbose {
            info!("Extracted {} to {}", resource.name, path.display());
        }

        Ok(Self {
            path,
            temp: Some(temp),
            verbose,
        })
    }

    /// Absolute path of the extracted executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the extracted file still exists on disk.
    pub fn is_available(&self) -> bool {
        self.path.exists()
    }
}

impl Drop for ExtractedTool {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            if let Err(e) = temp.close() {
                error!(
                    "Failed to delete extracted tool {}: {}",
                    self.path.display(),
                    e
                );
            } else if self.verbose {
                debug!("Deleted extracted tool {}", self.path.display());
            }
        }
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
fn make_executable(path: &Path) -> Result<(), VolumeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_resource_missing() {
        let resource = ToolResource::new("nircmd.exe", b"");
        let err = ExtractedTool::extract(&resource, false).unwrap_err();
        assert!(matches!(
            err,
            VolumeError::ResourceMissing { name } if name == "nircmd.exe"
        ));
    }

    #[test]
    fn test_extract_writes_payload() {
        let resource = ToolResource::new("nircmd.exe", b"MZ fake payload");
        let tool = ExtractedTool::extract(&resource, false).unwrap();

        assert!(tool.is_available());
        let name = tool.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("nircmd-"));
        assert!(name.ends_with(".exe"));

        let written = std::fs::read(tool.path()).unwrap();
        assert_eq!(written, b"MZ fake payload");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_sets_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let resource = ToolResource::new("fake", b"#!/bin/sh\nexit 0\n");
        let tool = ExtractedTool::extract(&resource, false).unwrap();

        let mode = std::fs::metadata(tool.path()).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_drop_deletes_file() {
        let resource = ToolResource::new("nircmd.exe", b"payload");
        let tool = ExtractedTool::extract(&resource, false).unwrap();
        let path = tool.path().to_path_buf();

        assert!(path.exists());
        drop(tool);
        assert!(!path.exists());
    }

    #[test]
    fn test_two_extractions_do_not_collide() {
        let resource = ToolResource::new("nircmd.exe", b"payload");
        let a = ExtractedTool::extract(&resource, false).unwrap();
        let b = ExtractedTool::extract(&resource, false).unwrap();

        assert_ne!(a.path(), b.path());
        drop(a);
        assert!(b.is_available());
    }
}
