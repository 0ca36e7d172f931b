//! Delivery packaging: scoped working directory, metadata sidecar,
//! flat zip archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{OutputError, Result};

/// A uniquely named working directory for one in-flight delivery.
///
/// The directory is created empty and never reused: finding an existing
/// path with the same name is a collision error, not an overwrite.
#[derive(Debug)]
pub struct OutputBundle {
    request_id: Uuid,
    workdir: PathBuf,
}

impl OutputBundle {
    /// Create the working directory `{prefix}_{request_id}` under
    /// `parent`.
    pub fn create(parent: &Path, prefix: &str, request_id: Uuid) -> Result<Self> {
        let workdir = parent.join(format!("{}_{}", prefix, request_id));
        match fs::create_dir(&workdir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(OutputError::path_collision(workdir.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        debug!(dir = %workdir.display(), "created delivery workdir");
        Ok(Self {
            request_id,
            workdir,
        })
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Where output files for this delivery are written.
    pub fn dir(&self) -> &Path {
        &self.workdir
    }

    /// Write the pretty-printed metadata sidecar, named by request id,
    /// and return its path.
    pub fn write_sidecar(&self, metadata: &serde_json::Value) -> Result<PathBuf> {
        let path = self.workdir.join(format!("{}.json", self.request_id));
        fs::write(&path, serde_json::to_vec_pretty(metadata)?)?;
        Ok(path)
    }

    /// Package the sidecar and the data files into `archive_path`. The
    /// sidecar enters under the fixed name `metadata.json`; data files
    /// enter flat, under their base names.
    pub fn write_archive(
        &self,
        archive_path: &Path,
        sidecar: &Path,
        files: &[PathBuf],
    ) -> Result<()> {
        if archive_path.exists() {
            return Err(OutputError::path_collision(
                archive_path.display().to_string(),
            ));
        }

        let mut archive = ZipWriter::new(File::create(archive_path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        archive.start_file("metadata.json", options)?;
        archive.write_all(&fs::read(sidecar)?)?;

        for path in files {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| OutputError::bad_file_name(path.display().to_string()))?;
            archive.start_file(name, options)?;
            archive.write_all(&fs::read(path)?)?;
        }
        archive.finish()?;
        debug!(archive = %archive_path.display(), files = files.len(), "wrote delivery archive");
        Ok(())
    }

    /// Remove the working directory and everything in it.
    pub fn cleanup(self) -> Result<()> {
        fs::remove_dir_all(&self.workdir)?;
        Ok(())
    }
}
