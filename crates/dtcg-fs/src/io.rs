//! Raw file reads and atomic writes

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read a file as UTF-8 text.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write `content` to `path` so readers never observe a partial file.
///
/// The bytes go to a locked sibling temp file which is synced and then
/// renamed over the target. On failure the temp file is removed and the
/// target is left untouched.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut staged = StagedFile::create(&target)?;
    staged.write(content)?;
    staged.persist()?;
    tracing::debug!(path = %path, bytes = content.len(), "Wrote file");
    Ok(())
}

/// Sibling temp file, removed on drop unless persisted.
struct StagedFile {
    target: PathBuf,
    temp: PathBuf,
    file: Option<File>,
}

impl StagedFile {
    fn create(target: &Path) -> Result<Self> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = target.with_file_name(format!(".{name}.{}.tmp", std::process::id()));

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
            .map_err(|e| Error::io(&temp, e))?;
        file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: target.to_path_buf(),
        })?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            file: Some(file),
        })
    }

    fn write(&mut self, content: &[u8]) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(content)
                .and_then(|()| file.sync_all())
                .map_err(|e| Error::io(&self.temp, e))?;
        }
        Ok(())
    }

    fn persist(mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.unlock().map_err(|_| Error::LockFailed {
                path: self.target.clone(),
            })?;
        }
        fs::rename(&self.temp, &self.target).map_err(|e| Error::io(&self.target, e))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Lock is released when the handle closes.
        self.file.take();
        if self.temp.exists() {
            let _ = fs::remove_file(&self.temp);
        }
    }
}
