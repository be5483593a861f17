use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Collections, StoreError};

/// JSON file holding every collection, rewritten after each mutation.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot; a missing file is an empty database.
    pub(crate) fn load(&self) -> Result<Collections, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Collections::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Collections::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes to a sibling temp file and renames it over the snapshot.
    pub(crate) fn write(&self, collections: &Collections) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(collections)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
