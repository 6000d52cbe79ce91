// One JSON document per session: <root>/<session_id>/clusters.json
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::store::{ClusterStore, SavedClusterState, SessionKey, StoreError};

pub const DOCUMENT_NAME: &str = "clusters.json";

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a session's document.
    pub fn document_path(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        let key = SessionKey::sanitize(session_id)?;
        Ok(self.root.join(key).join(DOCUMENT_NAME))
    }
}

impl ClusterStore for JsonDirStore {
    fn load(&self, session_id: &str) -> Result<Option<SavedClusterState>, StoreError> {
        let path = self.document_path(session_id)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        SavedClusterState::from_json(&json).map(Some)
    }

    fn save(&self, session_id: &str, state: &SavedClusterState) -> Result<(), StoreError> {
        let path = self.document_path(session_id)?;
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        // Each write gets its own temp file beside the target, then an atomic
        // rename, so concurrent saves never share a path and readers never see
        // a partial document.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(state.to_json()?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(session = session_id, path = %path.display(), "saved cluster document");
        Ok(())
    }
}
