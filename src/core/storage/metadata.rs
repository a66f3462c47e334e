//! Per-workspace index locations and build metadata.
//!
//! Each workspace root maps to a stable key derived from its
//! canonical path. The key names both the engine snapshot and a
//! small JSON sidecar recording what the last successful build
//! produced.
//!
//! ```text
//! {index_dir}/
//! ├── {key}.json        # Engine snapshot
//! └── {key}.meta.json   # Build metadata
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::config::IndexOptions;
use crate::core::error::Result;

/// Current metadata format
pub const METADATA_VERSION: u32 = 1;

/// Hex digits of the root digest used as the workspace key
const KEY_HEX_LEN: usize = 16;

/// Metadata written after every successful build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    pub workspace_root: PathBuf,
    pub file_count: usize,
    pub document_count: usize,
    pub last_build_time: DateTime<Utc>,
    pub options: IndexOptions,
    pub format_version: u32,
}

/// Stable key for a workspace root
///
/// First 16 hex digits of the SHA-256 of the root path. Callers
/// pass the canonical path so equivalent spellings share a key.
pub fn workspace_key(root: &Path) -> String {
    let digest = Sha256::digest(root.to_string_lossy().as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..KEY_HEX_LEN].to_string()
}

/// On-disk locations for one workspace's index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub index_file: PathBuf,
    pub meta_file: PathBuf,
}

impl IndexPaths {
    /// Locations for `root` under `index_dir`
    pub fn for_workspace(index_dir: &Path, root: &Path) -> Self {
        let key = workspace_key(root);
        Self {
            index_file: index_dir.join(format!("{key}.json")),
            meta_file: index_dir.join(format!("{key}.meta.json")),
        }
    }

    /// Create the directory holding the index files
    pub fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.index_file.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Read the metadata sidecar, `None` if it does not exist
    pub fn read_metadata(&self) -> Result<Option<BuildMetadata>> {
        let contents = match fs::read_to_string(&self.meta_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata: BuildMetadata = serde_json::from_str(&contents)?;
        Ok(Some(metadata))
    }

    /// Write the metadata sidecar
    pub fn write_metadata(&self, metadata: &BuildMetadata) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&self.meta_file, json)?;
        Ok(())
    }

    /// Delete the snapshot and sidecar; missing files are fine
    pub fn remove_files(&self) -> Result<()> {
        for path in [&self.index_file, &self.meta_file] {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed {:?}", path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
