use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::StampProvider;

/// Version of a file: last-modified time and byte length.
///
/// A missing or unreadable file stamps as `{ modified: None, len: 0 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    /// Stamp of a file that does not exist.
    pub const fn missing() -> Self {
        Self {
            modified: None,
            len: 0,
        }
    }

    /// Stat `path` and build its stamp.
    pub fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self {
                modified: meta.modified().ok(),
                len: meta.len(),
            },
            Err(_) => Self::missing(),
        }
    }
}

/// Flush/sync strategy applied when a save completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every commit (safest, highest latency).
    EveryCommit,
    /// Flush to the OS and rely on its page cache.
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::OsDefault
    }
}

/// Configuration for a [`FileStampProvider`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Create missing parent directories before writing.
    pub create_dirs: bool,
    /// Sync strategy on commit.
    pub sync_mode: SyncMode,
    /// Unix permission bits applied to the file on every write, e.g. `0o644`
    /// so other processes can read the document. Ignored on other platforms.
    pub permissions: Option<u32>,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            create_dirs: true,
            sync_mode: SyncMode::default(),
            permissions: None,
        }
    }
}

/// [`StampProvider`] backed by a single filesystem path.
///
/// The stamp is re-read with a `stat` on every call and never cached;
/// callers that poll `reload()` in a tight loop should rate-limit.
#[derive(Clone, Debug)]
pub struct FileStampProvider {
    path: PathBuf,
    config: FileProviderConfig,
}

impl FileStampProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, FileProviderConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: FileProviderConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Path to the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FileProviderConfig {
        &self.config
    }

    #[cfg(unix)]
    fn apply_permissions(&self, file: &File) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(mode) = self.config.permissions {
            file.set_permissions(fs::Permissions::from_mode(mode))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_permissions(&self, _file: &File) -> io::Result<()> {
        if self.config.permissions.is_some() {
            debug!(path = %self.path.display(), "permission bits ignored on this platform");
        }
        Ok(())
    }
}

impl StampProvider for FileStampProvider {
    type Stamp = FileStamp;
    type Reader = BufReader<File>;
    type Writer = BufWriter<File>;

    fn current_stamp(&self) -> FileStamp {
        FileStamp::of(&self.path)
    }

    fn open_input(&self) -> io::Result<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.path)?))
    }

    fn open_output(&self) -> io::Result<BufWriter<File>> {
        if self.config.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        self.apply_permissions(&file)?;

        debug!(path = %self.path.display(), "opened document for writing");
        Ok(BufWriter::new(file))
    }

    fn finish_output(&self, writer: BufWriter<File>) -> io::Result<()> {
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if matches!(self.config.sync_mode, SyncMode::EveryCommit) {
            file.sync_all()?;
        }
        Ok(())
    }
}
