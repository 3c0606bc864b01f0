use crate::hasher;
use crate::permissions;
use crate::platform;
use std::cell::OnceCell;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file discovered during scanning.
///
/// Records describe the filesystem at scan time only; every phase scans again
/// so that paths removed or renamed by earlier phases are never reused.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
    permissions: String,
    content_hash: OnceCell<blake3::Hash>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, modified: SystemTime, mode: u32) -> Self {
        Self {
            path,
            size,
            modified,
            permissions: permissions::octal_to_symbolic(mode),
            content_hash: OnceCell::new(),
        }
    }

    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> io::Result<Self> {
        Ok(Self::new(
            path,
            metadata.len(),
            metadata.modified()?,
            platform::mode_bits(metadata),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Permission bits as a 9-character `rwxrwxrwx` string.
    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    /// BLAKE3 digest of the full contents, read on first use.
    pub fn content_hash(&self) -> io::Result<blake3::Hash> {
        if let Some(hash) = self.content_hash.get() {
            return Ok(*hash);
        }
        let hash = hasher::full_hash(&self.path)?;
        Ok(*self.content_hash.get_or_init(|| hash))
    }
}

/// Two or more files that share a grouping key, in presentation order.
#[derive(Debug, Clone)]
pub struct FileGroup {
    members: Vec<FileRecord>,
}

impl FileGroup {
    /// Returns `None` for fewer than two members.
    pub fn new(members: Vec<FileRecord>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        Some(Self { members })
    }

    pub fn members(&self) -> &[FileRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Something the operator is asked to resolve.
#[derive(Debug, Clone)]
pub enum Finding {
    Empty(FileRecord),
    Temporary(FileRecord),
    ProblematicName(FileRecord),
    UnusualPermissions(FileRecord),
    DuplicateGroup { digest: blake3::Hash, group: FileGroup },
    RepeatedNameGroup { name: String, group: FileGroup },
}

impl Finding {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Empty(record)
            | Self::Temporary(record)
            | Self::ProblematicName(record)
            | Self::UnusualPermissions(record) => vec![record.path()],
            Self::DuplicateGroup { group, .. } | Self::RepeatedNameGroup { group, .. } => {
                group.members().iter().map(FileRecord::path).collect()
            }
        }
    }
}
