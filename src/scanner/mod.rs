mod walk;

use crate::config::non_overlapping_directories;
use crate::error::{Error, Result};
use crate::model::FileRecord;
use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use walk::regular_files;

/// The set of directory trees a run works on.
#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
}

impl Scanner {
    /// Resolve `main_dir` and `directories` to absolute paths.
    ///
    /// Roots nested inside (or equal to) another root are dropped so that no
    /// file is reported twice. Fails if any root is missing or not a directory.
    pub fn new<P: AsRef<Path>>(main_dir: &Path, directories: &[P]) -> Result<Self> {
        let mut canonical = Vec::with_capacity(directories.len() + 1);
        for dir in iter::once(main_dir).chain(directories.iter().map(|d| d.as_ref())) {
            canonical.push(canonical_dir(dir)?);
        }

        let roots: Vec<PathBuf> = non_overlapping_directories(&canonical)
            .into_iter()
            .map(Path::to_path_buf)
            .collect();
        debug!("Scanning roots: {:?}", roots);

        Ok(Self { roots })
    }

    /// Lazily walk every root in order, yielding regular files only.
    pub fn files(&self) -> impl Iterator<Item = Result<FileRecord>> + '_ {
        self.roots.iter().flat_map(|root| regular_files(root))
    }
}

pub(crate) fn canonical_dir(dir: &Path) -> Result<PathBuf> {
    let path = fs::canonicalize(dir).map_err(|err| Error::scan(dir, err))?;
    if !path.is_dir() {
        return Err(Error::scan(
            dir,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    Ok(path)
}
