use crate::error::{Error, Result};
use crate::model::FileRecord;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Walk `root` recursively without following symlinks, yielding a record for
/// every regular file. Symlinks, sockets, FIFOs and devices are skipped.
///
/// Entries are visited in file-name order within each directory.
pub fn regular_files(root: &Path) -> impl Iterator<Item = Result<FileRecord>> + '_ {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry_result| {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    let source = err.into_io_error().unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, "filesystem loop detected")
                    });
                    return Some(Err(Error::scan(path, source)));
                }
            };

            if !entry.file_type().is_file() {
                return None;
            }

            let record = entry
                .metadata()
                .map_err(io::Error::from)
                .and_then(|metadata| FileRecord::from_metadata(entry.path().to_path_buf(), &metadata))
                .map_err(|err| Error::scan(entry.path(), err));
            Some(record)
        })
}
