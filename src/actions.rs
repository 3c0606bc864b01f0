use crate::error::{Error, Result};
use crate::model::{FileGroup, FileRecord};
use crate::permissions;
use crate::platform;
use crate::scanner::{self, regular_files};
use std::fmt;
use std::fs::{self, FileTimes};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

impl TransferMode {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
        }
    }
}

/// The result of one filesystem mutation, displayed to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
    RenameSkipped { from: PathBuf, to: PathBuf },
    PermissionsChanged { path: PathBuf, permissions: String },
    Transferred { mode: TransferMode, from: PathBuf, to: PathBuf },
    TransferSkipped { from: PathBuf, to: PathBuf },
}

impl Outcome {
    /// Whether the filesystem was changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::RenameSkipped { .. } | Self::TransferSkipped { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted(path) => write!(f, "Deleted: {}", path.display()),
            Self::Renamed { from, to } => {
                write!(f, "Renamed: {} -> {}", from.display(), to.display())
            }
            Self::RenameSkipped { from, to } => write!(
                f,
                "Not renaming {}: {} already exists",
                from.display(),
                to.display()
            ),
            Self::PermissionsChanged { path, permissions } => write!(
                f,
                "Changed permissions for file {} to {}",
                path.display(),
                permissions
            ),
            Self::Transferred { mode, from, to } => write!(
                f,
                "{} file from: {} to: {}",
                mode.past_tense(),
                from.display(),
                to.display()
            ),
            Self::TransferSkipped { from, to } => write!(
                f,
                "Not transferring {}: {} already exists",
                from.display(),
                to.display()
            ),
        }
    }
}

pub fn delete_file(path: &Path) -> Result<Outcome> {
    fs::remove_file(path).map_err(|e| Error::action("delete", path, e))?;
    debug!("Deleted {}", path.display());
    Ok(Outcome::Deleted(path.to_path_buf()))
}

/// Replace every problematic character with `replacement`, one configured
/// character at a time in configured order.
pub fn sanitize_file_name(name: &str, problematic: &[char], replacement: char) -> String {
    let replacement = replacement.to_string();
    problematic.iter().fold(name.to_string(), |name, c| {
        name.replace(*c, &replacement)
    })
}

/// A proposed rename inside the file's own directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl RenamePlan {
    pub fn new_name(&self) -> String {
        self.to
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Work out the sanitised path for `record`. Returns `None` when the name is
/// not valid UTF-8 or sanitising leaves it unchanged.
pub fn plan_rename(record: &FileRecord, problematic: &[char], replacement: char) -> Option<RenamePlan> {
    let name = record.file_name().to_str()?;
    let new_name = sanitize_file_name(name, problematic, replacement);
    if new_name == name {
        return None;
    }
    Some(RenamePlan {
        from: record.path().to_path_buf(),
        to: record.path().with_file_name(new_name),
    })
}

/// Perform a rename, refusing to replace an existing file.
pub fn apply_rename(plan: &RenamePlan) -> Result<Outcome> {
    if occupied(&plan.to) {
        return Ok(Outcome::RenameSkipped {
            from: plan.from.clone(),
            to: plan.to.clone(),
        });
    }
    fs::rename(&plan.from, &plan.to).map_err(|e| Error::action("rename", &plan.from, e))?;
    Ok(Outcome::Renamed {
        from: plan.from.clone(),
        to: plan.to.clone(),
    })
}

pub fn change_permissions(path: &Path, symbolic: &str) -> Result<Outcome> {
    let mode = permissions::symbolic_to_octal(symbolic);
    platform::set_mode(path, mode).map_err(|e| Error::action("change permissions of", path, e))?;
    Ok(Outcome::PermissionsChanged {
        path: path.to_path_buf(),
        permissions: symbolic.to_string(),
    })
}

/// Members of `group` to delete when the file at 1-based `position` is kept.
/// With no position (keep all) nothing is deleted.
pub fn members_to_delete(group: &FileGroup, position: Option<usize>) -> Vec<&Path> {
    let Some(position) = position else {
        return Vec::new();
    };
    group
        .members()
        .iter()
        .enumerate()
        .filter(|(i, _)| i + 1 != position)
        .map(|(_, member)| member.path())
        .collect()
}

/// A file to bring into the main directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// List every regular file under `source` with its destination under
/// `main_dir`, keeping the path relative to `source`.
///
/// The listing is complete before anything is moved. Files that already live
/// in `main_dir` (because it sits inside `source`) are left out.
pub fn plan_transfers(main_dir: &Path, source: &Path) -> Result<Vec<Transfer>> {
    let main_dir = scanner::canonical_dir(main_dir)?;
    let source = scanner::canonical_dir(source)?;
    if source == main_dir {
        return Ok(Vec::new());
    }

    let mut transfers = Vec::new();
    for record in regular_files(&source) {
        let record = record?;
        let from = record.path();
        if main_dir.starts_with(&source) && from.starts_with(&main_dir) {
            continue;
        }
        let Ok(relative) = from.strip_prefix(&source) else {
            continue;
        };
        transfers.push(Transfer {
            from: from.to_path_buf(),
            to: main_dir.join(relative),
        });
    }
    Ok(transfers)
}

pub fn transfer(item: &Transfer, mode: TransferMode) -> Result<Outcome> {
    if occupied(&item.to) {
        return Ok(Outcome::TransferSkipped {
            from: item.from.clone(),
            to: item.to.clone(),
        });
    }
    if let Some(parent) = item.to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::action("create directory", parent, e))?;
    }

    match mode {
        TransferMode::Copy => copy_with_metadata(&item.from, &item.to)?,
        TransferMode::Move => {
            if let Err(err) = fs::rename(&item.from, &item.to) {
                debug!(
                    "Rename of {} failed ({}), copying instead",
                    item.from.display(),
                    err
                );
                copy_with_metadata(&item.from, &item.to)?;
                fs::remove_file(&item.from).map_err(|e| Error::action("delete", &item.from, e))?;
            }
        }
    }

    Ok(Outcome::Transferred {
        mode,
        from: item.from.clone(),
        to: item.to.clone(),
    })
}

/// True if anything, including a dangling symlink, sits at `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Copy contents and permissions, then carry over access and modification times.
fn copy_with_metadata(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).map_err(|e| Error::action("read", from, e))?;
    fs::copy(from, to).map_err(|e| Error::action("copy", from, e))?;

    let mut times = FileTimes::new().set_modified(
        metadata
            .modified()
            .map_err(|e| Error::action("read", from, e))?,
    );
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    fs::File::open(to)
        .and_then(|file| file.set_times(times))
        .map_err(|e| Error::action("set times of", to, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn record_for(path: &Path) -> FileRecord {
        FileRecord::from_metadata(path.to_path_buf(), &fs::metadata(path).unwrap()).unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        let problematic = [';', '\'', ','];
        let once = sanitize_file_name("a;b'c,d", &problematic, '_');
        assert_eq!(once, "a_b_c_d");
        assert_eq!(sanitize_file_name(&once, &problematic, '_'), once);
    }

    #[test]
    fn test_replacement_is_not_re_escaped() {
        // ';' becomes '#', which is itself replaced later in the list.
        assert_eq!(sanitize_file_name("a;b", &[';', '#'], '#'), "a#b");
        assert_eq!(sanitize_file_name("a;b", &['#', ';'], '#'), "a#b");
    }

    #[test]
    fn test_rename_stays_in_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bad;name.txt");
        fs::write(&path, "x").unwrap();

        let plan = plan_rename(&record_for(&path), &[';'], '_').unwrap();
        assert_eq!(plan.new_name(), "bad_name.txt");
        let outcome = apply_rename(&plan).unwrap();
        assert!(outcome.is_applied());
        assert!(!path.exists());
        assert!(tmp.path().join("bad_name.txt").exists());
    }

    #[test]
    fn test_rename_never_overwrites() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a;b");
        fs::write(&path, "original").unwrap();
        fs::write(tmp.path().join("a_b"), "existing").unwrap();

        let plan = plan_rename(&record_for(&path), &[';'], '_').unwrap();
        let outcome = apply_rename(&plan).unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(fs::read_to_string(tmp.path().join("a_b")).unwrap(), "existing");
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_keeps_dangling_symlink() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a;b");
        fs::write(&path, "original").unwrap();
        let link = tmp.path().join("a_b");
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), &link).unwrap();

        let plan = plan_rename(&record_for(&path), &[';'], '_').unwrap();
        let outcome = apply_rename(&plan).unwrap();
        assert!(matches!(outcome, Outcome::RenameSkipped { .. }));
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_transfer_keeps_dangling_symlink() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("source.txt");
        fs::write(&from, "data").unwrap();
        let to = tmp.path().join("dest.txt");
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), &to).unwrap();

        let item = Transfer {
            from: from.clone(),
            to: to.clone(),
        };
        let outcome = transfer(&item, TransferMode::Move).unwrap();
        assert!(matches!(outcome, Outcome::TransferSkipped { .. }));
        assert!(fs::symlink_metadata(&to).unwrap().file_type().is_symlink());
        assert!(from.exists());
    }

    #[test]
    fn test_plan_rename_without_problems() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fine.txt");
        fs::write(&path, "x").unwrap();
        assert!(plan_rename(&record_for(&path), &[';'], '_').is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_change_permissions() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("script.sh");
        fs::write(&path, "#!/bin/sh").unwrap();

        change_permissions(&path, "rwxr-x---").unwrap();
        assert_eq!(record_for(&path).permissions(), "rwxr-x---");
    }

    #[test]
    fn test_delete_missing_file_is_an_action_error() {
        let tmp = tempdir().unwrap();
        let err = delete_file(&tmp.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::Action { action: "delete", .. }));
    }

    #[test]
    fn test_members_to_delete() {
        let tmp = tempdir().unwrap();
        let paths: Vec<PathBuf> = ["1", "2", "3"].iter().map(|n| tmp.path().join(n)).collect();
        for p in &paths {
            fs::write(p, "same").unwrap();
        }
        let group = FileGroup::new(paths.iter().map(|p| record_for(p)).collect()).unwrap();

        assert!(members_to_delete(&group, None).is_empty());
        assert_eq!(
            members_to_delete(&group, Some(2)),
            vec![paths[0].as_path(), paths[2].as_path()]
        );
    }

    #[test]
    fn test_copy_preserves_relative_path_and_mtime() {
        let tmp = tempdir().unwrap();
        let main = tmp.path().join("main");
        let source = tmp.path().join("source");
        fs::create_dir_all(&main).unwrap();
        fs::create_dir_all(source.join("deep/er")).unwrap();
        let file = source.join("deep/er/file.txt");
        fs::write(&file, "payload").unwrap();
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        fs::File::options().write(true).open(&file).unwrap().set_modified(modified).unwrap();

        let plan = plan_transfers(&main, &source).unwrap();
        assert_eq!(plan.len(), 1);
        let outcome = transfer(&plan[0], TransferMode::Copy).unwrap();
        assert!(outcome.to_string().starts_with("Copied file from: "));

        let copied = main.canonicalize().unwrap().join("deep/er/file.txt");
        assert_eq!(fs::read_to_string(&copied).unwrap(), "payload");
        assert_eq!(fs::metadata(&copied).unwrap().modified().unwrap(), modified);
        assert!(file.exists());
    }

    #[test]
    fn test_move_removes_source() {
        let tmp = tempdir().unwrap();
        let main = tmp.path().join("main");
        let source = tmp.path().join("source");
        fs::create_dir_all(&main).unwrap();
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        for item in plan_transfers(&main, &source).unwrap() {
            transfer(&item, TransferMode::Move).unwrap();
        }
        assert!(!source.join("a.txt").exists());
        assert!(main.join("a.txt").exists());
    }

    #[test]
    fn test_transfer_skips_existing_destination() {
        let tmp = tempdir().unwrap();
        let main = tmp.path().join("main");
        let source = tmp.path().join("source");
        fs::create_dir_all(&main).unwrap();
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "new").unwrap();
        fs::write(main.join("a.txt"), "old").unwrap();

        let plan = plan_transfers(&main, &source).unwrap();
        let outcome = transfer(&plan[0], TransferMode::Copy).unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(fs::read_to_string(main.join("a.txt")).unwrap(), "old");
    }

    #[test]
    fn test_main_dir_inside_source_is_not_transferred() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("source");
        let main = source.join("main");
        fs::create_dir_all(&main).unwrap();
        fs::write(main.join("kept.txt"), "k").unwrap();
        fs::write(source.join("outside.txt"), "o").unwrap();

        let plan = plan_transfers(&main, &source).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].from.ends_with("outside.txt"));
    }

    #[test]
    fn test_source_inside_main_moves_files_up() {
        let tmp = tempdir().unwrap();
        let main = tmp.path().join("main");
        let source = main.join("incoming");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("x.txt"), "x").unwrap();

        let plan = plan_transfers(&main, &source).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].to, main.canonicalize().unwrap().join("x.txt"));
    }
}
