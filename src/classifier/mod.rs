//! Turning scanned files into findings.
//!
//! Predicates select single files; the grouping functions in [`groups`]
//! collect files sharing a content digest or a file name.

mod groups;

use crate::config::Config;
use crate::error::Result;
use crate::model::{FileRecord, Finding};

pub use groups::{group_by_content, group_by_name};

/// Keep the records for which `predicate` holds, in scan order.
pub fn select<I, P>(records: I, predicate: P) -> Result<Vec<FileRecord>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
    P: Fn(&FileRecord) -> bool,
{
    let mut selected = Vec::new();
    for record in records {
        let record = record?;
        if predicate(&record) {
            selected.push(record);
        }
    }
    Ok(selected)
}

pub fn is_empty(record: &FileRecord) -> bool {
    record.size() == 0
}

/// Case-sensitive suffix match on the full path.
pub fn has_temporary_extension(suffixes: &[String]) -> impl Fn(&FileRecord) -> bool + '_ {
    move |record| {
        let path = record.path().to_string_lossy();
        suffixes.iter().any(|suffix| path.ends_with(suffix.as_str()))
    }
}

pub fn has_problematic_character(characters: &[char]) -> impl Fn(&FileRecord) -> bool + '_ {
    move |record| {
        let name = record.file_name().to_string_lossy();
        name.chars().any(|c| characters.contains(&c))
    }
}

pub fn permission_mismatch(expected: &str) -> impl Fn(&FileRecord) -> bool + '_ {
    move |record| record.permissions() != expected
}

pub fn empty_files<I>(records: I) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    Ok(select(records, is_empty)?
        .into_iter()
        .map(Finding::Empty)
        .collect())
}

pub fn temporary_files<I>(records: I, config: &Config) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    let predicate = has_temporary_extension(config.temporary_file_extensions());
    Ok(select(records, predicate)?
        .into_iter()
        .map(Finding::Temporary)
        .collect())
}

pub fn problematic_names<I>(records: I, config: &Config) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    let predicate = has_problematic_character(config.problematic_characters());
    Ok(select(records, predicate)?
        .into_iter()
        .map(Finding::ProblematicName)
        .collect())
}

pub fn unusual_permissions<I>(records: I, config: &Config) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    let predicate = permission_mismatch(config.suggested_file_permissions());
    Ok(select(records, predicate)?
        .into_iter()
        .map(Finding::UnusualPermissions)
        .collect())
}
