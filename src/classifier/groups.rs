use crate::error::Result;
use crate::hasher;
use crate::model::{FileGroup, FileRecord, Finding};
use crate::progress::ProgressReporter;
use ahash::AHashMap;
use std::cmp::Reverse;
use std::ffi::OsString;
use std::hash::Hash;
use tracing::{debug, error};

/// Group files by the BLAKE3 digest of their contents.
///
/// Three tiers keep reads down: files are bucketed by size, then by an xxHash
/// of their first 1KB, and only files still sharing a bucket get a full digest.
/// Members are ordered oldest first; groups follow the scan position of their
/// first member. Files that cannot be read are logged and left out.
pub fn group_by_content<I>(records: I, reporter: &dyn ProgressReporter) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    let records = collect_records(records, reporter)?;

    let size_buckets = bucket_by(0..records.len(), |&i| Some(records[i].size()));
    let candidates: usize = size_buckets.iter().map(Vec::len).sum();
    reporter.on_hash_start(candidates);

    let mut hashed = 0usize;
    let mut digest_buckets: Vec<(blake3::Hash, Vec<usize>)> = Vec::new();
    for size_bucket in size_buckets {
        let partial_buckets = bucket_by(size_bucket, |&i| {
            hashed += 1;
            reporter.on_hash_progress(hashed);
            hasher::partial_hash(records[i].path())
                .map_err(|e| error!("Error processing file '{}': {}", records[i].path().display(), e))
                .ok()
        });
        for partial_bucket in partial_buckets {
            let mut full_buckets: AHashMap<blake3::Hash, Vec<usize>> = AHashMap::new();
            for i in partial_bucket {
                match records[i].content_hash() {
                    Ok(digest) => full_buckets.entry(digest).or_default().push(i),
                    Err(e) => error!("Error processing file '{}': {}", records[i].path().display(), e),
                }
            }
            digest_buckets.extend(full_buckets.into_iter().filter(|(_, members)| members.len() > 1));
        }
    }

    digest_buckets.sort_by_key(|(_, members)| members[0]);
    let findings: Vec<Finding> = digest_buckets
        .into_iter()
        .filter_map(|(digest, members)| {
            let mut group: Vec<FileRecord> = members.into_iter().map(|i| records[i].clone()).collect();
            group.sort_by_key(FileRecord::modified);
            FileGroup::new(group).map(|group| Finding::DuplicateGroup { digest, group })
        })
        .collect();

    reporter.on_hash_complete(findings.len());
    debug!("{} groups of files with duplicate content", findings.len());
    Ok(findings)
}

/// Group files sharing a file name. Members are ordered newest first.
pub fn group_by_name<I>(records: I, reporter: &dyn ProgressReporter) -> Result<Vec<Finding>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    let records = collect_records(records, reporter)?;
    let name_buckets = bucket_by(0..records.len(), |&i| {
        Some(OsString::from(records[i].file_name()))
    });

    let findings: Vec<Finding> = name_buckets
        .into_iter()
        .filter_map(|members| {
            let name = records[members[0]].file_name().to_string_lossy().into_owned();
            let mut group: Vec<FileRecord> = members.into_iter().map(|i| records[i].clone()).collect();
            group.sort_by_key(|record| Reverse(record.modified()));
            FileGroup::new(group).map(|group| Finding::RepeatedNameGroup { name, group })
        })
        .collect();

    debug!("{} groups of files with repeated names", findings.len());
    Ok(findings)
}

fn collect_records<I>(records: I, reporter: &dyn ProgressReporter) -> Result<Vec<FileRecord>>
where
    I: IntoIterator<Item = Result<FileRecord>>,
{
    reporter.on_scan_start();
    let mut collected = Vec::new();
    for record in records {
        collected.push(record?);
        reporter.on_scan_progress(collected.len());
    }
    reporter.on_scan_complete(collected.len());
    Ok(collected)
}

/// Bucket indices by key, dropping indices without a key and buckets with a
/// single member. Buckets come back in order of their first index, and
/// indices inside a bucket keep their input order.
fn bucket_by<K, F>(indices: impl IntoIterator<Item = usize>, mut key: F) -> Vec<Vec<usize>>
where
    K: Hash + Eq,
    F: FnMut(&usize) -> Option<K>,
{
    let mut buckets: AHashMap<K, Vec<usize>> = AHashMap::new();
    for i in indices {
        if let Some(k) = key(&i) {
            buckets.entry(k).or_default().push(i);
        }
    }

    let mut kept: Vec<Vec<usize>> = buckets
        .into_values()
        .filter(|members| members.len() > 1)
        .collect();
    kept.sort_by_key(|members| members[0]);
    kept
}
