mod xxhash;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub use xxhash::partial_hash;

const READ_BUFFER_LENGTH: usize = 64 * 1024;

/// BLAKE3 digest of the whole file, read in fixed-size chunks.
pub fn full_hash(file: &Path) -> io::Result<blake3::Hash> {
    let mut f = File::open(file)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; READ_BUFFER_LENGTH];
    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_full_hash_matches_in_memory_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();
        assert_eq!(full_hash(&path).unwrap(), blake3::hash(&data));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(full_hash(&dir.path().join("nope")).is_err());
    }
}
