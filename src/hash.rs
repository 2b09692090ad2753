// src/hash.rs

//! Content fingerprints.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash everything `reader` yields.
pub fn compute_reader_hash(reader: &mut dyn Read) -> std::io::Result<String> {
    let mut hasher = Hasher::new();
    std::io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn hashes_mock_file_contents() {
        let fs = MockFileSystem::new();
        fs.add_file("/test.txt", b"hello world".to_vec());

        let hash = compute_file_hash(&fs, Path::new("/test.txt")).unwrap();
        // blake3 hash of "hello world"
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn reader_and_file_hashes_agree() {
        let fs = MockFileSystem::new();
        fs.add_file("/a.bin", vec![1u8, 2, 3, 4]);
        let from_file = compute_file_hash(&fs, Path::new("/a.bin")).unwrap();
        let from_reader = compute_reader_hash(&mut &[1u8, 2, 3, 4][..]).unwrap();
        assert_eq!(from_file, from_reader);
    }
}
