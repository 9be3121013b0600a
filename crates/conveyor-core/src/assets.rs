use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// A file from the static asset directory, keyed by its bucket path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    /// Object key: path relative to the asset root, `/`-separated
    pub key: String,
    /// Absolute path on disk
    pub path: PathBuf,
    pub size: u64,
    /// Lowercase hex SHA-256 of the contents
    pub sha256: String,
}

impl LocalAsset {
    /// Read size and digest of `path`, to be stored under `key`.
    pub fn from_file(key: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            key: key.into(),
            path: path.to_path_buf(),
            size,
            sha256: sha256_hex(path)?,
        })
    }
}

/// Streaming SHA-256 of a file, hex encoded.
pub fn sha256_hex(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_known_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, "hello").unwrap();

        let asset = LocalAsset::from_file("hello.txt", &path).unwrap();

        assert_eq!(asset.size, 5);
        assert_eq!(
            asset.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
