use std::path::{Path, PathBuf};

use conveyor_core::LocalAsset;

/// Scan the static asset directory.
///
/// Every regular file becomes a [`LocalAsset`] keyed by its `/`-separated
/// path relative to `asset_dir`. The result is sorted by key.
pub fn scan(asset_dir: &Path) -> Result<Vec<LocalAsset>, AssetError> {
    if !asset_dir.is_dir() {
        return Err(AssetError::NotADirectory(asset_dir.to_path_buf()));
    }

    let mut assets = Vec::new();
    for entry in walkdir::WalkDir::new(asset_dir).follow_links(true) {
        let entry = entry.map_err(|e| AssetError::Walk {
            path: asset_dir.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(asset_dir)
            .map_err(|_| AssetError::OutsideRoot(entry.path().to_path_buf()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let asset = LocalAsset::from_file(key, entry.path()).map_err(|e| AssetError::Read {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        assets.push(asset);
    }

    assets.sort_by(|a, b| a.key.cmp(&b.key));
    tracing::debug!(dir = %asset_dir.display(), count = assets.len(), "assets scanned");
    Ok(assets)
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset directory {0} does not exist — build the frontend first or set [frontend].asset_dir")]
    NotADirectory(PathBuf),
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("{0} is outside the asset directory")]
    OutsideRoot(PathBuf),
    #[error("failed to read asset {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
