//! Destinations for the static asset set.
//!
//! [`S3Store`] is the real bucket; [`LocalDirStore`] mirrors into a plain
//! directory and backs the sync tests.

use crate::client::{AwsClient, RemoteObject, StorageError};
use crate::executor::AwsExecutor;
use conveyor_core::{LocalAsset, sha256_hex};
use std::path::PathBuf;

/// Object storage the sync stage mirrors into.
#[allow(async_fn_in_trait)]
pub trait AssetStore: Send + Sync {
    /// Every object currently stored.
    async fn list(&self) -> Result<Vec<RemoteObject>, StoreError>;

    /// Hex SHA-256 of a stored object, if the store knows it.
    async fn fingerprint(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Create or overwrite `asset.key` with the asset's contents.
    async fn put(&self, asset: &LocalAsset) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// An S3 bucket, addressed through the AWS CLI.
pub struct S3Store<'a, E: AwsExecutor> {
    client: &'a AwsClient<E>,
    bucket: &'a str,
    region: &'a str,
}

impl<'a, E: AwsExecutor> S3Store<'a, E> {
    pub fn new(client: &'a AwsClient<E>, bucket: &'a str, region: &'a str) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }
}

impl<E: AwsExecutor> AssetStore for S3Store<'_, E> {
    async fn list(&self) -> Result<Vec<RemoteObject>, StoreError> {
        Ok(self.client.list_objects(self.bucket, self.region).await?)
    }

    async fn fingerprint(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .client
            .object_sha256(self.bucket, key, self.region)
            .await?)
    }

    async fn put(&self, asset: &LocalAsset) -> Result<(), StoreError> {
        Ok(self
            .client
            .put_object(self.bucket, &asset.key, &asset.path, &asset.sha256, self.region)
            .await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        Ok(self
            .client
            .delete_object(self.bucket, key, self.region)
            .await?)
    }
}

/// A directory standing in for a bucket: keys are relative paths.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

impl AssetStore for LocalDirStore {
    async fn list(&self) -> Result<Vec<RemoteObject>, StoreError> {
        let mut objects = Vec::new();
        if !self.root.exists() {
            return Ok(objects);
        }
        for entry in walkdir::WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| StoreError::Local {
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry
                .metadata()
                .map_err(|e| StoreError::Local {
                    path: entry.path().to_path_buf(),
                    source: e.into(),
                })?
                .len();
            objects.push(RemoteObject { key, size });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn fingerprint(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_of(key);
        if !path.is_file() {
            return Ok(None);
        }
        sha256_hex(&path)
            .map(Some)
            .map_err(|e| StoreError::Local { path, source: e })
    }

    async fn put(&self, asset: &LocalAsset) -> Result<(), StoreError> {
        let dest = self.path_of(&asset.key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Local {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::copy(&asset.path, &dest)
            .await
            .map_err(|e| StoreError::Local { path: dest, source: e })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_of(key);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StoreError::Local { path, source: e })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Remote(#[from] StorageError),

    #[error("failed to access {path}")]
    Local {
        path: PathBuf,
        source: std::io::Error,
    },
}
