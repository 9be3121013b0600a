//! One-way mirror of the asset directory into an [`AssetStore`].
//!
//! After [`mirror`] the store holds exactly the local key set. Keys whose
//! size and digest already match are not rewritten. There is no dry run
//! and no conflict detection: the local directory always wins.

use crate::store::{AssetStore, StoreError};
use conveyor_core::LocalAsset;
use std::collections::{BTreeMap, BTreeSet};

/// What a sync will do, computed before anything is written.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Missing remotely, or different in size or digest
    pub upload: Vec<LocalAsset>,
    /// Identical on both sides
    pub unchanged: Vec<String>,
    /// Present remotely only
    pub delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.upload.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} unchanged, {} deleted",
            self.uploaded, self.unchanged, self.deleted
        )
    }
}

/// Compare local assets against the store.
///
/// Only objects whose size matches are fingerprinted; an object without a
/// recorded digest is treated as changed.
pub async fn plan<S: AssetStore>(local: &[LocalAsset], store: &S) -> Result<SyncPlan, StoreError> {
    let remote: BTreeMap<String, u64> = store
        .list()
        .await?
        .into_iter()
        .map(|o| (o.key, o.size))
        .collect();

    let mut plan = SyncPlan::default();
    for asset in local {
        let same = match remote.get(&asset.key) {
            Some(&size) if size == asset.size => {
                store.fingerprint(&asset.key).await?.as_deref() == Some(asset.sha256.as_str())
            }
            _ => false,
        };
        if same {
            plan.unchanged.push(asset.key.clone());
        } else {
            plan.upload.push(asset.clone());
        }
    }

    let local_keys: BTreeSet<&str> = local.iter().map(|a| a.key.as_str()).collect();
    plan.delete = remote
        .into_keys()
        .filter(|key| !local_keys.contains(key.as_str()))
        .collect();

    Ok(plan)
}

/// Execute a plan: every upload first, then every delete.
pub async fn apply<S: AssetStore>(plan: &SyncPlan, store: &S) -> Result<SyncReport, StoreError> {
    for asset in &plan.upload {
        tracing::debug!(key = %asset.key, size = asset.size, "upload");
        store.put(asset).await?;
    }
    for key in &plan.delete {
        tracing::debug!(%key, "delete");
        store.delete(key).await?;
    }

    Ok(SyncReport {
        uploaded: plan.upload.len(),
        unchanged: plan.unchanged.len(),
        deleted: plan.delete.len(),
    })
}

/// Make the store's contents equal the local asset set.
pub async fn mirror<S: AssetStore>(local: &[LocalAsset], store: &S) -> Result<SyncReport, StoreError> {
    let plan = plan(local, store).await?;
    if plan.is_noop() {
        tracing::info!(unchanged = plan.unchanged.len(), "assets already up to date");
        return Ok(SyncReport {
            unchanged: plan.unchanged.len(),
            ..SyncReport::default()
        });
    }
    let report = apply(&plan, store).await?;
    tracing::info!(%report, "assets mirrored");
    Ok(report)
}
