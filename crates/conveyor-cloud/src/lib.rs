pub mod aws;
pub mod client;
pub mod executor;
pub mod probe;
pub mod store;
pub mod sync;

pub use aws::{AwsError, FailureKind};
pub use client::{
    AwsClient, CallerIdentity, CheckResult, DeployError, DoctorReport, FunctionCode,
    Invalidation, InvalidationError, PreflightError, RemoteObject, StorageError,
};
pub use executor::{AwsExecutor, RealExecutor};
pub use store::{AssetStore, LocalDirStore, S3Store, StoreError};
pub use sync::{SyncPlan, SyncReport};
