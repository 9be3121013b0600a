use crate::aws::AwsError;
use crate::executor::{AwsExecutor, RealExecutor};
use conveyor_core::ConveyorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Path set that invalidates every cached object of a distribution.
pub const INVALIDATE_ALL: &str = "/*";

/// AWS operations client, parameterized over the executor for testability.
pub struct AwsClient<E: AwsExecutor = RealExecutor> {
    executor: E,
}

impl AwsClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for AwsClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: AwsExecutor> AwsClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    async fn exec_json<T: serde::de::DeserializeOwned>(&self, args: &[String]) -> Result<T, AwsError> {
        let out = self.executor.exec(args).await?;
        serde_json::from_str(&out).map_err(|e| AwsError::InvalidJson {
            args: args.to_vec(),
            source: e,
        })
    }

    // ── Preflight ──

    pub async fn check_prerequisites(&self, region: &str) -> Result<CallerIdentity, PreflightError> {
        // 1. aws CLI available
        self.executor
            .exec(&args(["--version"]))
            .await
            .map_err(|_| PreflightError::AwsCliNotInstalled)?;

        // 2. Credentials resolve to an identity
        self.exec_json(&args([
            "sts",
            "get-caller-identity",
            "--region",
            region,
            "--output",
            "json",
        ]))
        .await
        .map_err(|e| PreflightError::NotAuthenticated { source: e })
    }

    // ── Doctor ──

    /// Run all diagnostic checks without early return.
    /// Returns a report with pass/fail for each check item.
    pub async fn doctor(&self, config: &ConveyorConfig) -> DoctorReport {
        let mut report = DoctorReport::default();
        let region = config.project.region.as_str();

        // 1. aws CLI, reported as "aws-cli/2.15.0 Python/3.11.6 ..."
        match self.executor.exec(&args(["--version"])).await {
            Ok(v) => {
                let version = v
                    .split_whitespace()
                    .next()
                    .and_then(|tok| tok.strip_prefix("aws-cli/"))
                    .unwrap_or(v.trim());
                report.aws_cli = CheckResult::ok(version);
            }
            Err(e) => report.aws_cli = CheckResult::fail(&e.to_string()),
        }

        // 2. Identity
        match self
            .executor
            .exec(&args([
                "sts",
                "get-caller-identity",
                "--region",
                region,
                "--query",
                "Arn",
                "--output",
                "text",
            ]))
            .await
        {
            Ok(arn) if !arn.trim().is_empty() => report.identity = CheckResult::ok(arn.trim()),
            Ok(_) => report.identity = CheckResult::fail("no identity returned"),
            Err(e) => report.identity = CheckResult::fail(&format!("not authenticated ({})", e.kind())),
        }

        report.region = CheckResult::ok(region);

        // 3. Function
        report.function = match config.function_name() {
            None => CheckResult::fail("function name not set in conveyor.toml"),
            Some(name) => match self.get_function_code(name, region).await {
                Ok(code) => CheckResult::ok(&format!("{name} (last modified {})", code.last_modified)),
                Err(e) => CheckResult::fail(&format!("{name} — {}", kind_of(&e))),
            },
        };

        // 4. Bucket
        report.bucket = match config.frontend.bucket.as_deref() {
            None => CheckResult::fail("bucket not set in conveyor.toml"),
            Some(bucket) => match self.head_bucket(bucket, region).await {
                Ok(()) => CheckResult::ok(bucket),
                Err(e) => CheckResult::fail(&format!("{bucket} — {}", kind_of(&e))),
            },
        };

        // 5. Distribution
        report.distribution = match config.cdn.distribution_id.as_deref() {
            None => CheckResult::fail("distribution_id not set in conveyor.toml"),
            Some(id) => match self.distribution_status(id).await {
                Ok(status) => CheckResult::ok(&format!("{id} ({status})")),
                Err(e) => CheckResult::fail(&format!("{id} — {}", kind_of(&e))),
            },
        };

        report
    }

    // ── Lambda ──

    /// Upload a zip archive as the function's new code.
    pub async fn update_function_code(
        &self,
        function_name: &str,
        region: &str,
        zip_path: &Path,
    ) -> Result<FunctionCode, DeployError> {
        let zip_str = zip_path
            .to_str()
            .ok_or_else(|| DeployError::InvalidPath(zip_path.to_path_buf()))?;
        let zip_arg = format!("fileb://{zip_str}");

        self.exec_json(&args([
            "lambda",
            "update-function-code",
            "--function-name",
            function_name,
            "--zip-file",
            &zip_arg,
            "--region",
            region,
            "--output",
            "json",
        ]))
        .await
        .map_err(|e| DeployError::Upload { source: e })
    }

    /// Block until the last update of the function has settled.
    pub async fn wait_function_updated(&self, function_name: &str, region: &str) -> Result<(), DeployError> {
        self.executor
            .exec(&args([
                "lambda",
                "wait",
                "function-updated",
                "--function-name",
                function_name,
                "--region",
                region,
            ]))
            .await
            .map_err(|e| DeployError::Wait { source: e })?;
        Ok(())
    }

    pub async fn get_function_code(&self, function_name: &str, region: &str) -> Result<FunctionCode, DeployError> {
        self.exec_json(&args([
            "lambda",
            "get-function-configuration",
            "--function-name",
            function_name,
            "--region",
            region,
            "--output",
            "json",
        ]))
        .await
        .map_err(|e| DeployError::Describe { source: e })
    }

    /// Upload, wait for the update, then confirm the live code digest is
    /// the artifact's. `expected_sha256` is base64, as Lambda reports it.
    pub async fn publish_function_code(
        &self,
        function_name: &str,
        region: &str,
        zip_path: &Path,
        expected_sha256: &str,
    ) -> Result<FunctionCode, DeployError> {
        self.update_function_code(function_name, region, zip_path)
            .await?;
        self.wait_function_updated(function_name, region).await?;
        let code = self.get_function_code(function_name, region).await?;

        if code.code_sha256 != expected_sha256 {
            return Err(DeployError::DigestMismatch {
                function: function_name.to_owned(),
                expected: expected_sha256.to_owned(),
                actual: code.code_sha256,
            });
        }

        tracing::debug!(function = function_name, sha256 = %code.code_sha256, "function code published");
        Ok(code)
    }

    pub async fn read_logs(&self, function_name: &str, region: &str, follow: bool) -> Result<(), DeployError> {
        let log_group = format!("/aws/lambda/{function_name}");
        let mut cmd = args([
            "logs",
            "tail",
            &log_group,
            "--region",
            region,
            "--since",
            "1h",
            "--format",
            "short",
        ]);
        if follow {
            cmd.push("--follow".to_owned());
        }

        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| DeployError::Logs { source: e })
    }

    // ── S3 ──

    pub async fn head_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError> {
        self.executor
            .exec(&args(["s3api", "head-bucket", "--bucket", bucket, "--region", region]))
            .await
            .map_err(|e| StorageError::Bucket {
                bucket: bucket.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn list_objects(&self, bucket: &str, region: &str) -> Result<Vec<RemoteObject>, StorageError> {
        let cmd = args([
            "s3api",
            "list-objects-v2",
            "--bucket",
            bucket,
            "--region",
            region,
            "--output",
            "json",
        ]);
        let out = self
            .executor
            .exec(&cmd)
            .await
            .map_err(|e| StorageError::Bucket {
                bucket: bucket.to_owned(),
                source: e,
            })?;

        // An empty bucket prints nothing at all
        if out.trim().is_empty() {
            return Ok(Vec::new());
        }

        let listing: ObjectListing = serde_json::from_str(&out).map_err(|e| StorageError::Bucket {
            bucket: bucket.to_owned(),
            source: AwsError::InvalidJson {
                args: cmd.clone(),
                source: e,
            },
        })?;

        Ok(listing
            .contents
            .into_iter()
            .map(|o| RemoteObject {
                key: o.key,
                size: o.size,
            })
            .collect())
    }

    /// Content digest recorded in the object's `sha256` metadata, if any.
    pub async fn object_sha256(&self, bucket: &str, key: &str, region: &str) -> Result<Option<String>, StorageError> {
        let out = self
            .executor
            .exec(&args([
                "s3api",
                "head-object",
                "--bucket",
                bucket,
                "--key",
                key,
                "--region",
                region,
                "--query",
                "Metadata.sha256",
                "--output",
                "text",
            ]))
            .await
            .map_err(|e| StorageError::Object {
                key: key.to_owned(),
                source: e,
            })?;

        let digest = out.trim();
        // --output text renders a missing field as "None"
        if digest.is_empty() || digest == "None" {
            Ok(None)
        } else {
            Ok(Some(digest.to_owned()))
        }
    }

    /// Upload `path` to `key`, recording its digest as object metadata.
    /// The CLI guesses the content type from the extension.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        sha256: &str,
        region: &str,
    ) -> Result<(), StorageError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;
        let dest = format!("s3://{bucket}/{key}");
        let metadata = format!("sha256={sha256}");

        self.executor
            .exec(&args([
                "s3",
                "cp",
                path_str,
                &dest,
                "--region",
                region,
                "--metadata",
                &metadata,
                "--only-show-errors",
            ]))
            .await
            .map_err(|e| StorageError::Object {
                key: key.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn delete_object(&self, bucket: &str, key: &str, region: &str) -> Result<(), StorageError> {
        let target = format!("s3://{bucket}/{key}");
        self.executor
            .exec(&args(["s3", "rm", &target, "--region", region, "--only-show-errors"]))
            .await
            .map_err(|e| StorageError::Object {
                key: key.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    // ── CloudFront ──

    /// Invalidate every path of the distribution.
    pub async fn create_invalidation(&self, distribution_id: &str) -> Result<Invalidation, InvalidationError> {
        let created: CreatedInvalidation = self
            .exec_json(&args([
                "cloudfront",
                "create-invalidation",
                "--distribution-id",
                distribution_id,
                "--paths",
                INVALIDATE_ALL,
                "--output",
                "json",
            ]))
            .await
            .map_err(|e| InvalidationError::Create { source: e })?;
        Ok(created.invalidation)
    }

    pub async fn wait_invalidation(&self, distribution_id: &str, invalidation_id: &str) -> Result<(), InvalidationError> {
        self.executor
            .exec(&args([
                "cloudfront",
                "wait",
                "invalidation-completed",
                "--distribution-id",
                distribution_id,
                "--id",
                invalidation_id,
            ]))
            .await
            .map_err(|e| InvalidationError::Wait { source: e })?;
        Ok(())
    }

    /// `Deployed` or `InProgress`.
    pub async fn distribution_status(&self, distribution_id: &str) -> Result<String, InvalidationError> {
        let out = self
            .executor
            .exec(&args([
                "cloudfront",
                "get-distribution",
                "--id",
                distribution_id,
                "--query",
                "Distribution.Status",
                "--output",
                "text",
            ]))
            .await
            .map_err(|e| InvalidationError::Describe { source: e })?;
        Ok(out.trim().to_owned())
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn kind_of(err: &(dyn std::error::Error + 'static)) -> crate::FailureKind {
    crate::FailureKind::of(err)
}

// ── Response types ──

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
}

/// Code attributes of a function, as returned by update/get calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionCode {
    pub function_name: String,
    /// Base64 SHA-256 of the deployed archive
    pub code_sha256: String,
    pub code_size: u64,
    pub last_modified: String,
    #[serde(default)]
    pub last_update_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectListing {
    #[serde(default)]
    contents: Vec<ListedObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invalidation {
    pub id: String,
    pub status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedInvalidation {
    invalidation: Invalidation,
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub aws_cli: CheckResult,
    pub identity: CheckResult,
    pub region: CheckResult,
    pub function: CheckResult,
    pub bucket: CheckResult,
    pub distribution: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.checks().iter().all(|(_, c)| c.passed)
    }

    /// Labelled checks in display order.
    pub fn checks(&self) -> [(&'static str, &CheckResult); 7] {
        [
            ("aws CLI", &self.aws_cli),
            ("Identity", &self.identity),
            ("Region", &self.region),
            ("Function", &self.function),
            ("Bucket", &self.bucket),
            ("Distribution", &self.distribution),
            ("conveyor.toml", &self.config_file),
        ]
    }
}

impl std::fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Conveyor Doctor")?;
        writeln!(f, "---------------")?;
        for (label, check) in self.checks() {
            writeln!(f, "{label:<14}{:<4}{}", check.icon(), check.detail)?;
        }
        writeln!(f, "---------------")?;
        if self.all_passed() {
            write!(f, "All checks passed!")
        } else {
            write!(f, "Some checks failed — see above for details")
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("aws CLI not installed — https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html")]
    AwsCliNotInstalled,

    #[error("not authenticated — run: aws configure, or set AWS_PROFILE")]
    NotAuthenticated { source: AwsError },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("archive path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("function code upload failed")]
    Upload { source: AwsError },

    #[error("function update did not settle")]
    Wait { source: AwsError },

    #[error("failed to describe function")]
    Describe { source: AwsError },

    #[error("function {function} reports code digest {actual}, expected {expected}")]
    DigestMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    #[error("failed to read function logs")]
    Logs { source: AwsError },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("asset path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("bucket {bucket} is not accessible")]
    Bucket { bucket: String, source: AwsError },

    #[error("request for object {key} failed")]
    Object { key: String, source: AwsError },
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidationError {
    #[error("failed to create invalidation")]
    Create { source: AwsError },

    #[error("invalidation did not complete")]
    Wait { source: AwsError },

    #[error("failed to describe distribution")]
    Describe { source: AwsError },
}
