use super::lock::RunLock;
use conveyor_build::archive::{self, Artifact};
use conveyor_build::assets;
use conveyor_cloud::probe;
use conveyor_cloud::store::S3Store;
use conveyor_cloud::sync::{self, SyncReport};
use conveyor_cloud::{AwsClient, AwsExecutor, FunctionCode, Invalidation};
use conveyor_core::{ConveyorConfig, DeployTarget, LocalAsset};
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Build,
    PublishBackend,
    PublishFrontend,
    Invalidate,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Build => "build",
            Self::PublishBackend => "publish backend",
            Self::PublishFrontend => "publish frontend",
            Self::Invalidate => "invalidate cache",
            Self::Verify => "verify",
        })
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A stage failed; nothing after it ran.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed")]
pub(crate) struct PipelineError {
    pub stage: Stage,
    source: BoxError,
}

impl PipelineError {
    fn at(stage: Stage) -> impl FnOnce(BoxError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Options of one `conveyor deploy` run.
#[derive(Debug, Default)]
pub struct DeployOptions {
    /// Publish this archive instead of building one
    pub artifact: Option<PathBuf>,
    pub allow_dirty: bool,
    /// Wait for the invalidation to complete
    pub wait: bool,
    /// Probe the API after publishing
    pub verify: bool,
}

/// Everything the publish stages need, prepared locally beforehand.
pub(crate) struct Release<'a> {
    pub target: &'a DeployTarget,
    pub artifact: &'a Artifact,
    pub assets: &'a [LocalAsset],
    pub wait: bool,
    pub verify_url: Option<&'a str>,
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub(crate) struct DeployOutcome {
    pub steps: Vec<String>,
    pub code: FunctionCode,
    pub sync: SyncReport,
    pub invalidation: Invalidation,
}

/// Run the full pipeline: build → publish backend → publish frontend →
/// invalidate cache (→ verify). Ctrl-C stops the run and releases the lock.
pub(crate) async fn run(project_dir: &Path, opts: &DeployOptions) -> anyhow::Result<DeployOutcome> {
    let interrupt = async {
        // Without a signal handler the run simply cannot be interrupted
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    run_with(&AwsClient::new(), project_dir, opts, interrupt).await
}

async fn run_with<E: AwsExecutor>(
    client: &AwsClient<E>,
    project_dir: &Path,
    opts: &DeployOptions,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<DeployOutcome> {
    let config = super::load_config(project_dir)?;
    let target = DeployTarget::from_config(&config)?;
    let verify_url = if opts.verify {
        Some(config.function.url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "--verify needs the API URL — set [function].url in conveyor.toml or export CONVEYOR_API_URL"
            )
        })?)
    } else {
        None
    };

    // Dirty check: refuse to deploy uncommitted changes unless --allow-dirty
    if opts.artifact.is_none()
        && !opts.allow_dirty
        && archive::is_dirty(project_dir, &config.build.output_dir)?
    {
        anyhow::bail!(
            "uncommitted changes detected.\n\
             Commit your changes, or use `conveyor deploy --allow-dirty` to deploy anyway."
        );
    }

    let output_dir = project_dir.join(&config.build.output_dir);
    let _lock = RunLock::acquire(&output_dir)?;

    let locked = async {
        let identity = client.check_prerequisites(&target.names.region).await?;
        tracing::info!(account = %identity.account, arn = %identity.arn, "aws identity resolved");

        let (artifact, assets) =
            prepare(project_dir, &config, opts).map_err(PipelineError::at(Stage::Build))?;

        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &assets,
            wait: opts.wait,
            verify_url,
        };
        let mut outcome = publish(client, &release).await?;
        outcome.steps.splice(
            0..0,
            [
                format!("Authenticated as {}", identity.arn),
                format!(
                    "Artifact ready: {} ({} entries, {} bytes)",
                    artifact.path.display(),
                    artifact.entries,
                    artifact.size
                ),
            ],
        );
        anyhow::Ok(outcome)
    };

    tokio::select! {
        biased;
        () = interrupt => anyhow::bail!(
            "deploy interrupted — stages after the current one did not run; re-run conveyor deploy"
        ),
        outcome = locked => outcome,
    }
}

/// Stage 1: build (or open) the archive and scan the asset directory.
fn prepare(
    project_dir: &Path,
    config: &ConveyorConfig,
    opts: &DeployOptions,
) -> Result<(Artifact, Vec<LocalAsset>), BoxError> {
    let artifact = match &opts.artifact {
        Some(path) => {
            tracing::info!(path = %path.display(), "using prebuilt artifact");
            Artifact::open(path)?
        }
        None => super::build_artifact(project_dir, config).map_err(BoxError::from)?,
    };
    let assets = assets::scan(&project_dir.join(&config.frontend.asset_dir))?;
    Ok((artifact, assets))
}

/// Stages 2–5. Each stage runs only if the previous one succeeded.
pub(crate) async fn publish<E: AwsExecutor>(
    client: &AwsClient<E>,
    release: &Release<'_>,
) -> Result<DeployOutcome, PipelineError> {
    let names = &release.target.names;
    let mut steps = Vec::new();

    tracing::info!(function = %names.function_name, "publishing backend");
    let code = client
        .publish_function_code(
            &names.function_name,
            &names.region,
            &release.artifact.path,
            &release.artifact.sha256,
        )
        .await
        .map_err(|e| PipelineError::at(Stage::PublishBackend)(e.into()))?;
    steps.push(format!(
        "Function {} updated (CodeSha256 {})",
        names.function_name, code.code_sha256
    ));

    tracing::info!(bucket = %names.bucket_name, assets = release.assets.len(), "publishing frontend");
    let store = S3Store::new(client, &names.bucket_name, &names.region);
    let sync = sync::mirror(release.assets, &store)
        .await
        .map_err(|e| PipelineError::at(Stage::PublishFrontend)(e.into()))?;
    steps.push(format!("Bucket {} synced: {sync}", names.bucket_name));

    tracing::info!(distribution = %release.target.distribution_id, "invalidating cache");
    let invalidation = client
        .create_invalidation(&release.target.distribution_id)
        .await
        .map_err(|e| PipelineError::at(Stage::Invalidate)(e.into()))?;
    if release.wait {
        client
            .wait_invalidation(&release.target.distribution_id, &invalidation.id)
            .await
            .map_err(|e| PipelineError::at(Stage::Invalidate)(e.into()))?;
        steps.push(format!("Invalidation {} completed", invalidation.id));
    } else {
        steps.push(format!(
            "Invalidation {} created ({})",
            invalidation.id, invalidation.status
        ));
    }

    if let Some(url) = release.verify_url {
        probe::verify_api(url, hello_api::GREETING)
            .await
            .map_err(|e| PipelineError::at(Stage::Verify)(e.into()))?;
        steps.push(format!("Verified {url}"));
    }

    Ok(DeployOutcome {
        steps,
        code,
        sync,
        invalidation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_cloud::{AwsError, FailureKind};
    use conveyor_core::ResourceNames;
    use mockall::mock;

    mock! {
        Executor {}

        impl AwsExecutor for Executor {
            async fn exec(&self, args: &[String]) -> Result<String, AwsError>;
            async fn exec_streaming(&self, args: &[String]) -> Result<(), AwsError>;
        }
    }

    fn has(args: &[String], arg: &str) -> bool {
        args.iter().any(|a| a == arg)
    }

    fn target() -> DeployTarget {
        DeployTarget {
            names: ResourceNames {
                region: "us-east-1".to_owned(),
                function_name: "hello-api".to_owned(),
                bucket_name: "hello-frontend".to_owned(),
            },
            distribution_id: "E2QWRUHAPOMQZL".to_owned(),
        }
    }

    fn artifact() -> Artifact {
        Artifact {
            path: PathBuf::from("/tmp/.conveyor/hello-api.zip"),
            size: 1024,
            entries: 3,
            sha256: "c2hhMjU2".to_owned(),
        }
    }

    fn function_json(sha: &str) -> String {
        format!(
            r#"{{"FunctionName": "hello-api", "CodeSha256": "{sha}", "CodeSize": 1024, "LastModified": "2026-10-18T09:00:00.000+0000"}}"#
        )
    }

    fn invalidation_json() -> String {
        r#"{"Invalidation": {"Id": "I2J0I21PCUYOIK", "Status": "InProgress"}}"#.to_owned()
    }

    fn expect_backend_ok(mock: &mut MockExecutor) {
        mock.expect_exec()
            .withf(|args| has(args, "update-function-code"))
            .times(1)
            .returning(|_| Ok(function_json("c2hhMjU2")));
        mock.expect_exec()
            .withf(|args| has(args, "function-updated"))
            .times(1)
            .returning(|_| Ok(String::new()));
        mock.expect_exec()
            .withf(|args| has(args, "get-function-configuration"))
            .times(1)
            .returning(|_| Ok(function_json("c2hhMjU2")));
    }

    #[tokio::test]
    async fn stages_run_in_order() {
        let mut mock = MockExecutor::new();
        expect_backend_ok(&mut mock);
        mock.expect_exec()
            .withf(|args| has(args, "list-objects-v2"))
            .times(1)
            .returning(|_| Ok(r#"{"Contents": [{"Key": "old.css", "Size": 3}]}"#.to_owned()));
        mock.expect_exec()
            .withf(|args| has(args, "rm") && has(args, "s3://hello-frontend/old.css"))
            .times(1)
            .returning(|_| Ok(String::new()));
        mock.expect_exec()
            .withf(|args| has(args, "create-invalidation"))
            .times(1)
            .returning(|_| Ok(invalidation_json()));

        let client = AwsClient::with_executor(mock);
        let target = target();
        let artifact = artifact();
        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &[],
            wait: false,
            verify_url: None,
        };

        let outcome = publish(&client, &release).await.unwrap();

        assert_eq!(outcome.code.code_sha256, "c2hhMjU2");
        assert_eq!(outcome.sync.deleted, 1);
        assert_eq!(outcome.invalidation.id, "I2J0I21PCUYOIK");
        assert_eq!(outcome.steps.len(), 3);
    }

    #[tokio::test]
    async fn backend_failure_skips_sync_and_invalidation() {
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .withf(|args| has(args, "update-function-code"))
            .times(1)
            .returning(|args| {
                Err(AwsError::failed(
                    args,
                    "An error occurred (AccessDeniedException) when calling the UpdateFunctionCode operation",
                ))
            });
        mock.expect_exec()
            .withf(|args| has(args, "list-objects-v2") || has(args, "create-invalidation"))
            .times(0)
            .returning(|_| Ok(String::new()));

        let client = AwsClient::with_executor(mock);
        let target = target();
        let artifact = artifact();
        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &[],
            wait: true,
            verify_url: None,
        };

        let err = publish(&client, &release).await.unwrap_err();

        assert_eq!(err.stage, Stage::PublishBackend);
        assert_eq!(FailureKind::of(&err), FailureKind::Auth);
        assert_eq!(err.to_string(), "publish backend stage failed");
    }

    #[tokio::test]
    async fn digest_mismatch_stops_the_pipeline() {
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .withf(|args| has(args, "update-function-code"))
            .returning(|_| Ok(function_json("c2hhMjU2")));
        mock.expect_exec()
            .withf(|args| has(args, "function-updated"))
            .returning(|_| Ok(String::new()));
        mock.expect_exec()
            .withf(|args| has(args, "get-function-configuration"))
            .returning(|_| Ok(function_json("b3RoZXI=")));
        mock.expect_exec()
            .withf(|args| has(args, "list-objects-v2"))
            .times(0)
            .returning(|_| Ok(String::new()));

        let client = AwsClient::with_executor(mock);
        let target = target();
        let artifact = artifact();
        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &[],
            wait: false,
            verify_url: None,
        };

        let err = publish(&client, &release).await.unwrap_err();
        assert_eq!(err.stage, Stage::PublishBackend);
    }

    #[tokio::test]
    async fn invalidation_targets_configured_distribution() {
        let mut mock = MockExecutor::new();
        expect_backend_ok(&mut mock);
        mock.expect_exec()
            .withf(|args| has(args, "list-objects-v2"))
            .returning(|_| Ok(String::new()));
        mock.expect_exec()
            .withf(|args| {
                args.windows(2)
                    .any(|w| w[0] == "--distribution-id" && w[1] == "E2QWRUHAPOMQZL")
                    && args.windows(2).any(|w| w[0] == "--paths" && w[1] == "/*")
            })
            .times(1)
            .returning(|_| Ok(invalidation_json()));
        mock.expect_exec()
            .withf(|args| has(args, "invalidation-completed") && has(args, "I2J0I21PCUYOIK"))
            .times(1)
            .returning(|_| Ok(String::new()));

        let client = AwsClient::with_executor(mock);
        let target = target();
        let artifact = artifact();
        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &[],
            wait: true,
            verify_url: None,
        };

        let outcome = publish(&client, &release).await.unwrap();
        assert!(outcome.steps.iter().any(|s| s.contains("completed")));
    }

    #[tokio::test]
    async fn sync_failure_skips_invalidation() {
        let mut mock = MockExecutor::new();
        expect_backend_ok(&mut mock);
        mock.expect_exec()
            .withf(|args| has(args, "list-objects-v2"))
            .returning(|args| {
                Err(AwsError::failed(
                    args,
                    "Could not connect to the endpoint URL: \"https://hello-frontend.s3.amazonaws.com/\"",
                ))
            });
        mock.expect_exec()
            .withf(|args| has(args, "create-invalidation"))
            .times(0)
            .returning(|_| Ok(invalidation_json()));

        let client = AwsClient::with_executor(mock);
        let target = target();
        let artifact = artifact();
        let release = Release {
            target: &target,
            artifact: &artifact,
            assets: &[],
            wait: false,
            verify_url: None,
        };

        let err = publish(&client, &release).await.unwrap_err();
        assert_eq!(err.stage, Stage::PublishFrontend);
        assert_eq!(FailureKind::of(&err), FailureKind::Network);
    }

    // ── run ──

    fn project() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("conveyor.toml"),
            r#"
[function]
name = "hello-api"

[build]
compile = false

[frontend]
bucket = "hello-frontend"

[cdn]
distribution_id = "E2QWRUHAPOMQZL"
"#,
        )
        .unwrap();
        std::fs::create_dir_all(tmp.path().join("frontend")).unwrap();
        std::fs::write(tmp.path().join("frontend/index.html"), "<h1>hi</h1>").unwrap();
        tmp
    }

    fn allow_dirty() -> DeployOptions {
        DeployOptions {
            allow_dirty: true,
            ..DeployOptions::default()
        }
    }

    #[tokio::test]
    async fn missing_credentials_stop_before_build() {
        let tmp = project();
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .withf(|args| has(args, "--version"))
            .returning(|_| Ok("aws-cli/2.17.0".to_owned()));
        mock.expect_exec()
            .withf(|args| has(args, "get-caller-identity"))
            .times(1)
            .returning(|args| {
                Err(AwsError::failed(
                    args,
                    "Unable to locate credentials. You can configure credentials by running \"aws configure\".",
                ))
            });
        mock.expect_exec()
            .withf(|args| has(args, "update-function-code"))
            .times(0);

        let client = AwsClient::with_executor(mock);
        let err = run_with(&client, tmp.path(), &allow_dirty(), std::future::pending())
            .await
            .unwrap_err();

        let source: &(dyn std::error::Error + 'static) = err.as_ref();
        assert_eq!(FailureKind::of(source), FailureKind::Auth);
        assert!(!tmp.path().join(".conveyor/hello-api.zip").exists());
        assert!(!RunLock::is_held(&tmp.path().join(".conveyor")));
    }

    #[tokio::test]
    async fn interrupt_releases_the_run_lock() {
        let tmp = project();
        let mut mock = MockExecutor::new();
        mock.expect_exec().times(0);

        let client = AwsClient::with_executor(mock);
        let err = run_with(&client, tmp.path(), &allow_dirty(), std::future::ready(()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("interrupted"), "got: {err}");
        assert!(!RunLock::is_held(&tmp.path().join(".conveyor")));
        assert!(!tmp.path().join(".conveyor/hello-api.zip").exists());
    }
}
