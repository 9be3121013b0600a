use conveyor_cloud::aws::{AwsError, FailureKind};
use conveyor_cloud::client::{
    AwsClient, DeployError, INVALIDATE_ALL, InvalidationError, PreflightError, StorageError,
};
use conveyor_cloud::executor::AwsExecutor;
use conveyor_core::ConveyorConfig;
use mockall::mock;
use std::path::Path;

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

/// `flag` immediately followed by `value`.
fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

fn function_json(sha: &str) -> String {
    format!(
        r#"{{
  "FunctionName": "hello-api",
  "CodeSha256": "{sha}",
  "CodeSize": 2048,
  "LastModified": "2026-10-18T09:00:00.000+0000",
  "LastUpdateStatus": "Successful"
}}"#
    )
}

// ── Preflight Tests ──

#[tokio::test]
async fn preflight_returns_caller_identity() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "--version"))
        .returning(|_| Ok("aws-cli/2.15.0 Python/3.11.6 Linux/6.1 exe/x86_64\n".to_owned()));

    mock.expect_exec()
        .withf(|args| has(args, "get-caller-identity") && has_pair(args, "--region", "eu-west-1"))
        .returning(|_| {
            Ok(r#"{"UserId": "AIDA123", "Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ci"}"#.to_owned())
        });

    let client = AwsClient::with_executor(mock);
    let identity = client.check_prerequisites("eu-west-1").await.unwrap();

    assert_eq!(identity.account, "123456789012");
    assert_eq!(identity.arn, "arn:aws:iam::123456789012:user/ci");
}

#[tokio::test]
async fn preflight_aws_cli_not_installed() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "--version"))
        .returning(|_| {
            Err(AwsError::NotFound {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });

    let client = AwsClient::with_executor(mock);
    let result = client.check_prerequisites("us-east-1").await;

    assert!(matches!(result, Err(PreflightError::AwsCliNotInstalled)));
}

#[tokio::test]
async fn preflight_not_authenticated() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "--version"))
        .returning(|_| Ok("aws-cli/2.15.0\n".to_owned()));

    mock.expect_exec()
        .withf(|args| has(args, "get-caller-identity"))
        .returning(|args| {
            Err(AwsError::failed(
                args,
                "An error occurred (ExpiredToken) when calling the GetCallerIdentity operation",
            ))
        });

    let client = AwsClient::with_executor(mock);
    let err = client.check_prerequisites("us-east-1").await.unwrap_err();

    assert!(matches!(err, PreflightError::NotAuthenticated { .. }));
    assert_eq!(FailureKind::of(&err), FailureKind::Auth);
}

// ── Lambda Tests ──

#[tokio::test]
async fn update_function_code_uploads_zip() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| {
            has(args, "update-function-code")
                && has_pair(args, "--function-name", "hello-api")
                && has_pair(args, "--zip-file", "fileb:///tmp/out/hello-api.zip")
                && has_pair(args, "--region", "us-east-1")
        })
        .times(1)
        .returning(|_| Ok(function_json("abc=")));

    let client = AwsClient::with_executor(mock);
    let code = client
        .update_function_code("hello-api", "us-east-1", Path::new("/tmp/out/hello-api.zip"))
        .await
        .unwrap();

    assert_eq!(code.code_sha256, "abc=");
    assert_eq!(code.code_size, 2048);
    assert_eq!(code.last_update_status.as_deref(), Some("Successful"));
}

#[tokio::test]
async fn publish_waits_then_checks_digest() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "update-function-code"))
        .times(1)
        .returning(|_| Ok(function_json("old=")));
    mock.expect_exec()
        .withf(|args| has(args, "wait") && has(args, "function-updated"))
        .times(1)
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| has(args, "get-function-configuration"))
        .times(1)
        .returning(|_| Ok(function_json("new=")));

    let client = AwsClient::with_executor(mock);
    let code = client
        .publish_function_code("hello-api", "us-east-1", Path::new("a.zip"), "new=")
        .await
        .unwrap();

    assert_eq!(code.code_sha256, "new=");
}

#[tokio::test]
async fn publish_detects_digest_mismatch() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "update-function-code"))
        .returning(|_| Ok(function_json("x=")));
    mock.expect_exec()
        .withf(|args| has(args, "function-updated"))
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| has(args, "get-function-configuration"))
        .returning(|_| Ok(function_json("someone-else=")));

    let client = AwsClient::with_executor(mock);
    let err = client
        .publish_function_code("hello-api", "us-east-1", Path::new("a.zip"), "mine=")
        .await
        .unwrap_err();

    match err {
        DeployError::DigestMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, "mine=");
            assert_eq!(actual, "someone-else=");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn publish_stops_after_failed_upload() {
    let mut mock = MockExecutor::new();

    // Only the upload is expected; a wait or describe call would panic
    mock.expect_exec()
        .withf(|args| has(args, "update-function-code"))
        .times(1)
        .returning(|args| {
            Err(AwsError::failed(
                args,
                "An error occurred (ResourceNotFoundException) when calling the UpdateFunctionCode \
                 operation: Function not found: arn:aws:lambda:us-east-1:123456789012:function:hello-api",
            ))
        });

    let client = AwsClient::with_executor(mock);
    let err = client
        .publish_function_code("hello-api", "us-east-1", Path::new("a.zip"), "x=")
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Upload { .. }));
    assert_eq!(FailureKind::of(&err), FailureKind::NotFound);
}

#[tokio::test]
async fn read_logs_streams_the_function_log_group() {
    let mut mock = MockExecutor::new();

    mock.expect_exec_streaming()
        .withf(|args| has(args, "tail") && has(args, "/aws/lambda/hello-api") && has(args, "--follow"))
        .times(1)
        .returning(|_| Ok(()));

    let client = AwsClient::with_executor(mock);
    client.read_logs("hello-api", "us-east-1", true).await.unwrap();
}

// ── S3 Tests ──

#[tokio::test]
async fn list_objects_parses_listing() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "list-objects-v2") && has_pair(args, "--bucket", "site"))
        .returning(|_| {
            Ok(r#"{
  "Contents": [
    {"Key": "index.html", "Size": 120, "ETag": "\"e1\""},
    {"Key": "assets/app.js", "Size": 4096, "ETag": "\"e2\""}
  ],
  "RequestCharged": null
}"#
            .to_owned())
        });

    let client = AwsClient::with_executor(mock);
    let objects = client.list_objects("site", "us-east-1").await.unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].key, "index.html");
    assert_eq!(objects[1].size, 4096);
}

#[tokio::test]
async fn list_objects_of_empty_bucket() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| Ok("\n".to_owned()));

    let client = AwsClient::with_executor(mock);
    assert!(client.list_objects("site", "us-east-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_objects_missing_bucket() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|args| {
        Err(AwsError::failed(
            args,
            "An error occurred (NoSuchBucket) when calling the ListObjectsV2 operation",
        ))
    });

    let client = AwsClient::with_executor(mock);
    let err = client.list_objects("site", "us-east-1").await.unwrap_err();

    assert!(matches!(err, StorageError::Bucket { ref bucket, .. } if bucket == "site"));
    assert_eq!(FailureKind::of(&err), FailureKind::NotFound);
}

#[tokio::test]
async fn object_sha256_reads_metadata() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has_pair(args, "--key", "index.html") && has_pair(args, "--query", "Metadata.sha256"))
        .returning(|_| Ok("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\n".to_owned()));
    mock.expect_exec()
        .withf(|args| has_pair(args, "--key", "legacy.html"))
        .returning(|_| Ok("None\n".to_owned()));

    let client = AwsClient::with_executor(mock);

    let digest = client
        .object_sha256("site", "index.html", "us-east-1")
        .await
        .unwrap();
    assert_eq!(
        digest.as_deref(),
        Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
    );

    let missing = client
        .object_sha256("site", "legacy.html", "us-east-1")
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn put_object_records_digest() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| {
            has(args, "cp")
                && has(args, "/tmp/dist/index.html")
                && has(args, "s3://site/index.html")
                && has_pair(args, "--metadata", "sha256=abc123")
        })
        .times(1)
        .returning(|_| Ok(String::new()));

    let client = AwsClient::with_executor(mock);
    client
        .put_object(
            "site",
            "index.html",
            Path::new("/tmp/dist/index.html"),
            "abc123",
            "us-east-1",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_object_removes_key() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "rm") && has(args, "s3://site/old.css"))
        .times(1)
        .returning(|_| Ok(String::new()));

    let client = AwsClient::with_executor(mock);
    client.delete_object("site", "old.css", "us-east-1").await.unwrap();
}

// ── CloudFront Tests ──

#[tokio::test]
async fn invalidation_targets_every_path() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| {
            has(args, "create-invalidation")
                && has_pair(args, "--distribution-id", "E2QWRUHAPOMQZL")
                && has_pair(args, "--paths", "/*")
        })
        .times(1)
        .returning(|_| {
            Ok(r#"{
  "Location": "https://cloudfront.amazonaws.com/2020-05-31/distribution/E2QWRUHAPOMQZL/invalidation/I2J0I21PCUYOIK",
  "Invalidation": {
    "Id": "I2J0I21PCUYOIK",
    "Status": "InProgress",
    "CreateTime": "2026-10-18T09:00:00Z",
    "InvalidationBatch": {"Paths": {"Quantity": 1, "Items": ["/*"]}, "CallerReference": "cli-1"}
  }
}"#
            .to_owned())
        });

    let client = AwsClient::with_executor(mock);
    let invalidation = client.create_invalidation("E2QWRUHAPOMQZL").await.unwrap();

    assert_eq!(INVALIDATE_ALL, "/*");
    assert_eq!(invalidation.id, "I2J0I21PCUYOIK");
    assert_eq!(invalidation.status, "InProgress");
}

#[tokio::test]
async fn invalidation_failure_is_reported() {
    let mut mock = MockExecutor::new();

    mock.expect_exec().returning(|args| {
        Err(AwsError::failed(
            args,
            "Could not connect to the endpoint URL: \"https://cloudfront.amazonaws.com/\"",
        ))
    });

    let client = AwsClient::with_executor(mock);
    let err = client.create_invalidation("E2QWRUHAPOMQZL").await.unwrap_err();

    assert!(matches!(err, InvalidationError::Create { .. }));
    assert_eq!(FailureKind::of(&err), FailureKind::Network);
}

#[tokio::test]
async fn wait_invalidation_passes_ids() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| {
            has(args, "invalidation-completed")
                && has_pair(args, "--distribution-id", "E2QWRUHAPOMQZL")
                && has_pair(args, "--id", "I2J0I21PCUYOIK")
        })
        .times(1)
        .returning(|_| Ok(String::new()));

    let client = AwsClient::with_executor(mock);
    client
        .wait_invalidation("E2QWRUHAPOMQZL", "I2J0I21PCUYOIK")
        .await
        .unwrap();
}

// ── Doctor Tests ──

fn full_config() -> ConveyorConfig {
    let mut config = ConveyorConfig::default();
    config.function.name = Some("hello-api".to_owned());
    config.frontend.bucket = Some("hello-frontend".to_owned());
    config.cdn.distribution_id = Some("E2QWRUHAPOMQZL".to_owned());
    config
}

#[tokio::test]
async fn doctor_all_checks_pass() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "--version"))
        .returning(|_| Ok("aws-cli/2.15.0 Python/3.11.6 Linux/6.1\n".to_owned()));
    mock.expect_exec()
        .withf(|args| has(args, "get-caller-identity"))
        .returning(|_| Ok("arn:aws:iam::123456789012:user/ci\n".to_owned()));
    mock.expect_exec()
        .withf(|args| has(args, "get-function-configuration"))
        .returning(|_| Ok(function_json("abc=")));
    mock.expect_exec()
        .withf(|args| has(args, "head-bucket"))
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| has(args, "get-distribution"))
        .returning(|_| Ok("Deployed\n".to_owned()));

    let client = AwsClient::with_executor(mock);
    let mut report = client.doctor(&full_config()).await;
    report.config_file = conveyor_cloud::CheckResult::ok("Found");

    assert!(report.all_passed(), "{report}");
    assert_eq!(report.aws_cli.detail, "2.15.0");
    assert_eq!(report.distribution.detail, "E2QWRUHAPOMQZL (Deployed)");
    assert!(report.to_string().contains("All checks passed!"));
}

#[tokio::test]
async fn doctor_reports_every_failure() {
    let mut mock = MockExecutor::new();

    mock.expect_exec()
        .withf(|args| has(args, "--version"))
        .returning(|_| Ok("aws-cli/2.15.0\n".to_owned()));
    mock.expect_exec()
        .withf(|args| has(args, "get-caller-identity"))
        .returning(|args| Err(AwsError::failed(args, "Unable to locate credentials")));

    // Nothing configured: resource checks fail without calling AWS
    let client = AwsClient::with_executor(mock);
    let report = client.doctor(&ConveyorConfig::default()).await;

    assert!(!report.all_passed());
    assert!(report.aws_cli.passed);
    assert_eq!(report.identity.detail, "not authenticated (auth)");
    assert!(!report.function.passed);
    assert!(!report.bucket.passed);
    assert!(!report.distribution.passed);
    assert!(report.to_string().contains("Some checks failed"));
}
