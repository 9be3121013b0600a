use crate::aws::AwsError;
use std::process::Stdio;

/// Abstraction over AWS CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait AwsExecutor: Send + Sync {
    /// Execute an aws command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, AwsError>;

    /// Execute an aws command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), AwsError>;
}

/// Real AWS CLI executor.
///
/// Credentials and profile selection are left to the CLI's own chain.
pub struct RealExecutor;

fn command(args: &[String]) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("aws");
    // v2 pipes long output through a pager unless told not to
    cmd.args(args).env("AWS_PAGER", "");
    cmd
}

impl AwsExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, AwsError> {
        tracing::debug!(?args, "aws");

        let output = command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AwsError::NotFound { source: e })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| AwsError::InvalidUtf8 { source: e })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            Err(AwsError::failed(args, stderr))
        }
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), AwsError> {
        tracing::debug!(?args, "aws (streaming)");

        let status = command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| AwsError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(AwsError::failed(args, format!("exit code: {status}")))
        }
    }
}
