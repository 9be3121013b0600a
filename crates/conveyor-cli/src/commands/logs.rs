use conveyor_cloud::AwsClient;
use std::path::Path;

pub async fn logs(follow: bool) -> anyhow::Result<()> {
    let config = super::load_config(Path::new("."))?;
    let function_name = super::require_function_name(&config)?;

    let client = AwsClient::new();
    client
        .read_logs(function_name, &config.project.region, follow)
        .await?;

    Ok(())
}
