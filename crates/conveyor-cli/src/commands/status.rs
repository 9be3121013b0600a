use conveyor_cloud::AwsClient;
use std::path::Path;

pub async fn status() -> anyhow::Result<()> {
    let config = super::load_config(Path::new("."))?;
    let function_name = super::require_function_name(&config)?;
    let region = &config.project.region;

    let client = AwsClient::new();
    let code = client.get_function_code(function_name, region).await?;

    println!("Function:      {} ({region})", code.function_name);
    println!("  CodeSha256:  {}", code.code_sha256);
    println!("  CodeSize:    {} bytes", code.code_size);
    println!("  Modified:    {}", code.last_modified);
    if let Some(status) = &code.last_update_status {
        println!("  Update:      {status}");
    }

    match config.cdn.distribution_id.as_deref() {
        Some(id) => {
            let status = client.distribution_status(id).await?;
            println!("Distribution:  {id} ({status})");
        }
        None => println!("Distribution:  not configured"),
    }

    Ok(())
}
