use super::pipeline::{self, DeployOptions};
use std::path::Path;

/// Execute the full deploy pipeline.
pub async fn deploy(opts: DeployOptions) -> anyhow::Result<()> {
    let outcome = pipeline::run(Path::new("."), &opts).await?;

    println!();
    for step in &outcome.steps {
        println!("  {step}");
    }
    println!();
    println!(
        "Deployed {} ({}); assets: {}; invalidation: {}",
        outcome.code.function_name,
        outcome.code.code_sha256,
        outcome.sync,
        outcome.invalidation.id
    );

    Ok(())
}
