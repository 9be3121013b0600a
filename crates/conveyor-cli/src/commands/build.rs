use std::path::Path;

/// Stage 1 only: package the handler archive.
pub async fn build() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    let config = super::load_config(project_dir)?;

    println!("Building deployment archive...");
    let artifact = super::build_artifact(project_dir, &config)?;

    println!();
    println!("Artifact: {}", artifact.path.display());
    println!("  entries: {}", artifact.entries);
    println!("  size:    {} bytes", artifact.size);
    println!("  sha256:  {}", artifact.sha256);

    Ok(())
}
