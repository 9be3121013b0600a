use super::lock::RunLock;
use std::path::Path;

/// Remove the local output directory (archives, run lock).
///
/// Cloud resources are owned by Terraform and are never touched here.
pub async fn clean() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    let config = super::load_config(project_dir)?;
    let output_dir = project_dir.join(&config.build.output_dir);

    if !output_dir.exists() {
        println!("Nothing to clean.");
        return Ok(());
    }
    if RunLock::is_held(&output_dir) {
        anyhow::bail!(
            "a deploy is running (lock present in {}) — wait for it to finish",
            output_dir.display()
        );
    }

    std::fs::remove_dir_all(&output_dir)?;
    println!("Removed {}", config.build.output_dir.display());
    Ok(())
}
