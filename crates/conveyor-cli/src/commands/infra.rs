use conveyor_build::infra;
use conveyor_build::terraform::TerraformGenerator;
use conveyor_core::{ConveyorConfig, ResourceNames};
use std::path::Path;

/// Write the Terraform declarations for the function, bucket and
/// distribution into `infra/`.
pub async fn infra_init() -> anyhow::Result<()> {
    let config = super::load_config(Path::new("."))?;
    let (names, project, artifact) = resolve(&config)?;
    let generator = TerraformGenerator::new(&names, &project, &artifact, &config.build.target);

    let written = infra::init(Path::new(super::INFRA_DIR), &generator)?;
    for path in &written {
        println!("Created {}", path.display());
    }

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Build the archive Terraform creates the function from:");
    println!("     conveyor build");
    println!();
    println!("  2. Provision:");
    println!("     cd {} && terraform init && terraform apply", super::INFRA_DIR);
    println!();
    println!("  3. Record the distribution id in conveyor.toml ([cdn].distribution_id):");
    println!("     terraform output -raw distribution_id");

    Ok(())
}

/// Re-render `conveyor.auto.tfvars.json` after conveyor.toml changed.
pub async fn infra_vars() -> anyhow::Result<()> {
    let infra_dir = Path::new(super::INFRA_DIR);
    if !infra::is_initialized(infra_dir) {
        anyhow::bail!("No Terraform declarations in {} — run: conveyor infra init", infra_dir.display());
    }

    let config = super::load_config(Path::new("."))?;
    let (names, project, artifact) = resolve(&config)?;
    let generator = TerraformGenerator::new(&names, &project, &artifact, &config.build.target);

    let path = infra::write_vars(infra_dir, &generator)?;
    println!("Updated {}", path.display());
    Ok(())
}

/// Resource names, project tag and the archive path as seen from `infra/`.
fn resolve(config: &ConveyorConfig) -> anyhow::Result<(ResourceNames, String, String)> {
    let names = ResourceNames::from_config(config)?;
    let project = config
        .project
        .name
        .clone()
        .unwrap_or_else(|| names.function_name.clone());
    let artifact = Path::new("..").join(super::artifact_path(config, &names.function_name));
    let artifact = artifact.to_string_lossy().replace('\\', "/");
    Ok((names, project, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConveyorConfig {
        let mut config = ConveyorConfig::default();
        config.function.name = Some("hello-api".to_owned());
        config.frontend.bucket = Some("hello-site".to_owned());
        config
    }

    #[test]
    fn artifact_path_is_relative_to_infra_dir() {
        let (_, _, artifact) = resolve(&config()).unwrap();
        assert_eq!(artifact, "../.conveyor/hello-api.zip");
    }

    #[test]
    fn project_falls_back_to_function_name() {
        let (_, project, _) = resolve(&config()).unwrap();
        assert_eq!(project, "hello-api");

        let mut named = config();
        named.project.name = Some("storefront".to_owned());
        let (names, project, _) = resolve(&named).unwrap();
        assert_eq!(project, "storefront");
        assert_eq!(names.function_name, "hello-api");
    }

    #[test]
    fn missing_bucket_is_reported() {
        let mut config = config();
        config.frontend.bucket = None;
        let err = resolve(&config).unwrap_err();
        assert!(err.to_string().contains("CONVEYOR_BUCKET"));
    }
}
