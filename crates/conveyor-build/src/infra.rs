use std::path::{Path, PathBuf};

use crate::terraform::TerraformGenerator;

/// Variable file Terraform loads automatically from the working directory.
pub const TFVARS_FILE: &str = "conveyor.auto.tfvars.json";

const DECLARATION_FILES: &[&str] = &["main.tf", "variables.tf", "outputs.tf"];

/// Write the Terraform declarations and variables into `infra_dir`.
///
/// The declarations are meant to be edited afterwards, so an existing
/// `main.tf` is never overwritten. Returns the files written.
pub fn init(infra_dir: &Path, generator: &TerraformGenerator<'_>) -> Result<Vec<PathBuf>, InfraError> {
    let main_tf = infra_dir.join("main.tf");
    if main_tf.exists() {
        return Err(InfraError::AlreadyInitialized(main_tf));
    }

    std::fs::create_dir_all(infra_dir).map_err(|e| InfraError::CreateDir {
        path: infra_dir.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::new();
    for (file, content) in DECLARATION_FILES.iter().zip([
        generator.render_main(),
        generator.render_variables(),
        generator.render_outputs(),
    ]) {
        let path = infra_dir.join(file);
        write(&path, &content)?;
        written.push(path);
    }
    written.push(write_vars(infra_dir, generator)?);

    Ok(written)
}

/// (Re)write `conveyor.auto.tfvars.json`. It is derived from
/// conveyor.toml, so it is always replaced.
pub fn write_vars(infra_dir: &Path, generator: &TerraformGenerator<'_>) -> Result<PathBuf, InfraError> {
    std::fs::create_dir_all(infra_dir).map_err(|e| InfraError::CreateDir {
        path: infra_dir.to_path_buf(),
        source: e,
    })?;
    let path = infra_dir.join(TFVARS_FILE);
    let content = generator
        .render_tfvars()
        .map_err(|e| InfraError::Render { source: e })?;
    write(&path, &content)?;
    Ok(path)
}

/// Check if the declarations have been written.
pub fn is_initialized(infra_dir: &Path) -> bool {
    infra_dir.join("main.tf").exists()
}

fn write(path: &Path, content: &str) -> Result<(), InfraError> {
    std::fs::write(path, content).map_err(|e| InfraError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("failed to create infra directory at {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("infrastructure already initialized at {0} — edit it directly, or delete it to re-generate")]
    AlreadyInitialized(PathBuf),
    #[error("failed to render Terraform variables")]
    Render { source: serde_json::Error },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
