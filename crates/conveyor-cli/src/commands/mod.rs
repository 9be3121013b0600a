mod build;
mod ci;
mod clean;
mod deploy;
mod doctor;
mod infra;
mod init;
mod lock;
mod logs;
mod pipeline;
mod status;

use conveyor_build::archive::{ArchiveSpec, Artifact, create_archive};
use conveyor_build::compile::compile_handler;
use conveyor_core::{ConveyorConfig, HandlerCrate};
use std::path::{Path, PathBuf};

/// Directory `infra init` writes the Terraform declarations to.
pub(crate) const INFRA_DIR: &str = "infra";

pub use build::build;
pub use ci::ci_init;
pub use clean::clean;
pub use deploy::deploy;
pub use doctor::doctor;
pub use infra::{infra_init, infra_vars};
pub use init::init_project;
pub use logs::logs;
pub use pipeline::DeployOptions;
pub use status::status;

/// `conveyor.toml` with environment overrides applied.
pub(crate) fn load_config(project_dir: &Path) -> anyhow::Result<ConveyorConfig> {
    Ok(ConveyorConfig::load_with_env(project_dir)?)
}

pub(crate) fn require_function_name(config: &ConveyorConfig) -> anyhow::Result<&str> {
    let name = config
        .function_name()
        .ok_or(conveyor_core::Error::MissingSetting {
            key: "[function].name",
            env: "CONVEYOR_FUNCTION_NAME",
        })?;
    conveyor_core::resources::validate_function_name(name)?;
    Ok(name)
}

/// `<output_dir>/<function>.zip`, relative to the project.
pub(crate) fn artifact_path(config: &ConveyorConfig, function_name: &str) -> PathBuf {
    config.build.output_dir.join(format!("{function_name}.zip"))
}

/// Stage 1: compile the handler (when enabled) and package the archive.
pub(crate) fn build_artifact(project_dir: &Path, config: &ConveyorConfig) -> anyhow::Result<Artifact> {
    let function_name = require_function_name(config)?;
    let source_dir = project_dir.join(&config.function.source_dir);

    let bootstrap = if config.build.compile {
        let handler = HandlerCrate::discover(&source_dir)?;
        tracing::info!(
            binary = %handler.binary,
            target = %config.build.target,
            "compiling handler"
        );
        Some(compile_handler(&handler, &config.build.target)?)
    } else {
        None
    };

    let output = project_dir.join(artifact_path(config, function_name));
    let artifact = create_archive(&ArchiveSpec {
        source_dir: &source_dir,
        output: &output,
        exclude: &config.build.exclude,
        bootstrap: bootstrap.as_deref(),
    })?;
    Ok(artifact)
}
