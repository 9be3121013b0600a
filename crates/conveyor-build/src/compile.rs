use std::path::PathBuf;
use std::process::Command;

use conveyor_core::HandlerCrate;

/// Compile the handler binary for `target` in release mode.
///
/// Cargo's output is streamed to the terminal. Returns the path of the
/// produced executable.
pub fn compile_handler(handler: &HandlerCrate, target: &str) -> Result<PathBuf, CompileError> {
    let args = [
        "build",
        "--release",
        "--bin",
        handler.binary.as_str(),
        "--target",
        target,
    ];
    tracing::info!(command = %format!("cargo {}", args.join(" ")), "compiling handler");

    let status = Command::new("cargo")
        .args(args)
        .current_dir(&handler.package_dir)
        .status()
        .map_err(|e| CompileError::Spawn { source: e })?;

    if !status.success() {
        return Err(CompileError::Failed {
            binary: handler.binary.clone(),
            target: target.to_owned(),
            status: status.to_string(),
        });
    }

    let binary = handler.release_binary_path(target);
    if !binary.is_file() {
        return Err(CompileError::MissingBinary { path: binary });
    }
    Ok(binary)
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to run cargo")]
    Spawn { source: std::io::Error },
    #[error("cargo build of '{binary}' for {target} failed ({status}) — is the target installed? try: rustup target add {target}")]
    Failed {
        binary: String,
        target: String,
        status: String,
    },
    #[error("cargo build succeeded but {path} was not produced")]
    MissingBinary { path: PathBuf },
}
