use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration, naming and handler-discovery failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── conveyor.toml ──
    #[error("failed to read {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid conveyor.toml")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Resource naming ──
    #[error("{key} not set in conveyor.toml — set it there or export {env}")]
    MissingSetting {
        key: &'static str,
        env: &'static str,
    },

    #[error("invalid {kind} {name:?}: {reason}")]
    InvalidResourceName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    // ── Handler crate discovery ──
    #[error("cargo metadata failed for {manifest_path}: {detail}")]
    CargoMetadata {
        manifest_path: PathBuf,
        detail: String,
    },

    #[error("failed to resolve handler directory {path}")]
    HandlerDirResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "no package rooted at {dir}; workspace members: {}",
        member_list(workspace_members)
    )]
    NoPackageInDir {
        dir: PathBuf,
        workspace_members: Vec<String>,
    },

    #[error("no binary target in package '{package}' — the handler must build an executable")]
    NoBinaryTarget { package: String },

    #[error(
        "handler crate has several binaries ({}); set `default-run` in its Cargo.toml",
        names.join(", ")
    )]
    MultipleBinaries { names: Vec<String> },
}

fn member_list(members: &[String]) -> String {
    match members {
        [] => "(none)".to_owned(),
        _ => members.join(", "),
    }
}
