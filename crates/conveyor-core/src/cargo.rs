//! Handler crate discovery via `cargo metadata`.
//!
//! The build stage compiles the handler before packaging it, so it needs
//! the binary name Cargo will produce and the target directory it lands
//! in. Both come from `cargo metadata --no-deps`, which resolves workspace
//! inheritance and `default-run` for us.

use cargo_metadata::{MetadataCommand, TargetKind};
use std::path::{Path, PathBuf};

/// A binary target of the handler package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryTarget {
    /// Name passed to `cargo build --bin`
    pub name: String,
    pub src_path: PathBuf,
}

/// The handler package as Cargo sees it.
///
/// # Examples
///
/// ```no_run
/// use conveyor_core::HandlerCrate;
/// use std::path::Path;
///
/// let handler = HandlerCrate::discover(Path::new("crates/hello-api")).unwrap();
/// println!("packaging {} ({})", handler.name, handler.binary);
/// ```
#[derive(Debug, Clone)]
pub struct HandlerCrate {
    pub name: String,
    pub version: String,
    pub package_dir: PathBuf,
    /// `target/` of the enclosing workspace
    pub target_dir: PathBuf,
    pub binaries: Vec<BinaryTarget>,
    /// Binary shipped as the Lambda `bootstrap`.
    ///
    /// **Invariant:** matches a name in [`binaries`](Self::binaries).
    pub binary: String,
}

impl HandlerCrate {
    /// Discover the package whose manifest lives in `dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::CargoMetadata`](crate::Error::CargoMetadata) if `cargo metadata` fails
    /// - [`Error::NoPackageInDir`](crate::Error::NoPackageInDir) if `dir` is a virtual workspace root
    /// - [`Error::NoBinaryTarget`](crate::Error::NoBinaryTarget) / [`Error::MultipleBinaries`](crate::Error::MultipleBinaries)
    ///   if no single binary can be chosen
    pub fn discover(dir: &Path) -> crate::Result<Self> {
        let manifest_path = dir.join("Cargo.toml");
        tracing::debug!(path = %manifest_path.display(), "running cargo metadata");

        let metadata = MetadataCommand::new()
            .manifest_path(&manifest_path)
            .no_deps()
            .exec()
            .map_err(|e| crate::Error::CargoMetadata {
                manifest_path: manifest_path.clone(),
                detail: e.to_string(),
            })?;

        let canonical_dir = dir
            .canonicalize()
            .map_err(|e| crate::Error::HandlerDirResolve {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let package = metadata
            .packages
            .iter()
            .find(|p| {
                p.manifest_path
                    .parent()
                    .and_then(|d| d.as_std_path().canonicalize().ok())
                    .is_some_and(|d| d == canonical_dir)
            })
            .ok_or_else(|| crate::Error::NoPackageInDir {
                dir: canonical_dir.clone(),
                workspace_members: metadata
                    .packages
                    .iter()
                    .filter(|p| metadata.workspace_members.contains(&p.id))
                    .map(|p| p.name.clone())
                    .collect(),
            })?;

        let binaries: Vec<BinaryTarget> = package
            .targets
            .iter()
            .filter(|t| t.kind.contains(&TargetKind::Bin))
            .map(|t| BinaryTarget {
                name: t.name.clone(),
                src_path: PathBuf::from(t.src_path.as_std_path()),
            })
            .collect();

        let binary = select_binary(&binaries, package.default_run.as_deref(), &package.name)?;

        tracing::debug!(
            name = %package.name,
            binary = %binary,
            target_dir = %metadata.target_directory,
            "handler crate discovered"
        );

        Ok(Self {
            name: package.name.clone(),
            version: package.version.to_string(),
            package_dir: canonical_dir,
            target_dir: PathBuf::from(metadata.target_directory.as_std_path()),
            binaries,
            binary,
        })
    }

    /// Where `cargo build --release --target <triple>` leaves the binary.
    pub fn release_binary_path(&self, target: &str) -> PathBuf {
        self.target_dir
            .join(target)
            .join("release")
            .join(&self.binary)
    }
}

/// Pick the binary to ship.
///
/// `default-run` wins when it names a real target, then a lone binary,
/// then the binary named after the package.
fn select_binary(
    binaries: &[BinaryTarget],
    default_run: Option<&str>,
    package_name: &str,
) -> crate::Result<String> {
    if let Some(name) = default_run
        && binaries.iter().any(|b| b.name == name)
    {
        return Ok(name.to_owned());
    }

    match binaries {
        [] => Err(crate::Error::NoBinaryTarget {
            package: package_name.to_owned(),
        }),
        [only] => Ok(only.name.clone()),
        _ if binaries.iter().any(|b| b.name == package_name) => Ok(package_name.to_owned()),
        _ => Err(crate::Error::MultipleBinaries {
            names: binaries.iter().map(|b| b.name.clone()).collect(),
        }),
    }
}
