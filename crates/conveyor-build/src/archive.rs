use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Path prefixes that never go into an archive, regardless of .gitignore.
const ALWAYS_EXCLUDED: &[&str] = &["target", ".git", ".conveyor"];

/// Entry name of the compiled handler inside the archive.
pub const BOOTSTRAP_ENTRY: &str = "bootstrap";

/// What goes into a deployment archive.
#[derive(Debug, Clone)]
pub struct ArchiveSpec<'a> {
    /// Handler source tree
    pub source_dir: &'a Path,
    /// Final archive path
    pub output: &'a Path,
    /// Additional path prefixes, relative to `source_dir`, to leave out
    pub exclude: &'a [String],
    /// Compiled handler, stored as `bootstrap`
    pub bootstrap: Option<&'a Path>,
}

/// A packaged deployment archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub entries: usize,
    /// Base64 SHA-256 of the archive bytes, the encoding Lambda reports as `CodeSha256`
    pub sha256: String,
}

impl Artifact {
    /// Open an existing archive, checking it is a readable zip and
    /// recomputing its digest.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let archive = ZipArchive::new(file).map_err(|e| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })?;
        let entries = archive.len();
        let (size, sha256) = digest(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            size,
            entries,
            sha256,
        })
    }
}

/// Package the handler tree into a zip archive.
///
/// Entries are sorted and carry a fixed timestamp, so packaging the same
/// tree twice yields identical bytes. The archive is written next to its
/// destination and renamed into place, so a failed run never leaves a
/// truncated archive behind.
pub fn create_archive(layout: &ArchiveSpec<'_>) -> Result<Artifact, ArchiveError> {
    let mut excluded: Vec<PathBuf> = ALWAYS_EXCLUDED.iter().map(PathBuf::from).collect();
    excluded.extend(layout.exclude.iter().map(PathBuf::from));
    // Keep previous archives out when the output lives inside the source tree
    if let Some(out_dir) = layout
        .output
        .parent()
        .and_then(|p| p.strip_prefix(layout.source_dir).ok())
        .filter(|p| !p.as_os_str().is_empty())
    {
        excluded.push(out_dir.to_path_buf());
    }

    let files = collect_files(layout.source_dir, &excluded)?;

    if let Some(parent) = layout.output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Create {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let partial = layout.output.with_extension("zip.partial");
    let file = File::create(&partial).map_err(|e| ArchiveError::Create {
        path: partial.clone(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for relative in &files {
        let name = entry_name(relative);
        zip.start_file(name, options.unix_permissions(0o644))
            .map_err(|e| ArchiveError::Zip {
                path: partial.clone(),
                source: e,
            })?;
        copy_into(&layout.source_dir.join(relative), &mut zip)?;
    }

    if let Some(bootstrap) = layout.bootstrap {
        zip.start_file(BOOTSTRAP_ENTRY, options.unix_permissions(0o755))
            .map_err(|e| ArchiveError::Zip {
                path: partial.clone(),
                source: e,
            })?;
        copy_into(bootstrap, &mut zip)?;
    }

    zip.finish().map_err(|e| ArchiveError::Zip {
        path: partial.clone(),
        source: e,
    })?;

    std::fs::rename(&partial, layout.output).map_err(|e| ArchiveError::Create {
        path: layout.output.to_path_buf(),
        source: e,
    })?;

    let (size, sha256) = digest(layout.output)?;
    let entries = files.len() + usize::from(layout.bootstrap.is_some());

    tracing::debug!(
        path = %layout.output.display(),
        entries,
        size,
        sha256 = %sha256,
        "archive written"
    );

    Ok(Artifact {
        path: layout.output.to_path_buf(),
        size,
        entries,
        sha256,
    })
}

/// Files that make up the handler tree, relative to `source_dir`, sorted.
///
/// Uses `git ls-files` so `.gitignore` is respected; outside a git
/// checkout the directory is walked instead.
pub fn collect_files(source_dir: &Path, excluded: &[PathBuf]) -> Result<Vec<PathBuf>, ArchiveError> {
    let candidates = match git_ls_files(source_dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::debug!(error = %e, "git ls-files unavailable; walking the directory");
            walk_files(source_dir, excluded)?
        }
    };

    let mut files: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|relative| !excluded.iter().any(|ex| relative.starts_with(ex)))
        // ls-files --cached still lists tracked files deleted from the worktree
        .filter(|relative| source_dir.join(relative).is_file())
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

fn git_ls_files(source_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let output = Command::new("git")
        .args(["ls-files", "--cached", "--others", "--exclude-standard"])
        .current_dir(source_dir)
        .output()
        .map_err(|e| ArchiveError::GitCommand {
            detail: "failed to execute git ls-files".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArchiveError::GitFailed {
            detail: format!(
                "git ls-files exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn walk_files(source_dir: &Path, excluded: &[PathBuf]) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(source_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(source_dir)
                .map(|rel| !excluded.iter().any(|ex| rel.starts_with(ex)))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry.map_err(|e| ArchiveError::Walk {
            path: source_dir.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(source_dir) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Zip entry names always use `/`.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_into<W: Write>(src: &Path, out: &mut W) -> Result<(), ArchiveError> {
    let mut file = File::open(src).map_err(|e| ArchiveError::Read {
        path: src.to_path_buf(),
        source: e,
    })?;
    std::io::copy(&mut file, out).map_err(|e| ArchiveError::Read {
        path: src.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn digest(path: &Path) -> Result<(u64, String), ArchiveError> {
    let read_err = |e| ArchiveError::Read {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf).map_err(read_err)?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buf[..n]);
    }
    Ok((size, STANDARD.encode(hasher.finalize())))
}

/// Checks whether the project directory has uncommitted changes.
///
/// Only paths under `project_dir` are considered, and `ignored` (the
/// archive output directory, relative to the project) never counts, even
/// when the project is a subdirectory of the repository.
pub fn is_dirty(project_dir: &Path, ignored: &Path) -> Result<bool, ArchiveError> {
    let mut args = vec!["status".to_owned(), "--porcelain".to_owned(), "--".to_owned(), ".".to_owned()];
    if let Some(dir) = project_relative(project_dir, ignored) {
        args.push(format!(":(exclude){dir}"));
    }

    let output = Command::new("git")
        .args(&args)
        .current_dir(project_dir)
        .output()
        .map_err(|e| ArchiveError::GitCommand {
            detail: "failed to execute git status".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArchiveError::GitFailed {
            detail: format!(
                "git status exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
}

/// `dir` as a `/`-joined path relative to `project_dir`, with `.` segments
/// dropped. `None` when it is the project itself or lies outside it.
fn project_relative(project_dir: &Path, dir: &Path) -> Option<String> {
    let relative = if dir.is_absolute() {
        let root = project_dir.canonicalize().ok()?;
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        dir.strip_prefix(&root).ok()?.to_path_buf()
    } else {
        dir.to_path_buf()
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to create {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to write archive {path}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("{path} is not a valid zip archive")]
    Corrupt {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    GitFailed { detail: String },
}
