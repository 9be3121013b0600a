use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub(crate) const LOCK_FILE: &str = "deploy.lock";

/// Exclusive claim on the output directory for the length of one deploy.
///
/// The lock file is created with `create_new`, so exactly one process can
/// hold it; it records the holder's pid and is removed on drop.
#[derive(Debug)]
pub(crate) struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub(crate) fn acquire(output_dir: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(output_dir).map_err(|e| LockError::Io {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let path = output_dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id()).map_err(|e| LockError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                tracing::debug!(path = %path.display(), "run lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let pid = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.trim().parse().ok());
                Err(LockError::Held { path, pid })
            }
            Err(e) => Err(LockError::Io { path, source: e }),
        }
    }

    pub(crate) fn is_held(output_dir: &Path) -> bool {
        output_dir.join(LOCK_FILE).exists()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}

fn holder(pid: &Option<u32>) -> String {
    pid.map(|p| format!(" (pid {p})")).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LockError {
    #[error(
        "another deploy is running{} — wait for it to finish, or delete {path} if that process is gone",
        holder(.pid)
    )]
    Held { path: PathBuf, pid: Option<u32> },

    #[error("failed to create run lock at {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_fails_while_held() {
        let tmp = TempDir::new().unwrap();
        let _lock = RunLock::acquire(tmp.path()).unwrap();

        let err = RunLock::acquire(tmp.path()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, LockError::Held { pid: Some(_), .. }));
        assert!(message.contains(&format!("pid {}", std::process::id())), "got: {message}");
    }

    #[test]
    fn drop_releases_the_lock() {
        let tmp = TempDir::new().unwrap();
        {
            let _lock = RunLock::acquire(tmp.path()).unwrap();
            assert!(RunLock::is_held(tmp.path()));
        }
        assert!(!RunLock::is_held(tmp.path()));
        assert!(RunLock::acquire(tmp.path()).is_ok());
    }

    #[test]
    fn creates_missing_output_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".conveyor");
        let _lock = RunLock::acquire(&dir).unwrap();
        assert!(dir.join(LOCK_FILE).exists());
    }

    #[test]
    fn unreadable_holder_is_reported_without_pid() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(LOCK_FILE), "garbage").unwrap();

        let err = RunLock::acquire(tmp.path()).unwrap_err();
        assert!(matches!(err, LockError::Held { pid: None, .. }));
        assert!(err.to_string().starts_with("another deploy is running —"));
    }
}
