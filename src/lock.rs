use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use fs2::FileExt;
use log::debug;

use crate::error::BenchError;

/// Exclusive per-target lock held for the duration of a run.
///
/// The lock is an OS advisory lock on `stylus-cache-bench-<addr>.lock`, so it
/// is released when the handle closes, including when the process is killed.
/// The file itself stays in place and only records the pid of the last holder.
#[derive(Debug)]
pub struct TargetLock {
    file: File,
    path: PathBuf,
}

impl TargetLock {
    pub fn acquire(dir: &Path, target: Address) -> Result<Self, BenchError> {
        let path = Self::path_for(dir, target);
        let file_err = |source| BenchError::LockFile {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(file_err)?;

        if let Err(err) = FileExt::try_lock_exclusive(&file) {
            if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(BenchError::Locked {
                    address: target,
                    holder: Self::holder(&path),
                    path: path.clone(),
                });
            }
            return Err(file_err(err));
        }

        file.set_len(0).map_err(file_err)?;
        writeln!(file, "{}", std::process::id()).map_err(file_err)?;

        debug!("acquired lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path_for(dir: &Path, target: Address) -> PathBuf {
        dir.join(format!("stylus-cache-bench-{}.lock", hex::encode(target)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("unlock {}: {err}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TARGET: Address = address!("a6e41ffd769491a42a6e5ce453259b93983a22ef");

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let _held = TargetLock::acquire(dir.path(), TARGET).unwrap();

        let err = TargetLock::acquire(dir.path(), TARGET).unwrap_err();
        match err {
            BenchError::Locked {
                address, holder, ..
            } => {
                assert_eq!(address, TARGET);
                assert_eq!(holder, Some(std::process::id()));
            }
            other => panic!("expected contention, got {other}"),
        }
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        drop(TargetLock::acquire(dir.path(), TARGET).unwrap());

        TargetLock::acquire(dir.path(), TARGET).unwrap();
    }

    #[test]
    fn leftover_file_from_dead_run_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = TargetLock::path_for(dir.path(), TARGET);
        fs::write(&path, "999999\n").unwrap();

        let lock = TargetLock::acquire(dir.path(), TARGET).unwrap();

        assert_eq!(lock.path(), path);
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn missing_lock_dir_is_not_contention() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = TargetLock::acquire(&missing, TARGET).unwrap_err();

        assert!(matches!(err, BenchError::LockFile { .. }));
        assert!(!err.to_string().contains("another run"), "{err}");
    }

    #[test]
    fn distinct_targets_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _a = TargetLock::acquire(dir.path(), TARGET).unwrap();
        let _b = TargetLock::acquire(dir.path(), Address::ZERO).unwrap();
    }
}
