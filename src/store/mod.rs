//! Artifact persistence
//!
//! Content-agnostic save/load of fitted objects. Every file is a versioned
//! [`Envelope`] so a transformer can never be read back as a model, and a
//! truncated or tampered file is reported as corrupt instead of decoding into
//! garbage.

mod config;
mod envelope;

pub use config::ArtifactConfig;
pub use envelope::{fnv1a, Envelope, FORMAT_VERSION, MAGIC};

use crate::error::{ErrorKind, Result, ResultExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An object that can be persisted by the [`ArtifactStore`]
pub trait Artifact: Serialize + DeserializeOwned {
    /// Type tag written into the envelope
    const KIND: &'static str;
    /// Bumped whenever the serialized layout of the type changes
    const SCHEMA_VERSION: u32;
}

/// Reads and writes artifacts on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore;

impl ArtifactStore {
    pub fn new() -> Self {
        Self
    }

    /// Serialize `artifact` to `path`, replacing any existing file.
    ///
    /// Parent directories are created as needed. The bytes go to a sibling
    /// temporary file first and are renamed over the target.
    pub fn save<A: Artifact>(&self, path: &Path, artifact: &A) -> Result<()> {
        let staged = self.stage(path, artifact)?;
        self.commit(vec![staged])
    }

    /// Write `artifact` next to `path` without touching `path` itself.
    ///
    /// Nothing becomes visible until the result is passed to
    /// [`commit`](Self::commit). Dropping it removes the temporary file.
    pub fn stage<A: Artifact>(&self, path: &Path, artifact: &A) -> Result<StagedArtifact> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).wrap_err_with(ErrorKind::Persistence, "store.create_dir", || {
                format!("cannot create {}", parent.display())
            })?;
        }

        let payload = bincode::serialize(artifact).wrap_err(ErrorKind::Persistence, "store.encode")?;
        let bytes = Envelope::new(A::KIND, A::SCHEMA_VERSION, payload).to_bytes()?;

        let staged = StagedArtifact {
            tmp: sibling(path, "tmp"),
            target: path.to_path_buf(),
        };
        let write = || -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(&staged.tmp)?);
            writer.write_all(&bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        };
        write().wrap_err_with(ErrorKind::Persistence, "store.write", || {
            format!("cannot write {}", path.display())
        })?;

        debug!(path = %path.display(), kind = A::KIND, bytes = bytes.len(), "staged artifact");
        Ok(staged)
    }

    /// Move staged artifacts over their targets as one unit.
    ///
    /// Existing targets are set aside first. If any rename fails, every
    /// target already replaced is restored, so callers see either all new
    /// files or all old ones.
    pub fn commit(&self, staged: Vec<StagedArtifact>) -> Result<()> {
        const STEP: &str = "store.commit";

        let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
        for item in &staged {
            if item.target.is_file() {
                let backup = sibling(&item.target, "bak");
                if let Err(e) = fs::rename(&item.target, &backup) {
                    restore(&backups, &[]);
                    return Err(e).wrap_err_with(ErrorKind::Persistence, STEP, || {
                        format!("cannot set aside {}", item.target.display())
                    });
                }
                backups.push((item.target.clone(), backup));
            }
        }

        let mut placed: Vec<PathBuf> = Vec::new();
        for item in &staged {
            if let Err(e) = fs::rename(&item.tmp, &item.target) {
                restore(&backups, &placed);
                return Err(e).wrap_err_with(ErrorKind::Persistence, STEP, || {
                    format!("cannot move artifact into {}", item.target.display())
                });
            }
            placed.push(item.target.clone());
        }

        for (_, backup) in &backups {
            let _ = fs::remove_file(backup);
        }
        for item in &staged {
            debug!(path = %item.target.display(), "committed artifact");
        }
        Ok(())
    }

    /// Deserialize an artifact of type `A` from `path`
    pub fn load<A: Artifact>(&self, path: &Path) -> Result<A> {
        let bytes = fs::read(path).wrap_err_with(ErrorKind::Persistence, "store.read", || {
            format!("cannot read {}", path.display())
        })?;

        let envelope = Envelope::from_bytes(&bytes, A::KIND, A::SCHEMA_VERSION)?;
        let artifact = bincode::deserialize(&envelope.payload)
            .wrap_err_with(ErrorKind::CorruptArtifact, "store.decode", || {
                format!("cannot decode {} payload in {}", A::KIND, path.display())
            })?;

        debug!(path = %path.display(), kind = A::KIND, "loaded artifact");
        Ok(artifact)
    }

    /// Report whether a file exists at `path` without decoding it
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// A serialized artifact waiting in a temporary file
#[derive(Debug)]
pub struct StagedArtifact {
    tmp: PathBuf,
    target: PathBuf,
}

impl StagedArtifact {
    /// Path the artifact will occupy once committed
    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        // Already renamed when committed
        let _ = fs::remove_file(&self.tmp);
    }
}

/// Undo a partial commit: drop new files, then put the old ones back
fn restore(backups: &[(PathBuf, PathBuf)], placed: &[PathBuf]) {
    for target in placed {
        let _ = fs::remove_file(target);
    }
    for (target, backup) in backups {
        let _ = fs::rename(backup, target);
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Weights {
        values: Vec<f64>,
        bias: f64,
    }

    impl Artifact for Weights {
        const KIND: &'static str = "weights";
        const SCHEMA_VERSION: u32 = 1;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Other(u32);

    impl Artifact for Other {
        const KIND: &'static str = "other";
        const SCHEMA_VERSION: u32 = 1;
    }

    fn weights() -> Weights {
        Weights {
            values: vec![1.0, 2.0, 3.0],
            bias: 0.5,
        }
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("w.bin");
        let store = ArtifactStore::new();

        store.save(&path, &weights()).unwrap();
        assert!(store.exists(&path));
        assert!(!sibling(&path, "tmp").exists());
        assert_eq!(store.load::<Weights>(&path).unwrap(), weights());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.bin");
        let store = ArtifactStore::new();

        store.save(&path, &weights()).unwrap();
        let updated = Weights {
            values: vec![9.0],
            bias: -1.0,
        };
        store.save(&path, &updated).unwrap();
        assert_eq!(store.load::<Weights>(&path).unwrap(), updated);
    }

    #[test]
    fn test_load_missing_is_persistence_error() {
        let dir = tempdir().unwrap();
        let err = ArtifactStore::new()
            .load::<Weights>(&dir.path().join("missing.bin"))
            .unwrap_err();
        assert!(err.is(ErrorKind::Persistence));
        assert!(!ArtifactStore::new().exists(&dir.path().join("missing.bin")));
    }

    #[test]
    fn test_wrong_kind_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.bin");
        let store = ArtifactStore::new();
        store.save(&path, &weights()).unwrap();

        let err = store.load::<Other>(&path).unwrap_err();
        assert!(err.is(ErrorKind::CorruptArtifact));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.bin");
        std::fs::write(&path, b"not an artifact at all").unwrap();

        let err = ArtifactStore::new().load::<Weights>(&path).unwrap_err();
        assert!(err.is(ErrorKind::CorruptArtifact));
    }

    #[test]
    fn test_unwritable_directory_is_persistence_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = ArtifactStore::new()
            .save(&blocker.join("w.bin"), &weights())
            .unwrap_err();
        assert!(err.is(ErrorKind::Persistence));
    }

    #[test]
    fn test_dropped_stage_leaves_target_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.bin");
        let store = ArtifactStore::new();
        store.save(&path, &weights()).unwrap();

        let staged = store
            .stage(&path, &Weights { values: vec![], bias: 9.0 })
            .unwrap();
        assert_eq!(staged.target(), path.as_path());
        drop(staged);

        assert_eq!(store.load::<Weights>(&path).unwrap(), weights());
        assert!(!sibling(&path, "tmp").exists());
    }

    #[test]
    fn test_commit_replaces_all_targets() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let store = ArtifactStore::new();
        store.save(&a, &weights()).unwrap();

        let updated = Weights { values: vec![4.0], bias: 0.0 };
        let staged = vec![store.stage(&a, &updated).unwrap(), store.stage(&b, &Other(3)).unwrap()];
        store.commit(staged).unwrap();

        assert_eq!(store.load::<Weights>(&a).unwrap(), updated);
        assert_eq!(store.load::<Other>(&b).unwrap().0, 3);
        assert!(!sibling(&a, "bak").exists());
    }

    #[test]
    fn test_failed_commit_restores_previous_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b");
        let store = ArtifactStore::new();
        store.save(&a, &weights()).unwrap();

        let staged_a = store.stage(&a, &Weights { values: vec![], bias: 1.0 }).unwrap();
        let staged_b = store.stage(&b, &Other(1)).unwrap();
        // A non-empty directory cannot be replaced by a file
        std::fs::create_dir(&b).unwrap();
        std::fs::write(b.join("keep"), b"x").unwrap();

        let err = store.commit(vec![staged_a, staged_b]).unwrap_err();
        assert!(err.is(ErrorKind::Persistence));
        assert_eq!(store.load::<Weights>(&a).unwrap(), weights());
        assert!(b.join("keep").is_file());
    }
}
