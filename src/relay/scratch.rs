use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

/// Process-wide sequence shared by every scratch directory
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Directory holding files that live for exactly one outbound send
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ScratchDir { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Build a file name no other invocation can get
    ///
    /// Names look like `<prefix>_<sequence>_<random><ext>`. The sequence
    /// alone is unique within the process; the random part keeps names apart
    /// across restarts that reuse the same directory.
    pub fn unique_path(&self, prefix: &str, ext: &str) -> PathBuf {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let token: u64 = rand::random();
        let ext = if ext.is_empty() || ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        };

        self.root
            .join(format!("{}_{}_{:016x}{}", prefix, sequence, token, ext))
    }

    /// Delete every regular file left in the directory
    ///
    /// # Returns
    /// The number of files removed
    pub async fn clear(&self) -> std::io::Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        debug!("Cleared {} files from {}", removed, self.root.display());
        Ok(removed)
    }
}

/// A file in the scratch directory owned by a single invocation
///
/// The file is removed by [`StagedFile::discard`] or, on any other exit path,
/// when the value is dropped.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    pub fn new(path: PathBuf) -> Self {
        StagedFile {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file, logging instead of failing
    pub async fn discard(mut self) {
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed staged file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed abandoned staged file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_unique_path_shape() {
        let scratch = ScratchDir::new("/tmp/scratch");

        let with_dot = scratch.unique_path("thumb", ".jpg");
        let without_dot = scratch.unique_path("thumb", "jpg");

        assert!(with_dot.starts_with("/tmp/scratch"));
        assert_eq!(with_dot.extension().unwrap(), "jpg");
        assert_eq!(without_dot.extension().unwrap(), "jpg");
        assert!(
            with_dot
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("thumb_")
        );
        assert_ne!(with_dot, without_dot);
    }

    #[tokio::test]
    async fn test_unique_path_under_parallel_callers() {
        let scratch = ScratchDir::new("/tmp/scratch");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let scratch = scratch.clone();
            handles.push(tokio::spawn(async move {
                (0..64)
                    .map(|_| scratch.unique_path("youtube", ".mp4"))
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for path in handle.await.unwrap() {
                assert!(seen.insert(path), "duplicate staged name");
            }
        }
        assert_eq!(seen.len(), 16 * 64);
    }

    #[tokio::test]
    async fn test_staged_file_discard_and_drop() -> std::io::Result<()> {
        let dir = tempdir()?;
        let scratch = ScratchDir::new(dir.path());

        let discarded = StagedFile::new(scratch.unique_path("a", ".bin"));
        fs::write(discarded.path(), b"data").await?;
        let discarded_path = discarded.path().to_path_buf();
        discarded.discard().await;
        assert!(!discarded_path.exists());

        let dropped = StagedFile::new(scratch.unique_path("b", ".bin"));
        fs::write(dropped.path(), b"data").await?;
        let dropped_path = dropped.path().to_path_buf();
        drop(dropped);
        assert!(!dropped_path.exists());

        // Never written: dropping must stay quiet
        drop(StagedFile::new(scratch.unique_path("c", ".bin")));

        Ok(())
    }

    #[tokio::test]
    async fn test_clear() -> std::io::Result<()> {
        let dir = tempdir()?;
        let scratch = ScratchDir::new(dir.path().join("tmp"));

        assert_eq!(scratch.clear().await?, 0);

        scratch.ensure().await?;
        fs::write(scratch.unique_path("x", ".jpg"), b"1").await?;
        fs::write(scratch.unique_path("y", ".mp4"), b"2").await?;

        assert_eq!(scratch.clear().await?, 2);
        assert!(std::fs::read_dir(scratch.path())?.next().is_none());
        Ok(())
    }
}
