//! Request-scoped temporary files.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::Result;

/// A file on disk owned by exactly one request.
///
/// The file is removed by [`TemporaryAsset::close`], or on drop if the
/// owning future is cancelled before it gets there.
#[derive(Debug)]
pub struct TemporaryAsset {
    path: TempPath,
}

impl TemporaryAsset {
    /// Prefix of every file created here.
    pub const PREFIX: &'static str = "glance-";

    /// Write `bytes` to a uniquely named file with the given suffix.
    ///
    /// Uses `dir` when given, the OS temp directory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written. A
    /// partially written file is removed before returning.
    pub async fn write(dir: Option<&Path>, suffix: &str, bytes: &[u8]) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(Self::PREFIX).suffix(suffix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let path = file.into_temp_path();

        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), len = bytes.len(), "wrote temporary asset");

        Ok(Self { path })
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file.
    ///
    /// A file that is already gone is fine; any other failure is logged
    /// and swallowed.
    pub fn close(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(path = %shown, "removed temporary asset"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %shown, error = %e, "failed to remove temporary asset"),
        }
    }
}

/// Run `op` against a temporary copy of `bytes`, then delete it.
///
/// The file is removed whether `op` succeeds or fails.
///
/// # Errors
///
/// Returns the write error, or whatever `op` returns.
pub async fn with_temp_asset<F, Fut, T>(
    dir: Option<&Path>,
    suffix: &str,
    bytes: &[u8],
    op: F,
) -> Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let asset = TemporaryAsset::write(dir, suffix, bytes).await?;
    let result = op(asset.path().to_path_buf()).await;
    asset.close();
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn write_creates_prefixed_file_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let asset = TemporaryAsset::write(Some(dir.path()), ".mp4", b"abc")
            .await
            .unwrap();

        let name = asset.path().file_name().unwrap().to_str().unwrap().to_owned();
        assert!(name.starts_with("glance-"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(std::fs::read(asset.path()).unwrap(), b"abc");

        asset.close();
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn close_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let asset = TemporaryAsset::write(Some(dir.path()), ".jpg", b"x")
            .await
            .unwrap();
        std::fs::remove_file(asset.path()).unwrap();
        asset.close();
    }

    #[tokio::test]
    async fn scoped_helper_cleans_up_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let seen = with_temp_asset(Some(dir.path()), ".jpg", b"data", |path| async move {
            assert!(path.exists());
            Ok::<_, Error>(std::fs::read(&path)?)
        })
        .await
        .unwrap();

        assert_eq!(seen, b"data");
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn scoped_helper_cleans_up_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = with_temp_asset(Some(dir.path()), ".mp4", b"data", |_path| async move {
            Err::<(), _>(Error::agent("boom"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Agent(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn scoped_helper_tolerates_op_deleting_file() {
        let dir = tempfile::tempdir().unwrap();
        with_temp_asset(Some(dir.path()), ".mp4", b"data", |path| async move {
            std::fs::remove_file(path)?;
            Ok::<_, Error>(())
        })
        .await
        .unwrap();
        assert_eq!(entries(dir.path()), 0);
    }
}
