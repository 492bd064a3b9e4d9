//! Filesystem tasks.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::TaskError;
use crate::task::TaskDescriptor;

/// Copy a file or directory tree from `src` to `dst`, creating parents.
pub fn copy(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> TaskDescriptor {
    let (src, dst) = (src.into(), dst.into());
    TaskDescriptor::named(
        "copy",
        move |_, _| {
            let (src, dst) = (src.clone(), dst.clone());
            async move {
                info!(src = %src.display(), dst = %dst.display(), "Copying");
                blocking(src.clone(), move || copy_recursive(&src, &dst)).await
            }
        },
        Vec::new(),
    )
}

/// Remove a file or directory tree. A missing path is not an error.
pub fn remove(path: impl Into<PathBuf>) -> TaskDescriptor {
    let path = path.into();
    TaskDescriptor::named(
        "remove",
        move |_, _| {
            let path = path.clone();
            async move {
                info!(path = %path.display(), "Removing");
                blocking(path.clone(), move || remove_recursive(&path)).await
            }
        },
        Vec::new(),
    )
}

async fn blocking<F>(path: PathBuf, f: F) -> Result<(), TaskError>
where
    F: FnOnce() -> io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(io::Error::other(e)))
        .map_err(|source| TaskError::Io { path, source })
}

fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::fs::create_dir_all(dst)?;
        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dst.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, dst).map(|_| ())
    }
}

fn remove_recursive(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
