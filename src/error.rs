use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    /// The workbook was never created; callers are expected to surface this
    /// to the user instead of treating it as fatal.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The worksheet part exists but does not have the shape this crate
    /// writes (unknown cell type, unparseable value, missing tag).
    #[error("malformed worksheet: {0}")]
    Sheet(String),
}

/// `File::open` with the not-found case mapped to [`TableError::NotFound`].
pub(crate) fn open_existing(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            TableError::NotFound(path.to_path_buf())
        } else {
            TableError::Io(e)
        }
    })
}
