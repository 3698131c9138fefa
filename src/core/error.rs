use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    UnsupportedPlatform,
    NotFound,
    ExtractionIncomplete,
    Io,
    Bind,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Rebuilds a recorded failure for another caller; the shared cause stays the `source`.
    pub(crate) fn replay(cause: &Arc<Error>) -> Self {
        let mut error = Error::new(cause.kind)
            .with_message(cause.message.as_deref().unwrap_or("native library load failed"));
        if let Some(path) = &cause.path {
            error = error.with_path(path);
        }
        if let Some(hint) = &cause.hint {
            error = error.with_hint(hint);
        }
        error.with_source(Arc::clone(cause))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Wraps a filesystem failure as `ErrorKind::Io`, adding a hint for well-known causes.
pub(crate) fn io_error(path: &Path, err: io::Error) -> Error {
    let mut error = Error::new(ErrorKind::Io).with_path(path);
    if let Some(hint) = io_hint(&err) {
        error = error.with_hint(hint);
    }
    error.with_source(err)
}

fn io_hint(err: &io::Error) -> Option<&'static str> {
    if let Some(hint) = errno_hint(err) {
        return Some(hint);
    }
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("destination directory is not writable by this process")
        }
        _ => None,
    }
}

#[cfg(unix)]
fn errno_hint(err: &io::Error) -> Option<&'static str> {
    match err.raw_os_error()? {
        libc::EROFS => Some("destination is on a read-only filesystem"),
        libc::ENOSPC => Some("no space left on the destination device"),
        libc::EACCES | libc::EPERM => {
            Some("destination directory is not writable by this process")
        }
        _ => None,
    }
}

#[cfg(not(unix))]
fn errno_hint(_err: &io::Error) -> Option<&'static str> {
    None
}
