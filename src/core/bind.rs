// Dynamic-loader binding for extracted libraries, kept alive for the process lifetime.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use libloading::Library;
use tracing::info;

use crate::core::error::{Error, ErrorKind};

pub trait Binder {
    fn bind(&self, path: &Path) -> Result<(), Error>;
}

/// Binds through the OS dynamic loader (`dlopen`/`LoadLibraryW`).
#[derive(Clone, Copy, Debug, Default)]
pub struct DynamicLinker;

static BOUND: LazyLock<Mutex<HashMap<PathBuf, Library>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

impl Binder for DynamicLinker {
    fn bind(&self, path: &Path) -> Result<(), Error> {
        let library = unsafe { Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::Bind)
                .with_message("dynamic loader rejected the native library")
                .with_path(path)
                .with_hint("check the library matches this process architecture and its dependencies are installed")
                .with_source(err)
        })?;
        info!(path = %path.display(), "bound native library");
        // The new handle is registered before any previous one for the same path is released.
        let previous = BOUND
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), library);
        drop(previous);
        Ok(())
    }
}

/// Paths bound by `DynamicLinker` so far, in no particular order.
pub fn bound_paths() -> Vec<PathBuf> {
    BOUND
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect()
}
