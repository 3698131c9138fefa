//! Purpose: Process-wide coordinator that extracts and binds the geoclient native library.
//! Exports: `LoaderConfig`, `LoadState`, `NativeLibraryLoader`.
//! Role: Entry point; drives platform -> resource -> extract -> bind.
//! Invariants: `instance()` constructs exactly one loader and performs no I/O.
//! Invariants: `load_library` runs the extract+bind sequence at most once per loader;
//! concurrent callers block on the state lock and observe the recorded outcome.
//! Invariants: A failed automatic load is sticky; `load_library_to_dir` always re-attempts
//! and never touches the recorded state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, info, warn};

use crate::core::bind::{Binder, DynamicLinker};
use crate::core::error::{Error, ErrorKind};
use crate::core::extract::{ExtractedLibrary, extract};
use crate::core::platform::{LibraryFileName, library_file_name, resolve};
use crate::core::resource::{DEFAULT_GROUP, EmbeddedResources, ResourceLocator};
use crate::diagnostics::environment_report;

pub const DEFAULT_BASE_NAME: &str = "geoclient";
pub const NATIVE_DIR_ENV: &str = "GEOCLIENT_NATIVE_DIR";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoaderConfig {
    /// Library name without platform prefix/suffix, e.g. `geoclient`.
    pub base_name: String,
    /// Resource namespace the library is bundled under.
    pub group: String,
    /// Directory used by the automatic load path.
    pub default_dir: PathBuf,
}

impl LoaderConfig {
    /// Defaults, with `GEOCLIENT_NATIVE_DIR` overriding the automatic-path directory.
    pub fn from_env() -> Self {
        let default_dir = std::env::var_os(NATIVE_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_native_dir);
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            group: DEFAULT_GROUP.to_string(),
            default_dir,
        }
    }

    pub fn with_default_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.base_name.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("base_name must not be empty"));
        }
        if self.base_name.contains(['/', '\\']) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("base_name must not contain path separators"));
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            group: DEFAULT_GROUP.to_string(),
            default_dir: default_native_dir(),
        }
    }
}

/// Per-user directory under the process temp dir, so accounts never share extracted files.
fn default_native_dir() -> PathBuf {
    std::env::temp_dir().join(format!("geoclient-native{}", user_suffix()))
}

#[cfg(unix)]
fn user_suffix() -> String {
    let uid = unsafe { libc::getuid() };
    format!("-{uid}")
}

#[cfg(not(unix))]
fn user_suffix() -> String {
    std::env::var("USERNAME")
        .ok()
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
        .map(|name| format!("-{name}"))
        .unwrap_or_default()
}

#[derive(Clone, Debug)]
pub enum LoadState {
    NotAttempted,
    Loaded(ExtractedLibrary),
    Failed(Arc<Error>),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

pub struct NativeLibraryLoader<L = EmbeddedResources, B = DynamicLinker> {
    config: LoaderConfig,
    locator: L,
    binder: B,
    state: Mutex<LoadState>,
}

static INSTANCE: OnceLock<NativeLibraryLoader> = OnceLock::new();

impl NativeLibraryLoader {
    /// The process-wide loader, configured from the environment on first use.
    pub fn instance() -> &'static NativeLibraryLoader {
        INSTANCE.get_or_init(|| NativeLibraryLoader::new(LoaderConfig::from_env()))
    }

    pub fn new(config: LoaderConfig) -> Self {
        let locator = EmbeddedResources::new(config.group.clone());
        Self::with_parts(config, locator, DynamicLinker)
    }
}

impl<L: ResourceLocator, B: Binder> NativeLibraryLoader<L, B> {
    pub fn with_parts(config: LoaderConfig, locator: L, binder: B) -> Self {
        Self {
            config,
            locator,
            binder,
            state: Mutex::new(LoadState::NotAttempted),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// File name the current platform expects for the configured base name.
    pub fn file_name(&self) -> Result<LibraryFileName, Error> {
        self.config.validate()?;
        Ok(library_file_name(&self.config.base_name, resolve()?))
    }

    /// Extracts into the configured default directory and binds, once per loader.
    pub fn load_library(&self) -> Result<ExtractedLibrary, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            LoadState::Loaded(library) => return Ok(library.clone()),
            LoadState::Failed(cause) => return Err(Error::replay(cause)),
            LoadState::NotAttempted => {}
        }

        match self.load_into(&self.config.default_dir) {
            Ok(library) => {
                *state = LoadState::Loaded(library.clone());
                Ok(library)
            }
            Err(err) => {
                warn!(
                    kind = ?err.kind(),
                    error = %err,
                    "native library load failed; automatic loading will not retry"
                );
                let cause = Arc::new(err);
                *state = LoadState::Failed(Arc::clone(&cause));
                Err(Error::replay(&cause))
            }
        }
    }

    /// Extracts into `dir` and binds, regardless of any earlier outcome.
    pub fn load_library_to_dir(&self, dir: impl AsRef<Path>) -> Result<ExtractedLibrary, Error> {
        self.load_into(dir.as_ref())
    }

    fn load_into(&self, dir: &Path) -> Result<ExtractedLibrary, Error> {
        debug!(
            dir = %dir.display(),
            report = %environment_report(&self.config),
            "loading native library"
        );
        let file_name = self.file_name()?;
        let resource = self.locator.locate(&file_name)?;
        let library = extract(&resource, dir, &file_name)?;
        self.binder.bind(library.path())?;
        info!(
            path = %library.path().display(),
            resource = library.source().path.as_str(),
            sha256 = library.source().sha256.as_str(),
            "native library ready"
        );
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadState, LoaderConfig, NativeLibraryLoader};
    use crate::core::bind::Binder;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::platform::LibraryFileName;
    use crate::core::resource::{BundledResource, ResourceLocator};
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CountingLocator {
        calls: Arc<AtomicUsize>,
        missing: bool,
    }

    impl ResourceLocator for CountingLocator {
        fn locate(&self, file_name: &LibraryFileName) -> Result<BundledResource, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing {
                return Err(Error::new(ErrorKind::NotFound).with_message("absent"));
            }
            Ok(BundledResource::new(
                format!("test/{file_name}"),
                b"\x7fELF-test-double".to_vec(),
            ))
        }
    }

    #[derive(Clone, Default)]
    struct CountingBinder {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Binder for CountingBinder {
        fn bind(&self, path: &Path) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            if self.fail {
                return Err(Error::new(ErrorKind::Bind)
                    .with_message("wrong ELF class: ELFCLASS32")
                    .with_path(path));
            }
            Ok(())
        }
    }

    fn config(dir: &Path) -> LoaderConfig {
        LoaderConfig::default().with_default_dir(dir.join("auto"))
    }

    #[test]
    fn instance_is_shared_across_threads() {
        let first = NativeLibraryLoader::instance() as *const NativeLibraryLoader as usize;
        let others: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        NativeLibraryLoader::instance() as *const NativeLibraryLoader as usize
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .collect()
        });
        assert!(others.iter().all(|addr| *addr == first));
    }

    #[test]
    fn construction_has_no_side_effects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let locator = CountingLocator::default();
        let binder = CountingBinder::default();
        let loader =
            NativeLibraryLoader::with_parts(config(dir.path()), locator.clone(), binder.clone());
        assert!(matches!(loader.state(), LoadState::NotAttempted));
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("auto").exists());
    }

    #[test]
    fn concurrent_automatic_loads_run_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let locator = CountingLocator::default();
        let binder = CountingBinder::default();
        let loader =
            NativeLibraryLoader::with_parts(config(dir.path()), locator.clone(), binder.clone());

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| loader.load_library()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .collect()
        });

        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(binder.calls.load(Ordering::SeqCst), 1);
        let expected = dir.path().join("auto").join(loader.file_name().expect("name").as_str());
        for result in results {
            assert_eq!(result.expect("loaded").path(), expected);
        }
        assert!(loader.state().is_loaded());

        loader.load_library().expect("repeat");
        assert_eq!(binder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_automatic_load_is_sticky() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binder = CountingBinder {
            fail: true,
            ..CountingBinder::default()
        };
        let loader = NativeLibraryLoader::with_parts(
            config(dir.path()),
            CountingLocator::default(),
            binder.clone(),
        );

        let first = loader.load_library().expect_err("bind fails");
        assert_eq!(first.kind(), ErrorKind::Bind);
        assert_eq!(first.message(), Some("wrong ELF class: ELFCLASS32"));
        let second = loader.load_library().expect_err("sticky");
        assert_eq!(second.kind(), ErrorKind::Bind);
        assert_eq!(binder.calls.load(Ordering::SeqCst), 1);

        match loader.state() {
            LoadState::Failed(cause) => assert_eq!(cause.kind(), ErrorKind::Bind),
            other => panic!("expected failed state, got {other:?}"),
        }
    }

    #[test]
    fn explicit_load_retries_and_leaves_state_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binder = CountingBinder {
            fail: true,
            ..CountingBinder::default()
        };
        let loader = NativeLibraryLoader::with_parts(
            config(dir.path()),
            CountingLocator::default(),
            binder.clone(),
        );
        loader.load_library().expect_err("automatic");

        loader
            .load_library_to_dir(dir.path().join("explicit"))
            .expect_err("explicit");
        loader
            .load_library_to_dir(dir.path().join("explicit"))
            .expect_err("explicit again");
        assert_eq!(binder.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(loader.state(), LoadState::Failed(_)));
    }

    #[test]
    fn explicit_load_does_not_mark_state_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loader = NativeLibraryLoader::with_parts(
            config(dir.path()),
            CountingLocator::default(),
            CountingBinder::default(),
        );
        let first = loader.load_library_to_dir(dir.path()).expect("first");
        let second = loader.load_library_to_dir(dir.path()).expect("second");
        assert_eq!(first.path(), second.path());
        assert!(first.path().exists());
        assert!(matches!(loader.state(), LoadState::NotAttempted));
    }

    #[test]
    fn missing_resource_creates_no_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let locator = CountingLocator {
            missing: true,
            ..CountingLocator::default()
        };
        let binder = CountingBinder::default();
        let loader = NativeLibraryLoader::with_parts(config(dir.path()), locator, binder.clone());

        let err = loader.load_library().expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!dir.path().join("auto").exists());
        assert_eq!(binder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_base_name_is_usage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = LoaderConfig {
            base_name: "../geoclient".to_string(),
            ..config(dir.path())
        };
        let loader = NativeLibraryLoader::with_parts(
            bad,
            CountingLocator::default(),
            CountingBinder::default(),
        );
        let err = loader.load_library_to_dir(dir.path()).expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[cfg(unix)]
    #[test]
    fn default_dir_is_per_user() {
        let uid = unsafe { libc::getuid() };
        let config = LoaderConfig::default();
        assert_eq!(
            config.default_dir,
            std::env::temp_dir().join(format!("geoclient-native-{uid}"))
        );
    }
}
