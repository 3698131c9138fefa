//! Purpose: Define the public Rust API boundary for the native library loader.
//! Exports: Loader, configuration, platform naming, extraction, and error types.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to core loader primitives.

pub use crate::core::bind::{Binder, DynamicLinker, bound_paths};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::extract::{ExtractedLibrary, extract};
pub use crate::core::loader::{
    DEFAULT_BASE_NAME, LoadState, LoaderConfig, NATIVE_DIR_ENV, NativeLibraryLoader,
};
pub use crate::core::platform::{
    Arch, LibraryFileName, OsFamily, PlatformId, library_file_name, resolve, resolve_from,
};
pub use crate::core::resource::{
    BundledResource, DEFAULT_GROUP, EmbeddedResources, ResourceIdentity, ResourceLocator,
    resource_path,
};
