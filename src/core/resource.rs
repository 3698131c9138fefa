//! Purpose: Find the native library bytes bundled into this crate at build time.
//! Exports: `BundledResource`, `ResourceIdentity`, `ResourceLocator`, `EmbeddedResources`,
//! `resource_path`.
//! Role: Second load step; the only source of library bytes for the loader.
//! Invariants: Searches exactly one namespace, keyed `<group>/<file name>`.
//! Invariants: A missing key is `ErrorKind::NotFound` and is never retried.

use std::borrow::Cow;

use sha2::{Digest, Sha256};

use crate::core::error::{Error, ErrorKind};
use crate::core::platform::LibraryFileName;

mod bundled {
    include!(concat!(env!("OUT_DIR"), "/bundled_resources.rs"));
}

pub const DEFAULT_GROUP: &str = "geoclient/jni";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceIdentity {
    pub path: String,
    pub sha256: String,
}

#[derive(Clone, Debug)]
pub struct BundledResource {
    path: String,
    bytes: Cow<'static, [u8]>,
}

impl BundledResource {
    pub fn new(path: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            path: self.path.clone(),
            sha256: sha256_hex(&self.bytes),
        }
    }
}

pub trait ResourceLocator {
    fn locate(&self, file_name: &LibraryFileName) -> Result<BundledResource, Error>;
}

pub fn resource_path(group: &str, file_name: &LibraryFileName) -> String {
    format!("{}/{}", group.trim_end_matches('/'), file_name)
}

/// Locator over the table `build.rs` compiled into the crate.
#[derive(Clone, Debug)]
pub struct EmbeddedResources {
    group: String,
    table: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedResources {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            table: bundled::BUNDLED,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.iter().map(|(path, _)| *path)
    }

    #[cfg(test)]
    fn with_table(group: &str, table: &'static [(&'static str, &'static [u8])]) -> Self {
        Self {
            group: group.to_string(),
            table,
        }
    }
}

impl ResourceLocator for EmbeddedResources {
    fn locate(&self, file_name: &LibraryFileName) -> Result<BundledResource, Error> {
        let path = resource_path(&self.group, file_name);
        self.table
            .iter()
            .find(|(key, _)| *key == path)
            .map(|(key, bytes)| BundledResource::new(*key, Cow::Borrowed(*bytes)))
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("bundled resource {path} is missing"))
                    .with_hint("the package was built without the native library for this platform")
            })
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
