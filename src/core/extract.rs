//! Purpose: Materialize a bundled library as `<dir>/<file name>` on disk.
//! Exports: `ExtractedLibrary`, `extract`.
//! Role: Third load step; the only code that writes into the destination directory.
//! Invariants: Bytes are staged under a hidden name and renamed over the destination,
//! so readers never observe a truncated or mixed file.
//! Invariants: Existing files are always overwritten; last complete write wins.
//! Invariants: The destination directory is created when missing.
//! Notes: Extracted files are never deleted here.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::platform::LibraryFileName;
use crate::core::resource::{BundledResource, ResourceIdentity};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtractedLibrary {
    path: PathBuf,
    source: ResourceIdentity,
}

impl ExtractedLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &ResourceIdentity {
        &self.source
    }
}

pub fn extract(
    resource: &BundledResource,
    dir: &Path,
    file_name: &LibraryFileName,
) -> Result<ExtractedLibrary, Error> {
    let dir = std::path::absolute(dir).map_err(|err| io_error(dir, err))?;
    fs::create_dir_all(&dir).map_err(|err| io_error(&dir, err))?;
    let dest = dir.join(file_name.as_str());

    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".part")
        .tempfile_in(&dir)
        .map_err(|err| io_error(&dir, err))?;
    debug!(
        resource = resource.path(),
        staged = %staged.path().display(),
        dest = %dest.display(),
        "staging native library"
    );

    let staged_path = staged.path().to_path_buf();
    copy_complete(
        resource.bytes(),
        staged.as_file_mut(),
        resource.len(),
        &staged_path,
        &dest,
    )?;
    staged
        .as_file()
        .sync_all()
        .map_err(|err| io_error(staged.path(), err))?;
    set_loadable_permissions(staged.path())?;

    // Dropping `staged` on any error above removes the partial file.
    staged
        .persist(&dest)
        .map_err(|err| io_error(&dest, err.error))?;

    Ok(ExtractedLibrary {
        path: dest,
        source: resource.identity(),
    })
}

/// Reader failures and short copies are `ExtractionIncomplete`; writer failures are `Io`.
fn copy_complete<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    expected: u64,
    staged: &Path,
    dest: &Path,
) -> Result<(), Error> {
    let incomplete = |message: String| {
        Error::new(ErrorKind::ExtractionIncomplete)
            .with_message(message)
            .with_path(dest)
    };
    let mut buf = [0u8; 8192];
    let mut written: u64 = 0;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(
                    incomplete("native library copy was interrupted".to_string()).with_source(err)
                );
            }
        };
        writer
            .write_all(&buf[..read])
            .map_err(|err| io_error(staged, err))?;
        written += read as u64;
    }
    writer.flush().map_err(|err| io_error(staged, err))?;
    if written != expected {
        return Err(incomplete(format!(
            "wrote {written} of {expected} native library bytes"
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn set_loadable_permissions(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|err| io_error(path, err))
}

#[cfg(not(unix))]
fn set_loadable_permissions(path: &Path) -> Result<(), Error> {
    let mut permissions = fs::metadata(path)
        .map_err(|err| io_error(path, err))?
        .permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions).map_err(|err| io_error(path, err))?;
    }
    Ok(())
}
