use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::consts::{CHECKSUM_EXTENSION, DEFAULT_CHUNK_SIZE};

/// Sidecar checksum records kept next to the downloaded files
///
/// `Game.zip` is described by `Game.zip.md5` which stores the hex MD5
/// hash the file had when it was last verified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecksumStore;

impl ChecksumStore {
    /// Get path of the sidecar describing given file
    pub fn sidecar_path(file: impl AsRef<Path>) -> PathBuf {
        let mut path = file.as_ref().as_os_str().to_owned();

        path.push(".");
        path.push(CHECKSUM_EXTENSION);

        path.into()
    }

    /// Read last verified hash of the file
    ///
    /// Return `None` if the file was never verified or the sidecar is empty
    pub fn recorded_hash(&self, file: impl AsRef<Path>) -> std::io::Result<Option<String>> {
        let sidecar = Self::sidecar_path(file);

        if !sidecar.exists() {
            return Ok(None);
        }

        let hash = std::fs::read_to_string(sidecar)?;
        let hash = hash.trim();

        if hash.is_empty() {
            Ok(None)
        }

        else {
            Ok(Some(hash.to_string()))
        }
    }

    /// Calculate MD5 hash of the file without reading the whole file into RAM
    pub fn compute_hash(&self, file: impl AsRef<Path>) -> std::io::Result<String> {
        let mut file = File::open(file)?;
        let mut md5 = Md5::new();
        let mut buffer = vec![0; DEFAULT_CHUNK_SIZE];

        loop {
            let read = file.read(&mut buffer)?;

            if read == 0 {
                break;
            }

            md5.update(&buffer[..read]);
        }

        Ok(format!("{:x}", md5.finalize()))
    }

    /// Record verified hash of the file
    pub fn write(&self, file: impl AsRef<Path>, hash: &str) -> std::io::Result<()> {
        std::fs::write(Self::sidecar_path(file), hash)
    }

    /// Move the sidecar of `from` so it describes `to`
    ///
    /// Does nothing if `from` has no sidecar
    pub fn move_sidecar(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<(), fs_extra::error::Error> {
        let sidecar = Self::sidecar_path(from);

        if sidecar.exists() {
            fs_extra::file::move_file(sidecar, Self::sidecar_path(to), &fs_extra::file::CopyOptions::new())?;
        }

        Ok(())
    }
}

/// Compare two hex encoded hashes
#[inline]
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
