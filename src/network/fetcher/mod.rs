use std::io::{Read, Write, BufWriter};
use std::path::{Path, PathBuf};
use std::fs::File;

use crate::consts::DEFAULT_CHUNK_SIZE;
use crate::filesystem::clean_path;

pub mod basic;

lazy_static::lazy_static! {
    static ref DISPOSITION_FILENAME: regex::Regex = regex::Regex::new(r#"filename="(.+?)""#)
        .expect("content-disposition regex is valid");
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Response is not a file download, e.g. an HTML error page
    #[error("HTTP response is not a download")]
    NoDownload,

    /// Non-2xx response or a failed request. `status` is `None`
    /// if the request wasn't completed
    #[error("HTTP error {}: {reason}", .status.map_or_else(|| String::from("(no response)"), |status| status.to_string()))]
    Http {
        status: Option<u16>,
        reason: String
    },

    #[error("Failed to save downloaded file {path:?}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error
    }
}

pub trait FetcherExt {
    type Body: Read;

    /// Request URL content without saving it yet
    ///
    /// The response must be a file download. Its name is taken from the
    /// content-disposition header if it has one, otherwise `fallback_filename`
    /// is used. `display_name` is used for logging only.
    fn request(
        &self,
        url: &str,
        display_name: &str,
        fallback_filename: &str
    ) -> Result<PendingDownload<Self::Body>, FetchError>;

    /// Download URL content into the `destination` folder
    ///
    /// Return path of the saved file
    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        display_name: &str,
        fallback_filename: &str
    ) -> Result<PathBuf, FetchError> {
        self.request(url, display_name, fallback_filename)?
            .save(destination)
    }
}

/// Validated download response which wasn't written to the disk yet
#[derive(Debug)]
pub struct PendingDownload<T> {
    filename: String,
    body: T
}

impl<T: Read> PendingDownload<T> {
    #[inline]
    pub fn new(filename: impl ToString, body: T) -> Self {
        Self {
            filename: filename.to_string(),
            body
        }
    }

    /// Name the file will be saved with
    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Stream the body into `destination/{filename}`
    pub fn save(self, destination: &Path) -> Result<PathBuf, FetchError> {
        save_stream(self.body, destination, &self.filename)
    }
}

/// Headers of a response which decide whether it's a file download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadHeaders<'a> {
    pub content_length: Option<&'a str>,
    pub content_disposition: Option<&'a str>
}

impl<'a> DownloadHeaders<'a> {
    /// Check that the response is actually a file and resolve its name
    ///
    /// Both content-length and content-disposition headers must be present,
    /// otherwise `FetchError::NoDownload` is returned
    pub fn resolve_filename(&self, fallback_filename: &str) -> Result<String, FetchError> {
        let (Some(_), Some(disposition)) = (self.content_length, self.content_disposition) else {
            return Err(FetchError::NoDownload);
        };

        Ok(disposition_filename(disposition)
            .unwrap_or_else(|| fallback_filename.to_string()))
    }
}

/// Get the quoted `filename="..."` parameter of the content-disposition header
///
/// Only the last path component of the name is kept so a response
/// can't write outside of the destination folder
pub fn disposition_filename(disposition: &str) -> Option<String> {
    let name = DISPOSITION_FILENAME.captures(disposition)?.get(1)?.as_str();
    let name = name.rsplit(['/', '\\']).next()?;

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    Some(clean_path(name))
}

/// Stream `body` into `destination/filename` in fixed-size chunks
///
/// The partially written file is removed if streaming fails
pub fn save_stream(mut body: impl Read, destination: &Path, filename: &str) -> Result<PathBuf, FetchError> {
    let path = destination.join(filename);

    let mut write = || -> std::io::Result<u64> {
        let mut file = BufWriter::with_capacity(DEFAULT_CHUNK_SIZE, File::create(&path)?);
        let mut buffer = vec![0; DEFAULT_CHUNK_SIZE];
        let mut total = 0;

        loop {
            let read = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err)
            };

            file.write_all(&buffer[..read])?;

            total += read as u64;
        }

        file.flush()?;

        Ok(total)
    };

    match write() {
        Ok(total) => {
            tracing::trace!("Saved {total} bytes to {path:?}");

            Ok(path)
        }

        Err(error) => {
            let _ = std::fs::remove_file(&path);

            Err(FetchError::Io { path, error })
        }
    }
}
