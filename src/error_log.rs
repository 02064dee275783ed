use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Why a file couldn't be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticReason {
    /// Response lacked the headers of a file download
    NotADownload,

    /// `(status, reason)`
    Http(Option<u16>, String)
}

/// Human-readable record of a file which needs to be downloaded manually
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub game_slug: String,
    pub publisher_slug: String,
    pub path: PathBuf,
    pub file: String,
    pub url: String,
    pub reason: DiagnosticReason
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cannot download game/asset: {}", self.game_slug)?;
        writeln!(f, "    Publisher Name: {}", self.publisher_slug)?;
        writeln!(f, "    Path: {}", self.path.display())?;
        writeln!(f, "    File: {}", self.file)?;
        writeln!(f, "    Request URL: {}", redact_api_key(&self.url))?;

        match &self.reason {
            DiagnosticReason::NotADownload => {
                writeln!(f, "    This request failed due to a missing response header")?;
            }

            DiagnosticReason::Http(status, reason) => {
                match status {
                    Some(status) => writeln!(f, "    Request Response Code: {status}")?,
                    None => writeln!(f, "    Request Response Code: none (request was not completed)")?
                }

                writeln!(f, "    Error Reason: {reason}")?;
            }
        }

        writeln!(f, "    This game/asset has been skipped please download manually")?;
        writeln!(f, "---------------------------------------------------------")
    }
}

/// Hide the value of the `api_key` query parameter
fn redact_api_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.query_pairs().any(|(key, _)| key == "api_key") => {
            let pairs = parsed.query_pairs()
                .map(|(key, value)| {
                    if key == "api_key" {
                        (key.into_owned(), String::from("<redacted>"))
                    } else {
                        (key.into_owned(), value.into_owned())
                    }
                })
                .collect::<Vec<_>>();

            parsed.query_pairs_mut()
                .clear()
                .extend_pairs(pairs);

            parsed.to_string()
        }

        _ => url.to_string()
    }
}

/// Append-only log shared by all the download workers
///
/// Every diagnostic is written by a single `write_all` call while holding
/// the lock so blocks from different workers never interleave.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(())
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        let block = diagnostic.to_string();

        // Poisoned lock only means another worker panicked mid-write,
        // the file itself is still usable.
        let _guard = self.lock.lock()
            .unwrap_or_else(|err| err.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(block.as_bytes())
    }
}
