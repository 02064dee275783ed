use std::fmt;

/// Terminal result of a single file download attempt
#[derive(Debug)]
pub enum DownloadOutcome {
    /// File was downloaded. `verified` is `false` when the catalog
    /// had no hash to check it against
    Success {
        verified: bool
    },

    /// Valid copy of the file was already on the disk
    SkippedExisting,

    /// Existing file was found broken and removed. Never produced: mismatching
    /// files are moved to the old files folder and downloaded again
    Corrupted,

    /// Server responded with something that isn't a file download
    NoDownloadAvailable,

    HttpError {
        status: Option<u16>,
        reason: String
    },

    /// Downloaded file doesn't match the catalog hash
    HashMismatch {
        expected: String,
        got: String
    },

    /// Storefront returned malformed data needed to download the file
    InvalidResponseData(String),

    /// Any other failure, captured so it can't stop other downloads
    Unexpected(anyhow::Error)
}

/// Class of an outcome in the library summary
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutcomeClass {
    Success,
    Skipped,

    /// Worth retrying later or downloading manually
    RecoverableError,

    IntegrityFailure,
    Exception
}

impl DownloadOutcome {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Self::Success { .. } => OutcomeClass::Success,
            Self::SkippedExisting => OutcomeClass::Skipped,

            Self::NoDownloadAvailable |
            Self::HttpError { .. } => OutcomeClass::RecoverableError,

            Self::Corrupted |
            Self::HashMismatch { .. } |
            Self::InvalidResponseData(_) => OutcomeClass::IntegrityFailure,

            Self::Unexpected(_) => OutcomeClass::Exception
        }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        !matches!(self.class(), OutcomeClass::Success | OutcomeClass::Skipped)
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { verified: true } => write!(f, "downloaded"),
            Self::Success { verified: false } => write!(f, "downloaded (not verified)"),
            Self::SkippedExisting => write!(f, "skipped, already downloaded"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::NoDownloadAvailable => write!(f, "no download available"),

            Self::HttpError { status: Some(status), reason } => write!(f, "HTTP error {status}: {reason}"),
            Self::HttpError { status: None, reason } => write!(f, "HTTP error: {reason}"),

            Self::HashMismatch { expected, got } => write!(f, "hash mismatch: expected {expected}, got {got}"),
            Self::InvalidResponseData(reason) => write!(f, "invalid response data: {reason}"),
            Self::Unexpected(err) => write!(f, "unexpected error: {err}")
        }
    }
}

/// Outcome of a single file of a game
#[derive(Debug)]
pub struct FileOutcome {
    pub filename: String,
    pub outcome: DownloadOutcome
}

impl FileOutcome {
    #[inline]
    pub fn new(filename: impl ToString, outcome: DownloadOutcome) -> Self {
        Self {
            filename: filename.to_string(),
            outcome
        }
    }
}

/// Outcomes of all the processed files of a game
#[derive(Debug)]
pub struct GameOutcome {
    pub name: String,
    pub files: Vec<FileOutcome>
}
