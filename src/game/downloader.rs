use std::path::{Path, PathBuf};

use crate::checksum::{ChecksumStore, hashes_match};
use crate::consts::ERRORS_LOG_FILE;
use crate::error_log::{ErrorLog, Diagnostic, DiagnosticReason};
use crate::filesystem::{clean_path, ensure_dir, archive_old_file};
use crate::network::api::{StorefrontExt, ApiError};
use crate::network::api::schema::UploadEntry;
use crate::network::fetcher::{FetcherExt, FetchError};

use super::{GameDescriptor, GameError};
use super::outcome::{DownloadOutcome, FileOutcome};

/// Downloads and verifies all the files of a single game
///
/// Files are placed in `{output}/{publisher}/{game}` with an `.md5` sidecar
/// next to each verified file. Superseded files are moved to the `old`
/// sub-folder instead of being overwritten. Files which need manual attention
/// are described in the `errors.txt` log shared by all the games.
#[derive(Debug)]
pub struct GameDownloader<S, F> {
    storefront: S,
    fetcher: F,
    checksums: ChecksumStore,
    error_log: ErrorLog,
    output_dir: PathBuf
}

impl<S: StorefrontExt, F: FetcherExt> GameDownloader<S, F> {
    pub fn new(storefront: S, fetcher: F) -> Self {
        Self {
            storefront,
            fetcher,
            checksums: ChecksumStore,
            error_log: ErrorLog::new(ERRORS_LOG_FILE),
            output_dir: PathBuf::from(".")
        }
    }

    /// Set the folder all the games are downloaded to. The errors
    /// log is kept there as well
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self.error_log = ErrorLog::new(self.output_dir.join(ERRORS_LOG_FILE));

        self
    }

    #[inline]
    pub fn storefront(&self) -> &S {
        &self.storefront
    }

    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[inline]
    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Download all the game files matching the platform
    ///
    /// Uploads with platform traits not including `p_{platform}` are skipped
    /// without an outcome. Failures of single files are returned as their
    /// outcomes, `Err` means the game couldn't be processed at all.
    #[tracing::instrument(level = "debug", skip_all, fields(game = %game.name))]
    pub fn download_game(&self, game: &GameDescriptor, platform: Option<&str>) -> Result<Vec<FileOutcome>, GameError> {
        tracing::debug!("Downloading `{}`", game.name);

        let uploads = self.storefront.list_uploads(game.game_id, game.download_key_id)?;

        tracing::debug!("Found {} downloads available for `{}`", uploads.len(), game.name);

        let folder = game.folder(&self.output_dir);

        ensure_dir(&folder)?;

        let mut outcomes = Vec::with_capacity(uploads.len());

        for upload in &uploads {
            if !upload.matches_platform(platform) {
                tracing::info!("Skipping `{}` for platform {:?}", game.name, upload.traits);

                continue;
            }

            let filename = clean_path(&upload.file_name());

            let outcome = self.download_upload(game, upload, &folder, &filename)
                .unwrap_or_else(|err| {
                    tracing::error!("Failed to download `{}` - `{filename}`: {err:#}", game.name);

                    DownloadOutcome::Unexpected(err)
                });

            outcomes.push(FileOutcome::new(filename, outcome));
        }

        self.write_metadata(game)?;

        Ok(outcomes)
    }

    fn write_metadata(&self, game: &GameDescriptor) -> Result<(), GameError> {
        let path = game.metadata_path(&self.output_dir);

        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        let metadata = serde_json::to_string_pretty(&game.metadata())
            .map_err(GameError::Metadata)?;

        std::fs::write(path, metadata)?;

        Ok(())
    }

    fn download_upload(
        &self,
        game: &GameDescriptor,
        upload: &UploadEntry,
        folder: &Path,
        filename: &str
    ) -> anyhow::Result<DownloadOutcome> {
        tracing::debug!("Downloading `{filename}`");

        let path = folder.join(filename);

        let expected_hash = upload.md5_hash.as_deref()
            .filter(|hash| !hash.trim().is_empty());

        if expected_hash.is_none() {
            tracing::warn!("Missing MD5 hash from API response for `{filename}`: {upload:?}");
        }

        if path.exists() {
            tracing::info!("File already exists: `{filename}`");

            if self.is_existing_file_valid(&path, expected_hash)? {
                tracing::info!("Skipping `{}` - `{filename}`", game.name);

                return Ok(DownloadOutcome::SkippedExisting);
            }

            self.archive(&path)?;
        }

        let session = match self.storefront.create_download_session(game.game_id) {
            Ok(session) => session,

            Err(ApiError::Http { status, reason }) => {
                tracing::error!("Failed to create download session for `{}`: {status} {reason}", game.name);

                return Ok(DownloadOutcome::HttpError {
                    status: Some(status),
                    reason
                });
            }

            Err(ApiError::Request(err)) => {
                tracing::error!("Failed to create download session for `{}`: {err}", game.name);

                return Ok(DownloadOutcome::HttpError {
                    status: None,
                    reason: err.to_string()
                });
            }

            Err(ApiError::InvalidResponse(reason)) => {
                tracing::error!("Invalid download session response for `{}`: {reason}", game.name);

                return Ok(DownloadOutcome::InvalidResponseData(reason));
            }

            Err(ApiError::Rejected(errors)) => {
                let reason = errors.join(", ");

                tracing::error!("Download session for `{}` was rejected: {reason}", game.name);

                return Ok(DownloadOutcome::InvalidResponseData(reason));
            }

            Err(err) => return Err(err.into())
        };

        let url = self.storefront.download_url(upload.id, game.download_key_id, &session);

        let download = match self.fetcher.request(&url, &game.name, filename) {
            Ok(download) => download,

            Err(FetchError::NoDownload) => {
                tracing::error!("HTTP response is not a download, skipping `{filename}`");

                self.report(game, folder, filename, &url, DiagnosticReason::NotADownload);

                return Ok(DownloadOutcome::NoDownloadAvailable);
            }

            Err(FetchError::Http { status, reason }) => {
                tracing::error!("Failed to download `{filename}` due to an HTTP error: {reason}");

                self.report(game, folder, filename, &url, DiagnosticReason::Http(status, reason.clone()));

                return Ok(DownloadOutcome::HttpError { status, reason });
            }

            Err(err) => return Err(err.into())
        };

        // The server may name the file differently from the catalog
        if download.filename() != filename {
            let server_path = folder.join(download.filename());

            tracing::debug!("`{filename}` is served as `{}`", download.filename());

            if server_path.exists() {
                if self.is_existing_file_valid(&server_path, expected_hash)? {
                    tracing::info!("Skipping `{}` - `{}`", game.name, download.filename());

                    return Ok(DownloadOutcome::SkippedExisting);
                }

                self.archive(&server_path)?;
            }
        }

        let saved = download.save(folder)?;

        let Some(expected_hash) = expected_hash else {
            tracing::warn!("Unable to verify `{filename}` downloaded correctly due to missing hash data");

            return Ok(DownloadOutcome::Success { verified: false });
        };

        let hash = self.checksums.compute_hash(&saved)?;

        if !hashes_match(&hash, expected_hash) {
            tracing::error!("Failed to verify `{filename}`: expected {expected_hash}, got {hash}");

            return Ok(DownloadOutcome::HashMismatch {
                expected: expected_hash.to_string(),
                got: hash
            });
        }

        self.checksums.write(&saved, expected_hash)?;

        Ok(DownloadOutcome::Success { verified: true })
    }

    /// Check if the file already on the disk can be kept
    ///
    /// Without the catalog hash the file can't be verified so its presence
    /// is trusted. Otherwise either the sidecar or the file content must
    /// match the hash. A matching file without a sidecar gets one.
    fn is_existing_file_valid(&self, path: &Path, expected_hash: Option<&str>) -> std::io::Result<bool> {
        let Some(expected_hash) = expected_hash else {
            return Ok(true);
        };

        match self.checksums.recorded_hash(path)? {
            Some(recorded) if hashes_match(&recorded, expected_hash) => Ok(true),

            Some(recorded) => {
                tracing::warn!("MD5 mismatch for {path:?}: recorded {recorded}, expected {expected_hash}");

                Ok(false)
            }

            None => {
                let hash = self.checksums.compute_hash(path)?;

                if hashes_match(&hash, expected_hash) {
                    self.checksums.write(path, expected_hash)?;

                    return Ok(true);
                }

                // Either an old version or a broken download, both get downloaded again
                tracing::warn!("MD5 mismatch for {path:?}: found {hash}, expected {expected_hash}");

                Ok(false)
            }
        }
    }

    /// Move the file and its sidecar to the `old` folder
    fn archive(&self, path: &Path) -> anyhow::Result<()> {
        tracing::info!("Moving {path:?} to `old/`");

        let target = archive_old_file(path)?;

        self.checksums.move_sidecar(path, &target)?;

        Ok(())
    }

    fn report(&self, game: &GameDescriptor, folder: &Path, filename: &str, url: &str, reason: DiagnosticReason) {
        let diagnostic = Diagnostic {
            game_slug: game.game_slug().to_string(),
            publisher_slug: game.publisher_slug().to_string(),
            path: folder.to_path_buf(),
            file: filename.to_string(),
            url: url.to_string(),
            reason
        };

        if let Err(err) = self.error_log.append(&diagnostic) {
            tracing::error!("Failed to write to {:?}: {err}", self.error_log.path());
        }
    }
}
