use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};

use md5::{Md5, Digest};
use serde_json::json;

use crate::prelude::*;
use crate::network::api::schema::{UploadEntry, OwnedKey};
use crate::network::fetcher::PendingDownload;


pub fn md5_hex(content: &[u8]) -> String {
    format!("{:x}", Md5::digest(content))
}

pub fn game_data(id: u64, publisher: &str, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Game {slug}"),
        "url": format!("https://{publisher}.itch.io/{slug}"),
        "classification": "game",
        "user": {
            "username": publisher
        }
    })
}

pub fn game(id: u64, publisher: &str, slug: &str) -> GameDescriptor {
    GameDescriptor::from_game_data(game_data(id, publisher, slug)).unwrap()
}

/// Upload with the hash of `content`, or without a hash if it's `None`
pub fn upload(id: u64, filename: &str, content: Option<&[u8]>, traits: &[&str]) -> UploadEntry {
    UploadEntry {
        id,
        filename: Some(filename.to_string()),
        display_name: None,
        md5_hash: content.map(md5_hex),
        traits: traits.iter().map(|t| t.to_string()).collect()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FakeSession {
    #[default]
    Created,

    Http(u16),
    Invalid
}

/// In-memory storefront. Games without uploads fail to list them
#[derive(Debug, Default)]
pub struct FakeStorefront {
    pub games: HashMap<u64, serde_json::Value>,
    pub uploads: HashMap<u64, Vec<UploadEntry>>,
    pub session: FakeSession,
    pub owned_pages: Vec<Vec<OwnedKey>>,
    pub slugs: HashMap<(String, String), u64>,
    pub publisher_pages: HashMap<String, String>,
    pub sessions: AtomicUsize
}

impl FakeStorefront {
    #[inline]
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

fn not_found() -> ApiError {
    ApiError::Http {
        status: 404,
        reason: String::from("Not Found")
    }
}

impl StorefrontExt for FakeStorefront {
    fn list_uploads(&self, game_id: u64, _download_key_id: Option<u64>) -> Result<Vec<UploadEntry>, ApiError> {
        self.uploads.get(&game_id).cloned().ok_or_else(not_found)
    }

    fn create_download_session(&self, game_id: u64) -> Result<String, ApiError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);

        match self.session {
            FakeSession::Created => Ok(format!("session-{game_id}")),

            FakeSession::Http(status) => Err(ApiError::Http {
                status,
                reason: String::from("Forbidden")
            }),

            FakeSession::Invalid => Err(ApiError::InvalidResponse(String::from("missing field `uuid`")))
        }
    }

    fn download_url(&self, upload_id: u64, _download_key_id: Option<u64>, session_uuid: &str) -> String {
        format!("https://api.itch.test/uploads/{upload_id}/download?api_key=secret&uuid={session_uuid}")
    }
}

impl LibrarySourceExt for FakeStorefront {
    fn owned_keys(&self, page: u64) -> Result<Vec<OwnedKey>, ApiError> {
        Ok(page.checked_sub(1)
            .and_then(|i| self.owned_pages.get(i as usize))
            .cloned()
            .unwrap_or_default())
    }

    fn game(&self, game_id: u64) -> Result<serde_json::Value, ApiError> {
        self.games.get(&game_id).cloned().ok_or_else(not_found)
    }

    fn game_id_by_slug(&self, publisher: &str, slug: &str) -> Result<u64, ApiError> {
        self.slugs.get(&(publisher.to_string(), slug.to_string()))
            .copied()
            .ok_or_else(not_found)
    }

    fn publisher_page(&self, publisher: &str) -> Result<String, ApiError> {
        self.publisher_pages.get(publisher).cloned().ok_or_else(not_found)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    File {
        content: Vec<u8>,

        /// Name from the content-disposition header
        disposition_name: Option<String>
    },

    /// Valid download headers but the connection drops mid-body
    Broken {
        disposition_name: Option<String>
    },

    NoDownload,
    Http(u16),
    Panic
}

impl FakeResponse {
    pub fn file(content: &[u8]) -> Self {
        Self::File {
            content: content.to_vec(),
            disposition_name: None
        }
    }

    /// File served under a different name than requested
    pub fn renamed(content: &[u8], disposition_name: &str) -> Self {
        Self::File {
            content: content.to_vec(),
            disposition_name: Some(disposition_name.to_string())
        }
    }
}

/// Body which fails after a few bytes
struct ResetBody(usize);

impl Read for ResetBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.0 == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"));
        }

        self.0 -= 1;
        buf[0] = 0;

        Ok(1)
    }
}

/// Fetcher serving responses by the requested file name
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pub responses: HashMap<String, FakeResponse>,
    pub fetched: AtomicUsize
}

impl FakeFetcher {
    pub fn with(responses: impl IntoIterator<Item = (&'static str, FakeResponse)>) -> Self {
        Self {
            responses: responses.into_iter()
                .map(|(name, response)| (name.to_string(), response))
                .collect(),

            fetched: AtomicUsize::new(0)
        }
    }

    #[inline]
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

impl FetcherExt for FakeFetcher {
    type Body = Box<dyn Read>;

    fn request(
        &self,
        url: &str,
        _display_name: &str,
        fallback_filename: &str
    ) -> Result<PendingDownload<Self::Body>, FetchError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);

        match self.responses.get(fallback_filename) {
            Some(FakeResponse::File { content, disposition_name }) => {
                let filename = disposition_name.as_deref().unwrap_or(fallback_filename);

                Ok(PendingDownload::new(filename, Box::new(Cursor::new(content.clone())) as Box<dyn Read>))
            }

            Some(FakeResponse::Broken { disposition_name }) => {
                let filename = disposition_name.as_deref().unwrap_or(fallback_filename);

                Ok(PendingDownload::new(filename, Box::new(ResetBody(8)) as Box<dyn Read>))
            }

            Some(FakeResponse::NoDownload) => Err(FetchError::NoDownload),

            Some(FakeResponse::Http(status)) => Err(FetchError::Http {
                status: Some(*status),
                reason: String::from("Service Unavailable")
            }),

            Some(FakeResponse::Panic) => panic!("connection dropped while fetching {url}"),

            None => Err(FetchError::Http {
                status: Some(404),
                reason: String::from("Not Found")
            })
        }
    }
}
