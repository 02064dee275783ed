use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::consts::{API_URI, STOREFRONT_DOMAIN};

pub mod schema;
pub mod login;

use schema::*;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to send request: {0}")]
    Request(#[from] minreq::Error),

    #[error("Request failed with status {status}: {reason}")]
    Http {
        status: u16,
        reason: String
    },

    #[error("Failed to decode API response: {0}")]
    InvalidResponse(String),

    /// Response body with an `errors` array instead of the requested data
    #[error("API returned errors: {}", .0.join(", "))]
    Rejected(Vec<String>),

    #[error("Login rejected: {0}")]
    LoginRejected(String)
}

/// Per-game API calls needed to download the game's files
pub trait StorefrontExt {
    /// List downloadable files of the game
    ///
    /// `download_key_id` scopes the request to a specific purchased key
    fn list_uploads(&self, game_id: u64, download_key_id: Option<u64>) -> Result<Vec<UploadEntry>, ApiError>;

    /// Create one-time download session required to get a signed download URL
    ///
    /// Return the session uuid
    fn create_download_session(&self, game_id: u64) -> Result<String, ApiError>;

    /// Build download URL of an upload within given session
    fn download_url(&self, upload_id: u64, download_key_id: Option<u64>, session_uuid: &str) -> String;
}

/// API calls used to build the list of games to download
pub trait LibrarySourceExt {
    /// Get page of the user's owned keys, starting from 1
    fn owned_keys(&self, page: u64) -> Result<Vec<OwnedKey>, ApiError>;

    /// Get raw storefront game object
    fn game(&self, game_id: u64) -> Result<serde_json::Value, ApiError>;

    /// Resolve game id from its publisher and slug
    fn game_id_by_slug(&self, publisher: &str, slug: &str) -> Result<u64, ApiError>;

    /// Get HTML of the publisher's storefront page
    fn publisher_page(&self, publisher: &str) -> Result<String, ApiError>;
}

/// Blocking itch.io API client authorized by an API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItchApi {
    api_key: String,
    api_uri: String,
    timeout: Duration
}

impl ItchApi {
    pub fn new(api_key: impl ToString) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_uri: API_URI.to_string(),
            timeout: *crate::DEFAULT_REQUESTS_TIMEOUT
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;

        self
    }

    #[inline]
    pub fn with_api_uri(mut self, api_uri: impl ToString) -> Self {
        self.api_uri = api_uri.to_string().trim_end_matches('/').to_string();

        self
    }

    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn authorized(&self, request: minreq::Request) -> minreq::Request {
        request.with_header("Authorization", &self.api_key)
            .with_timeout(self.timeout.as_secs())
    }

    fn send(request: minreq::Request) -> Result<minreq::Response, ApiError> {
        let response = request.send()?;

        if !(200..300).contains(&response.status_code) {
            return Err(ApiError::Http {
                status: response.status_code as u16,
                reason: response.reason_phrase.clone()
            });
        }

        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = Self::send(self.authorized(minreq::get(url)))?;

        decode_json(&response)
    }

    fn post_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = Self::send(self.authorized(minreq::post(url)))?;

        decode_json(&response)
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(response: &minreq::Response) -> Result<T, ApiError> {
    let body = response.as_str()
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;

    decode_body(body)
}

/// Decode API response body
///
/// Bodies like `{"errors": ["invalid key"]}` are returned as `ApiError::Rejected`
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let value = serde_json::from_str::<serde_json::Value>(body)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;

    if let Some(errors) = value.get("errors").and_then(|errors| errors.as_array()) {
        let errors = errors.iter()
            .map(|error| error.as_str().map(String::from).unwrap_or_else(|| error.to_string()))
            .collect::<Vec<_>>();

        if !errors.is_empty() {
            return Err(ApiError::Rejected(errors));
        }
    }

    serde_json::from_value(value)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

/// Storefront URL of the publisher's page, `https://{publisher}.itch.io`
pub fn publisher_uri(publisher: &str) -> String {
    format!("https://{publisher}.{STOREFRONT_DOMAIN}")
}

impl StorefrontExt for ItchApi {
    #[tracing::instrument(level = "trace", skip(self))]
    fn list_uploads(&self, game_id: u64, download_key_id: Option<u64>) -> Result<Vec<UploadEntry>, ApiError> {
        tracing::trace!("Fetching uploads list");

        let url = match download_key_id {
            Some(key_id) => format!("{}/games/{game_id}/uploads?download_key_id={key_id}", self.api_uri),
            None => format!("{}/games/{game_id}/uploads", self.api_uri)
        };

        Ok(self.get_json::<UploadsResponse>(&url)?.uploads)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn create_download_session(&self, game_id: u64) -> Result<String, ApiError> {
        tracing::trace!("Creating download session");

        let url = format!("{}/games/{game_id}/download-sessions", self.api_uri);

        Ok(self.post_json::<DownloadSession>(&url)?.uuid)
    }

    fn download_url(&self, upload_id: u64, download_key_id: Option<u64>, session_uuid: &str) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());

        query.append_pair("api_key", &self.api_key);

        if let Some(key_id) = download_key_id {
            query.append_pair("download_key_id", &key_id.to_string());
        }

        query.append_pair("uuid", session_uuid);

        format!("{}/uploads/{upload_id}/download?{}", self.api_uri, query.finish())
    }
}

impl LibrarySourceExt for ItchApi {
    #[tracing::instrument(level = "debug", skip(self))]
    fn owned_keys(&self, page: u64) -> Result<Vec<OwnedKey>, ApiError> {
        tracing::debug!("Loading owned keys page");

        let url = format!("{}/profile/owned-keys?page={page}", self.api_uri);

        Ok(self.get_json::<OwnedKeysPage>(&url)?.owned_keys)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn game(&self, game_id: u64) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/games/{game_id}", self.api_uri);

        Ok(self.get_json::<GameResponse>(&url)?.game)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn game_id_by_slug(&self, publisher: &str, slug: &str) -> Result<u64, ApiError> {
        let url = format!("{}/{slug}/data.json", publisher_uri(publisher));

        Ok(self.get_json::<GamePageData>(&url)?.id)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn publisher_page(&self, publisher: &str) -> Result<String, ApiError> {
        let request = minreq::get(publisher_uri(publisher))
            .with_timeout(self.timeout.as_secs());

        let response = Self::send(request)?;

        response.as_str()
            .map(String::from)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }
}
