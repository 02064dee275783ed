use std::borrow::Cow;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH};

use super::{FetcherExt, FetchError, DownloadHeaders, PendingDownload};

/// Default connection timeout. Transfers themselves are not limited
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking file fetcher streaming responses onto the disk
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client
}

impl Fetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { client })
    }

    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http {
            status: error.status().map(|status| status.as_u16()),
            reason: error.to_string()
        }
    }
}

/// Header value as text. Filenames are often sent as raw UTF-8 which
/// isn't a valid `str` header value
fn header_text(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

impl FetcherExt for Fetcher {
    type Body = Response;

    #[tracing::instrument(level = "debug", skip(self, url))]
    fn request(
        &self,
        url: &str,
        display_name: &str,
        fallback_filename: &str
    ) -> Result<PendingDownload<Self::Body>, FetchError> {
        tracing::debug!("Downloading {display_name} - {fallback_filename}");

        let response = self.client.get(url).send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                status: Some(status.as_u16()),
                reason: status.canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });
        }

        let filename = {
            let headers = response.headers();

            let content_length = headers.get(CONTENT_LENGTH).map(header_text);
            let content_disposition = headers.get(CONTENT_DISPOSITION).map(header_text);

            DownloadHeaders {
                content_length: content_length.as_deref(),
                content_disposition: content_disposition.as_deref()
            }.resolve_filename(fallback_filename)?
        };

        Ok(PendingDownload::new(filename, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_disposition() {
        let value = HeaderValue::from_bytes("attachment; filename=\"café.zip\"".as_bytes()).unwrap();

        assert!(value.to_str().is_err());
        assert_eq!(header_text(&value), "attachment; filename=\"café.zip\"");

        let content_length = HeaderValue::from_static("10");

        let length = header_text(&content_length);
        let disposition = header_text(&value);

        let headers = DownloadHeaders {
            content_length: Some(&*length),
            content_disposition: Some(&*disposition)
        };

        assert_eq!(headers.resolve_filename("fallback.zip").unwrap(), "café.zip");
    }
}
