use std::fmt;
use std::str::FromStr;

use crate::consts::{STOREFRONT_DOMAIN, RESERVED_SUBDOMAINS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameUrlError {
    #[error("Failed to parse game URL `{url}`: {message}")]
    Malformed {
        url: String,
        message: String
    },

    #[error("Game URL `{0}` must use https")]
    UnsupportedScheme(String),

    #[error("Game URL `{0}` is not a {STOREFRONT_DOMAIN} publisher page")]
    NotAPublisherHost(String),

    #[error("Game URL `{0}` must have exactly one path segment with the game slug")]
    InvalidPath(String)
}

/// Storefront page of a game, `https://{publisher}.itch.io/{slug}`
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct GameUrl {
    pub publisher: String,
    pub slug: String
}

impl GameUrl {
    pub fn parse(url: &str) -> Result<Self, GameUrlError> {
        let parsed = url::Url::parse(url.trim())
            .map_err(|err| GameUrlError::Malformed {
                url: url.to_string(),
                message: err.to_string()
            })?;

        if parsed.scheme() != "https" {
            return Err(GameUrlError::UnsupportedScheme(url.to_string()));
        }

        let publisher = parsed.host_str()
            .and_then(|host| host.strip_suffix(STOREFRONT_DOMAIN))
            .and_then(|host| host.strip_suffix('.'))
            .filter(|publisher| !publisher.is_empty() && !publisher.contains('.'))
            .filter(|publisher| !RESERVED_SUBDOMAINS.contains(publisher))
            .ok_or_else(|| GameUrlError::NotAPublisherHost(url.to_string()))?;

        let segments = parsed.path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        let [slug] = segments.as_slice() else {
            return Err(GameUrlError::InvalidPath(url.to_string()));
        };

        // The parser lowercases the host and percent-encodes the path,
        // names are kept as written when they match the parsed ones
        let (publisher, slug) = match raw_parts(url) {
            Some((raw_publisher, raw_slug)) if raw_publisher.eq_ignore_ascii_case(publisher) => (raw_publisher, raw_slug),
            _ => (publisher, *slug)
        };

        Ok(Self {
            publisher: publisher.to_string(),
            slug: slug.to_string()
        })
    }
}

/// Publisher and slug as written in `https://{publisher}.itch.io/{slug}`
fn raw_parts(url: &str) -> Option<(&str, &str)> {
    let (_, rest) = url.trim().split_once("://")?;
    let (host, path) = rest.split_once('/')?;

    let publisher = host.get(..host.len().checked_sub(STOREFRONT_DOMAIN.len() + 1)?)?;

    let segments = path.split(['?', '#']).next()?
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    match segments.as_slice() {
        [slug] if *slug != "." && *slug != ".." => Some((publisher, *slug)),
        _ => None
    }
}

impl FromStr for GameUrl {
    type Err = GameUrlError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GameUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}.{STOREFRONT_DOMAIN}/{}", self.publisher, self.slug)
    }
}
