use std::time::Duration;

pub mod consts;
pub mod checksum;
pub mod filesystem;
pub mod error_log;
pub mod network;
pub mod game;
pub mod library;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use super::consts::*;
    pub use super::checksum::ChecksumStore;
    pub use super::error_log::{ErrorLog, Diagnostic};

    pub use super::network::api::{StorefrontExt, LibrarySourceExt, ItchApi, ApiError};
    pub use super::network::api::login::login;
    pub use super::network::fetcher::{FetcherExt, FetchError};
    pub use super::network::fetcher::basic::Fetcher;

    pub use super::game::{GameDescriptor, GameError};
    pub use super::game::url::{GameUrl, GameUrlError};
    pub use super::game::outcome::*;
    pub use super::game::downloader::GameDownloader;

    pub use super::library::{Library, Update as LibraryUpdate};
    pub use super::library::summary::LibrarySummary;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

lazy_static::lazy_static! {
    /// Timeout applied to every API request. File downloads are not limited by it
    pub static ref DEFAULT_REQUESTS_TIMEOUT: Duration = Duration::from_secs(30);
}
