/// Base URI of the storefront API
pub const API_URI: &str = "https://api.itch.io";

/// Storefront domain. Game pages live at `https://{publisher}.itch.io/{slug}`
pub const STOREFRONT_DOMAIN: &str = "itch.io";

/// Extension of the checksum sidecar written next to every verified file
pub const CHECKSUM_EXTENSION: &str = "md5";

/// Folder inside of the game folder where superseded files are moved
pub const OLD_FILES_FOLDER: &str = "old";

/// Append-only log of downloads which need manual attention
pub const ERRORS_LOG_FILE: &str = "errors.txt";

/// Filename used for the synthetic outcome of a game which failed as a whole
pub const UNKNOWN_FILENAME: &str = "UNKNOWN";

/// Default amount of games downloaded in parallel
pub const DEFAULT_JOBS: usize = 4;

/// Size of the chunks used to stream downloads onto the disk, in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 16;

/// Timestamp format of the files moved to the old files folder
pub const OLD_FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";

/// Sub-domains of the storefront which are never publisher pages
pub const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "static", "img"];

