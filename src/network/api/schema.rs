use serde::{Serialize, Deserialize};

// {"game": {"id": 1234, "title": "Cool Game", "url": "https://someone.itch.io/cool-game", "user": {"username": "someone", ...}, ...}}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResponse {
    pub game: serde_json::Value
}

/// Fields of the storefront game object the downloader relies on
///
/// The whole object is kept as raw JSON next to it for the metadata snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub user: GameUser
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUser {
    pub username: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedKeysPage {
    pub owned_keys: Vec<OwnedKey>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedKey {
    /// Download key id
    pub id: u64,
    pub game_id: u64,
    pub game: serde_json::Value
}

// {"id": 1234, ...} from https://someone.itch.io/cool-game/data.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePageData {
    pub id: u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadsResponse {
    pub uploads: Vec<UploadEntry>
}

/// Single downloadable file of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEntry {
    pub id: u64,

    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Not every upload has a hash, such files can't be verified
    #[serde(default)]
    pub md5_hash: Option<String>,

    /// Platform traits like `p_windows`. Empty means the upload
    /// is platform-agnostic
    #[serde(default)]
    pub traits: Vec<String>
}

impl UploadEntry {
    /// Name of the file on the disk, falling back
    /// filename -> display name -> upload id
    pub fn file_name(&self) -> String {
        self.filename.as_deref()
            .filter(|name| !name.is_empty())
            .or(self.display_name.as_deref().filter(|name| !name.is_empty()))
            .map(String::from)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Check if the upload should be downloaded for the given platform
    ///
    /// Uploads without traits are never filtered out
    pub fn matches_platform(&self, platform: Option<&str>) -> bool {
        match platform {
            Some(platform) if !self.traits.is_empty() => {
                let wanted = format!("p_{platform}");

                self.traits.iter().any(|t| t == &wanted)
            }

            _ => true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSession {
    pub uuid: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub key: Option<LoginKey>,

    #[serde(default)]
    pub errors: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginKey {
    pub key: String
}
