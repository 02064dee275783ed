use std::path::{Path, PathBuf};

use serde_json::json;

use crate::network::api::ApiError;
use crate::network::api::schema::{GameInfo, OwnedKey};

pub mod url;
pub mod outcome;
pub mod downloader;

use self::url::{GameUrl, GameUrlError};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Url(#[from] GameUrlError),

    #[error("Invalid game data: {0}")]
    InvalidGameData(String),

    #[error("Failed to load uploads list: {0}")]
    Catalog(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save game metadata: {0}")]
    Metadata(serde_json::Error)
}

/// Owned or publicly listed game to download
#[derive(Debug, Clone, PartialEq)]
pub struct GameDescriptor {
    pub name: String,
    pub publisher: String,
    pub link: String,
    pub game_id: u64,

    /// Id of the key the game was obtained with. Only games
    /// loaded from the owned library have it
    pub download_key_id: Option<u64>,

    pub url: GameUrl,

    /// Raw storefront game object
    pub data: serde_json::Value
}

impl GameDescriptor {
    /// Build descriptor from the storefront game object
    pub fn from_game_data(data: serde_json::Value) -> Result<Self, GameError> {
        let info = serde_json::from_value::<GameInfo>(data.clone())
            .map_err(|err| GameError::InvalidGameData(err.to_string()))?;

        let url = GameUrl::parse(&info.url)?;

        Ok(Self {
            name: info.title,
            publisher: info.user.username,
            link: info.url,
            game_id: info.id,
            download_key_id: None,
            url,
            data
        })
    }

    /// Build descriptor from the owned library key
    pub fn from_owned_key(key: OwnedKey) -> Result<Self, GameError> {
        let mut game = Self::from_game_data(key.game)?;

        game.game_id = key.game_id;
        game.download_key_id = Some(key.id);

        Ok(game)
    }

    #[inline]
    pub fn publisher_slug(&self) -> &str {
        &self.url.publisher
    }

    #[inline]
    pub fn game_slug(&self) -> &str {
        &self.url.slug
    }

    /// Folder with the game files, `{root}/{publisher}/{game}`
    pub fn folder(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref()
            .join(crate::filesystem::clean_path(self.publisher_slug()))
            .join(crate::filesystem::clean_path(self.game_slug()))
    }

    /// Metadata snapshot path, `{root}/{publisher}/{game}.json`
    pub fn metadata_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref()
            .join(crate::filesystem::clean_path(self.publisher_slug()))
            .join(crate::filesystem::clean_path(&format!("{}.json", self.game_slug())))
    }

    /// Metadata snapshot saved next to the game files
    pub fn metadata(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "publisher": self.publisher,
            "link": self.link,
            "itch_id": self.download_key_id,
            "game_id": self.game_id,
            "itch_data": self.data
        })
    }
}
