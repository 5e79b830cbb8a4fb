use std::{
    fs::{self, create_dir_all},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{reddit_api::Feed, snoobrowse_error::SnoobrowseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Entries like `rust`, `r/rust` or `u/spez`.
    pub subs: Vec<String>,
    /// Listing sort for subreddits: best, hot, new, top, rising.
    pub sort: String,
    /// OAuth bearer token, needed for voting only.
    pub access_token: Option<String>,
    pub user_agent: Option<String>,
    /// Resolve YouTube/Streamable links to iframe embeds.
    pub embeds: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subs: vec!["rust".to_string()],
            sort: "best".to_string(),
            access_token: None,
            user_agent: None,
            embeds: false,
        }
    }
}

impl Config {
    pub fn feeds(&self) -> Vec<Feed> {
        self.subs.iter().filter_map(|s| Feed::parse(s)).collect()
    }

    /// Adds a feed entry unless an equivalent one exists.
    pub fn add_sub(&mut self, entry: &str) -> Option<Feed> {
        let feed = Feed::parse(entry)?;
        if self.feeds().contains(&feed) {
            return None;
        }
        self.subs.push(feed.to_string());
        Some(feed)
    }

    pub fn load() -> Result<Self, SnoobrowseError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, SnoobrowseError> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(toml::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self) -> Result<(), SnoobrowseError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SnoobrowseError> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    fn path() -> Result<PathBuf, SnoobrowseError> {
        let home = dirs::home_dir()
            .ok_or_else(|| SnoobrowseError::Config("could not find home directory".to_string()))?;
        Ok(home.join(".config").join("snoobrowse").join("config.toml"))
    }
}
