use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One entry in the playlist. The path is the identity: every lookup and
/// removal compares paths, never titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl Song {
    pub fn from_path(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("unknown"));
        Self {
            path,
            title,
            artist: None,
            album: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayMode {
    #[default]
    Normal,
    Repeat,
    Shuffle,
}

impl PlayMode {
    pub fn next(self) -> Self {
        match self {
            Self::Normal => Self::Shuffle,
            Self::Shuffle => Self::Repeat,
            Self::Repeat => Self::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Repeat => "repeat",
            Self::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlayMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" | "" => Ok(Self::Normal),
            "repeat" => Ok(Self::Repeat),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(Error::InvalidPlayMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub play_mode: PlayMode,
    #[serde(default = "default_auto_play")]
    pub auto_play: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_auto_play() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            play_mode: PlayMode::default(),
            auto_play: default_auto_play(),
            volume: default_volume(),
        }
    }
}
