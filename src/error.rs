use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the queue and playback session. Front ends print these
/// and keep their input loop running; nothing here is fatal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("playlist is empty")]
    PlaylistEmpty,

    #[error("song not found in playlist")]
    SongNotFound,

    #[error("invalid index")]
    InvalidIndex,

    #[error("player is not ready")]
    PlayerNotReady,

    #[error("invalid play mode: {0}")]
    InvalidPlayMode(String),

    #[error("unsupported audio format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("position out of bounds")]
    InvalidPosition,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode audio: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),

    #[error("seek failed: {0}")]
    Seek(String),
}

pub type Result<T> = std::result::Result<T, Error>;
