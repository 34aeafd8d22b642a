use crate::model::Song;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::ffi::OsStr;
use std::path::Path;
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

pub fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// Builds the playlist from the direct children of `root`. The listing is
/// deliberately non-recursive: subdirectories are skipped, not descended into.
pub fn scan_dir(root: &Path) -> Vec<Song> {
    let mut songs = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_supported(path) {
            continue;
        }
        songs.push(read_song(path));
    }

    songs.sort_by(|a, b| a.path.cmp(&b.path));
    songs
}

fn read_song(path: &Path) -> Song {
    let mut song = Song::from_path(path.to_path_buf());

    if let Some((title, artist, album)) = tag_metadata(path) {
        if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
            song.title = title;
        }
        song.artist = artist;
        song.album = album;
    }

    song
}

fn tag_metadata(path: &Path) -> Option<(Option<String>, Option<String>, Option<String>)> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
    Some((
        tag.title().map(|value| value.to_string()),
        tag.artist().map(|value| value.to_string()),
        tag.album().map(|value| value.to_string()),
    ))
}
