use cadence::audio::NullSession;
use cadence::library;
use cadence::model::{PlayMode, Song};
use cadence::queue::{PlayQueue, QueueEvent};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

fn write_test_wav(path: &Path, duration_ms: u32) {
    let sample_rate: u32 = 44_100;
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let bytes_per_sample = u32::from(bits_per_sample / 8);
    let total_samples = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
    let data_size = total_samples * u32::from(channels) * bytes_per_sample;
    let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
    let block_align = channels * (bits_per_sample / 8);
    let riff_chunk_size = 36_u32.saturating_add(data_size);

    let mut bytes = Vec::with_capacity((44_u32 + data_size) as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&riff_chunk_size.to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.resize((44_u32 + data_size) as usize, 0_u8);

    fs::write(path, bytes).expect("wav fixture should be written");
}

#[test]
fn scanned_directory_plays_through_with_auto_advance() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_test_wav(&dir.path().join("track_a.wav"), 40);
    write_test_wav(&dir.path().join("track_b.wav"), 40);
    fs::write(dir.path().join("notes.txt"), b"not audio").expect("write");

    let songs = library::scan_dir(dir.path());
    assert_eq!(songs.len(), 2);

    let mut queue = PlayQueue::new(Box::new(NullSession::new()));
    queue.set_songs(songs);
    queue.auto_play = true;
    let events = queue.subscribe();

    queue.play_current().expect("play first track");
    assert!(matches!(
        events.recv().expect("started event"),
        QueueEvent::SongStarted(song) if song.title == "track_a"
    ));

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut finished = Vec::new();
    while finished.len() < 2 && Instant::now() < deadline {
        if let Some(song) = queue.poll_finished().expect("poll") {
            finished.push(song.title);
        }
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(finished, vec!["track_a", "track_b"]);
}

#[test]
fn seeded_shuffle_is_reproducible_across_queues() {
    let songs: Vec<Song> = (0..8)
        .map(|i| Song::from_path(PathBuf::from(format!("s{i}.mp3"))))
        .collect();

    let mut first = PlayQueue::new(Box::new(NullSession::new()))
        .with_rng(SmallRng::seed_from_u64(42));
    let mut second = PlayQueue::new(Box::new(NullSession::new()))
        .with_rng(SmallRng::seed_from_u64(42));
    first.set_songs(songs.clone());
    second.set_songs(songs.clone());
    first.set_play_mode(PlayMode::Shuffle);
    second.set_play_mode(PlayMode::Shuffle);

    let first_view: Vec<PathBuf> = first.playlist().iter().map(|s| s.path.clone()).collect();
    let second_view: Vec<PathBuf> = second.playlist().iter().map(|s| s.path.clone()).collect();
    assert_eq!(first_view, second_view);

    let mut sorted = first_view.clone();
    sorted.sort();
    let mut canonical: Vec<PathBuf> = songs.iter().map(|s| s.path.clone()).collect();
    canonical.sort();
    assert_eq!(sorted, canonical);
}

#[test]
fn repeat_mode_pins_the_song_that_is_playing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_test_wav(&dir.path().join("one.wav"), 500);
    write_test_wav(&dir.path().join("two.wav"), 500);

    let mut queue = PlayQueue::new(Box::new(NullSession::new()));
    queue.set_songs(library::scan_dir(dir.path()));

    queue.play_next().expect("advance to two");
    queue.set_play_mode(PlayMode::Repeat);
    queue.play_next().expect("replay");
    assert_eq!(queue.current_song().expect("current").title, "two");

    queue.set_play_mode(PlayMode::Normal);
    assert_eq!(queue.current_song().expect("current").title, "one");
}
