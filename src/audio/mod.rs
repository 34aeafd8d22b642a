use crate::error::{Error, Result};
use crate::library;
use anyhow::Context;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const MAX_VOLUME: f32 = 2.0;
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// Snapshot of the session state for front ends to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfo {
    pub path: Option<PathBuf>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub speed: f32,
    pub paused: bool,
}

/// One active decoded stream at a time. Decoding, resampling and mixing are
/// rodio's job; this seam only configures and forwards.
pub trait PlaybackSession {
    /// Replaces any prior stream with the given file. Only `.mp3` and `.wav`
    /// are accepted; anything else fails with `UnsupportedFormat`.
    fn play(&mut self, path: &Path) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    /// Reports paused with no active stream, by convention.
    fn is_paused(&self) -> bool;
    /// Absolute seek. `InvalidPosition` when idle or `pos` is past the end.
    fn seek_to(&mut self, pos: Duration) -> Result<()>;
    /// Relative seek in seconds, negative to rewind. The resulting position is
    /// clamped into the playable range.
    fn seek_by(&mut self, delta_secs: f64) -> Result<()>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn speed(&self) -> f32;
    fn set_speed(&mut self, speed: f32);
    /// Stops playback and releases the stream. Safe to call when idle.
    fn close(&mut self);
    fn current(&self) -> Option<&Path>;
    fn info(&self) -> PlaybackInfo;
    /// True exactly once per stream that reached its natural end. Streams
    /// replaced or closed before draining never report a finish.
    fn take_finished(&mut self) -> bool;
}

pub struct RodioSession {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    duration: Option<Duration>,
    volume: f32,
    speed: f32,
    // Bumped on every play/close; a finish only counts against the stream
    // that is still current.
    generation: u64,
    finish_reported: u64,
}

impl RodioSession {
    pub fn new() -> anyhow::Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output device")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            duration: None,
            volume: 1.0,
            speed: 1.0,
            generation: 0,
            finish_reported: 0,
        })
    }

    fn clamp_target(&self, target: Duration) -> Duration {
        match self.duration {
            Some(duration) => target.min(duration.saturating_sub(Duration::from_millis(1))),
            None => target,
        }
    }
}

impl PlaybackSession for RodioSession {
    fn play(&mut self, path: &Path) -> Result<()> {
        if !library::is_supported(path) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }

        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());

        let file = File::open(path)?;
        let source = Decoder::try_from(file)?;
        self.duration = source.total_duration();
        self.sink.append(source);
        self.sink.set_volume(self.volume);
        self.sink.set_speed(self.speed);
        self.current = Some(path.to_path_buf());
        self.generation += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn is_paused(&self) -> bool {
        self.current.is_none() || self.sink.is_paused()
    }

    fn seek_to(&mut self, pos: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::InvalidPosition);
        }
        if let Some(duration) = self.duration
            && pos >= duration
        {
            return Err(Error::InvalidPosition);
        }
        self.sink
            .try_seek(pos)
            .map_err(|err| Error::Seek(format!("{err:?}")))
    }

    fn seek_by(&mut self, delta_secs: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::InvalidPosition);
        }
        let pos = self.sink.get_pos();
        let delta = Duration::from_secs_f64(delta_secs.abs());
        let target = if delta_secs < 0.0 {
            pos.saturating_sub(delta)
        } else {
            self.clamp_target(pos.saturating_add(delta))
        };
        self.sink
            .try_seek(target)
            .map_err(|err| Error::Seek(format!("{err:?}")))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
        self.sink.set_volume(self.volume);
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.sink.set_speed(self.speed);
    }

    fn close(&mut self) {
        self.sink.stop();
        self.current = None;
        self.duration = None;
        self.generation += 1;
    }

    fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn info(&self) -> PlaybackInfo {
        PlaybackInfo {
            path: self.current.clone(),
            position: if self.current.is_some() {
                self.sink.get_pos()
            } else {
                Duration::ZERO
            },
            duration: self.duration,
            volume: self.volume,
            speed: self.speed,
            paused: self.is_paused(),
        }
    }

    fn take_finished(&mut self) -> bool {
        let drained = self.current.is_some() && !self.sink.is_paused() && self.sink.empty();
        if drained && self.finish_reported != self.generation {
            self.finish_reported = self.generation;
            return true;
        }
        false
    }
}

/// Wall-clock playback model with no audio device. Used as the fallback when
/// no output stream opens, and as the session double in tests.
pub struct NullSession {
    paused: bool,
    current: Option<PathBuf>,
    volume: f32,
    speed: f32,
    started_at: Option<Instant>,
    position_offset: Duration,
    duration: Option<Duration>,
    finish_reported: bool,
}

impl NullSession {
    pub fn new() -> Self {
        Self {
            paused: false,
            current: None,
            volume: 1.0,
            speed: 1.0,
            started_at: None,
            position_offset: Duration::ZERO,
            duration: None,
            finish_reported: false,
        }
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession for NullSession {
    fn play(&mut self, path: &Path) -> Result<()> {
        if !library::is_supported(path) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }
        self.paused = false;
        self.current = Some(path.to_path_buf());
        self.started_at = Some(Instant::now());
        self.position_offset = Duration::ZERO;
        self.duration = Self::estimate_duration(path);
        self.finish_reported = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn resume(&mut self) {
        if self.current.is_some() {
            self.started_at = Some(Instant::now());
        }
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.current.is_none() || self.paused
    }

    fn seek_to(&mut self, pos: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::InvalidPosition);
        }
        if let Some(duration) = self.duration
            && pos >= duration
        {
            return Err(Error::InvalidPosition);
        }
        self.position_offset = pos;
        self.started_at = (!self.paused).then(Instant::now);
        Ok(())
    }

    fn seek_by(&mut self, delta_secs: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::InvalidPosition);
        }
        let pos = self.current_position();
        let delta = Duration::from_secs_f64(delta_secs.abs());
        let mut target = if delta_secs < 0.0 {
            pos.saturating_sub(delta)
        } else {
            pos.saturating_add(delta)
        };
        if let Some(duration) = self.duration {
            target = target.min(duration.saturating_sub(Duration::from_millis(1)));
        }
        self.position_offset = target;
        self.started_at = (!self.paused).then(Instant::now);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    fn close(&mut self) {
        self.current = None;
        self.paused = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.duration = None;
        self.finish_reported = true;
    }

    fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn info(&self) -> PlaybackInfo {
        PlaybackInfo {
            path: self.current.clone(),
            position: if self.current.is_some() {
                self.current_position()
            } else {
                Duration::ZERO
            },
            duration: self.duration,
            volume: self.volume,
            speed: self.speed,
            paused: self.is_paused(),
        }
    }

    fn take_finished(&mut self) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };
        let drained = self.current.is_some() && !self.paused && self.current_position() >= duration;
        if drained && !self.finish_reported {
            self.finish_reported = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{NullSession, PlaybackSession};
    use crate::error::Error;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

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
    fn rejects_unsupported_extension() {
        let mut session = NullSession::new();
        let err = session.play(Path::new("song.ogg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(session.current().is_none());
    }

    #[test]
    fn idle_session_reports_paused_and_zeroed_info() {
        let session = NullSession::new();
        let info = session.info();
        assert!(info.paused);
        assert_eq!(info.position, Duration::ZERO);
        assert_eq!(info.duration, None);
        assert_eq!(info.path, None);
    }

    #[test]
    fn idle_session_rejects_seeks() {
        let mut session = NullSession::new();
        assert!(matches!(
            session.seek_to(Duration::from_secs(1)),
            Err(Error::InvalidPosition)
        ));
        assert!(matches!(session.seek_by(1.0), Err(Error::InvalidPosition)));
    }

    #[test]
    fn position_advances_and_pause_freezes_it() {
        let mut session = NullSession::new();
        session.play(Path::new("missing.mp3")).expect("play");
        thread::sleep(Duration::from_millis(20));
        let before = session.info().position;
        assert!(before > Duration::ZERO);

        session.pause();
        let paused = session.info().position;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(session.info().position, paused);

        session.resume();
        thread::sleep(Duration::from_millis(20));
        assert!(session.info().position > paused);
    }

    #[test]
    fn seek_past_end_is_invalid_position() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("clip.wav");
        write_test_wav(&track, 100);

        let mut session = NullSession::new();
        session.play(&track).expect("play");
        let err = session.seek_to(Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition));
    }

    #[test]
    fn relative_seek_clamps_into_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("clip.wav");
        write_test_wav(&track, 100);

        let mut session = NullSession::new();
        session.play(&track).expect("play");
        session.seek_by(-30.0).expect("rewind clamps to start");
        assert!(session.info().position <= Duration::from_millis(10));

        session.seek_by(30.0).expect("forward clamps below end");
        let duration = session.info().duration.expect("known duration");
        assert!(session.info().position < duration);
    }

    #[test]
    fn finish_is_reported_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("clip.wav");
        write_test_wav(&track, 30);

        let mut session = NullSession::new();
        session.play(&track).expect("play");
        thread::sleep(Duration::from_millis(60));
        assert!(session.take_finished());
        assert!(!session.take_finished());
    }

    #[test]
    fn close_suppresses_pending_finish() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("clip.wav");
        write_test_wav(&track, 30);

        let mut session = NullSession::new();
        session.play(&track).expect("play");
        thread::sleep(Duration::from_millis(60));
        session.close();
        assert!(!session.take_finished());
        assert!(session.is_paused());
    }
}
