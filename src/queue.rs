use crate::audio::{PlaybackInfo, PlaybackSession};
use crate::error::{Error, Result};
use crate::model::{PlayMode, Song};
use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Broadcast to every subscriber; multiple observers (UI, logger) coexist
/// without overwriting each other.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    SongStarted(Song),
    SongFinished(Song),
    ListChanged(usize),
}

/// Owns the canonical song list, the cursor and the play-mode state machine,
/// and decides which song plays next. Playback itself is delegated to the
/// attached session.
///
/// The cursor indexes the canonical list in normal/repeat mode and the
/// shuffle permutation in shuffle mode; `view_index` is the single place that
/// duality is resolved.
pub struct PlayQueue {
    songs: Vec<Song>,
    cursor: usize,
    shuffle_order: Vec<usize>,
    mode: PlayMode,
    pub auto_play: bool,
    session: Option<Box<dyn PlaybackSession>>,
    // The song most recently handed to the session; completion always refers
    // to this one, even if the cursor moved since.
    playing: Option<Song>,
    subscribers: Vec<Sender<QueueEvent>>,
    rng: SmallRng,
}

impl PlayQueue {
    pub fn new(session: Box<dyn PlaybackSession>) -> Self {
        Self::build(Some(session))
    }

    /// A queue with no session attached. Every play operation fails with
    /// `PlayerNotReady`; navigation and list editing still work.
    pub fn detached() -> Self {
        Self::build(None)
    }

    fn build(session: Option<Box<dyn PlaybackSession>>) -> Self {
        Self {
            songs: Vec::new(),
            cursor: 0,
            shuffle_order: Vec::new(),
            mode: PlayMode::Normal,
            auto_play: false,
            session,
            playing: None,
            subscribers: Vec::new(),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Swaps in a seeded random source so shuffle order is deterministic.
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn subscribe(&mut self) -> Receiver<QueueEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: QueueEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Canonical list in insertion order, independent of play mode.
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn set_songs(&mut self, songs: Vec<Song>) {
        // Cursor and mode deliberately survive a wholesale replacement;
        // callers reset them if they want a fresh start.
        self.songs = songs;
        let len = self.songs.len();
        self.emit(QueueEvent::ListChanged(len));
    }

    pub fn add_songs(&mut self, songs: impl IntoIterator<Item = Song>) {
        self.songs.extend(songs);
        let len = self.songs.len();
        self.emit(QueueEvent::ListChanged(len));
    }

    /// Removes the first song with a matching path. No-op if absent.
    pub fn remove_song(&mut self, song: &Song) {
        let Some(index) = self.songs.iter().position(|s| s.path == song.path) else {
            return;
        };
        self.remove_at(index);
    }

    pub fn remove_song_at(&mut self, index: usize) -> Result<()> {
        if index >= self.songs.len() {
            return Err(Error::InvalidIndex);
        }
        self.remove_at(index);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) {
        self.songs.remove(index);
        // Keep pointing at the same song where possible; removing at or
        // before the cursor shifts everything after it down by one.
        if self.cursor >= index {
            self.cursor = self.cursor.saturating_sub(1);
        }
        let len = self.songs.len();
        self.emit(QueueEvent::ListChanged(len));
    }

    /// Song at the cursor under the current view. `InvalidIndex` whenever the
    /// cursor is out of `[0, len)`, which includes the empty playlist.
    pub fn current_song(&mut self) -> Result<Song> {
        if self.cursor >= self.songs.len() {
            return Err(Error::InvalidIndex);
        }
        if self.mode == PlayMode::Shuffle {
            self.ensure_shuffle_order();
        }
        let index = self.view_index(self.cursor).ok_or(Error::InvalidIndex)?;
        Ok(self.songs[index].clone())
    }

    fn view_index(&self, cursor: usize) -> Option<usize> {
        match self.mode {
            PlayMode::Shuffle => self.shuffle_order.get(cursor).copied(),
            PlayMode::Normal | PlayMode::Repeat => Some(cursor),
        }
    }

    pub fn play_current(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::PlayerNotReady);
        }
        let song = self.current_song()?;
        self.start(song)
    }

    fn start(&mut self, song: Song) -> Result<()> {
        let session = self.session.as_deref_mut().ok_or(Error::PlayerNotReady)?;
        session.play(&song.path)?;
        self.playing = Some(song.clone());
        self.emit(QueueEvent::SongStarted(song));
        Ok(())
    }

    pub fn play_next(&mut self) -> Result<()> {
        if self.songs.is_empty() {
            return Err(Error::PlaylistEmpty);
        }
        match self.mode {
            PlayMode::Normal | PlayMode::Shuffle => {
                self.cursor = (self.cursor + 1) % self.songs.len();
            }
            PlayMode::Repeat => {}
        }
        self.play_current()
    }

    pub fn play_previous(&mut self) -> Result<()> {
        if self.songs.is_empty() {
            return Err(Error::PlaylistEmpty);
        }
        match self.mode {
            PlayMode::Normal | PlayMode::Shuffle => {
                self.cursor = self
                    .cursor
                    .checked_sub(1)
                    .unwrap_or(self.songs.len() - 1);
            }
            PlayMode::Repeat => {}
        }
        self.play_current()
    }

    /// Plays the given song. A canonical match moves the cursor there; an
    /// unknown song still plays without touching the cursor.
    pub fn play_song(&mut self, song: &Song) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::PlayerNotReady);
        }
        if let Some(index) = self.songs.iter().position(|s| s.path == song.path) {
            self.cursor = index;
        }
        self.start(song.clone())
    }

    pub fn play_song_at(&mut self, index: usize) -> Result<()> {
        if index >= self.songs.len() {
            return Err(Error::InvalidIndex);
        }
        self.cursor = index;
        self.play_current()
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        match mode {
            PlayMode::Normal => self.cursor = 0,
            PlayMode::Repeat => {}
            PlayMode::Shuffle => {
                self.rebuild_shuffle_order();
                self.cursor = 0;
            }
        }
    }

    /// Draws a fresh permutation and rewinds the cursor. Only meaningful in
    /// shuffle mode; silent no-op otherwise.
    pub fn reshuffle(&mut self) {
        if self.mode != PlayMode::Shuffle {
            return;
        }
        self.rebuild_shuffle_order();
        self.cursor = 0;
    }

    /// The playlist as currently viewed: permuted in shuffle mode, canonical
    /// order otherwise. Always a copy; mutating it never touches the queue.
    pub fn playlist(&mut self) -> Vec<Song> {
        if self.mode == PlayMode::Shuffle {
            self.ensure_shuffle_order();
            return self
                .shuffle_order
                .iter()
                .map(|&index| self.songs[index].clone())
                .collect();
        }
        self.songs.clone()
    }

    fn ensure_shuffle_order(&mut self) {
        // Any playlist mutation invalidates the permutation by length;
        // regenerate wholesale rather than patching.
        if self.shuffle_order.len() != self.songs.len() {
            self.rebuild_shuffle_order();
        }
    }

    fn rebuild_shuffle_order(&mut self) {
        self.shuffle_order = (0..self.songs.len()).collect();
        self.shuffle_order.shuffle(&mut self.rng);
    }

    /// Detects a naturally-ended stream, announces it, and auto-advances when
    /// enabled. Front ends call this once per tick; the audio output thread
    /// is never re-entered.
    pub fn poll_finished(&mut self) -> Result<Option<Song>> {
        let finished = self
            .session
            .as_deref_mut()
            .is_some_and(PlaybackSession::take_finished);
        if !finished {
            return Ok(None);
        }
        let Some(song) = self.playing.take() else {
            return Ok(None);
        };
        self.emit(QueueEvent::SongFinished(song.clone()));
        if self.auto_play {
            self.play_next()?;
        }
        Ok(Some(song))
    }

    pub fn session_mut(&mut self) -> Option<&mut (dyn PlaybackSession + 'static)> {
        self.session.as_deref_mut()
    }

    pub fn info(&self) -> PlaybackInfo {
        match &self.session {
            Some(session) => session.info(),
            None => PlaybackInfo {
                path: None,
                position: Duration::ZERO,
                duration: None,
                volume: 0.0,
                speed: 0.0,
                paused: true,
            },
        }
    }

    pub fn stop(&mut self) {
        if let Some(session) = self.session.as_deref_mut() {
            session.close();
        }
        self.playing = None;
    }
}
