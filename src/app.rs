use crate::audio::{NullSession, PlaybackSession, RodioSession};
use crate::config;
use crate::library;
use crate::model::{PersistedState, Song};
use crate::queue::{PlayQueue, QueueEvent};
use crate::ui;
use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

const SEEK_STEP_SECS: f64 = 10.0;
const VOLUME_STEP: f32 = 0.05;

pub fn open_session() -> Box<dyn PlaybackSession> {
    match RodioSession::new() {
        Ok(session) => Box::new(session),
        Err(err) => {
            log::warn!("no audio output available, running silent: {err:#}");
            Box::new(NullSession::new())
        }
    }
}

pub fn run(dir: &Path) -> Result<()> {
    let state = config::load_state()?;
    let songs = library::scan_dir(dir);

    let mut queue = PlayQueue::new(open_session());
    queue.set_songs(songs);
    queue.set_play_mode(state.play_mode);
    queue.auto_play = state.auto_play;
    if let Some(session) = queue.session_mut() {
        session.set_volume(state.volume);
    }
    let events = queue.subscribe();

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut queue, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    queue.stop();
    let save_result = config::save_state(&PersistedState {
        play_mode: queue.mode(),
        auto_play: queue.auto_play,
        volume: queue.info().volume,
    });
    result?;
    save_result?;
    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    queue: &mut PlayQueue,
    events: &Receiver<QueueEvent>,
) -> Result<()> {
    let mut selected = 0_usize;
    let mut status = String::from("Ready");
    let mut dirty = true;
    let mut last_tick = Instant::now();

    loop {
        if let Err(err) = queue.poll_finished() {
            status = format!("playback error: {err}");
            dirty = true;
        }
        dirty |= drain_events(events);

        if dirty || last_tick.elapsed() > Duration::from_millis(250) {
            let view = queue.playlist();
            selected = selected.min(view.len().saturating_sub(1));
            let info = queue.info();
            let playing = info.path.clone();
            terminal.draw(|frame| {
                ui::draw(
                    frame,
                    &ui::Screen {
                        songs: &view,
                        selected,
                        mode: queue.mode(),
                        auto_play: queue.auto_play,
                        status: &status,
                        info: &info,
                        playing: playing.as_deref(),
                    },
                )
            })?;
            dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Char('q') => break,
            KeyCode::Down => {
                if selected + 1 < queue.len() {
                    selected += 1;
                    dirty = true;
                }
            }
            KeyCode::Up => {
                if selected > 0 {
                    selected -= 1;
                    dirty = true;
                }
            }
            KeyCode::Enter => {
                let target = queue.playlist().get(selected).cloned();
                match target {
                    Some(song) => report(queue.play_song(&song), &mut status),
                    None => status = String::from("Playlist is empty"),
                }
                dirty = true;
            }
            KeyCode::Char('p') => {
                report(queue.play_current(), &mut status);
                dirty = true;
            }
            KeyCode::Char(' ') => {
                if let Some(session) = queue.session_mut() {
                    if session.is_paused() {
                        session.resume();
                        status = String::from("Resumed");
                    } else {
                        session.pause();
                        status = String::from("Paused");
                    }
                }
                dirty = true;
            }
            KeyCode::Char('s') | KeyCode::Char('n') => {
                report(queue.play_next(), &mut status);
                dirty = true;
            }
            KeyCode::Char('a') | KeyCode::Char('b') => {
                report(queue.play_previous(), &mut status);
                dirty = true;
            }
            KeyCode::Char('z') => {
                if let Some(session) = queue.session_mut() {
                    report(session.seek_by(-SEEK_STEP_SECS), &mut status);
                }
                dirty = true;
            }
            KeyCode::Char('x') => {
                if let Some(session) = queue.session_mut() {
                    report(session.seek_by(SEEK_STEP_SECS), &mut status);
                }
                dirty = true;
            }
            KeyCode::Char('m') => {
                let next = queue.mode().next();
                queue.set_play_mode(next);
                selected = 0;
                status = format!("Play mode: {next}");
                dirty = true;
            }
            KeyCode::Char('r') => {
                queue.reshuffle();
                selected = 0;
                status = String::from("Reshuffled");
                dirty = true;
            }
            KeyCode::Char('t') => {
                queue.auto_play = !queue.auto_play;
                status = format!(
                    "Autoplay {}",
                    if queue.auto_play { "on" } else { "off" }
                );
                dirty = true;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                adjust_volume(queue, VOLUME_STEP, &mut status);
                dirty = true;
            }
            KeyCode::Char('-') => {
                adjust_volume(queue, -VOLUME_STEP, &mut status);
                dirty = true;
            }
            _ => {}
        }
    }

    Ok(())
}

fn report<T, E: std::fmt::Display>(result: std::result::Result<T, E>, status: &mut String) {
    if let Err(err) = result {
        *status = format!("playback error: {err}");
    }
}

fn adjust_volume(queue: &mut PlayQueue, delta: f32, status: &mut String) {
    if let Some(session) = queue.session_mut() {
        let next = (session.volume() + delta).clamp(0.0, 2.0);
        session.set_volume(next);
        *status = format!("Volume: {}%", (next * 100.0).round() as u16);
    }
}

fn drain_events(events: &Receiver<QueueEvent>) -> bool {
    let mut saw_any = false;
    while let Ok(event) = events.try_recv() {
        saw_any = true;
        match event {
            QueueEvent::SongStarted(Song { title, .. }) => log::info!("playing: {title}"),
            QueueEvent::SongFinished(Song { title, .. }) => log::info!("finished: {title}"),
            QueueEvent::ListChanged(len) => log::info!("playlist now holds {len} songs"),
        }
    }
    saw_any
}
