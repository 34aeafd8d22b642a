use crate::audio::PlaybackSession;
use crate::library;
use crate::model::Song;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{Write, stdout};
use std::path::Path;
use std::time::Duration;

const SEEK_STEP_SECS: f64 = 1.0;

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Stay,
    Skip,
    Quit,
}

/// Plays every eligible file in the directory once, in listing order.
pub fn run(dir: &Path) -> Result<()> {
    let songs = library::scan_dir(dir);
    if songs.is_empty() {
        println!("no playable files in {}", dir.display());
        return Ok(());
    }

    let mut session = crate::app::open_session();

    enable_raw_mode()?;
    let result = play_all(&songs, &mut *session);
    disable_raw_mode()?;
    session.close();
    result
}

fn play_all(songs: &[Song], session: &mut dyn PlaybackSession) -> Result<()> {
    let mut out = stdout();
    write!(
        out,
        "{} songs. keys: q quit, n next, space pause, a/s seek 1s\r\n",
        songs.len()
    )?;
    out.flush()?;

    'songs: for song in songs {
        if let Err(err) = session.play(&song.path) {
            write!(out, "skipping {}: {err}\r\n", song.title)?;
            out.flush()?;
            continue;
        }
        write!(out, "playing: {}\r\n", song.title)?;
        out.flush()?;

        loop {
            if session.take_finished() {
                break;
            }
            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c = key.code == KeyCode::Char('c')
                && key.modifiers.contains(KeyModifiers::CONTROL);
            match apply_key(session, key.code, ctrl_c) {
                KeyOutcome::Stay => {}
                KeyOutcome::Skip => break,
                KeyOutcome::Quit => break 'songs,
            }
        }
    }

    write!(out, "done\r\n")?;
    out.flush()?;
    Ok(())
}

fn apply_key(session: &mut dyn PlaybackSession, code: KeyCode, ctrl_c: bool) -> KeyOutcome {
    if ctrl_c {
        return KeyOutcome::Quit;
    }
    match code {
        KeyCode::Char('q') => KeyOutcome::Quit,
        KeyCode::Char('n') => KeyOutcome::Skip,
        KeyCode::Char(' ') => {
            if session.is_paused() {
                session.resume();
            } else {
                session.pause();
            }
            KeyOutcome::Stay
        }
        KeyCode::Char('a') => {
            // Rewinding clamps at the start, so the error case is idle only.
            let _ = session.seek_by(-SEEK_STEP_SECS);
            KeyOutcome::Stay
        }
        KeyCode::Char('s') => {
            let _ = session.seek_by(SEEK_STEP_SECS);
            KeyOutcome::Stay
        }
        _ => KeyOutcome::Stay,
    }
}
