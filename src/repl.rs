use crate::config;
use crate::library;
use crate::model::{PersistedState, PlayMode, Song};
use crate::queue::PlayQueue;
use crate::ui::format_duration;
use anyhow::Result;
use crossbeam_channel::{Receiver, select, unbounded};
use std::io::{BufRead, Write, stdin, stdout};
use std::path::Path;
use std::thread;
use std::time::Duration;

const PROMPT: &str = "cadence> ";
const HELP: &str = "Commands: play | pause | resume | next | prev | ls | go <n> | \
                    set <normal|repeat|shuffle> | seek <seconds> | info | help | exit";

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Continue,
    Quit,
}

pub fn run(dir: &Path) -> Result<()> {
    let state = config::load_state()?;

    let mut queue = PlayQueue::new(crate::app::open_session());
    queue.set_songs(library::scan_dir(dir));
    queue.set_play_mode(state.play_mode);
    queue.auto_play = state.auto_play;
    if let Some(session) = queue.session_mut() {
        session.set_volume(state.volume);
    }

    println!("{} songs loaded from {}", queue.len(), dir.display());
    println!("{HELP}");

    let lines = spawn_stdin_reader();
    let mut out = stdout();
    write!(out, "{PROMPT}")?;
    out.flush()?;

    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    // stdin closed
                    break;
                };
                let (action, output) = dispatch(&mut queue, &line);
                if !output.is_empty() {
                    println!("{output}");
                }
                if action == Action::Quit {
                    break;
                }
                write!(out, "{PROMPT}")?;
                out.flush()?;
            }
            default(Duration::from_millis(200)) => {
                match queue.poll_finished() {
                    Ok(Some(Song { title, .. })) => {
                        println!("\nfinished: {title}");
                        if queue.auto_play
                            && let Ok(song) = queue.current_song()
                        {
                            println!("playing: {}", song.title);
                        }
                        write!(out, "{PROMPT}")?;
                        out.flush()?;
                    }
                    Ok(None) => {}
                    Err(err) => println!("playback error: {err}"),
                }
            }
        }
    }

    queue.stop();
    config::save_state(&PersistedState {
        play_mode: queue.mode(),
        auto_play: queue.auto_play,
        volume: queue.info().volume,
    })?;
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn dispatch(queue: &mut PlayQueue, raw: &str) -> (Action, String) {
    let input = raw.trim();
    if input.is_empty() {
        return (Action::Continue, String::new());
    }

    let mut split = input.splitn(2, char::is_whitespace);
    let command = split.next().unwrap_or_default();
    let arg = split.next().unwrap_or("").trim();

    let output = match command {
        "exit" | "quit" => return (Action::Quit, String::from("bye")),
        "help" => String::from(HELP),
        "play" => describe(queue.play_current().map(|()| now_playing(queue))),
        "pause" => match queue.session_mut() {
            Some(session) => {
                session.pause();
                String::from("paused")
            }
            None => String::from("player is not ready"),
        },
        "resume" => match queue.session_mut() {
            Some(session) => {
                session.resume();
                String::from("resumed")
            }
            None => String::from("player is not ready"),
        },
        "next" => describe(queue.play_next().map(|()| now_playing(queue))),
        "prev" => describe(queue.play_previous().map(|()| now_playing(queue))),
        "ls" => render_playlist(queue),
        "go" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => {
                describe(queue.play_song_at(n - 1).map(|()| now_playing(queue)))
            }
            _ => String::from("usage: go <n>  (1-based playlist index)"),
        },
        "set" => match arg.parse::<PlayMode>() {
            Ok(mode) => {
                queue.set_play_mode(mode);
                format!("play mode: {mode}")
            }
            Err(err) => err.to_string(),
        },
        "seek" => match arg.parse::<f64>() {
            Ok(secs) => {
                let seeked = match queue.session_mut() {
                    Some(session) => session.seek_by(secs),
                    None => Err(crate::error::Error::PlayerNotReady),
                };
                describe(seeked.map(|()| render_info(queue)))
            }
            Err(_) => String::from("usage: seek <seconds>  (negative rewinds)"),
        },
        "info" => render_info(queue),
        _ => format!("unknown command: {command} (try help)"),
    };

    (Action::Continue, output)
}

fn describe(result: crate::error::Result<String>) -> String {
    match result {
        Ok(message) => message,
        Err(err) => err.to_string(),
    }
}

fn now_playing(queue: &mut PlayQueue) -> String {
    match queue.current_song() {
        Ok(song) => format!("playing: {}", song.title),
        Err(_) => String::from("playing"),
    }
}

fn render_playlist(queue: &mut PlayQueue) -> String {
    let current = queue.current_song().ok();
    let songs = queue.playlist();
    if songs.is_empty() {
        return String::from("playlist is empty");
    }

    let mut lines = Vec::with_capacity(songs.len());
    for (i, song) in songs.iter().enumerate() {
        let marker = match &current {
            Some(current) if current.path == song.path => '>',
            _ => ' ',
        };
        lines.push(format!("{marker} {:>3}. {}", i + 1, song.title));
    }
    lines.join("\n")
}

fn render_info(queue: &mut PlayQueue) -> String {
    let info = queue.info();
    let Some(path) = &info.path else {
        return String::from("nothing is playing");
    };

    let state = if info.paused { "paused" } else { "playing" };
    format!(
        "{} [{}] {} / {}  vol {:.0}%  x{:.2}  mode {}",
        path.display(),
        state,
        format_duration(info.position),
        info.duration
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        info.volume * 100.0,
        info.speed,
        queue.mode(),
    )
}
