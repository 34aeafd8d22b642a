use crate::audio::PlaybackInfo;
use crate::model::{PlayMode, Song};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::path::Path;
use std::time::Duration;

const APP_TITLE: &str = "cadence  ";

/// Everything one frame needs, snapshotted by the app loop so drawing never
/// mutates the queue.
pub struct Screen<'a> {
    pub songs: &'a [Song],
    pub selected: usize,
    pub mode: PlayMode,
    pub auto_play: bool,
    pub status: &'a str,
    pub info: &'a PlaybackInfo,
    pub playing: Option<&'a Path>,
}

struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

fn palette() -> Palette {
    Palette {
        bg: Color::Rgb(10, 15, 24),
        panel_bg: Color::Rgb(19, 29, 43),
        border: Color::Rgb(69, 121, 176),
        text: Color::Rgb(214, 228, 248),
        muted: Color::Rgb(149, 173, 204),
        accent: Color::Rgb(100, 203, 184),
        alert: Color::Rgb(249, 174, 88),
        selected_bg: Color::Rgb(34, 55, 82),
    }
}

pub fn draw(frame: &mut Frame, screen: &Screen) {
    let colors = palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Songs {}", screen.songs.len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Mode {}", screen.mode),
            Style::default().fg(colors.alert),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!(
                "Autoplay {}",
                if screen.auto_play { "on" } else { "off" }
            ),
            Style::default().fg(colors.muted),
        ),
    ]))
    .block(panel_block("Status", &colors));
    frame.render_widget(header, vertical[0]);

    let items: Vec<ListItem> = screen
        .songs
        .iter()
        .map(|song| {
            let marker = if screen.playing == Some(song.path.as_path()) {
                " > "
            } else {
                "   "
            };
            let detail = match (&song.artist, &song.album) {
                (Some(artist), Some(album)) => format!("  {artist} - {album}"),
                (Some(artist), None) => format!("  {artist}"),
                _ => String::new(),
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.accent)),
                Span::styled(song.title.as_str(), Style::default().fg(colors.text)),
                Span::styled(detail, Style::default().fg(colors.muted)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!screen.songs.is_empty()).then_some(screen.selected));

    let list = List::new(items)
        .block(panel_block("Playlist", &colors))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, vertical[1], &mut state);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(screen.info, 30, 12),
        Style::default().fg(colors.text),
    ))
    .block(panel_block("Timeline", &colors))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Keys: Enter play, Space pause, a/s prev/next, z/x seek 10s, m mode, r reshuffle, +/- volume, q quit",
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(screen.status, Style::default().fg(colors.text)),
    ]))
    .block(panel_block("Message", &colors));
    frame.render_widget(footer, vertical[3]);
}

fn panel_block<'a>(title: &'a str, colors: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(colors.text)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(colors.border))
        .style(Style::default().bg(colors.panel_bg))
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(info: &PlaybackInfo, timeline_width: usize, volume_width: usize) -> String {
    let ratio = info.duration.and_then(|duration| {
        let total = duration.as_secs_f64();
        (total > 0.0).then_some((info.position.as_secs_f64() / total).clamp(0.0, 1.0))
    });

    let state = if info.path.is_none() {
        "idle"
    } else if info.paused {
        "paused"
    } else {
        "playing"
    };

    format!(
        "{} / {} {}  |  Vol {} {:>3}%  |  x{:.2}  |  {}",
        format_duration(info.position),
        info.duration
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, timeline_width),
        progress_bar(Some(f64::from(info.volume.clamp(0.0, 1.0))), volume_width),
        (info.volume * 100.0).round() as u16,
        info.speed,
        state
    )
}
