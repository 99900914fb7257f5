use crate::tui::{App, Mode};
use crate::view::{greeting, search_pane, SearchPane, View, GENRES};
use chrono::Timelike;
use lumina_core::model::format_clock;
use lumina_engine::PlayerStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};
use tui_input::Input;

const C_ACCENT: Color = Color::Rgb(120, 100, 200);
const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
const C_MUTED: Color = Color::Rgb(90, 90, 110);
const C_SECONDARY: Color = Color::Rgb(140, 140, 160);
const C_LIVE: Color = Color::Rgb(80, 200, 120);
const C_EXPIRED: Color = Color::Rgb(255, 95, 95);
const C_PENDING: Color = Color::Rgb(255, 184, 80);
const C_SELECTION_BG: Color = Color::Rgb(32, 32, 48);

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    match app.view {
        View::Home => draw_home(frame, app, chunks[1]),
        View::Search => draw_search(frame, app, chunks[1]),
        View::Dj => draw_dj(frame, app, chunks[1]),
    }
    draw_player(frame, app, chunks[2]);
    draw_footer(frame, app, chunks[3]);

    if app.mode == Mode::Token {
        draw_token_modal(frame, app);
    }
}

/// Maps a click inside the progress bar to `(offset, width)` in cells.
pub fn progress_offset(area: Rect, column: u16, row: u16) -> Option<(f64, f64)> {
    let inside = column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height);
    inside.then(|| (f64::from(column - area.x), f64::from(area.width)))
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " lumina ",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];
    for view in View::ALL {
        let style = if view == app.view {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(view.title(), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let badge = if app.search.is_connected() {
        Span::styled("● Spotify Live ", Style::default().fg(C_LIVE))
    } else {
        Span::styled("● Session Expired  t: Renew Token ", Style::default().fg(C_EXPIRED))
    };
    frame.render_widget(
        Paragraph::new(Line::from(badge)).alignment(ratatui::layout::Alignment::Right),
        area,
    );
}

fn draw_home(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let hour = chrono::Local::now().hour();
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {}", greeting(hour)),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        chunks[0],
    );

    let title = if app.search.releases().is_empty() {
        " Featured "
    } else {
        " New Releases "
    };
    draw_rows(frame, app, chunks[1], title);
}

fn draw_search(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    draw_input(
        frame,
        chunks[0],
        &app.search_input,
        " Search ",
        "/ to type a song, artist or album",
        app.mode == Mode::Search,
    );

    match search_pane(app.search.state(), app.search.query()) {
        SearchPane::Genres => draw_genres(frame, chunks[1]),
        SearchPane::Message(text) => frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(C_SECONDARY)))
                .block(Block::default().borders(Borders::ALL).title(" Results ")),
            chunks[1],
        ),
        SearchPane::Results => draw_rows(frame, app, chunks[1], " Results "),
    }
}

const GENRE_COLUMNS: usize = 5;
const GENRE_TINTS: [Color; 5] = [
    Color::Rgb(225, 51, 0),
    Color::Rgb(30, 50, 100),
    Color::Rgb(141, 103, 171),
    Color::Rgb(39, 133, 106),
    Color::Rgb(186, 93, 7),
];

fn draw_genres(frame: &mut Frame, area: Rect) {
    let outer = Block::default().borders(Borders::ALL).title(" Browse all ");
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = GENRES.len().div_ceil(GENRE_COLUMNS);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3); rows])
        .split(inner);
    for (r, genres) in GENRES.chunks(GENRE_COLUMNS).enumerate() {
        let Some(row_area) = row_areas.get(r) else {
            break;
        };
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, GENRE_COLUMNS as u32); GENRE_COLUMNS])
            .split(*row_area);
        for (c, genre) in genres.iter().enumerate() {
            let tint = GENRE_TINTS[(r * GENRE_COLUMNS + c) % GENRE_TINTS.len()];
            frame.render_widget(
                Paragraph::new(Span::styled(
                    *genre,
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                ))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(tint)),
                ),
                cells[c],
            );
        }
    }
}

fn draw_dj(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    draw_input(
        frame,
        chunks[0],
        &app.mood_input,
        " Mood ",
        "m to tell the DJ how you feel",
        app.mode == Mode::Mood,
    );

    if app.dj.loading {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("The DJ is picking songs for \"{}\"...", app.dj.mood),
                Style::default().fg(C_PENDING),
            ))
            .block(Block::default().borders(Borders::ALL).title(" AI DJ ")),
            chunks[1],
        );
    } else {
        draw_rows(frame, app, chunks[1], " AI DJ ");
    }
}

fn draw_rows(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let rows = app.rows();
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let (primary, secondary) = if row.is_muted() {
                (Style::default().fg(C_MUTED), Style::default().fg(C_MUTED))
            } else {
                (Style::default().fg(C_PRIMARY), Style::default().fg(C_SECONDARY))
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(row.primary.clone(), primary),
                    Span::styled(format!("  {}", row.detail), secondary),
                ]),
                Line::from(Span::styled(format!("  {}", row.secondary), secondary)),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(Style::default().bg(C_SELECTION_BG).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(app.cursor.min(rows.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_input(
    frame: &mut Frame,
    area: Rect,
    input: &Input,
    title: &str,
    placeholder: &str,
    active: bool,
) {
    let border = if active { C_ACCENT } else { C_MUTED };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title.to_string());

    let width = area.width.saturating_sub(2) as usize;
    let scroll = input.visual_scroll(width);
    let text = if input.value().is_empty() && !active {
        Span::styled(placeholder.to_string(), Style::default().fg(C_MUTED))
    } else {
        Span::styled(
            input.value().chars().skip(scroll).collect::<String>(),
            Style::default().fg(C_PRIMARY),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);

    if active {
        let x = area.x + 1 + (input.visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }
}

fn draw_player(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(C_MUTED));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let player = &app.player;
    let now_playing = match player.current_track() {
        Some(t) => {
            let mut spans = vec![
                Span::styled(t.title.clone(), Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", t.artist), Style::default().fg(C_SECONDARY)),
            ];
            if !t.is_playable() {
                spans.push(Span::styled("  no preview", Style::default().fg(C_EXPIRED)));
            }
            Line::from(spans)
        }
        None => Line::from(Span::styled("Nothing selected", Style::default().fg(C_MUTED))),
    };
    let state_icon = match player.status() {
        PlayerStatus::Playing => "▶",
        PlayerStatus::Paused => "⏸",
        PlayerStatus::Ended => "■",
        PlayerStatus::Empty => "·",
    };
    let volume = format!("{state_icon}  vol {}% ", player.volume());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(volume.chars().count() as u16)])
        .split(lines[0]);
    frame.render_widget(Paragraph::new(now_playing), top[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(volume, Style::default().fg(C_SECONDARY))),
        top[1],
    );

    let bar = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(6), Constraint::Min(5), Constraint::Length(6)])
        .split(lines[1]);
    let enabled = player.transport_enabled();
    let clock_style = Style::default().fg(if enabled { C_SECONDARY } else { C_MUTED });
    frame.render_widget(
        Paragraph::new(Span::styled(format!("{:>5} ", format_clock(player.current_time())), clock_style)),
        bar[0],
    );
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(if enabled { C_ACCENT } else { C_MUTED }))
            .ratio(player.progress_percent() / 100.0)
            .label(""),
        bar[1],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {}", format_clock(player.duration())), clock_style)),
        bar[2],
    );

    app.progress_area = enabled.then_some(bar[1]);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hint = match app.mode {
        Mode::Normal => "tab view  ↑↓ move  enter play  space pause  +/- volume  / search  m mood  t token  x disconnect  q quit",
        Mode::Search => "typing a search  enter/esc done",
        Mode::Mood => "describe a mood  enter ask the DJ  esc cancel",
        Mode::Token => "paste an access token  enter connect  esc cancel",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(C_MUTED))),
        area,
    );
}

fn draw_token_modal(frame: &mut Frame, app: &App) {
    let area = centered(frame.area(), 60, 5);
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);
    draw_input(frame, chunks[0], &app.token_input, " Renew Token ", "", true);
    frame.render_widget(
        Paragraph::new(Span::styled(
            " The token is stored locally and sent only to the catalog.",
            Style::default().fg(C_SECONDARY),
        )),
        chunks[1],
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::{centered, draw_genres, progress_offset};
    use crate::view::GENRES;
    use ratatui::{backend::TestBackend, layout::Rect, Terminal};

    #[test]
    fn clicks_map_into_the_bar_only() {
        let bar = Rect::new(6, 20, 40, 1);
        assert_eq!(progress_offset(bar, 6, 20), Some((0.0, 40.0)));
        assert_eq!(progress_offset(bar, 26, 20), Some((20.0, 40.0)));
        assert_eq!(progress_offset(bar, 46, 20), None);
        assert_eq!(progress_offset(bar, 10, 21), None);
        assert_eq!(progress_offset(bar, 5, 20), None);
    }

    #[test]
    fn modal_fits_small_terminals() {
        let r = centered(Rect::new(0, 0, 40, 4), 60, 5);
        assert_eq!(r, Rect::new(0, 0, 40, 4));
        let r = centered(Rect::new(0, 0, 100, 30), 60, 5);
        assert_eq!(r, Rect::new(20, 12, 60, 5));
    }

    #[test]
    fn genre_tiles_all_render() {
        let mut terminal = Terminal::new(TestBackend::new(100, 10)).expect("terminal");
        terminal
            .draw(|f| draw_genres(f, f.area()))
            .expect("draw");
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Browse all"));
        for genre in GENRES {
            assert!(screen.contains(genre), "{genre} missing");
        }
    }
}
