//! Dashboard rendering

use hue_state::model::Rgb;
use hue_state::{ConnectionStatus, Dashboard, Light, LightStore, Room};
use ratatui::{prelude::*, widgets::*};

use crate::app::{rows, App, Row, View};

const BAR_WIDTH: usize = 10;

/// Draw the whole screen for one dashboard snapshot
pub fn render(frame: &mut Frame<'_>, app: &App, dashboard: &Dashboard, bridge: &str) {
    let banner_height = if dashboard.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // Status line
            Constraint::Min(3),                // Rooms and lights
            Constraint::Length(banner_height), // Error banner
            Constraint::Length(1),             // Key help
        ])
        .split(frame.size());

    render_status(frame, chunks[0], dashboard, bridge);
    render_lights(frame, chunks[1], app, &dashboard.store);
    if let Some(error) = &dashboard.error {
        render_error(frame, chunks[2], error);
    }
    render_help(frame, chunks[3], app.view());

    if let View::Scenes { selected, .. } = app.view() {
        render_scene_picker(frame, app, &dashboard.store, *selected);
    }
}

fn render_status(frame: &mut Frame<'_>, area: Rect, dashboard: &Dashboard, bridge: &str) {
    let connection_style = match dashboard.connection {
        ConnectionStatus::Connected => Style::default().fg(Color::Green),
        ConnectionStatus::Reconnecting(_) => Style::default().fg(Color::Yellow),
        ConnectionStatus::Offline => Style::default().fg(Color::DarkGray),
    };

    let mut spans = vec![
        Span::styled(" Hue ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{}  ", bridge)),
        Span::styled(format!("● {}", dashboard.connection), connection_style),
    ];
    if dashboard.loading {
        spans.push(Span::styled("  loading…", Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_lights(frame: &mut Frame<'_>, area: Rect, app: &App, store: &LightStore) {
    let block = Block::default().borders(Borders::ALL).title(" Lights ");

    if store.is_empty() {
        let empty = Paragraph::new("No lights yet. Press r to refresh.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = rows(store)
        .iter()
        .filter_map(|row| match row {
            Row::Room(index) => store.rooms().get(*index).map(room_line),
            Row::Light { light, .. } => store.light(light).map(light_line),
        })
        .map(ListItem::new)
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default();
    state.select(Some(app.selected_index(store)));
    frame.render_stateful_widget(list, area, &mut state);
}

fn room_line(room: &Room) -> Line<'static> {
    let (marker, color) = if room.all_on() {
        ("●", Color::Yellow)
    } else if room.any_on() {
        ("◐", Color::Yellow)
    } else {
        ("○", Color::DarkGray)
    };

    Line::from(vec![
        Span::styled(format!("{} ", marker), Style::default().fg(color)),
        Span::styled(room.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ])
}

fn light_line(light: &Light) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let (marker, text_style) = if light.on() {
        ("●", Style::default())
    } else {
        ("○", dim)
    };

    let mut spans = vec![
        Span::styled(format!("   {} ", marker), text_style),
        Span::styled(format!("{:<24}", light.name), text_style),
        Span::styled(
            brightness_bar(light.brightness(), BAR_WIDTH),
            if light.on() { Style::default().fg(Color::Yellow) } else { dim },
        ),
        Span::styled(format!(" {:>3}%", light.brightness()), text_style),
    ];

    if let Some(color) = light.color() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("██", Style::default().fg(swatch(color.rgb()))));
    }

    Line::from(spans)
}

/// Filled cells for `percent`, rounded to the nearest cell
pub fn brightness_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn swatch(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn render_error(frame: &mut Frame<'_>, area: Rect, error: &str) {
    let banner = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Error "));
    frame.render_widget(banner, area);
}

fn render_help(frame: &mut Frame<'_>, area: Rect, view: &View) {
    let help = match view {
        View::Lights => {
            "↑↓ select  ←→ dim  space toggle  0-9 level  w/c temp  [ ] hue  -/= sat  a/x room  s scenes  r refresh  q quit"
        }
        View::Scenes { .. } => "↑↓ select  enter activate  esc close",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_scene_picker(frame: &mut Frame<'_>, app: &App, store: &LightStore, selected: usize) {
    let area = centered_rect(60, 60, frame.size());
    let choices = app.scene_choices(store);

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Scenes ")
        .border_style(Style::default().fg(Color::Cyan));

    if choices.is_empty() {
        frame.render_widget(Paragraph::new("No scenes for this room").block(block), area);
        return;
    }

    let items: Vec<ListItem> = choices
        .iter()
        .map(|scene| {
            let mut spans = vec![Span::raw(scene.name.clone())];
            if !scene.room_name.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", scene.room_name),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black));
    let mut state = ListState::default();
    state.select(Some(selected.min(choices.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

/// A rectangle of the given percentages centered in `area`
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
