//! Main UI rendering

use crate::app::{wrap_words, App, Mode};
use crate::versions::InstallState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn state_color(state: InstallState) -> Color {
    match state {
        InstallState::NotInstalled => Color::Red,
        InstallState::UpdateAvailable => Color::Yellow,
        InstallState::UpToDate => Color::Green,
    }
}

/// Split the screen into header, content and footer
fn frame_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Draw the main UI
pub fn draw(f: &mut Frame, app: &App) {
    let [header, content, footer] = frame_layout(f.area());

    draw_header(f, header);

    match app.nav.mode {
        Mode::Loading | Mode::Downloading => {
            draw_busy(f, content, app.nav.mode, &app.progress);
            return;
        }
        Mode::Categories => draw_category_view(f, app, content),
        Mode::Scripts | Mode::ActionMenu => draw_script_view(f, app, content),
    }

    draw_footer(f, app, footer);

    if app.status.is_showing() {
        draw_status_message(f, app);
    }
    if app.nav.mode == Mode::ActionMenu {
        draw_action_menu(f, app);
    }
}

/// Draw only the busy overlay; used for progress updates while a side effect runs
pub fn draw_progress(f: &mut Frame, mode: Mode, text: &str) {
    let [header, content, _] = frame_layout(f.area());
    draw_header(f, header);
    draw_busy(f, content, mode, text);
}

fn draw_header(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        format!("Script Store v{}", crate::APP_VERSION),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, area);
}

fn draw_busy(f: &mut Frame, area: Rect, mode: Mode, text: &str) {
    let (title, detail) = match mode {
        Mode::Loading => ("Loading...", "Fetching latest versions"),
        _ => ("Downloading...", text),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(detail.to_string(), Style::default().fg(Color::Gray))),
    ];

    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_category_view(f: &mut Frame, app: &App, area: Rect) {
    let categories = app.catalog.categories();
    let Some(category) = categories.get(app.nav.category_index) else {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled("No categories available", Style::default().fg(Color::Red))),
            Line::from(Span::styled("Check network connection", Style::default().fg(Color::Gray))),
        ];
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
        return;
    };

    let (name, name_color, summary) = if category.is_updates() {
        let n = category.len();
        (
            format!("* {} *", category.name),
            Color::Yellow,
            format!("{} update{} available", n, if n == 1 { "" } else { "s" }),
        )
    } else {
        (
            category.name.clone(),
            Color::Green,
            format!("{} available", category.len()),
        )
    };

    let lines = vec![
        Line::from(Span::styled(
            format!("{} of {}", app.nav.category_index + 1, categories.len()),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            name,
            Style::default()
                .fg(name_color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(summary, Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from("Press Select to browse"),
        Line::from("category"),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_script_view(f: &mut Frame, app: &App, area: Rect) {
    let category = app.nav.category_index;
    let count = app.catalog.script_count(category);
    let Some(entry) = app.catalog.entry_at(category, app.nav.script_index) else {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled("No apps in category", Style::default().fg(Color::Red))),
            Line::from(Span::styled("Press ESC to go back", Style::default().fg(Color::Gray))),
        ];
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
        return;
    };

    let state = app.versions.state_of(entry);
    let mut lines = vec![
        Line::from(Span::styled(
            app.nav.selected_category.clone().unwrap_or_default(),
            Style::default().fg(Color::Green),
        )),
        Line::from(Span::styled(
            format!("{} of {}", app.nav.script_index + 1, count),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            entry.name.clone(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(app.visible_description(), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            state.label(),
            Style::default()
                .fg(state_color(state))
                .add_modifier(Modifier::BOLD),
        )),
    ];

    if entry.has_known_version() {
        lines.push(Line::from(format!("Available: {}", entry.version)));
        if let Some(installed) = app.versions.get(&entry.key()) {
            lines.push(Line::from(format!("Installed: {}", installed)));
        }
    }

    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.nav.mode {
        Mode::Categories => "[↑/↓] Browse  [Enter] Open  [Esc] Close App",
        Mode::Scripts => "[↑/↓] Browse  [Enter] Actions  [Esc] Back",
        Mode::ActionMenu => "[↑/↓] Choose  [Enter] Confirm  [Esc] Cancel",
        Mode::Loading | Mode::Downloading => "",
    };

    let footer = Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}

/// Draw the status message as a word-wrapped box
fn draw_status_message(f: &mut Frame, app: &App) {
    let Some(message) = app.status.message() else {
        return;
    };

    let lines: Vec<Line> = wrap_words(message, app.max_characters)
        .into_iter()
        .map(Line::from)
        .collect();
    let area = fixed_rect(
        box_extent(app.max_characters, 4),
        box_extent(lines.len(), 2),
        f.area(),
    );

    f.render_widget(Clear, area);
    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(popup, area);
}

fn draw_action_menu(f: &mut Frame, app: &App) {
    let width = app
        .nav
        .menu_options
        .iter()
        .map(|o| o.label().len())
        .max()
        .unwrap_or(0) as u16
        + 8;
    let area = fixed_rect(width, app.nav.menu_options.len() as u16 + 2, f.area());

    let lines: Vec<Line> = app
        .nav
        .menu_options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            if i == app.nav.menu_index {
                Line::from(Span::styled(
                    format!("> {}", option.label()),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {}", option.label()))
            }
        })
        .collect();

    f.render_widget(Clear, area);
    let menu = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    );
    f.render_widget(menu, area);
}

/// Content size plus border padding, saturating at the largest terminal size
fn box_extent(content: usize, padding: u16) -> u16 {
    u16::try_from(content)
        .unwrap_or(u16::MAX)
        .saturating_add(padding)
}

/// Rect of the given size centered in `r`, shrunk to fit
fn fixed_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
