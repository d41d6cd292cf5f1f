//! Terminal User Interface using ratatui

mod ui;

use crate::app::{App, InputEvent, Mode, Render};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::{Duration, Instant};

/// Columns taken by the status box border and padding
const BOX_PADDING: u16 = 4;

/// Smallest character budget the layout is usable with
const MIN_CHARACTERS: usize = 10;

/// TUI application wrapper
pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    /// Create a new TUI instance
    pub fn new() -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Set up the terminal
    fn setup(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        Ok(())
    }

    /// Restore the terminal
    fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Run the TUI main loop
    pub async fn run(&mut self, app: &mut App) -> Result<()> {
        self.setup()?;

        let result = self.event_loop(app).await;

        self.restore()?;
        result
    }

    /// Derive the description budget from the terminal width unless configured
    fn fit_width(app: &mut App, width: u16) {
        if app.config.ui.max_characters.is_none() {
            app.max_characters = (width.saturating_sub(BOX_PADDING) as usize).max(MIN_CHARACTERS);
        }
    }

    async fn event_loop(&mut self, app: &mut App) -> Result<()> {
        if let Ok((width, _)) = terminal::size() {
            Self::fit_width(app, width);
        }

        let terminal = &mut self.terminal;
        app.reload_catalog(&mut |mode: Mode, text: &str| draw_progress(terminal, mode, text))
            .await;

        let poll_interval = app.config.ui.poll_interval();
        let mut render = Some(Render::Full);

        while !app.should_quit {
            if render.take().is_some() {
                self.terminal.draw(|f| ui::draw(f, app))?;
            }

            if event::poll(poll_interval)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if is_interrupt(&key) {
                            app.should_quit = true;
                            continue;
                        }
                        let Some(input) = map_key(key.code) else {
                            continue;
                        };

                        let terminal = &mut self.terminal;
                        let mut busy = false;
                        let requested = app
                            .handle_input(input, &mut |mode: Mode, text: &str| {
                                busy = true;
                                draw_progress(terminal, mode, text);
                            })
                            .await;
                        render = render.or(requested);

                        // Presses made during a side effect are dropped, not queued
                        if busy {
                            drain_input()?;
                        }
                    }
                    Event::Resize(width, _) => {
                        Self::fit_width(app, width);
                        render = Some(Render::Full);
                    }
                    _ => {}
                }
            }

            if let Some(requested) = app.tick(Instant::now()) {
                render = render.or(Some(requested));
            }
        }

        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn draw_progress(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mode: Mode, text: &str) {
    if let Err(e) = terminal.draw(|f| ui::draw_progress(f, mode, text)) {
        tracing::warn!("Failed to draw progress: {}", e);
    }
}

fn drain_input() -> Result<()> {
    while event::poll(Duration::ZERO)? {
        let _ = event::read()?;
    }
    Ok(())
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Map a key press onto one of the four device buttons
pub fn map_key(code: KeyCode) -> Option<InputEvent> {
    match code {
        KeyCode::Down | KeyCode::Right | KeyCode::Tab | KeyCode::Char('j') => Some(InputEvent::Next),
        KeyCode::Up | KeyCode::Left | KeyCode::BackTab | KeyCode::Char('k') => Some(InputEvent::Prev),
        KeyCode::Enter | KeyCode::Char(' ') => Some(InputEvent::Select),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => Some(InputEvent::Esc),
        _ => None,
    }
}
