//! Player — the runtime host for the board.
//!
//! Owns the terminal, the clock and the actor source. Each frame it polls the
//! source when the poll interval has passed, advances the board, and flushes
//! the canvas diff to the terminal. Keys are turned into board signals.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{cursor, event, execute, queue, style, terminal};

use crate::config::{BoardConfig, matches_binding};
use crate::engine::source::ActorSource;
use crate::engine::{Board, Signal};
use crate::renderer::TermCanvas;
use crate::types::{Color, NamedColor, Style};

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
/// Menu bar plus status bar.
const CHROME_ROWS: u16 = 2;

pub struct Player {
    board: Board,
    source: ActorSource,
    canvas: TermCanvas,
    started: Instant,
    last_poll: Option<Duration>,
    /// Whether the terminal reports key releases.
    release_events: bool,
}

impl Player {
    pub fn new(config: BoardConfig, source: ActorSource) -> Self {
        let canvas = TermCanvas::new(0, 0).with_walk_frame_size(config.walk_frame_size);
        Self {
            board: Board::new(config),
            source,
            canvas,
            started: Instant::now(),
            last_poll: None,
            release_events: false,
        }
    }

    /// Animate in the terminal until the quit key is pressed.
    ///
    /// Sets up the terminal, enters the frame loop, and restores the terminal
    /// on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        if term_w < 10 || term_h < CHROME_ROWS + 5 {
            bail!("Terminal too small: have {}x{}", term_w, term_h);
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        self.release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
        }

        let result = self.run_loop(&mut stdout);

        // Always restore terminal state.
        if self.release_events {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        self.fit(cols, rows);
        self.render_menubar(stdout)?;

        let frame_interval = self.board.config().frame_interval();
        let poll_interval = self.board.config().poll_interval();

        loop {
            let now = self.started.elapsed();

            let poll_due = match self.last_poll {
                None => true,
                Some(at) => now.saturating_sub(at) >= poll_interval,
            };
            if poll_due {
                let actors = self.source.poll();
                self.board.connect(actors, now, &mut self.canvas);
                self.last_poll = Some(now);
            }

            self.board.advance(now, &mut self.canvas);
            self.render_canvas(stdout)?;
            self.render_status(stdout)?;

            if !event::poll(frame_interval)? {
                continue;
            }
            match event::read()? {
                event::Event::Key(key) => {
                    if self.is_quit(&key) {
                        break;
                    }
                    self.handle_key(&key);
                }
                event::Event::Resize(cols, rows) => {
                    self.fit(cols, rows);
                    self.render_menubar(stdout)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn fit(&mut self, cols: u16, rows: u16) {
        let (w, h) = TermCanvas::pixel_size(cols, rows.saturating_sub(CHROME_ROWS));
        self.board.resize(w, h, &mut self.canvas);
        self.canvas.invalidate();
    }

    fn is_quit(&self, key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        let bindings = &self.board.config().key_bindings;
        matches_binding(&bindings.quit, key)
            || key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        let bindings = self.board.config().key_bindings.clone();

        if matches_binding(&bindings.accelerate_hold, key) {
            match key.kind {
                KeyEventKind::Press if self.release_events => {
                    self.board.signal(Signal::HoldPressed)
                }
                // Without release events a press toggles instead.
                KeyEventKind::Press => self.board.toggle_hold(),
                KeyEventKind::Release => self.board.signal(Signal::HoldReleased),
                KeyEventKind::Repeat => {}
            }
        } else if matches_binding(&bindings.accelerate_latch, key) {
            match key.kind {
                KeyEventKind::Press => self.board.signal(Signal::LatchPressed),
                KeyEventKind::Release => self.board.signal(Signal::LatchReleased),
                KeyEventKind::Repeat => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_menubar(&self, stdout: &mut io::Stdout) -> Result<()> {
        let bindings = &self.board.config().key_bindings;
        let hold = if self.release_events { "hold" } else { "toggle" };
        let items = [
            format!("[{}] {hold} fast", bindings.accelerate_hold),
            format!("[{}] fast until a stride lands", bindings.accelerate_latch),
            format!("[{}][Esc] quit", bindings.quit),
        ];

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_canvas(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let changes = self.canvas.frame_changes();
        if changes.is_empty() {
            return Ok(());
        }
        for change in changes {
            let cs = to_content_style(&change.cell.style);
            queue!(
                stdout,
                cursor::MoveTo(change.x, change.y + CANVAS_OFFSET),
                style::PrintStyledContent(style::StyledContent::new(cs, change.cell.ch)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let status_y = self.canvas.rows() + CANVAS_OFFSET;
        let (_, term_h) = terminal::size()?;
        if status_y >= term_h {
            return Ok(()); // No room for status bar.
        }

        let actors = self.board.actors();
        let finished = actors.values().filter(|a| a.is_finished()).count();
        let pace = self.board.pace();
        let speed = match (pace.accelerate, pace.latched) {
            (true, true) => "skipping",
            (true, false) => "fast",
            _ => "normal",
        };
        let status = format!(
            " Actors {}/{} done | step {:.1}px | {speed} ",
            finished,
            actors.len(),
            self.board.step_size(),
        );

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;
        Ok(())
    }
}

/// Print a menu item, bolding key names inside `[...]` and dimming the rest.
fn print_menu_item(stdout: &mut io::Stdout, item: &str) -> Result<()> {
    for (i, part) in item.split(['[', ']']).enumerate() {
        if part.is_empty() {
            continue;
        }
        // Odd parts sit between an opening and a closing bracket.
        let (attr, text) = if i % 2 == 1 {
            (style::Attribute::Bold, format!("[{part}]"))
        } else {
            (style::Attribute::Dim, part.to_string())
        };
        queue!(
            stdout,
            style::SetAttribute(attr),
            style::Print(text),
            style::SetAttribute(style::Attribute::Reset),
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = &s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = &s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    if s.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    if s.dim {
        cs.attributes.set(style::Attribute::Dim);
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::Red,
            NamedColor::Green => style::Color::Green,
            NamedColor::Yellow => style::Color::Yellow,
            NamedColor::Blue => style::Color::Blue,
            NamedColor::Magenta => style::Color::Magenta,
            NamedColor::Cyan => style::Color::Cyan,
            NamedColor::White => style::Color::White,
        },
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}
