use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use std::io;
use std::time::{Duration, Instant};

use eecalc_core::Key;

use super::app::App;
use super::ui;

/// Input poll timeout; also the frame interval for transitions.
const FRAME: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        let now = Instant::now();
        app.poll_remote(now);
        app.tick(now);
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(FRAME)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            // Only process key press events (Windows reports Press + Release)
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key_event(app, key, Instant::now()) == Flow::Quit {
                return Ok(());
            }
        }
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => return Flow::Quit,
        KeyCode::Char('c') if ctrl => return Flow::Quit,
        KeyCode::Char('r') if ctrl => app.recalculate_all(),
        KeyCode::Char('s') if ctrl => app.save(),
        KeyCode::Char('l') if ctrl => app.reload_functions(),
        KeyCode::Char(c @ '1'..='9') if alt => {
            if let Some(n) = c.to_digit(10) {
                app.load_starter_number(n as usize, now);
            }
        }
        _ => {
            if let Some(key) = translate(key) {
                app.handle_key(key, now);
            }
        }
    }
    Flow::Continue
}

/// Map a terminal key event to a sheet key. Chorded keys other than Shift are dropped.
fn translate(key: KeyEvent) -> Option<Key> {
    let key = match key.code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Char(c)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            Key::Char(c)
        }
        _ => return None,
    };
    Some(key)
}
