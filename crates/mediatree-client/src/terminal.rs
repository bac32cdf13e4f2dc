//! Terminal setup, teardown and crossterm event translation.

use std::io::{self, Stdout};

use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode as CtKeyCode, KeyEvent, KeyEventKind, KeyModifiers},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    Terminal,
};
use tokio::sync::mpsc;

use crate::action::{Key, KeyCode};
use crate::app::AppMessage;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn setup() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

pub fn restore(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Blocking reader thread; `event::read()` never yields to the runtime.
pub fn spawn_event_reader(tx: mpsc::Sender<AppMessage>) {
    tokio::task::spawn_blocking(move || loop {
        match event::read() {
            Ok(ev) => {
                let Some(msg) = to_message(ev) else {
                    continue;
                };
                if tx.blocking_send(msg).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

pub fn to_message(ev: Event) -> Option<AppMessage> {
    match ev {
        Event::Key(key) => key_from_event(&key).map(AppMessage::Key),
        Event::Resize(_, _) => Some(AppMessage::Resize),
        _ => None,
    }
}

/// Presses only; releases and repeats reported by some terminals are ignored.
pub fn key_from_event(ev: &KeyEvent) -> Option<Key> {
    if ev.kind != KeyEventKind::Press {
        return None;
    }
    let code = match ev.code {
        CtKeyCode::Char(c) => KeyCode::Char(c),
        CtKeyCode::Enter => KeyCode::Enter,
        CtKeyCode::Esc => KeyCode::Esc,
        CtKeyCode::Backspace => KeyCode::Backspace,
        CtKeyCode::Tab => KeyCode::Tab,
        CtKeyCode::Up => KeyCode::Up,
        CtKeyCode::Down => KeyCode::Down,
        CtKeyCode::Left => KeyCode::Left,
        CtKeyCode::Right => KeyCode::Right,
        CtKeyCode::PageUp => KeyCode::PageUp,
        CtKeyCode::PageDown => KeyCode::PageDown,
        CtKeyCode::Home => KeyCode::Home,
        CtKeyCode::End => KeyCode::End,
        CtKeyCode::F(n) => KeyCode::F(n),
        _ => return None,
    };
    Some(Key {
        code,
        ctrl: ev.modifiers.contains(KeyModifiers::CONTROL),
        alt: ev.modifiers.contains(KeyModifiers::ALT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEventState;

    fn ev(code: CtKeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_key_translation() {
        let k = key_from_event(&ev(CtKeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press));
        assert_eq!(k, Some(Key::ctrl(KeyCode::Char('c'))));
        let k = key_from_event(&ev(CtKeyCode::Left, KeyModifiers::ALT, KeyEventKind::Press));
        assert_eq!(k, Some(Key::alt(KeyCode::Left)));
        let k = key_from_event(&ev(CtKeyCode::Enter, KeyModifiers::NONE, KeyEventKind::Release));
        assert_eq!(k, None);
    }
}
