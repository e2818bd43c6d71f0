use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    ToggleHelp,
    Dismiss,
    ToggleTheme,
    Refresh,
    OpenLogs,
    OpenExec,
    ToggleWrap,
    ToggleTimestamps,
    ScrollLeft,
    ScrollRight,
    ScrollBottom,
    CloseLogs,
    TerminateSession,
    SendInput(String),
}

/// Terminal state that changes how keys are read and encoded.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct KeyContext {
    /// DECCKM is set by the remote program.
    pub application_cursor: bool,
    /// The host terminal reports disambiguated keys, so `Ctrl+5` is a real
    /// `Ctrl+5` rather than the legacy spelling of `Ctrl+]`.
    pub keyboard_enhanced: bool,
}

pub fn map_key(mode: InputMode, key: KeyEvent, keys: KeyContext) -> Option<Action> {
    match mode {
        InputMode::Terminal => map_terminal_key(key, keys),
        InputMode::LogViewer => map_log_viewer_key(key),
        InputMode::Details => map_details_key(key),
    }
}

pub fn map_paste(mode: InputMode, text: String) -> Option<Action> {
    match mode {
        InputMode::Terminal if !text.is_empty() => Some(Action::SendInput(text)),
        _ => None,
    }
}

fn map_terminal_key(key: KeyEvent, keys: KeyContext) -> Option<Action> {
    if is_terminate_key(key, keys.keyboard_enhanced) {
        return Some(Action::TerminateSession);
    }
    encode_key(key, keys.application_cursor).map(Action::SendInput)
}

/// `Ctrl+]` leaves the session. Without keyboard enhancement the GS byte
/// arrives as `Ctrl+5`, so that spelling counts too.
fn is_terminate_key(key: KeyEvent, keyboard_enhanced: bool) -> bool {
    if !key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }
    match key.code {
        KeyCode::Char(']') => true,
        KeyCode::Char('5') => !keyboard_enhanced,
        _ => false,
    }
}

fn map_log_viewer_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('t') if key.modifiers.is_empty() => Some(Action::ToggleTimestamps),
        KeyCode::Char('w') if key.modifiers.is_empty() => Some(Action::ToggleWrap),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::ScrollLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::ScrollRight),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::End | KeyCode::Char('G') => Some(Action::ScrollBottom),
        KeyCode::F(2) => Some(Action::ToggleTheme),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::CloseLogs),
        _ => None,
    }
}

fn map_details_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('l') if key.modifiers.is_empty() => Some(Action::OpenLogs),
        KeyCode::Char('s') if key.modifiers.is_empty() => Some(Action::OpenExec),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Esc => Some(Action::Dismiss),
        KeyCode::F(2) => Some(Action::ToggleTheme),
        _ => None,
    }
}

/// Bytes an xterm would send for `key`.
pub fn encode_key(key: KeyEvent, application_cursor: bool) -> Option<String> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let modifier_param = xterm_modifier(key.modifiers);

    let encoded = match key.code {
        KeyCode::Char(c) if ctrl => control_char(c)?.to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".to_string(),
        KeyCode::Tab => "\t".to_string(),
        KeyCode::BackTab => "\x1b[Z".to_string(),
        KeyCode::Backspace if ctrl => "\x08".to_string(),
        KeyCode::Backspace => "\x7f".to_string(),
        KeyCode::Esc => "\x1b".to_string(),
        KeyCode::Up => cursor_key('A', modifier_param, application_cursor),
        KeyCode::Down => cursor_key('B', modifier_param, application_cursor),
        KeyCode::Right => cursor_key('C', modifier_param, application_cursor),
        KeyCode::Left => cursor_key('D', modifier_param, application_cursor),
        KeyCode::Home => cursor_key('H', modifier_param, application_cursor),
        KeyCode::End => cursor_key('F', modifier_param, application_cursor),
        KeyCode::Insert => tilde_key(2, modifier_param),
        KeyCode::Delete => tilde_key(3, modifier_param),
        KeyCode::PageUp => tilde_key(5, modifier_param),
        KeyCode::PageDown => tilde_key(6, modifier_param),
        KeyCode::F(n @ 1..=4) => {
            let letter = char::from(b'P' + (n - 1));
            match modifier_param {
                Some(param) => format!("\x1b[1;{param}{letter}"),
                None => format!("\x1bO{letter}"),
            }
        }
        KeyCode::F(n) => tilde_key(function_key_code(n)?, modifier_param),
        _ => return None,
    };

    let prefix_alt = alt
        && matches!(
            key.code,
            KeyCode::Char(_) | KeyCode::Enter | KeyCode::Backspace | KeyCode::Esc | KeyCode::Tab
        );
    if prefix_alt {
        Some(format!("\x1b{encoded}"))
    } else {
        Some(encoded)
    }
}

fn control_char(c: char) -> Option<char> {
    let byte = match c.to_ascii_lowercase() {
        letter @ 'a'..='z' => letter as u8 - b'a' + 1,
        '@' | ' ' | '2' => 0x00,
        '[' | '3' => 0x1b,
        '\\' | '4' => 0x1c,
        ']' | '5' => 0x1d,
        '^' | '6' => 0x1e,
        '_' | '-' | '7' => 0x1f,
        '?' | '8' => 0x7f,
        _ => return None,
    };
    Some(char::from(byte))
}

fn xterm_modifier(modifiers: KeyModifiers) -> Option<u8> {
    let mut param = 1;
    if modifiers.contains(KeyModifiers::SHIFT) {
        param += 1;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        param += 2;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        param += 4;
    }
    (param > 1).then_some(param)
}

fn cursor_key(letter: char, modifier: Option<u8>, application_cursor: bool) -> String {
    match modifier {
        Some(param) => format!("\x1b[1;{param}{letter}"),
        None if application_cursor => format!("\x1bO{letter}"),
        None => format!("\x1b[{letter}"),
    }
}

fn tilde_key(code: u8, modifier: Option<u8>) -> String {
    match modifier {
        Some(param) => format!("\x1b[{code};{param}~"),
        None => format!("\x1b[{code}~"),
    }
}

fn function_key_code(n: u8) -> Option<u8> {
    match n {
        5 => Some(15),
        6 => Some(17),
        7 => Some(18),
        8 => Some(19),
        9 => Some(20),
        10 => Some(21),
        11 => Some(23),
        12 => Some(24),
        _ => None,
    }
}
