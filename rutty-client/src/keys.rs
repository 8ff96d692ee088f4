//! Local key presses → terminal input sequences.
//!
//! Translates crossterm [`KeyEvent`]s into the bytes an xterm-compatible
//! terminal would send, so the remote shell sees ordinary keyboard input.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Ctrl + this key detaches from the session.
pub const DETACH_KEY: char = ']';

/// What a key press means for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Leave the session.
    Detach,
    /// Text to send to the remote process.
    Data(String),
}

/// Convert a key event to session input (if applicable).
pub fn translate_key(key: &KeyEvent) -> Option<KeyInput> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let data = match key.code {
        KeyCode::Char(c) if ctrl && c == DETACH_KEY => return Some(KeyInput::Detach),
        KeyCode::Char(c) if ctrl => control_char(c)?.to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".into(),
        KeyCode::Backspace => "\x7f".into(),
        KeyCode::Tab => "\t".into(),
        KeyCode::BackTab => "\x1b[Z".into(),
        KeyCode::Esc => "\x1b".into(),
        KeyCode::Up => "\x1b[A".into(),
        KeyCode::Down => "\x1b[B".into(),
        KeyCode::Right => "\x1b[C".into(),
        KeyCode::Left => "\x1b[D".into(),
        KeyCode::Home => "\x1b[H".into(),
        KeyCode::End => "\x1b[F".into(),
        KeyCode::Insert => "\x1b[2~".into(),
        KeyCode::Delete => "\x1b[3~".into(),
        KeyCode::PageUp => "\x1b[5~".into(),
        KeyCode::PageDown => "\x1b[6~".into(),
        KeyCode::F(n) => function_key(n)?.into(),
        _ => return None,
    };

    // Meta sends ESC first.
    let data = if alt { format!("\x1b{data}") } else { data };
    Some(KeyInput::Data(data))
}

fn control_char(c: char) -> Option<char> {
    match c.to_ascii_lowercase() {
        c @ 'a'..='z' => Some(char::from(c as u8 & 0x1f)),
        '@' | ' ' | '2' => Some('\0'),
        '[' | '3' => Some('\x1b'),
        '\\' | '4' => Some('\x1c'),
        '^' | '6' => Some('\x1e'),
        '_' | '7' | '/' => Some('\x1f'),
        '8' => Some('\x7f'),
        _ => None,
    }
}

fn function_key(n: u8) -> Option<&'static str> {
    let seq = match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    };
    Some(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyInput> {
        translate_key(&KeyEvent::new(code, modifiers))
    }

    fn data(s: &str) -> Option<KeyInput> {
        Some(KeyInput::Data(s.into()))
    }

    #[test]
    fn printable_and_editing_keys() {
        assert_eq!(press(KeyCode::Char('x'), KeyModifiers::NONE), data("x"));
        assert_eq!(press(KeyCode::Char('X'), KeyModifiers::SHIFT), data("X"));
        assert_eq!(press(KeyCode::Enter, KeyModifiers::NONE), data("\r"));
        assert_eq!(press(KeyCode::Backspace, KeyModifiers::NONE), data("\x7f"));
        assert_eq!(press(KeyCode::Left, KeyModifiers::NONE), data("\x1b[D"));
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE), data("\x1b[15~"));
        assert_eq!(press(KeyCode::F(20), KeyModifiers::NONE), None);
    }

    #[test]
    fn control_keys() {
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), data("\x03"));
        assert_eq!(press(KeyCode::Char('D'), KeyModifiers::CONTROL), data("\x04"));
        assert_eq!(press(KeyCode::Char(' '), KeyModifiers::CONTROL), data("\0"));
    }

    #[test]
    fn alt_prefixes_escape() {
        assert_eq!(press(KeyCode::Char('b'), KeyModifiers::ALT), data("\x1bb"));
    }

    #[test]
    fn ctrl_bracket_detaches() {
        assert_eq!(
            press(KeyCode::Char(DETACH_KEY), KeyModifiers::CONTROL),
            Some(KeyInput::Detach)
        );
        assert_eq!(press(KeyCode::Char(']'), KeyModifiers::NONE), data("]"));
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(translate_key(&key), None);
    }
}
