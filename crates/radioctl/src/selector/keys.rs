//! Raw keypress decoding.
//!
//! A read in raw mode returns 1–3 bytes.  Arrow keys arrive as `ESC [ A..D`
//! in one read; shift-arrows are six bytes (`ESC [ 1 ; 2 A`) and arrive as two
//! reads, the first of which decodes to [`Key::Partial`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    ShiftUp,
    ShiftDown,
    /// First half of a longer escape sequence; ignored.
    Partial,
    Unknown,
}

const ESC: u8 = 27;

pub fn decode(bytes: &[u8]) -> Key {
    match bytes {
        [ESC] => Key::Escape,
        [b'\n'] | [b'\r'] => Key::Enter,
        [ESC, b'[', b'A'] => Key::Up,
        [ESC, b'[', b'B'] => Key::Down,
        [ESC, b'[', b'C'] => Key::Right,
        [ESC, b'[', b'D'] => Key::Left,
        [ESC, b'[', b'1'] => Key::Partial,
        [b';', b'2', b'A'] => Key::ShiftUp,
        [b';', b'2', b'B'] => Key::ShiftDown,
        _ => match std::str::from_utf8(bytes).map(|s| {
            let mut chars = s.chars();
            (chars.next(), chars.next())
        }) {
            Ok((Some(c), None)) if !c.is_control() => Key::Char(c),
            _ => Key::Unknown,
        },
    }
}
