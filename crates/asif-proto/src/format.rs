//! IRC text formatting.
//!
//! Helpers for producing formatted message text (bold, colors, highlight
//! suppression) and for stripping formatting codes from received text.
//!
//! # IRC Format Codes
//! - 0x02 (^B): Bold
//! - 0x03 (^C): Color (followed by optional foreground,background)
//! - 0x0F (^O): Reset all formatting
//! - 0x16 (^V): Reverse/Inverse
//! - 0x1D (^]): Italic
//! - 0x1F (^_): Underline

use std::borrow::Cow;
use std::fmt;

const BOLD: char = '\x02';
const COLOR: char = '\x03';
const RESET: char = '\x0F';

/// IRC format control characters.
const FORMAT_CHARS: &[char] = &[BOLD, COLOR, RESET, '\x16', '\x1D', '\x1F'];

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// The 16 standard mIRC colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Color {
    White = 0,
    Black = 1,
    Blue = 2,
    Green = 3,
    Red = 4,
    Brown = 5,
    Magenta = 6,
    Orange = 7,
    Yellow = 8,
    LightGreen = 9,
    Cyan = 10,
    LightCyan = 11,
    LightBlue = 12,
    Pink = 13,
    Grey = 14,
    LightGrey = 15,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always two digits so a following digit in the text is not
        // swallowed into the color code.
        write!(f, "{:02}", *self as u8)
    }
}

/// Wrap text in bold codes.
///
/// ```
/// assert_eq!(asif_proto::format::bold("hi"), "\x02hi\x02");
/// ```
pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{BOLD}")
}

/// Color text with a foreground color, then reset formatting.
///
/// ```
/// use asif_proto::format::{color, Color};
///
/// assert_eq!(color("warn", Color::Yellow), "\x0308warn\x0f");
/// ```
pub fn color(text: &str, fg: Color) -> String {
    format!("{COLOR}{fg}{text}{RESET}")
}

/// Insert a zero-width space after the first character of a nickname.
///
/// Clients highlight on an exact nickname match, so mentioning a user through
/// this helper does not ping them.
pub fn no_highlight(nick: &str) -> String {
    let mut chars = nick.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(nick.len() + ZERO_WIDTH_SPACE.len_utf8());
            out.push(first);
            out.push(ZERO_WIDTH_SPACE);
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

/// Extension trait for handling formatted IRC strings.
pub trait FormattedStringExt<'a> {
    /// Check if the string contains any IRC formatting codes.
    fn is_formatted(&self) -> bool;

    /// Strip all IRC formatting codes from the string.
    ///
    /// Returns `Cow::Borrowed` if no formatting was present.
    fn strip_formatting(self) -> Cow<'a, str>;
}

impl<'a> FormattedStringExt<'a> for &'a str {
    fn is_formatted(&self) -> bool {
        self.contains(FORMAT_CHARS)
    }

    fn strip_formatting(self) -> Cow<'a, str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(strip(self))
    }
}

impl FormattedStringExt<'static> for String {
    fn is_formatted(&self) -> bool {
        self.as_str().is_formatted()
    }

    fn strip_formatting(self) -> Cow<'static, str> {
        if !self.is_formatted() {
            return Cow::Owned(self);
        }
        Cow::Owned(strip(&self))
    }
}

fn strip(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == COLOR {
            // ^C[fg[,bg]] with up to two digits each
            let mut digits = 0;
            while digits < 2 && chars.peek().is_some_and(char::is_ascii_digit) {
                chars.next();
                digits += 1;
            }
            if digits > 0 && chars.peek() == Some(&',') {
                let mut rest = chars.clone();
                rest.next();
                if rest.peek().is_some_and(char::is_ascii_digit) {
                    chars.next();
                    let mut bg = 0;
                    while bg < 2 && chars.peek().is_some_and(char::is_ascii_digit) {
                        chars.next();
                        bg += 1;
                    }
                }
            }
        } else if !FORMAT_CHARS.contains(&c) {
            out.push(c);
        }
    }

    out
}
