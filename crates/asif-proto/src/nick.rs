//! Nickname validation utilities.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format (nickname definition)

/// Extension trait for checking if a string is a valid IRC nickname.
pub trait NickExt {
    /// Check if this string is a valid IRC nickname per RFC 2812.
    ///
    /// Valid nicknames:
    /// - First character: letter (a-z, A-Z) or special character `[\]^_`{|}`
    /// - Subsequent characters: letter, digit (0-9), special, or hyphen (-)
    /// - Maximum length: [`DEFAULT_NICK_MAX_LEN`]
    ///
    /// # Examples
    ///
    /// ```
    /// use asif_proto::NickExt;
    ///
    /// assert!("asif".is_valid_nick());
    /// assert!("asif_".is_valid_nick());
    /// assert!(!"9lives".is_valid_nick());
    /// ```
    fn is_valid_nick(&self) -> bool;

    /// Check if this string is a valid IRC nickname with a custom max length.
    fn is_valid_nick_len(&self, max_len: usize) -> bool;
}

/// Default maximum nickname length.
pub const DEFAULT_NICK_MAX_LEN: usize = 30;

#[inline]
fn is_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

impl NickExt for &str {
    fn is_valid_nick(&self) -> bool {
        self.is_valid_nick_len(DEFAULT_NICK_MAX_LEN)
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        if self.is_empty() || self.len() > max_len {
            return false;
        }

        let mut chars = self.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || is_special(first) => {}
            _ => return false,
        }

        chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-')
    }
}

impl NickExt for String {
    fn is_valid_nick(&self) -> bool {
        self.as_str().is_valid_nick()
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        self.as_str().is_valid_nick_len(max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_nicks() {
        assert!("nick".is_valid_nick());
        assert!("nick123".is_valid_nick());
        assert!("nick-name".is_valid_nick());
        assert!("[nick]".is_valid_nick());
        assert!("nick__".is_valid_nick());
    }

    #[test]
    fn test_invalid_nicks() {
        assert!(!"".is_valid_nick());
        assert!(!"123nick".is_valid_nick());
        assert!(!"nick name".is_valid_nick());
        assert!(!"-nick".is_valid_nick());
        assert!(!"nick!user".is_valid_nick());
    }

    #[test]
    fn test_length_limits() {
        assert!("a".repeat(30).is_valid_nick());
        assert!(!"a".repeat(31).is_valid_nick());
        assert!(!"abcdef".is_valid_nick_len(5));
        assert!("abcde".is_valid_nick_len(5));
    }
}
