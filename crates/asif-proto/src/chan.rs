//! Channel name utilities.
//!
//! Servers advertise which characters introduce a channel name through the
//! `CHANTYPES` ISUPPORT token. Until that arrives, [`DEFAULT_CHANTYPES`] is
//! assumed.
//!
//! # Reference
//! - RFC 2812 Section 1.3: Channel names

/// Channel prefixes assumed before the server advertises `CHANTYPES`.
pub const DEFAULT_CHANTYPES: &str = "#&";

/// Extension trait for checking if a string is an IRC channel name.
pub trait ChannelExt {
    /// Check if this string is a channel name under [`DEFAULT_CHANTYPES`].
    fn is_channel_name(&self) -> bool;

    /// Check if this string is a channel name under the given set of
    /// channel prefix characters.
    ///
    /// A channel name:
    /// - Starts with one of `chantypes`
    /// - Does not contain space, comma, BEL (0x07), or other control characters
    ///
    /// # Examples
    ///
    /// ```
    /// use asif_proto::ChannelExt;
    ///
    /// assert!("#rust".is_channel_name_in("#&"));
    /// assert!(!"+modeless".is_channel_name_in("#&"));
    /// assert!("+modeless".is_channel_name_in("#&+"));
    /// ```
    fn is_channel_name_in(&self, chantypes: &str) -> bool;
}

impl ChannelExt for &str {
    fn is_channel_name(&self) -> bool {
        self.is_channel_name_in(DEFAULT_CHANTYPES)
    }

    fn is_channel_name_in(&self, chantypes: &str) -> bool {
        let mut chars = self.chars();

        let first = match chars.next() {
            Some(c) => c,
            None => return false,
        };

        if !chantypes.contains(first) {
            return false;
        }

        chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }

    fn is_channel_name_in(&self, chantypes: &str) -> bool {
        self.as_str().is_channel_name_in(chantypes)
    }
}
