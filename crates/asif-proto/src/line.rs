//! Line-based codec for tokio.
//!
//! Reads and writes CRLF-terminated protocol lines, decoding and encoding
//! text with a configurable character encoding. Incoming lines may be split
//! across any number of reads; the codec buffers until a full line is seen.
//! Lines longer than the limit are dropped whole and decoding resumes at the
//! next line.

use std::borrow::Cow;

use bytes::{Buf, BytesMut};
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{self, ProtocolError};

/// Default maximum incoming line length, including the line terminator.
///
/// Leaves room for message tags on servers that send them unprompted.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Line codec for IRC traffic.
///
/// Decoded items are single lines with the terminator stripped. Encoded items
/// are truncated at their first line ending and terminated with CRLF, so one
/// item always produces exactly one line on the wire.
#[derive(Debug)]
pub struct LineCodec {
    encoding: &'static Encoding,
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Bytes skipped so far of an over-long line whose end is not yet seen
    discarding: Option<usize>,
}

impl LineCodec {
    /// Create a new codec for the given encoding label (e.g. `"utf-8"`,
    /// `"latin1"`).
    pub fn new(label: &str) -> error::Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ProtocolError::UnknownEncoding(label.to_owned()))?;

        Ok(Self {
            encoding,
            next_index: 0,
            max_len: MAX_IRC_LINE_LEN,
            discarding: None,
        })
    }

    /// Create a new codec with a custom max line length.
    pub fn with_max_len(label: &str, max_len: usize) -> error::Result<Self> {
        let mut codec = Self::new(label)?;
        codec.max_len = max_len;
        Ok(codec)
    }

    /// The encoding used for both directions.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Cut an outgoing line at its first CR, LF or NUL.
    ///
    /// ```
    /// use asif_proto::LineCodec;
    ///
    /// assert_eq!(LineCodec::sanitize("PRIVMSG #c :hi\r\nQUIT"), "PRIVMSG #c :hi");
    /// ```
    pub fn sanitize(data: &str) -> &str {
        match data.find(['\r', '\n', '\0']) {
            Some(pos) => &data[..pos],
            None => data,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (Some(skipped), Some(end)) => {
                    src.advance(end + 1);
                    self.next_index = 0;
                    self.discarding = None;
                    warn!(len = skipped + end + 1, limit = self.max_len, "Discarded over-long line");
                }
                (Some(skipped), None) => {
                    self.discarding = Some(skipped + src.len());
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (None, Some(end)) => {
                    let line = src.split_to(end + 1);
                    self.next_index = 0;

                    if line.len() > self.max_len {
                        warn!(len = line.len(), limit = self.max_len, "Discarded over-long line");
                        continue;
                    }

                    let (text, _enc, _had_errors) = self.encoding.decode(line.as_ref());
                    return Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()));
                }
                (None, None) => {
                    if src.len() > self.max_len {
                        // Too long already; drop what we have and skip to the next newline.
                        self.discarding = Some(src.len());
                        src.clear();
                        self.next_index = 0;
                    } else {
                        // No complete line yet - remember where we stopped
                        self.next_index = src.len();
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(&msg);

        let (bytes, _enc, _had_errors) = self.encoding.encode(line);
        dst.reserve(bytes.len() + 2);
        match bytes {
            Cow::Borrowed(b) => dst.extend_from_slice(b),
            Cow::Owned(v) => dst.extend_from_slice(&v),
        }
        dst.extend_from_slice(b"\r\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new("utf-8").unwrap();
        let mut buf = BytesMut::from("PING :test\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("PING :test".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_fragmented_line() {
        let mut codec = LineCodec::new("utf-8").unwrap();
        let mut buf = BytesMut::from("PRIVMSG #c");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b" :hi\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #c :hi".to_string())
        );
    }

    #[test]
    fn test_decode_several_lines_in_one_read() {
        let mut codec = LineCodec::new("utf-8").unwrap();
        let mut buf = BytesMut::from("PING :a\r\nPING :b\nPING :c");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a".into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :b".into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"PING :c");
    }

    #[test]
    fn test_decode_skips_too_long_line() {
        let mut codec = LineCodec::with_max_len("utf-8", 10).unwrap();
        let mut buf = BytesMut::from("this is way too long\nPING :a\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a".into()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_skips_too_long_line_across_reads() {
        let mut codec = LineCodec::with_max_len("utf-8", 10).unwrap();
        let mut buf = BytesMut::from("0123456789abcdef");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"still the same line");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b" ends here\r\nPING :b\r\nPI");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :b".into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"PI");
    }

    #[test]
    fn test_decode_line_at_limit_is_kept() {
        let mut codec = LineCodec::with_max_len("utf-8", 10).unwrap();
        let mut buf = BytesMut::from("PING :abc\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :abc".into()));
    }

    #[test]
    fn test_decode_latin1() {
        let mut codec = LineCodec::new("latin1").unwrap();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #c :caf\u{e9}".to_string())
        );
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            LineCodec::new("klingon"),
            Err(ProtocolError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = LineCodec::new("utf-8").unwrap();
        let mut buf = BytesMut::new();

        codec.encode("PONG :test".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :test\r\n");
    }

    #[test]
    fn test_encode_cannot_inject_second_line() {
        let mut codec = LineCodec::new("utf-8").unwrap();
        let mut buf = BytesMut::new();

        codec
            .encode("PRIVMSG #c :hi\r\nQUIT :owned".to_string(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #c :hi\r\n");
    }
}
