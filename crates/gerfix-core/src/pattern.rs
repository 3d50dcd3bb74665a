//! Byte signature patterns.
//!
//! A pattern is an ordered list of byte tokens, each either a literal hex
//! byte or a wildcard (`??`), plus an offset added to the matched address.
//! Patterns are parsed once at fix construction, never per scan.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A byte signature with wildcard positions.
///
/// The textual form is whitespace-separated tokens: two hex digits for a
/// literal byte, `??` (or `?`) for a position that matches any byte.
/// `offset` points past a multi-instruction preamble to the instruction of
/// interest when the unique match site and the hook site differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    tokens: Vec<Option<u8>>,
    offset: usize,
}

impl BytePattern {
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_offset(text, 0)
    }

    pub fn parse_with_offset(text: &str, offset: usize) -> Result<Self> {
        let mut tokens = Vec::new();
        for token in text.split_whitespace() {
            if token == "??" || token == "?" {
                tokens.push(None);
                continue;
            }

            let value = u8::from_str_radix(token, 16)
                .map_err(|e| Error::PatternParse(format!("invalid token '{}': {}", token, e)))?;
            tokens.push(Some(value));
        }

        if tokens.is_empty() {
            return Err(Error::PatternParse("pattern is empty".to_string()));
        }

        Ok(Self { tokens, offset })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Offset applied to the matched address before it becomes a hook site.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn tokens(&self) -> &[Option<u8>] {
        &self.tokens
    }

    /// Position and value of the first literal byte, if any. Used by the
    /// scanner to anchor candidate positions.
    pub(crate) fn anchor(&self) -> Option<(usize, u8)> {
        self.tokens
            .iter()
            .enumerate()
            .find_map(|(i, token)| token.map(|value| (i, value)))
    }

    /// Whether `window` (exactly `len()` bytes) matches this pattern.
    /// Wildcard tokens compare equal to any byte.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() == self.tokens.len()
            && self
                .tokens
                .iter()
                .zip(window)
                .all(|(token, byte)| token.is_none_or(|value| value == *byte))
    }
}

impl FromStr for BytePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BytePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .tokens
            .iter()
            .map(|token| match token {
                Some(value) => format!("{:02X}", value),
                None => "??".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let pattern = BytePattern::parse("F3 0F 11 05 ?? ?? ?? ??").unwrap();
        assert_eq!(pattern.len(), 8);
        assert!(pattern.matches(&[0xF3, 0x0F, 0x11, 0x05, 0x34, 0xF2, 0x6F, 0x01]));
        assert!(pattern.matches(&[0xF3, 0x0F, 0x11, 0x05, 0x00, 0x00, 0x00, 0x00]));
        assert!(!pattern.matches(&[0xF3, 0x0F, 0x10, 0x05, 0x34, 0xF2, 0x6F, 0x01]));
    }

    #[test]
    fn test_display_roundtrip() {
        let text = "76 ?? F3 0F 59 05 ?? ?? ?? ?? E8";
        let pattern = BytePattern::parse(text).unwrap();
        assert_eq!(pattern.to_string(), text);
        assert_eq!(pattern.to_string().parse::<BytePattern>().unwrap(), pattern);
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(BytePattern::parse("").is_err());
        assert!(BytePattern::parse("   ").is_err());
        assert!(BytePattern::parse("F3 XY").is_err());
        assert!(BytePattern::parse("F3A").is_err());
    }

    #[test]
    fn test_offset_is_carried() {
        let pattern = BytePattern::parse_with_offset("76 ?? E8", 18).unwrap();
        assert_eq!(pattern.offset(), 18);
        assert_eq!(BytePattern::parse("76 ?? E8").unwrap().offset(), 0);
    }

    #[test]
    fn test_anchor_skips_leading_wildcards() {
        let pattern = BytePattern::parse("?? ?? 6F 00").unwrap();
        assert_eq!(pattern.anchor(), Some((2, 0x6F)));

        let blind = BytePattern::parse("?? ??").unwrap();
        assert_eq!(blind.anchor(), None);
    }

    #[test]
    fn test_window_length_must_match() {
        let pattern = BytePattern::parse("F3 0F").unwrap();
        assert!(!pattern.matches(&[0xF3]));
        assert!(!pattern.matches(&[0xF3, 0x0F, 0x11]));
    }
}
