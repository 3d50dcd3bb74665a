//! Signature scanning over a module's in-memory image.
//!
//! A single left-to-right pass returns the first (lowest-address) match.
//! Pattern authors are expected to pick signatures unique within the
//! scanned module; later occurrences are never considered.

use memchr::memchr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pattern::BytePattern;

/// Find the first match of `pattern` in `haystack` and return its start
/// offset. The pattern's own address offset is *not* applied here.
///
/// Deterministic: identical inputs always yield the identical offset.
pub fn find(haystack: &[u8], pattern: &BytePattern) -> Option<usize> {
    let tokens = pattern.tokens();
    if tokens.is_empty() || haystack.len() < tokens.len() {
        return None;
    }

    let Some((anchor_pos, anchor_byte)) = pattern.anchor() else {
        // All-wildcard patterns match the first window.
        return Some(0);
    };

    let last_start = haystack.len() - tokens.len();
    let mut search_from = anchor_pos;

    while let Some(found) = memchr(anchor_byte, &haystack[search_from..]) {
        let anchor_hit = search_from + found;
        let start = anchor_hit - anchor_pos;
        if start > last_start {
            return None;
        }
        if pattern.matches(&haystack[start..start + tokens.len()]) {
            return Some(start);
        }
        search_from = anchor_hit + 1;
    }

    None
}

/// Scans a resolved module image and yields absolute hook-site addresses.
pub struct ModuleScanner<'a> {
    image: &'a [u8],
    base: usize,
}

impl<'a> ModuleScanner<'a> {
    pub fn new(image: &'a [u8], base: usize) -> Self {
        Self { image, base }
    }

    /// Resolve `pattern` to an absolute address: image base + first match
    /// + the pattern's offset. `name` labels the fix in logs and errors.
    pub fn resolve(&self, name: &str, pattern: &BytePattern) -> Result<usize> {
        let start = find(self.image, pattern)
            .ok_or_else(|| Error::SignatureNotFound(name.to_string()))?;
        let address = self.base + start + pattern.offset();
        debug!(
            "{}: pattern [{}] matched at base+{:#x}, hook site {:#x}",
            name, pattern, start, address
        );
        Ok(address)
    }
}
