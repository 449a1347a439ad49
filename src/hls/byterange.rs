use serde::Serialize;

use crate::{Error, Result};

/// A `<length>[@<offset>]` byte range as written in a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub length: u64,
    pub offset: Option<u64>,
}

impl ByteRange {
    pub fn new(length: u64, offset: Option<u64>) -> Self {
        Self { length, offset }
    }

    /// Parse from "length@offset" or "length" format.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidByteRange(s.to_string());
        match s.split_once('@') {
            Some((len, off)) => Ok(Self {
                length: len.trim().parse().map_err(|_| invalid())?,
                offset: Some(off.trim().parse().map_err(|_| invalid())?),
            }),
            None => Ok(Self {
                length: s.parse().map_err(|_| invalid())?,
                offset: None,
            }),
        }
    }

    /// Fill a missing offset with the end of the previous range on the same
    /// resource, or zero.
    pub fn with_continuation(&self, previous_end: Option<u64>) -> Self {
        Self {
            length: self.length,
            offset: Some(self.offset.or(previous_end).unwrap_or(0)),
        }
    }

    /// `None` when the offset is unknown or the end does not fit in 64 bits.
    pub fn end_offset(&self) -> Option<u64> {
        self.offset?.checked_add(self.length)
    }

    /// Half-open `[start, end)` span once the offset is known.
    pub fn span(&self) -> Option<[u64; 2]> {
        Some([self.offset?, self.end_offset()?])
    }

    /// Continue from `previous_end` and return the resulting span. A range
    /// ending past the 64-bit limit is dropped with a warning.
    pub fn resolve(&self, previous_end: Option<u64>) -> Option<[u64; 2]> {
        let range = self.with_continuation(previous_end);
        let span = range.span();
        if span.is_none() {
            tracing::warn!(
                "Ignoring byte range {}@{}: end offset overflows",
                range.length,
                range.offset.unwrap_or_default()
            );
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_offset() {
        let br = ByteRange::parse("1000@500").unwrap();
        assert_eq!(br.length, 1000);
        assert_eq!(br.offset, Some(500));
    }

    #[test]
    fn test_parse_without_offset() {
        let br = ByteRange::parse("1000").unwrap();
        assert_eq!(br.length, 1000);
        assert_eq!(br.offset, None);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(ByteRange::parse("abc"), Err(Error::InvalidByteRange(_))));
        assert!(ByteRange::parse("10@x").is_err());
    }

    #[test]
    fn test_continuation() {
        let first = ByteRange::parse("140060@803136").unwrap();
        assert_eq!(first.span(), Some([803136, 943196]));

        let second = ByteRange::parse("96256").unwrap().with_continuation(first.end_offset());
        assert_eq!(second.span(), Some([943196, 1039452]));

        let fresh = ByteRange::parse("96256").unwrap().with_continuation(None);
        assert_eq!(fresh.span(), Some([0, 96256]));
    }

    #[test]
    fn test_end_past_u64_limit() {
        let range = ByteRange::parse("18446744073709551615@10").unwrap();
        assert_eq!(range.end_offset(), None);
        assert_eq!(range.span(), None);
        assert_eq!(range.resolve(None), None);

        let tail = ByteRange::parse("10").unwrap();
        assert_eq!(tail.resolve(Some(u64::MAX - 10)), Some([u64::MAX - 10, u64::MAX]));
        assert_eq!(tail.resolve(Some(u64::MAX)), None);
    }
}
