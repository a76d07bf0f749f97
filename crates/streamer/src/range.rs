//! HTTP `Range` header resolution against a known content length

use crate::Error;

/// Inclusive byte span within content of a known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the span
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Resolve a raw `Range` header value against the total content length.
///
/// Returns `Ok(None)` when no header is present (serve the whole content).
/// Of a `bytes=a-b[,c-d,...]` header only the first satisfiable clause is
/// used; the rest are ignored. Open-ended `a-` runs to the last byte and
/// `-b` selects the trailing `b` bytes.
///
/// Clamping policy: `end` is clamped to `length - 1`; a clause with
/// `start >= length`, or `start > end` after clamping, is unsatisfiable
/// and skipped. A header with no satisfiable clause fails with
/// [`Error::MalformedRange`], which callers degrade to "no usable range"
/// rather than rejecting the request.
pub fn resolve(length: u64, header: Option<&str>) -> Result<Option<ByteRange>, Error> {
    let header = match header {
        Some(h) => h,
        None => return Ok(None),
    };

    let clauses = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| Error::MalformedRange(header.to_string()))?;

    for clause in clauses.split(',') {
        if let Some(range) = resolve_clause(length, clause.trim()) {
            return Ok(Some(range));
        }
    }

    Err(Error::MalformedRange(header.to_string()))
}

fn resolve_clause(length: u64, clause: &str) -> Option<ByteRange> {
    let (start_str, end_str) = clause.split_once('-')?;
    let start_str = start_str.trim();
    let end_str = end_str.trim();

    if start_str.is_empty() {
        // Suffix form: the last `end_str` bytes.
        let suffix: u64 = end_str.parse().ok()?;
        if suffix == 0 || length == 0 {
            return None;
        }
        return Some(ByteRange {
            start: length.saturating_sub(suffix),
            end: length - 1,
        });
    }

    let start: u64 = start_str.parse().ok()?;
    if start >= length {
        return None;
    }

    let end = if end_str.is_empty() {
        length - 1
    } else {
        end_str.parse::<u64>().ok()?.min(length - 1)
    };

    if start > end {
        return None;
    }

    Some(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header() {
        assert_eq!(resolve(1000, None).unwrap(), None);
    }

    #[test]
    fn test_closed_range() {
        let range = resolve(1000, Some("bytes=0-499")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 499 });
        assert_eq!(range.byte_len(), 500);
    }

    #[test]
    fn test_open_ended_range() {
        let range = resolve(1000, Some("bytes=500-")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
    }

    #[test]
    fn test_suffix_range() {
        let range = resolve(1000, Some("bytes=-500")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
    }

    #[test]
    fn test_suffix_longer_than_content() {
        let range = resolve(1000, Some("bytes=-5000")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 999 });
    }

    #[test]
    fn test_zero_length_suffix_rejected() {
        assert!(resolve(1000, Some("bytes=-0")).is_err());
    }

    #[test]
    fn test_end_clamped_to_length() {
        let range = resolve(1000, Some("bytes=900-9999")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 900, end: 999 });
    }

    #[test]
    fn test_start_past_end_rejected() {
        assert!(resolve(1000, Some("bytes=500-100")).is_err());
    }

    #[test]
    fn test_start_past_length_rejected() {
        assert!(resolve(1000, Some("bytes=1000-")).is_err());
        assert!(resolve(1000, Some("bytes=5000-6000")).is_err());
    }

    #[test]
    fn test_multi_range_uses_first_clause() {
        let range = resolve(1000, Some("bytes=0-0,500-999")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 0 });
    }

    #[test]
    fn test_multi_range_skips_unsatisfiable_clause() {
        let range = resolve(1000, Some("bytes=9-5,100-199")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 100, end: 199 });
    }

    #[test]
    fn test_missing_unit_prefix() {
        assert!(resolve(1000, Some("chunks=0-5")).is_err());
    }

    #[test]
    fn test_garbage_bounds() {
        assert!(resolve(1000, Some("bytes=abc-5")).is_err());
        assert!(resolve(1000, Some("bytes=0-xyz")).is_err());
        assert!(resolve(1000, Some("bytes=oops")).is_err());
    }

    #[test]
    fn test_zero_length_content() {
        assert!(resolve(0, Some("bytes=0-")).is_err());
        assert!(resolve(0, Some("bytes=-10")).is_err());
        assert_eq!(resolve(0, None).unwrap(), None);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let range = resolve(1000, Some(" bytes=0-9 ")).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 9 });
    }
}
