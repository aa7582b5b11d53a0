//! `Range` header parsing.

/// An inclusive byte window within a file, `0 <= from <= to <= size - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first byte served.
    pub from: u64,
    /// Offset of the last byte served.
    pub to: u64,
}

impl ByteRange {
    /// Number of bytes the window covers. Never zero.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// A `Range` header that is malformed or cannot be satisfied by the file.
/// Both cases answer 416.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeError;

/// Parse a `Range` header against the size of the file being served.
///
/// The accepted shape is `bytes=<from>?-<to>?`. Only the leading range spec
/// is honored; anything after it, such as further comma-separated ranges, is
/// ignored. `bytes=<from>-` runs to the end of the file and `bytes=-<n>`
/// addresses the final `n` bytes.
///
/// Fails when the header doesn't match the shape, when both bounds are
/// absent, when a bound overflows, or when the resolved window isn't fully
/// inside the file. An out-of-bounds end is a failure, not something to
/// clamp. No window fits an empty file.
pub fn parse_range(header: &str, size: u64) -> Result<ByteRange, RangeError> {
    let spec = header.strip_prefix("bytes=").ok_or(RangeError)?;
    let (from_digits, rest) = split_leading_digits(spec);
    let rest = rest.strip_prefix('-').ok_or(RangeError)?;
    let (to_digits, _ignored) = split_leading_digits(rest);

    let from = parse_bound(from_digits)?;
    let to = parse_bound(to_digits)?;
    let last = size.checked_sub(1).ok_or(RangeError)?;

    let (from, to) = match (from, to) {
        (None, None) => return Err(RangeError),
        (None, Some(suffix)) => (size.checked_sub(suffix).ok_or(RangeError)?, last),
        (Some(from), None) => (from, last),
        (Some(from), Some(to)) => (from, to),
    };

    if to > last || from > to {
        return Err(RangeError);
    }
    Ok(ByteRange { from, to })
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

fn parse_bound(digits: &str) -> Result<Option<u64>, RangeError> {
    if digits.is_empty() {
        return Ok(None);
    }
    digits.parse().map(Some).map_err(|_| RangeError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_range() {
        assert_eq!(parse_range("bytes=0-499", 1000), Ok(ByteRange { from: 0, to: 499 }));
        assert_eq!(parse_range("bytes=500-999", 1000), Ok(ByteRange { from: 500, to: 999 }));
        assert_eq!(parse_range("bytes=42-42", 1000), Ok(ByteRange { from: 42, to: 42 }));
    }

    #[test]
    fn open_ended_range_runs_to_eof() {
        assert_eq!(parse_range("bytes=990-", 1000), Ok(ByteRange { from: 990, to: 999 }));
        assert_eq!(parse_range("bytes=0-", 1000), Ok(ByteRange { from: 0, to: 999 }));
    }

    #[test]
    fn suffix_range_addresses_the_tail() {
        assert_eq!(parse_range("bytes=-200", 1000), Ok(ByteRange { from: 800, to: 999 }));
        assert_eq!(parse_range("bytes=-1000", 1000), Ok(ByteRange { from: 0, to: 999 }));
        // Longer than the file, or no bytes at all.
        assert_eq!(parse_range("bytes=-1001", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes=-0", 1000), Err(RangeError));
    }

    #[test]
    fn out_of_bounds_end_is_rejected_not_clamped() {
        assert_eq!(parse_range("bytes=0-999999", 100), Err(RangeError));
        assert_eq!(parse_range("bytes=0-100", 100), Err(RangeError));
        assert_eq!(parse_range("bytes=0-99", 100), Ok(ByteRange { from: 0, to: 99 }));
    }

    #[test]
    fn inverted_and_empty_ranges_are_rejected() {
        assert_eq!(parse_range("bytes=500-200", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes=-", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes=1000-", 1000), Err(RangeError));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(parse_range("bites=0-5", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes=abc", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes= 0-5", 1000), Err(RangeError));
        assert_eq!(parse_range("bytes=12x-34", 1000), Err(RangeError));
        assert_eq!(parse_range("", 1000), Err(RangeError));
        // Bounds beyond u64 don't wrap.
        assert_eq!(parse_range("bytes=99999999999999999999-", 1000), Err(RangeError));
    }

    #[test]
    fn only_the_leading_spec_counts() {
        assert_eq!(parse_range("bytes=0-5,10-12", 1000), Ok(ByteRange { from: 0, to: 5 }));
        assert_eq!(parse_range("bytes=7-9junk", 1000), Ok(ByteRange { from: 7, to: 9 }));
    }

    #[test]
    fn empty_files_satisfy_nothing() {
        assert_eq!(parse_range("bytes=0-0", 0), Err(RangeError));
        assert_eq!(parse_range("bytes=0-", 0), Err(RangeError));
        assert_eq!(parse_range("bytes=-1", 0), Err(RangeError));
    }

    #[test]
    fn window_length() {
        assert_eq!(ByteRange { from: 0, to: 0 }.len(), 1);
        assert_eq!(ByteRange { from: 3, to: 9 }.len(), 7);
    }
}
