pub fn trim_ascii_whitespace(b: &[u8]) -> Option<&[u8]> {
    let start = b.iter().position(|&c| !c.is_ascii_whitespace())?;
    let end = b.iter().rposition(|&c| !c.is_ascii_whitespace())?;
    Some(&b[start..=end])
}

/// Everything after the last occurrence of `delim`, or `None` if `delim` does not occur.
pub fn after_last(b: &[u8], delim: u8) -> Option<&[u8]> {
    memchr::memrchr(delim, b).map(|i| &b[i + 1..])
}

/// Split around the first occurrence of `delim`.
pub fn split_once(b: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
    memchr::memchr(delim, b).map(|i| (&b[..i], &b[i + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim() {
        assert_eq!(trim_ascii_whitespace(b"  @x 1:N \r\n"), Some(&b"@x 1:N"[..]));
        assert_eq!(trim_ascii_whitespace(b" \t\n"), None);
    }

    #[test]
    fn test_split() {
        assert_eq!(after_last(b"a b c", b' '), Some(&b"c"[..]));
        assert_eq!(after_last(b"abc", b' '), None);
        assert_eq!(split_once(b"AC+GT+T", b'+'), Some((&b"AC"[..], &b"GT+T"[..])));
    }
}
