/// Number of leading bytes needed before a stream can be classified.
pub const SIGNATURE_LEN: usize = 3;

/// Returns `true` when `prefix` starts with the gzip header magic followed by
/// the deflate method byte (`1f 8b 08`).
///
/// Anything shorter than [`SIGNATURE_LEN`] is not gzip.
pub fn looks_like_gzip(prefix: &[u8]) -> bool {
    prefix.len() >= SIGNATURE_LEN && infer::archive::is_gz(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x1f, 0x8b, 0x08], true)]
    #[case(&[0x1f, 0x8b, 0x08, 0x00, 0x00], true)]
    #[case(&[0x1f, 0x8b], false)]
    #[case(&[0x1f, 0x8b, 0x07], false)]
    #[case(&[0x42, 0x5a, 0x68], false)]
    #[case(b"123", false)]
    #[case(b"", false)]
    fn test_looks_like_gzip(#[case] prefix: &[u8], #[case] expected: bool) {
        assert_eq!(looks_like_gzip(prefix), expected);
    }
}
