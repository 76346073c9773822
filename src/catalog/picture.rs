use chrono::{DateTime, FixedOffset};

/// A catalogued picture. Content identity is the composite fingerprint
/// `(sum_md5, sum_sha256, size)`; `path` is relative to the work
/// directory and stored with `/` separators on every host OS.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Picture {
    /// MD5 digest, 32 upper-case hex characters.
    pub sum_md5: String,
    /// SHA-256 digest, 64 upper-case hex characters.
    pub sum_sha256: String,
    /// Content length in bytes.
    pub size: u64,
    /// Destination path relative to the work directory (≤ 4096 chars).
    pub path: String,
    /// Capture timestamp from the picture metadata, when known.
    pub taken_at: Option<DateTime<FixedOffset>>,
}

impl Picture {
    /// True when `other` describes the same content: case-insensitive hex
    /// compare of both digests and an exact size match.
    pub fn is_same(&self, other: &Picture) -> bool {
        self.sum_md5.eq_ignore_ascii_case(&other.sum_md5)
            && self.sum_sha256.eq_ignore_ascii_case(&other.sum_sha256)
            && self.size == other.size
    }
}
