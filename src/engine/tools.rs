//! Path and template helpers shared by the import pipeline.

use std::collections::HashSet;
use std::path::Path;

use anyhow::bail;

use crate::utils::config::RESERVED_DIRS;
use crate::Result;

/// Normalize a relative path for catalog storage: forward slashes only.
/// Makes the catalog portable across Windows/Unix.
pub fn path_to_catalog_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically clean a relative slash path: drop `.` and empty segments,
/// resolve `..` against earlier segments where possible.
pub fn clean_relative(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(&"..")) || out.is_empty() {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            _ => out.push(seg),
        }
    }
    if out.is_empty() {
        ".".to_string()
    } else {
        out.join("/")
    }
}

/// Validate and clean a destination-path template: relative, last segment
/// a file-name prefix, and never resolving under the reserved top-level
/// directories. Returns the cleaned slash-form template.
pub fn validate_template(format: &str) -> Result<String> {
    if format.is_empty() {
        bail!("format must not be empty");
    }
    let normalized = format.replace('\\', "/");
    if normalized.starts_with('/') {
        bail!("format {:?} must be relative path", format);
    }
    if normalized.ends_with('/') {
        bail!("format {:?} must be file name prefix", format);
    }
    let cleaned = clean_relative(&normalized);
    let lower = cleaned.to_lowercase();
    for dir in RESERVED_DIRS {
        if lower == dir || lower.starts_with(&format!("{dir}/")) {
            bail!("format {:?} must be different than {:?} directory", format, dir);
        }
    }
    Ok(cleaned)
}

/// Split a slash path into (directory, file name); no separator yields
/// `"."` as the directory.
pub fn split_dir_base(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((dir, base)) => (dir.to_string(), base.to_string()),
        None => (".".to_string(), path.to_string()),
    }
}

/// Upper-cased extension without the dot; empty when there is none.
pub fn upper_ext(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Upper-cased file stem (basename without the extension).
pub fn upper_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Upper-case hex encoding.
pub fn hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Parse a comma-separated extension allow-list: upper-cased, no dots,
/// blanks dropped. An empty result disables filtering.
pub fn parse_ext_list(list: &str) -> HashSet<String> {
    list.to_uppercase()
        .split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(String::from)
        .collect()
}
