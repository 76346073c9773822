//! Metadata extraction via the external `exiftool` process.
//!
//! The tool is invoked as `exiftool -s2 <path>`, which writes one
//! `Name: Value` pair per line. Parsing and the timestamp derivation are
//! factored out so they can be exercised without the binary.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

use crate::utils::cancel::{CancelToken, Canceled};

/// Extractor failure taxonomy. `InvalidFormat`, `DuplicateTag` and
/// `DateTimeNotFound` are soft per-file conditions for the importer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid format")]
    InvalidFormat,
    #[error("duplicate tag {0:?}")]
    DuplicateTag(String),
    #[error("datetime not found")]
    DateTimeNotFound,
    #[error("timezone not found")]
    TimeZoneNotFound,
    #[error("exiftool: {0}")]
    Tool(String),
    #[error("operation canceled")]
    Canceled(#[from] Canceled),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Tags tried for the capture timestamp, in order of preference.
const DATE_TIME_TAGS: [&str; 4] = [
    "SubSecDateTimeOriginal",
    "SubSecCreateDate",
    "DateTimeOriginal",
    "CreateDate",
];

/// exiftool timestamp layout, e.g. `2021:06:15 13:45:10`.
const DATE_TIME_LAYOUT: &str = "%Y:%m:%d %H:%M:%S";

/// Parsed tag map: case-sensitive keys, single-valued.
#[derive(Clone, Debug, Default)]
pub struct Tags(HashMap<String, String>);

impl Tags {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Location derived from the `TimeZone` tag (`±HH:MM`).
    pub fn time_zone(&self) -> Result<FixedOffset, Error> {
        self.get("TimeZone")
            .and_then(parse_offset)
            .ok_or(Error::TimeZoneNotFound)
    }

    /// First parseable capture timestamp in tag-precedence order,
    /// interpreted in the derived timezone, or local time when the
    /// `TimeZone` tag is absent.
    pub fn date_time(&self) -> Result<DateTime<FixedOffset>, Error> {
        let offset = self.time_zone().ok();
        for tag in DATE_TIME_TAGS {
            let Some(value) = self.get(tag) else {
                continue;
            };
            let Ok(naive) = NaiveDateTime::parse_from_str(value, DATE_TIME_LAYOUT) else {
                continue;
            };
            let resolved = match offset {
                Some(off) => off.from_local_datetime(&naive).single(),
                None => Local
                    .from_local_datetime(&naive)
                    .single()
                    .map(|t| t.fixed_offset()),
            };
            if let Some(t) = resolved {
                return Ok(t);
            }
        }
        Err(Error::DateTimeNotFound)
    }
}

/// Run `exiftool -s2 <path>` and parse its output. The child is killed
/// when the token trips while output is being read. A non-zero exit
/// whose output carries an `Error` tag surfaces that message.
pub fn read_tags_from_file(token: &CancelToken, path: &Path) -> Result<Tags, Error> {
    token.check()?;
    let mut child = Command::new("exiftool")
        .arg("-s2")
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let stdout = match child.stdout.take() {
        Some(out) => out,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Tool("stdout pipe unavailable".to_string()));
        }
    };

    let parsed = read_tags_polling(token, &mut BufReader::new(stdout));
    if parsed.is_err() {
        let _ = child.kill();
    }
    let status = child.wait()?;
    let tags = parsed?;

    if !status.success() {
        if let Some(msg) = tags.get("Error") {
            return Err(Error::Tool(msg.to_string()));
        }
        return Err(Error::Tool(format!("exit status {status}")));
    }
    Ok(tags)
}

/// Parse `Name: Value` lines from a reader (no cancellation; see
/// [`read_tags_from_file`] for the process-attached variant).
pub fn read_tags<R: BufRead>(r: &mut R) -> Result<Tags, Error> {
    read_tags_polling(&CancelToken::new(), r)
}

fn read_tags_polling<R: BufRead>(token: &CancelToken, r: &mut R) -> Result<Tags, Error> {
    let mut tags = HashMap::new();
    let mut line = String::new();
    loop {
        token.check()?;
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Ok(Tags(tags));
        }
        parse_tag_line(line.trim_end_matches(['\n', '\r']), &mut tags)?;
    }
}

/// Split at the first `:`; require a space after it and a non-empty name.
/// Trailing whitespace is trimmed from the name, the value is verbatim.
fn parse_tag_line(line: &str, tags: &mut HashMap<String, String>) -> Result<(), Error> {
    let idx = line.find(':').ok_or(Error::InvalidFormat)?;
    if idx + 1 >= line.len() || line.as_bytes()[idx + 1] != b' ' {
        return Err(Error::InvalidFormat);
    }
    let name = line[..idx].trim_end();
    if name.is_empty() {
        return Err(Error::InvalidFormat);
    }
    let value = &line[idx + 2..];
    if tags.contains_key(name) {
        return Err(Error::DuplicateTag(name.to_string()));
    }
    tags.insert(name.to_string(), value.to_string());
    Ok(())
}

/// Parse a `±HH:MM` offset.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let bytes = s.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = s[1..3].parse().ok()?;
    let minutes: i32 = s[4..6].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
