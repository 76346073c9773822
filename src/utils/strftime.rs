//! `strftime`-style expansion of destination-path templates.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

const SHORT_DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const LONG_DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Expand `fmt` with `t`. Unknown `%X` conversions and a trailing lone
/// `%` are emitted verbatim; a template without `%` is the identity.
pub fn format(fmt: &str, t: &DateTime<FixedOffset>) -> String {
    let mut out = String::with_capacity(fmt.len() * 2);
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('%'),
            Some(spec) => push_conversion(&mut out, spec, t),
        }
    }
    out
}

fn push_conversion(out: &mut String, spec: char, t: &DateTime<FixedOffset>) {
    match spec {
        '%' => out.push('%'),
        'Y' => out.push_str(&format!("{:04}", t.year())),
        'y' => out.push_str(&format!("{:02}", t.year().rem_euclid(100))),
        'm' => out.push_str(&format!("{:02}", t.month())),
        'd' => out.push_str(&format!("{:02}", t.day())),
        'e' => out.push_str(&format!("{:>2}", t.day())),
        'H' => out.push_str(&format!("{:02}", t.hour())),
        'k' => out.push_str(&t.hour().to_string()),
        'I' => out.push_str(&format!("{:02}", t.hour12().1)),
        'l' => out.push_str(&t.hour12().1.to_string()),
        'M' => out.push_str(&format!("{:02}", t.minute())),
        'S' => out.push_str(&format!("{:02}", t.second())),
        'p' => out.push_str(if t.hour12().0 { "PM" } else { "AM" }),
        'P' => out.push_str(if t.hour12().0 { "pm" } else { "am" }),
        'a' => out.push_str(SHORT_DAYS[t.weekday().num_days_from_monday() as usize]),
        'A' => out.push_str(LONG_DAYS[t.weekday().num_days_from_monday() as usize]),
        'b' | 'h' => out.push_str(SHORT_MONTHS[t.month0() as usize]),
        'B' => out.push_str(LONG_MONTHS[t.month0() as usize]),
        'f' => out.push_str(&format!("{:06}", t.nanosecond() / 1_000)),
        'L' => out.push_str(&format!("{:03}", t.nanosecond() / 1_000_000)),
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'z' => {
            let secs = t.offset().local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let abs = secs.abs();
            out.push_str(&format!("{sign}{:02}{:02}", abs / 3600, abs % 3600 / 60));
        }
        'Z' => push_zone_name(out, t),
        // composite forms
        'c' => out.push_str(&format("%a %b %e %H:%M:%S %Y", t)),
        'D' | 'x' => out.push_str(&format("%m/%d/%y", t)),
        'F' => out.push_str(&format("%Y-%m-%d", t)),
        'R' => out.push_str(&format("%H:%M", t)),
        'T' | 'X' => out.push_str(&format("%H:%M:%S", t)),
        'r' => out.push_str(&format("%I:%M:%S %p", t)),
        other => {
            out.push('%');
            out.push(other);
        }
    }
}

/// A fixed offset carries no zone name: `UTC` at zero, numeric otherwise.
fn push_zone_name(out: &mut String, t: &DateTime<FixedOffset>) {
    let secs = t.offset().local_minus_utc();
    if secs == 0 {
        out.push_str("UTC");
        return;
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    let (hh, mm) = (abs / 3600, abs % 3600 / 60);
    if mm == 0 {
        out.push_str(&format!("{sign}{hh:02}"));
    } else {
        out.push_str(&format!("{sign}{hh:02}{mm:02}"));
    }
}
