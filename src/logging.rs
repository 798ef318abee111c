//! Line-oriented logging with timestamps, source locations, and ANSI colour.
//!
//! The [`tlog!`] macro writes lines in the format:
//!
//! ```text
//! 20261019T21:33:12.000 - src/web/handlers/links.rs:42 - links: created l-1a2b3c4
//! ```
//!
//! On a terminal the timestamp and location are dimmed and user/link ids
//! get a stable colour derived from their content. Output goes to stderr
//! unless [`set_writer`] installs another destination; a custom writer
//! turns colour off.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};

static COLOUR_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_WRITER: LazyLock<Mutex<Box<dyn Write + Send>>> =
    LazyLock::new(|| Mutex::new(Box::new(io::stderr())));

/// Detect colour support on stderr. Call once at startup.
pub fn init() {
    COLOUR_ENABLED.store(io::stderr().is_terminal(), Ordering::Relaxed);
}

/// Send all subsequent [`tlog!`] output to `w` and disable colour.
pub fn set_writer(w: Box<dyn Write + Send>) {
    COLOUR_ENABLED.store(false, Ordering::Relaxed);
    if let Ok(mut writer) = LOG_WRITER.lock() {
        *writer = w;
    }
}

pub fn colour_enabled() -> bool {
    COLOUR_ENABLED.load(Ordering::Relaxed)
}

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

const ID_COLOURS: &[&str] = &[
    "\x1b[91m", "\x1b[92m", "\x1b[93m", "\x1b[94m", "\x1b[95m", "\x1b[96m",
];

fn hash_colour(id: &str) -> &'static str {
    let hash = id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    ID_COLOURS[(hash as usize) % ID_COLOURS.len()]
}

const LOG_ID_TRUNCATE_LEN: usize = 7;

fn short_id(prefix: char, id: &str) -> String {
    let end = id
        .char_indices()
        .nth(LOG_ID_TRUNCATE_LEN)
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    let short = &id[..end];
    if colour_enabled() {
        format!("{}{prefix}-{short}{RESET}", hash_colour(id))
    } else {
        format!("{prefix}-{short}")
    }
}

/// Format a user (profile) id, e.g. `u-9f8e7d6`.
pub fn user_id(id: &str) -> String {
    short_id('u', id)
}

/// Format a link id, e.g. `l-1a2b3c4`.
pub fn link_id(id: &str) -> String {
    short_id('l', id)
}

/// Current local wall-clock time as `YYYYMMDDTHH:MM:SS.mmm`.
pub fn format_timestamp() -> String {
    chrono::Local::now().format("%Y%m%dT%H:%M:%S%.3f").to_string()
}

/// Write one log line. Called by [`tlog!`].
pub fn emit(file: &str, line: u32, msg: &str) {
    let ts = format_timestamp();
    let formatted = if colour_enabled() {
        format!("{DIM}{ts}{RESET} {DIM}{file}:{line}{RESET} {msg}")
    } else {
        format!("{ts} - {file}:{line} - {msg}")
    };
    if let Ok(mut writer) = LOG_WRITER.lock() {
        let _ = writeln!(*writer, "{formatted}");
    }
}

/// Emit a log line with timestamp and source location.
///
/// ```ignore
/// tlog!("links: created {} for {}", logging::link_id(&id), logging::user_id(&owner));
/// ```
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {{
        $crate::logging::emit(file!(), line!(), &format!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_truncated_and_prefixed() {
        assert_eq!(user_id("9f8e7d6c5b4a"), "u-9f8e7d6");
        assert_eq!(link_id("abc"), "l-abc");
    }

    #[test]
    fn timestamp_has_compact_iso_shape() {
        let ts = format_timestamp();
        assert_eq!(ts.len(), "20261019T21:33:12.000".len());
        assert_eq!(&ts[8..9], "T");
    }
}
