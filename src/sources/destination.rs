//! Recovers the produced file name from yt-dlp's progress output.
//!
//! yt-dlp reports every file it writes with a `Destination:` line, e.g.
//!
//! ```text
//! [download] Destination: downloads/abc123.webm
//! [ExtractAudio] Destination: downloads/abc123.mp3
//! ```
//!
//! Post-processors print after the download step, so the last line names the
//! file that is left on disk.

use regex::Regex;
use std::{path::Path, sync::LazyLock};

static DESTINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Destination:\s*(\S.*?)\s*$").expect("valid regex"));

/// Base name of the last `Destination:` path in `stdout`, if any.
pub fn parse_output_filename(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter_map(|line| DESTINATION.captures(line))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| {
            Path::new(m.as_str())
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .last()
}
