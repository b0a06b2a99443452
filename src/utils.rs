//! Small helpers for logging, file discovery and directory checks.

use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a char boundary) with
/// `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Compile a file-name wildcard into an anchored regex.
///
/// Supports `*`, `?` and character classes (`[abc]`, `[0-9]`, `[!x]`). An
/// unclosed `[` matches itself.
pub fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                let start = i + 1;
                let negated = chars.get(start) == Some(&'!');
                let body_start = if negated { start + 1 } else { start };
                // A `]` right after the opening bracket is a literal member.
                let close = chars
                    .iter()
                    .enumerate()
                    .skip(body_start + 1)
                    .find(|(_, c)| **c == ']')
                    .map(|(j, _)| j);
                match close {
                    Some(end) => {
                        re.push('[');
                        if negated {
                            re.push('^');
                        }
                        for &c in &chars[body_start..end] {
                            if c == '-' {
                                re.push('-');
                            } else {
                                re.push_str(&regex::escape(&c.to_string()));
                            }
                        }
                        re.push(']');
                        i = end;
                    }
                    None => re.push_str(r"\["),
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }
    re.push('$');
    Regex::new(&re)
}

/// Where a user-supplied input file lives.
///
/// An existing path is used as given; otherwise the file name is looked up in `raw_dir`.
pub fn resolve_input_path(path: &Path, raw_dir: &Path) -> PathBuf {
    if path.exists() {
        return path.to_path_buf();
    }
    match path.file_name() {
        Some(name) => raw_dir.join(name),
        None => path.to_path_buf(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
