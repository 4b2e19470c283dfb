//! Filename helpers shared by notifications, input parsing and storage.

use url::Url;

use crate::error::InputError;

pub const DEFAULT_TITLE_WIDTH: usize = 40;

pub fn get_filename_from_url(url_str: &str) -> Result<String, InputError> {
    let url = Url::parse(url_str).map_err(|source| InputError::Url {
        url: url_str.to_string(),
        source,
    })?;

    if let Some(segments) = url.path_segments() {
        if let Some(filename) = segments.last() {
            if !filename.is_empty() {
                return Ok(filename.to_string());
            }
        }
    }

    Ok(format!("download_{}", uuid::Uuid::new_v4()))
}

/// Makes a filename safe to use as a single path component.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned = filename.replace(|c: char| c == '/' || c == '\\' || c.is_control(), "_");
    match cleaned.as_str() {
        "" | "." | ".." => "download".to_string(),
        _ => cleaned,
    }
}

/// Splits `report.final.pdf` into (`report.final`, `.pdf`). Dotfiles keep their
/// leading dot in the stem.
pub fn split_file_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

/// `test.pdf`, 2 -> `test (2).pdf`
pub fn numbered_name(filename: &str, n: usize) -> String {
    let (stem, ext) = split_file_name(filename);
    format!("{} ({}){}", stem, n, ext)
}

/// Shortens long names for notification titles, eliding the middle of the stem
/// and keeping the extension visible.
pub fn truncate(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len <= max_len {
        return name.to_string();
    }

    let (stem, ext) = split_file_name(name);
    let keep = max_len.saturating_sub(ext.chars().count() + 3);
    if keep == 0 {
        return name.chars().take(max_len).collect();
    }

    let stem_chars: Vec<char> = stem.chars().collect();
    let head = (keep + 1) / 2;
    let tail = keep / 2;
    let start: String = stem_chars[..head].iter().collect();
    let end: String = stem_chars[stem_chars.len() - tail..].iter().collect();

    format!("{}...{}{}", start, end, ext)
}
