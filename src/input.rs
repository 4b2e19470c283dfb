//! Reading download requests from a tasks file.
//!
//! `.json` files hold an array of requests. Anything else is one entry per
//! line, `url` or `url|filename`; blank lines and `#` comments are skipped.

use std::path::Path;

use crate::error::InputError;
use crate::format::get_filename_from_url;
use crate::models::DownloadRequest;

pub fn parse_tasks(path: &Path, content: &str) -> Result<Vec<DownloadRequest>, InputError> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        return Ok(serde_json::from_str(content)?);
    }
    parse_lines(content)
}

pub fn parse_lines(content: &str) -> Result<Vec<DownloadRequest>, InputError> {
    let mut requests = Vec::new();
    for line in content.lines() {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let mut parts = raw.splitn(2, '|');
        let url = parts.next().unwrap_or_default().trim();
        if url.is_empty() {
            continue;
        }
        let filename = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        requests.push(request_for(url, filename)?);
    }
    Ok(requests)
}

pub fn request_for(url: &str, filename: Option<String>) -> Result<DownloadRequest, InputError> {
    let filename = match filename {
        Some(name) => name,
        None => get_filename_from_url(url)?,
    };
    Ok(DownloadRequest::new(url, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_with_and_without_filenames() {
        let content = "\
# weekly reports
https://example.com/files/a.pdf

https://example.com/files/b?id=3 | b-report.pdf
";
        let reqs = parse_lines(content).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].filename, "a.pdf");
        assert_eq!(reqs[1].url, "https://example.com/files/b?id=3");
        assert_eq!(reqs[1].filename, "b-report.pdf");
    }

    #[test]
    fn invalid_url_without_filename_is_an_error() {
        assert!(parse_lines("not-a-url\n").is_err());
        // With an explicit filename nothing needs parsing.
        assert_eq!(parse_lines("not-a-url|x.bin").unwrap()[0].filename, "x.bin");
    }

    #[test]
    fn json_tasks_keep_headers_and_sizes() {
        let content = r#"[
            {"url": "https://example.com/a", "filename": "a.bin", "size": 12},
            {"url": "https://example.com/b", "filename": "b.bin", "headers": {"Authorization": "Bearer x"}}
        ]"#;
        let reqs = parse_tasks(Path::new("tasks.JSON"), content).unwrap();
        assert_eq!(reqs[0].size, Some(12));
        assert!(reqs[1].headers.as_ref().unwrap().contains_key("Authorization"));
    }
}
