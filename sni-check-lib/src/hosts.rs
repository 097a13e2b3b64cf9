//! Hostname list loading.
//!
//! Host lists are plain text, one hostname per line. Blank lines and lines
//! starting with '#' are skipped. Order and duplicates are preserved.

use crate::error::SniCheckError;
use std::fs;
use std::path::Path;

/// Parse a newline-delimited hostname list.
///
/// # Arguments
///
/// * `text` - Raw file contents
///
/// # Returns
///
/// Trimmed hostnames in file order.
pub fn parse_host_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read and parse a hostname list from disk.
///
/// # Errors
///
/// Returns `SniCheckError::FileError` if the file is missing or unreadable.
/// An empty result is not an error here; the orchestrator decides that.
pub fn load_host_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SniCheckError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SniCheckError::file_error(
            path.to_string_lossy(),
            "Hostname list not found",
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        SniCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to read hostname list: {}", e),
        )
    })?;

    Ok(parse_host_list(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let hosts = parse_host_list("a.com\n#comment\n\nb.com\n");
        assert_eq!(hosts, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_lines_are_trimmed() {
        let hosts = parse_host_list("  a.com  \r\n\t# indented comment\n   \nb.com\t");
        assert_eq!(hosts, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let hosts = parse_host_list("z.com\na.com\nz.com");
        assert_eq!(hosts, vec!["z.com", "a.com", "z.com"]);
    }

    #[test]
    fn test_only_comments_gives_empty_list() {
        assert!(parse_host_list("# one\n# two\n\n").is_empty());
    }

    #[test]
    fn test_load_host_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"# candidates\nwww.example.com\n\ncdn.example.net\n")
            .unwrap();
        file.flush().unwrap();

        let hosts = load_host_file(file.path()).unwrap();
        assert_eq!(hosts, vec!["www.example.com", "cdn.example.net"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_host_file("/definitely/not/here/sni.txt").unwrap_err();
        assert!(matches!(err, SniCheckError::FileError { .. }));
    }
}
