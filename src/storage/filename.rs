//! Client filename sanitization
//!
//! Reduces an arbitrary client-supplied filename to a base name that is safe to
//! join with the storage directory. Pure function, no I/O.

use unicode_normalization::UnicodeNormalization;

/// Longest name most filesystems accept for a single path component
const MAX_NAME_LEN: usize = 255;

/// Device names Windows treats specially regardless of extension
const WINDOWS_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a client-supplied filename
///
/// Directory components are flattened into the name, whitespace runs become `_`,
/// and everything outside `[A-Za-z0-9_.-]` is dropped. The result never contains
/// a path separator, never starts with `.` and is never `.` or `..`.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    // NFKD splits accented letters into base letter + combining mark; the mark is then dropped
    let ascii: String = raw.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let mut name = trim_edges(&kept).to_string();
    if name.is_empty() {
        return None;
    }

    if is_windows_device_name(&name) {
        name.insert(0, '_');
    }

    if name.len() > MAX_NAME_LEN {
        // ASCII only at this point, so any byte index is a char boundary
        name.truncate(MAX_NAME_LEN);
        name = name.trim_end_matches(['.', '_']).to_string();
    }

    Some(name)
}

fn trim_edges(name: &str) -> &str {
    name.trim_matches(['.', '_'])
}

fn is_windows_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unchanged() {
        assert_eq!(sanitize_filename("report.txt").as_deref(), Some("report.txt"));
        assert_eq!(sanitize_filename("archive-2024_v2.tar.gz").as_deref(), Some("archive-2024_v2.tar.gz"));
    }

    #[test]
    fn test_path_traversal_flattened() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("etc_passwd"));
        assert_eq!(sanitize_filename("/etc/shadow").as_deref(), Some("etc_shadow"));
        assert_eq!(
            sanitize_filename("..\\..\\windows\\system32\\cmd.exe").as_deref(),
            Some("windows_system32_cmd.exe")
        );
    }

    #[test]
    fn test_result_has_no_separators() {
        for raw in ["a/b/c", "a\\b", "./x", "../", "..\\..\\..", "dir/../../up.txt"] {
            if let Some(name) = sanitize_filename(raw) {
                assert!(!name.contains('/'), "{raw} -> {name}");
                assert!(!name.contains('\\'), "{raw} -> {name}");
                assert!(!name.starts_with('.'), "{raw} -> {name}");
            }
        }
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(sanitize_filename("my  cool\tfile.txt").as_deref(), Some("my_cool_file.txt"));
        assert_eq!(sanitize_filename("  padded.txt  ").as_deref(), Some("padded.txt"));
    }

    #[test]
    fn test_unsafe_characters_dropped() {
        assert_eq!(sanitize_filename("a<b>c:d\"e|f?g*.txt").as_deref(), Some("abcdefg.txt"));
        assert_eq!(sanitize_filename("nul\0byte.bin").as_deref(), Some("nulbyte.bin"));
    }

    #[test]
    fn test_unicode_folded_to_ascii() {
        assert_eq!(sanitize_filename("café.txt").as_deref(), Some("cafe.txt"));
        assert_eq!(sanitize_filename("文件.txt").as_deref(), Some("txt"));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("../.."), None);
        assert_eq!(sanitize_filename("___"), None);
        assert_eq!(sanitize_filename("文件"), None);
    }

    #[test]
    fn test_hidden_prefix_stripped() {
        assert_eq!(sanitize_filename(".bashrc").as_deref(), Some("bashrc"));
        assert_eq!(sanitize_filename(".upload-1-1.part").as_deref(), Some("upload-1-1.part"));
    }

    #[test]
    fn test_windows_device_names_prefixed() {
        assert_eq!(sanitize_filename("CON").as_deref(), Some("_CON"));
        assert_eq!(sanitize_filename("nul.txt").as_deref(), Some("_nul.txt"));
        assert_eq!(sanitize_filename("com1.tar.gz").as_deref(), Some("_com1.tar.gz"));
        assert_eq!(sanitize_filename("console.txt").as_deref(), Some("console.txt"));
    }

    #[test]
    fn test_long_names_truncated() {
        let raw = format!("{}.txt", "a".repeat(400));
        let name = sanitize_filename(&raw).unwrap();
        assert_eq!(name.len(), MAX_NAME_LEN);

        let raw = format!("{}.{}", "b".repeat(254), "c".repeat(10));
        let name = sanitize_filename(&raw).unwrap();
        assert!(!name.ends_with('.'));
        assert!(name.len() <= MAX_NAME_LEN);
    }
}
