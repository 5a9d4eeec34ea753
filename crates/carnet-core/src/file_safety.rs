//! Filename hygiene for uploaded assets.
//!
//! Client-supplied filenames end up on the server filesystem, so path
//! components and characters that are unsafe on common filesystems are
//! stripped before the name is used.

/// Longest filename we will write to disk.
const MAX_FILENAME_LEN: usize = 255;

/// Sanitize a client-supplied filename for safe storage.
///
/// Strips any path prefix (both `/` and `\` separators), replaces
/// control characters and `<>:"|?*` with underscores, and truncates to
/// [`MAX_FILENAME_LEN`] bytes while preserving the extension. An empty
/// result becomes `unnamed_file`.
pub fn sanitize_filename(filename: &str) -> String {
    // Keep only the last path component
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    if sanitized.len() > MAX_FILENAME_LEN {
        // Truncate but keep the extension, unless the extension alone
        // already exceeds the cap
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < MAX_FILENAME_LEN {
                let cut = floor_char_boundary(sanitized, MAX_FILENAME_LEN - ext.len());
                return format!("{}{}", &sanitized[..cut], ext);
            }
        }
        let cut = floor_char_boundary(sanitized, MAX_FILENAME_LEN);
        return sanitized[..cut].to_string();
    }

    sanitized.to_string()
}

/// Largest char boundary at or below `at`. Truncating on a byte count
/// must not split a multibyte character.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut cut = at.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_path() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(
            sanitize_filename("C:\\Windows\\system32.dll"),
            "system32.dll"
        );
        assert_eq!(sanitize_filename("../../escape.png"), "escape.png");
    }

    #[test]
    fn test_sanitize_removes_dangerous_chars() {
        assert_eq!(sanitize_filename("file<>:test.txt"), "file___test.txt");
        assert_eq!(sanitize_filename("file|name?.png"), "file_name_.png");
        assert_eq!(sanitize_filename("tab\there.jpg"), "tab_here.jpg");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long_name = format!("{}.png", "a".repeat(300));
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".png"));
    }

    #[test]
    fn test_sanitize_truncates_degenerate_names() {
        // Extension longer than the whole cap: plain truncation
        let dot_monster = format!(".{}", "x".repeat(300));
        assert_eq!(sanitize_filename(&dot_monster).len(), MAX_FILENAME_LEN);

        // Multibyte names must be cut on a char boundary
        let accented = "é".repeat(200);
        let sanitized = sanitize_filename(&accented);
        assert!(sanitized.len() <= MAX_FILENAME_LEN);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_sanitize_handles_empty() {
        assert_eq!(sanitize_filename(""), "unnamed_file");
        assert_eq!(sanitize_filename("   "), "unnamed_file");
        assert_eq!(sanitize_filename("/"), "unnamed_file");
    }

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("sunset (1).jpeg"), "sunset (1).jpeg");
    }
}
