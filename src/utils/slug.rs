//! URL slugification.
//!
//! Converts titles, section names and term paths to URL-safe text according
//! to `[build.slug].mode`.

use crate::config::SlugMode;

/// Characters forbidden in file paths and fragments
const FORBIDDEN_CHARS: &[char] = &[
    '<', '>', ':', '|', '?', '*', '#', '\\', '/', '(', ')', '[', ']', '"', '\'', '\t', '\r', '\n',
];

// ============================================================================
// Slugification
// ============================================================================

/// Convert one piece of text (a title, a term name) to a slug.
pub fn slugify(text: &str, mode: SlugMode) -> String {
    match mode {
        SlugMode::On => ascii_slug(text),
        SlugMode::Safe => sanitize_text(text).to_lowercase(),
        SlugMode::No => text.trim().to_owned(),
    }
}

/// Slugify every `/`-separated segment of a path, dropping empty segments.
pub fn slugify_path(path: &str, mode: SlugMode) -> String {
    path.split('/')
        .map(|segment| slugify(segment, mode))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Transliterate to ASCII, lowercase, and collapse non-alphanumeric runs to `-`.
fn ascii_slug(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut out = String::with_capacity(ascii.len());
    let mut dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }

    if out.ends_with('-') {
        out.pop();
    }
    out
}

/// Remove forbidden characters and replace whitespace with underscores
fn sanitize_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_removes_forbidden_chars() {
        assert_eq!(sanitize_text("Hello<World>"), "HelloWorld");
        assert_eq!(sanitize_text("a<b>c:d|e?f*g#h\\i(j)k[l]m/n"), "abcdefghijklmn");
    }

    #[test]
    fn test_sanitize_text_replaces_whitespace() {
        assert_eq!(sanitize_text("  Hello World  "), "Hello_World");
    }

    #[test]
    fn test_sanitize_text_mixed_content() {
        assert_eq!(sanitize_text("My Article (2024) - Part #1"), "My_Article_2024_-_Part_1");
    }

    #[test]
    fn test_safe_mode_keeps_unicode() {
        assert_eq!(slugify("你好 World", SlugMode::Safe), "你好_world");
    }

    #[test]
    fn test_on_mode_transliterates() {
        assert_eq!(slugify("Hello, World!", SlugMode::On), "hello-world");
        assert_eq!(slugify("Ünïcödé  Tïtle", SlugMode::On), "unicode-title");
        assert_eq!(slugify("--a--b--", SlugMode::On), "a-b");
        assert_eq!(slugify("!!!", SlugMode::On), "");
    }

    #[test]
    fn test_no_mode_preserves_text() {
        assert_eq!(slugify("  Keep Me  ", SlugMode::No), "Keep Me");
    }

    #[test]
    fn test_slugify_path_per_segment() {
        assert_eq!(slugify_path("Linux/Emacs Tips", SlugMode::On), "linux/emacs-tips");
        assert_eq!(slugify_path("/a//B/", SlugMode::Safe), "a/b");
    }
}
