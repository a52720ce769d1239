use std::path::Path;

pub fn is_supported_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    matches!(
        ext.as_str(),
        "md" | "markdown" | "txt" | "html" | "htm" | "pdf" | "docx"
    )
}

/// Collapse every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Upper-case the first letter of every word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions() {
        assert!(is_supported_file(Path::new("docs/reset.md")));
        assert!(is_supported_file(Path::new("manual.PDF")));
        assert!(!is_supported_file(Path::new("main.rs")));
        assert!(!is_supported_file(Path::new("Makefile")));
    }

    #[test]
    fn whitespace_helpers() {
        assert_eq!(collapse_whitespace("  a\n\tb   c "), "a b c");
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn title_cases_words() {
        assert_eq!(title_case("single sign-on portal"), "Single Sign-on Portal");
    }
}
