use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));

/// Replace `**span**` with `span`. Everything else is left as is.
pub fn strip_emphasis(text: &str) -> String {
    BOLD.replace_all(text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_wrappers_only() {
        assert_eq!(strip_emphasis("**bold**"), "bold");
        assert_eq!(
            strip_emphasis("We offer **branding** and **web design**, *really*."),
            "We offer branding and web design, *really*."
        );
    }

    #[test]
    fn leaves_unpaired_markers() {
        assert_eq!(strip_emphasis("2 ** 3 is eight"), "2 ** 3 is eight");
        assert_eq!(strip_emphasis("****"), "****");
    }

    #[test]
    fn does_not_span_lines() {
        assert_eq!(strip_emphasis("**a\nb**"), "**a\nb**");
    }
}
