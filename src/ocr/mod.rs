//! Image reference scanning and the external OCR bridge.

mod engine;
mod failure_log;

pub use engine::{OcrEngine, OcrError};
pub use failure_log::FailureLog;

use regex::Regex;
use std::sync::OnceLock;

static IMAGE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn image_pattern() -> &'static Regex {
    IMAGE_PATTERN.get_or_init(|| Regex::new(r"!\[.*?\]\((/uploads/[^)]+)\)").unwrap())
}

/// Extract upload image URLs from markdown content, in document order.
pub fn scan_image_urls(content: &str) -> Vec<String> {
    image_pattern()
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Bare filename of an image URL, for the failure log.
pub fn extract_filename(image_url: &str) -> &str {
    image_url.rsplit('/').next().unwrap_or(image_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_upload_images() {
        let content = "intro\n![chart](/uploads/chart.png)\ntext ![x](/uploads/a/b.jpg) end";
        assert_eq!(
            scan_image_urls(content),
            vec!["/uploads/chart.png", "/uploads/a/b.jpg"]
        );
    }

    #[test]
    fn test_scan_ignores_external_images() {
        let content = "![ext](https://example.com/x.png) ![ok](/uploads/y.png)";
        assert_eq!(scan_image_urls(content), vec!["/uploads/y.png"]);
    }

    #[test]
    fn test_scan_empty_alt_text() {
        assert_eq!(
            scan_image_urls("![](/uploads/no-alt.png)"),
            vec!["/uploads/no-alt.png"]
        );
    }

    #[test]
    fn test_scan_no_images() {
        assert!(scan_image_urls("plain text [link](/uploads/doc.pdf)").is_empty());
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename("/uploads/2024/chart.png"), "chart.png");
        assert_eq!(extract_filename("chart.png"), "chart.png");
    }
}
