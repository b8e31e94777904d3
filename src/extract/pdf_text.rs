//! PDF text layer
//!
//! `pdf-extract` can panic on malformed documents, so every call is wrapped in
//! `catch_unwind` and a panic becomes an ordinary error.

use crate::error::{KitError, Result};
use std::panic::{self, AssertUnwindSafe};

/// One string per page, in page order.
pub fn extract_pages(data: &[u8]) -> Result<Vec<String>> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(data)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(KitError::Extraction(format!("PDF text layer unreadable: {e}"))),
        Err(_) => Err(KitError::Extraction(
            "PDF text layer unreadable (malformed document)".into(),
        )),
    }
}

/// Number of pages according to the page tree.
pub fn page_count(data: &[u8]) -> Result<usize> {
    let doc = lopdf::Document::load_mem(data)?;
    Ok(doc.get_pages().len())
}

/// Collapse runs of whitespace inside a page to single spaces, keeping line breaks.
fn tidy(page: &str) -> String {
    page.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page_marker(number: usize) -> String {
    format!("--- Page {} ---", number)
}

/// Join pages with page-break markers, skipping pages without text.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        let text = tidy(page);
        if text.is_empty() {
            continue;
        }
        out.push_str("\n\n");
        out.push_str(&page_marker(i + 1));
        out.push_str("\n\n");
        out.push_str(&text);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_marks_non_empty_pages() {
        let pages = vec![
            "  The fog   was thick.\n\n".to_string(),
            "   \n ".to_string(),
            "Signed,\n   Lestrade".to_string(),
        ];
        assert_eq!(
            join_pages(&pages),
            "--- Page 1 ---\n\nThe fog was thick.\n\n--- Page 3 ---\n\nSigned,\nLestrade"
        );
    }

    #[test]
    fn test_join_pages_empty() {
        assert_eq!(join_pages(&[]), "");
        assert_eq!(join_pages(&["".into(), " \n".into()]), "");
    }

    #[test]
    fn test_garbage_is_an_error_not_a_panic() {
        assert!(extract_pages(b"%PDF-1.4 this is not a pdf").is_err());
        assert!(page_count(b"definitely not a pdf").is_err());
    }
}
