pub const DEFAULT_EXPORT_NAME: &str = "document";

/// Derive the PDF file name from a document title.
///
/// Characters other than ASCII letters, digits and whitespace are dropped,
/// each remaining whitespace character becomes `_`, and the result is
/// lowercased. An empty result falls back to `document.pdf`.
pub fn export_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    let stem: String = kept
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c.to_ascii_lowercase() })
        .collect();

    if stem.is_empty() {
        format!("{}.pdf", DEFAULT_EXPORT_NAME)
    } else {
        format!("{}.pdf", stem)
    }
}
