use url::Url;

/// What a linked file looks like, judged from its URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Document,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Pdf => "pdf",
            AttachmentKind::Document => "document",
        }
    }

    fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" => AttachmentKind::Image,
            "pdf" => AttachmentKind::Pdf,
            _ => AttachmentKind::Document,
        }
    }
}

/// How a document body is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    /// Shown verbatim as preformatted text
    Text(String),
    /// Absolute http(s) URL of an uploaded file
    Attachment { url: Url, kind: AttachmentKind },
}

/// Classify a body: a whole-body absolute http(s) URL is an attachment,
/// everything else is literal text.
pub fn classify_body(body: &str) -> BodyContent {
    let trimmed = body.trim();
    if !trimmed.contains(char::is_whitespace) {
        if let Ok(url) = Url::parse(trimmed) {
            if matches!(url.scheme(), "http" | "https") && url.host().is_some() {
                let kind = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .and_then(|last| last.rsplit_once('.'))
                    .map(|(_, ext)| AttachmentKind::from_extension(ext))
                    .unwrap_or(AttachmentKind::Document);
                return BodyContent::Attachment { url, kind };
            }
        }
    }
    BodyContent::Text(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(body: &str) -> Option<AttachmentKind> {
        match classify_body(body) {
            BodyContent::Attachment { kind, .. } => Some(kind),
            BodyContent::Text(_) => None,
        }
    }

    #[test]
    fn test_urls_are_attachments() {
        assert_eq!(
            kind_of("https://x.supabase.co/storage/v1/object/public/case-files/c1/ab-map.PNG"),
            Some(AttachmentKind::Image)
        );
        assert_eq!(kind_of("  http://files.example/report.pdf?dl=1 \n"), Some(AttachmentKind::Pdf));
        assert_eq!(kind_of("https://files.example/notes.docx"), Some(AttachmentKind::Document));
        assert_eq!(kind_of("https://files.example/"), Some(AttachmentKind::Document));
        assert_eq!(kind_of("https://files.example/archive"), Some(AttachmentKind::Document));
    }

    #[test]
    fn test_non_urls_are_verbatim_text() {
        for body in [
            "",
            "The butler did it.",
            "see https://files.example/a.pdf for details",
            "ftp://files.example/a.pdf",
            "mailto:holmes@baker.street",
            "files.example/a.pdf",
            "   indented\n\ttext  ",
        ] {
            assert_eq!(classify_body(body), BodyContent::Text(body.to_string()), "{body:?}");
        }
    }
}
