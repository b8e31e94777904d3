//! HTML facsimile of a printed document
//!
//! The page is a fixed-width sheet (A4 for documents, maps and lab reports,
//! C5 for envelopes) with the envelope fields laid over it. The same HTML is
//! fed to the rasterizer for PDF export, so the sheet grows downwards when the
//! body does not fit and pagination happens on the bitmap.

use crate::backend::{ModuleKind, ModuleStatus};
use crate::content::attachment::{classify_body, AttachmentKind, BodyContent};
use crate::content::envelope::ContentEnvelope;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperFormat {
    A4,
    C5,
}

impl PaperFormat {
    pub fn for_kind(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Envelope => PaperFormat::C5,
            _ => PaperFormat::A4,
        }
    }

    /// Preview sheet size in CSS pixels (width, height)
    pub fn preview_px(&self) -> (u32, u32) {
        match self {
            PaperFormat::A4 => (500, 700),
            PaperFormat::C5 => (600, 400),
        }
    }

    /// Output PDF page size in points (width, height). Envelopes print landscape.
    pub fn page_size_pt(&self) -> (f64, f64) {
        match self {
            PaperFormat::A4 => (595.28, 841.89),
            PaperFormat::C5 => (649.13, 459.21),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaperFormat::A4 => "A4 (210x297mm)",
            PaperFormat::C5 => "C5 (162x229mm)",
        }
    }
}

const REVIEW_WARNING: &str = "[ Content still under review ]";

const STYLE: &str = "\
body{margin:0;background:#fff}\
.sheet{position:relative;box-sizing:border-box;padding:48px;font-family:Georgia,serif;color:#1e293b;overflow:hidden}\
.sheet.a4{background:#fff}\
.sheet.c5{background:#dcbfa3}\
.header{display:flex;justify-content:space-between;align-items:center;border-bottom:2px solid #1e293b;padding-bottom:12px;margin-bottom:24px;font-weight:bold;font-size:18px}\
.logo{height:32px}\
.title{font-size:20px;font-weight:bold;text-transform:uppercase;letter-spacing:2px;margin:0 0 4px 0}\
.subtitle{font-style:italic;margin:0 0 16px 0;color:#475569}\
pre.body{white-space:pre-wrap;word-wrap:break-word;font-family:Georgia,serif;font-size:14px;line-height:1.6;margin:0}\
img.attachment{max-width:100%}\
iframe.attachment{width:100%;height:480px;border:1px solid #cbd5e1}\
.file-link{display:inline-block;padding:8px 12px;border:1px solid #94a3b8;border-radius:6px}\
.signature{margin-top:32px;text-align:right;font-style:italic}\
.footer{margin-top:32px;border-top:1px solid #cbd5e1;padding-top:8px;font-size:11px;color:#64748b;text-align:center}\
.stamp{position:absolute;bottom:48px;left:48px;color:#991b1b;border:4px solid #991b1b;padding:8px;font-size:24px;font-weight:bold;letter-spacing:4px;transform:rotate(-5deg);opacity:.8}\
.review{background:#fef3c7;border:1px solid #fcd34d;color:#92400e;font-size:12px;padding:8px;margin-top:16px;text-align:center}";

fn push_body(html: &mut String, body: &str) {
    match classify_body(body) {
        BodyContent::Text(text) => {
            let _ = write!(html, "<pre class=\"body\">{}</pre>", encode_text(&text));
        }
        BodyContent::Attachment { url, kind } => {
            let src = encode_double_quoted_attribute(url.as_str());
            match kind {
                AttachmentKind::Image => {
                    let _ = write!(html, "<img class=\"attachment\" src=\"{}\" alt=\"attachment\">", src);
                }
                AttachmentKind::Pdf => {
                    let _ = write!(html, "<iframe class=\"attachment\" src=\"{}\"></iframe>", src);
                }
                AttachmentKind::Document => {
                    let _ = write!(
                        html,
                        "<a class=\"file-link\" href=\"{}\" target=\"_blank\">Open file</a>",
                        src
                    );
                }
            }
        }
    }
}

/// Render the full preview document for one module.
pub fn render_preview(
    title: &str,
    kind: ModuleKind,
    status: ModuleStatus,
    envelope: &ContentEnvelope,
) -> String {
    let format = PaperFormat::for_kind(kind);
    let (width, height) = format.preview_px();
    let class = match format {
        PaperFormat::A4 => "a4",
        PaperFormat::C5 => "c5",
    };

    let mut html = String::with_capacity(2048 + envelope.body.len());
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>",
        encode_text(title),
        STYLE
    );
    let _ = write!(
        html,
        "<div class=\"sheet {}\" data-kind=\"{}\" style=\"width:{}px;min-height:{}px\">",
        class,
        kind.as_str(),
        width,
        height
    );

    if !envelope.header.is_empty() || !envelope.logo.is_empty() {
        html.push_str("<div class=\"header\">");
        if !envelope.logo.is_empty() {
            let _ = write!(
                html,
                "<img class=\"logo\" src=\"{}\" alt=\"logo\">",
                encode_double_quoted_attribute(&envelope.logo)
            );
        }
        let _ = write!(html, "<span>{}</span></div>", encode_text(&envelope.header));
    }

    let _ = write!(html, "<h1 class=\"title\">{}</h1>", encode_text(title));
    if !envelope.subtitle.is_empty() {
        let _ = write!(html, "<p class=\"subtitle\">{}</p>", encode_text(&envelope.subtitle));
    }

    push_body(&mut html, &envelope.body);

    if status == ModuleStatus::Incomplete {
        let _ = write!(html, "<div class=\"review\">{}</div>", encode_text(REVIEW_WARNING));
    }
    if !envelope.signature.is_empty() {
        let _ = write!(html, "<div class=\"signature\">{}</div>", encode_text(&envelope.signature));
    }
    if !envelope.footer.is_empty() {
        let _ = write!(html, "<div class=\"footer\">{}</div>", encode_text(&envelope.footer));
    }
    if let Some(label) = envelope.stamp.label() {
        let _ = write!(html, "<div class=\"stamp\">{}</div>", label);
    }

    html.push_str("</div></body></html>");
    html
}
