//! Document editor state
//!
//! Holds one module's title and envelope fields, keeps the rendered preview in
//! step with every change, and writes the whole envelope back on save. Values
//! are not validated: empty strings are fine everywhere.

use crate::backend::{BackendClient, Module, ModuleKind, ModuleStatus};
use crate::content::{render_preview, ContentEnvelope, PaperFormat, Stamp};
use crate::error::{KitError, Result};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Body,
    Header,
    Footer,
    Stamp,
    Signature,
    Logo,
    Subtitle,
}

impl EditorField {
    pub const ALL: [EditorField; 8] = [
        EditorField::Title,
        EditorField::Body,
        EditorField::Header,
        EditorField::Footer,
        EditorField::Stamp,
        EditorField::Signature,
        EditorField::Logo,
        EditorField::Subtitle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorField::Title => "title",
            EditorField::Body => "body",
            EditorField::Header => "header",
            EditorField::Footer => "footer",
            EditorField::Stamp => "stamp",
            EditorField::Signature => "signature",
            EditorField::Logo => "logo",
            EditorField::Subtitle => "subtitle",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

pub struct DocumentEditor {
    module_id: String,
    title: String,
    kind: ModuleKind,
    status: ModuleStatus,
    envelope: ContentEnvelope,
    preview_html: String,
    dirty: bool,
}

impl DocumentEditor {
    /// Load a module's stored content into editor state.
    pub fn open(module: &Module) -> Self {
        let envelope = ContentEnvelope::parse(module.content.as_deref());
        let mut editor = Self {
            module_id: module.id.clone(),
            title: module.title.clone(),
            kind: module.kind,
            status: module.status,
            envelope,
            preview_html: String::new(),
            dirty: false,
        };
        editor.refresh();
        editor
    }

    fn refresh(&mut self) {
        self.preview_html = render_preview(&self.title, self.kind, self.status, &self.envelope);
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn format(&self) -> PaperFormat {
        PaperFormat::for_kind(self.kind)
    }

    pub fn envelope(&self) -> &ContentEnvelope {
        &self.envelope
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn field(&self, field: EditorField) -> &str {
        match field {
            EditorField::Title => &self.title,
            EditorField::Body => &self.envelope.body,
            EditorField::Header => &self.envelope.header,
            EditorField::Footer => &self.envelope.footer,
            EditorField::Stamp => self.envelope.stamp.as_str(),
            EditorField::Signature => &self.envelope.signature,
            EditorField::Logo => &self.envelope.logo,
            EditorField::Subtitle => &self.envelope.subtitle,
        }
    }

    /// Change one field and re-render the preview.
    ///
    /// Only the stamp is constrained, to its fixed vocabulary.
    pub fn set_field(&mut self, field: EditorField, value: &str) -> Result<()> {
        let value = value.to_string();
        match field {
            EditorField::Title => self.title = value,
            EditorField::Body => self.envelope.body = value,
            EditorField::Header => self.envelope.header = value,
            EditorField::Footer => self.envelope.footer = value,
            EditorField::Signature => self.envelope.signature = value,
            EditorField::Logo => self.envelope.logo = value,
            EditorField::Subtitle => self.envelope.subtitle = value,
            EditorField::Stamp => {
                let stamp = if value.is_empty() {
                    Stamp::None
                } else {
                    Stamp::from_str(&value).ok_or_else(|| {
                        KitError::Validation(format!(
                            "Unknown stamp '{}' (none, confidential, top_secret, evidence, copy)",
                            value
                        ))
                    })?
                };
                self.envelope.stamp = stamp;
            }
        }
        self.dirty = true;
        self.refresh();
        Ok(())
    }

    pub fn preview(&self) -> &str {
        &self.preview_html
    }

    /// Serialize the envelope and write it together with the title.
    pub async fn save(&mut self, client: &BackendClient) -> Result<()> {
        let content = self.envelope.to_content_string();
        client
            .update_module_content(&self.module_id, &self.title, &content)
            .await?;
        self.dirty = false;
        info!(module = %self.module_id, "Saved document");
        Ok(())
    }
}
