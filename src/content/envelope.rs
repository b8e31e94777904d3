use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Overlay marking printed across a document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stamp {
    Confidential,
    TopSecret,
    Evidence,
    Copy,
    #[default]
    #[serde(other)]
    None,
}

impl Stamp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stamp::None => "none",
            Stamp::Confidential => "confidential",
            Stamp::TopSecret => "top_secret",
            Stamp::Evidence => "evidence",
            Stamp::Copy => "copy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Stamp::None),
            "confidential" => Some(Stamp::Confidential),
            "top_secret" => Some(Stamp::TopSecret),
            "evidence" => Some(Stamp::Evidence),
            "copy" => Some(Stamp::Copy),
            _ => None,
        }
    }

    /// Text printed inside the stamp; `None` draws nothing.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Stamp::None => None,
            Stamp::Confidential => Some("CONFIDENTIAL"),
            Stamp::TopSecret => Some("TOP SECRET"),
            Stamp::Evidence => Some("EVIDENCE"),
            Stamp::Copy => Some("COPY"),
        }
    }
}

/// Fields of a document as stored (serialized) in `modules.content`.
///
/// Every field may be empty. `body` is either free text or the URL of an
/// uploaded file, see [`crate::content::attachment::classify_body`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentEnvelope {
    #[serde(deserialize_with = "lenient_text")]
    pub body: String,
    #[serde(deserialize_with = "lenient_text")]
    pub header: String,
    #[serde(deserialize_with = "lenient_text")]
    pub footer: String,
    #[serde(deserialize_with = "lenient_stamp")]
    pub stamp: Stamp,
    #[serde(deserialize_with = "lenient_text")]
    pub signature: String,
    #[serde(deserialize_with = "lenient_text")]
    pub logo: String,
    #[serde(deserialize_with = "lenient_text")]
    pub subtitle: String,
}

/// `null` and non-string values read as empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_stamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Stamp, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Stamp::from_str(&s).unwrap_or_default(),
        _ => Stamp::None,
    })
}

impl ContentEnvelope {
    /// Read a stored content string.
    ///
    /// Rows written before the envelope existed hold plain text; anything that
    /// is not a JSON object becomes the body.
    pub fn parse(content: Option<&str>) -> Self {
        let raw = match content {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Self::default(),
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self {
                body: raw.to_string(),
                ..Self::default()
            },
        }
    }

    pub fn to_content_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Content of a freshly added document.
    pub fn placeholder() -> Self {
        Self {
            body: "Write the document text here, or paste the link of an uploaded file.".into(),
            ..Self::default()
        }
    }
}
