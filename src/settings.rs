//! Application settings storage
//!
//! Stores backend coordinates, API keys, tool choices and the signed-in session
//! in a JSON file in the app data directory.

use crate::error::{KitError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Global settings instance
static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Path to config file (set during init)
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

pub const DEFAULT_BUCKET: &str = "case-files";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OCR_LANGUAGE: &str = "por";
pub const DEFAULT_MIN_TEXT_CHARS: usize = 50;
pub const DEFAULT_RASTERIZER: &str = "wkhtmltoimage";

/// Tokens returned by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub email: String,
    /// Unix seconds; `None` when the service did not say.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    /// Tesseract language code (default: "por")
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Text layers at or below this many characters are treated as scanned
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// HTML-to-image command used for PDF export
    #[serde(default = "default_rasterizer")]
    pub rasterizer: String,
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default)]
    pub session: Option<StoredSession>,
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_ocr_language() -> String {
    DEFAULT_OCR_LANGUAGE.to_string()
}

fn default_min_text_chars() -> usize {
    DEFAULT_MIN_TEXT_CHARS
}

fn default_rasterizer() -> String {
    DEFAULT_RASTERIZER.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            storage_bucket: default_bucket(),
            ocr_language: default_ocr_language(),
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            rasterizer: default_rasterizer(),
            export_dir: None,
            session: None,
        }
    }
}

impl Settings {
    /// Load settings from disk or create default
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Settings::default(),
            }
        } else {
            Settings::default()
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }
}

/// Initialize settings with the app data directory
pub fn init(app_data_dir: PathBuf) {
    let config_path = app_data_dir.join("settings.json");
    let settings = Settings::load(&config_path);

    if let Ok(mut guard) = CONFIG_PATH.write() {
        *guard = Some(config_path);
    }
    if let Ok(mut guard) = SETTINGS.write() {
        *guard = Some(settings);
    }
}

/// Default data directory: `<platform data dir>/casekit`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("casekit"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where settings are stored, for display
pub fn config_path_display() -> String {
    CONFIG_PATH
        .read()
        .ok()
        .and_then(|g| g.clone())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (not initialized)".to_string())
}

/// Copy of the current settings (defaults if `init` was never called)
pub fn snapshot() -> Settings {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.clone())
        .unwrap_or_default()
}

/// Apply a change to the global settings and persist it.
fn update<F>(change: F) -> Result<()>
where
    F: FnOnce(&mut Settings),
{
    let mut settings_guard = SETTINGS
        .write()
        .map_err(|_| KitError::Custom("Failed to acquire settings lock".into()))?;

    let settings = settings_guard.get_or_insert_with(Settings::default);
    change(settings);

    let config_path = CONFIG_PATH
        .read()
        .map_err(|_| KitError::Custom("Failed to acquire config path lock".into()))?
        .clone()
        .ok_or(KitError::MissingConfig("settings not initialized"))?;

    settings.save(&config_path)
}

/// Environment variable takes precedence over the stored value.
fn env_or(var: &str, stored: Option<String>) -> Option<String> {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    stored.filter(|v| !v.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Mask a secret for display (first 8 / last 4 chars)
pub fn mask_secret(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "*".repeat(chars.len())
    }
}

// ==================== Backend ====================

pub fn get_backend_url() -> Option<String> {
    env_or("CASEKIT_BACKEND_URL", snapshot().backend_url)
        .map(|u| u.trim_end_matches('/').to_string())
}

pub fn set_backend_url(url: String) -> Result<()> {
    update(|s| s.backend_url = non_empty(url))
}

pub fn get_anon_key() -> Option<String> {
    env_or("CASEKIT_ANON_KEY", snapshot().anon_key)
}

pub fn set_anon_key(key: String) -> Result<()> {
    update(|s| s.anon_key = non_empty(key))
}

pub fn get_storage_bucket() -> String {
    snapshot().storage_bucket
}

pub fn set_storage_bucket(bucket: String) -> Result<()> {
    update(|s| {
        s.storage_bucket = if bucket.is_empty() {
            default_bucket()
        } else {
            bucket
        }
    })
}

// ==================== Session ====================

pub fn get_session() -> Option<StoredSession> {
    snapshot().session
}

pub fn set_session(session: StoredSession) -> Result<()> {
    update(|s| s.session = Some(session))
}

pub fn clear_session() -> Result<()> {
    update(|s| s.session = None)
}

// ==================== Gemini ====================

/// Get the Gemini API key (checks env var first, then stored setting)
pub fn get_gemini_api_key() -> Option<String> {
    env_or("GEMINI_API_KEY", snapshot().gemini_api_key)
}

pub fn set_gemini_api_key(key: String) -> Result<()> {
    update(|s| s.gemini_api_key = non_empty(key))
}

pub fn get_masked_gemini_api_key() -> Option<String> {
    get_gemini_api_key().map(|k| mask_secret(&k))
}

pub fn get_gemini_model() -> String {
    snapshot().gemini_model
}

pub fn set_gemini_model(model: String) -> Result<()> {
    update(|s| {
        s.gemini_model = if model.is_empty() {
            default_gemini_model()
        } else {
            model
        }
    })
}

// ==================== Extraction / Export ====================

pub fn get_ocr_language() -> String {
    snapshot().ocr_language
}

pub fn set_ocr_language(lang: String) -> Result<()> {
    update(|s| {
        s.ocr_language = if lang.is_empty() {
            default_ocr_language()
        } else {
            lang
        }
    })
}

pub fn get_min_text_chars() -> usize {
    snapshot().min_text_chars
}

pub fn set_min_text_chars(chars: usize) -> Result<()> {
    update(|s| s.min_text_chars = chars)
}

pub fn get_rasterizer() -> String {
    snapshot().rasterizer
}

pub fn set_rasterizer(command: String) -> Result<()> {
    update(|s| {
        s.rasterizer = if command.is_empty() {
            default_rasterizer()
        } else {
            command
        }
    })
}

pub fn get_export_dir() -> Option<String> {
    snapshot().export_dir
}

pub fn set_export_dir(dir: String) -> Result<()> {
    update(|s| s.export_dir = non_empty(dir))
}
