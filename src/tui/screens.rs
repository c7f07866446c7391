//! Screen state structures for TUI

use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Prompt the gallery starts with
pub const DEFAULT_GALLERY_PROMPT: &str = "Лёха в балетной пачке";

/// Text the wisdom tab shows before the first quote
pub const WISDOM_PLACEHOLDER: &str = "Нажми кнопку и узнай правду о себе, Лёх.";

/// Read an image file and return its bytes as standard base64
pub fn encode_image_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let bytes = fs::read(path.as_ref())?;
    if bytes.is_empty() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is empty", path.as_ref().display()),
        )));
    }
    Ok(STANDARD.encode(bytes))
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let payload = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| Error::Provider("Malformed data URL".to_string()))?;

    STANDARD
        .decode(payload)
        .map_err(|e| Error::Provider(format!("Invalid image payload: {}", e)))
}

/// Vision tab state
#[derive(Debug, Default)]
pub struct VisionScreen {
    /// Input buffer for the image path
    pub path_input: String,
    /// Base64 of the loaded image
    pub image_data: Option<String>,
    /// Last critique
    pub analysis: Option<String>,
    /// Status message
    pub status_message: Option<String>,
    /// Whether a critique is in flight
    pub loading: bool,
}

impl VisionScreen {
    /// Create new vision screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the image named in the input buffer
    pub fn load_image(&mut self) -> bool {
        let path = self.path_input.trim();
        if path.is_empty() {
            self.status_message = Some("Укажи путь к фото, Лёх.".to_string());
            return false;
        }

        match encode_image_file(path) {
            Ok(data) => {
                self.image_data = Some(data);
                self.analysis = None;
                self.status_message = Some(format!("Загружено: {}", path));
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load image {}: {}", path, e);
                self.image_data = None;
                self.status_message = Some(format!("Не открылось: {}", e));
                false
            }
        }
    }
}

/// Gallery tab state
#[derive(Debug)]
pub struct GalleryScreen {
    /// Input buffer for the prompt
    pub prompt: String,
    /// Where the last picture was written
    pub saved_path: Option<PathBuf>,
    /// Status message
    pub status_message: Option<String>,
    /// Whether a generation is in flight
    pub loading: bool,
}

impl GalleryScreen {
    /// Create new gallery screen
    pub fn new() -> Self {
        Self {
            prompt: DEFAULT_GALLERY_PROMPT.to_string(),
            saved_path: None,
            status_message: None,
            loading: false,
        }
    }

    /// Write a generated picture into `dir` as `lekha_<millis>.png`
    pub fn save_picture(&mut self, data_url: &str, dir: &Path) -> Result<PathBuf> {
        let bytes = decode_data_url(data_url)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("lekha_{}.png", Utc::now().timestamp_millis()));
        fs::write(&path, bytes)?;
        self.saved_path = Some(path.clone());
        Ok(path)
    }
}

impl Default for GalleryScreen {
    fn default() -> Self {
        Self::new()
    }
}

/// Wisdom tab state
#[derive(Debug)]
pub struct WisdomScreen {
    /// Quote on display
    pub quote: String,
    /// Whether a quote is in flight
    pub loading: bool,
}

impl WisdomScreen {
    /// Create new wisdom screen
    pub fn new() -> Self {
        Self {
            quote: WISDOM_PLACEHOLDER.to_string(),
            loading: false,
        }
    }
}

impl Default for WisdomScreen {
    fn default() -> Self {
        Self::new()
    }
}
