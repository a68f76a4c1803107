use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::commands::InsertTarget;
use crate::document::TextAlign;
use crate::error::ConfigError;
use crate::toolbar::ToolbarFeatures;

/// A named swatch in the color picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub name: SmolStr,
    pub value: SmolStr,
}

impl PaletteColor {
    pub fn new(name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Sizes offered by the font-size control, as CSS lengths.
    pub font_sizes: Vec<SmolStr>,
    /// Size shown when the text carries no font-size mark.
    pub default_font_size: SmolStr,
    pub palette: Vec<PaletteColor>,
    /// Choosing this color clears the color instead of setting it.
    pub default_color: SmolStr,
    /// Alignment of the initial empty paragraph.
    pub default_alignment: TextAlign,
    /// Maximum undo depth. Unbounded when unset.
    pub history_limit: Option<usize>,
    /// HTML loaded when the editor is created.
    pub initial_content: Option<String>,
    pub toolbar: ToolbarFeatures,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_sizes: ["12px", "14px", "16px", "20px", "24px", "32px"]
                .into_iter()
                .map(SmolStr::new_static)
                .collect(),
            default_font_size: SmolStr::new_static("16px"),
            palette: vec![
                PaletteColor::new("Default", "#000000"),
                PaletteColor::new("Red", "#ef4444"),
                PaletteColor::new("Blue", "#3b82f6"),
                PaletteColor::new("Green", "#10b981"),
                PaletteColor::new("Purple", "#8b5cf6"),
                PaletteColor::new("Orange", "#f97316"),
            ],
            default_color: SmolStr::new_static("#000000"),
            default_alignment: TextAlign::Left,
            history_limit: None,
            initial_content: None,
            toolbar: ToolbarFeatures::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Files whose MIME type starts with this are attached; others are skipped.
    pub accept_prefix: SmolStr,
    pub insert_target: InsertTarget,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            accept_prefix: SmolStr::new_static("image/"),
            insert_target: InsertTarget::Cursor,
        }
    }
}

impl MediaConfig {
    pub fn accepts(&self, mime: &str) -> bool {
        mime.starts_with(self.accept_prefix.as_str())
    }
}

/// Top-level configuration file: an `[editor]` and a `[media]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    pub editor: EditorConfig,
    pub media: MediaConfig,
}

impl LoomConfig {
    pub async fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load().await
    }

    pub async fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self).await
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<LoomConfig, ConfigError>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    fn save(&self, config: &LoomConfig) -> impl Future<Output = Result<(), ConfigError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] backed by one file.
///
/// The format follows the file extension: `.toml` or `.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn unsupported(&self) -> ConfigError {
        ConfigError::UnsupportedFormat {
            path: self.path.clone(),
        }
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<LoomConfig, ConfigError> {
        let read = || std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e));
        match self.extension() {
            Some("json") => Ok(serde_json::from_str(&read()?)?),
            Some("toml") => Ok(toml::from_str(&read()?)?),
            _ => Err(self.unsupported()),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &LoomConfig) -> Result<(), ConfigError> {
        let text = match self.extension() {
            Some("json") => serde_json::to_string_pretty(config)?,
            Some("toml") => toml::to_string_pretty(config)?,
            _ => return Err(self.unsupported()),
        };
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }
}
