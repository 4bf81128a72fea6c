use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on a single conversion request, end to end
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum accepted JSON body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_request_timeout_secs() -> u64 {
    120
}

const fn default_max_body_bytes() -> usize {
    100 * 1024 * 1024
}

impl ServerConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Scratch storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Directory holding staged files (created on first use)
    #[serde(default = "default_scratch_dir")]
    pub dir: PathBuf,

    /// How often the server sweeps orphaned files (0 = never)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Entries older than this are considered orphaned; must exceed
    /// `server.request_timeout_secs` while sweeping is on
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./temp")
}

const fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

const fn default_max_age_secs() -> u64 {
    60 * 60
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: default_scratch_dir(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Headless office suite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    /// Executable to launch (looked up on PATH)
    #[serde(default = "default_office_binary")]
    pub binary: String,

    /// Arguments placed before the conversion flags, for launchers
    /// such as `flatpak run org.libreoffice.LibreOffice`
    #[serde(default)]
    pub binary_args: Vec<String>,

    #[serde(default = "default_office_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_office_binary() -> String {
    "soffice".to_string()
}

const fn default_office_timeout_secs() -> u64 {
    90
}

impl OfficeConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            binary: default_office_binary(),
            binary_args: Vec::new(),
            timeout_secs: default_office_timeout_secs(),
        }
    }
}

/// Image to PDF settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Images wider than this are downscaled to it
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// JPEG quality for the first encoding attempt
    #[serde(default = "default_high_quality")]
    pub high_quality: u8,

    /// JPEG quality used once when the first attempt is too large
    #[serde(default = "default_low_quality")]
    pub low_quality: u8,

    /// Encoded size above which the lower quality is used
    #[serde(default = "default_size_threshold_bytes")]
    pub size_threshold_bytes: usize,

    /// Largest accepted decoded image (width * height)
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

const fn default_max_width() -> u32 {
    1200
}

const fn default_high_quality() -> u8 {
    95
}

const fn default_low_quality() -> u8 {
    60
}

const fn default_size_threshold_bytes() -> usize {
    500 * 1024
}

const fn default_max_pixels() -> u64 {
    50_000_000
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            high_quality: default_high_quality(),
            low_quality: default_low_quality(),
            size_threshold_bytes: default_size_threshold_bytes(),
            max_pixels: default_max_pixels(),
        }
    }
}

/// HTML renderer settings. Lengths are in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlConfig {
    #[serde(default = "default_page_width")]
    pub page_width: f32,

    #[serde(default = "default_page_height")]
    pub page_height: f32,

    #[serde(default = "default_margin")]
    pub margin: f32,

    /// Body text size; headings scale from it
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Render renderer failures as a one-page PDF instead of failing
    #[serde(default)]
    pub render_errors_as_pdf: bool,
}

// A4
const fn default_page_width() -> f32 {
    595.0
}

const fn default_page_height() -> f32 {
    842.0
}

const fn default_margin() -> f32 {
    56.0
}

const fn default_font_size() -> f32 {
    11.0
}

const fn default_max_pages() -> usize {
    200
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            font_size: default_font_size(),
            max_pages: default_max_pages(),
            render_errors_as_pdf: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scratch: ScratchConfig,

    #[serde(default)]
    pub office: OfficeConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub html: HtmlConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/docforge/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("docforge").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values no conversion could work with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &str, reason: &str) -> Error {
            Error::ConfigInvalid {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be positive"));
        }
        // A sweep must never reach files a running request still uses
        if self.scratch.sweep_interval_secs > 0
            && self.scratch.max_age_secs <= self.server.request_timeout_secs
        {
            return Err(invalid(
                "scratch.max_age_secs",
                "must exceed server.request_timeout_secs",
            ));
        }
        if self.office.binary.trim().is_empty() {
            return Err(invalid("office.binary", "must not be empty"));
        }
        if self.office.timeout_secs == 0 {
            return Err(invalid("office.timeout_secs", "must be positive"));
        }
        if self.image.max_width == 0 {
            return Err(invalid("image.max_width", "must be positive"));
        }
        for (field, quality) in [
            ("image.high_quality", self.image.high_quality),
            ("image.low_quality", self.image.low_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(invalid(field, "must be between 1 and 100"));
            }
        }
        if self.html.margin * 2.0 >= self.html.page_width.min(self.html.page_height) {
            return Err(invalid("html.margin", "leaves no room for content"));
        }
        if self.html.font_size <= 0.0 {
            return Err(invalid("html.font_size", "must be positive"));
        }
        if self.html.max_pages == 0 {
            return Err(invalid("html.max_pages", "must be positive"));
        }
        Ok(())
    }
}
