//! Configuration loading and root folder resolution
//!
//! Bootstrap settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A present but malformed file is a `Config` error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ENV_ROOT_FOLDER: &str = "MCAT_ROOT_FOLDER";

/// Environment variable naming the TOML config file
pub const ENV_CONFIG_FILE: &str = "MCAT_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "mcat.db";

const ENV_IMAGE_CLOUD_NAME: &str = "MCAT_IMAGE_CLOUD_NAME";
const ENV_IMAGE_UPLOAD_PRESET: &str = "MCAT_IMAGE_UPLOAD_PRESET";
const ENV_AUDIO_BUCKET: &str = "MCAT_AUDIO_BUCKET";
const ENV_AUDIO_ACCESS_TOKEN: &str = "MCAT_AUDIO_ACCESS_TOKEN";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while the service runs; restart to pick up edits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database file path (optional, defaults to `<root>/mcat.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upload collaborator settings
    #[serde(default)]
    pub uploads: UploadsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body limit; must fit the largest audio file accepted
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Upload collaborator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadsConfig {
    #[serde(default)]
    pub image: ImageUploadConfig,

    #[serde(default)]
    pub audio: AudioUploadConfig,
}

/// Image CDN (cover art, artist and genre pictures)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageUploadConfig {
    #[serde(default)]
    pub cloud_name: Option<String>,

    /// Unsigned upload preset configured on the provider
    #[serde(default)]
    pub upload_preset: Option<String>,

    #[serde(default = "default_image_folder")]
    pub folder: String,

    #[serde(default = "default_image_api_base_url")]
    pub api_base_url: String,
}

impl Default for ImageUploadConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: None,
            folder: default_image_folder(),
            api_base_url: default_image_api_base_url(),
        }
    }
}

impl ImageUploadConfig {
    /// True when both the cloud name and the upload preset are set
    pub fn is_configured(&self) -> bool {
        is_present(&self.cloud_name) && is_present(&self.upload_preset)
    }
}

/// Object storage bucket for audio files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioUploadConfig {
    #[serde(default)]
    pub bucket: Option<String>,

    /// Optional bearer token sent with uploads
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_audio_folder")]
    pub folder: String,

    #[serde(default = "default_audio_api_base_url")]
    pub api_base_url: String,
}

impl Default for AudioUploadConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            access_token: None,
            folder: default_audio_folder(),
            api_base_url: default_audio_api_base_url(),
        }
    }
}

impl AudioUploadConfig {
    /// True when a bucket is set
    pub fn is_configured(&self) -> bool {
        is_present(&self.bucket)
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_image_folder() -> String {
    "track_covers".to_string()
}

fn default_image_api_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_audio_folder() -> String {
    "tracks".to_string()
}

fn default_audio_api_base_url() -> String {
    "https://firebasestorage.googleapis.com".to_string()
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Override upload secrets from the environment
    ///
    /// Secrets are commonly injected by the deployment rather than written
    /// to the config file; an environment value replaces the TOML value.
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_value(ENV_IMAGE_CLOUD_NAME) {
            self.uploads.image.cloud_name = Some(value);
        }
        if let Some(value) = env_value(ENV_IMAGE_UPLOAD_PRESET) {
            self.uploads.image.upload_preset = Some(value);
        }
        if let Some(value) = env_value(ENV_AUDIO_BUCKET) {
            self.uploads.audio.bucket = Some(value);
        }
        if let Some(value) = env_value(ENV_AUDIO_ACCESS_TOKEN) {
            self.uploads.audio.access_token = Some(value);
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load the TOML config file
///
/// Missing file → warning + defaults. Unreadable or malformed file → error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}; using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve which config file to read
///
/// Priority: explicit path (CLI) > `MCAT_CONFIG` > `<config dir>/mcat/config.toml`.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_value(ENV_CONFIG_FILE) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("mcat").join("config.toml"))
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: get_default_root_folder(),
            log_level: default_log_level(),
            port: default_port(),
        }
    }
}

/// OS-dependent default root folder
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/mcat (or /var/lib/mcat for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("mcat"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mcat"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("mcat"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/mcat"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("mcat"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mcat"))
    } else {
        PathBuf::from("./mcat_data")
    }
}

/// Root folder resolution (CLI > ENV > TOML > compiled default)
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
            toml_root: None,
        }
    }

    /// Path given on the command line (highest priority)
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// `root_folder` from the TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            info!("[{}] Root folder: {} (command line)", self.module_name, path.display());
            return path.clone();
        }

        if let Some(path) = env_value(ENV_ROOT_FOLDER) {
            info!("[{}] Root folder: {} ({})", self.module_name, path, ENV_ROOT_FOLDER);
            return PathBuf::from(path);
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder: {} (config file)", self.module_name, path.display());
            return path.clone();
        }

        let path = get_default_root_folder();
        info!("[{}] Root folder: {} (default)", self.module_name, path.display());
        path
    }
}

/// Creates the root folder and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if it does not exist
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Default database file path
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
