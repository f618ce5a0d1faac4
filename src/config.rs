//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXSTAT_CONFIG` (environment variable)
//! 2. `~/.config/mboxstat/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxstat\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// MBOX splitting limits.
    pub mbox: MboxConfig,
    /// MIME tree construction.
    pub mime: MimeConfig,
    /// Part classification tuning.
    pub classifier: ClassifierConfig,
    /// Report output settings.
    pub report: ReportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// MBOX splitting limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MboxConfig {
    /// Read buffer size in bytes (default: 1048576 = 1 MB).
    pub read_buffer_size: usize,
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: usize,
}

/// MIME tree construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MimeConfig {
    /// Nesting depth beyond which multiparts are kept as opaque leaves.
    pub max_depth: usize,
}

/// Part classification tuning.
///
/// Both type sets reflect quirks observed in real archives (mostly Gmail
/// exports) and may need adjusting for other sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Declared content types rendered as text even without a charset.
    pub renderable_without_charset: Vec<String>,
    /// Sniffed content types that mark a charset-tagged part as suspicious.
    pub erroneous_sniffed_types: Vec<String>,
    /// Number of leading payload bytes handed to the content sniffer.
    pub sniff_prefix_len: usize,
    /// Stripped payloads of suspicious parts shorter than this are dropped.
    pub min_erroneous_payload_len: usize,
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Indentation width of the JSON dumps.
    pub json_indent: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MboxConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024 * 1024,       // 1 MB
            max_message_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl Default for MimeConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            renderable_without_charset: ["text/plain", "text/rfc822-headers", "text/html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            erroneous_sniffed_types: [
                "application/x-empty",
                "application/x-bytecode.python",
                "application/octet-stream",
                "audio/x-mp4a-latm",
                "message/rfc822",
                "text/calendar",
                "text/csv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            sniff_prefix_len: 2048,
            min_erroneous_payload_len: 2,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { json_indent: 4 }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXSTAT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxstat").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxstat")
}

/// Return the log file path. Logging appends to this file.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxstat.log")
}
