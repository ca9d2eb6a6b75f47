//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use rusty_logo_canvas::RenderStyle;
use rusty_logo_canvas::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Longest command the protocol can produce (`steps 4294967295`).
const LONGEST_COMMAND: usize = 16;

/// Top-level Rusty Logo configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Lines longer than this end the session.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Concurrent sessions allowed per client IP. Unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections_per_ip: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_line_bytes: default_max_line_bytes(),
            max_connections_per_ip: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8124
}

fn default_max_line_bytes() -> usize {
    1024
}

/// Size and look of the canvas every new session starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: u16,

    #[serde(default = "default_canvas_height")]
    pub height: u16,

    #[serde(default)]
    pub style: RenderStyle,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            style: RenderStyle::default(),
        }
    }
}

fn default_canvas_width() -> u16 {
    DEFAULT_WIDTH
}

fn default_canvas_height() -> u16 {
    DEFAULT_HEIGHT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "rusty_logo_server=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
            output: default_log_output(),
        }
    }
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

static ENV_VAR_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
});

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::RustyLogoError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Server section with defaults filled in.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Canvas section with defaults filled in.
    pub fn canvas(&self) -> CanvasConfig {
        self.canvas.clone().unwrap_or_default()
    }

    /// Logging section with defaults filled in.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.server.as_ref().map(|s| s.port).unwrap_or_else(default_port)
    }

    /// `bind:port` socket address string.
    pub fn listen_addr(&self) -> String {
        let server = self.server();
        format!("{}:{}", server.bind, server.port)
    }

    /// Get a config value by dotted path (e.g. "server.port", "canvas.style").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(server) = &self.server {
            if server.port == 0 {
                errors.push("Server port cannot be 0".to_string());
            }
            if server.max_line_bytes == 0 {
                errors.push("server.max_line_bytes cannot be 0".to_string());
            } else if server.max_line_bytes < LONGEST_COMMAND {
                warnings.push(format!(
                    "server.max_line_bytes = {} is shorter than the longest valid command ({LONGEST_COMMAND} bytes)",
                    server.max_line_bytes
                ));
            }
            if server.max_connections_per_ip == Some(0) {
                errors.push("server.max_connections_per_ip cannot be 0".to_string());
            }
        }

        if let Some(canvas) = &self.canvas {
            if canvas.width == 0 || canvas.height == 0 {
                errors.push(format!(
                    "Canvas size {}x{} is invalid: both dimensions must be positive",
                    canvas.width, canvas.height
                ));
            }
        }

        if let Some(logging) = &self.logging {
            if !matches!(logging.format.as_str(), "plain" | "json") {
                warnings.push(format!(
                    "Unknown log format '{}', falling back to plain",
                    logging.format
                ));
            }
            if !matches!(logging.output.as_str(), "stderr" | "stdout") {
                warnings.push(format!(
                    "Unknown log output '{}', falling back to stderr",
                    logging.output
                ));
            }
        }

        (warnings, errors)
    }

    /// Save config to a file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for Rusty Logo data: `~/.rusty_logo/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rusty_logo")
}
